//! AXI4-Stream specialization of the generic driver and monitor.
//!
//! Transfers happen on every rising edge where `tvalid` and `tready` are
//! both high. Payload is little-endian within `tdata`: byte 0 of a word sits
//! in bits 7..0 and lane `i` is qualified by `tkeep[i]`. `tlast` marks the
//! final word of a transaction.

mod bus;
mod driver;
mod monitor;

pub use bus::AxiStreamBus;
pub use driver::AxiStreamDriveLogic;
pub use monitor::AxiStreamReceiveLogic;

use crate::binding::ProtocolRoles;

/// AXI4-Stream roles: `tdata`, `tvalid`, `tready`, `tlast` and optional `tkeep`.
pub const AXI4_STREAM_ROLES: ProtocolRoles = ProtocolRoles {
    name: "axi4-stream",
    required: &["tdata", "tvalid", "tready", "tlast"],
    optional: &["tkeep"],
};
