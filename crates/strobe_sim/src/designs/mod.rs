//! Reference AXI4-Stream designs.
//!
//! Both designs expose the same port list: `clk`, `rst` (active high), a slave
//! stream `s_axis_*` and a master stream `m_axis_*`, each with `tdata`,
//! `tvalid`, `tready`, `tlast` and optionally `tkeep`.

mod fifo;
mod loopback;

pub use fifo::AxisFifo;
pub use loopback::AxisLoopback;

use strobe_common::Bits;

use crate::error::SimError;
use crate::signal::{SignalBank, SignalHandle};

/// The handles of one AXI4-Stream port group.
#[derive(Clone, Debug)]
pub struct AxisPorts {
    /// Payload, `data_width` bits.
    pub tdata: SignalHandle,
    /// Producer valid.
    pub tvalid: SignalHandle,
    /// Consumer ready.
    pub tready: SignalHandle,
    /// End of packet.
    pub tlast: SignalHandle,
    /// Byte-lane qualifier, `data_width / 8` bits, when present.
    pub tkeep: Option<SignalHandle>,
}

impl AxisPorts {
    /// Declares `{prefix}_tdata`, `{prefix}_tvalid`, `{prefix}_tready`,
    /// `{prefix}_tlast` and, if `keep`, `{prefix}_tkeep`.
    pub fn declare(
        signals: &mut SignalBank,
        prefix: &str,
        data_width: u32,
        keep: bool,
    ) -> Result<Self, SimError> {
        Ok(Self {
            tdata: signals.add(&format!("{prefix}_tdata"), data_width)?,
            tvalid: signals.add(&format!("{prefix}_tvalid"), 1)?,
            tready: signals.add(&format!("{prefix}_tready"), 1)?,
            tlast: signals.add(&format!("{prefix}_tlast"), 1)?,
            tkeep: if keep {
                Some(signals.add(&format!("{prefix}_tkeep"), data_width / 8)?)
            } else {
                None
            },
        })
    }
}

/// Rejects data widths that are not a positive multiple of 8.
fn check_data_width(data_width: u32) -> Result<(), SimError> {
    if data_width == 0 || data_width % 8 != 0 {
        return Err(SimError::InvalidDesign {
            reason: format!("data width must be a positive multiple of 8, got {data_width}"),
        });
    }
    Ok(())
}

/// One word held by a design: payload, last flag and optional keep.
#[derive(Clone, Debug, PartialEq, Eq)]
struct Beat {
    data: Bits,
    last: bool,
    keep: Option<Bits>,
}

impl Beat {
    fn sample(signals: &SignalBank, ports: &AxisPorts) -> Self {
        Self {
            data: signals.value(&ports.tdata).clone(),
            last: signals.get_bool(&ports.tlast),
            keep: ports.tkeep.as_ref().map(|k| signals.value(k).clone()),
        }
    }

    /// Drives `tdata`, `tlast` and `tkeep` of `ports` with this beat.
    fn present(&self, signals: &mut SignalBank, ports: &AxisPorts) -> Result<(), SimError> {
        signals.deposit(&ports.tdata, self.data.clone())?;
        signals.deposit_bool(&ports.tlast, self.last)?;
        if let Some(handle) = &ports.tkeep {
            let keep = match &self.keep {
                Some(k) => k.clone(),
                None => Bits::low_mask(handle.width(), handle.width()),
            };
            signals.deposit(handle, keep)?;
        }
        Ok(())
    }

    /// Drives all payload signals of `ports` to zero.
    fn clear(signals: &mut SignalBank, ports: &AxisPorts) -> Result<(), SimError> {
        signals.deposit(&ports.tdata, Bits::zero(ports.tdata.width()))?;
        signals.deposit_bool(&ports.tlast, false)?;
        if let Some(handle) = &ports.tkeep {
            signals.deposit(handle, Bits::zero(handle.width()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declare_with_keep() {
        let mut signals = SignalBank::new();
        let ports = AxisPorts::declare(&mut signals, "s_axis", 64, true).unwrap();
        assert_eq!(ports.tdata.name(), "s_axis_tdata");
        assert_eq!(ports.tdata.width(), 64);
        assert_eq!(ports.tkeep.as_ref().map(|k| k.width()), Some(8));
        assert_eq!(signals.len(), 5);
    }

    #[test]
    fn declare_without_keep() {
        let mut signals = SignalBank::new();
        let ports = AxisPorts::declare(&mut signals, "m_axis", 8, false).unwrap();
        assert!(ports.tkeep.is_none());
        assert!(!signals.contains("m_axis_tkeep"));
    }

    #[test]
    fn data_width_checked() {
        assert!(check_data_width(32).is_ok());
        assert!(check_data_width(0).is_err());
        assert!(check_data_width(12).is_err());
    }
}
