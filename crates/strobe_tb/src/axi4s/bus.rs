use strobe_sim::{SignalBank, SignalHandle};

use crate::binding::InterfaceBinding;
use crate::error::ConfigurationError;

use super::AXI4_STREAM_ROLES;

/// A width-checked AXI4-Stream interface.
#[derive(Clone, Debug)]
pub struct AxiStreamBus {
    binding: InterfaceBinding,
    tdata: SignalHandle,
    tvalid: SignalHandle,
    tready: SignalHandle,
    tlast: SignalHandle,
    tkeep: Option<SignalHandle>,
}

impl AxiStreamBus {
    /// Checks the widths of an AXI4-Stream binding.
    ///
    /// `tvalid`, `tready` and `tlast` must be one bit; `tdata` must be a
    /// positive multiple of 8 bits; `tkeep`, if bound, one bit per byte.
    pub fn new(binding: InterfaceBinding) -> Result<Self, ConfigurationError> {
        let tdata = binding.require("tdata")?.clone();
        if tdata.width() == 0 || tdata.width() % 8 != 0 {
            return Err(ConfigurationError::DataWidth(tdata.width()));
        }
        let tvalid = one_bit(&binding, "tvalid")?;
        let tready = one_bit(&binding, "tready")?;
        let tlast = one_bit(&binding, "tlast")?;
        let tkeep = match binding.handle("tkeep") {
            Some(keep) => {
                check_width("tkeep", keep, tdata.width() / 8)?;
                Some(keep.clone())
            }
            None => None,
        };
        Ok(Self {
            binding,
            tdata,
            tvalid,
            tready,
            tlast,
            tkeep,
        })
    }

    /// Binds `{prefix}_tdata`, `{prefix}_tvalid`, ... and checks widths.
    pub fn from_prefix(prefix: &str, signals: &SignalBank) -> Result<Self, ConfigurationError> {
        Self::new(InterfaceBinding::from_prefix(
            prefix,
            &AXI4_STREAM_ROLES,
            signals,
        )?)
    }

    /// The underlying binding.
    pub fn binding(&self) -> &InterfaceBinding {
        &self.binding
    }

    /// Interface name.
    pub fn name(&self) -> &str {
        self.binding.name()
    }

    /// Bytes per word.
    pub fn byte_width(&self) -> usize {
        (self.tdata.width() / 8) as usize
    }

    /// `tdata`.
    pub fn tdata(&self) -> &SignalHandle {
        &self.tdata
    }

    /// `tvalid`.
    pub fn tvalid(&self) -> &SignalHandle {
        &self.tvalid
    }

    /// `tready`.
    pub fn tready(&self) -> &SignalHandle {
        &self.tready
    }

    /// `tlast`.
    pub fn tlast(&self) -> &SignalHandle {
        &self.tlast
    }

    /// `tkeep`, if bound.
    pub fn tkeep(&self) -> Option<&SignalHandle> {
        self.tkeep.as_ref()
    }
}

fn one_bit(binding: &InterfaceBinding, role: &str) -> Result<SignalHandle, ConfigurationError> {
    let handle = binding.require(role)?;
    check_width(role, handle, 1)?;
    Ok(handle.clone())
}

fn check_width(role: &str, handle: &SignalHandle, expected: u32) -> Result<(), ConfigurationError> {
    if handle.width() != expected {
        return Err(ConfigurationError::RoleWidth {
            role: role.to_string(),
            signal: handle.name().to_string(),
            expected,
            actual: handle.width(),
        });
    }
    Ok(())
}
