//! Combinational AXI4-Stream loopback.

use crate::design::Design;
use crate::error::SimError;
use crate::signal::SignalBank;

use super::{check_data_width, AxisPorts, Beat};

/// Wires the slave stream straight to the master stream.
///
/// `m_axis_{tdata,tvalid,tlast,tkeep}` follow `s_axis_*` and
/// `s_axis_tready` follows `m_axis_tready`, all combinationally. Reset is
/// declared but ignored.
#[derive(Debug)]
pub struct AxisLoopback {
    data_width: u32,
    keep: bool,
    ports: Option<(AxisPorts, AxisPorts)>,
}

impl AxisLoopback {
    /// Creates a loopback with `data_width`-bit payload, with or without `tkeep`.
    pub fn new(data_width: u32, keep: bool) -> Result<Self, SimError> {
        check_data_width(data_width)?;
        Ok(Self {
            data_width,
            keep,
            ports: None,
        })
    }
}

impl Design for AxisLoopback {
    fn name(&self) -> &str {
        "axis_loopback"
    }

    fn elaborate(&mut self, signals: &mut SignalBank) -> Result<(), SimError> {
        signals.add("clk", 1)?;
        signals.add("rst", 1)?;
        let s = AxisPorts::declare(signals, "s_axis", self.data_width, self.keep)?;
        let m = AxisPorts::declare(signals, "m_axis", self.data_width, self.keep)?;
        self.ports = Some((s, m));
        Ok(())
    }

    fn clock_edge(&mut self, _signals: &mut SignalBank) -> Result<(), SimError> {
        Ok(())
    }

    fn evaluate(&mut self, signals: &mut SignalBank) -> Result<(), SimError> {
        let Some((s, m)) = &self.ports else {
            return Ok(());
        };
        Beat::sample(signals, s).present(signals, m)?;
        let valid = signals.get_bool(&s.tvalid);
        signals.deposit_bool(&m.tvalid, valid)?;
        let ready = signals.get_bool(&m.tready);
        signals.deposit_bool(&s.tready, ready)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::design::settle;

    #[test]
    fn forwards_every_signal() {
        let mut design = AxisLoopback::new(32, true).unwrap();
        let mut signals = SignalBank::new();
        design.elaborate(&mut signals).unwrap();
        let h = |name: &str| signals.handle(name).unwrap();
        let (s_data, s_valid, s_last, s_keep) = (
            h("s_axis_tdata"),
            h("s_axis_tvalid"),
            h("s_axis_tlast"),
            h("s_axis_tkeep"),
        );
        let (m_data, m_valid, m_last, m_keep, m_ready, s_ready) = (
            h("m_axis_tdata"),
            h("m_axis_tvalid"),
            h("m_axis_tlast"),
            h("m_axis_tkeep"),
            h("m_axis_tready"),
            h("s_axis_tready"),
        );

        signals.schedule_u64(&s_data, 0xEFBE_ADDE).unwrap();
        signals.schedule_bool(&s_valid, true).unwrap();
        signals.schedule_bool(&s_last, true).unwrap();
        signals.schedule_u64(&s_keep, 0b0111).unwrap();
        signals.schedule_bool(&m_ready, true).unwrap();
        settle(&mut design, &mut signals, 0).unwrap();

        assert_eq!(signals.get_u64(&m_data), Some(0xEFBE_ADDE));
        assert!(signals.get_bool(&m_valid));
        assert!(signals.get_bool(&m_last));
        assert_eq!(signals.get_u64(&m_keep), Some(0b0111));
        assert!(signals.get_bool(&s_ready));
    }

    #[test]
    fn rejects_odd_width() {
        assert!(matches!(
            AxisLoopback::new(9, false),
            Err(SimError::InvalidDesign { .. })
        ));
    }
}
