//! Registered AXI4-Stream FIFO.

use std::collections::VecDeque;

use tracing::trace;

use crate::design::Design;
use crate::error::SimError;
use crate::signal::SignalBank;

use super::{check_data_width, AxisPorts, Beat};

/// A synchronous FIFO of `depth` words between `s_axis` and `m_axis`.
///
/// `s_axis_tready` is registered: it reflects whether the FIFO had room after
/// the previous edge. `m_axis_tvalid` is high whenever the FIFO holds a word.
/// A depth of 2 behaves as a skid buffer. `rst` (active high, sampled on the
/// edge) empties the FIFO and drops `s_axis_tready`.
#[derive(Debug)]
pub struct AxisFifo {
    data_width: u32,
    depth: usize,
    keep: bool,
    ports: Option<FifoPorts>,
    queue: VecDeque<Beat>,
    can_accept: bool,
}

#[derive(Debug)]
struct FifoPorts {
    rst: crate::signal::SignalHandle,
    s: AxisPorts,
    m: AxisPorts,
}

impl AxisFifo {
    /// Creates a FIFO of `depth` words of `data_width` bits, with or without `tkeep`.
    pub fn new(data_width: u32, depth: usize, keep: bool) -> Result<Self, SimError> {
        check_data_width(data_width)?;
        if depth == 0 {
            return Err(SimError::InvalidDesign {
                reason: "depth must be at least 1".to_string(),
            });
        }
        Ok(Self {
            data_width,
            depth,
            keep,
            ports: None,
            queue: VecDeque::with_capacity(depth),
            can_accept: false,
        })
    }

    /// Words currently held.
    pub fn occupancy(&self) -> usize {
        self.queue.len()
    }
}

impl Design for AxisFifo {
    fn name(&self) -> &str {
        "axis_fifo"
    }

    fn elaborate(&mut self, signals: &mut SignalBank) -> Result<(), SimError> {
        signals.add("clk", 1)?;
        let rst = signals.add("rst", 1)?;
        let s = AxisPorts::declare(signals, "s_axis", self.data_width, self.keep)?;
        let m = AxisPorts::declare(signals, "m_axis", self.data_width, self.keep)?;
        self.ports = Some(FifoPorts { rst, s, m });
        self.can_accept = true;
        Ok(())
    }

    fn clock_edge(&mut self, signals: &mut SignalBank) -> Result<(), SimError> {
        let Some(ports) = &self.ports else {
            return Ok(());
        };
        if signals.get_bool(&ports.rst) {
            self.queue.clear();
            self.can_accept = false;
            return Ok(());
        }

        let pop = !self.queue.is_empty() && signals.get_bool(&ports.m.tready);
        let push = self.can_accept && signals.get_bool(&ports.s.tvalid);
        let incoming = push.then(|| Beat::sample(signals, &ports.s));

        if pop {
            self.queue.pop_front();
        }
        if let Some(beat) = incoming {
            self.queue.push_back(beat);
        }
        self.can_accept = self.queue.len() < self.depth;
        trace!(occupancy = self.queue.len(), pop, push, "fifo edge");
        Ok(())
    }

    fn evaluate(&mut self, signals: &mut SignalBank) -> Result<(), SimError> {
        let Some(ports) = &self.ports else {
            return Ok(());
        };
        signals.deposit_bool(&ports.s.tready, self.can_accept)?;
        match self.queue.front() {
            Some(beat) => {
                beat.present(signals, &ports.m)?;
                signals.deposit_bool(&ports.m.tvalid, true)
            }
            None => {
                Beat::clear(signals, &ports.m)?;
                signals.deposit_bool(&ports.m.tvalid, false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::design::settle;
    use crate::signal::SignalHandle;

    struct Bench {
        fifo: AxisFifo,
        signals: SignalBank,
        cycle: u64,
    }

    impl Bench {
        fn new(depth: usize) -> Self {
            let mut fifo = AxisFifo::new(8, depth, false).unwrap();
            let mut signals = SignalBank::new();
            fifo.elaborate(&mut signals).unwrap();
            settle(&mut fifo, &mut signals, 0).unwrap();
            Self {
                fifo,
                signals,
                cycle: 0,
            }
        }

        fn h(&self, name: &str) -> SignalHandle {
            self.signals.handle(name).unwrap()
        }

        fn drive(&mut self, name: &str, value: u64) {
            let h = self.h(name);
            self.signals.schedule_u64(&h, value).unwrap();
            settle(&mut self.fifo, &mut self.signals, self.cycle).unwrap();
        }

        fn edge(&mut self) {
            self.cycle += 1;
            self.fifo.clock_edge(&mut self.signals).unwrap();
            settle(&mut self.fifo, &mut self.signals, self.cycle).unwrap();
        }

        fn read(&self, name: &str) -> u64 {
            self.signals.get_u64(&self.h(name)).unwrap()
        }
    }

    #[test]
    fn empty_fifo_is_ready_and_not_valid() {
        let b = Bench::new(2);
        assert_eq!(b.read("s_axis_tready"), 1);
        assert_eq!(b.read("m_axis_tvalid"), 0);
    }

    #[test]
    fn word_passes_through_in_one_edge() {
        let mut b = Bench::new(2);
        b.drive("s_axis_tdata", 0xAB);
        b.drive("s_axis_tlast", 1);
        b.drive("s_axis_tvalid", 1);
        b.edge();
        b.drive("s_axis_tvalid", 0);
        assert_eq!(b.read("m_axis_tvalid"), 1);
        assert_eq!(b.read("m_axis_tdata"), 0xAB);
        assert_eq!(b.read("m_axis_tlast"), 1);
        assert_eq!(b.fifo.occupancy(), 1);
    }

    #[test]
    fn fills_and_deasserts_ready() {
        let mut b = Bench::new(2);
        b.drive("s_axis_tvalid", 1);
        b.drive("s_axis_tdata", 1);
        b.edge();
        assert_eq!(b.read("s_axis_tready"), 1);
        b.drive("s_axis_tdata", 2);
        b.edge();
        assert_eq!(b.fifo.occupancy(), 2);
        assert_eq!(b.read("s_axis_tready"), 0);
        // Full: the offered word is not taken.
        b.drive("s_axis_tdata", 3);
        b.edge();
        assert_eq!(b.fifo.occupancy(), 2);
        assert_eq!(b.read("m_axis_tdata"), 1);
    }

    #[test]
    fn drains_in_order() {
        let mut b = Bench::new(4);
        b.drive("s_axis_tvalid", 1);
        for v in 1..=3 {
            b.drive("s_axis_tdata", v);
            b.edge();
        }
        b.drive("s_axis_tvalid", 0);
        b.drive("m_axis_tready", 1);
        let mut out = Vec::new();
        while b.read("m_axis_tvalid") == 1 {
            out.push(b.read("m_axis_tdata"));
            b.edge();
        }
        assert_eq!(out, vec![1, 2, 3]);
    }

    #[test]
    fn simultaneous_push_and_pop_when_full() {
        let mut b = Bench::new(1);
        b.drive("s_axis_tvalid", 1);
        b.drive("s_axis_tdata", 7);
        b.edge();
        assert_eq!(b.read("s_axis_tready"), 0);
        b.drive("m_axis_tready", 1);
        b.edge();
        // Popped 7; ready was low so nothing was pushed.
        assert_eq!(b.fifo.occupancy(), 0);
        assert_eq!(b.read("s_axis_tready"), 1);
    }

    #[test]
    fn reset_clears() {
        let mut b = Bench::new(2);
        b.drive("s_axis_tvalid", 1);
        b.edge();
        assert_eq!(b.fifo.occupancy(), 1);
        b.drive("rst", 1);
        b.edge();
        assert_eq!(b.fifo.occupancy(), 0);
        assert_eq!(b.read("s_axis_tready"), 0);
        assert_eq!(b.read("m_axis_tvalid"), 0);
        b.drive("rst", 0);
        b.edge();
        assert_eq!(b.read("s_axis_tready"), 1);
    }

    #[test]
    fn rejects_zero_depth() {
        assert!(matches!(
            AxisFifo::new(32, 0, true),
            Err(SimError::InvalidDesign { .. })
        ));
    }
}
