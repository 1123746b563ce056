use rand::rngs::StdRng;
use rand::Rng;
use strobe_config::RunConfig;
use tracing::trace;

use crate::error::HarnessError;
use crate::monitor::{Emit, ReceiveLogic};
use crate::scheduler::{Phase, SimContext, Suspend};
use crate::transaction::Transaction;

use super::AxiStreamBus;

/// Reassembles transactions from an AXI4-Stream consumer interface.
///
/// On every edge `tready` is redrawn, low with the configured stall
/// probability. Once the design has settled, an accepted word
/// (`tvalid && tready`) contributes the bytes of every lane whose `tkeep`
/// bit is set (all lanes when `tkeep` is not bound), low lane first. A word
/// with `tlast` completes the transaction.
#[derive(Debug)]
pub struct AxiStreamReceiveLogic {
    bus: AxiStreamBus,
    stall_probability: f64,
    buffer: Vec<u8>,
    beats: u64,
}

impl AxiStreamReceiveLogic {
    /// Creates receive logic for `bus` with no stalls until configured.
    pub fn new(bus: AxiStreamBus) -> Self {
        Self {
            bus,
            stall_probability: 0.0,
            buffer: Vec::new(),
            beats: 0,
        }
    }

    /// The bus being observed.
    pub fn bus(&self) -> &AxiStreamBus {
        &self.bus
    }

    /// Words accepted so far, across all transactions.
    pub fn beats(&self) -> u64 {
        self.beats
    }

    fn sample(&mut self, cx: &SimContext<'_>) -> Option<Transaction> {
        if !(cx.get_bool(self.bus.tvalid()) && cx.get_bool(self.bus.tready())) {
            return None;
        }
        self.beats += 1;
        let data = cx.get(self.bus.tdata()).to_le_bytes();
        let keep = self.bus.tkeep().map(|k| cx.get(k));
        for (lane, byte) in data.into_iter().enumerate() {
            if keep.map_or(true, |k| k.bit(lane as u32)) {
                self.buffer.push(byte);
            }
        }
        let last = cx.get_bool(self.bus.tlast());
        trace!(
            bus = self.bus.name(),
            cycle = cx.cycle(),
            bytes = self.buffer.len(),
            last,
            "accept word"
        );
        last.then(|| Transaction::new(std::mem::take(&mut self.buffer)))
    }
}

impl ReceiveLogic for AxiStreamReceiveLogic {
    fn configure(&mut self, config: &RunConfig) {
        self.stall_probability = config.monitor_stall_probability;
    }

    fn resume(
        &mut self,
        cx: &mut SimContext<'_>,
        rng: &mut StdRng,
        emit: &mut Emit<'_>,
    ) -> Result<Suspend, HarnessError> {
        match cx.phase() {
            Phase::RisingEdge => {
                let ready = !rng.gen_bool(self.stall_probability);
                cx.set_bool(self.bus.tready(), ready)?;
                Ok(Suspend::ReadOnly)
            }
            Phase::ReadOnly => {
                if let Some(transaction) = self.sample(cx) {
                    emit(transaction)?;
                }
                Ok(Suspend::RisingEdge)
            }
        }
    }

    fn cancel(&mut self, cx: &mut SimContext<'_>) -> Result<(), HarnessError> {
        cx.set_bool(self.bus.tready(), false)?;
        self.buffer.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use strobe_common::SimTime;
    use strobe_sim::SignalBank;

    fn bus(keep: bool) -> (SignalBank, AxiStreamBus) {
        let mut bank = SignalBank::new();
        bank.add("m_tdata", 32).unwrap();
        bank.add("m_tvalid", 1).unwrap();
        bank.add("m_tready", 1).unwrap();
        bank.add("m_tlast", 1).unwrap();
        if keep {
            bank.add("m_tkeep", 4).unwrap();
        }
        let bus = AxiStreamBus::from_prefix("m", &bank).unwrap();
        (bank, bus)
    }

    /// One full cycle: edge (draw ready), commit, then settle-phase sample.
    fn cycle(
        logic: &mut AxiStreamReceiveLogic,
        bank: &mut SignalBank,
        rng: &mut StdRng,
        out: &mut Vec<Transaction>,
    ) {
        let mut emit = |t: Transaction| -> Result<(), HarnessError> {
            out.push(t);
            Ok(())
        };
        let mut cx = SimContext::new(bank, 1, SimTime::zero(), Phase::RisingEdge);
        assert_eq!(
            logic.resume(&mut cx, rng, &mut emit).unwrap(),
            Suspend::ReadOnly
        );
        bank.commit_pending();
        let mut cx = SimContext::new(bank, 1, SimTime::zero(), Phase::ReadOnly);
        assert_eq!(
            logic.resume(&mut cx, rng, &mut emit).unwrap(),
            Suspend::RisingEdge
        );
    }

    fn word(bank: &mut SignalBank, bus: &AxiStreamBus, data: u64, keep: u64, last: bool) {
        bank.deposit_u64(bus.tdata(), data).unwrap();
        bank.deposit_bool(bus.tvalid(), true).unwrap();
        bank.deposit_bool(bus.tlast(), last).unwrap();
        if let Some(k) = bus.tkeep() {
            bank.deposit_u64(k, keep).unwrap();
        }
    }

    #[test]
    fn reassembles_keep_masked_packet() {
        let (mut bank, bus) = bus(true);
        let mut logic = AxiStreamReceiveLogic::new(bus.clone());
        let mut rng = StdRng::seed_from_u64(0);
        let mut out = Vec::new();

        word(&mut bank, &bus, 0x0403_0201, 0b1111, false);
        cycle(&mut logic, &mut bank, &mut rng, &mut out);
        assert!(out.is_empty());
        word(&mut bank, &bus, 0x0000_0605, 0b0011, true);
        cycle(&mut logic, &mut bank, &mut rng, &mut out);
        assert_eq!(out, vec![Transaction::from([1, 2, 3, 4, 5, 6])]);
        assert_eq!(logic.beats(), 2);
    }

    #[test]
    fn all_lanes_valid_without_keep() {
        let (mut bank, bus) = bus(false);
        let mut logic = AxiStreamReceiveLogic::new(bus.clone());
        let mut rng = StdRng::seed_from_u64(0);
        let mut out = Vec::new();
        word(&mut bank, &bus, 0xEFBE_ADDE, 0, true);
        cycle(&mut logic, &mut bank, &mut rng, &mut out);
        assert_eq!(out, vec![Transaction::from([0xDE, 0xAD, 0xBE, 0xEF])]);
    }

    #[test]
    fn idle_bus_emits_nothing() {
        let (mut bank, bus) = bus(true);
        let mut logic = AxiStreamReceiveLogic::new(bus.clone());
        let mut rng = StdRng::seed_from_u64(0);
        let mut out = Vec::new();
        for _ in 0..5 {
            cycle(&mut logic, &mut bank, &mut rng, &mut out);
        }
        assert!(out.is_empty());
        assert_eq!(logic.beats(), 0);
        assert!(bank.get_bool(bus.tready()));
    }

    #[test]
    fn stalled_ready_drops_no_words() {
        let (mut bank, bus) = bus(true);
        let mut logic = AxiStreamReceiveLogic::new(bus.clone());
        logic.configure(&RunConfig {
            monitor_stall_probability: 1.0,
            ..RunConfig::default()
        });
        let mut rng = StdRng::seed_from_u64(0);
        let mut out = Vec::new();
        word(&mut bank, &bus, 0x11, 0b0001, true);
        for _ in 0..5 {
            cycle(&mut logic, &mut bank, &mut rng, &mut out);
            assert!(!bank.get_bool(bus.tready()));
        }
        assert!(out.is_empty());
    }

    #[test]
    fn cancel_discards_partial_packet() {
        let (mut bank, bus) = bus(true);
        let mut logic = AxiStreamReceiveLogic::new(bus.clone());
        let mut rng = StdRng::seed_from_u64(0);
        let mut out = Vec::new();

        word(&mut bank, &bus, 0x0403_0201, 0b1111, false);
        cycle(&mut logic, &mut bank, &mut rng, &mut out);
        assert!(out.is_empty());

        let mut cx = SimContext::new(&mut bank, 2, SimTime::zero(), Phase::RisingEdge);
        logic.cancel(&mut cx).unwrap();
        bank.commit_pending();
        assert!(!bank.get_bool(bus.tready()));

        word(&mut bank, &bus, 0x0000_BBAA, 0b0011, true);
        cycle(&mut logic, &mut bank, &mut rng, &mut out);
        assert_eq!(out, vec![Transaction::from([0xAA, 0xBB])]);
    }
}
