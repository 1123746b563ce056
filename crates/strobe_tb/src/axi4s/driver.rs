use rand::rngs::StdRng;
use rand::Rng;
use strobe_common::Bits;
use strobe_config::RunConfig;
use tracing::trace;

use crate::driver::{DriveLogic, DriveStatus};
use crate::error::{ConfigurationError, HarnessError};
use crate::scheduler::{SimContext, Suspend};
use crate::transaction::Transaction;

use super::AxiStreamBus;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    Idle,
    /// Rising-edge phase: put the next word on `tdata`/`tlast`/`tkeep`.
    Present,
    /// Rising-edge phase: redraw `tvalid`.
    Draw,
    /// Read-only phase: did `tvalid` come up?
    CheckValid,
    /// Read-only phase: `tvalid` is high, waiting for `tready`.
    AwaitReady,
}

/// Drives transactions onto an AXI4-Stream producer interface.
///
/// Each transaction is split into words of `tdata` width; the last word is
/// zero-padded and `tkeep` covers only its real bytes. On every edge before
/// a word is offered, `tvalid` is held low with the configured stall
/// probability. Once `tvalid` is seen high it stays high until `tready`
/// accepts the word. After the final word, `tvalid`, `tlast` and `tkeep`
/// return low.
#[derive(Debug)]
pub struct AxiStreamDriveLogic {
    bus: AxiStreamBus,
    stall_probability: f64,
    bytes: Vec<u8>,
    offset: usize,
    state: State,
}

impl AxiStreamDriveLogic {
    /// Creates drive logic for `bus` with no stalls until configured.
    pub fn new(bus: AxiStreamBus) -> Self {
        Self {
            bus,
            stall_probability: 0.0,
            bytes: Vec::new(),
            offset: 0,
            state: State::Idle,
        }
    }

    /// The bus being driven.
    pub fn bus(&self) -> &AxiStreamBus {
        &self.bus
    }

    /// Probability that `tvalid` is held low on a given edge.
    pub fn stall_probability(&self) -> f64 {
        self.stall_probability
    }

    fn present(&self, cx: &mut SimContext<'_>) -> Result<(), HarnessError> {
        let byte_width = self.bus.byte_width();
        let end = (self.offset + byte_width).min(self.bytes.len());
        let chunk = &self.bytes[self.offset..end];
        let data = Bits::from_le_bytes(chunk, self.bus.tdata().width()).map_err(|e| {
            HarnessError::runtime(format!("axi4-stream driver '{}'", self.bus.name()), e.to_string())
        })?;
        trace!(
            bus = self.bus.name(),
            cycle = cx.cycle(),
            offset = self.offset,
            last = end == self.bytes.len(),
            "present word"
        );
        cx.set(self.bus.tdata(), data)?;
        cx.set_bool(self.bus.tlast(), end == self.bytes.len())?;
        if let Some(keep) = self.bus.tkeep() {
            cx.set(keep, Bits::low_mask(keep.width(), chunk.len() as u32))?;
        }
        Ok(())
    }

    fn release(&self, cx: &mut SimContext<'_>) -> Result<(), HarnessError> {
        cx.set_bool(self.bus.tvalid(), false)?;
        cx.set_bool(self.bus.tlast(), false)?;
        if let Some(keep) = self.bus.tkeep() {
            cx.set(keep, Bits::zero(keep.width()))?;
        }
        Ok(())
    }
}

impl DriveLogic for AxiStreamDriveLogic {
    fn configure(&mut self, config: &RunConfig) {
        self.stall_probability = config.driver_stall_probability;
    }

    fn validate(&self, index: usize, transaction: &Transaction) -> Result<(), ConfigurationError> {
        if transaction.is_empty() {
            return Err(ConfigurationError::EmptyTransaction { index });
        }
        let bytes = self.bus.byte_width();
        if self.bus.tkeep().is_none() && transaction.len() % bytes != 0 {
            return Err(ConfigurationError::UnalignedTransaction {
                index,
                len: transaction.len(),
                bytes,
            });
        }
        Ok(())
    }

    fn begin(&mut self, transaction: &Transaction) {
        self.bytes = transaction.as_bytes().to_vec();
        self.offset = 0;
        self.state = State::Present;
    }

    fn resume(
        &mut self,
        cx: &mut SimContext<'_>,
        rng: &mut StdRng,
    ) -> Result<DriveStatus, HarnessError> {
        loop {
            match self.state {
                State::Idle => return Ok(DriveStatus::Complete),
                State::Present => {
                    self.present(cx)?;
                    self.state = State::Draw;
                }
                State::Draw => {
                    let valid = !rng.gen_bool(self.stall_probability);
                    cx.set_bool(self.bus.tvalid(), valid)?;
                    self.state = State::CheckValid;
                    return Ok(DriveStatus::Pending(Suspend::ReadOnly));
                }
                State::CheckValid => {
                    if cx.get_bool(self.bus.tvalid()) {
                        self.state = State::AwaitReady;
                    } else {
                        self.state = State::Draw;
                        return Ok(DriveStatus::Pending(Suspend::RisingEdge));
                    }
                }
                State::AwaitReady => {
                    if !cx.get_bool(self.bus.tready()) {
                        return Ok(DriveStatus::Pending(Suspend::ReadOnly));
                    }
                    self.offset += self.bus.byte_width();
                    if self.offset < self.bytes.len() {
                        self.state = State::Present;
                        return Ok(DriveStatus::Pending(Suspend::RisingEdge));
                    }
                    // Scheduled now, committed after the next edge.
                    self.release(cx)?;
                    self.state = State::Idle;
                    return Ok(DriveStatus::Complete);
                }
            }
        }
    }

    fn cancel(&mut self, cx: &mut SimContext<'_>) -> Result<(), HarnessError> {
        self.state = State::Idle;
        self.release(cx)
    }
}
