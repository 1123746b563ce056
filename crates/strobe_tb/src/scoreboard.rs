//! In-order comparison of expected against received transactions.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use strobe_config::RunConfig;
use tracing::{debug, info};

use crate::error::HarnessError;
use crate::transaction::Transaction;

/// Callback through which drivers report expected and monitors report
/// received transactions.
pub type TransactionCallback = Box<dyn FnMut(&Transaction) -> Result<(), HarnessError>>;

type Model = Box<dyn FnMut(Transaction) -> Transaction>;

/// Two FIFO queues and a match counter.
///
/// Every `expect` or `receive` appends to its queue and then pops matching
/// heads while both queues are non-empty. The first unequal pair of heads
/// is a fatal [`HarnessError::ScoreboardMismatch`]. The run passes once the
/// match counter reaches the target.
#[derive(Default)]
pub struct Scoreboard {
    expected: VecDeque<Transaction>,
    received: VecDeque<Transaction>,
    matches: u64,
    target: Option<u64>,
    model: Option<Model>,
}

impl Scoreboard {
    /// An empty scoreboard with no target.
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies `model` to every expected transaction before it is queued.
    ///
    /// Use it when the design transforms its input, so that expected values
    /// are what the design should emit rather than what was driven.
    pub fn with_model(mut self, model: impl FnMut(Transaction) -> Transaction + 'static) -> Self {
        self.model = Some(Box::new(model));
        self
    }

    /// Takes the match target from the run configuration.
    pub fn set_config(&mut self, config: &RunConfig) {
        self.target = config.scoreboard_expected_matches;
    }

    /// Sets the number of matches that completes the run.
    pub fn set_target(&mut self, target: u64) {
        self.target = Some(target);
    }

    /// The match target, if set.
    pub fn target(&self) -> Option<u64> {
        self.target
    }

    /// Queues a transaction a driver is about to send.
    pub fn expect(&mut self, transaction: Transaction) -> Result<(), HarnessError> {
        let transaction = match self.model.as_mut() {
            Some(model) => model(transaction),
            None => transaction,
        };
        debug!(%transaction, "expect");
        self.expected.push_back(transaction);
        self.resolve()
    }

    /// Queues a transaction a monitor reconstructed.
    pub fn receive(&mut self, transaction: Transaction) -> Result<(), HarnessError> {
        debug!(%transaction, "receive");
        self.received.push_back(transaction);
        self.resolve()
    }

    /// Pops equal heads until one queue is empty or the heads differ.
    pub fn resolve(&mut self) -> Result<(), HarnessError> {
        while let (Some(expected), Some(received)) = (self.expected.front(), self.received.front())
        {
            if expected != received {
                return Err(HarnessError::ScoreboardMismatch {
                    expected: expected.clone(),
                    received: received.clone(),
                    matched: self.matches,
                    pending_expected: self.expected.len(),
                    pending_received: self.received.len(),
                });
            }
            self.expected.pop_front();
            self.received.pop_front();
            self.matches += 1;
            debug!(matches = self.matches, target = ?self.target, "match");
            if self.target == Some(self.matches) {
                info!(matches = self.matches, "scoreboard target reached");
            }
        }
        Ok(())
    }

    /// Matches counted so far.
    pub fn matches(&self) -> u64 {
        self.matches
    }

    /// Expected transactions not yet matched.
    pub fn pending_expected(&self) -> usize {
        self.expected.len()
    }

    /// Received transactions not yet matched.
    pub fn pending_received(&self) -> usize {
        self.received.len()
    }

    /// Whether the match counter has reached the target.
    pub fn is_complete(&self) -> bool {
        self.target.is_some_and(|target| self.matches >= target)
    }
}

impl fmt::Debug for Scoreboard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scoreboard")
            .field("expected", &self.expected)
            .field("received", &self.received)
            .field("matches", &self.matches)
            .field("target", &self.target)
            .field("model", &self.model.is_some())
            .finish()
    }
}

/// A [`Scoreboard`] shared between the drivers and monitors of one run.
#[derive(Clone, Debug, Default)]
pub struct SharedScoreboard(Rc<RefCell<Scoreboard>>);

impl SharedScoreboard {
    /// Wraps a scoreboard for sharing.
    pub fn new(scoreboard: Scoreboard) -> Self {
        Self(Rc::new(RefCell::new(scoreboard)))
    }

    /// A callback that forwards to [`Scoreboard::expect`].
    pub fn expect_callback(&self) -> TransactionCallback {
        let inner = Rc::clone(&self.0);
        Box::new(move |t| inner.borrow_mut().expect(t.clone()))
    }

    /// A callback that forwards to [`Scoreboard::receive`].
    pub fn receive_callback(&self) -> TransactionCallback {
        let inner = Rc::clone(&self.0);
        Box::new(move |t| inner.borrow_mut().receive(t.clone()))
    }

    /// Runs `f` with shared access to the scoreboard.
    pub fn with<R>(&self, f: impl FnOnce(&Scoreboard) -> R) -> R {
        f(&self.0.borrow())
    }

    /// Runs `f` with exclusive access to the scoreboard.
    pub fn with_mut<R>(&self, f: impl FnOnce(&mut Scoreboard) -> R) -> R {
        f(&mut self.0.borrow_mut())
    }

    /// See [`Scoreboard::matches`].
    pub fn matches(&self) -> u64 {
        self.0.borrow().matches()
    }

    /// See [`Scoreboard::is_complete`].
    pub fn is_complete(&self) -> bool {
        self.0.borrow().is_complete()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(bytes: &[u8]) -> Transaction {
        Transaction::from(bytes)
    }

    #[test]
    fn matches_in_order() {
        let mut sb = Scoreboard::new();
        sb.set_target(2);
        sb.expect(t(&[1])).unwrap();
        sb.expect(t(&[2])).unwrap();
        assert_eq!(sb.pending_expected(), 2);
        sb.receive(t(&[1])).unwrap();
        assert_eq!(sb.matches(), 1);
        assert!(!sb.is_complete());
        sb.receive(t(&[2])).unwrap();
        assert_eq!(sb.matches(), 2);
        assert!(sb.is_complete());
        assert_eq!(sb.pending_expected(), 0);
        assert_eq!(sb.pending_received(), 0);
    }

    #[test]
    fn receive_before_expect_still_matches() {
        let mut sb = Scoreboard::new();
        sb.receive(t(&[7, 7])).unwrap();
        assert_eq!(sb.pending_received(), 1);
        sb.expect(t(&[7, 7])).unwrap();
        assert_eq!(sb.matches(), 1);
    }

    #[test]
    fn swapped_order_is_a_mismatch() {
        let mut sb = Scoreboard::new();
        sb.expect(t(&[0xA])).unwrap();
        sb.expect(t(&[0xB])).unwrap();
        let err = sb.receive(t(&[0xB])).unwrap_err();
        match err {
            HarnessError::ScoreboardMismatch {
                expected,
                received,
                matched,
                pending_expected,
                pending_received,
            } => {
                assert_eq!(expected, t(&[0xA]));
                assert_eq!(received, t(&[0xB]));
                assert_eq!(matched, 0);
                assert_eq!(pending_expected, 2);
                assert_eq!(pending_received, 1);
            }
            other => panic!("expected mismatch, got {other}"),
        }
    }

    #[test]
    fn no_target_never_completes() {
        let mut sb = Scoreboard::new();
        sb.expect(t(&[1])).unwrap();
        sb.receive(t(&[1])).unwrap();
        assert!(!sb.is_complete());
    }

    #[test]
    fn target_from_config() {
        let mut sb = Scoreboard::new();
        let config = RunConfig {
            scoreboard_expected_matches: Some(3),
            ..RunConfig::default()
        };
        sb.set_config(&config);
        assert_eq!(sb.target(), Some(3));
    }

    #[test]
    fn model_transforms_expected() {
        let mut sb = Scoreboard::new().with_model(|t| {
            Transaction::from(t.as_bytes().iter().map(|b| b ^ 0xFF).collect::<Vec<u8>>())
        });
        sb.expect(t(&[0x00, 0x0F])).unwrap();
        sb.receive(t(&[0xFF, 0xF0])).unwrap();
        assert_eq!(sb.matches(), 1);
    }

    #[test]
    fn shared_callbacks_feed_one_scoreboard() {
        let mut inner = Scoreboard::new();
        inner.set_target(1);
        let shared = SharedScoreboard::new(inner);
        let mut expect = shared.expect_callback();
        let mut receive = shared.receive_callback();
        expect(&t(&[5])).unwrap();
        receive(&t(&[5])).unwrap();
        assert_eq!(shared.matches(), 1);
        assert!(shared.is_complete());
        assert_eq!(shared.with(|sb| sb.pending_expected()), 0);
    }
}
