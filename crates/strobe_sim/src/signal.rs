//! Signal storage with immediate and scheduled writes.
//!
//! Every design signal lives in a [`SignalBank`] under a flat [`SignalId`].
//! Writes come in two flavours:
//!
//! - *deposits* replace the current value at once and are used by designs
//!   while evaluating, and by the clock generator;
//! - *scheduled* writes are buffered until [`SignalBank::commit_pending`],
//!   which the settle loop calls, so they become visible only after the next
//!   settle phase. When one signal is scheduled twice, the last write wins.
//!
//! Both flavours are width-checked.

use std::collections::HashMap;
use std::rc::Rc;

use strobe_common::Bits;

use crate::error::SimError;

/// Opaque ID of a signal within one [`SignalBank`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct SignalId(u32);

impl SignalId {
    /// Creates a `SignalId` from a raw index.
    pub fn from_raw(index: u32) -> Self {
        Self(index)
    }

    /// Returns the raw index.
    pub fn as_raw(self) -> u32 {
        self.0
    }
}

/// A cheap, clonable reference to one design signal.
///
/// Carries the name and width so that error messages and width checks never
/// need to go back to the bank.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SignalHandle {
    id: SignalId,
    name: Rc<str>,
    width: u32,
}

impl SignalHandle {
    /// The signal's ID.
    pub fn id(&self) -> SignalId {
        self.id
    }

    /// The signal's name as declared by the design.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The signal's width in bits.
    pub fn width(&self) -> u32 {
        self.width
    }
}

/// The runtime state of a single signal.
#[derive(Clone, Debug)]
pub struct SignalState {
    /// Name as declared by the design.
    pub name: Rc<str>,
    /// Width in bits.
    pub width: u32,
    /// Current value.
    pub value: Bits,
}

/// The arena of all design signals.
#[derive(Debug, Default)]
pub struct SignalBank {
    signals: Vec<SignalState>,
    by_name: HashMap<Rc<str>, SignalId>,
    pending: Vec<(SignalId, Bits)>,
    dirty: bool,
}

impl SignalBank {
    /// Creates an empty bank.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a signal initialized to zero and returns its handle.
    pub fn add(&mut self, name: &str, width: u32) -> Result<SignalHandle, SimError> {
        if self.by_name.contains_key(name) {
            return Err(SimError::DuplicateSignal {
                name: name.to_string(),
            });
        }
        if width == 0 {
            return Err(SimError::InvalidDesign {
                reason: format!("signal '{name}' has zero width"),
            });
        }
        let id = SignalId::from_raw(self.signals.len() as u32);
        let name: Rc<str> = Rc::from(name);
        self.signals.push(SignalState {
            name: Rc::clone(&name),
            width,
            value: Bits::zero(width),
        });
        self.by_name.insert(Rc::clone(&name), id);
        Ok(SignalHandle { id, name, width })
    }

    /// Looks up a signal by name.
    pub fn find(&self, name: &str) -> Option<SignalHandle> {
        let id = *self.by_name.get(name)?;
        let state = &self.signals[id.as_raw() as usize];
        Some(SignalHandle {
            id,
            name: Rc::clone(&state.name),
            width: state.width,
        })
    }

    /// Looks up a signal by name, failing with [`SimError::UnknownSignal`].
    pub fn handle(&self, name: &str) -> Result<SignalHandle, SimError> {
        self.find(name).ok_or_else(|| SimError::UnknownSignal {
            name: name.to_string(),
        })
    }

    /// Whether a signal with this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.by_name.contains_key(name)
    }

    /// Number of declared signals.
    pub fn len(&self) -> usize {
        self.signals.len()
    }

    /// Whether no signals are declared.
    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }

    /// Iterates over all signal states in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &SignalState> {
        self.signals.iter()
    }

    /// The current value of a signal.
    pub fn value(&self, handle: &SignalHandle) -> &Bits {
        &self.signals[handle.id.as_raw() as usize].value
    }

    /// The current value of a signal as a boolean (any bit set).
    pub fn get_bool(&self, handle: &SignalHandle) -> bool {
        !self.value(handle).is_zero()
    }

    /// The current value of a signal as a `u64`, if it fits.
    pub fn get_u64(&self, handle: &SignalHandle) -> Option<u64> {
        self.value(handle).to_u64()
    }

    /// Replaces a signal's value immediately.
    pub fn deposit(&mut self, handle: &SignalHandle, value: Bits) -> Result<(), SimError> {
        check_width(handle, &value)?;
        let slot = &mut self.signals[handle.id.as_raw() as usize].value;
        if *slot != value {
            *slot = value;
            self.dirty = true;
        }
        Ok(())
    }

    /// Replaces a signal's value immediately from an integer.
    pub fn deposit_u64(&mut self, handle: &SignalHandle, value: u64) -> Result<(), SimError> {
        let bits = bits_from_u64(handle, value)?;
        self.deposit(handle, bits)
    }

    /// Replaces a signal's value immediately from a boolean.
    pub fn deposit_bool(&mut self, handle: &SignalHandle, value: bool) -> Result<(), SimError> {
        self.deposit_u64(handle, u64::from(value))
    }

    /// Buffers a write until the next [`commit_pending`](Self::commit_pending).
    pub fn schedule(&mut self, handle: &SignalHandle, value: Bits) -> Result<(), SimError> {
        check_width(handle, &value)?;
        if let Some(slot) = self.pending.iter_mut().find(|(id, _)| *id == handle.id) {
            slot.1 = value;
        } else {
            self.pending.push((handle.id, value));
        }
        Ok(())
    }

    /// Buffers an integer write.
    pub fn schedule_u64(&mut self, handle: &SignalHandle, value: u64) -> Result<(), SimError> {
        let bits = bits_from_u64(handle, value)?;
        self.schedule(handle, bits)
    }

    /// Buffers a boolean write.
    pub fn schedule_bool(&mut self, handle: &SignalHandle, value: bool) -> Result<(), SimError> {
        self.schedule_u64(handle, u64::from(value))
    }

    /// Whether any scheduled writes are waiting to be committed.
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Applies all scheduled writes in the order they were first scheduled.
    ///
    /// Returns true if any signal changed value.
    pub fn commit_pending(&mut self) -> bool {
        let mut changed = false;
        for (id, value) in std::mem::take(&mut self.pending) {
            let slot = &mut self.signals[id.as_raw() as usize].value;
            if *slot != value {
                *slot = value;
                changed = true;
            }
        }
        self.dirty |= changed;
        changed
    }

    /// Whether any value changed since the last [`clear_dirty`](Self::clear_dirty).
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Resets the change flag, returning its previous state.
    pub fn clear_dirty(&mut self) -> bool {
        std::mem::replace(&mut self.dirty, false)
    }
}

fn check_width(handle: &SignalHandle, value: &Bits) -> Result<(), SimError> {
    if value.width() != handle.width {
        return Err(SimError::WidthMismatch {
            signal: handle.name().to_string(),
            expected: handle.width,
            actual: value.width(),
        });
    }
    Ok(())
}

fn bits_from_u64(handle: &SignalHandle, value: u64) -> Result<Bits, SimError> {
    Bits::from_u64(value, handle.width).map_err(|_| SimError::ValueOutOfRange {
        signal: handle.name().to_string(),
        value,
        width: handle.width,
    })
}
