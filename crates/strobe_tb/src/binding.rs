//! Role-to-signal binding for protocol interfaces.
//!
//! A protocol names its signals by *role* (`tdata`, `tvalid`, ...). An
//! [`InterfaceBinding`] maps each role to a concrete design signal and is
//! validated once, at construction, against the protocol's [`ProtocolRoles`].

use std::collections::{BTreeMap, BTreeSet};

use strobe_common::Bits;
use strobe_sim::{SignalBank, SignalHandle};

use crate::error::{ConfigurationError, HarnessError};
use crate::scheduler::SimContext;

/// The roles a protocol interface is made of.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProtocolRoles {
    /// Protocol name, for messages.
    pub name: &'static str,
    /// Roles every binding must map.
    pub required: &'static [&'static str],
    /// Roles a binding may map.
    pub optional: &'static [&'static str],
}

impl ProtocolRoles {
    /// Whether `role` is required or optional for this protocol.
    pub fn declares(&self, role: &str) -> bool {
        self.required.contains(&role) || self.optional.contains(&role)
    }
}

/// A validated map from protocol roles to design signals.
#[derive(Clone, Debug)]
pub struct InterfaceBinding {
    name: String,
    protocol: &'static str,
    handles: BTreeMap<String, SignalHandle>,
}

impl InterfaceBinding {
    /// Binds `mapping` (role → signal name) against `signals`.
    ///
    /// The mapped roles must be exactly the required roles plus any subset of
    /// the optional ones, and every signal name must exist.
    pub fn new<R, S>(
        name: &str,
        roles: &ProtocolRoles,
        mapping: impl IntoIterator<Item = (R, S)>,
        signals: &SignalBank,
    ) -> Result<Self, ConfigurationError>
    where
        R: Into<String>,
        S: AsRef<str>,
    {
        let mapping: BTreeMap<String, String> = mapping
            .into_iter()
            .map(|(role, signal)| (role.into(), signal.as_ref().to_string()))
            .collect();

        let keys: BTreeSet<&str> = mapping.keys().map(String::as_str).collect();
        let missing: Vec<String> = roles
            .required
            .iter()
            .filter(|role| !keys.contains(**role))
            .map(|role| role.to_string())
            .collect();
        let unexpected: Vec<String> = keys
            .iter()
            .filter(|role| !roles.declares(role))
            .map(|role| role.to_string())
            .collect();
        if !missing.is_empty() || !unexpected.is_empty() {
            return Err(ConfigurationError::Binding {
                interface: name.to_string(),
                missing,
                unexpected,
            });
        }

        let mut handles = BTreeMap::new();
        for (role, signal) in mapping {
            let handle = signals
                .find(&signal)
                .ok_or_else(|| ConfigurationError::UnknownSignal {
                    role: role.clone(),
                    signal: signal.clone(),
                })?;
            handles.insert(role, handle);
        }
        Ok(Self {
            name: name.to_string(),
            protocol: roles.name,
            handles,
        })
    }

    /// Binds every role to `{prefix}_{role}`.
    ///
    /// Optional roles are bound only when the design declares the signal.
    /// The binding is named after the prefix.
    pub fn from_prefix(
        prefix: &str,
        roles: &ProtocolRoles,
        signals: &SignalBank,
    ) -> Result<Self, ConfigurationError> {
        let required = roles
            .required
            .iter()
            .map(|role| (role.to_string(), format!("{prefix}_{role}")));
        let optional = roles
            .optional
            .iter()
            .map(|role| (role.to_string(), format!("{prefix}_{role}")))
            .filter(|(_, signal)| signals.contains(signal));
        Self::new(prefix, roles, required.chain(optional), signals)
    }

    /// The interface name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The protocol this binding was validated against.
    pub fn protocol(&self) -> &'static str {
        self.protocol
    }

    /// The handle bound to `role`, if any.
    pub fn handle(&self, role: &str) -> Option<&SignalHandle> {
        self.handles.get(role)
    }

    /// Whether `role` is bound.
    pub fn has(&self, role: &str) -> bool {
        self.handles.contains_key(role)
    }

    /// The handle bound to `role`, or a binding error naming it as missing.
    pub fn require(&self, role: &str) -> Result<&SignalHandle, ConfigurationError> {
        self.handles
            .get(role)
            .ok_or_else(|| ConfigurationError::Binding {
                interface: self.name.clone(),
                missing: vec![role.to_string()],
                unexpected: Vec::new(),
            })
    }

    /// Bound roles in name order.
    pub fn roles(&self) -> impl Iterator<Item = &str> {
        self.handles.keys().map(String::as_str)
    }

    /// Reads the signal bound to `role`.
    pub fn get<'a>(&self, cx: &'a SimContext<'_>, role: &str) -> Result<&'a Bits, HarnessError> {
        Ok(cx.get(self.require(role)?))
    }

    /// Schedules a write to the signal bound to `role`.
    pub fn set(&self, cx: &mut SimContext<'_>, role: &str, value: Bits) -> Result<(), HarnessError> {
        cx.set(self.require(role)?, value)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::Phase;
    use strobe_common::SimTime;

    const ROLES: ProtocolRoles = ProtocolRoles {
        name: "toy",
        required: &["data", "valid"],
        optional: &["keep"],
    };

    fn bank() -> SignalBank {
        let mut bank = SignalBank::new();
        bank.add("in_data", 8).unwrap();
        bank.add("in_valid", 1).unwrap();
        bank.add("in_keep", 1).unwrap();
        bank.add("out_data", 8).unwrap();
        bank.add("out_valid", 1).unwrap();
        bank
    }

    #[test]
    fn binds_required_roles() {
        let bank = bank();
        let b = InterfaceBinding::new(
            "in",
            &ROLES,
            [("data", "in_data"), ("valid", "in_valid")],
            &bank,
        )
        .unwrap();
        assert_eq!(b.name(), "in");
        assert_eq!(b.protocol(), "toy");
        assert_eq!(b.handle("data").map(|h| h.name()), Some("in_data"));
        assert!(!b.has("keep"));
        assert_eq!(b.roles().collect::<Vec<_>>(), vec!["data", "valid"]);
    }

    #[test]
    fn binds_optional_role() {
        let bank = bank();
        let b = InterfaceBinding::new(
            "in",
            &ROLES,
            [("data", "in_data"), ("valid", "in_valid"), ("keep", "in_keep")],
            &bank,
        )
        .unwrap();
        assert!(b.has("keep"));
    }

    #[test]
    fn reports_missing_and_unexpected_together() {
        let bank = bank();
        let err = InterfaceBinding::new(
            "in",
            &ROLES,
            [("data", "in_data"), ("user", "in_valid")],
            &bank,
        )
        .unwrap_err();
        match err {
            ConfigurationError::Binding {
                interface,
                missing,
                unexpected,
            } => {
                assert_eq!(interface, "in");
                assert_eq!(missing, vec!["valid"]);
                assert_eq!(unexpected, vec!["user"]);
            }
            other => panic!("expected binding error, got {other}"),
        }
    }

    #[test]
    fn unknown_signal_rejected() {
        let bank = bank();
        let err = InterfaceBinding::new(
            "in",
            &ROLES,
            [("data", "in_dat"), ("valid", "in_valid")],
            &bank,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::UnknownSignal { ref role, ref signal } if role == "data" && signal == "in_dat"
        ));
    }

    #[test]
    fn from_prefix_picks_up_optional_roles_present() {
        let bank = bank();
        let with_keep = InterfaceBinding::from_prefix("in", &ROLES, &bank).unwrap();
        assert!(with_keep.has("keep"));
        let without_keep = InterfaceBinding::from_prefix("out", &ROLES, &bank).unwrap();
        assert!(!without_keep.has("keep"));
        assert_eq!(without_keep.require("valid").unwrap().name(), "out_valid");
    }

    #[test]
    fn from_prefix_missing_required_signal() {
        let bank = bank();
        let err = InterfaceBinding::from_prefix("nowhere", &ROLES, &bank).unwrap_err();
        assert!(matches!(err, ConfigurationError::UnknownSignal { .. }));
    }

    #[test]
    fn require_unbound_role() {
        let bank = bank();
        let b = InterfaceBinding::from_prefix("out", &ROLES, &bank).unwrap();
        assert!(matches!(
            b.require("keep"),
            Err(ConfigurationError::Binding { .. })
        ));
    }

    #[test]
    fn role_indexed_read_and_write() {
        let mut bank = bank();
        let b = InterfaceBinding::from_prefix("in", &ROLES, &bank).unwrap();
        {
            let mut cx = SimContext::new(&mut bank, 0, SimTime::zero(), Phase::RisingEdge);
            b.set(&mut cx, "data", Bits::from_u64(0x42, 8).unwrap())
                .unwrap();
            assert!(b.get(&cx, "data").unwrap().is_zero());
        }
        bank.commit_pending();
        let cx = SimContext::new(&mut bank, 0, SimTime::zero(), Phase::ReadOnly);
        assert_eq!(b.get(&cx, "data").unwrap().to_u64(), Some(0x42));
    }
}
