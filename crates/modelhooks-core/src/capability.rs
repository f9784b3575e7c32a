//! The closed set of lifecycle capabilities.
//!
//! A capability is an optional hook an entity type may implement. The set is
//! fixed: adding a capability means adding a variant here, a trait in
//! [`crate::hooks`], and a row in the session's verb tables.

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// A recognized lifecycle hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Capability {
    BeforeValidate = 0,
    BeforeSave = 1,
    BeforeCreate = 2,
    BeforeUpdate = 3,
    BeforeDestroy = 4,
    AfterSave = 5,
    AfterCreate = 6,
    AfterUpdate = 7,
    AfterDestroy = 8,
    AfterFind = 9,
}

impl Capability {
    /// Every capability, in declaration order.
    pub const ALL: [Capability; 10] = [
        Capability::BeforeValidate,
        Capability::BeforeSave,
        Capability::BeforeCreate,
        Capability::BeforeUpdate,
        Capability::BeforeDestroy,
        Capability::AfterSave,
        Capability::AfterCreate,
        Capability::AfterUpdate,
        Capability::AfterDestroy,
        Capability::AfterFind,
    ];

    /// The capability's name, e.g. `"BeforeSave"`.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Capability::BeforeValidate => "BeforeValidate",
            Capability::BeforeSave => "BeforeSave",
            Capability::BeforeCreate => "BeforeCreate",
            Capability::BeforeUpdate => "BeforeUpdate",
            Capability::BeforeDestroy => "BeforeDestroy",
            Capability::AfterSave => "AfterSave",
            Capability::AfterCreate => "AfterCreate",
            Capability::AfterUpdate => "AfterUpdate",
            Capability::AfterDestroy => "AfterDestroy",
            Capability::AfterFind => "AfterFind",
        }
    }

    /// The hook method name on the matching trait, e.g. `"before_save"`.
    #[must_use]
    pub const fn method_name(self) -> &'static str {
        match self {
            Capability::BeforeValidate => "before_validate",
            Capability::BeforeSave => "before_save",
            Capability::BeforeCreate => "before_create",
            Capability::BeforeUpdate => "before_update",
            Capability::BeforeDestroy => "before_destroy",
            Capability::AfterSave => "after_save",
            Capability::AfterCreate => "after_create",
            Capability::AfterUpdate => "after_update",
            Capability::AfterDestroy => "after_destroy",
            Capability::AfterFind => "after_find",
        }
    }

    /// Whether this hook runs before the persistence effect.
    #[must_use]
    pub const fn is_before(self) -> bool {
        (self as u8) <= Capability::BeforeDestroy as u8
    }

    /// Whether this hook runs after the persistence effect.
    #[must_use]
    pub const fn is_after(self) -> bool {
        !self.is_before()
    }

    const fn bit(self) -> u16 {
        1 << (self as u8)
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Capability {
    type Err = Error;

    /// Accepts either the capability name (`AfterFind`) or the hook method
    /// name (`after_find`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Capability::ALL
            .into_iter()
            .find(|cap| cap.name() == s || cap.method_name() == s)
            .ok_or_else(|| Error::UnknownCapability(s.to_string()))
    }
}

/// A set of capabilities, stored as a bitset.
///
/// Membership tests are a single mask operation, so detection cost does not
/// grow with the number of capabilities.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CapabilitySet {
    bits: u16,
}

impl CapabilitySet {
    /// The empty set: a type with no hooks.
    pub const EMPTY: CapabilitySet = CapabilitySet { bits: 0 };

    /// Every capability.
    pub const ALL: CapabilitySet = CapabilitySet { bits: (1 << 10) - 1 };

    /// Return a copy of this set with `cap` added.
    #[must_use]
    pub const fn with(self, cap: Capability) -> Self {
        Self {
            bits: self.bits | cap.bit(),
        }
    }

    /// Check whether `cap` is in the set.
    #[must_use]
    pub const fn contains(self, cap: Capability) -> bool {
        self.bits & cap.bit() != 0
    }

    /// Add a capability.
    pub fn insert(&mut self, cap: Capability) {
        self.bits |= cap.bit();
    }

    /// Remove a capability.
    pub fn remove(&mut self, cap: Capability) {
        self.bits &= !cap.bit();
    }

    /// Number of capabilities in the set.
    #[must_use]
    pub const fn len(self) -> usize {
        self.bits.count_ones() as usize
    }

    /// True if no capability is present.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.bits == 0
    }

    /// Iterate the contained capabilities in declaration order.
    pub fn iter(self) -> impl Iterator<Item = Capability> {
        Capability::ALL
            .into_iter()
            .filter(move |cap| self.contains(*cap))
    }
}

impl fmt::Debug for CapabilitySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl FromIterator<Capability> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        let mut set = CapabilitySet::EMPTY;
        for cap in iter {
            set.insert(cap);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip_through_from_str() {
        for cap in Capability::ALL {
            assert_eq!(cap.name().parse::<Capability>().unwrap(), cap);
            assert_eq!(cap.method_name().parse::<Capability>().unwrap(), cap);
        }
    }

    #[test]
    fn test_unknown_name_is_rejected() {
        let err = "AfterLoad".parse::<Capability>().unwrap_err();
        assert!(matches!(err, Error::UnknownCapability(ref name) if name == "AfterLoad"));
    }

    #[test]
    fn test_before_after_split() {
        let before: Vec<_> = Capability::ALL.into_iter().filter(|c| c.is_before()).collect();
        assert_eq!(
            before,
            vec![
                Capability::BeforeValidate,
                Capability::BeforeSave,
                Capability::BeforeCreate,
                Capability::BeforeUpdate,
                Capability::BeforeDestroy,
            ]
        );
        assert!(Capability::AfterFind.is_after());
        assert!(!Capability::AfterSave.is_before());
    }

    #[test]
    fn test_set_membership() {
        let set = CapabilitySet::EMPTY
            .with(Capability::BeforeSave)
            .with(Capability::AfterFind);
        assert!(set.contains(Capability::BeforeSave));
        assert!(set.contains(Capability::AfterFind));
        assert!(!set.contains(Capability::AfterSave));
        assert_eq!(set.len(), 2);
        assert_eq!(
            set.iter().collect::<Vec<_>>(),
            vec![Capability::BeforeSave, Capability::AfterFind]
        );
    }

    #[test]
    fn test_set_insert_remove() {
        let mut set = CapabilitySet::default();
        assert!(set.is_empty());
        set.insert(Capability::AfterDestroy);
        set.insert(Capability::AfterDestroy);
        assert_eq!(set.len(), 1);
        set.remove(Capability::AfterDestroy);
        assert!(set.is_empty());
    }

    #[test]
    fn test_all_set_covers_every_capability() {
        assert_eq!(CapabilitySet::ALL.len(), Capability::ALL.len());
        let collected: CapabilitySet = Capability::ALL.into_iter().collect();
        assert_eq!(collected, CapabilitySet::ALL);
    }
}
