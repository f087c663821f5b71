// SPDX-FileCopyrightText: 2026 Rivet Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The closed set of hooks a plugin may implement.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// A named capability a plugin may implement.
///
/// The set is fixed: adding a kind means adding a method to
/// [`Plugin`](crate::plugin::Plugin) and a dispatch arm, not configuration.
/// Hook names coming from configuration or the command line are parsed with
/// [`FromStr`](std::str::FromStr), so an unrecognized name is rejected before
/// it ever reaches the dispatcher.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum HookKind {
    PuppetLibrary,
    ResolveReference,
    SecretEncrypt,
    SecretDecrypt,
    SecretCreatekeys,
    ValidateResolveReference,
}

impl HookKind {
    /// Every hook kind, in declaration order.
    pub const ALL: [HookKind; 6] = [
        HookKind::PuppetLibrary,
        HookKind::ResolveReference,
        HookKind::SecretEncrypt,
        HookKind::SecretDecrypt,
        HookKind::SecretCreatekeys,
        HookKind::ValidateResolveReference,
    ];

    const fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

/// The set of hooks a plugin declares.
///
/// Stored as a bitset so membership checks on the dispatch path are a mask
/// test.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct HookSet(u8);

impl HookSet {
    pub const EMPTY: HookSet = HookSet(0);

    /// Set containing every hook kind.
    pub const fn all() -> Self {
        let mut bits = 0;
        let mut i = 0;
        while i < HookKind::ALL.len() {
            bits |= HookKind::ALL[i].bit();
            i += 1;
        }
        HookSet(bits)
    }

    /// Returns a copy of the set with `kind` added. Usable in `const` items.
    pub const fn with(self, kind: HookKind) -> Self {
        HookSet(self.0 | kind.bit())
    }

    pub fn insert(&mut self, kind: HookKind) {
        self.0 |= kind.bit();
    }

    pub const fn contains(self, kind: HookKind) -> bool {
        self.0 & kind.bit() != 0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// Iterate the members in declaration order.
    pub fn iter(self) -> impl Iterator<Item = HookKind> {
        HookKind::ALL.into_iter().filter(move |k| self.contains(*k))
    }
}

impl FromIterator<HookKind> for HookSet {
    fn from_iter<I: IntoIterator<Item = HookKind>>(iter: I) -> Self {
        let mut set = HookSet::EMPTY;
        for kind in iter {
            set.insert(kind);
        }
        set
    }
}

impl<const N: usize> From<[HookKind; N]> for HookSet {
    fn from(kinds: [HookKind; N]) -> Self {
        kinds.into_iter().collect()
    }
}

impl fmt::Debug for HookSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl fmt::Display for HookSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.iter().map(|k| k.to_string()).collect();
        write!(f, "{}", names.join(", "))
    }
}

impl Serialize for HookSet {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

impl<'de> Deserialize<'de> for HookSet {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let kinds = Vec::<HookKind>::deserialize(deserializer)?;
        Ok(kinds.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use proptest::prelude::*;

    use super::*;

    #[test]
    fn hook_names_use_wire_spelling() {
        let names: Vec<String> = HookKind::ALL.iter().map(|k| k.to_string()).collect();
        assert_eq!(
            names,
            vec![
                "puppet_library",
                "resolve_reference",
                "secret_encrypt",
                "secret_decrypt",
                "secret_createkeys",
                "validate_resolve_reference",
            ]
        );
    }

    #[test]
    fn unknown_hook_name_is_rejected_at_parse() {
        assert!(HookKind::from_str("resolve_references").is_err());
        assert!(HookKind::from_str("").is_err());
        assert_eq!(
            HookKind::from_str("secret_decrypt").unwrap(),
            HookKind::SecretDecrypt
        );
    }

    #[test]
    fn serde_matches_display() {
        let json = serde_json::to_string(&HookKind::ValidateResolveReference).unwrap();
        assert_eq!(json, "\"validate_resolve_reference\"");
    }

    #[test]
    fn secret_hooks_set() {
        let set = HookSet::from([
            HookKind::SecretDecrypt,
            HookKind::SecretEncrypt,
            HookKind::SecretCreatekeys,
        ]);
        assert_eq!(set.len(), 3);
        assert!(set.contains(HookKind::SecretDecrypt));
        assert!(!set.contains(HookKind::PuppetLibrary));
        assert_eq!(
            set.to_string(),
            "secret_encrypt, secret_decrypt, secret_createkeys"
        );
    }

    #[test]
    fn const_builder_and_all() {
        const SET: HookSet = HookSet::EMPTY
            .with(HookKind::ResolveReference)
            .with(HookKind::ValidateResolveReference);
        assert_eq!(SET.len(), 2);
        assert_eq!(HookSet::all().len(), HookKind::ALL.len());
        assert!(HookSet::EMPTY.is_empty());
    }

    #[test]
    fn hook_set_serializes_as_list() {
        let set = HookSet::from([HookKind::ResolveReference]);
        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, "[\"resolve_reference\"]");
        let parsed: HookSet = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, set);
    }

    proptest! {
        #[test]
        fn membership_matches_inserted_kinds(mask in 0u8..64) {
            let kinds: Vec<HookKind> = HookKind::ALL
                .iter()
                .enumerate()
                .filter(|(i, _)| mask & (1 << i) != 0)
                .map(|(_, k)| *k)
                .collect();
            let set: HookSet = kinds.iter().copied().collect();
            prop_assert_eq!(set.len(), kinds.len());
            for kind in HookKind::ALL {
                prop_assert_eq!(set.contains(kind), kinds.contains(&kind));
            }
        }
    }
}
