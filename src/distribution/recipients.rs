//! Recipient maps and the input boundary that normalizes them.
//!
//! The canonical input is a JSON object `address -> amount`. Holder snapshots use
//! `address -> [entries]`; that form is only accepted through the explicit
//! [`RecipientSchema::EntryList`] adapter, which turns each list into an amount.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::marker::PhantomData;

use serde::de::{DeserializeOwned, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

use crate::chain::Address;
use crate::core::OpsError;

/// Address to amount mapping with unique keys, iterated in address order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RecipientMap(BTreeMap<Address, u64>);

/// Schema of a recipient file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecipientSchema {
    /// `{"address": amount}`.
    Amounts,
    /// `{"address": [entry, ...]}`; amount is `entries.len() * amount_per_entry`.
    EntryList {
        /// Amount paid for each listed entry.
        amount_per_entry: u64,
    },
}

impl RecipientMap {
    /// Build from pairs.
    ///
    /// # Errors
    ///
    /// Rejects duplicate addresses, zero amounts, and totals that overflow `u64`.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (Address, u64)>) -> Result<Self, OpsError> {
        let mut map = BTreeMap::new();
        let mut total: u64 = 0;
        for (address, amount) in pairs {
            if amount == 0 {
                return Err(OpsError::parse("recipients", format!("amount for {address} is zero")));
            }
            total = total.checked_add(amount).ok_or_else(|| {
                OpsError::parse("recipients", "total amount overflows u64")
            })?;
            if map.insert(address.clone(), amount).is_some() {
                return Err(OpsError::parse("recipients", format!("duplicate address {address}")));
            }
        }
        Ok(Self(map))
    }

    /// Parse a recipient file in the given schema.
    ///
    /// # Errors
    ///
    /// Returns `OpsError::Parse` for malformed JSON, a schema mismatch, duplicate
    /// addresses, zero amounts, or overflowing totals.
    pub fn from_json(input: &str, schema: RecipientSchema) -> Result<Self, OpsError> {
        match schema {
            RecipientSchema::Amounts => {
                let entries: UniqueEntries<u64> = serde_json::from_str(input)
                    .map_err(|e| OpsError::parse("recipients", e))?;
                Self::from_pairs(entries.0)
            }
            RecipientSchema::EntryList { amount_per_entry } => {
                let entries: UniqueEntries<Vec<serde_json::Value>> = serde_json::from_str(input)
                    .map_err(|e| OpsError::parse("recipients (entry list)", e))?;
                let mut pairs = Vec::with_capacity(entries.0.len());
                for (address, list) in entries.0 {
                    let amount = u64::try_from(list.len())
                        .ok()
                        .and_then(|n| n.checked_mul(amount_per_entry))
                        .ok_or_else(|| {
                            OpsError::parse("recipients (entry list)", format!("amount for {address} overflows u64"))
                        })?;
                    pairs.push((address, amount));
                }
                Self::from_pairs(pairs)
            }
        }
    }

    /// Number of recipients.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when there are no recipients.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Sum of all amounts. Cannot overflow: checked at construction.
    pub fn total(&self) -> u64 {
        self.0.values().sum()
    }

    /// Amount for `address`.
    pub fn get(&self, address: &Address) -> Option<u64> {
        self.0.get(address).copied()
    }

    /// Iterate in address order.
    pub fn iter(&self) -> impl Iterator<Item = (&Address, u64)> {
        self.0.iter().map(|(a, v)| (a, *v))
    }
}

impl<'de> Deserialize<'de> for RecipientMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let entries = UniqueEntries::<u64>::deserialize(deserializer)?;
        Self::from_pairs(entries.0).map_err(serde::de::Error::custom)
    }
}

/// JSON object entries in document order, rejecting repeated keys.
pub(crate) struct UniqueEntries<V>(pub Vec<(Address, V)>);

impl<'de, V: DeserializeOwned> Deserialize<'de> for UniqueEntries<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EntriesVisitor<V>(PhantomData<V>);

        impl<'de, V: DeserializeOwned> Visitor<'de> for EntriesVisitor<V> {
            type Value = UniqueEntries<V>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a JSON object keyed by address")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut seen = BTreeSet::new();
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((address, value)) = access.next_entry::<Address, V>()? {
                    if !seen.insert(address.clone()) {
                        return Err(serde::de::Error::custom(format!("duplicate address {address}")));
                    }
                    entries.push((address, value));
                }
                Ok(UniqueEntries(entries))
            }
        }

        deserializer.deserialize_map(EntriesVisitor(PhantomData))
    }
}
