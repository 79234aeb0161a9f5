//! Client identity: a content-addressed id per company name, and the
//! best-effort lookup that maps names from secondary sheets back onto the
//! clients sheet.
//!
//! Ids are the first 128 bits of a SHA-256 over the trimmed display name.
//! Collisions between distinct names are accepted rather than detected.

use std::collections::HashMap;

use serde::Deserialize;
use sha2::{Digest, Sha256};

use crate::models::{ClientId, ClientRecord};

const SEPARATOR: &str = " - ";

/// Same input, same id, in every run and every process. Callers trim first.
pub fn derive_identity(name: &str) -> ClientId {
    let mut hasher = Sha256::new();
    hasher.update(name.as_bytes());
    let h = hex::encode(&hasher.finalize()[..16]);
    ClientId(format!(
        "{}-{}-{}-{}-{}",
        &h[0..8],
        &h[8..12],
        &h[12..16],
        &h[16..20],
        &h[20..32]
    ))
}

fn fold(name: &str) -> String {
    name.trim().to_lowercase()
}

/// The part of a display name before the first " - ".
pub fn base_name(name: &str) -> &str {
    name.split(SEPARATOR).next().unwrap_or(name).trim()
}

// ---------------------------------------------------------------------------
// Name index
// ---------------------------------------------------------------------------

/// Case-folded display name -> id, iterated in clients-sheet order.
#[derive(Debug, Default)]
pub struct NameIndex {
    entries: Vec<(String, ClientId)>,
    positions: HashMap<String, usize>,
}

impl NameIndex {
    pub fn build(records: &[ClientRecord]) -> Self {
        let mut index = Self::default();
        for record in records {
            index.insert(&record.company_name, record.id.clone());
        }
        index
    }

    /// A name seen again keeps its original position but takes the newer id.
    pub fn insert(&mut self, name: &str, id: ClientId) {
        let key = fold(name);
        if let Some(&i) = self.positions.get(&key) {
            self.entries[i].1 = id;
            return;
        }
        self.positions.insert(key.clone(), self.entries.len());
        self.entries.push((key, id));
    }

    pub fn exact(&self, key: &str) -> Option<&ClientId> {
        self.positions.get(key).map(|&i| &self.entries[i].1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ClientId)> {
        self.entries.iter().map(|(k, id)| (k.as_str(), id))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

// ---------------------------------------------------------------------------
// Match strategies (selected from settings)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    /// Exact name, then base-name equality or containment in either direction.
    #[default]
    BaseName,
    /// Exact case-folded name only.
    Exact,
}

impl MatchStrategy {
    /// Second chance after the exact lookup missed. `key` is already folded.
    fn fallback<'a>(&self, key: &str, index: &'a NameIndex) -> Option<&'a ClientId> {
        match self {
            Self::BaseName => base_name_match(key, index),
            Self::Exact => None,
        }
    }
}

// Known weakness: "Alpha" also matches "Alphabet Trading". First entry wins.
fn base_name_match<'a>(key: &str, index: &'a NameIndex) -> Option<&'a ClientId> {
    let wanted = base_name(key);
    if wanted.is_empty() {
        return None;
    }
    index
        .iter()
        .find(|(candidate, _)| {
            let candidate = base_name(candidate);
            !candidate.is_empty()
                && (candidate == wanted || candidate.contains(wanted) || wanted.contains(candidate))
        })
        .map(|(_, id)| id)
}

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Matched(ClientId),
    /// No primary record; the id was derived from the name itself.
    Orphan(ClientId),
}

impl Resolution {
    pub fn into_id(self) -> ClientId {
        match self {
            Self::Matched(id) | Self::Orphan(id) => id,
        }
    }

    pub fn is_orphan(&self) -> bool {
        matches!(self, Self::Orphan(_))
    }
}

pub struct IdentityResolver {
    index: NameIndex,
    strategy: MatchStrategy,
}

impl IdentityResolver {
    pub fn new(index: NameIndex, strategy: MatchStrategy) -> Self {
        Self { index, strategy }
    }

    /// Never fails: an unmatched name gets a fresh id of its own.
    pub fn resolve(&self, name: &str) -> Resolution {
        let key = fold(name);
        if let Some(id) = self.index.exact(&key) {
            return Resolution::Matched(id.clone());
        }
        if let Some(id) = self.strategy.fallback(&key, &self.index) {
            return Resolution::Matched(id.clone());
        }
        let id = derive_identity(name.trim());
        log::debug!("No client matches '{}', using {id}", name.trim());
        Resolution::Orphan(id)
    }

    pub fn index(&self) -> &NameIndex {
        &self.index
    }
}
