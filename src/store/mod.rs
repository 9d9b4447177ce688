//! Postal code storage.
//!
//! [`CodeStore`] is the read-only seam the query layer is built on;
//! [`MemoryStore`] is the in-memory implementation the loaders produce.

mod load;

pub use load::{load_path, load_paths, LoadError};

use hashbrown::HashMap;
use tracing::{debug, info};

use crate::models::PostalRecord;

/// Mapping from state / region code to the postal codes inside it.
pub type StateMap = HashMap<String, Vec<String>>;

/// Read-only lookup of postal records by code.
///
/// Codes are matched verbatim: no trimming, padding or case folding.
pub trait CodeStore {
    /// Resolve a single code
    fn lookup(&self, code: &str) -> Option<&PostalRecord>;

    /// Iterate over every key in the store
    fn codes(&self) -> Box<dyn Iterator<Item = &str> + '_>;

    /// Codes listed for a state, empty if the state is unknown
    fn codes_in_state(&self, state: &str) -> &[String];

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-memory code table, iterated in insertion order.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    order: Vec<String>,
    records: HashMap<String, PostalRecord>,
    state_map: StateMap,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from records, deriving the state map.
    ///
    /// A record with an empty `zip` is skipped. Later duplicates replace
    /// earlier ones but keep the first position.
    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = PostalRecord>,
    {
        Self::from_keyed(
            records
                .into_iter()
                .filter(|r| {
                    if r.zip.is_empty() {
                        debug!("Skipping record without a postal code ({}, {})", r.city, r.state);
                    }
                    !r.zip.is_empty()
                })
                .map(|r| (r.zip.clone(), r)),
        )
    }

    /// Build a store from explicit (code, record) pairs, deriving the state
    /// map. The key is authoritative even if it differs from `record.zip`.
    pub fn from_keyed<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (String, PostalRecord)>,
    {
        let mut store = Self::new();
        for (code, record) in entries {
            store.insert_keyed(code, record);
        }
        store.rebuild_state_map();
        store
    }

    /// Replace the derived state map with one supplied by the dataset
    pub fn with_state_map(mut self, state_map: StateMap) -> Self {
        self.state_map = state_map;
        self
    }

    /// Merge another store into this one, the other store winning on
    /// duplicate codes. A replaced code leaves its old state's list; state
    /// lists are otherwise unioned.
    pub fn merge(&mut self, other: MemoryStore) {
        let MemoryStore {
            order,
            mut records,
            state_map,
        } = other;

        for code in order {
            if let Some(record) = records.remove(&code) {
                self.insert_keyed(code, record);
            }
        }

        for (state, codes) in state_map {
            let entry = self.state_map.entry(state).or_default();
            for code in codes {
                if !entry.contains(&code) {
                    entry.push(code);
                }
            }
        }
    }

    pub fn state_map(&self) -> &StateMap {
        &self.state_map
    }

    /// Iterate over (code, record) pairs in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PostalRecord)> {
        self.order
            .iter()
            .filter_map(|code| self.records.get(code).map(|r| (code.as_str(), r)))
    }

    fn insert_keyed(&mut self, code: String, record: PostalRecord) {
        let state = record.state.clone();
        match self.records.insert(code.clone(), record) {
            None => self.order.push(code),
            Some(previous) if previous.state != state => {
                self.remove_from_state(&previous.state, &code)
            }
            Some(_) => {}
        }
    }

    fn remove_from_state(&mut self, state: &str, code: &str) {
        if let Some(codes) = self.state_map.get_mut(state) {
            codes.retain(|c| c != code);
            if codes.is_empty() {
                self.state_map.remove(state);
            }
        }
    }

    fn rebuild_state_map(&mut self) {
        let mut state_map = StateMap::new();
        for code in &self.order {
            if let Some(record) = self.records.get(code) {
                state_map
                    .entry(record.state.clone())
                    .or_default()
                    .push(code.clone());
            }
        }

        info!(
            "Indexed {} postal codes across {} states",
            self.order.len(),
            state_map.len()
        );
        self.state_map = state_map;
    }
}

impl CodeStore for MemoryStore {
    fn lookup(&self, code: &str) -> Option<&PostalRecord> {
        self.records.get(code)
    }

    fn codes(&self) -> Box<dyn Iterator<Item = &str> + '_> {
        Box::new(self.order.iter().map(String::as_str))
    }

    fn codes_in_state(&self, state: &str) -> &[String] {
        self.state_map.get(state).map(Vec::as_slice).unwrap_or(&[])
    }

    fn len(&self) -> usize {
        self.order.len()
    }
}

impl FromIterator<PostalRecord> for MemoryStore {
    fn from_iter<I: IntoIterator<Item = PostalRecord>>(iter: I) -> Self {
        Self::from_records(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MemoryStore {
        MemoryStore::from_records(vec![
            PostalRecord::new("37167", 35.9582, -86.5186, "Smyrna", "TN"),
            PostalRecord::new("37086", 36.0087, -86.5589, "La Vergne", "TN"),
            PostalRecord::new("M5V", 43.6426, -79.3871, "Toronto", "ON"),
        ])
    }

    #[test]
    fn test_lookup_is_verbatim() {
        let store = sample();
        assert_eq!(store.lookup("37167").unwrap().city, "Smyrna");
        assert!(store.lookup(" 37167").is_none());
        assert!(store.lookup("00000").is_none());
        assert!(store.lookup("m5v").is_none());
    }

    #[test]
    fn test_insertion_order_and_state_map() {
        let store = sample();
        let codes: Vec<&str> = store.codes().collect();
        assert_eq!(codes, vec!["37167", "37086", "M5V"]);
        assert_eq!(store.codes_in_state("TN"), ["37167", "37086"]);
        assert_eq!(store.codes_in_state("ON"), ["M5V"]);
        assert!(store.codes_in_state("XX").is_empty());
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_duplicate_keeps_position_and_takes_last() {
        let store = MemoryStore::from_records(vec![
            PostalRecord::new("37167", 0.0, 0.0, "Old", "TN"),
            PostalRecord::new("37086", 36.0087, -86.5589, "La Vergne", "TN"),
            PostalRecord::new("37167", 35.9582, -86.5186, "Smyrna", "TN"),
        ]);
        let codes: Vec<&str> = store.codes().collect();
        assert_eq!(codes, vec!["37167", "37086"]);
        assert_eq!(store.lookup("37167").unwrap().city, "Smyrna");
        assert_eq!(store.codes_in_state("TN").len(), 2);
    }

    #[test]
    fn test_merge() {
        let mut us = sample();
        let canada = MemoryStore::from_records(vec![
            PostalRecord::new("H2X", 45.5117, -73.5673, "Montreal", "QC"),
            PostalRecord::new("M5V", 43.6430, -79.3900, "Toronto", "ON"),
        ]);
        us.merge(canada);

        assert_eq!(us.len(), 4);
        assert_eq!(us.lookup("M5V").unwrap().latitude, 43.6430);
        assert_eq!(us.codes_in_state("ON"), ["M5V"]);
        assert_eq!(us.codes_in_state("QC"), ["H2X"]);
        assert_eq!(us.iter().last().map(|(code, _)| code), Some("H2X"));
    }

    #[test]
    fn test_supplied_state_map_is_trusted() {
        let mut map = StateMap::new();
        map.insert("TN".to_string(), vec!["37167".to_string()]);
        let store = sample().with_state_map(map);
        assert_eq!(store.codes_in_state("TN"), ["37167"]);
        assert!(store.codes_in_state("ON").is_empty());
    }

    #[test]
    fn test_merge_moves_code_to_new_state() {
        let mut store = sample();
        store.merge(MemoryStore::from_records(vec![PostalRecord::new(
            "37167", 33.7490, -84.3880, "Smyrna", "GA",
        )]));

        assert_eq!(store.len(), 3);
        assert_eq!(store.codes_in_state("TN"), ["37086"]);
        assert_eq!(store.codes_in_state("GA"), ["37167"]);

        let mut lone = MemoryStore::from_records(vec![PostalRecord::new(
            "M5V", 43.6426, -79.3871, "Toronto", "ON",
        )]);
        lone.merge(MemoryStore::from_records(vec![PostalRecord::new(
            "M5V", 45.5117, -73.5673, "Toronto", "QC",
        )]));
        assert!(!lone.state_map().contains_key("ON"));
        assert_eq!(lone.codes_in_state("QC"), ["M5V"]);
    }

    #[test]
    fn test_records_without_code_are_skipped() {
        let store = MemoryStore::from_records(vec![
            PostalRecord::new("", 35.9582, -86.5186, "Smyrna", "TN"),
            PostalRecord::new("37086", 36.0087, -86.5589, "La Vergne", "TN"),
        ]);
        assert_eq!(store.len(), 1);
        assert_eq!(store.codes_in_state("TN"), ["37086"]);
    }
}
