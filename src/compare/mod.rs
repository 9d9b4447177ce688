//! Dataset comparison between two versions of the code table.
//!
//! Reports codes added or removed, field-level changes for codes present in
//! both, and membership changes of the state map.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::store::MemoryStore;

/// A single field that differs between versions; `None` means the field is
/// absent on that side.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldChange {
    pub field: String,
    pub old: Option<Value>,
    pub new: Option<Value>,
}

/// All field changes for one code
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CodeChange {
    pub zip: String,
    pub changes: Vec<FieldChange>,
}

/// Membership change for a state present in both versions
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateChange {
    pub state: String,
    pub added: Vec<String>,
    pub removed: Vec<String>,
}

/// Full comparison report. All lists are sorted.
#[derive(Debug, Clone, Serialize)]
pub struct DatasetDiff {
    pub generated_at: DateTime<Utc>,
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub changed: Vec<CodeChange>,
    pub states_added: Vec<String>,
    pub states_removed: Vec<String>,
    pub states_changed: Vec<StateChange>,
}

impl DatasetDiff {
    /// True if both versions hold the same codes, fields and state lists
    pub fn is_empty(&self) -> bool {
        self.added.is_empty()
            && self.removed.is_empty()
            && self.changed.is_empty()
            && self.states_added.is_empty()
            && self.states_removed.is_empty()
            && self.states_changed.is_empty()
    }
}

/// Compare two versions of the dataset.
pub fn diff_stores(old: &MemoryStore, new: &MemoryStore) -> DatasetDiff {
    let old_records: BTreeMap<&str, _> = old.iter().collect();
    let new_records: BTreeMap<&str, _> = new.iter().collect();

    let all_codes: BTreeSet<&str> = old_records
        .keys()
        .chain(new_records.keys())
        .copied()
        .collect();

    let mut added = Vec::new();
    let mut removed = Vec::new();
    let mut changed = Vec::new();

    for code in all_codes {
        match (old_records.get(code), new_records.get(code)) {
            (Some(_), None) => removed.push(code.to_string()),
            (None, Some(_)) => added.push(code.to_string()),
            (Some(a), Some(b)) => {
                let changes = compare_fields(&a.fields(), &b.fields());
                if !changes.is_empty() {
                    changed.push(CodeChange {
                        zip: code.to_string(),
                        changes,
                    });
                }
            }
            (None, None) => {}
        }
    }

    let old_states: BTreeMap<&str, &Vec<String>> =
        old.state_map().iter().map(|(k, v)| (k.as_str(), v)).collect();
    let new_states: BTreeMap<&str, &Vec<String>> =
        new.state_map().iter().map(|(k, v)| (k.as_str(), v)).collect();

    let all_states: BTreeSet<&str> = old_states
        .keys()
        .chain(new_states.keys())
        .copied()
        .collect();

    let mut states_added = Vec::new();
    let mut states_removed = Vec::new();
    let mut states_changed = Vec::new();

    for state in all_states {
        match (old_states.get(state), new_states.get(state)) {
            (Some(_), None) => states_removed.push(state.to_string()),
            (None, Some(_)) => states_added.push(state.to_string()),
            (Some(a), Some(b)) => {
                let (added, removed) = compare_lists(a, b);
                if !added.is_empty() || !removed.is_empty() {
                    states_changed.push(StateChange {
                        state: state.to_string(),
                        added,
                        removed,
                    });
                }
            }
            (None, None) => {}
        }
    }

    DatasetDiff {
        generated_at: Utc::now(),
        added,
        removed,
        changed,
        states_added,
        states_removed,
        states_changed,
    }
}

/// Compare two records field by field over the union of their field names
fn compare_fields(old: &BTreeMap<String, Value>, new: &BTreeMap<String, Value>) -> Vec<FieldChange> {
    let fields: BTreeSet<&String> = old.keys().chain(new.keys()).collect();

    fields
        .into_iter()
        .filter_map(|field| {
            let a = old.get(field);
            let b = new.get(field);
            (a != b).then(|| FieldChange {
                field: field.clone(),
                old: a.cloned(),
                new: b.cloned(),
            })
        })
        .collect()
}

/// Set difference of two code lists: (in new only, in old only)
fn compare_lists(old: &[String], new: &[String]) -> (Vec<String>, Vec<String>) {
    let old: BTreeSet<&String> = old.iter().collect();
    let new: BTreeSet<&String> = new.iter().collect();

    let added = new.difference(&old).map(|s| s.to_string()).collect();
    let removed = old.difference(&new).map(|s| s.to_string()).collect();
    (added, removed)
}

fn show(value: &Option<Value>) -> String {
    match value {
        None => "<absent>".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(v) => v.to_string(),
    }
}

impl fmt::Display for DatasetDiff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return writeln!(f, "No differences found.");
        }

        if !self.added.is_empty() {
            writeln!(f, "Added codes: {}", self.added.join(", "))?;
        }
        if !self.removed.is_empty() {
            writeln!(f, "Removed codes: {}", self.removed.join(", "))?;
        }
        if !self.changed.is_empty() {
            writeln!(f, "Modified codes:")?;
            for change in &self.changed {
                writeln!(f, "  {}:", change.zip)?;
                for field in &change.changes {
                    writeln!(
                        f,
                        "    - {}: {} -> {}",
                        field.field,
                        show(&field.old),
                        show(&field.new)
                    )?;
                }
            }
        }

        if !self.states_added.is_empty() {
            writeln!(f, "Added states: {}", self.states_added.join(", "))?;
        }
        if !self.states_removed.is_empty() {
            writeln!(f, "Removed states: {}", self.states_removed.join(", "))?;
        }
        if !self.states_changed.is_empty() {
            writeln!(f, "Modified states:")?;
            for state in &self.states_changed {
                writeln!(f, "  {}:", state.state)?;
                if !state.added.is_empty() {
                    writeln!(f, "    added: {}", state.added.join(", "))?;
                }
                if !state.removed.is_empty() {
                    writeln!(f, "    removed: {}", state.removed.join(", "))?;
                }
            }
        }

        Ok(())
    }
}
