//! Selector expansion
//!
//! Turns a permission's database selector into concrete database ids,
//! consuming every id it hands out so that no later permission of the same
//! user can receive it again. The tracker keeps registry declaration order,
//! which is the order wildcard matches are scanned and returned in.

use crate::error::ExpansionError;
use crate::grants::patterns::{GlobPattern, is_wildcard};
use std::collections::HashMap;
use tracing::trace;

/// Per-user record of which eligible databases have been matched
#[derive(Debug, Clone, Default)]
pub struct UsageTracker {
    entries: Vec<(String, bool)>,
    positions: HashMap<String, usize>,
}

impl UsageTracker {
    /// Tracker over `ids` in the given order, all unconsumed; repeats are ignored
    pub fn new(ids: impl IntoIterator<Item = String>) -> Self {
        let mut entries = Vec::new();
        let mut positions = HashMap::new();
        for id in ids {
            if !positions.contains_key(&id) {
                positions.insert(id.clone(), entries.len());
                entries.push((id, false));
            }
        }
        Self { entries, positions }
    }

    /// Mark every database as unconsumed again
    pub fn reset(&mut self) {
        for (_, consumed) in &mut self.entries {
            *consumed = false;
        }
    }

    /// `None` if the id is not tracked at all
    pub fn is_consumed(&self, id: &str) -> Option<bool> {
        self.positions.get(id).map(|&p| self.entries[p].1)
    }

    /// Tracked ids in order
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(id, _)| id.as_str())
    }

    /// Ids still available to later specs, in order
    pub fn unconsumed(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(|(_, consumed)| !consumed)
            .map(|(id, _)| id.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn consume_exact(&mut self, id: &str) -> Result<String, ExpansionError> {
        let Some(&position) = self.positions.get(id) else {
            return Err(ExpansionError::NotFound { id: id.to_string() });
        };
        let (id, consumed) = &mut self.entries[position];
        if *consumed {
            return Err(ExpansionError::AlreadyMatched { id: id.clone() });
        }
        *consumed = true;
        Ok(id.clone())
    }

    fn consume_matching(&mut self, pattern: &GlobPattern) -> Vec<String> {
        let mut ids = Vec::new();
        for (id, consumed) in &mut self.entries {
            if !*consumed && pattern.matches(id) {
                *consumed = true;
                ids.push(id.clone());
            }
        }
        ids
    }
}

/// Expand a selector against the tracker, consuming what it returns.
///
/// Exact selectors yield one id or fail with `NotFound` / `AlreadyMatched`.
/// Wildcard selectors yield every unconsumed matching id in tracker order,
/// or fail with `NoMatch` when nothing is left to match.
pub fn expand(selector: &str, tracker: &mut UsageTracker) -> Result<Vec<String>, ExpansionError> {
    let ids = if is_wildcard(selector) {
        tracker.consume_matching(&GlobPattern::new(selector))
    } else {
        vec![tracker.consume_exact(selector)?]
    };

    if ids.is_empty() {
        return Err(ExpansionError::NoMatch {
            selector: selector.to_string(),
        });
    }

    trace!(selector, matched = ?ids, "Expanded selector");
    Ok(ids)
}
