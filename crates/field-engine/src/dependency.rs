use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::warn;

use crate::field::Field;

/// Which derived state of a dependent field must be recomputed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DependencyKey {
    #[serde(rename = "isRequired")]
    IsRequired,
    #[serde(rename = "isHidden")]
    IsHidden,
}

impl DependencyKey {
    pub const ALL: [DependencyKey; 2] = [DependencyKey::IsHidden, DependencyKey::IsRequired];

    pub fn as_str(&self) -> &'static str {
        match self {
            DependencyKey::IsRequired => "isRequired",
            DependencyKey::IsHidden => "isHidden",
        }
    }
}

/// Fields to re-evaluate when the owning field changes, keyed by what they
/// recompute. Entries are weak so dependency cycles never leak.
#[derive(Debug, Default)]
pub struct DependentFields {
    is_required: RwLock<Vec<Weak<Field>>>,
    is_hidden: RwLock<Vec<Weak<Field>>>,
}

impl DependentFields {
    fn slot(&self, key: DependencyKey) -> &RwLock<Vec<Weak<Field>>> {
        match key {
            DependencyKey::IsRequired => &self.is_required,
            DependencyKey::IsHidden => &self.is_hidden,
        }
    }

    /// Adds `field` under `key`; returns `false` if it was already registered.
    pub fn register(&self, field: &Arc<Field>, key: DependencyKey) -> bool {
        let candidate = Arc::downgrade(field);
        let mut entries = self.slot(key).write();
        entries.retain(|entry| entry.strong_count() > 0);
        if entries.iter().any(|entry| Weak::ptr_eq(entry, &candidate)) {
            return false;
        }
        entries.push(candidate);
        true
    }

    pub fn get(&self, key: DependencyKey) -> Vec<Arc<Field>> {
        self.slot(key)
            .read()
            .iter()
            .filter_map(Weak::upgrade)
            .collect()
    }

    pub fn len(&self, key: DependencyKey) -> usize {
        self.slot(key)
            .read()
            .iter()
            .filter(|entry| entry.strong_count() > 0)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        DependencyKey::ALL.iter().all(|key| self.len(*key) == 0)
    }
}

/// Recomputations already performed in one propagation pass.
///
/// A `(field, key)` pair runs at most once per pass, which bounds cascades
/// through cyclic registrations.
#[derive(Debug, Clone, Default)]
pub struct CascadePath(Vec<(String, DependencyKey)>);

impl CascadePath {
    pub fn contains(&self, field_id: &str, key: DependencyKey) -> bool {
        self.0
            .iter()
            .any(|(id, visited)| id == field_id && *visited == key)
    }

    pub fn with(&self, field_id: &str, key: DependencyKey) -> Self {
        let mut next = self.0.clone();
        next.push((field_id.to_string(), key));
        Self(next)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Handle on the recomputations spawned by one trigger.
///
/// Dropping it detaches the work; awaiting [`Cascade::settled`] waits for the
/// whole transitive re-evaluation.
#[derive(Debug, Default)]
pub struct Cascade {
    handles: Vec<JoinHandle<()>>,
}

impl Cascade {
    pub(crate) fn push(&mut self, handle: JoinHandle<()>) {
        self.handles.push(handle);
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub async fn settled(self) {
        for handle in self.handles {
            if let Err(err) = handle.await {
                warn!(error = %err, "dependent field recomputation failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_tracks_field_and_key_pairs() {
        let path = CascadePath::default().with("a", DependencyKey::IsHidden);
        assert!(path.contains("a", DependencyKey::IsHidden));
        assert!(!path.contains("a", DependencyKey::IsRequired));
        assert!(!path.contains("b", DependencyKey::IsHidden));
        assert_eq!(path.with("b", DependencyKey::IsRequired).len(), 2);
    }

    #[test]
    fn keys_use_wire_names() {
        assert_eq!(
            serde_json::to_value(DependencyKey::IsRequired).expect("serialize"),
            serde_json::json!("isRequired")
        );
        assert_eq!(DependencyKey::IsHidden.as_str(), "isHidden");
    }
}
