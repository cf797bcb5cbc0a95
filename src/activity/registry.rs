//! Activities addressable by id.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::{Activity, ActivityError};

/// Registered activities, unique by id.
#[derive(Default)]
pub struct ActivityRegistry {
    activities: BTreeMap<String, Arc<dyn Activity>>,
}

impl ActivityRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `activity` under its id.
    ///
    /// # Errors
    ///
    /// `DuplicateActivity` when the id is taken.
    pub fn register(&mut self, activity: Arc<dyn Activity>) -> Result<(), ActivityError> {
        let id = activity.id().to_string();
        if self.activities.contains_key(&id) {
            return Err(ActivityError::DuplicateActivity(id));
        }
        self.activities.insert(id, activity);
        Ok(())
    }

    /// Activity registered as `id`.
    pub fn get(&self, id: &str) -> Option<Arc<dyn Activity>> {
        self.activities.get(id).cloned()
    }

    /// Registered ids, sorted.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.activities.keys().map(String::as_str)
    }

    /// Number of registered activities.
    pub fn len(&self) -> usize {
        self.activities.len()
    }

    /// True when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.activities.is_empty()
    }
}
