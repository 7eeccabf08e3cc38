// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Session-scoped key/value storage.
//!
//! Values live exactly as long as the process run. Nothing here is written
//! to disk.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Session key holding the last detected latitude
pub const SESSION_LAT_KEY: &str = "userLat";
/// Session key holding the last detected longitude
pub const SESSION_LON_KEY: &str = "userLon";

/// Cloneable, thread-safe string store shared for one application session.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    items: Arc<RwLock<HashMap<String, String>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value, replacing any previous one. Best effort.
    pub fn set_item(&self, key: &str, value: impl Into<String>) {
        if let Ok(mut items) = self.items.write() {
            items.insert(key.to_string(), value.into());
        }
    }

    pub fn get_item(&self, key: &str) -> Option<String> {
        self.items.read().ok().and_then(|items| items.get(key).cloned())
    }

    pub fn remove_item(&self, key: &str) -> Option<String> {
        self.items.write().ok().and_then(|mut items| items.remove(key))
    }

    pub fn len(&self) -> usize {
        self.items.read().map(|items| items.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_storage() {
        let store = SessionStore::new();
        let other = store.clone();

        store.set_item(SESSION_LAT_KEY, "40");
        other.set_item(SESSION_LAT_KEY, "40.5");

        assert_eq!(store.get_item(SESSION_LAT_KEY).as_deref(), Some("40.5"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_remove_item() {
        let store = SessionStore::new();
        store.set_item(SESSION_LON_KEY, "-88");
        assert_eq!(store.remove_item(SESSION_LON_KEY).as_deref(), Some("-88"));
        assert!(store.is_empty());
        assert!(store.get_item(SESSION_LON_KEY).is_none());
    }
}
