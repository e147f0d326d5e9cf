use std::collections::HashMap;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// How the current session began. A fresh launch (process start, or an
/// explicit "start over") discards every draft; resuming keeps them so that
/// in-app navigation preserves in-progress work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchKind {
    Fresh,
    Resumed,
}

/// Page-scoped draft store for in-progress form state. Fields persist
/// write-through under `page.field` keys as plain JSON values; restoration is
/// per-field and tolerant, so one corrupt value never blocks the rest.
///
/// This is a UX convenience, not durability: drafts live only as long as the
/// process, and only JSON-serializable data goes in (pending local file
/// attachments are intentionally dropped).
#[derive(Debug, Default)]
pub struct SessionStore {
    values: HashMap<String, Value>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(page: &str, field: &str) -> String {
        format!("{page}.{field}")
    }

    /// Apply launch semantics: a fresh launch forces every page back to its
    /// defaults by discarding all drafts.
    pub fn begin(&mut self, launch: LaunchKind) {
        if launch == LaunchKind::Fresh {
            self.values.clear();
        }
    }

    pub fn set<T: Serialize>(&mut self, page: &str, field: &str, value: &T) {
        match serde_json::to_value(value) {
            Ok(json) => {
                self.values.insert(Self::key(page, field), json);
            }
            Err(err) => {
                tracing::debug!(page, field, %err, "draft value not serializable, skipping");
            }
        }
    }

    /// Restore one field, falling back to `default` when the field is absent
    /// or does not parse as `T`.
    pub fn restore<T: DeserializeOwned>(&self, page: &str, field: &str, default: T) -> T {
        match self.values.get(&Self::key(page, field)) {
            Some(json) => serde_json::from_value(json.clone()).unwrap_or(default),
            None => default,
        }
    }

    pub fn remove(&mut self, page: &str, field: &str) {
        self.values.remove(&Self::key(page, field));
    }

    pub fn clear_page(&mut self, page: &str) {
        let prefix = format!("{page}.");
        self.values.retain(|key, _| !key.starts_with(&prefix));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_navigation_remount_restores_last_written_value() {
        let mut store = SessionStore::new();
        store.set("testing", "model_version", &"v13");

        store.begin(LaunchKind::Resumed);
        let restored: String = store.restore("testing", "model_version", "v12".to_string());
        assert_eq!(restored, "v13");
    }

    #[test]
    fn test_fresh_launch_returns_defaults() {
        let mut store = SessionStore::new();
        store.set("testing", "free_text", &"tight snare with long decay");

        store.begin(LaunchKind::Fresh);
        let restored: String = store.restore("testing", "free_text", String::new());
        assert_eq!(restored, "");
    }

    #[test]
    fn test_corrupt_field_falls_back_without_blocking_others() {
        let mut store = SessionStore::new();
        store.set("testing", "difficulty", &"not a number");
        store.set("testing", "notes", &"decent transient");

        let difficulty: u8 = store.restore("testing", "difficulty", 5);
        let notes: String = store.restore("testing", "notes", String::new());
        assert_eq!(difficulty, 5);
        assert_eq!(notes, "decent transient");
    }

    #[test]
    fn test_fields_are_page_scoped() {
        let mut store = SessionStore::new();
        store.set("testing", "notes", &"a");
        store.set("model_testing", "notes", &"b");

        let testing: String = store.restore("testing", "notes", String::new());
        let model_testing: String = store.restore("model_testing", "notes", String::new());
        assert_eq!(testing, "a");
        assert_eq!(model_testing, "b");
    }

    #[test]
    fn test_clear_page_leaves_other_pages_intact() {
        let mut store = SessionStore::new();
        store.set("testing", "notes", &"a");
        store.set("model_testing", "notes", &"b");

        store.clear_page("testing");
        let testing: String = store.restore("testing", "notes", "gone".to_string());
        let model_testing: String = store.restore("model_testing", "notes", String::new());
        assert_eq!(testing, "gone");
        assert_eq!(model_testing, "b");
    }

    #[test]
    fn test_write_through_keeps_latest_value() {
        let mut store = SessionStore::new();
        store.set("testing", "difficulty", &3u8);
        store.set("testing", "difficulty", &8u8);
        let restored: u8 = store.restore("testing", "difficulty", 5);
        assert_eq!(restored, 8);
    }
}
