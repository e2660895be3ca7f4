use std::{collections::HashMap, sync::RwLock};

use crate::{
    error::{AppResult, error_message, schema_not_found},
    warehouse::{QualifiedName, Warehouse}
};

/// Process-lifetime cache of table DDL keyed by qualified name.
///
/// Entries never expire on their own; [`SchemaCache::invalidate`] and
/// [`SchemaCache::clear`] are the only ways to drop them. The lock is released
/// before the warehouse round trip, so two callers missing on the same table
/// may both fetch it and both store the same text.
#[derive(Debug, Default)]
pub struct SchemaCache {
    entries: RwLock<HashMap<QualifiedName, String>>
}

impl SchemaCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached DDL for `name`, fetching it from `warehouse` on a miss.
    ///
    /// A failed or empty lookup leaves the cache untouched.
    pub async fn get<W>(&self, warehouse: &W, name: &QualifiedName) -> AppResult<String>
    where
        W: Warehouse + ?Sized
    {
        if let Some(ddl) = self.peek(name) {
            tracing::debug!(table = %name, "schema cache hit");
            return Ok(ddl);
        }
        let ddl = match warehouse.describe(name).await {
            Ok(Some(ddl)) => ddl,
            Ok(None) => return Err(schema_not_found(&name.to_string(), None)),
            Err(e) => {
                let cause = error_message(&e);
                tracing::error!(table = %name, error = %cause, "error fetching schema");
                return Err(schema_not_found(&name.to_string(), Some(&cause)));
            }
        };
        self.insert(name.clone(), ddl.clone());
        Ok(ddl)
    }

    /// Cached DDL without touching the warehouse.
    pub fn peek(&self, name: &QualifiedName) -> Option<String> {
        self.entries.read().ok()?.get(name).cloned()
    }

    pub fn insert(&self, name: QualifiedName, ddl: String) {
        match self.entries.write() {
            Ok(mut entries) => {
                entries.insert(name, ddl);
            }
            Err(_) => tracing::warn!(table = %name, "schema cache lock poisoned, entry not stored")
        }
    }

    /// Drop one entry, returning whether it was present.
    pub fn invalidate(&self, name: &QualifiedName) -> bool {
        match self.entries.write() {
            Ok(mut entries) => entries.remove(name).is_some(),
            Err(_) => {
                tracing::warn!(table = %name, "schema cache lock poisoned, entry not dropped");
                false
            }
        }
    }

    pub fn clear(&self) {
        match self.entries.write() {
            Ok(mut entries) => entries.clear(),
            Err(_) => tracing::warn!("schema cache lock poisoned, entries not cleared")
        }
    }

    pub fn contains(&self, name: &QualifiedName) -> bool {
        self.peek(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, thread};

    use super::*;

    #[test]
    fn test_poisoned_lock_degrades_to_misses() {
        let cache = Arc::new(SchemaCache::new());
        let poisoner = Arc::clone(&cache);
        let joined = thread::spawn(move || {
            let _guard = poisoner.entries.write();
            panic!("poison the lock");
        })
        .join();
        assert!(joined.is_err());

        let name = QualifiedName::new("public", "users");
        cache.insert(name.clone(), String::from("CREATE TABLE users (id INT);"));
        assert!(cache.peek(&name).is_none());
        assert!(!cache.invalidate(&name));
        cache.clear();
        assert_eq!(cache.len(), 0);
    }
}
