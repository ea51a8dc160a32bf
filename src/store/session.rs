use crate::error::ODataResult;
use crate::model::Schema;
use crate::store::MemoryStore;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use uuid::Uuid;

/// Fills a freshly created session store.
pub type Seeder = Box<dyn Fn(&MemoryStore) -> ODataResult<()> + Send + Sync>;

#[derive(Clone)]
struct SessionEntry {
    store: Arc<MemoryStore>,
    created_at: DateTime<Utc>,
    last_accessed: Instant,
}

/// The store bound to one client session.
#[derive(Clone)]
pub struct SessionHandle {
    pub id: Uuid,
    pub store: Arc<MemoryStore>,
    /// True when the session was created by this request
    pub is_new: bool,
}

/// One seeded store per client session, dropped after `ttl` without access.
pub struct SessionRegistry {
    schema: Arc<Schema>,
    seeder: Seeder,
    entries: RwLock<HashMap<Uuid, SessionEntry>>,
    ttl: Duration,
}

impl SessionRegistry {
    pub fn new(schema: Arc<Schema>, ttl: Duration, seeder: Seeder) -> Self {
        Self {
            schema,
            seeder,
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Returns the live session for `id`, or creates and seeds a new one when
    /// `id` is absent, unknown or expired. Expired sessions are swept first.
    pub async fn open(&self, id: Option<Uuid>) -> ODataResult<SessionHandle> {
        self.clear_expired().await;

        if let Some(id) = id {
            let mut entries = self.entries.write().await;
            if let Some(entry) = entries.get_mut(&id) {
                entry.last_accessed = Instant::now();
                return Ok(SessionHandle {
                    id,
                    store: Arc::clone(&entry.store),
                    is_new: false,
                });
            }
        }

        let store = Arc::new(MemoryStore::new(Arc::clone(&self.schema)));
        (self.seeder)(&store)?;

        let id = Uuid::new_v4();
        let entry = SessionEntry {
            store: Arc::clone(&store),
            created_at: Utc::now(),
            last_accessed: Instant::now(),
        };
        self.entries.write().await.insert(id, entry);
        log::info!("opened session {}", id);

        Ok(SessionHandle {
            id,
            store,
            is_new: true,
        })
    }

    pub async fn remove(&self, id: &Uuid) -> bool {
        self.entries.write().await.remove(id).is_some()
    }

    /// Drops sessions idle for longer than the TTL. Returns how many were removed.
    pub async fn clear_expired(&self) -> usize {
        let mut entries = self.entries.write().await;
        let ttl = self.ttl;

        let expired: Vec<Uuid> = entries
            .iter()
            .filter(|(_, entry)| entry.last_accessed.elapsed() > ttl)
            .map(|(id, _)| *id)
            .collect();

        for id in &expired {
            if let Some(entry) = entries.remove(id) {
                log::info!(
                    "session {} expired (created {})",
                    id,
                    entry.created_at.to_rfc3339()
                );
            }
        }
        expired.len()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
