//! Entity store
//!
//! Upsert-by-external-identifier against the shared court/judge store. The
//! Postgres implementation performs field-scoped updates: only the columns
//! sourced from the snapshot are written, so columns owned by other
//! subsystems (display slug, generated analytics) survive every import run.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use std::time::Duration;
use tracing::info;

use crate::config::DatabaseConfig;
use crate::error::ImportError;
use crate::models::{CourtRecord, JudgeRecord};

/// Result of an upsert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    Updated,
}

/// Write interface to the shared court/judge entity store
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Insert or update a court by external identifier
    async fn upsert_court(&self, record: &CourtRecord, payload: &Value) -> Result<UpsertOutcome>;

    /// Insert or update a judge by external identifier
    async fn upsert_judge(&self, record: &JudgeRecord, payload: &Value) -> Result<UpsertOutcome>;
}

/// Postgres-backed entity store
#[derive(Clone)]
pub struct PgEntityStore {
    pool: PgPool,
}

impl PgEntityStore {
    /// Connect to the store and apply pending migrations
    ///
    /// An unreachable store is a configuration-class failure: nothing has
    /// started streaming yet and no dataset can proceed without it.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, ImportError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .connect(&config.url)
            .await
            .map_err(|e| {
                ImportError::Configuration(format!("failed to connect to entity store: {e}"))
            })?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| ImportError::Configuration(format!("failed to run migrations: {e}")))?;

        info!("Connected to entity store");
        Ok(Self { pool })
    }

    /// Wrap an existing pool (tests, embedding)
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EntityStore for PgEntityStore {
    async fn upsert_court(&self, record: &CourtRecord, payload: &Value) -> Result<UpsertOutcome> {
        // Field-scoped upsert: slug, analytics and other non-imported columns
        // are deliberately absent from the UPDATE clause.
        let row = sqlx::query(
            r#"
            INSERT INTO courts (external_id, name, jurisdiction, court_level, location, website, payload)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (external_id) DO UPDATE SET
                name = EXCLUDED.name,
                jurisdiction = EXCLUDED.jurisdiction,
                court_level = EXCLUDED.court_level,
                location = EXCLUDED.location,
                website = EXCLUDED.website,
                payload = EXCLUDED.payload,
                updated_at = NOW()
            RETURNING (xmax = 0) AS inserted
            "#,
        )
        .bind(&record.id)
        .bind(&record.full_name)
        .bind(&record.jurisdiction)
        .bind(&record.court_level)
        .bind(&record.location)
        .bind(&record.website)
        .bind(payload)
        .fetch_one(&self.pool)
        .await
        .with_context(|| format!("court upsert failed for {}", record.id))?;

        let inserted: bool = row.try_get("inserted").context("missing inserted flag")?;
        Ok(if inserted {
            UpsertOutcome::Created
        } else {
            UpsertOutcome::Updated
        })
    }

    async fn upsert_judge(&self, record: &JudgeRecord, payload: &Value) -> Result<UpsertOutcome> {
        let positions =
            serde_json::to_value(&record.positions).context("failed to serialize positions")?;

        let row = sqlx::query(
            r#"
            INSERT INTO judges (external_id, name, positions, payload)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (external_id) DO UPDATE SET
                name = EXCLUDED.name,
                positions = EXCLUDED.positions,
                payload = EXCLUDED.payload,
                updated_at = NOW()
            RETURNING (xmax = 0) AS inserted
            "#,
        )
        .bind(&record.id)
        .bind(&record.name_full)
        .bind(&positions)
        .bind(payload)
        .fetch_one(&self.pool)
        .await
        .with_context(|| format!("judge upsert failed for {}", record.id))?;

        let inserted: bool = row.try_get("inserted").context("missing inserted flag")?;
        Ok(if inserted {
            UpsertOutcome::Created
        } else {
            UpsertOutcome::Updated
        })
    }
}

pub mod memory {
    //! In-memory entity store, used by the test suites

    use std::collections::BTreeMap;
    use std::sync::Mutex;

    use super::*;

    /// One stored entity row
    #[derive(Debug, Clone, PartialEq)]
    pub struct StoredEntity {
        pub external_id: String,
        pub name: Option<String>,
        pub payload: Value,
        /// Owned by other subsystems; upserts must never touch it
        pub analytics: Option<Value>,
        /// Number of writes this row has received
        pub writes: u64,
    }

    /// Map-backed implementation of [`EntityStore`]
    #[derive(Default)]
    pub struct MemoryStore {
        courts: Mutex<BTreeMap<String, StoredEntity>>,
        judges: Mutex<BTreeMap<String, StoredEntity>>,
    }

    impl MemoryStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn court(&self, external_id: &str) -> Option<StoredEntity> {
            self.courts.lock().unwrap().get(external_id).cloned()
        }

        pub fn judge(&self, external_id: &str) -> Option<StoredEntity> {
            self.judges.lock().unwrap().get(external_id).cloned()
        }

        pub fn court_count(&self) -> usize {
            self.courts.lock().unwrap().len()
        }

        pub fn judge_count(&self) -> usize {
            self.judges.lock().unwrap().len()
        }

        pub fn judges_snapshot(&self) -> BTreeMap<String, StoredEntity> {
            self.judges.lock().unwrap().clone()
        }

        /// Simulate another subsystem writing its own field
        pub fn set_court_analytics(&self, external_id: &str, analytics: Value) {
            if let Some(entity) = self.courts.lock().unwrap().get_mut(external_id) {
                entity.analytics = Some(analytics);
            }
        }

        fn upsert(
            map: &Mutex<BTreeMap<String, StoredEntity>>,
            external_id: &str,
            name: Option<String>,
            payload: &Value,
        ) -> UpsertOutcome {
            let mut map = map.lock().unwrap();
            match map.get_mut(external_id) {
                Some(entity) => {
                    entity.name = name;
                    entity.payload = payload.clone();
                    entity.writes += 1;
                    UpsertOutcome::Updated
                },
                None => {
                    map.insert(
                        external_id.to_string(),
                        StoredEntity {
                            external_id: external_id.to_string(),
                            name,
                            payload: payload.clone(),
                            analytics: None,
                            writes: 1,
                        },
                    );
                    UpsertOutcome::Created
                },
            }
        }
    }

    #[async_trait]
    impl EntityStore for MemoryStore {
        async fn upsert_court(
            &self,
            record: &CourtRecord,
            payload: &Value,
        ) -> Result<UpsertOutcome> {
            Ok(Self::upsert(
                &self.courts,
                &record.id,
                record.full_name.clone(),
                payload,
            ))
        }

        async fn upsert_judge(
            &self,
            record: &JudgeRecord,
            payload: &Value,
        ) -> Result<UpsertOutcome> {
            Ok(Self::upsert(
                &self.judges,
                &record.id,
                record.name_full.clone(),
                payload,
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::memory::MemoryStore;
    use super::*;
    use serde_json::json;

    fn court(id: &str, name: &str) -> CourtRecord {
        CourtRecord {
            id: id.to_string(),
            full_name: Some(name.to_string()),
            jurisdiction: None,
            court_level: None,
            location: None,
            website: None,
        }
    }

    #[tokio::test]
    async fn test_memory_store_creates_then_updates() {
        let store = MemoryStore::new();
        let payload = json!({"id": "cal", "full_name": "Supreme Court of California"});

        let first = store
            .upsert_court(&court("cal", "Supreme Court of California"), &payload)
            .await
            .unwrap();
        assert_eq!(first, UpsertOutcome::Created);

        let second = store
            .upsert_court(&court("cal", "Supreme Court of California (renamed)"), &payload)
            .await
            .unwrap();
        assert_eq!(second, UpsertOutcome::Updated);

        assert_eq!(store.court_count(), 1);
        let entity = store.court("cal").unwrap();
        assert_eq!(entity.writes, 2);
        assert_eq!(
            entity.name.as_deref(),
            Some("Supreme Court of California (renamed)")
        );
    }

    #[tokio::test]
    async fn test_memory_store_preserves_foreign_fields_on_update() {
        let store = MemoryStore::new();
        let payload = json!({"id": "cal"});

        store
            .upsert_court(&court("cal", "Supreme Court of California"), &payload)
            .await
            .unwrap();
        store.set_court_analytics("cal", json!({"score": 0.93}));

        let newer = json!({"id": "cal", "extra": "field"});
        store
            .upsert_court(&court("cal", "Supreme Court of California"), &newer)
            .await
            .unwrap();

        let entity = store.court("cal").unwrap();
        assert_eq!(entity.analytics, Some(json!({"score": 0.93})));
        assert_eq!(entity.payload, newer);
    }
}
