//! Profile persistence for call intake.
//!
//! [`ProfileStore`] is the seam the pipeline writes through. Two backends:
//! - [`Storage`]: Turso Embedded / libSQL, the durable store used by the CLI
//! - [`MemoryStore`]: in-process, for tests and ephemeral runs
//!
//! Profiles carry a version number. Writers read a version, compute the
//! merged profile, and write back only if the version is unchanged
//! ([`UpsertOutcome::Conflict`] otherwise), so concurrent calls for the
//! same caller never silently drop each other's fields.

mod memory;
mod migrations;

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use intake_shared::{CallRecord, CallStage, CallerId, IntakeError, Result, StructuredProfile};
use libsql::{Connection, Database, params};

pub use memory::MemoryStore;

/// A caller's profile as last written, with its version.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredProfile {
    pub profile: StructuredProfile,
    /// Starts at 1 and increases by one per successful write.
    pub version: u64,
}

/// Result of a versioned write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// The write landed; the profile is now at `version`.
    Written { version: u64 },
    /// Another writer got there first. Re-read and retry.
    Conflict,
}

/// Durable per-caller profile storage with optimistic concurrency.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// The current profile for `caller`, if one was ever written.
    async fn get_profile(&self, caller: &CallerId) -> Result<Option<StoredProfile>>;

    /// Write `profile` if the stored version still equals `expected_version`.
    ///
    /// `None` means "no profile yet": the write only lands when the caller
    /// has no row.
    async fn upsert_profile(
        &self,
        caller: &CallerId,
        profile: &StructuredProfile,
        expected_version: Option<u64>,
    ) -> Result<UpsertOutcome>;

    /// Append one call to the caller's history.
    async fn record_call(&self, record: &CallRecord) -> Result<()>;

    /// The caller's history, oldest first.
    async fn list_calls(&self, caller: &CallerId) -> Result<Vec<CallRecord>>;
}

/// Primary storage handle wrapping a libSQL database.
pub struct Storage {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
    readonly: bool,
}

impl Storage {
    /// Open or create a database at `path` in read-write mode.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| IntakeError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| IntakeError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| IntakeError::Storage(e.to_string()))?;

        let storage = Self {
            db,
            conn,
            readonly: false,
        };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Open an existing database at `path` for inspection only.
    pub async fn open_readonly(path: &Path) -> Result<Self> {
        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| IntakeError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| IntakeError::Storage(e.to_string()))?;

        Ok(Self {
            db,
            conn,
            readonly: true,
        })
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn.execute_batch(migration.sql).await.map_err(|e| {
                    IntakeError::Storage(format!("migration v{} failed: {e}", migration.version))
                })?;
            }
        }
        Ok(())
    }

    /// Get the current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    /// Ensure we're in read-write mode before writing.
    fn check_writable(&self) -> Result<()> {
        if self.readonly {
            return Err(IntakeError::Storage(
                "database is opened in read-only mode".into(),
            ));
        }
        Ok(())
    }

    /// Every caller with a stored profile, sorted.
    pub async fn list_callers(&self) -> Result<Vec<CallerId>> {
        let mut rows = self
            .conn
            .query("SELECT caller_id FROM profiles ORDER BY caller_id", params![])
            .await
            .map_err(|e| IntakeError::Storage(e.to_string()))?;

        let mut callers = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| IntakeError::Storage(e.to_string()))?
        {
            let id: String = row
                .get(0)
                .map_err(|e| IntakeError::Storage(e.to_string()))?;
            callers.push(CallerId::new(id)?);
        }
        Ok(callers)
    }
}

#[async_trait]
impl ProfileStore for Storage {
    async fn get_profile(&self, caller: &CallerId) -> Result<Option<StoredProfile>> {
        let mut rows = self
            .conn
            .query(
                "SELECT profile_json, version FROM profiles WHERE caller_id = ?1",
                params![caller.as_str()],
            )
            .await
            .map_err(|e| IntakeError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let json: String = row
                    .get(0)
                    .map_err(|e| IntakeError::Storage(e.to_string()))?;
                let version: i64 = row
                    .get(1)
                    .map_err(|e| IntakeError::Storage(e.to_string()))?;
                Ok(Some(StoredProfile {
                    profile: decode_profile(&json)?,
                    version: version as u64,
                }))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(IntakeError::Storage(e.to_string())),
        }
    }

    async fn upsert_profile(
        &self,
        caller: &CallerId,
        profile: &StructuredProfile,
        expected_version: Option<u64>,
    ) -> Result<UpsertOutcome> {
        self.check_writable()?;
        let json = encode_profile(profile)?;
        let now = Utc::now().to_rfc3339();

        let affected = match expected_version {
            None => self
                .conn
                .execute(
                    "INSERT INTO profiles (caller_id, profile_json, version, created_at, updated_at)
                     VALUES (?1, ?2, 1, ?3, ?3)
                     ON CONFLICT(caller_id) DO NOTHING",
                    params![caller.as_str(), json.as_str(), now.as_str()],
                )
                .await,
            Some(version) => self
                .conn
                .execute(
                    "UPDATE profiles SET profile_json = ?1, version = version + 1, updated_at = ?2
                     WHERE caller_id = ?3 AND version = ?4",
                    params![json.as_str(), now.as_str(), caller.as_str(), version as i64],
                )
                .await,
        }
        .map_err(|e| IntakeError::Storage(e.to_string()))?;

        if affected == 0 {
            tracing::debug!(caller = %caller, ?expected_version, "profile version moved");
            return Ok(UpsertOutcome::Conflict);
        }
        Ok(UpsertOutcome::Written {
            version: expected_version.map_or(1, |v| v + 1),
        })
    }

    async fn record_call(&self, record: &CallRecord) -> Result<()> {
        self.check_writable()?;
        let json = encode_profile(&record.profile)?;
        self.conn
            .execute(
                "INSERT INTO call_records
                   (id, caller_id, stage, completeness, confidence, augmentation, profile_json, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    record.id.as_str(),
                    record.caller.as_str(),
                    i64::from(record.stage.number()),
                    i64::from(record.completeness),
                    i64::from(record.confidence),
                    record.augmentation.as_str(),
                    json.as_str(),
                    record.created_at.to_rfc3339(),
                ],
            )
            .await
            .map_err(|e| IntakeError::Storage(e.to_string()))?;
        Ok(())
    }

    async fn list_calls(&self, caller: &CallerId) -> Result<Vec<CallRecord>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, caller_id, stage, completeness, confidence, augmentation, profile_json, created_at
                 FROM call_records WHERE caller_id = ?1 ORDER BY created_at, id",
                params![caller.as_str()],
            )
            .await
            .map_err(|e| IntakeError::Storage(e.to_string()))?;

        let mut results = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| IntakeError::Storage(e.to_string()))?
        {
            results.push(row_to_call_record(&row)?);
        }
        Ok(results)
    }
}

fn encode_profile(profile: &StructuredProfile) -> Result<String> {
    serde_json::to_string(profile).map_err(|e| IntakeError::Storage(format!("encode profile: {e}")))
}

fn decode_profile(json: &str) -> Result<StructuredProfile> {
    serde_json::from_str(json).map_err(|e| IntakeError::Storage(format!("corrupt profile: {e}")))
}

fn row_to_call_record(row: &libsql::Row) -> Result<CallRecord> {
    let stage: i64 = row
        .get(2)
        .map_err(|e| IntakeError::Storage(e.to_string()))?;
    let stage = u8::try_from(stage)
        .map_err(|_| IntakeError::Storage(format!("invalid stage {stage}")))
        .and_then(CallStage::new)?;

    Ok(CallRecord {
        id: row
            .get::<String>(0)
            .map_err(|e| IntakeError::Storage(e.to_string()))?,
        caller: CallerId::new(
            row.get::<String>(1)
                .map_err(|e| IntakeError::Storage(e.to_string()))?,
        )?,
        stage,
        completeness: row
            .get::<i64>(3)
            .map_err(|e| IntakeError::Storage(e.to_string()))?
            .clamp(0, 100) as u8,
        confidence: row
            .get::<i64>(4)
            .map_err(|e| IntakeError::Storage(e.to_string()))?
            .clamp(0, 100) as u8,
        augmentation: row
            .get::<String>(5)
            .map_err(|e| IntakeError::Storage(e.to_string()))?,
        profile: {
            let json: String = row
                .get(6)
                .map_err(|e| IntakeError::Storage(e.to_string()))?;
            decode_profile(&json)?
        },
        created_at: {
            let s: String = row
                .get(7)
                .map_err(|e| IntakeError::Storage(e.to_string()))?;
            DateTime::parse_from_rfc3339(&s)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| IntakeError::Storage(format!("invalid date: {e}")))?
        },
    })
}
