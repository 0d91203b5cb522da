//! libSQL backend: async `Database` trait implementation.
//!
//! Supports local file and in-memory databases.

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use libsql::{Connection, params};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::DatabaseError;
use crate::profiles::{OnboardingUpsert, ProfileDetails, UserProfile};
use crate::provisioning::{ProvisionKind, ProvisionRecord, ProvisionState};
use crate::store::migrations;
use crate::store::traits::Database;

/// libSQL database backend.
///
/// Stores a single connection that is reused for all operations.
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlBackend {
    conn: Connection,
}

impl LibSqlBackend {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(format!("Failed to open libSQL database: {e}")))?;

        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;

        let backend = Self { conn };
        backend.run_migrations().await?;
        info!(path = %path.display(), "Database opened");
        Ok(backend)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                DatabaseError::Pool(format!("Failed to create in-memory database: {e}"))
            })?;

        let conn = db
            .connect()
            .map_err(|e| DatabaseError::Pool(format!("Failed to create connection: {e}")))?;

        let backend = Self { conn };
        backend.run_migrations().await?;
        Ok(backend)
    }

    fn conn(&self) -> &Connection {
        &self.conn
    }
}

// ── Helper functions ────────────────────────────────────────────────

/// Canonical timestamp format. Fixed precision keeps text ordering equal to
/// time ordering.
fn fmt_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse an RFC 3339 or SQLite datetime string into DateTime<Utc>.
fn parse_datetime(s: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
        return ndt.and_utc();
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return ndt.and_utc();
    }
    DateTime::<Utc>::MIN_UTC
}

fn parse_optional_datetime(s: &Option<String>) -> Option<DateTime<Utc>> {
    s.as_ref().map(|s| parse_datetime(s))
}

const PROFILE_COLUMNS: &str = "id, user_id, display_name, age, gender, location_city, \
    location_region, profile_photo_url, bio, onboarding_summary, onboarding_tags, \
    user_profile_prompt, user_preferences_prompt, user_important_notes, cloned_voice_id, \
    voice_cloning_consent, voice_cloning_consent_at, cloned_agent_id, agent_ready, \
    onboarding_completed, created_at, updated_at";

/// Map a libsql Row to a UserProfile. Column order matches PROFILE_COLUMNS.
fn row_to_profile(row: &libsql::Row) -> Result<UserProfile, libsql::Error> {
    let tags_str: String = row.get::<String>(10).unwrap_or_else(|_| "[]".into());
    let consent_at: Option<String> = row.get(16)?;
    let created_str: String = row.get(20)?;
    let updated_str: String = row.get(21)?;

    Ok(UserProfile {
        id: row.get(0)?,
        user_id: row.get(1)?,
        display_name: row.get(2)?,
        age: row.get(3)?,
        gender: row.get(4)?,
        location_city: row.get(5)?,
        location_region: row.get(6)?,
        profile_photo_url: row.get(7)?,
        bio: row.get(8)?,
        onboarding_summary: row.get(9)?,
        onboarding_tags: serde_json::from_str(&tags_str).unwrap_or_default(),
        user_profile_prompt: row.get(11)?,
        user_preferences_prompt: row.get(12)?,
        user_important_notes: row.get(13)?,
        cloned_voice_id: row.get(14)?,
        voice_cloning_consent: row.get::<i64>(15)? != 0,
        voice_cloning_consent_at: parse_optional_datetime(&consent_at),
        cloned_agent_id: row.get(17)?,
        agent_ready: row.get::<i64>(18)? != 0,
        onboarding_completed: row.get::<i64>(19)? != 0,
        created_at: parse_datetime(&created_str),
        updated_at: parse_datetime(&updated_str),
    })
}

const PROVISION_COLUMNS: &str =
    "key, user_id, kind, state, resource_id, error, created_at, updated_at";

/// Map a libsql Row to a ProvisionRecord. Column order matches PROVISION_COLUMNS.
fn row_to_provision(row: &libsql::Row) -> Result<ProvisionRecord, DatabaseError> {
    let read = |e: libsql::Error| DatabaseError::Query(format!("row_to_provision: {e}"));

    let key_str: String = row.get(0).map_err(read)?;
    let kind_str: String = row.get(2).map_err(read)?;
    let state_str: String = row.get(3).map_err(read)?;
    let created_str: String = row.get(6).map_err(read)?;
    let updated_str: String = row.get(7).map_err(read)?;

    Ok(ProvisionRecord {
        key: Uuid::parse_str(&key_str)
            .map_err(|e| DatabaseError::Serialization(format!("bad provision key: {e}")))?,
        user_id: row.get(1).map_err(read)?,
        kind: kind_str
            .parse::<ProvisionKind>()
            .map_err(DatabaseError::Serialization)?,
        state: state_str
            .parse::<ProvisionState>()
            .map_err(DatabaseError::Serialization)?,
        resource_id: row.get(4).map_err(read)?,
        error: row.get(5).map_err(read)?,
        created_at: parse_datetime(&created_str),
        updated_at: parse_datetime(&updated_str),
    })
}

#[async_trait]
impl Database for LibSqlBackend {
    async fn run_migrations(&self) -> Result<(), DatabaseError> {
        migrations::run_migrations(self.conn()).await
    }

    // ── Profiles ────────────────────────────────────────────────────

    async fn insert_profile(&self, profile: &UserProfile) -> Result<(), DatabaseError> {
        let tags = serde_json::to_string(&profile.onboarding_tags)
            .map_err(|e| DatabaseError::Serialization(e.to_string()))?;

        self.conn()
            .execute(
                &format!(
                    "INSERT INTO user_profiles ({PROFILE_COLUMNS}) VALUES \
                     (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, \
                      ?17, ?18, ?19, ?20, ?21, ?22)"
                ),
                params![
                    profile.id.as_str(),
                    profile.user_id.as_str(),
                    profile.display_name.as_str(),
                    profile.age,
                    profile.gender.clone(),
                    profile.location_city.clone(),
                    profile.location_region.clone(),
                    profile.profile_photo_url.clone(),
                    profile.bio.clone(),
                    profile.onboarding_summary.clone(),
                    tags,
                    profile.user_profile_prompt.clone(),
                    profile.user_preferences_prompt.clone(),
                    profile.user_important_notes.clone(),
                    profile.cloned_voice_id.clone(),
                    profile.voice_cloning_consent as i64,
                    profile.voice_cloning_consent_at.as_ref().map(fmt_datetime),
                    profile.cloned_agent_id.clone(),
                    profile.agent_ready as i64,
                    profile.onboarding_completed as i64,
                    fmt_datetime(&profile.created_at),
                    fmt_datetime(&profile.updated_at),
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("insert_profile: {e}")))?;

        debug!(user_id = %profile.user_id, "Profile inserted");
        Ok(())
    }

    async fn get_profile(&self, user_id: &str) -> Result<Option<UserProfile>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {PROFILE_COLUMNS} FROM user_profiles WHERE user_id = ?1"),
                params![user_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_profile: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => row_to_profile(&row)
                .map(Some)
                .map_err(|e| DatabaseError::Query(format!("get_profile row: {e}"))),
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("get_profile: {e}"))),
        }
    }

    async fn upsert_onboarding(&self, upsert: &OnboardingUpsert) -> Result<(), DatabaseError> {
        let now = fmt_datetime(&Utc::now());
        self.conn()
            .execute(
                "INSERT INTO user_profiles (id, user_id, display_name, age, gender, \
                     user_profile_prompt, user_preferences_prompt, user_important_notes, \
                     onboarding_completed, created_at, updated_at)
                 VALUES (?1, ?2, COALESCE(?3, ''), ?4, ?5, ?6, ?7, ?8, 1, ?9, ?9)
                 ON CONFLICT (user_id) DO UPDATE SET
                     display_name = COALESCE(?3, user_profiles.display_name),
                     age = COALESCE(?4, user_profiles.age),
                     gender = COALESCE(?5, user_profiles.gender),
                     user_profile_prompt = excluded.user_profile_prompt,
                     user_preferences_prompt = excluded.user_preferences_prompt,
                     user_important_notes = excluded.user_important_notes,
                     onboarding_completed = 1,
                     updated_at = excluded.updated_at",
                params![
                    Uuid::new_v4().to_string(),
                    upsert.user_id.as_str(),
                    upsert.display_name.clone(),
                    upsert.age,
                    upsert.gender.clone(),
                    upsert.prompts.user_profile_prompt.as_str(),
                    upsert.prompts.user_preferences_prompt.as_str(),
                    upsert.prompts.user_important_notes.as_str(),
                    now,
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("upsert_onboarding: {e}")))?;
        Ok(())
    }

    async fn set_cloned_voice(
        &self,
        user_id: &str,
        voice_id: &str,
        consent_at: DateTime<Utc>,
    ) -> Result<bool, DatabaseError> {
        let now = fmt_datetime(&Utc::now());
        let count = self
            .conn()
            .execute(
                "UPDATE user_profiles SET cloned_voice_id = ?1, voice_cloning_consent = 1, \
                 voice_cloning_consent_at = ?2, updated_at = ?3 WHERE user_id = ?4",
                params![voice_id, fmt_datetime(&consent_at), now, user_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("set_cloned_voice: {e}")))?;
        Ok(count > 0)
    }

    async fn set_cloned_agent(&self, user_id: &str, agent_id: &str) -> Result<bool, DatabaseError> {
        let now = fmt_datetime(&Utc::now());
        let count = self
            .conn()
            .execute(
                "UPDATE user_profiles SET cloned_agent_id = ?1, agent_ready = 1, updated_at = ?2 \
                 WHERE user_id = ?3",
                params![agent_id, now, user_id],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("set_cloned_agent: {e}")))?;
        Ok(count > 0)
    }

    async fn update_profile_details(
        &self,
        user_id: &str,
        details: &ProfileDetails,
    ) -> Result<bool, DatabaseError> {
        let now = fmt_datetime(&Utc::now());
        let count = self
            .conn()
            .execute(
                "UPDATE user_profiles SET location_city = ?1, location_region = ?2, \
                 profile_photo_url = ?3, updated_at = ?4 WHERE user_id = ?5",
                params![
                    details.location_city.clone(),
                    details.location_region.clone(),
                    details.profile_photo_url.clone(),
                    now,
                    user_id
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("update_profile_details: {e}")))?;
        Ok(count > 0)
    }

    async fn list_ready_profiles(&self) -> Result<Vec<UserProfile>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!(
                    "SELECT {PROFILE_COLUMNS} FROM user_profiles WHERE agent_ready = 1 \
                     ORDER BY created_at DESC"
                ),
                (),
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("list_ready_profiles: {e}")))?;

        let mut profiles = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("list_ready_profiles: {e}")))?
        {
            profiles.push(
                row_to_profile(&row)
                    .map_err(|e| DatabaseError::Query(format!("list_ready_profiles row: {e}")))?,
            );
        }
        Ok(profiles)
    }

    // ── Provisioning ledger ─────────────────────────────────────────

    async fn insert_provision(&self, record: &ProvisionRecord) -> Result<(), DatabaseError> {
        self.conn()
            .execute(
                &format!(
                    "INSERT INTO provisioning ({PROVISION_COLUMNS}) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"
                ),
                params![
                    record.key.to_string(),
                    record.user_id.as_str(),
                    record.kind.as_str(),
                    record.state.as_str(),
                    record.resource_id.clone(),
                    record.error.clone(),
                    fmt_datetime(&record.created_at),
                    fmt_datetime(&record.updated_at),
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("insert_provision: {e}")))?;
        Ok(())
    }

    async fn get_provision(&self, key: Uuid) -> Result<Option<ProvisionRecord>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {PROVISION_COLUMNS} FROM provisioning WHERE key = ?1"),
                params![key.to_string()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("get_provision: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => row_to_provision(&row).map(Some),
            Ok(None) => Ok(None),
            Err(e) => Err(DatabaseError::Query(format!("get_provision: {e}"))),
        }
    }

    async fn transition_provision(
        &self,
        key: Uuid,
        state: ProvisionState,
        resource_id: Option<&str>,
        error: Option<&str>,
    ) -> Result<bool, DatabaseError> {
        let Some(from) = state.predecessor() else {
            return Ok(false);
        };
        let now = fmt_datetime(&Utc::now());
        let count = self
            .conn()
            .execute(
                "UPDATE provisioning SET state = ?1, resource_id = COALESCE(?2, resource_id), \
                 error = COALESCE(?3, error), updated_at = ?4 WHERE key = ?5 AND state = ?6",
                params![
                    state.as_str(),
                    resource_id,
                    error,
                    now,
                    key.to_string(),
                    from.as_str()
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("transition_provision: {e}")))?;
        Ok(count > 0)
    }

    async fn list_provisions(
        &self,
        state: ProvisionState,
    ) -> Result<Vec<ProvisionRecord>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!(
                    "SELECT {PROVISION_COLUMNS} FROM provisioning WHERE state = ?1 \
                     ORDER BY created_at ASC"
                ),
                params![state.as_str()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("list_provisions: {e}")))?;

        let mut records = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("list_provisions: {e}")))?
        {
            records.push(row_to_provision(&row)?);
        }
        Ok(records)
    }

    async fn fail_stale_provisions(&self, cutoff: DateTime<Utc>) -> Result<usize, DatabaseError> {
        let now = fmt_datetime(&Utc::now());
        let count = self
            .conn()
            .execute(
                "UPDATE provisioning SET state = 'failed', \
                 error = COALESCE(error, 'vendor call never completed'), updated_at = ?1 \
                 WHERE state = 'pending' AND created_at < ?2",
                params![now, fmt_datetime(&cutoff)],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("fail_stale_provisions: {e}")))?;
        Ok(count as usize)
    }
}
