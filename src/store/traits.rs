//! `Database` trait: single async interface for all persistence.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::DatabaseError;
use crate::profiles::{OnboardingUpsert, ProfileDetails, UserProfile};
use crate::provisioning::{ProvisionRecord, ProvisionState};

/// Backend-agnostic database trait covering profiles and the provisioning
/// ledger.
///
/// Every profile mutation is a last-write-wins update scoped by `user_id`.
/// Mutators return `false` when no row matched.
#[async_trait]
pub trait Database: Send + Sync {
    /// Run all pending schema migrations.
    async fn run_migrations(&self) -> Result<(), DatabaseError>;

    // ── Profiles ────────────────────────────────────────────────────

    /// Insert a new profile row (sign-up).
    async fn insert_profile(&self, profile: &UserProfile) -> Result<(), DatabaseError>;

    /// Get the profile owned by `user_id`.
    async fn get_profile(&self, user_id: &str) -> Result<Option<UserProfile>, DatabaseError>;

    /// Create or update the row with onboarding answers and mark onboarding
    /// complete.
    async fn upsert_onboarding(&self, upsert: &OnboardingUpsert) -> Result<(), DatabaseError>;

    /// Store a cloned voice id with the consent timestamp.
    async fn set_cloned_voice(
        &self,
        user_id: &str,
        voice_id: &str,
        consent_at: DateTime<Utc>,
    ) -> Result<bool, DatabaseError>;

    /// Store an agent id and flip `agent_ready`.
    async fn set_cloned_agent(&self, user_id: &str, agent_id: &str) -> Result<bool, DatabaseError>;

    /// Overwrite location and photo fields.
    async fn update_profile_details(
        &self,
        user_id: &str,
        details: &ProfileDetails,
    ) -> Result<bool, DatabaseError>;

    /// Profiles with `agent_ready = true`, newest first.
    async fn list_ready_profiles(&self) -> Result<Vec<UserProfile>, DatabaseError>;

    // ── Provisioning ledger ─────────────────────────────────────────

    /// Record a new (pending) provisioning attempt.
    async fn insert_provision(&self, record: &ProvisionRecord) -> Result<(), DatabaseError>;

    /// Get a ledger row by idempotency key.
    async fn get_provision(&self, key: Uuid) -> Result<Option<ProvisionRecord>, DatabaseError>;

    /// Move a row to `state`, optionally recording the vendor resource id or
    /// an error. Returns `false` if the row is missing or the transition is
    /// not allowed from its current state.
    async fn transition_provision(
        &self,
        key: Uuid,
        state: ProvisionState,
        resource_id: Option<&str>,
        error: Option<&str>,
    ) -> Result<bool, DatabaseError>;

    /// All ledger rows currently in `state`, oldest first.
    async fn list_provisions(
        &self,
        state: ProvisionState,
    ) -> Result<Vec<ProvisionRecord>, DatabaseError>;

    /// Mark pending rows created before `cutoff` as failed. Returns the count.
    async fn fail_stale_provisions(&self, cutoff: DateTime<Utc>) -> Result<usize, DatabaseError>;
}
