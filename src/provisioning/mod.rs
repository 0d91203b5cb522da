//! Provisioning ledger: two-phase bookkeeping for vendor resources.
//!
//! Creating a voice clone or an agent happens on the vendor side first; the
//! profile row is updated afterwards. The ledger records each attempt under
//! an idempotency key so a failed profile update can be repaired later by the
//! [`reconciler`].

pub mod model;
pub mod reconciler;

use std::sync::Arc;

use tracing::warn;
use uuid::Uuid;

use crate::error::DatabaseError;
use crate::store::Database;

pub use model::{ProvisionKind, ProvisionRecord, ProvisionState};
pub use reconciler::{ReconcileReport, reconcile_once, spawn_reconciler};

/// Handle on the ledger used by request handlers.
#[derive(Clone)]
pub struct Ledger {
    db: Arc<dyn Database>,
}

impl Ledger {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }

    /// Record a pending attempt before calling the vendor.
    pub async fn begin(&self, user_id: &str, kind: ProvisionKind) -> Result<Uuid, DatabaseError> {
        let record = ProvisionRecord::pending(user_id, kind);
        self.db.insert_provision(&record).await?;
        Ok(record.key)
    }

    /// The vendor created `resource_id`.
    pub async fn created(&self, key: Uuid, resource_id: &str) {
        self.transition(key, ProvisionState::Created, Some(resource_id), None)
            .await;
    }

    /// The profile row now references the resource.
    pub async fn persisted(&self, key: Uuid) {
        self.transition(key, ProvisionState::Persisted, None, None).await;
    }

    /// The vendor call failed.
    pub async fn failed(&self, key: Uuid, reason: &str) {
        self.transition(key, ProvisionState::Failed, None, Some(reason))
            .await;
    }

    async fn transition(
        &self,
        key: Uuid,
        state: ProvisionState,
        resource_id: Option<&str>,
        error: Option<&str>,
    ) {
        match self
            .db
            .transition_provision(key, state, resource_id, error)
            .await
        {
            Ok(true) => {}
            Ok(false) => warn!(key = %key, state = %state, "Ledger transition not applied"),
            Err(e) => warn!(key = %key, state = %state, error = %e, "Ledger update failed"),
        }
    }
}
