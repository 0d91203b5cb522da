//! Background repair of vendor resources whose profile update was lost.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};

use super::model::{ProvisionKind, ProvisionRecord, ProvisionState};
use crate::error::DatabaseError;
use crate::store::Database;

/// Pending rows older than this many seconds are assumed abandoned.
pub const PENDING_TIMEOUT_SECS: i64 = 3600;

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// `created` rows now applied to their profile.
    pub repaired: usize,
    /// `created` rows whose profile row does not exist (yet).
    pub orphaned: usize,
    /// Abandoned `pending` rows marked failed.
    pub abandoned: usize,
    /// `created` rows skipped because a newer resource of the same kind exists.
    pub superseded: usize,
}

/// Run a single reconciliation pass.
pub async fn reconcile_once(db: &dyn Database) -> Result<ReconcileReport, DatabaseError> {
    let mut report = ReconcileReport {
        abandoned: db
            .fail_stale_provisions(Utc::now() - chrono::Duration::seconds(PENDING_TIMEOUT_SECS))
            .await?,
        ..Default::default()
    };

    let created = db.list_provisions(ProvisionState::Created).await?;
    let persisted = db.list_provisions(ProvisionState::Persisted).await?;

    for record in &created {
        if has_newer(record, created.iter().chain(persisted.iter())) {
            if db
                .transition_provision(record.key, ProvisionState::Superseded, None, None)
                .await?
            {
                info!(
                    key = %record.key,
                    user_id = %record.user_id,
                    kind = %record.kind,
                    "Skipped vendor resource replaced by a newer one"
                );
                report.superseded += 1;
            }
            continue;
        }

        match apply(db, record).await {
            Ok(true) => {
                db.transition_provision(record.key, ProvisionState::Persisted, None, None)
                    .await?;
                info!(
                    key = %record.key,
                    user_id = %record.user_id,
                    kind = %record.kind,
                    "Reconciled vendor resource onto profile"
                );
                report.repaired += 1;
            }
            Ok(false) => {
                debug!(key = %record.key, user_id = %record.user_id, "No profile row to reconcile onto");
                report.orphaned += 1;
            }
            Err(e) => {
                warn!(key = %record.key, error = %e, "Reconciliation write failed");
            }
        }
    }

    Ok(report)
}

/// Whether `rows` holds a later resource of the same kind for the same user.
fn has_newer<'a>(
    record: &ProvisionRecord,
    mut rows: impl Iterator<Item = &'a ProvisionRecord>,
) -> bool {
    rows.any(|other| {
        other.key != record.key
            && other.user_id == record.user_id
            && other.kind == record.kind
            && other.created_at > record.created_at
    })
}

async fn apply(db: &dyn Database, record: &ProvisionRecord) -> Result<bool, DatabaseError> {
    let Some(resource_id) = record.resource_id.as_deref() else {
        return Ok(false);
    };
    match record.kind {
        ProvisionKind::VoiceClone => {
            db.set_cloned_voice(&record.user_id, resource_id, record.created_at)
                .await
        }
        ProvisionKind::Agent => db.set_cloned_agent(&record.user_id, resource_id).await,
    }
}

/// Spawn the periodic reconciliation task.
pub fn spawn_reconciler(db: Arc<dyn Database>, every: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            match reconcile_once(db.as_ref()).await {
                Ok(report) if report != ReconcileReport::default() => {
                    info!(
                        repaired = report.repaired,
                        orphaned = report.orphaned,
                        abandoned = report.abandoned,
                        superseded = report.superseded,
                        "Provisioning reconciliation pass"
                    );
                }
                Ok(_) => {}
                Err(e) => warn!(error = %e, "Provisioning reconciliation failed"),
            }
        }
    })
}
