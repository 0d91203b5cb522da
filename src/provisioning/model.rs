//! Provisioning ledger records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Which vendor resource a ledger row tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProvisionKind {
    VoiceClone,
    Agent,
}

impl ProvisionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::VoiceClone => "voice_clone",
            Self::Agent => "agent",
        }
    }
}

impl std::fmt::Display for ProvisionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProvisionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "voice_clone" => Ok(Self::VoiceClone),
            "agent" => Ok(Self::Agent),
            other => Err(format!("unknown provision kind: {other}")),
        }
    }
}

/// Lifecycle of a ledger row.
///
/// `Pending → Created → Persisted`, or `Pending → Failed`. A `Created` row
/// that a newer resource of the same kind replaced becomes `Superseded`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProvisionState {
    /// Vendor call not yet answered.
    Pending,
    /// Vendor resource exists; the profile may not reference it yet.
    Created,
    /// The profile row holds the resource id.
    Persisted,
    /// The vendor call failed or never completed.
    Failed,
    /// A newer resource of the same kind replaced this one before it was
    /// stored.
    Superseded,
}

impl ProvisionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Created => "created",
            Self::Persisted => "persisted",
            Self::Failed => "failed",
            Self::Superseded => "superseded",
        }
    }

    /// The only state a row may enter `self` from.
    pub fn predecessor(&self) -> Option<ProvisionState> {
        match self {
            Self::Pending => None,
            Self::Created | Self::Failed => Some(Self::Pending),
            Self::Persisted | Self::Superseded => Some(Self::Created),
        }
    }

    pub fn can_transition_to(&self, target: ProvisionState) -> bool {
        target.predecessor() == Some(*self)
    }
}

impl std::fmt::Display for ProvisionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProvisionState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "created" => Ok(Self::Created),
            "persisted" => Ok(Self::Persisted),
            "failed" => Ok(Self::Failed),
            "superseded" => Ok(Self::Superseded),
            other => Err(format!("unknown provision state: {other}")),
        }
    }
}

/// One attempt to create a vendor resource for a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvisionRecord {
    /// Idempotency key, generated before the vendor call.
    pub key: Uuid,
    pub user_id: String,
    pub kind: ProvisionKind,
    pub state: ProvisionState,
    pub resource_id: Option<String>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProvisionRecord {
    pub fn pending(user_id: impl Into<String>, kind: ProvisionKind) -> Self {
        let now = Utc::now();
        Self {
            key: Uuid::new_v4(),
            user_id: user_id.into(),
            kind,
            state: ProvisionState::Pending,
            resource_id: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }
}
