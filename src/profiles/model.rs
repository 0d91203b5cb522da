//! User profile data model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Maximum characters of bio text shown on a feed card.
pub const BIO_EXCERPT_CHARS: usize = 100;

/// Longest accepted profile photo URL.
pub const MAX_PHOTO_URL_LEN: usize = 2048;

/// One row per user: onboarding answers, voice/agent identifiers and
/// readiness flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    /// Auth subject this row belongs to. Unique and immutable.
    pub user_id: String,
    pub display_name: String,
    #[serde(default)]
    pub age: Option<i64>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub location_city: Option<String>,
    #[serde(default)]
    pub location_region: Option<String>,
    #[serde(default)]
    pub profile_photo_url: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub onboarding_summary: Option<String>,
    #[serde(default)]
    pub onboarding_tags: Vec<String>,
    #[serde(default)]
    pub user_profile_prompt: Option<String>,
    #[serde(default)]
    pub user_preferences_prompt: Option<String>,
    #[serde(default)]
    pub user_important_notes: Option<String>,
    #[serde(default)]
    pub cloned_voice_id: Option<String>,
    #[serde(default)]
    pub voice_cloning_consent: bool,
    #[serde(default)]
    pub voice_cloning_consent_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub cloned_agent_id: Option<String>,
    #[serde(default)]
    pub agent_ready: bool,
    #[serde(default)]
    pub onboarding_completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserProfile {
    /// A fresh row as created at sign-up.
    pub fn new(user_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            display_name: display_name.into(),
            age: None,
            gender: None,
            location_city: None,
            location_region: None,
            profile_photo_url: None,
            bio: None,
            onboarding_summary: None,
            onboarding_tags: Vec::new(),
            user_profile_prompt: None,
            user_preferences_prompt: None,
            user_important_notes: None,
            cloned_voice_id: None,
            voice_cloning_consent: false,
            voice_cloning_consent_at: None,
            cloned_agent_id: None,
            agent_ready: false,
            onboarding_completed: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Voice id, if one is stored and non-blank.
    pub fn voice_id(&self) -> Option<&str> {
        non_blank(self.cloned_voice_id.as_deref())
    }

    /// Whether the feed may surface this profile.
    pub fn is_callable(&self) -> bool {
        self.agent_ready && non_blank(self.cloned_agent_id.as_deref()).is_some()
    }
}

/// The text fields written by onboarding analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfilePrompts {
    pub user_profile_prompt: String,
    pub user_preferences_prompt: String,
    pub user_important_notes: String,
}

/// Upsert written at the end of onboarding.
///
/// `None` answers leave the stored value untouched.
#[derive(Debug, Clone)]
pub struct OnboardingUpsert {
    pub user_id: String,
    pub display_name: Option<String>,
    pub age: Option<i64>,
    pub gender: Option<String>,
    pub prompts: ProfilePrompts,
}

/// Editable profile details: location and photo.
///
/// Every save writes all three fields; `None` clears a field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ProfileDetails {
    #[serde(default)]
    pub location_city: Option<String>,
    #[serde(default)]
    pub location_region: Option<String>,
    #[serde(default)]
    pub profile_photo_url: Option<String>,
}

impl ProfileDetails {
    /// Trim location fields; blank values become `None`.
    pub fn normalized(self) -> Self {
        let clean = |v: Option<String>| {
            v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
        };
        Self {
            location_city: clean(self.location_city),
            location_region: clean(self.location_region),
            profile_photo_url: self.profile_photo_url.filter(|s| !s.trim().is_empty()),
        }
    }
}

/// A ready profile as shown in the swipe feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedCard {
    pub id: String,
    pub display_name: String,
    pub age: Option<i64>,
    pub location_city: Option<String>,
    pub location_region: Option<String>,
    pub profile_photo_url: Option<String>,
    pub agent_id: Option<String>,
    pub tag: String,
    pub bio_excerpt: String,
}

impl From<&UserProfile> for FeedCard {
    fn from(p: &UserProfile) -> Self {
        Self {
            id: p.id.clone(),
            display_name: p.display_name.clone(),
            age: p.age,
            location_city: p.location_city.clone(),
            location_region: p.location_region.clone(),
            profile_photo_url: p.profile_photo_url.clone(),
            agent_id: p.cloned_agent_id.clone(),
            tag: profile_tag(p),
            bio_excerpt: bio_excerpt(p),
        }
    }
}

/// First onboarding tag, or "New here".
pub fn profile_tag(p: &UserProfile) -> String {
    p.onboarding_tags
        .first()
        .cloned()
        .unwrap_or_else(|| "New here".to_string())
}

/// Quoted bio (or onboarding summary) cut to [`BIO_EXCERPT_CHARS`].
pub fn bio_excerpt(p: &UserProfile) -> String {
    let source = non_blank(p.bio.as_deref()).or_else(|| non_blank(p.onboarding_summary.as_deref()));
    match source {
        Some(text) if text.chars().count() > BIO_EXCERPT_CHARS => {
            let cut: String = text.chars().take(BIO_EXCERPT_CHARS).collect();
            format!("\"{cut}...\"")
        }
        Some(text) => format!("\"{text}\""),
        None => "\"Looking forward to connecting...\"".to_string(),
    }
}

pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}
