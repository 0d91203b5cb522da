//! User profiles: the single persisted entity, and its read/edit routes.

pub mod model;
pub mod routes;

pub use model::{FeedCard, OnboardingUpsert, ProfileDetails, ProfilePrompts, UserProfile};
pub use routes::profile_routes;
