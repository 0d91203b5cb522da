//! Onboarding: turns the voice interview into profile prompt text.

pub mod analyzer;
pub mod routes;

pub use analyzer::{OnboardingAnswers, ProfileAnalyzer, TemplateAnalyzer, parse_age};
pub use routes::onboarding_routes;
