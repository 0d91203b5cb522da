//! VoiceDate: voice-first dating backend.

pub mod agent;
pub mod app;
pub mod auth;
pub mod config;
pub mod error;
pub mod feed;
pub mod llm;
pub mod music;
pub mod onboarding;
pub mod profiles;
pub mod provisioning;
pub mod store;
pub mod voice;
