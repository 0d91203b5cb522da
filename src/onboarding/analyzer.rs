//! Onboarding analysis: interview answers to profile prompt text.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::error::LlmError;
use crate::profiles::ProfilePrompts;

const NOT_PROVIDED: &str = "Not provided";

/// Answers collected during the voice interview.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct OnboardingAnswers {
    #[serde(default)]
    pub name: Option<String>,
    /// Number or string; see [`parse_age`].
    #[serde(default)]
    pub age: Option<Value>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(rename = "lookingFor", default)]
    pub looking_for: Option<String>,
}

impl OnboardingAnswers {
    pub fn age_years(&self) -> Option<i64> {
        self.age.as_ref().and_then(parse_age)
    }

    fn age_text(&self) -> String {
        match &self.age {
            Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
            Some(Value::Number(n)) => n.to_string(),
            _ => NOT_PROVIDED.to_string(),
        }
    }
}

/// Leading-integer parse: `"29"`, `" 31 years"`, `29.7` all yield a value.
pub fn parse_age(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => {
            let s = s.trim_start();
            let (sign, digits) = match s.strip_prefix('-') {
                Some(rest) => (-1, rest),
                None => (1, s.strip_prefix('+').unwrap_or(s)),
            };
            let end = digits
                .char_indices()
                .find(|(_, c)| !c.is_ascii_digit())
                .map_or(digits.len(), |(i, _)| i);
            digits[..end].parse::<i64>().ok().map(|n| sign * n)
        }
        _ => None,
    }
}

/// Turns interview answers (and the transcript, when available) into the
/// three profile prompt blocks.
#[async_trait]
pub trait ProfileAnalyzer: Send + Sync {
    async fn analyze(
        &self,
        answers: &OnboardingAnswers,
        transcript: Option<&str>,
    ) -> Result<ProfilePrompts, LlmError>;
}

/// Deterministic analyzer that fills fixed templates with the raw answers.
///
/// The transcript is ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateAnalyzer;

#[async_trait]
impl ProfileAnalyzer for TemplateAnalyzer {
    async fn analyze(
        &self,
        answers: &OnboardingAnswers,
        _transcript: Option<&str>,
    ) -> Result<ProfilePrompts, LlmError> {
        let name = text_or_default(answers.name.as_deref());
        let gender = text_or_default(answers.gender.as_deref());
        let looking_for = text_or_default(answers.looking_for.as_deref());
        let age = answers.age_text();

        let user_profile_prompt = format!(
            "Name: {name}\n\
             Age: {age}\n\
             Gender: {gender}\n\
             \n\
             Personality Summary:\n\
             (Generated from interview)\n\
             {name} appears to be an outgoing and friendly individual who values authentic connections.\n\
             They enjoy casual conversation and have a warm demeanor."
        );
        let user_preferences_prompt = format!(
            "Looking for: {looking_for}\n\
             \n\
             Preferences Summary:\n\
             (Generated from interview)\n\
             They are interested in meeting {looking_for} who share similar values.\n\
             They appreciate honesty and good communication."
        );
        let user_important_notes = "Notes:\n\
             - Has completed the voice onboarding interview.\n\
             - Expressed interest in long-term relationships."
            .to_string();

        Ok(ProfilePrompts {
            user_profile_prompt,
            user_preferences_prompt,
            user_important_notes,
        })
    }
}

fn text_or_default(value: Option<&str>) -> &str {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(NOT_PROVIDED)
}
