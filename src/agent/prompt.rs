//! Agent system prompt template.
//!
//! Pure string templating: profile text in, agent system prompt out. No I/O.

use crate::error::PromptError;

/// Substituted when a profile has no important notes.
pub const NO_NOTES_FALLBACK: &str = "No additional notes.";

const DEFAULT_AGENT_PROMPT_TEMPLATE: &str = "\
You are a dating agent representing a person on a voice-first dating platform. Your role is to have authentic, engaging conversations with potential matches and help them get to know the person you represent.

## About the Person You Represent

{user_profile_prompt}

## What They're Looking For

{user_preferences_prompt}

## Important Notes

{user_important_notes}

## Your Behavior Guidelines

- Be authentic, friendly, and engaging
- Speak naturally and conversationally, matching the person's communication style
- Ask thoughtful questions to learn about potential matches
- Share relevant information about the person you represent when appropriate
- Be respectful and maintain appropriate boundaries
- If asked about sensitive topics, redirect gracefully or indicate you'd prefer the person themselves answer
- Keep conversations light and positive, but don't shy away from meaningful topics
- Remember you're representing a real person - be genuine, not overly salesy

## Conversation Style

- Use natural, conversational language
- Show genuine interest in learning about the other person
- Be warm and approachable
- Match the energy and tone of the conversation
- Don't be overly formal or scripted

Your goal is to help people connect authentically through conversation.";

/// Profile text the agent prompt is built from.
#[derive(Debug, Clone, Copy, Default)]
pub struct AgentPromptVariables<'a> {
    pub user_profile_prompt: &'a str,
    pub user_preferences_prompt: &'a str,
    pub user_important_notes: Option<&'a str>,
}

/// Build the agent system prompt.
///
/// Both required fields are trimmed and must be non-empty. Missing or blank
/// notes become [`NO_NOTES_FALLBACK`].
pub fn generate_agent_prompt(vars: AgentPromptVariables<'_>) -> Result<String, PromptError> {
    let profile = vars.user_profile_prompt.trim();
    if profile.is_empty() {
        return Err(PromptError::MissingField {
            field: "user_profile_prompt",
        });
    }

    let preferences = vars.user_preferences_prompt.trim();
    if preferences.is_empty() {
        return Err(PromptError::MissingField {
            field: "user_preferences_prompt",
        });
    }

    let notes = vars
        .user_important_notes
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or(NO_NOTES_FALLBACK);

    Ok(render(
        DEFAULT_AGENT_PROMPT_TEMPLATE,
        &[
            ("{user_profile_prompt}", profile),
            ("{user_preferences_prompt}", preferences),
            ("{user_important_notes}", notes),
        ],
    ))
}

/// Greeting the agent opens a call with when none is supplied.
pub fn generate_default_first_message(display_name: &str) -> String {
    format!(
        "Hi! I'm {display_name}'s dating agent. I'm excited to chat with you and help you get to \
         know them better. What brings you here today?"
    )
}

/// Single pass over the template; substituted values are never rescanned.
fn render(template: &str, substitutions: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len() + 256);
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        match substitutions
            .iter()
            .find(|(placeholder, _)| tail.starts_with(placeholder))
        {
            Some((placeholder, value)) => {
                out.push_str(value);
                rest = &tail[placeholder.len()..];
            }
            None => {
                out.push('{');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}
