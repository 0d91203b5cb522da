//! Personal theme music: an LLM writes a brief from the profile, the voice
//! platform renders it.

pub mod routes;

pub use routes::music_routes;

/// Length of a generated track.
pub const MUSIC_DURATION_MS: u32 = 30_000;

/// System preamble for the music brief.
pub const MUSIC_SYSTEM_PROMPT: &str = "\
You are an award-winning music director crafting detailed briefs for a generative music model.
- Produce a single paragraph prompt (max ~80 words).
- Reference concrete instrumentation, rhythmic feel, texture, and emotional arc.
- Specify tempo in BPM or relative pacing (e.g. \"slow 70 BPM ballad\").
- Keep the tone positive and aligned with the described personality.
Return only the prompt text without markdown.";

/// User turn asking for a brief for `profile_prompt`.
pub fn music_request(profile_prompt: &str) -> String {
    format!(
        "User profile description:\n{profile_prompt}\n\nWrite a single prompt for a 30-second \
         instrumental track that reflects this person."
    )
}

/// Extract the brief from a model reply.
///
/// Accepts plain text, a fenced block, or a `{"music_prompt": ...}` object.
/// Returns `None` when nothing usable remains.
pub fn clean_music_prompt(reply: &str) -> Option<String> {
    let mut text = reply.trim();

    if let Some(inner) = text.strip_prefix("```") {
        let inner = inner.split_once('\n').map_or("", |(_, body)| body);
        text = inner.strip_suffix("```").unwrap_or(inner).trim();
    }

    if text.starts_with('{') {
        if let Ok(value) = serde_json::from_str::<serde_json::Value>(text) {
            let brief = value
                .get("music_prompt")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .trim()
                .to_string();
            return Some(brief).filter(|b| !b.is_empty());
        }
    }

    let text = text
        .strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .unwrap_or(text)
        .trim();
    Some(text.to_string()).filter(|t| !t.is_empty())
}
