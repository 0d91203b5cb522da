//! Voice platform: voice cloning, agents, transcripts, music.

pub mod elevenlabs;
pub mod platform;
pub mod routes;

pub use elevenlabs::ElevenLabs;
pub use platform::{
    AgentSpec, AudioSample, AudioStream, ConversationTranscript, CreatedAgent, TranscriptTurn,
    VoiceClone, VoiceCloneRequest, VoicePlatform,
};
pub use routes::voice_routes;
