//! Dating agents: prompt construction and provisioning on the voice platform.

pub mod prompt;
pub mod routes;

pub use prompt::{AgentPromptVariables, generate_agent_prompt, generate_default_first_message};
pub use routes::agent_routes;
