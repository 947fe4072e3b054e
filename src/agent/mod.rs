//! Agent module - the two-agent conversation
//!
//! Contains the registry of participants, prompt templating, the turn engine
//! and the session loop that decides when the conversation is over.

pub mod engine;
pub mod observer;
pub mod registry;
pub mod session;
pub mod store;
pub mod template;
pub mod termination;
pub mod transcript;

pub use engine::{normalize, ConversationEngine, EngineSettings, EngineState};
pub use observer::{CallbackObserver, NoopObserver, TurnObserver};
pub use registry::AgentRegistry;
pub use session::{RunOutcome, Session};
pub use store::{JsonlTranscriptStore, TranscriptStore};
pub use template::{Placeholder, PromptBindings, PromptTemplate};
pub use termination::TerminationState;
pub use transcript::Transcript;
