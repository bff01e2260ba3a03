//! Query submission: the external answer source and the orchestrator that
//! records exchanges in the conversation store.

mod orchestrator;
mod upstream;

pub use orchestrator::{ChatError, ChatOrchestrator, Submission, FAILURE_REPLY};
pub use upstream::{AnswerSource, QueryResponse, UpstreamClient, UpstreamError};
