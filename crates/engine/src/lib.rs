//! The heliolab engine: turns a raw user message into a bounded,
//! knowledge-enriched prompt, delegates to the model gateway, structures
//! the reply and commits the exchange to the session store.

pub mod engine;
pub mod prompt;
pub mod reply;

pub use engine::{AssistEngine, AssistRequest, EngineSettings};
pub use reply::{AssistResponse, ReplyBody, StructuredReply};
