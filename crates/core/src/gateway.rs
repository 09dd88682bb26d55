//! ModelGateway trait - the abstraction over the hosted LLM provider.
//!
//! A gateway accepts an AugmentedPrompt plus generation parameters and
//! returns either a text completion with token-usage counters or a typed
//! failure. The engine calls `complete()` without knowing which provider
//! sits behind it; retry and timeout policy live in gateway adapters,
//! never in the engine.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::GatewayError;
use crate::prompt::AugmentedPrompt;

/// A single completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayRequest {
    /// The structured prompt
    pub prompt: AugmentedPrompt,

    /// Target model identifier
    pub model: String,

    /// Maximum tokens to generate
    pub max_tokens: u32,

    /// Sampling temperature (0.0 = deterministic)
    pub temperature: f32,
}

/// Token usage counters reported by the provider.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl Usage {
    pub fn total(&self) -> u32 {
        self.input_tokens + self.output_tokens
    }
}

/// A successful completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayReply {
    /// The generated text
    pub text: String,

    /// Which model actually responded
    pub model: String,

    /// Token usage counters
    pub usage: Usage,
}

/// The model gateway boundary.
#[async_trait]
pub trait ModelGateway: Send + Sync {
    /// A human-readable name for this gateway (e.g. "anthropic").
    fn name(&self) -> &str;

    /// Send a request and get a complete reply. May block for non-trivial
    /// time; adapters bound the call with a timeout.
    async fn complete(&self, request: GatewayRequest) -> Result<GatewayReply, GatewayError>;
}
