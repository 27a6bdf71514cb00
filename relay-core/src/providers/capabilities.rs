//! Backend capability flags
//!
//! Every backend publishes a fixed flag record. The gateway consults it before
//! dispatch so an unsupported call fails at the boundary instead of reaching
//! a backend method that can only refuse.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A capability a caller can ask for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Chat,
    Streaming,
    Embeddings,
    Tools,
    Vision,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Capability::Chat => "chat",
            Capability::Streaming => "streaming",
            Capability::Embeddings => "embeddings",
            Capability::Tools => "tools",
            Capability::Vision => "vision",
        };
        f.write_str(name)
    }
}

/// Backend capabilities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderCapabilities {
    /// Non-streaming chat completions
    pub chat: bool,

    /// Streaming chat completions
    pub streaming: bool,

    /// Text embeddings
    pub embeddings: bool,

    /// Function/tool calling
    pub tools: bool,

    /// Image inputs
    pub vision: bool,
}

impl Default for ProviderCapabilities {
    fn default() -> Self {
        Self {
            chat: true,
            streaming: true,
            embeddings: false,
            tools: false,
            vision: false,
        }
    }
}

impl ProviderCapabilities {
    pub fn with_embeddings(mut self) -> Self {
        self.embeddings = true;
        self
    }

    pub fn with_tools(mut self) -> Self {
        self.tools = true;
        self
    }

    pub fn with_vision(mut self) -> Self {
        self.vision = true;
        self
    }

    /// Check a single capability flag
    pub fn supports(&self, capability: Capability) -> bool {
        match capability {
            Capability::Chat => self.chat,
            Capability::Streaming => self.streaming,
            Capability::Embeddings => self.embeddings,
            Capability::Tools => self.tools,
            Capability::Vision => self.vision,
        }
    }
}
