//! Payloads of the chat methods shared by client and server
//!
//! | method | params | result |
//! |---|---|---|
//! | `chat` | [`ChatParams`] | [`ChatReply`] |
//! | `screenAnalysis` | [`ScreenAnalysisParams`] | [`ChatReply`] |
//!
//! Images travel as `data:<mime>;base64,<payload>` URLs, exactly as a browser
//! produces them from a file input or a canvas capture.

use serde::{Deserialize, Serialize};

/// Method name of a plain chat turn
pub const CHAT_METHOD: &str = "chat";

/// Method name of a screen capture analysis
pub const SCREEN_ANALYSIS_METHOD: &str = "screenAnalysis";

/// Params of `chat`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatParams {
    /// The user's prompt
    pub message: String,

    /// Attached images as data URLs
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
}

impl ChatParams {
    /// A text-only chat turn
    pub fn text(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            images: Vec::new(),
        }
    }

    /// Attach one more image
    pub fn with_image(mut self, data_url: impl Into<String>) -> Self {
        self.images.push(data_url.into());
        self
    }
}

/// Params of `screenAnalysis`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenAnalysisParams {
    /// Question about the capture
    pub message: String,

    /// The capture as a data URL
    pub image: String,

    /// Free-form capture metadata (window title, dimensions, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

/// Result of both chat methods
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    /// Generated text
    pub message: String,

    /// RFC 3339 time at which the reply was produced
    pub timestamp: String,
}
