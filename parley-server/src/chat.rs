//! `chat` and `screenAnalysis` methods
//!
//! Both methods forward the user's prompt, plus any attached images, to a
//! [`Generator`] and wrap the generated text in a
//! [`ChatReply`](parley_core::ChatReply) stamped with the current time.
//!
//! Images arrive as `data:<mime>;base64,<payload>` URLs and are decoded into
//! [`Attachment`]s before the generator sees them. A URL that does not decode
//! fails the call with `-32602`; a generator failure fails it with `-32000`
//! and the generator's message.
//!
//! # Examples
//!
//! ```rust
//! use async_trait::async_trait;
//! use parley_server::{Attachment, BoxError, Generator};
//!
//! struct Shout;
//!
//! #[async_trait]
//! impl Generator for Shout {
//!     async fn generate(&self, prompt: &str, _attachments: Vec<Attachment>) -> Result<String, BoxError> {
//!         Ok(prompt.to_uppercase())
//!     }
//! }
//! ```

use crate::handler::{from_typed_fn, Handler};
use async_trait::async_trait;
use base64::Engine;
use chrono::{SecondsFormat, Utc};
use parley_core::chat::{CHAT_METHOD, SCREEN_ANALYSIS_METHOD};
use parley_core::{ChatParams, ChatReply, Error, Result, ScreenAnalysisParams};
use std::sync::Arc;

/// Error type returned by generators
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Text generation backend
#[async_trait]
pub trait Generator: Send + Sync {
    /// Produce a reply to `prompt`, taking the attached images into account
    async fn generate(&self, prompt: &str, attachments: Vec<Attachment>) -> std::result::Result<String, BoxError>;
}

/// A decoded image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

/// Why a data URL could not be decoded
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DataUrlError {
    #[error("expected a data: URL")]
    NotDataUrl,

    #[error("data URL has no payload")]
    MissingPayload,

    #[error("data URL is not base64-encoded")]
    NotBase64,

    #[error("data URL has no media type")]
    MissingMediaType,

    #[error("invalid base64 payload: {0}")]
    InvalidPayload(String),
}

impl Attachment {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
        }
    }

    /// Decode a `data:<mime>[;param=value]*;base64,<payload>` URL
    pub fn from_data_url(url: &str) -> std::result::Result<Self, DataUrlError> {
        let rest = url.trim().strip_prefix("data:").ok_or(DataUrlError::NotDataUrl)?;
        let (header, payload) = rest.split_once(',').ok_or(DataUrlError::MissingPayload)?;
        let media = header.strip_suffix(";base64").ok_or(DataUrlError::NotBase64)?;

        let mime_type = media.split(';').next().unwrap_or_default().trim();
        if mime_type.is_empty() {
            return Err(DataUrlError::MissingMediaType);
        }

        let bytes = base64::engine::general_purpose::STANDARD
            .decode(payload.trim())
            .map_err(|e| DataUrlError::InvalidPayload(e.to_string()))?;

        Ok(Self::new(bytes, mime_type))
    }
}

/// The chat methods over one generator
#[derive(Clone)]
pub struct ChatService {
    generator: Arc<dyn Generator>,
}

impl ChatService {
    pub fn new(generator: Arc<dyn Generator>) -> Self {
        Self { generator }
    }

    #[tracing::instrument(skip(self, params), fields(images = params.images.len()))]
    pub async fn chat(&self, params: ChatParams) -> Result<ChatReply> {
        let attachments = params
            .images
            .iter()
            .enumerate()
            .map(|(i, url)| {
                Attachment::from_data_url(url).map_err(|e| Error::InvalidParams(format!("images[{}]: {}", i, e)))
            })
            .collect::<Result<Vec<_>>>()?;

        self.reply(&params.message, attachments).await
    }

    #[tracing::instrument(skip(self, params))]
    pub async fn screen_analysis(&self, params: ScreenAnalysisParams) -> Result<ChatReply> {
        if let Some(ref metadata) = params.metadata {
            tracing::debug!(metadata = %metadata, "Screen capture metadata");
        }
        let attachment =
            Attachment::from_data_url(&params.image).map_err(|e| Error::InvalidParams(format!("image: {}", e)))?;

        self.reply(&params.message, vec![attachment]).await
    }

    async fn reply(&self, prompt: &str, attachments: Vec<Attachment>) -> Result<ChatReply> {
        let message = self
            .generator
            .generate(prompt, attachments)
            .await
            .map_err(|e| Error::Handler(e.to_string()))?;

        Ok(ChatReply {
            message,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        })
    }

    /// Handlers for `chat` and `screenAnalysis`, keyed by method name
    pub fn into_handlers(self) -> Vec<(&'static str, Box<dyn Handler>)> {
        let chat = self.clone();
        let screen = self;
        vec![
            (
                CHAT_METHOD,
                from_typed_fn(move |params: ChatParams| {
                    let service = chat.clone();
                    async move { service.chat(params).await }
                }),
            ),
            (
                SCREEN_ANALYSIS_METHOD,
                from_typed_fn(move |params: ScreenAnalysisParams| {
                    let service = screen.clone();
                    async move { service.screen_analysis(params).await }
                }),
            ),
        ]
    }
}
