use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{error, info, warn};

/// Prompt sent once per model at startup to check that it answers.
pub const PROBE_PROMPT: &str = "ping";

pub const DEFAULT_PRIMARY_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_FALLBACK_MODEL: &str = "gemini-2.5-flash-lite";

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("GOOGLE_API_KEY environment variable not set")]
    MissingApiKey,

    #[error("model gateway is unavailable")]
    Unavailable,

    #[error("request to the model API failed: {0}")]
    Http(#[source] reqwest::Error),

    #[error("model API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("model API returned no text")]
    EmptyResponse,
}

impl From<reqwest::Error> for GatewayError {
    // The request URL never reaches logs.
    fn from(err: reqwest::Error) -> Self {
        GatewayError::Http(err.without_url())
    }
}

/// Anything that can turn a prompt into completion text for a named model.
#[async_trait]
pub trait CompletionSource: Send + Sync {
    async fn complete(&self, model: &str, prompt: &str) -> Result<String, GatewayError>;
}

/// Primary and fallback model identifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSelection {
    pub primary: String,
    pub fallback: String,
}

impl Default for ModelSelection {
    fn default() -> Self {
        Self {
            primary: DEFAULT_PRIMARY_MODEL.to_string(),
            fallback: DEFAULT_FALLBACK_MODEL.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayState {
    Uninitialized,
    ProbingPrimary,
    ProbingSecondary,
    Ready { model: String },
    Unavailable,
}

impl GatewayState {
    fn is_terminal(&self) -> bool {
        matches!(self, GatewayState::Ready { .. } | GatewayState::Unavailable)
    }
}

/// Boundary to the generative model.
///
/// The model is chosen once, at startup, by [`ModelGateway::initialize`]. After
/// that the gateway is immutable: it is either `Ready` with a model, or
/// `Unavailable` for the rest of the process lifetime.
pub struct ModelGateway {
    source: Option<Arc<dyn CompletionSource>>,
    state: GatewayState,
}

impl ModelGateway {
    /// Probe the primary model, falling back once to the secondary one.
    ///
    /// A missing `source` (no credentials) goes straight to `Unavailable`
    /// without any network call.
    pub async fn initialize(
        source: Option<Arc<dyn CompletionSource>>,
        models: &ModelSelection,
    ) -> Self {
        let mut gateway = Self {
            source,
            state: GatewayState::Uninitialized,
        };

        while !gateway.state.is_terminal() {
            gateway.state = gateway.step(models).await;
        }

        gateway
    }

    async fn step(&self, models: &ModelSelection) -> GatewayState {
        match &self.state {
            GatewayState::Uninitialized => {
                if self.source.is_some() {
                    GatewayState::ProbingPrimary
                } else {
                    error!("No model credentials configured, gateway is unavailable");
                    GatewayState::Unavailable
                }
            }
            GatewayState::ProbingPrimary => {
                info!("Connecting to primary model {}", models.primary);
                match self.probe(&models.primary).await {
                    Ok(()) => {
                        info!("Using primary model {}", models.primary);
                        GatewayState::Ready {
                            model: models.primary.clone(),
                        }
                    }
                    Err(e) => {
                        warn!("Primary model {} failed: {}", models.primary, e);
                        GatewayState::ProbingSecondary
                    }
                }
            }
            GatewayState::ProbingSecondary => {
                info!("Falling back to model {}", models.fallback);
                match self.probe(&models.fallback).await {
                    Ok(()) => {
                        info!("Using fallback model {}", models.fallback);
                        GatewayState::Ready {
                            model: models.fallback.clone(),
                        }
                    }
                    Err(e) => {
                        error!("Fallback model {} failed too: {}", models.fallback, e);
                        GatewayState::Unavailable
                    }
                }
            }
            terminal => terminal.clone(),
        }
    }

    async fn probe(&self, model: &str) -> Result<(), GatewayError> {
        let source = self.source.as_ref().ok_or(GatewayError::MissingApiKey)?;
        source.complete(model, PROBE_PROMPT).await.map(|_| ())
    }

    pub fn state(&self) -> &GatewayState {
        &self.state
    }

    pub fn is_available(&self) -> bool {
        matches!(self.state, GatewayState::Ready { .. })
    }

    /// The model selected at startup, if any.
    pub fn model(&self) -> Option<&str> {
        match &self.state {
            GatewayState::Ready { model } => Some(model),
            _ => None,
        }
    }

    pub async fn generate(&self, prompt: &str) -> Result<String, GatewayError> {
        match (&self.state, &self.source) {
            (GatewayState::Ready { model }, Some(source)) => source.complete(model, prompt).await,
            _ => Err(GatewayError::Unavailable),
        }
    }
}
