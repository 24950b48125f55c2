//! Completion client implementations

pub mod openrouter;

use async_trait::async_trait;
use crate::error::Error;
use crate::request::{CompletionResponse, ModelDescriptor, PromptMessage};

// Re-export for convenience
pub use openrouter::OpenRouterClient;

/// A remote completion endpoint
///
/// Implementations are shared read-only across every concurrent model
/// task of a dispatch, so they take `&self` and must be `Send + Sync`.
#[async_trait]
pub trait CompletionClient: Send + Sync
{   /// Generate one completion for `model` from `messages`
    async fn generate_completion(
      &self
    , model: &str
    , messages: &PromptMessage
    ) -> Result<CompletionResponse, Error>;

    /// List the models the endpoint serves
    async fn list_models(&self)
      -> Result<Vec<ModelDescriptor>, Error>;
}
