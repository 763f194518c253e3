//! Provider seam consumed by [`crate::SearchService`].

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::types::SearchResult;

/// Failure reported by a [`SearchProvider`].
#[derive(Debug, Error)]
pub enum ProviderError {
	/// The request's cancellation token was observed.
	#[error("request cancelled")]
	Cancelled,

	/// A provider-level failure with a human-readable message.
	#[error("{0}")]
	Failed(String),

	/// The provider call panicked; the message is the panic payload.
	#[error("provider panicked: {0}")]
	Panicked(String),

	/// Any other error raised by the provider implementation.
	#[error(transparent)]
	Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl ProviderError {
	pub fn failed(message: impl Into<String>) -> Self {
		Self::Failed(message.into())
	}

	pub fn is_cancelled(&self) -> bool {
		matches!(self, Self::Cancelled)
	}
}

/// Opaque asynchronous search backend.
///
/// Implementations should poll or await `cancel` at their own suspension points
/// and return [`ProviderError::Cancelled`] once it fires. The service imposes no
/// timeout; a call that never settles leaves the request loading until cancelled.
#[async_trait]
pub trait SearchProvider: Send + Sync + 'static {
	async fn search(&self, query: &str, cancel: CancellationToken) -> Result<Vec<SearchResult>, ProviderError>;
}
