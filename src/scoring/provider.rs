//! The AI completion collaborator boundary.
//!
//! The scorer only ever needs `complete(prompt) -> text`; retries and
//! fallback providers belong to the caller's provider manager. Any failure
//! here means "no AI score available", never a failed split.

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("completion request failed: {0}")]
    Request(String),

    #[error("completion timed out after {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Abstract language-model completion capability.
pub trait CompletionProvider: Send + Sync {
    fn complete(&self, prompt: &str) -> Result<String, ProviderError>;
}

/// One attempt, bounded by `timeout`; no retry. A provider that outlives the
/// timeout finishes on its worker thread and the result is dropped.
pub fn complete_with_timeout(
    provider: Arc<dyn CompletionProvider>,
    prompt: String,
    timeout: Duration,
) -> Result<String, ProviderError> {
    let (sender, receiver) = crossbeam::channel::bounded(1);
    std::thread::spawn(move || {
        let _ = sender.send(provider.complete(&prompt));
    });
    match receiver.recv_timeout(timeout) {
        Ok(result) => result,
        Err(_) => Err(ProviderError::Timeout(timeout)),
    }
}
