//! Shared HTTP plumbing for the JSON adapters.

use std::time::Duration;

use reqwest::{Client, RequestBuilder};

use super::ProviderError;

const USER_AGENT: &str = concat!("reelscroll/", env!("CARGO_PKG_VERSION"));

/// Build the client every adapter uses.  The aggregator enforces its own
/// deadline on top of the per-request `timeout`.
pub fn client(timeout: Duration) -> Client {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .unwrap_or_else(|err| {
            tracing::warn!(error = %err, "falling back to default HTTP client");
            Client::new()
        })
}

/// Send `request`, classify the status, and return the body text.
pub async fn get_text(request: RequestBuilder) -> Result<String, ProviderError> {
    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(ProviderError::from_status(status));
    }
    Ok(response.text().await?)
}

/// The adapter-level outcome for a page whose records all failed to normalize.
pub fn check_yield(provider: &str, raw: usize, kept: usize) -> Result<(), ProviderError> {
    if raw > 0 && kept == 0 {
        return Err(ProviderError::malformed(format!(
            "{provider}: none of {raw} records could be normalized"
        )));
    }
    if kept < raw {
        tracing::debug!(provider, skipped = raw - kept, "skipped unusable records");
    }
    Ok(())
}
