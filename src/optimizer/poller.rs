//! # Poller
//!
//! Risolve un risultato "pending" senza ricaricare il file: fino a 3 tentativi,
//! 2 secondi di attesa prima di ciascuno, stop al primo codice diverso da 1.
//!
//! L'handle (`OriginalURL`) va inviato percent-encoded esattamente una volta.

use crate::{
    error::OptimizeError,
    optimizer::request::{
        OptimizationRequest, CLIENT_TAG, POLL_ATTEMPTS, POLL_DELAY, POLL_TIMEOUT, POLL_WAIT_SECS,
    },
    response::{OptimizationResult, ResultState},
    service::HttpService,
};
use serde_json::{json, Value};
use tracing::debug;

/// Result of polling, with the number of status queries made
#[derive(Debug, Clone, PartialEq)]
pub struct PollOutcome {
    pub result: OptimizationResult,
    pub attempts: u32,
}

/// JSON body for the polling endpoint
pub fn build_poll_body(request: &OptimizationRequest, handle: &str) -> Value {
    json!({
        "key": request.api_key,
        "plugin_version": CLIENT_TAG,
        "lossy": request.compression_mode.api_value(),
        "wait": POLL_WAIT_SECS,
        "urllist": [urlencoding::encode(handle)],
    })
}

/// Polls while the current result is pending and carries a handle.
/// Anything else is returned untouched with `attempts == 0`.
pub async fn poll_until_ready<H>(
    http: &H,
    endpoint: &str,
    request: &OptimizationRequest,
    initial: OptimizationResult,
) -> Result<PollOutcome, OptimizeError>
where
    H: HttpService + ?Sized,
{
    let handle = initial.handle().map(str::to_string);
    let handle = match (initial.state(), handle) {
        (ResultState::Pending, Some(handle)) => handle,
        _ => {
            return Ok(PollOutcome {
                result: initial,
                attempts: 0,
            })
        }
    };

    let body = build_poll_body(request, &handle);
    let mut current = initial;
    let mut attempts = 0;

    while attempts < POLL_ATTEMPTS && current.state() == ResultState::Pending {
        tokio::time::sleep(POLL_DELAY).await;
        attempts += 1;

        let response = http.post_json(endpoint, &body, POLL_TIMEOUT).await?;
        current = OptimizationResult::from_body(&response)?;
        debug!(
            "Poll {}/{} for {}: code {} ({})",
            attempts, POLL_ATTEMPTS, handle, current.status.code, current.status.message
        );
    }

    Ok(PollOutcome {
        result: current,
        attempts,
    })
}
