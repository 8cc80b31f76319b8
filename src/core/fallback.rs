//! Timeout wrapper for collaborator calls.
//!
//! A remote call either answers within its timeout or is abandoned. Callers
//! receive `None` and switch to their heuristic strategy; nothing is retried.

use std::future::Future;
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Which strategy produced a stage's answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    Remote,
    Heuristic,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Remote => "remote",
            Self::Heuristic => "heuristic",
        }
    }
}

/// Run a collaborator call under a timeout, logging and absorbing failures
pub async fn within_timeout<T, F>(collaborator: &str, timeout: Duration, call: F) -> Option<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(Ok(value)) => Some(value),
        Ok(Err(e)) => {
            warn!(collaborator, error = %e, "Collaborator call failed, using fallback");
            None
        }
        Err(_) => {
            warn!(
                collaborator,
                timeout_ms = timeout.as_millis() as u64,
                "Collaborator call timed out, using fallback"
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_success_passes_through() {
        let value = within_timeout("test", Duration::from_secs(1), async { Ok(7) }).await;
        assert_eq!(value, Some(7));
    }

    #[tokio::test]
    async fn test_error_becomes_none() {
        let value: Option<u32> = within_timeout("test", Duration::from_secs(1), async {
            Err(anyhow::anyhow!("boom"))
        })
        .await;
        assert_eq!(value, None);
    }

    #[tokio::test]
    async fn test_timeout_becomes_none() {
        let value = within_timeout("test", Duration::from_millis(20), async {
            tokio::time::sleep(Duration::from_millis(500)).await;
            Ok(1)
        })
        .await;
        assert_eq!(value, None);
    }
}
