//! Waiting for asynchronous Instagram media containers

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{ContainerStatus, GraphApi, SocialError};

/// How often and how long to check a container's status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollConfig {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            max_attempts: 20,
        }
    }
}

#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Check the container up to `max_attempts` times, sleeping between checks.
///
/// `FINISHED` returns immediately. `ERROR` and `EXPIRED` fail immediately.
/// Any other status, or a failed status read, counts as not ready yet.
pub async fn wait_for_container(
    graph: &dyn GraphApi,
    container_id: &str,
    config: &PollConfig,
    sleeper: &dyn Sleeper,
) -> Result<(), SocialError> {
    info!("Waiting for Instagram to process container {}", container_id);

    for attempt in 1..=config.max_attempts {
        match graph.container_status(container_id).await {
            Ok(ContainerStatus::Finished) => {
                info!(
                    "Container {} ready after {} check(s)",
                    container_id, attempt
                );
                return Ok(());
            }
            Ok(status @ (ContainerStatus::Error | ContainerStatus::Expired)) => {
                return Err(SocialError::ContainerFailed {
                    container_id: container_id.to_string(),
                    status: status.to_string(),
                });
            }
            Ok(status) => {
                debug!(
                    "Container {} is {} (check {}/{})",
                    container_id, status, attempt, config.max_attempts
                );
            }
            Err(e) => {
                warn!(
                    "Status check {}/{} for container {} failed: {}",
                    attempt, config.max_attempts, container_id, e
                );
            }
        }

        if attempt < config.max_attempts {
            sleeper.sleep(config.interval).await;
        }
    }

    Err(SocialError::PollTimeout {
        attempts: config.max_attempts,
    })
}
