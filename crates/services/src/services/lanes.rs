//! Per-owner serial execution
//!
//! Work submitted for the same owner runs one item at a time in submission
//! order; different owners proceed concurrently. A lane exists only while it
//! has work and is recreated on the next submission.

use std::{
    collections::{HashMap, VecDeque},
    future::Future,
    panic::AssertUnwindSafe,
    sync::{Arc, Mutex, MutexGuard},
};

use futures::{FutureExt, future::BoxFuture};
use tracing::{debug, error};

type LaneJob = BoxFuture<'static, ()>;

#[derive(Default)]
struct Lane {
    pending: VecDeque<LaneJob>,
}

#[derive(Clone, Default)]
pub struct OwnerLanes {
    name: &'static str,
    lanes: Arc<Mutex<HashMap<String, Lane>>>,
}

impl OwnerLanes {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            lanes: Arc::default(),
        }
    }

    /// Queue `job` behind any work already pending for `owner_id`
    ///
    /// Returns immediately; the job runs on a detached tokio task.
    pub fn submit<F>(&self, owner_id: &str, job: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let start_drainer = {
            let mut lanes = self.lock();
            match lanes.get_mut(owner_id) {
                Some(lane) => {
                    lane.pending.push_back(job.boxed());
                    false
                }
                None => {
                    let mut lane = Lane::default();
                    lane.pending.push_back(job.boxed());
                    lanes.insert(owner_id.to_string(), lane);
                    true
                }
            }
        };

        if start_drainer {
            debug!(lane = self.name, owner = %owner_id, "Starting lane");
            let this = self.clone();
            let owner = owner_id.to_string();
            tokio::spawn(async move { this.drain(owner).await });
        } else {
            debug!(lane = self.name, owner = %owner_id, "Queued behind running work");
        }
    }

    /// Number of owners with queued or running work
    pub fn active_lanes(&self) -> usize {
        self.lock().len()
    }

    async fn drain(self, owner: String) {
        loop {
            let next = {
                let mut lanes = self.lock();
                let Some(lane) = lanes.get_mut(&owner) else {
                    return;
                };
                match lane.pending.pop_front() {
                    Some(job) => job,
                    None => {
                        // Removal happens under the same lock as the emptiness
                        // check, so a concurrent submit either lands before it
                        // (and is popped) or recreates the lane afterwards.
                        lanes.remove(&owner);
                        debug!(lane = self.name, owner = %owner, "Lane idle");
                        return;
                    }
                }
            };

            if AssertUnwindSafe(next).catch_unwind().await.is_err() {
                error!(lane = self.name, owner = %owner, "Lane job panicked");
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Lane>> {
        self.lanes.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::sync::{mpsc, oneshot};

    use super::*;

    #[tokio::test]
    async fn test_same_owner_runs_in_submission_order() {
        let lanes = OwnerLanes::new("test");
        let (tx, mut rx) = mpsc::unbounded_channel();

        // Earlier jobs take longer; completion order must still follow submission.
        for (index, delay_ms) in [(0, 40u64), (1, 10), (2, 0)] {
            let tx = tx.clone();
            lanes.submit("owner", async move {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                tx.send(index).unwrap();
            });
        }

        let mut order = Vec::new();
        for _ in 0..3 {
            order.push(rx.recv().await.unwrap());
        }
        assert_eq!(order, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_different_owners_run_concurrently() {
        let lanes = OwnerLanes::new("test");
        let (release_tx, release_rx) = oneshot::channel::<()>();
        let (done_tx, done_rx) = oneshot::channel::<()>();

        // Owner A blocks until owner B runs; serialising them would deadlock.
        lanes.submit("a", async move {
            release_rx.await.unwrap();
            done_tx.send(()).unwrap();
        });
        lanes.submit("b", async move {
            release_tx.send(()).unwrap();
        });

        tokio::time::timeout(Duration::from_secs(2), done_rx)
            .await
            .expect("owners were serialised")
            .unwrap();
    }

    #[tokio::test]
    async fn test_idle_lane_is_removed_and_recreated() {
        let lanes = OwnerLanes::new("test");
        let (tx, mut rx) = mpsc::unbounded_channel();

        let first = tx.clone();
        lanes.submit("owner", async move { first.send(1).unwrap() });
        assert_eq!(rx.recv().await, Some(1));

        for _ in 0..100 {
            if lanes.active_lanes() == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(lanes.active_lanes(), 0);

        lanes.submit("owner", async move { tx.send(2).unwrap() });
        assert_eq!(rx.recv().await, Some(2));
    }

    #[tokio::test]
    async fn test_panicking_job_does_not_stall_lane() {
        let lanes = OwnerLanes::new("test");
        let (tx, mut rx) = mpsc::unbounded_channel();

        lanes.submit("owner", async { panic!("boom") });
        lanes.submit("owner", async move { tx.send("after").unwrap() });

        let received = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap();
        assert_eq!(received, Some("after"));
    }
}
