//! Pure in-memory simulation of the claim protocol's concurrency guarantee
//! (P5/P6), exercised without a live Postgres instance.
//!
//! Mirrors `DatabaseManager::claim_frames`'s semantics (oldest-first,
//! exclusive claim under a single lock) with a `tokio::sync::Mutex` guarding
//! a `Vec` of pending ids, which is exactly what `FOR UPDATE SKIP LOCKED`
//! guarantees at the database: two concurrent claimants never see the same
//! row in their batch.

use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;

struct FakeQueue {
    pending: Mutex<Vec<u64>>,
}

impl FakeQueue {
    fn new(count: u64) -> Self {
        Self {
            pending: Mutex::new((0..count).collect()),
        }
    }

    /// Mirrors the claim transaction: lock, take up to `n` oldest ids, release.
    async fn claim(&self, n: usize) -> Vec<u64> {
        let mut pending = self.pending.lock().await;
        let take = n.min(pending.len());
        pending.drain(0..take).collect()
    }
}

#[tokio::test]
async fn concurrent_workers_never_double_claim_and_cover_every_frame() {
    const FRAME_COUNT: u64 = 500;
    const WORKER_COUNT: usize = 8;
    const BATCH_SIZE: usize = 7;

    let queue = Arc::new(FakeQueue::new(FRAME_COUNT));
    let mut handles = Vec::new();

    for _ in 0..WORKER_COUNT {
        let queue = queue.clone();
        handles.push(tokio::spawn(async move {
            let mut claimed = Vec::new();
            loop {
                let batch = queue.claim(BATCH_SIZE).await;
                if batch.is_empty() {
                    break;
                }
                claimed.extend(batch);
            }
            claimed
        }));
    }

    let mut all_claimed = Vec::new();
    let mut per_worker_counts = Vec::new();
    for handle in handles {
        let claimed = handle.await.unwrap();
        per_worker_counts.push(claimed.len());
        all_claimed.extend(claimed);
    }

    assert_eq!(
        all_claimed.len() as u64,
        FRAME_COUNT,
        "every frame must be claimed exactly once across all workers"
    );

    let unique: HashSet<u64> = all_claimed.iter().copied().collect();
    assert_eq!(
        unique.len(),
        all_claimed.len(),
        "no frame may be claimed by more than one worker"
    );

    let total_processed: usize = per_worker_counts.iter().sum();
    assert_eq!(total_processed as u64, FRAME_COUNT);
}
