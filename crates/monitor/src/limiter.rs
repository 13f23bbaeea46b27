use std::future::Future;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{sleep_until, Instant};

/// Admits one task at a time and spaces task *starts* at least
/// `min_spacing` apart.
#[derive(Debug)]
pub struct FetchLimiter {
    min_spacing: Duration,
    last_start: Mutex<Option<Instant>>,
}

impl FetchLimiter {
    pub fn new(min_spacing: Duration) -> Self {
        Self {
            min_spacing,
            last_start: Mutex::new(None),
        }
    }

    /// Waits for the slot, then runs `task` while holding it.
    pub async fn schedule<F, T>(&self, task: F) -> T
    where
        F: Future<Output = T>,
    {
        let mut last_start = self.last_start.lock().await;
        if let Some(previous) = *last_start {
            sleep_until(previous + self.min_spacing).await;
        }
        *last_start = Some(Instant::now());
        task.await
    }
}
