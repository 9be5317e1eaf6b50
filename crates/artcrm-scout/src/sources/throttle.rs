use std::time::Duration;

use tokio::time::Instant;

/// Enforces a minimum interval between successive requests to one source.
///
/// The first call to [`Throttle::ready`] returns immediately; later calls
/// sleep until `interval` has elapsed since the previous one.
#[derive(Debug)]
pub struct Throttle {
    interval: Duration,
    last: Option<Instant>,
}

impl Throttle {
    #[must_use]
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last: None,
        }
    }

    pub async fn ready(&mut self) {
        if let Some(last) = self.last {
            let elapsed = last.elapsed();
            if elapsed < self.interval {
                tokio::time::sleep(self.interval - elapsed).await;
            }
        }
        self.last = Some(Instant::now());
    }
}
