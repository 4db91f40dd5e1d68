//! 固定間隔リトライ

use std::fmt;
use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::warn;

use crate::error::ScraperError;

/// リトライ方針
#[derive(Clone, Copy)]
pub struct RetryPolicy {
    /// None = 無制限
    pub max_attempts: Option<u32>,
    pub interval: Duration,
    /// false を返したエラーは即座に伝播する
    pub predicate: Option<fn(&ScraperError) -> bool>,
}

impl RetryPolicy {
    pub fn new(max_attempts: Option<u32>, interval: Duration) -> Self {
        Self {
            max_attempts,
            interval,
            predicate: None,
        }
    }

    pub fn retry_if(mut self, predicate: fn(&ScraperError) -> bool) -> Self {
        self.predicate = Some(predicate);
        self
    }

    fn should_retry(&self, err: &ScraperError) -> bool {
        self.predicate.map(|p| p(err)).unwrap_or(true)
    }
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("interval", &self.interval)
            .field("predicate", &self.predicate.is_some())
            .finish()
    }
}

/// `step` を失敗のたびに `interval` 待って再実行する。
///
/// 最後に発生した元のエラーをそのまま返す。
pub async fn retry<T, F, Fut>(policy: RetryPolicy, mut step: F) -> Result<T, ScraperError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ScraperError>>,
{
    let mut attempt: u32 = 0;
    loop {
        attempt += 1;
        match step().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                if !policy.should_retry(&e) {
                    return Err(e);
                }
                if policy.max_attempts.is_some_and(|max| attempt >= max) {
                    warn!("Giving up after {} attempts: {}", attempt, e);
                    return Err(e);
                }
                warn!(
                    "Attempt {} failed, retrying in {}ms: {}",
                    attempt,
                    policy.interval.as_millis(),
                    e
                );
                sleep(policy.interval).await;
            }
        }
    }
}
