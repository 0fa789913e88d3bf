//! TTL-bounded pool of upstream server job ids
//!
//! The pool is refreshed by paging through a `PageSource` until it stops
//! returning a cursor. What happens to the pool depends on how the run ends:
//!
//! | Run ended with              | Pool                  | `last_refreshed_at` |
//! |-----------------------------|-----------------------|---------------------|
//! | all pages, some ids         | replaced              | stamped             |
//! | all pages, no ids           | kept                  | stamped             |
//! | 429 after >= 1 page, ids    | replaced with partial | stamped             |
//! | 429 after >= 1 page, no ids | kept                  | stamped             |
//! | 429 before any page         | kept                  | untouched           |
//! | transport / format failure  | kept                  | stamped             |
//!
//! Stamping restarts the TTL clock. A 429 on the very first page leaves the
//! stamp alone so the next trigger retries immediately; every other failure
//! imposes a full TTL cool-down.

use super::error::FetchError;
use super::types::{system_clock, Clock};
use async_trait::async_trait;
use rand::seq::SliceRandom;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tokio::time::{sleep, timeout};

/// One page of server ids
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerPage {
    pub ids: Vec<String>,
    pub next_cursor: Option<String>,
}

/// Paginated source of server ids
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Fetch the page after `cursor` (`None` for the first page)
    async fn fetch_page(&self, cursor: Option<&str>) -> Result<ServerPage, FetchError>;
}

#[derive(Debug, Clone)]
pub struct CachePolicy {
    /// Seconds a refresh stays fresh
    pub ttl_secs: i64,
    /// Pause between consecutive page requests
    pub page_delay: Duration,
    /// Upper bound on a single page request
    pub fetch_timeout: Duration,
    /// Upper bound on pages walked in one refresh
    pub max_pages: usize,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            ttl_secs: 20,
            page_delay: Duration::from_millis(1_000),
            fetch_timeout: Duration::from_secs(10),
            max_pages: 50,
        }
    }
}

/// Which branch a call to `refresh()` took
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Last refresh is within TTL, no request made
    Fresh,
    /// Another refresh is running
    InFlight,
    Replaced { count: usize, pages: usize },
    EmptyRetained,
    PartialSaved { count: usize, pages: usize },
    RateLimitedNoPages,
    Failed,
}

#[derive(Debug, Default)]
struct IdentifierPool {
    ids: Vec<String>,
    last_refreshed_at: Option<i64>,
}

enum PageRun {
    Complete { ids: Vec<String>, pages: usize },
    RateLimited { ids: Vec<String>, pages: usize },
    Failed { error: FetchError, pages: usize },
}

pub struct JobIdCache {
    source: Arc<dyn PageSource>,
    pool: RwLock<IdentifierPool>,
    refresh_lock: tokio::sync::Mutex<()>,
    policy: CachePolicy,
    now_fn: Clock,
}

impl JobIdCache {
    pub fn new(source: Arc<dyn PageSource>, policy: CachePolicy) -> Self {
        Self::new_with_clock(source, policy, system_clock())
    }

    pub fn new_with_clock(source: Arc<dyn PageSource>, policy: CachePolicy, now_fn: Clock) -> Self {
        Self {
            source,
            pool: RwLock::new(IdentifierPool::default()),
            refresh_lock: tokio::sync::Mutex::new(()),
            policy,
            now_fn,
        }
    }

    /// Current pool, possibly empty
    pub fn get(&self) -> Vec<String> {
        self.pool.read().unwrap_or_else(PoisonError::into_inner).ids.clone()
    }

    /// Uniformly random id from the pool, `None` when the pool is empty
    pub fn pick_random(&self) -> Option<String> {
        let pool = self.pool.read().unwrap_or_else(PoisonError::into_inner);
        pool.ids.choose(&mut rand::thread_rng()).cloned()
    }

    pub fn len(&self) -> usize {
        self.pool.read().unwrap_or_else(PoisonError::into_inner).ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn last_refreshed_at(&self) -> Option<i64> {
        self.pool
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .last_refreshed_at
    }

    fn is_fresh(&self, now: i64) -> bool {
        self.last_refreshed_at()
            .map_or(false, |last| now - last <= self.policy.ttl_secs)
    }

    /// Refresh the pool unless it is still within TTL
    ///
    /// Safe to call from several tasks at once: only one refresh runs, the
    /// others return `RefreshOutcome::InFlight` immediately.
    pub async fn refresh(&self) -> RefreshOutcome {
        let _guard = match self.refresh_lock.try_lock() {
            Ok(guard) => guard,
            Err(_) => return RefreshOutcome::InFlight,
        };

        if self.is_fresh((self.now_fn)()) {
            return RefreshOutcome::Fresh;
        }

        let run = self.collect_pages().await;
        let now = (self.now_fn)();
        let mut pool = self.pool.write().unwrap_or_else(PoisonError::into_inner);

        match run {
            PageRun::Complete { ids, pages } if !ids.is_empty() => {
                let count = ids.len();
                pool.ids = ids;
                pool.last_refreshed_at = Some(now);
                log::info!("✅ Job ids refreshed: {} servers across {} pages", count, pages);
                RefreshOutcome::Replaced { count, pages }
            }
            PageRun::Complete { .. } => {
                pool.last_refreshed_at = Some(now);
                log::info!("⚠️  No servers found, keeping {} cached job ids", pool.ids.len());
                RefreshOutcome::EmptyRetained
            }
            PageRun::RateLimited { ids, pages } if pages > 0 && !ids.is_empty() => {
                let count = ids.len();
                pool.ids = ids;
                pool.last_refreshed_at = Some(now);
                log::warn!(
                    "⚠️  Rate limited after {} pages, saved partial pool of {} job ids",
                    pages,
                    count
                );
                RefreshOutcome::PartialSaved { count, pages }
            }
            PageRun::RateLimited { pages, .. } if pages > 0 => {
                pool.last_refreshed_at = Some(now);
                log::warn!(
                    "⚠️  Rate limited after {} empty pages, keeping {} cached job ids",
                    pages,
                    pool.ids.len()
                );
                RefreshOutcome::EmptyRetained
            }
            PageRun::RateLimited { .. } => {
                log::warn!("⚠️  Rate limited before first page, will retry on next trigger");
                RefreshOutcome::RateLimitedNoPages
            }
            PageRun::Failed { error, pages } => {
                pool.last_refreshed_at = Some(now);
                log::error!(
                    "❌ Job id refresh failed after {} pages: {} (cooling down {}s)",
                    pages,
                    error,
                    self.policy.ttl_secs
                );
                RefreshOutcome::Failed
            }
        }
    }

    async fn collect_pages(&self) -> PageRun {
        let mut ids = Vec::new();
        let mut cursor: Option<String> = None;
        let mut pages = 0usize;

        loop {
            let fetched = timeout(
                self.policy.fetch_timeout,
                self.source.fetch_page(cursor.as_deref()),
            )
            .await
            .unwrap_or_else(|_| {
                Err(FetchError::Transport(format!(
                    "page request timed out after {:?}",
                    self.policy.fetch_timeout
                )))
            });

            let page = match fetched {
                Ok(page) => page,
                Err(FetchError::RateLimited) => return PageRun::RateLimited { ids, pages },
                Err(error) => return PageRun::Failed { error, pages },
            };

            pages += 1;
            ids.extend(page.ids);

            match page.next_cursor {
                Some(next) if !next.is_empty() => {
                    if pages >= self.policy.max_pages {
                        log::warn!(
                            "⚠️  Stopped paging at {} pages with cursor still pending",
                            pages
                        );
                        return PageRun::Complete { ids, pages };
                    }
                    cursor = Some(next);
                    sleep(self.policy.page_delay).await;
                }
                _ => return PageRun::Complete { ids, pages },
            }
        }
    }
}
