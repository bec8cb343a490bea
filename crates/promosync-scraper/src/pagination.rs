//! Page-by-page driving of a single listing.
//!
//! Two listing shapes exist upstream:
//!
//! - Ajax endpoints that return an empty fragment once the last page has been
//!   passed. These use [`TerminationPolicy::EmptyPage`].
//! - Page-number controls that keep serving the last page (or loop back) when
//!   asked for one past the end. These use [`TerminationPolicy::StalePage`],
//!   which deduplicates by title across the run and stops after a run of pages
//!   that contributed nothing new.
//!
//! Both are bounded by a hard page ceiling.

use std::collections::HashSet;
use std::future::Future;

use promosync_core::PromotionRecord;

use crate::error::ScraperError;

pub const DEFAULT_CONSECUTIVE_EMPTY_LIMIT: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationPolicy {
    /// Stop at the first page that yields zero raw items.
    EmptyPage,
    /// Stop once `consecutive_empty_limit` pages in a row add no new titles.
    StalePage { consecutive_empty_limit: usize },
}

impl TerminationPolicy {
    #[must_use]
    pub const fn stale_page() -> Self {
        Self::StalePage {
            consecutive_empty_limit: DEFAULT_CONSECUTIVE_EMPTY_LIMIT,
        }
    }
}

/// One fetched page: how many raw items the upstream returned, and which of
/// them survived normalization.
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub raw_count: usize,
    pub records: Vec<PromotionRecord>,
}

impl Page {
    /// A page whose raw count equals its record count.
    #[must_use]
    pub fn from_records(records: Vec<PromotionRecord>) -> Self {
        Self {
            raw_count: records.len(),
            records,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// The empty-page signal was observed.
    Exhausted,
    /// Too many consecutive pages added nothing new.
    Stale,
    /// The page ceiling was reached.
    PageLimit,
    /// A page fetch failed; results up to the previous page were kept.
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct Paginated {
    pub records: Vec<PromotionRecord>,
    /// Pages successfully fetched.
    pub pages: usize,
    pub stop: StopReason,
}

impl Paginated {
    /// True when the very first page failed and nothing was collected.
    #[must_use]
    pub fn failed_outright(&self) -> bool {
        self.pages == 0 && matches!(self.stop, StopReason::Failed(_))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Paginator {
    policy: TerminationPolicy,
    max_pages: usize,
}

impl Paginator {
    #[must_use]
    pub fn new(policy: TerminationPolicy, max_pages: usize) -> Self {
        Self {
            policy,
            max_pages: max_pages.max(1),
        }
    }

    /// Fetches pages `1..=max_pages` in order until the policy says stop.
    ///
    /// A failure at page N is logged and the records from pages `1..N` are
    /// returned; the error never propagates.
    pub async fn paginate<F, Fut>(&self, label: &str, mut fetch_page: F) -> Paginated
    where
        F: FnMut(usize) -> Fut,
        Fut: Future<Output = Result<Page, ScraperError>>,
    {
        let mut records = Vec::new();
        let mut seen_titles: HashSet<String> = HashSet::new();
        let mut stale_streak = 0usize;
        let mut pages = 0usize;

        for page_index in 1..=self.max_pages {
            let page = match fetch_page(page_index).await {
                Ok(page) => page,
                Err(e) => {
                    tracing::warn!(
                        listing = %label,
                        page = page_index,
                        kept = records.len(),
                        error = %e,
                        "page fetch failed, keeping partial result"
                    );
                    return Paginated {
                        records,
                        pages,
                        stop: StopReason::Failed(e.to_string()),
                    };
                }
            };
            pages += 1;

            match self.policy {
                TerminationPolicy::EmptyPage => {
                    if page.raw_count == 0 {
                        tracing::info!(listing = %label, page = page_index, "no more items");
                        return Paginated {
                            records,
                            pages,
                            stop: StopReason::Exhausted,
                        };
                    }
                    tracing::debug!(
                        listing = %label,
                        page = page_index,
                        raw = page.raw_count,
                        kept = page.records.len(),
                        "page collected"
                    );
                    records.extend(page.records);
                }
                TerminationPolicy::StalePage {
                    consecutive_empty_limit,
                } => {
                    let before = records.len();
                    for record in page.records {
                        if seen_titles.insert(record.title.clone()) {
                            records.push(record);
                        }
                    }
                    let added = records.len() - before;
                    tracing::debug!(listing = %label, page = page_index, added, "page collected");

                    if added == 0 {
                        stale_streak += 1;
                        if stale_streak >= consecutive_empty_limit.max(1) {
                            tracing::info!(
                                listing = %label,
                                page = page_index,
                                stale_streak,
                                "no new items on consecutive pages"
                            );
                            return Paginated {
                                records,
                                pages,
                                stop: StopReason::Stale,
                            };
                        }
                    } else {
                        stale_streak = 0;
                    }
                }
            }
        }

        tracing::warn!(
            listing = %label,
            max_pages = self.max_pages,
            "page ceiling reached"
        );
        Paginated {
            records,
            pages,
            stop: StopReason::PageLimit,
        }
    }
}
