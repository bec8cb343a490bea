//! Per-site promotion sources.
//!
//! Each source is described by a [`SourceSpec`]: where it lives, which
//! listings (promotion tabs) it has, how its pagination ends and how many
//! pages to allow. The shared [`crawl`] driver walks every listing with the
//! [`Paginator`] and the shared [`PromoClient`], delegating only page parsing
//! to the site module.

pub mod cu;
pub mod seven_eleven;

use promosync_core::{CampaignWindow, DealType, PromotionRecord};

use crate::client::PromoClient;
use crate::error::ScraperError;
use crate::pagination::{Page, Paginator, StopReason, TerminationPolicy};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Cu,
    SevenEleven,
}

impl SourceKind {
    pub const ALL: [SourceKind; 2] = [SourceKind::Cu, SourceKind::SevenEleven];

    /// Resolves a registry name (`cu`, `seven-eleven`) ignoring ASCII case.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(name))
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            SourceKind::Cu => cu::SOURCE_NAME,
            SourceKind::SevenEleven => seven_eleven::SOURCE_NAME,
        }
    }

    /// Production settings for this source.
    #[must_use]
    pub fn spec(self) -> SourceSpec {
        match self {
            SourceKind::Cu => cu::spec(),
            SourceKind::SevenEleven => seven_eleven::spec(),
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One promotion tab of a source, e.g. CU's 1+1 list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Listing {
    pub label: &'static str,
    /// Site-specific listing parameter (`searchCondition`, `pTab`, ...).
    pub code: &'static str,
    pub deal_type: DealType,
}

#[derive(Debug, Clone)]
pub struct SourceSpec {
    pub kind: SourceKind,
    pub base_url: String,
    pub listings: Vec<Listing>,
    pub policy: TerminationPolicy,
    pub max_pages: usize,
    /// Whether per-item detail pages are fetched (7-Eleven only).
    pub fetch_details: bool,
}

impl SourceSpec {
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    /// Replaces the built-in page ceiling when `max_pages` is given.
    #[must_use]
    pub fn with_max_pages(mut self, max_pages: Option<usize>) -> Self {
        if let Some(max_pages) = max_pages {
            self.max_pages = max_pages;
        }
        self
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Clone)]
pub struct ListingReport {
    pub label: &'static str,
    pub pages: usize,
    pub records: usize,
    pub stop: StopReason,
}

/// Records from every listing of a source, plus how each listing ended.
#[derive(Debug, Clone, Default)]
pub struct CrawlReport {
    pub records: Vec<PromotionRecord>,
    pub listings: Vec<ListingReport>,
}

impl CrawlReport {
    /// True when nothing was collected because every listing failed on its
    /// first page. An upstream that is merely empty is not a failure.
    #[must_use]
    pub fn failed_outright(&self) -> bool {
        self.records.is_empty()
            && !self.listings.is_empty()
            && self
                .listings
                .iter()
                .all(|l| l.pages == 0 && matches!(l.stop, StopReason::Failed(_)))
    }

    /// First failure message, if any listing stopped on an error.
    #[must_use]
    pub fn first_error(&self) -> Option<&str> {
        self.listings.iter().find_map(|l| match &l.stop {
            StopReason::Failed(message) => Some(message.as_str()),
            _ => None,
        })
    }
}

/// Crawls every listing of `spec` in order and concatenates the results.
///
/// Listings are paginated independently; a failing listing contributes its
/// partial result and does not stop the others.
pub async fn crawl(
    client: &PromoClient,
    spec: &SourceSpec,
    window: CampaignWindow,
) -> CrawlReport {
    let paginator = Paginator::new(spec.policy, spec.max_pages);
    let mut report = CrawlReport::default();

    for listing in &spec.listings {
        let label = format!("{}:{}", spec.name(), listing.label);
        tracing::info!(listing = %label, "crawling listing");

        let result = paginator
            .paginate(&label, |page_index| {
                fetch_page(client, spec, listing, page_index, window)
            })
            .await;

        tracing::info!(
            listing = %label,
            pages = result.pages,
            records = result.records.len(),
            "listing done"
        );
        report.listings.push(ListingReport {
            label: listing.label,
            pages: result.pages,
            records: result.records.len(),
            stop: result.stop,
        });
        report.records.extend(result.records);
    }

    report
}

async fn fetch_page(
    client: &PromoClient,
    spec: &SourceSpec,
    listing: &Listing,
    page_index: usize,
    window: CampaignWindow,
) -> Result<Page, ScraperError> {
    match spec.kind {
        SourceKind::Cu => cu::fetch_page(client, spec, listing, page_index, window).await,
        SourceKind::SevenEleven => {
            seven_eleven::fetch_page(client, spec, listing, page_index, window).await
        }
    }
}
