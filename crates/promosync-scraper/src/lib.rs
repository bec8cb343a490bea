pub mod client;
pub mod error;
pub mod normalize;
pub mod pagination;
mod rate_limit;
pub mod sources;

pub use client::{FetchRequest, FetchResponse, PromoClient, TransportSettings};
pub use error::{ScraperError, TransportError};
pub use normalize::{absolutize_url, collect_normalized, deal_type_from_label, parse_price};
pub use pagination::{Page, Paginated, Paginator, StopReason, TerminationPolicy};
pub use sources::{crawl, CrawlReport, Listing, SourceKind, SourceSpec};
