//! 7-Eleven promotions.
//!
//! The listing endpoint returns a fragment of `li` items (an empty fragment
//! past the last page). Each item links to a detail view, fetched with a form
//! POST, that carries the description, weight, barcode and the list/sale
//! prices for discounted items.

use std::sync::LazyLock;

use promosync_core::{CampaignWindow, DealType, PromotionRecord};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use super::{Listing, SourceKind, SourceSpec};
use crate::client::{FetchRequest, PromoClient};
use crate::error::ScraperError;
use crate::normalize::{
    absolutize_url, clean_text, collect_normalized, deal_type_from_label, parse_price,
};
use crate::pagination::{Page, TerminationPolicy};

pub const SOURCE_NAME: &str = "seven-eleven";
pub const BASE_URL: &str = "http://www.7-eleven.co.kr";
const LIST_PATH: &str = "/product/listMoreAjax.asp";
const DETAIL_PATH: &str = "/product/presentView.asp";
const PAGE_SIZE: usize = 20;
const MAX_PAGES: usize = 30;

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("valid selector")
}

static ITEM: LazyLock<Selector> = LazyLock::new(|| selector("li"));
static TITLE: LazyLock<Selector> = LazyLock::new(|| selector(".tit_product"));
static NAME: LazyLock<Selector> = LazyLock::new(|| selector(".name"));
static IMAGE: LazyLock<Selector> = LazyLock::new(|| selector(".pic_product img"));
static DEL: LazyLock<Selector> = LazyLock::new(|| selector("del"));
static PRICE_BOX: LazyLock<Selector> = LazyLock::new(|| selector(".product_price"));
static STRONG: LazyLock<Selector> = LazyLock::new(|| selector("strong"));
static PLAIN_PRICE: LazyLock<Selector> = LazyLock::new(|| selector(".price span"));
static TAG: LazyLock<Selector> = LazyLock::new(|| selector(".tag_list_01 li, .ico_tag"));
static VIEW_LINK: LazyLock<Selector> = LazyLock::new(|| selector("a.btn_product_01"));

static DETAIL_TEXT: LazyLock<Selector> = LazyLock::new(|| selector(".txt"));
static DETAIL_SPEC_ROW: LazyLock<Selector> =
    LazyLock::new(|| selector(".productView_content_ul li"));
static SPAN: LazyLock<Selector> = LazyLock::new(|| selector("span"));
static DETAIL_IMAGE: LazyLock<Selector> = LazyLock::new(|| selector(".product_img img"));

static GO_VIEW_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"fncGoView\('(.+?)'\)").expect("valid regex"));
static BARCODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/upload/product/(\d+)/").expect("valid regex"));

pub(super) fn spec() -> SourceSpec {
    SourceSpec {
        kind: SourceKind::SevenEleven,
        base_url: BASE_URL.to_owned(),
        listings: vec![
            Listing {
                label: "1+1",
                code: "1",
                deal_type: DealType::OnePlusOne,
            },
            Listing {
                label: "2+1",
                code: "2",
                deal_type: DealType::TwoPlusOne,
            },
            Listing {
                label: "discount",
                code: "4",
                deal_type: DealType::Discount,
            },
        ],
        policy: TerminationPolicy::EmptyPage,
        max_pages: MAX_PAGES,
        fetch_details: true,
    }
}

/// Fields scraped from one listing item before the detail view is merged in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListItem {
    pub title: Option<String>,
    pub image_src: Option<String>,
    pub normal_price: Option<i64>,
    pub sale_price: Option<i64>,
    pub tag: String,
    pub product_id: Option<String>,
}

/// Fields from the per-product detail view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Detail {
    pub description: Option<String>,
    pub weight: Option<String>,
    pub barcode: Option<String>,
    pub normal_price: Option<i64>,
    pub sale_price: Option<i64>,
}

pub(super) async fn fetch_page(
    client: &PromoClient,
    spec: &SourceSpec,
    listing: &Listing,
    page_index: usize,
    window: CampaignWindow,
) -> Result<Page, ScraperError> {
    let request = FetchRequest::get(spec.endpoint(LIST_PATH))
        .query("intPageSize", PAGE_SIZE)
        .query("intCurrPage", page_index)
        .query("pTab", listing.code);
    let response = client.send(&request).await?;
    let items = parse_list(&response.body);
    let raw_count = items.len();

    let mut enriched = Vec::with_capacity(items.len());
    for item in items {
        let detail = match (&item.title, &item.product_id) {
            (Some(_), Some(product_id)) if spec.fetch_details => {
                fetch_detail(client, spec, product_id).await
            }
            _ => None,
        };
        enriched.push((item, detail));
    }

    let records = collect_normalized(SOURCE_NAME, enriched, |(item, detail)| {
        build_record(item, detail, &spec.base_url, listing, window)
    });
    Ok(Page { raw_count, records })
}

/// Fetches the detail view for one product. Failures are logged and yield
/// `None`; the item is still kept with its listing data.
async fn fetch_detail(client: &PromoClient, spec: &SourceSpec, product_id: &str) -> Option<Detail> {
    let request = FetchRequest::post_form(spec.endpoint(DETAIL_PATH)).form_field("pCd", product_id);
    match client.send(&request).await {
        Ok(response) => Some(parse_detail(&response.body)),
        Err(e) => {
            tracing::warn!(
                source = SOURCE_NAME,
                product_id,
                error = %e,
                "detail fetch failed, keeping listing data"
            );
            None
        }
    }
}

/// Splits a listing fragment into items. Every `li` counts as a raw item,
/// including badge rows nested inside products; those have no title and are
/// dropped during normalization.
#[must_use]
pub fn parse_list(body: &str) -> Vec<ListItem> {
    let document = Html::parse_fragment(body);
    document.select(&ITEM).map(parse_item).collect()
}

fn parse_item(item: ElementRef<'_>) -> ListItem {
    let title = item
        .select(&TITLE)
        .next()
        .or_else(|| item.select(&NAME).next())
        .map(|el| el.text().collect::<String>().trim().to_owned())
        .filter(|t| !t.is_empty());

    let image_src = item
        .select(&IMAGE)
        .next()
        .and_then(|el| el.value().attr("src"))
        .map(str::to_owned);

    let normal_price = item
        .select(&DEL)
        .next()
        .and_then(|el| parse_price(Some(&el.text().collect::<String>())));

    let sale_price = strong_price(item)
        .filter(|p| *p > 0)
        .or_else(|| {
            item.select(&PLAIN_PRICE)
                .next()
                .and_then(|el| parse_price(Some(&el.text().collect::<String>())))
        });

    let tag = item
        .select(&TAG)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_owned())
        .unwrap_or_default();

    let product_id = item
        .select(&VIEW_LINK)
        .next()
        .and_then(|el| el.value().attr("href"))
        .and_then(|href| GO_VIEW_RE.captures(href))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_owned());

    ListItem {
        title,
        image_src,
        normal_price,
        sale_price,
        tag,
        product_id,
    }
}

/// Parses a detail view.
#[must_use]
pub fn parse_detail(body: &str) -> Detail {
    let document = Html::parse_document(body);
    let root = document.root_element();

    let description = root
        .select(&DETAIL_TEXT)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_owned())
        .filter(|t| !t.is_empty());

    let weight = root
        .select(&DETAIL_SPEC_ROW)
        .find(|row| {
            row.select(&STRONG)
                .next()
                .is_some_and(|label| label.text().collect::<String>().contains("중량"))
        })
        .and_then(|row| row.select(&SPAN).next())
        .map(|el| el.text().collect::<String>().trim().to_owned())
        .filter(|w| !w.is_empty());

    let barcode = root
        .select(&DETAIL_IMAGE)
        .next()
        .and_then(|el| el.value().attr("src"))
        .and_then(|src| BARCODE_RE.captures(src))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_owned());

    let (normal_price, sale_price) = root.select(&PRICE_BOX).next().map_or((None, None), |b| {
        let normal = b
            .select(&DEL)
            .next()
            .and_then(|el| parse_price(Some(&el.text().collect::<String>())));
        (normal, strong_price(b))
    });

    Detail {
        description,
        weight,
        barcode,
        normal_price,
        sale_price,
    }
}

/// Price inside `.product_price strong`, ignoring screen-reader `.hide` text.
fn strong_price(scope: ElementRef<'_>) -> Option<i64> {
    let container = if scope.value().classes().any(|c| c == "product_price") {
        scope
    } else {
        scope.select(&PRICE_BOX).next()?
    };
    let strong = container.select(&STRONG).next()?;
    parse_price(Some(&visible_text(strong)))
}

fn visible_text(el: ElementRef<'_>) -> String {
    let root_id = el.id();
    el.descendants()
        .filter_map(|node| node.value().as_text().map(|text| (node, text)))
        .filter(|(node, _)| {
            !node
                .ancestors()
                .take_while(|a| a.id() != root_id)
                .chain(std::iter::once(*el))
                .any(|a| {
                    a.value()
                        .as_element()
                        .is_some_and(|e| e.classes().any(|c| c == "hide"))
                })
        })
        .map(|(_, text)| &**text)
        .collect()
}

fn build_record(
    item: ListItem,
    detail: Option<Detail>,
    base_url: &str,
    listing: &Listing,
    window: CampaignWindow,
) -> Option<PromotionRecord> {
    let raw_title = item.title?;
    let title = clean_text(&raw_title);

    let mut sale_price = item.sale_price;
    let mut normal_price = item.normal_price.filter(|p| *p > 0).or(sale_price);

    let deal_type = if item.tag.is_empty() {
        listing.deal_type
    } else {
        deal_type_from_label(&item.tag)
    };

    let mut description = None;
    let mut barcode = None;
    if let Some(detail) = detail {
        description = match (detail.weight, detail.description) {
            (Some(weight), Some(text)) if text != raw_title => {
                Some(format!("중량: {weight}g | {text}"))
            }
            (Some(weight), _) => Some(format!("중량: {weight}g")),
            (None, text) => text,
        };
        barcode = detail.barcode;
        if let Some(price) = detail.normal_price.filter(|p| *p > 0) {
            normal_price = Some(price);
        }
        if let Some(price) = detail.sale_price.filter(|p| *p > 0) {
            sale_price = Some(price);
        }
    }

    let image_url = item
        .image_src
        .as_deref()
        .and_then(|src| absolutize_url(src, base_url));
    let source_url = item.product_id.as_deref().map(|id| {
        format!(
            "{}{DETAIL_PATH}?pCd={id}",
            base_url.trim_end_matches('/')
        )
    });

    Some(PromotionRecord {
        title,
        raw_title,
        deal_type,
        normal_price,
        sale_price,
        image_url,
        source_url,
        category: None,
        barcode,
        description,
        start_date: window.start,
        end_date: window.end,
    })
}

#[cfg(test)]
#[path = "seven_eleven_test.rs"]
mod tests;
