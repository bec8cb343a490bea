//! CU convenience-store promotions.
//!
//! The event page loads items from an Ajax endpoint that returns an HTML
//! fragment of `li.prod_list` elements, and an empty fragment past the last
//! page.

use std::sync::LazyLock;

use promosync_core::{CampaignWindow, DealType, PromotionRecord};
use scraper::{ElementRef, Html, Selector};

use super::{Listing, SourceKind, SourceSpec};
use crate::client::{FetchRequest, PromoClient};
use crate::error::ScraperError;
use crate::normalize::{absolutize_url, clean_text, collect_normalized, parse_price};
use crate::pagination::{Page, TerminationPolicy};

pub const SOURCE_NAME: &str = "cu";
pub const BASE_URL: &str = "https://cu.bgfretail.com";
const LIST_PATH: &str = "/event/plusAjax.do";
const MAX_PAGES: usize = 50;

static ITEM: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("li.prod_list").expect("valid selector"));
static NAME: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".name p").expect("valid selector"));
static IMAGE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".prod_img img").expect("valid selector"));
static PRICE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".price strong").expect("valid selector"));
static LINK: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a").expect("valid selector"));

pub(super) fn spec() -> SourceSpec {
    SourceSpec {
        kind: SourceKind::Cu,
        base_url: BASE_URL.to_owned(),
        listings: vec![
            Listing {
                label: "1+1",
                code: "23",
                deal_type: DealType::OnePlusOne,
            },
            Listing {
                label: "2+1",
                code: "24",
                deal_type: DealType::TwoPlusOne,
            },
        ],
        policy: TerminationPolicy::EmptyPage,
        max_pages: MAX_PAGES,
        fetch_details: false,
    }
}

pub(super) async fn fetch_page(
    client: &PromoClient,
    spec: &SourceSpec,
    listing: &Listing,
    page_index: usize,
    window: CampaignWindow,
) -> Result<Page, ScraperError> {
    let request = FetchRequest::get(spec.endpoint(LIST_PATH))
        .query("pageIndex", page_index)
        .query("searchCondition", listing.code)
        .query("listType", 0);
    let response = client.send(&request).await?;
    Ok(parse_page(&response.body, &spec.base_url, listing, window))
}

/// Parses one Ajax fragment into a [`Page`].
///
/// Every item takes its deal type from the listing. CU only shows the
/// promotional price, so `normal_price` equals `sale_price`.
#[must_use]
pub fn parse_page(body: &str, base_url: &str, listing: &Listing, window: CampaignWindow) -> Page {
    let document = Html::parse_fragment(body);
    let items: Vec<ElementRef<'_>> = document.select(&ITEM).collect();
    let raw_count = items.len();
    let records = collect_normalized(SOURCE_NAME, items, |item| {
        normalize_item(item, base_url, listing, window)
    });
    Page { raw_count, records }
}

fn normalize_item(
    item: ElementRef<'_>,
    base_url: &str,
    listing: &Listing,
    window: CampaignWindow,
) -> Option<PromotionRecord> {
    let raw_title = item
        .select(&NAME)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_owned())
        .filter(|t| !t.is_empty())?;

    let image_url = item
        .select(&IMAGE)
        .next()
        .and_then(|el| el.value().attr("src"))
        .and_then(|src| absolutize_url(src, base_url));

    let price_text = item
        .select(&PRICE)
        .next()
        .map(|el| el.text().collect::<String>());
    let price = parse_price(price_text.as_deref());

    let source_url = item
        .select(&LINK)
        .next()
        .and_then(|el| el.value().attr("href"))
        .and_then(|href| absolutize_url(href, base_url));

    Some(PromotionRecord {
        title: clean_text(&raw_title),
        raw_title,
        deal_type: listing.deal_type,
        normal_price: price,
        sale_price: price,
        image_url,
        source_url,
        category: None,
        barcode: None,
        description: None,
        start_date: window.start,
        end_date: window.end,
    })
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn window() -> CampaignWindow {
        CampaignWindow::for_date(NaiveDate::from_ymd_opt(2026, 10, 17).unwrap())
    }

    fn one_plus_one() -> Listing {
        spec().listings[0]
    }

    const FRAGMENT: &str = r#"
        <ul>
          <li class="prod_list">
            <a href="javascript:;"></a>
            <div class="prod_wrap">
              <div class="prod_img"><img src="//tqklhszfkvzk6518638.edge.naverncp.com/product/8801094083007.jpg"></div>
              <div class="prod_text">
                <div class="name"><p> 코카)코카콜라500ml </p></div>
                <div class="price"><strong>2,000</strong>원</div>
              </div>
            </div>
          </li>
          <li class="prod_list">
            <a href="/product/view.do?category=event&amp;gdIdx=123"></a>
            <div class="prod_img"><img src="https://cdn.example.com/p2.jpg"></div>
            <div class="name"><p>농심)새우깡90G</p></div>
            <div class="price"><strong></strong></div>
          </li>
          <li class="prod_list">
            <div class="name"><p>   </p></div>
          </li>
        </ul>
    "#;

    #[test]
    fn parses_items_and_counts_raw_elements() {
        let page = parse_page(FRAGMENT, BASE_URL, &one_plus_one(), window());
        assert_eq!(page.raw_count, 3);
        assert_eq!(page.records.len(), 2);
    }

    #[test]
    fn first_item_fields() {
        let page = parse_page(FRAGMENT, BASE_URL, &one_plus_one(), window());
        let cola = &page.records[0];
        assert_eq!(cola.title, "코카)코카콜라500ml");
        assert_eq!(cola.deal_type, DealType::OnePlusOne);
        assert_eq!(cola.sale_price, Some(2000));
        assert_eq!(cola.normal_price, Some(2000));
        assert_eq!(
            cola.image_url.as_deref(),
            Some("https://tqklhszfkvzk6518638.edge.naverncp.com/product/8801094083007.jpg")
        );
        assert!(cola.source_url.is_none());
        assert_eq!(cola.start_date, NaiveDate::from_ymd_opt(2026, 10, 1).unwrap());
        assert_eq!(cola.end_date, NaiveDate::from_ymd_opt(2026, 10, 31).unwrap());
    }

    #[test]
    fn missing_price_is_none_and_relative_link_is_absolutized() {
        let page = parse_page(FRAGMENT, BASE_URL, &one_plus_one(), window());
        let snack = &page.records[1];
        assert_eq!(snack.sale_price, None);
        assert_eq!(
            snack.source_url.as_deref(),
            Some("https://cu.bgfretail.com/product/view.do?category=event&gdIdx=123")
        );
    }

    #[test]
    fn empty_fragment_has_zero_raw_items() {
        let page = parse_page("", BASE_URL, &one_plus_one(), window());
        assert_eq!(page.raw_count, 0);
        assert!(page.records.is_empty());
    }

    #[test]
    fn two_plus_one_listing_sets_deal_type() {
        let listing = spec().listings[1];
        let page = parse_page(FRAGMENT, BASE_URL, &listing, window());
        assert!(page
            .records
            .iter()
            .all(|r| r.deal_type == DealType::TwoPlusOne));
    }
}
