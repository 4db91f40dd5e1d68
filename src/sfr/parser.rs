//! 請求書ページの解析
//!
//! HTML は同期関数の中でだけ扱い、`.await` をまたいで保持しない。

use std::sync::{Arc, LazyLock};

use chrono::NaiveDate;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, warn};

use crate::config::Endpoints;
use crate::error::ScraperError;
use crate::traits::{Page, Transport};

use super::pagination::{table_rows, PaginationWalker};
use super::types::Bill;

static BILL_WRAPPER: LazyLock<Selector> = LazyLock::new(|| css(".sr-container-wrapper-m"));
static BILL_CONTENT: LazyLock<Selector> = LazyLock::new(|| css(".sr-container-content"));
static VALUE_SPANS: LazyLock<Selector> = LazyLock::new(|| css("span:not(.sr-text-grey-14)"));
static FIRST_BILL_LINK: LazyLock<Selector> = LazyLock::new(|| css("#lien-telecharger-pdf"));
static DUPLICATE_LINK: LazyLock<Selector> = LazyLock::new(|| css("#lien-duplicata-pdf-"));

pub(crate) fn css(selector: &'static str) -> Selector {
    Selector::parse(selector).expect("static CSS selector")
}

const FRENCH_MONTHS: &[(&str, u32)] = &[
    ("janvier", 1),
    ("janv", 1),
    ("fevrier", 2),
    ("fevr", 2),
    ("fev", 2),
    ("mars", 3),
    ("avril", 4),
    ("avr", 4),
    ("mai", 5),
    ("juin", 6),
    ("juillet", 7),
    ("juil", 7),
    ("aout", 8),
    ("septembre", 9),
    ("sept", 9),
    ("octobre", 10),
    ("oct", 10),
    ("novembre", 11),
    ("nov", 11),
    ("decembre", 12),
    ("dec", 12),
];

fn strip_accents(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'û' | 'ù' | 'ü' => 'u',
            'à' | 'â' => 'a',
            'ô' => 'o',
            'î' | 'ï' => 'i',
            'ç' => 'c',
            other => other,
        })
        .collect()
}

fn french_month(name: &str) -> Option<u32> {
    let normalized = strip_accents(&name.to_lowercase());
    let normalized = normalized.trim_end_matches('.');
    FRENCH_MONTHS
        .iter()
        .find(|(m, _)| *m == normalized)
        .map(|(_, n)| *n)
}

/// `05 mars 2017` 形式（日・フランス語の月名・年）の日付を解析
pub fn parse_french_date(text: &str) -> Option<NaiveDate> {
    let mut parts = text.split_whitespace();
    let day = parts.next()?;
    let month = parts.next()?;
    let year = parts.next()?;

    let day: u32 = day.trim_end_matches("er").parse().ok()?;
    let month = french_month(month)?;
    let year: i32 = year.parse().ok()?;

    NaiveDate::from_ymd_opt(year, month, day)
}

/// `12,34 €` 形式の金額を解析。空文字列なら None
pub fn parse_amount(text: &str) -> Option<f64> {
    let cleaned: String = text
        .trim()
        .replace('€', "")
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .replace(',', ".");

    if cleaned.is_empty() {
        return None;
    }
    // NaN は JSON で null になり、マニフェストが読めなくなる
    cleaned
        .parse::<f64>()
        .ok()
        .filter(|amount| amount.is_finite() && *amount >= 0.0)
}

/// 装飾用のグレー文字を除いた値スパン（0: 日付, 1: 金額）
fn value_fields(wrapper: ElementRef<'_>) -> Vec<String> {
    wrapper
        .select(&BILL_CONTENT)
        .next()
        .map(|content| {
            content
                .select(&VALUE_SPANS)
                .map(|span| span.text().collect::<String>().trim().to_string())
                .collect()
        })
        .unwrap_or_default()
}

fn build_bill(
    wrapper: ElementRef<'_>,
    href: &str,
    endpoints: &Endpoints,
    vendor: &str,
) -> Option<Bill> {
    let fields = value_fields(wrapper);
    let raw_date = fields.first().map(String::as_str).unwrap_or_default();
    let raw_price = fields.get(1).map(String::as_str).unwrap_or_default();

    let Some(amount) = parse_amount(raw_price) else {
        debug!("Skipping bill without price: {:?}", raw_price);
        return None;
    };
    let Some(date) = parse_french_date(raw_date) else {
        warn!("Skipping bill with unreadable date: {:?}", raw_date);
        return None;
    };

    Some(Bill::new(date, amount, endpoints.absolute(href), vendor))
}

/// 請求書ページ先頭の「最新の請求書」ブロック
pub fn parse_first_bill(document: &Html, endpoints: &Endpoints, vendor: &str) -> Option<Bill> {
    let wrapper = document.select(&BILL_WRAPPER).next()?;
    let href = wrapper
        .select(&FIRST_BILL_LINK)
        .next()
        .and_then(|a| a.value().attr("href"));

    match href {
        Some(href) => build_bill(wrapper, href, endpoints, vendor),
        None => {
            info!("wrong url for first PDF bill.");
            None
        }
    }
}

/// 明細ページ（過去の請求書1件分）
pub fn parse_detail_page(body: &str, endpoints: &Endpoints, vendor: &str) -> Option<Bill> {
    let document = Html::parse_document(body);
    let Some(wrapper) = document.select(&BILL_WRAPPER).next() else {
        debug!("Detail page has no bill block");
        return None;
    };
    let Some(href) = wrapper
        .select(&DUPLICATE_LINK)
        .next()
        .and_then(|a| a.value().attr("href"))
    else {
        warn!("Detail page has no duplicate PDF link");
        return None;
    };

    build_bill(wrapper, href, endpoints, vendor)
}

/// 請求書ページ全体から請求書一覧を組み立てる
pub struct PageParser {
    transport: Arc<dyn Transport>,
    endpoints: Endpoints,
    vendor: String,
    walker: PaginationWalker,
}

impl PageParser {
    pub fn new(
        transport: Arc<dyn Transport>,
        endpoints: Endpoints,
        vendor: impl Into<String>,
        max_pages: usize,
    ) -> Self {
        let walker = PaginationWalker::new(transport.clone(), endpoints.more_bills(), max_pages);
        Self {
            transport,
            endpoints,
            vendor: vendor.into(),
            walker,
        }
    }

    /// 最新の請求書を先頭に、過去の請求書を表示順に返す。
    ///
    /// 最新の請求書が一覧側にも現れる場合の重複除去は保存側に任せる。
    pub async fn parse_billing_page(&self, page: &Page) -> Result<Vec<Bill>, ScraperError> {
        let (first_bill, initial_rows) = {
            let document = Html::parse_document(&page.body);
            (
                parse_first_bill(&document, &self.endpoints, &self.vendor),
                table_rows(&document),
            )
        };

        let rows = self.walker.discover_all_rows(initial_rows).await?;
        info!("Fetching {} bill details", rows.len());

        let mut bills = Vec::with_capacity(rows.len() + 1);
        for row in &rows {
            let Some(href) = row.detail_href.as_deref() else {
                continue;
            };
            let detail = self.transport.get(&self.endpoints.absolute(href)).await?;
            if let Some(bill) = parse_detail_page(&detail.body, &self.endpoints, &self.vendor) {
                bills.push(bill);
            }
        }

        if let Some(first) = first_bill {
            bills.insert(0, first);
        }

        info!("Successfully parsed {} bills", bills.len());
        Ok(bills)
    }
}
