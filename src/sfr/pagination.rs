//! 「さらに表示」による請求書一覧の取得

use std::sync::{Arc, LazyLock};

use scraper::{ElementRef, Html, Selector};
use tracing::{debug, info, warn};

use crate::error::ScraperError;
use crate::traits::Transport;

use super::parser::css;
use super::types::RawRow;

static TABLE_ROWS: LazyLock<Selector> =
    LazyLock::new(|| css("table.sr-multi-payment tbody tr"));
static ANY_ROW: LazyLock<Selector> = LazyLock::new(|| css("tr"));
static CELL: LazyLock<Selector> = LazyLock::new(|| css("td"));
static LINK: LazyLock<Selector> = LazyLock::new(|| css("a"));

fn raw_row(tr: ElementRef<'_>) -> RawRow {
    // 2列目にリンクがちょうど1つある行だけが明細を持つ
    let detail_href = tr.select(&CELL).nth(1).and_then(|td| {
        let links: Vec<_> = td.select(&LINK).collect();
        match links.as_slice() {
            [a] => a.value().attr("href").map(str::to_string),
            _ => None,
        }
    });
    RawRow { detail_href }
}

/// 請求書ページに最初から表示されている行
pub fn table_rows(document: &Html) -> Vec<RawRow> {
    document.select(&TABLE_ROWS).map(raw_row).collect()
}

/// 「さらに表示」レスポンスの行（`<tr>` だけの断片も受け付ける）
pub fn fragment_rows(body: &str) -> Vec<RawRow> {
    let document = if body.to_ascii_lowercase().contains("<table") {
        Html::parse_document(body)
    } else {
        Html::parse_document(&format!("<table>{}</table>", body))
    };
    document.select(&ANY_ROW).map(raw_row).collect()
}

/// 行数が増えなくなるまで「さらに表示」を繰り返す
pub struct PaginationWalker {
    transport: Arc<dyn Transport>,
    more_url: String,
    max_pages: usize,
}

impl PaginationWalker {
    pub fn new(transport: Arc<dyn Transport>, more_url: impl Into<String>, max_pages: usize) -> Self {
        Self {
            transport,
            more_url: more_url.into(),
            max_pages,
        }
    }

    /// 行数が前回より増えた場合のみ置き換え、それ以外で終了する。
    ///
    /// サーバーは累積した行を返すので、リクエストは1つずつ順番に送る。
    /// 応答が増え続ける場合に備えて `max_pages` 回で打ち切る。
    pub async fn discover_all_rows(
        &self,
        initial_rows: Vec<RawRow>,
    ) -> Result<Vec<RawRow>, ScraperError> {
        let mut known = initial_rows;

        for request in 1..=self.max_pages {
            let page = self.transport.get(&self.more_url).await?;
            let rows = fragment_rows(&page.body);

            if rows.len() <= known.len() {
                info!(
                    "No more bill rows after {} requests ({} rows)",
                    request,
                    known.len()
                );
                return Ok(known);
            }

            debug!("Bill rows grew from {} to {}", known.len(), rows.len());
            known = rows;
        }

        warn!(
            "Stopped loading more bills after {} requests ({} rows)",
            self.max_pages,
            known.len()
        );
        Ok(known)
    }
}
