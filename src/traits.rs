use std::path::Path;

use async_trait::async_trait;
use url::Url;

use crate::error::ScraperError;
use crate::sfr::Bill;

/// 取得したページ
#[derive(Debug, Clone)]
pub struct Page {
    /// リダイレクト追従後の最終URL
    pub url: Url,
    pub body: String,
}

impl Page {
    pub fn host(&self) -> &str {
        self.url.host_str().unwrap_or_default()
    }

    pub fn path(&self) -> &str {
        self.url.path()
    }
}

/// cookie を保持する HTTP トランスポート
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str) -> Result<Page, ScraperError>;

    async fn post_form(&self, url: &str, fields: &[(String, String)])
        -> Result<Page, ScraperError>;
}

/// captcha などのチャレンジを解決する外部サービス
#[async_trait]
pub trait ChallengeSolver: Send + Sync {
    /// サイトキーとフォームURLからレスポンストークンを得る
    async fn solve(&self, site_key: &str, page_url: &str) -> Result<String, ScraperError>;
}

#[derive(Debug, Clone, Default)]
pub struct SaveOptions {
    /// 重複判定に使うベンダー識別子
    pub identifiers: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SaveSummary {
    pub saved: usize,
    pub skipped: usize,
}

/// 請求書の保存先（冪等であること）
#[async_trait]
pub trait BillSaver: Send + Sync {
    async fn save_bills(
        &self,
        bills: &[Bill],
        folder: &Path,
        options: &SaveOptions,
    ) -> Result<SaveSummary, ScraperError>;
}
