//! SFR モバイル請求書コネクタ
//!
//! - CAS ログイン（captcha は外部 solver で解決）
//! - 「さらに表示」を繰り返して請求書一覧を取得
//! - 日付・金額・PDF URL を正規化して保存先に渡す
//!
//! # 使用例
//!
//! ```rust,ignore
//! use sfr_bill_scraper::{BillService, FetchRequest};
//! use tower::Service;
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut service = BillService::new();
//!
//!     let request = FetchRequest::new("0612345678", "password")
//!         .with_folder_path("./bills");
//!
//!     let bills = service.call(request).await.unwrap();
//!     println!("Bills: {}", bills.len());
//! }
//! ```
//!
//! # 個別コンポーネントの使用例
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use sfr_bill_scraper::{FetchOrchestrator, HttpTransport, ManifestSaver, ScraperConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = ScraperConfig::new("0612345678", "password");
//!     let transport = Arc::new(HttpTransport::new(&config.transport).unwrap());
//!     let mut orchestrator =
//!         FetchOrchestrator::new(config, transport, Arc::new(ManifestSaver::new()), None);
//!     let bills = orchestrator.run().await.unwrap();
//!     println!("Bills: {:?}", bills);
//! }
//! ```

pub mod config;
pub mod error;
pub mod retry;
pub mod saver;
pub mod service;
pub mod sfr;
pub mod traits;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

// 主要な型をリエクスポート
pub use config::{Endpoints, ScraperConfig, TransportConfig};
pub use error::ScraperError;
pub use retry::{retry, RetryPolicy};
pub use saver::ManifestSaver;
pub use service::{BillService, FetchRequest};
pub use traits::{BillSaver, ChallengeSolver, Page, SaveOptions, SaveSummary, Transport};
pub use transport::HttpTransport;

pub use sfr::{Bill, FetchOrchestrator, FetchState, PageParser, PaginationWalker, SessionManager};
