//! SFR モバイル請求書コネクタ
//!
//! CAS ログインでセッションを確立し、請求書ページと「さらに表示」から
//! 請求書の日付・金額・PDF URL を取得する

mod orchestrator;
mod pagination;
mod parser;
mod session;
mod types;

pub use orchestrator::FetchOrchestrator;
pub use pagination::{fragment_rows, table_rows, PaginationWalker};
pub use parser::{parse_amount, parse_detail_page, parse_first_bill, parse_french_date, PageParser};
pub use session::{ensure_billing_location, has_login_form, parse_login_form, SessionManager};
pub use types::{file_name_for, Bill, Credentials, ErrorKind, FetchState, LoginForm, RawRow};

#[cfg(test)]
pub(crate) use parser::fixtures as parser_fixtures;
#[cfg(test)]
pub(crate) use session::fixtures as session_fixtures;
