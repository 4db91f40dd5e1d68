//! SFR 請求書関連の型定義

use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// 正規化済みの請求書
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bill {
    pub date: NaiveDate,
    pub amount: f64,
    #[serde(rename = "fileurl")]
    pub file_url: String,
    #[serde(rename = "filename")]
    pub file_name: String,
    pub vendor: String,
}

impl Bill {
    pub fn new(
        date: NaiveDate,
        amount: f64,
        file_url: impl Into<String>,
        vendor: impl Into<String>,
    ) -> Self {
        Self {
            date,
            amount,
            file_url: file_url.into(),
            file_name: file_name_for(date),
            vendor: vendor.into(),
        }
    }
}

/// 日付から保存ファイル名を決める（`YYYYMM_sfr.pdf`、月に1件を想定）
pub fn file_name_for(date: NaiveDate) -> String {
    format!("{:04}{:02}_sfr.pdf", date.year(), date.month())
}

/// ログインページから取得したフォームフィールド（送信時にそのまま再送）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoginForm {
    fields: Vec<(String, String)>,
    /// captcha のサイトキー（存在する場合）
    pub site_key: Option<String>,
    /// フォームを取得したページのURL
    pub page_url: String,
}

impl LoginForm {
    pub fn new(page_url: impl Into<String>) -> Self {
        Self {
            page_url: page_url.into(),
            ..Default::default()
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// 既存の値は上書きし、なければ末尾に追加
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(k, _)| *k == name) {
            Some(entry) => entry.1 = value,
            None => self.fields.push((name, value)),
        }
    }

    /// 値がない場合のみ設定
    pub fn set_default(&mut self, name: &str, value: &str) {
        if self.get(name).is_none() {
            self.fields.push((name.to_string(), value.to_string()));
        }
    }

    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// ログイン資格情報
#[derive(Clone)]
pub struct Credentials {
    pub login: String,
    pub password: String,
}

impl Credentials {
    pub fn new(login: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("login", &self.login)
            .field("password", &"***")
            .finish()
    }
}

/// 請求書一覧テーブルの1行
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    /// 2列目の明細リンク（ページ相対パス）
    pub detail_href: Option<String>,
}

/// 取得処理の状態
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchState {
    Unauthenticated,
    Authenticating,
    Authenticated,
    Fetching,
    Done,
    Error(ErrorKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    BadToken,
    LoginFailed,
    NoEntry,
    Transient,
}

impl From<&crate::error::ScraperError> for ErrorKind {
    fn from(e: &crate::error::ScraperError) -> Self {
        use crate::error::ScraperError;
        match e {
            ScraperError::BadToken(_) => ErrorKind::BadToken,
            ScraperError::LoginFailed(_) => ErrorKind::LoginFailed,
            ScraperError::NoEntry => ErrorKind::NoEntry,
            _ => ErrorKind::Transient,
        }
    }
}
