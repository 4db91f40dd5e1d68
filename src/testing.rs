//! テスト用のモック（URLごとに固定レスポンスを返す）

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use url::Url;

use crate::error::ScraperError;
use crate::sfr::Bill;
use crate::traits::{BillSaver, ChallengeSolver, Page, SaveOptions, SaveSummary, Transport};

#[derive(Debug, Clone)]
enum Reply {
    Page { final_url: Option<String>, body: String },
    Fail(String),
}

/// リクエストを記録し、登録済みのレスポンスを順に返す（最後の1件は繰り返す）
#[derive(Default)]
pub struct MockTransport {
    routes: Mutex<HashMap<String, VecDeque<Reply>>>,
    requests: Mutex<Vec<String>>,
    posted: Mutex<Vec<(String, Vec<(String, String)>)>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(url: &str, body: &str) -> Page {
        Page {
            url: Url::parse(url).unwrap(),
            body: body.to_string(),
        }
    }

    fn push(&self, key: String, reply: Reply) {
        self.routes
            .lock()
            .unwrap()
            .entry(key)
            .or_default()
            .push_back(reply);
    }

    pub fn on_get(&self, url: &str, body: &str) {
        self.push(
            format!("GET {}", url),
            Reply::Page {
                final_url: None,
                body: body.to_string(),
            },
        );
    }

    pub fn on_get_sequence(&self, url: &str, bodies: &[String]) {
        for body in bodies {
            self.on_get(url, body);
        }
    }

    pub fn on_get_redirected(&self, url: &str, final_url: &str, body: &str) {
        self.push(
            format!("GET {}", url),
            Reply::Page {
                final_url: Some(final_url.to_string()),
                body: body.to_string(),
            },
        );
    }

    pub fn on_get_error(&self, url: &str, message: &str) {
        self.push(format!("GET {}", url), Reply::Fail(message.to_string()));
    }

    pub fn on_post(&self, url: &str, body: &str) {
        self.push(
            format!("POST {}", url),
            Reply::Page {
                final_url: None,
                body: body.to_string(),
            },
        );
    }

    pub fn on_post_error(&self, url: &str, message: &str) {
        self.push(format!("POST {}", url), Reply::Fail(message.to_string()));
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    /// 最後に POST されたフォーム
    pub fn posted_fields(&self, url: &str) -> Vec<(String, String)> {
        self.posted
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(u, _)| u == url)
            .map(|(_, fields)| fields.clone())
            .unwrap_or_default()
    }

    fn reply(&self, key: String, url: &str) -> Result<Page, ScraperError> {
        self.requests.lock().unwrap().push(key.clone());
        let reply = {
            let mut routes = self.routes.lock().unwrap();
            let queue = routes.get_mut(&key).ok_or_else(|| ScraperError::HttpStatus {
                status: 404,
                url: url.to_string(),
            })?;
            if queue.len() > 1 {
                queue.pop_front()
            } else {
                queue.front().cloned()
            }
        };

        match reply {
            Some(Reply::Page { final_url, body }) => {
                Ok(Self::page(final_url.as_deref().unwrap_or(url), &body))
            }
            Some(Reply::Fail(message)) => Err(ScraperError::Transport(message)),
            None => Err(ScraperError::HttpStatus {
                status: 404,
                url: url.to_string(),
            }),
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn get(&self, url: &str) -> Result<Page, ScraperError> {
        self.reply(format!("GET {}", url), url)
    }

    async fn post_form(
        &self,
        url: &str,
        fields: &[(String, String)],
    ) -> Result<Page, ScraperError> {
        self.posted
            .lock()
            .unwrap()
            .push((url.to_string(), fields.to_vec()));
        self.reply(format!("POST {}", url), url)
    }
}

/// 常に同じトークンを返す solver
pub struct StaticSolver {
    token: String,
    calls: Mutex<Vec<(String, String)>>,
}

impl StaticSolver {
    pub fn new(token: &str) -> Self {
        Self {
            token: token.to_string(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChallengeSolver for StaticSolver {
    async fn solve(&self, site_key: &str, page_url: &str) -> Result<String, ScraperError> {
        self.calls
            .lock()
            .unwrap()
            .push((site_key.to_string(), page_url.to_string()));
        Ok(self.token.clone())
    }
}

/// 受け取った請求書を記録するだけの保存先
#[derive(Default)]
pub struct RecordingSaver {
    saved: Mutex<Vec<(Vec<Bill>, PathBuf, Vec<String>)>>,
}

impl RecordingSaver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn saved(&self) -> Vec<(Vec<Bill>, PathBuf, Vec<String>)> {
        self.saved.lock().unwrap().clone()
    }
}

#[async_trait]
impl BillSaver for RecordingSaver {
    async fn save_bills(
        &self,
        bills: &[Bill],
        folder: &Path,
        options: &SaveOptions,
    ) -> Result<SaveSummary, ScraperError> {
        self.saved.lock().unwrap().push((
            bills.to_vec(),
            folder.to_path_buf(),
            options.identifiers.clone(),
        ));
        Ok(SaveSummary {
            saved: bills.len(),
            skipped: 0,
        })
    }
}
