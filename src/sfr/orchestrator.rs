//! ログイン → 請求書取得 → 保存 の一連の処理

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::ScraperConfig;
use crate::error::ScraperError;
use crate::retry::{retry, RetryPolicy};
use crate::traits::{BillSaver, ChallengeSolver, SaveOptions, Transport};

use super::parser::PageParser;
use super::session::SessionManager;
use super::types::{Bill, Credentials, ErrorKind, FetchState};

pub struct FetchOrchestrator {
    config: ScraperConfig,
    session: SessionManager,
    parser: PageParser,
    saver: Arc<dyn BillSaver>,
    state: FetchState,
}

impl FetchOrchestrator {
    pub fn new(
        config: ScraperConfig,
        transport: Arc<dyn Transport>,
        saver: Arc<dyn BillSaver>,
        solver: Option<Arc<dyn ChallengeSolver>>,
    ) -> Self {
        let session = SessionManager::new(transport.clone(), config.endpoints.clone(), solver);
        let parser = PageParser::new(
            transport,
            config.endpoints.clone(),
            config.vendor.clone(),
            config.max_pages,
        );
        Self {
            config,
            session,
            parser,
            saver,
            state: FetchState::Unauthenticated,
        }
    }

    pub fn state(&self) -> FetchState {
        self.state
    }

    pub fn session(&self) -> &SessionManager {
        &self.session
    }

    fn transition(&mut self, next: FetchState) {
        debug!("State: {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    /// 一括実行。請求書が1件もない場合はエラーではなく空の一覧を返す。
    pub async fn run(&mut self) -> Result<Vec<Bill>, ScraperError> {
        match self.run_steps().await {
            Ok(bills) => Ok(bills),
            Err(e) if e.is_no_entry() => {
                info!("No bill found, the account may simply be empty");
                self.transition(FetchState::Done);
                Ok(Vec::new())
            }
            Err(e) => {
                self.transition(FetchState::Error(ErrorKind::from(&e)));
                Err(e)
            }
        }
    }

    async fn run_steps(&mut self) -> Result<Vec<Bill>, ScraperError> {
        self.ensure_session().await?;
        let bills = self.fetch_bills().await?;
        self.save(&bills).await?;
        self.transition(FetchState::Done);
        Ok(bills)
    }

    async fn ensure_session(&mut self) -> Result<(), ScraperError> {
        self.transition(FetchState::Unauthenticated);

        match self.session.probe_session().await {
            Ok(true) => {
                info!("Existing session is still valid");
                self.transition(FetchState::Authenticated);
                return Ok(());
            }
            Ok(false) => {}
            Err(e) if e.is_login_failed() => return Err(e),
            Err(e) => warn!("Session probe failed, logging in: {}", e),
        }

        self.transition(FetchState::Authenticating);
        let policy = RetryPolicy::new(self.config.login_attempts, self.config.retry_interval);
        let credentials = Credentials::new(&self.config.login, &self.config.password);
        let session = &self.session;
        let credentials = &credentials;
        retry(policy, || async move {
            let form = session.fetch_login_form().await?;
            session.login(form, credentials).await
        })
        .await?;

        self.transition(FetchState::Authenticated);
        Ok(())
    }

    async fn fetch_bills(&mut self) -> Result<Vec<Bill>, ScraperError> {
        self.transition(FetchState::Fetching);

        let policy = RetryPolicy::new(self.config.fetch_attempts, self.config.retry_interval)
            .retry_if(ScraperError::is_retryable);
        let session = &self.session;
        let parser = &self.parser;
        retry(policy, || async move {
            let page = session.fetch_billing_page().await?;
            let bills = parser.parse_billing_page(&page).await?;
            if bills.is_empty() {
                return Err(ScraperError::NoEntry);
            }
            Ok(bills)
        })
        .await
    }

    async fn save(&self, bills: &[Bill]) -> Result<(), ScraperError> {
        let options = SaveOptions {
            identifiers: vec![self.config.vendor.clone()],
        };
        let summary = tokio::time::timeout(
            self.config.save_timeout,
            self.saver
                .save_bills(bills, &self.config.folder_path, &options),
        )
        .await
        .map_err(|_| {
            ScraperError::Timeout(format!(
                "保存が{}秒以内に完了しませんでした",
                self.config.save_timeout.as_secs()
            ))
        })??;

        info!(
            "Saved bills to {:?}: {} new, {} already present",
            self.config.folder_path, summary.saved, summary.skipped
        );
        Ok(())
    }
}
