use std::path::PathBuf;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::future::BoxFuture;
use tower::Service;
use tracing::info;

use crate::config::{Endpoints, ScraperConfig};
use crate::error::ScraperError;
use crate::saver::ManifestSaver;
use crate::sfr::{Bill, FetchOrchestrator};
use crate::traits::{BillSaver, ChallengeSolver};
use crate::transport::HttpTransport;

/// 請求書取得リクエスト
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub login: String,
    pub password: String,
    pub folder_path: PathBuf,
}

impl FetchRequest {
    pub fn new(login: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            password: password.into(),
            folder_path: PathBuf::from("./bills"),
        }
    }

    pub fn with_folder_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.folder_path = path.into();
        self
    }
}

impl From<FetchRequest> for ScraperConfig {
    fn from(req: FetchRequest) -> Self {
        ScraperConfig::new(req.login, req.password).with_folder_path(req.folder_path)
    }
}

/// tower::Serviceを実装した請求書取得サービス
///
/// リクエストごとに cookie jar を持つトランスポートを新しく作る。
#[derive(Clone)]
pub struct BillService {
    saver: Arc<dyn BillSaver>,
    solver: Option<Arc<dyn ChallengeSolver>>,
    template: ScraperConfig,
}

impl Default for BillService {
    fn default() -> Self {
        Self::new()
    }
}

impl BillService {
    pub fn new() -> Self {
        Self {
            saver: Arc::new(ManifestSaver::new()),
            solver: None,
            template: ScraperConfig::default(),
        }
    }

    pub fn with_saver(mut self, saver: Arc<dyn BillSaver>) -> Self {
        self.saver = saver;
        self
    }

    pub fn with_solver(mut self, solver: Arc<dyn ChallengeSolver>) -> Self {
        self.solver = Some(solver);
        self
    }

    /// 資格情報と保存先以外の設定（エンドポイント・リトライ等）
    pub fn with_template(mut self, template: ScraperConfig) -> Self {
        self.template = template;
        self
    }

    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.template.endpoints = endpoints;
        self
    }

    fn config_for(&self, req: FetchRequest) -> ScraperConfig {
        ScraperConfig {
            login: req.login,
            password: req.password,
            folder_path: req.folder_path,
            ..self.template.clone()
        }
    }
}

impl Service<FetchRequest> for BillService {
    type Response = Vec<Bill>;
    type Error = ScraperError;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: FetchRequest) -> Self::Future {
        info!("Bill fetch request received: login={}", req.login);

        let config = self.config_for(req);
        let saver = self.saver.clone();
        let solver = self.solver.clone();

        Box::pin(async move {
            let transport = Arc::new(HttpTransport::new(&config.transport)?);
            let folder = config.folder_path.clone();
            let mut orchestrator = FetchOrchestrator::new(config, transport, saver, solver);

            let bills = orchestrator.run().await?;

            info!("Bill fetch completed: {} bills ({:?})", bills.len(), folder);
            Ok(bills)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::saver::MANIFEST_FILE;
    use crate::sfr::parser_fixtures::{billing_page, detail_page, rows};
    use crate::sfr::session_fixtures::login_page;

    #[test]
    fn test_fetch_request_builder() {
        let req = FetchRequest::new("user", "pass").with_folder_path("/tmp/bills");

        assert_eq!(req.login, "user");
        assert_eq!(req.password, "pass");
        assert_eq!(req.folder_path, PathBuf::from("/tmp/bills"));
    }

    #[test]
    fn test_fetch_request_to_config() {
        let req = FetchRequest::new("user", "pass");
        let config: ScraperConfig = req.into();

        assert_eq!(config.login, "user");
        assert_eq!(config.password, "pass");
        assert_eq!(config.vendor, "SFR MOBILE");
    }

    #[tokio::test]
    async fn test_service_end_to_end_against_mock_portal() {
        let server = MockServer::start().await;
        let session_cookie = "JSESSIONID=abc";

        // ログイン済みなら請求書ページ、未ログインならログインページを返す
        Mock::given(method("GET"))
            .and(path("/facture-mobile/consultation"))
            .and(header("cookie", session_cookie))
            .respond_with(ResponseTemplate::new(200).set_body_string(billing_page(
                Some(("05 mars 2017", "12,34 €")),
                &["/detail/1", "/detail/2"],
            )))
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/facture-mobile/consultation"))
            .respond_with(ResponseTemplate::new(200).set_body_string(login_page("LT-1", None)))
            .with_priority(5)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/bounce"))
            .respond_with(ResponseTemplate::new(200).set_body_string(login_page("LT-1", None)))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/cas/login"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("Set-Cookie", "JSESSIONID=abc; Path=/")
                    .set_body_string("<html><body>Bienvenue</body></html>"),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/facture-mobile/consultation/plusDeFactures"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(rows(&["/detail/1", "/detail/2", "/detail/3"])),
            )
            .mount(&server)
            .await;
        for (n, date, price) in [
            (1, "05 février 2017", "10,00 €"),
            (2, "05 janvier 2017", ""),
            (3, "05 décembre 2016", "9,99 €"),
        ] {
            Mock::given(method("GET"))
                .and(path(format!("/detail/{}", n)))
                .respond_with(ResponseTemplate::new(200).set_body_string(detail_page(
                    date,
                    price,
                    &format!("/pdf/{}.pdf", n),
                )))
                .mount(&server)
                .await;
        }

        let dir = tempfile::tempdir().unwrap();
        let template = ScraperConfig::default()
            .with_endpoints(Endpoints::new(server.uri(), server.uri()))
            .with_retry_interval(Duration::ZERO);
        let mut service = BillService::new().with_template(template);

        let request = FetchRequest::new("0612345678", "secret").with_folder_path(dir.path());
        let bills = service.call(request).await.unwrap();

        let names: Vec<&str> = bills.iter().map(|b| b.file_name.as_str()).collect();
        assert_eq!(names, vec!["201703_sfr.pdf", "201702_sfr.pdf", "201612_sfr.pdf"]);
        assert_eq!(bills[2].file_url, format!("{}/pdf/3.pdf", server.uri()));
        assert!(dir.path().join(MANIFEST_FILE).exists());
    }

    #[tokio::test]
    async fn test_service_redirect_to_other_service_is_login_failed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/facture-mobile/consultation"))
            .respond_with(
                ResponseTemplate::new(302).insert_header("Location", "/facture-fixe/consultation"),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/facture-fixe/consultation"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>fixe</html>"))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let mut service =
            BillService::new().with_endpoints(Endpoints::new(server.uri(), server.uri()));

        let request = FetchRequest::new("user", "pass").with_folder_path(dir.path());
        let err = service.call(request).await.unwrap_err();

        assert!(err.is_login_failed());
        assert!(!dir.path().join(MANIFEST_FILE).exists());
    }
}
