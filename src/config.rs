use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_WWW_ORIGIN: &str = "https://www.sfr.fr";
pub const DEFAULT_CLIENT_ORIGIN: &str = "https://espace-client.sfr.fr";
pub const DEFAULT_VENDOR: &str = "SFR MOBILE";

const LOGIN_PAGE_PATH: &str =
    "/bounce?target=//www.sfr.fr/sfr-et-moi/bounce.html&casforcetheme=mire-sfr-et-moi&mire_layer";
const CAS_LOGIN_PATH: &str = "/cas/login?domain=mire-sfr-et-moi&service=https://www.sfr.fr/accueil/j_spring_cas_security_check";
pub const BILLING_PATH: &str = "/facture-mobile/consultation";
const MORE_BILLS_PATH: &str = "/facture-mobile/consultation/plusDeFactures";

/// HTTP トランスポート設定
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub follow_redirects: bool,
    pub max_redirects: usize,
    pub cookie_persistence: bool,
    pub user_agent: String,
    /// None の場合はクライアント既定値
    pub timeout: Option<Duration>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            follow_redirects: true,
            max_redirects: 5,
            cookie_persistence: true,
            user_agent: format!("sfr-bill-scraper/{}", env!("CARGO_PKG_VERSION")),
            timeout: None,
        }
    }
}

/// ポータルのエンドポイント
///
/// すべてのURLは2つのオリジンから組み立てる。テストではモックサーバーに差し替える。
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub www_origin: String,
    pub client_origin: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            www_origin: DEFAULT_WWW_ORIGIN.to_string(),
            client_origin: DEFAULT_CLIENT_ORIGIN.to_string(),
        }
    }
}

impl Endpoints {
    pub fn new(www_origin: impl Into<String>, client_origin: impl Into<String>) -> Self {
        Self {
            www_origin: trim_origin(www_origin.into()),
            client_origin: trim_origin(client_origin.into()),
        }
    }

    pub fn login_page(&self) -> String {
        format!("{}{}", self.www_origin, LOGIN_PAGE_PATH)
    }

    pub fn cas_login(&self) -> String {
        format!("{}{}", self.www_origin, CAS_LOGIN_PATH)
    }

    pub fn billing_page(&self) -> String {
        format!("{}{}", self.client_origin, BILLING_PATH)
    }

    pub fn more_bills(&self) -> String {
        format!("{}{}", self.client_origin, MORE_BILLS_PATH)
    }

    /// ページ相対パスを請求書ポータルの絶対URLにする
    pub fn absolute(&self, relative: &str) -> String {
        if relative.starts_with("http://") || relative.starts_with("https://") {
            return relative.to_string();
        }
        format!("{}{}", self.client_origin, relative)
    }
}

fn trim_origin(origin: String) -> String {
    origin.trim_end_matches('/').to_string()
}

#[derive(Debug, Clone)]
pub struct ScraperConfig {
    pub login: String,
    pub password: String,
    pub folder_path: PathBuf,
    pub vendor: String,
    pub endpoints: Endpoints,
    pub transport: TransportConfig,
    pub retry_interval: Duration,
    /// None = 無制限（間隔のみ）
    pub login_attempts: Option<u32>,
    pub fetch_attempts: Option<u32>,
    pub max_pages: usize,
    pub save_timeout: Duration,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            login: String::new(),
            password: String::new(),
            folder_path: PathBuf::from("./bills"),
            vendor: DEFAULT_VENDOR.to_string(),
            endpoints: Endpoints::default(),
            transport: TransportConfig::default(),
            retry_interval: Duration::from_secs(5),
            login_attempts: Some(3),
            fetch_attempts: Some(3),
            max_pages: 50,
            save_timeout: Duration::from_secs(60),
        }
    }
}

impl ScraperConfig {
    pub fn new(login: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            login: login.into(),
            password: password.into(),
            ..Default::default()
        }
    }

    pub fn with_folder_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.folder_path = path.into();
        self
    }

    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub fn with_transport(mut self, transport: TransportConfig) -> Self {
        self.transport = transport;
        self
    }

    pub fn with_retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = interval;
        self
    }

    pub fn with_login_attempts(mut self, attempts: Option<u32>) -> Self {
        self.login_attempts = attempts;
        self
    }

    pub fn with_fetch_attempts(mut self, attempts: Option<u32>) -> Self {
        self.fetch_attempts = attempts;
        self
    }

    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages;
        self
    }

    pub fn with_save_timeout(mut self, timeout: Duration) -> Self {
        self.save_timeout = timeout;
        self
    }
}
