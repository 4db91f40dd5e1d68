//! CAS ログインとセッション確認

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, LazyLock};

use scraper::{ElementRef, Html, Selector};
use tracing::{debug, error, info, warn};
use url::Url;

use crate::config::Endpoints;
use crate::error::ScraperError;
use crate::traits::{ChallengeSolver, Page, Transport};

use super::parser::css;
use super::types::{Credentials, LoginForm};

const TOKEN_FIELD: &str = "lt";
const CHALLENGE_RESPONSE_FIELD: &str = "g-recaptcha-response";

static LOGIN_FORM: LazyLock<Selector> = LazyLock::new(|| css("#loginForm"));
static FORMS: LazyLock<Selector> = LazyLock::new(|| css("form"));
static NAMED_FIELDS: LazyLock<Selector> =
    LazyLock::new(|| css("input[name], select[name], textarea[name]"));
static OPTIONS: LazyLock<Selector> = LazyLock::new(|| css("option"));
static TOKEN_INPUT: LazyLock<Selector> = LazyLock::new(|| css("input[name=lt]"));
static SITE_KEY: LazyLock<Selector> = LazyLock::new(|| css("[data-sitekey]"));

/// ページがログインフォームを含むか
pub fn has_login_form(body: &str) -> bool {
    let document = Html::parse_document(body);
    let found = document.select(&LOGIN_FORM).next().is_some();
    found
}

fn requires_login(page: &Page) -> bool {
    let path = page.path();
    path.starts_with("/cas/") || path.starts_with("/bounce") || has_login_form(&page.body)
}

/// リダイレクト後も請求書ページ（モバイル）に留まっているか確認する。
///
/// 別のサービス（固定回線など）に飛ばされた場合は、ログインは成功しているが
/// アカウント種別が違うので LoginFailed とする。
pub fn ensure_billing_location(page: &Page, endpoints: &Endpoints) -> Result<(), ScraperError> {
    let expected = Url::parse(&endpoints.billing_page())?;
    if page.url.origin() != expected.origin() || page.path() != expected.path() {
        error!("This is not SFR mobile identifier (landed on {})", page.url);
        return Err(ScraperError::LoginFailed(format!(
            "請求書ページ以外に転送されました: {}",
            page.url
        )));
    }
    Ok(())
}

/// 選択中の option（なければ先頭）の値
fn selected_option(select: ElementRef<'_>) -> String {
    let options: Vec<ElementRef<'_>> = select.select(&OPTIONS).collect();
    options
        .iter()
        .find(|o| o.value().attr("selected").is_some())
        .or(options.first())
        .map(|o| match o.value().attr("value") {
            Some(value) => value.to_string(),
            None => o.text().collect::<String>().trim().to_string(),
        })
        .unwrap_or_default()
}

fn form_fields(form: ElementRef<'_>, login_form: &mut LoginForm) {
    for field in form.select(&NAMED_FIELDS) {
        let el = field.value();
        let Some(name) = el.attr("name") else {
            continue;
        };
        if el.attr("disabled").is_some() {
            continue;
        }
        let value = match el.name() {
            "select" => selected_option(field),
            "textarea" => field.text().collect(),
            _ => {
                let kind = el.attr("type").unwrap_or("text").to_ascii_lowercase();
                match kind.as_str() {
                    "submit" | "button" | "image" | "reset" => continue,
                    "checkbox" | "radio" if el.attr("checked").is_none() => continue,
                    // value 属性のないチェック済み項目はブラウザと同じく "on"
                    "checkbox" | "radio" => el.attr("value").unwrap_or("on").to_string(),
                    _ => el.attr("value").unwrap_or_default().to_string(),
                }
            }
        };
        login_form.set(name, value);
    }
}

/// ログインページの解析（hidden トークンを含む全フィールドとチャレンジ）
pub fn parse_login_form(page: &Page) -> Result<LoginForm, ScraperError> {
    let document = Html::parse_document(&page.body);
    let mut login_form = LoginForm::new(page.url.as_str());

    let form = document
        .select(&FORMS)
        .find(|f| f.select(&TOKEN_INPUT).next().is_some());
    match form {
        Some(form) => form_fields(form, &mut login_form),
        None => {
            // form タグなしで描画される場合
            for input in document.select(&TOKEN_INPUT) {
                if let Some(value) = input.value().attr("value") {
                    login_form.set(TOKEN_FIELD, value);
                }
            }
        }
    }

    login_form.site_key = document
        .select(&SITE_KEY)
        .next()
        .and_then(|el| el.value().attr("data-sitekey"))
        .filter(|key| !key.is_empty())
        .map(str::to_string);

    let token = login_form.get(TOKEN_FIELD).unwrap_or_default().to_string();
    if token.is_empty() {
        return Err(ScraperError::BadToken(page.url.to_string()));
    }
    debug!("Login token: {}", token);
    Ok(login_form)
}

/// 認証状態を管理する（cookie はトランスポート側に保持）
pub struct SessionManager {
    transport: Arc<dyn Transport>,
    endpoints: Endpoints,
    solver: Option<Arc<dyn ChallengeSolver>>,
    authenticated: AtomicBool,
}

impl SessionManager {
    pub fn new(
        transport: Arc<dyn Transport>,
        endpoints: Endpoints,
        solver: Option<Arc<dyn ChallengeSolver>>,
    ) -> Self {
        Self {
            transport,
            endpoints,
            solver,
            authenticated: AtomicBool::new(false),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated.load(Ordering::SeqCst)
    }

    /// 請求書ページにアクセスしてセッションが有効か確認する
    pub async fn probe_session(&self) -> Result<bool, ScraperError> {
        let page = self.transport.get(&self.endpoints.billing_page()).await?;
        if requires_login(&page) {
            debug!("Session probe landed on login page: {}", page.url);
            return Ok(false);
        }
        ensure_billing_location(&page, &self.endpoints)?;

        self.authenticated.store(true, Ordering::SeqCst);
        Ok(true)
    }

    pub async fn fetch_login_form(&self) -> Result<LoginForm, ScraperError> {
        info!("Logging in on Sfr Website...");
        let page = self.transport.get(&self.endpoints.login_page()).await?;
        parse_login_form(&page)
    }

    pub async fn login(
        &self,
        mut form: LoginForm,
        credentials: &Credentials,
    ) -> Result<(), ScraperError> {
        info!("Submitting login form for {}", credentials.login);

        form.set("username", credentials.login.as_str());
        form.set("password", credentials.password.as_str());
        form.set_default("execution", "e1s1");
        form.set_default("_eventId", "submit");
        form.set_default("remember-me", "on");
        form.set_default("identifier", "");

        if let Some(site_key) = form.site_key.clone() {
            let solver = self.solver.as_ref().ok_or_else(|| {
                ScraperError::Challenge("captcha が表示されましたが solver が未設定です".into())
            })?;
            info!("Solving login challenge");
            let token = solver.solve(&site_key, &form.page_url).await?;
            form.set(CHALLENGE_RESPONSE_FIELD, token);
        }

        let page = self
            .transport
            .post_form(&self.endpoints.cas_login(), form.fields())
            .await?;

        if has_login_form(&page.body) {
            warn!("Login form still present after submit");
            return Err(ScraperError::LoginFailed("認証情報が拒否されました".into()));
        }

        self.authenticated.store(true, Ordering::SeqCst);
        info!("Login successful");
        Ok(())
    }

    /// 請求書ページを取得（別サービスへの転送は LoginFailed）
    pub async fn fetch_billing_page(&self) -> Result<Page, ScraperError> {
        info!("Fetching bill info");
        let page = self.transport.get(&self.endpoints.billing_page()).await?;
        ensure_billing_location(&page, &self.endpoints)?;
        Ok(page)
    }
}
