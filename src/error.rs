use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScraperError {
    #[error("ログインフォームのトークンが取得できません: {0}")]
    BadToken(String),

    #[error("ログインエラー: {0}")]
    LoginFailed(String),

    #[error("請求書なし")]
    NoEntry,

    #[error("通信エラー: {0}")]
    Transport(String),

    #[error("HTTPステータスエラー: {status} ({url})")]
    HttpStatus { status: u16, url: String },

    #[error("不正なURL: {0}")]
    InvalidUrl(String),

    #[error("チャレンジ解決エラー: {0}")]
    Challenge(String),

    #[error("タイムアウト: {0}")]
    Timeout(String),

    #[error("ファイル操作エラー: {0}")]
    FileIO(#[from] std::io::Error),

    #[error("シリアライズエラー: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl ScraperError {
    pub fn is_login_failed(&self) -> bool {
        matches!(self, ScraperError::LoginFailed(_))
    }

    pub fn is_no_entry(&self) -> bool {
        matches!(self, ScraperError::NoEntry)
    }

    /// 取得フェーズで再試行してよいエラーか（LoginFailed 以外すべて）
    pub fn is_retryable(&self) -> bool {
        !self.is_login_failed()
    }
}

impl From<reqwest::Error> for ScraperError {
    fn from(e: reqwest::Error) -> Self {
        if let Some(status) = e.status() {
            return ScraperError::HttpStatus {
                status: status.as_u16(),
                url: e.url().map(|u| u.to_string()).unwrap_or_default(),
            };
        }
        ScraperError::Transport(e.to_string())
    }
}

impl From<url::ParseError> for ScraperError {
    fn from(e: url::ParseError) -> Self {
        ScraperError::InvalidUrl(e.to_string())
    }
}
