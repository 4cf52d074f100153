use reqwest::header::{HeaderValue, InvalidHeaderValue};
use thiserror::Error;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

pub const BASE_URL_VAR: &str = "BASE_URL";
pub const ACCESS_TOKEN_VAR: &str = "ACCESS_TOKEN";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid base URL \"{input}\": {source}")]
    InvalidBaseUrl {
        input: String,
        #[source]
        source: url::ParseError,
    },

    #[error("base URL \"{0}\" must use http or https")]
    UnsupportedScheme(String),

    #[error("access token cannot be sent in a header: {0}")]
    InvalidToken(#[from] InvalidHeaderValue),
}

/// Target and credentials for a run. Built once at start-up and shared read-only by every VU.
#[derive(Clone, Debug)]
pub struct RunConfig {
    base_url: String,
    token: String,
    authorization: HeaderValue,
}

impl RunConfig {
    pub fn new(base_url: &str, token: &str) -> Result<Self, ConfigError> {
        let parsed = Url::parse(base_url).map_err(|source| ConfigError::InvalidBaseUrl {
            input: base_url.to_string(),
            source,
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::UnsupportedScheme(base_url.to_string()));
        }

        let mut authorization = HeaderValue::from_str(&format!("Bearer {token}"))?;
        authorization.set_sensitive(true);

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            authorization,
        })
    }

    /// Read `BASE_URL` and `ACCESS_TOKEN`, falling back to the local default and an empty token.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Empty values count as unset.
    pub fn from_vars<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let set = |key: &str| lookup(key).filter(|v: &String| !v.is_empty());
        let base_url = set(BASE_URL_VAR).unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let token = set(ACCESS_TOKEN_VAR).unwrap_or_default();
        Self::new(&base_url, &token)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn authorization(&self) -> &HeaderValue {
        &self.authorization
    }

    /// `path` must start with `/`.
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}
