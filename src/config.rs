//! Runtime configuration and per-session credentials
//!
//! Credentials are passed explicitly to each client. They are never
//! written to the process environment, to disk, or to logs.

use crate::coverage::DEFAULT_DISCOUNT_RATE;
use crate::error::AdvisorError;
use crate::Result;
use secrecy::{ExposeSecret, SecretString};
use std::env;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_MODEL: &str = "gpt-5-mini-2025-08-07";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_FIRECRAWL_BASE_URL: &str = "https://api.firecrawl.dev";
pub const DEFAULT_E2B_API_URL: &str = "https://api.e2b.app";
pub const DEFAULT_E2B_SANDBOX_DOMAIN: &str = "e2b.app";

/// Advisor configuration.
#[derive(Debug, Clone)]
pub struct AdvisorConfig {
    /// Chat model identifier.
    pub model: String,
    pub openai_base_url: String,
    pub firecrawl_base_url: String,
    /// E2B control plane (sandbox lifecycle).
    pub e2b_api_url: String,
    /// Domain under which sandbox hosts are reachable.
    pub e2b_sandbox_domain: String,
    /// Lifetime of a code-execution sandbox.
    pub sandbox_timeout: Duration,
    /// Timeout for a single outbound HTTP request.
    pub request_timeout: Duration,
    /// Annual discount rate for the local calculation.
    pub discount_rate: f64,
    /// Model turns allowed to request tools before giving up.
    pub max_tool_rounds: u32,
    /// Relative gap tolerated between the agent's figure and ours.
    pub divergence_tolerance: f64,
    pub port: u16,
}

impl Default for AdvisorConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            openai_base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            firecrawl_base_url: DEFAULT_FIRECRAWL_BASE_URL.to_string(),
            e2b_api_url: DEFAULT_E2B_API_URL.to_string(),
            e2b_sandbox_domain: DEFAULT_E2B_SANDBOX_DOMAIN.to_string(),
            sandbox_timeout: Duration::from_secs(120),
            request_timeout: Duration::from_secs(180),
            discount_rate: DEFAULT_DISCOUNT_RATE,
            max_tool_rounds: 6,
            divergence_tolerance: 0.01,
            port: 8080,
        }
    }
}

impl AdvisorConfig {
    /// Load from the environment (after `.env`), keeping defaults for
    /// anything unset.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup. Split out so tests do not touch the
    /// process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(model) = lookup("OPENAI_MODEL") {
            config.model = model;
        }
        if let Some(url) = lookup("OPENAI_BASE_URL") {
            config.openai_base_url = trim_url(&url);
        }
        if let Some(url) = lookup("FIRECRAWL_BASE_URL") {
            config.firecrawl_base_url = trim_url(&url);
        }
        if let Some(url) = lookup("E2B_API_URL") {
            config.e2b_api_url = trim_url(&url);
        }
        if let Some(domain) = lookup("E2B_SANDBOX_DOMAIN") {
            config.e2b_sandbox_domain = domain.trim().to_string();
        }
        if let Some(secs) = parse_var::<u64, _>(&lookup, "SANDBOX_TIMEOUT_SECS")? {
            config.sandbox_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_var::<u64, _>(&lookup, "REQUEST_TIMEOUT_SECS")? {
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(rate) = parse_var::<f64, _>(&lookup, "DISCOUNT_RATE")? {
            if !rate.is_finite() || rate < 0.0 {
                return Err(AdvisorError::InvalidDiscountRate(rate));
            }
            config.discount_rate = rate;
        }
        if let Some(rounds) = parse_var::<u32, _>(&lookup, "MAX_TOOL_ROUNDS")? {
            config.max_tool_rounds = rounds;
        }
        if let Some(tolerance) = parse_var::<f64, _>(&lookup, "DIVERGENCE_TOLERANCE")? {
            if !tolerance.is_finite() || tolerance < 0.0 {
                return Err(AdvisorError::ConfigError(format!(
                    "DIVERGENCE_TOLERANCE must be a non-negative number, got {tolerance}"
                )));
            }
            config.divergence_tolerance = tolerance;
        }

        let port = match parse_var::<u16, _>(&lookup, "PORT")? {
            Some(port) => Some(port),
            None => parse_var::<u16, _>(&lookup, "API_PORT")?,
        };
        if let Some(port) = port {
            config.port = port;
        }

        Ok(config)
    }

    /// Connection-pooled client shared by the model and tool clients
    pub fn http_client(&self) -> Result<reqwest::Client> {
        let client = reqwest::Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .timeout(self.request_timeout)
            .build()?;
        Ok(client)
    }
}

fn trim_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| AdvisorError::ConfigError(format!("{}={:?}: {}", key, raw, e))),
    }
}

/// The three API keys a session needs.
pub struct Credentials {
    pub openai_api_key: SecretString,
    pub firecrawl_api_key: SecretString,
    pub e2b_api_key: SecretString,
}

impl Credentials {
    /// Rejects blank keys up front so a session fails before any request.
    pub fn new(openai: String, firecrawl: String, e2b: String) -> Result<Self> {
        Ok(Self {
            openai_api_key: require_key("OpenAI API key", openai)?,
            firecrawl_api_key: require_key("Firecrawl API key", firecrawl)?,
            e2b_api_key: require_key("E2B API key", e2b)?,
        })
    }

    /// Read-only lookup of `OPENAI_API_KEY`, `FIRECRAWL_API_KEY` and
    /// `E2B_API_KEY`. Returns `None` if any is unset.
    pub fn from_env() -> Option<Self> {
        let openai = env::var("OPENAI_API_KEY").ok()?;
        let firecrawl = env::var("FIRECRAWL_API_KEY").ok()?;
        let e2b = env::var("E2B_API_KEY").ok()?;
        Self::new(openai, firecrawl, e2b).ok()
    }
}

impl Clone for Credentials {
    fn clone(&self) -> Self {
        Self {
            openai_api_key: duplicate(&self.openai_api_key),
            firecrawl_api_key: duplicate(&self.firecrawl_api_key),
            e2b_api_key: duplicate(&self.e2b_api_key),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("openai_api_key", &"[REDACTED]")
            .field("firecrawl_api_key", &"[REDACTED]")
            .field("e2b_api_key", &"[REDACTED]")
            .finish()
    }
}

fn require_key(name: &'static str, value: String) -> Result<SecretString> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AdvisorError::MissingCredential(name));
    }
    Ok(SecretString::from(trimmed.to_string()))
}

pub(crate) fn duplicate(secret: &SecretString) -> SecretString {
    SecretString::from(secret.expose_secret().to_string())
}
