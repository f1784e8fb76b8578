//! Reqwest-based hCaptcha `siteverify` client.
//!
//! A successful captcha is the only way to obtain a session token, so the
//! verifier sits behind the [`CaptchaVerifier`] seam and can be replaced in
//! tests.

use crate::config::CaptchaConfig;
use crate::WolError;
use reqwest::header::USER_AGENT;
use reqwest::Client;
use serde::Deserialize;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Default hCaptcha verification endpoint.
pub const SITEVERIFY_URL: &str = "https://api.hcaptcha.com/siteverify";

/// Something that can check a captcha response for a caller.
pub trait CaptchaVerifier: Send + Sync {
    /// Verify `response` (the widget token) submitted from `remote_ip`.
    ///
    /// # Errors
    /// * `CaptchaRejected` - the provider refused the response
    /// * `CaptchaTransport` - the provider could not be asked
    fn verify(
        &self,
        response: &str,
        remote_ip: &str,
    ) -> impl Future<Output = Result<(), WolError>> + Send;
}

/// Body returned by `siteverify`.
#[derive(Debug, Clone, Deserialize)]
pub struct SiteVerifyResponse {
    /// Whether the response was accepted.
    pub success: bool,

    /// Failure reasons, if any.
    #[serde(rename = "error-codes", default)]
    pub error_codes: Vec<String>,

    /// Host name of the site the captcha was solved on.
    #[serde(default)]
    pub hostname: Option<String>,
}

impl SiteVerifyResponse {
    /// Turn the provider verdict into a result.
    pub fn into_result(self) -> Result<(), WolError> {
        if self.success {
            return Ok(());
        }

        let codes = if self.error_codes.is_empty() {
            vec!["unknown-reason".to_string()]
        } else {
            self.error_codes
        };
        Err(WolError::CaptchaRejected(codes))
    }
}

/// hCaptcha HTTP client.
pub struct HCaptchaClient {
    client: Client,
    secret: String,
    site_key: String,
    endpoint: String,
}

impl HCaptchaClient {
    /// Create a client from the `hCaptcha` configuration section.
    pub fn new(config: &CaptchaConfig) -> Result<Self, WolError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| WolError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            secret: config.secret.clone(),
            site_key: config.site_key.clone(),
            endpoint: SITEVERIFY_URL.to_string(),
        })
    }

    /// Point the client at another endpoint (self-hosted or test server).
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// The verification endpoint in use.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl CaptchaVerifier for HCaptchaClient {
    async fn verify(&self, response: &str, remote_ip: &str) -> Result<(), WolError> {
        if response.is_empty() {
            return Err(WolError::CaptchaRejected(vec![
                "missing-input-response".to_string(),
            ]));
        }

        let form = [
            ("secret", self.secret.as_str()),
            ("response", response),
            ("remoteip", remote_ip),
            ("sitekey", self.site_key.as_str()),
        ];

        let reply = self
            .client
            .post(&self.endpoint)
            .header(USER_AGENT, build_user_agent())
            .form(&form)
            .send()
            .await
            .map_err(|e| WolError::CaptchaTransport(format!("Request failed: {}", e)))?;

        let verdict: SiteVerifyResponse = reply
            .json()
            .await
            .map_err(|e| WolError::CaptchaTransport(format!("Invalid response body: {}", e)))?;

        if !verdict.success {
            warn!(remote_ip = %remote_ip, codes = ?verdict.error_codes, "captcha rejected");
        }
        verdict.into_result()
    }
}

/// User-Agent sent to the captcha provider: `wolgate/<version>`.
pub fn build_user_agent() -> String {
    format!("wolgate/{}", env!("CARGO_PKG_VERSION"))
}
