//! Wolgate configuration.

use crate::WolError;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default minimum gap between two reachability probes.
pub const DEFAULT_PING_COOLDOWN_MILLIS: u64 = 500;

/// Default minimum gap between two wake commands.
pub const DEFAULT_WAKE_COOLDOWN_MILLIS: u64 = 2_500;

/// Default upper bound for a single probe.
pub const DEFAULT_PROBE_TIMEOUT_MILLIS: u64 = 2_000;

/// Default upper bound for a single wake dispatch.
pub const DEFAULT_WAKE_TIMEOUT_MILLIS: u64 = 5_000;

/// Default session token lifetime (4 hours).
pub const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 4 * 60 * 60;

/// Configuration for a wolgate deployment.
///
/// Loaded once at process start and treated as immutable afterwards.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WolConfig {
    /// The single managed machine.
    pub machine: MachineConfig,

    /// hCaptcha credentials used before minting a session token.
    #[serde(rename = "hCaptcha")]
    pub h_captcha: CaptchaConfig,

    /// Base64 of the encrypted PKCS#8 private key (PEM or DER).
    pub signing_key: String,

    /// Passphrase protecting `signing_key`.
    pub key_passphrase: String,

    /// Cooldowns, timeouts and token lifetime.
    #[serde(default)]
    pub throttle: ThrottleConfig,
}

/// Identifiers of the managed machine.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineConfig {
    /// Host name or address to probe.
    pub host: String,

    /// Hardware address the wake packet is sent to.
    pub mac_address: String,
}

/// hCaptcha site credentials.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptchaConfig {
    /// Account secret.
    pub secret: String,

    /// Public site key.
    pub site_key: String,
}

/// Throttling and lifetime settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ThrottleConfig {
    /// Probe cooldown in milliseconds.
    pub ping_cooldown_millis: u64,

    /// Wake cooldown in milliseconds.
    pub wake_cooldown_millis: u64,

    /// Probe timeout in milliseconds.
    pub probe_timeout_millis: u64,

    /// Wake timeout in milliseconds.
    pub wake_timeout_millis: u64,

    /// Lifetime of issued session tokens in seconds.
    pub token_lifetime_secs: i64,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            ping_cooldown_millis: DEFAULT_PING_COOLDOWN_MILLIS,
            wake_cooldown_millis: DEFAULT_WAKE_COOLDOWN_MILLIS,
            probe_timeout_millis: DEFAULT_PROBE_TIMEOUT_MILLIS,
            wake_timeout_millis: DEFAULT_WAKE_TIMEOUT_MILLIS,
            token_lifetime_secs: DEFAULT_TOKEN_LIFETIME_SECS,
        }
    }
}

impl ThrottleConfig {
    /// Probe cooldown as a `Duration`.
    pub fn ping_cooldown(&self) -> Duration {
        Duration::from_millis(self.ping_cooldown_millis)
    }

    /// Wake cooldown as a `Duration`.
    pub fn wake_cooldown(&self) -> Duration {
        Duration::from_millis(self.wake_cooldown_millis)
    }

    /// Probe timeout as a `Duration`.
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_millis)
    }

    /// Wake timeout as a `Duration`.
    pub fn wake_timeout(&self) -> Duration {
        Duration::from_millis(self.wake_timeout_millis)
    }
}

impl WolConfig {
    /// Parse configuration from a JSON document.
    pub fn from_json(json: &str) -> Result<Self, WolError> {
        serde_json::from_str(json)
            .map_err(|e| WolError::ConfigError(format!("Invalid configuration JSON: {}", e)))
    }

    /// Read and parse configuration from a file. Never writes back.
    pub fn load(path: &Path) -> Result<Self, WolError> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            WolError::ConfigError(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json(&json)
    }

    /// Default configuration location: `<config dir>/wolgate/config.json`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("wolgate").join("config.json"))
    }

    /// Validate configuration for obvious errors.
    pub fn validate(&self) -> Result<(), WolError> {
        if self.machine.host.trim().is_empty() {
            return Err(WolError::ConfigError(
                "machine.host cannot be empty".to_string(),
            ));
        }
        if self.machine.mac_address.trim().is_empty() {
            return Err(WolError::ConfigError(
                "machine.macAddress cannot be empty".to_string(),
            ));
        }
        if self.signing_key.trim().is_empty() {
            return Err(WolError::ConfigError(
                "signingKey cannot be empty".to_string(),
            ));
        }
        if self.throttle.probe_timeout_millis == 0 || self.throttle.wake_timeout_millis == 0 {
            return Err(WolError::ConfigError(
                "probe and wake timeouts must be positive".to_string(),
            ));
        }
        if self.throttle.token_lifetime_secs <= 0 {
            return Err(WolError::ConfigError(format!(
                "tokenLifetimeSecs must be positive, got {}",
                self.throttle.token_lifetime_secs
            )));
        }
        Ok(())
    }
}

impl fmt::Debug for WolConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WolConfig")
            .field("machine", &self.machine)
            .field("h_captcha", &self.h_captcha)
            .field("signing_key", &"<redacted>")
            .field("key_passphrase", &"<redacted>")
            .field("throttle", &self.throttle)
            .finish()
    }
}

impl fmt::Debug for CaptchaConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptchaConfig")
            .field("secret", &"<redacted>")
            .field("site_key", &self.site_key)
            .finish()
    }
}
