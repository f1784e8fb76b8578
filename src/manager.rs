//! Wol service - the main public API for wolgate.
//!
//! `WolService` ties the pieces together for a transport layer:
//! - Captcha-gated token minting
//! - Token-gated status queries that wake an offline machine
//! - Best-effort automatic wake for returning callers

use crate::client::hcaptcha::{CaptchaVerifier, HCaptchaClient};
use crate::clock::{Clock, SystemClock};
use crate::config::WolConfig;
use crate::crypto::signer::TokenSigner;
use crate::session::SessionGate;
use crate::status::controller::StatusController;
use crate::status::machine::{CommandMachine, Machine};
use crate::status::report::StatusReport;
use crate::WolError;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::error;

/// Main entry point for a wolgate deployment.
///
/// Create one instance per process. The status controller lives behind an
/// async mutex so concurrent requests probe and wake one at a time.
pub struct WolService<M, V = HCaptchaClient> {
    gate: SessionGate,
    controller: Mutex<StatusController<M>>,
    captcha: V,
}

impl WolService<CommandMachine, HCaptchaClient> {
    /// Build the production service from configuration.
    ///
    /// The signing key is decrypted here, so a bad key fails at startup
    /// instead of on the first request.
    ///
    /// # Errors
    /// * `ConfigError` - configuration is invalid or the HTTP client cannot be built
    /// * `KeyMaterial` - the signing key cannot be decrypted
    pub fn new(config: &WolConfig) -> Result<Self, WolError> {
        config.validate()?;

        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let signer = Arc::new(TokenSigner::new(
            config.signing_key.clone(),
            config.key_passphrase.clone(),
        ));
        signer.keys()?;

        let gate = SessionGate::with_clock(signer, clock.clone())
            .with_token_lifetime(config.throttle.token_lifetime_secs);
        let controller =
            StatusController::with_clock(CommandMachine::from_config(&config.machine), clock)
                .with_throttle(config.throttle.clone());
        let captcha = HCaptchaClient::new(&config.h_captcha)?;

        Ok(Self::from_parts(gate, controller, captcha))
    }
}

impl<M: Machine, V: CaptchaVerifier> WolService<M, V> {
    /// Assemble a service from prepared components.
    pub fn from_parts(gate: SessionGate, controller: StatusController<M>, captcha: V) -> Self {
        Self {
            gate,
            controller: Mutex::new(controller),
            captcha,
        }
    }

    /// The session gate.
    pub fn gate(&self) -> &SessionGate {
        &self.gate
    }

    /// Exchange a solved captcha for a session token bound to `remote_ip`.
    ///
    /// # Errors
    /// * `CaptchaRejected` / `CaptchaTransport` - captcha not verified
    /// * `KeyMaterial` - token could not be signed
    pub async fn authenticate(
        &self,
        captcha_response: &str,
        remote_ip: &str,
    ) -> Result<String, WolError> {
        self.captcha.verify(captcha_response, remote_ip).await?;
        self.gate.issue_token(remote_ip)
    }

    /// Report machine status, waking it first if it is offline.
    ///
    /// # Errors
    /// * `Unauthenticated` - token missing or invalid (reason is not disclosed)
    /// * `WakeCommand` - the wake command failed
    /// * `KeyMaterial` - tokens cannot be verified at all
    pub async fn query_status(&self, token: Option<&str>) -> Result<StatusReport, WolError> {
        self.require_token(token)?;

        let mut controller = self.controller.lock().await;
        if !controller.is_online().await {
            controller.wake_up().await?;
        }
        Ok(controller.report().await)
    }

    /// Wake the machine for a returning caller, logging failures.
    ///
    /// Returns whether a wake signal was dispatched.
    pub async fn auto_wake(&self, token: Option<&str>) -> Result<bool, WolError> {
        self.require_token(token)?;

        let mut controller = self.controller.lock().await;
        match controller.wake_up().await {
            Ok(dispatched) => Ok(dispatched),
            Err(e) => {
                error!(error = %e, "automatic wake failed");
                Ok(false)
            }
        }
    }

    /// Snapshot without authentication or wake (for health endpoints).
    pub async fn snapshot(&self) -> StatusReport {
        self.controller.lock().await.report().await
    }

    fn require_token(&self, token: Option<&str>) -> Result<(), WolError> {
        if self.gate.has_valid_token(token)? {
            Ok(())
        } else {
            Err(WolError::Unauthenticated)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::MockClock;
    use crate::status::machine::ScriptedMachine;
    use ed25519_dalek::SigningKey;
    use std::future::Future;

    const T0: i64 = 1_736_942_400_000;

    /// Accepts exactly one captcha response.
    struct FixedCaptcha(&'static str);

    impl CaptchaVerifier for FixedCaptcha {
        fn verify(
            &self,
            response: &str,
            _remote_ip: &str,
        ) -> impl Future<Output = Result<(), WolError>> + Send {
            let result = if response == self.0 {
                Ok(())
            } else {
                Err(WolError::CaptchaRejected(vec!["invalid-input-response".to_string()]))
            };
            std::future::ready(result)
        }
    }

    fn setup() -> (
        WolService<Arc<ScriptedMachine>, FixedCaptcha>,
        Arc<ScriptedMachine>,
        Arc<MockClock>,
    ) {
        let clock = Arc::new(MockClock::from_millis(T0));
        let machine = Arc::new(ScriptedMachine::new());
        let signer = Arc::new(TokenSigner::from_signing_key(SigningKey::from_bytes(&[3u8; 32])));
        let gate = SessionGate::with_clock(signer, clock.clone());
        let controller = StatusController::with_clock(machine.clone(), clock.clone());
        let service = WolService::from_parts(gate, controller, FixedCaptcha("solved"));
        (service, machine, clock)
    }

    #[tokio::test]
    async fn test_authenticate_issues_token() {
        let (service, _, _) = setup();
        let token = service.authenticate("solved", "203.0.113.5").await.unwrap();

        let claims = service.gate().check_token(Some(&token)).unwrap();
        assert_eq!(claims.subject, "203.0.113.5");
    }

    #[tokio::test]
    async fn test_authenticate_rejected_captcha() {
        let (service, _, _) = setup();
        let result = service.authenticate("wrong", "203.0.113.5").await;
        assert!(matches!(result, Err(WolError::CaptchaRejected(_))));
    }

    #[tokio::test]
    async fn test_query_status_requires_token() {
        let (service, machine, _) = setup();
        assert!(matches!(
            service.query_status(None).await,
            Err(WolError::Unauthenticated)
        ));
        assert!(matches!(
            service.query_status(Some("forged.token")).await,
            Err(WolError::Unauthenticated)
        ));
        assert_eq!(machine.probe_count(), 0);
    }

    #[tokio::test]
    async fn test_query_status_wakes_offline_machine() {
        let (service, machine, _) = setup();
        let token = service.authenticate("solved", "203.0.113.5").await.unwrap();

        let report = service.query_status(Some(&token)).await.unwrap();
        assert!(!report.online);
        assert_eq!(report.last_online, -1);
        assert_eq!(report.cooldown.wol, 2_500);
        assert_eq!(report.cooldown.ping, 500);
        assert_eq!(machine.wake_count(), 1);
        assert_eq!(machine.probe_count(), 1);
    }

    #[tokio::test]
    async fn test_query_status_online_does_not_wake() {
        let (service, machine, _) = setup();
        machine.set_reachable(true);
        let token = service.authenticate("solved", "203.0.113.5").await.unwrap();

        let report = service.query_status(Some(&token)).await.unwrap();
        assert!(report.online);
        assert_eq!(report.last_online, T0);
        assert_eq!(report.cooldown.wol, 0);
        assert_eq!(machine.wake_count(), 0);
    }

    #[tokio::test]
    async fn test_query_status_propagates_wake_failure() {
        let (service, machine, _) = setup();
        machine.set_wake_fails(true);
        let token = service.authenticate("solved", "203.0.113.5").await.unwrap();

        assert!(matches!(
            service.query_status(Some(&token)).await,
            Err(WolError::WakeCommand(_))
        ));
    }

    #[tokio::test]
    async fn test_auto_wake_swallows_failure() {
        let (service, machine, clock) = setup();
        let token = service.authenticate("solved", "203.0.113.5").await.unwrap();

        assert!(service.auto_wake(Some(&token)).await.unwrap());
        assert!(!service.auto_wake(Some(&token)).await.unwrap());

        machine.set_wake_fails(true);
        clock.advance_millis(3_000);
        assert!(!service.auto_wake(Some(&token)).await.unwrap());
        assert_eq!(machine.wake_count(), 2);
    }

    #[tokio::test]
    async fn test_expired_token_unauthenticated() {
        let (service, _, clock) = setup();
        let token = service.authenticate("solved", "203.0.113.5").await.unwrap();

        clock.advance_millis(14_400_001);
        assert!(matches!(
            service.auto_wake(Some(&token)).await,
            Err(WolError::Unauthenticated)
        ));
    }

    #[tokio::test]
    async fn test_snapshot_without_auth() {
        let (service, machine, _) = setup();
        let report = service.snapshot().await;
        assert!(!report.online);
        assert_eq!(machine.wake_count(), 0);
    }
}
