//! Throttled reachability and wake control for the managed machine.
//!
//! Both actions run through a [`CooldownWindow`]. The window is re-armed
//! *before* the external operation is invoked, so a failing or slow operation
//! still holds the cooldown for its full duration.
//!
//! Methods take `&mut self`: share one controller behind a mutex (see
//! [`crate::manager::WolService`]) to serialize callers.

use crate::clock::{Clock, SystemClock};
use crate::config::ThrottleConfig;
use crate::status::cooldown::{CooldownState, CooldownWindow};
use crate::status::machine::Machine;
use crate::status::report::{CooldownReport, StatusReport};
use crate::WolError;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// `last_online_ping` value before the machine was ever seen online.
pub const NEVER_ONLINE: i64 = -1;

/// Status controller for one machine.
pub struct StatusController<M> {
    machine: M,
    clock: Arc<dyn Clock>,
    throttle: ThrottleConfig,
    next_ping: CooldownWindow,
    next_wake: CooldownWindow,
    online: bool,
    last_online_ping: i64,
}

impl<M: Machine> StatusController<M> {
    /// Create a controller with default throttling and the system clock.
    pub fn new(machine: M) -> Self {
        Self::with_clock(machine, Arc::new(SystemClock))
    }

    /// Create a controller with a custom clock.
    pub fn with_clock(machine: M, clock: Arc<dyn Clock>) -> Self {
        Self {
            machine,
            clock,
            throttle: ThrottleConfig::default(),
            next_ping: CooldownWindow::new(),
            next_wake: CooldownWindow::new(),
            online: false,
            last_online_ping: NEVER_ONLINE,
        }
    }

    /// Replace cooldowns and timeouts.
    pub fn with_throttle(mut self, throttle: ThrottleConfig) -> Self {
        self.throttle = throttle;
        self
    }

    /// Whether the machine is online.
    ///
    /// Probes at most once per ping cooldown; in between, the last result is
    /// returned unchanged. A probe that exceeds the probe timeout counts as
    /// offline.
    pub async fn is_online(&mut self) -> bool {
        let now = self.clock.now_millis();
        if !self.next_ping.is_open(now) {
            return self.online;
        }

        self.next_ping.arm(now, self.throttle.ping_cooldown());

        let probe = tokio::time::timeout(self.throttle.probe_timeout(), self.machine.probe());
        let reachable = match probe.await {
            Ok(reachable) => reachable,
            Err(_) => {
                warn!(
                    timeout_ms = self.throttle.probe_timeout_millis,
                    "probe timed out, treating machine as offline"
                );
                false
            }
        };

        self.online = reachable;
        if reachable {
            self.last_online_ping = self.clock.now_millis();
        }
        debug!(online = reachable, "probe completed");

        self.online
    }

    /// Send a wake signal unless the machine is online or the wake cooldown runs.
    ///
    /// # Returns
    /// * `Ok(true)` - a wake signal was dispatched
    /// * `Ok(false)` - suppressed (online, or cooldown still active)
    ///
    /// # Errors
    /// * `WakeCommand` - dispatch failed or timed out; the cooldown stays armed
    pub async fn wake_up(&mut self) -> Result<bool, WolError> {
        if self.is_online().await {
            debug!("machine online, wake suppressed");
            return Ok(false);
        }

        let now = self.clock.now_millis();
        if !self.next_wake.is_open(now) {
            debug!(remaining_ms = self.next_wake.remaining(now), "wake cooldown active");
            return Ok(false);
        }

        self.next_wake.arm(now, self.throttle.wake_cooldown());

        match tokio::time::timeout(self.throttle.wake_timeout(), self.machine.wake()).await {
            Ok(Ok(())) => {
                info!("wake signal dispatched");
                Ok(true)
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Err(WolError::WakeCommand(format!(
                "wake command timed out after {}ms",
                self.throttle.wake_timeout_millis
            ))),
        }
    }

    /// Epoch millis of the last successful probe, or [`NEVER_ONLINE`].
    pub fn last_online_ping(&self) -> i64 {
        self.last_online_ping
    }

    /// Milliseconds until the next probe may run.
    pub fn ping_cooldown(&self) -> i64 {
        self.next_ping.remaining(self.clock.now_millis())
    }

    /// Milliseconds until the next wake may be sent.
    pub fn wake_up_cooldown(&self) -> i64 {
        self.next_wake.remaining(self.clock.now_millis())
    }

    /// State of the probe window (unset, active or expired).
    pub fn ping_window(&self) -> CooldownState {
        self.next_ping.state(self.clock.now_millis())
    }

    /// State of the wake window (unset, active or expired).
    pub fn wake_window(&self) -> CooldownState {
        self.next_wake.state(self.clock.now_millis())
    }

    /// Probe (throttled) and snapshot the current state.
    pub async fn report(&mut self) -> StatusReport {
        let online = self.is_online().await;
        StatusReport {
            online,
            last_online: self.last_online_ping,
            cooldown: CooldownReport {
                ping: self.ping_cooldown(),
                wol: self.wake_up_cooldown(),
            },
        }
    }

    /// The controlled machine.
    pub fn machine(&self) -> &M {
        &self.machine
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::MockClock;
    use crate::status::machine::ScriptedMachine;
    use std::future::Future;

    const T0: i64 = 1_736_942_400_000;

    fn setup() -> (
        StatusController<Arc<ScriptedMachine>>,
        Arc<ScriptedMachine>,
        Arc<MockClock>,
    ) {
        let machine = Arc::new(ScriptedMachine::new());
        let clock = Arc::new(MockClock::from_millis(T0));
        let controller = StatusController::with_clock(machine.clone(), clock.clone());
        (controller, machine, clock)
    }

    #[tokio::test]
    async fn test_probe_is_throttled() {
        let (mut controller, machine, clock) = setup();

        assert!(!controller.is_online().await);
        assert_eq!(machine.probe_count(), 1);
        assert_eq!(controller.ping_cooldown(), 500);

        machine.set_reachable(true);
        clock.advance_millis(100);
        assert!(!controller.is_online().await, "cached result expected");
        assert_eq!(machine.probe_count(), 1);
        assert_eq!(controller.last_online_ping(), NEVER_ONLINE);

        clock.advance_millis(500);
        assert!(controller.is_online().await);
        assert_eq!(machine.probe_count(), 2);
        assert_eq!(controller.last_online_ping(), T0 + 600);
    }

    #[tokio::test]
    async fn test_offline_probe_keeps_last_online_ping() {
        let (mut controller, machine, clock) = setup();
        machine.set_reachable(true);
        assert!(controller.is_online().await);

        machine.set_reachable(false);
        clock.advance_millis(1_000);
        assert!(!controller.is_online().await);
        assert_eq!(controller.last_online_ping(), T0);
    }

    #[tokio::test]
    async fn test_wake_then_cooldown() {
        let (mut controller, machine, clock) = setup();

        assert!(controller.wake_up().await.unwrap());
        assert_eq!(machine.wake_count(), 1);
        assert_eq!(controller.wake_up_cooldown(), 2_500);

        clock.advance_millis(1_000);
        assert!(!controller.wake_up().await.unwrap());
        assert_eq!(machine.wake_count(), 1);

        clock.advance_millis(1_500);
        assert!(controller.wake_up().await.unwrap());
        assert_eq!(machine.wake_count(), 2);
    }

    #[tokio::test]
    async fn test_wake_suppressed_when_online() {
        let (mut controller, machine, _clock) = setup();
        machine.set_reachable(true);

        assert!(!controller.wake_up().await.unwrap());
        assert_eq!(machine.wake_count(), 0);
        assert_eq!(controller.wake_window(), CooldownState::Unset);
    }

    #[tokio::test]
    async fn test_failed_wake_keeps_cooldown_armed() {
        let (mut controller, machine, clock) = setup();
        machine.set_wake_fails(true);

        let result = controller.wake_up().await;
        assert!(matches!(result, Err(WolError::WakeCommand(_))));
        assert_eq!(controller.wake_up_cooldown(), 2_500);

        clock.advance_millis(10);
        assert!(!controller.wake_up().await.unwrap());
        assert_eq!(machine.wake_count(), 1);

        clock.advance_millis(2_500);
        assert!(controller.wake_up().await.is_err());
        assert_eq!(machine.wake_count(), 2);
    }

    #[tokio::test]
    async fn test_window_states() {
        let (mut controller, _machine, clock) = setup();
        assert_eq!(controller.ping_window(), CooldownState::Unset);

        controller.is_online().await;
        assert_eq!(
            controller.ping_window(),
            CooldownState::Active { remaining_millis: 500 }
        );

        clock.advance_millis(500);
        assert_eq!(controller.ping_window(), CooldownState::Expired);
        assert_eq!(controller.ping_cooldown(), 0);
    }

    #[tokio::test]
    async fn test_custom_throttle() {
        let (controller, machine, clock) = setup();
        let mut controller = controller.with_throttle(ThrottleConfig {
            ping_cooldown_millis: 50,
            wake_cooldown_millis: 100,
            ..ThrottleConfig::default()
        });

        assert!(controller.wake_up().await.unwrap());
        clock.advance_millis(100);
        assert!(controller.wake_up().await.unwrap());
        assert_eq!(machine.probe_count(), 2);
    }

    #[tokio::test]
    async fn test_report() {
        let (mut controller, machine, clock) = setup();
        machine.set_reachable(true);

        let report = controller.report().await;
        assert!(report.online);
        assert_eq!(report.last_online, T0);
        assert_eq!(report.cooldown, CooldownReport { ping: 500, wol: 0 });

        clock.advance_millis(200);
        let report = controller.report().await;
        assert_eq!(report.cooldown.ping, 300);
        assert_eq!(machine.probe_count(), 1);
    }

    struct HangingMachine;

    impl Machine for HangingMachine {
        fn probe(&self) -> impl Future<Output = bool> + Send {
            std::future::pending()
        }

        fn wake(&self) -> impl Future<Output = Result<(), WolError>> + Send {
            std::future::pending()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_operations_are_bounded() {
        let clock = Arc::new(MockClock::from_millis(T0));
        let mut controller = StatusController::with_clock(HangingMachine, clock.clone());

        assert!(!controller.is_online().await);

        let result = controller.wake_up().await;
        assert!(matches!(result, Err(WolError::WakeCommand(msg)) if msg.contains("timed out")));
        assert_eq!(controller.wake_up_cooldown(), 2_500);
    }
}
