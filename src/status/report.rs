//! Status query result handed to the presentation layer.

use serde::{Deserialize, Serialize};

/// Snapshot of the managed machine's state.
///
/// Serializes as `{"online":..,"lastOnline":..,"cooldown":{"ping":..,"wol":..}}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    /// Result of the most recent probe.
    pub online: bool,

    /// Epoch millis of the last successful probe, `-1` if never seen online.
    pub last_online: i64,

    /// Remaining cooldowns.
    pub cooldown: CooldownReport,
}

/// Remaining cooldowns in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CooldownReport {
    /// Until the next probe may run.
    pub ping: i64,

    /// Until the next wake may be sent.
    pub wol: i64,
}
