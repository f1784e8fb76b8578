//! # Wolgate
//!
//! **Throttled Wake-on-LAN control behind stateless signed session tokens.**
//!
//! Wolgate exposes the reachability of one machine and lets an authenticated
//! caller power it on. It provides the core a small web front end needs:
//!
//! - **Throttled probing**: the reachability probe runs at most once per ping cooldown
//! - **Throttled waking**: wake signals are suppressed while the machine is online
//!   or a previous wake is still cooling down
//! - **Signed session tokens**: `base64(claims).base64(ed25519 signature)`, no
//!   server-side session storage
//! - **Captcha-gated minting**: tokens are issued after an hCaptcha check
//!
//! ## Quickstart
//!
//! ```no_run
//! use wolgate::{WolConfig, WolService};
//!
//! # async fn run() -> Result<(), wolgate::WolError> {
//! let config = WolConfig::load(&WolConfig::default_path().expect("config dir"))?;
//! let service = WolService::new(&config)?;
//!
//! let token = service.authenticate("<h-captcha-response>", "203.0.113.5").await?;
//! let status = service.query_status(Some(&token)).await?;
//! println!("online: {}", status.online);
//! # Ok(())
//! # }
//! ```
//!
//! ## Threat Model
//!
//! - **Forged tokens**: any change to the claims or signature fails verification
//! - **Crafted lifetimes**: negative or future-dated claims are never valid
//! - **Probe/wake flooding**: external commands are rate-limited and time-bounded
//!
//! Tokens cannot be revoked before they expire; rotating the signing key is
//! the only way to invalidate all of them.

#![warn(missing_docs)]

// Core modules
pub mod clock;
pub mod config;
pub mod errors;

// Token layer
pub mod crypto;
pub mod protocol;
pub mod session;

// Machine layer
pub mod status;

// Client layer
pub mod client;

// Service (main public API)
pub mod manager;

// Re-exports for public API
pub use clock::{Clock, SystemClock};
pub use config::WolConfig;
pub use crypto::signer::TokenSigner;
pub use errors::WolError;
pub use manager::WolService;
pub use protocol::claims::TokenClaims;
pub use session::SessionGate;
pub use status::controller::StatusController;
pub use status::machine::{CommandMachine, Machine};
pub use status::report::StatusReport;

#[cfg(any(test, feature = "test-seams"))]
pub use clock::MockClock;
#[cfg(any(test, feature = "test-seams"))]
pub use status::machine::ScriptedMachine;
