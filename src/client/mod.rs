//! Clients for external services.

pub mod hcaptcha;
