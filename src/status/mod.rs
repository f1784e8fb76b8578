//! Machine status: cooldown throttling, probing and waking.

pub mod controller;
pub mod cooldown;
pub mod machine;
pub mod report;
