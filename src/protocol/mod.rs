//! Session token wire format.

pub mod claims;
pub mod codec;
