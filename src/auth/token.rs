//! Token models returned by the code exchange.

pub mod grant;
pub mod secret;
