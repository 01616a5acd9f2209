//! Provider-facing configuration (data) and strategy hooks (behavior).
//!
//! `config` exposes the validated [`StrategyConfig`] with Mail.ru's default endpoints,
//! `strategy` defines the [`ProviderStrategy`] hooks the generic OAuth 2.0 core calls into,
//! and `mailru` implements those hooks for Mail.ru.

pub mod config;
pub mod mailru;
pub mod strategy;

pub use config::*;
pub use mailru::*;
pub use strategy::*;
