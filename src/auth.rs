//! Auth-domain models: scopes, token grants, and normalized user profiles.

pub mod profile;
pub mod scope;
pub mod token;

pub use profile::*;
pub use scope::*;
pub use token::{grant::*, secret::*};
