//! SafeSpace: onboarding wizard and the wellness API behind it.

pub mod api;
pub mod config;
pub mod error;
pub mod mood;
pub mod onboarding;
pub mod session;
pub mod store;
