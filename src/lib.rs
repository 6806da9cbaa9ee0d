//! Signup Flow: client-side account onboarding.

pub mod config;
pub mod error;
pub mod onboarding;
pub mod services;
pub mod transport;
pub mod validation;
