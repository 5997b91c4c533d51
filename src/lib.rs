//! Seller Onboarding: multi-step store registration workflow engine.

pub mod api;
pub mod config;
pub mod error;
pub mod onboarding;
pub mod store;
