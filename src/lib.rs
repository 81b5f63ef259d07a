mod error;
pub use error::{Error, Result, TrustFailureReason};

pub(crate) mod ext_axum;

pub mod config;
pub mod remote;

pub mod ids;
pub mod integration;
pub mod onboarding_url;

pub mod iam_admin;
pub mod sts_assume_role;

pub mod orchestrator;
pub mod store;

pub mod server;

pub mod cmd;
