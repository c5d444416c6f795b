//! Observability for the authorizer service.
//!
//! # Privacy by Default
//!
//! Instrumented entry points use `#[instrument(skip_all)]`. Raw tokens, token
//! claims and secrets never appear in logs or metric labels; a denial is
//! logged with its bounded reason label only.

pub mod metrics;

pub use metrics::init_metrics_recorder;
