//! Public extension contracts.
//!
//! Quota enforcement is pluggable: the pipeline only reports rate-limit headers, and each
//! credential client asks a [`QuotaPolicy`] whether it may dispatch the next call.

pub mod rate_limit;

pub use rate_limit::*;
