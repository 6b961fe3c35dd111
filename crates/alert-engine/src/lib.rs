//! Economic and structural filtering, scoring, and digest rendering.

pub mod digest;
pub mod filter;

pub use digest::build_digest;
pub use filter::{AlertEvaluator, Evaluation, RejectReason};
