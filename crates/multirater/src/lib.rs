//! Multi-rater feedback analytics.
//!
//! Turns already-fetched rating rows into per-question, per-competency and
//! per-section results, self-vs-reviewer alignment labels, cross-question
//! comparisons and organization roll-ups. Every reviewer-derived figure passes
//! through a minimum-reviewer privacy floor before it leaves the crate.

pub mod analytics;
pub mod config;
pub mod error;
pub mod telemetry;
