//! Life Insurance Advisor
//!
//! Estimates how much term-life cover a household needs and asks an AI
//! agent to explain the figure and suggest matching products:
//! - Deterministic income-replacement annuity calculator (the source of truth)
//! - Form validation for the collected profile
//! - OpenAI-backed agent with web search, sandboxed Python and the local calculator as tools
//! - Typed validation of the agent's JSON answer, reconciled against the local figure
//! - CLI and HTTP front ends
//!
//! FLOW:
//! FORM → PROFILE → ESTIMATE → AGENT → PARSE → RECONCILE → REPORT

pub mod advisor;
pub mod agent;
pub mod api;
pub mod audit;
pub mod config;
pub mod coverage;
pub mod display;
pub mod error;
pub mod form;
pub mod llm;
pub mod models;
pub mod recommendation;
pub mod tools;

pub use error::Result;

// Re-export common types
pub use models::*;
pub use coverage::{calculate_coverage, calculate_coverage_at, parse_monetary_amount};
pub use advisor::Advisor;
pub use form::ProfileForm;
