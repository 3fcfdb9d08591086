//! Triage report formatting via a hosted chat-completions model.
//!
//! This crate turns a trusted treatment description into a structured
//! triage report (intensity, recommendations, bilingual home remedies,
//! emergency note). It never classifies symptoms itself.

pub mod extraction;
pub mod formatter;
pub mod prompts;

pub use extraction::*;
pub use formatter::*;
pub use prompts::*;
