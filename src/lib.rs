//! Fitness coach backend: voice questionnaire, plan generation and plan storage.

pub mod coach;
pub mod config;
pub mod error;
pub mod llm;
pub mod plans;
pub mod server;
pub mod store;
