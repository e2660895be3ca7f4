//! # SQL Query Generator Library
//!
//! Natural-language to SQL generation for Amazon Redshift.
//!
//! # Modules
//!
//! - [`prompt`] - Prompt rendering with fixed generation rules
//! - [`sanitize`] - Extraction of one SQL statement from model output
//! - [`llm`] - LLM providers (OpenAI, Anthropic, streaming Ollama)
//! - [`cache`] - Table DDL cache
//! - [`executor`] - Query execution that folds failures into the result
//! - [`warehouse`] - Warehouse interface and Redshift connection
//! - [`assistant`] - Generate-then-execute facade
//! - [`config`] - Configuration loading
//! - [`output`] - Result formatting and CSV export
//! - [`error`] - Error constructors

pub mod app;
pub mod assistant;
pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod executor;
pub mod llm;
pub mod logging;
pub mod output;
pub mod prompt;
pub mod sanitize;
pub mod warehouse;
