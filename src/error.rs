//! Error constructors shared across the generation pipeline.
//!
//! Every fallible operation returns [`AppResult`]. Errors are built through the
//! functions below so that each failure class maps onto one stable
//! [`masterror::AppErrorKind`]:
//!
//! | Failure | Kind |
//! |---------|------|
//! | Table has no DDL | `NotFound` |
//! | Unsupported provider, bad configuration | `BadRequest` |
//! | LLM transport or provider failure | `Service` |
//! | Stream closed before the completion marker | `Network` |
//! | Warehouse failure, file I/O | `Internal` |

pub use masterror::{AppError, AppErrorKind, AppResult};

/// Create file read error
pub fn file_read_error(path: &str, source: std::io::Error) -> AppError {
    AppError::internal(format!("Failed to read file '{}': {}", path, source))
}

/// Create file write error
pub fn file_write_error(path: &str, source: impl std::fmt::Display) -> AppError {
    AppError::internal(format!("Failed to write file '{}': {}", path, source))
}

/// Create error for a table whose DDL could not be fetched
pub fn schema_not_found(qualified_name: &str, cause: Option<&str>) -> AppError {
    let msg = match cause {
        Some(cause) => format!("Table {} not found: {}", qualified_name, cause),
        None => format!("Table {} not found.", qualified_name)
    };
    AppError::not_found(msg)
}

/// Create error for an unknown provider selector
pub fn unsupported_provider(selector: &str) -> AppError {
    AppError::bad_request(format!(
        "Unsupported LLM provider '{}' (expected openai, anthropic or ollama)",
        selector
    ))
}

/// Create generation error
pub fn generation_failed(message: impl Into<String>) -> AppError {
    AppError::service(message.into())
}

/// Create error for a stream that ended without its completion marker
pub fn stream_incomplete(received_bytes: usize) -> AppError {
    AppError::network(format!(
        "LLM stream ended before completion marker ({} bytes received)",
        received_bytes
    ))
}

/// Create error for a statement the warehouse rejected
pub fn query_failed(message: impl Into<String>) -> AppError {
    AppError::bad_request(format!("Query failed: {}", message.into()))
}

/// Create warehouse error
pub fn warehouse_error(err: impl std::fmt::Display) -> AppError {
    AppError::internal(err.to_string())
}

/// Create HTTP error for blocking providers
pub fn http_error(err: reqwest::Error) -> AppError {
    let msg = if err.is_timeout() {
        format!("Request timeout: {}", err)
    } else if err.is_connect() {
        format!("Connection failed: {}", err)
    } else if err.is_status() {
        format!("HTTP error {}: {}", err.status().unwrap_or_default(), err)
    } else {
        err.to_string()
    };
    generation_failed(msg)
}

/// Create HTTP error for the Ollama streaming endpoint
///
/// Connection refusals, timeouts and everything else get distinct messages so
/// the caller can tell a stopped server from a slow model.
pub fn ollama_transport_error(err: reqwest::Error) -> AppError {
    let msg = if err.is_connect() {
        String::from("Could not connect to Ollama. Please ensure the Ollama server is running.")
    } else if err.is_timeout() {
        String::from("Request to Ollama timed out. Please try again.")
    } else {
        format!("Failed to communicate with Ollama: {}", err)
    };
    generation_failed(msg)
}

/// Create config error
pub fn config_error(message: impl Into<String>) -> AppError {
    AppError::bad_request(message.into())
}

/// Human-readable text of an error, preferring the attached message over the
/// kind label.
pub fn error_message(err: &AppError) -> String {
    err.message
        .as_deref()
        .map(str::to_string)
        .unwrap_or_else(|| err.to_string())
}
