//! Query execution that never propagates warehouse failures.
//!
//! Interactive execution and CSV export both go through [`execute_safely`],
//! so a failed statement always looks the same to callers: a [`QueryResult`]
//! with empty columns and rows and the driver's message in `error`.

use serde::Serialize;

use crate::{
    error::error_message,
    warehouse::{ResultSet, Warehouse}
};

/// Outcome of running one statement.
///
/// Either columns and rows are populated and `error` is `None`, or `error`
/// carries a message and both collections are empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryResult {
    columns: Vec<String>,
    rows:    Vec<Vec<Option<String>>>,
    error:   Option<String>
}

impl QueryResult {
    pub fn success(result: ResultSet) -> Self {
        Self {
            columns: result.columns,
            rows:    result.rows,
            error:   None
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            columns: Vec::new(),
            rows:    Vec::new(),
            error:   Some(message.into())
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Option<String>>] {
        &self.rows
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Run `sql` and fold any failure into [`QueryResult::failure`].
pub async fn execute_safely<W>(warehouse: &W, sql: &str) -> QueryResult
where
    W: Warehouse + ?Sized
{
    match warehouse.execute(sql).await {
        Ok(result) => {
            tracing::info!(
                columns = result.columns.len(),
                rows = result.rows.len(),
                "query executed"
            );
            QueryResult::success(result)
        }
        Err(e) => {
            let message = error_message(&e);
            tracing::error!(error = %message, "error executing query");
            QueryResult::failure(message)
        }
    }
}
