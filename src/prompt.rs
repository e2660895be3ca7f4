//! Prompt rendering for SQL generation.
//!
//! The rule preamble doubles as the contract with [`crate::sanitize`]: the
//! model is told to start directly with one of the statement keywords the
//! sanitizer looks for, and never to emit prose or fences.

/// Column used for time-range filters unless the user names another one.
pub const DEFAULT_TIMESTAMP_COLUMN: &str = "created_at";

/// Renders natural-language requests into generation prompts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptBuilder {
    timestamp_column: String
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_TIMESTAMP_COLUMN)
    }
}

impl PromptBuilder {
    pub fn new(timestamp_column: impl Into<String>) -> Self {
        Self {
            timestamp_column: timestamp_column.into()
        }
    }

    pub fn timestamp_column(&self) -> &str {
        &self.timestamp_column
    }

    /// Build the prompt for `request` against the table described by `ddl`.
    ///
    /// Pure template substitution: identical inputs give byte-identical
    /// output.
    pub fn build(&self, request: &str, ddl: &str) -> String {
        format!(
            "You are an expert SQL generator for Amazon Redshift. You must follow these rules exactly:\n\
             1. Generate ONLY the SQL query without any explanations or comments\n\
             2. Do not include any markdown formatting, backticks, or code block markers\n\
             3. The query must be valid Amazon Redshift SQL\n\
             4. Do not include any natural language text or explanations\n\
             5. Do not include any 'Here's the SQL query' or similar prefixes\n\
             6. Start directly with SELECT, WITH, INSERT, UPDATE, DELETE, or CREATE\n\
             7. Use Redshift-specific date functions:\n\
             \x20  - Use DATEADD(day/month/year, n, date) instead of date + INTERVAL\n\
             \x20  - Use GETDATE() instead of NOW()\n\
             \x20  - Use DATEDIFF(day/month/year, date1, date2) for date differences\n\
             8. For time-based comparisons:\n\
             \x20  - Always use the {ts} column when comparing dates/times\n\
             \x20  - Only use other date columns if specifically requested\n\
             \x20  - Example: WHERE {ts} >= DATEADD(year, -1, GETDATE())\n\n\
             Table schema:\n{ddl}\n\n\
             User request: {request}\n\n\
             SQL query (start directly with the SQL command):",
            ts = self.timestamp_column,
            ddl = ddl,
            request = request
        )
    }
}

/// Build a prompt with the default timestamp column.
pub fn build_prompt(request: &str, ddl: &str) -> String {
    PromptBuilder::default().build(request, ddl)
}
