// SPDX-FileCopyrightText: 2025 RAprogramm
// SPDX-License-Identifier: MIT

use sql_query_generator::prompt::{DEFAULT_TIMESTAMP_COLUMN, PromptBuilder, build_prompt};

const DDL: &str = "CREATE TABLE public.orders (id INT, total DECIMAL(10,2), created_at TIMESTAMP);";

#[test]
fn test_build_is_deterministic() {
    let builder = PromptBuilder::default();
    let first = builder.build("total sales last month", DDL);
    let second = builder.build("total sales last month", DDL);
    assert_eq!(first, second);
    assert_eq!(first, build_prompt("total sales last month", DDL));
}

#[test]
fn test_prompt_embeds_schema_and_request() {
    let prompt = build_prompt("orders over 100", DDL);
    assert!(prompt.contains(&format!("Table schema:\n{}\n\n", DDL)));
    assert!(prompt.contains("User request: orders over 100\n\n"));
    assert!(prompt.ends_with("SQL query (start directly with the SQL command):"));
}

#[test]
fn test_prompt_embeds_output_rules() {
    let prompt = build_prompt("x", DDL);
    assert!(prompt.starts_with("You are an expert SQL generator for Amazon Redshift."));
    assert!(prompt.contains("6. Start directly with SELECT, WITH, INSERT, UPDATE, DELETE, or CREATE\n"));
    assert!(prompt.contains("Do not include any markdown formatting, backticks, or code block markers"));
    assert!(prompt.contains("   - Use GETDATE() instead of NOW()\n"));
    assert!(prompt.contains("   - Use DATEADD(day/month/year, n, date) instead of date + INTERVAL\n"));
    assert!(prompt.contains("   - Use DATEDIFF(day/month/year, date1, date2) for date differences\n"));
}

#[test]
fn test_default_timestamp_column() {
    let prompt = build_prompt("x", DDL);
    assert_eq!(DEFAULT_TIMESTAMP_COLUMN, "created_at");
    assert!(prompt.contains("   - Always use the created_at column when comparing dates/times\n"));
    assert!(prompt.contains("WHERE created_at >= DATEADD(year, -1, GETDATE())"));
}

#[test]
fn test_custom_timestamp_column() {
    let builder = PromptBuilder::new("event_time");
    assert_eq!(builder.timestamp_column(), "event_time");
    let prompt = builder.build("x", DDL);
    assert!(prompt.contains("Always use the event_time column"));
    assert!(prompt.contains("WHERE event_time >= DATEADD"));
    assert!(!prompt.contains("Always use the created_at column"));
}

#[test]
fn test_different_requests_give_different_prompts() {
    assert_ne!(build_prompt("a", DDL), build_prompt("b", DDL));
}
