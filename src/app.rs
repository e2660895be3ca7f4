//! Application logic for the SQL Query Generator CLI.
//!
//! This module contains the command implementations separated from the main
//! entry point to enable testing.

use std::{
    fs::{File, read_to_string},
    io::{self, Read},
    path::{Path, PathBuf},
    time::Duration
};

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use crate::{
    assistant::SqlAssistant,
    cache::SchemaCache,
    cli::Format,
    config::Config,
    error::{AppResult, config_error, file_read_error, file_write_error, query_failed},
    executor::{QueryResult, execute_safely},
    llm::LlmClient,
    output::{OutputFormat, OutputOptions, format_query_result, write_csv},
    prompt::PromptBuilder,
    warehouse::{QualifiedName, RedshiftWarehouse, Warehouse}
};

/// Exit code when a statement ran but the warehouse reported an error
pub const EXIT_QUERY_ERROR: i32 = 2;

/// LLM overrides given on the command line
#[derive(Debug, Clone, Default)]
pub struct LlmOverrides {
    pub provider:   Option<String>,
    pub api_key:    Option<String>,
    pub model:      Option<String>,
    pub ollama_url: Option<String>
}

/// Parameters for the generate command
#[derive(Debug, Clone)]
pub struct GenerateParams {
    pub table:    Option<String>,
    pub request:  String,
    pub ddl_file: Option<PathBuf>,
    pub stream:   bool,
    pub dry_run:  bool
}

/// What the generate command produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerateOutcome {
    /// Dry run: the prompt that would have been sent
    Prompt(String),
    /// Sanitized SQL statement
    Sql(String)
}

/// Convert CLI format to internal OutputFormat
pub fn convert_format(format: Format) -> OutputFormat {
    match format {
        Format::Text => OutputFormat::Text,
        Format::Json => OutputFormat::Json,
        Format::Yaml => OutputFormat::Yaml,
        Format::Csv => OutputFormat::Csv
    }
}

/// Command-line values win over configuration and environment
pub fn apply_llm_overrides(config: &mut Config, overrides: LlmOverrides) {
    if let Some(provider) = overrides.provider {
        config.llm.provider = Some(provider);
    }
    if let Some(api_key) = overrides.api_key {
        config.llm.api_key = Some(api_key);
    }
    if let Some(model) = overrides.model {
        config.llm.model = Some(model);
    }
    if let Some(url) = overrides.ollama_url {
        config.llm.ollama_url = url;
    }
}

/// Read SQL from the argument or stdin when it is "-"
pub fn read_sql_input(sql: &str) -> AppResult<String> {
    if sql == "-" {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .map_err(|e| file_read_error("stdin", e))?;
        Ok(buffer)
    } else {
        Ok(sql.to_string())
    }
}

/// Exit code for an executed statement
pub fn query_exit_code(result: &QueryResult) -> i32 {
    if result.is_error() { EXIT_QUERY_ERROR } else { 0 }
}

/// Run the generate command
///
/// The provider is validated before anything else, so an unsupported
/// selector fails even on a dry run.
pub async fn run_generate(params: GenerateParams, config: &Config) -> AppResult<GenerateOutcome> {
    let llm = LlmClient::from_config(config)?;
    let prompt_builder = PromptBuilder::new(config.prompt.timestamp_column.as_str());

    if let Some(path) = &params.ddl_file {
        let ddl = read_to_string(path)
            .map_err(|e| file_read_error(&path.display().to_string(), e))?;
        let prompt = prompt_builder.build(&params.request, &ddl);
        if params.dry_run {
            return Ok(GenerateOutcome::Prompt(prompt));
        }
        let sql = with_feedback(params.stream, |on_partial| {
            llm.generate_stream(&prompt, on_partial)
        })
        .await?;
        return Ok(GenerateOutcome::Sql(sql));
    }

    let table = params
        .table
        .as_deref()
        .ok_or_else(|| config_error("Either --table or --ddl-file is required"))?;
    let warehouse = RedshiftWarehouse::connect(&config.warehouse).await?;
    let assistant = SqlAssistant::new(llm, Box::new(warehouse))
        .with_prompt_builder(prompt_builder)
        .with_default_schema(config.warehouse.schema.as_str());
    if params.dry_run {
        let prompt = assistant.build_prompt(table, &params.request).await?;
        return Ok(GenerateOutcome::Prompt(prompt));
    }
    let sql = with_feedback(params.stream, |on_partial| {
        assistant.build_and_generate_stream(table, &params.request, on_partial)
    })
    .await?;
    Ok(GenerateOutcome::Sql(sql))
}

/// Drive a generation future with live statements (streaming) or a spinner
async fn with_feedback<'a, F, Fut>(stream: bool, generate: F) -> AppResult<String>
where
    F: FnOnce(Box<dyn FnMut(&str) + 'a>) -> Fut,
    Fut: Future<Output = AppResult<String>>
{
    if stream {
        return generate(Box::new(|partial: &str| {
            eprintln!("{}", partial.dimmed());
        }))
        .await;
    }
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message("Generating SQL with LLM...");
    pb.enable_steady_tick(Duration::from_millis(100));
    let result = generate(Box::new(|_: &str| {})).await;
    pb.finish_and_clear();
    result
}

/// Run the tables command
pub async fn run_tables(schema: Option<String>, config: &Config) -> AppResult<Vec<String>> {
    let warehouse = RedshiftWarehouse::connect(&config.warehouse).await?;
    let schema = schema.unwrap_or_else(|| config.warehouse.schema.clone());
    warehouse.list_tables(&schema).await
}

/// Run the schema command
pub async fn run_schema(table: &str, config: &Config) -> AppResult<String> {
    let warehouse = RedshiftWarehouse::connect(&config.warehouse).await?;
    let name = QualifiedName::parse(table, &config.warehouse.schema)?;
    SchemaCache::new().get(&warehouse, &name).await
}

/// Run the execute command, returning rendered output and exit code
pub async fn run_execute(
    sql: &str,
    format: Format,
    no_color: bool,
    config: &Config
) -> AppResult<(String, i32)> {
    let sql = read_sql_input(sql)?;
    let warehouse = RedshiftWarehouse::connect(&config.warehouse).await?;
    let result = execute_safely(&warehouse, &sql).await;
    let opts = OutputOptions {
        format:  convert_format(format),
        colored: !no_color
    };
    Ok((format_query_result(&result, &opts), query_exit_code(&result)))
}

/// Run the export command, returning the number of rows written
pub async fn run_export(sql: &str, output: &Path, config: &Config) -> AppResult<usize> {
    let sql = read_sql_input(sql)?;
    let warehouse = RedshiftWarehouse::connect(&config.warehouse).await?;
    let result = execute_safely(&warehouse, &sql).await;
    export_result(&result, output)
}

/// Write a successful result to `output` as CSV
pub fn export_result(result: &QueryResult, output: &Path) -> AppResult<usize> {
    if let Some(error) = result.error() {
        return Err(query_failed(error));
    }
    let path = output.display().to_string();
    let file = File::create(output).map_err(|e| file_write_error(&path, e))?;
    write_csv(result, file)?;
    Ok(result.rows().len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::warehouse::ResultSet;

    #[test]
    fn test_convert_format() {
        assert_eq!(convert_format(Format::Csv), OutputFormat::Csv);
        assert_eq!(convert_format(Format::Text), OutputFormat::Text);
    }

    #[test]
    fn test_apply_llm_overrides_keeps_unset_values() {
        let mut config = Config::default();
        config.llm.model = Some("from-config".into());
        apply_llm_overrides(&mut config, LlmOverrides {
            provider: Some("ollama".into()),
            ..Default::default()
        });
        assert_eq!(config.llm.provider.as_deref(), Some("ollama"));
        assert_eq!(config.llm.model.as_deref(), Some("from-config"));
    }

    #[test]
    fn test_read_sql_input_passthrough() {
        assert_eq!(read_sql_input("SELECT 1;").unwrap(), "SELECT 1;");
    }

    #[test]
    fn test_query_exit_code() {
        assert_eq!(query_exit_code(&QueryResult::failure("boom")), EXIT_QUERY_ERROR);
        assert_eq!(query_exit_code(&QueryResult::success(ResultSet::default())), 0);
    }

    #[test]
    fn test_export_result_refuses_failed_query() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        assert!(export_result(&QueryResult::failure("syntax error"), &path).is_err());
        assert!(!path.exists());
    }

    #[test]
    fn test_export_result_writes_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let result = QueryResult::success(ResultSet {
            columns: vec!["id".into(), "name".into()],
            rows:    vec![vec![Some("1".into()), None]]
        });
        assert_eq!(export_result(&result, &path).unwrap(), 1);
        assert_eq!(read_to_string(&path).unwrap(), "id,name\n1,\n");
    }

    #[tokio::test]
    async fn test_run_generate_dry_run_with_ddl_file() {
        let dir = tempfile::tempdir().unwrap();
        let ddl = dir.path().join("orders.sql");
        std::fs::write(&ddl, "CREATE TABLE orders (id INT, created_at TIMESTAMP);").unwrap();
        let mut config = Config::default();
        config.llm.provider = Some("ollama".into());
        let outcome = run_generate(
            GenerateParams {
                table:    None,
                request:  "count orders".into(),
                ddl_file: Some(ddl),
                stream:   false,
                dry_run:  true
            },
            &config
        )
        .await
        .unwrap();
        match outcome {
            GenerateOutcome::Prompt(prompt) => {
                assert!(prompt.contains("User request: count orders"));
                assert!(prompt.contains("CREATE TABLE orders"));
            }
            GenerateOutcome::Sql(_) => panic!("dry run must not generate")
        }
    }

    #[tokio::test]
    async fn test_run_generate_rejects_unknown_provider_before_io() {
        let mut config = Config::default();
        config.llm.provider = Some("bard".into());
        let result = run_generate(
            GenerateParams {
                table:    Some("orders".into()),
                request:  "anything".into(),
                ddl_file: None,
                stream:   false,
                dry_run:  true
            },
            &config
        )
        .await;
        assert!(result.is_err());
    }
}
