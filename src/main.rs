//! # SQL Query Generator
//!
//! Natural-language to SQL for Amazon Redshift, powered by an LLM.
//!
//! `sql-query-generator` fetches a table's DDL from the warehouse, asks an
//! LLM (OpenAI, Anthropic or a local Ollama instance) to write one statement
//! for a plain-English request, strips everything that is not SQL from the
//! answer, and can run the statement and print or export the rows.
//!
//! # Quick Start
//!
//! ```bash
//! export REDSHIFT_HOST=cluster.example.redshift.amazonaws.com
//! export REDSHIFT_DB=dev REDSHIFT_USER=admin REDSHIFT_PASSWORD=...
//! export LLM_API_KEY="sk-..."
//!
//! # Generate a statement
//! sql-query-generator generate -t orders -r "orders placed in the last year"
//!
//! # Stream from a local model, without a warehouse
//! sql-query-generator generate --ddl-file orders.sql -r "top 10 customers" -p ollama --stream
//!
//! # Run it
//! sql-query-generator execute -s "SELECT COUNT(*) FROM orders;"
//!
//! # Export to CSV
//! sql-query-generator export -s "SELECT * FROM orders;" -o orders.csv
//! ```
//!
//! # Exit Codes
//!
//! - `0` - Success
//! - `1` - Configuration, schema or generation error
//! - `2` - The warehouse rejected the executed statement

use std::process;

use clap::Parser;
use sql_query_generator::{
    app::{
        GenerateOutcome, GenerateParams, LlmOverrides, apply_llm_overrides, run_execute,
        run_export, run_generate, run_schema, run_tables
    },
    cli::{Cli, Commands},
    config::Config,
    error::{AppResult, error_message},
    logging
};
use tokio::main;

#[main]
async fn main() {
    match run().await {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("Error: {}", error_message(&e));
            process::exit(1);
        }
    }
}

async fn run() -> AppResult<i32> {
    let cli = Cli::parse();
    let mut config = Config::load()?;
    let level = if cli.verbose {
        "debug"
    } else {
        config.logging.level.as_str()
    };
    logging::init(level);

    match cli.command {
        Commands::Tables {
            schema
        } => {
            for table in run_tables(schema, &config).await? {
                println!("{}", table);
            }
            Ok(0)
        }
        Commands::Schema {
            table
        } => {
            println!("{}", run_schema(&table, &config).await?);
            Ok(0)
        }
        Commands::Generate {
            table,
            request,
            ddl_file,
            provider,
            api_key,
            model,
            ollama_url,
            stream,
            dry_run
        } => {
            apply_llm_overrides(&mut config, LlmOverrides {
                provider,
                api_key,
                model,
                ollama_url
            });
            let params = GenerateParams {
                table,
                request,
                ddl_file,
                stream,
                dry_run
            };
            match run_generate(params, &config).await? {
                GenerateOutcome::Prompt(prompt) => {
                    println!("=== DRY RUN - Would send to LLM ===\n");
                    println!("{}", prompt);
                }
                GenerateOutcome::Sql(sql) => println!("{}", sql)
            }
            Ok(0)
        }
        Commands::Execute {
            sql,
            output_format,
            no_color
        } => {
            let (output, code) = run_execute(&sql, output_format, no_color, &config).await?;
            print!("{}", output);
            Ok(code)
        }
        Commands::Export {
            sql,
            output
        } => {
            let rows = run_export(&sql, &output, &config).await?;
            println!("Wrote {} rows to {}", rows, output.display());
            Ok(0)
        }
    }
}
