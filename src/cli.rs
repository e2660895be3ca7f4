use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// SQL Query Generator - Turn natural-language requests into Redshift SQL using an LLM
#[derive(Parser, Debug)]
#[command(name = "sql-query-generator")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable debug logging on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List tables in a warehouse schema
    Tables {
        /// Schema to list (defaults to the configured schema)
        #[arg(short, long)]
        schema: Option<String>
    },

    /// Print the DDL of a table
    Schema {
        /// Table name, optionally schema-qualified
        #[arg(short, long)]
        table: String
    },

    /// Generate a SQL statement from a natural-language request
    Generate {
        /// Table name, optionally schema-qualified
        #[arg(short, long)]
        table: Option<String>,

        /// Natural-language request
        #[arg(short, long)]
        request: String,

        /// Read the table DDL from a file instead of the warehouse
        #[arg(long)]
        ddl_file: Option<PathBuf>,

        /// LLM provider (openai, anthropic, ollama)
        #[arg(short, long)]
        provider: Option<String>,

        /// API key for OpenAI or Anthropic
        #[arg(short, long, env = "LLM_API_KEY")]
        api_key: Option<String>,

        /// Model name
        #[arg(short, long)]
        model: Option<String>,

        /// Ollama base URL
        #[arg(long)]
        ollama_url: Option<String>,

        /// Print intermediate statements to stderr while generating
        #[arg(long)]
        stream: bool,

        /// Show the prompt that would be sent to the LLM without calling it
        #[arg(long)]
        dry_run: bool
    },

    /// Execute a SQL statement and print the result
    Execute {
        /// SQL statement (use - for stdin)
        #[arg(short, long)]
        sql: String,

        /// Output format
        #[arg(short = 'f', long, value_enum, default_value = "text")]
        output_format: Format,

        /// Disable colored output
        #[arg(long)]
        no_color: bool
    },

    /// Execute a SQL statement and write the result as CSV
    Export {
        /// SQL statement (use - for stdin)
        #[arg(short, long)]
        sql: String,

        /// Destination file
        #[arg(short, long, default_value = "results.csv")]
        output: PathBuf
    }
}

#[derive(Debug, Clone, ValueEnum)]
pub enum Format {
    Text,
    Json,
    Yaml,
    Csv
}
