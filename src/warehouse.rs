//! Warehouse collaborator interface and its Redshift implementation.
//!
//! The generation pipeline only needs three things from the warehouse: the
//! DDL of a table, the list of tables in a schema, and the ability to run one
//! statement. [`Warehouse`] captures exactly that so tests can substitute an
//! in-memory fake.
//!
//! [`RedshiftWarehouse`] talks to Amazon Redshift over the PostgreSQL wire
//! protocol using `tokio-postgres`.

use std::fmt;

use async_trait::async_trait;
use tokio_postgres::{Client, NoTls, SimpleQueryMessage};

use crate::{
    config::WarehouseConfig,
    error::{AppResult, config_error, warehouse_error}
};

/// Schema used when a table name carries no schema prefix.
pub const DEFAULT_SCHEMA: &str = "public";

/// Schema-qualified table name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QualifiedName {
    pub schema: String,
    pub table:  String
}

impl QualifiedName {
    pub fn new(schema: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
            table:  table.into()
        }
    }

    /// Parse `table` or `schema.table`, falling back to `default_schema`.
    ///
    /// Empty parts and names with more than one dot are rejected.
    pub fn parse(name: &str, default_schema: &str) -> AppResult<Self> {
        let trimmed = name.trim();
        let (schema, table) = match trimmed.split_once('.') {
            Some((schema, table)) => (schema.trim(), table.trim()),
            None => (default_schema, trimmed)
        };
        if schema.is_empty() || table.is_empty() || table.contains('.') {
            return Err(config_error(format!(
                "Invalid table name '{}' (expected table or schema.table)",
                name
            )));
        }
        Ok(Self::new(schema, table))
    }

    /// Double-quoted form safe to splice into SQL text.
    pub fn quoted(&self) -> String {
        format!(
            "{}.{}",
            quote_ident(&self.schema),
            quote_ident(&self.table)
        )
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.schema, self.table)
    }
}

fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Rows returned by a successful statement, in result-set order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows:    Vec<Vec<Option<String>>>
}

/// Operations the generation pipeline needs from the warehouse.
#[async_trait]
pub trait Warehouse: Send + Sync {
    /// DDL text of a table, or `None` when the warehouse returns no row.
    async fn describe(&self, name: &QualifiedName) -> AppResult<Option<String>>;

    /// Run one statement and collect its rows.
    async fn execute(&self, sql: &str) -> AppResult<ResultSet>;

    /// Names of the tables in `schema`.
    async fn list_tables(&self, schema: &str) -> AppResult<Vec<String>>;
}

/// Amazon Redshift connection.
pub struct RedshiftWarehouse {
    client: Client
}

impl RedshiftWarehouse {
    /// Connect and spawn the connection driver onto the current runtime.
    pub async fn connect(config: &WarehouseConfig) -> AppResult<Self> {
        let host = config
            .host
            .as_deref()
            .ok_or_else(|| config_error("Warehouse host is not configured (set REDSHIFT_HOST)"))?;
        let mut pg = tokio_postgres::Config::new();
        pg.host(host).port(config.port);
        if let Some(database) = &config.database {
            pg.dbname(database);
        }
        if let Some(user) = &config.user {
            pg.user(user);
        }
        if let Some(password) = &config.password {
            pg.password(password);
        }
        let (client, connection) = pg.connect(NoTls).await.map_err(warehouse_error)?;
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!(error = %e, "warehouse connection closed");
            }
        });
        tracing::info!(host, port = config.port, "connected to warehouse");
        Ok(Self {
            client
        })
    }
}

#[async_trait]
impl Warehouse for RedshiftWarehouse {
    async fn describe(&self, name: &QualifiedName) -> AppResult<Option<String>> {
        let sql = format!("SHOW TABLE {};", name.quoted());
        let messages = self
            .client
            .simple_query(&sql)
            .await
            .map_err(warehouse_error)?;
        let ddl = messages.into_iter().find_map(|message| match message {
            SimpleQueryMessage::Row(row) => row.get(0).map(str::to_string),
            _ => None
        });
        Ok(ddl)
    }

    async fn execute(&self, sql: &str) -> AppResult<ResultSet> {
        let messages = self
            .client
            .simple_query(sql)
            .await
            .map_err(warehouse_error)?;
        let mut result = ResultSet::default();
        for message in messages {
            match message {
                SimpleQueryMessage::RowDescription(columns) => {
                    result.columns = columns.iter().map(|c| c.name().to_string()).collect();
                }
                SimpleQueryMessage::Row(row) => {
                    if result.columns.is_empty() {
                        result.columns = row
                            .columns()
                            .iter()
                            .map(|c| c.name().to_string())
                            .collect();
                    }
                    let values = (0..row.len())
                        .map(|i| row.get(i).map(str::to_string))
                        .collect();
                    result.rows.push(values);
                }
                _ => {}
            }
        }
        Ok(result)
    }

    async fn list_tables(&self, schema: &str) -> AppResult<Vec<String>> {
        let rows = self
            .client
            .query(
                "SELECT DISTINCT tablename FROM pg_table_def WHERE schemaname = $1 ORDER BY tablename",
                &[&schema]
            )
            .await
            .map_err(warehouse_error)?;
        rows.iter()
            .map(|row| row.try_get::<_, String>(0).map_err(warehouse_error))
            .collect()
    }
}
