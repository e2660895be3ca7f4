//! The generate-then-execute facade used by the command-line front end.
//!
//! [`SqlAssistant`] wires the schema cache, prompt builder, LLM client and
//! warehouse together:
//!
//! ```text
//! table ─► SchemaCache ─► PromptBuilder ─► LlmClient ─► sanitized SQL
//! sql ───► execute_safely ─► QueryResult
//! ```

use crate::{
    cache::SchemaCache,
    error::AppResult,
    executor::{QueryResult, execute_safely},
    llm::LlmClient,
    prompt::PromptBuilder,
    warehouse::{QualifiedName, Warehouse}
};

pub struct SqlAssistant<W: ?Sized> {
    llm:            LlmClient,
    prompt:         PromptBuilder,
    cache:          SchemaCache,
    default_schema: String,
    warehouse:      Box<W>
}

impl<W> SqlAssistant<W>
where
    W: Warehouse + ?Sized
{
    pub fn new(llm: LlmClient, warehouse: Box<W>) -> Self {
        Self {
            llm,
            prompt: PromptBuilder::default(),
            cache: SchemaCache::new(),
            default_schema: String::from(crate::warehouse::DEFAULT_SCHEMA),
            warehouse
        }
    }

    pub fn with_prompt_builder(mut self, prompt: PromptBuilder) -> Self {
        self.prompt = prompt;
        self
    }

    pub fn with_cache(mut self, cache: SchemaCache) -> Self {
        self.cache = cache;
        self
    }

    /// Schema applied to table names given without a prefix
    pub fn with_default_schema(mut self, schema: impl Into<String>) -> Self {
        self.default_schema = schema.into();
        self
    }

    pub fn cache(&self) -> &SchemaCache {
        &self.cache
    }

    pub fn llm(&self) -> &LlmClient {
        &self.llm
    }

    pub fn qualify(&self, table: &str) -> AppResult<QualifiedName> {
        QualifiedName::parse(table, &self.default_schema)
    }

    /// DDL of `table`, served from the cache after the first lookup
    pub async fn table_schema(&self, table: &str) -> AppResult<String> {
        let name = self.qualify(table)?;
        self.cache.get(self.warehouse.as_ref(), &name).await
    }

    pub async fn list_tables(&self, schema: Option<&str>) -> AppResult<Vec<String>> {
        let schema = schema.unwrap_or(&self.default_schema);
        self.warehouse.list_tables(schema).await
    }

    /// Prompt that [`Self::build_and_generate`] would send
    pub async fn build_prompt(&self, table: &str, request: &str) -> AppResult<String> {
        let ddl = self.table_schema(table).await?;
        Ok(self.prompt.build(request, &ddl))
    }

    pub async fn build_and_generate(&self, table: &str, request: &str) -> AppResult<String> {
        self.build_and_generate_stream(table, request, |_| {})
            .await
    }

    /// Like [`Self::build_and_generate`], forwarding intermediate statements
    pub async fn build_and_generate_stream<F>(
        &self,
        table: &str,
        request: &str,
        on_partial: F
    ) -> AppResult<String>
    where
        F: FnMut(&str)
    {
        tracing::info!(table, request, "generating query");
        let prompt = self.build_prompt(table, request).await?;
        self.llm.generate_stream(&prompt, on_partial).await
    }

    /// Run `sql`, never failing; inspect [`QueryResult::error`]
    pub async fn execute_safely(&self, sql: &str) -> QueryResult {
        execute_safely(self.warehouse.as_ref(), sql).await
    }
}
