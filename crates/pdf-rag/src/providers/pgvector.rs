//! Postgres + pgvector store behind an r2d2 connection pool
//!
//! The driver is blocking, so every call runs on the blocking thread pool.

use async_trait::async_trait;
use pgvector::Vector;
use postgres::types::Json;
use postgres::NoTls;
use r2d2::Pool;
use r2d2_postgres::PostgresConnectionManager;
use uuid::Uuid;

use crate::config::VectorDbConfig;
use crate::error::{Error, PipelineStage, Result};
use crate::types::{Chunk, ChunkMetadata, Fingerprint, StoredRecord};

use super::vector_store::{check_records, check_vector, VectorSearchResult, VectorStoreProvider};

/// Database connection pool
pub type PgPool = Pool<PostgresConnectionManager<NoTls>>;

/// Fully-qualified Postgres table name (schema + table)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableName {
    schema: String,
    table: String,
}

impl TableName {
    /// Parse `table` or `schema.table`; the schema defaults to `public`
    pub fn parse(name: &str) -> Result<Self> {
        let (schema, table) = match name.split_once('.') {
            Some((schema, table)) => (schema.trim(), table.trim()),
            None => ("public", name.trim()),
        };
        if schema.is_empty() || table.is_empty() {
            return Err(Error::Config(format!("invalid table name '{}'", name)));
        }
        Ok(Self {
            schema: schema.to_string(),
            table: table.to_string(),
        })
    }

    /// Fully-qualified table reference with quoted identifiers
    pub fn qualified(&self) -> String {
        format!("{}.{}", quote_ident(&self.schema), quote_ident(&self.table))
    }

    /// Name of the index over the fingerprint metadata key
    pub fn doc_hash_index_name(&self) -> String {
        format!(
            "{}_{}_doc_hash_idx",
            sanitize_ident(&self.schema),
            sanitize_ident(&self.table)
        )
    }
}

/// Quotes Postgres identifiers, escaping embedded quotes
pub fn quote_ident(input: &str) -> String {
    format!("\"{}\"", input.replace('"', "\"\""))
}

fn sanitize_ident(input: &str) -> String {
    input
        .chars()
        .map(|ch| if ch.is_ascii_alphanumeric() { ch } else { '_' })
        .collect()
}

/// Vector store persisting chunks in a pgvector table
pub struct PgVectorStore {
    pool: PgPool,
    table: TableName,
    dimensions: usize,
}

impl PgVectorStore {
    /// Open the pool, create the schema if missing and verify its dimension
    pub async fn connect(config: &VectorDbConfig, dimensions: usize) -> Result<Self> {
        let config = config.clone();
        tokio::task::spawn_blocking(move || Self::connect_blocking(&config, dimensions)).await?
    }

    fn connect_blocking(config: &VectorDbConfig, dimensions: usize) -> Result<Self> {
        let url = config
            .database_url
            .as_deref()
            .ok_or_else(|| Error::Config("DATABASE_URL is not set".to_string()))?;
        let pg_config: postgres::Config = url
            .parse()
            .map_err(|e| Error::Config(format!("invalid DATABASE_URL: {}", e)))?;
        let table = TableName::parse(&config.collection)?;

        let manager = PostgresConnectionManager::new(pg_config, NoTls);
        let pool = Pool::builder()
            .min_idle(Some(config.pool_size))
            .max_size((config.pool_size + config.max_overflow).max(1))
            .connection_timeout(config.connect_timeout())
            .test_on_check_out(true)
            .build(manager)
            .map_err(|e| Error::StoreUnavailable {
                stage: PipelineStage::Startup,
                message: format!("failed to create connection pool: {}", e),
            })?;

        let store = Self {
            pool,
            table,
            dimensions,
        };
        store
            .ensure_schema()
            .map_err(|e| e.at(PipelineStage::Startup))?;

        tracing::info!(
            "Connected to pgvector table {} (dimension {})",
            store.table.qualified(),
            dimensions
        );
        Ok(store)
    }

    fn ensure_schema(&self) -> Result<()> {
        let mut conn = self.pool.get()?;
        let table = self.table.qualified();

        conn.batch_execute("CREATE EXTENSION IF NOT EXISTS vector")?;
        conn.batch_execute(&format!(
            "CREATE TABLE IF NOT EXISTS {table} (
                id UUID PRIMARY KEY,
                seq BIGSERIAL,
                document TEXT NOT NULL,
                embedding VECTOR({dims}) NOT NULL,
                cmetadata JSONB NOT NULL
            )",
            table = table,
            dims = self.dimensions
        ))?;
        conn.batch_execute(&format!(
            "CREATE INDEX IF NOT EXISTS {index} ON {table} ((cmetadata->>'doc_hash'))",
            index = quote_ident(&self.table.doc_hash_index_name()),
            table = table
        ))?;

        // pgvector stores the declared dimension as the column typmod
        let row = conn.query_opt(
            "SELECT atttypmod FROM pg_attribute
             WHERE attrelid = $1::text::regclass AND attname = 'embedding' AND NOT attisdropped",
            &[&table],
        )?;
        let declared = row.map(|r| r.get::<_, i32>(0)).unwrap_or(-1);
        if declared > 0 && declared as usize != self.dimensions {
            return Err(Error::dimension_mismatch(self.dimensions, declared as usize));
        }

        Ok(())
    }

    async fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut postgres::Client, &str) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        let table = self.table.qualified();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get()?;
            f(&mut conn, &table)
        })
        .await?
    }
}

#[async_trait]
impl VectorStoreProvider for PgVectorStore {
    async fn add(&self, records: Vec<StoredRecord>) -> Result<usize> {
        check_records(&records, self.dimensions)?;
        if records.is_empty() {
            return Ok(0);
        }

        self.with_conn(move |conn, table| {
            let mut tx = conn.transaction()?;
            let stmt = tx.prepare(&format!(
                "INSERT INTO {} (id, document, embedding, cmetadata) VALUES ($1, $2, $3, $4)",
                table
            ))?;
            for record in &records {
                let embedding = Vector::from(record.embedding.clone());
                tx.execute(
                    &stmt,
                    &[
                        &record.chunk.id,
                        &record.chunk.content,
                        &embedding,
                        &Json(&record.chunk.metadata),
                    ],
                )?;
            }
            tx.commit()?;
            Ok(records.len())
        })
        .await
        .map_err(|e| e.at(PipelineStage::Storing))
    }

    async fn contains_fingerprint(&self, fingerprint: &Fingerprint) -> Result<bool> {
        let doc_hash = fingerprint.as_str().to_string();
        self.with_conn(move |conn, table| {
            let row = conn.query_one(
                &format!(
                    "SELECT EXISTS(SELECT 1 FROM {} WHERE cmetadata->>'doc_hash' = $1)",
                    table
                ),
                &[&doc_hash],
            )?;
            Ok(row.get::<_, bool>(0))
        })
        .await
        .map_err(|e| e.at(PipelineStage::ExistenceCheck))
    }

    async fn similarity_search(
        &self,
        query_embedding: &[f32],
        k: usize,
    ) -> Result<Vec<VectorSearchResult>> {
        check_vector(query_embedding, self.dimensions)
            .map_err(|e| e.at(PipelineStage::Retrieval))?;

        let query = Vector::from(query_embedding.to_vec());
        let limit = k as i64;
        self.with_conn(move |conn, table| {
            let rows = conn.query(
                &format!(
                    "SELECT id, document, cmetadata, 1 - (embedding <=> $1) AS similarity
                     FROM {}
                     ORDER BY embedding <=> $1, seq ASC
                     LIMIT $2",
                    table
                ),
                &[&query, &limit],
            )?;

            Ok(rows
                .into_iter()
                .map(|row| {
                    let id: Uuid = row.get(0);
                    let content: String = row.get(1);
                    let Json(metadata): Json<ChunkMetadata> = row.get(2);
                    let similarity: f64 = row.get(3);
                    VectorSearchResult {
                        chunk: Chunk {
                            id,
                            content,
                            metadata,
                        },
                        similarity: similarity as f32,
                    }
                })
                .collect())
        })
        .await
        .map_err(|e| e.at(PipelineStage::Retrieval))
    }

    async fn len(&self) -> Result<usize> {
        self.with_conn(|conn, table| {
            let row = conn.query_one(&format!("SELECT COUNT(*) FROM {}", table), &[])?;
            Ok(row.get::<_, i64>(0) as usize)
        })
        .await
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn health_check(&self) -> Result<bool> {
        let result = self
            .with_conn(|conn, _| {
                conn.batch_execute("SELECT 1")?;
                Ok(())
            })
            .await;
        match result {
            Ok(()) => Ok(true),
            Err(e) => {
                tracing::warn!("pgvector health check failed: {}", e);
                Ok(false)
            }
        }
    }

    fn name(&self) -> &str {
        "pgvector"
    }
}
