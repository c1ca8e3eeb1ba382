//! Postgres implementation of `Store` via `sqlx` + `pgvector`, matching the
//! vector/full-text/JSON/array column types spec §6 requires. Every chunk
//! write is wrapped in a per-batch transaction; cache writes are best-effort
//! and never fail the caller (§7 `CacheFailure`).

use super::{RepoSummary, Store, StatsSummary};
use crate::error::StoreError;
use crate::model::{Chunk, ChunkType, EmbeddingCacheEntry, FileImport, FileRecord, ImportType, Relationship, RelationshipType};
use async_trait::async_trait;
use pgvector::Vector;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use uuid::Uuid;

pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new().max_connections(10).connect(database_url).await?;
        Ok(PostgresStore { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn chunk_type_str(t: &ChunkType) -> &'static str {
    t.as_str()
}

fn chunk_type_from_str(s: &str) -> ChunkType {
    match s {
        "function" => ChunkType::Function,
        "class" => ChunkType::Class,
        "method" => ChunkType::Method,
        "interface" => ChunkType::Interface,
        "module" => ChunkType::Module,
        "config" => ChunkType::Config,
        _ => ChunkType::Other,
    }
}

fn relationship_type_str(t: &RelationshipType) -> &'static str {
    t.as_str()
}

fn relationship_type_from_str(s: &str) -> RelationshipType {
    match s {
        "imports" => RelationshipType::Imports,
        "calls" => RelationshipType::Calls,
        _ => RelationshipType::References,
    }
}

fn import_type_str(t: &ImportType) -> &'static str {
    match t {
        ImportType::Static => "static",
        ImportType::Dynamic => "dynamic",
        ImportType::ReExport => "re-export",
    }
}

fn import_type_from_str(s: &str) -> ImportType {
    match s {
        "dynamic" => ImportType::Dynamic,
        "re-export" => ImportType::ReExport,
        _ => ImportType::Static,
    }
}

fn row_to_chunk(row: &sqlx::postgres::PgRow) -> Result<Chunk, StoreError> {
    let embedding: Vector = row.try_get("embedding")?;
    Ok(Chunk {
        id: row.try_get("id")?,
        file_path: row.try_get("file_path")?,
        repo_id: row.try_get("repo_id")?,
        branch: row.try_get("branch")?,
        language: row.try_get("language")?,
        chunk_type: chunk_type_from_str(row.try_get::<String, _>("chunk_type")?.as_str()),
        symbol_name: row.try_get("symbol_name")?,
        symbol_names: row.try_get::<Vec<String>, _>("symbol_names")?,
        imports: row.try_get::<Vec<String>, _>("imports")?,
        exports: row.try_get::<Vec<String>, _>("exports")?,
        line_start: row.try_get::<i32, _>("line_start")? as u32,
        line_end: row.try_get::<i32, _>("line_end")? as u32,
        content: row.try_get("content")?,
        content_hash: row.try_get("content_hash")?,
        embedding: embedding.to_vec(),
        full_text_index: row.try_get("full_text_index")?,
    })
}

#[async_trait]
impl Store for PostgresStore {
    async fn migrate(&self) -> Result<(), StoreError> {
        super::schema::migrate(&self.pool).await
    }

    async fn upsert_file(&self, file: &FileRecord, repo_url: &str) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO files (repo_id, branch, path, language, size, last_modified, repo_url)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             ON CONFLICT (repo_id, branch, path)
             DO UPDATE SET language = EXCLUDED.language, size = EXCLUDED.size,
                 last_modified = EXCLUDED.last_modified, repo_url = EXCLUDED.repo_url",
        )
        .bind(&file.repo_id)
        .bind(&file.branch)
        .bind(&file.path)
        .bind(&file.language)
        .bind(file.size as i64)
        .bind(file.last_modified)
        .bind(repo_url)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_file_record(&self, repo_id: &str, branch: &str, path: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM files WHERE repo_id = $1 AND branch = $2 AND path = $3")
            .bind(repo_id)
            .bind(branch)
            .bind(path)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_chunks_for_file(&self, repo_id: &str, branch: &str, path: &str) -> Result<Vec<Uuid>, StoreError> {
        let rows = sqlx::query("DELETE FROM chunks WHERE repo_id = $1 AND branch = $2 AND file_path = $3 RETURNING id")
            .bind(repo_id)
            .bind(branch)
            .bind(path)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(|r| r.try_get::<Uuid, _>("id").map_err(StoreError::from)).collect()
    }

    async fn insert_chunks(&self, chunks: &[Chunk]) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        for chunk in chunks {
            let embedding = Vector::from(chunk.embedding.clone());
            sqlx::query(
                "INSERT INTO chunks (id, file_path, repo_id, branch, language, chunk_type, symbol_name,
                    symbol_names, imports, exports, line_start, line_end, content, content_hash,
                    embedding, full_text_index)
                 VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16)
                 ON CONFLICT (id) DO UPDATE SET
                    content = EXCLUDED.content, content_hash = EXCLUDED.content_hash,
                    embedding = EXCLUDED.embedding, full_text_index = EXCLUDED.full_text_index,
                    symbol_names = EXCLUDED.symbol_names, imports = EXCLUDED.imports, exports = EXCLUDED.exports",
            )
            .bind(chunk.id)
            .bind(&chunk.file_path)
            .bind(&chunk.repo_id)
            .bind(&chunk.branch)
            .bind(&chunk.language)
            .bind(chunk_type_str(&chunk.chunk_type))
            .bind(&chunk.symbol_name)
            .bind(&chunk.symbol_names)
            .bind(&chunk.imports)
            .bind(&chunk.exports)
            .bind(chunk.line_start as i32)
            .bind(chunk.line_end as i32)
            .bind(&chunk.content)
            .bind(&chunk.content_hash)
            .bind(embedding)
            .bind(&chunk.full_text_index)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn chunks_for_repo(&self, repo_id: &str, branch: &str) -> Result<Vec<Chunk>, StoreError> {
        let rows = sqlx::query("SELECT * FROM chunks WHERE repo_id = $1 AND branch = $2")
            .bind(repo_id)
            .bind(branch)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_chunk).collect()
    }

    async fn chunk_by_id(&self, id: Uuid) -> Result<Option<Chunk>, StoreError> {
        let row = sqlx::query("SELECT * FROM chunks WHERE id = $1").bind(id).fetch_optional(&self.pool).await?;
        row.as_ref().map(row_to_chunk).transpose()
    }

    async fn replace_relationships(&self, repo_id: &str, branch: &str, relationships: &[Relationship]) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "DELETE FROM relationships WHERE source_chunk_id IN (SELECT id FROM chunks WHERE repo_id = $1 AND branch = $2)",
        )
        .bind(repo_id)
        .bind(branch)
        .execute(&mut *tx)
        .await?;
        for rel in relationships {
            sqlx::query(
                "INSERT INTO relationships (source_chunk_id, target_chunk_id, relationship_type, metadata)
                 VALUES ($1, $2, $3, $4)
                 ON CONFLICT (source_chunk_id, target_chunk_id, relationship_type) DO UPDATE SET metadata = EXCLUDED.metadata",
            )
            .bind(rel.source_chunk_id)
            .bind(rel.target_chunk_id)
            .bind(relationship_type_str(&rel.relationship_type))
            .bind(&rel.metadata)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn relationships_from(&self, chunk_id: Uuid) -> Result<Vec<Relationship>, StoreError> {
        let rows = sqlx::query("SELECT * FROM relationships WHERE source_chunk_id = $1")
            .bind(chunk_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .iter()
            .map(|r| Relationship {
                source_chunk_id: r.get("source_chunk_id"),
                target_chunk_id: r.get("target_chunk_id"),
                relationship_type: relationship_type_from_str(r.get::<String, _>("relationship_type").as_str()),
                metadata: r.get("metadata"),
            })
            .collect())
    }

    async fn relationships_to(&self, chunk_id: Uuid) -> Result<Vec<Relationship>, StoreError> {
        let rows = sqlx::query("SELECT * FROM relationships WHERE target_chunk_id = $1")
            .bind(chunk_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .iter()
            .map(|r| Relationship {
                source_chunk_id: r.get("source_chunk_id"),
                target_chunk_id: r.get("target_chunk_id"),
                relationship_type: relationship_type_from_str(r.get::<String, _>("relationship_type").as_str()),
                metadata: r.get("metadata"),
            })
            .collect())
    }

    async fn delete_file_imports_touching(&self, repo_id: &str, branch: &str, path: &str) -> Result<(), StoreError> {
        sqlx::query(
            "DELETE FROM file_imports WHERE repo_id = $1 AND branch = $2 AND (source_file = $3 OR target_file = $3)",
        )
        .bind(repo_id)
        .bind(branch)
        .bind(path)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn replace_file_imports(&self, repo_id: &str, branch: &str, imports: &[FileImport]) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM file_imports WHERE repo_id = $1 AND branch = $2")
            .bind(repo_id)
            .bind(branch)
            .execute(&mut *tx)
            .await?;
        for imp in imports {
            sqlx::query(
                "INSERT INTO file_imports (source_file, target_file, repo_id, branch, import_type, imported_symbols)
                 VALUES ($1,$2,$3,$4,$5,$6)
                 ON CONFLICT (source_file, target_file, repo_id, branch) DO UPDATE SET
                    import_type = EXCLUDED.import_type, imported_symbols = EXCLUDED.imported_symbols",
            )
            .bind(&imp.source_file)
            .bind(&imp.target_file)
            .bind(&imp.repo_id)
            .bind(&imp.branch)
            .bind(import_type_str(&imp.import_type))
            .bind(&imp.imported_symbols)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn all_file_imports(&self, repo_id: &str, branch: &str) -> Result<Vec<FileImport>, StoreError> {
        let rows = sqlx::query("SELECT * FROM file_imports WHERE repo_id = $1 AND branch = $2")
            .bind(repo_id)
            .bind(branch)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .iter()
            .map(|r| FileImport {
                source_file: r.get("source_file"),
                target_file: r.get("target_file"),
                repo_id: r.get("repo_id"),
                branch: r.get("branch"),
                import_type: import_type_from_str(r.get::<String, _>("import_type").as_str()),
                imported_symbols: r.get::<Vec<String>, _>("imported_symbols"),
            })
            .collect())
    }

    async fn cache_lookup(&self, hashes: &[String], model: &str) -> Result<HashMap<String, Vec<f32>>, StoreError> {
        if hashes.is_empty() {
            return Ok(HashMap::new());
        }
        let rows = sqlx::query(
            "UPDATE embedding_cache SET last_used_at = now(), hit_count = hit_count + 1
             WHERE content_hash = ANY($1) AND model_name = $2
             RETURNING content_hash, embedding",
        )
        .bind(hashes)
        .bind(model)
        .fetch_all(&self.pool)
        .await?;
        let mut out = HashMap::new();
        for row in rows {
            let hash: String = row.try_get("content_hash")?;
            let embedding: Vector = row.try_get("embedding")?;
            out.insert(hash, embedding.to_vec());
        }
        Ok(out)
    }

    async fn cache_store(&self, entries: &[EmbeddingCacheEntry]) -> Result<(), StoreError> {
        for entry in entries {
            let embedding = Vector::from(entry.embedding.clone());
            let _ = sqlx::query(
                "INSERT INTO embedding_cache (content_hash, model_name, embedding, embedding_dim)
                 VALUES ($1, $2, $3, $4)
                 ON CONFLICT (content_hash, model_name) DO UPDATE SET
                    last_used_at = now(), hit_count = embedding_cache.hit_count + 1",
            )
            .bind(&entry.content_hash)
            .bind(&entry.model_name)
            .bind(embedding)
            .bind(entry.embedding_dim)
            .execute(&self.pool)
            .await;
        }
        Ok(())
    }

    async fn semantic_search(
        &self,
        embedding: &[f32],
        repo_id: Option<&str>,
        branch: Option<&str>,
        limit: usize,
    ) -> Result<Vec<(Chunk, f32)>, StoreError> {
        let vector = Vector::from(embedding.to_vec());
        let rows = sqlx::query(
            "SELECT *, 1 - (embedding <=> $1) AS score FROM chunks
             WHERE ($2::text IS NULL OR repo_id = $2) AND ($3::text IS NULL OR branch = $3)
             ORDER BY embedding <=> $1 LIMIT $4",
        )
        .bind(vector)
        .bind(repo_id)
        .bind(branch)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        rows.iter()
            .map(|r| Ok((row_to_chunk(r)?, r.try_get::<f64, _>("score")? as f32)))
            .collect()
    }

    async fn keyword_search(
        &self,
        tsquery_expr: &str,
        repo_id: Option<&str>,
        branch: Option<&str>,
        limit: usize,
    ) -> Result<Vec<(Chunk, f32)>, StoreError> {
        let rows = sqlx::query(
            "SELECT *, ts_rank_cd(full_text_tsv, to_tsquery('english', $1), 4) AS score FROM chunks
             WHERE full_text_tsv @@ to_tsquery('english', $1)
               AND ($2::text IS NULL OR repo_id = $2) AND ($3::text IS NULL OR branch = $3)
             ORDER BY score DESC LIMIT $4",
        )
        .bind(tsquery_expr)
        .bind(repo_id)
        .bind(branch)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        rows.iter()
            .map(|r| Ok((row_to_chunk(r)?, r.try_get::<f32, _>("score")?)))
            .collect()
    }

    async fn definitions(&self, symbol: &str, repo_id: Option<&str>, branch: Option<&str>) -> Result<Vec<Chunk>, StoreError> {
        let rows = sqlx::query(
            "SELECT * FROM chunks WHERE $1 = ANY(symbol_names)
               AND ($2::text IS NULL OR repo_id = $2) AND ($3::text IS NULL OR branch = $3)",
        )
        .bind(symbol)
        .bind(repo_id)
        .bind(branch)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_chunk).collect()
    }

    async fn stats(&self, repo_id: Option<&str>, branch: Option<&str>) -> Result<StatsSummary, StoreError> {
        let row = sqlx::query(
            "SELECT
                (SELECT COUNT(*) FROM files WHERE ($1::text IS NULL OR repo_id = $1) AND ($2::text IS NULL OR branch = $2)) AS file_count,
                (SELECT COUNT(*) FROM chunks WHERE ($1::text IS NULL OR repo_id = $1) AND ($2::text IS NULL OR branch = $2)) AS chunk_count,
                (SELECT COUNT(*) FROM relationships r JOIN chunks c ON c.id = r.source_chunk_id
                    WHERE ($1::text IS NULL OR c.repo_id = $1) AND ($2::text IS NULL OR c.branch = $2)) AS relationship_count",
        )
        .bind(repo_id)
        .bind(branch)
        .fetch_one(&self.pool)
        .await?;
        Ok(StatsSummary {
            repo_id: repo_id.map(|s| s.to_string()),
            branch: branch.map(|s| s.to_string()),
            file_count: row.try_get("file_count")?,
            chunk_count: row.try_get("chunk_count")?,
            relationship_count: row.try_get("relationship_count")?,
        })
    }

    async fn list_repos(&self) -> Result<Vec<RepoSummary>, StoreError> {
        let rows = sqlx::query(
            "SELECT repo_id, repo_url, array_agg(DISTINCT branch) AS branches, COUNT(*) AS chunk_count
             FROM files f JOIN chunks c USING (repo_id, branch)
             GROUP BY repo_id, repo_url",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .iter()
            .map(|r| RepoSummary {
                repo_id: r.get("repo_id"),
                repo_url: r.get("repo_url"),
                branches: r.get::<Vec<String>, _>("branches"),
                chunk_count: r.get("chunk_count"),
            })
            .collect())
    }

    async fn delete_repo(&self, repo_url: &str) -> Result<i64, StoreError> {
        let mut tx = self.pool.begin().await?;
        let repo_ids: Vec<String> = sqlx::query("SELECT DISTINCT repo_id FROM files WHERE repo_url = $1")
            .bind(repo_url)
            .fetch_all(&mut *tx)
            .await?
            .iter()
            .map(|r| r.get("repo_id"))
            .collect();

        let mut deleted = 0i64;
        for repo_id in &repo_ids {
            let result = sqlx::query("DELETE FROM chunks WHERE repo_id = $1").bind(repo_id).execute(&mut *tx).await?;
            deleted += result.rows_affected() as i64;
            sqlx::query("DELETE FROM file_imports WHERE repo_id = $1").bind(repo_id).execute(&mut *tx).await?;
            sqlx::query("DELETE FROM files WHERE repo_id = $1").bind(repo_id).execute(&mut *tx).await?;
        }
        tx.commit().await?;
        Ok(deleted)
    }
}
