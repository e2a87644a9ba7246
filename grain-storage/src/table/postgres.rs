//! 基于 Postgres 的表存储实现（feature = "infra-sqlx"）
//!
//! 每个逻辑表对应一张物理表：
//!
//! ```sql
//! CREATE TABLE "GrainState" (
//!     partition_key TEXT NOT NULL,
//!     row_key       TEXT NOT NULL,
//!     data          TEXT NOT NULL,
//!     etag          TEXT NOT NULL,
//!     updated_at    TIMESTAMPTZ NOT NULL,
//!     PRIMARY KEY (partition_key, row_key)
//! );
//! ```
//!
//! 条件写入与条件删除都是单条带 `etag = $n` 谓词的语句，由数据库保证比较与写入的原子性。
//! 条件删除在同一条语句里同时返回删除行数与行是否存在，用以区分冲突与“本就不存在”。
//! 表名已通过 `TableName` 校验（仅字母数字），可安全拼接进 SQL。
//!
use crate::{
    config::TableStorageOptions,
    error::{StorageError, StorageResult},
    key::RowAddress,
    table::{DeleteOutcome, StoredRecord, TableClient, TableCreation, TableServiceClient},
    value_object::{ETag, TableName},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row;

#[derive(Clone)]
pub struct PgTableService {
    pool: PgPool,
}

impl PgTableService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 按连接串建立连接池
    pub async fn connect(connection_string: &str) -> StorageResult<Self> {
        let pool = PgPoolOptions::new().connect(connection_string).await?;
        Ok(Self { pool })
    }

    /// 使用配置中的连接串；未配置时返回 `StorageError::Config`
    pub async fn from_options(options: &TableStorageOptions) -> StorageResult<Self> {
        let connection_string =
            options
                .connection_string
                .as_deref()
                .ok_or_else(|| StorageError::Config {
                    reason: "connection_string is required by the postgres backend".to_string(),
                })?;
        Self::connect(connection_string).await
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl TableServiceClient for PgTableService {
    type Table = PgTableClient;

    fn table_client(&self, table: &TableName) -> Self::Table {
        PgTableClient {
            pool: self.pool.clone(),
            table: table.clone(),
        }
    }

    async fn create_table_if_not_exists(&self, table: &TableName) -> StorageResult<TableCreation> {
        let existing: Option<String> = sqlx::query_scalar("SELECT to_regclass($1)::text")
            .bind(format!("\"{}\"", table))
            .fetch_one(&self.pool)
            .await?;
        if existing.is_some() {
            return Ok(TableCreation::AlreadyExists);
        }

        let ddl = format!(
            r#"CREATE TABLE IF NOT EXISTS "{table}" (
                partition_key TEXT NOT NULL,
                row_key       TEXT NOT NULL,
                data          TEXT NOT NULL,
                etag          TEXT NOT NULL,
                updated_at    TIMESTAMPTZ NOT NULL,
                PRIMARY KEY (partition_key, row_key)
            )"#
        );
        sqlx::query(&ddl).execute(&self.pool).await?;
        Ok(TableCreation::Created)
    }
}

#[derive(Clone)]
pub struct PgTableClient {
    pool: PgPool,
    table: TableName,
}

impl PgTableClient {
    fn conflict(address: &RowAddress, expected: &ETag) -> StorageError {
        StorageError::VersionConflict {
            partition_key: address.partition_key().to_string(),
            row_key: address.row_key().to_string(),
            expected: expected.to_string(),
        }
    }
}

#[async_trait]
impl TableClient for PgTableClient {
    fn table_name(&self) -> &TableName {
        &self.table
    }

    async fn get_row_if_exists(&self, address: &RowAddress) -> StorageResult<Option<StoredRecord>> {
        let sql = format!(
            r#"SELECT data, etag, updated_at FROM "{}" WHERE partition_key = $1 AND row_key = $2"#,
            self.table
        );
        let Some(row) = sqlx::query(&sql)
            .bind(address.partition_key())
            .bind(address.row_key())
            .fetch_optional(&self.pool)
            .await?
        else {
            return Ok(None);
        };

        let data: String = row.try_get("data")?;
        let etag: String = row.try_get("etag")?;
        let updated_at: DateTime<Utc> = row.try_get("updated_at")?;

        Ok(Some(
            StoredRecord::builder()
                .partition_key(address.partition_key())
                .row_key(address.row_key())
                .data(data)
                .etag(ETag::new(etag))
                .timestamp(updated_at)
                .build(),
        ))
    }

    async fn upsert_row(
        &self,
        address: &RowAddress,
        data: String,
        expected: Option<&ETag>,
    ) -> StorageResult<ETag> {
        let etag = ETag::generate();

        match expected {
            None => {
                let sql = format!(
                    r#"INSERT INTO "{}" (partition_key, row_key, data, etag, updated_at)
                       VALUES ($1, $2, $3, $4, $5)
                       ON CONFLICT (partition_key, row_key)
                       DO UPDATE SET data = EXCLUDED.data,
                                     etag = EXCLUDED.etag,
                                     updated_at = EXCLUDED.updated_at"#,
                    self.table
                );
                sqlx::query(&sql)
                    .bind(address.partition_key())
                    .bind(address.row_key())
                    .bind(data.as_str())
                    .bind(etag.as_str())
                    .bind(Utc::now())
                    .execute(&self.pool)
                    .await?;
            }
            Some(expected) => {
                // 行不存在与 ETag 不匹配都视为前置条件失败
                let sql = format!(
                    r#"UPDATE "{}" SET data = $3, etag = $4, updated_at = $5
                       WHERE partition_key = $1 AND row_key = $2 AND etag = $6"#,
                    self.table
                );
                let result = sqlx::query(&sql)
                    .bind(address.partition_key())
                    .bind(address.row_key())
                    .bind(data.as_str())
                    .bind(etag.as_str())
                    .bind(Utc::now())
                    .bind(expected.as_str())
                    .execute(&self.pool)
                    .await?;
                if result.rows_affected() == 0 {
                    return Err(Self::conflict(address, expected));
                }
            }
        }

        Ok(etag)
    }

    async fn delete_row(
        &self,
        address: &RowAddress,
        expected: Option<&ETag>,
    ) -> StorageResult<DeleteOutcome> {
        let affected = match expected {
            None => {
                let sql = format!(
                    r#"DELETE FROM "{}" WHERE partition_key = $1 AND row_key = $2"#,
                    self.table
                );
                sqlx::query(&sql)
                    .bind(address.partition_key())
                    .bind(address.row_key())
                    .execute(&self.pool)
                    .await?
                    .rows_affected()
            }
            Some(expected) => {
                // CTE 与外层查询共享同一快照：present 反映删除前行是否存在
                let sql = format!(
                    r#"WITH deleted AS (
                           DELETE FROM "{table}"
                           WHERE partition_key = $1 AND row_key = $2 AND etag = $3
                           RETURNING 1
                       )
                       SELECT (SELECT count(*) FROM deleted) AS deleted,
                              EXISTS (
                                  SELECT 1 FROM "{table}" WHERE partition_key = $1 AND row_key = $2
                              ) AS present"#,
                    table = self.table
                );
                let row = sqlx::query(&sql)
                    .bind(address.partition_key())
                    .bind(address.row_key())
                    .bind(expected.as_str())
                    .fetch_one(&self.pool)
                    .await?;
                let deleted: i64 = row.try_get("deleted")?;
                let present: bool = row.try_get("present")?;
                if deleted == 0 && present {
                    return Err(Self::conflict(address, expected));
                }
                deleted as u64
            }
        };

        Ok(if affected == 0 {
            DeleteOutcome::AlreadyAbsent
        } else {
            DeleteOutcome::Deleted
        })
    }
}
