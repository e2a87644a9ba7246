//! 表存储能力协议
//!
//! 把具体的云表存储客户端抽象为两个能力：
//! - `TableClient`：单表上的按地址读取、带前置条件的写入与删除；
//! - `TableServiceClient`：获取表客户端与幂等建表。
//!
//! 前置条件语义（所有实现必须一致）：
//! - `expected = Some(etag)`：仅当行存在且当前 ETag 等于 `etag` 时生效，否则 `VersionConflict`；
//! - `expected = None`：无条件写入/删除；
//! - 删除不存在的行总是返回 `DeleteOutcome::AlreadyAbsent`，不论是否携带 ETag。
//!
use crate::{
    error::StorageResult,
    key::RowAddress,
    table::{DeleteOutcome, StoredRecord, TableCreation},
    value_object::{ETag, TableName},
};
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait TableClient: Send + Sync {
    fn table_name(&self) -> &TableName;

    async fn get_row_if_exists(&self, address: &RowAddress) -> StorageResult<Option<StoredRecord>>;

    /// 写入整行（替换语义），返回存储分配的新 ETag
    async fn upsert_row(
        &self,
        address: &RowAddress,
        data: String,
        expected: Option<&ETag>,
    ) -> StorageResult<ETag>;

    async fn delete_row(
        &self,
        address: &RowAddress,
        expected: Option<&ETag>,
    ) -> StorageResult<DeleteOutcome>;
}

#[async_trait]
impl<T> TableClient for Arc<T>
where
    T: TableClient + ?Sized,
{
    fn table_name(&self) -> &TableName {
        (**self).table_name()
    }

    async fn get_row_if_exists(&self, address: &RowAddress) -> StorageResult<Option<StoredRecord>> {
        (**self).get_row_if_exists(address).await
    }

    async fn upsert_row(
        &self,
        address: &RowAddress,
        data: String,
        expected: Option<&ETag>,
    ) -> StorageResult<ETag> {
        (**self).upsert_row(address, data, expected).await
    }

    async fn delete_row(
        &self,
        address: &RowAddress,
        expected: Option<&ETag>,
    ) -> StorageResult<DeleteOutcome> {
        (**self).delete_row(address, expected).await
    }
}

#[async_trait]
pub trait TableServiceClient: Send + Sync {
    type Table: TableClient + 'static;

    /// 获取指定表的客户端（不触发网络调用）
    fn table_client(&self, table: &TableName) -> Self::Table;

    /// 幂等建表
    async fn create_table_if_not_exists(&self, table: &TableName) -> StorageResult<TableCreation>;
}

#[async_trait]
impl<T> TableServiceClient for Arc<T>
where
    T: TableServiceClient + ?Sized,
{
    type Table = T::Table;

    fn table_client(&self, table: &TableName) -> Self::Table {
        (**self).table_client(table)
    }

    async fn create_table_if_not_exists(&self, table: &TableName) -> StorageResult<TableCreation> {
        (**self).create_table_if_not_exists(table).await
    }
}
