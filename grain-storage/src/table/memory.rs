//! 基于内存的表存储实现
//!
//! 适用于测试与单机开发：所有表保存在进程内，进程退出即丢失。
//! 单把互斥锁保证“比较 ETag 再写入”的原子性，两个携带同一 ETag 的并发写入恰好只有一个成功。
//! `set_available(false)` 可模拟存储不可用，用于故障路径测试。
//!
use crate::{
    error::{StorageError, StorageResult},
    key::RowAddress,
    table::{DeleteOutcome, StoredRecord, TableClient, TableCreation, TableServiceClient},
    value_object::{ETag, TableName},
};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

type Rows = BTreeMap<RowAddress, StoredRecord>;
type Tables = HashMap<TableName, Rows>;

struct Shared {
    tables: Mutex<Tables>,
    available: AtomicBool,
}

impl Shared {
    fn lock(&self) -> StorageResult<MutexGuard<'_, Tables>> {
        if !self.available.load(Ordering::SeqCst) {
            return Err(StorageError::unavailable("in-memory table service is offline"));
        }
        self.tables
            .lock()
            .map_err(|_| StorageError::unavailable("in-memory table lock poisoned"))
    }
}

/// 内存表服务：`Clone` 后共享同一份数据
#[derive(Clone)]
pub struct InMemoryTableService {
    shared: Arc<Shared>,
}

impl Default for InMemoryTableService {
    fn default() -> Self {
        Self {
            shared: Arc::new(Shared {
                tables: Mutex::new(HashMap::new()),
                available: AtomicBool::new(true),
            }),
        }
    }
}

impl InMemoryTableService {
    pub fn new() -> Self {
        Self::default()
    }

    /// 切换服务可用性；不可用时所有调用返回 `StoreUnavailable`
    pub fn set_available(&self, available: bool) {
        self.shared.available.store(available, Ordering::SeqCst);
    }

    pub fn table_exists(&self, table: &TableName) -> bool {
        self.shared
            .tables
            .lock()
            .map(|t| t.contains_key(table))
            .unwrap_or(false)
    }

    /// 指定表的行数（表不存在时为 0）
    pub fn row_count(&self, table: &TableName) -> usize {
        self.shared
            .tables
            .lock()
            .map(|t| t.get(table).map(BTreeMap::len).unwrap_or(0))
            .unwrap_or(0)
    }
}

#[async_trait]
impl TableServiceClient for InMemoryTableService {
    type Table = InMemoryTableClient;

    fn table_client(&self, table: &TableName) -> Self::Table {
        InMemoryTableClient {
            table: table.clone(),
            shared: Arc::clone(&self.shared),
        }
    }

    async fn create_table_if_not_exists(&self, table: &TableName) -> StorageResult<TableCreation> {
        let mut tables = self.shared.lock()?;
        if tables.contains_key(table) {
            return Ok(TableCreation::AlreadyExists);
        }
        tables.insert(table.clone(), Rows::new());
        Ok(TableCreation::Created)
    }
}

/// 内存表客户端
#[derive(Clone)]
pub struct InMemoryTableClient {
    table: TableName,
    shared: Arc<Shared>,
}

impl InMemoryTableClient {
    fn with_rows<R>(&self, f: impl FnOnce(&mut Rows) -> StorageResult<R>) -> StorageResult<R> {
        let mut tables = self.shared.lock()?;
        let rows = tables.get_mut(&self.table).ok_or_else(|| {
            StorageError::unavailable(format!("table {} does not exist", self.table))
        })?;
        f(rows)
    }

    fn conflict(address: &RowAddress, expected: &ETag) -> StorageError {
        StorageError::VersionConflict {
            partition_key: address.partition_key().to_string(),
            row_key: address.row_key().to_string(),
            expected: expected.to_string(),
        }
    }
}

#[async_trait]
impl TableClient for InMemoryTableClient {
    fn table_name(&self) -> &TableName {
        &self.table
    }

    async fn get_row_if_exists(&self, address: &RowAddress) -> StorageResult<Option<StoredRecord>> {
        self.with_rows(|rows| Ok(rows.get(address).cloned()))
    }

    async fn upsert_row(
        &self,
        address: &RowAddress,
        data: String,
        expected: Option<&ETag>,
    ) -> StorageResult<ETag> {
        self.with_rows(|rows| {
            if let Some(expected) = expected {
                match rows.get(address) {
                    Some(current) if current.etag() == expected => {}
                    _ => return Err(Self::conflict(address, expected)),
                }
            }

            let etag = ETag::generate();
            let record = StoredRecord::builder()
                .partition_key(address.partition_key())
                .row_key(address.row_key())
                .data(data)
                .etag(etag.clone())
                .timestamp(Utc::now())
                .build();
            rows.insert(address.clone(), record);
            Ok(etag)
        })
    }

    async fn delete_row(
        &self,
        address: &RowAddress,
        expected: Option<&ETag>,
    ) -> StorageResult<DeleteOutcome> {
        self.with_rows(|rows| {
            let Some(current) = rows.get(address) else {
                return Ok(DeleteOutcome::AlreadyAbsent);
            };
            if let Some(expected) = expected {
                if current.etag() != expected {
                    return Err(Self::conflict(address, expected));
                }
            }
            rows.remove(address);
            Ok(DeleteOutcome::Deleted)
        })
    }
}
