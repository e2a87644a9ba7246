//! 实体状态存储（GrainStorage）
//!
//! 读/写/清除协议：
//! - `read_state`：按推导出的行地址读取；无记录时回到默认状态，不视为错误；
//! - `write_state`：序列化后写入，携带句柄中的 ETag 作为前置条件（`None` 时无条件写入）；
//! - `clear_state`：按 ETag 条件删除；行本就不存在时视为成功。
//!
//! 每个操作恰好一次存储调用，不做缓存与重试。句柄只在存储调用成功返回后一次性更新，
//! 因此失败或中途被丢弃的 future 都不会留下部分修改。
//!
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::{
    config::TableStorageOptions,
    error::{StorageError, StorageResult},
    grain_state::GrainState,
    key::{RowAddress, derive_key},
    provision::ProvisionedTable,
    serializer::{JsonSerializer, StateSerializer},
    table::TableClient,
    value_object::{EntityIdentity, StateSlotName, TableName},
};

/// 实体状态存储抽象
#[async_trait]
pub trait GrainStorage: Send + Sync {
    /// 读取状态并覆盖句柄
    async fn read_state<T>(
        &self,
        slot: &StateSlotName,
        grain: &EntityIdentity,
        handle: &mut GrainState<T>,
    ) -> StorageResult<()>
    where
        T: DeserializeOwned + Default + Send;

    /// 持久化句柄中的状态
    async fn write_state<T>(
        &self,
        slot: &StateSlotName,
        grain: &EntityIdentity,
        handle: &mut GrainState<T>,
    ) -> StorageResult<()>
    where
        T: Serialize + Send;

    /// 删除持久化记录并把句柄重置为默认状态
    async fn clear_state<T>(
        &self,
        slot: &StateSlotName,
        grain: &EntityIdentity,
        handle: &mut GrainState<T>,
    ) -> StorageResult<()>
    where
        T: Default + Send;
}

#[async_trait]
impl<G> GrainStorage for Arc<G>
where
    G: GrainStorage + ?Sized,
{
    async fn read_state<T>(
        &self,
        slot: &StateSlotName,
        grain: &EntityIdentity,
        handle: &mut GrainState<T>,
    ) -> StorageResult<()>
    where
        T: DeserializeOwned + Default + Send,
    {
        (**self).read_state(slot, grain, handle).await
    }

    async fn write_state<T>(
        &self,
        slot: &StateSlotName,
        grain: &EntityIdentity,
        handle: &mut GrainState<T>,
    ) -> StorageResult<()>
    where
        T: Serialize + Send,
    {
        (**self).write_state(slot, grain, handle).await
    }

    async fn clear_state<T>(
        &self,
        slot: &StateSlotName,
        grain: &EntityIdentity,
        handle: &mut GrainState<T>,
    ) -> StorageResult<()>
    where
        T: Default + Send,
    {
        (**self).clear_state(slot, grain, handle).await
    }
}

/// 基于表存储的 `GrainStorage` 实现
///
/// 只能由 [`ProvisionedTable`] 构建，即建表必须先于任何读写完成。
pub struct TableGrainStorage<C, S = JsonSerializer> {
    name: String,
    table: ProvisionedTable<C>,
    serializer: S,
    max_payload_bytes: usize,
}

impl<C: TableClient> TableGrainStorage<C> {
    /// 使用默认序列化器与默认负载上限
    pub fn new(name: impl Into<String>, table: ProvisionedTable<C>) -> Self {
        Self::with_options(name, table, &TableStorageOptions::default())
    }

    pub fn with_options(
        name: impl Into<String>,
        table: ProvisionedTable<C>,
        options: &TableStorageOptions,
    ) -> Self {
        Self {
            name: name.into(),
            table,
            serializer: JsonSerializer,
            max_payload_bytes: options.max_payload_bytes,
        }
    }
}

impl<C, S> TableGrainStorage<C, S>
where
    C: TableClient,
    S: StateSerializer,
{
    /// 替换序列化器
    pub fn with_serializer<S2: StateSerializer>(self, serializer: S2) -> TableGrainStorage<C, S2> {
        TableGrainStorage {
            name: self.name,
            table: self.table,
            serializer,
            max_payload_bytes: self.max_payload_bytes,
        }
    }

    /// 负载上限（字节），0 表示不限制
    pub fn with_max_payload_bytes(mut self, max_payload_bytes: usize) -> Self {
        self.max_payload_bytes = max_payload_bytes;
        self
    }

    /// 存储提供者名称
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn table_name(&self) -> &TableName {
        self.table.table_name()
    }

    pub fn max_payload_bytes(&self) -> usize {
        self.max_payload_bytes
    }

    fn encode<T: Serialize>(&self, state: &T) -> StorageResult<String> {
        let data = self.serializer.serialize(state)?;
        if self.max_payload_bytes > 0 && data.len() > self.max_payload_bytes {
            return Err(StorageError::PayloadTooLarge {
                size: data.len(),
                max: self.max_payload_bytes,
            });
        }
        Ok(data)
    }

    fn log_failure(&self, op: &'static str, address: &RowAddress, err: &StorageError) {
        warn!(
            provider = %self.name,
            partition_key = address.partition_key(),
            row_key = address.row_key(),
            error = %err,
            "{op} failed"
        );
    }
}

#[async_trait]
impl<C, S> GrainStorage for TableGrainStorage<C, S>
where
    C: TableClient,
    S: StateSerializer,
{
    async fn read_state<T>(
        &self,
        slot: &StateSlotName,
        grain: &EntityIdentity,
        handle: &mut GrainState<T>,
    ) -> StorageResult<()>
    where
        T: DeserializeOwned + Default + Send,
    {
        let address = derive_key(grain, slot)?;
        let record = self
            .table
            .client()
            .get_row_if_exists(&address)
            .await
            .inspect_err(|e| self.log_failure("read_state", &address, e))?;

        let Some(record) = record else {
            debug!(
                provider = %self.name,
                grain = %grain,
                slot = %slot,
                partition_key = address.partition_key(),
                row_key = address.row_key(),
                "no stored record, using default state"
            );
            handle.reset();
            return Ok(());
        };

        let (data, etag) = record.into_payload();
        let state = self
            .serializer
            .deserialize::<T>(&data)
            .inspect_err(|e| self.log_failure("read_state", &address, e))?;

        debug!(
            provider = %self.name,
            grain = %grain,
            slot = %slot,
            partition_key = address.partition_key(),
            row_key = address.row_key(),
            etag = %etag,
            "state read"
        );
        handle.set_loaded(state, etag);
        Ok(())
    }

    async fn write_state<T>(
        &self,
        slot: &StateSlotName,
        grain: &EntityIdentity,
        handle: &mut GrainState<T>,
    ) -> StorageResult<()>
    where
        T: Serialize + Send,
    {
        let address = derive_key(grain, slot)?;
        let data = self.encode(&handle.state)?;

        let etag = self
            .table
            .client()
            .upsert_row(&address, data, handle.precondition())
            .await
            .inspect_err(|e| self.log_failure("write_state", &address, e))?;

        debug!(
            provider = %self.name,
            grain = %grain,
            slot = %slot,
            partition_key = address.partition_key(),
            row_key = address.row_key(),
            etag = %etag,
            "state written"
        );
        handle.set_written(etag);
        Ok(())
    }

    async fn clear_state<T>(
        &self,
        slot: &StateSlotName,
        grain: &EntityIdentity,
        handle: &mut GrainState<T>,
    ) -> StorageResult<()>
    where
        T: Default + Send,
    {
        let address = derive_key(grain, slot)?;
        let outcome = self
            .table
            .client()
            .delete_row(&address, handle.precondition())
            .await
            .inspect_err(|e| self.log_failure("clear_state", &address, e))?;

        debug!(
            provider = %self.name,
            grain = %grain,
            slot = %slot,
            partition_key = address.partition_key(),
            row_key = address.row_key(),
            ?outcome,
            "state cleared"
        );
        handle.reset();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provision::TableProvisioner;
    use crate::table::{DeleteOutcome, InMemoryTableService, StoredRecord, TableServiceClient};
    use crate::value_object::ETag;
    use serde::Deserialize;
    use std::time::Duration;

    #[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
    struct Counter {
        value: i32,
    }

    fn grain() -> EntityIdentity {
        EntityIdentity::new("2024-02-07_SomeCounter")
    }

    fn slot() -> StateSlotName {
        StateSlotName::new("state")
    }

    async fn storage() -> (
        InMemoryTableService,
        TableGrainStorage<<InMemoryTableService as TableServiceClient>::Table>,
    ) {
        let service = InMemoryTableService::new();
        let table = TableProvisioner::new(service.clone(), TableName::new("GrainState"))
            .ensure_table_exists()
            .await
            .unwrap();
        (service, TableGrainStorage::new("Default", table))
    }

    #[tokio::test]
    async fn test_missing_record_loads_default() {
        let (_service, storage) = storage().await;
        let mut handle = GrainState::with_state(Counter { value: 42 });

        storage.read_state(&slot(), &grain(), &mut handle).await.unwrap();

        assert_eq!(handle.state, Counter::default());
        assert!(handle.etag.is_none());
        assert!(!handle.record_exists);
    }

    #[tokio::test]
    async fn test_write_then_read_round_trip() {
        let (_service, storage) = storage().await;
        let mut writer = GrainState::with_state(Counter { value: 5 });
        storage.write_state(&slot(), &grain(), &mut writer).await.unwrap();
        assert!(writer.record_exists);
        assert!(writer.etag.is_some());

        let mut reader = GrainState::<Counter>::default();
        storage.read_state(&slot(), &grain(), &mut reader).await.unwrap();

        assert_eq!(reader.state, Counter { value: 5 });
        assert_eq!(reader.etag, writer.etag);
        assert!(reader.record_exists);
    }

    #[tokio::test]
    async fn test_each_write_gets_new_etag() {
        let (_service, storage) = storage().await;
        let mut handle = GrainState::with_state(Counter { value: 1 });
        storage.write_state(&slot(), &grain(), &mut handle).await.unwrap();
        let first = handle.etag.clone();

        handle.state.value = 2;
        storage.write_state(&slot(), &grain(), &mut handle).await.unwrap();

        assert_ne!(handle.etag, first);
    }

    #[tokio::test]
    async fn test_racing_saves_exactly_one_wins() {
        let (_service, storage) = storage().await;
        let mut seed = GrainState::with_state(Counter { value: 0 });
        storage.write_state(&slot(), &grain(), &mut seed).await.unwrap();

        let mut a = seed.clone();
        let mut b = seed.clone();
        a.state.value = 1;
        b.state.value = 2;

        let (slot, grain) = (slot(), grain());
        let (ra, rb) = tokio::join!(
            storage.write_state(&slot, &grain, &mut a),
            storage.write_state(&slot, &grain, &mut b),
        );

        let conflicts = [&ra, &rb]
            .iter()
            .filter(|r| matches!(r, Err(e) if e.is_version_conflict()))
            .count();
        assert_eq!(conflicts, 1);
        assert_eq!(ra.is_ok() as u8 + rb.is_ok() as u8, 1);

        // 失败方句柄保持原样，重新读取后即可再次提交
        let loser = if ra.is_err() { &mut a } else { &mut b };
        assert_eq!(loser.etag, seed.etag);
        storage.read_state(&slot, &grain, loser).await.unwrap();
        loser.state.value += 10;
        storage.write_state(&slot, &grain, loser).await.unwrap();
    }

    #[tokio::test]
    async fn test_stale_clear_conflicts_and_keeps_row() {
        let (_service, storage) = storage().await;
        let mut current = GrainState::with_state(Counter { value: 1 });
        storage.write_state(&slot(), &grain(), &mut current).await.unwrap();
        let mut stale = current.clone();
        current.state.value = 2;
        storage.write_state(&slot(), &grain(), &mut current).await.unwrap();

        let err = storage
            .clear_state(&slot(), &grain(), &mut stale)
            .await
            .unwrap_err();
        assert!(err.is_version_conflict());
        assert!(stale.record_exists);

        let mut reader = GrainState::<Counter>::default();
        storage.read_state(&slot(), &grain(), &mut reader).await.unwrap();
        assert_eq!(reader.state.value, 2);
    }

    #[tokio::test]
    async fn test_clear_of_absent_row_succeeds() {
        let (_service, storage) = storage().await;
        let mut handle = GrainState {
            state: Counter { value: 3 },
            etag: Some(ETag::new("W/\"never-written\"")),
            record_exists: true,
        };

        storage.clear_state(&slot(), &grain(), &mut handle).await.unwrap();
        assert_eq!(handle, GrainState::default());
    }

    #[tokio::test]
    async fn test_clear_removes_row() {
        let (service, storage) = storage().await;
        let mut handle = GrainState::with_state(Counter { value: 3 });
        storage.write_state(&slot(), &grain(), &mut handle).await.unwrap();
        assert_eq!(service.row_count(storage.table_name()), 1);

        storage.clear_state(&slot(), &grain(), &mut handle).await.unwrap();

        assert_eq!(service.row_count(storage.table_name()), 0);
        assert_eq!(handle, GrainState::default());
    }

    #[tokio::test]
    async fn test_bad_payload_leaves_handle_untouched() {
        let (service, storage) = storage().await;
        let address = derive_key(&grain(), &slot()).unwrap();
        service
            .table_client(storage.table_name())
            .upsert_row(&address, r#"{"value":"NaN"}"#.into(), None)
            .await
            .unwrap();

        let mut handle = GrainState::with_state(Counter { value: 9 });
        let err = storage
            .read_state(&slot(), &grain(), &mut handle)
            .await
            .unwrap_err();

        assert!(matches!(err, StorageError::Deserialization { .. }));
        assert_eq!(handle, GrainState::with_state(Counter { value: 9 }));
    }

    #[tokio::test]
    async fn test_malformed_identity_is_rejected_before_store_call() {
        let (service, storage) = storage().await;
        service.set_available(false);
        let mut handle = GrainState::<Counter>::default();

        let err = storage
            .write_state(&slot(), &EntityIdentity::new("short"), &mut handle)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::MalformedIdentity { .. }));
    }

    #[tokio::test]
    async fn test_offline_store_is_unavailable() {
        let (service, storage) = storage().await;
        let mut handle = GrainState::with_state(Counter { value: 1 });
        service.set_available(false);

        let err = storage
            .write_state(&slot(), &grain(), &mut handle)
            .await
            .unwrap_err();
        assert!(err.is_transient());
        assert!(!handle.record_exists);
        assert!(handle.etag.is_none());
    }

    #[tokio::test]
    async fn test_payload_limit_checked_before_store_call() {
        let (service, storage) = storage().await;
        let storage = storage.with_max_payload_bytes(8);
        assert_eq!(storage.max_payload_bytes(), 8);
        let mut handle = GrainState::with_state(Counter { value: 123_456 });

        let err = storage
            .write_state(&slot(), &grain(), &mut handle)
            .await
            .unwrap_err();

        assert!(matches!(err, StorageError::PayloadTooLarge { max: 8, .. }));
        assert_eq!(service.row_count(storage.table_name()), 0);
    }

    #[tokio::test]
    async fn test_empty_etag_writes_unconditionally() {
        let (_service, storage) = storage().await;
        let mut handle = GrainState {
            state: Counter { value: 5 },
            etag: Some(ETag::new("")),
            record_exists: false,
        };

        storage.write_state(&slot(), &grain(), &mut handle).await.unwrap();

        assert!(handle.record_exists);
        assert!(handle.etag.as_ref().is_some_and(|e| !e.as_str().is_empty()));
    }

    #[tokio::test]
    async fn test_empty_etag_clears_unconditionally() {
        let (service, storage) = storage().await;
        let mut writer = GrainState::with_state(Counter { value: 5 });
        storage.write_state(&slot(), &grain(), &mut writer).await.unwrap();

        let mut handle = GrainState {
            state: Counter { value: 5 },
            etag: Some(ETag::new("")),
            record_exists: true,
        };
        storage.clear_state(&slot(), &grain(), &mut handle).await.unwrap();

        assert_eq!(service.row_count(storage.table_name()), 0);
        assert_eq!(handle, GrainState::default());
    }

    /// 永不返回的表客户端，用于模拟调用中途被取消
    struct StallingClient {
        table: TableName,
    }

    #[async_trait]
    impl TableClient for StallingClient {
        fn table_name(&self) -> &TableName {
            &self.table
        }

        async fn get_row_if_exists(
            &self,
            _address: &RowAddress,
        ) -> StorageResult<Option<StoredRecord>> {
            std::future::pending().await
        }

        async fn upsert_row(
            &self,
            _address: &RowAddress,
            _data: String,
            _expected: Option<&ETag>,
        ) -> StorageResult<ETag> {
            std::future::pending().await
        }

        async fn delete_row(
            &self,
            _address: &RowAddress,
            _expected: Option<&ETag>,
        ) -> StorageResult<DeleteOutcome> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_cancelled_calls_leave_handle_untouched() {
        let storage = TableGrainStorage::new(
            "Default",
            ProvisionedTable::new(StallingClient {
                table: TableName::new("GrainState"),
            }),
        );
        let original = GrainState {
            state: Counter { value: 7 },
            etag: Some(ETag::new("W/\"1\"")),
            record_exists: true,
        };
        let mut handle = original.clone();
        let (slot, grain) = (slot(), grain());
        let timeout = Duration::from_millis(20);

        let read = tokio::time::timeout(timeout, storage.read_state(&slot, &grain, &mut handle));
        assert!(read.await.is_err());
        let write = tokio::time::timeout(timeout, storage.write_state(&slot, &grain, &mut handle));
        assert!(write.await.is_err());
        let clear = tokio::time::timeout(timeout, storage.clear_state(&slot, &grain, &mut handle));
        assert!(clear.await.is_err());

        assert_eq!(handle, original);
    }
}
