//! 类型化的实体持久状态
//!
//! `PersistentState<T, G>` 把一个存储提供者、实体标识、状态槽与状态句柄绑在一起，
//! 实体代码只需在激活时 `load` 一次，之后通过 `state()` / `state_mut()` 读写内存状态，
//! 在需要持久化时调用 `write_state`。
//!
//! ```
//! # use grain_storage::{PersistentState, TableGrainStorage, TableProvisioner};
//! # use grain_storage::table::InMemoryTableService;
//! # use grain_storage::value_object::{EntityIdentity, StateSlotName, TableName};
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), grain_storage::StorageError> {
//! let table = TableProvisioner::new(InMemoryTableService::new(), TableName::new("GrainState"))
//!     .ensure_table_exists()
//!     .await?;
//! let storage = TableGrainStorage::new("Default", table);
//!
//! let mut counter = PersistentState::<i32, _>::load(
//!     storage,
//!     EntityIdentity::new("2024-02-07_SomeCounter"),
//!     StateSlotName::new("state"),
//! )
//! .await?;
//! *counter.state_mut() += 1;
//! counter.write_state().await?;
//! assert!(counter.record_exists());
//! # Ok(())
//! # }
//! ```
//!
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::{
    error::StorageResult,
    grain_state::GrainState,
    storage::GrainStorage,
    value_object::{ETag, EntityIdentity, StateSlotName},
};

/// 实体持久状态
pub struct PersistentState<T, G> {
    storage: G,
    grain: EntityIdentity,
    slot: StateSlotName,
    handle: GrainState<T>,
}

impl<T, G> PersistentState<T, G>
where
    T: Serialize + DeserializeOwned + Default + Send,
    G: GrainStorage,
{
    /// 读取已有状态；无记录时以 `T::default()` 开始
    pub async fn load(
        storage: G,
        grain: EntityIdentity,
        slot: StateSlotName,
    ) -> StorageResult<Self> {
        let mut handle = GrainState::default();
        storage.read_state(&slot, &grain, &mut handle).await?;
        Ok(Self {
            storage,
            grain,
            slot,
            handle,
        })
    }

    pub fn state(&self) -> &T {
        &self.handle.state
    }

    /// 修改只在 [`write_state`](Self::write_state) 之后才持久化
    pub fn state_mut(&mut self) -> &mut T {
        &mut self.handle.state
    }

    pub fn etag(&self) -> Option<&ETag> {
        self.handle.etag.as_ref()
    }

    pub fn record_exists(&self) -> bool {
        self.handle.record_exists
    }

    pub fn grain(&self) -> &EntityIdentity {
        &self.grain
    }

    pub fn slot(&self) -> &StateSlotName {
        &self.slot
    }

    pub async fn write_state(&mut self) -> StorageResult<()> {
        self.storage
            .write_state(&self.slot, &self.grain, &mut self.handle)
            .await
    }

    /// 重新读取，覆盖内存中的状态
    pub async fn read_state(&mut self) -> StorageResult<()> {
        self.storage
            .read_state(&self.slot, &self.grain, &mut self.handle)
            .await
    }

    pub async fn clear_state(&mut self) -> StorageResult<()> {
        self.storage
            .clear_state(&self.slot, &self.grain, &mut self.handle)
            .await
    }
}
