//! 基于表存储的实体状态持久化（grain-storage）
//!
//! 把 actor（grain）的持久状态映射到分区表中的一行：
//! - 由实体标识与状态槽名推导分区键/行键（`key`）；
//! - 读/写/清除协议与 ETag 乐观并发（`storage`）；
//! - 启动时的幂等建表（`provision`）；
//! - 表存储能力协议及内存、Postgres 两种后端（`table`）；
//! - 状态序列化策略（`serializer`）与配置（`config`）。
//!
//! 典型用法：
//! 1. 用 `TableProvisioner::ensure_table_exists` 拿到 `ProvisionedTable`；
//! 2. 以它构建 `TableGrainStorage`；
//! 3. 实体代码持有 `GrainState<T>` 句柄（或 `PersistentState<T, G>`），调用读/写/清除。
//!
pub mod config;
pub mod error;
pub mod grain_state;
pub mod key;
pub mod persistent_state;
pub mod provision;
pub mod serializer;
pub mod storage;
pub mod table;
pub mod value_object;

pub use config::TableStorageOptions;
pub use error::{StorageError, StorageResult};
pub use grain_state::GrainState;
pub use key::{RowAddress, derive_key};
pub use persistent_state::PersistentState;
pub use provision::{ProvisionedTable, TableProvisioner};
pub use serializer::{JsonSerializer, StateSerializer};
pub use storage::{GrainStorage, TableGrainStorage};
pub use value_object::{ETag, EntityIdentity, StateSlotName, TableName};
