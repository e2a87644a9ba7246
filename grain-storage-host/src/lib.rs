//! 状态存储宿主（grain-storage-host）
//!
//! 把 `grain-storage` 接入一个有序启动的宿主：
//! - `lifecycle`：按阶段排序的启动/停止与失败回滚；
//! - `registry`：按名称登记的存储提供者（默认名 `"Default"`）；
//! - `host`：`StorageHost`，在 `ApplicationServices` 阶段为每个提供者建表并登记。
//!
pub mod error;
pub mod host;
pub mod lifecycle;
pub mod registry;

pub use error::{HostError, HostResult};
pub use host::{HostedStorage, StorageHost, StorageHostBuilder};
pub use lifecycle::{LifecycleObserver, ServiceLifecycle, ServiceLifecycleStage};
pub use registry::{DEFAULT_STORAGE_PROVIDER_NAME, GrainStorageRegistry};
