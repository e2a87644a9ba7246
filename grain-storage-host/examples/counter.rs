//! 计数器实体示例
//!
//! 以 `2024-02-07_SomeCounter` 为标识，通过默认存储提供者累加十次，
//! 再以一个新的激活重新读取，验证状态已持久化。
//!
//! 运行：`RUST_LOG=debug cargo run -p grain-storage-host --example counter`
//!
use std::sync::Arc;

use anyhow::Result as AnyResult;
use grain_storage::table::InMemoryTableService;
use grain_storage::{
    EntityIdentity, PersistentState, StateSlotName, StorageResult, TableStorageOptions,
};
use grain_storage_host::{HostedStorage, StorageHost};
use serde::{Deserialize, Serialize};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct CounterState {
    value: u64,
}

type Storage = Arc<HostedStorage<InMemoryTableService>>;

struct CounterGrain {
    state: PersistentState<CounterState, Storage>,
}

impl CounterGrain {
    async fn activate(storage: Storage, identity: EntityIdentity) -> StorageResult<Self> {
        let state =
            PersistentState::<CounterState, _>::load(storage, identity, StateSlotName::new("state"))
                .await?;
        info!(grain = %state.grain(), value = state.state().value, "counter activated");
        Ok(Self { state })
    }

    async fn increment(&mut self) -> StorageResult<u64> {
        self.state.state_mut().value += 1;
        self.state.write_state().await?;
        Ok(self.state.state().value)
    }

    fn value(&self) -> u64 {
        self.state.state().value
    }
}

#[tokio::main]
async fn main() -> AnyResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let options = TableStorageOptions::from_env()?;
    let host = StorageHost::builder(InMemoryTableService::new())
        .add_default_table_storage(options)
        .build()?;
    host.start().await?;

    let identity = EntityIdentity::new("2024-02-07_SomeCounter");
    let storage = host.default_grain_storage()?;
    let mut counter = CounterGrain::activate(storage, identity.clone()).await?;
    for _ in 0..10 {
        let value = counter.increment().await?;
        info!(value, "incremented");
    }

    let reactivated = CounterGrain::activate(host.default_grain_storage()?, identity).await?;
    info!(before = counter.value(), after = reactivated.value(), "counter reloaded");
    anyhow::ensure!(reactivated.value() == 10, "expected 10, got {}", reactivated.value());

    host.stop().await?;
    Ok(())
}
