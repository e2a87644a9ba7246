use anyhow::Result as AnyResult;
use async_trait::async_trait;
use grain_storage::table::InMemoryTableService;
use grain_storage::{
    EntityIdentity, GrainState, GrainStorage, StateSlotName, StorageError, TableName,
    TableStorageOptions,
};
use grain_storage_host::{
    HostError, HostResult, LifecycleObserver, ServiceLifecycleStage, StorageHost,
};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use ulid::Ulid;

#[derive(Debug, Default, Serialize, Deserialize)]
struct Counter {
    value: u32,
}

fn options(table: &str) -> TableStorageOptions {
    TableStorageOptions::builder().table_name(table).build()
}

/// 记录启动时状态表是否已建好
struct TableWatcher {
    service: InMemoryTableService,
    saw_table: Arc<Mutex<Option<bool>>>,
}

#[async_trait]
impl LifecycleObserver for TableWatcher {
    fn name(&self) -> &str {
        "table-watcher"
    }

    async fn on_start(&self) -> HostResult<()> {
        let exists = self.service.table_exists(&TableName::new("GrainState"));
        *self.saw_table.lock().unwrap() = Some(exists);
        Ok(())
    }
}

#[tokio::test]
async fn provisions_tables_then_serves_storage() -> AnyResult<()> {
    let service = InMemoryTableService::new();
    let host = StorageHost::builder(service.clone())
        .add_default_table_storage(options("GrainState"))
        .add_table_storage("Archive", options("Archive"))
        .build()?;

    assert!(matches!(
        host.default_grain_storage(),
        Err(HostError::NotStarted)
    ));

    host.start().await?;
    assert!(service.table_exists(&TableName::new("GrainState")));
    assert!(service.table_exists(&TableName::new("Archive")));
    assert_eq!(host.provider_names(), vec!["Archive", "Default"]);

    let storage = host.default_grain_storage()?;
    let grain = EntityIdentity::new(format!("2024-02-07_{}", Ulid::new()));
    let slot = StateSlotName::new("state");
    let mut handle = GrainState::with_state(Counter { value: 1 });
    storage.write_state(&slot, &grain, &mut handle).await?;
    assert_eq!(service.row_count(&TableName::new("GrainState")), 1);
    assert_eq!(service.row_count(&TableName::new("Archive")), 0);

    assert!(matches!(
        host.grain_storage("Missing"),
        Err(HostError::ProviderNotFound { .. })
    ));

    host.stop().await?;
    assert!(!host.is_started());
    assert!(host.provider_names().is_empty());
    Ok(())
}

#[tokio::test]
async fn storage_is_provisioned_before_active_stage() -> AnyResult<()> {
    let service = InMemoryTableService::new();
    let saw_table = Arc::new(Mutex::new(None));
    let host = StorageHost::builder(service.clone())
        .subscribe(
            ServiceLifecycleStage::Active,
            Arc::new(TableWatcher {
                service: service.clone(),
                saw_table: saw_table.clone(),
            }),
        )
        .add_default_table_storage(TableStorageOptions::default())
        .build()?;

    host.start().await?;
    assert_eq!(*saw_table.lock().unwrap(), Some(true));
    Ok(())
}

#[tokio::test]
async fn unreachable_store_fails_startup() -> AnyResult<()> {
    let service = InMemoryTableService::new();
    service.set_available(false);
    let host = StorageHost::builder(service.clone())
        .add_default_table_storage(TableStorageOptions::default())
        .build()?;

    let err = host.start().await.unwrap_err();
    let HostError::Startup { stage, source, .. } = &err else {
        panic!("expected a startup failure, got {err}");
    };
    assert_eq!(*stage, ServiceLifecycleStage::ApplicationServices);
    assert!(matches!(
        source.as_ref(),
        HostError::Storage(StorageError::StoreUnavailable { .. })
    ));
    assert!(err.storage_error().is_some_and(StorageError::is_transient));
    assert!(!host.is_started());
    assert!(host.provider_names().is_empty());

    // 存储恢复后可以重新启动
    service.set_available(true);
    host.start().await?;
    assert!(host.default_grain_storage().is_ok());
    Ok(())
}

#[tokio::test]
async fn double_start_is_rejected() -> AnyResult<()> {
    let host = StorageHost::builder(InMemoryTableService::new())
        .add_default_table_storage(TableStorageOptions::default())
        .build()?;

    host.start().await?;
    assert!(matches!(host.start().await, Err(HostError::AlreadyStarted)));
    Ok(())
}

#[test]
fn invalid_configuration_fails_build() {
    let bad_table = StorageHost::builder(InMemoryTableService::new())
        .add_default_table_storage(options("no"))
        .build();
    assert!(matches!(
        bad_table,
        Err(HostError::Storage(StorageError::InvalidTableName { .. }))
    ));

    let duplicate = StorageHost::builder(InMemoryTableService::new())
        .add_table_storage("Archive", options("Archive"))
        .add_table_storage("Archive", options("Archive2"))
        .build();
    assert!(matches!(
        duplicate,
        Err(HostError::AlreadyRegistered { .. })
    ));
}
