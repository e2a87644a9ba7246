//! 存储宿主（StorageHost）
//!
//! 启动流程：宿主启动 → 各表存储提供者在 `ApplicationServices` 阶段建表 →
//! 建表成功后登记到注册表 → 实体代码按名称取用存储。
//! 任一提供者建表失败都会中止启动，已登记的提供者随回滚一并移除。
//!
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use grain_storage::table::TableServiceClient;
use grain_storage::{TableGrainStorage, TableProvisioner, TableStorageOptions};
use tokio::sync::Mutex;
use tracing::info;

use crate::{
    error::{HostError, HostResult},
    lifecycle::{LifecycleObserver, ServiceLifecycle, ServiceLifecycleStage},
    registry::{DEFAULT_STORAGE_PROVIDER_NAME, GrainStorageRegistry},
};

/// 宿主为服务 `S` 托管的存储类型
pub type HostedStorage<S> = TableGrainStorage<<S as TableServiceClient>::Table>;

/// 单个表存储提供者的启动参与者
struct TableStorageParticipant<S: TableServiceClient> {
    name: String,
    service: S,
    options: TableStorageOptions,
    registry: Arc<GrainStorageRegistry<HostedStorage<S>>>,
}

#[async_trait]
impl<S> LifecycleObserver for TableStorageParticipant<S>
where
    S: TableServiceClient + Clone + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn on_start(&self) -> HostResult<()> {
        let table_name = self.options.parsed_table_name()?;
        let table = TableProvisioner::new(self.service.clone(), table_name)
            .ensure_table_exists()
            .await?;
        let storage = TableGrainStorage::with_options(self.name.clone(), table, &self.options);
        self.registry.register(self.name.clone(), Arc::new(storage))?;

        info!(provider = %self.name, table = %self.options.table_name, "grain storage registered");
        Ok(())
    }

    async fn on_stop(&self) -> HostResult<()> {
        if self.registry.remove(&self.name).is_some() {
            info!(provider = %self.name, "grain storage unregistered");
        }
        Ok(())
    }
}

/// 宿主构建器
pub struct StorageHostBuilder<S> {
    service: S,
    providers: Vec<(String, TableStorageOptions)>,
    observers: Vec<(ServiceLifecycleStage, Arc<dyn LifecycleObserver>)>,
}

impl<S> StorageHostBuilder<S>
where
    S: TableServiceClient + Clone + 'static,
{
    /// 添加具名表存储提供者
    pub fn add_table_storage(
        mut self,
        name: impl Into<String>,
        options: TableStorageOptions,
    ) -> Self {
        self.providers.push((name.into(), options));
        self
    }

    /// 添加名为 `"Default"` 的表存储提供者
    pub fn add_default_table_storage(self, options: TableStorageOptions) -> Self {
        self.add_table_storage(DEFAULT_STORAGE_PROVIDER_NAME, options)
    }

    /// 订阅额外的生命周期观察者
    pub fn subscribe(
        mut self,
        stage: ServiceLifecycleStage,
        observer: Arc<dyn LifecycleObserver>,
    ) -> Self {
        self.observers.push((stage, observer));
        self
    }

    /// 校验配置并构建宿主（不触发任何存储调用）
    pub fn build(self) -> HostResult<StorageHost<S>> {
        let registry = Arc::new(GrainStorageRegistry::new());
        let mut lifecycle = ServiceLifecycle::new();
        let mut seen = HashSet::new();

        for (name, options) in self.providers {
            if !seen.insert(name.clone()) {
                return Err(HostError::AlreadyRegistered { name });
            }
            options.validate()?;

            let participant = TableStorageParticipant {
                name,
                service: self.service.clone(),
                options,
                registry: Arc::clone(&registry),
            };
            lifecycle.subscribe(ServiceLifecycleStage::ApplicationServices, Arc::new(participant));
        }
        for (stage, observer) in self.observers {
            lifecycle.subscribe(stage, observer);
        }

        Ok(StorageHost {
            registry,
            lifecycle: Mutex::new(lifecycle),
            started: AtomicBool::new(false),
        })
    }
}

/// 状态存储宿主
pub struct StorageHost<S: TableServiceClient> {
    registry: Arc<GrainStorageRegistry<HostedStorage<S>>>,
    lifecycle: Mutex<ServiceLifecycle>,
    started: AtomicBool,
}

impl<S> StorageHost<S>
where
    S: TableServiceClient + Clone + 'static,
{
    pub fn builder(service: S) -> StorageHostBuilder<S> {
        StorageHostBuilder {
            service,
            providers: Vec::new(),
            observers: Vec::new(),
        }
    }

    /// 按阶段启动全部参与者
    pub async fn start(&self) -> HostResult<()> {
        let mut lifecycle = self.lifecycle.lock().await;
        if self.started.load(Ordering::SeqCst) {
            return Err(HostError::AlreadyStarted);
        }

        lifecycle.start().await?;
        self.started.store(true, Ordering::SeqCst);
        info!(providers = ?self.registry.names(), "storage host started");
        Ok(())
    }

    /// 逆序停止；未启动时为空操作
    pub async fn stop(&self) -> HostResult<()> {
        let mut lifecycle = self.lifecycle.lock().await;
        if !self.started.swap(false, Ordering::SeqCst) {
            return Ok(());
        }

        lifecycle.stop().await?;
        info!("storage host stopped");
        Ok(())
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    pub fn grain_storage(&self, name: &str) -> HostResult<Arc<HostedStorage<S>>> {
        if !self.is_started() {
            return Err(HostError::NotStarted);
        }
        self.registry.get(name)
    }

    pub fn default_grain_storage(&self) -> HostResult<Arc<HostedStorage<S>>> {
        self.grain_storage(DEFAULT_STORAGE_PROVIDER_NAME)
    }

    pub fn provider_names(&self) -> Vec<String> {
        self.registry.names()
    }
}
