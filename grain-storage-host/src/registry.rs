use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use grain_storage::GrainStorage;

use crate::error::{HostError, HostResult};

/// 未显式指定提供者时使用的名称
pub const DEFAULT_STORAGE_PROVIDER_NAME: &str = "Default";

/// 按名称登记的状态存储提供者
pub struct GrainStorageRegistry<G> {
    providers: DashMap<String, Arc<G>>,
}

impl<G> Default for GrainStorageRegistry<G> {
    fn default() -> Self {
        Self {
            providers: DashMap::new(),
        }
    }
}

impl<G: GrainStorage> GrainStorageRegistry<G> {
    pub fn new() -> Self {
        Self::default()
    }

    /// 登记提供者；同名重复登记返回 `AlreadyRegistered`
    pub fn register(&self, name: impl Into<String>, storage: Arc<G>) -> HostResult<()> {
        match self.providers.entry(name.into()) {
            Entry::Occupied(e) => Err(HostError::AlreadyRegistered {
                name: e.key().clone(),
            }),
            Entry::Vacant(e) => {
                e.insert(storage);
                Ok(())
            }
        }
    }

    pub fn get(&self, name: &str) -> HostResult<Arc<G>> {
        self.providers
            .get(name)
            .map(|p| Arc::clone(p.value()))
            .ok_or_else(|| HostError::ProviderNotFound {
                name: name.to_string(),
            })
    }

    pub fn remove(&self, name: &str) -> Option<Arc<G>> {
        self.providers.remove(name).map(|(_, p)| p)
    }

    /// 已登记的提供者名称（排序后）
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.providers.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }
}
