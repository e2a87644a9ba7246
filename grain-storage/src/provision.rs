//! 建表（provisioning）
//!
//! 宿主启动时的一次性步骤：幂等地确保配置的表存在，并交出 [`ProvisionedTable`]。
//! `ProvisionedTable` 只能由这里构造，`TableGrainStorage` 又只能由它构建，
//! 从类型上保证了“先建表，后读写”。
//!
use tracing::{info, warn};

use crate::{
    error::StorageResult,
    table::{TableClient, TableServiceClient},
    value_object::TableName,
};

/// 已确认存在的表
#[derive(Debug, Clone)]
pub struct ProvisionedTable<C> {
    client: C,
}

impl<C: TableClient> ProvisionedTable<C> {
    pub(crate) fn new(client: C) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn table_name(&self) -> &TableName {
        self.client.table_name()
    }
}

/// 表供应器
pub struct TableProvisioner<S> {
    service: S,
    table_name: TableName,
}

impl<S: TableServiceClient> TableProvisioner<S> {
    pub fn new(service: S, table_name: TableName) -> Self {
        Self {
            service,
            table_name,
        }
    }

    pub fn table_name(&self) -> &TableName {
        &self.table_name
    }

    /// 幂等建表
    ///
    /// 存储不可达时返回 `StoreUnavailable`，宿主应将其视为启动失败。
    pub async fn ensure_table_exists(&self) -> StorageResult<ProvisionedTable<S::Table>> {
        let creation = self
            .service
            .create_table_if_not_exists(&self.table_name)
            .await
            .inspect_err(|e| {
                warn!(table = %self.table_name, error = %e, "table provisioning failed");
            })?;

        info!(table = %self.table_name, ?creation, "table provisioned");
        Ok(ProvisionedTable::new(
            self.service.table_client(&self.table_name),
        ))
    }
}
