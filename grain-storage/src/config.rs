//! 表存储配置
//!
//! 可由 serde 反序列化（缺省字段取默认值），也可用 builder 构建；
//! `from_env` 在默认值之上叠加 `GRAIN_STORAGE_*` 环境变量。
//!
use bon::Builder;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    error::{StorageError, StorageResult},
    value_object::TableName,
};

pub const ENV_TABLE_NAME: &str = "GRAIN_STORAGE_TABLE_NAME";
pub const ENV_CONNECTION_STRING: &str = "GRAIN_STORAGE_CONNECTION_STRING";
pub const ENV_MAX_PAYLOAD_BYTES: &str = "GRAIN_STORAGE_MAX_PAYLOAD_BYTES";

pub const DEFAULT_TABLE_NAME: &str = "GrainState";

/// 与表存储单个属性的大小上限一致
pub const DEFAULT_MAX_PAYLOAD_BYTES: usize = 64 * 1024;

/// 表存储提供者配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Builder)]
pub struct TableStorageOptions {
    /// 状态表名
    #[serde(default = "default_table_name")]
    #[builder(into, default = default_table_name())]
    pub table_name: String,

    /// 后端连接串，`PgTableService::from_options` 必需
    #[serde(default)]
    #[builder(into)]
    pub connection_string: Option<String>,

    /// 序列化后负载的字节上限，0 表示不限制
    #[serde(default = "default_max_payload_bytes")]
    #[builder(default = DEFAULT_MAX_PAYLOAD_BYTES)]
    pub max_payload_bytes: usize,
}

fn default_table_name() -> String {
    DEFAULT_TABLE_NAME.to_string()
}

fn default_max_payload_bytes() -> usize {
    DEFAULT_MAX_PAYLOAD_BYTES
}

impl Default for TableStorageOptions {
    fn default() -> Self {
        Self {
            table_name: default_table_name(),
            connection_string: None,
            max_payload_bytes: default_max_payload_bytes(),
        }
    }
}

impl TableStorageOptions {
    /// 默认值叠加进程环境变量
    pub fn from_env() -> StorageResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 默认值叠加任意键值来源
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> StorageResult<Self> {
        let mut options = Self::default();

        if let Some(table_name) = lookup(ENV_TABLE_NAME) {
            options.table_name = table_name;
        }
        if let Some(connection_string) = lookup(ENV_CONNECTION_STRING) {
            options.connection_string = Some(connection_string);
        }
        if let Some(raw) = lookup(ENV_MAX_PAYLOAD_BYTES) {
            options.max_payload_bytes = raw.trim().parse().map_err(|_| StorageError::Config {
                reason: format!(
                    "{ENV_MAX_PAYLOAD_BYTES} must be a non-negative integer, got {raw:?}"
                ),
            })?;
        }

        debug!(
            table_name = %options.table_name,
            has_connection_string = options.connection_string.is_some(),
            max_payload_bytes = options.max_payload_bytes,
            "table storage options loaded"
        );
        Ok(options)
    }

    /// 校验表名
    pub fn validate(&self) -> StorageResult<()> {
        self.parsed_table_name().map(|_| ())
    }

    pub fn parsed_table_name(&self) -> StorageResult<TableName> {
        TableName::parse(self.table_name.as_str())
    }
}
