//! 状态序列化策略
//!
//! 表中的 `data` 列只是不透明字符串，具体格式由 `StateSerializer` 决定；
//! 默认使用 `JsonSerializer`（serde_json）。
//!
use crate::error::{StorageError, StorageResult};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// 状态序列化抽象
pub trait StateSerializer: Send + Sync {
    fn serialize<T: Serialize>(&self, state: &T) -> StorageResult<String>;

    /// 负载形状不匹配时返回 `StorageError::Deserialization`
    fn deserialize<T: DeserializeOwned>(&self, data: &str) -> StorageResult<T>;
}

/// 基于 serde_json 的默认序列化实现
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer;

impl StateSerializer for JsonSerializer {
    fn serialize<T: Serialize>(&self, state: &T) -> StorageResult<String> {
        serde_json::to_string(state).map_err(|e| StorageError::Serialization {
            reason: e.to_string(),
        })
    }

    fn deserialize<T: DeserializeOwned>(&self, data: &str) -> StorageResult<T> {
        serde_json::from_str(data).map_err(|e| StorageError::Deserialization {
            reason: e.to_string(),
        })
    }
}
