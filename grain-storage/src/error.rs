//! 存储层统一错误定义
//!
//! 覆盖键推导、表存储调用、乐观并发与序列化等最小必要集合。
//! 适配器从不吞掉存储报告的失败，也不做内部重试；是否重试由调用方依据
//! [`StorageError::is_transient`] / [`StorageError::is_version_conflict`] 自行决定。
//!
use thiserror::Error;

/// 统一错误类型
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum StorageError {
    // --- 键推导 ---
    #[error("malformed identity: identity={identity}, reason={reason}")]
    MalformedIdentity {
        identity: String,
        reason: &'static str,
    },

    // --- 表存储 ---
    #[error("store unavailable: {reason}")]
    StoreUnavailable { reason: String },
    #[error(
        "version conflict: partition_key={partition_key}, row_key={row_key}, expected={expected}"
    )]
    VersionConflict {
        partition_key: String,
        row_key: String,
        expected: String,
    },

    // --- 序列化 ---
    #[error("deserialization error: {reason}")]
    Deserialization { reason: String },
    #[error("serialization error: {reason}")]
    Serialization { reason: String },
    #[error("payload too large: size={size}, max={max}")]
    PayloadTooLarge { size: usize, max: usize },

    // --- 配置 ---
    #[error("invalid table name: name={name}, reason={reason}")]
    InvalidTableName { name: String, reason: &'static str },
    #[error("config error: {reason}")]
    Config { reason: String },
}

impl StorageError {
    pub(crate) fn unavailable(reason: impl Into<String>) -> Self {
        StorageError::StoreUnavailable {
            reason: reason.into(),
        }
    }

    /// 并发写入被检测到：调用方需重新读取状态后再提交
    pub fn is_version_conflict(&self) -> bool {
        matches!(self, StorageError::VersionConflict { .. })
    }

    /// 传输/服务故障：调用方可自行决定是否重试
    pub fn is_transient(&self) -> bool {
        matches!(self, StorageError::StoreUnavailable { .. })
    }
}

/// 统一 Result 类型别名
pub type StorageResult<T> = Result<T, StorageError>;

// 允许在基础设施层直接使用 `?` 将 sqlx 错误转换为 StorageError
#[cfg(feature = "infra-sqlx")]
impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        StorageError::StoreUnavailable {
            reason: err.to_string(),
        }
    }
}
