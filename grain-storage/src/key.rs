//! 行地址推导
//!
//! 由 (实体标识, 状态槽名) 推导出表存储中的 (分区键, 行键)：
//! - 分区键 = 标识的前 10 个字符；
//! - 行键 = `{标识中分隔符之后的部分}-{状态槽名}`。
//!
//! 标识必须形如 `<10 个字符的前缀>_<其余部分>`，否则推导失败（`MalformedIdentity`）。
//!
use std::fmt;

use grain_storage_macros::value_object;

use crate::error::{StorageError, StorageResult};
use crate::value_object::{EntityIdentity, StateSlotName};

/// 分区键长度（字符）
pub const PARTITION_KEY_LEN: usize = 10;

/// 分区键与其余部分之间的分隔符
pub const KEY_SEPARATOR: char = '_';

/// 行在表中的唯一地址
#[value_object]
#[derive(PartialOrd, Ord)]
pub struct RowAddress {
    partition_key: String,
    row_key: String,
}

impl RowAddress {
    pub fn new(partition_key: impl Into<String>, row_key: impl Into<String>) -> Self {
        Self {
            partition_key: partition_key.into(),
            row_key: row_key.into(),
        }
    }

    pub fn partition_key(&self) -> &str {
        &self.partition_key
    }

    pub fn row_key(&self) -> &str {
        &self.row_key
    }
}

impl fmt::Display for RowAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.partition_key, self.row_key)
    }
}

/// 推导行地址（纯函数）
///
/// # 示例
///
/// ```
/// use grain_storage::key::derive_key;
/// use grain_storage::value_object::{EntityIdentity, StateSlotName};
///
/// let addr = derive_key(
///     &EntityIdentity::new("2024-02-07_SomeCounter"),
///     &StateSlotName::new("state"),
/// )
/// .unwrap();
/// assert_eq!(addr.partition_key(), "2024-02-07");
/// assert_eq!(addr.row_key(), "SomeCounter-state");
/// ```
pub fn derive_key(identity: &EntityIdentity, slot: &StateSlotName) -> StorageResult<RowAddress> {
    let raw = identity.as_str();
    let malformed = |reason| StorageError::MalformedIdentity {
        identity: raw.to_string(),
        reason,
    };

    // 按字符计数，切片位置取自 char_indices，总在字符边界上
    let Some((sep_at, sep)) = raw.char_indices().nth(PARTITION_KEY_LEN) else {
        return Err(malformed("identity must be at least 11 characters long"));
    };
    if sep != KEY_SEPARATOR {
        return Err(malformed("expected '_' separator at character 10"));
    }

    let partition_key = &raw[..sep_at];
    let rest = &raw[sep_at + sep.len_utf8()..];

    Ok(RowAddress::new(
        partition_key,
        format!("{}-{}", rest, slot.as_str()),
    ))
}
