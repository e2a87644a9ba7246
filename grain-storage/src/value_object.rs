//! 值对象（Value Object）
//!
//! 存储协议中出现的字符串概念：实体标识、状态槽名、版本令牌（ETag）与表名。
//! 它们都只是包一层 `String`，由 `#[string_key]` 补齐派生与转换实现；
//! 需要校验的类型额外实现 [`ValueObject`]。
//!

use grain_storage_macros::string_key;

use crate::error::StorageError;

/// 值对象抽象
pub trait ValueObject {
    /// 业务校验失败时的错误类型
    type Error;

    /// 创建值对象时进行验证
    fn validate(&self) -> Result<(), Self::Error>;
}

/// 实体（grain）标识
///
/// 形如 `<10 个字符的前缀>_<其余部分>`，例如 `2024-02-07_SomeCounter`。
/// 标识本身不做校验，格式在键推导时检查（见 [`crate::key::derive_key`]）。
#[string_key]
pub struct EntityIdentity(String);

/// 状态槽名：同一实体可持有多个独立持久化的状态槽
#[string_key]
pub struct StateSlotName(String);

/// 版本令牌（ETag）
///
/// 由存储在每次成功写入时分配，对调用方不透明，仅用于乐观并发的前置条件比较。
#[string_key]
pub struct ETag(String);

impl ETag {
    /// 生成新的弱 ETag（`W/"<uuid>"`）
    pub fn generate() -> Self {
        Self(format!("W/\"{}\"", uuid::Uuid::new_v4()))
    }
}

/// 表名
///
/// 规则：3–63 个 ASCII 字母或数字，且以字母开头。
/// 表名会被拼接进后端的建表/查询语句，因此在供应（provision）前必须通过校验。
#[string_key]
pub struct TableName(String);

impl TableName {
    pub const MIN_LEN: usize = 3;
    pub const MAX_LEN: usize = 63;

    /// 创建并校验表名
    pub fn parse(value: impl Into<String>) -> Result<Self, StorageError> {
        let name = Self::new(value);
        name.validate()?;
        Ok(name)
    }
}

impl ValueObject for TableName {
    type Error = StorageError;

    fn validate(&self) -> Result<(), Self::Error> {
        let invalid = |reason| StorageError::InvalidTableName {
            name: self.0.clone(),
            reason,
        };

        let len = self.0.len();
        if !(Self::MIN_LEN..=Self::MAX_LEN).contains(&len) {
            return Err(invalid("length must be between 3 and 63"));
        }
        if !self.0.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(invalid("only ASCII letters and digits are allowed"));
        }
        if !self.0.as_bytes()[0].is_ascii_alphabetic() {
            return Err(invalid("must start with a letter"));
        }
        Ok(())
    }
}
