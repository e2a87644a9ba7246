use crate::{key::RowAddress, value_object::ETag};
use bon::Builder;
use chrono::{DateTime, Utc};

/// 表中的一行持久化记录
#[derive(Debug, Clone, Builder, PartialEq)]
pub struct StoredRecord {
    /// 分区键
    #[builder(into)]
    partition_key: String,
    /// 行键
    #[builder(into)]
    row_key: String,
    /// 序列化后的状态负载（不透明字符串）
    #[builder(into)]
    data: String,
    /// 存储分配的版本令牌，每次成功写入都会改变
    etag: ETag,
    /// 最近一次写入时间，由存储维护
    timestamp: DateTime<Utc>,
}

impl StoredRecord {
    pub fn partition_key(&self) -> &str {
        &self.partition_key
    }

    pub fn row_key(&self) -> &str {
        &self.row_key
    }

    pub fn data(&self) -> &str {
        &self.data
    }

    pub fn etag(&self) -> &ETag {
        &self.etag
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn address(&self) -> RowAddress {
        RowAddress::new(self.partition_key.clone(), self.row_key.clone())
    }

    /// 拆出负载与版本令牌，供读取路径使用
    pub fn into_payload(self) -> (String, ETag) {
        (self.data, self.etag)
    }
}

/// 删除结果：显式区分“已删除”与“本就不存在”
///
/// 删除不存在的行视为成功（幂等清除），由调用方决定是否关心两者差异。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    AlreadyAbsent,
}

/// 建表结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableCreation {
    Created,
    AlreadyExists,
}
