//! 调用方持有的状态句柄（GrainState）
//!
//! 存储适配器从不拥有句柄的生命周期，只在读/写/清除成功后一次性更新其中三个字段：
//! `state`、`etag`、`record_exists`。任何失败（或被取消的调用）都不会留下部分更新。
//!
use crate::value_object::ETag;

/// 实体状态句柄
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GrainState<T> {
    /// 内存中的状态对象
    pub state: T,
    /// 最近一次已知的行版本；`None` 表示尚未读到或写过记录
    pub etag: Option<ETag>,
    /// 存储中是否存在对应记录
    pub record_exists: bool,
}

impl<T> GrainState<T> {
    /// 以给定状态创建句柄（尚无记录、无 ETag）
    pub fn with_state(state: T) -> Self {
        Self {
            state,
            etag: None,
            record_exists: false,
        }
    }

    /// 写入/删除时携带的前置条件；空 ETag 等同于没有 ETag
    pub(crate) fn precondition(&self) -> Option<&ETag> {
        self.etag.as_ref().filter(|e| !e.as_str().is_empty())
    }

    pub(crate) fn set_loaded(&mut self, state: T, etag: ETag) {
        self.state = state;
        self.etag = Some(etag);
        self.record_exists = true;
    }

    pub(crate) fn set_written(&mut self, etag: ETag) {
        self.etag = Some(etag);
        self.record_exists = true;
    }
}

impl<T: Default> GrainState<T> {
    /// 回到“无记录”状态：默认值、无 ETag
    pub(crate) fn reset(&mut self) {
        self.state = T::default();
        self.etag = None;
        self.record_exists = false;
    }
}
