//! 宿主层错误
//!
use grain_storage::StorageError;
use thiserror::Error;

use crate::lifecycle::ServiceLifecycleStage;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum HostError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("lifecycle participant {participant} failed at stage {stage}: {source}")]
    Startup {
        participant: String,
        stage: ServiceLifecycleStage,
        #[source]
        source: Box<HostError>,
    },

    #[error("host not started")]
    NotStarted,

    #[error("host already started")]
    AlreadyStarted,

    #[error("grain storage provider not found: {name}")]
    ProviderNotFound { name: String },

    #[error("grain storage provider already registered: {name}")]
    AlreadyRegistered { name: String },
}

impl HostError {
    /// 沿启动失败链找到底层存储错误
    pub fn storage_error(&self) -> Option<&StorageError> {
        match self {
            Self::Storage(err) => Some(err),
            Self::Startup { source, .. } => source.storage_error(),
            _ => None,
        }
    }
}

pub type HostResult<T> = Result<T, HostError>;
