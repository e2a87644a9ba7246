//! 宿主生命周期
//!
//! 观察者按阶段订阅：启动时按阶段升序依次执行 `on_start`，停止时逆序执行 `on_stop`。
//! 同一阶段内保持订阅顺序。任一观察者启动失败即中止启动，并逆序停止已启动的观察者。
//!
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::error::{HostError, HostResult};

/// 生命周期阶段（数值越小越早启动）
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ServiceLifecycleStage {
    First = i32::MIN,
    RuntimeInitialize = 2000,
    RuntimeServices = 4000,
    RuntimeStorageServices = 6000,
    RuntimeGrainServices = 8000,
    ApplicationServices = 10000,
    BecomeActive = 19999,
    Active = 20000,
    Last = i32::MAX,
}

impl ServiceLifecycleStage {
    pub fn value(self) -> i32 {
        self as i32
    }
}

impl fmt::Display for ServiceLifecycleStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({})", self, self.value())
    }
}

/// 生命周期观察者
#[async_trait]
pub trait LifecycleObserver: Send + Sync {
    fn name(&self) -> &str;

    async fn on_start(&self) -> HostResult<()>;

    async fn on_stop(&self) -> HostResult<()> {
        Ok(())
    }
}

struct Subscription {
    stage: ServiceLifecycleStage,
    observer: Arc<dyn LifecycleObserver>,
}

/// 有序启动/停止的生命周期
#[derive(Default)]
pub struct ServiceLifecycle {
    subscriptions: Vec<Subscription>,
    started: usize,
}

impl ServiceLifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(
        &mut self,
        stage: ServiceLifecycleStage,
        observer: Arc<dyn LifecycleObserver>,
    ) {
        debug!(observer = observer.name(), %stage, "lifecycle observer subscribed");
        self.subscriptions.push(Subscription { stage, observer });
    }

    /// 当前已启动的观察者数量
    pub fn started(&self) -> usize {
        self.started
    }

    pub async fn start(&mut self) -> HostResult<()> {
        // 稳定排序：同一阶段保持订阅顺序
        self.subscriptions.sort_by_key(|s| s.stage);

        while self.started < self.subscriptions.len() {
            let sub = &self.subscriptions[self.started];
            info!(
                observer = sub.observer.name(),
                stage = %sub.stage,
                "starting lifecycle observer"
            );

            if let Err(err) = sub.observer.on_start().await {
                let participant = sub.observer.name().to_string();
                let stage = sub.stage;
                warn!(observer = %participant, %stage, error = %err, "lifecycle start aborted");
                // 回滚已启动的部分；回滚中的错误只记录
                let _ = self.stop().await;
                return Err(HostError::Startup {
                    participant,
                    stage,
                    source: Box::new(err),
                });
            }
            self.started += 1;
        }
        Ok(())
    }

    /// 逆序停止已启动的观察者，返回第一个停止错误
    pub async fn stop(&mut self) -> HostResult<()> {
        let mut first_err = None;
        while self.started > 0 {
            self.started -= 1;
            let sub = &self.subscriptions[self.started];
            info!(
                observer = sub.observer.name(),
                stage = %sub.stage,
                "stopping lifecycle observer"
            );

            if let Err(err) = sub.observer.on_stop().await {
                warn!(
                    observer = sub.observer.name(),
                    stage = %sub.stage,
                    error = %err,
                    "lifecycle observer failed to stop"
                );
                first_err.get_or_insert(err);
            }
        }
        first_err.map_or(Ok(()), Err)
    }
}
