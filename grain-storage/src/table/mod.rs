//! 表存储（table）
//!
//! 定义适配器依赖的表存储能力协议与行记录模型，并提供两个后端：
//! - 内存实现（`InMemoryTableService`），用于测试与单机开发；
//! - Postgres 实现（`PgTableService`，需启用 `infra-sqlx` 特性）。
//!
//! 该模块只关心“按地址读写一行、带前置条件”，状态的序列化与句柄更新由 `storage` 模块负责。
//!
mod client;
mod memory;
#[cfg(feature = "infra-sqlx")]
mod postgres;
mod record;

pub use client::{TableClient, TableServiceClient};
pub use memory::{InMemoryTableClient, InMemoryTableService};
#[cfg(feature = "infra-sqlx")]
pub use postgres::{PgTableClient, PgTableService};
pub use record::{DeleteOutcome, StoredRecord, TableCreation};
