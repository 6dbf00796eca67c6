//! Persistence for queue stats records.
//!
//! [`QueueStatsStore`] is the storage contract the service delegates to. Two
//! implementations are provided: [`sqlite::SqliteQueueStatsStore`] for durable
//! storage and [`memory::InMemoryQueueStatsStore`] for tests and ephemeral
//! deployments.

use std::{future::Future, pin::Pin};

use crate::{
    error::Error,
    id::{QueueStatsId, TenantId},
    page::{PageData, PageLink},
    queue_stats::QueueStats,
};

pub mod memory;
pub mod sqlite;

pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, Error>> + Send + 'a>>;

/// Tenant-scoped storage operations for [`QueueStats`].
///
/// Implementations enforce uniqueness of `(tenant_id, queue_name, service_id)`
/// and report violations as errors of their own; callers pass those through
/// untouched.
pub trait QueueStatsStore: Send + Sync + 'static {
    /// Inserts or updates a record.
    ///
    /// A record without an id is assigned a fresh one. A record whose id is
    /// not stored yet is inserted under that id. The creation time of an
    /// existing record is never overwritten.
    fn save(&self, tenant_id: TenantId, stats: QueueStats) -> StoreFuture<'_, QueueStats>;

    /// Looks a record up by id alone. The tenant is carried for tracing only.
    fn find_by_id(
        &self,
        tenant_id: TenantId,
        id: QueueStatsId,
    ) -> StoreFuture<'_, Option<QueueStats>>;

    fn find_by_composite_key<'a>(
        &'a self,
        tenant_id: TenantId,
        queue_name: &'a str,
        service_id: &'a str,
    ) -> StoreFuture<'a, Option<QueueStats>>;

    fn find_all_by_owner(&self, tenant_id: TenantId) -> StoreFuture<'_, Vec<QueueStats>>;

    /// Removes every record of the tenant and returns how many were removed.
    fn delete_all_by_owner(&self, tenant_id: TenantId) -> StoreFuture<'_, u64>;

    fn find_page<'a>(
        &'a self,
        tenant_id: TenantId,
        link: &'a PageLink,
    ) -> StoreFuture<'a, PageData<QueueStats>>;

    /// Returns the records among `ids` that belong to the tenant.
    fn find_by_ids<'a>(
        &'a self,
        tenant_id: TenantId,
        ids: &'a [QueueStatsId],
    ) -> StoreFuture<'a, Vec<QueueStats>>;

    /// Removes one record of the tenant. Returns false if nothing matched.
    fn delete_by_id(&self, tenant_id: TenantId, id: QueueStatsId) -> StoreFuture<'_, bool>;
}

pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
