//! Argument checks and record validation.
//!
//! Identifier checks fail with [`Error::InvalidArgument`], record checks with
//! [`Error::ValidationFailed`]. Both run before the store is touched.

use std::{future::Future, pin::Pin, sync::Arc};

use crate::{
    error::Error,
    id::{QueueStatsId, TenantId},
    queue_stats::QueueStats,
    store::QueueStatsStore,
};

pub const INCORRECT_TENANT_ID: &str = "Incorrect tenantId ";
pub const INCORRECT_QUEUE_STATS_ID: &str = "Incorrect queueStatsId ";

/// Longest string accepted for a persisted text column.
pub const MAX_STRING_LENGTH: usize = 255;

pub fn validate_tenant_id(tenant_id: TenantId) -> Result<(), Error> {
    if tenant_id.is_nil() {
        return Err(Error::invalid_argument(format!(
            "{INCORRECT_TENANT_ID}{tenant_id}"
        )));
    }
    Ok(())
}

pub fn validate_queue_stats_id(id: QueueStatsId) -> Result<(), Error> {
    if id.is_nil() {
        return Err(Error::invalid_argument(format!(
            "{INCORRECT_QUEUE_STATS_ID}{id}"
        )));
    }
    Ok(())
}

pub fn validate_queue_stats_ids(ids: &[QueueStatsId]) -> Result<(), Error> {
    ids.iter().copied().try_for_each(validate_queue_stats_id)
}

/// Checks a required text field: present, bounded, and free of NUL bytes.
pub fn validate_string(field: &str, value: &str) -> Result<(), Error> {
    if value.trim().is_empty() {
        return Err(Error::validation(format!(
            "Queue stats {field} should be specified!"
        )));
    }
    if value.chars().count() > MAX_STRING_LENGTH {
        return Err(Error::validation(format!(
            "Queue stats {field} length must be equal or less than {MAX_STRING_LENGTH}"
        )));
    }
    if value.contains('\0') {
        return Err(Error::validation(format!(
            "Queue stats {field} should not contain 0x00 symbol"
        )));
    }
    Ok(())
}

pub type ValidationFuture<'a> = Pin<Box<dyn Future<Output = Result<(), Error>> + Send + 'a>>;

/// Business-rule validation of a record before it is persisted.
///
/// `owner` extracts the tenant that owns the record.
pub trait DataValidator<T>: Send + Sync + 'static {
    fn validate<'a>(&'a self, data: &'a T, owner: fn(&T) -> TenantId) -> ValidationFuture<'a>;
}

/// Validates [`QueueStats`] against the records already in the store.
#[derive(Clone)]
pub struct QueueStatsValidator {
    store: Arc<dyn QueueStatsStore>,
}

impl QueueStatsValidator {
    pub fn new(store: Arc<dyn QueueStatsStore>) -> Self {
        Self { store }
    }

    fn validate_fields(stats: &QueueStats, owner: TenantId) -> Result<(), Error> {
        if owner.is_nil() {
            return Err(Error::validation("Queue stats should be assigned to tenant!"));
        }
        validate_string("queue name", &stats.queue_name)?;
        validate_string("service id", &stats.service_id)?;
        if stats.id.is_some_and(|id| id.is_nil()) {
            return Err(Error::validation("Queue stats id must not be nil"));
        }
        Ok(())
    }
}

impl DataValidator<QueueStats> for QueueStatsValidator {
    fn validate<'a>(
        &'a self,
        stats: &'a QueueStats,
        owner: fn(&QueueStats) -> TenantId,
    ) -> ValidationFuture<'a> {
        Box::pin(async move {
            let owner = owner(stats);
            Self::validate_fields(stats, owner)?;

            if let Some(id) = stats.id {
                if let Some(existing) = self.store.find_by_id(owner, id).await? {
                    if existing.tenant_id != owner {
                        return Err(Error::validation(
                            "Queue stats can't be reassigned to another tenant!",
                        ));
                    }
                }
            }

            let clash = self
                .store
                .find_by_composite_key(owner, &stats.queue_name, &stats.service_id)
                .await?;
            if let Some(clash) = clash {
                if clash.id != stats.id {
                    return Err(Error::validation(format!(
                        "Queue stats with queue name '{}' and service id '{}' already exists!",
                        stats.queue_name, stats.service_id
                    )));
                }
            }

            Ok(())
        })
    }
}
