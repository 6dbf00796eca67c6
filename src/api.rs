use actix_web::{web, Scope};

use crate::{error::Error, id::TenantId};

pub mod entity;
pub mod queue_stats;

/// All tenant-scoped routes, mounted under `/api/tenant/{tenant_id}`.
pub fn service() -> Scope {
    web::scope("/api/tenant/{tenant_id}")
        .configure(queue_stats::configure)
        .configure(entity::configure)
}

fn parse_tenant(raw: &str) -> Result<TenantId, Error> {
    raw.parse()
}
