use actix_web::{
    delete, get, post,
    web::{self, Data, Json},
    HttpResponse, Responder,
};
use serde::Deserialize;

use crate::{
    error::Error,
    id::QueueStatsId,
    page::{Direction, PageLink, SortOrder, SortProperty},
    queue_stats::QueueStats,
    service::QueueStatsService,
};

use super::parse_tenant;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery {
    page_size: u32,
    #[serde(default)]
    page: u32,
    text_search: Option<String>,
    sort_property: Option<SortProperty>,
    sort_order: Option<Direction>,
}

impl From<PageQuery> for PageLink {
    fn from(query: PageQuery) -> Self {
        PageLink {
            page_size: query.page_size,
            page: query.page,
            text_search: query.text_search,
            sort_order: SortOrder {
                property: query.sort_property.unwrap_or_default(),
                direction: query.sort_order.unwrap_or_default(),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupQuery {
    queue_name: String,
    service_id: String,
}

#[get("/queueStats")]
async fn list_queue_stats(
    service: Data<QueueStatsService>,
    path: web::Path<String>,
) -> Result<impl Responder, Error> {
    let tenant_id = parse_tenant(&path)?;

    Ok(Json(service.find_all_by_tenant(tenant_id).await?))
}

#[get("/queueStats/page")]
async fn page_queue_stats(
    service: Data<QueueStatsService>,
    path: web::Path<String>,
    query: web::Query<PageQuery>,
) -> Result<impl Responder, Error> {
    let tenant_id = parse_tenant(&path)?;
    let link = PageLink::from(query.into_inner());

    Ok(Json(service.find_by_tenant_paged(tenant_id, &link).await?))
}

#[get("/queueStats/lookup")]
async fn lookup_queue_stats(
    service: Data<QueueStatsService>,
    path: web::Path<String>,
    query: web::Query<LookupQuery>,
) -> Result<impl Responder, Error> {
    let tenant_id = parse_tenant(&path)?;

    let stats = service
        .find_by_owner_name_and_service(tenant_id, &query.queue_name, &query.service_id)
        .await?
        .ok_or_else(|| {
            Error::not_found(format!(
                "queue stats for queue {} and service {}",
                query.queue_name, query.service_id
            ))
        })?;

    Ok(Json(stats))
}

#[get("/queueStats/{queue_stats_id}")]
async fn get_queue_stats(
    service: Data<QueueStatsService>,
    path: web::Path<(String, String)>,
) -> Result<impl Responder, Error> {
    let (tenant, id) = &*path;
    let tenant_id = parse_tenant(tenant)?;
    let id: QueueStatsId = id.parse()?;

    // The id lookup is not tenant scoped, so hide other tenants' records here.
    let stats = service
        .find_by_id(tenant_id, id)
        .await?
        .filter(|stats| stats.tenant_id == tenant_id)
        .ok_or_else(|| Error::queue_stats_not_found(id))?;

    Ok(Json(stats))
}

#[post("/queueStats")]
async fn save_queue_stats(
    service: Data<QueueStatsService>,
    path: web::Path<String>,
    body: Json<QueueStats>,
) -> Result<impl Responder, Error> {
    let tenant_id = parse_tenant(&path)?;

    Ok(Json(service.save(tenant_id, body.into_inner()).await?))
}

#[delete("/queueStats")]
async fn delete_tenant_queue_stats(
    service: Data<QueueStatsService>,
    path: web::Path<String>,
) -> Result<impl Responder, Error> {
    let tenant_id = parse_tenant(&path)?;

    service.delete_all_by_tenant(tenant_id).await?;

    Ok(HttpResponse::Ok())
}

#[delete("/queueStats/{queue_stats_id}")]
async fn delete_queue_stats(
    service: Data<QueueStatsService>,
    path: web::Path<(String, String)>,
) -> Result<impl Responder, Error> {
    let (tenant, id) = &*path;
    let tenant_id = parse_tenant(tenant)?;

    service.delete_by_id(tenant_id, id.parse()?).await?;

    Ok(HttpResponse::Ok())
}

/// Fixed paths are registered ahead of `/queueStats/{queue_stats_id}`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(list_queue_stats)
        .service(page_queue_stats)
        .service(lookup_queue_stats)
        .service(get_queue_stats)
        .service(save_queue_stats)
        .service(delete_tenant_queue_stats)
        .service(delete_queue_stats);
}
