use actix_web::{
    get,
    web::{self, Data, Json},
    Responder,
};
use uuid::Uuid;

use crate::{
    entity::{EntityId, EntityRegistry, EntityType},
    error::Error,
};

use super::parse_tenant;

#[get("/entity/{entity_type}/{entity_id}")]
async fn find_entity(
    registry: Data<EntityRegistry>,
    path: web::Path<(String, String, String)>,
) -> Result<impl Responder, Error> {
    let (tenant, entity_type, entity_id) = &*path;
    let tenant_id = parse_tenant(tenant)?;

    let entity_type: EntityType = entity_type
        .parse()
        .map_err(|_| Error::invalid_argument(format!("Unknown entity type {entity_type}")))?;
    let id = Uuid::parse_str(entity_id)
        .map_err(|_| Error::invalid_argument(format!("Incorrect entityId {entity_id}")))?;
    let entity_id = EntityId::new(entity_type, id);

    let entity = registry
        .find_entity(tenant_id, entity_id)
        .await?
        .filter(|entity| entity.tenant_id() == tenant_id)
        .ok_or_else(|| Error::not_found(format!("{entity_type} {id}")))?;

    Ok(Json(entity))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(find_entity);
}
