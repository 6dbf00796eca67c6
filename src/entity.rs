//! Generic entity lookup.
//!
//! Entity services register one lookup function per [`EntityType`] tag in an
//! [`EntityRegistry`]. Callers that only hold an [`EntityId`] resolve it
//! through the registry and get back an [`Entity`] variant.

use std::{collections::HashMap, future::Future, pin::Pin, sync::Arc};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::Error,
    id::{QueueStatsId, TenantId},
    queue_stats::QueueStats,
};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityType {
    QueueStats,
}

/// An untyped reference to any entity: a type tag plus its UUID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityId {
    pub entity_type: EntityType,
    pub id: Uuid,
}

impl EntityId {
    pub fn new(entity_type: EntityType, id: Uuid) -> Self {
        Self { entity_type, id }
    }
}

impl From<QueueStatsId> for EntityId {
    fn from(id: QueueStatsId) -> Self {
        Self::new(EntityType::QueueStats, id.uuid())
    }
}

impl TryFrom<EntityId> for QueueStatsId {
    type Error = Error;

    fn try_from(id: EntityId) -> Result<Self, Self::Error> {
        match id.entity_type {
            EntityType::QueueStats => Ok(QueueStatsId::new(id.id)),
        }
    }
}

/// Anything that can report its own generic identity.
pub trait HasId {
    fn entity_id(&self) -> Option<EntityId>;
}

impl HasId for QueueStats {
    fn entity_id(&self) -> Option<EntityId> {
        self.id.map(EntityId::from)
    }
}

/// A resolved entity of any registered type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "entityType", content = "entity", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Entity {
    QueueStats(QueueStats),
}

impl Entity {
    pub fn entity_type(&self) -> EntityType {
        match self {
            Self::QueueStats(_) => EntityType::QueueStats,
        }
    }

    pub fn tenant_id(&self) -> TenantId {
        match self {
            Self::QueueStats(stats) => stats.tenant_id,
        }
    }

    pub fn into_queue_stats(self) -> Option<QueueStats> {
        match self {
            Self::QueueStats(stats) => Some(stats),
        }
    }
}

impl HasId for Entity {
    fn entity_id(&self) -> Option<EntityId> {
        match self {
            Self::QueueStats(stats) => stats.entity_id(),
        }
    }
}

pub type EntityFuture = Pin<Box<dyn Future<Output = Result<Option<Entity>, Error>> + Send>>;

/// Resolves an entity id of one type for a tenant.
pub type EntityLookup = Arc<dyn Fn(TenantId, EntityId) -> EntityFuture + Send + Sync>;

/// Maps entity type tags to the lookup function of the owning service.
#[derive(Clone, Default)]
pub struct EntityRegistry {
    lookups: HashMap<EntityType, EntityLookup>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the lookup for `entity_type`, replacing any previous one.
    pub fn register(&mut self, entity_type: EntityType, lookup: EntityLookup) -> &mut Self {
        tracing::debug!("Registering entity lookup for {entity_type}");
        self.lookups.insert(entity_type, lookup);
        self
    }

    pub async fn find_entity(
        &self,
        tenant_id: TenantId,
        entity_id: EntityId,
    ) -> Result<Option<Entity>, Error> {
        let lookup = self
            .lookups
            .get(&entity_id.entity_type)
            .cloned()
            .ok_or_else(|| {
                Error::invalid_argument(format!(
                    "No entity service registered for entity type {}",
                    entity_id.entity_type
                ))
            })?;

        lookup(tenant_id, entity_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_type_names() {
        assert_eq!(EntityType::QueueStats.to_string(), "QUEUE_STATS");
        assert_eq!(
            "QUEUE_STATS".parse::<EntityType>().unwrap(),
            EntityType::QueueStats
        );
        assert!("DEVICE".parse::<EntityType>().is_err());
    }

    #[test]
    fn test_queue_stats_id_round_trip() {
        let id = QueueStatsId::random();
        let entity_id = EntityId::from(id);
        assert_eq!(entity_id.entity_type, EntityType::QueueStats);
        assert_eq!(QueueStatsId::try_from(entity_id).unwrap(), id);
    }

    #[tokio::test]
    async fn test_unregistered_type_is_invalid_argument() {
        let registry = EntityRegistry::new();
        let err = registry
            .find_entity(
                TenantId::random(),
                EntityId::new(EntityType::QueueStats, Uuid::new_v4()),
            )
            .await
            .unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[tokio::test]
    async fn test_dispatches_by_tag() {
        let tenant = TenantId::random();
        let stats = QueueStats::builder()
            .id(QueueStatsId::random())
            .tenant_id(tenant)
            .queue_name("Main")
            .service_id("svc")
            .build();

        let mut registry = EntityRegistry::new();
        let stored = stats.clone();
        registry.register(
            EntityType::QueueStats,
            Arc::new(move |_: TenantId, _: EntityId| -> EntityFuture {
                let stored = stored.clone();
                Box::pin(async move { Ok(Some(Entity::QueueStats(stored))) })
            }),
        );

        let found = registry
            .find_entity(tenant, stats.entity_id().unwrap())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(found.entity_type(), EntityType::QueueStats);
        assert_eq!(found.entity_id(), stats.entity_id());
        assert_eq!(found.into_queue_stats(), Some(stats));
    }
}
