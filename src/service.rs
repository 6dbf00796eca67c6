use std::sync::Arc;

use crate::{
    config::{Config, StorageKind},
    entity::{Entity, EntityFuture, EntityId, EntityLookup, EntityType},
    error::Error,
    id::{QueueStatsId, TenantId},
    page::{PageData, PageLink},
    queue_stats::QueueStats,
    store::{memory::InMemoryQueueStatsStore, sqlite::SqliteQueueStatsStore, QueueStatsStore},
    validation::{
        validate_queue_stats_id, validate_queue_stats_ids, validate_tenant_id, DataValidator,
        QueueStatsValidator,
    },
};

/// Tenant-scoped CRUD over queue stats.
///
/// Writes are validated first; reads check their identifiers first. Store
/// errors are returned as they are. The service keeps no state of its own, so
/// clones share the same store and validator.
#[derive(Clone)]
pub struct QueueStatsService {
    store: Arc<dyn QueueStatsStore>,
    validator: Arc<dyn DataValidator<QueueStats>>,
}

impl QueueStatsService {
    pub fn new(
        store: Arc<dyn QueueStatsStore>,
        validator: Arc<dyn DataValidator<QueueStats>>,
    ) -> Self {
        Self { store, validator }
    }

    /// Builds a service whose validator reads from the same store.
    pub fn with_store(store: Arc<dyn QueueStatsStore>) -> Self {
        let validator = Arc::new(QueueStatsValidator::new(store.clone()));
        Self::new(store, validator)
    }

    /// Opens the store selected by `config`. SQLite stores are migrated first.
    pub async fn connect_with(config: &Config) -> eyre::Result<Self> {
        let store: Arc<dyn QueueStatsStore> = match config.storage {
            StorageKind::Sqlite => Arc::new(SqliteQueueStatsStore::connect_with(config).await?),
            StorageKind::Memory => Arc::new(InMemoryQueueStatsStore::new()),
        };
        tracing::info!(storage = ?config.storage, "Queue stats store ready");
        Ok(Self::with_store(store))
    }

    pub fn entity_type(&self) -> EntityType {
        EntityType::QueueStats
    }

    pub async fn save(&self, tenant_id: TenantId, stats: QueueStats) -> Result<QueueStats, Error> {
        tracing::trace!("Executing save [{:?}]", stats);
        if stats.tenant_id != tenant_id {
            return Err(Error::validation(format!(
                "Queue stats belong to tenant {} and can't be saved by tenant {tenant_id}",
                stats.tenant_id
            )));
        }
        self.validator.validate(&stats, QueueStats::tenant_id).await?;
        self.store.save(tenant_id, stats).await
    }

    pub async fn find_by_id(
        &self,
        tenant_id: TenantId,
        id: QueueStatsId,
    ) -> Result<Option<QueueStats>, Error> {
        tracing::trace!("Executing find_by_id [{id}]");
        validate_queue_stats_id(id)?;
        self.store.find_by_id(tenant_id, id).await
    }

    pub async fn find_by_owner_name_and_service(
        &self,
        tenant_id: TenantId,
        queue_name: &str,
        service_id: &str,
    ) -> Result<Option<QueueStats>, Error> {
        tracing::trace!(
            "Executing find_by_owner_name_and_service, tenant_id: [{tenant_id}], queue_name: [{queue_name}], service_id: [{service_id}]"
        );
        validate_tenant_id(tenant_id)?;
        self.store
            .find_by_composite_key(tenant_id, queue_name, service_id)
            .await
    }

    pub async fn find_all_by_tenant(&self, tenant_id: TenantId) -> Result<Vec<QueueStats>, Error> {
        tracing::trace!("Executing find_all_by_tenant, tenant_id: [{tenant_id}]");
        validate_tenant_id(tenant_id)?;
        self.store.find_all_by_owner(tenant_id).await
    }

    pub async fn delete_all_by_tenant(&self, tenant_id: TenantId) -> Result<(), Error> {
        tracing::trace!("Executing delete_all_by_tenant, tenant_id: [{tenant_id}]");
        validate_tenant_id(tenant_id)?;
        self.store.delete_all_by_owner(tenant_id).await?;
        Ok(())
    }

    pub async fn find_by_tenant_paged(
        &self,
        tenant_id: TenantId,
        link: &PageLink,
    ) -> Result<PageData<QueueStats>, Error> {
        tracing::trace!("Executing find_by_tenant_paged, tenant_id: [{tenant_id}], link: [{link:?}]");
        validate_tenant_id(tenant_id)?;
        link.validate()?;
        self.store.find_page(tenant_id, link).await
    }

    pub async fn find_by_ids(
        &self,
        tenant_id: TenantId,
        ids: &[QueueStatsId],
    ) -> Result<Vec<QueueStats>, Error> {
        tracing::trace!("Executing find_by_ids, tenant_id: [{tenant_id}], ids: [{ids:?}]");
        validate_tenant_id(tenant_id)?;
        validate_queue_stats_ids(ids)?;
        self.store.find_by_ids(tenant_id, ids).await
    }

    pub async fn delete_by_id(&self, tenant_id: TenantId, id: QueueStatsId) -> Result<(), Error> {
        tracing::trace!("Executing delete_by_id, tenant_id: [{tenant_id}], id: [{id}]");
        validate_tenant_id(tenant_id)?;
        validate_queue_stats_id(id)?;
        self.store.delete_by_id(tenant_id, id).await?;
        Ok(())
    }

    /// Resolves a generic entity id that must refer to queue stats.
    pub async fn find_entity(
        &self,
        tenant_id: TenantId,
        entity_id: EntityId,
    ) -> Result<Option<Entity>, Error> {
        let id = QueueStatsId::try_from(entity_id)?;
        Ok(self
            .find_by_id(tenant_id, id)
            .await?
            .map(Entity::QueueStats))
    }

    /// Lookup function to register under [`EntityType::QueueStats`].
    pub fn entity_lookup(&self) -> EntityLookup {
        let service = self.clone();
        Arc::new(move |tenant_id: TenantId, entity_id: EntityId| -> EntityFuture {
            let service = service.clone();
            Box::pin(async move { service.find_entity(tenant_id, entity_id).await })
        })
    }
}
