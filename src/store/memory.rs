//! In-memory queue stats storage.
//!
//! Reads go straight to a concurrent hash map. Writes are serialized so the
//! composite key check and the insert happen as one step.

use std::{
    future::ready,
    sync::{Arc, Mutex},
};

use crate::{
    error::Error,
    id::{QueueStatsId, TenantId},
    page::{fold_search, Direction, PageData, PageLink, SortProperty},
    queue_stats::QueueStats,
};

use super::{now_millis, QueueStatsStore, StoreFuture};

#[derive(Clone)]
pub struct InMemoryQueueStatsStore {
    records: Arc<papaya::HashMap<QueueStatsId, QueueStats>>,
    writes: Arc<Mutex<()>>,
}

impl Default for InMemoryQueueStatsStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryQueueStatsStore {
    pub fn new() -> Self {
        Self {
            records: Arc::new(papaya::HashMap::new()),
            writes: Arc::new(Mutex::new(())),
        }
    }

    fn owned_by(&self, tenant_id: TenantId) -> Vec<QueueStats> {
        self.records
            .pin()
            .iter()
            .filter(|(_, stats)| stats.tenant_id == tenant_id)
            .map(|(_, stats)| stats.clone())
            .collect()
    }

    fn save_sync(&self, stats: QueueStats) -> Result<QueueStats, Error> {
        let _write = self
            .writes
            .lock()
            .map_err(|_| Error::internal(eyre::eyre!("queue stats write lock poisoned")))?;

        let records = self.records.pin();
        let id = stats.id.unwrap_or_else(QueueStatsId::random);

        let duplicate = records.iter().any(|(other_id, other)| {
            *other_id != id && other.matches(stats.tenant_id, &stats.queue_name, &stats.service_id)
        });
        if duplicate {
            return Err(Error::internal(eyre::eyre!(
                "unique constraint queue_stats_name_unq_key violated for tenant {}, queue {}, service {}",
                stats.tenant_id,
                stats.queue_name,
                stats.service_id
            )));
        }

        let created_time = match records.get(&id) {
            Some(existing) => existing.created_time,
            None if stats.created_time > 0 => stats.created_time,
            None => now_millis(),
        };

        let saved = QueueStats {
            id: Some(id),
            created_time,
            ..stats
        };
        records.insert(id, saved.clone());

        Ok(saved)
    }

    fn delete_all_sync(&self, tenant_id: TenantId) -> Result<u64, Error> {
        let _write = self
            .writes
            .lock()
            .map_err(|_| Error::internal(eyre::eyre!("queue stats write lock poisoned")))?;

        let records = self.records.pin();
        let doomed: Vec<QueueStatsId> = records
            .iter()
            .filter(|(_, stats)| stats.tenant_id == tenant_id)
            .map(|(id, _)| *id)
            .collect();

        for id in &doomed {
            records.remove(id);
        }

        Ok(doomed.len() as u64)
    }

    fn delete_by_id_sync(&self, tenant_id: TenantId, id: QueueStatsId) -> Result<bool, Error> {
        let _write = self
            .writes
            .lock()
            .map_err(|_| Error::internal(eyre::eyre!("queue stats write lock poisoned")))?;

        let records = self.records.pin();
        let owned = records
            .get(&id)
            .is_some_and(|stats| stats.tenant_id == tenant_id);
        if owned {
            records.remove(&id);
        }

        Ok(owned)
    }

    fn page_sync(&self, tenant_id: TenantId, link: &PageLink) -> PageData<QueueStats> {
        let needle = link.search_needle();
        let mut matching: Vec<QueueStats> = self
            .owned_by(tenant_id)
            .into_iter()
            .filter(|stats| match &needle {
                Some(needle) => fold_search(&stats.queue_name).contains(needle.as_str()),
                None => true,
            })
            .collect();

        matching.sort_by(|a, b| {
            let ord = match link.sort_order.property {
                SortProperty::CreatedTime => a.created_time.cmp(&b.created_time),
                SortProperty::QueueName => a.queue_name.cmp(&b.queue_name),
                SortProperty::ServiceId => a.service_id.cmp(&b.service_id),
            };
            let ord = match link.sort_order.direction {
                Direction::Asc => ord,
                Direction::Desc => ord.reverse(),
            };
            ord.then_with(|| a.id.cmp(&b.id))
        });

        let total = matching.len() as u64;
        let offset = usize::try_from(link.offset()).unwrap_or(usize::MAX);
        let data = matching
            .into_iter()
            .skip(offset)
            .take(link.page_size as usize)
            .collect();

        PageData::new(data, total, link)
    }
}

impl QueueStatsStore for InMemoryQueueStatsStore {
    fn save(&self, tenant_id: TenantId, stats: QueueStats) -> StoreFuture<'_, QueueStats> {
        tracing::debug!(%tenant_id, "Saving queue stats in memory");
        Box::pin(ready(self.save_sync(stats)))
    }

    fn find_by_id(
        &self,
        _tenant_id: TenantId,
        id: QueueStatsId,
    ) -> StoreFuture<'_, Option<QueueStats>> {
        let found = self.records.pin().get(&id).cloned();
        Box::pin(ready(Ok(found)))
    }

    fn find_by_composite_key<'a>(
        &'a self,
        tenant_id: TenantId,
        queue_name: &'a str,
        service_id: &'a str,
    ) -> StoreFuture<'a, Option<QueueStats>> {
        let found = self
            .records
            .pin()
            .iter()
            .find(|(_, stats)| stats.matches(tenant_id, queue_name, service_id))
            .map(|(_, stats)| stats.clone());
        Box::pin(ready(Ok(found)))
    }

    fn find_all_by_owner(&self, tenant_id: TenantId) -> StoreFuture<'_, Vec<QueueStats>> {
        Box::pin(ready(Ok(self.owned_by(tenant_id))))
    }

    fn delete_all_by_owner(&self, tenant_id: TenantId) -> StoreFuture<'_, u64> {
        Box::pin(ready(self.delete_all_sync(tenant_id)))
    }

    fn find_page<'a>(
        &'a self,
        tenant_id: TenantId,
        link: &'a PageLink,
    ) -> StoreFuture<'a, PageData<QueueStats>> {
        Box::pin(ready(Ok(self.page_sync(tenant_id, link))))
    }

    fn find_by_ids<'a>(
        &'a self,
        tenant_id: TenantId,
        ids: &'a [QueueStatsId],
    ) -> StoreFuture<'a, Vec<QueueStats>> {
        let records = self.records.pin();
        let found: Vec<QueueStats> = ids
            .iter()
            .filter_map(|id| records.get(id))
            .filter(|stats| stats.tenant_id == tenant_id)
            .cloned()
            .collect();
        Box::pin(ready(Ok(found)))
    }

    fn delete_by_id(&self, tenant_id: TenantId, id: QueueStatsId) -> StoreFuture<'_, bool> {
        Box::pin(ready(self.delete_by_id_sync(tenant_id, id)))
    }
}
