//! SQLite-backed queue stats storage.

use std::{str::FromStr, time::Duration};

use sqlx::{
    sqlite::{
        SqliteAutoVacuum, SqliteConnectOptions, SqliteJournalMode, SqliteLockingMode,
        SqlitePoolOptions,
    },
    types::Json,
    QueryBuilder, Sqlite, SqlitePool,
};
use tokio_stream::StreamExt;
use uuid::Uuid;

use crate::{
    config::Config,
    error::Error,
    id::{QueueStatsId, TenantId},
    page::{fold_search, PageData, PageLink},
    queue_stats::QueueStats,
};

use super::{now_millis, QueueStatsStore, StoreFuture};

const COLUMNS: &str = "id, created_time, tenant_id, queue_name, service_id, metrics";

/// Opens the connection pool described by `config`.
///
/// An in-memory database lives and dies with its connection, so in that mode
/// the pool holds exactly one connection and never recycles it.
pub async fn connect(config: &Config) -> Result<SqlitePool, Error> {
    let (opts, max_connections) = if config.in_memory {
        (SqliteConnectOptions::from_str("sqlite::memory:")?, 1)
    } else {
        (
            SqliteConnectOptions::new()
                .filename(config.db_path())
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal)
                .auto_vacuum(SqliteAutoVacuum::Full),
            10,
        )
    };

    let opts = opts
        .foreign_keys(true)
        .locking_mode(SqliteLockingMode::Normal)
        .optimize_on_close(true, None);

    let mut pool_opts = SqlitePoolOptions::new().max_connections(max_connections);
    if config.in_memory {
        pool_opts = pool_opts
            .idle_timeout(Option::<Duration>::None)
            .max_lifetime(Option::<Duration>::None);
    }

    let pool = pool_opts.connect_with(opts).await?;

    Ok(pool)
}

/// Stores queue stats in the `queue_stats` table.
#[derive(Clone)]
pub struct SqliteQueueStatsStore {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct QueueStatsRow {
    id: Uuid,
    created_time: i64,
    tenant_id: Uuid,
    queue_name: String,
    service_id: String,
    metrics: Json<serde_json::Value>,
}

impl From<QueueStatsRow> for QueueStats {
    fn from(row: QueueStatsRow) -> Self {
        Self {
            id: Some(QueueStatsId::new(row.id)),
            created_time: row.created_time,
            tenant_id: TenantId::new(row.tenant_id),
            queue_name: row.queue_name,
            service_id: row.service_id,
            metrics: row.metrics.0,
        }
    }
}

impl SqliteQueueStatsStore {
    /// Wraps `pool` and brings the schema up to date.
    pub async fn new(pool: SqlitePool) -> Result<Self, Error> {
        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    pub async fn connect_with(config: &Config) -> Result<Self, Error> {
        Self::new(connect(config).await?).await
    }
}

fn escape_like(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len() + 2);
    escaped.push('%');
    for c in needle.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

fn push_page_filter<'a>(
    query: &mut QueryBuilder<'a, Sqlite>,
    tenant_id: TenantId,
    link: &PageLink,
) {
    query.push(" WHERE tenant_id = ").push_bind(tenant_id.uuid());

    if let Some(needle) = link.search_needle() {
        query
            .push(" AND queue_name_search LIKE ")
            .push_bind(escape_like(&needle))
            .push(" ESCAPE '\\'");
    }
}

impl QueueStatsStore for SqliteQueueStatsStore {
    fn save(&self, tenant_id: TenantId, stats: QueueStats) -> StoreFuture<'_, QueueStats> {
        let pool = self.pool.clone();
        Box::pin(async move {
            let id = stats.id.unwrap_or_else(QueueStatsId::random);
            let created_time = if stats.created_time > 0 {
                stats.created_time
            } else {
                now_millis()
            };

            let row: QueueStatsRow = sqlx::query_as(
                "
                INSERT INTO queue_stats
                    (id, created_time, tenant_id, queue_name, queue_name_search, service_id, metrics)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                ON CONFLICT (id) DO UPDATE SET
                    tenant_id = excluded.tenant_id,
                    queue_name = excluded.queue_name,
                    queue_name_search = excluded.queue_name_search,
                    service_id = excluded.service_id,
                    metrics = excluded.metrics
                RETURNING id, created_time, tenant_id, queue_name, service_id, metrics
                ",
            )
            .bind(id.uuid())
            .bind(created_time)
            .bind(stats.tenant_id.uuid())
            .bind(&stats.queue_name)
            .bind(fold_search(&stats.queue_name))
            .bind(&stats.service_id)
            .bind(Json(&stats.metrics))
            .fetch_one(&pool)
            .await?;

            tracing::debug!(%tenant_id, queue_stats_id = %id, "Saved queue stats");

            Ok(row.into())
        })
    }

    fn find_by_id(
        &self,
        tenant_id: TenantId,
        id: QueueStatsId,
    ) -> StoreFuture<'_, Option<QueueStats>> {
        let pool = self.pool.clone();
        Box::pin(async move {
            tracing::trace!(%tenant_id, queue_stats_id = %id, "Loading queue stats");

            let row: Option<QueueStatsRow> =
                sqlx::query_as(&format!("SELECT {COLUMNS} FROM queue_stats WHERE id = $1"))
                    .bind(id.uuid())
                    .fetch_optional(&pool)
                    .await?;

            Ok(row.map(QueueStats::from))
        })
    }

    fn find_by_composite_key<'a>(
        &'a self,
        tenant_id: TenantId,
        queue_name: &'a str,
        service_id: &'a str,
    ) -> StoreFuture<'a, Option<QueueStats>> {
        Box::pin(async move {
            let row: Option<QueueStatsRow> = sqlx::query_as(&format!(
                "SELECT {COLUMNS} FROM queue_stats
                 WHERE tenant_id = $1 AND queue_name = $2 AND service_id = $3"
            ))
            .bind(tenant_id.uuid())
            .bind(queue_name)
            .bind(service_id)
            .fetch_optional(&self.pool)
            .await?;

            Ok(row.map(QueueStats::from))
        })
    }

    fn find_all_by_owner(&self, tenant_id: TenantId) -> StoreFuture<'_, Vec<QueueStats>> {
        Box::pin(async move {
            let query = format!("SELECT {COLUMNS} FROM queue_stats WHERE tenant_id = $1");
            let mut stream = sqlx::query_as::<_, QueueStatsRow>(&query)
                .bind(tenant_id.uuid())
                .fetch(&self.pool);

            let mut stats = Vec::new();

            while let Some(row) = stream.next().await.transpose()? {
                stats.push(row.into());
            }

            Ok(stats)
        })
    }

    fn delete_all_by_owner(&self, tenant_id: TenantId) -> StoreFuture<'_, u64> {
        let pool = self.pool.clone();
        Box::pin(async move {
            let deleted = sqlx::query("DELETE FROM queue_stats WHERE tenant_id = $1")
                .bind(tenant_id.uuid())
                .execute(&pool)
                .await?
                .rows_affected();

            tracing::debug!(%tenant_id, deleted, "Deleted queue stats of tenant");

            Ok(deleted)
        })
    }

    fn find_page<'a>(
        &'a self,
        tenant_id: TenantId,
        link: &'a PageLink,
    ) -> StoreFuture<'a, PageData<QueueStats>> {
        Box::pin(async move {
            let mut count = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM queue_stats");
            push_page_filter(&mut count, tenant_id, link);
            let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

            let mut select = QueryBuilder::<Sqlite>::new(format!("SELECT {COLUMNS} FROM queue_stats"));
            push_page_filter(&mut select, tenant_id, link);
            select
                .push(format!(
                    " ORDER BY {} {}, id",
                    link.sort_order.property, link.sort_order.direction
                ))
                .push(" LIMIT ")
                .push_bind(i64::from(link.page_size))
                .push(" OFFSET ")
                // An offset beyond i64 is past the end of any table.
                .push_bind(i64::try_from(link.offset()).unwrap_or(i64::MAX));

            let rows: Vec<QueueStatsRow> = select.build_query_as().fetch_all(&self.pool).await?;

            Ok(PageData::new(
                rows.into_iter().map(QueueStats::from).collect(),
                u64::try_from(total).unwrap_or_default(),
                link,
            ))
        })
    }

    fn find_by_ids<'a>(
        &'a self,
        tenant_id: TenantId,
        ids: &'a [QueueStatsId],
    ) -> StoreFuture<'a, Vec<QueueStats>> {
        Box::pin(async move {
            if ids.is_empty() {
                return Ok(Vec::new());
            }

            let mut query = QueryBuilder::<Sqlite>::new(format!("SELECT {COLUMNS} FROM queue_stats"));
            query
                .push(" WHERE tenant_id = ")
                .push_bind(tenant_id.uuid())
                .push(" AND id IN (");

            let mut separated = query.separated(", ");
            for id in ids {
                separated.push_bind(id.uuid());
            }
            separated.push_unseparated(")");

            let rows: Vec<QueueStatsRow> = query.build_query_as().fetch_all(&self.pool).await?;

            Ok(rows.into_iter().map(QueueStats::from).collect())
        })
    }

    fn delete_by_id(&self, tenant_id: TenantId, id: QueueStatsId) -> StoreFuture<'_, bool> {
        let pool = self.pool.clone();
        Box::pin(async move {
            let deleted = sqlx::query("DELETE FROM queue_stats WHERE tenant_id = $1 AND id = $2")
                .bind(tenant_id.uuid())
                .bind(id.uuid())
                .execute(&pool)
                .await?
                .rows_affected();

            Ok(deleted > 0)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::{Direction, SortOrder, SortProperty};

    async fn setup() -> SqliteQueueStatsStore {
        let pool = connect(&Config::in_memory()).await.unwrap();
        SqliteQueueStatsStore::new(pool).await.unwrap()
    }

    fn stats(tenant: TenantId, queue: &str, service: &str) -> QueueStats {
        QueueStats::builder()
            .tenant_id(tenant)
            .queue_name(queue)
            .service_id(service)
            .metrics(serde_json::json!({ "msgsTotal": 1 }))
            .build()
    }

    #[tokio::test]
    async fn test_save_assigns_id_and_created_time() {
        let store = setup().await;
        let tenant = TenantId::random();

        let saved = store.save(tenant, stats(tenant, "Main", "svc1")).await.unwrap();

        assert!(saved.id.is_some());
        assert!(saved.created_time > 0);
        assert_eq!(saved.metrics["msgsTotal"], 1);

        let loaded = store
            .find_by_id(tenant, saved.id.unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded, saved);
    }

    #[tokio::test]
    async fn test_save_updates_in_place() {
        let store = setup().await;
        let tenant = TenantId::random();

        let saved = store.save(tenant, stats(tenant, "Main", "svc1")).await.unwrap();

        let mut changed = saved.clone();
        changed.metrics = serde_json::json!({ "msgsTotal": 42 });
        changed.created_time = 0;
        let updated = store.save(tenant, changed).await.unwrap();

        assert_eq!(updated.id, saved.id);
        assert_eq!(updated.created_time, saved.created_time);
        assert_eq!(updated.metrics["msgsTotal"], 42);
        assert_eq!(store.find_all_by_owner(tenant).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_save_with_unknown_id_inserts() {
        let store = setup().await;
        let tenant = TenantId::random();
        let id = QueueStatsId::random();

        let mut record = stats(tenant, "Main", "svc1");
        record.id = Some(id);
        let saved = store.save(tenant, record).await.unwrap();

        assert_eq!(saved.id, Some(id));
    }

    #[tokio::test]
    async fn test_unique_composite_key() {
        let store = setup().await;
        let tenant = TenantId::random();

        store.save(tenant, stats(tenant, "Main", "svc1")).await.unwrap();
        let err = store
            .save(tenant, stats(tenant, "Main", "svc1"))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Sqlx { .. }));
    }

    #[tokio::test]
    async fn test_composite_key_lookup_is_tenant_scoped() {
        let store = setup().await;
        let tenant = TenantId::random();
        let other = TenantId::random();

        let saved = store.save(tenant, stats(tenant, "Main", "svc1")).await.unwrap();
        store.save(other, stats(other, "Main", "svc1")).await.unwrap();

        let found = store
            .find_by_composite_key(tenant, "Main", "svc1")
            .await
            .unwrap();
        assert_eq!(found, Some(saved));

        assert_eq!(
            store
                .find_by_composite_key(tenant, "Main", "svc2")
                .await
                .unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_delete_all_by_owner() {
        let store = setup().await;
        let tenant = TenantId::random();
        let other = TenantId::random();

        store.save(tenant, stats(tenant, "Main", "svc1")).await.unwrap();
        store.save(tenant, stats(tenant, "Main", "svc2")).await.unwrap();
        store.save(other, stats(other, "Main", "svc1")).await.unwrap();

        assert_eq!(store.delete_all_by_owner(tenant).await.unwrap(), 2);
        assert!(store.find_all_by_owner(tenant).await.unwrap().is_empty());
        assert_eq!(store.find_all_by_owner(other).await.unwrap().len(), 1);

        assert_eq!(store.delete_all_by_owner(tenant).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_find_page() {
        let store = setup().await;
        let tenant = TenantId::random();

        for queue in ["Main", "HighPriority", "SequentialByOriginator", "main_backup"] {
            store.save(tenant, stats(tenant, queue, "svc1")).await.unwrap();
        }

        let link = PageLink::builder()
            .page_size(2)
            .sort_order(SortOrder {
                property: SortProperty::QueueName,
                direction: Direction::Asc,
            })
            .build();
        let first = store.find_page(tenant, &link).await.unwrap();
        assert_eq!(first.total_elements, 4);
        assert_eq!(first.total_pages, 2);
        assert!(first.has_next);
        assert_eq!(first.data[0].queue_name, "HighPriority");
        assert_eq!(first.data[1].queue_name, "Main");

        let search = PageLink::builder()
            .page_size(10)
            .text_search("MAIN".to_owned())
            .build();
        let found = store.find_page(tenant, &search).await.unwrap();
        assert_eq!(found.total_elements, 2);
        assert!(!found.has_next);
    }

    #[tokio::test]
    async fn test_find_page_escapes_wildcards() {
        let store = setup().await;
        let tenant = TenantId::random();

        store.save(tenant, stats(tenant, "main_backup", "svc1")).await.unwrap();
        store.save(tenant, stats(tenant, "mainXbackup", "svc1")).await.unwrap();

        let search = PageLink::builder()
            .page_size(10)
            .text_search("main_".to_owned())
            .build();
        let found = store.find_page(tenant, &search).await.unwrap();
        assert_eq!(found.total_elements, 1);
        assert_eq!(found.data[0].queue_name, "main_backup");
    }

    #[tokio::test]
    async fn test_find_by_ids_and_delete_by_id() {
        let store = setup().await;
        let tenant = TenantId::random();
        let other = TenantId::random();

        let a = store.save(tenant, stats(tenant, "A", "svc1")).await.unwrap();
        let b = store.save(tenant, stats(tenant, "B", "svc1")).await.unwrap();
        let foreign = store.save(other, stats(other, "C", "svc1")).await.unwrap();

        let ids = [a.id.unwrap(), b.id.unwrap(), foreign.id.unwrap()];
        let found = store.find_by_ids(tenant, &ids).await.unwrap();
        assert_eq!(found.len(), 2);
        assert!(store.find_by_ids(tenant, &[]).await.unwrap().is_empty());

        assert!(!store.delete_by_id(tenant, foreign.id.unwrap()).await.unwrap());
        assert!(store.delete_by_id(tenant, a.id.unwrap()).await.unwrap());
        assert!(!store.delete_by_id(tenant, a.id.unwrap()).await.unwrap());
        assert_eq!(store.find_all_by_owner(tenant).await.unwrap(), vec![b]);
    }
}
