use serde::{Deserialize, Serialize};

use crate::id::{QueueStatsId, TenantId};

/// Accumulated metrics for one named processing queue, as reported by one
/// backend service instance of a tenant.
///
/// A record without an `id` has not been persisted yet; saving it assigns one.
/// The metric payload is opaque to this crate and stored as JSON.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, bon::Builder)]
#[serde(rename_all = "camelCase")]
pub struct QueueStats {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<QueueStatsId>,
    /// Milliseconds since the unix epoch, assigned on first insert.
    #[serde(default)]
    #[builder(default)]
    pub created_time: i64,
    pub tenant_id: TenantId,
    #[builder(into)]
    pub queue_name: String,
    #[builder(into)]
    pub service_id: String,
    #[serde(default)]
    #[builder(default)]
    pub metrics: serde_json::Value,
}

impl QueueStats {
    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    /// Returns true if this record carries the given composite key.
    pub fn matches(&self, tenant_id: TenantId, queue_name: &str, service_id: &str) -> bool {
        self.tenant_id == tenant_id && self.queue_name == queue_name && self.service_id == service_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_shape() {
        let tenant = TenantId::random();
        let stats = QueueStats::builder()
            .tenant_id(tenant)
            .queue_name("Main")
            .service_id("tb-rule-engine-0")
            .metrics(serde_json::json!({ "msgsTotal": 10 }))
            .build();

        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["tenantId"], serde_json::json!(tenant.to_string()));
        assert_eq!(json["queueName"], "Main");
        assert_eq!(json["serviceId"], "tb-rule-engine-0");
        assert_eq!(json["metrics"]["msgsTotal"], 10);
        assert!(json.get("id").is_none());
    }

    #[test]
    fn test_deserialize_without_id() {
        let tenant = TenantId::random();
        let stats: QueueStats = serde_json::from_value(serde_json::json!({
            "tenantId": tenant,
            "queueName": "HighPriority",
            "serviceId": "svc1",
        }))
        .unwrap();

        assert_eq!(stats.id, None);
        assert_eq!(stats.created_time, 0);
        assert!(stats.metrics.is_null());
        assert!(stats.matches(tenant, "HighPriority", "svc1"));
        assert!(!stats.matches(tenant, "HighPriority", "svc2"));
    }
}
