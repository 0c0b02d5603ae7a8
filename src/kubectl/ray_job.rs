use serde::Deserialize;

use super::ResourceMetadata;
use crate::status::DeploymentStatus;

#[derive(Debug, Deserialize)]
/// https://github.com/ray-project/kuberay/blob/master/docs/reference/api.md#rayjob
pub struct RayJob {
    pub metadata: ResourceMetadata,
    #[serde(default)]
    pub status: RemoteStatusDocument,
}

/// The `status` object of a RayJob as reported by the control plane.
///
/// KubeRay fills the status in gradually and the schema drifts between releases, so nothing is deserialized eagerly.
/// Every accessor returns `None` when a field is absent or has an unexpected shape, while [`RemoteStatusDocument::raw`]
/// keeps the payload as it was received.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct RemoteStatusDocument(serde_json::Value);

impl RemoteStatusDocument {
    pub fn new(status: serde_json::Value) -> Self {
        Self(status)
    }

    /// Takes the `status` field of a full RayJob resource.
    pub fn from_resource(mut resource: serde_json::Value) -> Self {
        Self(
            resource
                .get_mut("status")
                .map(serde_json::Value::take)
                .unwrap_or_default(),
        )
    }

    pub fn raw(&self) -> &serde_json::Value {
        &self.0
    }

    fn str_field(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(serde_json::Value::as_str)
    }

    pub fn deployment_status(&self) -> DeploymentStatus {
        DeploymentStatus::from_token(self.str_field("jobDeploymentStatus"))
    }

    pub fn job_id(&self) -> Option<&str> {
        self.str_field("jobId")
    }

    pub fn raw_start_time(&self) -> Option<&str> {
        self.str_field("startTime")
    }

    pub fn start_time(&self) -> Option<time::OffsetDateTime> {
        parse_rfc3339(self.raw_start_time()?)
    }

    pub fn raw_end_time(&self) -> Option<&str> {
        self.str_field("endTime")
    }

    pub fn end_time(&self) -> Option<time::OffsetDateTime> {
        parse_rfc3339(self.raw_end_time()?)
    }

    pub fn failed(&self) -> Option<u64> {
        self.0.get("failed").and_then(serde_json::Value::as_u64)
    }

    pub fn succeeded(&self) -> Option<u64> {
        self.0.get("succeeded").and_then(serde_json::Value::as_u64)
    }

    pub fn dashboard_url(&self) -> Option<&str> {
        self.str_field("dashboardURL")
    }

    /// The RayCluster bound to the job. An empty name counts as unbound.
    pub fn ray_cluster_name(&self) -> Option<&str> {
        self.str_field("rayClusterName")
            .filter(|name| !name.is_empty())
    }

    fn ray_cluster_status_field(&self, key: &str) -> Option<String> {
        match self.0.get("rayClusterStatus")?.get(key)? {
            serde_json::Value::String(value) => Some(value.clone()),
            serde_json::Value::Number(value) => Some(value.to_string()),
            _ => None,
        }
    }

    /// Total CPU requested by the bound RayCluster as a Kubernetes quantity, e.g. `"2"` or `"500m"`.
    pub fn desired_cpu(&self) -> Option<String> {
        self.ray_cluster_status_field("desiredCPU")
    }

    /// Total memory requested by the bound RayCluster as a Kubernetes quantity, e.g. `"4Gi"`.
    pub fn desired_memory(&self) -> Option<String> {
        self.ray_cluster_status_field("desiredMemory")
    }
}

fn parse_rfc3339(value: &str) -> Option<time::OffsetDateTime> {
    time::OffsetDateTime::parse(value, &time::format_description::well_known::Rfc3339).ok()
}
