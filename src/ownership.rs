//! Ties the resources provisioned for a RayJob to the RayJob, so the garbage collector of the control plane removes
//! them once the RayJob is deleted.

use std::{collections::BTreeMap, fmt};

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::{
    control_plane::{ControlPlane, ResourceHandle, ResourceKind},
    kubectl::label,
    Result,
};

/// https://kubernetes.io/docs/concepts/overview/working-with-objects/owners-dependents/
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerReference {
    pub api_version: String,
    pub kind: String,
    pub name: String,
    #[serde(default)]
    pub uid: String,
    #[serde(default)]
    pub controller: Option<bool>,
    #[serde(default)]
    pub block_owner_deletion: Option<bool>,
}

impl OwnerReference {
    /// A controlling owner reference that also blocks foreground deletion of the owner until the dependent is gone.
    pub fn controlled_by(kind: ResourceKind, owner: &ResourceHandle) -> Self {
        Self {
            api_version: kind.api_version().to_owned(),
            kind: kind.as_str().to_owned(),
            name: owner.name.clone(),
            uid: owner.uid.clone(),
            controller: Some(true),
            block_owner_deletion: Some(true),
        }
    }

    pub fn points_at(&self, kind: ResourceKind, name: &str) -> bool {
        self.api_version == kind.api_version() && self.kind == kind.as_str() && self.name == name
    }
}

pub const SCRIPTS_SUFFIX: &str = "-scripts";
pub const SCRIPTS_COMPONENT: &str = "rayjob-scripts";

pub fn scripts_artifact_name(job_name: &str) -> String {
    format!("{job_name}{SCRIPTS_SUFFIX}")
}

/// The ConfigMap holding the scripts referenced by a job's entrypoint. It only exists together with its owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigArtifact {
    pub name: String,
    pub namespace: String,
    pub job_name: String,
    pub scripts: BTreeMap<String, String>,
    pub owner: OwnerReference,
}

impl ConfigArtifact {
    pub fn for_job(job: &ResourceHandle, scripts: BTreeMap<String, String>) -> Self {
        Self {
            name: scripts_artifact_name(&job.name),
            namespace: job.namespace.clone(),
            job_name: job.name.clone(),
            scripts,
            owner: OwnerReference::controlled_by(ResourceKind::RayJob, job),
        }
    }

    pub fn manifest(&self) -> serde_json::Value {
        serde_json::json!({
            "apiVersion": ResourceKind::ConfigMap.api_version(),
            "kind": ResourceKind::ConfigMap.as_str(),
            "metadata": {
                "name": self.name,
                "namespace": self.namespace,
                "labels": {
                    (label::RAY_JOB_NAME): self.job_name,
                    (label::MANAGED_BY): label::MANAGED_BY_VALUE,
                    (label::COMPONENT): SCRIPTS_COMPONENT,
                },
                "ownerReferences": [self.owner],
            },
            "data": self.scripts,
        })
    }
}

/// What was still present when cleanup of a job was verified.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CleanupReport {
    pub job_present: bool,
    pub clusters: Vec<String>,
    pub artifacts: Vec<String>,
}

impl CleanupReport {
    pub fn is_clean(&self) -> bool {
        !self.job_present && self.clusters.is_empty() && self.artifacts.is_empty()
    }
}

impl fmt::Display for CleanupReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_clean() {
            return f.write_str("nothing left");
        }
        let remaining = self
            .job_present
            .then(|| "the RayJob".to_owned())
            .into_iter()
            .chain(self.clusters.iter().map(|name| format!("RayCluster {name}")))
            .chain(self.artifacts.iter().map(|name| format!("ConfigMap {name}")))
            .join(", ");
        write!(f, "remaining: {remaining}")
    }
}

/// Checks that the job, the RayCluster KubeRay created for it and its scripts artifact are all gone.
pub fn verify_cleanup(
    plane: &impl ControlPlane,
    job_name: &str,
    namespace: &str,
) -> Result<CleanupReport> {
    let job_present = plane.get(ResourceKind::RayJob, namespace, job_name)?.is_some();

    let clusters = plane
        .list(
            ResourceKind::RayCluster,
            namespace,
            &format!("{}={job_name}", label::ORIGINATED_FROM_CR_NAME),
        )?
        .iter()
        .filter_map(|cluster| cluster["metadata"]["name"].as_str().map(str::to_owned))
        .collect();

    let artifact_name = scripts_artifact_name(job_name);
    let artifacts = plane
        .get(ResourceKind::ConfigMap, namespace, &artifact_name)?
        .map(|_| artifact_name)
        .into_iter()
        .collect();

    Ok(CleanupReport {
        job_present,
        clusters,
        artifacts,
    })
}
