//! The description of a RayJob before it is submitted, and its rendering into manifests.

use std::collections::{BTreeMap, HashMap};

use crate::{
    control_plane::ResourceKind,
    fairness,
    kubectl::{self, label},
    Error, Result,
};

pub const DEFAULT_IMAGE: &str = "rayproject/ray:2.47.1";
pub const SCRIPTS_MOUNT: &str = "/home/ray/scripts";
const SCRIPTS_VOLUME: &str = "scripts";
const WORKER_GROUP_NAME: &str = "small-group";

/// Who the job is and what it runs. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobIdentity {
    name: String,
    namespace: String,
    entrypoint: String,
}

impl JobIdentity {
    pub fn new(
        name: impl Into<String>,
        namespace: impl Into<String>,
        entrypoint: impl Into<String>,
    ) -> Result<Self> {
        let identity = Self {
            name: name.into(),
            namespace: namespace.into(),
            entrypoint: entrypoint.into(),
        };
        kubectl::check_ray_job_name(&identity.name).map_err(Error::InvalidDescriptor)?;
        if identity.namespace.is_empty() {
            return Err(Error::InvalidDescriptor("namespace must not be empty".to_owned()));
        }
        if identity.entrypoint.trim().is_empty() {
            return Err(Error::InvalidDescriptor("entrypoint must not be empty".to_owned()));
        }
        Ok(identity)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn entrypoint(&self) -> &str {
        &self.entrypoint
    }
}

/// Requests and limits for the containers of one Ray node role, as Kubernetes quantities (`"1"`, `"500m"`, `"2Gi"`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleResources {
    pub cpu_requests: Option<String>,
    pub cpu_limits: Option<String>,
    pub memory_requests: Option<String>,
    pub memory_limits: Option<String>,
    pub gpus: u32,
}

impl RoleResources {
    fn to_json(&self) -> serde_json::Value {
        fn quantities(
            cpu: Option<&String>,
            memory: Option<&String>,
            gpus: u32,
        ) -> serde_json::Map<String, serde_json::Value> {
            let mut map = serde_json::Map::new();
            if let Some(cpu) = cpu {
                map.insert("cpu".to_owned(), cpu.as_str().into());
            }
            if let Some(memory) = memory {
                map.insert("memory".to_owned(), memory.as_str().into());
            }
            if gpus != 0 {
                map.insert("nvidia.com/gpu".to_owned(), gpus.to_string().into());
            }
            map
        }

        serde_json::json!({
            "requests": quantities(self.cpu_requests.as_ref(), self.memory_requests.as_ref(), self.gpus),
            "limits": quantities(self.cpu_limits.as_ref(), self.memory_limits.as_ref(), self.gpus),
        })
    }
}

/// A RayCluster provisioned for a single job and torn down with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterSpec {
    pub image: String,
    pub head: RoleResources,
    pub worker: RoleResources,
    pub num_workers: u32,
}

impl Default for ClusterSpec {
    fn default() -> Self {
        Self {
            image: DEFAULT_IMAGE.to_owned(),
            head: RoleResources::default(),
            worker: RoleResources::default(),
            num_workers: 1,
        }
    }
}

/// Where the job runs. A job either owns exactly one ephemeral cluster or targets one that already exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClusterBinding {
    Managed(ClusterSpec),
    Existing(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RayJob {
    identity: JobIdentity,
    cluster: ClusterBinding,
    env_vars: BTreeMap<String, String>,
    local_queue: Option<String>,
    scripts: BTreeMap<String, String>,
}

impl RayJob {
    pub fn new(identity: JobIdentity, cluster: ClusterBinding) -> Self {
        Self {
            identity,
            cluster,
            env_vars: BTreeMap::new(),
            local_queue: None,
            scripts: BTreeMap::new(),
        }
    }

    pub fn env_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_vars.insert(key.into(), value.into());
        self
    }

    pub fn env_vars(mut self, vars: impl IntoIterator<Item = (String, String)>) -> Self {
        self.env_vars.extend(vars);
        self
    }

    /// Binds the job to a Kueue `LocalQueue`.
    pub fn local_queue(mut self, queue: impl Into<String>) -> Self {
        self.local_queue = Some(queue.into());
        self
    }

    /// Ships a script with the job. Scripts are mounted into the working directory of the entrypoint.
    pub fn script(mut self, file_name: impl Into<String>, content: impl Into<String>) -> Self {
        self.scripts.insert(file_name.into(), content.into());
        self
    }

    pub fn name(&self) -> &str {
        self.identity.name()
    }

    pub fn namespace(&self) -> &str {
        self.identity.namespace()
    }

    pub fn queue(&self) -> Option<&str> {
        self.local_queue.as_deref()
    }

    pub fn scripts(&self) -> &BTreeMap<String, String> {
        &self.scripts
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: String| Err(Error::InvalidDescriptor(reason));

        match &self.cluster {
            ClusterBinding::Managed(spec) => {
                if spec.image.is_empty() {
                    return invalid("cluster image must not be empty".to_owned());
                }
                if spec.num_workers == 0 && spec.worker != RoleResources::default() {
                    return invalid("worker resources require at least one worker".to_owned());
                }
            }
            ClusterBinding::Existing(cluster_name) => {
                if !kubectl::is_rfc_1035_label(cluster_name) {
                    return invalid(format!("{cluster_name:?} is not a valid RayCluster name"));
                }
                if !self.scripts.is_empty() {
                    return invalid(
                        "scripts can only be shipped with a job that provisions its own cluster"
                            .to_owned(),
                    );
                }
            }
        }

        if let Some(key) = self.scripts.keys().find(|key| !kubectl::is_config_map_key(key)) {
            return invalid(format!(
                "script name {key:?} may only contain alphanumeric characters, '-', '_' and '.'"
            ));
        }

        if self.local_queue.as_deref().is_some_and(str::is_empty) {
            return invalid("queue name must not be empty".to_owned());
        }

        Ok(())
    }

    fn runtime_env_yaml(&self) -> Result<Option<String>> {
        #[derive(serde::Serialize)]
        struct RuntimeEnv<'a> {
            #[serde(skip_serializing_if = "Option::is_none")]
            working_dir: Option<&'a str>,
            #[serde(skip_serializing_if = "Option::is_none")]
            env_vars: Option<&'a BTreeMap<String, String>>,
        }

        let runtime_env = RuntimeEnv {
            working_dir: (!self.scripts.is_empty()).then_some(SCRIPTS_MOUNT),
            env_vars: (!self.env_vars.is_empty()).then_some(&self.env_vars),
        };

        if runtime_env.working_dir.is_none() && runtime_env.env_vars.is_none() {
            return Ok(None);
        }

        serde_yaml::to_string(&runtime_env)
            .map(Some)
            .map_err(|error| Error::InvalidDescriptor(format!("invalid runtime environment: {error}")))
    }

    fn volume_mounts(&self) -> serde_json::Value {
        if self.scripts.is_empty() {
            serde_json::json!([])
        } else {
            serde_json::json!([
                {
                    "name": SCRIPTS_VOLUME,
                    "mountPath": SCRIPTS_MOUNT,
                    "readOnly": true
                }
            ])
        }
    }

    fn volumes(&self) -> serde_json::Value {
        if self.scripts.is_empty() {
            serde_json::json!([])
        } else {
            serde_json::json!([
                {
                    "name": SCRIPTS_VOLUME,
                    "configMap": {
                        "name": crate::ownership::scripts_artifact_name(self.name()),
                    }
                }
            ])
        }
    }

    fn ray_cluster_spec(&self, spec: &ClusterSpec) -> serde_json::Value {
        serde_json::json!({
            "headGroupSpec": {
                "rayStartParams": {
                    "dashboard-host": "0.0.0.0"
                },
                "template": {
                    "spec": {
                        "containers": [
                            {
                                "name": "ray-head",
                                "image": spec.image,
                                // Default ports, see https://github.com/ray-project/kuberay/blob/master/ray-operator/config/samples/ray-job.sample.yaml.
                                "ports": [
                                    {
                                        "containerPort": 6379,
                                        "name": "gcs-server"
                                    },
                                    {
                                        "containerPort": 8265,
                                        "name": "dashboard"
                                    },
                                    {
                                        "containerPort": 10001,
                                        "name": "client"
                                    }
                                ],
                                "resources": spec.head.to_json(),
                                "volumeMounts": self.volume_mounts(),
                            }
                        ],
                        "volumes": self.volumes(),
                    }
                }
            },
            "workerGroupSpecs": [
                {
                    "replicas": spec.num_workers,
                    "minReplicas": spec.num_workers,
                    "maxReplicas": spec.num_workers,
                    "groupName": WORKER_GROUP_NAME,
                    "rayStartParams": {},
                    "template": {
                        "spec": {
                            "containers": [
                                {
                                    "name": "ray-worker",
                                    "image": spec.image,
                                    "lifecycle": {
                                        "preStop": {
                                            "exec": {
                                                "command": ["/bin/sh", "-c", "ray stop"]
                                            }
                                        }
                                    },
                                    "resources": spec.worker.to_json(),
                                    "volumeMounts": self.volume_mounts(),
                                }
                            ],
                            "volumes": self.volumes(),
                        }
                    }
                }
            ]
        })
    }

    /// Renders the RayJob resource.
    pub fn manifest(&self, annotations: &HashMap<String, String>) -> Result<serde_json::Value> {
        let mut labels = serde_json::Map::new();
        if let Some(queue) = self.local_queue.as_deref() {
            labels.insert(fairness::QUEUE_NAME_LABEL.to_owned(), queue.into());
        }

        let mut spec = serde_json::json!({
            "entrypoint": self.identity.entrypoint(),
        });

        match &self.cluster {
            ClusterBinding::Managed(cluster_spec) => {
                spec["shutdownAfterJobFinishes"] = true.into();
                spec["rayClusterSpec"] = self.ray_cluster_spec(cluster_spec);
            }
            ClusterBinding::Existing(cluster_name) => {
                spec["clusterSelector"] = serde_json::json!({ (label::RAY_CLUSTER): cluster_name });
            }
        }

        if let Some(runtime_env_yaml) = self.runtime_env_yaml()? {
            spec["runtimeEnvYAML"] = runtime_env_yaml.into();
        }

        Ok(serde_json::json!({
            "apiVersion": ResourceKind::RayJob.api_version(),
            "kind": ResourceKind::RayJob.as_str(),
            "metadata": {
                "name": self.name(),
                "namespace": self.namespace(),
                "labels": labels,
                "annotations": annotations,
            },
            "spec": spec,
        }))
    }
}
