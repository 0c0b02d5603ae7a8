//! An in-memory control plane that behaves enough like Kubernetes, KubeRay and Kueue for the lifecycle tests.

use std::{
    collections::{BTreeMap, VecDeque},
    sync::Mutex,
};

use serde_json::json;

use crate::{
    control_plane::{ControlPlane, ResourceHandle, ResourceKind},
    fairness::QUEUE_NAME_LABEL,
    kubectl::label,
    Error, Result,
};

type Key = (ResourceKind, String, String);

#[derive(Default)]
struct State {
    resources: BTreeMap<Key, serde_json::Value>,
    next_uid: u64,
    /// Number of jobs a queue admits at the same time. Queues not listed here admit everything.
    queue_capacity: BTreeMap<String, usize>,
    admitted: BTreeMap<String, Vec<(String, String)>>,
    waiting: BTreeMap<String, VecDeque<(String, String)>>,
    failing_gets: usize,
    failing_create: Option<ResourceKind>,
    create_calls: Vec<ResourceKind>,
}

#[derive(Default)]
pub struct FakeControlPlane {
    state: Mutex<State>,
}

fn labels_match(resource: &serde_json::Value, selector: &str) -> bool {
    let Some((key, value)) = selector.split_once('=') else {
        return false;
    };
    resource["metadata"]["labels"][key].as_str() == Some(value)
}

fn owner_uids(resource: &serde_json::Value) -> Vec<String> {
    resource["metadata"]["ownerReferences"]
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(|owner| owner["uid"].as_str().map(str::to_owned))
        .collect()
}

impl FakeControlPlane {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_queue_capacity(self, queue: &str, capacity: usize) -> Self {
        self.state
            .lock()
            .unwrap()
            .queue_capacity
            .insert(queue.to_owned(), capacity);
        self
    }

    /// Makes the next `count` calls to `get` fail as if the API server was unreachable.
    pub fn fail_next_gets(&self, count: usize) {
        self.state.lock().unwrap().failing_gets = count;
    }

    /// Makes every create of `kind` fail as if the API server refused it.
    pub fn fail_creates_of(&self, kind: ResourceKind) {
        self.state.lock().unwrap().failing_create = Some(kind);
    }

    pub fn create_calls(&self) -> Vec<ResourceKind> {
        self.state.lock().unwrap().create_calls.clone()
    }

    /// Stores a RayJob with the given status, bypassing admission.
    pub fn insert_ray_job(&self, namespace: &str, name: &str, status: serde_json::Value) {
        let mut state = self.state.lock().unwrap();
        let uid = state.uid();
        state.resources.insert(
            (ResourceKind::RayJob, namespace.to_owned(), name.to_owned()),
            json!({
                "apiVersion": "ray.io/v1",
                "kind": "RayJob",
                "metadata": { "name": name, "namespace": namespace, "uid": uid },
                "status": status,
            }),
        );
    }

    pub fn contains(&self, kind: ResourceKind, namespace: &str, name: &str) -> bool {
        self.state
            .lock()
            .unwrap()
            .resources
            .contains_key(&(kind, namespace.to_owned(), name.to_owned()))
    }

    pub fn count(&self, kind: ResourceKind) -> usize {
        self.state
            .lock()
            .unwrap()
            .resources
            .keys()
            .filter(|(candidate, _, _)| *candidate == kind)
            .count()
    }

    /// Marks the job as successfully finished and lets the next waiting job on its queue in.
    pub fn complete_job(&self, namespace: &str, name: &str) {
        let mut state = self.state.lock().unwrap();
        let key = (ResourceKind::RayJob, namespace.to_owned(), name.to_owned());
        let Some(job) = state.resources.get_mut(&key) else {
            return;
        };
        job["status"]["jobDeploymentStatus"] = "Complete".into();
        job["status"]["jobStatus"] = "SUCCEEDED".into();
        job["status"]["succeeded"] = 1.into();
        job["status"]["failed"] = 0.into();
        job["status"]["endTime"] = "2025-07-28T11:42:30Z".into();

        let queue = job["metadata"]["labels"][QUEUE_NAME_LABEL]
            .as_str()
            .map(str::to_owned);
        if let Some(queue) = queue {
            let entry = (namespace.to_owned(), name.to_owned());
            state
                .admitted
                .entry(queue.clone())
                .or_default()
                .retain(|admitted| *admitted != entry);
            state.admit_waiting(&queue);
        }
    }
}

impl State {
    fn uid(&mut self) -> String {
        self.next_uid += 1;
        format!("00000000-0000-0000-0000-{:012}", self.next_uid)
    }

    fn has_capacity(&self, queue: &str) -> bool {
        match self.queue_capacity.get(queue) {
            Some(&capacity) => self.admitted.get(queue).map_or(0, Vec::len) < capacity,
            None => true,
        }
    }

    fn admit_waiting(&mut self, queue: &str) {
        while self.has_capacity(queue) {
            let Some((namespace, name)) = self
                .waiting
                .get_mut(queue)
                .and_then(VecDeque::pop_front)
            else {
                return;
            };
            self.admit(Some(queue), &namespace, &name);
        }
    }

    /// Does what KubeRay does once a job may run: create the RayCluster owned by the job and report it as running.
    fn admit(&mut self, queue: Option<&str>, namespace: &str, name: &str) {
        let key = (ResourceKind::RayJob, namespace.to_owned(), name.to_owned());
        let Some(job_uid) = self
            .resources
            .get(&key)
            .and_then(|job| job["metadata"]["uid"].as_str().map(str::to_owned))
        else {
            return;
        };

        if let Some(queue) = queue {
            self.admitted
                .entry(queue.to_owned())
                .or_default()
                .push((namespace.to_owned(), name.to_owned()));
        }

        let cluster_name = format!("{name}-raycluster-{}", &job_uid[job_uid.len() - 5..]);
        let cluster_uid = self.uid();
        self.resources.insert(
            (ResourceKind::RayCluster, namespace.to_owned(), cluster_name.clone()),
            json!({
                "apiVersion": "ray.io/v1",
                "kind": "RayCluster",
                "metadata": {
                    "name": cluster_name,
                    "namespace": namespace,
                    "uid": cluster_uid,
                    "labels": { (label::ORIGINATED_FROM_CR_NAME): name },
                    "ownerReferences": [{
                        "apiVersion": "ray.io/v1",
                        "kind": "RayJob",
                        "name": name,
                        "uid": job_uid,
                        "controller": true,
                        "blockOwnerDeletion": true,
                    }],
                },
            }),
        );

        if let Some(job) = self.resources.get_mut(&key) {
            job["status"] = json!({
                "jobId": format!("{name}-{}", &job_uid[job_uid.len() - 5..]),
                "jobDeploymentStatus": "Running",
                "jobStatus": "RUNNING",
                "startTime": "2025-07-28T11:37:07Z",
                "failed": 0,
                "succeeded": 0,
                "dashboardURL": format!("{cluster_name}-head-svc.{namespace}.svc.cluster.local:8265"),
                "rayClusterName": cluster_name,
                "rayClusterStatus": { "desiredCPU": "1", "desiredMemory": "2Gi" },
            });
        }
    }

    /// Removes every resource owned, directly or transitively, by one of `uids`.
    fn collect_garbage(&mut self, mut uids: Vec<String>) {
        while !uids.is_empty() {
            let orphans: Vec<Key> = self
                .resources
                .iter()
                .filter(|(_, resource)| owner_uids(resource).iter().any(|uid| uids.contains(uid)))
                .map(|(key, _)| key.clone())
                .collect();
            uids = orphans
                .iter()
                .filter_map(|key| self.resources.remove(key))
                .filter_map(|resource| resource["metadata"]["uid"].as_str().map(str::to_owned))
                .collect();
        }
    }
}

impl ControlPlane for FakeControlPlane {
    fn create(&self, manifest: &serde_json::Value) -> Result<ResourceHandle> {
        let mut state = self.state.lock().unwrap();

        let kind = manifest["kind"]
            .as_str()
            .and_then(ResourceKind::from_kind)
            .ok_or_else(|| Error::transport("unsupported kind"))?;
        state.create_calls.push(kind);
        if state.failing_create == Some(kind) {
            return Err(Error::transport("admission webhook denied the request"));
        }

        let namespace = manifest["metadata"]["namespace"].as_str().unwrap_or_default().to_owned();
        let name = manifest["metadata"]["name"].as_str().unwrap_or_default().to_owned();
        let key = (kind, namespace.clone(), name.clone());
        if state.resources.contains_key(&key) {
            return Err(Error::AlreadyExists {
                kind,
                namespace,
                name,
            });
        }

        let uid = state.uid();
        let mut resource = manifest.clone();
        resource["metadata"]["uid"] = uid.clone().into();
        resource["metadata"]["creationTimestamp"] = "2025-07-28T11:37:00Z".into();
        state.resources.insert(key, resource);

        if kind == ResourceKind::RayJob && manifest["spec"].get("rayClusterSpec").is_some() {
            match manifest["metadata"]["labels"][QUEUE_NAME_LABEL].as_str() {
                Some(queue) if !state.has_capacity(queue) => {
                    state
                        .waiting
                        .entry(queue.to_owned())
                        .or_default()
                        .push_back((namespace.clone(), name.clone()));
                }
                queue => state.admit(queue, &namespace, &name),
            }
        }

        Ok(ResourceHandle {
            namespace,
            name,
            uid,
        })
    }

    fn get(
        &self,
        kind: ResourceKind,
        namespace: &str,
        name: &str,
    ) -> Result<Option<serde_json::Value>> {
        let mut state = self.state.lock().unwrap();
        if state.failing_gets > 0 {
            state.failing_gets -= 1;
            return Err(Error::transport("connection refused"));
        }
        Ok(state
            .resources
            .get(&(kind, namespace.to_owned(), name.to_owned()))
            .cloned())
    }

    fn list(
        &self,
        kind: ResourceKind,
        namespace: &str,
        label_selector: &str,
    ) -> Result<Vec<serde_json::Value>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .resources
            .iter()
            .filter(|((candidate, candidate_namespace, _), resource)| {
                *candidate == kind
                    && candidate_namespace == namespace
                    && labels_match(resource, label_selector)
            })
            .map(|(_, resource)| resource.clone())
            .collect())
    }

    fn delete(&self, kind: ResourceKind, namespace: &str, name: &str) -> Result<bool> {
        let mut state = self.state.lock().unwrap();
        let Some(resource) = state
            .resources
            .remove(&(kind, namespace.to_owned(), name.to_owned()))
        else {
            return Ok(false);
        };

        let entry = (namespace.to_owned(), name.to_owned());
        let mut freed = Vec::new();
        for (queue, admitted) in state.admitted.iter_mut() {
            let before = admitted.len();
            admitted.retain(|candidate| *candidate != entry);
            if admitted.len() != before {
                freed.push(queue.clone());
            }
        }
        for waiting in state.waiting.values_mut() {
            waiting.retain(|candidate| *candidate != entry);
        }

        let uid = resource["metadata"]["uid"].as_str().map(str::to_owned);
        state.collect_garbage(uid.into_iter().collect());

        // Kueue hands the capacity of a deleted workload to the next one in line.
        for queue in freed {
            state.admit_waiting(&queue);
        }
        Ok(true)
    }
}
