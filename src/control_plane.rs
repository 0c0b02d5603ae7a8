//! The seam between the lifecycle logic and the remote control plane that stores the resources.

use std::fmt;

use crate::Result;

/// The kinds of resources the lifecycle controller creates, inspects or cleans up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ResourceKind {
    RayJob,
    RayCluster,
    ConfigMap,
}

impl ResourceKind {
    pub const fn api_version(&self) -> &'static str {
        match self {
            ResourceKind::RayJob | ResourceKind::RayCluster => "ray.io/v1",
            ResourceKind::ConfigMap => "v1",
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::RayJob => "RayJob",
            ResourceKind::RayCluster => "RayCluster",
            ResourceKind::ConfigMap => "ConfigMap",
        }
    }

    /// Parses the `kind` field of a manifest.
    pub fn from_kind(kind: &str) -> Option<Self> {
        [
            ResourceKind::RayJob,
            ResourceKind::RayCluster,
            ResourceKind::ConfigMap,
        ]
        .into_iter()
        .find(|candidate| candidate.as_str() == kind)
    }

    /// The resource name as understood by `kubectl get`.
    pub const fn plural(&self) -> &'static str {
        match self {
            ResourceKind::RayJob => "rayjobs.ray.io",
            ResourceKind::RayCluster => "rayclusters.ray.io",
            ResourceKind::ConfigMap => "configmaps",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies a resource after the control plane accepted it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceHandle {
    pub namespace: String,
    pub name: String,
    /// Assigned by the control plane on creation, required to point owner references at the resource.
    pub uid: String,
}

/// Create, read and delete named, namespaced resources.
///
/// Implementations must report a missing resource as `Ok(None)` from [`ControlPlane::get`] and as `Ok(false)` from
/// [`ControlPlane::delete`], and report a name collision on [`ControlPlane::create`] as
/// [`crate::Error::AlreadyExists`]. Everything else that goes wrong is a [`crate::Error::Transport`].
pub trait ControlPlane {
    /// Creates the resource described by `manifest`. The manifest carries its own kind, namespace and name.
    fn create(&self, manifest: &serde_json::Value) -> Result<ResourceHandle>;

    fn get(
        &self,
        kind: ResourceKind,
        namespace: &str,
        name: &str,
    ) -> Result<Option<serde_json::Value>>;

    /// Lists resources matching the equality based label selector, e.g. `key=value`.
    fn list(
        &self,
        kind: ResourceKind,
        namespace: &str,
        label_selector: &str,
    ) -> Result<Vec<serde_json::Value>>;

    /// Returns `Ok(true)` if the resource was deleted and `Ok(false)` if it did not exist.
    fn delete(&self, kind: ResourceKind, namespace: &str, name: &str) -> Result<bool>;
}

impl<T: ControlPlane + ?Sized> ControlPlane for &T {
    fn create(&self, manifest: &serde_json::Value) -> Result<ResourceHandle> {
        (**self).create(manifest)
    }

    fn get(
        &self,
        kind: ResourceKind,
        namespace: &str,
        name: &str,
    ) -> Result<Option<serde_json::Value>> {
        (**self).get(kind, namespace, name)
    }

    fn list(
        &self,
        kind: ResourceKind,
        namespace: &str,
        label_selector: &str,
    ) -> Result<Vec<serde_json::Value>> {
        (**self).list(kind, namespace, label_selector)
    }

    fn delete(&self, kind: ResourceKind, namespace: &str, name: &str) -> Result<bool> {
        (**self).delete(kind, namespace, name)
    }
}
