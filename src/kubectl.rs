use std::path::PathBuf;

use log::debug;

use crate::{
    control_plane::{ControlPlane, ResourceHandle, ResourceKind},
    process, Error, Result,
};

mod name;
pub use name::*;

mod ray_job;
pub use ray_job::*;

mod common;
pub use common::*;

const NOT_FOUND_PREFIX: &[u8] = b"Error from server (NotFound): ";
const ALREADY_EXISTS_PREFIX: &[u8] = b"Error from server (AlreadyExists): ";

/// The reason kubectl gave for a failed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Failure {
    NotFound,
    AlreadyExists,
    Other,
}

/// Classifies the stderr of a failed kubectl invocation. Warnings may precede the error, so every line is checked.
fn classify_failure(stderr: &[u8]) -> Failure {
    stderr
        .split(|&byte| byte == b'\n')
        .find_map(|line| {
            if line.starts_with(NOT_FOUND_PREFIX) {
                Some(Failure::NotFound)
            } else if line.starts_with(ALREADY_EXISTS_PREFIX) {
                Some(Failure::AlreadyExists)
            } else {
                None
            }
        })
        .unwrap_or(Failure::Other)
}

/// How kubectl finds the API server.
#[derive(Debug, Clone)]
pub enum Connection {
    /// Talk to the server directly. Used for clusters that authenticate at the network layer.
    Server(String),
    /// Use the current context of a kubeconfig file.
    Kubeconfig(PathBuf),
}

/// A [`ControlPlane`] backed by the `kubectl` binary.
pub struct Kubectl {
    connection: Connection,
}

impl Kubectl {
    pub fn new(connection: Connection) -> Self {
        Self { connection }
    }

    /// Returns the kubectl command where connection arguments have already been set.
    fn kubectl(&self) -> process::Command {
        match &self.connection {
            Connection::Server(server) => process::command!(
                "kubectl",
                // Despite passing `--server` and `--token`, kubectl will still load the kubeconfig if
                // present. By setting `--kubeconfig` to an empty file, we can make sure no other
                // options apply.
                "--kubeconfig=/dev/null", // Does not work on Windows but Windows users develop inside WSL.
                "--server",
                server,
                "--token=unused",
            ),
            Connection::Kubeconfig(path) => process::command!("kubectl", "--kubeconfig", path),
        }
    }

    pub fn ray_jobs(&self, namespace: &str) -> Result<Vec<RayJob>> {
        let output = process::args!(
            self.kubectl(),
            "get",
            ResourceKind::RayJob.plural(),
            "--namespace",
            namespace,
            "--output=json"
        )
        .output()?;

        Ok(serde_json::from_slice::<GetResource<_>>(&output.stdout)?.items)
    }
}

impl ControlPlane for Kubectl {
    /// The manifest is written to stdin, see
    /// https://kubernetes.io/docs/tasks/manage-kubernetes-objects/imperative-config/.
    fn create(&self, manifest: &serde_json::Value) -> Result<ResourceHandle> {
        let input = serde_json::to_string(manifest)?;
        let output = process::args!(self.kubectl(), "create", "--output=json", "-f", "-")
            .try_output_with_input(input.as_bytes().to_owned())?;

        if !output.status.success() {
            let kind = manifest["kind"].as_str().and_then(ResourceKind::from_kind);
            if let (Failure::AlreadyExists, Some(kind)) = (classify_failure(&output.stderr), kind) {
                return Err(Error::AlreadyExists {
                    kind,
                    namespace: manifest_str(manifest, "namespace").to_owned(),
                    name: manifest_str(manifest, "name").to_owned(),
                });
            }

            if log::log_enabled!(log::Level::Error) {
                let path = crate::temp_path::tmp_json_path(manifest_str(manifest, "name"));
                if std::fs::write(&path, &input).is_ok() {
                    log::error!(
                        "Rejected manifest written to {}: {}",
                        path.display(),
                        String::from_utf8_lossy(&output.stderr).trim()
                    );
                }
            }
            return Err(output.into_error().into());
        }

        let created: CreateOutput = serde_json::from_slice(&output.stdout)?;
        let CreateOutputMetadata {
            namespace,
            name,
            uid,
        } = created.metadata;
        debug!("Created {namespace}/{name} with uid {uid}");
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
        let output = process::args!(
            self.kubectl(),
            "get",
            kind.plural(),
            "--namespace",
            namespace,
            name,
            "--output=json"
        )
        .try_output()?;

        if output.status.success() {
            Ok(Some(serde_json::from_slice(&output.stdout)?))
        } else if classify_failure(&output.stderr) == Failure::NotFound {
            Ok(None)
        } else {
            Err(output.into_error().into())
        }
    }

    fn list(
        &self,
        kind: ResourceKind,
        namespace: &str,
        label_selector: &str,
    ) -> Result<Vec<serde_json::Value>> {
        let output = process::args!(
            self.kubectl(),
            "get",
            kind.plural(),
            "--namespace",
            namespace,
            format!("--selector={label_selector}"),
            "--output=json"
        )
        .output()?;

        Ok(serde_json::from_slice::<GetResource<_>>(&output.stdout)?.items)
    }

    fn delete(&self, kind: ResourceKind, namespace: &str, name: &str) -> Result<bool> {
        let output = process::args!(
            self.kubectl(),
            "delete",
            kind.plural(),
            "--namespace",
            namespace,
            name,
            // Dependents are removed by the garbage collector after the owner is gone.
            "--cascade=background",
            "--wait=false"
        )
        .try_output()?;

        if output.status.success() {
            Ok(true)
        } else if classify_failure(&output.stderr) == Failure::NotFound {
            Ok(false)
        } else {
            Err(output.into_error().into())
        }
    }
}

fn manifest_str<'a>(manifest: &'a serde_json::Value, key: &str) -> &'a str {
    manifest["metadata"][key].as_str().unwrap_or_default()
}

#[derive(serde::Deserialize)]
struct CreateOutput {
    metadata: CreateOutputMetadata,
}

#[derive(serde::Deserialize)]
struct CreateOutputMetadata {
    namespace: String,
    name: String,
    uid: String,
}

pub mod label {
    use constcat::concat;

    pub const MANAGED_BY: &str = "app.kubernetes.io/managed-by";
    pub const COMPONENT: &str = "app.kubernetes.io/component";
    pub const MANAGED_BY_VALUE: &str = env!("CARGO_PKG_NAME");

    const RAY_PREFIX: &str = "ray.io/";
    pub const RAY_JOB_NAME: &str = concat!(RAY_PREFIX, "job-name");
    pub const RAY_CLUSTER: &str = concat!(RAY_PREFIX, "cluster");
    /// Set by KubeRay on the RayCluster it creates for a RayJob.
    pub const ORIGINATED_FROM_CR_NAME: &str = concat!(RAY_PREFIX, "originated-from-cr-name");
}

pub mod annotation {
    use constcat::concat;

    pub const LAUNCHED_BY_MACHINE_USER: &str =
        concat!(env!("CARGO_PKG_NAME"), "/launched-by-machine-user");
    pub const VERSION: &str = concat!(env!("CARGO_PKG_NAME"), "/version");
}
