use std::path::PathBuf;

use clap::Args;
use log::info;

use super::{wait::report, Result};
use crate::{
    control_plane::ControlPlane,
    job::{self, ClusterBinding, ClusterSpec, JobIdentity, RayJob, RoleResources},
    lifecycle::JobController,
    wait::{WaitOptions, FINISHED_TIMEOUT},
};

fn key_value(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_owned(), value.to_owned())),
        _ => Err(format!("expected KEY=VALUE, got {s:?}")),
    }
}

#[derive(Debug, Args)]
pub struct SubmitArgs {
    /// Name of the RayJob. Must be unique within the namespace.
    #[arg(long = "name")]
    pub name: String,

    /// Run on this existing RayCluster instead of provisioning one for the job.
    #[arg(long = "cluster", conflicts_with_all = ["image", "workers", "head_cpu", "head_memory", "worker_cpu", "worker_memory", "worker_gpus", "scripts"])]
    pub cluster: Option<String>,

    /// Container image for the head and worker nodes of the provisioned cluster.
    #[arg(long = "image", default_value = job::DEFAULT_IMAGE)]
    pub image: String,

    #[arg(long = "workers", default_value_t = 1)]
    pub workers: u32,

    /// CPU of the head node, e.g. `1` or `500m`.
    #[arg(long = "head-cpu")]
    pub head_cpu: Option<String>,

    /// Memory of the head node, e.g. `4Gi`.
    #[arg(long = "head-memory")]
    pub head_memory: Option<String>,

    /// CPU per worker node.
    #[arg(long = "worker-cpu")]
    pub worker_cpu: Option<String>,

    /// Memory per worker node.
    #[arg(long = "worker-memory")]
    pub worker_memory: Option<String>,

    /// GPUs per worker node.
    #[arg(long = "worker-gpus", default_value_t)]
    pub worker_gpus: u32,

    /// Kueue LocalQueue to submit the job to.
    #[arg(long = "queue")]
    pub queue: Option<String>,

    /// Environment variable for the job, may be repeated.
    #[arg(long = "env", value_name = "KEY=VALUE", value_parser = key_value)]
    pub env: Vec<(String, String)>,

    /// Local script to ship with the job. It is available in the working directory of the entrypoint under its file
    /// name. May be repeated.
    #[arg(long = "script", value_name = "PATH")]
    pub scripts: Vec<PathBuf>,

    /// Block until the job finished.
    #[arg(long = "wait", default_value_t)]
    pub wait: bool,

    #[arg(required = true, last = true)]
    pub entrypoint: Vec<String>,
}

/// Sets requests and limits to the same quantities.
fn role_resources(cpu: Option<String>, memory: Option<String>, gpus: u32) -> RoleResources {
    RoleResources {
        cpu_requests: cpu.clone(),
        cpu_limits: cpu,
        memory_requests: memory.clone(),
        memory_limits: memory,
        gpus,
    }
}

pub fn submit(
    controller: &JobController<impl ControlPlane>,
    namespace: &str,
    args: SubmitArgs,
) -> Result<()> {
    let SubmitArgs {
        name,
        cluster,
        image,
        workers,
        head_cpu,
        head_memory,
        worker_cpu,
        worker_memory,
        worker_gpus,
        queue,
        env,
        scripts,
        wait,
        entrypoint,
    } = args;

    if entrypoint.is_empty() {
        return Err("Please provide the entrypoint to run".into());
    }

    let identity = JobIdentity::new(name, namespace, entrypoint.join(" "))?;

    let binding = match cluster {
        Some(cluster) => ClusterBinding::Existing(cluster),
        None => ClusterBinding::Managed(ClusterSpec {
            image,
            head: role_resources(head_cpu, head_memory, 0),
            worker: role_resources(worker_cpu, worker_memory, worker_gpus),
            num_workers: workers,
        }),
    };

    let mut job = RayJob::new(identity, binding).env_vars(env);

    if let Some(queue) = queue {
        job = job.local_queue(queue);
    }

    for path in scripts {
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| format!("{path:?} does not name a file"))?
            .to_owned();
        let content = std::fs::read_to_string(&path)
            .map_err(|error| format!("failed to read script {path:?}: {error}"))?;
        job = job.script(file_name, content);
    }

    let name = controller.submit(&job)?;
    info!("Submitted RayJob {namespace}/{name}");

    if wait {
        let outcome = controller.wait_until_finished(
            &name,
            namespace,
            &WaitOptions::with_timeout(FINISHED_TIMEOUT),
        );
        report(&name, "finished", outcome)?;
        controller.status(&name, namespace, true)?;
    }

    Ok(())
}
