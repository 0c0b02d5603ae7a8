//! Submits RayJobs, follows their status and tears them down.

use std::collections::HashMap;

use log::{debug, info, warn};

use crate::{
    control_plane::{ControlPlane, ResourceKind},
    fairness,
    fetch::fetch_status,
    job::RayJob,
    kubectl::annotation,
    ownership::{self, CleanupReport, ConfigArtifact},
    status::{map_to_client_status, ClientStatus, JobInfo},
    user_host,
    wait::{self, WaitOptions, WaitOutcome},
    Error, Result,
};

pub struct JobController<P> {
    plane: P,
}

impl<P: ControlPlane> JobController<P> {
    pub fn new(plane: P) -> Self {
        Self { plane }
    }

    fn annotations() -> HashMap<String, String> {
        [
            (annotation::VERSION, env!("CARGO_PKG_VERSION").to_owned()),
            (
                annotation::LAUNCHED_BY_MACHINE_USER,
                user_host::machine_user_host(),
            ),
        ]
        .into_iter()
        .map(|(key, value)| (key.to_owned(), value))
        .collect()
    }

    /// Creates the RayJob and, if it ships scripts, the ConfigMap holding them. Returns the name of the job.
    ///
    /// The ConfigMap points an owner reference at the RayJob, which needs the uid the control plane assigns to the
    /// RayJob, so the RayJob is created first. Should the ConfigMap not be created, the RayJob is deleted again.
    pub fn submit(&self, job: &RayJob) -> Result<String> {
        job.validate()?;

        let manifest = job.manifest(&Self::annotations())?;
        let handle = self.plane.create(&manifest).map_err(|error| match error {
            Error::AlreadyExists {
                kind: ResourceKind::RayJob,
                namespace,
                name,
            } => Error::DuplicateSubmission { namespace, name },
            error => error,
        })?;
        info!(
            "Created RayJob {namespace}/{name}",
            namespace = handle.namespace,
            name = handle.name
        );
        if let Some(queue) = job.queue() {
            info!("RayJob {} will start once queue {queue:?} admits it", handle.name);
        }

        if !job.scripts().is_empty() {
            let artifact = ConfigArtifact::for_job(&handle, job.scripts().clone());
            if let Err(error) = self.plane.create(&artifact.manifest()) {
                warn!(
                    "Failed to create ConfigMap {}, deleting RayJob {}",
                    artifact.name, handle.name
                );
                if let Err(error) =
                    self.plane
                        .delete(ResourceKind::RayJob, &handle.namespace, &handle.name)
                {
                    warn!("Failed to delete RayJob {}: {error}", handle.name);
                }
                return Err(error);
            }
            debug!(
                "Created ConfigMap {namespace}/{name} owned by RayJob {owner}",
                namespace = artifact.namespace,
                name = artifact.name,
                owner = handle.name
            );
        }

        Ok(handle.name)
    }

    /// Returns a fresh snapshot of the job, or `None` if it does not exist.
    pub fn job_info(&self, name: &str, namespace: &str) -> Result<Option<JobInfo>> {
        Ok(fetch_status(&self.plane, name, namespace)?
            .map(|document| JobInfo::from_document(name, namespace, &document)))
    }

    /// Returns the client status of the job and whether it is ready. A job that does not exist is `(Unknown, false)`.
    pub fn status(
        &self,
        name: &str,
        namespace: &str,
        print_to_console: bool,
    ) -> Result<(ClientStatus, bool)> {
        let Some(info) = self.job_info(name, namespace)? else {
            if print_to_console {
                println!("RayJob {namespace}/{name} not found");
            }
            return Ok((ClientStatus::Unknown, false));
        };

        if print_to_console {
            println!("{info}");
        }

        Ok(map_to_client_status(&info.status))
    }

    /// Polls the job until `predicate` holds for its client status. Failing polls, including for a job that does not
    /// exist yet, count as not yet satisfied unless `options` says otherwise.
    pub fn wait_until_condition(
        &self,
        name: &str,
        namespace: &str,
        predicate: impl Fn(ClientStatus) -> bool,
        options: &WaitOptions,
    ) -> WaitOutcome<ClientStatus> {
        let mut last = None;
        wait::poll_until(options, || {
            let Some(document) = fetch_status(&self.plane, name, namespace)? else {
                return Err(Error::NotFound {
                    kind: ResourceKind::RayJob,
                    namespace: namespace.to_owned(),
                    name: name.to_owned(),
                });
            };
            let (status, _) = map_to_client_status(&document.deployment_status());
            if last != Some(status) {
                debug!("RayJob {namespace}/{name} is {status}");
                last = Some(status);
            }
            Ok(predicate(status).then_some(status))
        })
    }

    /// Waits until the job runs or already finished.
    pub fn wait_until_running(
        &self,
        name: &str,
        namespace: &str,
        options: &WaitOptions,
    ) -> WaitOutcome<ClientStatus> {
        self.wait_until_condition(
            name,
            namespace,
            |status| status == ClientStatus::Running || status.is_finished(),
            options,
        )
    }

    /// Waits until the job completed or failed.
    pub fn wait_until_finished(
        &self,
        name: &str,
        namespace: &str,
        options: &WaitOptions,
    ) -> WaitOutcome<ClientStatus> {
        self.wait_until_condition(name, namespace, |status| status.is_finished(), options)
    }

    /// Waits until the fairness controller stops holding the job back, see
    /// [`fairness::is_queued_by_fairness_controller`].
    pub fn wait_until_admitted(
        &self,
        name: &str,
        namespace: &str,
        options: &WaitOptions,
    ) -> WaitOutcome<JobInfo> {
        wait::poll_until(options, || {
            let Some(document) = fetch_status(&self.plane, name, namespace)? else {
                return Ok(None);
            };
            if fairness::is_queued_by_fairness_controller(&document) {
                debug!("RayJob {namespace}/{name} is queued");
                return Ok(None);
            }
            Ok(Some(JobInfo::from_document(name, namespace, &document)))
        })
    }

    /// Deletes the job. The RayCluster and ConfigMap it owns are removed by the garbage collector of the control
    /// plane. Returns false if the job did not exist, which is not an error.
    pub fn delete(&self, name: &str, namespace: &str) -> Result<bool> {
        let deleted = self.plane.delete(ResourceKind::RayJob, namespace, name)?;
        if deleted {
            info!("Deleted RayJob {namespace}/{name}");
        } else {
            debug!("RayJob {namespace}/{name} was already deleted");
        }
        Ok(deleted)
    }

    pub fn verify_cleanup(&self, name: &str, namespace: &str) -> Result<CleanupReport> {
        ownership::verify_cleanup(&self.plane, name, namespace)
    }

    /// Waits for the garbage collector to remove everything the job owned.
    pub fn wait_until_cleaned_up(
        &self,
        name: &str,
        namespace: &str,
        options: &WaitOptions,
    ) -> WaitOutcome<()> {
        wait::poll_until(options, || {
            let report = self.verify_cleanup(name, namespace)?;
            if !report.is_clean() {
                debug!("Waiting for cleanup of RayJob {namespace}/{name}, {report}");
            }
            Ok(report.is_clean().then_some(()))
        })
    }
}
