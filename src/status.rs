//! Translation of the RayJob deployment status vocabulary into the status callers program against.

use std::fmt;

use crate::kubectl::RemoteStatusDocument;

/// The value of `status.jobDeploymentStatus` on a RayJob. The set of tokens is open ended: KubeRay adds new ones
/// between releases, so anything we do not recognise is kept verbatim in [`DeploymentStatus::Other`].
///
/// See https://github.com/ray-project/kuberay/blob/master/docs/reference/api.md#jobdeploymentstatus.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DeploymentStatus {
    Complete,
    Running,
    Failed,
    Suspended,
    Other(String),
    /// The status document did not carry a deployment status at all.
    Absent,
}

impl DeploymentStatus {
    /// Tokens are matched case-sensitively, `"running"` is not `"Running"`.
    pub fn from_token(token: Option<&str>) -> Self {
        match token {
            Some("Complete") => DeploymentStatus::Complete,
            Some("Running") => DeploymentStatus::Running,
            Some("Failed") => DeploymentStatus::Failed,
            Some("Suspended") => DeploymentStatus::Suspended,
            Some(other) => DeploymentStatus::Other(other.to_owned()),
            None => DeploymentStatus::Absent,
        }
    }

    pub fn as_token(&self) -> Option<&str> {
        match self {
            DeploymentStatus::Complete => Some("Complete"),
            DeploymentStatus::Running => Some("Running"),
            DeploymentStatus::Failed => Some("Failed"),
            DeploymentStatus::Suspended => Some("Suspended"),
            DeploymentStatus::Other(token) => Some(token),
            DeploymentStatus::Absent => None,
        }
    }
}

impl fmt::Display for DeploymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_token().unwrap_or("<none>"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientStatus {
    Complete,
    Running,
    Failed,
    Suspended,
    Unknown,
}

impl ClientStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            ClientStatus::Complete => "COMPLETE",
            ClientStatus::Running => "RUNNING",
            ClientStatus::Failed => "FAILED",
            ClientStatus::Suspended => "SUSPENDED",
            ClientStatus::Unknown => "UNKNOWN",
        }
    }

    /// The job reached a terminal successful state.
    pub const fn is_ready(&self) -> bool {
        matches!(self, ClientStatus::Complete)
    }

    pub const fn is_finished(&self) -> bool {
        matches!(self, ClientStatus::Complete | ClientStatus::Failed)
    }
}

impl fmt::Display for ClientStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps a deployment status onto the client status and whether the job is ready. Never fails: unrecognised and
/// absent tokens map to `(Unknown, false)`.
pub fn map_to_client_status(status: &DeploymentStatus) -> (ClientStatus, bool) {
    let client_status = match status {
        DeploymentStatus::Complete => ClientStatus::Complete,
        DeploymentStatus::Running => ClientStatus::Running,
        DeploymentStatus::Failed => ClientStatus::Failed,
        DeploymentStatus::Suspended => ClientStatus::Suspended,
        DeploymentStatus::Other(_) | DeploymentStatus::Absent => ClientStatus::Unknown,
    };
    (client_status, client_status.is_ready())
}

/// A snapshot of a RayJob's status at the time it was queried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobInfo {
    pub name: String,
    pub job_id: Option<String>,
    pub status: DeploymentStatus,
    pub namespace: String,
    pub cluster_name: Option<String>,
    /// Kept as reported, see [`RemoteStatusDocument::start_time`] for a parsed value.
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub failed_attempts: u64,
    pub succeeded_attempts: u64,
    pub dashboard_url: Option<String>,
}

impl JobInfo {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>, status: DeploymentStatus) -> Self {
        Self {
            name: name.into(),
            job_id: None,
            status,
            namespace: namespace.into(),
            cluster_name: None,
            start_time: None,
            end_time: None,
            failed_attempts: 0,
            succeeded_attempts: 0,
            dashboard_url: None,
        }
    }

    pub fn from_document(name: &str, namespace: &str, document: &RemoteStatusDocument) -> Self {
        Self {
            name: name.to_owned(),
            job_id: document.job_id().map(str::to_owned),
            status: document.deployment_status(),
            namespace: namespace.to_owned(),
            cluster_name: document.ray_cluster_name().map(str::to_owned),
            start_time: document.raw_start_time().map(str::to_owned),
            end_time: document.raw_end_time().map(str::to_owned),
            failed_attempts: document.failed().unwrap_or_default(),
            succeeded_attempts: document.succeeded().unwrap_or_default(),
            dashboard_url: document.dashboard_url().map(str::to_owned),
        }
    }

    pub fn client_status(&self) -> (ClientStatus, bool) {
        map_to_client_status(&self.status)
    }
}

impl fmt::Display for JobInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (client_status, ready) = self.client_status();
        write!(
            f,
            "RayJob {namespace}/{name}: {client_status} (deployment status {status}, ready {ready})",
            namespace = self.namespace,
            name = self.name,
            status = self.status,
        )?;
        if let Some(cluster_name) = self.cluster_name.as_deref() {
            write!(f, ", cluster {cluster_name}")?;
        }
        write!(
            f,
            ", succeeded {}, failed {}",
            self.succeeded_attempts, self.failed_attempts
        )?;
        if let Some(dashboard_url) = self.dashboard_url.as_deref() {
            write!(f, ", dashboard {dashboard_url}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    macro_rules! mapping_test {
        ($token:expr, $client_status:expr, $ready:expr) => {
            let token: Option<&str> = $token;
            assert_eq!(
                map_to_client_status(&DeploymentStatus::from_token(token)),
                ($client_status, $ready),
                "token {token:?}"
            );
        };
    }

    #[test]
    fn known_tokens_map_to_fixed_pairs() {
        mapping_test!(Some("Complete"), ClientStatus::Complete, true);
        mapping_test!(Some("Running"), ClientStatus::Running, false);
        mapping_test!(Some("Failed"), ClientStatus::Failed, false);
        mapping_test!(Some("Suspended"), ClientStatus::Suspended, false);
    }

    #[test]
    fn unrecognized_and_absent_tokens_map_to_unknown() {
        mapping_test!(Some("SomeNewStatus"), ClientStatus::Unknown, false);
        mapping_test!(Some("Initializing"), ClientStatus::Unknown, false);
        mapping_test!(Some("running"), ClientStatus::Unknown, false);
        mapping_test!(Some(""), ClientStatus::Unknown, false);
        mapping_test!(None, ClientStatus::Unknown, false);
    }

    #[test]
    fn ready_if_and_only_if_complete() {
        for token in [
            Some("Complete"),
            Some("Running"),
            Some("Failed"),
            Some("Suspended"),
            Some("Retrying"),
            Some("COMPLETE"),
            None,
        ] {
            let (client_status, ready) = map_to_client_status(&DeploymentStatus::from_token(token));
            assert_eq!(ready, client_status == ClientStatus::Complete, "token {token:?}");
        }
    }

    #[test]
    fn unrecognized_token_is_preserved() {
        let status = DeploymentStatus::from_token(Some("SomeNewStatus"));
        assert_eq!(status, DeploymentStatus::Other("SomeNewStatus".to_owned()));
        assert_eq!(status.to_string(), "SomeNewStatus");
        assert_eq!(DeploymentStatus::Absent.to_string(), "<none>");
    }

    #[test]
    fn job_info_fields_round_trip() {
        let job_info = JobInfo {
            job_id: Some("test-job-abc123".to_owned()),
            cluster_name: Some("test-cluster".to_owned()),
            start_time: Some("2025-07-28T11:37:07Z".to_owned()),
            dashboard_url: Some("test-cluster-head-svc.test-ns.svc.cluster.local:8265".to_owned()),
            ..JobInfo::new("test-job", "test-ns", DeploymentStatus::Running)
        };

        assert_eq!(job_info.name, "test-job");
        assert_eq!(job_info.job_id.as_deref(), Some("test-job-abc123"));
        assert_eq!(job_info.status, DeploymentStatus::Running);
        assert_eq!(job_info.namespace, "test-ns");
        assert_eq!(job_info.cluster_name.as_deref(), Some("test-cluster"));
        assert_eq!(job_info.start_time.as_deref(), Some("2025-07-28T11:37:07Z"));
        assert_eq!(job_info.end_time, None);
        assert_eq!(job_info.failed_attempts, 0);
        assert_eq!(job_info.succeeded_attempts, 0);
        assert_eq!(
            job_info.dashboard_url.as_deref(),
            Some("test-cluster-head-svc.test-ns.svc.cluster.local:8265")
        );
    }

    #[test]
    fn summary_omits_missing_optional_fields() {
        let job_info = JobInfo::new("test-job", "test-ns", DeploymentStatus::Absent);
        assert_eq!(
            job_info.to_string(),
            "RayJob test-ns/test-job: UNKNOWN (deployment status <none>, ready false), succeeded 0, failed 0"
        );
    }
}
