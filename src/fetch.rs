use log::debug;

use crate::{
    control_plane::{ControlPlane, ResourceKind},
    kubectl::RemoteStatusDocument,
    Result,
};

/// Queries the control plane once for the status of a RayJob. Returns `Ok(None)` if the RayJob does not exist. A
/// RayJob without a status yields an empty document, which reads as [`crate::status::DeploymentStatus::Absent`].
pub fn fetch_status(
    plane: &impl ControlPlane,
    name: &str,
    namespace: &str,
) -> Result<Option<RemoteStatusDocument>> {
    let Some(resource) = plane.get(ResourceKind::RayJob, namespace, name)? else {
        debug!("RayJob {namespace}/{name} does not exist");
        return Ok(None);
    };
    Ok(Some(RemoteStatusDocument::from_resource(resource)))
}
