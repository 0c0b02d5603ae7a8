//! Interaction with Kueue, the admission controller that holds RayJobs back until their queue has capacity.
//!
//! Kueue is never called directly. A job is bound to a queue through a label and its admission is only observable
//! through the status KubeRay reports for the job.

use crate::kubectl::RemoteStatusDocument;

pub const QUEUE_NAME_LABEL: &str = "kueue.x-k8s.io/queue-name";

/// Returns true while the fairness controller is holding the job back.
///
/// Kueue does not publish an admission flag on the RayJob. A held job either has no RayCluster bound yet, or has one
/// whose desired resources are all zero because its pods are gated. Both are heuristics over the KubeRay status schema
/// and should stay confined to this function.
pub fn is_queued_by_fairness_controller(document: &RemoteStatusDocument) -> bool {
    if document.ray_cluster_name().is_none() {
        return true;
    }

    let is_zero = |quantity: Option<String>| quantity.as_deref().map_or(true, is_zero_quantity);
    is_zero(document.desired_cpu()) && is_zero(document.desired_memory())
}

/// Binary suffixes come first so `Mi` is not read as `M`.
const QUANTITY_SUFFIXES: [&str; 15] = [
    "Ki", "Mi", "Gi", "Ti", "Pi", "Ei", "n", "u", "m", "k", "M", "G", "T", "P", "E",
];

/// Returns true for Kubernetes quantities with a magnitude of zero, like `0`, `0m` or `0Gi`. Quantities that do not
/// parse are not zero.
fn is_zero_quantity(quantity: &str) -> bool {
    let quantity = quantity.trim();
    let number = QUANTITY_SUFFIXES
        .iter()
        .find_map(|suffix| quantity.strip_suffix(suffix))
        .unwrap_or(quantity);
    number.parse::<f64>() == Ok(0.0)
}
