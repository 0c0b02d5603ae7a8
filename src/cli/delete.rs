use clap::Args;
use log::{info, warn};

use super::{wait::report, Result};
use crate::{
    control_plane::ControlPlane,
    lifecycle::JobController,
    wait::{WaitOptions, CLEANUP_TIMEOUT},
};

#[derive(Debug, Args)]
pub struct DeleteArgs {
    pub name: String,

    /// Block until the cluster and scripts of the job are gone as well.
    #[arg(long = "wait", default_value_t)]
    pub wait: bool,
}

pub fn delete(
    controller: &JobController<impl ControlPlane>,
    namespace: &str,
    args: DeleteArgs,
) -> Result<()> {
    let DeleteArgs { name, wait } = args;

    if !controller.delete(&name, namespace)? {
        warn!("RayJob {namespace}/{name} does not exist");
    }

    if wait {
        report(
            &name,
            "cleaned up",
            controller.wait_until_cleaned_up(
                &name,
                namespace,
                &WaitOptions::with_timeout(CLEANUP_TIMEOUT),
            ),
        )?;
        info!("RayJob {namespace}/{name}, its cluster and its scripts are gone");
    }

    Ok(())
}
