use std::time::Duration;

use clap::{Args, ValueEnum};
use log::info;

use super::Result;
use crate::{
    control_plane::ControlPlane,
    lifecycle::JobController,
    wait::{self as polling, WaitOptions, WaitOutcome},
};

#[derive(Debug, Default, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum Until {
    /// The job is running or already finished.
    Running,
    /// The job completed or failed.
    #[default]
    Finished,
    /// The job is no longer held back by its queue.
    Admitted,
}

impl Until {
    const fn default_timeout(&self) -> Duration {
        match self {
            Until::Running => polling::RUNNING_TIMEOUT,
            Until::Finished => polling::FINISHED_TIMEOUT,
            Until::Admitted => polling::ADMITTED_TIMEOUT,
        }
    }
}

#[derive(Debug, Args)]
pub struct WaitArgs {
    pub name: String,

    #[arg(long = "until", value_enum, default_value_t)]
    pub until: Until,

    /// Give up after this many seconds. Defaults to 600 for running, 3600 for finished and 300 for admitted.
    #[arg(long = "timeout")]
    pub timeout: Option<u64>,

    /// Seconds between two polls.
    #[arg(
        long = "poll-interval",
        default_value_t = polling::POLLING_INTERVAL.as_secs(),
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub poll_interval: u64,
}

/// Turns an unsatisfied outcome into an error.
pub(super) fn report<T>(name: &str, condition: &str, outcome: WaitOutcome<T>) -> Result<T> {
    match outcome {
        WaitOutcome::Satisfied(value) => Ok(value),
        WaitOutcome::TimedOut { last_error: None } => {
            Err(format!("Deadline exceeded while waiting for RayJob {name:?} to be {condition}").into())
        }
        WaitOutcome::TimedOut {
            last_error: Some(error),
        } => Err(format!(
            "Deadline exceeded while waiting for RayJob {name:?} to be {condition}, last poll failed: {error}"
        )
        .into()),
        WaitOutcome::Aborted(error) => Err(error.into()),
    }
}

pub fn wait(
    controller: &JobController<impl ControlPlane>,
    namespace: &str,
    args: WaitArgs,
) -> Result<()> {
    let WaitArgs {
        name,
        until,
        timeout,
        poll_interval,
    } = args;

    let options = WaitOptions::with_timeout(
        timeout
            .map(Duration::from_secs)
            .unwrap_or(until.default_timeout()),
    )
    .poll_interval(Duration::from_secs(poll_interval));

    info!("Waiting for RayJob {namespace}/{name}...");

    match until {
        Until::Running => {
            let status = report(
                &name,
                "running",
                controller.wait_until_running(&name, namespace, &options),
            )?;
            info!("RayJob {namespace}/{name} is {status}");
        }
        Until::Finished => {
            let status = report(
                &name,
                "finished",
                controller.wait_until_finished(&name, namespace, &options),
            )?;
            info!("RayJob {namespace}/{name} is {status}");
        }
        Until::Admitted => {
            let info = report(
                &name,
                "admitted",
                controller.wait_until_admitted(&name, namespace, &options),
            )?;
            println!("{info}");
        }
    }

    Ok(())
}
