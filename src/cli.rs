mod delete;
mod list;
mod submit;
mod wait;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use home::home_dir;

use crate::{
    kubectl::{Connection, Kubectl},
    lifecycle::JobController,
};

pub(crate) type Result<T, E = Box<dyn std::error::Error + Send + Sync + 'static>> =
    std::result::Result<T, E>;

#[derive(Debug, Parser)]
#[command(version, about)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Address of the Kubernetes API server. Skips the kubeconfig entirely, for clusters that authenticate at the
    /// network layer.
    #[arg(long = "server", global = true, env = "RAYJOB_SERVER")]
    server: Option<String>,

    /// Path to the kubeconfig file. Defaults to `~/.kube/config`.
    #[arg(long = "kubeconfig", global = true, env = "KUBECONFIG")]
    kubeconfig: Option<PathBuf>,

    #[arg(
        long = "namespace",
        short = 'n',
        global = true,
        default_value = "default"
    )]
    namespace: String,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Submit a RayJob
    #[command(arg_required_else_help = true)]
    Submit(submit::SubmitArgs),

    /// Print the status of a RayJob
    #[command(arg_required_else_help = true)]
    Status { name: String },

    /// Block until a RayJob reaches a state
    #[command(arg_required_else_help = true)]
    Wait(wait::WaitArgs),

    /// Delete a RayJob together with its cluster and scripts
    #[command(arg_required_else_help = true)]
    Delete(delete::DeleteArgs),

    /// List the RayJobs in the namespace
    List,
}

impl Cli {
    fn connection(&self) -> Result<Connection> {
        if let Some(server) = self.server.as_ref() {
            return Ok(Connection::Server(server.clone()));
        }
        let path = match self.kubeconfig.as_ref() {
            Some(path) => path.clone(),
            None => home_dir()
                .ok_or("failed to determine home directory")?
                .join(".kube")
                .join("config"),
        };
        Ok(Connection::Kubeconfig(path))
    }

    pub fn run(self) -> Result<()> {
        let kubectl = Kubectl::new(self.connection()?);
        let namespace = self.namespace.as_str();

        match self.command {
            Commands::Submit(args) => {
                submit::submit(&JobController::new(&kubectl), namespace, args)?;
            }
            Commands::Status { name } => {
                JobController::new(&kubectl).status(&name, namespace, true)?;
            }
            Commands::Wait(args) => {
                wait::wait(&JobController::new(&kubectl), namespace, args)?;
            }
            Commands::Delete(args) => {
                delete::delete(&JobController::new(&kubectl), namespace, args)?;
            }
            Commands::List => {
                list::list(&kubectl, namespace)?;
            }
        }

        Ok(())
    }
}
