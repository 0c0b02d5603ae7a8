use std::fmt;

use crate::control_plane::ResourceKind;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug)]
pub enum Error {
    /// The resource does not exist on the control plane.
    NotFound {
        kind: ResourceKind,
        namespace: String,
        name: String,
    },
    /// A job with the same name already exists in the namespace.
    DuplicateSubmission { namespace: String, name: String },
    /// The control plane already holds a resource of this kind and name.
    AlreadyExists {
        kind: ResourceKind,
        namespace: String,
        name: String,
    },
    /// The control plane could not be reached, refused the request or replied with something we could not parse.
    Transport(BoxError),
    /// The job description can not be turned into a valid submission.
    InvalidDescriptor(String),
}

impl Error {
    pub fn transport(error: impl Into<BoxError>) -> Self {
        Error::Transport(error.into())
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NotFound {
                kind,
                namespace,
                name,
            } => write!(f, "{kind} {namespace}/{name} not found"),
            Error::DuplicateSubmission { namespace, name } => write!(
                f,
                "a RayJob named {namespace}/{name} already exists, delete it first or pick another name"
            ),
            Error::AlreadyExists {
                kind,
                namespace,
                name,
            } => write!(f, "{kind} {namespace}/{name} already exists"),
            Error::Transport(error) => write!(f, "control plane request failed: {error}"),
            Error::InvalidDescriptor(reason) => write!(f, "invalid job description: {reason}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Transport(error) => Some(error.as_ref()),
            _ => None,
        }
    }
}

impl From<crate::process::Error> for Error {
    fn from(error: crate::process::Error) -> Self {
        Error::Transport(error.into())
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Error::Transport(error.into())
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
