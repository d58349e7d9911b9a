//! Process arguments shared by both binaries and backend selection.

use clap::Args;
use docstore_client::{ClientConfig, ClientError, RestDatastore};
use docstore_core::Datastore;
use docstore_storage::{FileDatastore, StorageError};
use std::path::PathBuf;
use thiserror::Error;
use tracing::info;

/// Where the data lives.
#[derive(Debug, Clone, Args)]
pub struct ConnectArgs {
    /// Project that owns the datastore
    #[arg(value_name = "PROJECT_ID")]
    pub project_id: String,

    /// Use a local snapshot file instead of the hosted service
    #[arg(long, value_name = "PATH")]
    pub local: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

/// The backend could not be opened.
#[derive(Debug, Error)]
pub enum ConnectError {
    /// The local store could not be opened.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The hosted service is not configured.
    #[error(transparent)]
    Client(#[from] ClientError),
}

/// Opens the backend selected by `args`.
///
/// # Errors
///
/// Returns an error when the local file is unusable or, for the hosted
/// service, when no credentials are configured.
pub fn open_store(args: &ConnectArgs) -> Result<Box<dyn Datastore>, ConnectError> {
    match &args.local {
        Some(path) => {
            info!(path = %path.display(), "using local datastore");
            Ok(Box::new(FileDatastore::open(path)?))
        }
        None => {
            let config = ClientConfig::from_env(args.project_id.clone())?;
            info!(
                endpoint = %config.endpoint,
                project = %config.project_id,
                "using hosted datastore"
            );
            Ok(Box::new(RestDatastore::connect(config)))
        }
    }
}
