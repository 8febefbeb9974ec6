//! Services for reviewing a dataset: a static server for the page images
//! and a supervised annotation tool process.

mod file_server;
mod routes;
mod supervisor;

use std::net::SocketAddr;

use thiserror::Error;

pub use file_server::FileServer;
pub use routes::create_router;
pub use supervisor::AnnotatorProcess;

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{0} not found in PATH")]
    NotFound(String),

    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited during startup ({status})")]
    Exited { program: String, status: String },

    #[error("{program} did not accept connections on port {port} within {secs}s")]
    StartTimeout { program: String, port: u16, secs: u64 },

    #[error("File server on {0} stopped with an error: {1}")]
    Serve(SocketAddr, String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
