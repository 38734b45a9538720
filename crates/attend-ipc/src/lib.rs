//! Unix socket transport between attendd and its clients
//!
//! One JSON document per line in both directions. The server tags every
//! connection with a role and, when the peer UID resolves, the login name
//! that connection may act as. The client wraps each attendance command in
//! a typed call.

mod client;
mod server;

pub use client::*;
pub use server::*;

use attend_api::{ErrorCode, ErrorInfo};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IpcError {
    #[error("Cannot reach attendd at {}: {source}", path.display())]
    Connect {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Socket I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Undecodable message: {0}")]
    Json(#[from] serde_json::Error),

    #[error("attendd closed the connection")]
    ConnectionClosed,

    /// The peer answered something the protocol does not allow here
    #[error("Protocol violation: {0}")]
    Protocol(String),

    /// attendd understood the request and refused it
    #[error("{message} ({code:?})")]
    Rejected { code: ErrorCode, message: String },

    #[error("IPC server not started")]
    NotStarted,
}

impl IpcError {
    /// Protocol error code when attendd refused the request
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            IpcError::Rejected { code, .. } => Some(*code),
            _ => None,
        }
    }
}

impl From<ErrorInfo> for IpcError {
    fn from(e: ErrorInfo) -> Self {
        IpcError::Rejected {
            code: e.code,
            message: e.message,
        }
    }
}

pub type IpcResult<T> = Result<T, IpcError>;
