use std::io;
use thiserror::Error;

/// Errors raised by the listener. Configuration and transport errors are
/// fatal at startup; the per-message variants are logged and the message
/// dropped.
#[derive(Error, Debug)]
pub enum ListenerError {
    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("{addr}: expected {expected} arguments, got {got}")]
    ArityMismatch {
        addr: String,
        expected: usize,
        got: usize,
    },

    #[error("{addr}: argument {index} is not numeric")]
    NonNumericArgument { addr: String, index: usize },

    #[error("could not bind {addr}: {source}")]
    Transport {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, ListenerError>;
