use thiserror::Error;

//create types errors for easy testability

/// A single host fact or counter could not be read. Never escapes a sampler:
/// the field falls back to its default and collection continues.
#[derive(Error, Debug)]
pub enum CollectorError {
    #[error("failed to read {path}: {source}")]
    ProcReadError {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to parse {field} from {path}: {raw}")]
    ParseError {
        path: String,
        field: String,
        raw: String,
    },

    #[error("{call} failed: {source}")]
    Syscall {
        call: &'static str,
        source: nix::errno::Errno,
    },

    #[error("blocking {call} task did not complete: {source}")]
    Blocking {
        call: &'static str,
        source: tokio::task::JoinError,
    },
}

/// One delivery attempt failed at the transport level.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        source: reqwest::Error,
    },

    #[error("transport unavailable: {0}")]
    Unavailable(String),
}

#[derive(Error, Debug)]
pub enum WireError {
    #[error("failed to encode snapshot: {0}")]
    Encode(#[from] serde_urlencoded::ser::Error),

    #[error("failed to decode wire body: {0}")]
    Decode(#[from] serde_urlencoded::de::Error),

    #[error("wire body is missing field {0}")]
    MissingField(&'static str),

    #[error("invalid numeric value for {field}: {raw}")]
    InvalidNumber { field: &'static str, raw: String },
}

#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error(transparent)]
    Encode(#[from] WireError),

    #[error("delivery failed after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: TransportError },
}

/// The only errors allowed to stop the process, raised before the loop starts.
#[derive(Error, Debug)]
pub enum StartupError {
    #[error("cannot open log destination {path}: {source}")]
    LogDestination {
        path: String,
        source: std::io::Error,
    },

    #[error("failed to install log subscriber: {0}")]
    Subscriber(String),
}
