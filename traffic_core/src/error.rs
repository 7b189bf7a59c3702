use std::fmt;

/// The three fatal error kinds this core can raise. Recoverable cases (a non-positive
/// `lcAssertive`, a `sync` that drops a vanished actor) are never errors -- they're logged with
/// `log::warn!` and handled in place.
#[derive(Debug)]
pub enum TrafficError {
    /// A malformed traffic spec, an undefined vType/route reference, an out-of-range lane index,
    /// or an invalid depart/arrival token. Raised from `setup` or the flow loader.
    Config(String),
    /// An operation referenced a vehicle id this provider doesn't know about. Always a
    /// programming error on the host's part.
    Lookup(String),
    /// Commit-phase re-localization found no lane at all within the actor's length. Indicates
    /// inconsistent map data.
    Localization(String),
}

impl fmt::Display for TrafficError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TrafficError::Config(msg) => write!(f, "invalid traffic configuration: {msg}"),
            TrafficError::Lookup(msg) => write!(f, "unknown vehicle id: {msg}"),
            TrafficError::Localization(msg) => write!(f, "localization failed: {msg}"),
        }
    }
}

impl std::error::Error for TrafficError {}

pub type Result<T> = std::result::Result<T, TrafficError>;
