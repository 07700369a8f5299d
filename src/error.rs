//! Error taxonomy shared by every module in the crate.
//!
//! Errors raised on a single rank must not escape the core until every rank
//! has observed the same failure; `cluster::elevate` performs that collective
//! round using the wire representation defined here.

/// Common `Result` type for all library operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Every failure the core can surface to a caller.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// An algorithm name was not found in the pairwise or phylogeny registry.
    #[error("unknown algorithm: '{0}'")]
    UnknownAlgorithm(String),

    /// A scoring table name was not found in the catalog.
    #[error("unknown scoring table: '{0}'")]
    UnknownTable(String),

    /// A sequence parser name was not found in the loader registry.
    #[error("unknown parser: '{0}'")]
    UnknownParser(String),

    /// The database holds fewer than two sequences.
    #[error("database must hold at least two sequences")]
    EmptyDatabase,

    /// A distance matrix cell is not a finite number.
    #[error("non-finite distance between OTUs {0} and {1}")]
    DegenerateDistance(u32, u32),

    /// The block backend's workspace would exceed the device memory budget.
    #[error("workspace of {needed} bytes exceeds device budget of {budget} bytes")]
    DeviceOutOfMemory { needed: usize, budget: usize },

    /// A collective primitive failed or was matched out of program order.
    #[error("transport failure: {0}")]
    Transport(String),

    /// Module chaining or a pre-flight check failed before execution.
    #[error("invalid pipeline: {0}")]
    PipelineInvalid(String),

    /// A broken internal invariant. Non-recoverable.
    #[error("internal invariant violated: {0}")]
    InternalInvariant(String),

    /// An input file could not be read or parsed.
    #[error("input error: {0}")]
    Input(String),
}

impl Error {
    /// The process exit code class for this error. Configuration and input
    /// problems exit 1, transport problems 2, device exhaustion 3.
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Transport(_) => 2,
            Error::DeviceOutOfMemory { .. } => 3,
            Error::InternalInvariant(_) => 3,
            _ => 1,
        }
    }

    /// Flattens the error into a (class, message) pair that can cross rank
    /// boundaries during collective error elevation.
    pub fn to_wire(&self) -> (u8, String) {
        let class = match self {
            Error::UnknownAlgorithm(_) => 1,
            Error::UnknownTable(_) => 2,
            Error::UnknownParser(_) => 3,
            Error::EmptyDatabase => 4,
            Error::DegenerateDistance(..) => 5,
            Error::DeviceOutOfMemory { .. } => 6,
            Error::Transport(_) => 7,
            Error::PipelineInvalid(_) => 8,
            Error::InternalInvariant(_) => 9,
            Error::Input(_) => 10,
        };
        (class, self.to_string())
    }

    /// Rebuilds an error from its wire representation. Structured payloads
    /// are not reconstructed; the message carries the detail.
    pub fn from_wire(class: u8, message: String) -> Self {
        match class {
            1 => Error::UnknownAlgorithm(message),
            2 => Error::UnknownTable(message),
            3 => Error::UnknownParser(message),
            4 => Error::EmptyDatabase,
            5 => Error::DegenerateDistance(0, 0),
            6 => Error::DeviceOutOfMemory { needed: 0, budget: 0 },
            7 => Error::Transport(message),
            8 => Error::PipelineInvalid(message),
            9 => Error::InternalInvariant(message),
            _ => Error::Input(message),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Input(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_the_contract() {
        assert_eq!(Error::UnknownTable("blosum99".into()).exit_code(), 1);
        assert_eq!(Error::EmptyDatabase.exit_code(), 1);
        assert_eq!(Error::Transport("mismatched collective".into()).exit_code(), 2);
        assert_eq!(Error::DeviceOutOfMemory { needed: 1, budget: 0 }.exit_code(), 3);
    }

    #[test]
    fn wire_round_trip_preserves_class() {
        let original = Error::UnknownAlgorithm("smith".into());
        let (class, message) = original.to_wire();
        let rebuilt = Error::from_wire(class, message);
        assert_eq!(rebuilt.exit_code(), original.exit_code());
        assert!(matches!(rebuilt, Error::UnknownAlgorithm(_)));
    }
}
