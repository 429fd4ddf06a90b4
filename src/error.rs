use core::fmt;

/// Result alias for `emomix`.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by clustering, training and classification.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Input was empty.
    EmptyInput,

    /// Vector dimension disagrees with the model or data dimension.
    DimensionMismatch {
        /// Expected dimension.
        expected: usize,
        /// Found dimension.
        found: usize,
    },

    /// Operands of an element-wise vector operation differ in length.
    LengthMismatch {
        /// Length of the target operand.
        left: usize,
        /// Length of the source operand.
        right: usize,
    },

    /// Fewer points than clusters requested.
    InsufficientData {
        /// Requested cluster count.
        requested: usize,
        /// Number of points available.
        n_items: usize,
    },

    /// A cluster ended with no members after the final assignment.
    DegenerateCluster {
        /// Index of the empty cluster.
        cluster: usize,
    },

    /// Log-likelihood became NaN during EM. The training run is invalid.
    NumericalDivergence {
        /// EM step at which the divergence was detected.
        iteration: usize,
    },

    /// Every component of a mixture assigned zero density to the query.
    ZeroLikelihood,

    /// Invalid parameter value.
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Error message.
        message: &'static str,
    },

    /// Filesystem failure while reading or writing models.
    Io(String),

    /// Model record could not be encoded or decoded.
    Serialization(String),

    /// Generic error with message.
    Other(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::EmptyInput => write!(f, "empty input provided"),
            Error::DimensionMismatch { expected, found } => {
                write!(f, "dimension mismatch: expected {expected}, found {found}")
            }
            Error::LengthMismatch { left, right } => {
                write!(f, "vector length mismatch: {left} != {right}")
            }
            Error::InsufficientData { requested, n_items } => {
                write!(f, "cannot create {requested} clusters from {n_items} items")
            }
            Error::DegenerateCluster { cluster } => {
                write!(f, "cluster {cluster} has no members")
            }
            Error::NumericalDivergence { iteration } => {
                write!(f, "log-likelihood is NaN at EM step {iteration}")
            }
            Error::ZeroLikelihood => write!(f, "the likelihood is 0"),
            Error::InvalidParameter { name, message } => {
                write!(f, "invalid parameter '{name}': {message}")
            }
            Error::Io(msg) => write!(f, "io error: {msg}"),
            Error::Serialization(msg) => write!(f, "serialization error: {msg}"),
            Error::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
