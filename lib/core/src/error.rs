use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Unknown distance measure '{0}'")]
    UnknownDistance(String),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Container error: {0}")]
    Container(String),

    #[error("Field '{field}' is declared {expected} but the record holds {found}")]
    DataConsistency {
        field: String,
        expected: String,
        found: String,
    },
}

impl Error {
    /// Configuration-class failures: bad options, empty inputs, unresolvable names.
    pub fn is_config(&self) -> bool {
        matches!(self, Error::Config(_) | Error::UnknownDistance(_) | Error::Schema(_))
    }
}

impl From<apache_avro::Error> for Error {
    fn from(err: apache_avro::Error) -> Self {
        Error::Decode(err.to_string())
    }
}
