use thiserror::Error;

#[derive(Error, Debug)]
pub enum LinktuneError {
    /// The matcher can never reach the threshold with these property bounds.
    #[error("Invalid matching configuration: {0}")]
    ConfigInvalid(String),

    #[error("Record has no identity value: {0}")]
    IdentityMissing(String),

    #[error("F-measure {fmeasure} exceeds 1.0, scoring is broken upstream")]
    SanityViolation { fmeasure: f64 },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Data loading error: {0}")]
    DataLoading(String),

    #[error("Unknown comparator: {0}")]
    UnknownComparator(String),

    #[error("Cannot parse genome: {0}")]
    GenomeParse(String),

    #[error("Oracle error: {0}")]
    Oracle(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("Config source error: {0}")]
    ConfigSource(#[from] config::ConfigError),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("Thread pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl LinktuneError {
    /// Process exit code for an error that aborted the run.
    pub fn exit_code(&self) -> i32 {
        match self {
            LinktuneError::SanityViolation { .. } => 3,
            _ => 1,
        }
    }
}

pub type Result<T> = std::result::Result<T, LinktuneError>;
