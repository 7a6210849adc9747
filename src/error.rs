pub type DeployResult<T> = Result<T, DeployError>;

#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    #[error("command failed: {command} ({}): {stderr}", exit_label(*.code))]
    CommandFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("command not found: {0}")]
    CommandNotFound(String),

    #[error("prerequisite missing: {0}")]
    PrerequisiteMissing(String),

    #[error("invalid repository URL: {0:?}")]
    InvalidRepositoryUrl(String),

    #[error("clone failed: {0}")]
    Fetch(#[source] Box<Self>),

    #[error("invalid domain name: {0:?}")]
    InvalidDomain(String),

    #[error("invalid port: {0:?}")]
    InvalidPort(String),

    #[error("no input available for: {0}")]
    PromptClosed(String),

    #[error("nginx validation or reload failed: {0}")]
    ProxyReload(#[source] Box<Self>),

    #[error("certificate material missing: {0}")]
    CertificateMissing(String),

    #[error("certificate issuance failed: {0}")]
    CertificateIssuance(#[source] Box<Self>),

    #[error("launch failed: {0}")]
    Launch(#[source] Box<Self>),

    #[error("file not found: {0}")]
    FileNotFound(String),

    #[error("{0}")]
    Other(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

impl DeployError {
    /// Process exit code reported by the binary for this failure.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Other(_)
            | Self::FileNotFound(_)
            | Self::Io(_)
            | Self::Json(_)
            | Self::Yaml(_) => 1,
            Self::InvalidRepositoryUrl(_) | Self::Fetch(_) => 3,
            Self::InvalidPort(_) => 4,
            Self::InvalidDomain(_) => 5,
            Self::ProxyReload(_) | Self::CertificateMissing(_) => 6,
            Self::CertificateIssuance(_) => 7,
            Self::Launch(_) => 8,
            Self::CommandFailed { .. } => 9,
            Self::PromptClosed(_) => 10,
            Self::CommandNotFound(_) | Self::PrerequisiteMissing(_) => 127,
        }
    }
}

fn exit_label(code: Option<i32>) -> String {
    code.map_or_else(|| "terminated by signal".to_string(), |c| format!("exit {c}"))
}
