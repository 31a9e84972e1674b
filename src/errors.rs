use std::path::PathBuf;
use thiserror::Error;

pub(crate) type Result<T> = std::result::Result<T, Error>;

/// User-facing failures. None of them are retried; the CLI prints the message
/// and exits non-zero.
#[derive(Debug, Error)]
pub(crate) enum Error {
    #[error("{0} is an Invalid Layer Arn.")]
    InvalidLayerVersionArn(String),

    #[error("{0} is an Unsupported Intrinsic")]
    UnsupportedIntrinsic(String),

    #[error("ContentUri {0} does not exist")]
    InvalidLayerVersionContentUri(String),

    #[error("Failed to read template {}: {source}", .path.display())]
    TemplateRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse template {}: {message}", .path.display())]
    TemplateParse { path: PathBuf, message: String },

    #[error("Prompt failed: {0}")]
    Prompt(String),
}

impl From<dialoguer::Error> for Error {
    fn from(err: dialoguer::Error) -> Self {
        Error::Prompt(err.to_string())
    }
}
