pub mod http;

pub use http::HttpTransfer;

use std::path::{Path, PathBuf};

use crate::models::{CoreError, CoreErrorKind, CoreResult, ProductAction};

/// Moves an installer artifact from its source to a local path.
pub trait Transfer: Send + Sync {
    fn fetch(&self, uri: &str, destination: &Path) -> CoreResult<()>;
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SourceLocation {
    Http(String),
    Local(PathBuf),
}

impl SourceLocation {
    pub fn parse(uri: &str) -> CoreResult<Self> {
        let trimmed = uri.trim();
        if trimmed.is_empty() {
            return Err(fetch_error(
                CoreErrorKind::InvalidInput,
                "artifact source must not be empty".to_string(),
            ));
        }

        let Some((scheme, rest)) = trimmed.split_once("://") else {
            return Ok(Self::Local(PathBuf::from(trimmed)));
        };

        match scheme.to_ascii_lowercase().as_str() {
            "http" | "https" => Ok(Self::Http(trimmed.to_string())),
            "file" => Ok(Self::Local(PathBuf::from(file_uri_path(rest)))),
            other => Err(fetch_error(
                CoreErrorKind::InvalidInput,
                format!("unsupported artifact source scheme '{other}' in '{trimmed}'"),
            )),
        }
    }
}

// `file:///C:/Temp/x.msi` carries a leading slash before the drive letter.
fn file_uri_path(rest: &str) -> &str {
    let bytes = rest.as_bytes();
    if bytes.len() >= 3 && bytes[0] == b'/' && bytes[1].is_ascii_alphabetic() && bytes[2] == b':'
    {
        &rest[1..]
    } else {
        rest
    }
}

pub(crate) fn fetch_error(kind: CoreErrorKind, message: String) -> CoreError {
    CoreError {
        identity: None,
        action: Some(ProductAction::Fetch),
        kind,
        message,
    }
}
