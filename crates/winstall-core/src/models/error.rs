use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::ProductAction;

pub type CoreResult<T> = Result<T, CoreError>;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoreErrorKind {
    CollectionFailure,
    FetchFailure,
    ApplyFailure,
    RemoveFailure,
    /// Warning level: never changes the outcome of the action it is attached to.
    CleanupFailure,
    InvalidInput,
    ParseFailure,
    Timeout,
    ProcessFailure,
    Internal,
}

#[derive(Clone, Debug, Eq, PartialEq, Error, Serialize, Deserialize)]
#[error("{kind:?}: {message}")]
pub struct CoreError {
    pub identity: Option<String>,
    pub action: Option<ProductAction>,
    pub kind: CoreErrorKind,
    pub message: String,
}

impl CoreError {
    pub fn new(kind: CoreErrorKind, message: impl Into<String>) -> Self {
        Self {
            identity: None,
            action: None,
            kind,
            message: message.into(),
        }
    }

    pub fn identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = Some(identity.into());
        self
    }

    pub fn action(mut self, action: ProductAction) -> Self {
        self.action = Some(action);
        self
    }

    /// Fills in identity and action where the collaborator left them unset
    /// and reclassifies the error as `kind`, keeping the original cause in
    /// the message. Timeouts keep their kind.
    pub fn attribute(self, identity: &str, action: ProductAction, kind: CoreErrorKind) -> Self {
        let kind = if self.kind == CoreErrorKind::Timeout {
            CoreErrorKind::Timeout
        } else {
            kind
        };
        let message = if self.kind == kind {
            self.message
        } else {
            format!("{:?}: {}", self.kind, self.message)
        };

        Self {
            identity: self.identity.or_else(|| Some(identity.to_string())),
            action: self.action.or(Some(action)),
            kind,
            message,
        }
    }
}
