use serde::{Deserialize, Serialize};

/// Decision taken for one desired product in a reconciliation cycle.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconciliationAction {
    NoOp,
    Install,
    Remove,
}

impl ReconciliationAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NoOp => "no_op",
            Self::Install => "install",
            Self::Remove => "remove",
        }
    }

    pub fn is_change(self) -> bool {
        !matches!(self, Self::NoOp)
    }
}

/// Side-effecting step an error or process request is attributed to.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductAction {
    Collect,
    Fetch,
    Apply,
    Remove,
    Cleanup,
}
