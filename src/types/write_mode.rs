use serde::{Deserialize, Serialize};
use std::fmt;

/// How the table store treats an existing table on write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteMode {
    /// Drop the table and recreate it from the frame.
    #[default]
    Replace,
    /// Insert rows into the table, creating it when absent. Duplicates are not guarded against.
    Append,
}

impl fmt::Display for WriteMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteMode::Replace => write!(f, "replace"),
            WriteMode::Append => write!(f, "append"),
        }
    }
}
