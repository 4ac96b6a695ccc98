//! Aggregate results of multi-item operations.

use std::fmt::Write as _;

use crate::core::path;
use crate::error::WorkspaceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOp {
    Move,
    Copy,
    Delete,
}

impl BatchOp {
    fn verb(self) -> &'static str {
        match self {
            BatchOp::Move => "move",
            BatchOp::Copy => "copy",
            BatchOp::Delete => "delete",
        }
    }

    fn past(self) -> &'static str {
        match self {
            BatchOp::Move => "Moved",
            BatchOp::Copy => "Copied",
            BatchOp::Delete => "Deleted",
        }
    }
}

/// One failed item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemError {
    pub path: String,
    pub name: String,
    pub error: WorkspaceError,
}

/// Overall result, from the user's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Order-map-only change, nothing touched on disk.
    Reordered,
    /// Every item succeeded.
    Completed,
    /// Some items succeeded, some failed.
    Partial,
    /// Every item failed.
    Failed,
    /// Nothing needed doing (e.g. dropped into its current folder).
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReport {
    pub op: BatchOp,
    /// `(old path, new path)` per successful item.  For deletes both are
    /// the deleted path.
    pub succeeded: Vec<(String, String)>,
    pub unchanged: Vec<String>,
    pub errors: Vec<ItemError>,
    pub reordered: bool,
}

impl BatchReport {
    pub fn new(op: BatchOp) -> Self {
        Self {
            op,
            succeeded: Vec::new(),
            unchanged: Vec::new(),
            errors: Vec::new(),
            reordered: false,
        }
    }

    pub fn reorder() -> Self {
        Self {
            reordered: true,
            ..Self::new(BatchOp::Move)
        }
    }

    pub fn success(&mut self, from: &str, to: &str) {
        self.succeeded.push((from.to_string(), to.to_string()));
    }

    pub fn skip(&mut self, path: &str) {
        self.unchanged.push(path.to_string());
    }

    pub fn fail(&mut self, path: &str, error: impl Into<WorkspaceError>) {
        self.errors.push(ItemError {
            path: path.to_string(),
            name: path::basename(path).to_string(),
            error: error.into(),
        });
    }

    /// New location of `old`, if it was processed successfully.
    pub fn destination_of(&self, old: &str) -> Option<&str> {
        self.succeeded
            .iter()
            .find(|(from, _)| from == old)
            .map(|(_, to)| to.as_str())
    }

    pub fn outcome(&self) -> Outcome {
        if self.reordered {
            return Outcome::Reordered;
        }
        match (self.succeeded.is_empty(), self.errors.is_empty()) {
            (true, true) => Outcome::Unchanged,
            (false, true) => Outcome::Completed,
            (false, false) => Outcome::Partial,
            (true, false) => Outcome::Failed,
        }
    }

    /// Message for the status bar.
    pub fn summary(&self) -> String {
        let ok = self.succeeded.len();
        let total = ok + self.errors.len();
        let mut msg = match self.outcome() {
            Outcome::Reordered => return "Reordered".to_string(),
            Outcome::Unchanged => return "Nothing to do".to_string(),
            Outcome::Completed => {
                return format!("{} {}", self.op.past(), items(ok));
            }
            Outcome::Partial => format!("{} {ok} of {}", self.op.past(), items(total)),
            Outcome::Failed => format!("Could not {} {}", self.op.verb(), items(total)),
        };
        msg.push_str(": ");
        for (i, err) in self.errors.iter().enumerate() {
            if i > 0 {
                msg.push_str("; ");
            }
            let _ = write!(msg, "{} ({})", err.name, err.error);
        }
        msg
    }
}

fn items(n: usize) -> String {
    if n == 1 {
        "1 item".to_string()
    } else {
        format!("{n} items")
    }
}
