//! Task statuses
//!
//! Statuses are a small fixed set defined by the server (e.g. "To Do", "In Progress", "Completed").

use serde::{Deserialize, Serialize};

pub type StatusId = i64;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Status {
    status_id: StatusId,
    status_name: String,
}

impl Status {
    pub fn new<S: ToString>(status_id: StatusId, status_name: S) -> Self {
        Self { status_id, status_name: status_name.to_string() }
    }

    pub fn id(&self) -> StatusId    { self.status_id }
    pub fn name(&self) -> &str      { &self.status_name }

    /// Whether this status means the task is done
    pub fn is_done(&self) -> bool {
        matches!(self.status_name.as_str(), "Completed" | "Done")
    }
}

/// The status of a task, as embedded in a [`Task`](crate::Task)
pub type StatusInfo = Status;
