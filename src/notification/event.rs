use std::error::Error;
use std::fmt::{Display, Formatter};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::task::TaskId;

/// The kind the server uses for task reminders
pub const TASK_REMINDER: &str = "TASK_REMINDER";

/// A message pushed by the server on the per-user notification queue
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationEvent {
    #[serde(rename = "type")]
    kind: String,
    task_id: TaskId,
    topic: String,
    message: String,
    timestamp: NaiveDateTime,
}

impl NotificationEvent {
    pub fn new(kind: &str, task_id: TaskId, topic: &str, message: &str, timestamp: NaiveDateTime) -> Self {
        Self {
            kind: kind.to_string(),
            task_id,
            topic: topic.to_string(),
            message: message.to_string(),
            timestamp,
        }
    }

    /// A task reminder, worded the way the server words them
    pub fn reminder(task_id: TaskId, topic: &str, timestamp: NaiveDateTime) -> Self {
        let message = format!("Reminder: Your task \"{}\" is coming up!", topic);
        Self::new(TASK_REMINDER, task_id, topic, &message, timestamp)
    }

    /// Parse the JSON body of a STOMP `MESSAGE` frame
    pub fn from_json(body: &str) -> Result<Self, Box<dyn Error>> {
        Ok(serde_json::from_str(body)?)
    }

    pub fn kind(&self) -> &str                  { &self.kind }
    pub fn task_id(&self) -> TaskId             { self.task_id }
    pub fn topic(&self) -> &str                 { &self.topic }
    pub fn message(&self) -> &str               { &self.message }
    pub fn timestamp(&self) -> &NaiveDateTime   { &self.timestamp }

    pub fn is_reminder(&self) -> bool {
        self.kind == TASK_REMINDER
    }
}

impl Display for NotificationEvent {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}: {} ({})", self.kind, self.topic, self.message, self.timestamp.format("%H:%M"))
    }
}
