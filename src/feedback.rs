//! Transient messages for the user (the "toasts" of a GUI)

use std::fmt::{Display, Error, Formatter};

use crate::notification::NotificationEvent;

/// Something the user should be told about
#[derive(Clone, Debug, PartialEq)]
pub enum Feedback {
    /// A mutation succeeded. Contains the message of the server
    Success(String),
    /// A call failed. Contains the message of the server, or a generic one
    Error(String),
    /// A reminder was pushed by the server
    Reminder(NotificationEvent),
}

impl Feedback {
    pub fn is_error(&self) -> bool {
        matches!(self, Feedback::Error(_))
    }
}

impl Display for Feedback {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), Error> {
        match self {
            Feedback::Success(message) => write!(f, "{}", message),
            Feedback::Error(message) => write!(f, "Error: {}", message),
            Feedback::Reminder(event) => write!(f, "{}\n{}\n{}", event.topic(), event.message(), event.timestamp().format("%H:%M")),
        }
    }
}


/// See [`feedback_channel`]
pub type FeedbackSender = tokio::sync::mpsc::UnboundedSender<Feedback>;
/// See [`feedback_channel`]
pub type FeedbackReceiver = tokio::sync::mpsc::UnboundedReceiver<Feedback>;

/// Create a feedback channel, that can be used to display what happens to the user
pub fn feedback_channel() -> (FeedbackSender, FeedbackReceiver) {
    tokio::sync::mpsc::unbounded_channel()
}

/// Log a feedback and send it to the listener (if any)
pub(crate) fn send(channel: Option<&FeedbackSender>, feedback: Feedback) {
    match &feedback {
        Feedback::Error(message) => log::warn!("{}", message),
        other => log::info!("{}", other),
    }
    if let Some(sender) = channel {
        // The receiver may have been dropped, nobody is listening then
        let _ = sender.send(feedback);
    }
}
