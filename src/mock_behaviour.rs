//! Scripted failures for the mocked backend
//!
//! A [`MockBehaviour`] tells a [`MockApi`](crate::mock_api::MockApi) which calls should be refused, and with which error.
#![cfg(feature = "mock_api")]

use std::collections::HashMap;

use crate::error::ApiError;

/// The families of backend calls a failure can be scripted for
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    Login,
    /// Registration and profile changes
    Account,
    GetTasks,
    /// Task creation, update and deletion
    MutateTask,
    GetCategories,
    /// Category creation and deletion
    MutateCategory,
    GetStatuses,
}

/// What a refused call answers
#[derive(Clone, Debug, PartialEq)]
pub enum MockFailure {
    /// HTTP 401, as if the token had expired
    Unauthorized,
    /// Any other error status, with the message the server puts in its envelope
    Server { code: u16, message: String },
}

impl MockFailure {
    pub fn server(code: u16, message: &str) -> Self {
        MockFailure::Server { code, message: message.to_string() }
    }

    fn to_error(&self) -> ApiError {
        match self {
            MockFailure::Unauthorized => ApiError::Unauthorized,
            MockFailure::Server { code, message } => ApiError::Server { code: *code, message: message.clone() },
        }
    }
}

#[derive(Clone, Debug)]
struct Script {
    remaining_successes: u32,
    remaining_failures: u32,
    failure: MockFailure,
}

/// Per-operation failure scripts.
///
/// An operation with no script always succeeds. Once its scripted failures are used up, it succeeds again.
#[derive(Default, Clone, Debug)]
pub struct MockBehaviour {
    scripts: HashMap<Operation, Script>,
}

impl MockBehaviour {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next `n_fails` calls of `operation` return `failure`
    pub fn fail(self, operation: Operation, n_fails: u32, failure: MockFailure) -> Self {
        self.fail_after(operation, 0, n_fails, failure)
    }

    /// The first `n_successes` calls of `operation` are served, then the next `n_fails` ones return `failure`
    pub fn fail_after(mut self, operation: Operation, n_successes: u32, n_fails: u32, failure: MockFailure) -> Self {
        self.scripts.insert(operation, Script {
            remaining_successes: n_successes,
            remaining_failures: n_fails,
            failure,
        });
        self
    }

    /// Whether a call of `operation` should be served. This uses up one step of its script
    pub fn check(&mut self, operation: Operation) -> Result<(), ApiError> {
        let script = match self.scripts.get_mut(&operation) {
            None => return Ok(()),
            Some(script) => script,
        };

        if script.remaining_successes > 0 {
            script.remaining_successes -= 1;
            log::debug!("Mock behaviour: allowing a {:?} call", operation);
            return Ok(());
        }
        if script.remaining_failures > 0 {
            script.remaining_failures -= 1;
            log::debug!("Mock behaviour: refusing a {:?} call with {:?}", operation, script.failure);
            return Err(script.failure.to_error());
        }

        self.scripts.remove(&operation);
        Ok(())
    }
}
