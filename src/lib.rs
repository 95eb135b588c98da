//! This crate is the client side of the MyPlanner task planner.
//!
//! It provides a client for the planner REST API in the [`client`] module, that can be used as a stand-alone module.
//!
//! The [`calendar`] module lays the tasks out in month grids, and the [`notification`] module receives the reminders
//! the server pushes over a STOMP-over-WebSocket connection.
//!
//! These are tied together by a [`Planner`](planner::Planner), that also keeps the application state (see the [`state`] module)
//! and applies a common error policy: failures are reported as [`Feedback`](feedback::Feedback), and an expired session
//! logs the user out.

pub mod traits;

pub mod calendar;
mod task;
pub use task::{Task, TaskCreate, TaskId, TaskQuery, TaskUpdate};
pub mod category;
pub use category::Category;
pub mod status;
pub use status::Status;
pub mod user;

pub mod error;
pub use error::ApiError;
pub mod response;
pub mod client;
pub mod notification;
pub use notification::{NotificationChannel, NotificationEvent};
pub mod state;
pub use state::AppState;
pub mod feedback;
pub mod planner;
pub use planner::{Planner, RestPlanner};

#[cfg(feature = "mock_api")]
pub mod mock_api;
#[cfg(feature = "mock_api")]
pub mod mock_behaviour;

pub mod config;
pub mod utils;
