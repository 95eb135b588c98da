//! Traits that abstract the planner backend, so that it can be mocked

use async_trait::async_trait;

use crate::error::ApiError;
use crate::response::ApiResponse;
use crate::{Category, Status, Task};
use crate::category::{CategoryCreate, CategoryId};
use crate::task::{TaskCreate, TaskId, TaskQuery, TaskUpdate};
use crate::user::{AuthResponse, ChangeNamePayload, ChangePasswordPayload, LoginPayload, SignUpPayload, UserProfile};

/// A server reply that only acknowledges a request
pub type Ack = ApiResponse<serde_json::Value>;

/// Everything the planner backend can do.
///
/// Queries return their payload. Mutations return the whole envelope, because its message is shown to the user.
#[async_trait]
pub trait PlannerApi: Send + Sync {
    /// Set (or forget) the bearer credential sent with every subsequent request
    fn set_token(&mut self, token: Option<String>);
    /// Whether a bearer credential is currently set
    fn has_token(&self) -> bool;

    async fn login(&self, payload: &LoginPayload) -> Result<ApiResponse<AuthResponse>, ApiError>;
    async fn register(&self, payload: &SignUpPayload) -> Result<Ack, ApiError>;
    async fn logout(&self) -> Result<Ack, ApiError>;
    async fn get_profile(&self) -> Result<UserProfile, ApiError>;
    async fn change_name(&self, payload: &ChangeNamePayload) -> Result<Ack, ApiError>;
    async fn change_password(&self, payload: &ChangePasswordPayload) -> Result<Ack, ApiError>;

    /// Returns the tasks of the signed-in user, optionally restricted to a date range
    async fn get_tasks(&self, query: &TaskQuery) -> Result<Vec<Task>, ApiError>;
    async fn create_task(&self, payload: &TaskCreate) -> Result<Ack, ApiError>;
    async fn update_task(&self, payload: &TaskUpdate) -> Result<Ack, ApiError>;
    async fn delete_task(&self, task_id: TaskId) -> Result<Ack, ApiError>;

    async fn get_categories(&self) -> Result<Vec<Category>, ApiError>;
    async fn create_category(&self, payload: &CategoryCreate) -> Result<Ack, ApiError>;
    async fn delete_category(&self, category_id: CategoryId) -> Result<Ack, ApiError>;

    async fn get_statuses(&self) -> Result<Vec<Status>, ApiError>;
}
