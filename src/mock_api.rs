//! An in-memory planner backend, that can be used in place of the REST [`Client`](crate::client::Client) in tests
#![cfg(feature = "mock_api")]

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::NaiveDateTime;

use crate::error::ApiError;
use crate::mock_behaviour::{MockBehaviour, Operation};
use crate::response::ApiResponse;
use crate::traits::{Ack, PlannerApi};
use crate::{Category, Status, Task};
use crate::category::{CategoryCreate, CategoryId};
use crate::task::{TaskCreate, TaskId, TaskQuery, TaskUpdate};
use crate::user::{AuthResponse, ChangeNamePayload, ChangePasswordPayload, LoginPayload, SignUpPayload, UserId, UserProfile};

#[derive(Clone, Debug)]
struct MockUser {
    id: UserId,
    name: String,
    email: String,
    password: String,
}

#[derive(Default, Debug)]
struct MockData {
    users: Vec<MockUser>,
    /// Valid bearer tokens, and who they belong to
    sessions: HashMap<String, UserId>,
    tasks: Vec<(UserId, Task)>,
    categories: Vec<(UserId, Category)>,
    statuses: Vec<Status>,
    next_id: i64,
    behaviour: MockBehaviour,
}

impl MockData {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// A mocked planner server.
///
/// It comes with the three default statuses of the real server (`To Do`, `In Progress`, `Completed`).
#[derive(Debug)]
pub struct MockApi {
    token: Option<String>,
    data: Mutex<MockData>,
}

impl Default for MockApi {
    fn default() -> Self {
        Self::new()
    }
}

impl MockApi {
    pub fn new() -> Self {
        let data = MockData {
            statuses: vec![
                Status::new(1, "To Do"),
                Status::new(2, "In Progress"),
                Status::new(3, "Completed"),
            ],
            next_id: 100,
            ..MockData::default()
        };
        Self { token: None, data: Mutex::new(data) }
    }

    fn lock(&self) -> MutexGuard<'_, MockData> {
        match self.data.lock() {
            Ok(data) => data,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Register a user directly, and return its ID
    pub fn add_user(&self, name: &str, email: &str, password: &str) -> UserId {
        let mut data = self.lock();
        let id = data.next_id();
        data.users.push(MockUser { id, name: name.to_string(), email: email.to_string(), password: password.to_string() });
        id
    }

    /// Store a task for a user, bypassing every check
    pub fn insert_task(&self, user: UserId, task: Task) {
        self.lock().tasks.push((user, task));
    }

    /// Forget every session, so that any subsequent authenticated call returns HTTP 401
    pub fn expire_sessions(&self) {
        self.lock().sessions.clear();
    }

    pub fn set_behaviour(&self, behaviour: MockBehaviour) {
        self.lock().behaviour = behaviour;
    }

    /// The name currently stored for a user
    pub fn user_name(&self, user: UserId) -> Option<String> {
        self.lock().users.iter().find(|u| u.id == user).map(|u| u.name.clone())
    }

    /// The number of tasks stored for every user
    pub fn task_count(&self) -> usize {
        self.lock().tasks.len()
    }

    /// Returns the user of the current token, or `Unauthorized`
    fn authenticate(&self, data: &MockData) -> Result<UserId, ApiError> {
        self.token.as_ref()
            .and_then(|token| data.sessions.get(token))
            .copied()
            .ok_or(ApiError::Unauthorized)
    }

    fn build_task(data: &MockData, user: UserId, id: TaskId, fields: &TaskCreate, created: NaiveDateTime) -> Result<Task, ApiError> {
        if fields.topic.trim().is_empty() || fields.topic.chars().count() > 30 {
            return Err(bad_request("Topic must be between 1 and 30 characters"));
        }
        let status = data.statuses.iter()
            .find(|s| s.id() == fields.status_id)
            .cloned()
            .ok_or_else(|| not_found("Status not found"))?;

        let mut task = Task::new(id, fields.topic.clone(), status, created);
        if let Some(description) = &fields.description {
            task = task.with_description(description.clone());
        }
        if let Some(category_id) = fields.category_id {
            let category = data.categories.iter()
                .find(|(owner, c)| *owner == user && c.id() == category_id)
                .map(|(_, c)| c.clone())
                .ok_or_else(|| not_found("Category not found"))?;
            task = task.with_category(category);
        }
        if let Some(start) = fields.start_time {
            task = task.with_start_time(start);
        }
        if let Some(end) = fields.end_time {
            task = task.with_end_time(end);
        }
        if let (Some(true), Some(at)) = (fields.reminder, fields.reminder_time) {
            task = task.with_reminder(at);
        }
        Ok(task)
    }
}

fn ack(message: &str) -> Ack {
    ApiResponse { status: "success".to_string(), code: 200, message: message.to_string(), data: None }
}

fn bad_request(message: &str) -> ApiError {
    ApiError::Server { code: 400, message: message.to_string() }
}

fn not_found(message: &str) -> ApiError {
    ApiError::Server { code: 404, message: message.to_string() }
}

fn now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

#[async_trait]
impl PlannerApi for MockApi {
    fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    fn has_token(&self) -> bool {
        self.token.is_some()
    }

    async fn login(&self, payload: &LoginPayload) -> Result<ApiResponse<AuthResponse>, ApiError> {
        let mut data = self.lock();
        data.behaviour.check(Operation::Login)?;

        let user = data.users.iter()
            .find(|u| u.email == payload.email && u.password == payload.password)
            .cloned()
            .ok_or(ApiError::Server { code: 400, message: "Invalid email or password".to_string() })?;

        let token = uuid::Uuid::new_v4().to_hyphenated().to_string();
        data.sessions.insert(token.clone(), user.id);

        Ok(ApiResponse {
            status: "success".to_string(),
            code: 200,
            message: "Login successful".to_string(),
            data: Some(AuthResponse {
                token,
                token_type: "Bearer".to_string(),
                user_id: user.id,
                email: user.email,
                name: user.name,
            }),
        })
    }

    async fn register(&self, payload: &SignUpPayload) -> Result<Ack, ApiError> {
        {
            let mut data = self.lock();
            data.behaviour.check(Operation::Account)?;
            if data.users.iter().any(|u| u.email == payload.email) {
                return Err(bad_request("Email already registered"));
            }
        }
        self.add_user(&payload.name, &payload.email, &payload.password);
        Ok(ack("User registered successfully"))
    }

    async fn logout(&self) -> Result<Ack, ApiError> {
        let mut data = self.lock();
        self.authenticate(&data)?;
        if let Some(token) = &self.token {
            data.sessions.remove(token);
        }
        Ok(ack("Logout successful"))
    }

    async fn get_profile(&self) -> Result<UserProfile, ApiError> {
        let data = self.lock();
        let user_id = self.authenticate(&data)?;
        data.users.iter()
            .find(|u| u.id == user_id)
            .map(|u| UserProfile { name: u.name.clone(), email: u.email.clone() })
            .ok_or_else(|| not_found("User not found"))
    }

    async fn change_name(&self, payload: &ChangeNamePayload) -> Result<Ack, ApiError> {
        let mut data = self.lock();
        let user_id = self.authenticate(&data)?;
        data.behaviour.check(Operation::Account)?;
        if payload.name.trim().is_empty() {
            return Err(bad_request("Name is required"));
        }
        if let Some(user) = data.users.iter_mut().find(|u| u.id == user_id) {
            user.name = payload.name.clone();
        }
        Ok(ack("Name changed successfully"))
    }

    async fn change_password(&self, payload: &ChangePasswordPayload) -> Result<Ack, ApiError> {
        let mut data = self.lock();
        let user_id = self.authenticate(&data)?;
        data.behaviour.check(Operation::Account)?;
        let user = data.users.iter_mut()
            .find(|u| u.id == user_id)
            .ok_or_else(|| not_found("User not found"))?;
        if user.password != payload.current_password {
            return Err(bad_request("Current password is incorrect"));
        }
        user.password = payload.new_password.clone();
        Ok(ack("Password changed successfully"))
    }

    async fn get_tasks(&self, query: &TaskQuery) -> Result<Vec<Task>, ApiError> {
        let mut data = self.lock();
        let user_id = self.authenticate(&data)?;
        data.behaviour.check(Operation::GetTasks)?;
        Ok(data.tasks.iter()
            .filter(|(owner, task)| *owner == user_id && query.matches(task))
            .map(|(_, task)| task.clone())
            .collect())
    }

    async fn create_task(&self, payload: &TaskCreate) -> Result<Ack, ApiError> {
        let mut data = self.lock();
        let user_id = self.authenticate(&data)?;
        data.behaviour.check(Operation::MutateTask)?;
        let id = data.next_id();
        let task = Self::build_task(&data, user_id, id, payload, now())?;
        data.tasks.push((user_id, task));
        Ok(ApiResponse { code: 201, ..ack("Task created successfully") })
    }

    async fn update_task(&self, payload: &TaskUpdate) -> Result<Ack, ApiError> {
        let mut data = self.lock();
        let user_id = self.authenticate(&data)?;
        data.behaviour.check(Operation::MutateTask)?;
        let position = data.tasks.iter()
            .position(|(owner, task)| *owner == user_id && task.id() == payload.task_id)
            .ok_or_else(|| not_found("Task not found"))?;
        let created = *data.tasks[position].1.create_time();
        let updated = Self::build_task(&data, user_id, payload.task_id, &payload.fields, created)?;
        data.tasks[position].1 = updated;
        Ok(ack("Task updated successfully"))
    }

    async fn delete_task(&self, task_id: TaskId) -> Result<Ack, ApiError> {
        let mut data = self.lock();
        let user_id = self.authenticate(&data)?;
        data.behaviour.check(Operation::MutateTask)?;
        let before = data.tasks.len();
        data.tasks.retain(|(owner, task)| (*owner == user_id && task.id() == task_id) == false);
        if data.tasks.len() == before {
            return Err(not_found("Task not found"));
        }
        Ok(ack("Task deleted successfully"))
    }

    async fn get_categories(&self) -> Result<Vec<Category>, ApiError> {
        let mut data = self.lock();
        let user_id = self.authenticate(&data)?;
        data.behaviour.check(Operation::GetCategories)?;
        Ok(data.categories.iter()
            .filter(|(owner, _)| *owner == user_id)
            .map(|(_, c)| c.clone())
            .collect())
    }

    async fn create_category(&self, payload: &CategoryCreate) -> Result<Ack, ApiError> {
        let mut data = self.lock();
        let user_id = self.authenticate(&data)?;
        data.behaviour.check(Operation::MutateCategory)?;
        if payload.category_name.trim().is_empty() {
            return Err(bad_request("Category name is required"));
        }
        let id = data.next_id();
        data.categories.push((user_id, Category::new(id, &payload.category_name)));
        Ok(ApiResponse { code: 201, ..ack("Category created successfully") })
    }

    async fn delete_category(&self, category_id: CategoryId) -> Result<Ack, ApiError> {
        let mut data = self.lock();
        let user_id = self.authenticate(&data)?;
        data.behaviour.check(Operation::MutateCategory)?;
        let before = data.categories.len();
        data.categories.retain(|(owner, c)| (*owner == user_id && c.id() == category_id) == false);
        if data.categories.len() == before {
            return Err(not_found("Category not found"));
        }
        Ok(ack("Category deleted successfully"))
    }

    async fn get_statuses(&self) -> Result<Vec<Status>, ApiError> {
        let mut data = self.lock();
        self.authenticate(&data)?;
        data.behaviour.check(Operation::GetStatuses)?;
        Ok(data.statuses.clone())
    }
}
