//! This module provides a client to connect to the planner REST API

use async_trait::async_trait;
use reqwest::{Method, RequestBuilder};
use reqwest::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use crate::error::ApiError;
use crate::response::ApiResponse;
use crate::traits::{Ack, PlannerApi};
use crate::{Category, Status, Task};
use crate::category::{CategoryCreate, CategoryId};
use crate::task::{TaskCreate, TaskId, TaskQuery, TaskUpdate};
use crate::user::{AuthResponse, ChangeNamePayload, ChangePasswordPayload, LoginPayload, SignUpPayload, UserProfile};


/// A planner source that fetches its data from the REST server
pub struct Client {
    base_url: Url,
    token: Option<String>,

    http: reqwest::Client,
}

impl Client {
    /// Create a client. This does not start a connection
    pub fn new<S: AsRef<str>>(base_url: S) -> Result<Self, ApiError> {
        let base_url = Url::parse(base_url.as_ref().trim_end_matches('/'))?;

        Ok(Self {
            base_url,
            token: None,
            http: reqwest::Client::new(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build the URL of an endpoint. `path` is relative to the API root, e.g. `/task/get`
    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        let url = format!("{}{}", self.base_url.as_str().trim_end_matches('/'), path);
        Ok(Url::parse(&url)?)
    }

    fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ApiError> {
        let url = self.endpoint(path)?;
        let builder = self.http
            .request(method, url)
            .header(CONTENT_TYPE, "application/json");

        Ok(match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        })
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<ApiResponse<T>, ApiError> {
        let response = builder.send().await?;
        let status = response.status();
        let text = response.text().await?;
        log::trace!("Server replied {}: {}", status, text);

        crate::response::decode(status.as_u16(), &text)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        log::debug!("GET {}", path);
        let builder = self.request(Method::GET, path)?;
        self.send(builder).await?.into_data()
    }

    async fn with_body<B, T>(&self, method: Method, path: &str, body: Option<&B>) -> Result<ApiResponse<T>, ApiError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        log::debug!("{} {}", method, path);
        let mut builder = self.request(method, path)?;
        if let Some(body) = body {
            builder = builder.json(body);
        }
        self.send(builder).await
    }
}

#[async_trait]
impl PlannerApi for Client {
    fn set_token(&mut self, token: Option<String>) {
        self.token = token;
    }

    fn has_token(&self) -> bool {
        self.token.is_some()
    }

    async fn login(&self, payload: &LoginPayload) -> Result<ApiResponse<AuthResponse>, ApiError> {
        self.with_body(Method::POST, "/user/login", Some(payload)).await
    }

    async fn register(&self, payload: &SignUpPayload) -> Result<Ack, ApiError> {
        self.with_body(Method::POST, "/user/register", Some(payload)).await
    }

    async fn logout(&self) -> Result<Ack, ApiError> {
        self.with_body::<(), _>(Method::POST, "/user/logout", None).await
    }

    async fn get_profile(&self) -> Result<UserProfile, ApiError> {
        self.get("/user/profile").await
    }

    async fn change_name(&self, payload: &ChangeNamePayload) -> Result<Ack, ApiError> {
        self.with_body(Method::PUT, "/user/change-name", Some(payload)).await
    }

    async fn change_password(&self, payload: &ChangePasswordPayload) -> Result<Ack, ApiError> {
        self.with_body(Method::PUT, "/user/change-password", Some(payload)).await
    }

    async fn get_tasks(&self, query: &TaskQuery) -> Result<Vec<Task>, ApiError> {
        log::debug!("GET /task/get ({:?})", query);
        let builder = self.request(Method::GET, "/task/get")?.query(query);
        self.send(builder).await?.into_data()
    }

    async fn create_task(&self, payload: &TaskCreate) -> Result<Ack, ApiError> {
        self.with_body(Method::POST, "/task/create", Some(payload)).await
    }

    async fn update_task(&self, payload: &TaskUpdate) -> Result<Ack, ApiError> {
        self.with_body(Method::PUT, "/task/update", Some(payload)).await
    }

    async fn delete_task(&self, task_id: TaskId) -> Result<Ack, ApiError> {
        self.with_body::<(), _>(Method::DELETE, &format!("/task/delete/{}", task_id), None).await
    }

    async fn get_categories(&self) -> Result<Vec<Category>, ApiError> {
        self.get("/category/all").await
    }

    async fn create_category(&self, payload: &CategoryCreate) -> Result<Ack, ApiError> {
        self.with_body(Method::POST, "/category/create", Some(payload)).await
    }

    async fn delete_category(&self, category_id: CategoryId) -> Result<Ack, ApiError> {
        self.with_body::<(), _>(Method::DELETE, &format!("/category/delete/{}", category_id), None).await
    }

    async fn get_statuses(&self) -> Result<Vec<Status>, ApiError> {
        self.get("/status/all").await
    }
}
