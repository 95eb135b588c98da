//! The planner combines a backend, the application state and the notification channel
//!
//! It is responsible for keeping them consistent: the session, the fetched data and the notification subscription
//! are started and torn down together.

use std::path::Path;

use crate::calendar::{MonthGrid, YearMonth};
use crate::category::{CategoryCreate, CategoryId};
use crate::client::Client;
use crate::config::Settings;
use crate::error::ApiError;
use crate::feedback::{self, Feedback, FeedbackSender};
use crate::notification::{ListenerId, NotificationChannel};
use crate::state::{AppState, Session, UiState};
use crate::task::{TaskCreate, TaskId, TaskQuery, TaskUpdate};
use crate::traits::{Ack, PlannerApi};
use crate::user::{ChangeNamePayload, ChangePasswordPayload, LoginPayload, SignUpPayload};

/// A planner that talks to the actual REST server
pub type RestPlanner = Planner<Client>;

/// The client-side planner.
///
/// Every failed call is reported to the feedback channel (if any) and returned.
/// An `Unauthorized` error from any call ends the session, as an explicit [`logout`](Self::logout) would.
pub struct Planner<A: PlannerApi> {
    api: A,
    state: AppState,
    notifications: NotificationChannel,

    feedback_channel: Option<FeedbackSender>,
    reminder_listener: Option<ListenerId>,
}

impl RestPlanner {
    /// A planner for the server and broker of `settings`, whose state is saved to `state_file`
    pub fn from_settings(settings: &Settings, state_file: &Path) -> Result<Self, ApiError> {
        let client = Client::new(&settings.api_url)?;
        let state = AppState::load_or_default(state_file);
        let notifications = NotificationChannel::with_websocket(settings);
        Ok(Self::new(client, state, notifications))
    }
}

impl<A: PlannerApi> Planner<A> {
    pub fn new(api: A, state: AppState, notifications: NotificationChannel) -> Self {
        Self { api, state, notifications, feedback_channel: None, reminder_listener: None }
    }

    /// Report successes, errors and reminders to `channel`
    pub fn with_feedback_channel(mut self, channel: FeedbackSender) -> Self {
        if let Some(previous) = self.reminder_listener.take() {
            self.notifications.unsubscribe(previous);
        }
        let sender = channel.clone();
        let listener = self.notifications.on_notification(move |event| {
            feedback::send(Some(&sender), Feedback::Reminder(event.clone()));
        });
        self.reminder_listener = Some(listener);
        self.feedback_channel = Some(channel);
        self
    }

    pub fn api(&self) -> &A                                 { &self.api }
    pub fn api_mut(&mut self) -> &mut A                     { &mut self.api }
    pub fn state(&self) -> &AppState                        { &self.state }
    pub fn notifications(&self) -> &NotificationChannel     { &self.notifications }

    pub fn is_logged_in(&self) -> bool {
        self.state.is_authenticated()
    }

    /// Update the UI state (selection, filters, theme...)
    pub fn update_ui<F: FnOnce(&mut UiState)>(&mut self, f: F) {
        self.state.update_ui(f)
    }

    /// The grid of the displayed month, with the active filters applied
    pub fn month_grid(&self) -> MonthGrid<'_> {
        self.state.month_grid()
    }


    fn feedback(&self, feedback: Feedback) {
        feedback::send(self.feedback_channel.as_ref(), feedback);
    }

    /// Report an error, and end the session in case it is no longer valid
    fn failed(&mut self, err: ApiError) -> ApiError {
        if err.is_unauthorized() && self.state.is_authenticated() {
            log::warn!("The server rejected our credentials, logging out");
            self.end_session();
        }
        self.feedback(Feedback::Error(err.user_message()));
        err
    }

    /// Report the outcome of a mutation
    fn acknowledged(&mut self, result: Result<Ack, ApiError>) -> Result<(), ApiError> {
        match result {
            Ok(ack) => {
                self.feedback(Feedback::Success(ack.message));
                Ok(())
            },
            Err(err) => Err(self.failed(err)),
        }
    }

    fn start_session(&mut self, session: Session) {
        log::info!("Logged in as {} (user {})", session.email(), session.user_id());
        self.api.set_token(Some(session.token().to_string()));
        self.notifications.connect(session.user_id(), session.token());
        self.state.set_session(session);
    }

    fn end_session(&mut self) {
        self.notifications.disconnect();
        self.api.set_token(None);
        self.state.logout();
    }


    /// Sign in, and subscribe to the notifications of this user
    pub async fn login(&mut self, email: &str, password: &str) -> Result<(), ApiError> {
        let payload = LoginPayload { email: email.to_string(), password: password.to_string() };
        let result = self.api.login(&payload).await;
        let response = match result {
            Ok(response) => response,
            Err(err) => return Err(self.failed(err)),
        };
        let message = response.message.clone();
        let auth = match response.into_data() {
            Ok(auth) => auth,
            Err(err) => return Err(self.failed(err)),
        };

        // Starting a new session ends any previous one
        if self.state.is_authenticated() {
            self.end_session();
        }
        self.start_session(Session::from(auth));
        self.feedback(Feedback::Success(message));
        Ok(())
    }

    /// Pick up the session that was persisted by a previous run, if any. Returns whether there was one
    pub fn resume_session(&mut self) -> bool {
        match self.state.session().cloned() {
            None => false,
            Some(session) => {
                log::info!("Resuming the session of {}", session.email());
                self.api.set_token(Some(session.token().to_string()));
                self.notifications.connect(session.user_id(), session.token());
                true
            },
        }
    }

    pub async fn register(&mut self, name: &str, email: &str, password: &str) -> Result<(), ApiError> {
        let payload = SignUpPayload { name: name.to_string(), email: email.to_string(), password: password.to_string() };
        let result = self.api.register(&payload).await;
        self.acknowledged(result)
    }

    /// Sign out. The local session is always torn down, even if the server could not be told
    pub async fn logout(&mut self) {
        if self.api.has_token() {
            if let Err(err) = self.api.logout().await {
                log::warn!("Unable to log out from the server: {}", err);
            }
        }
        self.end_session();
    }

    /// Fetch the profile, and update the displayed name
    pub async fn refresh_profile(&mut self) -> Result<(), ApiError> {
        let result = self.api.get_profile().await;
        match result {
            Ok(profile) => {
                self.state.set_user_name(&profile.name);
                Ok(())
            },
            Err(err) => Err(self.failed(err)),
        }
    }

    pub async fn change_name(&mut self, name: &str) -> Result<(), ApiError> {
        let result = self.api.change_name(&ChangeNamePayload { name: name.to_string() }).await;
        self.acknowledged(result)?;
        self.state.set_user_name(name);
        Ok(())
    }

    pub async fn change_password(&mut self, current_password: &str, new_password: &str) -> Result<(), ApiError> {
        let payload = ChangePasswordPayload {
            current_password: current_password.to_string(),
            new_password: new_password.to_string(),
        };
        let result = self.api.change_password(&payload).await;
        self.acknowledged(result)
    }


    /// Fetch the tasks of the displayed month
    pub async fn refresh_tasks(&mut self) -> Result<(), ApiError> {
        let (start, end) = self.state.ui().current_month().date_time_range();
        self.state.start_loading();
        let result = self.api.get_tasks(&TaskQuery::between(start, end)).await;
        match result {
            Ok(tasks) => {
                log::debug!("Fetched {} tasks", tasks.len());
                self.state.set_tasks(tasks);
                Ok(())
            },
            Err(err) => {
                self.state.set_error(err.user_message());
                Err(self.failed(err))
            },
        }
    }

    /// Display another month, and fetch its tasks
    pub async fn show_month(&mut self, month: YearMonth) -> Result<(), ApiError> {
        self.state.update_ui(|ui| ui.set_current_month(month));
        self.refresh_tasks().await
    }

    pub async fn next_month(&mut self) -> Result<(), ApiError> {
        let month = self.state.ui().current_month().next();
        self.show_month(month).await
    }

    pub async fn previous_month(&mut self) -> Result<(), ApiError> {
        let month = self.state.ui().current_month().prev();
        self.show_month(month).await
    }

    pub async fn create_task(&mut self, task: &TaskCreate) -> Result<(), ApiError> {
        let result = self.api.create_task(task).await;
        self.acknowledged(result)?;
        self.refresh_tasks().await
    }

    pub async fn update_task(&mut self, task: &TaskUpdate) -> Result<(), ApiError> {
        let result = self.api.update_task(task).await;
        self.acknowledged(result)?;
        self.refresh_tasks().await
    }

    /// Delete a task. It is removed from the local copy without fetching the tasks again
    pub async fn delete_task(&mut self, task_id: TaskId) -> Result<(), ApiError> {
        let result = self.api.delete_task(task_id).await;
        self.acknowledged(result)?;
        self.state.remove_task(task_id);
        if self.state.ui().selected_task_id() == Some(task_id) {
            self.state.update_ui(|ui| ui.close_right_panel());
        }
        Ok(())
    }


    pub async fn refresh_categories(&mut self) -> Result<(), ApiError> {
        let result = self.api.get_categories().await;
        match result {
            Ok(categories) => {
                self.state.set_categories(categories);
                Ok(())
            },
            Err(err) => Err(self.failed(err)),
        }
    }

    pub async fn create_category(&mut self, name: &str) -> Result<(), ApiError> {
        let result = self.api.create_category(&CategoryCreate { category_name: name.to_string() }).await;
        self.acknowledged(result)?;
        self.refresh_categories().await
    }

    pub async fn delete_category(&mut self, category_id: CategoryId) -> Result<(), ApiError> {
        let result = self.api.delete_category(category_id).await;
        self.acknowledged(result)?;
        if self.state.ui().calendar_filters().category_id == Some(category_id) {
            self.state.update_ui(|ui| ui.clear_filters());
        }
        self.refresh_categories().await
    }

    pub async fn refresh_statuses(&mut self) -> Result<(), ApiError> {
        let result = self.api.get_statuses().await;
        match result {
            Ok(statuses) => {
                self.state.set_statuses(statuses);
                Ok(())
            },
            Err(err) => Err(self.failed(err)),
        }
    }

    /// Fetch everything the calendar view needs: statuses, categories and the tasks of the displayed month
    pub async fn refresh_all(&mut self) -> Result<(), ApiError> {
        self.refresh_statuses().await?;
        self.refresh_categories().await?;
        self.refresh_tasks().await
    }
}
