//! The application state: session, fetched data and UI state.
//!
//! The session and the UI state can be persisted to a JSON file, so that they survive a restart.
//! Tasks, categories and statuses are only held in memory, and are fetched again when needed.

use std::error::Error;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::calendar::grid::tasks_on;
use crate::calendar::{CalendarFilters, MonthGrid, YearMonth};
use crate::task::TaskId;
use crate::user::{AuthResponse, UserId};
use crate::{Category, Status, Task};

/// The signed-in user
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    token: String,
    user_id: UserId,
    email: String,
    name: String,
}

impl Session {
    pub fn new(token: String, user_id: UserId, email: String, name: String) -> Self {
        Self { token, user_id, email, name }
    }

    pub fn token(&self) -> &str      { &self.token }
    pub fn user_id(&self) -> UserId  { self.user_id }
    pub fn email(&self) -> &str      { &self.email }
    pub fn name(&self) -> &str       { &self.name }
}

impl From<AuthResponse> for Session {
    fn from(auth: AuthResponse) -> Self {
        Self::new(auth.token, auth.user_id, auth.email, auth.name)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
}

impl Default for Theme {
    fn default() -> Self {
        Theme::Dark
    }
}

/// What the user is looking at
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiState {
    sidebar_collapsed: bool,
    selected_date: Option<NaiveDate>,
    selected_task_id: Option<TaskId>,
    current_month: YearMonth,
    calendar_filters: CalendarFilters,
    right_panel_open: bool,
    theme: Theme,
}

impl Default for UiState {
    fn default() -> Self {
        let today = chrono::Local::now().date_naive();
        Self {
            sidebar_collapsed: false,
            selected_date: Some(today),
            selected_task_id: None,
            current_month: YearMonth::of(today),
            calendar_filters: CalendarFilters::default(),
            right_panel_open: false,
            theme: Theme::default(),
        }
    }
}

impl UiState {
    pub fn sidebar_collapsed(&self) -> bool            { self.sidebar_collapsed }
    pub fn selected_date(&self) -> Option<NaiveDate>   { self.selected_date }
    pub fn selected_task_id(&self) -> Option<TaskId>   { self.selected_task_id }
    pub fn current_month(&self) -> YearMonth           { self.current_month }
    pub fn calendar_filters(&self) -> &CalendarFilters { &self.calendar_filters }
    pub fn right_panel_open(&self) -> bool             { self.right_panel_open }
    pub fn theme(&self) -> Theme                       { self.theme }

    pub fn toggle_sidebar(&mut self) {
        self.sidebar_collapsed = !self.sidebar_collapsed;
    }

    pub fn set_sidebar_collapsed(&mut self, collapsed: bool) {
        self.sidebar_collapsed = collapsed;
    }

    /// Select a day (or nothing). This clears the selected task, and opens the day panel when a day is selected
    pub fn set_selected_date(&mut self, date: Option<NaiveDate>) {
        self.selected_date = date;
        self.selected_task_id = None;
        self.right_panel_open = date.is_some();
    }

    pub fn set_selected_task(&mut self, task_id: Option<TaskId>) {
        self.selected_task_id = task_id;
        self.right_panel_open = task_id.is_some();
    }

    pub fn set_current_month(&mut self, month: YearMonth) {
        self.current_month = month;
    }

    pub fn previous_month(&mut self) {
        self.current_month = self.current_month.prev();
    }

    pub fn next_month(&mut self) {
        self.current_month = self.current_month.next();
    }

    /// Replace the active calendar filters
    pub fn set_filters(&mut self, filters: CalendarFilters) {
        self.calendar_filters = filters;
    }

    pub fn clear_filters(&mut self) {
        self.calendar_filters = CalendarFilters::default();
    }

    pub fn close_right_panel(&mut self) {
        self.right_panel_open = false;
        self.selected_task_id = None;
    }

    pub fn set_theme(&mut self, theme: Theme) {
        self.theme = theme;
    }

    pub fn toggle_theme(&mut self) {
        self.theme = match self.theme {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        };
    }

    /// Back to the initial state
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}


/// The part of the state that is saved to disk
#[derive(Clone, Default, Debug, PartialEq, Serialize, Deserialize)]
struct PersistedState {
    auth: Option<Session>,
    ui: UiState,
}

/// The whole application state
#[derive(Debug, Default)]
pub struct AppState {
    backing_file: Option<PathBuf>,
    persisted: PersistedState,

    tasks: Vec<Task>,
    categories: Vec<Category>,
    statuses: Vec<Status>,
    loading: bool,
    error: Option<String>,
}

impl AppState {
    /// A state that is never saved
    pub fn new() -> Self {
        Self::default()
    }

    /// Initialize a state with the default contents, that will be saved to `path`
    pub fn with_backing_file(path: &Path) -> Self {
        Self {
            backing_file: Some(PathBuf::from(path)),
            ..Self::default()
        }
    }

    /// Initialize a state from the content of a valid backing file if it exists.
    /// Returns an error otherwise
    pub fn from_file(path: &Path) -> Result<Self, Box<dyn Error>> {
        let persisted = match std::fs::File::open(path) {
            Err(err) => {
                return Err(format!("Unable to open file {:?}: {}", path, err).into());
            },
            Ok(file) => serde_json::from_reader(file)?,
        };

        Ok(Self {
            backing_file: Some(PathBuf::from(path)),
            persisted,
            ..Self::default()
        })
    }

    /// Load the backing file if it is valid, or start from scratch
    pub fn load_or_default(path: &Path) -> Self {
        match Self::from_file(path) {
            Ok(state) => state,
            Err(err) => {
                log::info!("Starting with a fresh state: {}", err);
                Self::with_backing_file(path)
            },
        }
    }

    pub fn backing_file(&self) -> Option<&Path> {
        self.backing_file.as_deref()
    }

    /// Store the session and the UI state to the backing file (if any)
    pub fn save_to_file(&self) {
        let path = match &self.backing_file {
            None => return,
            Some(path) => path,
        };
        let file = match std::fs::File::create(path) {
            Err(err) => {
                log::warn!("Unable to save file {:?}: {}", path, err);
                return;
            },
            Ok(f) => f,
        };

        if let Err(err) = serde_json::to_writer(file, &self.persisted) {
            log::warn!("Unable to serialize: {}", err);
        };
    }


    pub fn session(&self) -> Option<&Session> {
        self.persisted.auth.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.persisted.auth.is_some()
    }

    pub fn set_session(&mut self, session: Session) {
        self.persisted.auth = Some(session);
        self.save_to_file();
    }

    pub fn set_user_name(&mut self, name: &str) {
        if let Some(session) = self.persisted.auth.as_mut() {
            session.name = name.to_string();
            self.save_to_file();
        }
    }

    /// Forget the session, every fetched data and the UI state
    pub fn logout(&mut self) {
        self.persisted.auth = None;
        self.persisted.ui.reset();
        self.clear_data();
        self.save_to_file();
    }

    fn clear_data(&mut self) {
        self.tasks.clear();
        self.categories.clear();
        self.statuses.clear();
        self.loading = false;
        self.error = None;
    }


    pub fn ui(&self) -> &UiState {
        &self.persisted.ui
    }

    /// Update the UI state. It is saved afterwards
    pub fn update_ui<F: FnOnce(&mut UiState)>(&mut self, f: F) {
        f(&mut self.persisted.ui);
        self.save_to_file();
    }


    pub fn tasks(&self) -> &[Task]               { &self.tasks }
    pub fn categories(&self) -> &[Category]      { &self.categories }
    pub fn statuses(&self) -> &[Status]          { &self.statuses }
    pub fn is_loading(&self) -> bool             { self.loading }
    /// The error of the last failed fetch
    pub fn error(&self) -> Option<&str>          { self.error.as_deref() }

    pub(crate) fn start_loading(&mut self) {
        self.loading = true;
        self.error = None;
    }

    pub(crate) fn set_tasks(&mut self, tasks: Vec<Task>) {
        self.loading = false;
        self.tasks = tasks;
    }

    pub(crate) fn set_error(&mut self, error: String) {
        self.loading = false;
        self.error = Some(error);
    }

    /// Remove a task from the local copy. Returns whether it was there
    pub(crate) fn remove_task(&mut self, task_id: TaskId) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|task| task.id() != task_id);
        self.tasks.len() != before
    }

    pub(crate) fn set_categories(&mut self, categories: Vec<Category>) {
        self.categories = categories;
    }

    pub(crate) fn set_statuses(&mut self, statuses: Vec<Status>) {
        self.statuses = statuses;
    }


    /// The grid of the current month, with the active filters applied
    pub fn month_grid(&self) -> MonthGrid<'_> {
        MonthGrid::build(self.ui().current_month(), &self.tasks, self.ui().calendar_filters())
    }

    /// Every task of the selected day, regardless of the filters
    pub fn selected_day_tasks(&self) -> Vec<&Task> {
        match self.ui().selected_date() {
            None => Vec::new(),
            Some(date) => tasks_on(&self.tasks, date),
        }
    }

    pub fn selected_task(&self) -> Option<&Task> {
        let id = self.ui().selected_task_id()?;
        self.tasks.iter().find(|task| task.id() == id)
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn session() -> Session {
        Session::new("token".to_string(), 4, "ada@example.com".to_string(), "Ada".to_string())
    }

    fn task(id: TaskId, created: &str) -> Task {
        Task::new(id, format!("task {}", id), Status::new(1, "To Do"), created.parse().unwrap())
    }

    #[test]
    fn ui_actions() {
        let mut ui = UiState::default();
        assert_eq!(ui.theme(), Theme::Dark);
        assert!(ui.selected_date().is_some());

        let day = NaiveDate::from_ymd_opt(2024, 2, 3).unwrap();
        ui.set_selected_task(Some(12));
        ui.set_selected_date(Some(day));
        assert_eq!(ui.selected_task_id(), None);
        assert!(ui.right_panel_open());

        ui.set_selected_task(Some(12));
        ui.close_right_panel();
        assert_eq!(ui.selected_task_id(), None);
        assert!(ui.right_panel_open() == false);

        ui.set_current_month("2024-01".parse().unwrap());
        ui.previous_month();
        assert_eq!(ui.current_month().to_string(), "2023-12");

        ui.set_filters(CalendarFilters { status_id: Some(2), category_id: None });
        assert!(ui.calendar_filters().is_active());
        ui.clear_filters();
        assert!(ui.calendar_filters().is_active() == false);

        ui.toggle_theme();
        ui.toggle_sidebar();
        assert_eq!(ui.theme(), Theme::Light);
        assert!(ui.sidebar_collapsed());
        ui.reset();
        assert_eq!(ui, UiState::default());
    }

    #[test]
    fn auth_and_ui_survive_a_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        let mut state = AppState::with_backing_file(&path);
        state.set_session(session());
        state.update_ui(|ui| {
            ui.set_theme(Theme::Light);
            ui.set_current_month("2024-02".parse().unwrap());
        });
        state.set_tasks(vec![task(1, "2024-02-03T10:00:00")]);

        let reloaded = AppState::from_file(&path).unwrap();
        assert_eq!(reloaded.session(), Some(&session()));
        assert_eq!(reloaded.ui(), state.ui());
        // Fetched data is not persisted
        assert!(reloaded.tasks().is_empty());
    }

    #[test]
    fn missing_or_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        assert!(AppState::from_file(&path).is_err());

        std::fs::write(&path, "{ not json").unwrap();
        assert!(AppState::from_file(&path).is_err());
        let state = AppState::load_or_default(&path);
        assert!(state.is_authenticated() == false);
        assert_eq!(state.backing_file(), Some(path.as_path()));
    }

    #[test]
    fn logout_tears_everything_down() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        let mut state = AppState::with_backing_file(&path);
        state.set_session(session());
        state.set_tasks(vec![task(1, "2024-02-03T10:00:00")]);
        state.set_categories(vec![Category::new(1, "Work")]);
        state.set_statuses(vec![Status::new(1, "To Do")]);
        state.update_ui(|ui| ui.set_filters(CalendarFilters { status_id: Some(1), category_id: Some(1) }));

        state.logout();
        assert!(state.is_authenticated() == false);
        assert!(state.tasks().is_empty());
        assert!(state.categories().is_empty());
        assert!(state.statuses().is_empty());
        assert!(state.ui().calendar_filters().is_active() == false);

        let reloaded = AppState::from_file(&path).unwrap();
        assert_eq!(reloaded.session(), None);
    }

    #[test]
    fn views() {
        let mut state = AppState::new();
        state.set_tasks(vec![
            task(1, "2024-02-03T10:00:00"),
            task(2, "2024-02-03T11:00:00"),
            task(3, "2024-02-04T10:00:00"),
        ]);
        state.update_ui(|ui| {
            ui.set_current_month("2024-02".parse().unwrap());
            ui.set_selected_date(NaiveDate::from_ymd_opt(2024, 2, 3));
            ui.set_selected_task(Some(2));
        });

        assert_eq!(state.month_grid().days().len(), 42);
        assert_eq!(state.selected_day_tasks().len(), 2);
        assert_eq!(state.selected_task().map(|t| t.id()), Some(2));

        assert!(state.remove_task(2));
        assert!(state.remove_task(2) == false);
        assert_eq!(state.selected_task(), None);
    }
}
