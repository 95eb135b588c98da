//! Planner scenarios, run against a mocked backend and a mocked broker
//!
//! This requires the "integration_tests" Cargo feature

use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime};

use myplanner::calendar::CalendarFilters;
use myplanner::config::Settings;
use myplanner::feedback::{feedback_channel, Feedback, FeedbackReceiver};
use myplanner::mock_api::MockApi;
use myplanner::mock_behaviour::{MockBehaviour, MockFailure, Operation};
use myplanner::notification::mock::MockBroker;
use myplanner::traits::PlannerApi;
use myplanner::{ApiError, AppState, NotificationChannel, NotificationEvent, Planner, Status, Task, TaskCreate, TaskQuery};

const EMAIL: &str = "ada@example.com";
const PASSWORD: &str = "correct horse";

fn at(s: &str) -> NaiveDateTime {
    s.parse().unwrap()
}

struct Fixture {
    planner: Planner<MockApi>,
    broker: MockBroker,
    feedback: FeedbackReceiver,
    user_id: i64,
}

fn fixture(state: AppState) -> Fixture {
    let _ = env_logger::builder().is_test(true).try_init();

    let api = MockApi::new();
    let user_id = api.add_user("Ada", EMAIL, PASSWORD);
    let todo = Status::new(1, "To Do");
    api.insert_task(user_id, Task::new(1, "Dentist".to_string(), todo.clone(), at("2024-02-03T09:00:00")));
    api.insert_task(user_id, Task::new(2, "Groceries".to_string(), todo.clone(), at("2024-02-03T10:00:00")));
    api.insert_task(user_id, Task::new(3, "Taxes".to_string(), Status::new(2, "In Progress"), at("2024-01-20T10:00:00"))
        .with_start_time(at("2024-02-14T08:00:00")));
    api.insert_task(user_id, Task::new(4, "Last year".to_string(), todo, at("2023-02-03T10:00:00")));

    let broker = MockBroker::new();
    let settings = Settings { reconnect_delay_ms: 20, ..Settings::default() };
    let notifications = NotificationChannel::new(Arc::new(broker.clone()), &settings);

    let (sender, feedback) = feedback_channel();
    let planner = Planner::new(api, state, notifications).with_feedback_channel(sender);
    Fixture { planner, broker, feedback, user_id }
}

fn drain(receiver: &mut FeedbackReceiver) -> Vec<Feedback> {
    let mut feedbacks = Vec::new();
    while let Ok(feedback) = receiver.try_recv() {
        feedbacks.push(feedback);
    }
    feedbacks
}

async fn wait_for<F: Fn() -> bool>(what: &str, condition: F) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("Timeout while waiting for {}", what);
}

async fn logged_in(state: AppState) -> Fixture {
    let mut fixture = fixture(state);
    fixture.planner.login(EMAIL, PASSWORD).await.unwrap();
    fixture.planner.update_ui(|ui| ui.set_current_month("2024-02".parse().unwrap()));
    fixture
}


#[tokio::test]
async fn login_fetches_the_month_and_subscribes() {
    let mut f = logged_in(AppState::new()).await;
    assert!(f.planner.is_logged_in());
    assert!(f.planner.api().has_token());
    assert_eq!(f.planner.state().session().unwrap().name(), "Ada");

    f.planner.refresh_all().await.unwrap();
    let ids: Vec<_> = f.planner.state().tasks().iter().map(|t| t.id()).collect();
    assert_eq!(ids, vec![1, 2, 3]);
    assert_eq!(f.planner.state().statuses().len(), 3);
    // Only the displayed month was fetched
    assert_eq!(f.planner.api().get_tasks(&TaskQuery::all()).await.unwrap().len(), 4);

    let grid = f.planner.month_grid();
    let feb_3 = grid.day(NaiveDate::from_ymd_opt(2024, 2, 3).unwrap()).unwrap();
    assert_eq!(feb_3.tasks().len(), 2);
    let feb_14 = grid.day(NaiveDate::from_ymd_opt(2024, 2, 14).unwrap()).unwrap();
    assert_eq!(feb_14.tasks()[0].topic(), "Taxes");

    let channel = f.planner.notifications();
    wait_for("subscription", || channel.connection_status()).await;
    let subscribe = &f.broker.received("SUBSCRIBE")[0];
    assert_eq!(subscribe.get("destination"), Some(format!("/queue/user/{}/notifications", f.user_id).as_str()));

    assert_eq!(drain(&mut f.feedback), vec![Feedback::Success("Login successful".to_string())]);
}

#[tokio::test]
async fn wrong_password() {
    let mut f = fixture(AppState::new());
    let err = f.planner.login(EMAIL, "wrong").await.unwrap_err();
    assert_eq!(err.user_message(), "Invalid email or password");
    assert!(f.planner.is_logged_in() == false);
    assert_eq!(f.broker.opened_links(), 0);
    assert_eq!(drain(&mut f.feedback), vec![Feedback::Error("Invalid email or password".to_string())]);
}

#[tokio::test]
async fn filters_narrow_the_grid() {
    let mut f = logged_in(AppState::new()).await;
    f.planner.refresh_tasks().await.unwrap();

    f.planner.update_ui(|ui| ui.set_filters(CalendarFilters { status_id: Some(2), category_id: None }));
    let grid = f.planner.month_grid();
    let shown: usize = grid.days().iter().map(|d| d.tasks().len()).sum();
    assert_eq!(shown, 1);

    // The day panel is not filtered
    f.planner.update_ui(|ui| ui.set_selected_date(NaiveDate::from_ymd_opt(2024, 2, 3)));
    assert_eq!(f.planner.state().selected_day_tasks().len(), 2);
}

#[tokio::test]
async fn task_mutations() {
    let mut f = logged_in(AppState::new()).await;
    f.planner.refresh_all().await.unwrap();
    drain(&mut f.feedback);

    let mut new_task = TaskCreate::new("Birthday".to_string(), 1);
    new_task.start_time = Some(at("2024-02-20T18:00:00"));
    f.planner.create_task(&new_task).await.unwrap();
    assert!(f.planner.state().tasks().iter().any(|t| t.topic() == "Birthday"));
    assert_eq!(f.planner.api().task_count(), 5);

    let mut update = f.planner.state().tasks().iter().find(|t| t.id() == 2).unwrap().to_update();
    update.fields.topic = "Groceries and bread".to_string();
    f.planner.update_task(&update).await.unwrap();
    assert_eq!(f.planner.state().tasks().iter().find(|t| t.id() == 2).unwrap().topic(), "Groceries and bread");

    f.planner.update_ui(|ui| ui.set_selected_task(Some(1)));
    f.planner.delete_task(1).await.unwrap();
    assert!(f.planner.state().tasks().iter().all(|t| t.id() != 1));
    assert_eq!(f.planner.state().ui().selected_task_id(), None);
    assert_eq!(f.planner.api().task_count(), 4);

    assert_eq!(drain(&mut f.feedback), vec![
        Feedback::Success("Task created successfully".to_string()),
        Feedback::Success("Task updated successfully".to_string()),
        Feedback::Success("Task deleted successfully".to_string()),
    ]);

    // Rejected by the server
    let too_long = TaskCreate::new("x".repeat(31), 1);
    assert!(f.planner.create_task(&too_long).await.is_err());
    assert!(drain(&mut f.feedback)[0].is_error());
    assert!(f.planner.is_logged_in());
}

#[tokio::test]
async fn categories() {
    let mut f = logged_in(AppState::new()).await;
    f.planner.create_category("Work").await.unwrap();
    let work = f.planner.state().categories()[0].clone();
    assert_eq!(work.name(), "Work");

    f.planner.update_ui(|ui| ui.set_filters(CalendarFilters { status_id: None, category_id: Some(work.id()) }));
    f.planner.delete_category(work.id()).await.unwrap();
    assert!(f.planner.state().categories().is_empty());
    assert!(f.planner.state().ui().calendar_filters().is_active() == false);
}

#[tokio::test]
async fn server_failures_are_reported_but_keep_the_session() {
    let mut f = logged_in(AppState::new()).await;
    drain(&mut f.feedback);
    f.planner.api().set_behaviour(MockBehaviour::new()
        .fail(Operation::GetTasks, 1, MockFailure::server(500, "Database unavailable"))
        .fail(Operation::MutateCategory, 1, MockFailure::server(400, "")));

    let err = f.planner.refresh_tasks().await.unwrap_err();
    assert!(matches!(err, ApiError::Server { code: 500, .. }));
    assert_eq!(f.planner.state().error(), Some("Database unavailable"));
    assert!(f.planner.is_logged_in());
    assert_eq!(drain(&mut f.feedback), vec![Feedback::Error("Database unavailable".to_string())]);

    // A failure without any explanation gets the generic message
    assert!(f.planner.create_category("Work").await.is_err());
    assert_eq!(drain(&mut f.feedback), vec![Feedback::Error("An error occurred".to_string())]);
    assert!(f.planner.is_logged_in());

    // No automatic retry, but the next call works
    f.planner.refresh_tasks().await.unwrap();
    assert!(f.planner.state().error().is_none());
}

#[tokio::test]
async fn expired_session_forces_logout() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");

    let mut f = logged_in(AppState::with_backing_file(&path)).await;
    f.planner.refresh_all().await.unwrap();
    {
        let channel = f.planner.notifications();
        wait_for("subscription", || channel.connection_status()).await;
    }

    f.planner.api().expire_sessions();
    let err = f.planner.refresh_categories().await.unwrap_err();
    assert!(err.is_unauthorized());

    assert!(f.planner.is_logged_in() == false);
    assert!(f.planner.api().has_token() == false);
    assert!(f.planner.state().tasks().is_empty());
    assert!(f.planner.state().statuses().is_empty());
    assert!(f.planner.notifications().connection_status() == false);
    wait_for("DISCONNECT frame", || f.broker.received("DISCONNECT").len() == 1).await;

    // The persisted session is gone too
    let reloaded = AppState::from_file(&path).unwrap();
    assert!(reloaded.session().is_none());
}

#[tokio::test]
async fn unauthorized_mutation_forces_logout() {
    let mut f = logged_in(AppState::new()).await;
    f.planner.refresh_all().await.unwrap();
    drain(&mut f.feedback);
    f.planner.api().set_behaviour(MockBehaviour::new()
        .fail_after(Operation::MutateTask, 1, 1, MockFailure::Unauthorized));

    // The first mutation is served
    f.planner.delete_task(2).await.unwrap();
    assert!(f.planner.is_logged_in());

    let err = f.planner.delete_task(3).await.unwrap_err();
    assert!(err.is_unauthorized());
    assert!(f.planner.is_logged_in() == false);
    assert!(f.planner.state().tasks().is_empty());
    assert_eq!(drain(&mut f.feedback), vec![
        Feedback::Success("Task deleted successfully".to_string()),
        Feedback::Error("Your session has expired, please log in again".to_string()),
    ]);
}

#[tokio::test]
async fn logout_then_resume() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");

    {
        let f = logged_in(AppState::with_backing_file(&path)).await;
        assert!(f.planner.is_logged_in());
    }

    // A new run picks the session up from the state file
    let mut f = fixture(AppState::load_or_default(&path));
    assert!(f.planner.resume_session());
    let channel = f.planner.notifications();
    wait_for("subscription", || channel.connection_status()).await;

    f.planner.logout().await;
    assert!(f.planner.is_logged_in() == false);
    assert!(f.planner.resume_session() == false);
    assert!(f.planner.notifications().connection_status() == false);
}

#[tokio::test]
async fn reminders_become_feedback() {
    let mut f = logged_in(AppState::new()).await;
    drain(&mut f.feedback);
    {
        let channel = f.planner.notifications();
        wait_for("subscription", || channel.connection_status()).await;
    }

    let event = NotificationEvent::reminder(1, "Dentist", at("2024-02-03T08:45:00"));
    f.broker.publish(&event);
    let feedback = tokio::time::timeout(Duration::from_secs(2), f.feedback.recv()).await.unwrap().unwrap();
    assert_eq!(feedback, Feedback::Reminder(event));
    assert_eq!(feedback.to_string(), "Dentist\nReminder: Your task \"Dentist\" is coming up!\n08:45");
}

#[tokio::test]
async fn profile_changes() {
    let mut f = logged_in(AppState::new()).await;
    f.planner.change_name("Ada Lovelace").await.unwrap();
    assert_eq!(f.planner.state().session().unwrap().name(), "Ada Lovelace");
    assert_eq!(f.planner.api().user_name(f.user_id).as_deref(), Some("Ada Lovelace"));

    f.planner.refresh_profile().await.unwrap();
    assert_eq!(f.planner.state().session().unwrap().email(), EMAIL);

    assert!(f.planner.change_password("not the password", "new").await.is_err());
    f.planner.change_password(PASSWORD, "new password").await.unwrap();
    f.planner.logout().await;
    assert!(f.planner.login(EMAIL, PASSWORD).await.is_err());
    f.planner.login(EMAIL, "new password").await.unwrap();
}

#[tokio::test]
async fn register_then_login() {
    let mut f = fixture(AppState::new());
    f.planner.register("Grace", "grace@example.com", "cobol").await.unwrap();
    assert!(f.planner.register("Grace", "grace@example.com", "cobol").await.is_err());
    f.planner.login("grace@example.com", "cobol").await.unwrap();
    f.planner.update_ui(|ui| ui.set_current_month("2024-02".parse().unwrap()));
    f.planner.refresh_tasks().await.unwrap();
    // Tasks are per user
    assert!(f.planner.state().tasks().is_empty());
}
