//! Planner tasks, as returned by the REST API

use serde::{Deserialize, Serialize};
use chrono::{NaiveDate, NaiveDateTime};

use crate::category::{CategoryId, CategoryInfo};
use crate::status::{StatusId, StatusInfo};

pub type TaskId = i64;

/// A task of the signed-in user.
///
/// Tasks are read-mostly: they only change through [`PlannerApi::update_task`](crate::traits::PlannerApi::update_task)
/// and are re-fetched afterwards.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    task_id: TaskId,
    /// A short title
    topic: String,
    description: Option<String>,
    status: StatusInfo,
    category: Option<CategoryInfo>,

    create_time: NaiveDateTime,
    start_time: Option<NaiveDateTime>,
    end_time: Option<NaiveDateTime>,

    /// Whether the server should push a reminder at `reminder_time`
    #[serde(rename = "isRemainder")]
    reminder: Option<bool>,
    #[serde(rename = "remainderTime")]
    reminder_time: Option<NaiveDateTime>,

    last_update_time: Option<NaiveDateTime>,
}

impl Task {
    /// Create a task. This is mostly useful for tests and mocked sources, real tasks come from the server
    pub fn new(task_id: TaskId, topic: String, status: StatusInfo, create_time: NaiveDateTime) -> Self {
        Self {
            task_id,
            topic,
            description: None,
            status,
            category: None,
            create_time,
            start_time: None,
            end_time: None,
            reminder: None,
            reminder_time: None,
            last_update_time: Some(create_time),
        }
    }

    pub fn with_description(mut self, description: String) -> Self   { self.description = Some(description); self }
    pub fn with_category(mut self, category: CategoryInfo) -> Self    { self.category = Some(category); self }
    pub fn with_start_time(mut self, start: NaiveDateTime) -> Self    { self.start_time = Some(start); self }
    pub fn with_end_time(mut self, end: NaiveDateTime) -> Self        { self.end_time = Some(end); self }
    pub fn with_reminder(mut self, at: NaiveDateTime) -> Self {
        self.reminder = Some(true);
        self.reminder_time = Some(at);
        self
    }

    pub fn id(&self) -> TaskId                              { self.task_id }
    pub fn topic(&self) -> &str                             { &self.topic }
    pub fn description(&self) -> Option<&str>              { self.description.as_deref() }
    pub fn status(&self) -> &StatusInfo                     { &self.status }
    pub fn status_id(&self) -> StatusId                     { self.status.id() }
    pub fn category(&self) -> Option<&CategoryInfo>         { self.category.as_ref() }
    pub fn category_id(&self) -> Option<CategoryId>         { self.category.as_ref().map(|c| c.id()) }
    pub fn create_time(&self) -> &NaiveDateTime             { &self.create_time }
    pub fn start_time(&self) -> Option<&NaiveDateTime>      { self.start_time.as_ref() }
    pub fn end_time(&self) -> Option<&NaiveDateTime>        { self.end_time.as_ref() }
    pub fn has_reminder(&self) -> bool                      { self.reminder == Some(true) }
    pub fn reminder_time(&self) -> Option<&NaiveDateTime>   { self.reminder_time.as_ref() }
    pub fn last_update_time(&self) -> Option<&NaiveDateTime> { self.last_update_time.as_ref() }

    /// The day this task is shown on in a calendar: its start date, or its creation date when it has no start time
    pub fn effective_date(&self) -> NaiveDate {
        self.start_time.unwrap_or(self.create_time).date()
    }

    /// An update payload that initially leaves every field of this task unchanged
    pub fn to_update(&self) -> TaskUpdate {
        TaskUpdate {
            task_id: self.task_id,
            fields: TaskCreate {
                topic: self.topic.clone(),
                description: self.description.clone(),
                status_id: self.status.id(),
                category_id: self.category_id(),
                start_time: self.start_time,
                end_time: self.end_time,
                reminder: self.reminder,
                reminder_time: self.reminder_time,
            },
        }
    }
}


/// The payload that creates a task
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskCreate {
    pub topic: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status_id: StatusId,
    pub category_id: Option<CategoryId>,
    pub start_time: Option<NaiveDateTime>,
    pub end_time: Option<NaiveDateTime>,
    #[serde(rename = "isRemainder", skip_serializing_if = "Option::is_none")]
    pub reminder: Option<bool>,
    #[serde(rename = "remainderTime")]
    pub reminder_time: Option<NaiveDateTime>,
}

impl TaskCreate {
    pub fn new(topic: String, status_id: StatusId) -> Self {
        Self {
            topic,
            description: None,
            status_id,
            category_id: None,
            start_time: None,
            end_time: None,
            reminder: None,
            reminder_time: None,
        }
    }
}

/// The payload that updates an existing task. Every field is sent, the server replaces the whole task
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskUpdate {
    pub task_id: TaskId,
    #[serde(flatten)]
    pub fields: TaskCreate,
}

/// Query parameters of a task listing. Unset bounds are not sent
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDateTime>,
}

impl TaskQuery {
    /// Every task, regardless of its dates
    pub fn all() -> Self {
        Self::default()
    }

    pub fn between(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self { start_date: Some(start), end_date: Some(end) }
    }

    /// Whether a task falls into this range, judged on its effective date-time
    pub fn matches(&self, task: &Task) -> bool {
        let when = task.start_time().unwrap_or(task.create_time());
        self.start_date.map(|start| *when >= start).unwrap_or(true)
            && self.end_date.map(|end| *when <= end).unwrap_or(true)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> NaiveDateTime {
        s.parse().unwrap()
    }

    #[test]
    fn deserialize_server_task() {
        let json = r#"{
            "taskId": 12,
            "topic": "Dentist",
            "description": null,
            "status": { "statusId": 1, "statusName": "To Do" },
            "category": { "categoryId": 3, "categoryName": "Health" },
            "createTime": "2024-02-01T08:00:00",
            "startTime": "2024-02-10T09:30:00.123",
            "endTime": null,
            "isRemainder": true,
            "remainderTime": "2024-02-10T09:00:00",
            "lastUpdateTime": "2024-02-01T08:00:00"
        }"#;
        let task: Task = serde_json::from_str(json).unwrap();
        assert_eq!(task.id(), 12);
        assert_eq!(task.topic(), "Dentist");
        assert_eq!(task.description(), None);
        assert_eq!(task.status_id(), 1);
        assert_eq!(task.category_id(), Some(3));
        assert!(task.has_reminder());
        assert_eq!(task.effective_date(), NaiveDate::from_ymd_opt(2024, 2, 10).unwrap());
    }

    #[test]
    fn effective_date_falls_back_to_creation() {
        let task = Task::new(1, "Groceries".into(), StatusInfo::new(1, "To Do"), at("2024-03-31T23:59:00"));
        assert_eq!(task.effective_date(), NaiveDate::from_ymd_opt(2024, 3, 31).unwrap());
    }

    #[test]
    fn query_bounds() {
        let task = Task::new(1, "Taxes".to_string(), StatusInfo::new(1, "To Do"), at("2024-01-20T10:00:00"))
            .with_start_time(at("2024-02-29T23:59:59"));
        let february = TaskQuery::between(at("2024-02-01T00:00:00"), at("2024-02-29T23:59:59"));
        let march = TaskQuery::between(at("2024-03-01T00:00:00"), at("2024-03-31T23:59:59"));
        assert!(february.matches(&task));
        assert!(march.matches(&task) == false);
        assert!(TaskQuery::all().matches(&task));

        assert_eq!(serde_json::to_string(&TaskQuery::all()).unwrap(), "{}");
        assert_eq!(
            serde_json::to_string(&february).unwrap(),
            r#"{"startDate":"2024-02-01T00:00:00","endDate":"2024-02-29T23:59:59"}"#
        );
    }

    #[test]
    fn update_payload_is_flat() {
        let task = Task::new(7, "Run".into(), StatusInfo::new(2, "In Progress"), at("2024-03-01T07:00:00"))
            .with_reminder(at("2024-03-02T06:45:00"));
        let value = serde_json::to_value(task.to_update()).unwrap();
        assert_eq!(value["taskId"], 7);
        assert_eq!(value["topic"], "Run");
        assert_eq!(value["statusId"], 2);
        assert_eq!(value["isRemainder"], true);
        assert_eq!(value["remainderTime"], "2024-03-02T06:45:00");
        assert!(value.get("description").is_none());
    }
}
