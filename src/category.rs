//! Task categories

use serde::{Deserialize, Serialize};

pub type CategoryId = i64;

/// A user-defined category
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    category_id: CategoryId,
    category_name: String,
}

impl Category {
    pub fn new<S: ToString>(category_id: CategoryId, category_name: S) -> Self {
        Self { category_id, category_name: category_name.to_string() }
    }

    pub fn id(&self) -> CategoryId  { self.category_id }
    pub fn name(&self) -> &str      { &self.category_name }
}

/// The category a task belongs to, as embedded in a [`Task`](crate::Task)
pub type CategoryInfo = Category;

/// The payload that creates a category
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryCreate {
    pub category_name: String,
}
