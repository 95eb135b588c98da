//! Calendar view models: months, the month grid, and the filters applied to it

pub mod grid;
pub mod month;

pub use grid::{CalendarDay, MonthGrid};
pub use month::YearMonth;

use serde::{Deserialize, Serialize};

use crate::category::CategoryId;
use crate::status::StatusId;
use crate::Task;

/// Narrows the tasks shown in a calendar.
///
/// Each field is either unset (accept every task) or requires an exact match.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarFilters {
    pub status_id: Option<StatusId>,
    pub category_id: Option<CategoryId>,
}

impl CalendarFilters {
    pub fn is_active(&self) -> bool {
        self.status_id.is_some() || self.category_id.is_some()
    }

    /// Whether `task` should be shown. A task without category never matches a category filter
    pub fn accepts(&self, task: &Task) -> bool {
        if let Some(status) = self.status_id {
            if task.status_id() != status {
                return false;
            }
        }
        if let Some(category) = self.category_id {
            if task.category_id() != Some(category) {
                return false;
            }
        }
        true
    }
}
