//! The month view: a fixed grid of 6 weeks, with the tasks of every day

use std::collections::HashMap;

use chrono::{Datelike, Duration, NaiveDate};

use crate::calendar::{CalendarFilters, YearMonth};
use crate::Task;

/// Number of cells of a month grid (6 weeks of 7 days)
pub const GRID_CELLS: usize = 42;
/// Number of tasks a cell shows before collapsing the rest into a "+N more" counter
pub const MAX_VISIBLE_TASKS: usize = 3;
/// Column headers of a month grid. Weeks start on Sunday
pub const WEEKDAY_LABELS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

/// A cell of a [`MonthGrid`]
#[derive(Clone, Debug, PartialEq)]
pub struct CalendarDay<'a> {
    date: NaiveDate,
    in_month: bool,
    tasks: Vec<&'a Task>,
}

impl<'a> CalendarDay<'a> {
    pub fn date(&self) -> NaiveDate     { self.date }
    /// Whether this day belongs to the displayed month (as opposed to leading or trailing fillers)
    pub fn in_month(&self) -> bool      { self.in_month }
    /// Every task of this day, in the order they were given to the grid
    pub fn tasks(&self) -> &[&'a Task]  { &self.tasks }

    /// The tasks a cell has room for
    pub fn visible_tasks(&self) -> &[&'a Task] {
        &self.tasks[..self.tasks.len().min(MAX_VISIBLE_TASKS)]
    }

    /// How many tasks are hidden behind the "+N more" counter
    pub fn hidden_count(&self) -> usize {
        self.tasks.len().saturating_sub(MAX_VISIBLE_TASKS)
    }

    pub fn is_today(&self, today: NaiveDate) -> bool {
        self.date == today
    }

    pub fn is_selected(&self, selected: Option<NaiveDate>) -> bool {
        selected == Some(self.date)
    }
}

/// A month laid out as 6 full weeks
#[derive(Clone, Debug, PartialEq)]
pub struct MonthGrid<'a> {
    month: YearMonth,
    days: Vec<CalendarDay<'a>>,
}

impl<'a> MonthGrid<'a> {
    /// Lay out `month`, and put every task that passes `filters` in the cell of its effective date
    pub fn build(month: YearMonth, tasks: &'a [Task], filters: &CalendarFilters) -> Self {
        let mut buckets = group_by_date(tasks.iter().filter(|task| filters.accepts(task)));

        let days = grid_dates(month)
            .into_iter()
            .map(|(date, in_month)| CalendarDay {
                date,
                in_month,
                tasks: buckets.remove(&date).unwrap_or_default(),
            })
            .collect();

        Self { month, days }
    }

    pub fn month(&self) -> YearMonth            { self.month }
    /// Exactly [`GRID_CELLS`] days, row after row
    pub fn days(&self) -> &[CalendarDay<'a>]    { &self.days }

    /// The grid as 6 rows of 7 days
    pub fn weeks(&self) -> impl Iterator<Item = &[CalendarDay<'a>]> {
        self.days.chunks(WEEKDAY_LABELS.len())
    }

    pub fn day(&self, date: NaiveDate) -> Option<&CalendarDay<'a>> {
        self.days.iter().find(|d| d.date == date)
    }
}

/// The dates of the 42 cells of a month grid, each flagged with whether it belongs to `month`
pub fn grid_dates(month: YearMonth) -> Vec<(NaiveDate, bool)> {
    let first = month.first_day();
    // 0 = Sunday
    let leading = first.weekday().num_days_from_sunday() as i64;
    let num_days = month.num_days() as i64;

    let mut dates = Vec::with_capacity(GRID_CELLS);
    for offset in (1..=leading).rev() {
        dates.push((first - Duration::days(offset), false));
    }
    for offset in 0..num_days {
        dates.push((first + Duration::days(offset), true));
    }
    let last = month.last_day();
    let trailing = GRID_CELLS as i64 - dates.len() as i64;
    for offset in 1..=trailing {
        dates.push((last + Duration::days(offset), false));
    }
    dates
}

/// Bucket tasks by effective date. Tasks keep their relative order inside a bucket
pub fn group_by_date<'a, I>(tasks: I) -> HashMap<NaiveDate, Vec<&'a Task>>
where
    I: IntoIterator<Item = &'a Task>,
{
    let mut map: HashMap<NaiveDate, Vec<&'a Task>> = HashMap::new();
    for task in tasks {
        map.entry(task.effective_date()).or_default().push(task);
    }
    map
}

/// The unfiltered tasks of a single day, e.g. for the panel that lists the tasks of the selected date
pub fn tasks_on(tasks: &[Task], date: NaiveDate) -> Vec<&Task> {
    tasks.iter()
        .filter(|task| task.effective_date() == date)
        .collect()
}


#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;
    use crate::{Category, Status};

    fn at(s: &str) -> NaiveDateTime {
        s.parse().unwrap()
    }

    fn ym(s: &str) -> YearMonth {
        s.parse().unwrap()
    }

    fn task(id: i64, status: i64, created: &str) -> Task {
        Task::new(id, format!("task {}", id), Status::new(status, "whatever"), at(created))
    }

    #[test]
    fn leap_february() {
        let dates = grid_dates(ym("2024-02"));
        assert_eq!(dates.len(), GRID_CELLS);

        // February 1st 2024 is a Thursday
        assert!(dates[..4].iter().all(|(d, in_month)| d.month() == 1 && *in_month == false));
        assert_eq!(dates[0].0, NaiveDate::from_ymd_opt(2024, 1, 28).unwrap());
        assert!(dates[4..33].iter().all(|(d, in_month)| d.month() == 2 && *in_month));
        assert!(dates[33..].iter().all(|(d, in_month)| d.month() == 3 && *in_month == false));
        assert_eq!(dates[33..].len(), 9);
        assert_eq!(dates[41].0, NaiveDate::from_ymd_opt(2024, 3, 9).unwrap());
    }

    #[test]
    fn every_month_has_42_cells() {
        let mut month = ym("1999-01");
        for _ in 0..(12 * 40) {
            let dates = grid_dates(month);
            assert_eq!(dates.len(), GRID_CELLS);
            assert_eq!(dates.iter().filter(|(_, in_month)| *in_month).count() as u32, month.num_days());
            // Consecutive days, and the month starts in its weekday column
            for pair in dates.windows(2) {
                assert_eq!(pair[1].0 - pair[0].0, Duration::days(1));
            }
            assert_eq!(dates[0].0.weekday(), chrono::Weekday::Sun);
            month = month.next();
        }
    }

    #[test]
    fn grids_at_the_ends_of_the_supported_years() {
        for date in &[NaiveDate::MIN, NaiveDate::MAX] {
            let month = YearMonth::of(*date);
            let dates = grid_dates(month);
            assert_eq!(dates.len(), GRID_CELLS);
            assert_eq!(dates.iter().filter(|(_, in_month)| *in_month).count(), 31);
        }
        let last = grid_dates(ym("9999-12"));
        assert_eq!(last[41].0.year(), 10000);
    }

    #[test]
    fn month_starting_on_sunday_has_no_leading_filler() {
        // September 1st 2024 is a Sunday
        let dates = grid_dates(ym("2024-09"));
        assert_eq!(dates[0], (NaiveDate::from_ymd_opt(2024, 9, 1).unwrap(), true));
        assert_eq!(dates.iter().filter(|(_, in_month)| *in_month == false).count(), 12);
    }

    #[test]
    fn tasks_land_on_their_effective_date() {
        let tasks = vec![
            task(1, 1, "2024-02-03T10:00:00"),
            task(2, 1, "2024-01-15T10:00:00").with_start_time(at("2024-02-03T18:00:00")),
            task(3, 2, "2024-02-29T23:59:59"),
            task(4, 1, "2024-03-02T00:00:00"),
            task(5, 1, "2023-12-25T08:00:00"),
        ];
        let grid = MonthGrid::build(ym("2024-02"), &tasks, &CalendarFilters::default());
        assert_eq!(grid.days().len(), GRID_CELLS);

        let day = grid.day(NaiveDate::from_ymd_opt(2024, 2, 3).unwrap()).unwrap();
        let ids: Vec<_> = day.tasks().iter().map(|t| t.id()).collect();
        assert_eq!(ids, vec![1, 2]);

        assert_eq!(grid.day(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()).unwrap().tasks().len(), 1);
        // Trailing fillers show their tasks too
        assert_eq!(grid.day(NaiveDate::from_ymd_opt(2024, 3, 2).unwrap()).unwrap().tasks()[0].id(), 4);

        // Every task in the grid range appears exactly once
        let total: usize = grid.days().iter().map(|d| d.tasks().len()).sum();
        assert_eq!(total, 4);
    }

    #[test]
    fn status_filter_only_removes_other_statuses() {
        let tasks = vec![
            task(1, 1, "2024-02-03T10:00:00"),
            task(2, 2, "2024-02-03T11:00:00"),
            task(3, 1, "2024-02-04T10:00:00"),
            task(4, 2, "2024-02-05T10:00:00"),
        ];
        let unfiltered = MonthGrid::build(ym("2024-02"), &tasks, &CalendarFilters::default());
        let filters = CalendarFilters { status_id: Some(1), category_id: None };
        let filtered = MonthGrid::build(ym("2024-02"), &tasks, &filters);

        for (before, after) in unfiltered.days().iter().zip(filtered.days()) {
            let expected: Vec<_> = before.tasks().iter().filter(|t| t.status_id() == 1).map(|t| t.id()).collect();
            let got: Vec<_> = after.tasks().iter().map(|t| t.id()).collect();
            assert_eq!(expected, got);
        }
    }

    #[test]
    fn category_filter_rejects_uncategorized() {
        let tasks = vec![
            task(1, 1, "2024-02-03T10:00:00").with_category(Category::new(7, "Work")),
            task(2, 1, "2024-02-03T11:00:00"),
            task(3, 1, "2024-02-03T12:00:00").with_category(Category::new(8, "Home")),
        ];
        let filters = CalendarFilters { status_id: None, category_id: Some(7) };
        let grid = MonthGrid::build(ym("2024-02"), &tasks, &filters);
        let day = grid.day(NaiveDate::from_ymd_opt(2024, 2, 3).unwrap()).unwrap();
        assert_eq!(day.tasks().len(), 1);
        assert_eq!(day.tasks()[0].id(), 1);
    }

    #[test]
    fn display_truncation() {
        let tasks: Vec<Task> = (1..=5).map(|i| task(i, 1, "2024-02-10T09:00:00")).collect();
        let grid = MonthGrid::build(ym("2024-02"), &tasks, &CalendarFilters::default());
        let day = grid.day(NaiveDate::from_ymd_opt(2024, 2, 10).unwrap()).unwrap();
        assert_eq!(day.tasks().len(), 5);
        assert_eq!(day.visible_tasks().iter().map(|t| t.id()).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(day.hidden_count(), 2);

        let quiet = grid.day(NaiveDate::from_ymd_opt(2024, 2, 11).unwrap()).unwrap();
        assert!(quiet.visible_tasks().is_empty());
        assert_eq!(quiet.hidden_count(), 0);
    }

    #[test]
    fn highlighting() {
        let tasks: Vec<Task> = Vec::new();
        let grid = MonthGrid::build(ym("2024-02"), &tasks, &CalendarFilters::default());
        let feb_14 = NaiveDate::from_ymd_opt(2024, 2, 14).unwrap();
        let day = grid.day(feb_14).unwrap();
        assert!(day.is_today(feb_14));
        assert!(day.is_selected(Some(feb_14)));
        assert!(day.is_selected(None) == false);
        assert_eq!(grid.weeks().count(), 6);
    }

    #[test]
    fn day_panel_ignores_filters() {
        let tasks = vec![
            task(1, 1, "2024-02-03T10:00:00"),
            task(2, 2, "2024-02-03T11:00:00"),
            task(3, 1, "2024-02-04T10:00:00"),
        ];
        let ids: Vec<_> = tasks_on(&tasks, NaiveDate::from_ymd_opt(2024, 2, 3).unwrap()).iter().map(|t| t.id()).collect();
        assert_eq!(ids, vec![1, 2]);
    }
}
