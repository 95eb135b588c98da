//! Some utility functions

use chrono::NaiveDate;

use crate::calendar::grid::WEEKDAY_LABELS;
use crate::calendar::MonthGrid;
use crate::Task;

/// A debug utility that pretty-prints a month grid.
///
/// Days of the neighbouring months are shown in parentheses, the tasks of a day are counted, `*` marks `today`.
pub fn print_month_grid(grid: &MonthGrid<'_>, today: NaiveDate) {
    println!("{:^56}", grid.month().title());
    println!("{}", WEEKDAY_LABELS.iter().map(|label| format!("{:^8}", label)).collect::<String>());
    for week in grid.weeks() {
        let line: String = week.iter()
            .map(|day| {
                let mark = if day.is_today(today) { "*" } else { " " };
                let count = match day.tasks().len() {
                    0 => String::new(),
                    n => format!("[{}]", n),
                };
                let number = chrono::Datelike::day(&day.date());
                let cell = if day.in_month() { format!("{}{}{}", mark, number, count) } else { format!("({})", number) };
                format!("{:^8}", cell)
            })
            .collect();
        println!("{}", line);
    }
}

/// Print the tasks of every day of a grid, with at most the visible ones for each day
pub fn print_agenda(grid: &MonthGrid<'_>) {
    for day in grid.days().iter().filter(|day| day.in_month() && day.tasks().is_empty() == false) {
        println!("{}", day.date().format("%a %d %b"));
        for task in day.visible_tasks() {
            print_task(task);
        }
        if day.hidden_count() > 0 {
            println!("    +{} more", day.hidden_count());
        }
    }
}

pub fn print_task(task: &Task) {
    let completion = if task.status().is_done() { "✓" } else { " " };
    let reminder = if task.has_reminder() { "⏰" } else { " " };
    let category = task.category().map(|c| c.name()).unwrap_or("");
    println!("    {}{} {}\t[{}] {}\t{}", completion, reminder, task.topic(), task.status().name(), category, task.id());
}
