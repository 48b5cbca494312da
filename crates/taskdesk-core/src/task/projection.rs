//! Pure projections over an already-fetched task list.

use super::model::{Task, TaskPriority, TaskStatus};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// In-memory task filter. Unset criteria match everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub assigned_to: Option<i64>,
    /// Case-insensitive substring match on title and description.
    pub search: Option<String>,
    pub overdue_only: bool,
}

impl TaskFilter {
    pub fn matches(&self, task: &Task, now: DateTime<Utc>) -> bool {
        if self.status.is_some_and(|s| s != task.status) {
            return false;
        }
        if self.priority.is_some_and(|p| p != task.priority) {
            return false;
        }
        if self.assigned_to.is_some() && self.assigned_to != task.assigned_to {
            return false;
        }
        if self.overdue_only && !task.is_overdue_at(now) {
            return false;
        }
        match self.search.as_deref().map(str::trim) {
            Some(needle) if !needle.is_empty() => {
                let needle = needle.to_lowercase();
                task.title.to_lowercase().contains(&needle)
                    || task
                        .description
                        .as_deref()
                        .is_some_and(|d| d.to_lowercase().contains(&needle))
            }
            _ => true,
        }
    }

    /// Returns the matching tasks, preserving input order.
    pub fn apply<'a>(&self, tasks: &'a [Task], now: DateTime<Utc>) -> Vec<&'a Task> {
        tasks.iter().filter(|t| self.matches(t, now)).collect()
    }
}

/// Summary counts shown above the task board.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskStats {
    pub total: usize,
    pub by_status: BTreeMap<String, usize>,
    pub by_priority: BTreeMap<String, usize>,
    pub overdue: usize,
    /// Share of completed or closed tasks, `0.0` for an empty list.
    pub completion_rate: f64,
}

impl TaskStats {
    pub fn compute(tasks: &[Task], now: DateTime<Utc>) -> Self {
        let mut by_status: BTreeMap<String, usize> = TaskStatus::ALL
            .iter()
            .map(|s| (s.label().to_string(), 0))
            .collect();
        let mut by_priority: BTreeMap<String, usize> = TaskPriority::ALL
            .iter()
            .map(|p| (p.label().to_string(), 0))
            .collect();
        let mut overdue = 0;
        let mut done = 0;

        for task in tasks {
            *by_status.entry(task.status.label().to_string()).or_default() += 1;
            *by_priority.entry(task.priority.label().to_string()).or_default() += 1;
            if task.is_overdue_at(now) {
                overdue += 1;
            }
            if task.status.is_done() {
                done += 1;
            }
        }

        let completion_rate = if tasks.is_empty() {
            0.0
        } else {
            done as f64 / tasks.len() as f64
        };

        Self {
            total: tasks.len(),
            by_status,
            by_priority,
            overdue,
            completion_rate,
        }
    }

    pub fn count(&self, status: TaskStatus) -> usize {
        self.by_status.get(status.label()).copied().unwrap_or(0)
    }
}
