//! Kanban board view model and drag planning.
//!
//! The board is a pure projection of the store's issue list: `group_by_status`
//! rebuilds the three columns from scratch each time, so an optimistic change
//! in the store shows up in the next grouping without extra bookkeeping.

use serde::{Deserialize, Serialize};

use crate::models::{Issue, IssueStatus};

/// A position on the board: column plus index within it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DragLocation {
    pub status: IssueStatus,
    pub index: usize,
}

impl DragLocation {
    pub fn new(status: IssueStatus, index: usize) -> Self {
        Self { status, index }
    }
}

/// Result of a finished drag gesture.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DragResult {
    pub issue_id: String,
    pub source: DragLocation,
    /// `None` when the drop was cancelled or landed outside any column.
    pub destination: Option<DragLocation>,
}

/// What a drop should do to the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropPlan {
    /// Cancelled, dropped in place, or the issue is not in the source column.
    Unchanged,
    /// Same column, new index. Ordering within a column is not persisted.
    Reorder,
    /// Status changes to `to`; persisted optimistically.
    Move { issue_id: String, to: IssueStatus },
}

/// Issues grouped into the board's three columns, preserving list order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoardColumns {
    pub todo: Vec<Issue>,
    pub in_progress: Vec<Issue>,
    pub done: Vec<Issue>,
}

impl BoardColumns {
    pub fn column(&self, status: IssueStatus) -> &[Issue] {
        match status {
            IssueStatus::Todo => &self.todo,
            IssueStatus::InProgress => &self.in_progress,
            IssueStatus::Done => &self.done,
        }
    }

    fn column_mut(&mut self, status: IssueStatus) -> &mut Vec<Issue> {
        match status {
            IssueStatus::Todo => &mut self.todo,
            IssueStatus::InProgress => &mut self.in_progress,
            IssueStatus::Done => &mut self.done,
        }
    }

    /// Columns in board order with their status.
    pub fn iter(&self) -> impl Iterator<Item = (IssueStatus, &[Issue])> {
        IssueStatus::ALL.into_iter().map(|s| (s, self.column(s)))
    }

    pub fn len(&self) -> usize {
        self.todo.len() + self.in_progress.len() + self.done.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub fn group_by_status(issues: &[Issue]) -> BoardColumns {
    let mut columns = BoardColumns::default();
    for issue in issues {
        columns.column_mut(issue.status).push(issue.clone());
    }
    columns
}

/// Decide what a drag result means for the given columns.
pub fn plan_drop(columns: &BoardColumns, drag: &DragResult) -> DropPlan {
    let Some(destination) = drag.destination else {
        return DropPlan::Unchanged;
    };
    if destination == drag.source {
        return DropPlan::Unchanged;
    }
    let in_source = columns
        .column(drag.source.status)
        .iter()
        .any(|i| i.id == drag.issue_id);
    if !in_source {
        return DropPlan::Unchanged;
    }
    if destination.status == drag.source.status {
        return DropPlan::Reorder;
    }
    DropPlan::Move {
        issue_id: drag.issue_id.clone(),
        to: destination.status,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::{IssueType, Priority};
    use chrono::Utc;

    pub(crate) fn issue(id: &str, status: IssueStatus) -> Issue {
        Issue {
            id: id.to_string(),
            key: format!("NEX-{}", id),
            title: format!("Issue {}", id),
            description: String::new(),
            status,
            priority: Priority::Medium,
            issue_type: IssueType::Task,
            assignee_id: None,
            reporter_id: "u1".to_string(),
            project_id: "p1".to_string(),
            sprint_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn sample_columns() -> BoardColumns {
        group_by_status(&[
            issue("1", IssueStatus::Todo),
            issue("2", IssueStatus::InProgress),
            issue("3", IssueStatus::Todo),
            issue("4", IssueStatus::Done),
        ])
    }

    #[test]
    fn test_group_by_status_preserves_order() {
        let columns = sample_columns();
        let todo: Vec<_> = columns.todo.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(todo, vec!["1", "3"]);
        assert_eq!(columns.in_progress.len(), 1);
        assert_eq!(columns.done.len(), 1);
        assert_eq!(columns.len(), 4);
    }

    #[test]
    fn test_group_empty_list_has_three_empty_columns() {
        let columns = group_by_status(&[]);
        assert!(columns.is_empty());
        let statuses: Vec<_> = columns.iter().map(|(s, c)| (s, c.len())).collect();
        assert_eq!(
            statuses,
            vec![
                (IssueStatus::Todo, 0),
                (IssueStatus::InProgress, 0),
                (IssueStatus::Done, 0)
            ]
        );
    }

    #[test]
    fn test_cancelled_drop_is_unchanged() {
        let drag = DragResult {
            issue_id: "1".into(),
            source: DragLocation::new(IssueStatus::Todo, 0),
            destination: None,
        };
        assert_eq!(plan_drop(&sample_columns(), &drag), DropPlan::Unchanged);
    }

    #[test]
    fn test_drop_in_place_is_unchanged() {
        let drag = DragResult {
            issue_id: "3".into(),
            source: DragLocation::new(IssueStatus::Todo, 1),
            destination: Some(DragLocation::new(IssueStatus::Todo, 1)),
        };
        assert_eq!(plan_drop(&sample_columns(), &drag), DropPlan::Unchanged);
    }

    #[test]
    fn test_same_column_new_index_is_reorder() {
        let drag = DragResult {
            issue_id: "3".into(),
            source: DragLocation::new(IssueStatus::Todo, 1),
            destination: Some(DragLocation::new(IssueStatus::Todo, 0)),
        };
        assert_eq!(plan_drop(&sample_columns(), &drag), DropPlan::Reorder);
    }

    #[test]
    fn test_cross_column_drop_is_move() {
        let drag = DragResult {
            issue_id: "1".into(),
            source: DragLocation::new(IssueStatus::Todo, 0),
            destination: Some(DragLocation::new(IssueStatus::Done, 1)),
        };
        assert_eq!(
            plan_drop(&sample_columns(), &drag),
            DropPlan::Move {
                issue_id: "1".into(),
                to: IssueStatus::Done
            }
        );
    }

    #[test]
    fn test_issue_missing_from_source_column_is_unchanged() {
        // Issue 2 lives in IN_PROGRESS, not TODO.
        let drag = DragResult {
            issue_id: "2".into(),
            source: DragLocation::new(IssueStatus::Todo, 0),
            destination: Some(DragLocation::new(IssueStatus::Done, 0)),
        };
        assert_eq!(plan_drop(&sample_columns(), &drag), DropPlan::Unchanged);
    }
}
