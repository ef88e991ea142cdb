use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub racfid: String,
    pub email: String,
    pub name: String,
    /// Codes of the projects this user belongs to.
    pub projects: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub code: String,
    pub name: String,
    pub description: String,
    /// RACFIDs of the project's members, never empty.
    pub users: Vec<String>,
    /// Codes of the issues filed under this project.
    pub issues: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IssueCategory {
    Story,
    Bug,
    Task,
    Spike,
}

impl IssueCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Story => "story",
            Self::Bug => "bug",
            Self::Task => "task",
            Self::Spike => "spike",
        }
    }
}

impl FromStr for IssueCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "story" => Ok(Self::Story),
            "bug" => Ok(Self::Bug),
            "task" => Ok(Self::Task),
            "spike" => Ok(Self::Spike),
            _ => Err(format!("Invalid category: {}", s)),
        }
    }
}

/// Workflow stage of an issue on the kanban board.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum IssueColumn {
    #[default]
    Todo,
    InProgress,
    InReview,
    Done,
}

impl IssueColumn {
    /// Board order, left to right.
    pub const ALL: [IssueColumn; 4] = [
        IssueColumn::Todo,
        IssueColumn::InProgress,
        IssueColumn::InReview,
        IssueColumn::Done,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Todo => "todo",
            Self::InProgress => "in_progress",
            Self::InReview => "in_review",
            Self::Done => "done",
        }
    }
}

impl FromStr for IssueColumn {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "todo" => Ok(Self::Todo),
            "in_progress" => Ok(Self::InProgress),
            "in_review" => Ok(Self::InReview),
            "done" => Ok(Self::Done),
            _ => Err(format!("Invalid column: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub code: String,
    /// Code of the owning project, if the issue was filed under one.
    pub project: Option<String>,
    pub category: IssueCategory,
    pub backlog: bool,
    pub name: String,
    pub description: String,
    pub story_points: Option<u32>,
    pub assignee: Option<String>,
    pub column: IssueColumn,
    pub position: i64,
    pub created_at: String,
    pub updated_at: String,
}

// Write-side types

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    /// Plaintext; the store hashes it before writing.
    pub password: String,
}

#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewProject {
    pub name: String,
    pub description: String,
    pub users: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ProjectChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub users: Option<Vec<String>>,
}

#[derive(Debug, Clone)]
pub struct NewIssue {
    pub project: Option<String>,
    pub category: IssueCategory,
    pub backlog: bool,
    pub name: String,
    pub description: String,
    pub story_points: Option<u32>,
    pub assignee: Option<String>,
    pub column: IssueColumn,
}

/// Partial issue update. `Some(None)` clears an optional field.
#[derive(Debug, Clone, Default)]
pub struct IssueChanges {
    pub category: Option<IssueCategory>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub story_points: Option<Option<u32>>,
    pub assignee: Option<Option<String>>,
}

#[derive(Debug, Clone, Default)]
pub struct IssueFilter {
    pub project: Option<String>,
    pub backlog: Option<bool>,
}

// API view types
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardView {
    pub project: Project,
    pub backlog: Vec<Issue>,
    pub columns: Vec<ColumnView>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnView {
    pub name: IssueColumn,
    pub issues: Vec<Issue>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_round_trips_through_str() {
        for col in IssueColumn::ALL {
            assert_eq!(IssueColumn::from_str(col.as_str()).unwrap(), col);
        }
        assert!(IssueColumn::from_str("backlog").is_err());
    }

    #[test]
    fn test_category_serializes_lowercase() {
        let json = serde_json::to_string(&IssueCategory::Spike).unwrap();
        assert_eq!(json, "\"spike\"");
        let parsed: IssueCategory = serde_json::from_str("\"bug\"").unwrap();
        assert_eq!(parsed, IssueCategory::Bug);
    }

    #[test]
    fn test_column_serde_matches_as_str() {
        let json = serde_json::to_string(&IssueColumn::InReview).unwrap();
        assert_eq!(json, format!("\"{}\"", IssueColumn::InReview.as_str()));
    }

    #[test]
    fn test_default_column_is_todo() {
        assert_eq!(IssueColumn::default(), IssueColumn::Todo);
    }
}
