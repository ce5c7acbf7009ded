// Data models for taskflow
//
// Records persist as camelCase JSON so index names match the stored field names.

use crate::record::Record;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Fixed key of the singleton profile record
pub const PROFILE_ID: &str = "user";

macro_rules! impl_record {
    ($ty:ty, $collection:literal) => {
        impl_record!($ty, $collection, None);
    };
    ($ty:ty, $collection:literal, $fixed_id:expr) => {
        impl Record for $ty {
            fn collection_name() -> &'static str {
                $collection
            }

            fn fixed_id() -> Option<&'static str> {
                $fixed_id
            }

            fn id(&self) -> &str {
                &self.id
            }

            fn set_id(&mut self, id: String) {
                self.id = id;
            }

            fn created_at(&self) -> Option<DateTime<Utc>> {
                self.created_at
            }

            fn updated_at(&self) -> Option<DateTime<Utc>> {
                self.updated_at
            }

            fn set_timestamps(&mut self, created_at: DateTime<Utc>, updated_at: DateTime<Utc>) {
                self.created_at = Some(created_at);
                self.updated_at = Some(updated_at);
            }
        }
    };
}

macro_rules! string_enum {
    ($ty:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $ty {
            pub const ALL: &'static [$ty] = &[$($ty::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($ty::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.as_str())
            }
        }

        impl FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($ty::$variant),)+
                    other => Err(format!("unknown {}: {}", stringify!($ty), other)),
                }
            }
        }
    };
}

// ============================================================================
// Tasks
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    Backlog,
    #[default]
    Todo,
    InProgress,
    InReview,
    Done,
    Cancelled,
}

string_enum!(TaskStatus {
    Backlog => "backlog",
    Todo => "todo",
    InProgress => "in-progress",
    InReview => "in-review",
    Done => "done",
    Cancelled => "cancelled",
});

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

string_enum!(Priority {
    Low => "low",
    Medium => "medium",
    High => "high",
    Urgent => "urgent",
});

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(default)]
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default, with = "crate::timestamp::iso_opt", skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default, with = "crate::timestamp::iso_opt", skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default, with = "crate::timestamp::iso_opt", skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub project_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_task_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_hours: Option<f64>,
    /// Minutes logged against the task
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_spent: Option<u32>,
    /// Ordering within the task's status column
    #[serde(default)]
    pub position: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
    #[serde(default, with = "crate::timestamp::iso_opt", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, with = "crate::timestamp::iso_opt", skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl_record!(Task, "tasks");

impl Task {
    pub fn new(title: impl Into<String>, project_id: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            project_id: project_id.into(),
            ..Self::default()
        }
    }

    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Move the task to another column; stamps or clears `completedAt`
    pub fn move_to(&mut self, status: TaskStatus, position: i64) {
        if status == TaskStatus::Done && self.status != TaskStatus::Done {
            self.completed_at = Some(crate::timestamp::now());
        } else if status != TaskStatus::Done {
            self.completed_at = None;
        }
        self.status = status;
        self.position = position;
    }

    pub fn is_subtask(&self) -> bool {
        self.parent_task_id.is_some()
    }
}

// ============================================================================
// Notes
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    #[serde(default)]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default)]
    pub is_pinned: bool,
    #[serde(default)]
    pub is_archived: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
    #[serde(default, with = "crate::timestamp::iso_opt", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, with = "crate::timestamp::iso_opt", skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl_record!(Note, "notes");

impl Note {
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            ..Self::default()
        }
    }
}

/// Folder grouping notes; nests through `parentId`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteFolder {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(default)]
    pub order: i64,
    #[serde(default, with = "crate::timestamp::iso_opt", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, with = "crate::timestamp::iso_opt", skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl_record!(NoteFolder, "folders");

impl NoteFolder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

// ============================================================================
// Calendar
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    #[serde(default)]
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(with = "crate::timestamp::iso")]
    pub start: DateTime<Utc>,
    #[serde(with = "crate::timestamp::iso")]
    pub end: DateTime<Utc>,
    #[serde(default)]
    pub all_day: bool,
    #[serde(default)]
    pub is_recurring: bool,
    /// RRULE text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurring_rule: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default)]
    pub attendees: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
    #[serde(default, with = "crate::timestamp::iso_opt", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, with = "crate::timestamp::iso_opt", skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl_record!(CalendarEvent, "events");

impl CalendarEvent {
    pub fn new(title: impl Into<String>, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            id: String::new(),
            title: title.into(),
            description: None,
            start,
            end,
            all_day: false,
            is_recurring: false,
            recurring_rule: None,
            task_id: None,
            project_id: None,
            location: None,
            attendees: Vec::new(),
            color: None,
            created_by: None,
            updated_by: None,
            created_at: None,
            updated_at: None,
        }
    }

    /// Event scheduled for a task, inheriting its project
    pub fn for_task(task: &Task, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        let mut event = Self::new(task.title.clone(), start, end);
        event.task_id = Some(task.id.clone());
        event.project_id = Some(task.project_id.clone());
        event
    }
}

// ============================================================================
// Projects
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProjectStatus {
    #[default]
    Active,
    Archived,
    OnHold,
    Completed,
}

string_enum!(ProjectStatus {
    Active => "active",
    Archived => "archived",
    OnHold => "on-hold",
    Completed => "completed",
});

/// A kanban column; `order` is contiguous and zero-based within a project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KanbanColumn {
    pub id: String,
    pub title: String,
    pub order: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wip_limit: Option<u32>,
    #[serde(default)]
    pub status: TaskStatus,
}

impl KanbanColumn {
    pub fn new(id: impl Into<String>, title: impl Into<String>, order: u32, status: TaskStatus) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            order,
            color: None,
            wip_limit: None,
            status,
        }
    }

    /// Columns every new project starts with
    pub fn defaults() -> Vec<KanbanColumn> {
        vec![
            KanbanColumn::new("todo", "To Do", 0, TaskStatus::Todo),
            KanbanColumn::new("in-progress", "In Progress", 1, TaskStatus::InProgress),
            KanbanColumn::new("done", "Done", 2, TaskStatus::Done),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProjectSettings {
    pub task_statuses: Vec<TaskStatus>,
    pub default_task_status: TaskStatus,
    pub default_priority: Priority,
    pub enable_time_tracking: bool,
    pub enable_subtasks: bool,
    pub enable_comments: bool,
    pub enable_attachments: bool,
    pub enable_labels: bool,
}

impl Default for ProjectSettings {
    fn default() -> Self {
        Self {
            task_statuses: TaskStatus::ALL.to_vec(),
            default_task_status: TaskStatus::Todo,
            default_priority: Priority::Medium,
            enable_time_tracking: false,
            enable_subtasks: true,
            enable_comments: true,
            enable_attachments: true,
            enable_labels: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default = "default_project_color")]
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default = "KanbanColumn::defaults")]
    pub columns: Vec<KanbanColumn>,
    #[serde(default)]
    pub status: ProjectStatus,
    #[serde(default, with = "crate::timestamp::iso_opt", skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default, with = "crate::timestamp::iso_opt", skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_favorite: bool,
    /// Percent complete, 0-100
    #[serde(default, deserialize_with = "deserialize_progress")]
    pub progress: u8,
    #[serde(default)]
    pub settings: ProjectSettings,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
    #[serde(default, with = "crate::timestamp::iso_opt", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, with = "crate::timestamp::iso_opt", skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl_record!(Project, "projects");

// Out-of-range progress is clamped rather than rejected
fn deserialize_progress<'de, D: serde::Deserializer<'de>>(deserializer: D) -> Result<u8, D::Error> {
    let raw = i64::deserialize(deserializer)?;
    Ok(raw.clamp(0, 100) as u8)
}

fn default_project_color() -> String {
    "#6366f1".to_string()
}

impl Project {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            name: name.into(),
            description: None,
            color: default_project_color(),
            icon: None,
            columns: KanbanColumn::defaults(),
            status: ProjectStatus::Active,
            start_date: None,
            due_date: None,
            tags: Vec::new(),
            is_favorite: false,
            progress: 0,
            settings: ProjectSettings::default(),
            created_by: None,
            updated_by: None,
            created_at: None,
            updated_at: None,
        }
    }

    /// Columns in display order
    pub fn sorted_columns(&self) -> Vec<&KanbanColumn> {
        let mut columns: Vec<&KanbanColumn> = self.columns.iter().collect();
        columns.sort_by_key(|c| c.order);
        columns
    }

    pub fn column(&self, id: &str) -> Option<&KanbanColumn> {
        self.columns.iter().find(|c| c.id == id)
    }

    /// Append a column after the existing ones
    pub fn add_column(&mut self, title: impl Into<String>, status: TaskStatus) -> &KanbanColumn {
        self.normalize_columns();
        let order = self.columns.len() as u32;
        let id = format!("column-{}", uuid::Uuid::now_v7());
        self.columns.push(KanbanColumn::new(id, title, order, status));
        &self.columns[self.columns.len() - 1]
    }

    /// Move a column to a new zero-based position; false if the id is unknown
    pub fn move_column(&mut self, id: &str, to: usize) -> bool {
        self.normalize_columns();
        let Some(from) = self.columns.iter().position(|c| c.id == id) else {
            return false;
        };
        let column = self.columns.remove(from);
        let to = to.min(self.columns.len());
        self.columns.insert(to, column);
        self.renumber_columns();
        true
    }

    pub fn remove_column(&mut self, id: &str) -> Option<KanbanColumn> {
        self.normalize_columns();
        let index = self.columns.iter().position(|c| c.id == id)?;
        let removed = self.columns.remove(index);
        self.renumber_columns();
        Some(removed)
    }

    /// Sort columns by `order` and renumber them 0..n
    pub fn normalize_columns(&mut self) {
        self.columns.sort_by_key(|c| c.order);
        self.renumber_columns();
    }

    fn renumber_columns(&mut self) {
        for (index, column) in self.columns.iter_mut().enumerate() {
            column.order = index as u32;
        }
    }
}

// ============================================================================
// Profile
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    #[default]
    System,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeFormat {
    #[serde(rename = "12h")]
    TwelveHour,
    #[default]
    #[serde(rename = "24h")]
    TwentyFourHour,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DefaultView {
    #[default]
    List,
    Board,
    Calendar,
    Timeline,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserPreferences {
    pub theme: Theme,
    pub language: String,
    /// 0 = Sunday, 1 = Monday, ...
    pub week_starts_on: u8,
    pub time_format: TimeFormat,
    pub date_format: String,
    pub default_view: DefaultView,
    pub show_completed_tasks: bool,
    pub show_archived_projects: bool,
}

impl Default for UserPreferences {
    fn default() -> Self {
        Self {
            theme: Theme::System,
            language: "en".to_string(),
            week_starts_on: 1,
            time_format: TimeFormat::TwentyFourHour,
            date_format: "yyyy-MM-dd".to_string(),
            default_view: DefaultView::List,
            show_completed_tasks: true,
            show_archived_projects: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NotificationSettings {
    pub email: bool,
    pub desktop: bool,
    pub mobile: bool,
    pub task_reminders: bool,
    pub due_date_alerts: bool,
    pub mention_alerts: bool,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            email: false,
            desktop: true,
            mobile: false,
            task_reminders: true,
            due_date_alerts: true,
            mention_alerts: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SecuritySettings {
    pub two_factor_auth: bool,
    pub login_alerts: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserSettings {
    pub notifications: NotificationSettings,
    pub security: SecuritySettings,
}

/// The single local user's profile, stored under [`PROFILE_ID`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(default = "profile_id")]
    pub id: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default)]
    pub preferences: UserPreferences,
    #[serde(default)]
    pub settings: UserSettings,
    #[serde(default, with = "crate::timestamp::iso_opt", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, with = "crate::timestamp::iso_opt", skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl_record!(UserProfile, "profile", Some(PROFILE_ID));

fn profile_id() -> String {
    PROFILE_ID.to_string()
}

fn default_timezone() -> String {
    "UTC".to_string()
}

impl Default for UserProfile {
    fn default() -> Self {
        Self {
            id: profile_id(),
            email: String::new(),
            full_name: String::new(),
            avatar_url: None,
            timezone: default_timezone(),
            preferences: UserPreferences::default(),
            settings: UserSettings::default(),
            created_at: None,
            updated_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timestamp;

    #[test]
    fn test_task_status_serialization() {
        let json = serde_json::to_string(&TaskStatus::InProgress).unwrap();
        assert_eq!(json, "\"in-progress\"");

        let status: TaskStatus = serde_json::from_str("\"in-review\"").unwrap();
        assert_eq!(status, TaskStatus::InReview);
    }

    #[test]
    fn test_enum_from_str() {
        assert_eq!("done".parse::<TaskStatus>().unwrap(), TaskStatus::Done);
        assert_eq!("urgent".parse::<Priority>().unwrap(), Priority::Urgent);
        assert_eq!("on-hold".parse::<ProjectStatus>().unwrap(), ProjectStatus::OnHold);
        assert!("someday".parse::<TaskStatus>().is_err());
    }

    #[test]
    fn test_task_defaults() {
        let task = Task::new("Buy milk", "p1");
        assert!(task.id.is_empty());
        assert_eq!(task.status, TaskStatus::Todo);
        assert_eq!(task.priority, Priority::Medium);
        assert_eq!(task.position, 0);
        assert!(task.created_at.is_none());
        assert!(!task.is_subtask());
    }

    #[test]
    fn test_task_serializes_camel_case() {
        let mut task = Task::new("Buy milk", "p1");
        task.due_date = Some(timestamp::parse("2024-05-01").unwrap());
        let json = serde_json::to_value(&task).unwrap();

        assert_eq!(json["projectId"], "p1");
        assert_eq!(json["dueDate"], "2024-05-01T00:00:00.000Z");
        assert!(json.get("parentTaskId").is_none());
        assert!(json.get("createdAt").is_none());
    }

    #[test]
    fn test_task_move_to_tracks_completion() {
        let mut task = Task::new("Ship", "p1");
        task.move_to(TaskStatus::Done, 3);
        assert_eq!(task.status, TaskStatus::Done);
        assert_eq!(task.position, 3);
        assert!(task.completed_at.is_some());

        task.move_to(TaskStatus::Todo, 0);
        assert!(task.completed_at.is_none());
    }

    #[test]
    fn test_event_for_task() {
        let mut task = Task::new("Review", "p9");
        task.id = "t1".to_string();
        let start = timestamp::parse("2024-05-01T09:00:00Z").unwrap();
        let end = timestamp::parse("2024-05-01T10:00:00Z").unwrap();

        let event = CalendarEvent::for_task(&task, start, end);
        assert_eq!(event.task_id.as_deref(), Some("t1"));
        assert_eq!(event.project_id.as_deref(), Some("p9"));
        assert_eq!(event.title, "Review");
    }

    #[test]
    fn test_project_default_columns() {
        let project = Project::new("Home");
        let ids: Vec<&str> = project.sorted_columns().iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["todo", "in-progress", "done"]);
        assert_eq!(project.column("done").unwrap().status, TaskStatus::Done);
    }

    #[test]
    fn test_project_move_column_renumbers() {
        let mut project = Project::new("Home");
        assert!(project.move_column("done", 0));

        let columns = project.sorted_columns();
        assert_eq!(columns[0].id, "done");
        assert_eq!(columns[1].id, "todo");
        assert_eq!(columns[2].id, "in-progress");
        let orders: Vec<u32> = columns.iter().map(|c| c.order).collect();
        assert_eq!(orders, vec![0, 1, 2]);

        assert!(!project.move_column("missing", 1));
    }

    #[test]
    fn test_project_add_and_remove_column() {
        let mut project = Project::new("Home");
        let added = project.add_column("Review", TaskStatus::InReview).clone();
        assert_eq!(added.order, 3);
        assert!(added.id.starts_with("column-"));

        let removed = project.remove_column("in-progress").unwrap();
        assert_eq!(removed.id, "in-progress");
        let orders: Vec<u32> = project.sorted_columns().iter().map(|c| c.order).collect();
        assert_eq!(orders, vec![0, 1, 2]);
        assert!(project.remove_column("in-progress").is_none());
    }

    #[test]
    fn test_project_normalizes_gapped_orders() {
        let mut project = Project::new("Home");
        project.columns = vec![
            KanbanColumn::new("b", "B", 7, TaskStatus::Done),
            KanbanColumn::new("a", "A", 2, TaskStatus::Todo),
        ];
        project.normalize_columns();
        assert_eq!(project.columns[0].id, "a");
        assert_eq!(project.columns[0].order, 0);
        assert_eq!(project.columns[1].order, 1);
    }

    #[test]
    fn test_project_missing_fields_use_defaults() {
        // Shape written by older builds: no columns, settings or color
        let project: Project = serde_json::from_str(r#"{"id":"p1","name":"My Project"}"#).unwrap();
        assert_eq!(project.columns.len(), 3);
        assert_eq!(project.color, "#6366f1");
        assert_eq!(project.settings, ProjectSettings::default());
        assert_eq!(project.progress, 0);
    }

    #[test]
    fn test_project_progress_is_clamped() {
        let over: Project = serde_json::from_str(r#"{"name":"P","progress":150}"#).unwrap();
        assert_eq!(over.progress, 100);
        let under: Project = serde_json::from_str(r#"{"name":"P","progress":-5}"#).unwrap();
        assert_eq!(under.progress, 0);
        let within: Project = serde_json::from_str(r#"{"name":"P","progress":42}"#).unwrap();
        assert_eq!(within.progress, 42);
    }

    #[test]
    fn test_profile_defaults() {
        let profile = UserProfile::default();
        assert_eq!(profile.id, PROFILE_ID);
        assert_eq!(profile.preferences.theme, Theme::System);

        let json = serde_json::to_value(&profile).unwrap();
        assert_eq!(json["preferences"]["timeFormat"], "24h");
        assert_eq!(json["settings"]["notifications"]["dueDateAlerts"], true);
    }

    #[test]
    fn test_collection_names() {
        assert_eq!(Task::collection_name(), "tasks");
        assert_eq!(Note::collection_name(), "notes");
        assert_eq!(NoteFolder::collection_name(), "folders");
        assert_eq!(CalendarEvent::collection_name(), "events");
        assert_eq!(Project::collection_name(), "projects");
        assert_eq!(UserProfile::collection_name(), "profile");
        assert_eq!(UserProfile::fixed_id(), Some(PROFILE_ID));
        assert_eq!(Task::fixed_id(), None);
    }
}
