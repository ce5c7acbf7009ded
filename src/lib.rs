// taskflow - Local-first store for tasks, notes, calendar events and kanban projects

pub mod config;
pub mod error;
pub mod filter;
pub mod models;
pub mod record;
pub mod schema;
pub mod store;
pub mod timestamp;

// Re-export main types for convenience
pub use config::StoreConfig;
pub use error::{StoreError, StoreResult};
pub use filter::{Filter, FilterOp};
pub use models::{
    CalendarEvent, KanbanColumn, Note, NoteFolder, PROFILE_ID, Priority, Project, ProjectSettings, ProjectStatus,
    Task, TaskStatus, UserProfile,
};
pub use record::{IndexValue, Patch, Record};
pub use schema::{MigrationReport, latest_version};
pub use store::Store;
