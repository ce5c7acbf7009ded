use clap::{Parser, Subcommand};
use colored::Colorize;
use eyre::{Result, WrapErr, eyre};
use std::path::PathBuf;
use taskflow::models::PROFILE_ID;
use taskflow::{
    CalendarEvent, Filter, Note, Patch, Priority, Project, Store, StoreConfig, Task, TaskStatus, timestamp,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "taskflow")]
#[command(about = "taskflow CLI - local tasks, notes, calendar events and kanban projects")]
#[command(version)]
struct Cli {
    /// YAML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory holding the database (overrides the config file)
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Log store activity at debug level
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the database and apply pending migrations
    Init,

    /// Show collections and their indexes
    Schema,

    /// Manage projects
    #[command(subcommand)]
    Project(ProjectCommand),

    /// Manage tasks
    #[command(subcommand)]
    Task(TaskCommand),

    /// Manage notes
    #[command(subcommand)]
    Note(NoteCommand),

    /// Manage calendar events
    #[command(subcommand)]
    Event(EventCommand),

    /// Show the user profile
    Profile,
}

#[derive(Subcommand)]
enum ProjectCommand {
    /// Create a project with the default columns
    Add { name: String },
    /// List projects
    List,
    /// Show a project's kanban columns
    Columns { id: String },
}

#[derive(Subcommand)]
enum TaskCommand {
    /// Create a task
    Add {
        title: String,
        #[arg(short, long)]
        project: String,
        #[arg(long, default_value = "medium")]
        priority: Priority,
        #[arg(long, default_value = "todo")]
        status: TaskStatus,
        /// Due date (YYYY-MM-DD or RFC 3339)
        #[arg(long)]
        due: Option<String>,
    },
    /// List tasks
    List {
        #[arg(short, long)]
        project: Option<String>,
        #[arg(long)]
        status: Option<TaskStatus>,
    },
    /// Change a task's status
    Status { id: String, status: TaskStatus },
    /// Delete a task
    Rm { id: String },
}

#[derive(Subcommand)]
enum NoteCommand {
    /// Create a note
    Add {
        title: String,
        content: String,
        #[arg(short, long)]
        project: Option<String>,
        #[arg(long)]
        pinned: bool,
    },
    /// List notes
    List {
        #[arg(short, long)]
        project: Option<String>,
        #[arg(long)]
        pinned: bool,
    },
    /// Delete a note
    Rm { id: String },
}

#[derive(Subcommand)]
enum EventCommand {
    /// List calendar events
    List {
        #[arg(short, long)]
        project: Option<String>,
    },
    /// Delete an event
    Rm { id: String },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup tracing
    let default_level = if cli.verbose { "taskflow=debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with_writer(std::io::stderr)
        .init();

    let mut config = match &cli.config {
        Some(path) => StoreConfig::load(path)?,
        None => StoreConfig::default(),
    };
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }

    let store = Store::new(config);

    match cli.command {
        Commands::Init => {
            store.connect().wrap_err("Failed to open store")?;
            println!(
                "Store ready at {} (schema version {})",
                store.config().db_path().display(),
                store.schema_version()?
            );
            if let Some(report) = store.migration_report().filter(|r| !r.is_noop()) {
                println!(
                    "Migrated {} -> {} ({} changes)",
                    report.from_version, report.to_version, report.applied
                );
            }
        }
        Commands::Schema => {
            for collection in store.collections()? {
                let indexes = store.indexes(&collection)?;
                println!("{} [{}]", collection.bold(), indexes.join(", "));
            }
        }
        Commands::Project(command) => run_project(&store, command)?,
        Commands::Task(command) => run_task(&store, command)?,
        Commands::Note(command) => run_note(&store, command)?,
        Commands::Event(command) => run_event(&store, command)?,
        Commands::Profile => match store.get_profile()? {
            Some(profile) => println!("{}", serde_json::to_string_pretty(&profile)?),
            None => println!("No profile saved (key {})", PROFILE_ID),
        },
    }

    Ok(())
}

fn run_project(store: &Store, command: ProjectCommand) -> Result<()> {
    match command {
        ProjectCommand::Add { name } => {
            let project = store.create(Project::new(name))?;
            println!("Created project {}", project.id.green());
        }
        ProjectCommand::List => {
            let projects: Vec<Project> = store.get_all()?;
            for project in projects {
                let star = if project.is_favorite { "*" } else { " " };
                println!(
                    "{} {} {} ({}, {}%)",
                    star,
                    project.id.dimmed(),
                    project.name.bold(),
                    project.status,
                    project.progress
                );
            }
        }
        ProjectCommand::Columns { id } => {
            let project: Project = store
                .get(&id)?
                .ok_or_else(|| eyre!("Project not found: {}", id))?;
            for column in project.sorted_columns() {
                let limit = column.wip_limit.map(|l| format!(" (WIP {})", l)).unwrap_or_default();
                println!("{}. {} -> {}{}", column.order, column.title.bold(), column.status, limit);
            }
        }
    }
    Ok(())
}

fn run_task(store: &Store, command: TaskCommand) -> Result<()> {
    match command {
        TaskCommand::Add {
            title,
            project,
            priority,
            status,
            due,
        } => {
            let mut task = Task::new(title, project).with_priority(priority).with_status(status);
            task.due_date = due
                .as_deref()
                .map(timestamp::parse)
                .transpose()
                .map_err(|e| eyre!(e))?;
            let task = store.create(task)?;
            println!("Created task {}", task.id.green());
        }
        TaskCommand::List { project, status } => {
            let mut filters = Vec::new();
            if let Some(project) = project {
                filters.push(Filter::eq("projectId", project));
            }
            if let Some(status) = status {
                filters.push(Filter::eq("status", status.as_str()));
            }
            let tasks: Vec<Task> = store.list(&filters)?;
            for task in tasks {
                println!(
                    "{} [{}] {} {}",
                    task.id.dimmed(),
                    colored_status(task.status),
                    task.title,
                    format!("({})", task.priority).dimmed()
                );
            }
        }
        TaskCommand::Status { id, status } => {
            let patch = Patch::new().set_serialized("status", &status)?;
            let task: Task = store.patch(&id, &patch)?;
            println!("{} is now {}", task.title, colored_status(task.status));
        }
        TaskCommand::Rm { id } => {
            store.delete::<Task>(&id)?;
            println!("Deleted task {}", id);
        }
    }
    Ok(())
}

fn run_note(store: &Store, command: NoteCommand) -> Result<()> {
    match command {
        NoteCommand::Add {
            title,
            content,
            project,
            pinned,
        } => {
            let mut note = Note::new(title, content);
            note.project_id = project;
            note.is_pinned = pinned;
            let note = store.create(note)?;
            println!("Created note {}", note.id.green());
        }
        NoteCommand::List { project, pinned } => {
            let mut filters = Vec::new();
            if let Some(project) = project {
                filters.push(Filter::eq("projectId", project));
            }
            if pinned {
                filters.push(Filter::eq("isPinned", true));
            }
            let notes: Vec<Note> = store.list(&filters)?;
            for note in notes {
                let pin = if note.is_pinned { "^" } else { " " };
                println!("{} {} {}", pin, note.id.dimmed(), note.title.bold());
            }
        }
        NoteCommand::Rm { id } => {
            store.delete::<Note>(&id)?;
            println!("Deleted note {}", id);
        }
    }
    Ok(())
}

fn run_event(store: &Store, command: EventCommand) -> Result<()> {
    match command {
        EventCommand::List { project } => {
            let filters: Vec<Filter> = project.into_iter().map(|p| Filter::eq("projectId", p)).collect();
            let mut events: Vec<CalendarEvent> = store.list(&filters)?;
            events.sort_by_key(|e| e.start);
            for event in events {
                println!(
                    "{} {} - {} {}",
                    event.id.dimmed(),
                    timestamp::format(&event.start),
                    timestamp::format(&event.end),
                    event.title.bold()
                );
            }
        }
        EventCommand::Rm { id } => {
            store.delete::<CalendarEvent>(&id)?;
            println!("Deleted event {}", id);
        }
    }
    Ok(())
}

fn colored_status(status: TaskStatus) -> colored::ColoredString {
    match status {
        TaskStatus::Done => status.as_str().green(),
        TaskStatus::Cancelled => status.as_str().dimmed(),
        TaskStatus::InProgress | TaskStatus::InReview => status.as_str().yellow(),
        TaskStatus::Backlog | TaskStatus::Todo => status.as_str().normal(),
    }
}
