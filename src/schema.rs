// Schema catalog and migrations
//
// Every collection and secondary index is declared by a migration step, grouped
// by the version that introduced it. A step that finds its collection or index
// already in the catalog does nothing. The stored version lives in
// `PRAGMA user_version`; migrations never rewrite or drop records.

use crate::error::{StoreError, StoreResult};
use crate::record::IndexValue;
use rusqlite::{Connection, OptionalExtension};
use tracing::{debug, info};

/// A single additive schema change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaStep {
    CreateCollection(&'static str),
    CreateIndex {
        collection: &'static str,
        field: &'static str,
    },
}

#[derive(Debug, Clone, Copy)]
struct Migration {
    version: u32,
    steps: &'static [SchemaStep],
}

const fn index(collection: &'static str, field: &'static str) -> SchemaStep {
    SchemaStep::CreateIndex { collection, field }
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        steps: &[
            SchemaStep::CreateCollection("tasks"),
            index("tasks", "status"),
            index("tasks", "priority"),
            index("tasks", "dueDate"),
            index("tasks", "projectId"),
            SchemaStep::CreateCollection("notes"),
            index("notes", "isPinned"),
            index("notes", "updatedAt"),
            SchemaStep::CreateCollection("events"),
            index("events", "start"),
            index("events", "end"),
            SchemaStep::CreateCollection("projects"),
            index("projects", "updatedAt"),
            SchemaStep::CreateCollection("profile"),
        ],
    },
    Migration {
        version: 2,
        steps: &[
            index("tasks", "parentTaskId"),
            index("tasks", "assigneeId"),
            index("notes", "isArchived"),
            index("notes", "projectId"),
            index("notes", "folderId"),
            index("events", "isRecurring"),
            index("events", "taskId"),
            index("events", "projectId"),
            index("projects", "status"),
            index("projects", "isFavorite"),
            index("projects", "createdBy"),
        ],
    },
    Migration {
        version: 3,
        steps: &[
            SchemaStep::CreateCollection("folders"),
            index("folders", "parentId"),
            index("folders", "projectId"),
        ],
    },
];

/// Returns the newest schema version known by this build
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |migration| migration.version)
}

/// Outcome of a migration run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MigrationReport {
    pub from_version: u32,
    pub to_version: u32,
    pub applied: usize,
    pub skipped: usize,
}

impl MigrationReport {
    pub fn is_noop(&self) -> bool {
        self.from_version == self.to_version
    }
}

/// Create the storage tables shared by all collections
pub(crate) fn create_base_tables(conn: &Connection) -> StoreResult<()> {
    debug!("Creating base tables");

    conn.execute_batch(
        r#"
        -- Generic records table
        CREATE TABLE IF NOT EXISTS records (
            collection TEXT NOT NULL,
            id TEXT NOT NULL,
            data_json TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            PRIMARY KEY (collection, id)
        );

        CREATE INDEX IF NOT EXISTS idx_records_updated_at ON records(collection, updated_at);

        -- Secondary index rows, one per (record, declared field)
        CREATE TABLE IF NOT EXISTS record_indexes (
            collection TEXT NOT NULL,
            id TEXT NOT NULL,
            field_name TEXT NOT NULL,
            field_value_str TEXT,
            field_value_int INTEGER,
            field_value_bool INTEGER,
            PRIMARY KEY (collection, id, field_name),
            FOREIGN KEY (collection, id) REFERENCES records(collection, id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_record_indexes_field_str ON record_indexes(collection, field_name, field_value_str);
        CREATE INDEX IF NOT EXISTS idx_record_indexes_field_int ON record_indexes(collection, field_name, field_value_int);
        CREATE INDEX IF NOT EXISTS idx_record_indexes_field_bool ON record_indexes(collection, field_name, field_value_bool);

        -- Catalog of declared collections and indexes
        CREATE TABLE IF NOT EXISTS schema_collections (
            name TEXT PRIMARY KEY,
            version INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS schema_indexes (
            collection TEXT NOT NULL REFERENCES schema_collections(name),
            field_name TEXT NOT NULL,
            version INTEGER NOT NULL,
            PRIMARY KEY (collection, field_name)
        );
        "#,
    )?;

    Ok(())
}

/// Read the stored schema version
pub(crate) fn stored_version(conn: &Connection) -> StoreResult<u32> {
    let version = conn.query_row("PRAGMA user_version", [], |row| row.get::<_, u32>(0))?;
    Ok(version)
}

/// Apply every pending migration up to `target`
pub(crate) fn migrate(conn: &mut Connection, target: u32) -> StoreResult<MigrationReport> {
    let latest = latest_version();
    if target == 0 || target > latest {
        return Err(StoreError::Schema(format!(
            "requested schema version {} is not between 1 and {}",
            target, latest
        )));
    }

    let current = stored_version(conn)?;
    if current > latest {
        return Err(StoreError::Schema(format!(
            "database schema version {} is newer than supported {}",
            current, latest
        )));
    }

    let mut report = MigrationReport {
        from_version: current,
        to_version: current,
        applied: 0,
        skipped: 0,
    };

    if current >= target {
        debug!(current, target, "Schema up to date");
        return Ok(report);
    }

    info!(from = current, to = target, "Upgrading schema");

    let tx = conn.transaction()?;
    for migration in MIGRATIONS {
        if migration.version <= current || migration.version > target {
            continue;
        }

        for step in migration.steps {
            if apply_step(&tx, migration.version, step)? {
                report.applied += 1;
            } else {
                report.skipped += 1;
            }
        }
    }
    tx.execute_batch(&format!("PRAGMA user_version = {};", target))?;
    tx.commit()?;

    report.to_version = target;
    info!(
        from = report.from_version,
        to = report.to_version,
        applied = report.applied,
        skipped = report.skipped,
        "Schema upgrade complete"
    );
    Ok(report)
}

/// Apply one step; returns false when it was already in place
fn apply_step(conn: &Connection, version: u32, step: &SchemaStep) -> StoreResult<bool> {
    match *step {
        SchemaStep::CreateCollection(name) => {
            if collection_exists(conn, name)? {
                debug!(collection = name, "Collection already exists");
                return Ok(false);
            }
            conn.execute(
                "INSERT INTO schema_collections (name, version) VALUES (?1, ?2)",
                rusqlite::params![name, version],
            )?;
            debug!(collection = name, version, "Created collection");
            Ok(true)
        }
        SchemaStep::CreateIndex { collection, field } => {
            if !collection_exists(conn, collection)? {
                return Err(StoreError::Schema(format!(
                    "cannot index {}.{}: collection does not exist",
                    collection, field
                )));
            }
            if index_exists(conn, collection, field)? {
                debug!(collection, field, "Index already exists");
                return Ok(false);
            }
            conn.execute(
                "INSERT INTO schema_indexes (collection, field_name, version) VALUES (?1, ?2, ?3)",
                rusqlite::params![collection, field, version],
            )?;
            let backfilled = backfill_index(conn, collection, field)?;
            debug!(collection, field, version, backfilled, "Created index");
            Ok(true)
        }
    }
}

/// Index the named field for records written before the index existed
fn backfill_index(conn: &Connection, collection: &str, field: &str) -> StoreResult<usize> {
    let rows: Vec<(String, String)> = {
        let mut stmt = conn.prepare("SELECT id, data_json FROM records WHERE collection = ?1")?;
        let rows = stmt.query_map([collection], |row| Ok((row.get(0)?, row.get(1)?)))?;
        rows.collect::<Result<_, _>>()?
    };

    let mut count = 0;
    for (id, data_json) in rows {
        let data: serde_json::Value = serde_json::from_str(&data_json)?;
        if let Some(value) = data.get(field).and_then(IndexValue::from_json) {
            write_index_row(conn, collection, &id, field, &value)?;
            count += 1;
        }
    }
    Ok(count)
}

/// Insert one secondary-index row
pub(crate) fn write_index_row(
    conn: &Connection,
    collection: &str,
    id: &str,
    field: &str,
    value: &IndexValue,
) -> StoreResult<()> {
    match value {
        IndexValue::String(s) => {
            conn.execute(
                "INSERT OR REPLACE INTO record_indexes (collection, id, field_name, field_value_str, field_value_int, field_value_bool)
                 VALUES (?1, ?2, ?3, ?4, NULL, NULL)",
                rusqlite::params![collection, id, field, s],
            )?;
        }
        IndexValue::Int(i) => {
            conn.execute(
                "INSERT OR REPLACE INTO record_indexes (collection, id, field_name, field_value_str, field_value_int, field_value_bool)
                 VALUES (?1, ?2, ?3, NULL, ?4, NULL)",
                rusqlite::params![collection, id, field, i],
            )?;
        }
        IndexValue::Bool(b) => {
            conn.execute(
                "INSERT OR REPLACE INTO record_indexes (collection, id, field_name, field_value_str, field_value_int, field_value_bool)
                 VALUES (?1, ?2, ?3, NULL, NULL, ?4)",
                rusqlite::params![collection, id, field, *b as i64],
            )?;
        }
    }
    Ok(())
}

pub(crate) fn collection_exists(conn: &Connection, name: &str) -> StoreResult<bool> {
    let found: Option<i64> = conn
        .query_row("SELECT 1 FROM schema_collections WHERE name = ?1", [name], |row| row.get(0))
        .optional()?;
    Ok(found.is_some())
}

pub(crate) fn index_exists(conn: &Connection, collection: &str, field: &str) -> StoreResult<bool> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM schema_indexes WHERE collection = ?1 AND field_name = ?2",
            [collection, field],
            |row| row.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

/// Declared collections, ordered by name
pub(crate) fn collections(conn: &Connection) -> StoreResult<Vec<String>> {
    let mut stmt = conn.prepare("SELECT name FROM schema_collections ORDER BY name")?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(names)
}

/// Indexed fields of a collection, ordered by name
pub(crate) fn indexes(conn: &Connection, collection: &str) -> StoreResult<Vec<String>> {
    let mut stmt = conn.prepare("SELECT field_name FROM schema_indexes WHERE collection = ?1 ORDER BY field_name")?;
    let fields = stmt
        .query_map([collection], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        create_base_tables(&conn).unwrap();
        conn
    }

    #[test]
    fn test_versions_are_monotonic() {
        let versions: Vec<u32> = MIGRATIONS.iter().map(|m| m.version).collect();
        assert!(versions.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(latest_version(), 3);
    }

    #[test]
    fn test_migrate_fresh_to_latest() {
        let mut conn = fresh();
        let report = migrate(&mut conn, latest_version()).unwrap();

        assert_eq!(report.from_version, 0);
        assert_eq!(report.to_version, 3);
        assert_eq!(report.skipped, 0);
        assert_eq!(stored_version(&conn).unwrap(), 3);
        assert_eq!(
            collections(&conn).unwrap(),
            vec!["events", "folders", "notes", "profile", "projects", "tasks"]
        );
        assert_eq!(
            indexes(&conn, "tasks").unwrap(),
            vec!["assigneeId", "dueDate", "parentTaskId", "priority", "projectId", "status"]
        );
        assert!(indexes(&conn, "profile").unwrap().is_empty());
    }

    #[test]
    fn test_migrate_is_incremental() {
        let mut conn = fresh();
        migrate(&mut conn, 1).unwrap();
        assert_eq!(stored_version(&conn).unwrap(), 1);
        assert!(!collection_exists(&conn, "folders").unwrap());
        assert!(!index_exists(&conn, "notes", "projectId").unwrap());

        let report = migrate(&mut conn, 3).unwrap();
        assert_eq!(report.from_version, 1);
        assert!(collection_exists(&conn, "folders").unwrap());
        assert!(index_exists(&conn, "notes", "projectId").unwrap());
    }

    #[test]
    fn test_migrate_current_version_is_noop() {
        let mut conn = fresh();
        migrate(&mut conn, 3).unwrap();
        let report = migrate(&mut conn, 3).unwrap();
        assert!(report.is_noop());
        assert_eq!(report.applied, 0);
    }

    #[test]
    fn test_steps_skip_existing_catalog_entries() {
        let mut conn = fresh();
        // Catalog already lists tasks while the version header still says 0
        conn.execute("INSERT INTO schema_collections (name, version) VALUES ('tasks', 1)", [])
            .unwrap();

        let report = migrate(&mut conn, 1).unwrap();
        assert_eq!(report.skipped, 1);
        assert!(collection_exists(&conn, "notes").unwrap());
    }

    #[test]
    fn test_newer_database_is_rejected() {
        let mut conn = fresh();
        conn.execute_batch("PRAGMA user_version = 99;").unwrap();

        let err = migrate(&mut conn, latest_version()).unwrap_err();
        assert!(matches!(err, StoreError::Schema(_)));
        assert!(err.to_string().contains("newer than supported"));
    }

    #[test]
    fn test_unknown_target_is_rejected() {
        let mut conn = fresh();
        assert!(matches!(migrate(&mut conn, 0), Err(StoreError::Schema(_))));
        assert!(matches!(migrate(&mut conn, 42), Err(StoreError::Schema(_))));
    }

    #[test]
    fn test_new_index_backfills_existing_records() {
        let mut conn = fresh();
        migrate(&mut conn, 1).unwrap();
        conn.execute(
            "INSERT INTO records (collection, id, data_json, created_at, updated_at)
             VALUES ('notes', 'n1', '{\"id\":\"n1\",\"projectId\":\"p1\",\"isArchived\":true}', 'x', 'x')",
            [],
        )
        .unwrap();

        migrate(&mut conn, 2).unwrap();

        let project: String = conn
            .query_row(
                "SELECT field_value_str FROM record_indexes WHERE collection = 'notes' AND id = 'n1' AND field_name = 'projectId'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(project, "p1");

        let archived: i64 = conn
            .query_row(
                "SELECT field_value_bool FROM record_indexes WHERE collection = 'notes' AND id = 'n1' AND field_name = 'isArchived'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(archived, 1);
    }
}
