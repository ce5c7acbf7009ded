// Local store: connection lifecycle plus generic CRUD over SQLite

use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::filter::{Filter, FilterOp};
use crate::models::{PROFILE_ID, UserProfile};
use crate::record::{IndexValue, Patch, Record};
use crate::schema::{self, MigrationReport};
use crate::timestamp;
use once_cell::sync::OnceCell;
use rusqlite::{Connection, OptionalExtension};
use serde_json::Value;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

/// Persistent store for tasks, notes, events, projects and the user profile
///
/// Constructing a store does no I/O. The first operation (or an explicit
/// [`Store::connect`]) opens the database and brings the schema up to the
/// configured version. Concurrent first callers share that single open.
pub struct Store {
    config: StoreConfig,
    db: OnceCell<Mutex<Connection>>,
    migration: OnceCell<MigrationReport>,
    open_count: AtomicUsize,
}

impl Store {
    /// Create a store; the database is opened lazily
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
            migration: OnceCell::new(),
            open_count: AtomicUsize::new(0),
        }
    }

    /// Store backed by a private in-memory database
    pub fn in_memory() -> Self {
        Self::new(StoreConfig::memory())
    }

    /// Open or create a store in the given directory and connect immediately
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let store = Self::new(StoreConfig::at(path));
        store.connect()?;
        Ok(store)
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    // ========================================================================
    // Connection lifecycle
    // ========================================================================

    /// Ensure the database is open and migrated
    ///
    /// Returns immediately once connected. A failed attempt leaves the store
    /// unconnected; the next call tries again.
    pub fn connect(&self) -> StoreResult<()> {
        self.db.get_or_try_init(|| self.open_connection())?;
        Ok(())
    }

    pub fn is_connected(&self) -> bool {
        self.db.get().is_some()
    }

    /// Number of open sequences that have run against this store
    pub fn open_count(&self) -> usize {
        self.open_count.load(Ordering::SeqCst)
    }

    /// Schema changes made by the open sequence, once connected
    pub fn migration_report(&self) -> Option<MigrationReport> {
        self.migration.get().copied()
    }

    fn connection(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        let db = self.db.get_or_try_init(|| self.open_connection())?;
        db.lock()
            .map_err(|_| StoreError::Connection("connection lock poisoned".to_string()))
    }

    fn open_connection(&self) -> StoreResult<Mutex<Connection>> {
        self.open_count.fetch_add(1, Ordering::SeqCst);
        let started_at = Instant::now();
        let mode = if self.config.in_memory { "memory" } else { "file" };
        info!(mode, "Opening database");

        match self.bootstrap() {
            Ok((db, report)) => {
                info!(
                    mode,
                    schema_version = report.to_version,
                    migrated = !report.is_noop(),
                    duration_ms = started_at.elapsed().as_millis() as u64,
                    "Database ready"
                );
                // Only the single successful open gets here
                let _ = self.migration.set(report);
                Ok(Mutex::new(db))
            }
            Err(e) => {
                error!(
                    mode,
                    error = %e,
                    duration_ms = started_at.elapsed().as_millis() as u64,
                    "Failed to open database"
                );
                Err(e)
            }
        }
    }

    fn bootstrap(&self) -> StoreResult<(Connection, MigrationReport)> {
        let mut db = if self.config.in_memory {
            Connection::open_in_memory()
                .map_err(|e| StoreError::Connection(format!("failed to open in-memory database: {}", e)))?
        } else {
            fs::create_dir_all(&self.config.data_dir).map_err(|e| {
                StoreError::Connection(format!(
                    "failed to create store directory {}: {}",
                    self.config.data_dir.display(),
                    e
                ))
            })?;
            let db_path = self.config.db_path();
            let db = Connection::open(&db_path)
                .map_err(|e| StoreError::Connection(format!("failed to open {}: {}", db_path.display(), e)))?;
            db.execute_batch("PRAGMA journal_mode = WAL;")
                .map_err(|e| StoreError::Connection(format!("failed to enable WAL: {}", e)))?;
            db
        };

        db.execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(|e| StoreError::Connection(format!("failed to enable foreign keys: {}", e)))?;
        db.busy_timeout(Duration::from_millis(self.config.busy_timeout_ms))
            .map_err(|e| StoreError::Connection(format!("failed to set busy timeout: {}", e)))?;

        schema::create_base_tables(&db)?;
        let target = self.config.schema_version.unwrap_or_else(schema::latest_version);
        let report = schema::migrate(&mut db, target)?;

        Ok((db, report))
    }

    // ========================================================================
    // Schema introspection
    // ========================================================================

    /// Schema version recorded in the database
    pub fn schema_version(&self) -> StoreResult<u32> {
        let db = self.connection()?;
        schema::stored_version(&db)
    }

    /// Declared collection names
    pub fn collections(&self) -> StoreResult<Vec<String>> {
        let db = self.connection()?;
        schema::collections(&db)
    }

    /// Indexed fields declared for a collection
    pub fn indexes(&self, collection: &str) -> StoreResult<Vec<String>> {
        let db = self.connection()?;
        Self::require_collection(&db, collection)?;
        schema::indexes(&db, collection)
    }

    // ========================================================================
    // Generic CRUD API
    // ========================================================================

    /// Create a new record, assigning an id and timestamps when absent
    ///
    /// Returns the record exactly as stored.
    pub fn create<T: Record>(&self, mut record: T) -> StoreResult<T> {
        let collection = T::collection_name();

        if record.id().trim().is_empty() {
            let id = T::fixed_id().map(str::to_string).unwrap_or_else(|| uuid::Uuid::now_v7().to_string());
            record.set_id(id);
        }
        Self::validate_id(record.id())?;
        Self::require_fixed_id::<T>(record.id())?;

        let created_at = record.created_at().map(timestamp::truncate).unwrap_or_else(timestamp::now);
        let updated_at = record
            .updated_at()
            .map(timestamp::truncate)
            .filter(|t| *t >= created_at)
            .unwrap_or(created_at);
        record.set_timestamps(created_at, updated_at);

        let mut db = self.connection()?;
        Self::require_collection(&db, collection)?;

        let tx = db.transaction()?;
        Self::insert_tx(&tx, collection, &record)?;
        tx.commit()?;

        debug!(collection, id = record.id(), "Created record");
        Ok(record)
    }

    /// Get a record by ID; `None` when absent
    pub fn get<T: Record>(&self, id: &str) -> StoreResult<Option<T>> {
        let collection = T::collection_name();
        let db = self.connection()?;
        Self::require_collection(&db, collection)?;

        match Self::load_value(&db, collection, id)? {
            Some(data) => {
                let record: T = serde_json::from_value(data)?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    /// All records of a collection, most recently updated first
    pub fn get_all<T: Record>(&self) -> StoreResult<Vec<T>> {
        self.list(&[])
    }

    /// List records matching every filter, most recently updated first
    pub fn list<T: Record>(&self, filters: &[Filter]) -> StoreResult<Vec<T>> {
        let collection = T::collection_name();
        let db = self.connection()?;
        Self::require_collection(&db, collection)?;
        Self::require_indexes(&db, collection, filters)?;

        let (query, params) = Self::build_query("r.data_json", collection, filters);
        let query = format!("{} ORDER BY r.updated_at DESC, r.id", query);
        let params_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let mut stmt = db.prepare(&query)?;
        let rows = stmt.query_map(params_refs.as_slice(), |row| row.get::<_, String>(0))?;

        let mut results = Vec::new();
        for row_result in rows {
            let data_json = row_result?;
            let record: T = serde_json::from_str(&data_json)?;
            results.push(record);
        }

        debug!(collection, filters = filters.len(), count = results.len(), "Listed records");
        Ok(results)
    }

    /// Count records matching every filter
    pub fn count<T: Record>(&self, filters: &[Filter]) -> StoreResult<usize> {
        let collection = T::collection_name();
        let db = self.connection()?;
        Self::require_collection(&db, collection)?;
        Self::require_indexes(&db, collection, filters)?;

        let (query, params) = Self::build_query("COUNT(*)", collection, filters);
        let params_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();
        let count: i64 = db.query_row(&query, params_refs.as_slice(), |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Replace a stored record with a full new version
    ///
    /// `createdAt` is kept from the stored record and `updatedAt` is refreshed.
    pub fn update<T: Record>(&self, mut record: T) -> StoreResult<T> {
        let collection = T::collection_name();
        Self::validate_id(record.id())?;
        Self::require_fixed_id::<T>(record.id())?;

        let mut db = self.connection()?;
        Self::require_collection(&db, collection)?;

        let tx = db.transaction()?;
        let stored: T = match Self::load_value(&tx, collection, record.id())? {
            Some(data) => serde_json::from_value(data)?,
            None => return Err(StoreError::not_found(collection, record.id())),
        };

        Self::stamp_update(&mut record, &stored);
        Self::replace_tx(&tx, collection, &record)?;
        tx.commit()?;

        debug!(collection, id = record.id(), "Updated record");
        Ok(record)
    }

    /// Merge a partial update onto the stored record
    pub fn patch<T: Record>(&self, id: &str, patch: &Patch) -> StoreResult<T> {
        let collection = T::collection_name();
        Self::validate_id(id)?;
        Self::require_fixed_id::<T>(id)?;

        let mut db = self.connection()?;
        Self::require_collection(&db, collection)?;

        let tx = db.transaction()?;
        let mut data = Self::load_value(&tx, collection, id)?.ok_or_else(|| StoreError::not_found(collection, id))?;
        let stored: T = serde_json::from_value(data.clone())?;

        patch.apply_to(&mut data)?;
        let mut record: T = serde_json::from_value(data)
            .map_err(|e| StoreError::InvalidRecord(format!("patch for {} {} does not fit the record: {}", collection, id, e)))?;

        Self::stamp_update(&mut record, &stored);
        Self::replace_tx(&tx, collection, &record)?;
        tx.commit()?;

        debug!(collection, id, fields = ?patch.fields().collect::<Vec<_>>(), "Patched record");
        Ok(record)
    }

    /// Delete a record; deleting a missing id is not an error
    pub fn delete<T: Record>(&self, id: &str) -> StoreResult<()> {
        let collection = T::collection_name();
        let db = self.connection()?;
        Self::require_collection(&db, collection)?;

        // Index rows go with the record (ON DELETE CASCADE)
        let deleted = db.execute(
            "DELETE FROM records WHERE collection = ?1 AND id = ?2",
            rusqlite::params![collection, id],
        )?;

        debug!(collection, id, deleted, "Deleted record");
        Ok(())
    }

    /// Delete all records matching an indexed field filter.
    /// Returns the number of records deleted.
    pub fn delete_where<T: Record>(&self, filter: &Filter) -> StoreResult<usize> {
        let collection = T::collection_name();
        let mut db = self.connection()?;
        Self::require_collection(&db, collection)?;
        Self::require_indexes(&db, collection, std::slice::from_ref(filter))?;

        let tx = db.transaction()?;
        let ids: Vec<String> = {
            let (query, params) = Self::build_query("r.id", collection, std::slice::from_ref(filter));
            let params_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();
            let mut stmt = tx.prepare(&query)?;
            let rows = stmt.query_map(params_refs.as_slice(), |row| row.get::<_, String>(0))?;
            rows.collect::<Result<_, _>>()?
        };

        for id in &ids {
            tx.execute(
                "DELETE FROM records WHERE collection = ?1 AND id = ?2",
                rusqlite::params![collection, id],
            )?;
        }
        tx.commit()?;

        debug!(collection, %filter, count = ids.len(), "Deleted matching records");
        Ok(ids.len())
    }

    // ========================================================================
    // Profile
    // ========================================================================

    /// The stored user profile, if one has been saved
    pub fn get_profile(&self) -> StoreResult<Option<UserProfile>> {
        self.get(PROFILE_ID)
    }

    /// Insert or replace the singleton profile
    pub fn save_profile(&self, mut profile: UserProfile) -> StoreResult<UserProfile> {
        let collection = UserProfile::collection_name();
        profile.id = PROFILE_ID.to_string();

        let mut db = self.connection()?;
        Self::require_collection(&db, collection)?;

        let tx = db.transaction()?;
        match Self::load_value(&tx, collection, PROFILE_ID)? {
            Some(data) => {
                let stored: UserProfile = serde_json::from_value(data)?;
                Self::stamp_update(&mut profile, &stored);
                Self::replace_tx(&tx, collection, &profile)?;
            }
            None => {
                let now = timestamp::now();
                profile.set_timestamps(now, now);
                Self::insert_tx(&tx, collection, &profile)?;
            }
        }
        tx.commit()?;

        debug!(collection, "Saved profile");
        Ok(profile)
    }

    // ========================================================================
    // Helper methods
    // ========================================================================

    fn stamp_update<T: Record>(record: &mut T, stored: &T) {
        let updated_at = timestamp::next_after(stored.updated_at());
        let created_at = stored.created_at().unwrap_or(updated_at);
        record.set_timestamps(created_at, updated_at);
    }

    fn load_value(db: &Connection, collection: &str, id: &str) -> StoreResult<Option<Value>> {
        let data_json: Option<String> = db
            .query_row(
                "SELECT data_json FROM records WHERE collection = ?1 AND id = ?2",
                rusqlite::params![collection, id],
                |row| row.get(0),
            )
            .optional()?;

        match data_json {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn insert_tx<T: Record>(tx: &Connection, collection: &'static str, record: &T) -> StoreResult<()> {
        let exists: Option<i64> = tx
            .query_row(
                "SELECT 1 FROM records WHERE collection = ?1 AND id = ?2",
                rusqlite::params![collection, record.id()],
                |row| row.get(0),
            )
            .optional()?;
        if exists.is_some() {
            return Err(StoreError::conflict(collection, record.id()));
        }

        let (data, created_at, updated_at) = Self::encode(record)?;
        tx.execute(
            "INSERT INTO records (collection, id, data_json, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![collection, record.id(), serde_json::to_string(&data)?, created_at, updated_at],
        )?;

        Self::update_indexes_tx(tx, collection, record.id(), &data)
    }

    fn replace_tx<T: Record>(tx: &Connection, collection: &'static str, record: &T) -> StoreResult<()> {
        let (data, _, updated_at) = Self::encode(record)?;
        let changed = tx.execute(
            "UPDATE records SET data_json = ?3, updated_at = ?4 WHERE collection = ?1 AND id = ?2",
            rusqlite::params![collection, record.id(), serde_json::to_string(&data)?, updated_at],
        )?;
        if changed == 0 {
            return Err(StoreError::not_found(collection, record.id()));
        }

        Self::update_indexes_tx(tx, collection, record.id(), &data)
    }

    fn encode<T: Record>(record: &T) -> StoreResult<(Value, String, String)> {
        let data = serde_json::to_value(record)?;
        if !data.is_object() {
            return Err(StoreError::InvalidRecord(format!(
                "{} record {} does not serialize to an object",
                T::collection_name(),
                record.id()
            )));
        }
        let created_at = record.created_at().map(|t| timestamp::format(&t)).unwrap_or_default();
        let updated_at = record.updated_at().map(|t| timestamp::format(&t)).unwrap_or_default();
        Ok((data, created_at, updated_at))
    }

    fn update_indexes_tx(tx: &Connection, collection: &str, id: &str, data: &Value) -> StoreResult<()> {
        let fields = schema::indexes(tx, collection)?;
        debug!(collection, id, field_count = fields.len(), "update_indexes_tx: called");

        // Delete old indexes
        tx.execute(
            "DELETE FROM record_indexes WHERE collection = ?1 AND id = ?2",
            rusqlite::params![collection, id],
        )?;

        // Insert new indexes; absent and null fields are not indexed
        for field in &fields {
            if let Some(value) = data.get(field).and_then(IndexValue::from_json) {
                schema::write_index_row(tx, collection, id, field, &value)?;
            }
        }

        Ok(())
    }

    /// Build `SELECT <select> FROM records r WHERE ...` with one (NOT) EXISTS clause per filter
    fn build_query(select: &str, collection: &str, filters: &[Filter]) -> (String, Vec<Box<dyn rusqlite::ToSql>>) {
        let mut query = format!(
            "SELECT {}
             FROM records r
             WHERE r.collection = ?1",
            select
        );

        for (i, filter) in filters.iter().enumerate() {
            let join_alias = format!("idx{}", i);
            let column = match &filter.value {
                IndexValue::String(_) => "field_value_str",
                IndexValue::Int(_) => "field_value_int",
                IndexValue::Bool(_) => "field_value_bool",
            };
            // Records with the field absent or null have no index row, so they
            // count as "not equal"
            let (exists, op) = match filter.op {
                FilterOp::Ne => ("NOT EXISTS", FilterOp::Eq.to_sql()),
                other => ("EXISTS", other.to_sql()),
            };
            query.push_str(&format!(
                " AND {exists} (
                    SELECT 1 FROM record_indexes {alias}
                    WHERE {alias}.collection = r.collection
                      AND {alias}.id = r.id
                      AND {alias}.field_name = ?{field_param}
                      AND {alias}.{column} {op} ?{value_param})",
                exists = exists,
                alias = join_alias,
                field_param = i + 2,
                column = column,
                op = op,
                value_param = i + 2 + filters.len()
            ));
        }

        // Bind parameters: collection, then field names, then values
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();
        params.push(Box::new(collection.to_string()));

        for filter in filters {
            params.push(Box::new(filter.field.clone()));
        }

        for filter in filters {
            match &filter.value {
                IndexValue::String(s) => params.push(Box::new(s.clone())),
                IndexValue::Int(i) => params.push(Box::new(*i)),
                IndexValue::Bool(b) => params.push(Box::new(*b as i64)),
            }
        }

        (query, params)
    }

    fn require_collection(db: &Connection, collection: &str) -> StoreResult<()> {
        if schema::collection_exists(db, collection)? {
            Ok(())
        } else {
            Err(StoreError::Schema(format!(
                "collection {} does not exist at schema version {}",
                collection,
                schema::stored_version(db)?
            )))
        }
    }

    fn require_indexes(db: &Connection, collection: &str, filters: &[Filter]) -> StoreResult<()> {
        for filter in filters {
            if !schema::index_exists(db, collection, &filter.field)? {
                return Err(StoreError::Schema(format!(
                    "no index on {}.{}",
                    collection, filter.field
                )));
            }
        }
        Ok(())
    }

    /// Singleton collections accept only their fixed key
    fn require_fixed_id<T: Record>(id: &str) -> StoreResult<()> {
        match T::fixed_id() {
            Some(fixed) if fixed != id => Err(StoreError::InvalidRecord(format!(
                "{} holds a single record with id {}, got {}",
                T::collection_name(),
                fixed,
                id
            ))),
            _ => Ok(()),
        }
    }

    /// Validate record ID
    fn validate_id(id: &str) -> StoreResult<()> {
        // Check not empty or whitespace-only
        if id.trim().is_empty() {
            return Err(StoreError::InvalidRecord(
                "record ID cannot be empty or whitespace-only".to_string(),
            ));
        }

        if id.len() > 256 {
            return Err(StoreError::InvalidRecord(format!(
                "record ID too long: {} chars (max 256)",
                id.len()
            )));
        }

        Ok(())
    }
}
