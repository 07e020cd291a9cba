//! Medication store contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide stable CRUD plus taken/notified timestamp APIs over the
//!   canonical `medications` table.
//! - Keep SQL details inside the core persistence boundary.
//!
//! # Invariants
//! - Write paths must call `Medication::validate()` before SQL mutations.
//! - Read paths must reject invalid persisted state instead of masking it.
//! - Constructors refuse connections that are not migrated to the schema
//!   this binary expects.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::medication::{
    Medication, MedicationCategory, MedicationId, MedicationValidationError,
};
use chrono::NaiveDateTime;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const MEDICATION_SELECT_SQL: &str = "SELECT
    uuid,
    user_id,
    name,
    dosage_time,
    periodicity_hours,
    category,
    notes,
    last_taken_at,
    last_notified_at,
    created_at,
    is_deleted
FROM medications";

const REQUIRED_COLUMNS: &[&str] = &[
    "uuid",
    "user_id",
    "name",
    "dosage_time",
    "periodicity_hours",
    "category",
    "notes",
    "last_taken_at",
    "last_notified_at",
    "created_at",
    "updated_at",
    "is_deleted",
];

pub type RepoResult<T> = Result<T, RepoError>;

/// Generic store error for medication persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(MedicationValidationError),
    Db(DbError),
    NotFound(MedicationId),
    InvalidData(String),
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "medication not found: {id}"),
            Self::InvalidData(message) => {
                write!(f, "invalid persisted medication data: {message}")
            }
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "connection schema version {actual_version} does not match expected {expected_version}; run migrations first"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "required table is missing: {table}")
            }
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "required column is missing: {table}.{column}")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<MedicationValidationError> for RepoError {
    fn from(value: MedicationValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Query options for listing medications.
#[derive(Debug, Clone, Default)]
pub struct MedicationListQuery {
    /// Restrict to one owner profile.
    pub user_id: Option<Uuid>,
    /// Case-insensitive name substring filter (the dashboard search box).
    pub name_contains: Option<String>,
    pub include_deleted: bool,
    pub limit: Option<u32>,
    pub offset: u32,
}

/// Store interface for medication records.
///
/// This is the record-store seam: the hosted table backend and the local
/// SQLite/in-memory fallbacks all sit behind this trait.
pub trait MedicationRepository {
    fn create_medication(&self, medication: &Medication) -> RepoResult<MedicationId>;
    fn update_medication(&self, medication: &Medication) -> RepoResult<()>;
    fn get_medication(
        &self,
        id: MedicationId,
        include_deleted: bool,
    ) -> RepoResult<Option<Medication>>;
    fn list_medications(&self, query: &MedicationListQuery) -> RepoResult<Vec<Medication>>;
    /// Records a user-confirmed dose instant on an active medication.
    fn mark_taken(&self, id: MedicationId, at: NaiveDateTime) -> RepoResult<()>;
    /// Records the instant a due alert was raised for an active medication.
    fn record_notified(&self, id: MedicationId, at: NaiveDateTime) -> RepoResult<()>;
    fn soft_delete_medication(&self, id: MedicationId) -> RepoResult<()>;
}

// Shared references delegate, so several services can sit on one store.
impl<R: MedicationRepository + ?Sized> MedicationRepository for &R {
    fn create_medication(&self, medication: &Medication) -> RepoResult<MedicationId> {
        (**self).create_medication(medication)
    }

    fn update_medication(&self, medication: &Medication) -> RepoResult<()> {
        (**self).update_medication(medication)
    }

    fn get_medication(
        &self,
        id: MedicationId,
        include_deleted: bool,
    ) -> RepoResult<Option<Medication>> {
        (**self).get_medication(id, include_deleted)
    }

    fn list_medications(&self, query: &MedicationListQuery) -> RepoResult<Vec<Medication>> {
        (**self).list_medications(query)
    }

    fn mark_taken(&self, id: MedicationId, at: NaiveDateTime) -> RepoResult<()> {
        (**self).mark_taken(id, at)
    }

    fn record_notified(&self, id: MedicationId, at: NaiveDateTime) -> RepoResult<()> {
        (**self).record_notified(id, at)
    }

    fn soft_delete_medication(&self, id: MedicationId) -> RepoResult<()> {
        (**self).soft_delete_medication(id)
    }
}

/// SQLite-backed medication store.
pub struct SqliteMedicationRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteMedicationRepository<'conn> {
    /// Constructs a store from a migrated/ready connection.
    ///
    /// # Errors
    /// - `UninitializedConnection` when `PRAGMA user_version` does not match
    ///   this binary's latest migration.
    /// - `MissingRequiredTable` / `MissingRequiredColumn` when the schema
    ///   lacks what the queries below rely on.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl MedicationRepository for SqliteMedicationRepository<'_> {
    fn create_medication(&self, medication: &Medication) -> RepoResult<MedicationId> {
        medication.validate()?;

        self.conn.execute(
            "INSERT INTO medications (
                uuid,
                user_id,
                name,
                dosage_time,
                periodicity_hours,
                category,
                notes,
                last_taken_at,
                last_notified_at,
                created_at,
                is_deleted
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11);",
            params![
                medication.uuid.to_string(),
                medication.user_id.to_string(),
                medication.name.as_str(),
                medication.dosage_time.to_string(),
                medication.periodicity_hours,
                category_to_db(medication.category),
                medication.notes.as_str(),
                medication.last_taken_at,
                medication.last_notified_at,
                medication.created_at,
                bool_to_int(medication.is_deleted),
            ],
        )?;

        Ok(medication.uuid)
    }

    fn update_medication(&self, medication: &Medication) -> RepoResult<()> {
        medication.validate()?;

        let changed = self.conn.execute(
            "UPDATE medications
             SET
                user_id = ?1,
                name = ?2,
                dosage_time = ?3,
                periodicity_hours = ?4,
                category = ?5,
                notes = ?6,
                last_taken_at = ?7,
                last_notified_at = ?8,
                is_deleted = ?9,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?10;",
            params![
                medication.user_id.to_string(),
                medication.name.as_str(),
                medication.dosage_time.to_string(),
                medication.periodicity_hours,
                category_to_db(medication.category),
                medication.notes.as_str(),
                medication.last_taken_at,
                medication.last_notified_at,
                bool_to_int(medication.is_deleted),
                medication.uuid.to_string(),
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(medication.uuid));
        }

        Ok(())
    }

    fn get_medication(
        &self,
        id: MedicationId,
        include_deleted: bool,
    ) -> RepoResult<Option<Medication>> {
        let mut stmt = self.conn.prepare(&format!(
            "{MEDICATION_SELECT_SQL}
             WHERE uuid = ?1
               AND (?2 = 1 OR is_deleted = 0);"
        ))?;

        let mut rows = stmt.query(params![id.to_string(), bool_to_int(include_deleted)])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_medication_row(row)?));
        }

        Ok(None)
    }

    fn list_medications(&self, query: &MedicationListQuery) -> RepoResult<Vec<Medication>> {
        let mut sql = format!("{MEDICATION_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if !query.include_deleted {
            sql.push_str(" AND is_deleted = 0");
        }

        if let Some(user_id) = query.user_id {
            sql.push_str(" AND user_id = ?");
            bind_values.push(Value::Text(user_id.to_string()));
        }

        if let Some(needle) = query
            .name_contains
            .as_deref()
            .map(str::trim)
            .filter(|needle| !needle.is_empty())
        {
            sql.push_str(" AND name LIKE ? ESCAPE '\\'");
            bind_values.push(Value::Text(format!("%{}%", escape_like(needle))));
        }

        sql.push_str(" ORDER BY created_at ASC, uuid ASC");

        if let Some(limit) = query.limit {
            sql.push_str(" LIMIT ?");
            bind_values.push(Value::Integer(i64::from(limit)));
            if query.offset > 0 {
                sql.push_str(" OFFSET ?");
                bind_values.push(Value::Integer(i64::from(query.offset)));
            }
        } else if query.offset > 0 {
            sql.push_str(" LIMIT -1 OFFSET ?");
            bind_values.push(Value::Integer(i64::from(query.offset)));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut medications = Vec::new();

        while let Some(row) = rows.next()? {
            medications.push(parse_medication_row(row)?);
        }

        Ok(medications)
    }

    fn mark_taken(&self, id: MedicationId, at: NaiveDateTime) -> RepoResult<()> {
        self.set_timestamp_column("last_taken_at", id, at)
    }

    fn record_notified(&self, id: MedicationId, at: NaiveDateTime) -> RepoResult<()> {
        self.set_timestamp_column("last_notified_at", id, at)
    }

    fn soft_delete_medication(&self, id: MedicationId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE medications
             SET
                is_deleted = 1,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?1;",
            [id.to_string()],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }

        Ok(())
    }
}

impl SqliteMedicationRepository<'_> {
    fn set_timestamp_column(
        &self,
        column: &'static str,
        id: MedicationId,
        at: NaiveDateTime,
    ) -> RepoResult<()> {
        // Column name is one of two compile-time constants, never user input.
        let changed = self.conn.execute(
            &format!(
                "UPDATE medications
                 SET
                    {column} = ?2,
                    updated_at = (strftime('%s', 'now') * 1000)
                 WHERE uuid = ?1
                   AND is_deleted = 0;"
            ),
            params![id.to_string(), at],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }

        Ok(())
    }
}

fn ensure_connection_ready(conn: &Connection) -> RepoResult<()> {
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    let expected_version = latest_version();
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    let table_exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'medications'
        );",
        [],
        |row| row.get(0),
    )?;
    if table_exists == 0 {
        return Err(RepoError::MissingRequiredTable("medications"));
    }

    let mut stmt = conn.prepare("SELECT name FROM pragma_table_info('medications');")?;
    let mut rows = stmt.query([])?;
    let mut present = Vec::new();
    while let Some(row) = rows.next()? {
        present.push(row.get::<_, String>(0)?);
    }
    for column in REQUIRED_COLUMNS {
        if !present.iter().any(|name| name == column) {
            return Err(RepoError::MissingRequiredColumn {
                table: "medications",
                column,
            });
        }
    }

    Ok(())
}

fn parse_medication_row(row: &Row<'_>) -> RepoResult<Medication> {
    let uuid = parse_uuid_column(row, "uuid")?;
    let user_id = parse_uuid_column(row, "user_id")?;

    let dosage_time_text: String = row.get("dosage_time")?;
    let dosage_time = dosage_time_text.parse().map_err(|_| {
        RepoError::InvalidData(format!(
            "invalid dose time `{dosage_time_text}` in medications.dosage_time"
        ))
    })?;

    let category_text: String = row.get("category")?;
    let category = parse_category(&category_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid category `{category_text}` in medications.category"
        ))
    })?;

    let is_deleted = match row.get::<_, i64>("is_deleted")? {
        0 => false,
        1 => true,
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid is_deleted value `{other}` in medications.is_deleted"
            )));
        }
    };

    let medication = Medication {
        uuid,
        user_id,
        name: row.get("name")?,
        dosage_time,
        periodicity_hours: row.get("periodicity_hours")?,
        category,
        notes: row.get("notes")?,
        last_taken_at: row.get("last_taken_at")?,
        last_notified_at: row.get("last_notified_at")?,
        created_at: row.get("created_at")?,
        is_deleted,
    };
    medication.validate()?;
    Ok(medication)
}

fn parse_uuid_column(row: &Row<'_>, column: &'static str) -> RepoResult<Uuid> {
    let text: String = row.get(column)?;
    Uuid::parse_str(&text).map_err(|_| {
        RepoError::InvalidData(format!("invalid uuid value `{text}` in medications.{column}"))
    })
}

fn category_to_db(category: MedicationCategory) -> &'static str {
    match category {
        MedicationCategory::Ongoing => "ongoing",
        MedicationCategory::Temporary => "temporary",
    }
}

fn parse_category(value: &str) -> Option<MedicationCategory> {
    match value {
        "ongoing" => Some(MedicationCategory::Ongoing),
        "temporary" => Some(MedicationCategory::Temporary),
        _ => None,
    }
}

fn escape_like(needle: &str) -> String {
    needle
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}
