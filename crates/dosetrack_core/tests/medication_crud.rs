use chrono::{Duration, NaiveDate, NaiveDateTime};
use dosetrack_core::db::migrations::latest_version;
use dosetrack_core::db::open_db_in_memory;
use dosetrack_core::{
    DoseTime, Medication, MedicationCategory, MedicationListQuery, MedicationRepository,
    RepoError, SqliteMedicationRepository,
};
use rusqlite::Connection;
use uuid::Uuid;

fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, day)
        .unwrap()
        .and_hms_opt(hour, minute, 0)
        .unwrap()
}

fn medication(user_id: Uuid, name: &str, created_at: NaiveDateTime) -> Medication {
    Medication::new(
        user_id,
        name,
        DoseTime::new(8, 0).unwrap(),
        8.0,
        created_at,
    )
}

#[test]
fn create_and_get_roundtrip_preserves_all_fields() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteMedicationRepository::try_new(&conn).unwrap();

    let mut med = medication(Uuid::new_v4(), "Amoxicillin", at(1, 9, 30));
    med.category = MedicationCategory::Ongoing;
    med.notes = "after breakfast".to_string();
    med.last_taken_at = Some(at(1, 10, 0));
    med.last_notified_at = Some(at(1, 10, 5));
    let id = repo.create_medication(&med).unwrap();

    let loaded = repo.get_medication(id, false).unwrap().unwrap();
    assert_eq!(loaded, med);
}

#[test]
fn update_existing_medication() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteMedicationRepository::try_new(&conn).unwrap();

    let mut med = medication(Uuid::new_v4(), "Ibuprofen", at(1, 9, 0));
    repo.create_medication(&med).unwrap();

    med.name = "Ibuprofen 400mg".to_string();
    med.dosage_time = DoseTime::new(20, 30).unwrap();
    med.periodicity_hours = 12.0;
    med.category = MedicationCategory::Ongoing;
    repo.update_medication(&med).unwrap();

    let loaded = repo.get_medication(med.uuid, false).unwrap().unwrap();
    assert_eq!(loaded.name, "Ibuprofen 400mg");
    assert_eq!(loaded.dosage_time, DoseTime::new(20, 30).unwrap());
    assert_eq!(loaded.periodicity_hours, 12.0);
    assert_eq!(loaded.category, MedicationCategory::Ongoing);
}

#[test]
fn update_not_found_returns_not_found() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteMedicationRepository::try_new(&conn).unwrap();

    let med = medication(Uuid::new_v4(), "Missing", at(1, 9, 0));
    let err = repo.update_medication(&med).unwrap_err();
    assert!(matches!(err, RepoError::NotFound(id) if id == med.uuid));
}

#[test]
fn mark_taken_and_record_notified_persist_timestamps() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteMedicationRepository::try_new(&conn).unwrap();

    let med = medication(Uuid::new_v4(), "Amoxicillin", at(1, 9, 0));
    repo.create_medication(&med).unwrap();

    let taken_at = at(1, 10, 0);
    let notified_at = at(1, 10, 30) + Duration::seconds(42);
    repo.mark_taken(med.uuid, taken_at).unwrap();
    repo.record_notified(med.uuid, notified_at).unwrap();

    let loaded = repo.get_medication(med.uuid, false).unwrap().unwrap();
    assert_eq!(loaded.last_taken_at, Some(taken_at));
    assert_eq!(loaded.last_notified_at, Some(notified_at));
}

#[test]
fn timestamp_updates_reject_missing_or_deleted_rows() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteMedicationRepository::try_new(&conn).unwrap();

    let missing = Uuid::new_v4();
    assert!(matches!(
        repo.mark_taken(missing, at(1, 10, 0)),
        Err(RepoError::NotFound(id)) if id == missing
    ));

    let med = medication(Uuid::new_v4(), "Amoxicillin", at(1, 9, 0));
    repo.create_medication(&med).unwrap();
    repo.soft_delete_medication(med.uuid).unwrap();
    assert!(matches!(
        repo.record_notified(med.uuid, at(1, 10, 0)),
        Err(RepoError::NotFound(id)) if id == med.uuid
    ));
}

#[test]
fn list_excludes_deleted_by_default_and_can_include_them() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteMedicationRepository::try_new(&conn).unwrap();

    let med_a = medication(Uuid::new_v4(), "Active", at(1, 9, 0));
    let med_b = medication(Uuid::new_v4(), "Deleted later", at(1, 9, 1));
    repo.create_medication(&med_a).unwrap();
    repo.create_medication(&med_b).unwrap();
    repo.soft_delete_medication(med_b.uuid).unwrap();

    let visible = repo.list_medications(&MedicationListQuery::default()).unwrap();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].uuid, med_a.uuid);

    let include_deleted = MedicationListQuery {
        include_deleted: true,
        ..MedicationListQuery::default()
    };
    let all = repo.list_medications(&include_deleted).unwrap();
    assert_eq!(all.len(), 2);
}

#[test]
fn soft_delete_is_idempotent() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteMedicationRepository::try_new(&conn).unwrap();

    let med = medication(Uuid::new_v4(), "Vitamin D", at(1, 9, 0));
    repo.create_medication(&med).unwrap();

    repo.soft_delete_medication(med.uuid).unwrap();
    repo.soft_delete_medication(med.uuid).unwrap();

    assert!(repo.get_medication(med.uuid, false).unwrap().is_none());
    let deleted = repo.get_medication(med.uuid, true).unwrap().unwrap();
    assert!(deleted.is_deleted);
}

#[test]
fn list_filters_by_user_and_name_substring() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteMedicationRepository::try_new(&conn).unwrap();

    let user = Uuid::new_v4();
    repo.create_medication(&medication(user, "Vitamin D", at(1, 9, 0)))
        .unwrap();
    repo.create_medication(&medication(user, "Amoxicillin", at(1, 9, 1)))
        .unwrap();
    repo.create_medication(&medication(Uuid::new_v4(), "Vitamin C", at(1, 9, 2)))
        .unwrap();

    let by_user = repo
        .list_medications(&MedicationListQuery {
            user_id: Some(user),
            ..MedicationListQuery::default()
        })
        .unwrap();
    assert_eq!(by_user.len(), 2);

    // Case-insensitive substring, scoped to the owner.
    let by_name = repo
        .list_medications(&MedicationListQuery {
            user_id: Some(user),
            name_contains: Some("vitamin".to_string()),
            ..MedicationListQuery::default()
        })
        .unwrap();
    assert_eq!(by_name.len(), 1);
    assert_eq!(by_name[0].name, "Vitamin D");
}

#[test]
fn name_filter_treats_like_wildcards_literally() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteMedicationRepository::try_new(&conn).unwrap();

    repo.create_medication(&medication(Uuid::new_v4(), "Solution 5%", at(1, 9, 0)))
        .unwrap();
    repo.create_medication(&medication(Uuid::new_v4(), "Solution 50ml", at(1, 9, 1)))
        .unwrap();

    let matches = repo
        .list_medications(&MedicationListQuery {
            name_contains: Some("5%".to_string()),
            ..MedicationListQuery::default()
        })
        .unwrap();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].name, "Solution 5%");
}

#[test]
fn list_pagination_is_stable_over_creation_order() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteMedicationRepository::try_new(&conn).unwrap();

    let user = Uuid::new_v4();
    let med_a = medication(user, "a", at(1, 9, 0));
    let med_b = medication(user, "b", at(1, 9, 1));
    let med_c = medication(user, "c", at(1, 9, 2));
    repo.create_medication(&med_c).unwrap();
    repo.create_medication(&med_a).unwrap();
    repo.create_medication(&med_b).unwrap();

    let page = repo
        .list_medications(&MedicationListQuery {
            limit: Some(2),
            offset: 1,
            ..MedicationListQuery::default()
        })
        .unwrap();
    assert_eq!(page.len(), 2);
    assert_eq!(page[0].uuid, med_b.uuid);
    assert_eq!(page[1].uuid, med_c.uuid);

    let offset_only = repo
        .list_medications(&MedicationListQuery {
            offset: 1,
            ..MedicationListQuery::default()
        })
        .unwrap();
    assert_eq!(offset_only.len(), 2);
    assert_eq!(offset_only[0].uuid, med_b.uuid);
}

#[test]
fn validation_failure_blocks_create_and_update() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteMedicationRepository::try_new(&conn).unwrap();

    let mut invalid = medication(Uuid::new_v4(), "Bad interval", at(1, 9, 0));
    invalid.periodicity_hours = 0.0;

    let create_err = repo.create_medication(&invalid).unwrap_err();
    assert!(matches!(create_err, RepoError::Validation(_)));

    let mut valid = medication(Uuid::new_v4(), "Good interval", at(1, 9, 0));
    repo.create_medication(&valid).unwrap();

    valid.periodicity_hours = -1.0;
    let update_err = repo.update_medication(&valid).unwrap_err();
    assert!(matches!(update_err, RepoError::Validation(_)));
}

#[test]
fn read_paths_reject_invalid_persisted_rows() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteMedicationRepository::try_new(&conn).unwrap();

    let med = medication(Uuid::new_v4(), "Tampered", at(1, 9, 0));
    repo.create_medication(&med).unwrap();

    conn.execute(
        "UPDATE medications SET periodicity_hours = 0.0 WHERE uuid = ?1;",
        [med.uuid.to_string()],
    )
    .unwrap();
    let err = repo.get_medication(med.uuid, false).unwrap_err();
    assert!(matches!(err, RepoError::Validation(_)));

    conn.execute(
        "UPDATE medications SET periodicity_hours = 8.0, category = 'forever' WHERE uuid = ?1;",
        [med.uuid.to_string()],
    )
    .unwrap();
    let err = repo.get_medication(med.uuid, false).unwrap_err();
    assert!(matches!(err, RepoError::InvalidData(_)));
}

#[test]
fn repository_rejects_uninitialized_connection() {
    let conn = Connection::open_in_memory().unwrap();

    let result = SqliteMedicationRepository::try_new(&conn);
    match result {
        Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version: 0,
        }) => assert!(expected_version > 0),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("expected uninitialized connection error"),
    }
}

#[test]
fn repository_rejects_connection_without_required_table() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(&format!("PRAGMA user_version = {};", latest_version()))
        .unwrap();

    let result = SqliteMedicationRepository::try_new(&conn);
    assert!(matches!(
        result,
        Err(RepoError::MissingRequiredTable("medications"))
    ));
}

#[test]
fn repository_rejects_connection_missing_required_column() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(
        "CREATE TABLE medications (
            uuid TEXT PRIMARY KEY NOT NULL,
            user_id TEXT NOT NULL,
            name TEXT NOT NULL,
            is_deleted INTEGER NOT NULL DEFAULT 0
        );",
    )
    .unwrap();
    conn.execute_batch(&format!("PRAGMA user_version = {};", latest_version()))
        .unwrap();

    let result = SqliteMedicationRepository::try_new(&conn);
    assert!(matches!(
        result,
        Err(RepoError::MissingRequiredColumn {
            table: "medications",
            column: "dosage_time"
        })
    ));
}
