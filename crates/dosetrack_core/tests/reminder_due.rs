use chrono::{NaiveDate, NaiveDateTime};
use dosetrack_core::{
    CreateMedicationRequest, DoseTime, MedicationCategory, MedicationService,
    MemoryMedicationRepository, ReminderService,
};
use uuid::Uuid;

fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, day)
        .unwrap()
        .and_hms_opt(hour, minute, 0)
        .unwrap()
}

fn request(user_id: Uuid, name: &str, dose_hour: u8, periodicity_hours: f64) -> CreateMedicationRequest {
    CreateMedicationRequest {
        user_id,
        name: name.to_string(),
        dosage_time: DoseTime::new(dose_hour, 0).unwrap(),
        periodicity_hours,
        category: MedicationCategory::Temporary,
        notes: String::new(),
    }
}

struct Fixture<'store> {
    medications: MedicationService<&'store MemoryMedicationRepository>,
    reminders: ReminderService<&'store MemoryMedicationRepository>,
}

fn fixture(store: &MemoryMedicationRepository) -> Fixture<'_> {
    Fixture {
        medications: MedicationService::new(store),
        reminders: ReminderService::new(store),
    }
}

#[test]
fn first_poll_alerts_and_records_the_boundary() {
    let store = MemoryMedicationRepository::new();
    let fx = fixture(&store);
    let user = Uuid::new_v4();
    let med = fx
        .medications
        .create_medication(&request(user, "Amoxicillin", 8, 8.0), at(10, 8, 30))
        .unwrap();

    let now = at(10, 10, 0);
    let alerts = fx.reminders.poll_due(Some(user), now).unwrap();

    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].medication_id, med.uuid);
    assert_eq!(alerts[0].name, "Amoxicillin");
    assert_eq!(alerts[0].due_at, at(10, 8, 0));

    let reloaded = fx.medications.get_medication(med.uuid, false).unwrap().unwrap();
    assert_eq!(reloaded.last_notified_at, Some(now));
}

#[test]
fn repeated_polls_within_one_window_stay_silent() {
    let store = MemoryMedicationRepository::new();
    let fx = fixture(&store);
    let user = Uuid::new_v4();
    fx.medications
        .create_medication(&request(user, "Amoxicillin", 8, 8.0), at(10, 8, 30))
        .unwrap();

    assert_eq!(fx.reminders.poll_due(Some(user), at(10, 10, 0)).unwrap().len(), 1);
    // Idempotent for the rest of the window, whatever the cadence.
    assert!(fx.reminders.poll_due(Some(user), at(10, 10, 1)).unwrap().is_empty());
    assert!(fx.reminders.poll_due(Some(user), at(10, 15, 59)).unwrap().is_empty());
}

#[test]
fn crossing_the_boundary_alerts_again_with_the_new_window() {
    let store = MemoryMedicationRepository::new();
    let fx = fixture(&store);
    let user = Uuid::new_v4();
    fx.medications
        .create_medication(&request(user, "Amoxicillin", 8, 8.0), at(10, 8, 30))
        .unwrap();

    fx.reminders.poll_due(Some(user), at(10, 10, 0)).unwrap();
    let alerts = fx.reminders.poll_due(Some(user), at(10, 16, 1)).unwrap();

    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].due_at, at(10, 16, 0));
}

#[test]
fn polls_are_scoped_to_the_requested_user() {
    let store = MemoryMedicationRepository::new();
    let fx = fixture(&store);
    let user = Uuid::new_v4();
    let other = Uuid::new_v4();
    fx.medications
        .create_medication(&request(user, "Mine", 8, 8.0), at(10, 8, 30))
        .unwrap();
    let other_med = fx
        .medications
        .create_medication(&request(other, "Theirs", 8, 8.0), at(10, 8, 30))
        .unwrap();

    let alerts = fx.reminders.poll_due(Some(user), at(10, 10, 0)).unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].name, "Mine");

    // The other user's bookkeeping is untouched.
    let untouched = fx
        .medications
        .get_medication(other_med.uuid, false)
        .unwrap()
        .unwrap();
    assert!(untouched.last_notified_at.is_none());
}

#[test]
fn medications_alert_independently() {
    let store = MemoryMedicationRepository::new();
    let fx = fixture(&store);
    let user = Uuid::new_v4();
    fx.medications
        .create_medication(&request(user, "Morning", 8, 8.0), at(10, 8, 30))
        .unwrap();
    fx.medications
        .create_medication(&request(user, "Evening", 20, 24.0), at(10, 8, 30))
        .unwrap();

    // Both have an uncrossed-alert boundary on the first tick.
    let first = fx.reminders.poll_due(Some(user), at(10, 10, 0)).unwrap();
    assert_eq!(first.len(), 2);

    // Only the 8h medication rolls over at 16:00.
    let second = fx.reminders.poll_due(Some(user), at(10, 16, 5)).unwrap();
    assert_eq!(second.len(), 1);
    assert_eq!(second[0].name, "Morning");
}

#[test]
fn taking_a_dose_does_not_suppress_the_boundary_alert() {
    // Alerting is bookkeeping per boundary, not per taken state: confirming
    // a dose mid-window still leaves the next boundary to alert.
    let store = MemoryMedicationRepository::new();
    let fx = fixture(&store);
    let user = Uuid::new_v4();
    let med = fx
        .medications
        .create_medication(&request(user, "Amoxicillin", 8, 8.0), at(10, 8, 30))
        .unwrap();

    fx.reminders.poll_due(Some(user), at(10, 10, 0)).unwrap();
    fx.medications.mark_taken(med.uuid, at(10, 10, 30)).unwrap();

    let alerts = fx.reminders.poll_due(Some(user), at(10, 16, 1)).unwrap();
    assert_eq!(alerts.len(), 1);
}
