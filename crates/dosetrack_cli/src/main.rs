//! Command-line entry point.
//!
//! # Responsibility
//! - Wire configuration, logging, the demo session and a record store into
//!   the core services.
//! - Own the recurring poll timer (`watch`); the core never sleeps or reads
//!   the clock on its own.

use chrono::Local;
use dosetrack_core::config::ENV_DATA_DIR;
use dosetrack_core::db::open_db;
use dosetrack_core::{
    AppConfig, AuthProvider, CreateMedicationRequest, DemoAuthProvider, DoseTime,
    MedicationCategory, MedicationListQuery, MedicationRepository, MedicationService,
    MemoryMedicationRepository, ReminderService, SqliteMedicationRepository, StorageMode,
};
use std::error::Error;
use uuid::Uuid;

const DEMO_EMAIL: &str = "demo@dosetrack.local";

const USAGE: &str = "usage: dosetrack <command>

commands:
  list                              show the routine (default)
  add <name> <HH:MM> <hours> [notes...]
                                    register a medication
  take <id>                         confirm the current dose
  remove <id>                       delete a medication
  tick                              run one due-dose poll
  watch                             poll for due doses until interrupted
  version                           print the core version

environment:
  DOSETRACK_DATA_DIR                persistent store location (demo mode if unset)
  DOSETRACK_LOG_DIR / DOSETRACK_LOG_LEVEL
  DOSETRACK_TAKEN_RESET             strict_slot|midnight_reset
  DOSETRACK_POLL_INTERVAL_SECS      watch cadence";

fn main() {
    let config = AppConfig::from_env();

    if let Some(log_dir) = config.log_dir.as_deref().and_then(|dir| dir.to_str()) {
        if let Err(err) = dosetrack_core::init_logging(&config.log_level, log_dir) {
            eprintln!("warning: file logging disabled: {err}");
        }
    }

    let args: Vec<String> = std::env::args().skip(1).collect();
    if let Err(err) = run(&config, &args) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run(config: &AppConfig, args: &[String]) -> Result<(), Box<dyn Error>> {
    let command = args.first().map(String::as_str).unwrap_or("list");
    let rest = args.get(1..).unwrap_or(&[]);

    match command {
        "version" => {
            println!("dosetrack {}", dosetrack_core::core_version());
            Ok(())
        }
        "help" | "--help" | "-h" => {
            println!("{USAGE}");
            Ok(())
        }
        _ => match &config.storage {
            StorageMode::Persistent(dir) => {
                std::fs::create_dir_all(dir)?;
                let db_path = dir.join(dosetrack_core::config::DB_FILE_NAME);
                let conn = open_db(db_path)?;
                let store = SqliteMedicationRepository::try_new(&conn)?;
                dispatch(config, &store, command, rest)
            }
            StorageMode::Ephemeral => {
                eprintln!(
                    "demo mode: {ENV_DATA_DIR} is not set, records will not survive this run"
                );
                let store = MemoryMedicationRepository::new();
                dispatch(config, &store, command, rest)
            }
        },
    }
}

fn dispatch<R: MedicationRepository>(
    config: &AppConfig,
    store: &R,
    command: &str,
    rest: &[String],
) -> Result<(), Box<dyn Error>> {
    let auth = DemoAuthProvider::new();
    let profile = auth.sign_in(DEMO_EMAIL)?;
    let medications = MedicationService::new(store);
    let now = Local::now().naive_local();

    match command {
        "add" => {
            let name = rest.first().ok_or(USAGE)?;
            let dosage_time: DoseTime = rest.get(1).ok_or(USAGE)?.parse()?;
            let periodicity_hours: f64 = rest.get(2).ok_or(USAGE)?.parse()?;
            let notes = rest.get(3..).unwrap_or(&[]).join(" ");

            let request = CreateMedicationRequest {
                user_id: profile.id,
                name: name.clone(),
                dosage_time,
                periodicity_hours,
                category: MedicationCategory::Temporary,
                notes,
            };
            let medication = medications.create_medication(&request, now)?;
            println!("added {} ({})", medication.name, medication.uuid);
            Ok(())
        }
        "list" => {
            let query = MedicationListQuery {
                user_id: Some(profile.id),
                ..MedicationListQuery::default()
            };
            let view = medications.routine(&query, now, config.taken_rule)?;

            println!("pending ({}):", view.pending.len());
            for (medication, status) in &view.pending {
                println!(
                    "  [ ] {} - {} every {}h - next {} (in {}, {:.0}% left)",
                    medication.name,
                    medication.dosage_time,
                    medication.periodicity_hours,
                    status.next_dose_at.format("%a %H:%M"),
                    status.remaining_label,
                    status.remaining_percentage,
                );
            }
            if !view.taken.is_empty() {
                println!("taken ({}):", view.taken.len());
                for (medication, status) in &view.taken {
                    println!(
                        "  [x] {} - next {}",
                        medication.name,
                        status.next_dose_at.format("%a %H:%M"),
                    );
                }
            }
            Ok(())
        }
        "take" => {
            let id: Uuid = rest.first().ok_or(USAGE)?.parse()?;
            medications.mark_taken(id, now)?;
            println!("dose recorded for {id}");
            Ok(())
        }
        "remove" => {
            let id: Uuid = rest.first().ok_or(USAGE)?.parse()?;
            medications.soft_delete_medication(id)?;
            println!("removed {id}");
            Ok(())
        }
        "tick" => {
            print_alerts(&ReminderService::new(store), profile.id, now)?;
            Ok(())
        }
        "watch" => {
            let reminders = ReminderService::new(store);
            println!(
                "watching every {}s; press Ctrl-C to stop",
                config.poll_interval.as_secs()
            );
            loop {
                print_alerts(&reminders, profile.id, Local::now().naive_local())?;
                std::thread::sleep(config.poll_interval);
            }
        }
        other => Err(format!("unknown command `{other}`\n\n{USAGE}").into()),
    }
}

fn print_alerts<R: MedicationRepository>(
    reminders: &ReminderService<R>,
    user_id: Uuid,
    now: chrono::NaiveDateTime,
) -> Result<(), Box<dyn Error>> {
    for alert in reminders.poll_due(Some(user_id), now)? {
        println!(
            "[{}] time to take {} (dose at {})",
            now.format("%H:%M:%S"),
            alert.name,
            alert.dosage_time,
        );
    }
    Ok(())
}
