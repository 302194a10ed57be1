use clap::{Parser, Subcommand};
use records_core::config::database_path_from_env_value;
use records_core::repositories::PatientRepository;
use records_core::validation::{format_iso, parse_record_date};
use records_core::{
    CoreConfig, Database, DecryptionStatus, ExternalOrigin, HealthRecord, HealthRecordService,
    NewHealthRecord, NonEmptyText, PatientId, RecordData, RecordFilter, RecordId, RecordOrigin,
    RecordType,
};

#[derive(Parser)]
#[command(name = "records")]
#[command(about = "Hospital health records CLI")]
struct Cli {
    /// SQLite database file
    #[arg(long, global = true, env = "RECORDS_DATABASE_PATH")]
    database: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database tables if missing
    InitDb,
    /// Register a patient
    RegisterPatient {
        /// Patient name
        name: String,
        #[arg(long)]
        mobile: Option<String>,
        /// ABHA health id
        #[arg(long)]
        abha_id: Option<String>,
    },
    /// List patients that have records
    List,
    /// List a patient's records
    Records {
        patient_id: String,
        #[arg(long)]
        record_type: Option<String>,
        #[arg(long)]
        source_hospital: Option<String>,
    },
    /// Show a patient's record summary
    Summary { patient_id: String },
    /// Store a record as if received from another hospital
    Receive {
        patient_id: String,
        /// Record type, e.g. PRESCRIPTION
        record_type: String,
        /// Sending hospital identifier
        #[arg(long)]
        source_hospital: String,
        /// Record date (ISO 8601)
        #[arg(long)]
        date: String,
        /// JSON object payload
        #[arg(long, default_value = "{}")]
        data: String,
        #[arg(long)]
        data_text: Option<String>,
        #[arg(long)]
        request_id: Option<String>,
        /// Mark the record as received encrypted and decrypted
        #[arg(long)]
        encrypted: bool,
    },
    /// Permanently delete a record
    Delete {
        patient_id: String,
        record_id: String,
    },
}

fn print_record(record: &HealthRecord) {
    println!(
        "ID: {}, Type: {}, Date: {}, Source: {}, Title: {}",
        record.id,
        record.record_type,
        format_iso(&record.record_date),
        record.source_hospital.as_deref().unwrap_or("local"),
        record.title()
    );
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let cfg = CoreConfig::new(database_path_from_env_value(cli.database))?;
    let db = Database::new(&cfg);

    let Some(command) = cli.command else {
        println!("Use 'records --help' for commands");
        return Ok(());
    };

    if matches!(command, Commands::InitDb) {
        db.initialise_schema()?;
        println!("Initialised database at {}", db.path().display());
        return Ok(());
    }

    let conn = db.connect()?;
    let service = HealthRecordService::new(&conn);

    match command {
        Commands::InitDb => {}
        Commands::RegisterPatient {
            name,
            mobile,
            abha_id,
        } => {
            let patient = PatientRepository::new(&conn).register(
                NonEmptyText::new(&name)?,
                mobile,
                abha_id,
            )?;
            println!("Registered patient with UUID: {}", patient.id);
        }
        Commands::List => {
            let patients = service.patients_with_records()?;
            if patients.is_empty() {
                println!("No patients with records found.");
            }
            for entry in patients {
                println!(
                    "ID: {}, Name: {}, Records: {}",
                    entry.patient.id, entry.patient.name, entry.record_count
                );
            }
        }
        Commands::Records {
            patient_id,
            record_type,
            source_hospital,
        } => {
            let patient_id = PatientId::parse(&patient_id)?;
            service.require_patient(&patient_id)?;
            let filter =
                RecordFilter::from_query(record_type.as_deref(), source_hospital.as_deref());
            let records = service.records_for_patient(&patient_id, &filter)?;
            if records.is_empty() {
                println!("No records found.");
            }
            records.iter().for_each(print_record);
        }
        Commands::Summary { patient_id } => {
            let patient_id = PatientId::parse(&patient_id)?;
            service.require_patient(&patient_id)?;
            let summary = service.summary(&patient_id)?;
            println!("Total records: {}", summary.total_records);
            for (record_type, count) in &summary.by_type {
                println!("  type {}: {}", record_type, count);
            }
            for (source, count) in &summary.by_source {
                println!("  source {}: {}", source, count);
            }
            match summary.last_updated {
                Some(stamp) => println!("Last updated: {}", format_iso(&stamp.naive_utc())),
                None => println!("Last updated: never"),
            }
        }
        Commands::Receive {
            patient_id,
            record_type,
            source_hospital,
            date,
            data,
            data_text,
            request_id,
            encrypted,
        } => {
            let patient_id = PatientId::parse(&patient_id)?;
            let data: RecordData = serde_json::from_str(&data)?;
            let record = service.store_received_record(
                &patient_id,
                NewHealthRecord {
                    record_type: RecordType::new(&record_type)?,
                    record_date: parse_record_date(&date)?,
                    data,
                    data_text,
                    origin: RecordOrigin::External(ExternalOrigin {
                        source_hospital: NonEmptyText::new(&source_hospital)?,
                        request_id,
                        was_encrypted: encrypted,
                        decryption_status: if encrypted {
                            DecryptionStatus::Decrypted
                        } else {
                            DecryptionStatus::None
                        },
                        delivery_attempt: 1,
                    }),
                },
            )?;
            println!("Stored received record with UUID: {}", record.id);
        }
        Commands::Delete {
            patient_id,
            record_id,
        } => {
            let patient_id = PatientId::parse(&patient_id)?;
            let record_id = RecordId::parse(&record_id)?;
            service.delete_record(&patient_id, &record_id)?;
            println!("Deleted record {}", record_id);
        }
    }

    Ok(())
}
