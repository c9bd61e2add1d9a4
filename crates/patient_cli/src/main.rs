//! Command-line front end for the patient store.
//!
//! # Responsibility
//! - Map each command onto one `PatientService` use case.
//! - Print results as JSON on stdout and failures as `{kind, message}` on
//!   stderr with a kind-specific exit code.

use clap::{Args, Parser, Subcommand};
use log::info;
use patient_core::{
    init_logging, ErrorKind, FilePatientService, PatientDraft, PatientUpdate, RepoError,
    StoreConfig, StoreError,
};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "patient")]
#[command(about = "Patient records kept in a single JSON file", long_about = None)]
#[command(version)]
struct Cli {
    /// Data file (overrides PATIENT_STORE_PATH)
    #[arg(long, global = true)]
    data: Option<PathBuf>,
    /// Log level (overrides PATIENT_LOG_LEVEL)
    #[arg(long, global = true)]
    log_level: Option<String>,
    /// Absolute log directory (overrides PATIENT_LOG_DIR)
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the welcome message
    Home,
    /// Create an empty data file if none exists
    Init,
    /// Print the whole collection
    View,
    /// Print one patient with bmi and verdict
    Show { id: String },
    /// Add a new patient
    Create(CreateArgs),
    /// Change some fields of an existing patient
    Update(UpdateArgs),
    /// Remove a patient
    Delete { id: String },
}

#[derive(Args)]
struct CreateArgs {
    #[arg(long)]
    id: String,
    #[arg(long)]
    name: String,
    #[arg(long)]
    city: String,
    #[arg(long, allow_negative_numbers = true)]
    age: i64,
    /// male, female or other
    #[arg(long)]
    gender: String,
    /// Meters
    #[arg(long, allow_negative_numbers = true)]
    height: f64,
    /// Kilograms
    #[arg(long, allow_negative_numbers = true)]
    weight: f64,
}

#[derive(Args)]
struct UpdateArgs {
    id: String,
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    city: Option<String>,
    #[arg(long, allow_negative_numbers = true)]
    age: Option<i64>,
    #[arg(long)]
    gender: Option<String>,
    #[arg(long, allow_negative_numbers = true)]
    height: Option<f64>,
    #[arg(long, allow_negative_numbers = true)]
    weight: Option<f64>,
}

impl From<CreateArgs> for PatientDraft {
    fn from(args: CreateArgs) -> Self {
        Self {
            id: args.id,
            name: args.name,
            city: args.city,
            age: args.age,
            gender: args.gender,
            height: args.height,
            weight: args.weight,
        }
    }
}

impl UpdateArgs {
    fn into_update(self) -> (String, PatientUpdate) {
        let update = PatientUpdate {
            name: self.name,
            city: self.city,
            age: self.age,
            gender: self.gender,
            height: self.height,
            weight: self.weight,
        };
        (self.id, update)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = resolve_config(&cli);

    if let Some(log_dir) = &config.log_dir {
        if let Err(err) = init_logging(&config.log_level, log_dir) {
            eprintln!("{}", json!({ "kind": "logging", "message": err.to_string() }));
            return ExitCode::from(1);
        }
    }

    match run(cli.command, &config) {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("{}", error_envelope(&err));
            ExitCode::from(exit_code(err.kind()))
        }
    }
}

fn resolve_config(cli: &Cli) -> StoreConfig {
    let mut config = StoreConfig::from_env();
    if let Some(data) = &cli.data {
        config.data_path = data.clone();
    }
    if let Some(level) = &cli.log_level {
        config.log_level = level.clone();
    }
    if let Some(log_dir) = &cli.log_dir {
        config.log_dir = Some(log_dir.clone());
    }
    config
}

fn run(command: Command, config: &StoreConfig) -> Result<Value, RepoError> {
    let service: FilePatientService = config.open_service();
    info!("event=cli_command module=cli status=start");

    match command {
        Command::Home => Ok(json!({ "message": "welcome to home page" })),
        Command::Init => {
            let created = config.open_store().init_if_missing()?;
            Ok(json!({ "message": "store ready", "created": created }))
        }
        Command::View => to_json(&service.view_all()?),
        Command::Show { id } => to_json(&service.view_patient(&id)?),
        Command::Create(args) => {
            service.create_patient(&PatientDraft::from(args))?;
            Ok(json!({ "message": "Patient added successfully" }))
        }
        Command::Update(args) => {
            let (id, update) = args.into_update();
            service.update_patient(&id, &update)?;
            Ok(json!({ "message": "patient updated" }))
        }
        Command::Delete { id } => {
            service.delete_patient(&id)?;
            Ok(json!({ "message": "patient deleted" }))
        }
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<Value, RepoError> {
    serde_json::to_value(value).map_err(|err| RepoError::Store(StoreError::Serialize(err)))
}

fn error_envelope(err: &RepoError) -> Value {
    json!({ "kind": err.kind().as_str(), "message": err.to_string() })
}

fn exit_code(kind: ErrorKind) -> u8 {
    match kind {
        ErrorKind::Validation => 2,
        ErrorKind::NotFound => 3,
        ErrorKind::Conflict => 4,
        ErrorKind::Store => 5,
    }
}

#[cfg(test)]
mod tests {
    use super::{error_envelope, exit_code, run, to_json, Cli, Command, CreateArgs, UpdateArgs};
    use clap::Parser;
    use patient_core::{ErrorKind, PatientDraft, RepoError, StoreConfig};
    use serde_json::json;
    use std::collections::BTreeMap;

    #[test]
    fn create_flags_map_to_draft() {
        let cli = Cli::try_parse_from([
            "patient", "create", "--id", "P001", "--name", "Arun", "--city", "Pune", "--age",
            "24", "--gender", "male", "--height", "1.72", "--weight", "70",
        ])
        .expect("create args parse");

        let Command::Create(args) = cli.command else {
            panic!("expected create command");
        };
        let draft = PatientDraft::from(args);
        assert_eq!(draft.id, "P001");
        assert_eq!(draft.age, 24);
        assert_eq!(draft.height, 1.72);
    }

    #[test]
    fn update_keeps_unset_flags_empty() {
        let cli = Cli::try_parse_from(["patient", "--data", "x.json", "update", "P001", "--city", "Delhi"])
            .expect("update args parse");
        assert_eq!(cli.data.as_deref(), Some(std::path::Path::new("x.json")));

        let Command::Update(args) = cli.command else {
            panic!("expected update command");
        };
        let (id, update) = args.into_update();
        assert_eq!(id, "P001");
        assert_eq!(update.city.as_deref(), Some("Delhi"));
        assert!(update.name.is_none());
        assert!(update.age.is_none());
    }

    #[test]
    fn exit_codes_are_distinct_per_kind() {
        assert_eq!(exit_code(ErrorKind::Validation), 2);
        assert_eq!(exit_code(ErrorKind::NotFound), 3);
        assert_eq!(exit_code(ErrorKind::Conflict), 4);
        assert_eq!(exit_code(ErrorKind::Store), 5);
    }

    fn arun() -> CreateArgs {
        CreateArgs {
            id: "P001".to_string(),
            name: "Arun".to_string(),
            city: "Pune".to_string(),
            age: 24,
            gender: "male".to_string(),
            height: 1.72,
            weight: 70.0,
        }
    }

    #[test]
    fn commands_run_end_to_end_against_data_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = StoreConfig {
            data_path: dir.path().join("patience.json"),
            ..StoreConfig::default()
        };

        let home = run(Command::Home, &config).expect("home");
        assert_eq!(home["message"], "welcome to home page");

        let err = run(Command::View, &config).expect_err("view before init");
        assert_eq!(error_envelope(&err)["kind"], "store");

        let init = run(Command::Init, &config).expect("init");
        assert_eq!(init, json!({ "message": "store ready", "created": true }));
        let again = run(Command::Init, &config).expect("second init");
        assert_eq!(again["created"], false);

        let created = run(Command::Create(arun()), &config).expect("create");
        assert_eq!(created["message"], "Patient added successfully");

        let err = run(Command::Create(arun()), &config).expect_err("duplicate create");
        assert!(matches!(err, RepoError::Conflict(_)));
        assert_eq!(exit_code(err.kind()), 4);
        let envelope = error_envelope(&err);
        assert_eq!(envelope["kind"], "conflict");
        assert!(envelope["message"].as_str().expect("message").contains("P001"));

        let mut invalid = arun();
        invalid.id = "P002".to_string();
        invalid.age = 0;
        let err = run(Command::Create(invalid), &config).expect_err("invalid create");
        assert_eq!(error_envelope(&err)["kind"], "validation");

        let shown = run(Command::Show { id: "P001".to_string() }, &config).expect("show");
        assert_eq!(shown["id"], "P001");
        assert_eq!(shown["bmi"], 23.66);
        assert_eq!(shown["verdict"], "Normal");

        let update = UpdateArgs {
            id: "P001".to_string(),
            name: None,
            city: Some("Delhi".to_string()),
            age: None,
            gender: None,
            height: None,
            weight: Some(95.0),
        };
        let updated = run(Command::Update(update), &config).expect("update");
        assert_eq!(updated["message"], "patient updated");

        let all = run(Command::View, &config).expect("view");
        assert_eq!(all["P001"]["city"], "Delhi");
        assert!(all["P001"].get("bmi").is_none());

        let deleted =
            run(Command::Delete { id: "P001".to_string() }, &config).expect("delete");
        assert_eq!(deleted["message"], "patient deleted");

        let err = run(Command::Show { id: "P001".to_string() }, &config)
            .expect_err("show after delete");
        assert_eq!(exit_code(err.kind()), 3);
        assert_eq!(error_envelope(&err)["kind"], "not_found");
        assert_eq!(run(Command::View, &config).expect("view empty"), json!({}));
    }

    #[test]
    fn serialization_failure_is_a_store_error() {
        // JSON object keys must be strings.
        let mut keyed = BTreeMap::new();
        keyed.insert((1, 2), "pair");

        let err = to_json(&keyed).expect_err("non-string keys cannot serialize");
        assert_eq!(err.kind(), ErrorKind::Store);
        assert_eq!(error_envelope(&err)["kind"], "store");
    }
}
