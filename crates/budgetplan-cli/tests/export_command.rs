//! Integration tests for the `export` and `preview` commands
//!
//! These run the compiled binary against records written to a temp dir.
//!
//! ## Exit Code Contract
//!
//! | Exit Code | Meaning |
//! |-----------|---------|
//! | 0 | Success: workbook written, warnings allowed |
//! | 1 | Failure: export rejected, or warnings under --strict |

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::TempDir;

const RECORDS: &str = r#"[
  {
    "attentionLevelText": "NIVEL III - Hospitales",
    "familyName": "Emergencia",
    "activityName": "Triaje",
    "measurementUnit": "Paciente",
    "goalByQuarter": ["5", "5", "5", "5"],
    "budgetByQuarter": ["1200.00", "1200.00", "1200.00", "1200.00"]
  },
  {
    "attentionLevelText": "nivel iii",
    "familyName": "Emergencia",
    "activityName": "triaje ",
    "measurementUnit": "Paciente",
    "goalByQuarter": ["1", "1", "1", "1"],
    "budgetByQuarter": ["300.50", "0", "0", "0"]
  },
  {
    "attentionLevelText": "Nivel I",
    "familyName": "Promoción",
    "activityName": "Charlas",
    "goalByQuarter": ["3", "3", "3", "3"]
  }
]"#;

/// Same activity recorded with two different units: raises M001
const COLLIDING_RECORDS: &str = r#"[
  {
    "attentionLevelText": "Nivel II",
    "familyName": "Consulta Externa",
    "activityName": "Consulta",
    "measurementUnit": "Atención",
    "goalByQuarter": ["1", "1", "1", "1"]
  },
  {
    "attentionLevelText": "Nivel II",
    "familyName": "Consulta Externa",
    "activityName": "consulta",
    "measurementUnit": "Paciente",
    "goalByQuarter": ["2", "2", "2", "2"]
  }
]"#;

fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).expect("write fixture");
    path
}

/// Binary with every BUDGETPLAN_* variable cleared
fn budgetplan() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_budgetplan"));
    for var in [
        "BUDGETPLAN_YEAR",
        "BUDGETPLAN_DEPENDENCY",
        "BUDGETPLAN_MODIFICATION",
        "BUDGETPLAN_QUARTER",
        "BUDGETPLAN_CONFIG",
        "BUDGETPLAN_CURRENCY",
        "RUST_LOG",
    ] {
        cmd.env_remove(var);
    }
    cmd
}

fn run(cmd: &mut Command) -> Output {
    cmd.output().expect("failed to execute budgetplan")
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

// =============================================================================
// export
// =============================================================================

#[test]
fn export_writes_xlsx() {
    let dir = TempDir::new().unwrap();
    let records = write_file(dir.path(), "records.json", RECORDS);
    let xlsx = dir.path().join("poa.xlsx");

    let output = run(budgetplan()
        .arg("export")
        .arg(&records)
        .arg("-o")
        .arg(&xlsx)
        .args(["--year", "2026", "--dependency", "Red de Salud Norte"]));

    assert_eq!(output.status.code(), Some(0), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("Wrote"));
    let bytes = std::fs::read(&xlsx).unwrap();
    assert_eq!(&bytes[0..2], b"PK");
}

#[test]
fn export_without_year_is_rejected() {
    let dir = TempDir::new().unwrap();
    let records = write_file(dir.path(), "records.json", RECORDS);
    let xlsx = dir.path().join("poa.xlsx");

    let output = run(budgetplan().arg("export").arg(&records).arg("-o").arg(&xlsx));

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("Fiscal year is missing"));
    assert!(!xlsx.exists());
}

#[test]
fn export_rejects_out_of_range_quarter() {
    let dir = TempDir::new().unwrap();
    let records = write_file(dir.path(), "records.json", RECORDS);
    let xlsx = dir.path().join("poa.xlsx");

    let output = run(budgetplan()
        .arg("export")
        .arg(&records)
        .arg("-o")
        .arg(&xlsx)
        .args(["--year", "2026", "--modification", "2", "--quarter", "5"]));

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("Current quarter 5 is out of range"));
}

#[test]
fn export_reports_unreadable_records() {
    let dir = TempDir::new().unwrap();
    let records = write_file(dir.path(), "records.json", "{ not json");
    let output = run(budgetplan()
        .arg("export")
        .arg(&records)
        .arg("-o")
        .arg(dir.path().join("x.xlsx"))
        .args(["--year", "2026"]));

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("Failed to parse records"));
}

#[test]
fn export_rejects_oversized_values() {
    let dir = TempDir::new().unwrap();
    let records = write_file(
        dir.path(),
        "records.json",
        r#"[{
  "attentionLevelText": "Nivel I",
  "familyName": "Promoción",
  "activityName": "Charlas",
  "budgetByQuarter": ["79228162514264337593543950335", "0", "0", "0"]
}]"#,
    );
    let xlsx = dir.path().join("poa.xlsx");

    let output = run(budgetplan()
        .arg("export")
        .arg(&records)
        .arg("-o")
        .arg(&xlsx)
        .args(["--year", "2026", "--granularity", "monthly"]));

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("Invalid records"));
    assert!(!xlsx.exists());
}

// =============================================================================
// Diagnostics and --strict
// =============================================================================

#[test]
fn warnings_are_printed_but_do_not_fail() {
    let dir = TempDir::new().unwrap();
    let records = write_file(dir.path(), "records.json", COLLIDING_RECORDS);
    let xlsx = dir.path().join("poa.xlsx");

    let output = run(budgetplan()
        .arg("export")
        .arg(&records)
        .arg("-o")
        .arg(&xlsx)
        .args(["--year", "2026"]));

    assert_eq!(output.status.code(), Some(0));
    assert!(stderr(&output).contains("warning[M001]"));
}

#[test]
fn strict_turns_warnings_into_failure() {
    let dir = TempDir::new().unwrap();
    let records = write_file(dir.path(), "records.json", COLLIDING_RECORDS);
    let xlsx = dir.path().join("poa.xlsx");

    let output = run(budgetplan()
        .arg("export")
        .arg(&records)
        .arg("-o")
        .arg(&xlsx)
        .args(["--year", "2026", "--strict"]));

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("error[M001]"));
    assert!(xlsx.exists(), "workbook is written even when strict fails");
}

#[test]
fn negative_values_are_warned_about() {
    let dir = TempDir::new().unwrap();
    let records = write_file(
        dir.path(),
        "records.json",
        r#"[{
  "attentionLevelText": "Nivel I",
  "familyName": "Promoción",
  "activityName": "Charlas",
  "goalByQuarter": ["3", "-1", "3", "3"]
}]"#,
    );

    let output = run(budgetplan().arg("preview").arg(&records).args(["--year", "2026"]));

    assert_eq!(output.status.code(), Some(0));
    assert!(stderr(&output).contains("warning[V001]"));
}

#[test]
fn strict_ignores_info_diagnostics() {
    let dir = TempDir::new().unwrap();
    let records = write_file(dir.path(), "records.json", RECORDS);

    let output = run(budgetplan()
        .arg("preview")
        .arg(&records)
        .args(["--year", "2026", "--level", "ii", "--strict"]));

    assert_eq!(output.status.code(), Some(0));
    assert!(stderr(&output).contains("info[E001]"));
    assert!(stdout(&output).contains("== Detalle Nivel II =="));
}

// =============================================================================
// preview and configuration layering
// =============================================================================

#[test]
fn preview_prints_sheets() {
    let dir = TempDir::new().unwrap();
    let records = write_file(dir.path(), "records.json", RECORDS);

    let output = run(budgetplan()
        .arg("preview")
        .arg(&records)
        .args(["--year", "2026", "--view", "detailed"]));

    assert_eq!(output.status.code(), Some(0));
    let text = stdout(&output);
    assert!(text.contains("== Detalle Nivel I =="));
    assert!(text.contains("== Detalle Nivel III =="));
    assert!(!text.contains("Consolidado"));
    assert!(text.contains("Triaje"));
    assert!(!text.contains("triaje "));
}

#[test]
fn config_file_supplies_defaults_and_flags_override() {
    let dir = TempDir::new().unwrap();
    let records = write_file(dir.path(), "records.json", RECORDS);
    let config = write_file(
        dir.path(),
        "budgetplan.toml",
        r#"
[context]
year = 2024
dependency = "Hospital Regional"

[report]
level = "iii"
granularity = "monthly"
"#,
    );

    let output = run(budgetplan()
        .arg("preview")
        .arg(&records)
        .arg("--config")
        .arg(&config)
        .args(["--year", "2026"]));

    assert_eq!(output.status.code(), Some(0), "stderr: {}", stderr(&output));
    let text = stdout(&output);
    assert!(text.contains("PLAN OPERATIVO ANUAL 2026"));
    assert!(text.contains("Hospital Regional - Formulación inicial"));
    assert!(text.contains("Meta Ene"));
    assert!(!text.contains("Nivel I =="));
}

#[test]
fn environment_variables_fill_flags() {
    let dir = TempDir::new().unwrap();
    let records = write_file(dir.path(), "records.json", RECORDS);

    let output = run(budgetplan()
        .arg("preview")
        .arg(&records)
        .env("BUDGETPLAN_YEAR", "2030")
        .env("BUDGETPLAN_MODIFICATION", "2")
        .env("BUDGETPLAN_QUARTER", "3"));

    assert_eq!(output.status.code(), Some(0), "stderr: {}", stderr(&output));
    let text = stdout(&output);
    assert!(text.contains("PLAN OPERATIVO ANUAL 2030"));
    assert!(text.contains("Modificación 2"));
}

#[test]
fn broken_config_file_is_reported() {
    let dir = TempDir::new().unwrap();
    let records = write_file(dir.path(), "records.json", RECORDS);
    let config = write_file(dir.path(), "bad.toml", "[context]\nyaer = 2026\n");

    let output = run(budgetplan()
        .arg("preview")
        .arg(&records)
        .arg("--config")
        .arg(&config));

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("Invalid configuration file"));
}
