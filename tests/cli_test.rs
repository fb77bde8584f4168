//! Tests for command dispatch against an in-memory filesystem

use std::path::Path;
use std::sync::Arc;

use clap::Parser;

use landalloc::cli::{execute_command, Cli, CliError};
use landalloc::config::Settings;
use landalloc::infrastructure::traits::{FileSystem, MemoryFileSystem};
use landalloc::infrastructure::ServiceContainer;

const SCENARIO: &str = r#"
[[regions]]
name = "usa"

[regions.root]
name = "land"
sigma = 1.0
land_allocation = [200.0, 200.0]

[[regions.root.children]]
type = "leaf"
name = "corn"

[[regions.root.children]]
type = "unmanaged"
name = "pasture"
base_land_allocation = [100.0, 100.0]
base_intrinsic_rate = [1.0, 1.0]

[[regions.rates]]
product = "corn"
period = 0
rate = 4.0
"#;

fn container() -> (ServiceContainer, Arc<MemoryFileSystem>) {
    let mut settings = Settings::default();
    settings.model.period_count = 2;
    let fs = Arc::new(MemoryFileSystem::new().with_file("scenario.toml", SCENARIO));
    let container = ServiceContainer::with_deps(settings, fs.clone());
    (container, fs)
}

#[test]
fn given_run_with_csv_output_when_executing_then_writes_report() {
    // Arrange
    let (container, fs) = container();
    let cli = Cli::parse_from([
        "landalloc",
        "run",
        "scenario.toml",
        "--period",
        "0",
        "--csv",
        "--output",
        "report.csv",
    ]);

    // Act
    execute_command(&cli, &container).unwrap();

    // Assert
    let csv = fs.read_to_string(Path::new("report.csv")).unwrap();
    let lines: Vec<_> = csv.lines().collect();
    assert_eq!(lines.len(), 4);
    assert!(lines[0].starts_with("region,period"));
    assert!(lines[2].starts_with("usa,0,1,corn,leaf,160"));
}

#[test]
fn given_tree_and_shares_commands_when_executing_then_succeed() {
    // Arrange
    let (container, _fs) = container();

    // Act / Assert
    for args in [
        vec!["landalloc", "tree", "scenario.toml"],
        vec!["landalloc", "tree", "scenario.toml", "--period", "1"],
        vec!["landalloc", "shares", "scenario.toml"],
    ] {
        let cli = Cli::parse_from(args);
        execute_command(&cli, &container).unwrap();
    }
}

#[test]
fn given_missing_scenario_when_executing_then_data_error_exit_code() {
    // Arrange
    let (container, _fs) = container();
    let cli = Cli::parse_from(["landalloc", "run", "missing.toml"]);

    // Act
    let err = execute_command(&cli, &container).unwrap_err();

    // Assert
    assert_eq!(err.exit_code(), landalloc::exitcode::DATAERR);
}

#[test]
fn given_period_beyond_horizon_when_executing_then_usage_exit_code() {
    // Arrange
    let (container, _fs) = container();
    let cli = Cli::parse_from(["landalloc", "shares", "scenario.toml", "--period", "5"]);

    // Act
    let err = execute_command(&cli, &container).unwrap_err();

    // Assert
    assert_eq!(err.exit_code(), landalloc::exitcode::USAGE);
}

#[test]
fn given_no_command_when_executing_then_usage_error() {
    // Arrange
    let (container, _fs) = container();
    let cli = Cli::parse_from(["landalloc"]);

    // Act
    let err = execute_command(&cli, &container).unwrap_err();

    // Assert
    assert!(matches!(err, CliError::Usage(_)));
}
