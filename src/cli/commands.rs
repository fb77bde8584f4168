//! Command dispatch and handlers

use std::io;
use std::path::Path;

use clap::CommandFactory;
use clap_complete::generate;
use tracing::{debug, instrument};

use crate::application::services::ScenarioService;
use crate::application::{AllocationReport, NodeShares};
use crate::cli::args::{Cli, Commands, ConfigCommands};
use crate::cli::error::{CliError, CliResult};
use crate::cli::output;
use crate::config::{global_config_path, local_config_path, Settings};
use crate::domain::{RegionSet, TreeRender};
use crate::infrastructure::{InfraError, ServiceContainer};

/// Execute the parsed command line against the wired services.
pub fn execute_command(cli: &Cli, container: &ServiceContainer) -> CliResult<()> {
    match &cli.command {
        Some(Commands::Tree { file, period }) => cmd_tree(container, file, *period),
        Some(Commands::Run {
            file,
            period,
            output,
            csv,
        }) => cmd_run(container, file, *period, output.as_deref(), *csv),
        Some(Commands::Shares { file, period }) => cmd_shares(container, file, *period),
        Some(Commands::Config { command }) => cmd_config(cli, container, command),
        Some(Commands::Completion { shell }) => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(*shell, &mut cmd, name, &mut io::stdout());
            Ok(())
        }
        None => Err(CliError::Usage(
            "no command given, see --help".to_string(),
        )),
    }
}

/// Load the scenario and run it through `through`.
fn simulate(service: &ScenarioService, file: &Path, through: usize) -> CliResult<RegionSet> {
    let scenario = service.load(file)?;
    Ok(service.simulate(&scenario, through)?)
}

#[instrument(skip(container))]
fn cmd_tree(container: &ServiceContainer, file: &Path, period: Option<usize>) -> CliResult<()> {
    let service = container.scenario_service()?;
    let regions = match period {
        Some(p) => simulate(&service, file, p)?,
        None => service.build(&service.load(file)?)?,
    };
    for allocator in regions.iter() {
        output::info(&allocator.to_tree_string(period));
    }
    Ok(())
}

#[instrument(skip(container))]
fn cmd_run(
    container: &ServiceContainer,
    file: &Path,
    period: Option<usize>,
    out: Option<&Path>,
    csv: bool,
) -> CliResult<()> {
    let service = container.scenario_service()?;
    let through = period.unwrap_or(service.context().period_count() - 1);
    let regions = simulate(&service, file, through)?;

    let report = AllocationReport::for_regions(&regions, through);
    let text = if csv {
        report.to_csv()
    } else {
        report.to_table()
    };
    debug!(rows = report.rows.len(), through, "report ready");

    match out {
        Some(path) => {
            container
                .fs
                .write(path, &text)
                .map_err(|e| InfraError::io(format!("write {}", path.display()), e))?;
            output::action("Wrote", &path.display());
        }
        None => {
            output::header(&format!(
                "period {} (year {})",
                through,
                service.context().year(through)
            ));
            output::info(&text);
        }
    }
    Ok(())
}

#[instrument(skip(container))]
fn cmd_shares(container: &ServiceContainer, file: &Path, period: Option<usize>) -> CliResult<()> {
    let service = container.scenario_service()?;
    let period = period.unwrap_or(0);
    let regions = simulate(&service, file, period)?;

    for node in NodeShares::for_regions(&regions, period) {
        output::header(&format!("{} :: {}", node.region, node.node));
        for (child, share) in &node.shares {
            output::detail(&format!("{child:<28} {share:>10.6}"));
        }
        output::share_sum(node.sum());
    }
    Ok(())
}

fn cmd_config(cli: &Cli, container: &ServiceContainer, command: &ConfigCommands) -> CliResult<()> {
    match command {
        ConfigCommands::Show => output::info(&container.settings.to_toml()?),
        ConfigCommands::Template => output::info(&Settings::template()),
        ConfigCommands::Path => {
            match global_config_path() {
                Some(path) => output::action("global", &path.display()),
                None => output::action("global", &"<no config directory>"),
            }
            let local = cli.config.clone().unwrap_or_else(local_config_path);
            output::action("local", &local.display());
        }
    }
    Ok(())
}
