//! Command dispatch: one handler per subcommand

use std::io::{self, StdoutLock, Write};
use std::path::Path;

use clap::CommandFactory;
use clap_complete::generate;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::cli::args::{Cli, Commands, ConfigCommands};
use crate::cli::error::{CliError, CliResult};
use crate::cli::output;
use crate::config::{global_config_path, local_config_path, Settings};
use crate::domain::{find_category_by_id, CategoryId, CategoryRecord, DomainError};
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::traits::{read_stdin, InputSource};
use crate::infrastructure::InfraError;
use crate::tree_traits::{write_node_json, write_tree_json, TreeNodeConvert};

pub fn execute_command(cli: &Cli) -> CliResult<()> {
    let Some(command) = &cli.command else {
        return Err(CliError::Usage(
            "no command given, see 'cattree --help'".to_string(),
        ));
    };

    // Completions need no settings
    if let Commands::Completion { shell } = command {
        let mut cmd = Cli::command();
        let name = cmd.get_name().to_string();
        generate(*shell, &mut cmd, name, &mut io::stdout());
        return Ok(());
    }

    let project_dir = match &cli.project_dir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir()
            .map_err(|e| InfraError::io("determine current directory", e))?,
    };
    if cli.separator.as_deref() == Some("") {
        return Err(CliError::InvalidArgs(
            "--separator must not be empty".to_string(),
        ));
    }

    let settings = Settings::load(Some(&project_dir))?
        .with_overrides(cli.orphans, cli.separator.as_deref());
    debug!("Effective settings: {:?}", settings);
    let container = ServiceContainer::new(settings);

    match command {
        Commands::Tree { input, under, json } => {
            cmd_tree(&container, input, under.as_deref(), *json)
        }
        Commands::Flatten { input, json } => cmd_flatten(&container, input, *json),
        Commands::Find { input, id } => cmd_find(&container, input, id),
        Commands::Ancestors { input, id } => cmd_ancestors(&container, input, id),
        Commands::Options {
            input,
            exclude,
            json,
        } => cmd_options(&container, input, exclude.as_deref(), *json),
        Commands::Check { input } => cmd_check(&container, input),
        Commands::Config { command } => cmd_config(&container, command, &project_dir),
        Commands::Completion { .. } => Ok(()),
    }
}

fn load_records(container: &ServiceContainer, input: &Path) -> CliResult<Vec<CategoryRecord>> {
    let source = InputSource::from_arg(input);
    debug!("Loading categories from {}", source.origin());
    let records = match &source {
        InputSource::Stdin => {
            let content = read_stdin()?;
            container.catalog.parse(&content, &source.origin())?
        }
        InputSource::File(path) => container.catalog.load(path)?,
    };
    Ok(records)
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> CliResult<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| InfraError::io("serialize output", io::Error::other(e)))?;
    output::info(&json);
    Ok(())
}

/// Nested trees go out as compact JSON written from a worklist.
fn print_nested_json(
    write: impl FnOnce(&mut StdoutLock<'static>) -> io::Result<()>,
) -> CliResult<()> {
    let mut out = io::stdout().lock();
    write(&mut out)
        .and_then(|()| writeln!(out))
        .map_err(|e| InfraError::io("write output", e))?;
    Ok(())
}

fn report_dropped(dropped: usize) {
    if dropped > 0 {
        output::warning(&format!(
            "{} categories left out (missing parent), run 'cattree check' for details",
            dropped
        ));
    }
}

#[instrument(skip(container))]
fn cmd_tree(
    container: &ServiceContainer,
    input: &Path,
    under: Option<&str>,
    json: bool,
) -> CliResult<()> {
    let records = load_records(container, input)?;
    let forest = match under {
        Some(id) => container
            .catalog
            .build_under(&records, &CategoryId::from(id))?,
        None => container.catalog.build(&records)?,
    };
    report_dropped(forest.report.dropped.len());

    if json {
        let tree = forest.to_tree();
        print_nested_json(|out| write_tree_json(&tree, out))
    } else {
        output::info(&forest.arena.to_tree_string());
        Ok(())
    }
}

#[instrument(skip(container))]
fn cmd_flatten(container: &ServiceContainer, input: &Path, json: bool) -> CliResult<()> {
    let records = load_records(container, input)?;
    let forest = container.catalog.build(&records)?;
    report_dropped(forest.report.dropped.len());
    let rows = container.catalog.flatten(&forest.to_tree());

    if json {
        return print_json(&rows);
    }
    for row in &rows {
        output::info(&format!(
            "{}{}  {}",
            container.settings.indent.repeat(row.level),
            row.record.name,
            output::dim(&row.path)
        ));
    }
    Ok(())
}

#[instrument(skip(container))]
fn cmd_find(container: &ServiceContainer, input: &Path, id: &str) -> CliResult<()> {
    let records = load_records(container, input)?;
    let tree = container.catalog.build(&records)?.to_tree();
    let id = CategoryId::from(id);

    let node = find_category_by_id(&tree, &id)
        .ok_or_else(|| CliError::from(DomainError::UnknownCategory(id.clone())))?;
    print_nested_json(|out| write_node_json(node, out))
}

#[instrument(skip(container))]
fn cmd_ancestors(container: &ServiceContainer, input: &Path, id: &str) -> CliResult<()> {
    let records = load_records(container, input)?;
    let crumbs = container
        .catalog
        .breadcrumb(&records, &CategoryId::from(id))?;

    let names: Vec<&str> = crumbs.iter().map(|r| r.name.as_str()).collect();
    output::info(&names.join(&container.settings.path_separator));
    Ok(())
}

#[instrument(skip(container))]
fn cmd_options(
    container: &ServiceContainer,
    input: &Path,
    exclude: Option<&str>,
    json: bool,
) -> CliResult<()> {
    let records = load_records(container, input)?;
    let editing = exclude.map(CategoryId::from);
    let options = container.catalog.options(&records, editing.as_ref())?;

    if json {
        return print_json(&options);
    }
    for option in &options {
        output::info(&format!("{}\t{}", option.id, option.label));
    }
    Ok(())
}

#[instrument(skip(container))]
fn cmd_check(container: &ServiceContainer, input: &Path) -> CliResult<()> {
    let records = load_records(container, input)?;
    let summary = container.catalog.check(&records)?;

    output::header("Category hierarchy");
    output::action("categories", &summary.total);
    output::action("roots", &summary.roots);
    output::action("depth", &summary.depth);
    output::action("leaves", &summary.leaves);

    if summary.is_clean() {
        output::success("no orphaned categories");
        return Ok(());
    }

    output::header("Orphaned categories");
    for orphan in &summary.report.orphans {
        output::failure(&format!(
            "{} [{}] -> missing parent {}",
            orphan.name, orphan.id, orphan.missing_parent
        ));
    }
    let descendants = summary.report.dropped.len() - summary.report.orphans.len();
    if descendants > 0 {
        output::detail(&format!("{} descendant(s) unreachable as well", descendants));
    }
    Err(CliError::CheckFailed(summary.report.orphans.len()))
}

fn cmd_config(
    container: &ServiceContainer,
    command: &ConfigCommands,
    project_dir: &Path,
) -> CliResult<()> {
    match command {
        ConfigCommands::Show => output::info(&container.settings.to_toml()?),
        ConfigCommands::Path => {
            let global = global_config_path()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "<unavailable>".to_string());
            output::action("global", &global);
            output::action("local", &local_config_path(project_dir).display());
        }
        ConfigCommands::Template => output::info(&Settings::template()),
    }
    Ok(())
}
