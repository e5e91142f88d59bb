//! CLI command implementations

use crate::cli::{Args, Command, RollbacksAction, ShowTarget, parse_metadata_args};
use crate::config::Options;
use crate::error::MustrError;
use crate::mustr::Mustr;
use crate::operations::RenderOptions;
use crate::operations::init::init_project;
use crate::rollback::RemoveBy;
use crate::system::System;
use crate::utils::path::{display_relative, resolve};
use anyhow::Result;
use std::path::Path;
use tracing::info;

/// Execute the parsed command against `system`
///
/// # Errors
///
/// Returns an error if the options file is invalid or the command fails
pub fn execute(args: &Args, system: &dyn System) -> Result<()> {
    let cwd = system.current_dir()?;
    let config_path = resolve(&cwd, Path::new(&args.config));
    let options = Options::load_or_default(system, &config_path)?;

    if let Command::Init { force } = args.command {
        init_project(system, &options, &config_path, force)?;
        return Ok(());
    }

    let mut mustr = Mustr::new(system, options)?;

    match &args.command {
        Command::Generate {
            template,
            output,
            force,
            meta,
            meta_json,
        } => execute_generate(
            &mut mustr,
            template,
            output.as_deref(),
            *force,
            &parse_metadata_args(meta, meta_json)?,
        )?,
        Command::Rollback { target, output } => {
            execute_rollback(&mut mustr, target.as_deref(), output.as_deref())?;
        }
        Command::Rollbacks { action } => execute_rollbacks(&mut mustr, action)?,
        Command::Show { target } => execute_show(&mustr, *target),
        // Handled before the session is created
        Command::Init { .. } => {}
    }
    Ok(())
}

fn execute_generate(
    mustr: &mut Mustr<'_>,
    template: &str,
    output: Option<&str>,
    force: bool,
    metadata: &serde_json::Map<String, serde_json::Value>,
) -> Result<()> {
    let mut options = RenderOptions::new().force(force);
    options.metadata.clone_from(metadata);
    if let Some(output) = output {
        options = options.output(output);
    }

    let report = mustr.render(template, options)?;
    if !report.failures.is_empty() {
        return Err(MustrError::render(format!(
            "{} of {} template(s) in {template} failed",
            report.failures.len(),
            report.failures.len() + report.results.len()
        ))
        .into());
    }
    Ok(())
}

fn execute_rollback(mustr: &mut Mustr<'_>, target: Option<&str>, output: Option<&str>) -> Result<()> {
    let target = match target {
        Some(index) if !index.is_empty() && index.chars().all(|c| c.is_ascii_digit()) => {
            let position = index.parse::<usize>().unwrap_or(0);
            Some(mustr.rollback_id_at(position).ok_or_else(|| {
                MustrError::rollback(format!("no rollback at index {index}."))
            })?)
        }
        other => other.map(str::to_owned),
    };

    let tally = mustr.rollback(target.as_deref(), output)?;
    if tally.failed > 0 {
        return Err(MustrError::rollback(format!(
            "{} of {} file(s) could not be rolled back",
            tally.failed,
            tally.total()
        ))
        .into());
    }
    Ok(())
}

fn execute_rollbacks(mustr: &mut Mustr<'_>, action: &RollbacksAction) -> Result<()> {
    match action {
        RollbacksAction::Remove { selector } => {
            let by = RemoveBy::parse(selector).ok_or_else(|| {
                MustrError::configuration(format!("invalid rollback selector {selector}"))
            })?;
            let removed = mustr.remove_rollbacks(&by, true)?;
            info!("removed {removed} rollback(s).");
        }
        RollbacksAction::Reindex { no_prune } => {
            mustr.reindex_rollbacks(!no_prune)?;
            mustr.save_rollbacks(false)?;
            info!("reindexed {} rollback(s).", mustr.ledger().len());
        }
    }
    Ok(())
}

/// Print listings to stdout (not using logging)
fn execute_show(mustr: &Mustr<'_>, target: ShowTarget) {
    match target {
        ShowTarget::Rollbacks => {
            for (index, stat) in mustr.rollback_stats().iter().enumerate() {
                println!(
                    "{}. {}  {}  {} file(s): {}",
                    index + 1,
                    stat.id,
                    stat.timestamp,
                    stat.count,
                    stat.templates.join(", ")
                );
            }
        }
        ShowTarget::Templates => {
            for (name, template) in mustr.templates() {
                let source = template.path.as_ref().map_or_else(
                    || "inline".to_owned(),
                    |path| display_relative(&mustr.paths().cwd, path),
                );
                println!("{name}  {source}");
            }
        }
        ShowTarget::Components => {
            for (name, component) in mustr.components() {
                println!("{name}: {}", component.templates.join(", "));
            }
        }
    }
}
