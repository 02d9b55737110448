//! The `desk` run flow: load the stores, pick a script, gather its values,
//! confirm, run it and report.

use std::io::{BufRead, Write};

use chrono::Local;
use itertools::Itertools;
use log::{debug, info, warn};
use script_desk_core::config;
use script_desk_core::engine::{Engine, SessionState};
use script_desk_core::error::{Error, ErrorKind, Result};
use script_desk_core::form::describe_form;
use script_desk_core::history::PathHistory;
use script_desk_core::interpolation::build_arguments;
use script_desk_core::presets::{ConfigPreset, PresetStore};
use script_desk_core::script_definitions::{
    DescriptorStore, EntryPointRef, ParameterKind, ScriptDescriptor,
};
use script_desk_core::values::{resolve, ParamValue, ParameterValues};

use crate::arguments::validation::should_prompt_for_parameters;
use crate::arguments::{process_command_line, Provider};
use crate::builtins;
use crate::cli_args::Args;
use crate::prompting::{RunChoice, Terminal};
use crate::selection::{find_script, prompt_for_script, ScriptChoice};
use crate::session;

/// How an invocation ended, when it did not end in an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The script completed, or there was nothing to run.
    Succeeded,
    /// The script ran and failed or was cancelled. Its output already says
    /// why.
    Failed,
}

/// Runs one invocation of the binary against `terminal`.
///
/// # Errors
///
/// Returns an error if a store cannot be loaded, the script or preset does
/// not exist, the values are invalid and cannot be re-entered, or the
/// terminal fails.
pub fn run<R: BufRead, W: Write>(args: &Args, terminal: &mut Terminal<R, W>) -> Result<RunOutcome> {
    let scripts_path = config::get_scripts_path(&args.scripts_path);
    debug!("Scripts path: `{}`", scripts_path);
    let descriptors = DescriptorStore::load(&scripts_path)?;

    let presets_path = config::get_presets_path(&args.presets_path);
    debug!("Presets path: `{}`", presets_path);
    let presets = PresetStore::open(&presets_path)?;

    let history_path = config::get_path_history_path(&args.history_path);
    let mut history = PathHistory::open(&history_path)?;

    let mut engine = Engine::new(descriptors, presets, builtins::registry());

    let script_id = match &args.script_id_or_index {
        Some(query) => find_script(engine.descriptors(), query)?,
        None => match prompt_for_script(terminal, engine.descriptors())? {
            ScriptChoice::Script(script_id) => script_id,
            ScriptChoice::Quit => return Ok(RunOutcome::Succeeded),
        },
    };

    if args.is_preset_command() {
        manage_presets(args, engine.presets_mut(), &script_id, terminal)?;
        return Ok(RunOutcome::Succeeded);
    }

    let descriptor = engine.descriptors().require(&script_id)?.clone();
    let Some((values, preset)) = gather_values(args, &engine, &descriptor, &history, terminal)? else {
        return Ok(RunOutcome::Succeeded);
    };

    if let Some(name) = &args.save_preset {
        save_preset(args, engine.presets_mut(), &script_id, name, &values, terminal)?;
    }

    record_folders(&mut history, &descriptor, &values);

    let started = match &preset {
        Some(preset) => engine.start_with_preset(&script_id, preset),
        None => engine.start(&script_id, &values),
    };
    if let Err(error) = started {
        session::print_output(&engine, terminal)?;
        return Err(error);
    }

    let report = session::drive(&mut engine, terminal)?;
    terminal.print_line(&session::summary(&report))?;
    info!("{} ended as {}", report.script_id, report.state);

    Ok(match report.state {
        SessionState::Completed => RunOutcome::Succeeded,
        _ => RunOutcome::Failed,
    })
}

/// Collects the values to run with, prompting and confirming as the
/// arguments require. Returns the resolved values and the preset they came
/// from, or `None` if nothing should run.
fn gather_values<R: BufRead, W: Write>(
    args: &Args,
    engine: &Engine,
    descriptor: &ScriptDescriptor,
    history: &PathHistory,
    terminal: &mut Terminal<R, W>,
) -> Result<Option<(ParameterValues, Option<String>)>> {
    let style = args.get_style()?;
    let mut preset = args.preset.clone();

    let mut values = match &preset {
        Some(name) => engine
            .presets()
            .get(&descriptor.id, name)
            .map(ConfigPreset::values)
            .ok_or_else(|| Error::PresetNotFound {
                script: descriptor.id.clone(),
                name: name.clone(),
            })?,
        None => process_command_line(&style, descriptor)?,
    };

    // With nothing given, the form starts from the most used preset
    let mut seed = None;
    if preset.is_none() && values.is_empty() {
        if let Some(default) = engine.presets().default_for(&descriptor.id) {
            terminal.print_line(&format!("Pre-filled from preset `{}`", default.name))?;
            seed = Some(default.values());
        }
    }

    let mut need_to_prompt =
        should_prompt_for_parameters(descriptor, &values, &style, preset.is_some());

    loop {
        if need_to_prompt {
            let base = seed.take().unwrap_or_else(|| values.clone());
            values = fill_values(terminal, descriptor, &base, history)?;
            // Edited values no longer belong to the preset
            preset = None;
        }

        let resolved = match resolve(descriptor, &values) {
            Ok(resolved) => resolved,
            Err(error) if error.kind() == ErrorKind::Validation && !args.force => {
                terminal.print_line(&error.to_string())?;
                need_to_prompt = true;
                continue;
            }
            Err(error) => return Err(error),
        };

        print_values(terminal, descriptor, &resolved, preset.as_deref())?;

        if args.dry_run {
            terminal.print_line("Dry run is specified, exiting without running.")?;
            return Ok(None);
        }

        if args.force {
            return Ok(Some((resolved, preset)));
        }

        match terminal.confirm_run(!descriptor.parameters.is_empty())? {
            RunChoice::Yes => return Ok(Some((resolved, preset))),
            RunChoice::No => {
                terminal.print_line("Not running.")?;
                return Ok(None);
            }
            RunChoice::ChangeParams => need_to_prompt = true,
        }
    }
}

/// Prompts for every field of the form, starting from `base`.
fn fill_values<R: BufRead, W: Write>(
    terminal: &mut Terminal<R, W>,
    descriptor: &ScriptDescriptor,
    base: &ParameterValues,
    history: &PathHistory,
) -> Result<ParameterValues> {
    let mut filled = ParameterValues::new();
    for field in describe_form(descriptor, Some(base)) {
        let value = terminal.prompt_field(&field, history.entries())?;
        filled.insert(field.name, ParamValue::from(value));
    }
    Ok(filled)
}

fn print_values<R: BufRead, W: Write>(
    terminal: &mut Terminal<R, W>,
    descriptor: &ScriptDescriptor,
    values: &ParameterValues,
    preset: Option<&str>,
) -> Result<()> {
    match preset {
        Some(preset) => terminal.print_line(&format!("{} with preset `{preset}`", descriptor.label))?,
        None => terminal.print_line(&descriptor.label)?,
    }

    if let EntryPointRef::Command(spec) = &descriptor.entry_point {
        let arguments = build_arguments(&spec.command, values)?;
        terminal.print_line(&format!("Executing command:\n{}", arguments.join(" ")))?;
        if let Some(environment) = &spec.environment {
            terminal.print_line("With environment:")?;
            for (key, value) in environment.iter().sorted() {
                terminal.print_line(&format!("\t\"{key}\": \"{value}\""))?;
            }
        }
    }

    if !values.is_empty() {
        terminal.print_line("With parameters:")?;
        for (name, value) in values {
            terminal.print_line(&format!("\t{name} = {value}"))?;
        }
    }

    Ok(())
}

fn save_preset<R: BufRead, W: Write>(
    args: &Args,
    presets: &mut PresetStore,
    script_id: &str,
    name: &str,
    values: &ParameterValues,
    terminal: &mut Terminal<R, W>,
) -> Result<()> {
    let overwrite = presets.get(script_id, name).is_some()
        && (args.force || terminal.confirm(&format!("Preset `{name}` exists. Overwrite it?"))?);

    presets.save(script_id, name, values, |_| overwrite)?;
    terminal.print_line(&format!("Saved preset `{name}`"))
}

/// Remembers every folder value so folder pickers can offer it next time.
fn record_folders(history: &mut PathHistory, descriptor: &ScriptDescriptor, values: &ParameterValues) {
    let folders = descriptor
        .parameters
        .iter()
        .filter(|spec| spec.kind == ParameterKind::FolderPath)
        .filter_map(|spec| values.get(&spec.name));

    for folder in folders {
        if let Err(error) = history.record(&folder.to_string()) {
            warn!("Could not remember folder `{folder}`: {error}");
        }
    }
}

fn manage_presets<R: BufRead, W: Write>(
    args: &Args,
    presets: &mut PresetStore,
    script_id: &str,
    terminal: &mut Terminal<R, W>,
) -> Result<()> {
    if let Some(names) = &args.rename_preset {
        let [old, new] = names.as_slice() else {
            return Err(Error::InvalidPresetName(names.join(" ")));
        };
        let force = args.force;
        presets.rename(script_id, old, new, |_| force)?;
        terminal.print_line(&format!("Renamed preset `{old}` to `{new}`"))?;
    }

    if let Some(name) = &args.delete_preset {
        presets.delete(script_id, name)?;
        terminal.print_line(&format!("Deleted preset `{name}`"))?;
    }

    if args.list_presets {
        let listed = presets.list(script_id, args.sort);
        if listed.is_empty() {
            terminal.print_line(&format!("No presets saved for {script_id}"))?;
        }
        for preset in listed {
            terminal.print_line(&format_preset(preset))?;
        }
    }

    Ok(())
}

fn format_preset(preset: &ConfigPreset) -> String {
    let params = preset
        .params
        .iter()
        .map(|(name, value)| format!("{name}={value}"))
        .join(", ");

    format!(
        "{}  (used {}x, last {})  {params}",
        preset.name,
        preset.usage_count,
        preset.last_used.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
    )
}
