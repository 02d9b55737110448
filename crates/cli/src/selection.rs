//! Choosing a script from the descriptor store.

use std::cmp::Reverse;
use std::io::{BufRead, Write};

use crossterm::queue;
use crossterm::style::{Print, ResetColor, SetForegroundColor};
use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use log::debug;
use script_desk_core::error::{Error, Result};
use script_desk_core::script_definitions::DescriptorStore;

use crate::colors::script_color;
use crate::prompting::Terminal;

#[derive(Debug, PartialEq, Eq)]
pub enum ScriptChoice {
    Script(String),
    Quit,
}

/// Prints every script as `[index] id - label`, in the script's color.
///
/// # Errors
///
/// Returns an error if a script's color is invalid or the output fails.
pub fn print_script_list<W: Write>(output: &mut W, store: &DescriptorStore) -> Result<()> {
    for (index, descriptor) in store.iter().enumerate() {
        queue!(output, Print(format!("[{index}] ")))?;
        if let Some(color) = script_color(descriptor)? {
            queue!(output, SetForegroundColor(color))?;
        }
        queue!(
            output,
            Print(&descriptor.id),
            ResetColor,
            Print(format!(" - {descriptor}\n"))
        )?;
    }
    output.flush()?;
    Ok(())
}

/// Finds the script meant by `query`: a list index, an exact ID, or the best
/// fuzzy match over IDs and labels.
///
/// # Errors
///
/// Returns [`Error::ScriptNotFound`] if nothing matches.
pub fn find_script(store: &DescriptorStore, query: &str) -> Result<String> {
    let query = query.trim();

    if let Ok(index) = query.parse::<usize>() {
        return store
            .get_index(index)
            .map(|descriptor| descriptor.id.clone())
            .ok_or_else(|| Error::ScriptNotFound(query.to_string()));
    }

    if let Some(descriptor) = store.get(query) {
        return Ok(descriptor.id.clone());
    }

    let matcher = SkimMatcherV2::default();
    store
        .iter()
        .filter_map(|descriptor| {
            let score = [&descriptor.id, &descriptor.label]
                .into_iter()
                .filter_map(|candidate| matcher.fuzzy_match(candidate, query))
                .max()?;
            Some((score, descriptor))
        })
        // Earlier scripts win ties
        .min_by_key(|(score, _)| Reverse(*score))
        .map(|(score, descriptor)| {
            debug!("`{query}` fuzzy matched {} with score {score}", descriptor.id);
            descriptor.id.clone()
        })
        .ok_or_else(|| Error::ScriptNotFound(query.to_string()))
}

/// Lists the scripts and asks for one until a valid choice or `q`.
///
/// # Errors
///
/// Returns an error if the list cannot be printed or input fails.
pub fn prompt_for_script<R: BufRead, W: Write>(
    terminal: &mut Terminal<R, W>,
    store: &DescriptorStore,
) -> Result<ScriptChoice> {
    print_script_list(terminal.output(), store)?;

    loop {
        let Some(input) = terminal.prompt("Select a script (number, name, or q to quit): ")?
        else {
            return Ok(ScriptChoice::Quit);
        };

        match input.as_str() {
            "" => continue,
            "q" | "Q" => return Ok(ScriptChoice::Quit),
            query => match find_script(store, query) {
                Ok(script_id) => return Ok(ScriptChoice::Script(script_id)),
                Err(error) => terminal.print_line(&error.to_string())?,
            },
        }
    }
}
