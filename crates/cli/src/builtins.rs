//! Entry points that ship with the `desk` binary.

use std::fs;

use itertools::Itertools;
use script_desk_core::entry_point::{Registry, RunContext};
use script_desk_core::error::{Error, Result};

pub const LIST_FILES: &str = "list-files";

/// The registry the binary runs scripts from.
pub fn registry() -> Registry {
    Registry::new().with_fn(LIST_FILES, list_files)
}

/// Prints the names of the files directly inside the `folder` parameter,
/// sorted. An optional `extension` parameter narrows the listing.
///
/// # Errors
///
/// Returns an error if the parameter is missing or the folder can't be read.
pub fn list_files(context: &mut RunContext<'_>) -> Result<()> {
    let folder = context.text("folder")?;
    let extension = context
        .values()
        .get("extension")
        .map(|extension| extension.to_string().trim_start_matches('.').to_lowercase())
        .filter(|extension| !extension.is_empty());

    let read_error = |error| Error::io_error("folder".to_string(), folder.clone(), error);
    let mut names = Vec::new();
    for entry in fs::read_dir(&folder).map_err(read_error)? {
        let entry = entry.map_err(read_error)?;
        if !entry.file_type().map_err(read_error)?.is_file() {
            continue;
        }

        let path = entry.path();
        if let Some(wanted) = &extension {
            let matches = path
                .extension()
                .is_some_and(|found| found.to_string_lossy().to_lowercase() == *wanted);
            if !matches {
                continue;
            }
        }
        names.push(entry.file_name().to_string_lossy().into_owned());
    }

    if names.is_empty() {
        context.print(format!("No files in {folder}"));
    }
    for name in names.into_iter().sorted() {
        context.print(name);
    }

    Ok(())
}
