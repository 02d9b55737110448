//! Integration tests for the `desk` run flow
//!
//! Each test writes a descriptor document into a temporary directory and
//! runs the app against scripted terminal input.

use std::fs;
use std::io::Cursor;

use clap::Parser;
use script_desk_cli::app::{run, RunOutcome};
use script_desk_cli::cli_args::Args;
use script_desk_cli::prompting::Terminal;
use script_desk_core::error::Error;
use script_desk_core::history::PathHistory;
use script_desk_core::presets::PresetStore;
use tempfile::TempDir;

const SCRIPTS: &str = r#"
list:
  label: List files
  entry_point: list-files
  parameters:
    - name: folder
      label: Folder
      kind: folder-path
"#;

#[cfg(unix)]
const PROCESS_SCRIPTS: &str = r#"
confirm:
  label: Confirm step
  interactive: true
  entry_point:
    command: ["sh", "-c", "echo ::confirm::Go on?; read answer; echo got $answer"]

count:
  label: Count
  interactive: true
  entry_point:
    command: ["sh", "-c", "echo ::input::number::How many?; read n; echo n=$n"]

broken:
  label: Broken
  entry_point:
    command: ["sh", "-c", "echo partial; exit 3"]
"#;

struct Workspace {
    dir: TempDir,
    data: TempDir,
}

impl Workspace {
    fn new(scripts: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("scripts.yml"), scripts).unwrap();

        let data = tempfile::tempdir().unwrap();
        for name in ["b.txt", "a.txt"] {
            fs::write(data.path().join(name), "x").unwrap();
        }

        Self { dir, data }
    }

    fn path(&self, name: &str) -> String {
        self.dir.path().join(name).to_str().unwrap().to_string()
    }

    fn folder(&self) -> String {
        self.data.path().to_str().unwrap().to_string()
    }

    fn args(&self, extra: &[&str]) -> Args {
        let scripts = self.path("scripts.yml");
        let presets = self.path("presets.yml");
        let history = self.path("path_history.yml");
        let mut argv = vec![
            "desk",
            "-c",
            scripts.as_str(),
            "--presets-path",
            presets.as_str(),
            "--history-path",
            history.as_str(),
        ];
        argv.extend_from_slice(extra);
        Args::parse_from(argv)
    }

    fn run(&self, extra: &[&str], input: &str) -> (Result<RunOutcome, Error>, String) {
        let args = self.args(extra);
        let mut terminal = Terminal::new(Cursor::new(input.as_bytes().to_vec()), Vec::new());
        let result = run(&args, &mut terminal);
        let output = String::from_utf8(terminal.into_output()).unwrap();
        (result, output)
    }
}

#[test]
fn test_forced_run_with_named_parameter() {
    let workspace = Workspace::new(SCRIPTS);
    let folder_param = format!("folder={}", workspace.folder());

    let (result, output) = workspace.run(&["list", "-f", "-p", &folder_param], "");

    assert_eq!(result.unwrap(), RunOutcome::Succeeded);
    let a = output.find("a.txt").unwrap();
    let b = output.find("b.txt").unwrap();
    assert!(a < b);
    assert!(output.contains("List files completed"));

    let history = PathHistory::open(&workspace.path("path_history.yml")).unwrap();
    assert_eq!(history.entries(), &[workspace.folder()]);
}

#[test]
fn test_dry_run_does_not_run() {
    let workspace = Workspace::new(SCRIPTS);
    let folder = workspace.folder();

    let (result, output) = workspace.run(&["list", "-d", &folder], "");

    assert_eq!(result.unwrap(), RunOutcome::Succeeded);
    assert!(output.contains(&format!("\tfolder = {folder}")));
    assert!(output.contains("Dry run is specified"));
    assert!(!output.contains("a.txt"));
}

#[test]
fn test_form_prompt_and_confirmation() {
    let workspace = Workspace::new(SCRIPTS);
    let input = format!("{}\ny\n", workspace.folder());

    let (result, output) = workspace.run(&["list"], &input);

    assert_eq!(result.unwrap(), RunOutcome::Succeeded);
    assert!(output.contains("Value for Folder (`folder`)"));
    assert!(output.contains("Are you sure you want to run?"));
    assert!(output.contains("a.txt"));
}

#[test]
fn test_declined_confirmation_runs_nothing() {
    let workspace = Workspace::new(SCRIPTS);
    let input = format!("{}\nn\n", workspace.folder());

    let (result, output) = workspace.run(&["list"], &input);

    assert_eq!(result.unwrap(), RunOutcome::Succeeded);
    assert!(output.contains("Not running."));
    assert!(!output.contains("a.txt"));
}

#[test]
fn test_invalid_value_is_asked_again() {
    let workspace = Workspace::new(SCRIPTS);
    let input = format!("/this/path/does/not/exist\n{}\ny\n", workspace.folder());

    let (result, output) = workspace.run(&["list"], &input);

    assert_eq!(result.unwrap(), RunOutcome::Succeeded);
    assert!(output.contains("Invalid value for parameter `folder`"));
    assert!(output.contains("a.txt"));
}

#[test]
fn test_closed_input_cancels_the_form() {
    let workspace = Workspace::new(SCRIPTS);

    let (result, _) = workspace.run(&["list"], "");

    assert!(matches!(result, Err(Error::Cancelled)));
}

#[test]
fn test_interactive_selection_quit() {
    let workspace = Workspace::new(SCRIPTS);

    let (result, output) = workspace.run(&[], "q\n");

    assert_eq!(result.unwrap(), RunOutcome::Succeeded);
    assert!(output.contains("[0] "));
    assert!(output.contains("List files"));
}

#[test]
fn test_unknown_script() {
    let workspace = Workspace::new(SCRIPTS);

    let (result, _) = workspace.run(&["qqqq"], "");

    assert!(matches!(result, Err(Error::ScriptNotFound(_))));
}

#[test]
fn test_preset_lifecycle() {
    let workspace = Workspace::new(SCRIPTS);
    let folder_param = format!("folder={}", workspace.folder());

    let (result, output) =
        workspace.run(&["list", "-f", "-p", &folder_param, "--save-preset", "mine"], "");
    assert_eq!(result.unwrap(), RunOutcome::Succeeded);
    assert!(output.contains("Saved preset `mine`"));

    let presets = PresetStore::open(&workspace.path("presets.yml")).unwrap();
    assert_eq!(presets.get("list", "mine").unwrap().usage_count, 0);

    let (result, output) = workspace.run(&["list", "--preset", "mine", "-f"], "");
    assert_eq!(result.unwrap(), RunOutcome::Succeeded);
    assert!(output.contains("with preset `mine`"));
    assert!(output.contains("a.txt"));

    let (result, output) = workspace.run(&["list", "--list-presets"], "");
    assert_eq!(result.unwrap(), RunOutcome::Succeeded);
    assert!(output.contains("mine  (used 1x, last "));

    let (result, _) = workspace.run(&["list", "--rename-preset", "mine", "ours"], "");
    assert_eq!(result.unwrap(), RunOutcome::Succeeded);
    let presets = PresetStore::open(&workspace.path("presets.yml")).unwrap();
    assert!(presets.get("list", "mine").is_none());
    assert_eq!(presets.get("list", "ours").unwrap().usage_count, 1);

    let (result, _) = workspace.run(&["list", "--delete-preset", "ours"], "");
    assert_eq!(result.unwrap(), RunOutcome::Succeeded);
    let (_, output) = workspace.run(&["list", "--list-presets"], "");
    assert!(output.contains("No presets saved for list"));
}

#[test]
fn test_most_used_preset_prefills_the_form() {
    let workspace = Workspace::new(SCRIPTS);
    let folder_param = format!("folder={}", workspace.folder());
    workspace.run(&["list", "-f", "-p", &folder_param, "--save-preset", "mine"], "");

    // An empty answer takes the pre-filled folder
    let (result, output) = workspace.run(&["list"], "\ny\n");

    assert_eq!(result.unwrap(), RunOutcome::Succeeded);
    assert!(output.contains("Pre-filled from preset `mine`"));
    assert!(output.contains(&format!("[{}]: ", workspace.folder())));
    assert!(output.contains("a.txt"));
}

#[test]
fn test_unknown_preset() {
    let workspace = Workspace::new(SCRIPTS);

    let (result, _) = workspace.run(&["list", "--preset", "nope", "-f"], "");

    assert!(matches!(result, Err(Error::PresetNotFound { .. })));
}

#[cfg(unix)]
mod process {
    use super::*;

    #[test]
    fn test_confirmation_is_relayed_to_the_process() {
        let workspace = Workspace::new(PROCESS_SCRIPTS);

        let (result, output) = workspace.run(&["confirm", "-f"], "y\n");

        assert_eq!(result.unwrap(), RunOutcome::Succeeded);
        assert!(output.contains("Go on? [y/n] "));
        assert!(output.contains("got y"));
    }

    #[test]
    fn test_invalid_number_is_asked_again() {
        let workspace = Workspace::new(PROCESS_SCRIPTS);

        let (result, output) = workspace.run(&["count", "-f"], "many\n4\n");

        assert_eq!(result.unwrap(), RunOutcome::Succeeded);
        assert!(output.contains("Invalid answer"));
        assert!(output.contains("n=4"));
    }

    #[test]
    fn test_cancel_at_a_question() {
        let workspace = Workspace::new(PROCESS_SCRIPTS);

        let (result, output) = workspace.run(&["count", "-f"], ":cancel\n");

        assert_eq!(result.unwrap(), RunOutcome::Failed);
        assert!(output.contains("cancelled: Cancelled by the operator"));
        assert!(output.contains("Count cancelled"));
    }

    #[test]
    fn test_failing_process() {
        let workspace = Workspace::new(PROCESS_SCRIPTS);

        let (result, output) = workspace.run(&["broken", "-f"], "");

        assert_eq!(result.unwrap(), RunOutcome::Failed);
        assert!(output.contains("partial"));
        assert!(output.contains("error: The script process exited with status 3"));
        assert!(output.contains("Broken failed"));
    }
}
