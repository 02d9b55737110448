//! Script Desk Core Library
//!
//! This crate provides the engine behind script-desk: it loads script
//! descriptors, resolves parameter values, runs one script at a time on a
//! worker thread, relays the script's questions to the operator and keeps
//! named parameter presets with usage statistics.
//!
//! # Key Features
//!
//! - **Script Descriptors**: Parse and validate YAML-based script configurations
//! - **Parameter Resolution**: Typed values checked against each parameter's spec
//! - **Execution Engine**: Single-session coordinator with an input broker
//! - **Entry Points**: Built-in functions or external processes with a line protocol
//! - **Presets**: Saved parameter sets ranked by recency or popularity
//! - **Error Handling**: Error types grouped into a small set of kinds
//!
//! # Examples
//!
//! Running a built-in script and draining its output:
//!
//! ```
//! use std::time::Duration;
//!
//! use script_desk_core::engine::{Engine, EngineEvent, SessionState};
//! use script_desk_core::entry_point::Registry;
//! use script_desk_core::presets::PresetStore;
//! use script_desk_core::script_definitions::DescriptorStore;
//! use script_desk_core::values::values_from;
//!
//! let descriptors = DescriptorStore::from_yaml_str(
//!     r#"
//! greet:
//!   label: Greet
//!   entry_point: greet
//!   parameters:
//!     - { name: who, label: Who, kind: text }
//! "#,
//!     "inline",
//! )?;
//! let registry = Registry::new().with_fn("greet", |context| {
//!     let who = context.text("who")?;
//!     context.print(format!("hello, {who}"));
//!     Ok(())
//! });
//! let dir = tempfile::tempdir()?;
//! let presets = PresetStore::open(dir.path().join("presets.yml").to_str().unwrap_or_default())?;
//!
//! let mut engine = Engine::new(descriptors, presets, registry);
//! engine.start("greet", &values_from([("who", "alice")]))?;
//! let report = loop {
//!     if let Some(EngineEvent::Finished(report)) = engine.next_event(Duration::from_secs(5)) {
//!         break report;
//!     }
//! };
//!
//! assert_eq!(report.state, SessionState::Completed);
//! assert_eq!(engine.drain_output(), vec!["hello, alice"]);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod broker;
pub mod config;
pub mod engine;
pub mod entry_point;
pub mod error;
pub mod execution;
pub mod file_handling;
pub mod form;
pub mod history;
pub mod interpolation;
pub mod output;
pub mod presets;
pub mod script_definitions;
pub mod values;
