//! What a script runs, and the context it runs with.

use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use crate::broker::{Broker, InputKind};
use crate::error::{Error, Result};
use crate::execution::ProcessEntryPoint;
use crate::output::{OutputSink, OutputWriter};
use crate::script_definitions::EntryPointRef;
use crate::values::{ParamValue, ParameterValues};

/// Everything an entry point may touch while it runs.
pub struct RunContext<'a> {
    script_id: &'a str,
    values: &'a ParameterValues,
    sink: &'a OutputSink,
    output: OutputWriter,
    broker: &'a Broker,
    interactive: bool,
}

impl<'a> RunContext<'a> {
    pub fn new(
        script_id: &'a str,
        values: &'a ParameterValues,
        sink: &'a OutputSink,
        broker: &'a Broker,
        interactive: bool,
    ) -> Self {
        Self {
            script_id,
            values,
            sink,
            output: sink.writer(),
            broker,
            interactive,
        }
    }

    pub fn script_id(&self) -> &str {
        self.script_id
    }

    /// The resolved values, in parameter order.
    pub fn values(&self) -> &ParameterValues {
        self.values
    }

    /// # Errors
    ///
    /// Returns [`Error::UnknownParameter`] if the script has no such
    /// parameter.
    pub fn value(&self, name: &str) -> Result<&ParamValue> {
        self.values
            .get(name)
            .ok_or_else(|| Error::UnknownParameter(name.to_string()))
    }

    pub fn text(&self, name: &str) -> Result<String> {
        self.value(name).map(ToString::to_string)
    }

    pub fn number(&self, name: &str) -> Result<f64> {
        let value = self.value(name)?;
        value
            .as_number()
            .ok_or_else(|| Error::invalid_value(name, format!("`{value}` is not a number")))
    }

    /// Appends one line of output, after any partial line still pending in
    /// [`RunContext::output`].
    pub fn print(&mut self, line: impl Into<String>) {
        self.output.flush_pending();
        self.sink.append(line);
    }

    /// The context's own line writer, for `write!`-style output.
    pub fn output(&mut self) -> &mut OutputWriter {
        &mut self.output
    }

    /// A new writer on the same sink, e.g. for a second output stream read
    /// on another thread.
    pub fn writer(&self) -> OutputWriter {
        self.sink.writer()
    }

    pub fn is_interactive(&self) -> bool {
        self.interactive
    }

    pub fn is_cancelled(&self) -> bool {
        self.broker.is_cancelled()
    }

    /// Asks the operator for a value, blocking until answered.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::NotInteractive`] for scripts not declared
    /// interactive, and with [`Error::Cancelled`] when the operator cancels.
    pub fn request_input(&mut self, prompt: &str, kind: InputKind) -> Result<String> {
        self.ensure_interactive()?;
        self.output.flush_pending();
        self.broker.request_input(prompt, kind)
    }

    /// Asks the operator a yes/no question, blocking until answered.
    ///
    /// # Errors
    ///
    /// Same as [`RunContext::request_input`].
    pub fn request_confirmation(&mut self, message: &str) -> Result<bool> {
        self.ensure_interactive()?;
        self.output.flush_pending();
        self.broker.request_confirmation(message)
    }

    fn ensure_interactive(&self) -> Result<()> {
        if self.interactive {
            Ok(())
        } else {
            Err(Error::NotInteractive(self.script_id.to_string()))
        }
    }
}

/// Code a script runs. Implemented for plain functions and closures, and by
/// [`ProcessEntryPoint`] for external commands.
pub trait EntryPoint: Send + Sync {
    /// Runs to completion on the session's worker thread.
    ///
    /// # Errors
    ///
    /// Any error fails the session; its message becomes the error line in
    /// the output.
    fn run(&self, context: &mut RunContext<'_>) -> Result<()>;
}

impl<F> EntryPoint for F
where
    F: Fn(&mut RunContext<'_>) -> Result<()> + Send + Sync,
{
    fn run(&self, context: &mut RunContext<'_>) -> Result<()> {
        self(context)
    }
}

/// Built-in entry points by name.
#[derive(Clone, Default)]
pub struct Registry {
    builtins: HashMap<String, Arc<dyn EntryPoint>>,
}

impl Debug for Registry {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&String> = self.builtins.keys().collect();
        names.sort();
        formatter.debug_struct("Registry").field("builtins", &names).finish()
    }
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, entry_point: impl EntryPoint + 'static) {
        self.builtins.insert(name.into(), Arc::new(entry_point));
    }

    /// Registers a function or closure.
    pub fn register_fn<F>(&mut self, name: impl Into<String>, function: F)
    where
        F: Fn(&mut RunContext<'_>) -> Result<()> + Send + Sync + 'static,
    {
        self.register(name, function);
    }

    #[must_use]
    pub fn with_fn<F>(mut self, name: impl Into<String>, function: F) -> Self
    where
        F: Fn(&mut RunContext<'_>) -> Result<()> + Send + Sync + 'static,
    {
        self.register_fn(name, function);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.builtins.contains_key(name)
    }

    /// Finds the code behind a descriptor's entry point.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownEntryPoint`] for an unregistered built-in.
    pub fn resolve(&self, entry_point: &EntryPointRef) -> Result<Arc<dyn EntryPoint>> {
        match entry_point {
            EntryPointRef::Builtin(name) => self
                .builtins
                .get(name)
                .cloned()
                .ok_or_else(|| Error::UnknownEntryPoint(name.clone())),
            EntryPointRef::Command(spec) => Ok(Arc::new(ProcessEntryPoint::new(spec.clone()))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broker::session_channel;
    use crate::values::values_from;
    use std::io::Write;

    fn greet(context: &mut RunContext<'_>) -> Result<()> {
        let who = context.text("who")?;
        context.print(format!("hello, {who}"));
        Ok(())
    }

    #[test]
    fn test_resolve_builtin() {
        let registry = Registry::new().with_fn("greet", greet);
        assert!(registry.contains("greet"));

        let entry_point = registry
            .resolve(&EntryPointRef::Builtin("greet".to_string()))
            .unwrap();

        let (broker, _handle) = session_channel();
        let sink = OutputSink::new();
        let values = values_from([("who", "alice")]);
        let mut context = RunContext::new("greet", &values, &sink, &broker, false);
        entry_point.run(&mut context).unwrap();

        assert_eq!(sink.drain(), vec!["hello, alice"]);
    }

    #[test]
    fn test_resolve_unknown_builtin() {
        let registry = Registry::new();
        let result = registry.resolve(&EntryPointRef::Builtin("missing".to_string()));
        assert!(matches!(result, Err(Error::UnknownEntryPoint(name)) if name == "missing"));
    }

    #[test]
    fn test_context_accessors() {
        let (broker, _handle) = session_channel();
        let sink = OutputSink::new();
        let values = values_from([("count", ParamValue::Number(3.0)), ("name", "x".into())]);
        let mut context = RunContext::new("count", &values, &sink, &broker, false);

        assert_eq!(context.number("count").unwrap(), 3.0);
        assert!(context.number("name").is_err());
        assert!(matches!(context.text("nope"), Err(Error::UnknownParameter(_))));

        writeln!(context.output(), "written").unwrap();
        assert_eq!(sink.drain(), vec!["written"]);
    }

    #[test]
    fn test_print_keeps_write_order_with_partial_line() {
        let (broker, _handle) = session_channel();
        let sink = OutputSink::new();
        let values = ParameterValues::new();
        let mut context = RunContext::new("mixed", &values, &sink, &broker, false);

        write!(context.output(), "first").unwrap();
        context.print("second");
        writeln!(context.output(), "third").unwrap();

        assert_eq!(sink.drain(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_non_interactive_script_cannot_ask() {
        let (broker, _handle) = session_channel();
        let sink = OutputSink::new();
        let values = ParameterValues::new();
        let mut context = RunContext::new("quiet", &values, &sink, &broker, false);

        assert!(matches!(
            context.request_confirmation("sure?"),
            Err(Error::NotInteractive(id)) if id == "quiet"
        ));
    }
}
