//! Shared helpers for unit tests.

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::error::Result;
use crate::exec::{CommandOutput, CommandRunner, CommandSpec};

/// Serializes tests that touch process-wide environment variables.
pub(crate) static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Records commands instead of running them.
pub(crate) struct RecordingRunner {
    pretend: bool,
    commands: RefCell<Vec<CommandSpec>>,
    outputs: HashMap<String, CommandOutput>,
    observed_path: RefCell<Vec<Option<String>>>,
}

impl RecordingRunner {
    pub(crate) fn new(pretend: bool) -> Self {
        Self {
            pretend,
            commands: RefCell::new(Vec::new()),
            outputs: HashMap::new(),
            observed_path: RefCell::new(Vec::new()),
        }
    }

    /// Canned output for every command whose program file name is `program`.
    pub(crate) fn with_output(mut self, program: &str, output: CommandOutput) -> Self {
        self.outputs.insert(program.to_string(), output);
        self
    }

    pub(crate) fn commands(&self) -> Vec<CommandSpec> {
        self.commands.borrow().clone()
    }

    pub(crate) fn lines(&self) -> Vec<String> {
        self.commands.borrow().iter().map(ToString::to_string).collect()
    }

    /// `PATH` as it was when each command ran.
    pub(crate) fn observed_path(&self) -> Vec<Option<String>> {
        self.observed_path.borrow().clone()
    }
}

impl CommandRunner for RecordingRunner {
    fn pretend(&self) -> bool {
        self.pretend
    }

    fn run(&self, command: &CommandSpec) -> Result<CommandOutput> {
        self.commands.borrow_mut().push(command.clone());
        self.observed_path
            .borrow_mut()
            .push(std::env::var("PATH").ok());
        let program = command
            .program
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(self.outputs.get(&program).cloned().unwrap_or(CommandOutput {
            code: Some(0),
            ..Default::default()
        }))
    }
}
