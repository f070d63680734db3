//! External command description and result

use std::fmt;

/// Whether running a command changes host state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// Query only; executed even in dry-run mode
    ReadOnly,
    /// Changes host state; skipped in dry-run mode
    Mutating,
}

/// A fully specified external command
///
/// Commands are always executed directly, never through a shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
    pub effect: Effect,
    /// Inherit stdin and stderr so the operator can answer prompts;
    /// stdout is still captured
    pub interactive: bool,
}

impl CommandLine {
    pub fn new<I, S>(program: &str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.to_string(),
            args: args.into_iter().map(Into::into).collect(),
            env: Vec::new(),
            effect: Effect::Mutating,
            interactive: false,
        }
    }

    /// Same as `new`, but marked as a read-only probe
    pub fn probe<I, S>(program: &str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            effect: Effect::ReadOnly,
            ..Self::new(program, args)
        }
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.env.push((key.to_string(), value.to_string()));
        self
    }

    pub fn interactive(mut self) -> Self {
        self.interactive = true;
        self
    }

    pub fn is_mutating(&self) -> bool {
        self.effect == Effect::Mutating
    }

    /// Whether `name` appears as the program or any argument
    pub fn mentions(&self, name: &str) -> bool {
        self.program == name || self.args.iter().any(|arg| arg == name)
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Outcome of running a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit status; `-1` when the process was killed by a signal
    pub status: i32,
    pub stdout: String,
    pub stderr: String,
    /// True when the command was not executed (dry run)
    pub synthetic: bool,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == 0
    }

    pub fn synthetic_success() -> Self {
        Self {
            status: 0,
            stdout: String::new(),
            stderr: String::new(),
            synthetic: true,
        }
    }
}
