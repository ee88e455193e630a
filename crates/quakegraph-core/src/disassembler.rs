//! Bytecode disassembly collaborators.
//!
//! The scanner only needs text in which string constants appear quoted.
//! [`LiteralTableDisassembler`] produces that from the module's literal
//! segment without external tools; [`CommandDisassembler`] runs a configured
//! program and captures its stdout.

use std::path::Path;
use std::process::Command;

use thiserror::Error;
use tracing::debug;

use crate::formats::qvm::disassemble_literals;
use crate::formats::ExtractError;

/// Placeholder in command arguments replaced by the module path.
pub const INPUT_PLACEHOLDER: &str = "{input}";

#[derive(Debug, Error)]
pub enum DisassembleError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid module: {0}")]
    Extract(#[from] ExtractError),

    #[error("Disassembler {program:?} exited with {status}: {stderr}")]
    CommandFailed {
        program: String,
        status: String,
        stderr: String,
    },
}

/// Turns a compiled module into disassembly text.
pub trait Disassembler: Send + Sync {
    fn disassemble(&self, module: &Path) -> Result<String, DisassembleError>;
}

/// Built-in disassembler that dumps the literal segment.
#[derive(Debug, Clone, Copy, Default)]
pub struct LiteralTableDisassembler;

impl Disassembler for LiteralTableDisassembler {
    fn disassemble(&self, module: &Path) -> Result<String, DisassembleError> {
        let bytes = std::fs::read(module)?;
        Ok(disassemble_literals(&bytes)?)
    }
}

/// Runs an external program; its stdout is the disassembly.
#[derive(Debug, Clone)]
pub struct CommandDisassembler {
    program: String,
    args: Vec<String>,
}

impl CommandDisassembler {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Arguments for one module. `{input}` is substituted; without a
    /// placeholder the path is appended.
    fn args_for(&self, module: &Path) -> Vec<String> {
        let input = module.to_string_lossy();
        if self.args.iter().any(|a| a.contains(INPUT_PLACEHOLDER)) {
            self.args
                .iter()
                .map(|a| a.replace(INPUT_PLACEHOLDER, &input))
                .collect()
        } else {
            let mut args = self.args.clone();
            args.push(input.into_owned());
            args
        }
    }
}

impl Disassembler for CommandDisassembler {
    fn disassemble(&self, module: &Path) -> Result<String, DisassembleError> {
        let args = self.args_for(module);
        debug!("Running {} {:?}", self.program, args);
        let output = Command::new(&self.program).args(&args).output()?;
        if !output.status.success() {
            return Err(DisassembleError::CommandFailed {
                program: self.program.clone(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
