//! Compiled modules
//!
//! A module pairs an immutable instruction list with the path it was
//! loaded under. The path is opaque here; only the host environment
//! interprets it. One module can be instantiated into many frames.

use std::sync::Arc;

use libretto_script::SyntaxError;

use crate::instruction::Instruction;
use crate::compile;

#[derive(Debug, Clone)]
pub struct Module {
    path: String,
    instructions: Arc<[Instruction]>,
}

impl Module {
    pub fn new(path: impl Into<String>, instructions: Vec<Instruction>) -> Self {
        Self {
            path: path.into(),
            instructions: instructions.into(),
        }
    }

    /// Parse and compile `source` into a module under `path`.
    pub fn compile(path: impl Into<String>, source: &str) -> Result<Self, SyntaxError> {
        let lines = libretto_script::parse(source)?;
        Ok(Self::new(path, compile(&lines, false)))
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Cheap handle to the instruction list, shared with frames so a
    /// same-module call can re-seed from the original program.
    pub fn shared_instructions(&self) -> Arc<[Instruction]> {
        Arc::clone(&self.instructions)
    }
}
