//! Call frames
//!
//! A frame is one activation of a module: an independently-owned working
//! copy of the module's program, a program counter, and a shared handle to
//! the pristine instruction list. The working copy mutates as the frame
//! runs (disposable removal, splices from choices and embedded code); the
//! pristine list never does, so a same-module call can start from the
//! program as originally compiled.

use std::sync::Arc;

use tracing::trace;

use libretto_compiler::{Instruction, InstructionKind, Module};
use libretto_script::Node;

use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct Frame {
    module_path: String,
    program: Vec<Instruction>,
    pristine: Arc<[Instruction]>,
    pc: usize,
}

impl Frame {
    pub fn new(module: &Module) -> Self {
        Self {
            module_path: module.path().to_string(),
            program: module.instructions().to_vec(),
            pristine: module.shared_instructions(),
            pc: 0,
        }
    }

    /// A fresh activation of the same module, seeded from the pristine
    /// program rather than `other`'s possibly-mutated working copy.
    pub fn from_same_module(other: &Frame) -> Self {
        Self {
            module_path: other.module_path.clone(),
            program: other.pristine.to_vec(),
            pristine: Arc::clone(&other.pristine),
            pc: 0,
        }
    }

    pub fn module_path(&self) -> &str {
        &self.module_path
    }

    pub fn pc(&self) -> usize {
        self.pc
    }

    pub fn is_ended(&self) -> bool {
        self.pc >= self.program.len()
    }

    pub fn current(&self) -> Option<&Instruction> {
        self.program.get(self.pc)
    }

    /// Move past the current instruction. Disposable instructions are
    /// removed in place, leaving the counter pointing at their successor.
    pub fn advance(&mut self) {
        match self.program.get(self.pc) {
            Some(instruction) if instruction.disposable => {
                self.program.remove(self.pc);
            }
            Some(_) => self.pc += 1,
            None => {}
        }
    }

    /// Set the counter to a jump point. `None` targets the module start.
    ///
    /// The scan walks the current working list on every call rather than a
    /// precomputed label table: disposable removal and splices shift
    /// indices, so a label's position is only meaningful at jump time.
    pub fn jump(&mut self, tag: Option<&str>) -> Result<()> {
        let Some(tag) = tag else {
            self.pc = 0;
            return Ok(());
        };
        match self.program.iter().position(|i| is_jump_point(i, tag)) {
            Some(index) => {
                trace!(tag, index, "jump");
                self.pc = index;
                Ok(())
            }
            None => Err(Error::JumpNotFound {
                tag: tag.to_string(),
            }),
        }
    }

    /// Splice `instructions` into the working program at the counter,
    /// shifting everything from the counter onward to the right.
    pub fn insert(&mut self, instructions: Vec<Instruction>) {
        self.program.splice(self.pc..self.pc, instructions);
    }
}

fn is_jump_point(instruction: &Instruction, tag: &str) -> bool {
    match &instruction.kind {
        InstructionKind::Line(line) => {
            matches!(&line.node, Node::JumpPoint(point) if point.label == tag)
        }
        _ => false,
    }
}
