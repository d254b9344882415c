//! Embedded-code bridge
//!
//! Scripts can fence off blocks of host code; the runtime hands each block
//! to a host-provided evaluator together with a small instruction-emitting
//! surface. The evaluator never sees frames or the stack, only the five
//! emitters below. Everything emitted is disposable: generated control
//! flow is a one-shot computed effect, not part of the module.

use libretto_compiler::{ChoiceOption, Instruction};
use libretto_script::{EmbeddedCode, SyntaxError};

use crate::error::BoxError;

/// Host evaluation strategy for embedded code. Production hosts embed a
/// scripting runtime; tests register handlers. Evaluation is synchronous:
/// only environment operations may suspend the machine.
pub trait CodeEvaluator: Send + Sync {
    fn eval(&self, code: &EmbeddedCode, ops: &mut CodeOps) -> Result<(), BoxError>;
}

/// Instruction emitters exposed to embedded code. Collects the generated
/// program; the machine splices it into the current frame at the counter
/// once evaluation returns.
#[derive(Debug, Default)]
pub struct CodeOps {
    generated: Vec<Instruction>,
}

impl CodeOps {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and compile `source`, emitting its whole program.
    pub fn fusion(&mut self, source: &str) -> Result<(), SyntaxError> {
        let lines = libretto_script::parse(source)?;
        self.generated
            .extend(libretto_compiler::compile(&lines, true));
        Ok(())
    }

    /// Emit a jump, within the current module or into another.
    pub fn goto(&mut self, path: Option<&str>, tag: Option<&str>) {
        self.generated.push(Instruction::goto(path, tag, true));
    }

    /// Emit a call that returns here when the callee ends.
    pub fn call(&mut self, path: Option<&str>, tag: Option<&str>) {
        self.generated.push(Instruction::call(path, tag, true));
    }

    /// Emit a choice whose options each carry a block of embedded code,
    /// given as `(name, content, code_type)` tuples.
    pub fn choice<I>(&mut self, options: I)
    where
        I: IntoIterator<Item = (String, String, String)>,
    {
        let options = options
            .into_iter()
            .map(|(name, content, code_type)| ChoiceOption::from_code(name, content, code_type))
            .collect();
        self.generated.push(Instruction::choice(options, true, true));
    }

    /// Emit script termination.
    pub fn adv_end(&mut self) {
        self.generated.push(Instruction::adv_end(true));
    }

    pub(crate) fn into_instructions(self) -> Vec<Instruction> {
        self.generated
    }
}
