//! Libretto compiler
//!
//! Folds a parsed node sequence into a linear instruction program. The
//! only non-trivial lowering is option fusion: a maximal run of adjacent
//! option lines becomes a single choice point, so the player sees one
//! decision even when the script spells out each branch on its own line.
//! Comments terminate an option run without emitting anything, which also
//! makes them a separator between adjacent choices.

mod instruction;
mod module;

pub use instruction::{ChoiceOption, ChoiceTarget, Instruction, InstructionKind};
pub use module::Module;

use libretto_script::{Line, Node};

/// Lower `lines` to instructions. The `disposable` flag propagates to
/// every emitted instruction; modules compile with `false`, embedded-code
/// fusion at runtime passes `true`.
///
/// Accepts any node sequence; lowering itself cannot fail.
pub fn compile(lines: &[Line], disposable: bool) -> Vec<Instruction> {
    let mut instructions = Vec::with_capacity(lines.len());
    let mut pending: Vec<ChoiceOption> = Vec::new();

    for line in lines {
        match &line.node {
            Node::Option(option) => pending.push(ChoiceOption::from_line(option)),
            Node::Comment(_) => {
                if !pending.is_empty() {
                    instructions.push(fuse(&mut pending, disposable));
                }
            }
            _ => {
                if !pending.is_empty() {
                    instructions.push(fuse(&mut pending, disposable));
                }
                instructions.push(Instruction::line(line.clone(), disposable));
            }
        }
    }
    if !pending.is_empty() {
        instructions.push(fuse(&mut pending, disposable));
    }
    instructions
}

fn fuse(pending: &mut Vec<ChoiceOption>, disposable: bool) -> Instruction {
    Instruction::choice(std::mem::take(pending), false, disposable)
}
