//! Instruction model
//!
//! The executable units the runtime steps through. Statement nodes are
//! wrapped as-is; control flow (choices, calls, gotos, termination) is
//! synthesized by the compiler or by embedded code at runtime.

use libretto_script::{Line, OptionLine};

/// One executable unit plus its lifetime policy.
///
/// A disposable instruction is removed from its frame after exactly one
/// execution; non-disposable instructions stay in place and run again on
/// re-entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    pub kind: InstructionKind,
    pub disposable: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum InstructionKind {
    /// A statement node executed for its output effect.
    Line(Line),
    /// A user decision point. `from_code` marks choices synthesized by
    /// embedded code; renderers may care, dispatch does not.
    Choice {
        options: Vec<ChoiceOption>,
        from_code: bool,
    },
    /// Push a new frame for the target module and jump to `tag`.
    Call {
        path: Option<String>,
        tag: Option<String>,
    },
    /// Jump within the current frame, or replace it for another module.
    Goto {
        path: Option<String>,
        tag: Option<String>,
    },
    /// Terminate the whole script.
    AdvEnd,
}

impl Instruction {
    pub fn new(kind: InstructionKind, disposable: bool) -> Self {
        Self { kind, disposable }
    }

    pub fn line(line: Line, disposable: bool) -> Self {
        Self::new(InstructionKind::Line(line), disposable)
    }

    pub fn choice(options: Vec<ChoiceOption>, from_code: bool, disposable: bool) -> Self {
        Self::new(InstructionKind::Choice { options, from_code }, disposable)
    }

    pub fn call(path: Option<&str>, tag: Option<&str>, disposable: bool) -> Self {
        Self::new(
            InstructionKind::Call {
                path: path.map(str::to_string),
                tag: tag.map(str::to_string),
            },
            disposable,
        )
    }

    pub fn goto(path: Option<&str>, tag: Option<&str>, disposable: bool) -> Self {
        Self::new(
            InstructionKind::Goto {
                path: path.map(str::to_string),
                tag: tag.map(str::to_string),
            },
            disposable,
        )
    }

    pub fn adv_end(disposable: bool) -> Self {
        Self::new(InstructionKind::AdvEnd, disposable)
    }

    /// Stable name of this instruction kind for diagnostics. Statement
    /// instructions report their node kind.
    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            InstructionKind::Line(line) => line.node.kind(),
            InstructionKind::Choice { .. } => "choice",
            InstructionKind::Call { .. } => "call",
            InstructionKind::Goto { .. } => "goto",
            InstructionKind::AdvEnd => "adv_end",
        }
    }
}

/// One selectable entry of a choice.
#[derive(Debug, Clone, PartialEq)]
pub struct ChoiceOption {
    pub name: String,
    pub target: ChoiceTarget,
}

/// What selecting an option does.
#[derive(Debug, Clone, PartialEq)]
pub enum ChoiceTarget {
    /// Call into `path` (current module when `None`/empty) at `tag`
    /// (module start when `None`).
    Jump {
        path: Option<String>,
        tag: Option<String>,
    },
    /// Evaluate a block of embedded host code.
    Code { content: String, code_type: String },
}

impl ChoiceOption {
    /// Option produced from a parsed `? name -> file @ tag` line.
    pub fn from_line(option: &OptionLine) -> Self {
        Self {
            name: option.name.clone(),
            target: ChoiceTarget::Jump {
                path: option.file.clone(),
                tag: option.location.clone(),
            },
        }
    }

    /// Option whose selection evaluates embedded code.
    pub fn from_code(name: impl Into<String>, content: impl Into<String>, code_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target: ChoiceTarget::Code {
                content: content.into(),
                code_type: code_type.into(),
            },
        }
    }
}
