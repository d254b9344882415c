//! Host-visible outputs
//!
//! One `Output` per machine step: exactly one pause point plus whatever
//! side effects accumulated on the way there. Within a step, later
//! occurrences win: wholesale for the singleton fields, per name for
//! function callings.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use libretto_script::{
    Aside, FunctionCalling, InsertedImage, RoleDialog, RoleExpression, RoleOperation, Scene,
};

/// Why the machine returned to the host.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum PausePoint {
    Aside(Aside),
    RoleDialog(RoleDialog),
    InsertedImage(InsertedImage),
    Options(OptionsPrompt),
}

/// A choice waiting on the player. The next `next_output` call must carry
/// the selected index.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptionsPrompt {
    pub names: Vec<String>,
    /// Whether the choice was synthesized by embedded code; renderers may
    /// present such choices differently.
    pub from_code: bool,
}

/// One step's worth of observable effects.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Output {
    pub pause: PausePoint,
    /// Host calls accumulated this step, keyed by function name.
    pub function_callings: IndexMap<String, FunctionCalling>,
    pub role_operation: Option<RoleOperation>,
    pub role_expression: Option<RoleExpression>,
    pub scene: Option<Scene>,
}

/// Host feedback consumed when a choice is pending.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Input {
    pub option_index: Option<usize>,
}

impl Input {
    pub fn select(index: usize) -> Self {
        Self {
            option_index: Some(index),
        }
    }
}
