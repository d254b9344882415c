//! Node model for libretto scripts
//!
//! These types represent the parsed structure of a script, one node per
//! source line. Nodes are immutable once produced; the runtime reads them
//! but never rewrites them.

use serde::{Deserialize, Serialize};

/// One parsed source line: the node plus layout metadata.
///
/// `indent` and `blank_before` are produced by the parser and carried
/// through untouched; the runtime does not consume them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub node: Node,
    /// 1-based source line number; 0 for synthesized lines.
    pub number: usize,
    /// Leading whitespace width of the source line.
    pub indent: usize,
    /// Count of blank lines immediately preceding this one.
    pub blank_before: usize,
}

impl Line {
    pub fn new(node: Node, number: usize) -> Self {
        Self {
            node,
            number,
            indent: 0,
            blank_before: 0,
        }
    }

    /// A line that has no source position (e.g. produced at runtime).
    pub fn synthetic(node: Node) -> Self {
        Self::new(node, 0)
    }
}

/// A parsed script line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    /// Narration without a speaker.
    Aside(Aside),
    /// A speaking character line.
    RoleDialog(RoleDialog),
    /// A character changing expression without speaking.
    RoleExpression(RoleExpression),
    /// `name + target` / `name | target` stage direction.
    RoleOperation(RoleOperation),
    /// `& + content` / `& - content` scene change.
    Scene(Scene),
    /// `@ path` full-screen image.
    InsertedImage(InsertedImage),
    /// `! func(a, b)` call into the host.
    FunctionCalling(FunctionCalling),
    /// Fenced block of host code.
    EmbeddedCode(EmbeddedCode),
    /// `? name -> file @ tag` branch choice.
    Option(OptionLine),
    /// `* label` jump target.
    JumpPoint(JumpPoint),
    /// `// text`, dropped during compilation.
    Comment(Comment),
}

impl Node {
    /// Stable snake_case name of the node kind, used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Node::Aside(_) => "aside",
            Node::RoleDialog(_) => "role_dialog",
            Node::RoleExpression(_) => "role_expression",
            Node::RoleOperation(_) => "role_operation",
            Node::Scene(_) => "scene",
            Node::InsertedImage(_) => "inserted_image",
            Node::FunctionCalling(_) => "function_calling",
            Node::EmbeddedCode(_) => "embedded_code",
            Node::Option(_) => "option",
            Node::JumpPoint(_) => "jump_point",
            Node::Comment(_) => "comment",
        }
    }
}

// =============================================================================
// Statement payloads
// =============================================================================

/// Narration text shown without a speaker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aside {
    pub text: String,
}

/// A dialog line. Any field but `name` and `dialog` may be empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleDialog {
    pub name: String,
    pub alias: String,
    pub effect: String,
    pub expression: String,
    pub dialog: String,
}

/// A character presentation change with no dialog attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleExpression {
    pub name: String,
    pub alias: String,
    pub effect: String,
    pub expression: String,
}

/// Stage direction applied to a character.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleOperation {
    pub role_name: String,
    pub operator: RoleOperator,
    pub target: String,
}

/// `+` attaches the target to the role, `|` swaps it in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoleOperator {
    #[serde(rename = "+")]
    Attach,
    #[serde(rename = "|")]
    Swap,
}

impl RoleOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoleOperator::Attach => "+",
            RoleOperator::Swap => "|",
        }
    }
}

/// Scene change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub operator: SceneOperator,
    pub content: String,
}

/// `+` enters the named scene, `-` leaves it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SceneOperator {
    #[serde(rename = "+")]
    Enter,
    #[serde(rename = "-")]
    Exit,
}

impl SceneOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            SceneOperator::Enter => "+",
            SceneOperator::Exit => "-",
        }
    }
}

/// Full-screen image insertion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsertedImage {
    pub path: String,
}

/// A host function invocation written in the script.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCalling {
    /// The source line as written, for host-side diagnostics.
    pub original_text: String,
    pub function: String,
    pub parameters: Vec<String>,
}

/// A fenced block of host code, evaluated at runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddedCode {
    /// Language tag on the opening fence; may be empty.
    pub code_type: String,
    pub content: String,
}

// =============================================================================
// Control payloads
// =============================================================================

/// One branch choice. A missing `file` targets the current module; a
/// missing `location` targets the module start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionLine {
    pub name: String,
    pub file: Option<String>,
    pub location: Option<String>,
}

/// A named jump target, inert during linear execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JumpPoint {
    pub label: String,
}

/// Source comment. Terminates an option run during compilation, otherwise
/// discarded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub text: String,
}
