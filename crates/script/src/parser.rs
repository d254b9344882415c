//! Line classifier for libretto scripts
//!
//! Scripts are line-oriented: every non-blank line outside a code fence is
//! exactly one node. Classification is first-match-wins on the line prefix;
//! role lines are disambiguated by regex, and anything unclaimed is an
//! aside. Blank lines and leading indentation are recorded on the next
//! node but carry no meaning here.

use std::sync::LazyLock;

use regex::Regex;

use crate::ast::{
    Aside, Comment, EmbeddedCode, FunctionCalling, InsertedImage, JumpPoint, Line, Node,
    OptionLine, RoleDialog, RoleExpression, RoleOperation, RoleOperator, Scene, SceneOperator,
};
use crate::error::SyntaxError;

static ROLE_OPERATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<role>[^\s+|]+)\s+(?P<op>[+|])\s+(?P<target>\S.*)$").unwrap()
});

static ROLE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"^(?P<name>[^\s:(){}]+)",
        r"(?:\s+as\s+(?P<alias>\S+))?",
        r"(?:\s*\((?P<expression>[^)]*)\))?",
        r"(?:\s*\{(?P<effect>[^}]*)\})?",
        r"\s*(?::(?P<dialog>.*))?$",
    ))
    .unwrap()
});

static FUNCTION_CALL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?P<function>[A-Za-z_][A-Za-z0-9_.]*)\s*\((?P<args>.*)\)$").unwrap());

/// An open code fence waiting for its closing line.
struct Fence {
    code_type: String,
    body: String,
    number: usize,
    indent: usize,
    blank_before: usize,
}

/// Parse a script into lines, one node per non-blank source line.
pub fn parse(source: &str) -> Result<Vec<Line>, SyntaxError> {
    let mut lines = Vec::new();
    let mut blank_before = 0usize;
    let mut fence: Option<Fence> = None;

    for (index, raw) in source.lines().enumerate() {
        let number = index + 1;

        if let Some(mut open) = fence.take() {
            if raw.trim() == "```" {
                lines.push(Line {
                    node: Node::EmbeddedCode(EmbeddedCode {
                        code_type: open.code_type,
                        content: open.body,
                    }),
                    number: open.number,
                    indent: open.indent,
                    blank_before: open.blank_before,
                });
            } else {
                if !open.body.is_empty() {
                    open.body.push('\n');
                }
                open.body.push_str(raw);
                fence = Some(open);
            }
            continue;
        }

        let rest = raw.trim_start();
        let indent = raw.len() - rest.len();
        let text = rest.trim_end();

        if text.is_empty() {
            blank_before += 1;
            continue;
        }

        if let Some(tag) = text.strip_prefix("```") {
            fence = Some(Fence {
                code_type: tag.trim().to_string(),
                body: String::new(),
                number,
                indent,
                blank_before: std::mem::take(&mut blank_before),
            });
            continue;
        }

        lines.push(Line {
            node: classify(text, number)?,
            number,
            indent,
            blank_before: std::mem::take(&mut blank_before),
        });
    }

    if let Some(open) = fence {
        return Err(SyntaxError::UnclosedFence { line: open.number });
    }
    Ok(lines)
}

fn classify(text: &str, line: usize) -> Result<Node, SyntaxError> {
    if let Some(rest) = text.strip_prefix("//") {
        return Ok(Node::Comment(Comment {
            text: rest.trim().to_string(),
        }));
    }
    if let Some(rest) = text.strip_prefix('*') {
        let label = rest.trim();
        if label.is_empty() {
            return Err(SyntaxError::EmptyLabel { line });
        }
        return Ok(Node::JumpPoint(JumpPoint {
            label: label.to_string(),
        }));
    }
    if let Some(rest) = text.strip_prefix('?') {
        return parse_option(rest, line);
    }
    if let Some(rest) = text.strip_prefix('!') {
        return parse_function_call(text, rest, line);
    }
    if let Some(rest) = text.strip_prefix('&') {
        return parse_scene(rest, line);
    }
    if let Some(rest) = text.strip_prefix('@') {
        let path = rest.trim();
        if path.is_empty() {
            return Err(SyntaxError::EmptyImagePath { line });
        }
        return Ok(Node::InsertedImage(InsertedImage {
            path: path.to_string(),
        }));
    }

    if let Some(captures) = ROLE_OPERATION.captures(text) {
        let operator = match &captures["op"] {
            "+" => RoleOperator::Attach,
            _ => RoleOperator::Swap,
        };
        return Ok(Node::RoleOperation(RoleOperation {
            role_name: captures["role"].to_string(),
            operator,
            target: captures["target"].trim().to_string(),
        }));
    }

    if let Some(captures) = ROLE_LINE.captures(text) {
        let alias = captures.name("alias");
        let expression = captures.name("expression");
        let effect = captures.name("effect");
        let dialog = captures.name("dialog");
        // A bare word with none of the optional parts is narration, not a
        // silent character.
        if dialog.is_some() || alias.is_some() || expression.is_some() || effect.is_some() {
            let name = captures["name"].to_string();
            let alias = alias.map(|m| m.as_str().to_string()).unwrap_or_default();
            let expression = expression.map(|m| m.as_str().to_string()).unwrap_or_default();
            let effect = effect.map(|m| m.as_str().to_string()).unwrap_or_default();
            return Ok(match dialog {
                Some(dialog) => Node::RoleDialog(RoleDialog {
                    name,
                    alias,
                    effect,
                    expression,
                    dialog: dialog.as_str().trim().to_string(),
                }),
                None => Node::RoleExpression(RoleExpression {
                    name,
                    alias,
                    effect,
                    expression,
                }),
            });
        }
    }

    Ok(Node::Aside(Aside {
        text: text.to_string(),
    }))
}

fn parse_option(rest: &str, line: usize) -> Result<Node, SyntaxError> {
    let name;
    let mut file = None;
    let mut location = None;

    match rest.split_once("->") {
        Some((head, target)) => {
            name = head.trim();
            match target.split_once('@') {
                Some((f, tag)) => {
                    let f = f.trim();
                    let tag = tag.trim();
                    if f.is_empty() {
                        return Err(SyntaxError::EmptyOptionFile { line });
                    }
                    if tag.is_empty() {
                        return Err(SyntaxError::EmptyOptionTag { line });
                    }
                    file = Some(f.to_string());
                    location = Some(tag.to_string());
                }
                None => {
                    let f = target.trim();
                    if f.is_empty() {
                        return Err(SyntaxError::EmptyOptionFile { line });
                    }
                    file = Some(f.to_string());
                }
            }
        }
        None => match rest.split_once('@') {
            Some((head, tag)) => {
                name = head.trim();
                let tag = tag.trim();
                if tag.is_empty() {
                    return Err(SyntaxError::EmptyOptionTag { line });
                }
                location = Some(tag.to_string());
            }
            None => name = rest.trim(),
        },
    }

    if name.is_empty() {
        return Err(SyntaxError::EmptyOptionName { line });
    }
    Ok(Node::Option(OptionLine {
        name: name.to_string(),
        file,
        location,
    }))
}

fn parse_function_call(original: &str, rest: &str, line: usize) -> Result<Node, SyntaxError> {
    let Some(captures) = FUNCTION_CALL.captures(rest.trim()) else {
        return Err(SyntaxError::MalformedFunctionCall {
            line,
            text: original.to_string(),
        });
    };
    let args = &captures["args"];
    let parameters = if args.trim().is_empty() {
        Vec::new()
    } else {
        args.split(',').map(|a| a.trim().to_string()).collect()
    };
    Ok(Node::FunctionCalling(FunctionCalling {
        original_text: original.to_string(),
        function: captures["function"].to_string(),
        parameters,
    }))
}

fn parse_scene(rest: &str, line: usize) -> Result<Node, SyntaxError> {
    let rest = rest.trim_start();
    let (operator, content) = match rest.strip_prefix('+') {
        Some(content) => (SceneOperator::Enter, content),
        None => match rest.strip_prefix('-') {
            Some(content) => (SceneOperator::Exit, content),
            None => return Err(SyntaxError::MalformedScene { line }),
        },
    };
    Ok(Node::Scene(Scene {
        operator,
        content: content.trim().to_string(),
    }))
}
