//! Script virtual machine
//!
//! A stack of frames driven one step at a time. Each `next_output` call
//! first consumes a pending choice (if any), then executes instructions
//! until something pauses (narration, dialog, an image, a new choice) or
//! the stack drains. Instructions advance *before* their effect is
//! applied, so jumps and splices index into the already-updated working
//! list.
//!
//! The machine is single-threaded and cooperative: hosts must serialise
//! calls, and only environment operations suspend.

use indexmap::IndexMap;
use tracing::{debug, instrument, trace};

use libretto_compiler::{ChoiceOption, ChoiceTarget, Instruction, InstructionKind, Module};
use libretto_script::{
    EmbeddedCode, FunctionCalling, Line, Node, RoleExpression, RoleOperation, Scene,
};

use crate::env::Environment;
use crate::error::{Error, Result};
use crate::eval::{CodeEvaluator, CodeOps};
use crate::frame::Frame;
use crate::output::{Input, OptionsPrompt, Output, PausePoint};

pub struct Vm {
    stack: Vec<Frame>,
    pending: Option<Vec<ChoiceOption>>,
    env: Box<dyn Environment>,
    evaluator: Box<dyn CodeEvaluator>,
}

/// Per-step accumulator. Converted into an `Output` only when a pause was
/// reached; a drained stack discards it.
#[derive(Default)]
struct StepOutput {
    pause: Option<PausePoint>,
    function_callings: IndexMap<String, FunctionCalling>,
    role_operation: Option<RoleOperation>,
    role_expression: Option<RoleExpression>,
    scene: Option<Scene>,
}

impl StepOutput {
    fn finish(self) -> Option<Output> {
        let pause = self.pause?;
        Some(Output {
            pause,
            function_callings: self.function_callings,
            role_operation: self.role_operation,
            role_expression: self.role_expression,
            scene: self.scene,
        })
    }
}

impl Vm {
    pub fn new(start: &Module, env: Box<dyn Environment>, evaluator: Box<dyn CodeEvaluator>) -> Self {
        debug!(path = start.path(), "vm created");
        Self {
            stack: vec![Frame::new(start)],
            pending: None,
            env,
            evaluator,
        }
    }

    /// Number of live frames.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Run to the next pause point. Returns `None` once the script has
    /// terminated; every `Some` output carries exactly one pause point.
    ///
    /// After an options pause the next call must supply the selected
    /// index via `input`.
    #[instrument(skip_all, fields(depth = self.stack.len()))]
    pub async fn next_output(&mut self, input: Option<&Input>) -> Result<Option<Output>> {
        self.consume_pending(input)?;

        while self.stack.last().is_some_and(Frame::is_ended) {
            self.stack.pop();
        }
        if self.stack.is_empty() {
            return Ok(None);
        }

        let mut step = StepOutput::default();
        while step.pause.is_none() {
            let Some(frame) = self.stack.last_mut() else {
                break;
            };
            if frame.is_ended() {
                self.stack.pop();
                continue;
            }
            let Some(instruction) = frame.current().cloned() else {
                self.stack.pop();
                continue;
            };
            frame.advance();
            self.execute(instruction, &mut step).await?;
        }
        Ok(step.finish())
    }

    /// Same contract as [`next_output`](Self::next_output) for callers
    /// that cannot await: blocks the calling thread and hands the result
    /// to `callback`.
    pub fn next_output_callback<F>(&mut self, input: Option<&Input>, callback: F)
    where
        F: FnOnce(Result<Option<Output>>),
    {
        callback(futures::executor::block_on(self.next_output(input)));
    }

    /// Phase one: turn the previously returned options pause into a
    /// spliced one-shot instruction at the current frame's counter.
    fn consume_pending(&mut self, input: Option<&Input>) -> Result<()> {
        let Some(options) = self.pending.as_ref() else {
            return Ok(());
        };
        let input = input.ok_or(Error::MissingInput)?;
        let index = input.option_index.ok_or(Error::NullOptionIndex)?;
        let option = options.get(index).ok_or(Error::OptionIndexOutOfRange {
            index,
            len: options.len(),
        })?;

        let instruction = match &option.target {
            ChoiceTarget::Jump { path, tag } => Instruction::call(path.as_deref(), tag.as_deref(), true),
            ChoiceTarget::Code { content, code_type } => Instruction::new(
                InstructionKind::Line(Line::synthetic(Node::EmbeddedCode(EmbeddedCode {
                    code_type: code_type.clone(),
                    content: content.clone(),
                }))),
                true,
            ),
        };
        debug!(index, name = %option.name, "choice consumed");
        if let Some(frame) = self.stack.last_mut() {
            frame.insert(vec![instruction]);
        }
        self.pending = None;
        Ok(())
    }

    async fn execute(&mut self, instruction: Instruction, step: &mut StepOutput) -> Result<()> {
        trace!(kind = instruction.kind_name(), "execute");
        match instruction.kind {
            InstructionKind::Line(line) => self.execute_line(line, step)?,
            InstructionKind::Choice { options, from_code } => {
                step.pause = Some(PausePoint::Options(OptionsPrompt {
                    names: options.iter().map(|o| o.name.clone()).collect(),
                    from_code,
                }));
                self.pending = Some(options);
            }
            InstructionKind::Call { path, tag } => self.enter_call(path, tag).await?,
            InstructionKind::Goto { path, tag } => self.enter_goto(path, tag).await?,
            InstructionKind::AdvEnd => {
                debug!("adv_end, clearing stack");
                self.stack.clear();
            }
        }
        Ok(())
    }

    fn execute_line(&mut self, line: Line, step: &mut StepOutput) -> Result<()> {
        match line.node {
            Node::Aside(aside) => step.pause = Some(PausePoint::Aside(aside)),
            Node::RoleDialog(dialog) => step.pause = Some(PausePoint::RoleDialog(dialog)),
            Node::InsertedImage(image) => step.pause = Some(PausePoint::InsertedImage(image)),
            Node::RoleExpression(expression) => step.role_expression = Some(expression),
            Node::RoleOperation(operation) => step.role_operation = Some(operation),
            Node::Scene(scene) => step.scene = Some(scene),
            Node::FunctionCalling(call) => {
                step.function_callings.insert(call.function.clone(), call);
            }
            Node::EmbeddedCode(code) => {
                let mut ops = CodeOps::new();
                self.evaluator.eval(&code, &mut ops).map_err(Error::Eval)?;
                let generated = ops.into_instructions();
                if !generated.is_empty() {
                    trace!(count = generated.len(), "embedded code spliced");
                    if let Some(frame) = self.stack.last_mut() {
                        frame.insert(generated);
                    }
                }
            }
            // Labels are inert outside of jumps.
            Node::JumpPoint(_) => {}
            node @ (Node::Option(_) | Node::Comment(_)) => {
                return Err(Error::UnknownInstruction {
                    kind: node.kind().to_string(),
                });
            }
        }
        Ok(())
    }

    async fn enter_call(&mut self, path: Option<String>, tag: Option<String>) -> Result<()> {
        let Some(current_path) = self.current_path() else {
            return Ok(());
        };
        if self.same_module(path.as_deref(), &current_path).await? {
            debug!(tag = ?tag, "call within module");
            let Some(frame) = self.stack.last() else {
                return Ok(());
            };
            let fresh = Frame::from_same_module(frame);
            self.stack.push(fresh);
        } else {
            let target = path.unwrap_or_default();
            debug!(path = %target, tag = ?tag, "call across modules");
            let module = self.load(&target, &current_path).await?;
            self.stack.push(Frame::new(&module));
        }
        if let Some(frame) = self.stack.last_mut() {
            frame.jump(tag.as_deref())?;
        }
        Ok(())
    }

    async fn enter_goto(&mut self, path: Option<String>, tag: Option<String>) -> Result<()> {
        let Some(current_path) = self.current_path() else {
            return Ok(());
        };
        if self.same_module(path.as_deref(), &current_path).await? {
            debug!(tag = ?tag, "goto within module");
        } else {
            let target = path.unwrap_or_default();
            debug!(path = %target, tag = ?tag, "goto across modules");
            let module = self.load(&target, &current_path).await?;
            self.stack.pop();
            self.stack.push(Frame::new(&module));
        }
        if let Some(frame) = self.stack.last_mut() {
            frame.jump(tag.as_deref())?;
        }
        Ok(())
    }

    fn current_path(&self) -> Option<String> {
        self.stack.last().map(|f| f.module_path().to_string())
    }

    async fn same_module(&self, path: Option<&str>, current: &str) -> Result<bool> {
        match path {
            None => Ok(true),
            Some(p) if p.is_empty() => Ok(true),
            Some(p) => self
                .env
                .module_path_equals(p, current)
                .await
                .map_err(Error::Environment),
        }
    }

    async fn load(&self, target: &str, current: &str) -> Result<Module> {
        self.env
            .load_module(target, current)
            .await
            .map_err(Error::Environment)
    }
}
