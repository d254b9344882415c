//! Integration test harness for libretto.
//!
//! This crate provides utilities for end-to-end testing of the full
//! pipeline: Parse → Compile → Execute → Verify.

use std::collections::HashMap;

use libretto_compiler::Module;
use libretto_runtime::{
    BoxError, CodeEvaluator, CodeOps, Input, MemoryEnvironment, OptionsPrompt, Output, PausePoint,
    Vm,
};
use libretto_script::EmbeddedCode;

type CodeHandler = Box<dyn Fn(&mut CodeOps) -> Result<(), BoxError> + Send + Sync>;

/// Evaluator that dispatches on the trimmed body of an embedded block.
/// Production hosts run a real scripting engine; tests register closures.
#[derive(Default)]
pub struct HandlerEvaluator {
    handlers: HashMap<String, CodeHandler>,
}

impl HandlerEvaluator {
    pub fn register<F>(&mut self, body: impl Into<String>, handler: F)
    where
        F: Fn(&mut CodeOps) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.handlers.insert(body.into(), Box::new(handler));
    }
}

impl CodeEvaluator for HandlerEvaluator {
    fn eval(&self, code: &EmbeddedCode, ops: &mut CodeOps) -> Result<(), BoxError> {
        match self.handlers.get(code.content.trim()) {
            Some(handler) => handler(ops),
            None => Err(format!("no handler for embedded code {:?}", code.content).into()),
        }
    }
}

/// Test harness driving a machine over in-memory modules.
pub struct TestHarness {
    vm: Vm,
}

impl TestHarness {
    /// Harness over a single module compiled from `source`.
    ///
    /// # Panics
    ///
    /// Panics if the source does not compile.
    pub fn from_source(source: &str) -> Self {
        Self::builder().module("main", source).build()
    }

    pub fn builder() -> HarnessBuilder {
        HarnessBuilder::default()
    }

    /// Step without input; panics on a machine error.
    pub async fn next(&mut self) -> Option<Output> {
        self.vm.next_output(None).await.expect("next_output failed")
    }

    /// Step, answering the pending choice; panics on a machine error.
    pub async fn select(&mut self, index: usize) -> Option<Output> {
        let input = Input::select(index);
        self.vm
            .next_output(Some(&input))
            .await
            .expect("next_output failed")
    }

    /// Direct machine access for error-path assertions.
    pub fn vm_mut(&mut self) -> &mut Vm {
        &mut self.vm
    }
}

/// Builds a harness from modules and embedded-code handlers. The first
/// module registered is the start module.
#[derive(Default)]
pub struct HarnessBuilder {
    modules: Vec<Module>,
    evaluator: HandlerEvaluator,
}

impl HarnessBuilder {
    /// Compile `source` and register it under `path`.
    ///
    /// # Panics
    ///
    /// Panics if the source does not compile.
    pub fn module(mut self, path: &str, source: &str) -> Self {
        let module = match Module::compile(path, source) {
            Ok(module) => module,
            Err(error) => panic!("compilation of {path} failed: {error}"),
        };
        self.modules.push(module);
        self
    }

    /// Register a hand-built module (for control instructions the line
    /// grammar cannot spell).
    pub fn raw(mut self, module: Module) -> Self {
        self.modules.push(module);
        self
    }

    /// Register an embedded-code handler keyed by the block body.
    pub fn handler<F>(mut self, body: &str, handler: F) -> Self
    where
        F: Fn(&mut CodeOps) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.evaluator.register(body, handler);
        self
    }

    /// # Panics
    ///
    /// Panics if no module was registered.
    pub fn build(self) -> TestHarness {
        let mut env = MemoryEnvironment::new();
        let mut start = None;
        for module in self.modules {
            if start.is_none() {
                start = Some(module.clone());
            }
            env.insert(module);
        }
        let start = start.expect("no modules registered");
        TestHarness {
            vm: Vm::new(&start, Box::new(env), Box::new(self.evaluator)),
        }
    }
}

// =============================================================================
// Output assertions
// =============================================================================

/// The aside text of an output; panics on any other pause.
pub fn aside_text(output: &Output) -> &str {
    match &output.pause {
        PausePoint::Aside(aside) => &aside.text,
        other => panic!("expected aside pause, got {other:?}"),
    }
}

/// The dialog text of an output; panics on any other pause.
pub fn dialog_text(output: &Output) -> &str {
    match &output.pause {
        PausePoint::RoleDialog(dialog) => &dialog.dialog,
        other => panic!("expected dialog pause, got {other:?}"),
    }
}

/// The options prompt of an output; panics on any other pause.
pub fn options(output: &Output) -> &OptionsPrompt {
    match &output.pause {
        PausePoint::Options(prompt) => prompt,
        other => panic!("expected options pause, got {other:?}"),
    }
}
