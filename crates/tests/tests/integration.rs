//! Integration tests for end-to-end libretto execution.
//!
//! These tests drive the full pipeline:
//! Parse → Compile → Execute → Verify,
//! feeding selections back in after every options pause.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use libretto_compiler::{Instruction, Module};
use libretto_runtime::{Error, Input, PausePoint};
use libretto_tests::{aside_text, dialog_text, options, TestHarness};

/// A statement instruction built from one source line, for modules that
/// need control instructions the line grammar cannot spell.
fn statement(source: &str) -> Instruction {
    let line = libretto_script::parse(source)
        .expect("parse failed")
        .remove(0);
    Instruction::line(line, false)
}

/// Two narration lines pause twice, then the script ends.
#[tokio::test]
async fn test_linear_narration() {
    let mut harness = TestHarness::from_source("hi\nbye");

    assert_eq!(aside_text(&harness.next().await.unwrap()), "hi");
    assert_eq!(aside_text(&harness.next().await.unwrap()), "bye");
    assert!(harness.next().await.is_none());
}

/// Adjacent options fuse into one prompt; selecting one calls into the
/// pristine program at the option's label. The spliced call returns, so
/// the caller then walks the remaining branch content linearly.
#[tokio::test]
async fn test_choice_fusion_and_selection() {
    let source = "\
? A -> m @ t1
? B -> m @ t2
* t1
a1
* t2
a2";
    let mut harness = TestHarness::builder().module("m", source).build();

    let prompt = harness.next().await.unwrap();
    assert_eq!(options(&prompt).names, vec!["A", "B"]);
    assert!(!options(&prompt).from_code);

    // The selected branch runs in a fresh frame seeded at its label.
    assert_eq!(aside_text(&harness.select(1).await.unwrap()), "a2");

    // The callee frame ended; the caller resumes just past the choice.
    assert_eq!(aside_text(&harness.next().await.unwrap()), "a1");
    assert_eq!(aside_text(&harness.next().await.unwrap()), "a2");
    assert!(harness.next().await.is_none());
}

/// A cross-module goto replaces the current frame rather than stacking a
/// new one: nothing of the start module survives the jump.
#[tokio::test]
async fn test_cross_module_goto_replaces_frame() {
    let start = Module::new(
        "start",
        vec![
            Instruction::goto(Some("other"), None, false),
            statement("never shown"),
        ],
    );
    let mut harness = TestHarness::builder()
        .raw(start)
        .module("other", "x")
        .build();

    assert_eq!(aside_text(&harness.next().await.unwrap()), "x");
    assert_eq!(harness.vm_mut().depth(), 1);
    assert!(harness.next().await.is_none());
}

/// A call pushes; when the callee ends, the caller resumes after the call
/// site.
#[tokio::test]
async fn test_cross_module_call_returns() {
    let start = Module::new(
        "start",
        vec![
            Instruction::call(Some("lib"), Some("greet"), false),
            statement("back"),
        ],
    );
    let mut harness = TestHarness::builder()
        .raw(start)
        .module("lib", "* greet\nhello from lib")
        .build();

    assert_eq!(aside_text(&harness.next().await.unwrap()), "hello from lib");
    assert_eq!(aside_text(&harness.next().await.unwrap()), "back");
    assert!(harness.next().await.is_none());
}

/// adv_end reached inside a callee clears the whole stack mid-step: the
/// very first output is already the end of the script.
#[tokio::test]
async fn test_adv_end_under_call() {
    let start = Module::new(
        "start",
        vec![
            Instruction::call(None, Some("t"), false),
            statement("never"),
            statement("* t"),
            Instruction::adv_end(false),
        ],
    );
    let mut harness = TestHarness::builder().raw(start).build();

    assert!(harness.next().await.is_none());
    assert_eq!(harness.vm_mut().depth(), 0);
}

/// Embedded code fusing a script splices its program at the counter; the
/// injected statements run on the same step with no extra pause.
#[tokio::test]
async fn test_embedded_fusion() {
    let source = "\
```js
inject
```";
    let mut harness = TestHarness::builder()
        .module("main", source)
        .handler("inject", |ops| {
            ops.fusion("a\nb")?;
            Ok(())
        })
        .build();

    assert_eq!(aside_text(&harness.next().await.unwrap()), "a");
    assert_eq!(aside_text(&harness.next().await.unwrap()), "b");
    assert!(harness.next().await.is_none());
}

/// An embedded goto re-resolves its label against the mutated working
/// list every round, so a loop shape keeps finding the jump point even
/// after disposable splices shifted it.
#[tokio::test]
async fn test_embedded_goto_loop_reresolves_labels() {
    let source = "\
* L
x
```js
loop
```";
    let rounds = Arc::new(AtomicUsize::new(0));
    let handler_rounds = Arc::clone(&rounds);
    let mut harness = TestHarness::builder()
        .module("main", source)
        .handler("loop", move |ops| {
            if handler_rounds.fetch_add(1, Ordering::SeqCst) < 2 {
                ops.fusion("y")?;
                ops.goto(None, Some("L"));
            } else {
                ops.adv_end();
            }
            Ok(())
        })
        .build();

    let mut seen = Vec::new();
    while let Some(output) = harness.next().await {
        seen.push(aside_text(&output).to_string());
    }
    assert_eq!(seen, vec!["x", "y", "x", "y", "x"]);
    assert_eq!(rounds.load(Ordering::SeqCst), 3);
}

/// A choice synthesized by embedded code carries code bodies as targets;
/// selecting one evaluates that body on the next step.
#[tokio::test]
async fn test_embedded_choice_selection_evaluates_code() {
    let source = "\
```cmd
menu
```
done";
    let mut harness = TestHarness::builder()
        .module("main", source)
        .handler("menu", |ops| {
            ops.choice([
                ("Red".to_string(), "paint_red".to_string(), "cmd".to_string()),
                ("Blue".to_string(), "paint_blue".to_string(), "cmd".to_string()),
            ]);
            Ok(())
        })
        .handler("paint_red", |ops| {
            ops.fusion("crimson")?;
            Ok(())
        })
        .build();

    let prompt = harness.next().await.unwrap();
    assert_eq!(options(&prompt).names, vec!["Red", "Blue"]);
    assert!(options(&prompt).from_code);

    assert_eq!(aside_text(&harness.select(0).await.unwrap()), "crimson");
    assert_eq!(aside_text(&harness.next().await.unwrap()), "done");
    assert!(harness.next().await.is_none());
}

/// Function callings accumulate across one step, keyed by name with the
/// latest call winning.
#[tokio::test]
async fn test_function_callings_accumulate() {
    let source = "\
! shake(1)
! flash(0.5)
! shake(3)
hi";
    let mut harness = TestHarness::from_source(source);

    let output = harness.next().await.unwrap();
    assert_eq!(aside_text(&output), "hi");
    let names: Vec<_> = output.function_callings.keys().cloned().collect();
    assert_eq!(names, vec!["shake", "flash"]);
    assert_eq!(
        output.function_callings["shake"].parameters,
        vec!["3".to_string()]
    );
}

/// Scene, role expression and role operation are singleton fields: the
/// last occurrence before the pause wins.
#[tokio::test]
async fn test_singleton_fields_latest_wins() {
    let source = "\
& + classroom
& - classroom
rin (smile)
rin (frown)
rin + blazer
ok";
    let mut harness = TestHarness::from_source(source);

    let output = harness.next().await.unwrap();
    assert_eq!(aside_text(&output), "ok");
    let scene = output.scene.expect("scene missing");
    assert_eq!(scene.operator.as_str(), "-");
    assert_eq!(scene.content, "classroom");
    let expression = output.role_expression.expect("expression missing");
    assert_eq!(expression.expression, "frown");
    let operation = output.role_operation.expect("operation missing");
    assert_eq!(operation.target, "blazer");
}

/// Effects never leak across pause points: each step observes only what
/// ran since the previous pause.
#[tokio::test]
async fn test_one_pause_per_step() {
    let mut harness = TestHarness::from_source("hi\n! f(1)\nbye");

    let first = harness.next().await.unwrap();
    assert!(first.function_callings.is_empty());

    let second = harness.next().await.unwrap();
    assert_eq!(aside_text(&second), "bye");
    assert!(second.function_callings.contains_key("f"));
}

/// Dialog lines pause with the full speaker record.
#[tokio::test]
async fn test_role_dialog_pause() {
    let mut harness = TestHarness::from_source("rin as R (smile) {bounce} : hello there");

    let output = harness.next().await.unwrap();
    assert_eq!(dialog_text(&output), "hello there");
    let PausePoint::RoleDialog(dialog) = &output.pause else {
        unreachable!();
    };
    assert_eq!(dialog.name, "rin");
    assert_eq!(dialog.alias, "R");
    assert_eq!(dialog.expression, "smile");
    assert_eq!(dialog.effect, "bounce");
}

/// Evaluator failures surface as embedded-code errors.
#[tokio::test]
async fn test_evaluator_error_propagates() {
    let source = "\
```js
unregistered
```";
    let mut harness = TestHarness::builder().module("main", source).build();

    let result = harness.vm_mut().next_output(None).await;
    assert!(matches!(result, Err(Error::Eval(_))));
}

/// A selection is consumed exactly once: answering when nothing is
/// pending needs no input, and the stale index is simply ignored.
#[tokio::test]
async fn test_selection_consumed_exactly_once() {
    let source = "\
? Go @ L
* L
landed
tail";
    let mut harness = TestHarness::builder().module("m", source).build();

    harness.next().await.unwrap();
    assert_eq!(aside_text(&harness.select(0).await.unwrap()), "landed");

    // No pending choice anymore; an input-free step keeps walking.
    let input = Input::select(0);
    let output = harness
        .vm_mut()
        .next_output(Some(&input))
        .await
        .expect("step failed")
        .expect("script ended early");
    assert_eq!(aside_text(&output), "tail");
}
