use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use ns_core::{
    AsyncToken, CancellationToken, CharacterChange, Command, CommandBase, CommandContext,
    CommandInit, CommandParameter, ExpressionEvaluator, LocalFuture, ParameterMap, PlaybackSpot,
    Presenter, PrintRequest, RawValue, RawValuePart, ResourceProvider, ScriptError,
};

use crate::{builtin_registry, BUILTIN_COMMANDS};

#[derive(Default)]
struct Recorder {
    events: RefCell<Vec<String>>,
    waiting: Cell<bool>,
    skip: Cell<bool>,
    continue_token: RefCell<CancellationToken>,
}

impl Recorder {
    fn record(&self, event: impl Into<String>) {
        self.events.borrow_mut().push(event.into());
    }

    fn events(&self) -> Vec<String> {
        self.events.borrow().clone()
    }
}

impl Presenter for Recorder {
    fn print_text(
        &self,
        request: PrintRequest,
        _token: AsyncToken,
    ) -> LocalFuture<'static, Result<(), ScriptError>> {
        self.record(format!(
            "print:{}:{}:{}",
            request.author.unwrap_or_default(),
            request.text,
            request.instant
        ));
        Box::pin(async { Ok(()) })
    }

    fn modify_character(
        &self,
        change: CharacterChange,
        _token: AsyncToken,
    ) -> LocalFuture<'static, Result<(), ScriptError>> {
        self.record(format!(
            "char:{}:{}:{}",
            change.id,
            change.appearance.unwrap_or_default(),
            change.visible
        ));
        Box::pin(async { Ok(()) })
    }
}

impl ExpressionEvaluator for Recorder {
    fn evaluate(&self, body: &str) -> Result<String, ScriptError> {
        Ok(format!("<{}>", body))
    }

    fn assign(&self, name: &str, body: &str) -> Result<(), ScriptError> {
        self.record(format!("set:{}={}", name, body));
        Ok(())
    }
}

impl ResourceProvider for Recorder {
    fn load(&self, path: &str, holder: &str) -> LocalFuture<'static, Result<(), ScriptError>> {
        self.record(format!("load:{}:{}", path, holder));
        Box::pin(async { Ok(()) })
    }

    fn release(&self, path: &str, holder: &str) {
        self.record(format!("release:{}:{}", path, holder));
    }

    fn is_loaded(&self, _path: &str) -> bool {
        false
    }
}

struct TestContext {
    recorder: Rc<Recorder>,
}

impl CommandContext for TestContext {
    fn resolve_text(&self, raw: &RawValue) -> Result<String, ScriptError> {
        let mut out = String::new();
        for part in &raw.parts {
            match part {
                RawValuePart::PlainText { text } => out.push_str(text),
                RawValuePart::IdentifiedText { id } if id == "t1" => out.push_str("Hello!"),
                RawValuePart::IdentifiedText { .. } => {}
                RawValuePart::Expression { body } => out.push_str(&self.recorder.evaluate(body)?),
            }
        }
        Ok(out)
    }

    fn evaluator(&self) -> Rc<dyn ExpressionEvaluator> {
        self.recorder.clone()
    }

    fn presenter(&self) -> Rc<dyn Presenter> {
        self.recorder.clone()
    }

    fn is_skip_active(&self) -> bool {
        self.recorder.skip.get()
    }

    fn set_waiting_for_input(&self, enabled: bool) {
        self.recorder.waiting.set(enabled);
    }

    fn continue_input_token(&self) -> CancellationToken {
        self.recorder.continue_token.borrow().clone()
    }

    fn note_printed_text(&self, text: &str) {
        self.recorder.record(format!("printed:{}", text.chars().count()));
    }

    fn goto(
        &self,
        script_name: &str,
        label: Option<&str>,
    ) -> LocalFuture<'static, Result<(), ScriptError>> {
        self.recorder
            .record(format!("goto:{}:{}", script_name, label.unwrap_or_default()));
        Box::pin(async { Ok(()) })
    }

    fn gosub(
        &self,
        script_name: &str,
        label: Option<&str>,
    ) -> LocalFuture<'static, Result<(), ScriptError>> {
        self.recorder
            .record(format!("gosub:{}:{}", script_name, label.unwrap_or_default()));
        Box::pin(async { Ok(()) })
    }

    fn return_from_gosub(&self) -> LocalFuture<'static, Result<(), ScriptError>> {
        self.recorder.record("return");
        Box::pin(async { Ok(()) })
    }

    fn stop_playback(&self) {
        self.recorder.record("stop");
    }
}

fn context() -> (Rc<Recorder>, Rc<dyn CommandContext>) {
    let recorder = Rc::new(Recorder::default());
    let ctx: Rc<dyn CommandContext> = Rc::new(TestContext {
        recorder: recorder.clone(),
    });
    (recorder, ctx)
}

fn try_build(alias: &str, params: &[(&str, RawValue)]) -> Result<Rc<dyn Command>, ScriptError> {
    let registry = builtin_registry();
    let descriptor = registry.resolve(alias).expect("command should be registered");
    let mut parameters = ParameterMap::new();
    for (id, raw) in params {
        parameters.insert(*id, raw.clone());
    }
    for parameter in descriptor.parameters {
        if let (false, Some(default)) = (parameters.contains(parameter.id), parameter.default) {
            parameters.insert(parameter.id, RawValue::plain(default));
        }
    }
    let base = CommandBase {
        type_name: descriptor.type_name,
        alias: descriptor.script_name(),
        spot: PlaybackSpot::new("main", 3, 0),
        default_wait: descriptor.default_wait,
        wait: CommandParameter::unassigned(),
        condition: None,
        assignments: Vec::new(),
    };
    (descriptor.factory)(&CommandInit { base, parameters })
}

fn build(alias: &str, params: &[(&str, RawValue)]) -> Rc<dyn Command> {
    try_build(alias, params).expect("factory should pass")
}

fn identified(id: &str) -> RawValue {
    RawValue::new(vec![RawValuePart::IdentifiedText { id: id.to_string() }])
}

#[test]
fn builtin_registry_registers_every_command() {
    let registry = builtin_registry();
    assert_eq!(registry.len(), BUILTIN_COMMANDS.len());
    for (alias, type_name) in [
        ("print", "PrintText"),
        ("char", "ModifyCharacter"),
        ("i", "WaitForInput"),
        ("skipInput", "SkipInput"),
        ("wait", "Wait"),
        ("goto", "Goto"),
        ("gosub", "Gosub"),
        ("return", "Return"),
        ("stop", "Stop"),
        ("set", "SetCustomVariable"),
    ] {
        assert_eq!(
            registry.resolve(alias).map(|descriptor| descriptor.type_name),
            Some(type_name)
        );
    }
}

#[tokio::test]
async fn print_resolves_text_and_requests_input_wait() {
    let (recorder, ctx) = context();
    let command = build(
        "print",
        &[
            ("text", identified("t1")),
            ("author", RawValue::plain("Alice")),
            ("waitInput", RawValue::plain("true")),
        ],
    );
    command
        .execute(ctx, AsyncToken::default())
        .await
        .expect("print should pass");

    assert_eq!(
        recorder.events(),
        vec!["print:Alice:Hello!:false".to_string(), "printed:6".to_string()]
    );
    assert!(recorder.waiting.get());
}

#[tokio::test]
async fn print_under_skip_is_instant() {
    let (recorder, ctx) = context();
    recorder.skip.set(true);
    let text = RawValue::new(vec![RawValuePart::Expression {
        body: "name".to_string(),
    }]);
    build("print", &[("text", text)])
        .execute(ctx, AsyncToken::default())
        .await
        .expect("print should pass");

    assert_eq!(recorder.events()[0], "print::<name>:true");
    assert!(!recorder.waiting.get());
}

#[tokio::test]
async fn canceled_print_reports_cancellation() {
    let (_, ctx) = context();
    let token = AsyncToken::default();
    token.canceled.cancel();
    let error = build("print", &[("text", identified("t1"))])
        .execute(ctx, token)
        .await
        .expect_err("should cancel");
    assert!(error.is_cancellation());
}

#[tokio::test]
async fn character_modification_and_preload() {
    let (recorder, ctx) = context();
    let command = build("char", &[("idAndAppearance", RawValue::plain("Alice.Happy"))]);

    let preloadable = command.as_preloadable().expect("char is preloadable");
    let resources: Rc<dyn ResourceProvider> = recorder.clone();
    preloadable
        .preload_resources(resources.clone(), "player".to_string())
        .await
        .expect("preload should pass");
    preloadable.release_preloaded_resources(resources.as_ref(), "player");

    command
        .execute(ctx, AsyncToken::default())
        .await
        .expect("char should pass");

    assert_eq!(
        recorder.events(),
        vec![
            "load:Characters/Alice/Happy:player".to_string(),
            "release:Characters/Alice/Happy:player".to_string(),
            "char:Alice:Happy:true".to_string(),
        ]
    );
}

#[tokio::test]
async fn navigation_commands_delegate_to_context() {
    let (recorder, ctx) = context();
    build("goto", &[("path", RawValue::plain(".Start"))])
        .execute(ctx.clone(), AsyncToken::default())
        .await
        .expect("goto should pass");
    build("gosub", &[("path", RawValue::plain("chapter.Intro"))])
        .execute(ctx.clone(), AsyncToken::default())
        .await
        .expect("gosub should pass");
    build("return", &[])
        .execute(ctx.clone(), AsyncToken::default())
        .await
        .expect("return should pass");
    build("stop", &[])
        .execute(ctx, AsyncToken::default())
        .await
        .expect("stop should pass");

    assert_eq!(
        recorder.events(),
        vec![
            "goto:main:Start".to_string(),
            "gosub:chapter:Intro".to_string(),
            "return".to_string(),
            "stop".to_string(),
        ]
    );
}

#[tokio::test]
async fn set_assigns_every_statement() {
    let (recorder, ctx) = context();
    build("set", &[("expression", RawValue::plain("a = 1; b = a + 1"))])
        .execute(ctx, AsyncToken::default())
        .await
        .expect("set should pass");
    assert_eq!(
        recorder.events(),
        vec!["set:a=1".to_string(), "set:b=a + 1".to_string()]
    );
}

#[test]
fn static_parameter_errors_fail_construction() {
    let error = try_build("wait", &[("waitMode", RawValue::plain("soon"))]).expect_err("invalid");
    assert_eq!(error.code, "WAIT_MODE_INVALID");

    let error = try_build(
        "print",
        &[
            ("text", identified("t1")),
            ("waitInput", RawValue::plain("maybe")),
        ],
    )
    .expect_err("invalid bool");
    assert_eq!(error.code, "PARAMETER_TYPE_MISMATCH");
}

#[tokio::test]
async fn wait_for_input_mode_sets_waiting() {
    let (recorder, ctx) = context();
    build("wait", &[("waitMode", RawValue::plain("i"))])
        .execute(ctx.clone(), AsyncToken::default())
        .await
        .expect("wait should pass");
    assert!(recorder.waiting.get());

    recorder.waiting.set(false);
    build("i", &[])
        .execute(ctx, AsyncToken::default())
        .await
        .expect("i should pass");
    assert!(recorder.waiting.get());
}

#[tokio::test(start_paused = true)]
async fn skippable_delay_ends_on_continue_input() {
    let (recorder, ctx) = context();
    let continue_token = recorder.continue_token.borrow().clone();
    let started = tokio::time::Instant::now();
    let command = build("wait", &[("waitMode", RawValue::plain("i30"))]);

    let (result, _) = tokio::join!(command.execute(ctx, AsyncToken::default()), async move {
        tokio::time::sleep(Duration::from_secs(1)).await;
        continue_token.cancel();
    });
    result.expect("wait should pass");
    assert!(started.elapsed() < Duration::from_secs(30));
}

#[tokio::test(start_paused = true)]
async fn delay_is_skipped_under_skip_mode() {
    let (recorder, ctx) = context();
    recorder.skip.set(true);
    let started = tokio::time::Instant::now();
    build("wait", &[("waitMode", RawValue::plain("10"))])
        .execute(ctx, AsyncToken::default())
        .await
        .expect("wait should pass");
    assert_eq!(started.elapsed(), Duration::ZERO);
}
