use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use ns_runtime::{PresentedEvent, ScriptPlayerConfig};
use tokio::task::LocalSet;

use super::*;

fn map(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
    entries
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

fn temp_path(name: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time should be monotonic")
        .as_nanos();
    std::env::temp_dir().join(format!("novelscript-api-{}-{}", name, nanos))
}

fn write_file(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("parent should be created");
    }
    fs::write(path, content).expect("file should be written");
}

fn run<F: std::future::Future>(future: F) -> F::Output {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()
        .expect("runtime should build");
    LocalSet::new().block_on(&runtime, future)
}

#[test]
fn script_names_drop_the_extension() {
    assert_eq!(script_name_from_path("main.nani"), "main");
    assert_eq!(script_name_from_path("chapter\\intro.nani"), "chapter/intro");
    assert_eq!(script_name_from_path("plain"), "plain");
}

#[test]
fn compile_scripts_from_map_collects_diagnostics_per_script() {
    let sources = map(&[("main.nani", "Hello."), ("broken.nani", "@nope")]);
    let project = compile_scripts_from_map(&sources, &builtin_registry(), &ParseOptions::default());
    assert!(project.scripts.contains_key("main"));
    assert!(project.scripts.contains_key("broken"));
    assert!(project.has_errors());
    assert!(project
        .diagnostics
        .iter()
        .all(|diagnostic| diagnostic.script_name == "broken"));
}

#[test]
fn compile_project_fails_on_errors() {
    let sources = map(&[("main.nani", "@nope")]);
    let error = compile_project_from_map(&sources, &ParseOptions::default())
        .expect_err("unknown command should fail");
    assert_eq!(error.code, "API_COMPILE_FAILED");
}

#[test]
fn stable_identification_reports_generated_ids() {
    let sources = map(&[("main.nani", "Hello.\nBye.")]);
    let options = ParseOptions {
        stable_identification: true,
        ..ParseOptions::default()
    };
    let project = compile_project_from_map(&sources, &options).expect("compile should pass");
    assert_eq!(project.generated_ids["main"].len(), 2);
}

#[test]
fn load_sources_from_dir_keeps_only_scripts() {
    let root = temp_path("sources");
    write_file(&root.join("main.nani"), "Hello.");
    write_file(&root.join("chapter/intro.nani"), "Intro.");
    write_file(&root.join("notes.txt"), "ignored");

    let sources = load_sources_from_dir(&root).expect("scan should pass");
    assert_eq!(
        sources.keys().cloned().collect::<Vec<_>>(),
        vec!["chapter/intro.nani".to_string(), "main.nani".to_string()]
    );

    let project = compile_project_from_map(&sources, &ParseOptions::default())
        .expect("compile should pass");
    assert!(project.scripts.contains_key("chapter/intro"));
}

#[test]
fn load_sources_from_dir_rejects_missing_or_empty_dirs() {
    let missing = temp_path("missing");
    assert_eq!(
        load_sources_from_dir(&missing)
            .expect_err("missing dir should fail")
            .code,
        "API_SOURCE_DIR_INVALID"
    );

    let empty = temp_path("empty");
    write_file(&empty.join("readme.md"), "nothing");
    assert_eq!(
        load_sources_from_dir(&empty)
            .expect_err("empty dir should fail")
            .code,
        "API_SOURCE_EMPTY"
    );
}

#[test]
fn create_session_resolves_entry_script() {
    let session = create_session(CreateSessionOptions {
        sources: map(&[("main.nani", "Hello."), ("alt.nani", "Alt.")]),
        ..CreateSessionOptions::default()
    })
    .expect("session should build");
    assert_eq!(session.entry_script, "main");

    let error = create_session(CreateSessionOptions {
        sources: map(&[("alt.nani", "Alt.")]),
        ..CreateSessionOptions::default()
    })
    .err()
    .expect("missing main should fail");
    assert_eq!(error.code, "API_ENTRY_MAIN_NOT_FOUND");

    let error = create_session(CreateSessionOptions {
        sources: map(&[("alt.nani", "Alt.")]),
        entry_script: Some("ghost".to_string()),
        ..CreateSessionOptions::default()
    })
    .err()
    .expect("unknown entry should fail");
    assert_eq!(error.code, "API_ENTRY_SCRIPT_NOT_FOUND");
}

#[test]
fn session_plays_and_restores_saves() {
    run(async {
        let session = create_session(CreateSessionOptions {
            sources: map(&[("main.nani", "@set seen=1\nAlice: Hi.\n@set seen=2\nBye.")]),
            player: ScriptPlayerConfig {
                auto_play_delay_secs: 0.5,
                ..ScriptPlayerConfig::default()
            },
            ..CreateSessionOptions::default()
        })
        .expect("session should build");
        assert!(session.start().await.expect("start should pass"));
        session.player.idle().await;
        let save = session.save_game().expect("save should pass");

        session.control(InputBinding::Continue).pulse();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(
            session.evaluator.variable("seen"),
            Some(serde_json::Value::from(2))
        );

        assert!(session.load_game(&save).await.expect("load should pass"));
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(session.player.is_waiting_for_input());
        assert_eq!(
            session.evaluator.variable("seen"),
            Some(serde_json::Value::from(1))
        );
        let printed = session
            .presenter
            .events()
            .into_iter()
            .filter(|event| matches!(event, PresentedEvent::Print { .. }))
            .count();
        assert_eq!(printed, 2);

        let global = session.save_global().expect("save should pass");
        assert!(global.contains(ns_runtime::PLAYED_REGISTER_STATE_KEY));

        let coverage = session.coverage();
        assert_eq!(coverage.len(), 1);
        assert_eq!(coverage[0].script_name, "main");
        assert_eq!(coverage[0].total, 4);
        assert_eq!(coverage[0].played, 4);
    });
}
