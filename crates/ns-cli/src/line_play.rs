use std::io::{self, BufRead, Write};
use std::path::Path;
use std::time::Duration;

use ns_api::{create_session, CreateSessionOptions, PlaybackSession};
use ns_core::ScriptError;
use ns_runtime::{InputBinding, PresentedEvent};
use tokio::task::LocalSet;
use tracing::{debug, info};

use crate::{
    load_player_state, map_cli_io, save_player_state, CliConfig, LineCommandAction,
    LineCommandContext, LoadedScenario, PlayerStateV1, PLAYER_STATE_SCHEMA,
};

const HELP_LINE: &str = "commands: <enter> continue, :skip :auto :save :load :rewind N :help :quit";
const AUTO_PLAY_POLL: Duration = Duration::from_millis(50);

pub(crate) fn run_play_line_mode(
    scenario: &LoadedScenario,
    entry_script: Option<String>,
    state_file: &str,
    config: &CliConfig,
) -> Result<i32, ScriptError> {
    let stdin = io::stdin();
    let mut reader = stdin.lock();
    let mut writer = io::stdout();
    run_play_line_mode_with_io(
        scenario,
        entry_script,
        state_file,
        config,
        &mut reader,
        &mut writer,
    )
}

/// Playback needs a `LocalSet`; the whole session runs on one current-thread runtime.
pub(crate) fn run_play_line_mode_with_io(
    scenario: &LoadedScenario,
    entry_script: Option<String>,
    state_file: &str,
    config: &CliConfig,
    reader: &mut dyn BufRead,
    writer: &mut dyn Write,
) -> Result<i32, ScriptError> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .map_err(map_cli_io)?;
    let session = create_session(CreateSessionOptions {
        sources: scenario.sources.clone(),
        entry_script,
        player: config.player.clone(),
        parser: config.parser.clone(),
    })?;
    let context = LineCommandContext {
        state_file,
        scenario,
    };
    LocalSet::new().block_on(&runtime, play_loop(&session, &context, reader, writer))
}

async fn play_loop(
    session: &PlaybackSession,
    context: &LineCommandContext<'_>,
    reader: &mut dyn BufRead,
    writer: &mut dyn Write,
) -> Result<i32, ScriptError> {
    writeln!(writer, "NovelScript player").map_err(map_cli_io)?;
    writeln!(writer, "{}", HELP_LINE).map_err(map_cli_io)?;
    info!(entry = %session.entry_script, "starting playback");
    session.start().await?;

    loop {
        advance(session, writer).await?;
        if !session.player.is_playing() {
            writeln!(writer, "[END]").map_err(map_cli_io)?;
            write_coverage(session, writer)?;
            return Ok(0);
        }

        let Some(raw) = prompt_input_from("> ", reader, writer)? else {
            return Ok(0);
        };
        let mut emit = |line: String| {
            let _ = writeln!(writer, "{}", line);
        };
        let action = match handle_line_cmd(raw.trim(), context, session, &mut emit).await {
            Ok(action) => action,
            Err(error) => {
                emit(format!("[error {}] {}", error.code, error.message));
                LineCommandAction::Continue
            }
        };
        match action {
            LineCommandAction::Quit => return Ok(0),
            LineCommandAction::Continue | LineCommandAction::Resume => {}
            LineCommandAction::NotHandled if raw.trim().is_empty() => {
                session.control(InputBinding::Continue).pulse();
            }
            LineCommandAction::NotHandled => {
                writeln!(writer, "unknown command: {}", raw.trim()).map_err(map_cli_io)?;
            }
        }
    }
}

/// Runs playback until it needs the user, printing whatever was presented.
async fn advance(session: &PlaybackSession, writer: &mut dyn Write) -> Result<(), ScriptError> {
    loop {
        session.player.idle().await;
        write_presented(session, writer)?;
        let player = &session.player;
        if !player.is_playing() || !player.is_auto_play_active() {
            return Ok(());
        }
        tokio::time::sleep(AUTO_PLAY_POLL).await;
    }
}

fn write_presented(session: &PlaybackSession, writer: &mut dyn Write) -> Result<(), ScriptError> {
    for event in session.presenter.take_events() {
        let line = match event {
            PresentedEvent::Print {
                author: Some(author),
                text,
                ..
            } => format!("{}: {}", author, text),
            PresentedEvent::Print { text, .. } => text,
            PresentedEvent::Character {
                id,
                appearance,
                visible,
            } => match (appearance, visible) {
                (_, false) => format!("[{} hidden]", id),
                (Some(appearance), true) => format!("[{}.{}]", id, appearance),
                (None, true) => format!("[{}]", id),
            },
        };
        writeln!(writer, "{}", line).map_err(map_cli_io)?;
    }
    Ok(())
}

fn write_coverage(session: &PlaybackSession, writer: &mut dyn Write) -> Result<(), ScriptError> {
    for coverage in session.coverage() {
        writeln!(
            writer,
            "COVERAGE:{}|{}/{}",
            coverage.script_name, coverage.played, coverage.total
        )
        .map_err(map_cli_io)?;
    }
    Ok(())
}

pub(crate) async fn handle_line_cmd(
    raw: &str,
    context: &LineCommandContext<'_>,
    session: &PlaybackSession,
    emit: &mut dyn FnMut(String),
) -> Result<LineCommandAction, ScriptError> {
    let mut parts = raw.split_whitespace();
    match parts.next() {
        Some(":help") => {
            emit(HELP_LINE.to_string());
            Ok(LineCommandAction::Continue)
        }
        Some(":skip") => {
            session.control(InputBinding::ToggleSkip).pulse();
            let state = if session.player.is_skip_active() {
                "on"
            } else {
                "off"
            };
            emit(format!("skip: {}", state));
            Ok(LineCommandAction::Resume)
        }
        Some(":auto") => {
            session.control(InputBinding::AutoPlay).pulse();
            let state = if session.player.is_auto_play_active() {
                "on"
            } else {
                "off"
            };
            emit(format!("auto: {}", state));
            Ok(LineCommandAction::Resume)
        }
        Some(":save") => {
            let state = PlayerStateV1 {
                schema_version: PLAYER_STATE_SCHEMA.to_string(),
                scenario_id: context.scenario.id.clone(),
                entry_script: session.entry_script.clone(),
                game: session.save_game()?,
                global: session.save_global()?,
            };
            save_player_state(Path::new(context.state_file), &state)?;
            emit(format!("saved: {}", context.state_file));
            Ok(LineCommandAction::Continue)
        }
        Some(":load") => {
            let state = load_player_state(Path::new(context.state_file))?;
            if state.scenario_id != context.scenario.id {
                return Err(ScriptError::new(
                    "CLI_STATE_SCENARIO_MISMATCH",
                    format!(
                        "State file belongs to {}, not {}.",
                        state.scenario_id, context.scenario.id
                    ),
                ));
            }
            session.load_global(&state.global)?;
            session.load_game(&state.game).await?;
            emit(format!("loaded: {}", context.state_file));
            Ok(LineCommandAction::Resume)
        }
        Some(":rewind") => {
            let line = parts
                .next()
                .and_then(|value| value.parse::<usize>().ok())
                .filter(|line| *line > 0)
                .ok_or_else(|| {
                    ScriptError::new("CLI_REWIND_PARSE", "Usage: :rewind <line number>")
                })?;
            debug!(line, "rewind requested");
            if session.player.rewind(line - 1).await? {
                emit(format!("rewound: line {}", line));
            } else {
                emit("rewind interrupted".to_string());
            }
            Ok(LineCommandAction::Resume)
        }
        Some(":quit") => {
            emit("bye".to_string());
            Ok(LineCommandAction::Quit)
        }
        _ => Ok(LineCommandAction::NotHandled),
    }
}

/// `None` at end of input.
pub(crate) fn prompt_input_from(
    prefix: &str,
    reader: &mut dyn BufRead,
    writer: &mut dyn Write,
) -> Result<Option<String>, ScriptError> {
    write!(writer, "{}", prefix).map_err(map_cli_io)?;
    writer.flush().map_err(map_cli_io)?;
    let mut input = String::new();
    if reader.read_line(&mut input).map_err(map_cli_io)? == 0 {
        return Ok(None);
    }
    Ok(Some(input.trim_end_matches(&['\r', '\n'][..]).to_string()))
}
