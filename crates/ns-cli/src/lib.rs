use std::ffi::OsString;

use clap::Parser;
use ns_core::ScriptError;
use tracing_subscriber::EnvFilter;

mod cli_args;
mod compile_ops;
mod error_map;
mod line_play;
mod models;
mod source_loader;
mod state_store;

pub(crate) use cli_args::{Cli, DumpArgs, IdentifyArgs, Mode, PlayArgs, ScriptsDirArgs};
pub(crate) use compile_ops::{check_scenario, dump_script, identify_scenario};
pub(crate) use error_map::{
    emit_error, json_string, map_cli_config_invalid, map_cli_config_read, map_cli_io,
    map_cli_source_path, map_cli_source_write, map_cli_state_invalid, map_cli_state_read,
    map_cli_state_write,
};
pub(crate) use line_play::run_play_line_mode;
#[cfg(test)]
pub(crate) use line_play::{handle_line_cmd, run_play_line_mode_with_io};
pub(crate) use models::{
    CliConfig, LineCommandAction, LineCommandContext, LoadedScenario, PlayerStateV1,
    PLAYER_STATE_SCHEMA,
};
pub(crate) use source_loader::{load_config, load_source_by_scripts_dir};
pub(crate) use state_store::{load_player_state, save_player_state};

const DEFAULT_STATE_FILE: &str = ".novelscript/save.json";

/// Logs go to stderr so stdout stays machine-readable; `RUST_LOG` overrides the level.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

pub fn run_cli_from_args<I, T>(args: I) -> i32
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(error) => {
            let _ = error.print();
            return error.exit_code();
        }
    };
    match run(cli) {
        Ok(code) => code,
        Err(error) => emit_error(error),
    }
}

fn run(cli: Cli) -> Result<i32, ScriptError> {
    let config = load_config(cli.config.as_deref())?;
    match cli.command {
        Mode::Check(args) => run_check(args, &config),
        Mode::Dump(args) => run_dump(args, &config),
        Mode::Identify(args) => run_identify(args, &config),
        Mode::Play(args) => run_play(args, &config),
    }
}

fn print_lines(lines: Vec<String>) {
    for line in lines {
        println!("{}", line);
    }
}

fn run_check(args: ScriptsDirArgs, config: &CliConfig) -> Result<i32, ScriptError> {
    let scenario = load_source_by_scripts_dir(&args.scripts_dir)?;
    let (code, lines) = check_scenario(&scenario, config);
    print_lines(lines);
    Ok(code)
}

fn run_dump(args: DumpArgs, config: &CliConfig) -> Result<i32, ScriptError> {
    let scenario = load_source_by_scripts_dir(&args.scripts_dir)?;
    print_lines(dump_script(&scenario, config, &args.script)?);
    Ok(0)
}

fn run_identify(args: IdentifyArgs, config: &CliConfig) -> Result<i32, ScriptError> {
    let scenario = load_source_by_scripts_dir(&args.scripts_dir)?;
    print_lines(identify_scenario(&scenario, config, args.write)?);
    Ok(0)
}

fn run_play(args: PlayArgs, config: &CliConfig) -> Result<i32, ScriptError> {
    let scenario = load_source_by_scripts_dir(&args.scripts_dir)?;
    let state_file = args
        .state_file
        .unwrap_or_else(|| DEFAULT_STATE_FILE.to_string());
    run_play_line_mode(&scenario, args.entry_script, &state_file, config)
}

#[cfg(test)]
pub(crate) mod cli_test_support {
    use std::fs;
    use std::path::{Path, PathBuf};
    use std::time::{SystemTime, UNIX_EPOCH};

    pub(crate) fn temp_path(name: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("time should be monotonic")
            .as_nanos();
        std::env::temp_dir().join(format!("novelscript-cli-{}-{}", name, nanos))
    }

    pub(crate) fn write_file(path: &Path, content: &str) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("parent should be created");
        }
        fs::write(path, content).expect("file should be written");
    }
}
