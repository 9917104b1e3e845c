use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "novelscript")]
#[command(about = "NovelScript compiler and headless player")]
pub(crate) struct Cli {
    /// JSON file with `player` and `parser` sections.
    #[arg(long = "config", global = true)]
    pub(crate) config: Option<String>,
    #[command(subcommand)]
    pub(crate) command: Mode,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Mode {
    /// Compile every script and report diagnostics.
    Check(ScriptsDirArgs),
    /// Print one compiled script in normalized source form.
    Dump(DumpArgs),
    /// Assign stable text ids to text that has none.
    Identify(IdentifyArgs),
    /// Play the entry script line by line on stdin/stdout.
    Play(PlayArgs),
}

#[derive(Debug, Args)]
pub(crate) struct ScriptsDirArgs {
    #[arg(long = "scripts-dir")]
    pub(crate) scripts_dir: String,
}

#[derive(Debug, Args)]
pub(crate) struct DumpArgs {
    #[arg(long = "scripts-dir")]
    pub(crate) scripts_dir: String,
    #[arg(long = "script")]
    pub(crate) script: String,
}

#[derive(Debug, Args)]
pub(crate) struct IdentifyArgs {
    #[arg(long = "scripts-dir")]
    pub(crate) scripts_dir: String,
    /// Rewrite the source files in place.
    #[arg(long = "write")]
    pub(crate) write: bool,
}

#[derive(Debug, Args)]
pub(crate) struct PlayArgs {
    #[arg(long = "scripts-dir")]
    pub(crate) scripts_dir: String,
    #[arg(long = "entry-script")]
    pub(crate) entry_script: Option<String>,
    #[arg(long = "state-file")]
    pub(crate) state_file: Option<String>,
}
