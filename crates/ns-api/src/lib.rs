use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::rc::Rc;

use ns_commands::builtin_registry;
use ns_compiler::{GeneratedTextId, ParseOptions, ScriptParser};
use ns_core::{CommandRegistry, Diagnostic, Script, ScriptError};
use ns_runtime::{
    CountingResourceProvider, DefaultInputManager, DefaultInputSampler, HeadlessPresenter,
    InputBinding, MemoryScriptLoader, PlaybackServices, RhaiExpressionEvaluator, RollbackStack,
    ScriptPlayer, ScriptPlayerConfig, StateMap,
};
use tracing::{debug, warn};
use walkdir::WalkDir;

pub const SCRIPT_EXTENSION: &str = "nani";
pub const DEFAULT_ENTRY_SCRIPT: &str = "main";

#[derive(Debug, Clone)]
pub struct CompiledProject {
    pub scripts: BTreeMap<String, Script>,
    pub diagnostics: Vec<Diagnostic>,
    pub generated_ids: BTreeMap<String, Vec<GeneratedTextId>>,
}

impl CompiledProject {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|diagnostic| !diagnostic.is_error())
    }
}

/// Compiles every source; keys may be bare script names or `.nani` paths.
pub fn compile_scripts_from_map(
    sources: &BTreeMap<String, String>,
    registry: &CommandRegistry,
    options: &ParseOptions,
) -> CompiledProject {
    let parser = ScriptParser::new(registry.clone(), options.clone());
    let mut project = CompiledProject {
        scripts: BTreeMap::new(),
        diagnostics: Vec::new(),
        generated_ids: BTreeMap::new(),
    };
    for (key, text) in sources {
        let name = script_name_from_path(key);
        let result = parser.parse_text(&name, text);
        project.diagnostics.extend(result.diagnostics);
        if !result.generated_ids.is_empty() {
            project
                .generated_ids
                .insert(name.clone(), result.generated_ids);
        }
        project.scripts.insert(name, result.script);
    }
    project
}

/// Like [`compile_scripts_from_map`], failing on the first error diagnostic.
pub fn compile_project_from_map(
    sources: &BTreeMap<String, String>,
    options: &ParseOptions,
) -> Result<CompiledProject, ScriptError> {
    let project = compile_scripts_from_map(sources, &builtin_registry(), options);
    if let Some(first) = project.diagnostics.iter().find(|d| d.is_error()) {
        return Err(ScriptError::new(
            "API_COMPILE_FAILED",
            format!(
                "{} error(s) while compiling; first: {}",
                project.diagnostics.iter().filter(|d| d.is_error()).count(),
                first
            ),
        ));
    }
    for warning in project.warnings() {
        warn!("{}", warning);
    }
    Ok(project)
}

/// `chapter/intro.nani` → `chapter/intro`.
pub fn script_name_from_path(path: &str) -> String {
    let normalized = path.replace('\\', "/");
    match normalized.strip_suffix(&format!(".{}", SCRIPT_EXTENSION)) {
        Some(stem) => stem.to_string(),
        None => normalized,
    }
}

/// Reads every `.nani` file under `root`, keyed by its relative path.
pub fn load_sources_from_dir(root: &Path) -> Result<BTreeMap<String, String>, ScriptError> {
    if !root.is_dir() {
        return Err(ScriptError::new(
            "API_SOURCE_DIR_INVALID",
            format!("Scripts directory does not exist: {}", root.display()),
        ));
    }

    let mut sources = BTreeMap::new();
    for entry in WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_map(Result::ok)
    {
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some(SCRIPT_EXTENSION) {
            continue;
        }
        let relative = path
            .strip_prefix(root)
            .map_err(|error| ScriptError::new("API_SOURCE_SCAN", error.to_string()))?
            .to_string_lossy()
            .replace('\\', "/");
        let content = fs::read_to_string(path)
            .map_err(|error| ScriptError::new("API_SOURCE_READ", error.to_string()))?;
        sources.insert(relative, content);
    }

    if sources.is_empty() {
        return Err(ScriptError::new(
            "API_SOURCE_EMPTY",
            format!("No .{} files under {}", SCRIPT_EXTENSION, root.display()),
        ));
    }
    debug!(count = sources.len(), root = %root.display(), "loaded script sources");
    Ok(sources)
}

fn resolve_entry_script(
    scripts: &BTreeMap<String, Script>,
    explicit: Option<String>,
) -> Result<String, ScriptError> {
    if let Some(entry) = explicit {
        if !scripts.contains_key(&entry) {
            return Err(ScriptError::new(
                "API_ENTRY_SCRIPT_NOT_FOUND",
                format!("Entry script \"{}\" is not registered.", entry),
            ));
        }
        return Ok(entry);
    }
    if scripts.contains_key(DEFAULT_ENTRY_SCRIPT) {
        return Ok(DEFAULT_ENTRY_SCRIPT.to_string());
    }
    Err(ScriptError::new(
        "API_ENTRY_MAIN_NOT_FOUND",
        "Expected a script named \"main\" as default entry.",
    ))
}

#[derive(Debug, Clone, Default)]
pub struct CreateSessionOptions {
    pub sources: BTreeMap<String, String>,
    pub entry_script: Option<String>,
    pub player: ScriptPlayerConfig,
    pub parser: ParseOptions,
}

/// A compiled project wired to a headless player.
pub struct PlaybackSession {
    pub player: ScriptPlayer,
    pub presenter: Rc<HeadlessPresenter>,
    pub input: Rc<DefaultInputManager>,
    pub evaluator: Rc<RhaiExpressionEvaluator>,
    pub resources: Rc<CountingResourceProvider>,
    pub rollback: Rc<RollbackStack>,
    pub entry_script: String,
    pub diagnostics: Vec<Diagnostic>,
    command_counts: BTreeMap<String, usize>,
}

/// Played versus total commands of one script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptCoverage {
    pub script_name: String,
    pub played: usize,
    pub total: usize,
}

pub fn create_session(options: CreateSessionOptions) -> Result<PlaybackSession, ScriptError> {
    let project = compile_project_from_map(&options.sources, &options.parser)?;
    let entry_script = resolve_entry_script(&project.scripts, options.entry_script)?;

    let command_counts = project
        .scripts
        .iter()
        .map(|(name, script)| (name.clone(), script.extract_commands().len()))
        .collect();
    let loader = MemoryScriptLoader::new(project.scripts.into_values());
    let presenter = Rc::new(HeadlessPresenter::new());
    let input = Rc::new(DefaultInputManager::new());
    let evaluator = Rc::new(RhaiExpressionEvaluator::new());
    let resources = Rc::new(CountingResourceProvider::new());
    let rollback = RollbackStack::new(RollbackStack::DEFAULT_CAPACITY);
    let services = PlaybackServices::new(Rc::new(loader))
        .with_presenter(presenter.clone())
        .with_input(input.clone())
        .with_evaluator(evaluator.clone())
        .with_resources(resources.clone())
        .with_state(rollback.clone());
    let player = ScriptPlayer::new(options.player, services);
    rollback.attach(&player);
    rollback.add_participant(evaluator.clone());

    Ok(PlaybackSession {
        player,
        presenter,
        input,
        evaluator,
        resources,
        rollback,
        entry_script,
        diagnostics: project.diagnostics,
        command_counts,
    })
}

impl PlaybackSession {
    /// Plays the entry script from its first command. Needs a `LocalSet`.
    pub async fn start(&self) -> Result<bool, ScriptError> {
        self.player
            .preload_and_play(&self.entry_script, 0, 0, None)
            .await
    }

    pub fn control(&self, binding: InputBinding) -> Rc<DefaultInputSampler> {
        self.input.control(binding)
    }

    pub fn save_game(&self) -> Result<StateMap, ScriptError> {
        use ns_runtime::GameStateParticipant;

        let mut state = StateMap::new();
        self.player.save_game_state(&mut state)?;
        self.evaluator.save_game_state(&mut state)?;
        Ok(state)
    }

    pub async fn load_game(&self, state: &StateMap) -> Result<bool, ScriptError> {
        use ns_runtime::GameStateParticipant;

        self.evaluator.load_game_state(state)?;
        self.player.load_game_state(state).await?;
        Ok(self.player.handle_game_load_finished())
    }

    pub fn save_global(&self) -> Result<StateMap, ScriptError> {
        let mut state = StateMap::new();
        self.player.save_global_state(&mut state)?;
        self.player.save_settings(&mut state)?;
        Ok(state)
    }

    pub fn load_global(&self, state: &StateMap) -> Result<(), ScriptError> {
        self.player.load_global_state(state)?;
        self.player.load_settings(state)
    }

    pub fn coverage(&self) -> Vec<ScriptCoverage> {
        let register = self.player.played_register();
        self.command_counts
            .iter()
            .map(|(name, total)| ScriptCoverage {
                script_name: name.clone(),
                played: register.played_count(name).min(*total),
                total: *total,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests;
