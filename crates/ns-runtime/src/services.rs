use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use ns_core::{
    CancellationToken, ExpressionEvaluator, LocalFuture, PlaybackSpot, Presenter,
    ResourceProvider, Script, ScriptError,
};

use crate::expression::RhaiExpressionEvaluator;
use crate::presenter::HeadlessPresenter;
use crate::state::StateMap;

/// Provides compiled scripts by name; the runtime never reads files itself.
pub trait ScriptLoader {
    fn load_script(&self, name: &str) -> LocalFuture<'static, Result<Rc<Script>, ScriptError>>;

    fn script_names(&self) -> Vec<String>;
}

#[derive(Debug, Clone, Default)]
pub struct MemoryScriptLoader {
    scripts: BTreeMap<String, Rc<Script>>,
}

impl MemoryScriptLoader {
    pub fn new(scripts: impl IntoIterator<Item = Script>) -> Self {
        Self {
            scripts: scripts
                .into_iter()
                .map(|script| (script.name().to_string(), Rc::new(script)))
                .collect(),
        }
    }

    pub fn insert(&mut self, script: Script) {
        self.scripts
            .insert(script.name().to_string(), Rc::new(script));
    }

    pub fn get(&self, name: &str) -> Option<Rc<Script>> {
        self.scripts.get(name).cloned()
    }
}

impl ScriptLoader for MemoryScriptLoader {
    fn load_script(&self, name: &str) -> LocalFuture<'static, Result<Rc<Script>, ScriptError>> {
        let result = self.get(name).ok_or_else(|| {
            ScriptError::new(
                "PLAYER_SCRIPT_NOT_FOUND",
                format!("Script \"{}\" not found.", name),
            )
        });
        Box::pin(async move { result })
    }

    fn script_names(&self) -> Vec<String> {
        self.scripts.keys().cloned().collect()
    }
}

pub type SpotPredicate = Box<dyn Fn(&PlaybackSpot) -> bool>;

/// Save/load orchestration owned by the host.
pub trait StateManager {
    /// Restores the most recent snapshot whose spot matches; `Ok(false)` when none does.
    fn rollback(&self, predicate: SpotPredicate) -> LocalFuture<'static, Result<bool, ScriptError>>;

    fn save_global(&self) -> LocalFuture<'static, Result<(), ScriptError>>;
}

/// State manager for hosts without save support.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullStateManager;

impl StateManager for NullStateManager {
    fn rollback(&self, _predicate: SpotPredicate) -> LocalFuture<'static, Result<bool, ScriptError>> {
        Box::pin(async { Ok(false) })
    }

    fn save_global(&self) -> LocalFuture<'static, Result<(), ScriptError>> {
        Box::pin(async { Ok(()) })
    }
}

/// Services whose state is part of a game save.
pub trait GameStateParticipant {
    fn save_game_state(&self, state: &mut StateMap) -> Result<(), ScriptError>;

    fn load_game_state(&self, state: &StateMap) -> Result<(), ScriptError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum InputBinding {
    Continue,
    Skip,
    ToggleSkip,
    AutoPlay,
}

impl InputBinding {
    pub const ALL: [InputBinding; 4] = [
        InputBinding::Continue,
        InputBinding::Skip,
        InputBinding::ToggleSkip,
        InputBinding::AutoPlay,
    ];
}

pub type InputListener = Rc<dyn Fn()>;

pub trait InputSampler {
    fn binding(&self) -> InputBinding;

    fn on_start(&self, listener: InputListener);

    fn on_end(&self, listener: InputListener);

    /// Cancelled the next time this input starts.
    fn start_token(&self) -> CancellationToken;
}

pub trait InputManager {
    fn sampler(&self, binding: InputBinding) -> Option<Rc<dyn InputSampler>>;
}

/// Input sampler driven programmatically by the host.
pub struct DefaultInputSampler {
    binding: InputBinding,
    active: Cell<bool>,
    start_token: RefCell<CancellationToken>,
    on_start: RefCell<Vec<InputListener>>,
    on_end: RefCell<Vec<InputListener>>,
}

impl DefaultInputSampler {
    pub fn new(binding: InputBinding) -> Self {
        Self {
            binding,
            active: Cell::new(false),
            start_token: RefCell::new(CancellationToken::new()),
            on_start: RefCell::new(Vec::new()),
            on_end: RefCell::new(Vec::new()),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.get()
    }

    pub fn activate(&self) {
        if self.active.replace(true) {
            return;
        }
        let previous = self.start_token.replace(CancellationToken::new());
        previous.cancel();
        let listeners = self.on_start.borrow().clone();
        for listener in listeners {
            listener();
        }
    }

    pub fn deactivate(&self) {
        if !self.active.replace(false) {
            return;
        }
        let listeners = self.on_end.borrow().clone();
        for listener in listeners {
            listener();
        }
    }

    /// Press and release.
    pub fn pulse(&self) {
        self.activate();
        self.deactivate();
    }
}

impl InputSampler for DefaultInputSampler {
    fn binding(&self) -> InputBinding {
        self.binding
    }

    fn on_start(&self, listener: InputListener) {
        self.on_start.borrow_mut().push(listener);
    }

    fn on_end(&self, listener: InputListener) {
        self.on_end.borrow_mut().push(listener);
    }

    fn start_token(&self) -> CancellationToken {
        self.start_token.borrow().clone()
    }
}

pub struct DefaultInputManager {
    samplers: BTreeMap<InputBinding, Rc<DefaultInputSampler>>,
}

impl DefaultInputManager {
    pub fn new() -> Self {
        Self {
            samplers: InputBinding::ALL
                .into_iter()
                .map(|binding| (binding, Rc::new(DefaultInputSampler::new(binding))))
                .collect(),
        }
    }

    pub fn control(&self, binding: InputBinding) -> Rc<DefaultInputSampler> {
        Rc::clone(&self.samplers[&binding])
    }
}

impl Default for DefaultInputManager {
    fn default() -> Self {
        Self::new()
    }
}

impl InputManager for DefaultInputManager {
    fn sampler(&self, binding: InputBinding) -> Option<Rc<dyn InputSampler>> {
        self.samplers
            .get(&binding)
            .map(|sampler| Rc::clone(sampler) as Rc<dyn InputSampler>)
    }
}

/// Resource provider that only tracks holds; loading completes immediately.
#[derive(Debug, Default)]
pub struct CountingResourceProvider {
    holders: RefCell<BTreeMap<String, BTreeSet<String>>>,
    loads: Cell<usize>,
}

impl CountingResourceProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn holder_count(&self, path: &str) -> usize {
        self.holders.borrow().get(path).map_or(0, BTreeSet::len)
    }

    pub fn loaded_paths(&self) -> Vec<String> {
        self.holders.borrow().keys().cloned().collect()
    }

    /// Total number of load requests served.
    pub fn load_count(&self) -> usize {
        self.loads.get()
    }
}

impl ResourceProvider for CountingResourceProvider {
    fn load(&self, path: &str, holder: &str) -> LocalFuture<'static, Result<(), ScriptError>> {
        self.loads.set(self.loads.get() + 1);
        self.holders
            .borrow_mut()
            .entry(path.to_string())
            .or_default()
            .insert(holder.to_string());
        Box::pin(async { Ok(()) })
    }

    fn release(&self, path: &str, holder: &str) {
        let mut holders = self.holders.borrow_mut();
        if let Some(set) = holders.get_mut(path) {
            set.remove(holder);
            if set.is_empty() {
                holders.remove(path);
            }
        }
    }

    fn is_loaded(&self, path: &str) -> bool {
        self.holders.borrow().contains_key(path)
    }
}

/// Collaborators injected into the player.
#[derive(Clone)]
pub struct PlaybackServices {
    pub loader: Rc<dyn ScriptLoader>,
    pub resources: Rc<dyn ResourceProvider>,
    pub presenter: Rc<dyn Presenter>,
    pub evaluator: Rc<dyn ExpressionEvaluator>,
    pub input: Rc<dyn InputManager>,
    pub state: Rc<dyn StateManager>,
}

impl PlaybackServices {
    /// Headless defaults around `loader`.
    pub fn new(loader: Rc<dyn ScriptLoader>) -> Self {
        Self {
            loader,
            resources: Rc::new(CountingResourceProvider::new()),
            presenter: Rc::new(HeadlessPresenter::new()),
            evaluator: Rc::new(RhaiExpressionEvaluator::new()),
            input: Rc::new(DefaultInputManager::new()),
            state: Rc::new(NullStateManager),
        }
    }

    pub fn with_resources(mut self, resources: Rc<dyn ResourceProvider>) -> Self {
        self.resources = resources;
        self
    }

    pub fn with_presenter(mut self, presenter: Rc<dyn Presenter>) -> Self {
        self.presenter = presenter;
        self
    }

    pub fn with_evaluator(mut self, evaluator: Rc<dyn ExpressionEvaluator>) -> Self {
        self.evaluator = evaluator;
        self
    }

    pub fn with_input(mut self, input: Rc<dyn InputManager>) -> Self {
        self.input = input;
        self
    }

    pub fn with_state(mut self, state: Rc<dyn StateManager>) -> Self {
        self.state = state;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sampler_start_cancels_previous_token_and_notifies() {
        let sampler = DefaultInputSampler::new(InputBinding::Continue);
        let started = Rc::new(Cell::new(0));
        let ended = Rc::new(Cell::new(0));
        let on_start = Rc::clone(&started);
        let on_end = Rc::clone(&ended);
        sampler.on_start(Rc::new(move || on_start.set(on_start.get() + 1)));
        sampler.on_end(Rc::new(move || on_end.set(on_end.get() + 1)));

        let token = sampler.start_token();
        sampler.activate();
        sampler.activate();
        assert!(token.is_cancelled());
        assert!(!sampler.start_token().is_cancelled());
        assert_eq!(started.get(), 1);

        sampler.deactivate();
        sampler.pulse();
        assert_eq!((started.get(), ended.get()), (2, 2));
        assert!(!sampler.is_active());
    }

    #[test]
    fn counting_provider_tracks_holders_per_path() {
        let provider = CountingResourceProvider::new();
        drop(provider.load("Characters/Alice", "player"));
        drop(provider.load("Characters/Alice", "gallery"));
        assert_eq!(provider.holder_count("Characters/Alice"), 2);

        provider.release("Characters/Alice", "player");
        assert!(provider.is_loaded("Characters/Alice"));
        provider.release("Characters/Alice", "gallery");
        assert!(!provider.is_loaded("Characters/Alice"));
        assert_eq!(provider.load_count(), 2);
    }

    #[tokio::test]
    async fn memory_loader_reports_missing_scripts() {
        let loader = MemoryScriptLoader::default();
        let error = loader
            .load_script("missing")
            .await
            .expect_err("script should be missing");
        assert_eq!(error.code, "PLAYER_SCRIPT_NOT_FOUND");
        assert!(loader.script_names().is_empty());
    }
}
