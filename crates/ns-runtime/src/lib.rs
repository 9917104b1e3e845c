mod expression;
mod player;
mod playlist;
mod presenter;
mod register;
mod rollback;
mod services;
mod state;

pub use expression::RhaiExpressionEvaluator;
pub use player::{
    EventListener, ExecutionHook, PlayerEvent, ScriptPlayer, SubscriptionId, SyncTask,
    WeakScriptPlayer, PLAYED_REGISTER_STATE_KEY, PLAYER_RESOURCE_HOLDER, PLAYER_SETTINGS_KEY,
    PLAYER_STATE_KEY,
};
pub use playlist::{PreloadProgress, ScriptPlaylist};
pub use presenter::{HeadlessPresenter, PresentedEvent};
pub use register::PlayedScriptRegister;
pub use rollback::RollbackStack;
pub use services::{
    CountingResourceProvider, DefaultInputManager, DefaultInputSampler, GameStateParticipant,
    InputBinding, InputListener, InputManager, InputSampler, MemoryScriptLoader,
    NullStateManager, PlaybackServices, ScriptLoader, SpotPredicate, StateManager,
};
pub use state::{
    PlayerSkipMode, ScriptPlayerConfig, ScriptPlayerGameState, ScriptPlayerSettings, StateMap,
};
