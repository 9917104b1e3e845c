pub mod cancellation;
pub mod command;
pub mod context;
pub mod error;
pub mod hash;
pub mod parameter;
pub mod registry;
pub mod script;
pub mod types;
pub mod value;
pub mod well_known;

pub use cancellation::{AsyncToken, CancellationToken, LocalFuture};
pub use command::{Command, CommandBase, CommandInit, ParameterAssignment};
pub use context::{
    CharacterChange, CommandContext, ExpressionEvaluator, Preloadable, Presenter, PrintRequest,
    ResourceProvider,
};
pub use error::{Diagnostic, ScriptError, Severity, CANCELED_ERROR_CODE};
pub use hash::persistent_hex;
pub use parameter::{
    CommandParameter, LocalizableText, NamedString, ParameterKind, ParameterMap, ParameterValue,
};
pub use registry::{
    CommandDescriptor, CommandFactory, CommandRegistry, ParameterDescriptor, COMMON_PARAMETERS,
    CONDITION_PARAMETER, WAIT_PARAMETER,
};
pub use script::{Script, ScriptLine, ScriptLineKind};
pub use types::{PlaybackSpot, SourceLocation, SourceSpan};
pub use value::{is_volatile_text_id, RawValue, RawValuePart, TextMap, VOLATILE_TEXT_ID_PREFIX};
