//! Built-in command kinds and their registration table.

mod character;
mod flow;
mod input;
mod print;
mod variables;

pub use character::{character_resource_path, ModifyCharacter};
pub use flow::{Gosub, Goto, Return, Stop};
pub use input::{parse_wait_mode, SkipInput, Wait, WaitForInput, WaitMode};
pub use print::PrintText;
pub use variables::{parse_assignments, SetCustomVariable};

use ns_core::{CommandDescriptor, CommandRegistry};

pub const BUILTIN_COMMANDS: &[CommandDescriptor] = &[
    print::DESCRIPTOR,
    character::DESCRIPTOR,
    input::WAIT_FOR_INPUT_DESCRIPTOR,
    input::SKIP_INPUT_DESCRIPTOR,
    input::WAIT_DESCRIPTOR,
    flow::GOTO_DESCRIPTOR,
    flow::GOSUB_DESCRIPTOR,
    flow::RETURN_DESCRIPTOR,
    flow::STOP_DESCRIPTOR,
    variables::DESCRIPTOR,
];

pub fn builtin_registry() -> CommandRegistry {
    let mut registry = CommandRegistry::new();
    for descriptor in BUILTIN_COMMANDS {
        if let Err(error) = registry.register(*descriptor) {
            tracing::error!(code = %error.code, "{}", error.message);
        }
    }
    registry
}

#[cfg(test)]
mod tests;
