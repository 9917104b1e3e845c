use std::rc::Rc;

use ns_core::well_known::{CHARACTER_ID_PARAMETER, MODIFY_CHARACTER, MODIFY_CHARACTER_ALIAS};
use ns_core::{
    AsyncToken, CharacterChange, Command, CommandBase, CommandContext, CommandDescriptor,
    CommandInit, CommandParameter, LocalFuture, NamedString, ParameterDescriptor, ParameterKind,
    Preloadable, ResourceProvider, ScriptError,
};

const VISIBLE_PARAMETER: &str = "visible";
const POSITION_PARAMETER: &str = "position";

const PARAMETERS: &[ParameterDescriptor] = &[
    ParameterDescriptor::new(CHARACTER_ID_PARAMETER, ParameterKind::NamedString)
        .nameless()
        .required(),
    ParameterDescriptor::new(VISIBLE_PARAMETER, ParameterKind::Boolean).default_value("true"),
    ParameterDescriptor::new(POSITION_PARAMETER, ParameterKind::DecimalList).alias("pos"),
];

pub const DESCRIPTOR: CommandDescriptor = CommandDescriptor {
    type_name: MODIFY_CHARACTER,
    alias: Some(MODIFY_CHARACTER_ALIAS),
    default_wait: true,
    parameters: PARAMETERS,
    factory: ModifyCharacter::create,
};

/// Resource path of a character appearance.
pub fn character_resource_path(id: &str, appearance: Option<&str>) -> String {
    match appearance {
        Some(appearance) => format!("Characters/{}/{}", id, appearance),
        None => format!("Characters/{}", id),
    }
}

#[derive(Debug)]
pub struct ModifyCharacter {
    base: CommandBase,
    id_and_appearance: CommandParameter<NamedString>,
    visible: CommandParameter<bool>,
    position: CommandParameter<Vec<f32>>,
}

impl ModifyCharacter {
    fn create(init: &CommandInit) -> Result<Rc<dyn Command>, ScriptError> {
        Ok(Rc::new(Self {
            base: init.base.clone(),
            id_and_appearance: init.parameters.take(CHARACTER_ID_PARAMETER)?,
            visible: init.parameters.take(VISIBLE_PARAMETER)?,
            position: init.parameters.take(POSITION_PARAMETER)?,
        }))
    }

    fn static_resource_path(&self) -> Option<String> {
        let named = self.id_and_appearance.static_value()?;
        Some(character_resource_path(&named.name, named.value.as_deref()))
    }
}

impl Command for ModifyCharacter {
    fn base(&self) -> &CommandBase {
        &self.base
    }

    fn execute(
        self: Rc<Self>,
        ctx: Rc<dyn CommandContext>,
        token: AsyncToken,
    ) -> LocalFuture<'static, Result<(), ScriptError>> {
        Box::pin(async move {
            let Some(named) = self.id_and_appearance.get(ctx.as_ref())? else {
                return Err(ScriptError::new(
                    "COMMAND_PARAMETER_MISSING",
                    format!("{} requires a character id.", self.base.spot),
                ));
            };
            let change = CharacterChange {
                id: named.name,
                appearance: named.value,
                visible: self.visible.get_or(ctx.as_ref(), true)?,
                position: self.position.get(ctx.as_ref())?,
            };
            ctx.presenter().modify_character(change, token).await
        })
    }

    fn as_preloadable(&self) -> Option<&dyn Preloadable> {
        Some(self)
    }
}

impl Preloadable for ModifyCharacter {
    fn preload_resources(
        &self,
        resources: Rc<dyn ResourceProvider>,
        holder: String,
    ) -> LocalFuture<'static, Result<(), ScriptError>> {
        let path = self.static_resource_path();
        Box::pin(async move {
            match path {
                Some(path) => resources.load(&path, &holder).await,
                None => Ok(()),
            }
        })
    }

    fn release_preloaded_resources(&self, resources: &dyn ResourceProvider, holder: &str) {
        if let Some(path) = self.static_resource_path() {
            resources.release(&path, holder);
        }
    }
}
