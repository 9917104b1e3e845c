use std::rc::Rc;

use ns_core::well_known::{
    PRINT_AUTHOR_PARAMETER, PRINT_TEXT, PRINT_TEXT_ALIAS, PRINT_TEXT_PARAMETER,
    PRINT_WAIT_INPUT_PARAMETER,
};
use ns_core::{
    AsyncToken, Command, CommandBase, CommandContext, CommandDescriptor, CommandInit,
    CommandParameter, LocalFuture, LocalizableText, ParameterDescriptor, ParameterKind,
    PrintRequest, ScriptError,
};

const PARAMETERS: &[ParameterDescriptor] = &[
    ParameterDescriptor::new(PRINT_TEXT_PARAMETER, ParameterKind::LocalizableText)
        .nameless()
        .required(),
    ParameterDescriptor::new(PRINT_AUTHOR_PARAMETER, ParameterKind::String),
    ParameterDescriptor::new(PRINT_WAIT_INPUT_PARAMETER, ParameterKind::Boolean),
];

pub const DESCRIPTOR: CommandDescriptor = CommandDescriptor {
    type_name: PRINT_TEXT,
    alias: Some(PRINT_TEXT_ALIAS),
    default_wait: true,
    parameters: PARAMETERS,
    factory: PrintText::create,
};

/// Prints text through the presenter, optionally pausing for input afterwards.
#[derive(Debug)]
pub struct PrintText {
    base: CommandBase,
    text: CommandParameter<LocalizableText>,
    author: CommandParameter<String>,
    wait_input: CommandParameter<bool>,
}

impl PrintText {
    fn create(init: &CommandInit) -> Result<Rc<dyn Command>, ScriptError> {
        Ok(Rc::new(Self {
            base: init.base.clone(),
            text: init.parameters.take(PRINT_TEXT_PARAMETER)?,
            author: init.parameters.take(PRINT_AUTHOR_PARAMETER)?,
            wait_input: init.parameters.take(PRINT_WAIT_INPUT_PARAMETER)?,
        }))
    }
}

impl Command for PrintText {
    fn base(&self) -> &CommandBase {
        &self.base
    }

    fn execute(
        self: Rc<Self>,
        ctx: Rc<dyn CommandContext>,
        token: AsyncToken,
    ) -> LocalFuture<'static, Result<(), ScriptError>> {
        Box::pin(async move {
            let text = self
                .text
                .get(ctx.as_ref())?
                .map(|text| text.0)
                .unwrap_or_default();
            let author = self.author.get(ctx.as_ref())?;
            let request = PrintRequest {
                author,
                text: text.clone(),
                instant: ctx.is_skip_active(),
            };
            ctx.presenter().print_text(request, token.clone()).await?;
            token.ensure_not_canceled()?;

            ctx.note_printed_text(&text);
            if self.wait_input.get_or(ctx.as_ref(), false)? {
                ctx.set_waiting_for_input(true);
            }
            Ok(())
        })
    }
}
