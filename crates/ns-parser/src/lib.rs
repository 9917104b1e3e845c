mod lexer;
mod model;

pub use lexer::{lex_document, lex_line, split_lines};
pub use model::{
    CommandModel, GenericContent, GenericPrefix, GenericTextModel, LexedLine, LineModel,
    ParameterModel, ValuePart,
};
