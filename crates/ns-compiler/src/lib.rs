mod identifier;
mod lines;
mod options;
mod parser;
mod serializer;

pub use identifier::{volatile_text_id, Identification, TextIdentifier};
pub use options::{GeneratedTextId, ParseOptions, ScriptParseResult};
pub use parser::{parse_script, ScriptParser};
pub use serializer::{rewrite_with_generated_ids, serialize_script};

#[cfg(test)]
mod tests;
