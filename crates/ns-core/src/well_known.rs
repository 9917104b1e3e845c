//! Command kinds the compiler synthesizes from generic text lines.

pub const PRINT_TEXT: &str = "PrintText";
pub const PRINT_TEXT_ALIAS: &str = "print";
pub const PRINT_TEXT_PARAMETER: &str = "text";
pub const PRINT_AUTHOR_PARAMETER: &str = "author";
pub const PRINT_WAIT_INPUT_PARAMETER: &str = "waitInput";

pub const MODIFY_CHARACTER: &str = "ModifyCharacter";
pub const MODIFY_CHARACTER_ALIAS: &str = "char";
pub const CHARACTER_ID_PARAMETER: &str = "idAndAppearance";

pub const WAIT_FOR_INPUT: &str = "WaitForInput";
pub const WAIT_FOR_INPUT_ALIAS: &str = "i";

pub const SKIP_INPUT: &str = "SkipInput";
pub const SKIP_INPUT_ALIAS: &str = "skipInput";
