//! Reserved token types, channels, modes and code point bounds.

/// End of input, both as a token type and as a lexer "character".
pub const EOF: i32 = -1;

/// Marker placed in lookahead sets when a path reaches the stop state
/// without consuming a symbol.
pub const EPSILON: i32 = -2;

pub const INVALID_TYPE: i32 = 0;
pub const MIN_USER_TOKEN_TYPE: i32 = 1;

pub const MIN_CHAR_VALUE: i32 = 0;
pub const MAX_CHAR_VALUE: i32 = 0x0010_FFFF;

pub const DEFAULT_MODE: i32 = 0;
pub const DEFAULT_MODE_NAME: &str = "DEFAULT_MODE";

pub const DEFAULT_TOKEN_CHANNEL: i32 = 0;
pub const HIDDEN_CHANNEL: i32 = 1;
pub const MIN_USER_CHANNEL_VALUE: i32 = 2;

pub const SKIP: i32 = -3;
pub const MORE: i32 = -2;

/// Names a lexer command argument may use regardless of the grammar.
#[must_use]
pub fn common_constant(name: &str) -> Option<i32> {
    match name {
        "HIDDEN" => Some(HIDDEN_CHANNEL),
        "DEFAULT_TOKEN_CHANNEL" => Some(DEFAULT_TOKEN_CHANNEL),
        "DEFAULT_MODE" => Some(DEFAULT_MODE),
        "SKIP" => Some(SKIP),
        "MORE" => Some(MORE),
        "EOF" => Some(EOF),
        "MAX_CHAR_VALUE" => Some(MAX_CHAR_VALUE),
        "MIN_CHAR_VALUE" => Some(MIN_CHAR_VALUE),
        _ => None,
    }
}
