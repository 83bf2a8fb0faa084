//! Literal lexeme validation and evaluation.
//!
//! The lexer matches numeric, character and string literals generously;
//! the precise rules live here, shared between the analyzer (validation)
//! and the code generator (value extraction):
//!
//! - integer literals are decimal, nonnegative, and must fit a 32-bit
//!   signed value (negative numbers are unary-minus expressions);
//! - character literals hold exactly one character, or one escape from
//!   `\n \t \0 \\ \' \"`;
//! - string literals may interleave plain characters and those escapes;
//!   their length counts characters plus one for the terminator.

/// Largest valid integer literal (`i32::MAX`); unary minus is applied as
/// an expression, so the literal itself is never negative.
pub const MAX_INT_LITERAL: i64 = 2_147_483_647;

/// Parses a decimal integer literal, rejecting values above
/// [`MAX_INT_LITERAL`].
pub fn int_value(lexeme: &str) -> Option<i64> {
    let value: i64 = lexeme.parse().ok()?;
    if value > MAX_INT_LITERAL {
        return None;
    }
    Some(value)
}

/// Resolves one escape character to its value.
fn escape_value(c: char) -> Option<u8> {
    match c {
        'n' => Some(b'\n'),
        't' => Some(b'\t'),
        '0' => Some(0),
        '\\' => Some(b'\\'),
        '\'' => Some(b'\''),
        '"' => Some(b'"'),
        _ => None,
    }
}

/// Validates a character literal lexeme (quotes included) and returns its
/// numeric value.
pub fn char_value(lexeme: &str) -> Option<u8> {
    let inner = lexeme.strip_prefix('\'')?.strip_suffix('\'')?;
    let mut chars = inner.chars();
    let value = match chars.next()? {
        '\\' => escape_value(chars.next()?)?,
        c if c.is_ascii() => c as u8,
        _ => return None,
    };
    if chars.next().is_some() {
        return None;
    }
    Some(value)
}

/// Validates a string literal lexeme (quotes included) and returns its
/// character values, terminator not included.
pub fn string_chars(lexeme: &str) -> Option<Vec<u8>> {
    let inner = lexeme.strip_prefix('"')?.strip_suffix('"')?;
    let mut out = Vec::new();
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => out.push(escape_value(chars.next()?)?),
            c if c.is_ascii() => out.push(c as u8),
            _ => return None,
        }
    }
    Some(out)
}

/// String literal length: characters plus one for the terminator.
pub fn string_length(lexeme: &str) -> Option<usize> {
    string_chars(lexeme).map(|chars| chars.len() + 1)
}
