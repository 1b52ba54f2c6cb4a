//! Splitting of a command line into argument tokens.
//!
//! The shell has no quoting or escaping: a token is any maximal run of
//! characters other than the space character.

/// Split `line` on runs of spaces, dropping the empty tokens that consecutive
/// separators would produce.
pub fn split_into_tokens(line: &str) -> Vec<String> {
    line.split(' ')
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}
