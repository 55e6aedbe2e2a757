//! Program image loading.
//!
//! A program image is a comma-separated list of signed decimal integers, as
//! distributed in text files. Whitespace (including newlines) around entries is
//! ignored, as is a single trailing comma.

use std::path::Path;

/// Errors from loading a program image.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// An entry is not a signed decimal integer.
    #[error("invalid integer {token:?} at position {index}")]
    InvalidInteger { index: usize, token: String },

    /// The source contains no entries.
    #[error("program image is empty")]
    Empty,

    /// The file could not be read.
    #[error("failed to read program image: {0}")]
    Io(#[from] std::io::Error),
}

/// Parses a comma-separated program image.
///
/// # Examples
///
/// ```
/// use intcode::image::parse;
///
/// assert_eq!(parse("1,0,0,0,99\n").unwrap(), vec![1, 0, 0, 0, 99]);
/// assert_eq!(parse(" 104, -7 ,99").unwrap(), vec![104, -7, 99]);
/// assert!(parse("1,x,3").is_err());
/// ```
pub fn parse(source: &str) -> Result<Vec<i64>, LoadError> {
    let trimmed = source.trim();
    let trimmed = trimmed.strip_suffix(',').unwrap_or(trimmed);
    if trimmed.is_empty() {
        return Err(LoadError::Empty);
    }

    trimmed
        .split(',')
        .enumerate()
        .map(|(index, token)| {
            let token = token.trim();
            token.parse::<i64>().map_err(|_| LoadError::InvalidInteger {
                index,
                token: token.to_string(),
            })
        })
        .collect()
}

/// Reads and parses a program image file.
pub fn load_file(path: impl AsRef<Path>) -> Result<Vec<i64>, LoadError> {
    let source = std::fs::read_to_string(path.as_ref())?;
    parse(&source)
}
