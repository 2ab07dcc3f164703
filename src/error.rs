//! Parse errors: a structured kind plus the byte offset in the input where
//! parsing stopped.

use thiserror::Error;

/// Everything that can go wrong while parsing JSON text.
///
/// Syntax errors and capacity errors ([`DeepNesting`], [`DocumentTooLarge`])
/// share this enum but are distinguishable, so callers can react differently
/// to malformed input versus input that merely exceeds the format's limits.
///
/// [`DeepNesting`]: ParseErrorKind::DeepNesting
/// [`DocumentTooLarge`]: ParseErrorKind::DocumentTooLarge
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ParseErrorKind {
    /// An object is not terminated with a closing curly bracket.
    #[error("unterminated object")]
    UnterminatedObject,
    /// The colon separating a key from its value is missing.
    #[error("missing name separator")]
    MissingNameSeparator,
    /// An array is not terminated with a closing square bracket.
    #[error("unterminated array")]
    UnterminatedArray,
    /// The comma separating two values is missing.
    #[error("missing value separator")]
    MissingValueSeparator,
    /// The value is illegal.
    #[error("illegal value")]
    IllegalValue,
    /// The input ended while parsing a number.
    #[error("invalid termination by number")]
    TerminationByNumber,
    /// The number is not well formed.
    #[error("illegal number")]
    IllegalNumber,
    /// An illegal escape sequence occurred in the input.
    #[error("invalid escape sequence")]
    IllegalEscapeSequence,
    /// An illegal UTF-8 sequence occurred in the input.
    #[error("invalid UTF8 string")]
    IllegalUtf8String,
    /// A string wasn't terminated with a quote.
    #[error("unterminated string")]
    UnterminatedString,
    /// A value was expected but couldn't be found.
    #[error("object is missing after a comma")]
    MissingObject,
    /// The document is nested deeper than the parser allows.
    #[error("too deeply nested document")]
    DeepNesting,
    /// The document exceeds the format's size ceiling.
    #[error("too large document")]
    DocumentTooLarge,
    /// Trailing non-whitespace after the top-level value.
    #[error("garbage at the end of the document")]
    GarbageAtEnd,
}

/// A parse failure. The input is rejected wholesale; no partial document is
/// ever returned.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[error("{kind} at offset {offset}")]
pub struct ParseError {
    /// What went wrong.
    pub kind: ParseErrorKind,
    /// Byte offset into the original input where the error occurred.
    pub offset: usize,
}
