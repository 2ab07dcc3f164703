use alloc::string::String;
use alloc::vec;

use rstest::rstest;

use crate::{Document, ParseError, ParseErrorKind};

fn fail(json: &[u8]) -> ParseError {
    Document::from_json(json).unwrap_err()
}

#[rstest]
#[case::empty_input(b"", ParseErrorKind::IllegalValue)]
#[case::whitespace_only(b"   ", ParseErrorKind::IllegalValue)]
#[case::scalar_root(b"null", ParseErrorKind::IllegalValue)]
#[case::string_root(b"\"hi\"", ParseErrorKind::IllegalValue)]
#[case::lone_brace(b"{", ParseErrorKind::UnterminatedObject)]
#[case::lone_bracket(b"[", ParseErrorKind::UnterminatedArray)]
#[case::truncated_array(b"[1,2,", ParseErrorKind::UnterminatedArray)]
#[case::unclosed_object(b"{\"a\":1 ", ParseErrorKind::UnterminatedObject)]
#[case::missing_comma(b"[1 2]", ParseErrorKind::MissingValueSeparator)]
#[case::missing_colon(b"{\"a\" 1}", ParseErrorKind::MissingNameSeparator)]
#[case::number_at_end(b"{\"a\":1", ParseErrorKind::TerminationByNumber)]
#[case::trailing_comma_array(b"[1,]", ParseErrorKind::MissingObject)]
#[case::trailing_comma_object(b"{\"a\":1,}", ParseErrorKind::MissingObject)]
#[case::misspelled_true(b"[tru]", ParseErrorKind::IllegalValue)]
#[case::misspelled_null(b"[nul]", ParseErrorKind::IllegalValue)]
#[case::leading_plus(b"[+1]", ParseErrorKind::IllegalValue)]
#[case::dangling_exponent(b"[1e]", ParseErrorKind::IllegalNumber)]
#[case::unterminated_string(b"[\"a", ParseErrorKind::UnterminatedString)]
#[case::invalid_utf8(b"[\"\xff\"]", ParseErrorKind::IllegalUtf8String)]
#[case::short_unicode_escape(b"[\"\\u123\"]", ParseErrorKind::IllegalEscapeSequence)]
#[case::backslash_at_end(b"[\"a\\", ParseErrorKind::IllegalEscapeSequence)]
#[case::trailing_garbage(b"{\"a\":1} x", ParseErrorKind::GarbageAtEnd)]
#[case::extra_bracket(b"[]]", ParseErrorKind::GarbageAtEnd)]
fn rejected(#[case] json: &[u8], #[case] kind: ParseErrorKind) {
    assert_eq!(fail(json).kind, kind);
}

#[rstest]
#[case(b"[1,2,", 5)]
#[case(b"[1 2]", 3)]
#[case(b"{\"a\" 1}", 5)]
#[case(b"{\"a\":1} x", 8)]
#[case(b"[]]", 2)]
fn error_offsets(#[case] json: &[u8], #[case] offset: usize) {
    assert_eq!(fail(json).offset, offset);
}

#[test]
fn nesting_limit() {
    let mut deep = vec![b'['; 1100];
    deep.extend_from_slice(&vec![b']'; 1100]);
    assert_eq!(fail(&deep).kind, ParseErrorKind::DeepNesting);

    // 1024 levels is still fine.
    let mut ok = vec![b'['; 1024];
    ok.extend_from_slice(&vec![b']'; 1024]);
    assert!(Document::from_json(&ok).is_ok());
}

#[test]
fn oversized_document_is_rejected() {
    // Empty arrays inflate three input bytes into sixteen buffer bytes, so
    // the 128 MiB buffer ceiling is reachable from a ~30 MiB input.
    let n = 10_000_000;
    let mut json = String::with_capacity(3 * n + 2);
    json.push('[');
    for _ in 0..n {
        json.push_str("[],");
    }
    json.pop();
    json.push(']');
    assert_eq!(fail(json.as_bytes()).kind, ParseErrorKind::DocumentTooLarge);
}

#[test]
fn errors_format_with_offset() {
    let err = fail(b"[1 2]");
    let text = alloc::format!("{err}");
    assert_eq!(text, "missing value separator at offset 3");
}
