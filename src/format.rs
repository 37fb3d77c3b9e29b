// Lightweight markup to display markup.
//
// Substitutions run in a fixed order over the whole string. Double-asterisk
// spans are consumed first and the single-asterisk pass only sees what is
// left over. Nothing is escaped: markup-like input is passed through verbatim.

use lazy_static::lazy_static;
use regex::Regex;

// Span content never crosses a line terminator: \n, \r, U+2028 or U+2029
lazy_static! {
    static ref BOLD: Regex = Regex::new(r"\*\*([^\n\r\u{2028}\u{2029}]*?)\*\*").unwrap();
    static ref ITALIC: Regex = Regex::new(r"\*([^\n\r\u{2028}\u{2029}]*?)\*").unwrap();
    static ref CODE: Regex = Regex::new(r"`([^\n\r\u{2028}\u{2029}]*?)`").unwrap();
    static ref LINK: Regex =
        Regex::new(r"\[([^\n\r\u{2028}\u{2029}]*?)\]\(([^\n\r\u{2028}\u{2029}]*?)\)").unwrap();
}

const LINK_TEMPLATE: &str =
    r#"<a href="${2}" class="text-primary hover:underline" target="_blank" rel="noopener noreferrer">${1}</a>"#;

/// Apply bold, italic, code, link and line-break substitutions, in that order.
pub fn format_message_text(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let formatted = BOLD.replace_all(text, "<strong>${1}</strong>");
    let formatted = ITALIC.replace_all(&formatted, "<em>${1}</em>");
    let formatted = CODE.replace_all(&formatted, "<code>${1}</code>");
    let formatted = LINK.replace_all(&formatted, LINK_TEMPLATE);
    formatted.replace('\n', "<br />")
}
