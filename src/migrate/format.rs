//! Narrow markdown-to-HTML pass applied to replayed message bodies.
//!
//! Only two substitutions exist: a triple-backtick span, then a
//! single-backtick span, each rendered as `<code>`. Both patterns are
//! greedy and line-bound, so a line with two code spans becomes one
//! `<code>` element running from the first opening fence to the last
//! closing fence.

use regex_lite::Regex;
use std::sync::LazyLock;

use crate::matrix::content::TextContent;

static FENCED_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("```(.+)```").expect("valid fenced code regex"));
static INLINE_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("`(.+)`").expect("valid inline code regex"));

fn render_code_spans(raw: &str) -> String {
    let fenced = FENCED_CODE.replace_all(raw, "<code>${1}</code>");
    INLINE_CODE
        .replace_all(&fenced, "<code>${1}</code>")
        .into_owned()
}

/// Build the `m.text` payload for a source message body.
///
/// With an ancestor the body is sent verbatim as a reply; otherwise an HTML
/// rendering is attached only when a code span was found.
pub fn format_message(raw: &str, ancestor_event_id: Option<&str>) -> TextContent {
    if let Some(ancestor) = ancestor_event_id {
        return TextContent::reply(raw, ancestor);
    }

    let formatted = render_code_spans(raw);
    if formatted == raw {
        TextContent::plain(raw)
    } else {
        TextContent::html(raw, formatted)
    }
}

#[cfg(test)]
mod tests {
    use super::format_message;
    use crate::matrix::content::CUSTOM_HTML_FORMAT;

    #[test]
    fn body_without_backticks_stays_plain() {
        let content = format_message("hello *world*", None);
        assert_eq!(content.body, "hello *world*");
        assert_eq!(content.format, None);
        assert_eq!(content.formatted_body, None);
        assert_eq!(content.relates_to, None);
    }

    #[test]
    fn inline_code_gets_html_rendering() {
        let content = format_message("`x`", None);
        assert_eq!(content.body, "`x`");
        assert_eq!(content.format, Some(CUSTOM_HTML_FORMAT));
        assert_eq!(content.formatted_body.as_deref(), Some("<code>x</code>"));
    }

    #[test]
    fn fenced_code_on_one_line_becomes_single_span() {
        let content = format_message("run ```cargo test``` now", None);
        assert_eq!(
            content.formatted_body.as_deref(),
            Some("run <code>cargo test</code> now")
        );
    }

    #[test]
    fn two_fences_collapse_into_one_greedy_span() {
        let content = format_message("```a``` and ```b```", None);
        assert_eq!(
            content.formatted_body.as_deref(),
            Some("<code>a<code>`` and ``</code>b</code>")
        );
    }

    #[test]
    fn two_inline_spans_collapse_into_one_greedy_span() {
        let content = format_message("use `a` and `b`", None);
        assert_eq!(
            content.formatted_body.as_deref(),
            Some("use <code>a` and `b</code>")
        );
    }

    #[test]
    fn ancestor_produces_reply_without_markdown() {
        let content = format_message("see `x`", Some("$parent:localhost"));
        assert_eq!(content.body, "see `x`");
        assert_eq!(content.formatted_body, None);
        let relation = content.relates_to.expect("reply relation");
        assert_eq!(relation.in_reply_to.event_id, "$parent:localhost");
    }

    #[test]
    fn lone_backtick_is_left_alone() {
        let content = format_message("it`s fine", None);
        assert_eq!(content.formatted_body, None);
    }
}
