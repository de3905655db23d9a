//! Message text formatting.
//!
//! Lengths are counted in Unicode scalar values, matching how Telegram
//! counts message limits.

/// Limit for a text-only message.
pub const MAX_TEXT_LENGTH: usize = 4096 - 4;

/// Limit for a caption attached to a photo.
pub const MAX_MEDIA_CAPTION_LENGTH: usize = 1024 - 32;

/// Marker appended to truncated text.
pub const ELLIPSIS: &str = "\u{2026}";

const TITLE_TEXT_SEPARATOR: &str = "\n\n";

/// Build an HTML message: the title linked to `href`, a blank line, then
/// the text, fitted into `max_length` characters.
///
/// The text is truncated first. When the header alone does not fit, the
/// title is truncated and the text dropped. When not even an empty title
/// fits, the bare `href` is returned.
pub fn format_message_text(title: &str, text: &str, href: &str, max_length: usize) -> String {
    let href_escaped = html_escape::encode_double_quoted_attribute(href);
    let title = sanitize_text(title);

    let header = format_header(&href_escaped, &title);
    let header_length = unicode_length(&header);

    if header_length > max_length {
        let overhead = unicode_length(&format_header(&href_escaped, ""));
        if overhead >= max_length {
            return href.to_string();
        }

        let title = trim_long_text(&title, max_length - overhead);
        return format_header(&href_escaped, &title);
    }

    let separator_length = unicode_length(TITLE_TEXT_SEPARATOR);
    if header_length + separator_length >= max_length {
        return header;
    }

    let text = sanitize_text(text);
    let text = trim_long_text(&text, max_length - header_length - separator_length);
    format!("{}{}{}", header, TITLE_TEXT_SEPARATOR, text)
}

fn format_header(href: &str, title: &str) -> String {
    format!("<a href=\"{}\"><strong>{}</strong></a>", href, title)
}

/// Number of characters in `text`.
pub fn unicode_length(text: &str) -> usize {
    text.chars().count()
}

/// Cut `text` to at most `max` characters, ending with an ellipsis when
/// anything was removed.
pub fn trim_long_text(text: &str, max: usize) -> String {
    if unicode_length(text) <= max {
        return text.to_string();
    }

    let keep = max.saturating_sub(unicode_length(ELLIPSIS));
    let mut trimmed: String = text.chars().take(keep).collect();
    trimmed.push_str(ELLIPSIS);
    trimmed
}

/// Replace non-breaking spaces, which Telegram renders poorly.
fn sanitize_text(text: &str) -> String {
    text.replace('\u{a0}', " ")
}
