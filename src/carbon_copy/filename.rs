//! Local file names for carbon copies.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::article::Article;

static ARTICLE_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[0-9]{3,}").expect("valid article number pattern"));

/// Build a file name from the article's link and title.
///
/// The first run of three or more digits in the link (usually the post
/// number) prefixes the sanitized title: `"704622 - Title.html"`.
pub fn extract_file_name(article: &Article) -> String {
    let mut name = ARTICLE_NUMBER
        .find(&article.link_url)
        .map(|m| m.as_str().to_string())
        .unwrap_or_default();

    let mut has_title = false;
    for ch in article.title.trim().chars().filter(|&ch| is_allowed_char(ch)) {
        if !has_title {
            has_title = true;
            if !name.is_empty() {
                name.push_str(" - ");
            }
        }
        name.push(if ch.is_whitespace() { ' ' } else { ch });
    }

    let mut name = name.trim_end_matches(|c| c == '.' || c == ' ').to_string();
    name.push_str(".html");
    name
}

fn is_allowed_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch.is_whitespace() || matches!(ch, '-' | ',' | '.' | '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file_name(title: &str, link: &str) -> String {
        extract_file_name(&Article::new("1").with_title(title).with_link(link))
    }

    #[test]
    fn test_extract_file_name() {
        let cases = [
            (
                "Программный рендер в стиле игры Doom",
                "https://habr.com/ru/post/704622/",
                "704622 - Программный рендер в стиле игры Doom.html",
            ),
            (
                "  Программный рендер в стиле игры Doom  ",
                "https://habr.com/post/704622",
                "704622 - Программный рендер в стиле игры Doom.html",
            ),
            (
                "  Программный рендер - в стиле, игры. Doom. /?+*/\\  ",
                "https://habr.com/post/704622",
                "704622 - Программный рендер - в стиле, игры. Doom.html",
            ),
            (
                "Программный рендер в стиле игры Doom",
                "https://habr.com/post/no-article-id",
                "Программный рендер в стиле игры Doom.html",
            ),
        ];

        for (title, link, expected) in cases {
            assert_eq!(file_name(title, link), expected, "title {:?}", title);
        }
    }

    #[test]
    fn test_extract_file_name_without_title() {
        assert_eq!(file_name("", "https://habr.com/post/704622"), "704622.html");
        assert_eq!(file_name("???", "https://habr.com/post/"), ".html");
    }

    #[test]
    fn test_extract_file_name_replaces_tabs() {
        assert_eq!(file_name("a\tb", "https://x.com/123"), "123 - a b.html");
    }
}
