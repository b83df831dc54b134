//! Text heuristics used to derive a post's subtitle and cover image from
//! the markup carried in feed entries.

use html_escape::decode_html_entities;

use crate::fetcher::Enclosure;

pub const SUBTITLE_MAX_CHARS: usize = 150;
const ELLIPSIS: &str = "...";

/// Subtitle from the entry's full content, falling back to its description.
/// Returns an empty string when neither yields any text.
pub fn subtitle(content: Option<&str>, description: Option<&str>) -> String {
    content
        .and_then(|markup| summarize(markup, true))
        .or_else(|| description.and_then(|markup| summarize(markup, false)))
        .unwrap_or_default()
}

/// Markup as plain text, truncated to [`SUBTITLE_MAX_CHARS`]. Full content
/// is cut at its first paragraph; descriptions are kept whole. `None` if no
/// text remains.
fn summarize(markup: &str, first_only: bool) -> Option<String> {
    let text = strip_tags(markup);
    let text = text.trim();
    let text = if first_only {
        first_paragraph(text).trim()
    } else {
        text
    };
    if text.is_empty() {
        return None;
    }
    Some(truncate(&decode_html_entities(text), SUBTITLE_MAX_CHARS))
}

/// Replace every `<...>` tag with a single space. An unterminated `<` is
/// kept as text.
pub fn strip_tags(markup: &str) -> String {
    let mut out = String::with_capacity(markup.len());
    let mut tag: Option<String> = None;

    for c in markup.chars() {
        if let Some(pending) = tag.as_mut() {
            if c == '>' {
                tag = None;
                out.push(' ');
            } else {
                pending.push(c);
            }
        } else if c == '<' {
            tag = Some(String::new());
        } else {
            out.push(c);
        }
    }

    if let Some(pending) = tag {
        out.push('<');
        out.push_str(&pending);
    }

    out
}

/// Text up to the first blank line (a newline, optional whitespace, newline).
fn first_paragraph(text: &str) -> &str {
    let mut newline_at: Option<usize> = None;

    for (i, c) in text.char_indices() {
        if c == '\n' {
            if let Some(start) = newline_at {
                return &text[..start];
            }
            newline_at = Some(i);
        } else if !c.is_whitespace() {
            newline_at = None;
        }
    }

    text
}

/// Cut to `max` characters, reserving room for a trailing ellipsis.
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }

    let keep = max.saturating_sub(ELLIPSIS.len());
    let mut out: String = text.chars().take(keep).collect();
    out.push_str(ELLIPSIS);
    out
}

/// Cover image: an `image/*` enclosure, else the first inline image of the
/// content, else the first inline image of the description.
pub fn cover_image(
    enclosures: &[Enclosure],
    content: Option<&str>,
    description: Option<&str>,
) -> Option<String> {
    enclosures
        .iter()
        .find(|enclosure| {
            !enclosure.url.is_empty()
                && enclosure
                    .media_type
                    .as_deref()
                    .is_some_and(|media_type| media_type.starts_with("image/"))
        })
        .map(|enclosure| enclosure.url.clone())
        .or_else(|| content.and_then(first_img_src))
        .or_else(|| description.and_then(first_img_src))
}

/// `src` value of the first `<img>` tag that carries one, by literal scan.
pub fn first_img_src(markup: &str) -> Option<String> {
    let mut rest = markup;

    while let Some(start) = rest.find("<img") {
        let tag_body = &rest[start + "<img".len()..];
        let tag_end = tag_body.find('>').unwrap_or(tag_body.len());
        let tag = &tag_body[..tag_end];

        if let Some(src) = src_attribute(tag) {
            return Some(src.to_string());
        }

        rest = &tag_body[tag_end..];
    }

    None
}

fn src_attribute(tag: &str) -> Option<&str> {
    const ATTR: &str = "src=\"";

    let mut offset = 0;
    while let Some(pos) = tag[offset..].find(ATTR) {
        let at = offset + pos;
        let preceded_by_space = tag[..at]
            .chars()
            .next_back()
            .is_some_and(char::is_whitespace);

        let value_start = at + ATTR.len();
        if preceded_by_space {
            let value = &tag[value_start..];
            let end = value.find('"')?;
            let src = &value[..end];
            return (!src.is_empty()).then_some(src);
        }
        offset = value_start;
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(url: &str) -> Enclosure {
        Enclosure {
            url: url.into(),
            media_type: Some("image/png".into()),
        }
    }

    #[test]
    fn test_subtitle_prefers_content() {
        let s = subtitle(Some("<p>From content</p>"), Some("From description"));
        assert_eq!(s, "From content");
    }

    #[test]
    fn test_subtitle_description_only() {
        let s = subtitle(None, Some("<b>From</b> description"));
        assert_eq!(s, "From  description");
    }

    #[test]
    fn test_subtitle_neither() {
        assert_eq!(subtitle(None, None), "");
    }

    #[test]
    fn test_subtitle_empty_content_falls_back() {
        let s = subtitle(Some("<div><img src=\"x.png\"></div>"), Some("Described"));
        assert_eq!(s, "Described");
    }

    #[test]
    fn test_subtitle_takes_first_paragraph() {
        let s = subtitle(Some("First block\n\nSecond block"), None);
        assert_eq!(s, "First block");

        let s = subtitle(Some("<p>One</p>\n  \n<p>Two</p>"), None);
        assert_eq!(s, "One");
    }

    #[test]
    fn test_subtitle_description_keeps_every_paragraph() {
        let s = subtitle(None, Some("First part\n\nSecond part"));
        assert_eq!(s, "First part\n\nSecond part");

        let s = subtitle(Some("   "), Some("<p>One</p>\n\n<p>Two</p>"));
        assert_eq!(s, "One \n\n Two");
    }

    #[test]
    fn test_subtitle_single_newline_is_not_a_break() {
        let s = subtitle(Some("line one\nline two"), None);
        assert_eq!(s, "line one\nline two");
    }

    #[test]
    fn test_subtitle_decodes_entities() {
        let s = subtitle(Some("<p>Tom &amp; Jerry</p>"), None);
        assert_eq!(s, "Tom & Jerry");
    }

    #[test]
    fn test_strip_tags_keeps_unterminated_bracket() {
        assert_eq!(strip_tags("<i>a</i> < b"), " a  < b");
    }

    #[test]
    fn test_truncate_300_chars() {
        let long = "a".repeat(300);
        let s = subtitle(Some(&long), None);
        assert_eq!(s.chars().count(), 150);
        assert!(s.ends_with("..."));
        assert_eq!(&s[..147], &long[..147]);
    }

    #[test]
    fn test_truncate_exactly_at_limit_untouched() {
        let text = "b".repeat(150);
        assert_eq!(truncate(&text, 150), text);
    }

    #[test]
    fn test_truncate_multibyte() {
        let text = "é".repeat(200);
        let out = truncate(&text, 150);
        assert_eq!(out.chars().count(), 150);
        assert!(out.ends_with("..."));
    }

    #[test]
    fn test_cover_image_prefers_enclosure() {
        let content = r#"<p><img src="https://inline.example.com/a.png"></p>"#;
        let cover = cover_image(&[image("https://cdn.example.com/cover.png")], Some(content), None);
        assert_eq!(cover, Some("https://cdn.example.com/cover.png".into()));
    }

    #[test]
    fn test_cover_image_ignores_non_image_enclosure() {
        let audio = Enclosure {
            url: "https://cdn.example.com/episode.mp3".into(),
            media_type: Some("audio/mpeg".into()),
        };
        let content = r#"<img alt="x" src="https://inline.example.com/a.png">"#;
        let cover = cover_image(&[audio], Some(content), None);
        assert_eq!(cover, Some("https://inline.example.com/a.png".into()));
    }

    #[test]
    fn test_cover_image_content_before_description() {
        let cover = cover_image(
            &[],
            Some(r#"<img src="https://c.example.com/1.png">"#),
            Some(r#"<img src="https://d.example.com/2.png">"#),
        );
        assert_eq!(cover, Some("https://c.example.com/1.png".into()));
    }

    #[test]
    fn test_cover_image_description_fallback() {
        let cover = cover_image(
            &[],
            Some("<p>no images</p>"),
            Some(r#"<img src="https://d.example.com/2.png">"#),
        );
        assert_eq!(cover, Some("https://d.example.com/2.png".into()));
    }

    #[test]
    fn test_cover_image_none() {
        assert_eq!(cover_image(&[], None, None), None);
    }

    #[test]
    fn test_first_img_src_document_order() {
        let html = r#"<img src="one.png"><img src="two.png">"#;
        assert_eq!(first_img_src(html), Some("one.png".into()));
    }

    #[test]
    fn test_first_img_src_skips_data_src() {
        let html = r#"<img data-src="lazy.png" src="real.png">"#;
        assert_eq!(first_img_src(html), Some("real.png".into()));
    }

    #[test]
    fn test_first_img_src_skips_tag_without_src() {
        let html = r#"<img alt="none"><p>text</p><img class="x" src="second.png">"#;
        assert_eq!(first_img_src(html), Some("second.png".into()));
    }
}
