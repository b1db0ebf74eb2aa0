//! Typographic punctuation for rendered HTML
//!
//! Straight quotes become curly quotes, `--` an em dash and `...` an
//! ellipsis. Only text between tags is touched, and text inside `pre`,
//! `code`, `kbd`, `script`, `style` or `math` is left alone. Replacements are
//! written as numeric entities.

use std::cell::Cell;
use std::rc::Rc;

use lol_html::html_content::ContentType;
use lol_html::{doc_text, element, end_tag, rewrite_str, RewriteStrSettings};

use super::RenderError;

const SKIP_TAGS: &[&str] = &["pre", "code", "kbd", "script", "style", "math"];

/// Tags after which quote context starts fresh
const BLOCK_TAGS: &[&str] = &[
    "blockquote", "br", "dd", "div", "dl", "dt", "h1", "h2", "h3", "h4", "h5", "h6", "hr", "li",
    "ol", "p", "table", "td", "th", "tr", "ul",
];

const OPEN_DOUBLE: &str = "&#8220;";
const CLOSE_DOUBLE: &str = "&#8221;";
const OPEN_SINGLE: &str = "&#8216;";
const CLOSE_SINGLE: &str = "&#8217;";
const EM_DASH: &str = "&#8212;";
const ELLIPSIS: &str = "&#8230;";

/// Apply the typographic pass to an HTML fragment
pub fn educate(html: &str) -> Result<String, RenderError> {
    let skip_depth = Rc::new(Cell::new(0usize));
    // Last visible character, used to decide whether a quote opens or closes
    let previous = Rc::new(Cell::new(None::<char>));

    let element_handler = {
        let skip_depth = Rc::clone(&skip_depth);
        let previous = Rc::clone(&previous);
        element!("*", move |el| {
            let name = el.tag_name().to_ascii_lowercase();
            let skips = SKIP_TAGS.contains(&name.as_str());
            let block = BLOCK_TAGS.contains(&name.as_str());

            if block {
                previous.set(None);
            }
            if !skips && !block {
                return Ok(());
            }

            // Void elements have no end tag and nothing inside to skip
            if let Some(handlers) = el.end_tag_handlers() {
                if skips {
                    skip_depth.set(skip_depth.get() + 1);
                }
                let skip_depth = Rc::clone(&skip_depth);
                let previous = Rc::clone(&previous);
                handlers.push(end_tag!(move |_end| {
                    if skips {
                        skip_depth.set(skip_depth.get().saturating_sub(1));
                    }
                    if block {
                        previous.set(None);
                    }
                    Ok(())
                }));
            }
            Ok(())
        })
    };

    let text_handler = {
        let mut pending = String::new();
        doc_text!(move |chunk| {
            if skip_depth.get() > 0 {
                if let Some(last) = chunk.as_str().chars().last() {
                    previous.set(Some(last));
                }
                return Ok(());
            }

            // A text node may arrive in several chunks; educate it whole
            pending.push_str(chunk.as_str());
            if chunk.last_in_text_node() {
                let mut out = String::with_capacity(pending.len() + pending.len() / 8);
                previous.set(educate_text(&pending, previous.get(), &mut out));
                chunk.replace(&out, ContentType::Html);
                pending.clear();
            } else {
                chunk.remove();
            }
            Ok(())
        })
    };

    rewrite_str(
        html,
        RewriteStrSettings {
            element_content_handlers: vec![element_handler],
            document_content_handlers: vec![text_handler],
            ..RewriteStrSettings::default()
        },
    )
    .map_err(|e| RenderError::Local(format!("typographic pass failed: {}", e)))
}

fn educate_text(text: &str, mut previous: Option<char>, out: &mut String) -> Option<char> {
    let normalized = text
        .replace("&quot;", "\"")
        .replace("&#34;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'");
    let chars: Vec<char> = normalized.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let rest = &chars[i..];
        let next = chars.get(i + 1).copied();

        let (replacement, consumed, visible) = if rest.starts_with(&['-', '-']) {
            (EM_DASH, 2, '\u{2014}')
        } else if rest.starts_with(&['.', ' ', '.', ' ', '.']) {
            (ELLIPSIS, 5, '\u{2026}')
        } else if rest.starts_with(&['.', '.', '.']) {
            (ELLIPSIS, 3, '\u{2026}')
        } else if rest.starts_with(&['`', '`']) {
            (OPEN_DOUBLE, 2, '\u{201C}')
        } else if rest.starts_with(&['\'', '\'']) {
            (CLOSE_DOUBLE, 2, '\u{201D}')
        } else if chars[i] == '"' {
            if opens(previous) && next.map_or(true, |c| !c.is_whitespace()) {
                (OPEN_DOUBLE, 1, '\u{201C}')
            } else {
                (CLOSE_DOUBLE, 1, '\u{201D}')
            }
        } else if chars[i] == '\'' {
            let decade = next.is_some_and(|c| c.is_ascii_digit())
                && chars.get(i + 2).is_some_and(|c| c.is_ascii_digit());
            if previous.is_some_and(char::is_alphanumeric) || decade {
                (CLOSE_SINGLE, 1, '\u{2019}')
            } else if opens(previous) && next.map_or(true, |c| !c.is_whitespace()) {
                (OPEN_SINGLE, 1, '\u{2018}')
            } else {
                (CLOSE_SINGLE, 1, '\u{2019}')
            }
        } else {
            out.push(chars[i]);
            previous = Some(chars[i]);
            i += 1;
            continue;
        };

        out.push_str(replacement);
        previous = Some(visible);
        i += consumed;
    }

    previous
}

/// Whether a quote following `previous` starts a quotation
fn opens(previous: Option<char>) -> bool {
    match previous {
        None => true,
        Some(c) => {
            c.is_whitespace()
                || matches!(
                    c,
                    '(' | '[' | '{' | '-' | '\u{2013}' | '\u{2014}' | '\u{201C}' | '\u{2018}'
                )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_html_is_unchanged() {
        let html = "<p>Hello <em>world</em></p>\n";
        assert_eq!(educate(html).unwrap(), html);
    }

    #[test]
    fn test_double_quotes() {
        assert_eq!(
            educate("<p>\"Hello,\" she said.</p>").unwrap(),
            "<p>&#8220;Hello,&#8221; she said.</p>"
        );
    }

    #[test]
    fn test_escaped_quotes_count_as_quotes() {
        assert_eq!(
            educate("<p>&quot;hi&quot;</p>").unwrap(),
            "<p>&#8220;hi&#8221;</p>"
        );
    }

    #[test]
    fn test_single_quotes_and_apostrophes() {
        assert_eq!(
            educate("'Don't,' said the '80s.").unwrap(),
            "&#8216;Don&#8217;t,&#8217; said the &#8217;80s."
        );
    }

    #[test]
    fn test_quote_after_inline_tag_closes() {
        assert_eq!(
            educate("<p>\"<em>Really</em>\"</p>").unwrap(),
            "<p>&#8220;<em>Really</em>&#8221;</p>"
        );
    }

    #[test]
    fn test_dashes_and_ellipses() {
        assert_eq!(
            educate("wait -- what... and . . . then").unwrap(),
            "wait &#8212; what&#8230; and &#8230; then"
        );
    }

    #[test]
    fn test_backtick_quotes() {
        assert_eq!(educate("``quoted''").unwrap(), "&#8220;quoted&#8221;");
    }

    #[test]
    fn test_code_and_attributes_untouched() {
        let html = "<p><a href=\"x--y\">go</a> <code>\"a\" -- b</code></p>\n<pre><code>it's...</code></pre>";
        assert_eq!(educate(html).unwrap(), html);
    }

    #[test]
    fn test_block_boundary_resets_context() {
        assert_eq!(
            educate("<h1>Title</h1><p>\"Quote\"</p>").unwrap(),
            "<h1>Title</h1><p>&#8220;Quote&#8221;</p>"
        );
    }

    #[test]
    fn test_attribute_values_untouched() {
        assert_eq!(
            educate("<p><img alt=\"a>b\" title=\"it's\"> \"hi\"</p>").unwrap(),
            "<p><img alt=\"a>b\" title=\"it's\"> &#8220;hi&#8221;</p>"
        );
    }

    #[test]
    fn test_quote_context_spans_skipped_code() {
        assert_eq!(
            educate("<p>Run <code>ls</code>'s output</p>").unwrap(),
            "<p>Run <code>ls</code>&#8217;s output</p>"
        );
    }

    #[test]
    fn test_stray_angle_bracket_is_text() {
        assert_eq!(educate("a < b -- c").unwrap(), "a < b &#8212; c");
    }
}
