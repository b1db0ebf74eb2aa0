//! HTML pages
//!
//! Gist metadata is escaped before it reaches the page. Rendered file bodies
//! are already HTML and are embedded as-is.

use std::fmt::Write;

use html_escape::{encode_double_quoted_attribute, encode_text};

use crate::models::{Author, Gist};

const STYLE: &str = "body{max-width:42em;margin:2em auto;padding:0 1em;\
font-family:Georgia,serif;line-height:1.5;color:#222}\
header{display:flex;align-items:center;gap:.75em;margin-bottom:2em}\
header img{width:48px;height:48px;border-radius:50%}\
pre{overflow-x:auto;background:#f6f6f6;padding:.75em}\
footer{margin-top:3em;font-size:.85em;color:#777}";

fn page(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>{}</title>\n<style>{}</style>\n</head>\n<body>\n{}</body>\n</html>\n",
        encode_text(title),
        STYLE,
        body
    )
}

/// Full page for one gist
pub fn render_gist_page(author: &Author, gist: &Gist) -> String {
    let mut body = String::new();

    let _ = write!(
        body,
        "<header>\n<a href=\"{profile}\"><img src=\"{avatar}\" alt=\"{login}\"></a>\n\
         <a href=\"{profile}\">{login_text}</a>\n</header>\n",
        profile = encode_double_quoted_attribute(&author.html_url),
        avatar = encode_double_quoted_attribute(&author.avatar_url),
        login = encode_double_quoted_attribute(&author.login),
        login_text = encode_text(&author.login),
    );

    if let Some(description) = gist.description.as_deref().filter(|d| !d.is_empty()) {
        let _ = writeln!(body, "<h1 class=\"description\">{}</h1>", encode_text(description));
    }

    for file in &gist.files {
        let _ = write!(
            body,
            "<article class=\"file\" data-filename=\"{}\">\n{}</article>\n",
            encode_double_quoted_attribute(&file.filename),
            file.rendered_html
        );
    }

    let _ = write!(
        body,
        "<footer>Updated {} &middot; <a href=\"{}\">View on GitHub</a></footer>\n",
        gist.updated_at.format("%e %B %Y"),
        encode_double_quoted_attribute(&gist.html_url),
    );

    page(&gist.title(), &body)
}

/// Landing page explaining the URL scheme
pub fn render_home_page() -> String {
    page(
        "Gistio",
        "<h1>Gistio</h1>\n\
         <p>Writing for hackers. Write a Markdown or reStructuredText file in a \
         GitHub gist, then replace <code>gist.github.com</code> in its URL with \
         this host.</p>\n\
         <p><code>/&lt;gist id&gt;</code> shows the rendered gist and \
         <code>/&lt;gist id&gt;/content</code> returns it as JSON.</p>\n",
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RenderedFile;
    use chrono::{TimeZone, Utc};

    fn sample() -> (Author, Gist) {
        let when = Utc.with_ymd_and_hms(2013, 3, 1, 10, 0, 0).unwrap();
        let author = Author {
            id: "4242".to_string(),
            login: "octo<cat>".to_string(),
            avatar_url: "https://avatars.example/u/4242".to_string(),
            html_url: "https://github.com/octocat".to_string(),
            account_type: "User".to_string(),
            fetched_at: when,
        };
        let gist = Gist {
            id: "12345".to_string(),
            html_url: "https://gist.github.com/12345".to_string(),
            public: true,
            description: Some("Fish & \"chips\"".to_string()),
            created_at: when,
            updated_at: when,
            author_id: "4242".to_string(),
            author_login: "octo<cat>".to_string(),
            files: vec![
                RenderedFile {
                    filename: "a.md".to_string(),
                    language: Some("Markdown".to_string()),
                    raw_content: "one".to_string(),
                    rendered_html: "<p>one</p>\n".to_string(),
                },
                RenderedFile {
                    filename: "b.rst".to_string(),
                    language: Some("reStructuredText".to_string()),
                    raw_content: "two".to_string(),
                    rendered_html: "<p>two</p>\n".to_string(),
                },
            ],
        };
        (author, gist)
    }

    #[test]
    fn test_metadata_is_escaped() {
        let (author, gist) = sample();
        let html = render_gist_page(&author, &gist);

        assert!(html.contains("octo&lt;cat&gt;"));
        assert!(!html.contains("octo<cat>"));
        assert!(html.contains("Fish &amp; \"chips\""));
    }

    #[test]
    fn test_files_embedded_in_order() {
        let (author, gist) = sample();
        let html = render_gist_page(&author, &gist);

        let one = html.find("<p>one</p>").unwrap();
        let two = html.find("<p>two</p>").unwrap();
        assert!(one < two);
        assert!(html.contains("https://avatars.example/u/4242"));
    }

    #[test]
    fn test_title_falls_back_to_id() {
        let (author, mut gist) = sample();
        gist.description = None;
        let html = render_gist_page(&author, &gist);
        assert!(html.contains("<title>Gist 12345</title>"));
        assert!(!html.contains("class=\"description\""));
    }

    #[test]
    fn test_home_page() {
        let html = render_home_page();
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("/&lt;gist id&gt;/content"));
    }
}
