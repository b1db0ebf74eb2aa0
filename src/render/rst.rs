//! reStructuredText to HTML fragment
//!
//! Covers the constructs gists actually use: section titles, paragraphs,
//! bullet/enumerated/definition lists, literal blocks, block quotes, comments,
//! transitions, a handful of directives (code, admonitions, image) and the
//! common inline markup. Unknown directives are dropped like comments.

use html_escape::{encode_double_quoted_attribute, encode_text, encode_text_to_string};

use super::RenderError;

/// Deepest section level that maps onto an HTML heading
const MAX_SECTION_DEPTH: usize = 6;

/// Deepest nesting of block constructs (lists, quotes, directives)
const MAX_NESTING_DEPTH: usize = 64;

const ADMONITIONS: &[&str] = &[
    "attention",
    "caution",
    "danger",
    "error",
    "hint",
    "important",
    "note",
    "tip",
    "warning",
];

/// Render a reStructuredText document body to an HTML fragment
pub fn render_fragment(source: &str) -> Result<String, RenderError> {
    let lines: Vec<String> = source
        .lines()
        .map(|line| expand_tabs(line).trim_end().to_string())
        .collect();

    let mut renderer = Renderer::default();
    renderer.blocks(&lines)?;
    Ok(renderer.out)
}

#[derive(Default)]
struct Renderer {
    /// Adornment styles in order of first appearance; index + 1 is the level
    styles: Vec<(char, bool)>,
    /// Current block nesting depth
    depth: usize,
    out: String,
}

enum ListKind {
    Bullet(char),
    Enumerated,
}

impl Renderer {
    fn blocks(&mut self, lines: &[String]) -> Result<(), RenderError> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(RenderError::Local(format!(
                "blocks nest deeper than {} levels",
                MAX_NESTING_DEPTH
            )));
        }
        self.depth += 1;
        let result = self.block_sequence(lines);
        self.depth -= 1;
        result
    }

    fn block_sequence(&mut self, lines: &[String]) -> Result<(), RenderError> {
        let mut i = 0;
        while i < lines.len() {
            let line = &lines[i];
            if line.is_empty() {
                i += 1;
                continue;
            }

            if indent_of(line) > 0 {
                let end = indented_end(lines, i, 1);
                self.out.push_str("<blockquote>\n");
                self.blocks(&dedent(&lines[i..end]))?;
                self.out.push_str("</blockquote>\n");
                i = end;
                continue;
            }

            if let Some(next) = self.title(lines, i)? {
                i = next;
                continue;
            }

            if is_transition(lines, i) {
                self.out.push_str("<hr class=\"docutils\" />\n");
                i += 1;
                continue;
            }

            if line == ".." || line.starts_with(".. ") {
                i = self.explicit(lines, i)?;
                continue;
            }

            if let Some((marker, _)) = bullet(line) {
                i = self.list(lines, i, ListKind::Bullet(marker))?;
                continue;
            }

            if enumerator(line).is_some() {
                i = self.list(lines, i, ListKind::Enumerated)?;
                continue;
            }

            i = self.paragraph(lines, i)?;
        }
        Ok(())
    }

    fn title(&mut self, lines: &[String], i: usize) -> Result<Option<usize>, RenderError> {
        let line = &lines[i];

        if let Some(c) = adornment(line) {
            let over = lines.get(i + 1).zip(lines.get(i + 2));
            if let Some((text, under)) = over {
                if !text.trim().is_empty() && adornment(under) == Some(c) {
                    self.heading(text.trim(), (c, true))?;
                    return Ok(Some(i + 3));
                }
            }
            return Ok(None);
        }

        if let Some(under) = lines.get(i + 1) {
            if let Some(c) = adornment(under) {
                if under.chars().count() >= line.chars().count() {
                    self.heading(line.trim(), (c, false))?;
                    return Ok(Some(i + 2));
                }
            }
        }
        Ok(None)
    }

    fn heading(&mut self, text: &str, style: (char, bool)) -> Result<(), RenderError> {
        let level = match self.styles.iter().position(|s| *s == style) {
            Some(index) => index + 1,
            None => {
                self.styles.push(style);
                self.styles.len()
            }
        };
        if level > MAX_SECTION_DEPTH {
            return Err(RenderError::Local(format!(
                "section title {:?} nests deeper than {} levels",
                text, MAX_SECTION_DEPTH
            )));
        }

        self.out.push_str(&format!(
            "<h{level} id=\"{}\">{}</h{level}>\n",
            slug(text),
            inline(text)
        ));
        Ok(())
    }

    fn explicit(&mut self, lines: &[String], i: usize) -> Result<usize, RenderError> {
        let end = indented_end(lines, i + 1, 1);
        let body = dedent(&lines[i + 1..end]);
        let markup = lines[i].trim_start_matches("..").trim();

        let Some((name, argument)) = markup.split_once("::") else {
            // Comment or hyperlink target
            return Ok(end);
        };
        let name = name.trim().to_ascii_lowercase();
        let argument = argument.trim();

        match name.as_str() {
            "code" | "code-block" | "sourcecode" => {
                let code: Vec<&str> = body
                    .iter()
                    .skip_while(|l| l.starts_with(':'))
                    .skip_while(|l| l.is_empty())
                    .map(String::as_str)
                    .collect();
                let class = if argument.is_empty() {
                    "code literal-block".to_string()
                } else {
                    format!("code {} literal-block", encode_double_quoted_attribute(argument))
                };
                self.out.push_str(&format!(
                    "<pre class=\"{}\">{}</pre>\n",
                    class,
                    encode_text(code.join("\n").trim_end())
                ));
            }
            "image" if !argument.is_empty() => {
                let src = encode_double_quoted_attribute(argument);
                self.out
                    .push_str(&format!("<img alt=\"{src}\" src=\"{src}\" />\n"));
            }
            admonition if ADMONITIONS.contains(&admonition) => {
                let mut title = admonition.to_string();
                title[..1].make_ascii_uppercase();
                self.out.push_str(&format!(
                    "<div class=\"admonition {admonition}\">\n<p class=\"first admonition-title\">{title}</p>\n"
                ));
                if !argument.is_empty() {
                    self.out.push_str(&format!("<p>{}</p>\n", inline(argument)));
                }
                self.blocks(&body)?;
                self.out.push_str("</div>\n");
            }
            _ => {}
        }
        Ok(end)
    }

    fn list(&mut self, lines: &[String], mut i: usize, kind: ListKind) -> Result<usize, RenderError> {
        match &kind {
            ListKind::Bullet(_) => self.out.push_str("<ul>\n"),
            ListKind::Enumerated => match enumerator(&lines[i]).and_then(|(start, _)| start) {
                Some(start) if start != 1 => {
                    self.out.push_str(&format!("<ol start=\"{}\">\n", start))
                }
                _ => self.out.push_str("<ol>\n"),
            },
        }

        loop {
            let width = match &kind {
                ListKind::Bullet(_) => bullet(&lines[i]).map(|(_, w)| w),
                ListKind::Enumerated => enumerator(&lines[i]).map(|(_, w)| w),
            };
            let Some(width) = width else { break };

            let end = indented_end(lines, i + 1, width);
            let mut item = vec![lines[i][width..].to_string()];
            item.extend(lines[i + 1..end].iter().map(|l| strip_indent(l, width)));

            let simple = item
                .iter()
                .all(|l| !l.is_empty() && indent_of(l) == 0 && bullet(l).is_none() && enumerator(l).is_none());
            if simple {
                self.out.push_str(&format!("<li>{}</li>\n", inline(&item.join("\n"))));
            } else {
                self.out.push_str("<li>");
                self.blocks(&item)?;
                self.out.push_str("</li>\n");
            }

            i = skip_blank(lines, end);
            let continues = i < lines.len()
                && indent_of(&lines[i]) == 0
                && match &kind {
                    ListKind::Bullet(marker) => bullet(&lines[i]).map(|(m, _)| m) == Some(*marker),
                    ListKind::Enumerated => enumerator(&lines[i]).is_some(),
                };
            if !continues {
                i = end;
                break;
            }
        }

        match kind {
            ListKind::Bullet(_) => self.out.push_str("</ul>\n"),
            ListKind::Enumerated => self.out.push_str("</ol>\n"),
        }
        Ok(i)
    }

    fn paragraph(&mut self, lines: &[String], start: usize) -> Result<usize, RenderError> {
        let mut end = start;
        while end < lines.len() && !lines[end].is_empty() && indent_of(&lines[end]) == 0 {
            end += 1;
        }

        // A single line followed directly by indented lines is a definition list
        if end == start + 1 && lines.get(end).is_some_and(|l| !l.is_empty() && indent_of(l) > 0) {
            return self.definitions(lines, start);
        }

        let text = lines[start..end].join("\n");
        let Some(stripped) = text.strip_suffix("::") else {
            self.out.push_str(&format!("<p>{}</p>\n", inline(&text)));
            return Ok(end);
        };

        let intro = if stripped.is_empty() {
            None
        } else if stripped.ends_with(char::is_whitespace) {
            Some(stripped.trim_end().to_string())
        } else {
            Some(format!("{}:", stripped))
        };
        if let Some(intro) = intro {
            self.out.push_str(&format!("<p>{}</p>\n", inline(&intro)));
        }

        let body_start = skip_blank(lines, end);
        if body_start < lines.len() && indent_of(&lines[body_start]) > 0 {
            let body_end = indented_end(lines, body_start, 1);
            let literal = dedent(&lines[body_start..body_end]).join("\n");
            self.out.push_str(&format!(
                "<pre class=\"literal-block\">{}</pre>\n",
                encode_text(&literal)
            ));
            return Ok(body_end);
        }
        Ok(end)
    }

    fn definitions(&mut self, lines: &[String], mut i: usize) -> Result<usize, RenderError> {
        self.out.push_str("<dl class=\"docutils\">\n");
        loop {
            let end = indented_end(lines, i + 1, 1);
            self.out.push_str(&format!("<dt>{}</dt>\n<dd>", inline(&lines[i])));
            self.blocks(&dedent(&lines[i + 1..end]))?;
            self.out.push_str("</dd>\n");

            let next = skip_blank(lines, end);
            let is_term = next + 1 < lines.len()
                && indent_of(&lines[next]) == 0
                && !lines[next + 1].is_empty()
                && indent_of(&lines[next + 1]) > 0
                && bullet(&lines[next]).is_none()
                && enumerator(&lines[next]).is_none()
                && !lines[next].starts_with("..");
            if !is_term {
                i = end;
                break;
            }
            i = next;
        }
        self.out.push_str("</dl>\n");
        Ok(i)
    }
}

fn inline(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut plain = String::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];

        if c == '\\' && i + 1 < chars.len() {
            plain.push(chars[i + 1]);
            i += 2;
            continue;
        }

        if can_start(&chars, i) {
            if let Some((html, next)) = markup_at(&chars, i) {
                encode_text_to_string(&plain, &mut out);
                plain.clear();
                out.push_str(&html);
                i = next;
                continue;
            }
        }

        if (starts_with(&chars, i, "http://") || starts_with(&chars, i, "https://"))
            && (i == 0 || !chars[i - 1].is_alphanumeric())
        {
            let mut end = i;
            while end < chars.len() && !chars[end].is_whitespace() && !"<>\"".contains(chars[end]) {
                end += 1;
            }
            while end > i && ".,;:!?)'".contains(chars[end - 1]) {
                end -= 1;
            }
            let url: String = chars[i..end].iter().collect();
            encode_text_to_string(&plain, &mut out);
            plain.clear();
            out.push_str(&link(&url, &url));
            i = end;
            continue;
        }

        plain.push(c);
        i += 1;
    }

    encode_text_to_string(&plain, &mut out);
    out
}

fn markup_at(chars: &[char], i: usize) -> Option<(String, usize)> {
    if starts_with(chars, i, "``") {
        let end = find_close(chars, i + 2, "``")?;
        let content: String = chars[i + 2..end].iter().collect();
        return Some((
            format!("<code class=\"docutils literal\">{}</code>", encode_text(&content)),
            end + 2,
        ));
    }

    if starts_with(chars, i, "**") {
        let end = find_close(chars, i + 2, "**")?;
        let content: String = chars[i + 2..end].iter().collect();
        return Some((format!("<strong>{}</strong>", encode_text(&content)), end + 2));
    }

    if chars[i] == '*' {
        let end = find_close(chars, i + 1, "*")?;
        let content: String = chars[i + 1..end].iter().collect();
        return Some((format!("<em>{}</em>", encode_text(&content)), end + 1));
    }

    if chars[i] == '`' {
        let end = find_close(chars, i + 1, "`")?;
        let content: String = chars[i + 1..end].iter().collect();
        let mut next = end + 1;
        let is_reference = chars.get(next) == Some(&'_');
        if is_reference {
            next += 1;
            if chars.get(next) == Some(&'_') {
                next += 1;
            }
        }

        if !is_reference {
            return Some((format!("<cite>{}</cite>", encode_text(&content)), next));
        }

        let html = match content.rsplit_once('<') {
            Some((label, target)) if target.ends_with('>') => {
                let url = target.trim_end_matches('>');
                let label = label.trim();
                link(url, if label.is_empty() { url } else { label })
            }
            _ if content.starts_with("http://") || content.starts_with("https://") => {
                link(&content, &content)
            }
            _ => encode_text(&content).into_owned(),
        };
        return Some((html, next));
    }

    None
}

fn link(url: &str, label: &str) -> String {
    format!(
        "<a class=\"reference external\" href=\"{}\">{}</a>",
        encode_double_quoted_attribute(url),
        encode_text(label)
    )
}

/// Inline markup may start after whitespace or opening punctuation, and its
/// content may not start with whitespace.
fn can_start(chars: &[char], i: usize) -> bool {
    let before = i == 0 || chars[i - 1].is_whitespace() || "'\"([{<-/:".contains(chars[i - 1]);
    let marker_len = if starts_with(chars, i, "``") || starts_with(chars, i, "**") { 2 } else { 1 };
    let after = chars.get(i + marker_len).is_some_and(|c| !c.is_whitespace());
    before && after
}

fn find_close(chars: &[char], from: usize, pattern: &str) -> Option<usize> {
    let len = pattern.chars().count();
    let mut j = from + 1;
    while j + len <= chars.len() {
        if starts_with(chars, j, pattern) && !chars[j - 1].is_whitespace() {
            let follows = chars.get(j + len);
            let ends = follows.map_or(true, |c| {
                c.is_whitespace() || ".,;:!?'\")]}>-/\\".contains(*c) || (pattern == "`" && *c == '_')
            });
            if ends {
                return Some(j);
            }
        }
        j += 1;
    }
    None
}

fn starts_with(chars: &[char], i: usize, pattern: &str) -> bool {
    let mut k = i;
    for p in pattern.chars() {
        if chars.get(k) != Some(&p) {
            return false;
        }
        k += 1;
    }
    true
}

/// The adornment character if `line` is a section adornment
fn adornment(line: &str) -> Option<char> {
    let mut chars = line.chars();
    let first = chars.next()?;
    if !first.is_ascii_punctuation() || line.len() < 2 {
        return None;
    }
    chars.all(|c| c == first).then_some(first)
}

fn is_transition(lines: &[String], i: usize) -> bool {
    adornment(&lines[i]).is_some()
        && lines[i].len() >= 4
        && (i == 0 || lines[i - 1].is_empty())
        && lines.get(i + 1).map_or(true, |l| l.is_empty())
}

/// Bullet marker and the width of marker plus padding
fn bullet(line: &str) -> Option<(char, usize)> {
    let mut chars = line.chars();
    let marker = chars.next().filter(|c| matches!(*c, '-' | '*' | '+'))?;
    let padding = chars.take_while(|c| *c == ' ').count();
    (padding > 0).then_some((marker, 1 + padding))
}

/// Start number (none for `#.`) and the width of enumerator plus padding
fn enumerator(line: &str) -> Option<(Option<u32>, usize)> {
    let (start, marker_len) = if line.starts_with("#.") || line.starts_with("#)") {
        (None, 2)
    } else {
        let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
        if digits == 0 || !matches!(line[digits..].chars().next(), Some('.' | ')')) {
            return None;
        }
        (line[..digits].parse().ok(), digits + 1)
    };
    let padding = line[marker_len..].chars().take_while(|c| *c == ' ').count();
    (padding > 0).then_some((start, marker_len + padding))
}

fn indent_of(line: &str) -> usize {
    line.len() - line.trim_start_matches(' ').len()
}

/// End of the block starting at `start` whose lines are blank or indented by
/// at least `min_indent`, excluding trailing blank lines.
fn indented_end(lines: &[String], start: usize, min_indent: usize) -> usize {
    let mut end = start;
    while end < lines.len() && (lines[end].is_empty() || indent_of(&lines[end]) >= min_indent) {
        end += 1;
    }
    while end > start && lines[end - 1].is_empty() {
        end -= 1;
    }
    end
}

fn skip_blank(lines: &[String], mut i: usize) -> usize {
    while i < lines.len() && lines[i].is_empty() {
        i += 1;
    }
    i
}

fn dedent(lines: &[String]) -> Vec<String> {
    let indent = lines
        .iter()
        .filter(|l| !l.is_empty())
        .map(|l| indent_of(l))
        .min()
        .unwrap_or(0);
    lines.iter().map(|l| strip_indent(l, indent)).collect()
}

fn strip_indent(line: &str, width: usize) -> String {
    let n = indent_of(line).min(width);
    line[n..].to_string()
}

fn expand_tabs(line: &str) -> String {
    if !line.contains('\t') {
        return line.to_string();
    }
    let mut out = String::with_capacity(line.len() + 8);
    let mut column = 0;
    for c in line.chars() {
        if c == '\t' {
            let pad = 8 - column % 8;
            out.extend(std::iter::repeat(' ').take(pad));
            column += pad;
        } else {
            out.push(c);
            column += 1;
        }
    }
    out
}

fn slug(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    for c in text.chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paragraph_with_emphasis() {
        assert_eq!(
            render_fragment("Hello *world*").unwrap(),
            "<p>Hello <em>world</em></p>\n"
        );
    }

    #[test]
    fn test_text_is_escaped() {
        assert_eq!(
            render_fragment("a < b & c").unwrap(),
            "<p>a &lt; b &amp; c</p>\n"
        );
    }

    #[test]
    fn test_section_levels_follow_first_appearance() {
        let source = "Intro\n=====\n\nText.\n\nPart One\n--------\n\nMore.\n\nOutro\n=====\n";
        assert_eq!(
            render_fragment(source).unwrap(),
            "<h1 id=\"intro\">Intro</h1>\n<p>Text.</p>\n\
             <h2 id=\"part-one\">Part One</h2>\n<p>More.</p>\n\
             <h1 id=\"outro\">Outro</h1>\n"
        );
    }

    #[test]
    fn test_overlined_title_is_its_own_style() {
        let html = render_fragment("=====\nTitle\n=====\n\nSub\n===\n").unwrap();
        assert_eq!(html, "<h1 id=\"title\">Title</h1>\n<h2 id=\"sub\">Sub</h2>\n");
    }

    #[test]
    fn test_too_many_levels_is_an_error() {
        let source = ["=", "-", "~", "^", "+", "#", "*"]
            .iter()
            .enumerate()
            .map(|(n, c)| format!("T{}\n{}\n\n", n, c.repeat(4)))
            .collect::<String>();
        assert!(matches!(render_fragment(&source), Err(RenderError::Local(_))));
    }

    #[test]
    fn test_nested_bullets_within_limit() {
        assert_eq!(
            render_fragment("- - x
").unwrap(),
            "<ul>\n<li><ul>\n<li>x</li>\n</ul>\n</li>\n</ul>\n"
        );
    }

    #[test]
    fn test_deeply_nested_bullets_are_an_error() {
        let source = format!("{}x\n", "- ".repeat(20_000));
        assert!(matches!(render_fragment(&source), Err(RenderError::Local(_))));
    }

    #[test]
    fn test_deeply_nested_quotes_are_an_error() {
        let source: String = (0..500).map(|n| format!("{}x\n\n", " ".repeat(n))).collect();
        assert!(matches!(render_fragment(&source), Err(RenderError::Local(_))));
    }

    #[test]
    fn test_deep_nesting_fits_a_small_stack() {
        // Blocking-pool threads run with a 2 MiB stack
        let source = format!("{}x\n", "- ".repeat(20_000));
        let handle = std::thread::Builder::new()
            .stack_size(2 * 1024 * 1024)
            .spawn(move || render_fragment(&source).is_err())
            .unwrap();
        assert!(handle.join().unwrap());
    }

    #[test]
    fn test_bullet_list() {
        assert_eq!(
            render_fragment("- one\n- two\n  continued\n").unwrap(),
            "<ul>\n<li>one</li>\n<li>two\ncontinued</li>\n</ul>\n"
        );
    }

    #[test]
    fn test_enumerated_list_with_start() {
        assert_eq!(
            render_fragment("3. three\n4. four\n").unwrap(),
            "<ol start=\"3\">\n<li>three</li>\n<li>four</li>\n</ol>\n"
        );
    }

    #[test]
    fn test_literal_block() {
        assert_eq!(
            render_fragment("Example::\n\n    if x < 1:\n        pass\n\nAfter.").unwrap(),
            "<p>Example:</p>\n<pre class=\"literal-block\">if x &lt; 1:\n    pass</pre>\n<p>After.</p>\n"
        );
    }

    #[test]
    fn test_expanded_literal_marker() {
        assert_eq!(
            render_fragment("::\n\n    raw\n").unwrap(),
            "<pre class=\"literal-block\">raw</pre>\n"
        );
        assert_eq!(
            render_fragment("Code follows ::\n\n    raw\n").unwrap(),
            "<p>Code follows</p>\n<pre class=\"literal-block\">raw</pre>\n"
        );
    }

    #[test]
    fn test_inline_markup() {
        assert_eq!(
            render_fragment("Use ``cargo test`` and **always** read `The Book`.").unwrap(),
            "<p>Use <code class=\"docutils literal\">cargo test</code> and <strong>always</strong> read <cite>The Book</cite>.</p>\n"
        );
    }

    #[test]
    fn test_links() {
        assert_eq!(
            render_fragment("See `Rust <https://rust-lang.org>`_.").unwrap(),
            "<p>See <a class=\"reference external\" href=\"https://rust-lang.org\">Rust</a>.</p>\n"
        );
        assert_eq!(
            render_fragment("Visit https://example.com/a.").unwrap(),
            "<p>Visit <a class=\"reference external\" href=\"https://example.com/a\">https://example.com/a</a>.</p>\n"
        );
    }

    #[test]
    fn test_asterisk_inside_word_is_plain() {
        assert_eq!(render_fragment("2*3*4").unwrap(), "<p>2*3*4</p>\n");
    }

    #[test]
    fn test_comments_and_targets_are_dropped() {
        let source = ".. this is hidden\n   and so is this\n\n.. _rust: https://rust-lang.org\n\nVisible";
        assert_eq!(render_fragment(source).unwrap(), "<p>Visible</p>\n");
    }

    #[test]
    fn test_code_directive() {
        let source = ".. code-block:: python\n   :linenos:\n\n   print(\"<hi>\")\n";
        assert_eq!(
            render_fragment(source).unwrap(),
            "<pre class=\"code python literal-block\">print(\"&lt;hi&gt;\")</pre>\n"
        );
    }

    #[test]
    fn test_admonition() {
        assert_eq!(
            render_fragment(".. note:: Mind the gap.\n").unwrap(),
            "<div class=\"admonition note\">\n<p class=\"first admonition-title\">Note</p>\n<p>Mind the gap.</p>\n</div>\n"
        );
    }

    #[test]
    fn test_block_quote_and_transition() {
        assert_eq!(
            render_fragment("Said:\n\n    quoted\n\n----\n\nEnd").unwrap(),
            "<p>Said:</p>\n<blockquote>\n<p>quoted</p>\n</blockquote>\n<hr class=\"docutils\" />\n<p>End</p>\n"
        );
    }

    #[test]
    fn test_definition_list() {
        assert_eq!(
            render_fragment("term\n    definition\n").unwrap(),
            "<dl class=\"docutils\">\n<dt>term</dt>\n<dd><p>definition</p>\n</dd>\n</dl>\n"
        );
    }
}
