//! Front matter handling and markdown-to-plain-text rendering

use pulldown_cmark::{Event, Parser, Tag, TagEnd};
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Parsed document header
#[derive(Debug, Clone, Default)]
pub struct FrontMatter {
    /// Title from the header, empty string when absent
    pub title: String,
    /// Remaining header fields, stringified
    pub metadata: BTreeMap<String, String>,
}

fn tag_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]+>").unwrap())
}

/// Split an optional YAML front matter block from the body.
///
/// An unparseable header is treated as body text rather than an error; a
/// malformed header in one file must not abort the corpus pass.
pub fn split_front_matter(raw: &str) -> (FrontMatter, &str) {
    let Some(rest) = raw.strip_prefix("---") else {
        return (FrontMatter::default(), raw);
    };
    let Some(newline) = rest.find('\n') else {
        return (FrontMatter::default(), raw);
    };
    if !rest[..newline].trim().is_empty() {
        return (FrontMatter::default(), raw);
    }

    let after_open = &rest[newline + 1..];
    let Some(close) = after_open.find("\n---") else {
        return (FrontMatter::default(), raw);
    };

    let header = &after_open[..close];
    let mut body = &after_open[close + 4..];
    if let Some(stripped) = body.strip_prefix('\n') {
        body = stripped;
    }

    let Ok(value) = serde_yaml::from_str::<serde_yaml::Value>(header) else {
        return (FrontMatter::default(), raw);
    };

    let mut front = FrontMatter::default();
    if let serde_yaml::Value::Mapping(map) = value {
        for (key, val) in map {
            let Some(key) = key.as_str() else { continue };
            let rendered = match val {
                serde_yaml::Value::String(s) => s,
                serde_yaml::Value::Bool(b) => b.to_string(),
                serde_yaml::Value::Number(n) => n.to_string(),
                _ => continue,
            };
            if key == "title" {
                front.title = rendered;
            } else {
                front.metadata.insert(key.to_string(), rendered);
            }
        }
    }

    (front, body)
}

/// Render markdown body to plain text.
///
/// Inline tags are stripped before rendering so MDX component markup never
/// reaches the parser, and residual tags are stripped from the output.
pub fn render_plain_text(markdown: &str) -> String {
    let stripped = tag_pattern().replace_all(markdown, "");

    let mut text = String::with_capacity(stripped.len());
    for event in Parser::new(&stripped) {
        match event {
            Event::Text(t) => text.push_str(&t),
            Event::Code(c) => text.push_str(&c),
            Event::SoftBreak | Event::HardBreak => text.push(' '),
            Event::End(TagEnd::Paragraph)
            | Event::End(TagEnd::Heading(_))
            | Event::End(TagEnd::Item)
            | Event::End(TagEnd::CodeBlock) => text.push('\n'),
            Event::Start(Tag::Item) => text.push(' '),
            _ => {}
        }
    }

    let text = tag_pattern().replace_all(&text, "");
    text.trim().to_string()
}
