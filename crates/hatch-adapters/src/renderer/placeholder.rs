//! Placeholder substitution renderer.
//!
//! Supports the tag subset that project templates use:
//!
//! - `<%= path %>` inserts the value at `path`, HTML-escaped
//! - `<%- path %>` inserts it unescaped
//! - `<%# ... %>` is a comment and renders nothing
//! - `<%%` is a literal `<%`
//! - closing with `-%>` drops the newline right after the tag
//!
//! `path` is a dotted property path into the render context
//! (`projectInfo.className`). An unknown top-level name is an error; an
//! unknown property of an existing object renders as the empty string.
//! Anything else between the delimiters (control flow, expressions) is
//! rejected rather than passed through.

use std::path::PathBuf;

use serde_json::Value;
use thiserror::Error;
use tracing::instrument;

use hatch_core::application::ApplicationError;
use hatch_core::application::ports::TemplateEngine;
use hatch_core::error::HatchResult;

const OPEN: &str = "<%";
const CLOSE: &str = "%>";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlaceholderError {
    #[error("line {line}: tag is never closed")]
    Unterminated { line: usize },

    #[error("line {line}: {name} is not defined")]
    Undefined { name: String, line: usize },

    #[error("line {line}: cannot read '{property}' of {name}")]
    NotAnObject {
        name: String,
        property: String,
        line: usize,
    },

    #[error("line {line}: unsupported tag '<%{tag}%>'")]
    Unsupported { tag: String, line: usize },
}

/// Renders `<%= %>` placeholders against a JSON context.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlaceholderEngine;

impl PlaceholderEngine {
    pub fn new() -> Self {
        Self
    }
}

impl TemplateEngine for PlaceholderEngine {
    #[instrument(skip_all)]
    fn render(&self, source: &str, context: &Value) -> HatchResult<String> {
        render(source, context).map_err(|e| {
            ApplicationError::Rendering {
                path: PathBuf::new(),
                reason: e.to_string(),
            }
            .into()
        })
    }
}

/// Render `source` against `context`.
pub fn render(source: &str, context: &Value) -> Result<String, PlaceholderError> {
    let mut out = String::with_capacity(source.len());
    let mut rest = source;

    while let Some(start) = rest.find(OPEN) {
        out.push_str(&rest[..start]);
        let line = line_at(source, source.len() - rest.len() + start);
        let after_open = &rest[start + OPEN.len()..];

        if let Some(after) = after_open.strip_prefix('%') {
            out.push_str(OPEN);
            rest = after;
            continue;
        }

        let Some(end) = after_open.find(CLOSE) else {
            return Err(PlaceholderError::Unterminated { line });
        };
        let tag = &after_open[..end];
        rest = &after_open[end + CLOSE.len()..];

        let (tag, trim_newline) = match tag.strip_suffix('-') {
            Some(tag) => (tag, true),
            None => (tag, false),
        };
        if trim_newline {
            rest = rest
                .strip_prefix("\r\n")
                .or_else(|| rest.strip_prefix('\n'))
                .unwrap_or(rest);
        }

        let unsupported = || PlaceholderError::Unsupported {
            tag: tag.to_string(),
            line,
        };
        match tag.chars().next() {
            Some('#') => {}
            Some('=') => {
                let path = parse_path(&tag[1..]).ok_or_else(unsupported)?;
                out.push_str(&escape_html(&display(lookup(context, &path, line)?)));
            }
            Some('-') => {
                let path = parse_path(&tag[1..]).ok_or_else(unsupported)?;
                out.push_str(&display(lookup(context, &path, line)?));
            }
            _ => return Err(unsupported()),
        }
    }

    out.push_str(rest);
    Ok(out)
}

fn line_at(source: &str, offset: usize) -> usize {
    source[..offset].matches('\n').count() + 1
}

/// Split `a.b.c` into identifiers; `None` if it is anything else.
fn parse_path(expr: &str) -> Option<Vec<&str>> {
    let expr = expr.trim();
    if expr.is_empty() {
        return None;
    }
    let segments: Vec<&str> = expr.split('.').collect();
    segments
        .iter()
        .all(|s| is_identifier(s))
        .then_some(segments)
}

fn is_identifier(segment: &str) -> bool {
    let mut chars = segment.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

fn lookup<'a>(
    context: &'a Value,
    path: &[&str],
    line: usize,
) -> Result<Option<&'a Value>, PlaceholderError> {
    let (first, properties) = path.split_first().ok_or(PlaceholderError::Unsupported {
        tag: String::new(),
        line,
    })?;
    let mut current = context
        .get(*first)
        .ok_or_else(|| PlaceholderError::Undefined {
            name: (*first).to_string(),
            line,
        })?;

    for (depth, property) in properties.iter().enumerate() {
        match current {
            Value::Object(map) => match map.get(*property) {
                Some(next) => current = next,
                None if depth + 1 == properties.len() => return Ok(None),
                None => {
                    return Err(PlaceholderError::NotAnObject {
                        name: "undefined".into(),
                        property: properties[depth + 1].to_string(),
                        line,
                    });
                }
            },
            Value::Null => {
                return Err(PlaceholderError::NotAnObject {
                    name: "null".into(),
                    property: (*property).to_string(),
                    line,
                });
            }
            // Properties of scalars and arrays are undefined.
            _ if depth + 1 == properties.len() => return Ok(None),
            _ => {
                return Err(PlaceholderError::NotAnObject {
                    name: "undefined".into(),
                    property: properties[depth + 1].to_string(),
                    line,
                });
            }
        }
    }
    Ok(Some(current))
}

fn display(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| display(Some(item)))
            .collect::<Vec<_>>()
            .join(","),
        Some(Value::Object(_)) => "[object Object]".into(),
        Some(other) => other.to_string(),
    }
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&#34;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use hatch_core::error::HatchError;
    use serde_json::json;

    fn context() -> Value {
        json!({
            "name": "my-app",
            "version": "1.0.0",
            "description": "<fast> & \"small\"",
            "projectInfo": {"className": "my-app", "port": 8080, "tags": ["a", "b"]},
            "nothing": null,
        })
    }

    #[test]
    fn substitutes_nested_paths() {
        let out = render(
            "<%= name %>@<%=version%> on <%= projectInfo.port %> [<%= projectInfo.tags %>]",
            &context(),
        )
        .unwrap();
        assert_eq!(out, "my-app@1.0.0 on 8080 [a,b]");
    }

    #[test]
    fn escapes_unless_raw() {
        let ctx = context();
        assert_eq!(
            render("<%= description %>", &ctx).unwrap(),
            "&lt;fast&gt; &amp; &#34;small&#34;"
        );
        assert_eq!(render("<%- description %>", &ctx).unwrap(), "<fast> & \"small\"");
    }

    #[test]
    fn text_without_tags_is_unchanged() {
        let text = "fn main() { println!(\"100%\"); }\n";
        assert_eq!(render(text, &context()).unwrap(), text);
    }

    #[test]
    fn comments_literals_and_newline_trim() {
        let ctx = context();
        assert_eq!(render("a<%# note %>b", &ctx).unwrap(), "ab");
        assert_eq!(render("<%%= name %>", &ctx).unwrap(), "<%= name %>");
        assert_eq!(render("<%= name -%>\nnext", &ctx).unwrap(), "my-appnext");
    }

    #[test]
    fn missing_values() {
        let ctx = context();
        assert_eq!(render("[<%= projectInfo.missing %>]", &ctx).unwrap(), "[]");
        assert_eq!(render("[<%= nothing %>]", &ctx).unwrap(), "[]");
        assert_eq!(
            render("x\n<%= author %>", &ctx).unwrap_err(),
            PlaceholderError::Undefined {
                name: "author".into(),
                line: 2
            }
        );
        assert!(matches!(
            render("<%= projectInfo.missing.deeper %>", &ctx).unwrap_err(),
            PlaceholderError::NotAnObject { .. }
        ));
    }

    #[test]
    fn rejects_malformed_tags() {
        let ctx = context();
        assert_eq!(
            render("ok\nok\n<%= name", &ctx).unwrap_err(),
            PlaceholderError::Unterminated { line: 3 }
        );
        assert!(matches!(
            render("<% if (x) { %>", &ctx).unwrap_err(),
            PlaceholderError::Unsupported { .. }
        ));
        assert!(matches!(
            render("<%= name + 1 %>", &ctx).unwrap_err(),
            PlaceholderError::Unsupported { .. }
        ));
    }

    #[test]
    fn engine_reports_rendering_errors() {
        let err = PlaceholderEngine::new()
            .render("<%= author %>", &context())
            .unwrap_err();
        match err {
            HatchError::Application(ApplicationError::Rendering { reason, .. }) => {
                assert_eq!(reason, "line 1: author is not defined");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
