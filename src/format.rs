use crate::markup::{self, Style};
use crate::wrap::{count_lines, word_wrap};

use serde_json::{Map, Number, Value};
use tracing::debug;
use unicode_width::UnicodeWidthStr;

const INDENT: &str = "  ";

/// Styled response text and the number of lines it occupies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedDocument {
    pub text: String,
    pub lines: usize,
}

impl FormattedDocument {
    pub fn new(text: String) -> Self {
        let lines = count_lines(&text);
        FormattedDocument { text, lines }
    }

    /// Rows to reserve when displaying the document, one more than its lines.
    pub fn display_rows(&self) -> usize {
        self.lines + 1
    }
}

/// Formats a response body for a display `width` columns wide. Bodies that
/// are not JSON are shown as they are.
pub fn format_body(body: &str, width: usize) -> FormattedDocument {
    match serde_json::from_str::<Value>(body) {
        Ok(value) => FormattedDocument::new(visualize(&value, "", width)),
        Err(e) => {
            debug!("response body is not JSON: {}", e);
            FormattedDocument::new(markup::escape(body))
        }
    }
}

/// Renders `value` as indented, styled text. Strings are wrapped to fit in
/// `width` columns after `indent` and the quotes.
pub fn visualize(value: &Value, indent: &str, width: usize) -> String {
    match value {
        Value::Object(map) => visualize_object(map, indent, width),
        Value::Array(items) => visualize_array(items, indent, width),
        Value::String(s) => visualize_string(s, indent, width),
        Value::Number(n) => Style::Number.span(&format_number(n)),
        other => other.to_string(),
    }
}

fn visualize_object(map: &Map<String, Value>, indent: &str, width: usize) -> String {
    let inner = format!("{indent}{INDENT}");
    let mut keys: Vec<&String> = map.keys().collect();
    keys.sort();

    let mut buffer = String::from("{\n");
    for (i, key) in keys.iter().enumerate() {
        let value = visualize(&map[key.as_str()], &inner, width);
        let comma = if i + 1 == keys.len() { "" } else { "," };
        buffer.push_str(&format!(
            "{inner}{}: {}{comma}\n",
            Style::Key.span(key),
            value.trim_matches('\n')
        ));
    }
    buffer.push_str(&format!("{indent}}}"));
    buffer
}

fn visualize_array(items: &[Value], indent: &str, width: usize) -> String {
    let inner = format!("{indent}{INDENT}");

    let mut buffer = String::from("[\n");
    for (i, item) in items.iter().enumerate() {
        let value = visualize(item, &inner, width);
        let comma = if i + 1 == items.len() { "" } else { "," };
        buffer.push_str(&format!("{inner}{}{comma}\n", value.trim_matches('\n')));
    }
    buffer.push_str(&format!("{indent}]"));
    buffer
}

fn visualize_string(s: &str, indent: &str, width: usize) -> String {
    let escaped = s.replace('\n', "\\n");
    let columns = width.saturating_sub(indent.width() + 2);
    let wrapped = word_wrap(&escaped, columns).replace('\n', &format!("\n{indent}{INDENT}"));
    Style::String.span(&format!("\"{wrapped}\""))
}

fn format_number(n: &Number) -> String {
    if let Some(i) = n.as_i64() {
        return i.to_string();
    }
    if let Some(u) = n.as_u64() {
        return u.to_string();
    }
    match n.as_f64() {
        // adding 0.0 turns -0.0 into 0.0
        Some(f) if f.is_finite() && f == f.trunc() => format!("{:.0}", f + 0.0),
        Some(f) => format!("{f:.6}"),
        None => n.to_string(),
    }
}
