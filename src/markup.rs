use colored::{ColoredString, Colorize};

pub const RESET: &str = "[-]";
const ESCAPED_BRACKET: &str = "[[]";

/// Colour categories used by the response formatter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    Key,
    String,
    Number,
}

impl Style {
    const ALL: [Style; 3] = [Style::Key, Style::String, Style::Number];

    pub fn name(&self) -> &'static str {
        match self {
            Style::Key => "blue",
            Style::String => "orange",
            Style::Number => "red",
        }
    }

    fn from_name(name: &str) -> Option<Style> {
        Style::ALL.into_iter().find(|s| s.name() == name)
    }

    /// Wraps `text` in exactly one opening tag and one reset. Brackets in
    /// `text` are escaped so they never read as tags.
    pub fn span(&self, text: &str) -> String {
        format!("[{}]{}{}", self.name(), escape(text), RESET)
    }

    fn paint(&self, text: &str) -> ColoredString {
        match self {
            Style::Key => text.blue(),
            Style::String => text.truecolor(255, 165, 0),
            Style::Number => text.red(),
        }
    }
}

enum Token<'a> {
    Open(Style),
    Reset,
    Text(&'a str),
}

fn tokens(markup: &str) -> Vec<Token<'_>> {
    let mut out = Vec::new();
    let mut rest = markup;
    let mut text_start = 0;
    let mut offset = 0;

    while let Some(open) = rest.find('[') {
        let at = offset + open;
        let after = &markup[at + 1..];
        let tag = after
            .find(']')
            .map(|close| &after[..close])
            .and_then(|name| match name {
                "-" => Some((Token::Reset, name.len())),
                "[" => Some((Token::Text(&markup[at..at + 1]), name.len())),
                _ => Style::from_name(name).map(|s| (Token::Open(s), name.len())),
            });

        match tag {
            Some((token, len)) => {
                if text_start < at {
                    out.push(Token::Text(&markup[text_start..at]));
                }
                out.push(token);
                offset = at + len + 2;
                text_start = offset;
            }
            None => offset = at + 1,
        }
        rest = &markup[offset..];
    }

    if text_start < markup.len() {
        out.push(Token::Text(&markup[text_start..]));
    }
    out
}

/// Escapes `[` so that `text` comes out of [`to_ansi`] and [`strip`] as is.
pub fn escape(text: &str) -> String {
    text.replace('[', ESCAPED_BRACKET)
}

/// Replaces colour tags with ANSI escape sequences. Bracketed text that is
/// not a known tag is left as is.
pub fn to_ansi(markup: &str) -> String {
    let mut out = String::with_capacity(markup.len());
    let mut style = None;
    for token in tokens(markup) {
        match token {
            Token::Open(s) => style = Some(s),
            Token::Reset => style = None,
            Token::Text(t) => match style {
                // painted per line so a span never bleeds past a line break
                Some(s) => {
                    let painted: Vec<String> =
                        t.split('\n').map(|l| s.paint(l).to_string()).collect();
                    out.push_str(&painted.join("\n"));
                }
                None => out.push_str(t),
            },
        }
    }
    out
}

/// Removes colour tags, keeping only the text.
pub fn strip(markup: &str) -> String {
    tokens(markup)
        .into_iter()
        .filter_map(|t| match t {
            Token::Text(t) => Some(t),
            _ => None,
        })
        .collect()
}
