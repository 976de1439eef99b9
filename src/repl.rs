use std::io::{self, IsTerminal, Write};

use anyhow::{bail, Context, Result};
use colored::*;
use rustyline::{error::ReadlineError, DefaultEditor};
use tokio::time::Instant;
use tracing::debug;

use crate::format::{format_body, FormattedDocument};
use crate::http::{HttpClient, HttpResponse, METHODS};
use crate::markup;
use crate::session::Session;
use crate::suggest;

pub struct Repl {
    editor: DefaultEditor,
    client: HttpClient,
    session: Session,
    verbose: bool,
    last: Option<FormattedDocument>,
}

#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    Send { method: String, url: Option<String> },
    Special(SpecialCommand),
    Empty,
}

#[derive(Debug, PartialEq, Eq)]
pub enum SpecialCommand {
    Help,
    Exit,
    Clear,
    Url { url: String },
    Key { number: usize, text: String },
    Value { number: usize, text: String },
    Add,
    Delete { number: usize },
    Params,
    SetHeader { name: String, value: String },
    RemoveHeader { name: String },
    ShowHeaders,
    SuggestHeaders { prefix: String },
    SuggestValues { name: String, prefix: String },
    Body { text: Option<String> },
    Token { token: Option<String> },
    Method { method: String },
    Send,
    Show,
    Width { width: usize },
}

enum Flow {
    Continue,
    Exit,
}

fn usage(text: &str) -> anyhow::Error {
    anyhow::anyhow!("Usage: {}", text)
}

fn row_number(s: Option<&&str>, usage_text: &str) -> Result<usize> {
    let s = s.ok_or_else(|| usage(usage_text))?;
    s.parse::<usize>()
        .with_context(|| format!("Invalid row number: {s}"))
}

/// Everything after the first `skip` words of `line`, with the original
/// spacing of the rest kept.
fn rest(line: &str, skip: usize) -> String {
    let mut rest = line.trim_start();
    for _ in 0..skip {
        rest = rest
            .split_once(char::is_whitespace)
            .map(|(_, r)| r.trim_start())
            .unwrap_or("");
    }
    rest.trim_end().to_string()
}

fn parse_special_command(line: &str) -> Result<SpecialCommand> {
    let parts: Vec<&str> = line.split_whitespace().collect();

    match parts[0] {
        "!help" | "!h" => Ok(SpecialCommand::Help),
        "!exit" | "!quit" | "!q" => Ok(SpecialCommand::Exit),
        "!clear" | "!c" => Ok(SpecialCommand::Clear),
        "!url" => match parts.get(1) {
            Some(_) => Ok(SpecialCommand::Url { url: rest(line, 1) }),
            None => Err(usage("!url <url>")),
        },
        "!key" => Ok(SpecialCommand::Key {
            number: row_number(parts.get(1), "!key <N> <text>")?,
            text: rest(line, 2),
        }),
        "!value" => Ok(SpecialCommand::Value {
            number: row_number(parts.get(1), "!value <N> <text>")?,
            text: rest(line, 2),
        }),
        "!add" => Ok(SpecialCommand::Add),
        "!del" => Ok(SpecialCommand::Delete {
            number: row_number(parts.get(1), "!del <N>")?,
        }),
        "!params" => Ok(SpecialCommand::Params),
        "!header" => {
            if parts.len() < 3 {
                return Err(usage("!header <name> <value>"));
            }
            Ok(SpecialCommand::SetHeader {
                name: parts[1].trim_end_matches(':').to_string(),
                value: rest(line, 2),
            })
        }
        "!unheader" => match parts.get(1) {
            Some(name) => Ok(SpecialCommand::RemoveHeader {
                name: name.to_string(),
            }),
            None => Err(usage("!unheader <name>")),
        },
        "!headers" => Ok(SpecialCommand::ShowHeaders),
        "!headers-suggest" => Ok(SpecialCommand::SuggestHeaders {
            prefix: rest(line, 1),
        }),
        "!values-suggest" => match parts.get(1) {
            Some(name) => Ok(SpecialCommand::SuggestValues {
                name: name.to_string(),
                prefix: rest(line, 2),
            }),
            None => Err(usage("!values-suggest <name> [prefix]")),
        },
        "!body" => Ok(SpecialCommand::Body {
            text: Some(rest(line, 1)).filter(|t| !t.is_empty()),
        }),
        "!token" => Ok(SpecialCommand::Token {
            token: parts.get(1).map(|t| t.to_string()),
        }),
        "!method" => match parts.get(1) {
            Some(method) => Ok(SpecialCommand::Method {
                method: method.to_string(),
            }),
            None => Err(usage("!method <METHOD>")),
        },
        "!send" => Ok(SpecialCommand::Send),
        "!show" => Ok(SpecialCommand::Show),
        "!width" => {
            let width = parts.get(1).ok_or_else(|| usage("!width <N>"))?;
            Ok(SpecialCommand::Width {
                width: width
                    .parse()
                    .with_context(|| format!("Invalid width: {width}"))?,
            })
        }
        _ => bail!("Unknown command: {}", parts[0]),
    }
}

fn parse_command(line: &str) -> Result<Command> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(Command::Empty);
    }

    if line.starts_with('!') {
        return Ok(Command::Special(parse_special_command(line)?));
    }

    let parts: Vec<&str> = line.split_whitespace().collect();
    let method = parts[0].to_uppercase();
    if !METHODS.contains(&method.as_str()) {
        bail!("Unknown command: {}. Type !help for help.", parts[0]);
    }

    Ok(Command::Send {
        method,
        url: parts.get(1).map(|_| rest(line, 1)),
    })
}

fn status_color(status: reqwest::StatusCode) -> &'static str {
    if status.is_success() {
        "green"
    } else if status.is_redirection() {
        "cyan"
    } else if status.is_client_error() {
        "yellow"
    } else {
        "red"
    }
}

impl Repl {
    pub fn new(client: HttpClient, session: Session, verbose: bool) -> Result<Self> {
        let editor = DefaultEditor::new().context("Failed to create line editor")?;

        Ok(Self {
            editor,
            client,
            session,
            verbose,
            last: None,
        })
    }

    pub async fn run(&mut self) -> Result<()> {
        let interactive = io::stdin().is_terminal();
        if interactive {
            self.print_welcome();
        }

        while let Some(line) = self.read_line(interactive)? {
            let flow = match parse_command(&line) {
                Ok(Command::Empty) => Ok(Flow::Continue),
                Ok(Command::Send { method, url }) => self.send(&method, url.as_deref()).await,
                Ok(Command::Special(cmd)) => self.handle_special_command(cmd).await,
                Err(e) => Err(e),
            };
            match flow {
                Ok(Flow::Exit) => break,
                Ok(Flow::Continue) => {}
                Err(e) => eprintln!("{}: {:#}", "Error".red().bold(), e),
            }
        }

        if interactive {
            println!("{}", "Goodbye!".green());
        }
        Ok(())
    }

    fn print_welcome(&self) {
        println!("{}", "Welcome to restui!".green().bold());
        println!("Type {} for help, {} to exit.", "!help".cyan(), "!exit".cyan());
        println!(
            "Enter {} {} to send a request, or edit it with {} and {}.",
            "GET".yellow(),
            self.session.url().blue(),
            "!url".cyan(),
            "!key".cyan()
        );
        println!();
    }

    /// Next input line, or `None` at the end of input.
    fn read_line(&mut self, interactive: bool) -> Result<Option<String>> {
        if interactive {
            let prompt = format!("{} ", "restui>".green().bold());
            match self.editor.readline(&prompt) {
                Ok(line) => {
                    let _ = self.editor.add_history_entry(line.as_str());
                    Ok(Some(line))
                }
                Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => Ok(None),
                Err(e) => bail!("Failed to read input: {}", e),
            }
        } else {
            let mut line = String::new();
            match io::stdin().read_line(&mut line) {
                Ok(0) => Ok(None),
                Ok(_) => Ok(Some(line)),
                Err(e) => bail!("Failed to read input: {}", e),
            }
        }
    }

    fn read_body(&mut self) -> Result<Option<String>> {
        if io::stdin().is_terminal() {
            println!("{}", "Enter body (press Ctrl+D when done):".yellow());
        }

        let mut body = String::new();
        loop {
            let mut line = String::new();
            match io::stdin().read_line(&mut line) {
                Ok(0) => break,
                Ok(_) => body.push_str(&line),
                Err(e) => bail!("Error reading input: {}", e),
            }
        }

        let body = body.trim();
        Ok(Some(body.to_string()).filter(|b| !b.is_empty()))
    }

    async fn edit_url(&mut self, url: &str) {
        self.session.edit_url(url, Instant::now());
        self.settle().await;
    }

    async fn send(&mut self, method: &str, url: Option<&str>) -> Result<Flow> {
        self.session.set_method(method)?;
        if let Some(url) = url {
            self.edit_url(url).await;
        }
        self.execute().await?;
        Ok(Flow::Continue)
    }

    /// Waits for a URL edit still in its debounce window, so rows and URL
    /// agree before they are sent or shown.
    async fn settle(&mut self) {
        if self.session.has_pending_decode() {
            if let Some(diff) = self.session.settle().await {
                debug!("parameter rows reconciled: {:?}", diff);
            }
        }
    }

    async fn execute(&mut self) -> Result<()> {
        self.settle().await;
        let response = self.client.request(&self.session).await?;
        self.print_response(&response)
    }

    fn print_response(&mut self, response: &HttpResponse) -> Result<()> {
        let status = response.status();
        let color = status_color(status);

        if self.verbose {
            println!(
                "{} {} {} ({} bytes, {}ms)",
                "HTTP".cyan().bold(),
                status.as_u16().to_string().color(color).bold(),
                status.canonical_reason().unwrap_or(""),
                response.raw().len(),
                response.elapsed().as_millis()
            );
            if !response.headers().is_empty() {
                println!("{}", "Headers:".cyan());
                for (name, value) in response.headers() {
                    println!(
                        "  {}: {}",
                        name.as_str().blue(),
                        value.to_str().unwrap_or("<invalid>")
                    );
                }
            }
        } else {
            println!(
                "{} {} {}",
                "HTTP".cyan().bold(),
                status.as_u16().to_string().color(color).bold(),
                status.canonical_reason().unwrap_or("")
            );
        }

        let document = format_body(response.body(), self.session.width());
        if io::stdout().is_terminal() {
            println!("{}", markup::to_ansi(&document.text));
        } else {
            println!("{}", markup::strip(&document.text));
        }
        println!("{}", format!("({} lines)", document.lines).dimmed());
        println!();

        self.last = Some(document);
        Ok(())
    }

    fn print_params(&self) {
        let rows = self.session.params();
        for (id, param) in rows.iter() {
            if let Some((key_label, value_label)) = rows.label(id) {
                println!(
                    "  {}: {}  {}: {}",
                    key_label.cyan(),
                    param.key.blue(),
                    value_label.cyan(),
                    param.value
                );
            }
        }
    }

    fn print_suggestions(candidates: &[&str]) {
        if candidates.is_empty() {
            println!("{}", "No suggestions.".yellow());
        }
        for candidate in candidates {
            println!("  {}", candidate);
        }
    }

    async fn handle_special_command(&mut self, cmd: SpecialCommand) -> Result<Flow> {
        match cmd {
            SpecialCommand::Help => self.print_help(),
            SpecialCommand::Exit => return Ok(Flow::Exit),
            SpecialCommand::Clear => {
                print!("\x1B[2J\x1B[1;1H");
                io::stdout().flush()?;
            }
            SpecialCommand::Url { url } => {
                self.edit_url(&url).await;
                println!("{}: {}", "URL".green(), self.session.url());
            }
            SpecialCommand::Key { number, text } => {
                self.session.edit_key(number, &text)?;
                println!("{}: {}", "URL".green(), self.session.url());
            }
            SpecialCommand::Value { number, text } => {
                self.session.edit_value(number, &text)?;
                println!("{}: {}", "URL".green(), self.session.url());
            }
            SpecialCommand::Add => {
                let number = self.session.add_param();
                println!("{}: {}", "Row added".green(), number);
            }
            SpecialCommand::Delete { number } => {
                let removed = self.session.delete_param(number)?;
                println!(
                    "{}: {}={}",
                    "Row removed".green(),
                    removed.key.blue(),
                    removed.value
                );
                println!("{}: {}", "URL".green(), self.session.url());
            }
            SpecialCommand::Params => self.print_params(),
            SpecialCommand::SetHeader { name, value } => {
                self.session.set_header(&name, &value);
                println!("{}: {} -> {}", "Header set".green(), name.blue(), value);
            }
            SpecialCommand::RemoveHeader { name } => {
                if self.session.remove_header(&name).is_some() {
                    println!("{}: {}", "Header removed".green(), name.blue());
                } else {
                    println!("{}: {}", "Header not found".yellow(), name.blue());
                }
            }
            SpecialCommand::ShowHeaders => {
                let headers: Vec<_> = self.session.header_rows().complete().collect();
                if headers.is_empty() {
                    println!("{}", "No headers set.".yellow());
                } else {
                    println!("{}", "Headers:".cyan().bold());
                    for header in headers {
                        println!("  {}: {}", header.key.blue(), header.value);
                    }
                }
            }
            SpecialCommand::SuggestHeaders { prefix } => {
                Self::print_suggestions(&suggest::header_names(&prefix));
            }
            SpecialCommand::SuggestValues { name, prefix } => {
                Self::print_suggestions(&suggest::header_values(&name, &prefix));
            }
            SpecialCommand::Body { text } => {
                let body = match text {
                    Some(text) => Some(text),
                    None => self.read_body()?,
                };
                let message = if body.is_some() { "Body set" } else { "Body cleared" };
                self.session.set_body(body);
                println!("{}", message.green());
            }
            SpecialCommand::Token { token } => {
                let message = if token.is_some() { "Token set" } else { "Token cleared" };
                self.session.set_token(token);
                println!("{}", message.green());
            }
            SpecialCommand::Method { method } => {
                self.session.set_method(&method)?;
                println!("{}: {}", "Method".green(), method.to_uppercase());
            }
            SpecialCommand::Send => self.execute().await?,
            SpecialCommand::Show => {
                self.settle().await;
                println!("{}", self.session.summary());
                if let Some(last) = &self.last {
                    println!(
                        "Last response: {} lines ({} rows)",
                        last.lines,
                        last.display_rows()
                    );
                }
            }
            SpecialCommand::Width { width } => {
                self.session.set_width(width);
                println!("{}: {}", "Width".green(), width);
            }
        }
        Ok(Flow::Continue)
    }

    fn print_help(&self) {
        println!("{}", "restui Help".green().bold());
        println!();
        println!("{}", "Requests:".cyan().bold());
        println!("  {} {}        - Send a request, optionally to a new URL", "<METHOD>".yellow(), "[url]".blue());
        println!("  {}                    - Send the current request", "!send".yellow());
        println!("  {}                    - Show the current request", "!show".yellow());
        println!("  {} {}           - Set the method", "!method".yellow(), "<M>".blue());
        println!("  {} {}            - Set the body, or enter it line by line", "!body".yellow(), "[text]".blue());
        println!("  {} {}         - Set or clear the bearer token", "!token".yellow(), "[token]".blue());
        println!();
        println!("{}", "URL and parameters:".cyan().bold());
        println!("  {} {}              - Edit the URL", "!url".yellow(), "<url>".blue());
        println!("  {}                  - List parameter rows", "!params".yellow());
        println!("  {} {}         - Edit the key of row N", "!key".yellow(), "<N> <text>".blue());
        println!("  {} {}       - Edit the value of row N", "!value".yellow(), "<N> <text>".blue());
        println!("  {}                     - Add a blank row", "!add".yellow());
        println!("  {} {}                 - Delete row N", "!del".yellow(), "<N>".blue());
        println!();
        println!("{}", "Headers:".cyan().bold());
        println!("  {} {}  - Set a header", "!header".yellow(), "<name> <value>".blue());
        println!("  {} {}        - Remove a header", "!unheader".yellow(), "<name>".blue());
        println!("  {}                 - Show headers", "!headers".yellow());
        println!("  {} {}  - Suggest header names", "!headers-suggest".yellow(), "[prefix]".blue());
        println!("  {} {} - Suggest header values", "!values-suggest".yellow(), "<name> [prefix]".blue());
        println!();
        println!("{}", "Other:".cyan().bold());
        println!("  {} {}               - Set the response width", "!width".yellow(), "<N>".blue());
        println!("  {}                   - Clear screen", "!clear".yellow());
        println!("  {}                    - Show this help", "!help".yellow());
        println!("  {}                    - Exit restui", "!exit".yellow());
        println!();
    }
}
