use crate::params::Param;

use clap::Parser;

pub const DEFAULT_URL: &str = "https://jsonplaceholder.typicode.com/posts";
pub const DEFAULT_WIDTH: usize = 80;

fn parse_header(s: &str) -> Result<Param, String> {
    match s.split_once(':') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok(Param::new(name.trim(), value.trim()))
        }
        _ => Err(format!("Invalid header format, expected 'Name: value': {s}")),
    }
}

fn parse_method(s: &str) -> Result<String, String> {
    let method = s.to_uppercase();
    if crate::http::METHODS.contains(&method.as_str()) {
        Ok(method)
    } else {
        Err(format!(
            "Unsupported method {s}, expected one of {}",
            crate::http::METHODS.join(", ")
        ))
    }
}

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct CommandLineArgs {
    #[clap(help = "Initial URL of the session")]
    url: Option<String>,
    #[clap(short = 'X', long, value_parser = parse_method, help = "HTTP method (GET/POST/PUT/PATCH/DELETE/HEAD/OPTIONS)")]
    method: Option<String>,
    #[clap(short = 'p', long, default_value = "default", help = "profile name")]
    profile: String,
    #[clap(
        short = 'H',
        long = "header",
        value_parser = parse_header,
        help = "HTTP header to send with the request, as 'Name: value'"
    )]
    headers: Vec<Param>,
    #[clap(short = 'd', long, help = "body text to send with the request")]
    body: Option<String>,
    #[clap(short = 't', long, help = "bearer token for authentication")]
    token: Option<String>,
    #[clap(short = 'u', long, help = "username for basic authentication")]
    user: Option<String>,
    #[clap(short = 'w', long, help = "password for basic authentication")]
    password: Option<String>,
    #[clap(short = 'r', long, help = "CA certificate PEM file path")]
    ca_cert: Option<String>,
    #[clap(
        short = 'k',
        long,
        help = "Allow insecure server connections when using SSL"
    )]
    insecure: bool,
    #[clap(short = 'W', long, help = "width of the response view in columns")]
    width: Option<usize>,
    #[clap(short = 'v', long, help = "Print verbose messages")]
    verbose: bool,
}

impl CommandLineArgs {
    pub fn url(&self) -> Option<&String> {
        self.url.as_ref()
    }

    pub fn method(&self) -> Option<&String> {
        self.method.as_ref()
    }

    pub fn profile(&self) -> &String {
        &self.profile
    }

    pub fn headers(&self) -> &[Param] {
        &self.headers
    }

    pub fn body(&self) -> Option<&String> {
        self.body.as_ref()
    }

    pub fn token(&self) -> Option<&String> {
        self.token.as_ref()
    }

    pub fn user(&self) -> Option<&String> {
        self.user.as_ref()
    }

    pub fn password(&self) -> Option<&String> {
        self.password.as_ref()
    }

    pub fn ca_cert(&self) -> Option<&String> {
        self.ca_cert.as_ref()
    }

    pub fn insecure(&self) -> bool {
        self.insecure
    }

    pub fn width(&self) -> Option<usize> {
        self.width
    }

    pub fn verbose(&self) -> bool {
        self.verbose
    }
}
