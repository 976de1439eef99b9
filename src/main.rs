mod args;
mod debounce;
mod decoder;
mod format;
mod http;
mod ini;
mod markup;
mod params;
mod profile;
mod repl;
mod session;
mod suggest;
mod sync;
mod wrap;

use anyhow::Result;
use clap::Parser;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use args::{CommandLineArgs, DEFAULT_URL};
use http::HttpClient;
use ini::{IniProfile, DEFAULT_INI_FILE_PATH};
use profile::Profile;
use repl::Repl;
use session::Session;

fn init_tracing(verbose: bool) {
    let default = if verbose { "restui=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = CommandLineArgs::parse();
    init_tracing(args.verbose());

    let ini = IniProfile::load(DEFAULT_INI_FILE_PATH, args.profile())?;
    debug!("profile [{}]: {:?}", args.profile(), ini);
    let profile = Profile::resolve(&args, ini.as_ref());

    let url = args.url().map(String::as_str).unwrap_or(DEFAULT_URL);
    let mut session = Session::new(url, profile.host(), profile.width());
    for header in profile.headers() {
        session.set_header(&header.key, &header.value);
    }
    if let Some(method) = args.method() {
        session.set_method(method)?;
    }
    session.set_body(args.body().cloned());
    session.set_token(profile.token().cloned());

    let client = HttpClient::new(&profile)?;
    let mut repl = Repl::new(client, session, args.verbose())?;
    repl.run().await
}
