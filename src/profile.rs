use crate::args::{CommandLineArgs, DEFAULT_WIDTH};
use crate::http::HttpConnectionProfile;
use crate::ini::IniProfile;
use crate::params::Param;

/// Settings of a run: command line values over the profile file over the
/// built-in defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    host: Option<String>,
    user: Option<String>,
    password: Option<String>,
    token: Option<String>,
    insecure: bool,
    ca_cert: Option<String>,
    width: usize,
    headers: Vec<Param>,
}

impl Profile {
    pub fn resolve(args: &CommandLineArgs, ini: Option<&IniProfile>) -> Self {
        let headers = ini
            .map(|i| i.headers().to_vec())
            .unwrap_or_default()
            .into_iter()
            .chain(args.headers().iter().cloned())
            .collect();

        Profile {
            host: ini.and_then(|i| i.host()).map(String::from),
            user: args.user().or(ini.and_then(|i| i.user())).cloned(),
            password: args.password().or(ini.and_then(|i| i.password())).cloned(),
            token: args.token().or(ini.and_then(|i| i.token())).cloned(),
            insecure: args.insecure() || ini.and_then(|i| i.insecure()).unwrap_or(false),
            ca_cert: args.ca_cert().or(ini.and_then(|i| i.ca_cert())).cloned(),
            width: args
                .width()
                .or(ini.and_then(|i| i.width()))
                .unwrap_or(DEFAULT_WIDTH),
            headers,
        }
    }

    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    pub fn token(&self) -> Option<&String> {
        self.token.as_ref()
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Profile headers first, then the command line ones, so later entries
    /// win when applied in order.
    pub fn headers(&self) -> &[Param] {
        &self.headers
    }
}

impl HttpConnectionProfile for Profile {
    fn user(&self) -> Option<&String> {
        self.user.as_ref()
    }

    fn password(&self) -> Option<&String> {
        self.password.as_ref()
    }

    fn insecure(&self) -> bool {
        self.insecure
    }

    fn ca_cert(&self) -> Option<&String> {
        self.ca_cert.as_ref()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use clap::Parser;
    use std::io::Write;

    fn ini_profile() -> IniProfile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[default]\nhost = https://api.test/\nuser = ann\npassword = pw\ninsecure = true\nwidth = 60\n@Accept = text/plain"
        )
        .unwrap();
        IniProfile::load(file.path().to_str().unwrap(), "default")
            .unwrap()
            .unwrap()
    }

    #[test]
    fn resolve_should_fall_back_to_defaults() {
        let args = CommandLineArgs::parse_from(["restui"]);
        let profile = Profile::resolve(&args, None);

        assert_eq!(profile.host(), None);
        assert_eq!(HttpConnectionProfile::user(&profile), None);
        assert!(!HttpConnectionProfile::insecure(&profile));
        assert_eq!(profile.width(), DEFAULT_WIDTH);
        assert!(profile.headers().is_empty());
    }

    #[test]
    fn resolve_should_take_the_profile_file_values() {
        let args = CommandLineArgs::parse_from(["restui"]);
        let profile = Profile::resolve(&args, Some(&ini_profile()));

        assert_eq!(profile.host(), Some("https://api.test"));
        assert_eq!(HttpConnectionProfile::user(&profile), Some(&"ann".to_string()));
        assert!(HttpConnectionProfile::insecure(&profile));
        assert_eq!(profile.width(), 60);
        assert_eq!(profile.headers(), [Param::new("Accept", "text/plain")]);
    }

    #[test]
    fn resolve_should_prefer_the_command_line() {
        let args = CommandLineArgs::parse_from([
            "restui",
            "-u",
            "bob",
            "-W",
            "100",
            "-H",
            "Accept: application/json",
        ]);
        let profile = Profile::resolve(&args, Some(&ini_profile()));

        assert_eq!(HttpConnectionProfile::user(&profile), Some(&"bob".to_string()));
        assert_eq!(HttpConnectionProfile::password(&profile), Some(&"pw".to_string()));
        assert_eq!(profile.width(), 100);
        assert_eq!(
            profile.headers(),
            [
                Param::new("Accept", "text/plain"),
                Param::new("Accept", "application/json")
            ]
        );
    }
}
