use crate::params::Param;

use anyhow::{Context, Result};
use ini::{Ini, Properties};
use std::path::Path;
use tracing::debug;

pub const DEFAULT_INI_FILE_PATH: &str = "~/.restui";
pub const DEFAULT_INI_SECTION: &str = "default";

const INI_HOST: &str = "host";
const INI_USER: &str = "user";
const INI_PASSWORD: &str = "password";
const INI_TOKEN: &str = "token";
const INI_CA_CERT: &str = "ca_cert";
const INI_INSECURE: &str = "insecure";
const INI_WIDTH: &str = "width";
const INI_HEADER_PREFIX: &str = "@";

/// Connection defaults read from one section of the profile file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IniProfile {
    host: Option<String>,
    user: Option<String>,
    password: Option<String>,
    token: Option<String>,
    insecure: Option<bool>,
    ca_cert: Option<String>,
    width: Option<usize>,
    headers: Vec<Param>,
}

impl IniProfile {
    /// Loads section `name` of `file_path`. A missing file or section is not
    /// an error and yields `None`.
    pub fn load(file_path: &str, name: &str) -> Result<Option<IniProfile>> {
        let expanded = shellexpand::tilde(file_path).to_string();
        if !Path::new(&expanded).exists() {
            debug!("profile file not found: {}", expanded);
            return Ok(None);
        }

        let ini = Ini::load_from_file(&expanded)
            .with_context(|| format!("Failed to read profile file {expanded}"))?;
        let section = match ini.section(Some(name)) {
            Some(s) => s,
            None => {
                debug!("profile [{}] not found in {}", name, expanded);
                return Ok(None);
            }
        };

        fn try_get<T>(section: &Properties, key: &str) -> Result<Option<T>>
        where
            T: std::str::FromStr,
            T::Err: std::error::Error + Send + Sync + 'static,
        {
            section
                .get(key)
                .map(|s| {
                    s.trim()
                        .parse::<T>()
                        .with_context(|| format!("Invalid value for '{key}': {s}"))
                })
                .transpose()
        }

        let headers = section
            .iter()
            .filter_map(|(key, value)| {
                key.strip_prefix(INI_HEADER_PREFIX)
                    .map(|name| Param::new(name, value))
            })
            .collect();

        Ok(Some(IniProfile {
            host: try_get(section, INI_HOST)?,
            user: try_get(section, INI_USER)?,
            password: try_get(section, INI_PASSWORD)?,
            token: try_get(section, INI_TOKEN)?,
            insecure: try_get(section, INI_INSECURE)?,
            ca_cert: try_get(section, INI_CA_CERT)?,
            width: try_get(section, INI_WIDTH)?,
            headers,
        }))
    }

    /// Base URL for relative request URLs, without a trailing slash.
    pub fn host(&self) -> Option<&str> {
        self.host.as_deref().map(|h| h.trim_end_matches('/'))
    }

    pub fn user(&self) -> Option<&String> {
        self.user.as_ref()
    }

    pub fn password(&self) -> Option<&String> {
        self.password.as_ref()
    }

    pub fn token(&self) -> Option<&String> {
        self.token.as_ref()
    }

    pub fn insecure(&self) -> Option<bool> {
        self.insecure
    }

    pub fn ca_cert(&self) -> Option<&String> {
        self.ca_cert.as_ref()
    }

    pub fn width(&self) -> Option<usize> {
        self.width
    }

    pub fn headers(&self) -> &[Param] {
        &self.headers
    }
}
