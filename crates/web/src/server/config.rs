use std::io;
use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};

use http::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// Server settings, loadable from TOML. Every field is optional there.
///
/// ```
/// use strand_web::server::ServerConfig;
///
/// let config = ServerConfig::from_toml_str("listen_http_port = 8080\nlisten_https_port = 0").unwrap();
/// assert_eq!(config.listen_http_port, 8080);
/// assert!(!config.https_enabled());
/// assert!(config.no_date);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind, all interfaces when absent.
    pub listen_interface: Option<IpAddr>,
    /// 0 disables the HTTP listener.
    pub listen_http_port: u16,
    /// 0 disables the HTTPS listener.
    pub listen_https_port: u16,
    pub disable_http_if_https: bool,
    pub redirect_http_to_https: bool,
    /// Port put in the redirect location, omitted when it is 443.
    pub redirect_http_to_https_port: u16,
    pub redirect_http_to_https_status_code: u16,
    /// PEM encoded certificate chain.
    pub https_certificate: Option<String>,
    /// PEM encoded private key.
    pub https_key: Option<String>,
    /// Accepted for compatibility and ignored.
    pub https_dhparam: Option<String>,
    /// Don't send a `Date` header.
    pub no_date: bool,
    /// Send `Referrer-Policy: no-referrer`.
    pub no_referrer: bool,
    /// Trust `X-Forwarded-Proto` and `X-Forwarded-Host`.
    pub forwarded_headers: bool,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("can't read config file {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },

    #[error("invalid config: {source}")]
    Parse {
        #[from]
        source: toml::de::Error,
    },

    #[error("redirect status code must be a 3xx, got {0}")]
    InvalidRedirectStatus(u16),
}

pub(crate) const DEFAULT_HTTPS_PORT: u16 = 443;

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_interface: None,
            listen_http_port: 80,
            listen_https_port: DEFAULT_HTTPS_PORT,
            disable_http_if_https: false,
            redirect_http_to_https: false,
            redirect_http_to_https_port: DEFAULT_HTTPS_PORT,
            redirect_http_to_https_status_code: 302,
            https_certificate: None,
            https_key: None,
            https_dhparam: None,
            no_date: true,
            no_referrer: true,
            forwarded_headers: false,
        }
    }
}

impl ServerConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Parse`] for bad TOML or field types, [`ConfigError::InvalidRedirectStatus`]
    /// if validation fails.
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(toml)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Io`] if the file can't be read, otherwise as [`Self::from_toml_str`].
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let toml = std::fs::read_to_string(path).map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        Self::from_toml_str(&toml)
    }

    /// # Errors
    ///
    /// [`ConfigError::InvalidRedirectStatus`] if the redirect status is not a 3xx.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.redirect_status().map(|_| ())
    }

    pub(crate) fn redirect_status(&self) -> Result<StatusCode, ConfigError> {
        let code = self.redirect_http_to_https_status_code;
        StatusCode::from_u16(code)
            .ok()
            .filter(StatusCode::is_redirection)
            .ok_or(ConfigError::InvalidRedirectStatus(code))
    }

    pub fn interface(&self) -> IpAddr {
        self.listen_interface.unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
    }

    /// The certificate and key, if HTTPS is to be served.
    pub fn https_material(&self) -> Option<(&str, &str)> {
        if self.listen_https_port == 0 {
            return None;
        }
        match (&self.https_certificate, &self.https_key) {
            (Some(certificate), Some(key)) => Some((certificate, key)),
            _ => None,
        }
    }

    pub fn https_enabled(&self) -> bool {
        self.https_material().is_some()
    }

    pub fn http_enabled(&self) -> bool {
        self.listen_http_port != 0 && !(self.disable_http_if_https && self.https_enabled())
    }

    /// Whether plain HTTP requests are redirected instead of handled.
    pub fn redirects_to_https(&self) -> bool {
        self.redirect_http_to_https && self.http_enabled() && self.https_enabled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;
    use std::io::Write;

    #[test]
    fn defaults() {
        let config = ServerConfig::default();

        assert_eq!(config.listen_http_port, 80);
        assert_eq!(config.listen_https_port, 443);
        assert_eq!(config.redirect_http_to_https_status_code, 302);
        assert!(config.no_date);
        assert!(config.no_referrer);
        assert!(!config.forwarded_headers);
        assert!(config.http_enabled());
        assert!(!config.https_enabled());
        assert_eq!(config.interface(), IpAddr::V4(Ipv4Addr::UNSPECIFIED));
    }

    #[test]
    fn parse_toml() {
        let config = ServerConfig::from_toml_str(indoc! {r#"
            listen_interface = "127.0.0.1"
            listen_http_port = 8080
            listen_https_port = 8443
            redirect_http_to_https = true
            redirect_http_to_https_port = 8443
            redirect_http_to_https_status_code = 308
            https_certificate = "cert"
            https_key = "key"
            no_date = false
        "#})
        .unwrap();

        assert_eq!(config.interface(), IpAddr::V4(Ipv4Addr::LOCALHOST));
        assert_eq!(config.redirect_status().unwrap(), StatusCode::PERMANENT_REDIRECT);
        assert!(config.redirects_to_https());
        assert!(!config.no_date);
        assert!(config.no_referrer);
    }

    #[test]
    fn https_needs_certificate_and_key() {
        let config = ServerConfig { https_certificate: Some("cert".into()), ..ServerConfig::default() };
        assert!(!config.https_enabled());

        let config = ServerConfig { https_key: Some("key".into()), ..config };
        assert!(config.https_enabled());

        let config = ServerConfig { listen_https_port: 0, ..config };
        assert!(!config.https_enabled());
    }

    #[test]
    fn disable_http_if_https() {
        let config = ServerConfig {
            https_certificate: Some("cert".into()),
            https_key: Some("key".into()),
            disable_http_if_https: true,
            ..ServerConfig::default()
        };
        assert!(!config.http_enabled());
        assert!(!config.redirects_to_https());
    }

    #[test]
    fn redirect_status_must_be_3xx() {
        let result = ServerConfig::from_toml_str("redirect_http_to_https_status_code = 200");
        assert!(matches!(result, Err(ConfigError::InvalidRedirectStatus(200))));
    }

    #[test]
    fn unknown_types_fail() {
        let result = ServerConfig::from_toml_str("listen_http_port = \"eighty\"");
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn load_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "listen_http_port = 3000").unwrap();

        let config = ServerConfig::load(file.path()).unwrap();
        assert_eq!(config.listen_http_port, 3000);

        let missing = ServerConfig::load(file.path().with_extension("missing"));
        assert!(matches!(missing, Err(ConfigError::Io { .. })));
    }
}
