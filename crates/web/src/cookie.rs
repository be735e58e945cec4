//! Cookie directives and their wire format.
//!
//! A [`CookieDirective`] either sets a cookie or deletes it. [`CookieDirective::to_set_cookie`]
//! renders the `Set-Cookie` value; [`parse_set_cookie`] reads one back and
//! [`parse_cookie_header`] reads the `Cookie` request header.
//!
//! ```
//! use strand_web::cookie::{CookieDirective, CookieOptions, SameSite};
//!
//! let options = CookieOptions { same_site: Some(SameSite::Strict), ..CookieOptions::default() };
//! let directive = CookieDirective::set_with("abc", options);
//! assert_eq!(
//!     directive.to_set_cookie("session"),
//!     "session=abc; HttpOnly; Path=/; Priority=Medium; SameSite=Strict; Secure"
//! );
//! ```

use std::collections::HashMap;
use std::fmt;
use std::fmt::Write;
use std::str::FromStr;
use std::time::SystemTime;

use http::HeaderMap;
use http::header::COOKIE;

/// The `SameSite` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

/// The `Priority` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    Low,
    Medium,
    High,
}

/// The `Max-Age` attribute. A session cookie carries no `Max-Age` at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaxAge {
    Session,
    Seconds(i64),
}

/// Attributes of a cookie.
///
/// `Default` yields the runtime's defaults: `HttpOnly`, `Secure`, `Path=/`, `SameSite=Lax`,
/// `Priority=Medium` and a session lifetime. Set a field to `false`/`None` to clear a default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieOptions {
    pub http_only: bool,
    pub secure: bool,
    pub max_age: MaxAge,
    pub path: Option<String>,
    pub domain: Option<String>,
    pub same_site: Option<SameSite>,
    pub priority: Option<Priority>,
    pub expires: Option<SystemTime>,
}

impl Default for CookieOptions {
    fn default() -> Self {
        Self {
            http_only: true,
            secure: true,
            max_age: MaxAge::Session,
            path: Some("/".to_owned()),
            domain: None,
            same_site: Some(SameSite::Lax),
            priority: Some(Priority::Medium),
            expires: None,
        }
    }
}

impl CookieOptions {
    /// Options with every attribute absent.
    pub fn bare() -> Self {
        Self {
            http_only: false,
            secure: false,
            max_age: MaxAge::Session,
            path: None,
            domain: None,
            same_site: None,
            priority: None,
            expires: None,
        }
    }
}

/// What a response does to one cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CookieDirective {
    Set { value: String, options: CookieOptions },
    Delete { options: CookieOptions },
}

impl CookieDirective {
    /// Sets `value` with the default options.
    pub fn set<V: Into<String>>(value: V) -> Self {
        Self::Set { value: value.into(), options: CookieOptions::default() }
    }

    pub fn set_with<V: Into<String>>(value: V, options: CookieOptions) -> Self {
        Self::Set { value: value.into(), options }
    }

    /// Deletes the cookie, keeping the default path/domain scope.
    pub fn delete() -> Self {
        Self::Delete { options: CookieOptions::default() }
    }

    pub fn delete_with(options: CookieOptions) -> Self {
        Self::Delete { options }
    }

    /// Renders the `Set-Cookie` header value for the cookie `name`.
    ///
    /// A delete is written as an empty value with `Max-Age=-1` and no `Expires`.
    pub fn to_set_cookie(&self, name: &str) -> String {
        match self {
            Self::Set { value, options } => serialize(name, value, options.max_age, options.expires, options),
            Self::Delete { options } => serialize(name, "", MaxAge::Seconds(-1), None, options),
        }
    }
}

fn serialize(name: &str, value: &str, max_age: MaxAge, expires: Option<SystemTime>, options: &CookieOptions) -> String {
    let mut out = format!("{name}={value}");
    if options.http_only {
        out.push_str("; HttpOnly");
    }
    if let MaxAge::Seconds(seconds) = max_age {
        let _ = write!(out, "; Max-Age={seconds}");
    }
    if let Some(path) = &options.path {
        let _ = write!(out, "; Path={path}");
    }
    if let Some(priority) = options.priority {
        let _ = write!(out, "; Priority={priority}");
    }
    if let Some(same_site) = options.same_site {
        let _ = write!(out, "; SameSite={same_site}");
    }
    if options.secure {
        out.push_str("; Secure");
    }
    if let Some(domain) = &options.domain {
        let _ = write!(out, "; Domain={domain}");
    }
    if let Some(expires) = expires {
        let _ = write!(out, "; Expires={}", httpdate::fmt_http_date(expires));
    }
    out
}

/// Parses a `Set-Cookie` header value into the cookie name and its directive.
///
/// Attributes start out absent (see [`CookieOptions::bare`]) so only what the header carries
/// is set. An empty value with a non-positive `Max-Age` is read as a delete. Unknown or
/// malformed attributes are ignored.
pub fn parse_set_cookie(header: &str) -> Option<(String, CookieDirective)> {
    let mut parts = header.split(';');
    let (name, value) = split_pair(parts.next()?);
    if name.is_empty() {
        return None;
    }

    let mut options = CookieOptions::bare();
    for attribute in parts {
        let (key, attribute_value) = split_pair(attribute);
        match key.to_ascii_lowercase().as_str() {
            "httponly" => options.http_only = true,
            "secure" => options.secure = true,
            "max-age" => {
                if let Ok(seconds) = attribute_value.parse() {
                    options.max_age = MaxAge::Seconds(seconds);
                }
            }
            "path" => options.path = Some(attribute_value.to_owned()),
            "domain" => options.domain = Some(attribute_value.to_owned()),
            "samesite" => options.same_site = attribute_value.parse().ok(),
            "priority" => options.priority = attribute_value.parse().ok(),
            "expires" => options.expires = httpdate::parse_http_date(attribute_value).ok(),
            _ => {}
        }
    }

    let directive = match options.max_age {
        MaxAge::Seconds(seconds) if seconds <= 0 && value.is_empty() => {
            options.max_age = MaxAge::Session;
            options.expires = None;
            CookieDirective::Delete { options }
        }
        _ => CookieDirective::Set { value: value.to_owned(), options },
    };
    Some((name.to_owned(), directive))
}

/// Collects the cookies of every `Cookie` header into a map.
///
/// Pairs are separated by `;`. A value keeps any `=` it contains, and a name that
/// appears twice keeps its last value.
pub fn parse_cookie_header(headers: &HeaderMap) -> HashMap<String, String> {
    let mut cookies = HashMap::new();
    for header in headers.get_all(COOKIE) {
        let Ok(header) = header.to_str() else {
            continue;
        };
        for pair in header.split(';') {
            let (name, value) = split_pair(pair);
            if !name.is_empty() {
                cookies.insert(name.to_owned(), value.to_owned());
            }
        }
    }
    cookies
}

fn split_pair(pair: &str) -> (&str, &str) {
    let pair = pair.trim();
    match pair.split_once('=') {
        Some((name, value)) => (name.trim(), value.trim()),
        None => (pair, ""),
    }
}

impl fmt::Display for SameSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
            SameSite::None => "None",
        })
    }
}

impl FromStr for SameSite {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "strict" => Ok(SameSite::Strict),
            "lax" => Ok(SameSite::Lax),
            "none" => Ok(SameSite::None),
            _ => Err(()),
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Priority::Low => "Low",
            Priority::Medium => "Medium",
            Priority::High => "High",
        })
    }
}

impl FromStr for Priority {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            _ => Err(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;
    use std::time::Duration;

    #[test]
    fn set_with_defaults() {
        assert_eq!(
            CookieDirective::set("42").to_set_cookie("id"),
            "id=42; HttpOnly; Path=/; Priority=Medium; SameSite=Lax; Secure"
        );
    }

    #[test]
    fn cleared_defaults_are_omitted() {
        let options = CookieOptions {
            http_only: false,
            secure: false,
            path: None,
            priority: None,
            max_age: MaxAge::Seconds(3600),
            ..CookieOptions::default()
        };
        assert_eq!(CookieDirective::set_with("v", options).to_set_cookie("theme"), "theme=v; Max-Age=3600; SameSite=Lax");
    }

    #[test]
    fn delete_has_negative_max_age_and_no_expires() {
        let options = CookieOptions { expires: Some(SystemTime::UNIX_EPOCH), ..CookieOptions::default() };
        assert_eq!(
            CookieDirective::delete_with(options).to_set_cookie("id"),
            "id=; HttpOnly; Max-Age=-1; Path=/; Priority=Medium; SameSite=Lax; Secure"
        );
    }

    #[test]
    fn expires_uses_http_date() {
        let expires = SystemTime::UNIX_EPOCH + Duration::from_secs(784_111_777);
        let options = CookieOptions { expires: Some(expires), ..CookieOptions::bare() };
        assert_eq!(CookieDirective::set_with("1", options).to_set_cookie("a"), "a=1; Expires=Sun, 06 Nov 1994 08:49:37 GMT");
    }

    #[test]
    fn set_cookie_round_trip() {
        let options = CookieOptions {
            http_only: false,
            max_age: MaxAge::Seconds(60),
            path: Some("/app".to_owned()),
            domain: Some("example.com".to_owned()),
            same_site: Some(SameSite::None),
            priority: Some(Priority::High),
            expires: Some(SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000)),
            ..CookieOptions::default()
        };
        let directive = CookieDirective::set_with("a=b", options);

        let (name, parsed) = parse_set_cookie(&directive.to_set_cookie("token")).unwrap();
        assert_eq!(name, "token");
        assert_eq!(parsed, directive);
    }

    #[test]
    fn delete_round_trip() {
        let directive = CookieDirective::delete();
        let (name, parsed) = parse_set_cookie(&directive.to_set_cookie("id")).unwrap();
        assert_eq!(name, "id");
        assert_eq!(parsed, directive);
    }

    #[test]
    fn parse_set_cookie_ignores_unknown_attributes() {
        let (name, directive) = parse_set_cookie("a=1; Partitioned; max-age=oops; samesite=strict").unwrap();
        assert_eq!(name, "a");
        assert_eq!(
            directive,
            CookieDirective::set_with("1", CookieOptions { same_site: Some(SameSite::Strict), ..CookieOptions::bare() })
        );
        assert!(parse_set_cookie("=nameless").is_none());
    }

    #[test]
    fn cookie_header_last_wins() {
        let mut headers = HeaderMap::new();
        headers.append(COOKIE, HeaderValue::from_static("a=1; b=x=y;  c ; a=2"));
        headers.append(COOKIE, HeaderValue::from_static("d=4"));

        let cookies = parse_cookie_header(&headers);
        assert_eq!(cookies.len(), 4);
        assert_eq!(cookies["a"], "2");
        assert_eq!(cookies["b"], "x=y");
        assert_eq!(cookies["c"], "");
        assert_eq!(cookies["d"], "4");
    }
}
