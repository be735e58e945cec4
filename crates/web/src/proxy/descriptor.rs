use url::Url;

use crate::request::Request;

/// Which names of a kind (methods, query parameters, headers) are forwarded.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Forward {
    All,
    #[default]
    None,
    Only(Vec<String>),
}

impl Forward {
    pub fn only<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Only(names.into_iter().map(Into::into).collect())
    }

    /// Exact match, for query parameter names.
    pub fn allows(&self, name: &str) -> bool {
        match self {
            Self::All => true,
            Self::None => false,
            Self::Only(names) => names.iter().any(|allowed| allowed == name),
        }
    }

    /// Case-insensitive match, for header names and methods.
    pub fn allows_ignore_case(&self, name: &str) -> bool {
        match self {
            Self::All => true,
            Self::None => false,
            Self::Only(names) => names.iter().any(|allowed| allowed.eq_ignore_ascii_case(name)),
        }
    }
}

impl From<bool> for Forward {
    fn from(all: bool) -> Self {
        if all { Self::All } else { Self::None }
    }
}

impl<S: Into<String>> From<Vec<S>> for Forward {
    fn from(names: Vec<S>) -> Self {
        Self::only(names)
    }
}

/// What to forward of one inbound request, and of the answer to it.
///
/// Defaults: nothing of the request but its target goes upstream; status and body of the
/// upstream response come back, its headers don't.
#[derive(Debug)]
pub struct ProxyDescriptor {
    pub target_url: Url,
    pub request: Request,
    pub forward_method: Forward,
    pub forward_query_params: Forward,
    pub forward_headers: Forward,
    /// Never applies to `GET` or `HEAD`.
    pub forward_body: bool,
    /// Hand upstream redirects back instead of following them.
    pub forward_redirect: bool,
    pub forward_status: bool,
    pub forward_response_headers: Forward,
    pub forward_response_body: bool,
    /// Add `X-Forwarded-Host` and `X-Forwarded-Proto` for the inbound origin.
    pub forwarded_headers: bool,
    pub server_certificate: Option<String>,
}

impl ProxyDescriptor {
    pub fn new(target_url: Url, request: Request) -> Self {
        Self {
            target_url,
            request,
            forward_method: Forward::None,
            forward_query_params: Forward::None,
            forward_headers: Forward::None,
            forward_body: false,
            forward_redirect: false,
            forward_status: true,
            forward_response_headers: Forward::None,
            forward_response_body: true,
            forwarded_headers: false,
            server_certificate: None,
        }
    }

    #[must_use]
    pub fn forward_method<F: Into<Forward>>(mut self, forward: F) -> Self {
        self.forward_method = forward.into();
        self
    }

    #[must_use]
    pub fn forward_query_params<F: Into<Forward>>(mut self, forward: F) -> Self {
        self.forward_query_params = forward.into();
        self
    }

    #[must_use]
    pub fn forward_headers<F: Into<Forward>>(mut self, forward: F) -> Self {
        self.forward_headers = forward.into();
        self
    }

    #[must_use]
    pub fn forward_body(mut self, forward: bool) -> Self {
        self.forward_body = forward;
        self
    }

    #[must_use]
    pub fn forward_redirect(mut self, forward: bool) -> Self {
        self.forward_redirect = forward;
        self
    }

    #[must_use]
    pub fn forward_status(mut self, forward: bool) -> Self {
        self.forward_status = forward;
        self
    }

    #[must_use]
    pub fn forward_response_headers<F: Into<Forward>>(mut self, forward: F) -> Self {
        self.forward_response_headers = forward.into();
        self
    }

    #[must_use]
    pub fn forward_response_body(mut self, forward: bool) -> Self {
        self.forward_response_body = forward;
        self
    }

    #[must_use]
    pub fn forwarded_headers(mut self, add: bool) -> Self {
        self.forwarded_headers = add;
        self
    }

    #[must_use]
    pub fn server_certificate<C: Into<String>>(mut self, certificate: C) -> Self {
        self.server_certificate = Some(certificate.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_matching() {
        assert!(Forward::All.allows("anything"));
        assert!(!Forward::None.allows("anything"));

        let only = Forward::from(vec!["id", "X-Trace"]);
        assert!(only.allows("id"));
        assert!(!only.allows("ID"));
        assert!(only.allows_ignore_case("x-trace"));
        assert!(!only.allows_ignore_case("other"));
    }

    #[test]
    fn forward_from_bool() {
        assert_eq!(Forward::from(true), Forward::All);
        assert_eq!(Forward::from(false), Forward::None);
    }
}
