use std::net::SocketAddr;

/// Facts about the transport a request arrived on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectionInfo {
    /// Whether the bytes were carried over TLS
    pub encrypted: bool,
    pub remote_addr: Option<SocketAddr>,
    pub local_addr: Option<SocketAddr>,
}

impl ConnectionInfo {
    pub fn plain() -> Self {
        Self::default()
    }

    pub fn encrypted() -> Self {
        Self { encrypted: true, ..Self::default() }
    }

    #[must_use]
    pub fn with_remote_addr(mut self, remote_addr: SocketAddr) -> Self {
        self.remote_addr = Some(remote_addr);
        self
    }

    #[must_use]
    pub fn with_local_addr(mut self, local_addr: SocketAddr) -> Self {
        self.local_addr = Some(local_addr);
        self
    }
}
