//! Shared connection state types.

use serde::Serialize;

/// Connection state of the sharing service towards the LAN server.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// No status check has run yet.
    Unconfigured,
    /// A status check is in flight.
    CheckingServer,
    Online,
    Offline,
}

impl ConnectionState {
    pub const fn is_online(self) -> bool {
        matches!(self, Self::Online)
    }

    /// Mode indicator shown next to any listing.
    pub const fn mode(self) -> ConnectionMode {
        if self.is_online() {
            ConnectionMode::Online
        } else {
            ConnectionMode::Offline
        }
    }
}

/// Which tier served a result.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionMode {
    Online,
    Offline,
}

impl std::fmt::Display for ConnectionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Online => write!(f, "online"),
            Self::Offline => write!(f, "offline"),
        }
    }
}
