use std::fmt;

/// Machine-readable error codes for agent-friendly decision making.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigParseError,
    ProfileNotFound,
    OfferNotFound,
    InvalidInput,
    ProfileBlobCorrupt,
    StoreWriteFailed,
    StoreReadFailed,
    LockContention,
    UpstreamRejected,
    UpstreamUnavailable,
    InternalUnexpected,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ConfigParseError => "E1002",
            Self::ProfileNotFound => "E2001",
            Self::OfferNotFound => "E2002",
            Self::InvalidInput => "E2005",
            Self::ProfileBlobCorrupt => "E3003",
            Self::StoreWriteFailed => "E5001",
            Self::LockContention => "E5002",
            Self::StoreReadFailed => "E5003",
            Self::UpstreamRejected => "E7001",
            Self::UpstreamUnavailable => "E7002",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ConfigParseError => "Config file parse error",
            Self::ProfileNotFound => "Profile not found",
            Self::OfferNotFound => "Offer or sailing not found",
            Self::InvalidInput => "Invalid input",
            Self::ProfileBlobCorrupt => "Stored profile blob is not valid JSON",
            Self::StoreWriteFailed => "Profile store write failed",
            Self::LockContention => "Lock contention",
            Self::StoreReadFailed => "Profile store read failed",
            Self::UpstreamRejected => "Offer API rejected the request",
            Self::UpstreamUnavailable => "Offer API unreachable",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint that can be surfaced to operators and agents.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::ConfigParseError => Some("Fix syntax in .tideline/config.toml and retry."),
            Self::ProfileNotFound => Some("Run `tl offers sync --profile <key>` to store offers first."),
            Self::OfferNotFound | Self::InvalidInput => None,
            Self::ProfileBlobCorrupt => {
                Some("Re-sync the profile; the stored blob will be replaced.")
            }
            Self::StoreWriteFailed | Self::StoreReadFailed => {
                Some("Check disk space and permissions on the store directory.")
            }
            Self::LockContention => Some("Retry after the other `tl` process releases its lock."),
            Self::UpstreamRejected => Some("Refresh the session token and account id, then retry."),
            Self::UpstreamUnavailable => {
                Some("Check connectivity or raise offers.request_timeout_ms.")
            }
            Self::InternalUnexpected => Some("Retry once. If persistent, report a bug with logs."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}
