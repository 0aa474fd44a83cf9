/// Failure classes reported by the `deploy` command.
///
/// Every class maps onto its own process exit code, so scripts can tell
/// a misconfiguration apart from a network outage. Codes start at 3, leaving
/// 1 to panics and 2 to command line usage errors reported by [`clap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ErrorKind {
    /// Missing credential, empty path or invalid configuration.
    Precondition,

    /// The remote account has no site to deploy to.
    Resolution,

    /// Network error, non-success status or malformed response body.
    Transport,

    /// Local filesystem error while archiving or saving the site identifier.
    LocalIo,
}

impl ErrorKind {
    /// Process exit code for this failure class.
    pub(crate) fn exit_code(self) -> u8 {
        match self {
            ErrorKind::Precondition => 3,
            ErrorKind::Resolution => 4,
            ErrorKind::Transport => 5,
            ErrorKind::LocalIo => 6,
        }
    }
}
