use std::io::{self, Write};

use indicatif::ProgressBar;

/// Log sink which hides the spinner while a log line is written.
///
/// Both the spinner and the logs are printed to the terminal, so writing
/// in between spinner redraws would leave partially erased lines behind.
pub(crate) struct ProgressWriter<W> {
    /// Spinner to suspend.
    progress: ProgressBar,

    /// Underlying sink.
    inner: W,
}

impl ProgressWriter<io::Stderr> {
    /// Create a new writer printing to stderr.
    pub fn stderr(progress: ProgressBar) -> Self {
        Self::new(progress, io::stderr())
    }
}

impl<W: Write> ProgressWriter<W> {
    /// Create a new writer printing into `inner`.
    pub fn new(progress: ProgressBar, inner: W) -> Self {
        Self { progress, inner }
    }
}

impl<W: Write> Write for ProgressWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let Self { progress, inner } = self;
        progress.suspend(|| inner.write(buf))
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        let Self { progress, inner } = self;
        progress.suspend(|| inner.write_all(buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
