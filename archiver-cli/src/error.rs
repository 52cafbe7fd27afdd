use std::backtrace::Backtrace;
use std::error::Error;
use std::fmt::{self, Write};

use archiver::error::ArchiverError;

fn backtrace_requested() -> bool {
    std::env::var("RUST_BACKTRACE").is_ok_and(|value| value == "1" || value == "full")
}

pub type CliResult<T> = Result<T, CliError>;

/// Backtrace taken where a [`CliError`] was created.
pub struct CapturedBacktrace(Backtrace);

impl CapturedBacktrace {
    fn capture() -> Self {
        Self(Backtrace::capture())
    }
}

impl fmt::Debug for CapturedBacktrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Error type for the `archiver` binary.
#[derive(Debug)]
pub enum CliError {
    /// A drain or archive run failed.
    Run(anyhow::Error, CapturedBacktrace),
    /// Configuration could not be loaded or is invalid.
    Config(Box<dyn Error + Send + Sync>, CapturedBacktrace),
    /// I/O error.
    Io(std::io::Error, CapturedBacktrace),
}

impl CliError {
    /// Returns a short category label for this error.
    pub fn category(&self) -> &'static str {
        match self {
            CliError::Run(..) => "run error",
            CliError::Config(..) => "configuration error",
            CliError::Io(..) => "i/o error",
        }
    }

    /// Returns the backtrace for this error, preferring the one captured by the library.
    pub fn backtrace(&self) -> Option<&Backtrace> {
        match self {
            CliError::Run(err, cb) => err
                .downcast_ref::<ArchiverError>()
                .and_then(ArchiverError::backtrace)
                .or(Some(&cb.0)),
            CliError::Config(_, cb) => Some(&cb.0),
            CliError::Io(_, cb) => Some(&cb.0),
        }
    }

    pub fn run(err: anyhow::Error) -> Self {
        CliError::Run(err, CapturedBacktrace::capture())
    }

    /// Creates a configuration error from any source.
    pub fn config<E: Error + Send + Sync + 'static>(err: E) -> Self {
        CliError::Config(Box::new(err), CapturedBacktrace::capture())
    }

    /// Renders the multi-line report printed to stderr when the binary fails.
    ///
    /// The backtrace is appended only when `RUST_BACKTRACE` asks for it.
    pub fn render_report(&self) -> String {
        let mut out = format!("archiver failed\ncategory: {}\nerror: {self}\n", self.category());

        if let CliError::Run(err, _) = self
            && let Some(err) = err.downcast_ref::<ArchiverError>()
        {
            let _ = writeln!(out, "kind: {:?}", err.kind());
        }

        let causes = std::iter::successors(Error::source(self), |err: &&dyn Error| (*err).source());
        for (idx, cause) in causes.enumerate() {
            let _ = writeln!(out, "cause {}: {cause}", idx + 1);
        }

        if backtrace_requested()
            && let Some(backtrace) = self.backtrace()
        {
            let _ = writeln!(out, "backtrace:\n{}", backtrace.to_string().trim_end());
        }

        out
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Run(err, _) => write!(f, "{err}"),
            CliError::Config(source, _) => write!(f, "configuration error: {source}"),
            CliError::Io(source, _) => write!(f, "i/o error: {source}"),
        }
    }
}

impl Error for CliError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            CliError::Run(err, _) => err.source(),
            CliError::Config(source, _) => Some(source.as_ref()),
            CliError::Io(source, _) => Some(source),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io(err, CapturedBacktrace::capture())
    }
}
