use std::path::PathBuf;

/// Errors raised by the build-configuration engine.
///
/// Each variant fails the whole configure pass unless documented otherwise
/// at the call site (stray `main`/`lib` sources below `src/`'s top level and
/// `TestProbe`'s fast-path read are both non-fatal and never become an
/// `Error`).
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// `src/` is required but was not found under the project root.
    #[error("`src` directory not found at {0}")]
    MissingSourceRoot(PathBuf),

    /// More than one `main.*` or `lib.*` source sits directly in `src/`.
    #[error("multiple `{kind}` sources were found in `src/`")]
    AmbiguousEntry { kind: &'static str },

    /// Neither a `main.*` nor a `lib.*` source was found in `src/`.
    #[error("src/(main|lib).{{c,cc,cpp,cxx}} was not found")]
    NoEntry,

    /// The compiler returned non-zero, or its dependency/preprocessor output
    /// could not be parsed.
    #[error("compiler invocation failed for {source}: {detail}")]
    CompilerInvocationError { source: PathBuf, detail: String },

    /// Modules were requested but the detected compiler doesn't support them.
    #[error(
        "C++23 modules are not supported by this compiler ({cxx}); requires GCC 14+ or Clang 17+"
    )]
    UnsupportedCompilerError { cxx: String },

    /// The downstream build driver (Ninja) returned a non-success status.
    #[error("build driver failed: {0}")]
    DriverError(String),

    /// A filesystem read/write failed.
    #[error("io error at {path}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A referenced compile unit was missing from the graph. Programming bug.
    #[error("internal invariant violated: {0}")]
    InternalInvariantError(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::IoError {
            path: path.into(),
            source,
        }
    }
}
