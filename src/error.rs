//! Error types for the page compiler.
//!
//! Every fatal condition surfaces as a single [`CompileError`] tagged with the
//! [`CompilePhase`] that produced it, so callers can decide whether to fall
//! back to the uncompiled document.

use core::fmt;

/// Pipeline stage where a compile error originated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CompilePhase {
    /// Optional HTML pre-minification.
    HtmlMinify,
    /// Splitting the document into fragments.
    Segment,
    /// Converting fragments into the combined byte buffer.
    ByteMap,
    /// Merging adjacent same-tag intervals.
    Optimize,
    /// LZMA compression of the combined buffer.
    Compress,
    /// Z85 text encoding.
    Encode,
    /// Bootstrap script generation.
    Bootstrap,
    /// Writing the compiled script into the host document.
    Inject,
    /// Host-side reconstruction of a compiled page.
    Reconstruct,
    /// Reading the source document or writing the compiled one.
    Io,
}

impl CompilePhase {
    /// Stable lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::HtmlMinify => "html_minify",
            Self::Segment => "segment",
            Self::ByteMap => "byte_map",
            Self::Optimize => "optimize",
            Self::Compress => "compress",
            Self::Encode => "encode",
            Self::Bootstrap => "bootstrap",
            Self::Inject => "inject",
            Self::Reconstruct => "reconstruct",
            Self::Io => "io",
        }
    }
}

impl fmt::Display for CompilePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Typed actual-vs-limit context for budget overruns.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ErrorLimitContext {
    /// Which limit was hit (`max_input_bytes`, `max_fragments`, ...).
    pub kind: Box<str>,
    /// Observed value.
    pub actual: usize,
    /// Configured limit.
    pub limit: usize,
}

impl ErrorLimitContext {
    pub fn new(kind: impl Into<String>, actual: usize, limit: usize) -> Self {
        Self {
            kind: kind.into().into_boxed_str(),
            actual,
            limit,
        }
    }
}

/// Structured error for a failed compile.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompileError {
    /// Processing phase where this error originated.
    pub phase: CompilePhase,
    /// Stable machine-readable code.
    pub code: &'static str,
    /// Human-readable message.
    pub message: Box<str>,
    /// Optional typed actual-vs-limit context.
    pub limit: Option<Box<ErrorLimitContext>>,
    /// Optional index of the offending segmenter fragment.
    pub fragment_index: Option<usize>,
    /// Optional byte offset into the source document.
    pub offset: Option<usize>,
}

impl CompileError {
    pub(crate) fn new(phase: CompilePhase, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            phase,
            code,
            message: message.into().into_boxed_str(),
            limit: None,
            fragment_index: None,
            offset: None,
        }
    }

    pub(crate) fn with_limit(mut self, kind: &'static str, actual: usize, limit: usize) -> Self {
        self.limit = Some(Box::new(ErrorLimitContext::new(kind, actual, limit)));
        self
    }

    pub(crate) fn with_fragment_index(mut self, fragment_index: usize) -> Self {
        self.fragment_index = Some(fragment_index);
        self
    }

    pub(crate) fn with_offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// `true` when the error came from a configured [`crate::CompileLimits`] budget.
    pub fn is_limit(&self) -> bool {
        self.limit.is_some()
    }
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}: {}", self.phase, self.code, self.message)?;
        if let Some(fragment_index) = self.fragment_index {
            write!(f, " [fragment_index={}]", fragment_index)?;
        }
        if let Some(offset) = self.offset {
            write!(f, " [offset={}]", offset)?;
        }
        if let Some(limit) = self.limit.as_deref() {
            write!(
                f,
                " [limit_kind={} actual={} limit={}]",
                limit.kind, limit.actual, limit.limit
            )?;
        }
        Ok(())
    }
}

impl std::error::Error for CompileError {}

/// Failure reported by a bootstrap script minifier.
///
/// Never escapes a compile: the unminified script is used instead.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MinifyError {
    /// Human-readable message.
    pub message: Box<str>,
    /// Optional character offset into the script where the minifier gave up.
    pub offset: Option<usize>,
}

impl MinifyError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into().into_boxed_str(),
            offset: None,
        }
    }

    pub fn at(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }
}

impl fmt::Display for MinifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "script minify failed: {}", self.message)?;
        if let Some(offset) = self.offset {
            write!(f, " [offset={}]", offset)?;
        }
        Ok(())
    }
}

impl std::error::Error for MinifyError {}

/// Rejection from [`crate::z85::decode_checked`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Z85Error {
    /// Character outside the 85-symbol alphabet.
    InvalidChar {
        /// Offending character.
        ch: char,
        /// Character offset in the input text.
        offset: usize,
    },
    /// Text length leaves a single dangling character (`len % 5 == 1`),
    /// which cannot carry a whole byte.
    DanglingChar {
        /// Input length in characters.
        len: usize,
    },
    /// A group decodes to a value above `u32::MAX`.
    GroupOverflow {
        /// Character offset of the group start.
        offset: usize,
    },
}

impl fmt::Display for Z85Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidChar { ch, offset } => {
                write!(f, "invalid z85 character {:?} at offset {}", ch, offset)
            }
            Self::DanglingChar { len } => {
                write!(f, "z85 text length {} leaves a dangling character", len)
            }
            Self::GroupOverflow { offset } => {
                write!(f, "z85 group at offset {} overflows 32 bits", offset)
            }
        }
    }
}

impl std::error::Error for Z85Error {}

impl From<Z85Error> for CompileError {
    fn from(err: Z85Error) -> Self {
        let offset = match err {
            Z85Error::InvalidChar { offset, .. } | Z85Error::GroupOverflow { offset } => {
                Some(offset)
            }
            Z85Error::DanglingChar { .. } => None,
        };
        let mut out = CompileError::new(CompilePhase::Reconstruct, "Z85_TEXT", err.to_string());
        out.offset = offset;
        out
    }
}
