use std::fmt;

use crate::android::zip::ApkZipError;

/// Return early with a [`FormatError`], optionally tagged with the byte offset it was detected at.
macro_rules! fail {
    (at $offset:expr, $msg:literal) => {
        return Err($crate::error::FormatError::at($offset, $msg))
    };
    (at $offset:expr, $fmtstr:literal, $($args:tt)*) => {
        return Err($crate::error::FormatError::at($offset, &format!($fmtstr, $($args)*)))
    };
    ($msg:literal) => {
        return Err($crate::error::FormatError::new($msg))
    };
    ($fmtstr:literal, $($args:tt)*) => {
        return Err($crate::error::FormatError::new(&format!($fmtstr, $($args)*)))
    };
}

/// A malformed DEX or AXML buffer.
///
/// Carries the offset the problem was detected at (when known) and a chain of
/// contexts, innermost first, added while the error travels outwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatError
{
    msg: String,
    offset: Option<usize>,
    contexts: Vec<String>,
}

impl FormatError
{
    pub(crate) fn new(msg: &str) -> Self
    {
        FormatError {
            msg: msg.to_string(),
            offset: None,
            contexts: Vec::new(),
        }
    }

    pub(crate) fn at(offset: usize, msg: &str) -> Self
    {
        FormatError {
            msg: msg.to_string(),
            offset: Some(offset),
            contexts: Vec::new(),
        }
    }

    pub(crate) fn with_context(mut self, context: String) -> Self
    {
        self.contexts.push(context);
        self
    }

    pub fn message(&self) -> &str
    {
        &self.msg
    }

    pub fn offset(&self) -> Option<usize>
    {
        self.offset
    }

    pub fn contexts(&self) -> &[String]
    {
        &self.contexts
    }
}

impl fmt::Display for FormatError
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "{}", self.msg)?;
        if let Some(offset) = self.offset
        {
            write!(f, " at offset 0x{:x}", offset)?;
        }
        let mut connector = " for ";
        for context in &self.contexts
        {
            write!(f, "{}{}", connector, context)?;
            connector = " of ";
        }
        Ok(())
    }
}

impl std::error::Error for FormatError {}

pub(crate) trait ResultExt<T>
{
    fn context<C: Into<String>>(self, context: impl FnOnce() -> C) -> Result<T, FormatError>;
}

impl<T> ResultExt<T> for Result<T, FormatError>
{
    fn context<C: Into<String>>(self, context: impl FnOnce() -> C) -> Result<T, FormatError>
    {
        self.map_err(|err| err.with_context(context().into()))
    }
}

/// Result alias for the crate's entry points.
pub type ApkResult<T> = Result<T, Error>;

/// Everything an entry point can fail with.
#[derive(Debug)]
pub enum Error
{
    /// A dex or binary XML blob could not be decoded.
    Format(FormatError),
    /// A caller-supplied package pattern is not a valid regular expression.
    FilterPattern
    {
        pattern: String,
        source: regex::Error,
    },
    /// The package is unreadable or lacks an expected entry.
    Container(ApkZipError),
    /// A classifier configuration file could not be loaded.
    Config(String),
}

impl fmt::Display for Error
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self
        {
            Error::Format(err) => write!(f, "format error: {err}"),
            Error::FilterPattern { pattern, source } => write!(f, "invalid package pattern '{pattern}': {source}"),
            Error::Container(err) => write!(f, "package error: {err}"),
            Error::Config(msg) => write!(f, "configuration error: {msg}"),
        }
    }
}

impl std::error::Error for Error
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)>
    {
        match self
        {
            Error::Format(err) => Some(err),
            Error::FilterPattern { source, .. } => Some(source),
            Error::Container(err) => Some(err),
            Error::Config(_) => None,
        }
    }
}

impl From<FormatError> for Error
{
    fn from(value: FormatError) -> Self
    {
        Error::Format(value)
    }
}

impl From<ApkZipError> for Error
{
    fn from(value: ApkZipError) -> Self
    {
        Error::Container(value)
    }
}
