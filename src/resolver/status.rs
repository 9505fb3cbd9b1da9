//! Failure status carried by resolution results, and the formatter that
//! flattens an error chain into a single message.

use std::error::Error as StdError;
use std::fmt;
use std::io;
use std::sync::Arc;

/// Coarse classification of a resolution failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCode {
    Internal,
    Unavailable,
    NotFound,
    InvalidArgument,
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StatusCode::Internal => "internal",
            StatusCode::Unavailable => "unavailable",
            StatusCode::NotFound => "not_found",
            StatusCode::InvalidArgument => "invalid_argument",
        };
        f.write_str(s)
    }
}

/// A failed resolution: code, flattened message and the originating error.
#[derive(Debug, Clone)]
pub struct Status {
    pub code: StatusCode,
    pub message: String,
    pub source: Option<Arc<dyn StdError + Send + Sync>>,
}

impl Status {
    pub fn new(code: StatusCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl StdError for Status {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_deref()
            .map(|e| e as &(dyn StdError + 'static))
    }
}

/// Build a [`Status`] from `summary` and a (possibly nested) error.
///
/// The message is `summary` followed by every error in the chain, see
/// [`error_chain_message`]. The outermost error is named by its type.
/// `code` defaults to [`StatusCode::Internal`].
pub fn status_from_error<E>(summary: &str, err: E, code: Option<StatusCode>) -> Status
where
    E: StdError + Send + Sync + 'static,
{
    let head = io_kind_name(&err).unwrap_or_else(short_type_name::<E>);
    let message = format!("{} {}", summary, format_chain(head, &err));
    Status {
        code: code.unwrap_or(StatusCode::Internal),
        message,
        source: Some(Arc::new(err)),
    }
}

/// Flatten `err` and its `source()` chain, outermost first, into
/// `"Kind: message Kind: message ..."`.
pub fn error_chain_message(err: &(dyn StdError + 'static)) -> String {
    format_chain(kind_name(err), err)
}

fn format_chain(head: String, err: &(dyn StdError + 'static)) -> String {
    let mut out = format!("{}: {}", head, err);
    let mut current = err.source();
    while let Some(e) = current {
        out.push(' ');
        out.push_str(&kind_name(e));
        out.push_str(": ");
        out.push_str(&e.to_string());
        current = e.source();
    }
    out
}

/// `Error` type name without its module path or generic arguments.
fn short_type_name<E>() -> String {
    let full = std::any::type_name::<E>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base).to_string()
}

// `io::Error`'s Debug output names its internal repr (`Os`, `Custom`, `Kind`).
fn io_kind_name(err: &(dyn StdError + 'static)) -> Option<String> {
    err.downcast_ref::<io::Error>().map(|_| "IoError".to_string())
}

/// Name of an error reached through `source()`, where only the trait object
/// is available: `IoError` for `io::Error`, otherwise the head of its `Debug`
/// output (`ParseIntError { .. }` → `ParseIntError`, `Timeout(..)` → `Timeout`).
fn kind_name(err: &(dyn StdError + 'static)) -> String {
    if let Some(name) = io_kind_name(err) {
        return name;
    }
    let debug = format!("{:?}", err);
    let name: String = debug
        .chars()
        .take_while(|c| c.is_alphanumeric() || *c == '_')
        .collect();
    if name.is_empty() {
        "Error".to_string()
    } else {
        name
    }
}
