//! Rendering for every `tl` command.
//!
//! Handlers build a serializable value and hand it here with a human
//! formatter. The mode comes from `tideline_core::config`: `--json`, then
//! `FORMAT` (`pretty|text|json`), then the user config `output` key, then
//! pretty on a TTY and text when piped.

use serde::Serialize;
use std::io::{self, Write};
use tideline_core::error::ErrorCode;
use tideline_core::lock::LockError;
use tideline_core::offers::FetchError;
use tideline_core::store::StoreError;

const RULE: &str = "------------------------------------------------------------------------";

pub fn pretty_rule(w: &mut dyn Write) -> io::Result<()> {
    writeln!(w, "{RULE}")
}

/// Heading line with a rule underneath.
pub fn pretty_section(w: &mut dyn Write, heading: &str) -> io::Result<()> {
    writeln!(w, "{heading}\n{RULE}")
}

/// `key:` padded to a fixed column, then the value.
pub fn pretty_kv(w: &mut dyn Write, key: &str, value: impl AsRef<str>) -> io::Result<()> {
    writeln!(w, "{:<14} {}", format!("{key}:"), value.as_ref())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Sections and rules for a terminal.
    Pretty,
    /// Tab-separated lines for pipes.
    Text,
    Json,
}

impl OutputMode {
    /// Map the resolved config value (`pretty|text|json`) to a mode.
    pub fn from_resolved(value: &str) -> Self {
        match value {
            "json" => Self::Json,
            "text" => Self::Text,
            _ => Self::Pretty,
        }
    }

    pub const fn is_json(self) -> bool {
        matches!(self, Self::Json)
    }
}

/// What the user sees when a command fails.
#[derive(Debug, Serialize)]
pub struct CliError {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    /// Stable `E####` code, when the failure has one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
}

impl CliError {
    fn uncoded(message: String) -> Self {
        Self {
            message,
            suggestion: None,
            error_code: None,
        }
    }

    fn coded(message: String, code: ErrorCode) -> Self {
        Self {
            message,
            suggestion: code.hint().map(str::to_string),
            error_code: Some(code.code().to_string()),
        }
    }
}

/// An error raised by a command handler with a stable code attached.
#[derive(Debug)]
pub struct CodedError {
    pub code: ErrorCode,
    pub message: String,
}

impl std::fmt::Display for CodedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for CodedError {}

/// Build an [`anyhow::Error`] carrying `code`.
pub fn coded(code: ErrorCode, message: impl Into<String>) -> anyhow::Error {
    anyhow::Error::new(CodedError {
        code,
        message: message.into(),
    })
}

/// Convert any command failure into a [`CliError`], picking up the code and
/// hint of the first typed error in the chain.
impl From<&anyhow::Error> for CliError {
    fn from(err: &anyhow::Error) -> Self {
        let message = format!("{err:#}");
        for cause in err.chain() {
            if let Some(coded) = cause.downcast_ref::<CodedError>() {
                return Self::coded(message, coded.code);
            }
            if let Some(store) = cause.downcast_ref::<StoreError>() {
                return Self::coded(message, store.code());
            }
            if let Some(lock) = cause.downcast_ref::<LockError>() {
                return Self::coded(message, lock.code());
            }
            if let Some(fetch) = cause.downcast_ref::<FetchError>() {
                return Self::coded(message, fetch.code());
            }
        }
        Self::uncoded(message)
    }
}

/// Print `value` to stdout: JSON in JSON mode, otherwise whatever `human_fn`
/// writes. Use [`render_mode`] when text and pretty output differ.
pub fn render<T: Serialize>(
    mode: OutputMode,
    value: &T,
    human_fn: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
) -> anyhow::Result<()> {
    with_stdout(|out| match mode {
        OutputMode::Json => write_json(out, value),
        OutputMode::Pretty | OutputMode::Text => Ok(human_fn(value, out)?),
    })
}

pub fn render_mode<T: Serialize>(
    mode: OutputMode,
    value: &T,
    text_fn: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
    pretty_fn: impl FnOnce(&T, &mut dyn Write) -> io::Result<()>,
) -> anyhow::Result<()> {
    with_stdout(|out| match mode {
        OutputMode::Json => write_json(out, value),
        OutputMode::Text => Ok(text_fn(value, out)?),
        OutputMode::Pretty => Ok(pretty_fn(value, out)?),
    })
}

/// Print a failure to stderr. JSON mode wraps it as `{"error": {...}}`.
pub fn render_error(mode: OutputMode, error: &CliError) -> anyhow::Result<()> {
    write_error(mode, error, &mut io::stderr().lock())
}

fn with_stdout(body: impl FnOnce(&mut dyn Write) -> anyhow::Result<()>) -> anyhow::Result<()> {
    body(&mut io::stdout().lock())
}

fn write_json<T: Serialize + ?Sized>(out: &mut dyn Write, value: &T) -> anyhow::Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

fn write_error(mode: OutputMode, error: &CliError, out: &mut dyn Write) -> anyhow::Result<()> {
    if mode.is_json() {
        return write_json(out, &serde_json::json!({ "error": error }));
    }
    writeln!(out, "error: {}", error.message)?;
    if let Some(hint) = &error.suggestion {
        writeln!(out, "  suggestion: {hint}")?;
    }
    Ok(())
}

/// Format an optional amount for tables.
pub fn money(amount: Option<f64>) -> String {
    amount.map_or_else(|| "-".to_string(), |value| format!("{value:.2}"))
}
