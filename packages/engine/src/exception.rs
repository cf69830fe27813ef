//! Exception capture.
//!
//! Every failed entry point produces an [`Exception`]. Besides the `Error`
//! returned to the caller, the record goes through two side channels set by
//! [`ExceptionOptions`]: the per-thread "last exception" slot, and either a
//! registered callback or a message on standard error.

use std::cell::RefCell;
use std::fmt::Write as _;
use std::sync::{Arc, PoisonError, RwLock};

use latebind_core::ErrorCode;
use serde::Serialize;

use crate::error::Error;

/// Diagnostic snapshot of one failed call.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Exception {
    /// The entry point the caller used, e.g. `"call_method"`.
    pub initial_function: &'static str,
    /// The engine stage that failed: `parse`, `marshal`, `resolve`,
    /// `invoke`, `coerce`, `enumerate` or `substrate`.
    pub error_function: &'static str,
    pub code: ErrorCode,
    /// The member that failed, without arguments.
    pub member: String,
    /// The path through the failing segment, arguments rendered.
    pub complete_member: String,
    /// The engine's own description of the failure.
    pub message: String,
    /// Object-supplied description.
    pub description: Option<String>,
    /// Object-supplied source, usually the object's class or application.
    pub source: Option<String>,
    pub help_file: Option<String>,
    pub help_context: u32,
    /// 1-based index of the offending argument.
    pub arg_error: Option<usize>,
    /// True when the object raised the failure rather than the engine.
    pub remote: bool,
}

impl Exception {
    /// Snapshot an engine error.
    pub(crate) fn from_error(
        initial_function: &'static str,
        error_function: &'static str,
        error: &Error,
        member: String,
        complete_member: String,
    ) -> Self {
        let fault = error.fault();
        Exception {
            initial_function,
            error_function,
            code: error.code(),
            member,
            complete_member,
            message: error.to_string(),
            description: fault.and_then(|f| f.description.clone()),
            source: fault.and_then(|f| f.source.clone()),
            help_file: fault.and_then(|f| f.help_file.clone()),
            help_context: fault.map_or(0, |f| f.help_context),
            arg_error: fault.and_then(|f| f.arg_error),
            remote: error.is_remote(),
        }
    }
}

/// Receives every exception when registered.
pub type ExceptionCallback = Arc<dyn Fn(&Exception) + Send + Sync>;

/// Process-wide exception policy.
#[derive(Clone)]
pub struct ExceptionOptions {
    /// Heading printed above shown exceptions.
    pub app_name: String,
    /// Print each exception to standard error (ignored with a callback).
    pub show_exceptions: bool,
    /// Keep the latest exception for [`last_exception`].
    pub record_exceptions: bool,
    pub callback: Option<ExceptionCallback>,
}

impl Default for ExceptionOptions {
    fn default() -> Self {
        ExceptionOptions {
            app_name: "latebind".to_string(),
            show_exceptions: false,
            record_exceptions: true,
            callback: None,
        }
    }
}

impl std::fmt::Debug for ExceptionOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExceptionOptions")
            .field("app_name", &self.app_name)
            .field("show_exceptions", &self.show_exceptions)
            .field("record_exceptions", &self.record_exceptions)
            .field("callback", &self.callback.is_some())
            .finish()
    }
}

lazy_static::lazy_static! {
    static ref OPTIONS: RwLock<ExceptionOptions> = RwLock::new(ExceptionOptions::default());
}

thread_local! {
    static LAST: RefCell<Option<Exception>> = const { RefCell::new(None) };
}

/// Turn synchronous display on or off.
pub fn toggle_exceptions(show: bool) {
    OPTIONS
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .show_exceptions = show;
}

pub fn set_exception_options(options: ExceptionOptions) {
    *OPTIONS.write().unwrap_or_else(PoisonError::into_inner) = options;
}

pub fn exception_options() -> ExceptionOptions {
    OPTIONS.read().unwrap_or_else(PoisonError::into_inner).clone()
}

/// The latest exception recorded on this thread.
pub fn last_exception() -> Option<Exception> {
    LAST.with(|slot| slot.borrow().clone())
}

pub fn reset_last_exception() {
    LAST.with(|slot| *slot.borrow_mut() = None);
}

/// Write an exception to standard error under the application name.
pub fn show_exception(exception: &Exception) {
    let app_name = exception_options().app_name;
    eprintln!("{}\n{}", app_name, format_exception(exception, true));
}

/// Render an exception as labelled lines.
///
/// With `fixed_font` the values are aligned in one column.
pub fn format_exception(exception: &Exception, fixed_font: bool) -> String {
    let mut lines: Vec<(&str, String)> = vec![
        ("Member", exception.member.clone()),
        ("Function", exception.initial_function.to_string()),
        ("Error In", exception.error_function.to_string()),
        ("Error", exception.message.clone()),
        ("Code", exception.code.to_string()),
    ];
    if let Some(description) = &exception.description {
        lines.push(("Description", description.clone()));
    }
    if let Some(source) = &exception.source {
        lines.push(("Source", source.clone()));
    }
    if let Some(help_file) = &exception.help_file {
        lines.push((
            "Help File",
            format!("{} ({})", help_file, exception.help_context),
        ));
    }
    if let Some(arg) = exception.arg_error {
        lines.push(("Argument", arg.to_string()));
    }
    lines.push(("Path", exception.complete_member.clone()));

    let width = if fixed_font {
        lines.iter().map(|(label, _)| label.len()).max().unwrap_or(0)
    } else {
        0
    };

    let mut out = String::new();
    for (label, value) in lines {
        let _ = writeln!(out, "{:<width$}: {}", label, value, width = width);
    }
    out
}

/// Route a new exception through the configured channels.
///
/// Returns whether it was recorded.
pub(crate) fn report(exception: &Exception) -> bool {
    let options = exception_options();
    log::debug!(
        "exception in {} ({}): {} at {}",
        exception.initial_function,
        exception.error_function,
        exception.code,
        exception.complete_member
    );

    if options.record_exceptions {
        LAST.with(|slot| *slot.borrow_mut() = Some(exception.clone()));
    }
    match &options.callback {
        Some(callback) => callback(exception),
        None if options.show_exceptions => show_exception(exception),
        None => {}
    }
    options.record_exceptions
}
