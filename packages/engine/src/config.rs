//! Process-wide configuration and the object substrate.
//!
//! The engine works with default settings when [`initialize`] is never
//! called. Initializing registers a [`Substrate`], which is how hosts hand
//! out starting objects by class or file name.

use std::sync::{Arc, PoisonError, RwLock};

use latebind_core::{Fault, ObjectRef};
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::exception::{self, ExceptionOptions};

/// How `%T` arguments are read.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarshalMode {
    /// `%T` reads a narrow string, like `%s`.
    #[default]
    Narrow,
    /// `%T` reads a wide string, like `%S`.
    Wide,
}

/// Exception policy as it appears in a settings file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExceptionSettings {
    /// Write each failure to standard error as it happens.
    pub show: bool,
    /// Keep the last failure for [`crate::last_exception`].
    pub record: bool,
    /// Heading used when a failure is shown.
    pub app_name: String,
}

impl Default for ExceptionSettings {
    fn default() -> Self {
        ExceptionSettings {
            show: false,
            record: true,
            app_name: "latebind".to_string(),
        }
    }
}

/// Engine settings.
///
/// # Example
///
/// ```rust
/// use latebind::{MarshalMode, Settings};
///
/// let settings = Settings::from_json(r#"{ "marshal_mode": "wide" }"#).unwrap();
/// assert_eq!(settings.marshal_mode, MarshalMode::Wide);
/// assert!(settings.initialize_substrate);
/// assert!(settings.exceptions.record);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub marshal_mode: MarshalMode,
    /// Whether `initialize` and `uninitialize` start and stop the substrate.
    pub initialize_substrate: bool,
    pub exceptions: ExceptionSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            marshal_mode: MarshalMode::Narrow,
            initialize_substrate: true,
            exceptions: ExceptionSettings::default(),
        }
    }
}

impl Settings {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// The object system the engine is initialized against.
///
/// It supplies starting objects; the engine never creates objects itself.
pub trait Substrate: Send + Sync {
    /// Bring the object system up.
    fn initialize(&self) -> Result<(), Fault> {
        Ok(())
    }

    /// Tear the object system down.
    fn uninitialize(&self) {}

    /// Create a new object of a registered class.
    fn create_object(&self, class: &str) -> Result<ObjectRef, Fault>;

    /// Bind to an object persisted in a file, optionally naming its class.
    fn get_object(&self, file: Option<&str>, class: Option<&str>) -> Result<ObjectRef, Fault> {
        let _ = (file, class);
        Err(Fault::not_implemented())
    }
}

struct Runtime {
    settings: Settings,
    substrate: Option<Arc<dyn Substrate>>,
    initialized: bool,
}

lazy_static::lazy_static! {
    static ref RUNTIME: RwLock<Runtime> = RwLock::new(Runtime {
        settings: Settings::default(),
        substrate: None,
        initialized: false,
    });
}

/// Install the exception policy, keeping any registered callback.
fn apply_exception_settings(exceptions: &ExceptionSettings) {
    exception::set_exception_options(ExceptionOptions {
        app_name: exceptions.app_name.clone(),
        show_exceptions: exceptions.show,
        record_exceptions: exceptions.record,
        callback: exception::exception_options().callback,
    });
}

/// Configure the engine and bring up the substrate.
///
/// Calling it again replaces the previous configuration after tearing the
/// previous substrate down.
pub fn initialize(settings: Settings, substrate: Option<Arc<dyn Substrate>>) -> Result<(), Error> {
    uninitialize();

    if settings.initialize_substrate {
        if let Some(substrate) = &substrate {
            substrate.initialize().map_err(Error::Substrate)?;
        }
    }

    apply_exception_settings(&settings.exceptions);

    log::debug!(
        "initialize: mode={:?} substrate={} managed={}",
        settings.marshal_mode,
        substrate.is_some(),
        settings.initialize_substrate
    );

    let mut runtime = RUNTIME.write().unwrap_or_else(PoisonError::into_inner);
    runtime.settings = settings;
    runtime.substrate = substrate;
    runtime.initialized = true;
    Ok(())
}

/// Release the substrate and return to default settings, exception policy
/// included.
pub fn uninitialize() {
    let previous = {
        let mut runtime = RUNTIME.write().unwrap_or_else(PoisonError::into_inner);
        if !runtime.initialized {
            return;
        }
        runtime.initialized = false;
        let managed = runtime.settings.initialize_substrate;
        runtime.settings = Settings::default();
        runtime.substrate.take().filter(|_| managed)
    };
    apply_exception_settings(&ExceptionSettings::default());
    if let Some(substrate) = previous {
        substrate.uninitialize();
    }
    log::debug!("uninitialize");
}

pub fn is_initialized() -> bool {
    RUNTIME
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .initialized
}

/// The marshal mode currently in force.
pub fn marshal_mode() -> MarshalMode {
    RUNTIME
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .settings
        .marshal_mode
}

/// A copy of the current settings.
pub fn settings() -> Settings {
    RUNTIME
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .settings
        .clone()
}

pub(crate) fn substrate() -> Result<Arc<dyn Substrate>, Error> {
    RUNTIME
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .substrate
        .clone()
        .ok_or(Error::NoSubstrate)
}
