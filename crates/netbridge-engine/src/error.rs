//! Error types for the bridge
//!
//! One enum per concern. Reflection misses are not errors: they produce
//! invalid proxies. Only initialization failures are fatal.

use std::path::PathBuf;

use thiserror::Error;

/// Result alias used across the engine
pub type Result<T, E = ModuleError> = std::result::Result<T, E>;

/// Runtime bootstrap failures
#[derive(Debug, Error)]
pub enum InitError {
    /// The host left a function table entry null
    #[error("Function table entry '{0}' is missing")]
    MissingEntry(&'static str),

    /// The hosting layer refused to start the runtime
    #[error("Could not initialize runtime host: {0}")]
    HostFailed(String),

    /// A configured file does not exist
    #[error("Required file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// An operation needed a runtime that is not running
    #[error("Managed runtime is not initialized")]
    NotInitialized,
}

/// Assembly load failures, one per non-success load status
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    /// Path could not be made absolute
    #[error("Invalid file path: {0}")]
    BadPath(String),

    /// No file at the path
    #[error("File not found")]
    FileNotFound,

    /// The file exists but could not be read
    #[error("File load failure")]
    FileLoadFailure,

    /// The runtime rejected the path
    #[error("Invalid file path")]
    InvalidFilePath,

    /// The file is not a managed assembly
    #[error("Invalid assembly")]
    InvalidAssembly,

    /// Anything else, including unknown status codes
    #[error("Unknown error")]
    Unknown,

    /// The runtime returned an id that is already tracked
    #[error("Assembly key duplicate")]
    Duplicate,
}

/// Trampoline compilation failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JitError {
    /// A parameter or return category has no platform lowering
    #[error("Unsupported {position} type '{value_type}'")]
    UnsupportedType {
        /// "param" or "return"
        position: &'static str,
        /// Category name
        value_type: String,
    },

    /// The dispatch count is carried in a byte
    #[error("Too many parameters: {0} (maximum is 255)")]
    TooManyParameters(usize),

    /// The code generator failed
    #[error("Backend error: {0}")]
    Backend(String),

    /// Executable memory could not be declared, defined or finalized
    #[error("Module error: {0}")]
    Module(String),
}

/// One mismatch between a plugin's declared export and the managed method
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExportError {
    /// The function name is not `Class.Method` or `Namespace.Class.Method`
    #[error("Invalid function format: '{0}'. Please provide name in that format: 'Namespace.Class.Method' or 'Namespace.MyParentClass+MyNestedClass.Method' or 'Class.Method'")]
    InvalidFormat(String),

    /// No type with the class part of the name; carries the full function name
    #[error("Failed to find class '{0}'")]
    ClassNotFound(String),

    /// The class has no method with that name
    #[error("Failed to find method '{0}'")]
    MethodNotFound(String),

    /// Return categories differ
    #[error("Method '{name}' has invalid return type '{got}' when it should have '{expected}'")]
    ReturnMismatch {
        /// Function name
        name: String,
        /// Declared by the plugin
        got: String,
        /// Reported by the runtime
        expected: String,
    },

    /// Parameter counts differ
    #[error("Method '{name}' has invalid parameter count {got} when it should have {expected}")]
    ParamCountMismatch {
        /// Function name
        name: String,
        /// Declared by the plugin
        got: usize,
        /// Reported by the runtime
        expected: usize,
    },

    /// A parameter category differs
    #[error("Method '{name}' has invalid param type '{got}' at index {index} when it should have '{expected}'")]
    ParamMismatch {
        /// Function name
        name: String,
        /// Declared by the plugin
        got: String,
        /// Parameter index
        index: usize,
        /// Reported by the runtime
        expected: String,
    },

    /// The callback trampoline could not be generated
    #[error("Method '{name}' has JIT generation error: {error}")]
    Jit {
        /// Function name
        name: String,
        /// Compiler message
        error: String,
    },
}

/// Language module failures surfaced to the host
#[derive(Debug, Error)]
pub enum ModuleError {
    /// No provider was supplied
    #[error("Provider not exposed")]
    ProviderMissing,

    /// Runtime bootstrap failed
    #[error(transparent)]
    Init(#[from] InitError),

    /// Configuration could not be loaded
    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),

    /// The plugin assembly did not load
    #[error("{0}")]
    Load(#[from] LoadError),

    /// No trampoline compiler could be created
    #[error(transparent)]
    Jit(#[from] JitError),

    /// No type derives from the configured plugin base class
    #[error("Failed to find '{0}' class implementation")]
    PluginClassMissing(String),

    /// Every export mismatch of one plugin
    #[error("Not found {} method function(s)", join_errors(.0))]
    Exports(Vec<ExportError>),

    /// The plugin id is already loaded
    #[error("Plugin key duplicate")]
    DuplicatePlugin,

    /// The module is not installed
    #[error("Language module is not initialized")]
    NotInitialized,
}

fn join_errors(errors: &[ExportError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
