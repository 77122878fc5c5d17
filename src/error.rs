use std::path::PathBuf;

/// Errors reported by a play session. None of them change the cursor.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("invalid move: cannot pour container {from} into container {to}")]
    InvalidMove { from: usize, to: usize },

    #[error("move {from} -> {to} is legal but lies outside the explored tree")]
    MoveNotInTree { from: usize, to: usize },

    #[error("the search tree has not been built yet")]
    TreeNotBuilt,

    #[error("no hint available")]
    NoHintAvailable,

    #[error("no solution exists from here")]
    NoSolutionExists,
}

/// Errors produced while reading a puzzle from its text form.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("container {container} has {found} slots, expected 4")]
    WrongSlotCount { container: usize, found: usize },

    #[error("container {container} has an unknown label '{label}'")]
    InvalidLabel { container: usize, label: String },

    #[error("container {container} has fluid resting above an empty slot")]
    FloatingFluid { container: usize },

    #[error("color {label} appears {count} times, expected 4")]
    UnbalancedColor { label: String, count: usize },

    #[error("no containers found")]
    NoContainers,
}

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Validation(String),
}
