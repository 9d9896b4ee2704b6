use crate::expr::ParseError;
use std::path::PathBuf;
use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for glob-import transforms.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read config at {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config at {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Malformed glob-import call. `pos` is the byte offset of the call.
    #[error("Invalid glob import syntax: {message}")]
    Syntax { message: String, pos: usize },

    /// The anchored expression parser rejected the call site.
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("Invalid glob: {glob}. It must start with '/' or './'")]
    InvalidGlob { glob: String },

    #[error("In virtual modules, all globs must start with '/' (got '{glob}')")]
    VirtualRelative { glob: String },

    #[error("Invalid glob pattern '{pattern}': {message}")]
    Pattern { pattern: String, message: String },

    #[error("Failed to walk {path}: {message}")]
    Walk { path: String, message: String },

    #[error("Invalid overwrite {start}..{end}: {message}")]
    Splice {
        start: usize,
        end: usize,
        message: &'static str,
    },

    #[error("{0}")]
    Other(String),
}

impl Error {
    #[must_use]
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    pub(crate) fn syntax(message: impl Into<String>, pos: usize) -> Self {
        Self::Syntax {
            message: message.into(),
            pos,
        }
    }

    /// Source offset associated with the error, if any.
    #[must_use]
    pub fn pos(&self) -> Option<usize> {
        match self {
            Self::Syntax { pos, .. } => Some(*pos),
            Self::Parse(e) => Some(e.span.start as usize),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_syntax(&self) -> bool {
        matches!(self, Self::Syntax { .. } | Self::Parse(_))
    }

    #[must_use]
    pub fn is_resolution(&self) -> bool {
        matches!(self, Self::InvalidGlob { .. } | Self::VirtualRelative { .. })
    }

    /// Stable SCREAMING_SNAKE_CASE code for machine-readable output.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::Io(_) => "IO_ERROR",
            Self::ConfigRead { .. } => "CONFIG_READ_ERROR",
            Self::ConfigParse { .. } => "CONFIG_PARSE_ERROR",
            Self::Syntax { .. } => "GLOB_SYNTAX_ERROR",
            Self::Parse(_) => "GLOB_PARSE_ERROR",
            Self::InvalidGlob { .. } => "GLOB_INVALID",
            Self::VirtualRelative { .. } => "GLOB_VIRTUAL_RELATIVE",
            Self::Pattern { .. } => "GLOB_PATTERN_ERROR",
            Self::Walk { .. } => "GLOB_WALK_ERROR",
            Self::Splice { .. } => "SPLICE_ERROR",
            Self::Other(_) => "ERROR",
        }
    }
}
