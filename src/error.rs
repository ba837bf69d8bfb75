// Copyright 2026 the Druid Authors
// SPDX-License-Identifier: Apache-2.0

//! Errors at the window session level.

use std::fmt;
use std::sync::Arc;

#[cfg(unix)]
use crate::backend::x11::error as backend;

/// Session errors.
#[derive(Debug, Clone)]
pub enum Error {
    /// The display server could not be reached.
    ConnectionUnavailable(String),
    /// The server has no GLX extension, or one older than 1.3.
    UnsupportedGlx {
        /// Major GLX version reported by the server, `0` if GLX is missing.
        major: u32,
        /// Minor GLX version reported by the server.
        minor: u32,
    },
    /// None of the framebuffer configurations offered by the server match.
    NoCompatibleConfig,
    /// The window or its colormap could not be created.
    WindowCreation(Arc<anyhow::Error>),
    /// Neither the preferred nor the fallback rendering context could be created.
    ContextCreation(String),
    /// The session has already been torn down.
    SessionClosed,
    /// Platform specific error.
    #[cfg(unix)]
    Platform(backend::Error),
    /// Other miscellaneous error.
    Other(Arc<anyhow::Error>),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        match self {
            Error::ConnectionUnavailable(reason) => {
                write!(f, "Failed to open X display: {reason}")
            }
            Error::UnsupportedGlx { major: 0, minor: 0 } => {
                write!(f, "The X server does not support GLX")
            }
            Error::UnsupportedGlx { major, minor } => {
                write!(f, "Invalid GLX version {major}.{minor}, 1.3 is required")
            }
            Error::NoCompatibleConfig => write!(f, "Failed to retrieve a framebuffer config"),
            Error::WindowCreation(err) => write!(f, "Failed to create window: {err:#}"),
            Error::ContextCreation(reason) => {
                write!(f, "Failed to create an OpenGL context: {reason}")
            }
            Error::SessionClosed => write!(f, "The window session has already been closed."),
            #[cfg(unix)]
            Error::Platform(err) => fmt::Display::fmt(err, f),
            Error::Other(err) => write!(f, "{err:#}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<anyhow::Error> for Error {
    fn from(src: anyhow::Error) -> Error {
        Error::Other(Arc::new(src))
    }
}

#[cfg(unix)]
impl From<backend::Error> for Error {
    fn from(src: backend::Error) -> Error {
        Error::Platform(src)
    }
}

#[cfg(unix)]
impl From<x11rb::errors::ConnectionError> for Error {
    fn from(src: x11rb::errors::ConnectionError) -> Error {
        Error::Platform(src.into())
    }
}

#[cfg(unix)]
impl From<x11rb::errors::ReplyError> for Error {
    fn from(src: x11rb::errors::ReplyError) -> Error {
        Error::Platform(src.into())
    }
}

#[cfg(unix)]
impl From<x11rb::errors::ReplyOrIdError> for Error {
    fn from(src: x11rb::errors::ReplyOrIdError) -> Error {
        Error::Platform(src.into())
    }
}
