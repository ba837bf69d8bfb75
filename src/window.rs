// Copyright 2026 the Druid Authors
// SPDX-License-Identifier: Apache-2.0

//! The application-facing side of a window: callbacks in, state out.

use std::fmt;

/// A window size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Size {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Size {
    /// Create a new `Size`.
    pub const fn new(width: u32, height: u32) -> Size {
        Size { width, height }
    }

    /// Whether either dimension is zero.
    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} by {}", self.width, self.height)
    }
}

/// What the session reports back to the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowState {
    /// The current logical window size, updated on every resize.
    pub size: Size,
    /// Whether the window was last asked to be fullscreen.
    pub fullscreen: bool,
    /// Whether the window is double buffered.
    pub double_buffered: bool,
}

impl WindowState {
    /// Record a new size. Returns `false` if it is the size we already had.
    pub(crate) fn resize(&mut self, size: Size) -> bool {
        if self.size == size {
            false
        } else {
            self.size = size;
            true
        }
    }
}

/// App behavior, supplied by the app.
///
/// The session calls into the handler from the thread that owns it, during
/// [`WindowSession::poll_events`](crate::WindowSession::poll_events) and
/// [`WindowSession::present_frame`](crate::WindowSession::present_frame).
pub trait WinHandler {
    /// Called once the window and its rendering context exist and the context is current.
    #[allow(unused_variables)]
    fn connect(&mut self, state: &WindowState) {}

    /// Called when the size of the window has changed.
    #[allow(unused_variables)]
    fn size(&mut self, size: Size) {}

    /// Draw the frame. The rendering context is current.
    fn render(&mut self);

    /// Called after [`render`](WinHandler::render), before the buffers are swapped.
    fn post_render(&mut self) {}

    /// The window has been torn down and the application should exit.
    fn quit(&mut self) {}
}
