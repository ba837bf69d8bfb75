// Copyright 2026 the Druid Authors
// SPDX-License-Identifier: Apache-2.0

//! Platform specific implementations.
//!
//! A [`WindowSession`](crate::WindowSession) talks to the windowing system only through the
//! [`Backend`] trait.

#[cfg(unix)]
pub mod x11;

use crate::config::SessionConfig;
use crate::error::Error;
use crate::window::Size;

/// The native resources a backend owns, in the order they are released.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    /// The rendering context.
    Context,
    /// The on-screen window.
    Window,
    /// The colormap created for the window's visual.
    Colormap,
    /// The connection to the display server.
    Connection,
}

impl Resource {
    /// The context goes before the window it is bound to, and the connection goes last.
    pub const TEARDOWN_ORDER: [Resource; 4] = [
        Resource::Context,
        Resource::Window,
        Resource::Colormap,
        Resource::Connection,
    ];
}

/// A window event, stripped of its platform details.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeEvent {
    /// The window was reconfigured. The size may be unchanged.
    Resized(Size),
    /// A pointer button was pressed inside the window.
    ButtonPress {
        /// The button number, `1` being the primary button.
        button: u8,
    },
}

/// A windowing system that can host one window with a rendering context.
///
/// All calls happen on the thread that owns the session.
pub trait Backend: Sized {
    /// Connect, pick a framebuffer configuration, create the window and make a rendering
    /// context current on it.
    ///
    /// On failure everything created so far has already been released.
    fn open(config: &SessionConfig) -> Result<Self, Error>;

    /// Take the next queued event for the window without blocking.
    fn poll_event(&mut self) -> Result<Option<NativeEvent>, Error>;

    /// Exchange the front and back buffers.
    fn swap_buffers(&mut self) -> Result<(), Error>;

    fn enter_fullscreen(&mut self);

    fn exit_fullscreen(&mut self);

    /// Release one resource. Releasing something already released does nothing.
    fn release(&mut self, resource: Resource);

    /// Release everything, in [`Resource::TEARDOWN_ORDER`].
    fn release_all(&mut self) {
        for resource in Resource::TEARDOWN_ORDER {
            self.release(resource);
        }
    }
}
