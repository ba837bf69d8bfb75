// Copyright 2026 the Druid Authors
// SPDX-License-Identifier: Apache-2.0

//! The window session: one window, one rendering context, one owner.

use std::fmt;

use tracing::{debug, error, info};

use crate::backend::{Backend, NativeEvent};
use crate::config::{FailurePolicy, SessionConfig};
use crate::error::Error;
use crate::window::{Size, WinHandler, WindowState};

/// The button whose press closes the session.
const PRIMARY_BUTTON: u8 = 1;

/// One on-screen window and the rendering context bound to it.
///
/// The session is not `Send`: the context may only ever be current on the thread that opened
/// it. Dropping the session releases everything it owns.
pub struct WindowSession<B: Backend> {
    /// `None` once the session has been closed.
    backend: Option<B>,
    handler: Box<dyn WinHandler>,
    state: WindowState,
    quit_requested: bool,
}

impl<B: Backend> WindowSession<B> {
    /// Open the display, create the window and make a rendering context current on it.
    ///
    /// What happens on failure is up to the config's [`FailurePolicy`]: by default a
    /// diagnostic is printed and the process exits.
    pub fn open(mut config: SessionConfig, handler: Box<dyn WinHandler>) -> Result<Self, Error> {
        config.apply_env();
        match B::open(&config) {
            Ok(backend) => Ok(WindowSession::from_backend(backend, &config, handler)),
            Err(e) => match config.failure_policy() {
                FailurePolicy::Exit => exit_with(&e),
                FailurePolicy::Return => {
                    error!("{}", e);
                    Err(e)
                }
            },
        }
    }

    pub(crate) fn from_backend(
        backend: B,
        config: &SessionConfig,
        mut handler: Box<dyn WinHandler>,
    ) -> Self {
        let state = WindowState {
            size: config.size(),
            fullscreen: false,
            double_buffered: config.framebuffer().double_buffer,
        };
        handler.connect(&state);
        WindowSession {
            backend: Some(backend),
            handler,
            state,
            quit_requested: false,
        }
    }

    /// Handle every event that is already queued, then return.
    ///
    /// A primary button press closes the session and tells the handler to quit. Once the
    /// session is closed there is nothing left to poll and this returns immediately.
    pub fn poll_events(&mut self) -> Result<(), Error> {
        loop {
            let event = match self.backend.as_mut() {
                Some(backend) => backend.poll_event()?,
                None => return Ok(()),
            };
            match event {
                Some(NativeEvent::Resized(size)) => self.resized(size),
                Some(NativeEvent::ButtonPress {
                    button: PRIMARY_BUTTON,
                }) => {
                    self.close();
                    self.quit_requested = true;
                    self.handler.quit();
                    return Ok(());
                }
                Some(NativeEvent::ButtonPress { button }) => {
                    debug!("ignoring press of button {}", button);
                }
                None => return Ok(()),
            }
        }
    }

    fn resized(&mut self, size: Size) {
        if self.state.resize(size) {
            info!("Size changed to: {}", size);
            self.handler.size(size);
        }
    }

    /// Render a frame, show it, and handle the events that arrived meanwhile.
    pub fn present_frame(&mut self) -> Result<(), Error> {
        if self.backend.is_none() {
            return Err(Error::SessionClosed);
        }
        self.handler.render();
        self.handler.post_render();
        if let Some(backend) = self.backend.as_mut() {
            backend.swap_buffers()?;
        }
        self.poll_events()
    }

    /// Release the rendering context, the window, the colormap and the connection, in that
    /// order. Closing a closed session does nothing.
    pub fn close(&mut self) {
        if let Some(mut backend) = self.backend.take() {
            debug!("closing window session");
            backend.release_all();
        }
    }

    /// Ask for the window to be fullscreen or not.
    ///
    /// Only a change of value does anything.
    pub fn set_fullscreen(&mut self, fullscreen: bool) {
        if fullscreen == self.state.fullscreen {
            return;
        }
        if let Some(backend) = self.backend.as_mut() {
            if fullscreen {
                backend.enter_fullscreen();
            } else {
                backend.exit_fullscreen();
            }
        }
        self.state.fullscreen = fullscreen;
    }

    /// The current size, fullscreen and double-buffering state.
    pub fn state(&self) -> &WindowState {
        &self.state
    }

    /// Whether the session still owns its window and rendering context.
    pub fn is_open(&self) -> bool {
        self.backend.is_some()
    }

    /// The backend holding the native handles, `None` once the session has been closed.
    pub fn backend(&self) -> Option<&B> {
        self.backend.as_ref()
    }

    /// Whether the window asked the application to quit.
    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }
}

impl<B: Backend> Drop for WindowSession<B> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<B: Backend + fmt::Debug> fmt::Debug for WindowSession<B> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("WindowSession")
            .field("backend", &self.backend)
            .field("state", &self.state)
            .field("quit_requested", &self.quit_requested)
            .finish()
    }
}

fn exit_with(err: &Error) -> ! {
    error!("{}", err);
    println!("{}", err);
    std::process::exit(1);
}
