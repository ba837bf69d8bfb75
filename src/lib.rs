// Copyright 2026 the Druid Authors
// SPDX-License-Identifier: Apache-2.0

//! Window and rendering-context shell for OpenGL applications on X11.
//!
//! A [`WindowSession`] owns one on-screen window together with the GLX
//! context bound to it. It is opened once, polled for events every frame
//! and torn down when the application is done with it:
//!
//! ```no_run
//! use glx_shell::{SessionConfig, WinHandler, WindowSession, X11Backend};
//!
//! struct App;
//!
//! impl WinHandler for App {
//!     fn render(&mut self) {
//!         // issue GL commands here
//!     }
//! }
//!
//! let config = SessionConfig::new("GL 3.0 Window", 640, 480);
//! let mut session = WindowSession::<X11Backend>::open(config, Box::new(App))?;
//! while !session.quit_requested() {
//!     session.present_frame()?;
//! }
//! # Ok::<(), glx_shell::Error>(())
//! ```
//!
//! The context is current on the thread that opened the session. GL entry
//! points are looked up with [`X11Backend::get_proc_address`], reached
//! through [`WindowSession::backend`].
//!
//! Everything the session needs from the windowing system goes through the
//! [`Backend`] trait; [`X11Backend`] is the implementation for X11 servers
//! with the GLX extension.

#![warn(missing_debug_implementations)]

pub mod backend;
pub mod config;
pub mod error;
pub mod fbconfig;
pub mod session;
pub mod window;

pub use backend::{Backend, NativeEvent, Resource};
#[cfg(unix)]
pub use backend::x11::X11Backend;
pub use config::{FailurePolicy, GlVersion, SessionConfig};
pub use error::Error;
pub use fbconfig::{FbConfigInfo, FramebufferConfig};
pub use session::WindowSession;
pub use window::{Size, WinHandler, WindowState};
