// Copyright 2026 the Druid Authors
// SPDX-License-Identifier: Apache-2.0

//! X11 and GLX implementation of the session backend.

// # Notes on error handling in X11
//
// X11 reports errors asynchronously by default. Requests sent through x11rb during window
// setup are checked synchronously with `.check()`; later ones report errors through the event
// stream, where they are logged.
//
// GLX calls go through Xlib instead, whose errors reach the handler installed for the life of
// the display. Context creation is where we expect them: a rejected
// `glXCreateContextAttribsARB` is how we learn that a context version is unsupported, so those
// calls run under an `ErrorTrap`, and an `XSync` makes sure every error has arrived before the
// trap is inspected.
//
// When checking for X11 errors synchronously, an error on the request means the connection is
// broken and needs no extra context. An error on the reply means there was something wrong
// with the request, and so we add context.

#[macro_use]
mod util;

mod display;
pub mod error;
mod glx;
mod window;

pub use window::X11Backend;
