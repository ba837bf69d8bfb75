// Copyright 2026 the Druid Authors
// SPDX-License-Identifier: Apache-2.0

//! The connection to the X server.
//!
//! The display is opened through Xlib, because GLX needs an Xlib `Display`. Window management
//! and events go through x11rb, over the XCB connection underneath it.

use std::ffi::c_void;
use std::mem::ManuallyDrop;
use std::ptr;

use anyhow::{anyhow, Context};
use x11_dl::glx::Glx;
use x11_dl::xlib;
use x11_dl::xlib_xcb::{XEventQueueOwner, Xlib_xcb};
use x11rb::connection::Connection;
use x11rb::errors::ConnectionError;
use x11rb::protocol::xproto::Screen;
use x11rb::protocol::Event;
use x11rb::xcb_ffi::XCBConnection;

use super::error::handle_xlib_error;
use crate::error::Error as ShellError;

// _NET_WM_PID
//
// A property containing the PID of the process that created the window.
//
// _NET_WM_NAME
//
// A version of WM_NAME supporting UTF8 text.
//
// UTF8_STRING
//
// The type of _NET_WM_NAME
x11rb::atom_manager! {
    pub(crate) DisplayAtoms: DisplayAtomsCookie {
        _NET_WM_PID,
        _NET_WM_NAME,
        UTF8_STRING,
    }
}

pub(crate) struct Display {
    /// x11rb's view of the Xlib connection. It does not own the underlying XCB connection and
    /// is dropped before the display is closed.
    connection: ManuallyDrop<XCBConnection>,
    /// The Xlib display. Being a raw pointer it also keeps the backend `!Send` and `!Sync`,
    /// so the rendering context stays on the thread that opened the session.
    raw: *mut xlib::Display,
    xlib: xlib::Xlib,
    glx: Glx,
    screen_num: usize,
    atoms: DisplayAtoms,
    previous_handler: Option<unsafe extern "C" fn(*mut xlib::Display, *mut xlib::XErrorEvent) -> std::os::raw::c_int>,
}

impl Display {
    pub(crate) fn connect() -> Result<Display, ShellError> {
        let xlib = xlib::Xlib::open().map_err(|e| ShellError::ConnectionUnavailable(e.to_string()))?;
        let xlib_xcb =
            Xlib_xcb::open().map_err(|e| ShellError::ConnectionUnavailable(e.to_string()))?;
        let glx = Glx::open().map_err(|e| {
            tracing::warn!("Failed to load libGL: {}", e);
            ShellError::UnsupportedGlx { major: 0, minor: 0 }
        })?;

        let raw = unsafe { (xlib.XOpenDisplay)(ptr::null()) };
        if raw.is_null() {
            let name = std::env::var("DISPLAY").unwrap_or_default();
            return Err(ShellError::ConnectionUnavailable(format!(
                "cannot open display {:?}",
                name
            )));
        }
        let previous_handler = unsafe { (xlib.XSetErrorHandler)(Some(handle_xlib_error)) };

        match attach(&xlib, &xlib_xcb, raw) {
            Ok((connection, screen_num, atoms)) => Ok(Display {
                connection: ManuallyDrop::new(connection),
                raw,
                xlib,
                glx,
                screen_num,
                atoms,
                previous_handler,
            }),
            Err(e) => {
                unsafe {
                    (xlib.XSetErrorHandler)(previous_handler);
                    (xlib.XCloseDisplay)(raw);
                }
                Err(e)
            }
        }
    }

    #[inline]
    pub(crate) fn connection(&self) -> &XCBConnection {
        &self.connection
    }

    #[inline]
    pub(crate) fn raw(&self) -> *mut xlib::Display {
        self.raw
    }

    #[inline]
    pub(crate) fn xlib(&self) -> &xlib::Xlib {
        &self.xlib
    }

    #[inline]
    pub(crate) fn glx(&self) -> &Glx {
        &self.glx
    }

    #[inline]
    pub(crate) fn screen_num(&self) -> usize {
        self.screen_num
    }

    #[inline]
    pub(crate) fn screen(&self) -> &Screen {
        // checked in `connect`
        &self.connection.setup().roots[self.screen_num]
    }

    #[inline]
    pub(crate) fn atoms(&self) -> &DisplayAtoms {
        &self.atoms
    }

    /// Wait until the server has processed every Xlib request sent so far, so that any error
    /// they caused has reached the error handler.
    pub(crate) fn sync(&self) {
        unsafe { (self.xlib.XSync)(self.raw, xlib::False) };
    }

    /// The next event, without blocking. Errors for x11rb requests are logged and skipped.
    pub(crate) fn poll_event(&self) -> Result<Option<Event>, ConnectionError> {
        while let Some(event) = self.connection.poll_for_event()? {
            match event {
                Event::Error(err) => tracing::error!("X11 error: {:?}", err),
                event => return Ok(Some(event)),
            }
        }
        Ok(None)
    }
}

/// Hand the event queue to XCB and wrap the connection for x11rb.
fn attach(
    xlib: &xlib::Xlib,
    xlib_xcb: &Xlib_xcb,
    raw: *mut xlib::Display,
) -> Result<(XCBConnection, usize, DisplayAtoms), ShellError> {
    let screen_num = unsafe { (xlib.XDefaultScreen)(raw) } as usize;
    let conn = unsafe {
        let xcb = (xlib_xcb.XGetXCBConnection)(raw);
        (xlib_xcb.XSetEventQueueOwner)(raw, XEventQueueOwner::XCBOwnsEventQueue);
        XCBConnection::from_raw_xcb_connection(xcb as *mut c_void, false)
    }
    .map_err(|e| ShellError::ConnectionUnavailable(e.to_string()))?;

    let atoms = DisplayAtoms::new(&conn)?
        .reply()
        .context("get X11 atoms")?;
    if conn.setup().roots.get(screen_num).is_none() {
        return Err(anyhow!("Invalid screen num: {}", screen_num).into());
    }
    Ok((conn, screen_num, atoms))
}

impl Drop for Display {
    fn drop(&mut self) {
        unsafe {
            ManuallyDrop::drop(&mut self.connection);
            (self.xlib.XSetErrorHandler)(self.previous_handler);
            (self.xlib.XCloseDisplay)(self.raw);
        }
    }
}
