// Copyright 2026 the Druid Authors
// SPDX-License-Identifier: Apache-2.0

//! X11 window creation and the GLX-backed session backend.

use std::convert::TryFrom;
use std::ffi::c_void;
use std::ptr;

use anyhow::{anyhow, Context, Error};
use tracing::{debug, info};
use x11_dl::glx::{GLXContext, GLXFBConfig};
use x11_dl::xlib;
use x11rb::connection::Connection;
use x11rb::protocol::xproto::{
    self, AtomEnum, ColormapAlloc, ConnectionExt, CreateWindowAux, EventMask, PropMode,
    WindowClass,
};
use x11rb::protocol::Event;
use x11rb::wrapper::ConnectionExt as _;
use x11rb::xcb_ffi::XCBConnection;

use super::display::Display;
use super::glx as negotiate;
use super::util;
use crate::backend::{Backend, NativeEvent, Resource};
use crate::config::SessionConfig;
use crate::error::Error as ShellError;
use crate::fbconfig::FbConfigInfo;
use crate::window::Size;

/// A window with a GLX rendering context on an X server.
///
/// Every handle is optional so that teardown can release them one at a time; a released handle
/// is `None`.
pub struct X11Backend {
    display: Option<Display>,
    window: Option<xproto::Window>,
    colormap: Option<xproto::Colormap>,
    context: Option<GLXContext>,
}

impl std::fmt::Debug for X11Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("X11Backend")
            .field("connected", &self.display.is_some())
            .field("window", &self.window)
            .field("colormap", &self.colormap)
            .field("context", &self.context)
            .finish()
    }
}

impl X11Backend {
    fn display(&self) -> Result<&Display, ShellError> {
        self.display.as_ref().ok_or(ShellError::SessionClosed)
    }

    fn build(&mut self, config: &SessionConfig) -> Result<(), ShellError> {
        let display = self.display.as_ref().ok_or(ShellError::SessionClosed)?;
        negotiate::check_version(display)?;
        let (info, fbconfig) = negotiate::choose_fb_config(display, config.framebuffer())?;

        let (colormap, window) = create_window(display, &info, config)
            .map_err(|e| ShellError::WindowCreation(e.into()))?;
        self.colormap = Some(colormap);
        self.window = Some(window);

        let context = create_context(display, fbconfig, config)?;
        self.context = Some(context);
        negotiate::report_direct(display, context);
        negotiate::make_current(display, window.into(), context)?;
        Ok(())
    }

    /// The x11rb connection to the X server, `None` once it has been released.
    pub fn connection(&self) -> Option<&XCBConnection> {
        self.display.as_ref().map(Display::connection)
    }

    /// The Xlib display the rendering context belongs to, `None` once it has been released.
    pub fn xlib_display(&self) -> Option<*mut xlib::Display> {
        self.display.as_ref().map(Display::raw)
    }

    /// The X11 window id, `None` once the window has been destroyed.
    pub fn window(&self) -> Option<xproto::Window> {
        self.window
    }

    /// The GLX rendering context, `None` once it has been destroyed.
    pub fn context(&self) -> Option<GLXContext> {
        self.context
    }

    /// Make the rendering context current on the calling thread again.
    pub fn make_current(&self) -> Result<(), ShellError> {
        let display = self.display()?;
        match (self.window, self.context) {
            (Some(window), Some(context)) => {
                negotiate::make_current(display, window.into(), context)
            }
            _ => Err(ShellError::SessionClosed),
        }
    }

    /// The address of the GL function `name`, for loading GL.
    ///
    /// Null if the function is unknown or the session has been closed.
    pub fn get_proc_address(&self, name: &str) -> *const c_void {
        match &self.display {
            Some(display) => negotiate::get_proc_address(display, name),
            None => ptr::null(),
        }
    }
}

fn create_context(
    display: &Display,
    fbconfig: GLXFBConfig,
    config: &SessionConfig,
) -> Result<GLXContext, ShellError> {
    // window creation was checked, but make sure the server has seen it before GLX uses it
    display.connection().flush()?;
    negotiate::create_context(display, fbconfig, config)
}

/// Create the colormap and the window for `fbconfig`'s visual, then title and map the window.
fn create_window(
    display: &Display,
    fbconfig: &FbConfigInfo,
    config: &SessionConfig,
) -> Result<(xproto::Colormap, xproto::Window), Error> {
    let conn = display.connection();
    let screen = display.screen();
    let (depth, visual) = util::find_visual(screen, fbconfig.visual_id)
        .ok_or_else(|| anyhow!("no visual {:#x} on screen", fbconfig.visual_id))?;
    info!("Chosen visual ID = {:#x}", visual.visual_id);

    debug!("Creating colormap");
    let colormap = conn.generate_id()?;
    conn.create_colormap(ColormapAlloc::NONE, colormap, screen.root, visual.visual_id)?
        .check()
        .context("create colormap")?;

    let size = config.size();
    let cw_values = CreateWindowAux::new()
        .background_pixmap(x11rb::NONE)
        .border_pixel(0)
        .colormap(colormap)
        .event_mask(EventMask::STRUCTURE_NOTIFY | EventMask::BUTTON_PRESS);

    debug!("Creating window");
    let created = conn.generate_id().map_err(Error::from).and_then(|id| {
        conn.create_window(
            // Window depth
            depth,
            // The new window's ID
            id,
            // Parent window of this new window
            screen.root,
            // X-coordinate of the new window
            0,
            // Y-coordinate of the new window
            0,
            // Width of the new window
            u16::try_from(size.width)?,
            // Height of the new window
            u16::try_from(size.height)?,
            // Border width
            0,
            // Window class type
            WindowClass::INPUT_OUTPUT,
            // Visual ID
            visual.visual_id,
            // Window properties mask
            &cw_values,
        )?
        .check()
        .context("create window")?;
        Ok(id)
    });
    let id = match created {
        Ok(id) => id,
        Err(e) => {
            log_x11!(conn.free_colormap(colormap));
            return Err(e);
        }
    };

    set_properties(display, id, config.title());

    debug!("Mapping window");
    conn.map_window(id)?;
    Ok((colormap, id))
}

fn set_properties(display: &Display, id: xproto::Window, title: &str) {
    let conn = display.connection();
    let atoms = display.atoms();
    log_x11!(conn.change_property8(
        PropMode::REPLACE,
        id,
        AtomEnum::WM_NAME,
        AtomEnum::STRING,
        title.as_bytes(),
    ));
    log_x11!(conn.change_property8(
        PropMode::REPLACE,
        id,
        atoms._NET_WM_NAME,
        atoms.UTF8_STRING,
        title.as_bytes(),
    ));
    let pid = nix::unistd::Pid::this().as_raw();
    if let Ok(pid) = u32::try_from(pid) {
        log_x11!(conn.change_property32(
            PropMode::REPLACE,
            id,
            atoms._NET_WM_PID,
            AtomEnum::CARDINAL,
            &[pid],
        ));
    }
}

impl Backend for X11Backend {
    fn open(config: &SessionConfig) -> Result<X11Backend, ShellError> {
        let display = Display::connect()?;
        let mut backend = X11Backend {
            display: Some(display),
            window: None,
            colormap: None,
            context: None,
        };
        if let Err(e) = backend.build(config) {
            backend.release_all();
            return Err(e);
        }
        Ok(backend)
    }

    fn poll_event(&mut self) -> Result<Option<NativeEvent>, ShellError> {
        let display = self.display()?;
        let window = match self.window {
            Some(window) => window,
            None => return Ok(None),
        };
        while let Some(event) = display.poll_event()? {
            match event {
                Event::ConfigureNotify(ev) if ev.window == window => {
                    let size = Size::new(ev.width.into(), ev.height.into());
                    return Ok(Some(NativeEvent::Resized(size)));
                }
                Event::ButtonPress(ev) if ev.event == window => {
                    return Ok(Some(NativeEvent::ButtonPress { button: ev.detail }));
                }
                _ => {}
            }
        }
        Ok(None)
    }

    fn swap_buffers(&mut self) -> Result<(), ShellError> {
        let window = self.window.ok_or(ShellError::SessionClosed)?;
        let display = self.display()?;
        unsafe { (display.glx().glXSwapBuffers)(display.raw(), window.into()) };
        display.connection().flush()?;
        Ok(())
    }

    fn enter_fullscreen(&mut self) {
        debug!("X11Backend::enter_fullscreen is currently a no-op");
    }

    fn exit_fullscreen(&mut self) {
        debug!("X11Backend::exit_fullscreen is currently a no-op");
    }

    fn release(&mut self, resource: Resource) {
        match resource {
            Resource::Context => {
                if let (Some(context), Some(display)) = (self.context.take(), &self.display) {
                    let glx = display.glx();
                    unsafe {
                        (glx.glXMakeCurrent)(display.raw(), 0, ptr::null_mut());
                        (glx.glXDestroyContext)(display.raw(), context);
                    }
                    display.sync();
                }
            }
            Resource::Window => {
                if let (Some(window), Some(display)) = (self.window.take(), &self.display) {
                    log_x11!(display.connection().destroy_window(window));
                }
            }
            Resource::Colormap => {
                if let (Some(colormap), Some(display)) = (self.colormap.take(), &self.display) {
                    log_x11!(display.connection().free_colormap(colormap));
                }
            }
            Resource::Connection => {
                if let Some(display) = self.display.take() {
                    log_x11!(display.connection().flush());
                }
            }
        }
        debug!("Released {:?}", resource);
    }
}
