// Copyright 2026 the Druid Authors
// SPDX-License-Identifier: Apache-2.0

//! GLX negotiation: version check, framebuffer configuration, and context creation.

use std::ffi::{c_void, CStr, CString};
use std::fmt;
use std::os::raw::c_int;
use std::ptr;

use tracing::{debug, info, warn};
use x11_dl::glx::{GLXContext, GLXFBConfig};
use x11_dl::xlib;

use super::display::Display;
use super::error::{xlib_errors, ErrorSlot, ErrorTrap};
use super::util;
use crate::config::{GlVersion, SessionConfig};
use crate::error::Error as ShellError;
use crate::fbconfig::{self, attrib, FbConfigInfo, FramebufferConfig};

const GLX_RGBA_TYPE: c_int = 0x8014;
const GLX_CONTEXT_MAJOR_VERSION_ARB: u32 = 0x2091;
const GLX_CONTEXT_MINOR_VERSION_ARB: u32 = 0x2092;

type CreateContextAttribsArb = unsafe extern "C" fn(
    *mut xlib::Display,
    GLXFBConfig,
    GLXContext,
    xlib::Bool,
    *const c_int,
) -> GLXContext;

/// Make sure the server speaks GLX 1.3 or newer. Framebuffer configurations were added in 1.3.
pub(crate) fn check_version(display: &Display) -> Result<(), ShellError> {
    let (mut major, mut minor) = (0, 0);
    let supported = unsafe { (display.glx().glXQueryVersion)(display.raw(), &mut major, &mut minor) };
    if supported == 0 {
        return Err(ShellError::UnsupportedGlx { major: 0, minor: 0 });
    }
    let (major, minor) = (major.max(0) as u32, minor.max(0) as u32);
    if (major, minor) < (1, 3) {
        return Err(ShellError::UnsupportedGlx { major, minor });
    }
    info!("X server supports GLX version {}.{}", major, minor);
    Ok(())
}

/// Ask GLX for the configurations that match and pick the best one.
pub(crate) fn choose_fb_config(
    display: &Display,
    criteria: &FramebufferConfig,
) -> Result<(FbConfigInfo, GLXFBConfig), ShellError> {
    debug!("Getting matching framebuffer configs");
    let glx = display.glx();
    let attribs: Vec<c_int> = criteria
        .to_attrib_list()
        .into_iter()
        .map(|v| v as c_int)
        .collect();
    let mut count = 0;
    let list = unsafe {
        (glx.glXChooseFBConfig)(
            display.raw(),
            display.screen_num() as c_int,
            attribs.as_ptr(),
            &mut count,
        )
    };
    if list.is_null() {
        return Err(ShellError::NoCompatibleConfig);
    }
    let configs = unsafe { std::slice::from_raw_parts(list, count.max(0) as usize) }.to_vec();
    unsafe { (display.xlib().XFree)(list as *mut c_void) };

    let screen = display.screen();
    let candidates: Vec<(FbConfigInfo, GLXFBConfig)> = configs
        .into_iter()
        .map(|config| (query_attribs(display, config), config))
        .filter(|(info, _)| criteria.matches(info))
        .filter(|(info, _)| util::find_visual(screen, info.visual_id).is_some())
        .collect();
    info!("Found {} matching FB configs", candidates.len());
    for (i, (info, _)) in candidates.iter().enumerate() {
        debug!(
            "  Matching fbconfig {}, visual ID {:#x}: SAMPLE_BUFFERS = {}, SAMPLES = {}",
            i, info.visual_id, info.sample_buffers, info.samples
        );
    }

    let infos: Vec<FbConfigInfo> = candidates.iter().map(|(info, _)| *info).collect();
    let best = fbconfig::choose(&infos).ok_or(ShellError::NoCompatibleConfig)?;
    Ok(candidates[best])
}

fn query_attribs(display: &Display, config: GLXFBConfig) -> FbConfigInfo {
    let mut pairs = Vec::with_capacity(attrib::QUERIED.len() * 2);
    for attribute in attrib::QUERIED {
        let mut value = 0;
        let status = unsafe {
            (display.glx().glXGetFBConfigAttrib)(
                display.raw(),
                config,
                attribute as c_int,
                &mut value,
            )
        };
        if status == 0 {
            pairs.extend([attribute, value as u32]);
        }
    }
    FbConfigInfo::from_properties(&pairs)
}

fn server_extensions(display: &Display) -> String {
    let list = unsafe {
        (display.glx().glXQueryExtensionsString)(display.raw(), display.screen_num() as c_int)
    };
    if list.is_null() {
        return String::new();
    }
    unsafe { CStr::from_ptr(list) }
        .to_string_lossy()
        .into_owned()
}

fn version_attribs(version: GlVersion) -> [u32; 5] {
    [
        GLX_CONTEXT_MAJOR_VERSION_ARB,
        version.major,
        GLX_CONTEXT_MINOR_VERSION_ARB,
        version.minor,
        0,
    ]
}

/// The context creation requests, one attempt at a time.
///
/// A request that fails may report it by returning `None`, by raising an X11 error, or both;
/// errors only show up after [`sync`](ContextRequests::sync).
pub(crate) trait ContextRequests {
    type Context: Copy;

    /// An old-style context, without a version.
    fn create_legacy(&mut self) -> Option<Self::Context>;

    /// A context for `version`, through `GLX_ARB_create_context`.
    fn create_versioned(&mut self, version: GlVersion) -> Option<Self::Context>;

    /// Wait until the server has reported errors for every request sent so far.
    fn sync(&mut self);

    fn destroy(&mut self, context: Self::Context);
}

/// Create a rendering context, trapping errors for the duration.
///
/// With `arb` the preferred version is requested first, and the fallback version if the
/// server rejects it. Without it, an old-style context is created.
pub(crate) fn negotiate_context<R, E>(
    requests: &mut R,
    errors: &ErrorSlot<E>,
    arb: bool,
    preferred: GlVersion,
    fallback: GlVersion,
) -> Result<R::Context, ShellError>
where
    R: ContextRequests,
    E: fmt::Display,
{
    let trap = errors.install();
    if !arb {
        info!("glXCreateContextAttribsARB() not found ... using old-style GLX context");
        return attempt(requests, &trap, |r| r.create_legacy()).ok_or_else(|| {
            ShellError::ContextCreation("the server rejected the old-style context".into())
        });
    }

    debug!("Creating GL {} context", preferred);
    if let Some(context) = attempt(requests, &trap, |r| r.create_versioned(preferred)) {
        info!("Created GL {} context", preferred);
        return Ok(context);
    }
    warn!(
        "Failed to create GL {} context ... using GL {} context",
        preferred, fallback
    );
    attempt(requests, &trap, |r| r.create_versioned(fallback)).ok_or_else(|| {
        ShellError::ContextCreation(format!(
            "the server rejected both GL {} and GL {}",
            preferred, fallback
        ))
    })
}

fn attempt<R, E>(
    requests: &mut R,
    trap: &ErrorTrap<E>,
    create: impl FnOnce(&mut R) -> Option<R::Context>,
) -> Option<R::Context>
where
    R: ContextRequests,
    E: fmt::Display,
{
    let context = create(requests);
    requests.sync();
    let errors = trap.clear();
    for err in &errors {
        debug!("context request failed: {}", err);
    }
    match context {
        Some(context) if errors.is_empty() => Some(context),
        Some(context) => {
            requests.destroy(context);
            None
        }
        None => None,
    }
}

struct NativeRequests<'a> {
    display: &'a Display,
    fbconfig: GLXFBConfig,
    create_attribs: Option<CreateContextAttribsArb>,
}

impl ContextRequests for NativeRequests<'_> {
    type Context = GLXContext;

    fn create_legacy(&mut self) -> Option<GLXContext> {
        let context = unsafe {
            (self.display.glx().glXCreateNewContext)(
                self.display.raw(),
                self.fbconfig,
                GLX_RGBA_TYPE,
                ptr::null_mut(),
                xlib::True,
            )
        };
        (!context.is_null()).then_some(context)
    }

    fn create_versioned(&mut self, version: GlVersion) -> Option<GLXContext> {
        let create = self.create_attribs?;
        let attribs = version_attribs(version).map(|v| v as c_int);
        let context = unsafe {
            create(
                self.display.raw(),
                self.fbconfig,
                ptr::null_mut(),
                xlib::True,
                attribs.as_ptr(),
            )
        };
        (!context.is_null()).then_some(context)
    }

    fn sync(&mut self) {
        self.display.sync();
    }

    fn destroy(&mut self, context: GLXContext) {
        unsafe { (self.display.glx().glXDestroyContext)(self.display.raw(), context) };
    }
}

/// Look up a GL or GLX function. Null if it is unknown.
pub(crate) fn get_proc_address(display: &Display, name: &str) -> *const c_void {
    let name = match CString::new(name) {
        Ok(name) => name,
        Err(_) => return ptr::null(),
    };
    match unsafe { (display.glx().glXGetProcAddress)(name.as_ptr() as *const u8) } {
        Some(function) => function as *const c_void,
        None => ptr::null(),
    }
}

fn load_create_context_attribs(display: &Display) -> Option<CreateContextAttribsArb> {
    let function = get_proc_address(display, "glXCreateContextAttribsARB");
    if function.is_null() {
        return None;
    }
    Some(unsafe { std::mem::transmute::<*const c_void, CreateContextAttribsArb>(function) })
}

/// Create a rendering context for `fbconfig`.
pub(crate) fn create_context(
    display: &Display,
    fbconfig: GLXFBConfig,
    config: &SessionConfig,
) -> Result<GLXContext, ShellError> {
    let create_attribs = if config.arb_create_context()
        && util::extension_supported(&server_extensions(display), "GLX_ARB_create_context")
    {
        load_create_context_attribs(display)
    } else {
        None
    };
    let mut requests = NativeRequests {
        display,
        fbconfig,
        create_attribs,
    };
    negotiate_context(
        &mut requests,
        &xlib_errors(),
        create_attribs.is_some(),
        config.gl_version(),
        config.fallback_version(),
    )
}

/// Log whether `context` renders directly or through the X server.
pub(crate) fn report_direct(display: &Display, context: GLXContext) {
    if unsafe { (display.glx().glXIsDirect)(display.raw(), context) } != 0 {
        info!("Direct GLX rendering context obtained");
    } else {
        info!("Indirect GLX rendering context obtained");
    }
}

/// Make `context` current on `drawable` for the calling thread.
pub(crate) fn make_current(
    display: &Display,
    drawable: xlib::XID,
    context: GLXContext,
) -> Result<(), ShellError> {
    debug!("Making context current");
    let made = unsafe { (display.glx().glXMakeCurrent)(display.raw(), drawable, context) };
    display.sync();
    if made == 0 {
        return Err(ShellError::ContextCreation(
            "the context could not be made current".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Request {
        Legacy,
        Versioned(GlVersion),
        Destroy(u32),
    }

    /// What the server does with a request.
    #[derive(Debug, Clone, Copy)]
    enum Answer {
        Accept,
        /// No context, and an error.
        Reject,
        /// A context, but an error as well.
        RejectLate,
    }

    struct ScriptedRequests {
        errors: ErrorSlot<String>,
        answers: Vec<Answer>,
        sent: Vec<Request>,
        next_id: u32,
    }

    impl ScriptedRequests {
        fn new(errors: &ErrorSlot<String>, answers: &[Answer]) -> Self {
            ScriptedRequests {
                errors: errors.clone(),
                answers: answers.to_vec(),
                sent: Vec::new(),
                next_id: 1,
            }
        }

        fn answer(&mut self, request: Request) -> Option<u32> {
            self.sent.push(request);
            let answer = self.answers.remove(0);
            if !matches!(answer, Answer::Accept) {
                // what the Xlib error handler does
                if let Err(err) = self.errors.capture(format!("BadMatch for {:?}", request)) {
                    panic!("error outside a trap: {}", err);
                }
            }
            let id = self.next_id;
            self.next_id += 1;
            match answer {
                Answer::Accept | Answer::RejectLate => Some(id),
                Answer::Reject => None,
            }
        }
    }

    impl ContextRequests for ScriptedRequests {
        type Context = u32;

        fn create_legacy(&mut self) -> Option<u32> {
            self.answer(Request::Legacy)
        }

        fn create_versioned(&mut self, version: GlVersion) -> Option<u32> {
            self.answer(Request::Versioned(version))
        }

        fn sync(&mut self) {}

        fn destroy(&mut self, context: u32) {
            self.sent.push(Request::Destroy(context));
        }
    }

    const PREFERRED: GlVersion = GlVersion::new(3, 0);
    const FALLBACK: GlVersion = GlVersion::new(1, 0);

    fn negotiate(
        arb: bool,
        answers: &[Answer],
    ) -> (Result<u32, ShellError>, Vec<Request>, ErrorSlot<String>) {
        let errors = ErrorSlot::new();
        let mut requests = ScriptedRequests::new(&errors, answers);
        let result = negotiate_context(&mut requests, &errors, arb, PREFERRED, FALLBACK);
        (result, requests.sent, errors)
    }

    #[test]
    fn preferred_version_accepted() {
        let (result, sent, errors) = negotiate(true, &[Answer::Accept]);
        assert_eq!(result.unwrap(), 1);
        assert_eq!(sent, vec![Request::Versioned(PREFERRED)]);
        assert!(!errors.is_trapping());
    }

    #[test]
    fn falls_back_when_preferred_is_rejected() {
        let (result, sent, errors) = negotiate(true, &[Answer::Reject, Answer::Accept]);
        assert_eq!(result.unwrap(), 2);
        assert_eq!(
            sent,
            vec![Request::Versioned(PREFERRED), Request::Versioned(FALLBACK)]
        );
        assert!(!errors.is_trapping());
    }

    #[test]
    fn context_raising_an_error_is_destroyed() {
        let (result, sent, errors) = negotiate(true, &[Answer::RejectLate, Answer::Accept]);
        assert_eq!(result.unwrap(), 2);
        assert_eq!(
            sent,
            vec![
                Request::Versioned(PREFERRED),
                Request::Destroy(1),
                Request::Versioned(FALLBACK),
            ]
        );
        assert!(!errors.is_trapping());
    }

    #[test]
    fn both_versions_rejected() {
        let (result, sent, errors) = negotiate(true, &[Answer::Reject, Answer::Reject]);
        assert!(matches!(result, Err(ShellError::ContextCreation(_))));
        assert_eq!(sent.len(), 2);
        assert!(!errors.is_trapping());
    }

    #[test]
    fn legacy_context_without_arb() {
        let (result, sent, errors) = negotiate(false, &[Answer::Accept]);
        assert_eq!(result.unwrap(), 1);
        assert_eq!(sent, vec![Request::Legacy]);
        assert!(!errors.is_trapping());

        let (result, sent, errors) = negotiate(false, &[Answer::Reject]);
        assert!(matches!(result, Err(ShellError::ContextCreation(_))));
        assert_eq!(sent, vec![Request::Legacy]);
        assert!(!errors.is_trapping());
    }

    #[test]
    fn disabling_arb_from_the_environment_takes_the_legacy_path() {
        let mut config = SessionConfig::new("", 10, 10);
        config.apply_overrides(|key| {
            (key == "GLX_SHELL_DISABLE_ARB_CREATE_CONTEXT").then(|| "1".to_string())
        });
        let (result, sent, _) = negotiate(config.arb_create_context(), &[Answer::Accept]);
        assert!(result.is_ok());
        assert_eq!(sent, vec![Request::Legacy]);
    }

    #[test]
    fn outer_trap_is_restored() {
        let errors = ErrorSlot::new();
        let outer = errors.install();
        let mut requests = ScriptedRequests::new(&errors, &[Answer::Reject, Answer::Accept]);
        negotiate_context(&mut requests, &errors, true, PREFERRED, FALLBACK).unwrap();
        assert!(errors.is_trapping());
        assert!(!outer.occurred());
    }

    #[test]
    fn attribs_carry_the_version() {
        assert_eq!(
            version_attribs(GlVersion::new(3, 2)),
            [GLX_CONTEXT_MAJOR_VERSION_ARB, 3, GLX_CONTEXT_MINOR_VERSION_ARB, 2, 0]
        );
    }
}
