// Copyright 2026 the Druid Authors
// SPDX-License-Identifier: Apache-2.0

//! X11 errors, and the scoped trap used to catch asynchronous ones.

use std::cell::RefCell;
use std::fmt;
use std::os::raw::c_int;
use std::rc::Rc;
use std::sync::Arc;

use x11_dl::xlib;
use x11rb::errors::{ConnectionError, ReplyError, ReplyOrIdError};
use x11rb::x11_utils::X11Error;

#[derive(Debug, Clone)]
pub enum Error {
    XError(Arc<ReplyError>),
    IdsExhausted,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        match self {
            Error::XError(e) => fmt::Display::fmt(e, f),
            Error::IdsExhausted => write!(f, "X11 resource ids exhausted"),
        }
    }
}

impl std::error::Error for Error {}

impl From<X11Error> for Error {
    fn from(err: X11Error) -> Error {
        Error::XError(Arc::new(ReplyError::X11Error(err)))
    }
}

impl From<ReplyError> for Error {
    fn from(err: ReplyError) -> Error {
        Error::XError(Arc::new(err))
    }
}

impl From<ConnectionError> for Error {
    fn from(err: ConnectionError) -> Error {
        Error::XError(Arc::new(ReplyError::ConnectionError(err)))
    }
}

impl From<ReplyOrIdError> for Error {
    fn from(err: ReplyOrIdError) -> Error {
        match err {
            ReplyOrIdError::IdsExhausted => Error::IdsExhausted,
            ReplyOrIdError::ConnectionError(e) => e.into(),
            ReplyOrIdError::X11Error(e) => e.into(),
        }
    }
}

/// An error reported to Xlib's error handler, for requests sent through Xlib and GLX.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XlibError {
    pub error_code: u8,
    pub request_code: u8,
    pub minor_code: u8,
    pub resource_id: u64,
}

impl fmt::Display for XlibError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "X11 error {} on request {}.{} for resource {:#x}",
            self.error_code, self.request_code, self.minor_code, self.resource_id
        )
    }
}

impl From<&xlib::XErrorEvent> for XlibError {
    fn from(event: &xlib::XErrorEvent) -> XlibError {
        XlibError {
            error_code: event.error_code,
            request_code: event.request_code,
            minor_code: event.minor_code,
            resource_id: event.resourceid as u64,
        }
    }
}

thread_local! {
    static XLIB_ERRORS: ErrorSlot<XlibError> = ErrorSlot::new();
}

/// The slot Xlib errors on this thread are reported to.
pub(crate) fn xlib_errors() -> ErrorSlot<XlibError> {
    XLIB_ERRORS.with(ErrorSlot::clone)
}

/// Installed with `XSetErrorHandler` for as long as a display is open.
///
/// Xlib's default handler exits the process; this one hands the error to a trap if there is
/// one, and logs it otherwise.
pub(crate) unsafe extern "C" fn handle_xlib_error(
    _display: *mut xlib::Display,
    event: *mut xlib::XErrorEvent,
) -> c_int {
    if let Some(event) = event.as_ref() {
        let err = XlibError::from(event);
        match XLIB_ERRORS.try_with(|slot| slot.capture(err)) {
            Ok(Ok(())) => {}
            Ok(Err(err)) => tracing::error!("{}", err),
            Err(_) => tracing::error!("{} during thread teardown", err),
        }
    }
    0
}

type Captured<E> = Rc<RefCell<Vec<E>>>;

/// Where asynchronous errors go while an [`ErrorTrap`] is installed.
///
/// X11 reports most request failures after the fact. Every such error is offered to a slot;
/// with no trap installed the slot hands it back and the caller logs it. Clones share the same
/// slot.
pub(crate) struct ErrorSlot<E> {
    current: Rc<RefCell<Option<Captured<E>>>>,
}

impl<E> ErrorSlot<E> {
    pub(crate) fn new() -> ErrorSlot<E> {
        ErrorSlot {
            current: Rc::new(RefCell::new(None)),
        }
    }

    /// Install a trap. The previously installed trap, if any, is restored when the returned
    /// guard is dropped.
    pub(crate) fn install(&self) -> ErrorTrap<E> {
        let captured = Rc::new(RefCell::new(Vec::new()));
        let previous = self.current.replace(Some(Rc::clone(&captured)));
        ErrorTrap {
            slot: self.clone(),
            captured,
            previous,
        }
    }

    /// Hand `err` to the installed trap, or give it back if nothing is trapping.
    pub(crate) fn capture(&self, err: E) -> Result<(), E> {
        match &*self.current.borrow() {
            Some(captured) => {
                captured.borrow_mut().push(err);
                Ok(())
            }
            None => Err(err),
        }
    }

    pub(crate) fn is_trapping(&self) -> bool {
        self.current.borrow().is_some()
    }
}

impl<E> Clone for ErrorSlot<E> {
    fn clone(&self) -> Self {
        ErrorSlot {
            current: Rc::clone(&self.current),
        }
    }
}

impl<E> fmt::Debug for ErrorSlot<E> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ErrorSlot")
            .field("trapping", &self.is_trapping())
            .finish()
    }
}

/// A scoped error handler. Errors reported while the trap is alive are collected here instead
/// of being logged.
pub(crate) struct ErrorTrap<E> {
    slot: ErrorSlot<E>,
    captured: Captured<E>,
    previous: Option<Captured<E>>,
}

impl<E> ErrorTrap<E> {
    pub(crate) fn occurred(&self) -> bool {
        !self.captured.borrow().is_empty()
    }

    /// Take the errors caught so far.
    pub(crate) fn clear(&self) -> Vec<E> {
        std::mem::take(&mut *self.captured.borrow_mut())
    }
}

impl<E> Drop for ErrorTrap<E> {
    fn drop(&mut self) {
        *self.slot.current.borrow_mut() = self.previous.take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    #[test]
    fn untrapped_errors_are_handed_back() {
        let slot = ErrorSlot::new();
        assert_eq!(slot.capture(3u8), Err(3));
        assert!(!slot.is_trapping());
    }

    #[test]
    fn trap_collects_until_dropped() {
        let slot = ErrorSlot::new();
        {
            let trap = slot.install();
            assert!(!trap.occurred());
            assert_eq!(slot.capture(8u8), Ok(()));
            assert!(trap.occurred());
            assert_eq!(trap.clear(), vec![8]);
            assert!(!trap.occurred());
        }
        assert!(!slot.is_trapping());
        assert_eq!(slot.capture(9), Err(9));
    }

    #[test]
    fn nested_trap_restores_outer() {
        let slot = ErrorSlot::new();
        let outer = slot.install();
        {
            let inner = slot.install();
            slot.capture(1u8).unwrap();
            assert!(inner.occurred());
        }
        assert!(!outer.occurred());
        slot.capture(2).unwrap();
        assert_eq!(outer.clear(), vec![2]);
    }

    #[test]
    fn trap_is_restored_on_early_return() {
        fn fails(slot: &ErrorSlot<u8>) -> Result<(), String> {
            let _trap = slot.install();
            slot.capture(10).unwrap();
            let created: Result<(), String> = Err("context creation failed".into());
            created?;
            Ok(())
        }

        let slot = ErrorSlot::new();
        assert!(fails(&slot).is_err());
        assert!(!slot.is_trapping());
    }

    #[test]
    fn clones_share_the_trap() {
        let slot = ErrorSlot::new();
        let handle = slot.clone();
        let trap = slot.install();
        assert!(handle.is_trapping());
        handle.capture(4u8).unwrap();
        assert_eq!(trap.clear(), vec![4]);
        drop(trap);
        assert!(!handle.is_trapping());
    }

    fn bad_match() -> xlib::XErrorEvent {
        xlib::XErrorEvent {
            type_: 0,
            display: std::ptr::null_mut(),
            resourceid: 0x40_0002,
            serial: 17,
            error_code: 8,
            request_code: 152,
            minor_code: 34,
        }
    }

    #[test]
    fn xlib_errors_reach_the_thread_trap() {
        let errors = xlib_errors();
        {
            let trap = errors.install();
            let mut event = bad_match();
            unsafe { handle_xlib_error(std::ptr::null_mut(), &mut event) };
            let caught = trap.clear();
            assert_eq!(caught.len(), 1);
            assert_eq!(caught[0].request_code, 152);
            assert_eq!(caught[0].minor_code, 34);
            assert_eq!(
                caught[0].to_string(),
                "X11 error 8 on request 152.34 for resource 0x400002"
            );
        }
        assert!(!xlib_errors().is_trapping());

        // without a trap the error is only logged
        let mut event = bad_match();
        assert_eq!(unsafe { handle_xlib_error(std::ptr::null_mut(), &mut event) }, 0);
    }
}
