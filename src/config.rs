// Copyright 2026 the Druid Authors
// SPDX-License-Identifier: Apache-2.0

//! Session configuration.
//!
//! A [`SessionConfig`] is built by the application. A couple of environment variables can
//! override it when the session is opened:
//!
//! - `GLX_SHELL_GL_VERSION=<major>.<minor>` replaces the preferred context version.
//! - `GLX_SHELL_DISABLE_ARB_CREATE_CONTEXT` (set to anything) always uses the legacy
//!   context creation request.

use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, Context, Error};
use tracing::{info, warn};

use crate::fbconfig::FramebufferConfig;
use crate::window::Size;

const GL_VERSION_VAR: &str = "GLX_SHELL_GL_VERSION";
const DISABLE_ARB_VAR: &str = "GLX_SHELL_DISABLE_ARB_CREATE_CONTEXT";

/// An OpenGL context version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GlVersion {
    /// Major version.
    pub major: u32,
    /// Minor version.
    pub minor: u32,
}

impl GlVersion {
    /// The version asked for first.
    pub const PREFERRED: GlVersion = GlVersion::new(3, 0);
    /// Asking for anything below 3.0 gets the newest context compatible with the
    /// pre-3.0 API, which is what we fall back to.
    pub const LEGACY: GlVersion = GlVersion::new(1, 0);

    /// Create a new `GlVersion`.
    pub const fn new(major: u32, minor: u32) -> GlVersion {
        GlVersion { major, minor }
    }
}

impl fmt::Display for GlVersion {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for GlVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<GlVersion, Error> {
        let (major, minor) = s
            .trim()
            .split_once('.')
            .ok_or_else(|| anyhow!("expected <major>.<minor>, got {:?}", s))?;
        let major = major.parse::<u32>().context("major version")?;
        let minor = minor.parse::<u32>().context("minor version")?;
        Ok(GlVersion::new(major, minor))
    }
}

/// What [`WindowSession::open`](crate::WindowSession::open) does when it fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Print a diagnostic and exit the process with a non-zero status.
    #[default]
    Exit,
    /// Return the error to the caller.
    Return,
}

/// Everything needed to open a [`WindowSession`](crate::WindowSession).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    title: String,
    size: Size,
    gl_version: GlVersion,
    fallback_version: GlVersion,
    framebuffer: FramebufferConfig,
    failure_policy: FailurePolicy,
    arb_create_context: bool,
}

impl SessionConfig {
    /// A configuration for a `width` by `height` window with the default criteria.
    pub fn new(title: impl Into<String>, width: u32, height: u32) -> SessionConfig {
        let mut config = SessionConfig {
            title: title.into(),
            size: Size::default(),
            gl_version: GlVersion::PREFERRED,
            fallback_version: GlVersion::LEGACY,
            framebuffer: FramebufferConfig::default(),
            failure_policy: FailurePolicy::default(),
            arb_create_context: true,
        };
        config.set_size(Size::new(width, height));
        config
    }

    /// Set the window title.
    pub fn set_title<S: Into<String>>(&mut self, title: S) {
        self.title = title.into();
    }

    /// Set the window's initial size in pixels.
    ///
    /// X11 window dimensions are 16 bit and must not be zero, so each dimension is clamped to
    /// `1..=65535`. The session reports the clamped size until the server says otherwise.
    pub fn set_size(&mut self, size: Size) {
        let clamp = |v: u32| v.clamp(1, u16::MAX.into());
        self.size = Size::new(clamp(size.width), clamp(size.height));
    }

    /// The context version to ask for first.
    pub fn set_gl_version(&mut self, version: GlVersion) {
        self.gl_version = version;
    }

    /// The context version to ask for when the preferred one is rejected.
    pub fn set_fallback_version(&mut self, version: GlVersion) {
        self.fallback_version = version;
    }

    /// Set the minimum requirements for the framebuffer configuration.
    pub fn set_framebuffer(&mut self, framebuffer: FramebufferConfig) {
        self.framebuffer = framebuffer;
    }

    /// Set what [`WindowSession::open`](crate::WindowSession::open) does when it fails.
    pub fn set_failure_policy(&mut self, policy: FailurePolicy) {
        self.failure_policy = policy;
    }

    /// Whether `GLX_ARB_create_context` may be used when the server offers it.
    pub fn set_arb_create_context(&mut self, enabled: bool) {
        self.arb_create_context = enabled;
    }

    /// The window title.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// The initial window size, after clamping.
    pub fn size(&self) -> Size {
        self.size
    }

    /// The context version asked for first.
    pub fn gl_version(&self) -> GlVersion {
        self.gl_version
    }

    /// The context version asked for when the preferred one is rejected.
    pub fn fallback_version(&self) -> GlVersion {
        self.fallback_version
    }

    /// The framebuffer requirements.
    pub fn framebuffer(&self) -> &FramebufferConfig {
        &self.framebuffer
    }

    /// What happens when opening fails.
    pub fn failure_policy(&self) -> FailurePolicy {
        self.failure_policy
    }

    /// Whether `GLX_ARB_create_context` may be used.
    pub fn arb_create_context(&self) -> bool {
        self.arb_create_context
    }

    /// Apply overrides from the process environment.
    pub(crate) fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    pub(crate) fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(value) = var(GL_VERSION_VAR) {
            match value.parse::<GlVersion>() {
                Ok(version) => {
                    info!("{} requests a GL {} context", GL_VERSION_VAR, version);
                    self.gl_version = version;
                }
                Err(err) => warn!("Ignoring {}={:?}: {:#}", GL_VERSION_VAR, value, err),
            }
        }
        if var(DISABLE_ARB_VAR).is_some() {
            self.arb_create_context = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use test_log::test;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let config = SessionConfig::new("GL 3.0 Window", 640, 480);
        assert_eq!(config.title(), "GL 3.0 Window");
        assert_eq!(config.size(), Size::new(640, 480));
        assert_eq!(config.gl_version(), GlVersion::new(3, 0));
        assert_eq!(config.fallback_version(), GlVersion::new(1, 0));
        assert_eq!(config.failure_policy(), FailurePolicy::Exit);
        assert!(config.framebuffer().double_buffer);
        assert!(config.arb_create_context());
    }

    #[test]
    fn size_is_clamped_per_dimension() {
        let config = SessionConfig::new("", 0, 480);
        assert_eq!(config.size(), Size::new(1, 480));

        let mut config = SessionConfig::new("", 640, 480);
        config.set_size(Size::new(100_000, 0));
        assert_eq!(config.size(), Size::new(65_535, 1));

        config.set_size(Size::new(65_535, 65_536));
        assert_eq!(config.size(), Size::new(65_535, 65_535));
    }

    #[test]
    fn parse_version() {
        assert_eq!("3.3".parse::<GlVersion>().unwrap(), GlVersion::new(3, 3));
        assert_eq!(" 4.6 ".parse::<GlVersion>().unwrap(), GlVersion::new(4, 6));
        assert!("3".parse::<GlVersion>().is_err());
        assert!("three.zero".parse::<GlVersion>().is_err());
        assert!(GlVersion::LEGACY < GlVersion::PREFERRED);
    }

    #[test]
    fn environment_overrides() {
        let mut config = SessionConfig::new("", 10, 10);
        config.apply_overrides(env(&[
            (GL_VERSION_VAR, "4.5"),
            (DISABLE_ARB_VAR, ""),
        ]));
        assert_eq!(config.gl_version(), GlVersion::new(4, 5));
        assert!(!config.arb_create_context());
    }

    #[test]
    fn bad_override_is_ignored() {
        let mut config = SessionConfig::new("", 10, 10);
        config.set_gl_version(GlVersion::new(3, 2));
        config.apply_overrides(env(&[(GL_VERSION_VAR, "latest")]));
        assert_eq!(config.gl_version(), GlVersion::new(3, 2));
        assert!(config.arb_create_context());
    }
}
