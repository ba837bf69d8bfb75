// Copyright 2026 the Druid Authors
// SPDX-License-Identifier: Apache-2.0

//! Miscellaneous utility functions for working with X11.

use x11rb::protocol::xproto::{Screen, Visualid, Visualtype};

// Apparently you have to get the visualtype this way :|
/// Find a visual on `screen`, along with the depth it belongs to.
pub(crate) fn find_visual(screen: &Screen, visual_id: Visualid) -> Option<(u8, Visualtype)> {
    for depth in &screen.allowed_depths {
        for visual in &depth.visuals {
            if visual.visual_id == visual_id {
                return Some((depth.depth, *visual));
            }
        }
    }
    None
}

/// Check for `name` in a space separated extension list.
///
/// Only whole entries count: `GLX_ARB_create_context` is not found in a list that only has
/// `GLX_ARB_create_context_profile`.
pub(crate) fn extension_supported(list: &str, name: &str) -> bool {
    // Extension names never contain spaces.
    if name.is_empty() || name.contains(' ') {
        return false;
    }
    list.split(' ').any(|entry| entry == name)
}

macro_rules! log_x11 {
    ($val:expr) => {
        if let Err(e) = $val {
            // We probably don't want to include file/line numbers. This logging is done in
            // a context where X11 errors probably just mean that the connection to the X server
            // was lost.
            tracing::error!("X11 error: {}", e);
        }
    };
}
