// Copyright 2026 the Druid Authors
// SPDX-License-Identifier: Apache-2.0

//! Opens a GL 3.0 window and presents frames until it is clicked.

#[cfg(unix)]
fn main() {
    use std::time::Duration;

    use glx_shell::{
        FailurePolicy, SessionConfig, Size, WinHandler, WindowSession, WindowState, X11Backend,
    };
    use tracing_subscriber::EnvFilter;

    #[derive(Default)]
    struct FrameCounter {
        frames: u64,
        size: Size,
    }

    impl WinHandler for FrameCounter {
        fn connect(&mut self, state: &WindowState) {
            self.size = state.size;
        }

        fn size(&mut self, size: Size) {
            self.size = size;
        }

        fn render(&mut self) {
            self.frames += 1;
        }

        fn quit(&mut self) {
            tracing::info!("{} frames at {}", self.frames, self.size);
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut config = SessionConfig::new("GL 3.0 Window", 640, 480);
    config.set_failure_policy(FailurePolicy::Return);
    let mut session = match WindowSession::<X11Backend>::open(config, Box::<FrameCounter>::default())
    {
        Ok(session) => session,
        Err(e) => {
            eprintln!("{}", e);
            return;
        }
    };
    if let Some(backend) = session.backend() {
        // what a GL loader such as the `gl` crate would be handed
        let clear = backend.get_proc_address("glClear");
        tracing::info!("glClear at {:?}, window {:?}", clear, backend.window());
    }
    while !session.quit_requested() {
        if let Err(e) = session.present_frame() {
            tracing::error!("{}", e);
            break;
        }
        std::thread::sleep(Duration::from_millis(16));
    }
}

#[cfg(not(unix))]
fn main() {
    eprintln!("This demo requires an X11 server.");
}
