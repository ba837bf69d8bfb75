// Copyright 2026 the Druid Authors
// SPDX-License-Identifier: Apache-2.0

//! Framebuffer configuration negotiation.
//!
//! GLX describes each framebuffer configuration through `(attribute, value)` pairs. We decode
//! those into [`FbConfigInfo`], keep the ones that satisfy the requested [`FramebufferConfig`],
//! rank them the way `glXChooseFBConfig` does, and then pick the one with the most samples per
//! pixel.

use std::cmp::Reverse;

/// GLX attribute tokens, as they appear in a `GetFBConfigs` reply.
pub(crate) mod attrib {
    pub const BUFFER_SIZE: u32 = 2;
    pub const DOUBLEBUFFER: u32 = 5;
    pub const RED_SIZE: u32 = 8;
    pub const GREEN_SIZE: u32 = 9;
    pub const BLUE_SIZE: u32 = 10;
    pub const ALPHA_SIZE: u32 = 11;
    pub const DEPTH_SIZE: u32 = 12;
    pub const STENCIL_SIZE: u32 = 13;
    pub const CONFIG_CAVEAT: u32 = 0x20;
    pub const X_VISUAL_TYPE: u32 = 0x22;
    pub const VISUAL_ID: u32 = 0x800b;
    pub const DRAWABLE_TYPE: u32 = 0x8010;
    pub const RENDER_TYPE: u32 = 0x8011;
    pub const X_RENDERABLE: u32 = 0x8012;
    pub const FBCONFIG_ID: u32 = 0x8013;
    pub const SAMPLE_BUFFERS: u32 = 100_000;
    pub const SAMPLES: u32 = 100_001;

    pub const NONE: u32 = 0x8000;
    pub const SLOW_CONFIG: u32 = 0x8001;
    pub const TRUE_COLOR: u32 = 0x8002;
    pub const NON_CONFORMANT_CONFIG: u32 = 0x800d;
    pub const WINDOW_BIT: u32 = 0x1;
    pub const RGBA_BIT: u32 = 0x1;

    /// Everything [`FbConfigInfo`](super::FbConfigInfo) records.
    pub const QUERIED: [u32; 17] = [
        FBCONFIG_ID,
        VISUAL_ID,
        X_RENDERABLE,
        DRAWABLE_TYPE,
        RENDER_TYPE,
        X_VISUAL_TYPE,
        CONFIG_CAVEAT,
        BUFFER_SIZE,
        RED_SIZE,
        GREEN_SIZE,
        BLUE_SIZE,
        ALPHA_SIZE,
        DEPTH_SIZE,
        STENCIL_SIZE,
        DOUBLEBUFFER,
        SAMPLE_BUFFERS,
        SAMPLES,
    ];
}

/// Selection criteria for the framebuffer configuration.
///
/// Bit sizes are minimums. Only configurations that can back an X window with a TrueColor
/// visual and RGBA rendering are ever considered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FramebufferConfig {
    /// Minimum bits in the red channel.
    pub red_size: u32,
    /// Minimum bits in the green channel.
    pub green_size: u32,
    /// Minimum bits in the blue channel.
    pub blue_size: u32,
    /// Minimum bits in the alpha channel.
    pub alpha_size: u32,
    /// Minimum depth buffer bits.
    pub depth_size: u32,
    /// Minimum stencil buffer bits.
    pub stencil_size: u32,
    /// Whether the configuration must be double buffered.
    pub double_buffer: bool,
}

impl Default for FramebufferConfig {
    fn default() -> Self {
        FramebufferConfig {
            red_size: 8,
            green_size: 8,
            blue_size: 8,
            alpha_size: 8,
            depth_size: 24,
            stencil_size: 8,
            double_buffer: true,
        }
    }
}

impl FramebufferConfig {
    /// Whether `candidate` satisfies these criteria.
    pub fn matches(&self, candidate: &FbConfigInfo) -> bool {
        candidate.x_renderable
            && candidate.drawable_type & attrib::WINDOW_BIT != 0
            && candidate.render_type & attrib::RGBA_BIT != 0
            && candidate.x_visual_type == attrib::TRUE_COLOR
            && candidate.red_size >= self.red_size
            && candidate.green_size >= self.green_size
            && candidate.blue_size >= self.blue_size
            && candidate.alpha_size >= self.alpha_size
            && candidate.depth_size >= self.depth_size
            && candidate.stencil_size >= self.stencil_size
            && candidate.double_buffer == self.double_buffer
    }

    /// The criteria as a zero-terminated `glXChooseFBConfig` attribute list.
    pub fn to_attrib_list(&self) -> Vec<u32> {
        vec![
            attrib::X_RENDERABLE,
            1,
            attrib::DRAWABLE_TYPE,
            attrib::WINDOW_BIT,
            attrib::RENDER_TYPE,
            attrib::RGBA_BIT,
            attrib::X_VISUAL_TYPE,
            attrib::TRUE_COLOR,
            attrib::RED_SIZE,
            self.red_size,
            attrib::GREEN_SIZE,
            self.green_size,
            attrib::BLUE_SIZE,
            self.blue_size,
            attrib::ALPHA_SIZE,
            self.alpha_size,
            attrib::DEPTH_SIZE,
            self.depth_size,
            attrib::STENCIL_SIZE,
            self.stencil_size,
            attrib::DOUBLEBUFFER,
            self.double_buffer as u32,
            0,
        ]
    }
}

/// One framebuffer configuration offered by the server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FbConfigInfo {
    /// The server's id for this configuration.
    pub fbconfig_id: u32,
    /// The X visual backing it, `0` if it has none.
    pub visual_id: u32,
    /// Whether it can render to X drawables.
    pub x_renderable: bool,
    /// Mask of drawable kinds it supports.
    pub drawable_type: u32,
    /// Mask of render types it supports.
    pub render_type: u32,
    /// Class of the associated X visual.
    pub x_visual_type: u32,
    /// `GLX_NONE`, `GLX_SLOW_CONFIG` or `GLX_NON_CONFORMANT_CONFIG`. `0` if not reported.
    pub config_caveat: u32,
    /// Total bits per pixel of the color buffer.
    pub buffer_size: u32,
    /// Red channel bits.
    pub red_size: u32,
    /// Green channel bits.
    pub green_size: u32,
    /// Blue channel bits.
    pub blue_size: u32,
    /// Alpha channel bits.
    pub alpha_size: u32,
    /// Depth buffer bits.
    pub depth_size: u32,
    /// Stencil buffer bits.
    pub stencil_size: u32,
    /// Whether it has a back buffer.
    pub double_buffer: bool,
    /// Number of multisample buffers.
    pub sample_buffers: u32,
    /// Samples per pixel.
    pub samples: u32,
}

impl FbConfigInfo {
    /// Decode one configuration from its `(attribute, value)` pairs.
    ///
    /// Unknown attributes are ignored; missing ones keep their default.
    pub fn from_properties(properties: &[u32]) -> FbConfigInfo {
        let mut info = FbConfigInfo::default();
        for pair in properties.chunks_exact(2) {
            let value = pair[1];
            match pair[0] {
                attrib::FBCONFIG_ID => info.fbconfig_id = value,
                attrib::VISUAL_ID => info.visual_id = value,
                attrib::X_RENDERABLE => info.x_renderable = value != 0,
                attrib::DRAWABLE_TYPE => info.drawable_type = value,
                attrib::RENDER_TYPE => info.render_type = value,
                attrib::X_VISUAL_TYPE => info.x_visual_type = value,
                attrib::CONFIG_CAVEAT => info.config_caveat = value,
                attrib::BUFFER_SIZE => info.buffer_size = value,
                attrib::RED_SIZE => info.red_size = value,
                attrib::GREEN_SIZE => info.green_size = value,
                attrib::BLUE_SIZE => info.blue_size = value,
                attrib::ALPHA_SIZE => info.alpha_size = value,
                attrib::DEPTH_SIZE => info.depth_size = value,
                attrib::STENCIL_SIZE => info.stencil_size = value,
                attrib::DOUBLEBUFFER => info.double_buffer = value != 0,
                attrib::SAMPLE_BUFFERS => info.sample_buffers = value,
                attrib::SAMPLES => info.samples = value,
                _ => {}
            }
        }
        info
    }

    /// Samples per pixel, counting only configurations with multisampling enabled.
    pub fn multisample_count(&self) -> u32 {
        if self.sample_buffers > 0 {
            self.samples
        } else {
            0
        }
    }

    fn caveat_rank(&self) -> u8 {
        match self.config_caveat {
            attrib::SLOW_CONFIG => 1,
            attrib::NON_CONFORMANT_CONFIG => 2,
            _ => 0,
        }
    }

    /// Sort key following `glXChooseFBConfig`: configurations without a caveat first, then
    /// more color bits, then a smaller buffer, fewer samples, more depth and less stencil.
    fn preference(&self) -> impl Ord {
        (
            self.caveat_rank(),
            Reverse(self.red_size + self.green_size + self.blue_size + self.alpha_size),
            self.buffer_size,
            self.sample_buffers,
            self.samples,
            Reverse(self.depth_size),
            self.stencil_size,
        )
    }
}

/// Pick the candidate with the highest enabled multisample count.
///
/// Ties go to the earliest candidate, and when nothing is multisampled the first candidate wins.
/// Returns `None` only for an empty slice.
pub fn select_best(candidates: &[FbConfigInfo]) -> Option<usize> {
    let mut best: Option<(usize, u32)> = None;
    for (index, candidate) in candidates.iter().enumerate() {
        let samples = candidate.multisample_count();
        match best {
            Some((_, best_samples)) if samples <= best_samples => {}
            _ => best = Some((index, samples)),
        }
    }
    best.map(|(index, _)| index)
}

/// Rank `candidates` by preference and pick the best one with [`select_best`].
///
/// Returns an index into `candidates`, or `None` if it is empty.
pub fn choose(candidates: &[FbConfigInfo]) -> Option<usize> {
    let mut order: Vec<usize> = (0..candidates.len()).collect();
    // stable, so equally ranked candidates keep their order
    order.sort_by_key(|&index| candidates[index].preference());
    let ranked: Vec<FbConfigInfo> = order.iter().map(|&index| candidates[index]).collect();
    select_best(&ranked).map(|best| order[best])
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    fn candidate(sample_buffers: u32, samples: u32) -> FbConfigInfo {
        FbConfigInfo {
            sample_buffers,
            samples,
            ..FbConfigInfo::default()
        }
    }

    fn suitable() -> FbConfigInfo {
        FbConfigInfo {
            fbconfig_id: 0x71,
            visual_id: 0x21,
            x_renderable: true,
            drawable_type: attrib::WINDOW_BIT | 0x6,
            render_type: attrib::RGBA_BIT,
            x_visual_type: attrib::TRUE_COLOR,
            config_caveat: attrib::NONE,
            buffer_size: 32,
            red_size: 8,
            green_size: 8,
            blue_size: 8,
            alpha_size: 8,
            depth_size: 24,
            stencil_size: 8,
            double_buffer: true,
            sample_buffers: 0,
            samples: 0,
        }
    }

    #[test]
    fn highest_sample_count_wins() {
        let candidates = [candidate(0, 0), candidate(1, 4), candidate(1, 8), candidate(1, 2)];
        assert_eq!(select_best(&candidates), Some(2));
    }

    #[test]
    fn ties_favor_the_first() {
        let candidates = [candidate(1, 4), candidate(1, 8), candidate(1, 8)];
        assert_eq!(select_best(&candidates), Some(1));
    }

    #[test]
    fn without_multisampling_the_first_is_chosen() {
        let candidates = [candidate(0, 0), candidate(0, 0), candidate(0, 0)];
        assert_eq!(select_best(&candidates), Some(0));
        assert_eq!(select_best(&[]), None);
    }

    #[test]
    fn samples_without_sample_buffers_do_not_count() {
        let candidates = [candidate(0, 16), candidate(1, 2)];
        assert_eq!(select_best(&candidates), Some(1));
    }

    #[test]
    fn selection_is_deterministic_for_an_ordering() {
        let candidates: Vec<_> = (0..12).map(|i| candidate(i % 2, (i * 7) % 5)).collect();
        let first = select_best(&candidates);
        for _ in 0..4 {
            assert_eq!(select_best(&candidates), first);
        }
    }

    #[test]
    fn default_criteria() {
        let criteria = FramebufferConfig::default();
        assert!(criteria.matches(&suitable()));

        let shallow = FbConfigInfo {
            depth_size: 16,
            ..suitable()
        };
        assert!(!criteria.matches(&shallow));

        let single = FbConfigInfo {
            double_buffer: false,
            ..suitable()
        };
        assert!(!criteria.matches(&single));

        let pixmap_only = FbConfigInfo {
            drawable_type: 0x2,
            ..suitable()
        };
        assert!(!criteria.matches(&pixmap_only));

        let direct_color = FbConfigInfo {
            x_visual_type: 0x8003,
            ..suitable()
        };
        assert!(!criteria.matches(&direct_color));

        let deeper = FbConfigInfo {
            red_size: 10,
            green_size: 10,
            blue_size: 10,
            depth_size: 32,
            ..suitable()
        };
        assert!(criteria.matches(&deeper));
    }

    #[test]
    fn decode_properties() {
        #[rustfmt::skip]
        let pairs = [
            attrib::FBCONFIG_ID, 0x72,
            attrib::VISUAL_ID, 0x22,
            attrib::CONFIG_CAVEAT, attrib::SLOW_CONFIG,
            attrib::BUFFER_SIZE, 32,
            attrib::SAMPLE_BUFFERS, 1,
            attrib::SAMPLES, 4,
            // unknown attribute
            0x20_0000, 99,
        ];
        let info = FbConfigInfo::from_properties(&pairs);
        assert_eq!(info.fbconfig_id, 0x72);
        assert_eq!(info.visual_id, 0x22);
        assert_eq!(info.config_caveat, attrib::SLOW_CONFIG);
        assert_eq!(info.buffer_size, 32);
        assert_eq!(info.multisample_count(), 4);
        assert!(!info.double_buffer);
    }

    #[test]
    fn attrib_list_is_terminated_pairs() {
        let list = FramebufferConfig::default().to_attrib_list();
        assert_eq!(list.len() % 2, 1);
        assert_eq!(list.last(), Some(&0));
        let pairs: Vec<_> = list.chunks_exact(2).map(|p| (p[0], p[1])).collect();
        assert!(pairs.contains(&(attrib::DOUBLEBUFFER, 1)));
        assert!(pairs.contains(&(attrib::DEPTH_SIZE, 24)));
        assert!(pairs.contains(&(attrib::X_VISUAL_TYPE, attrib::TRUE_COLOR)));

        let single = FramebufferConfig {
            double_buffer: false,
            ..FramebufferConfig::default()
        };
        assert!(single
            .to_attrib_list()
            .chunks_exact(2)
            .any(|p| p[0] == attrib::DOUBLEBUFFER && p[1] == 0));
    }

    fn with_caveat(fbconfig_id: u32, config_caveat: u32) -> FbConfigInfo {
        FbConfigInfo {
            fbconfig_id,
            config_caveat,
            ..suitable()
        }
    }

    #[test]
    fn slow_configs_rank_last() {
        let candidates = [
            with_caveat(1, attrib::SLOW_CONFIG),
            with_caveat(2, attrib::NONE),
        ];
        let best = choose(&candidates).unwrap();
        assert_eq!(candidates[best].fbconfig_id, 2);

        let candidates = [
            with_caveat(1, attrib::NON_CONFORMANT_CONFIG),
            with_caveat(2, attrib::SLOW_CONFIG),
            with_caveat(3, 0),
        ];
        let best = choose(&candidates).unwrap();
        assert_eq!(candidates[best].fbconfig_id, 3);
    }

    #[test]
    fn smaller_buffer_ranks_first() {
        let candidates = [
            FbConfigInfo {
                fbconfig_id: 1,
                buffer_size: 32,
                ..suitable()
            },
            FbConfigInfo {
                fbconfig_id: 2,
                buffer_size: 24,
                ..suitable()
            },
        ];
        let best = choose(&candidates).unwrap();
        assert_eq!(candidates[best].fbconfig_id, 2);
    }

    #[test]
    fn multisampling_still_beats_rank() {
        let candidates = [
            with_caveat(1, attrib::NONE),
            FbConfigInfo {
                sample_buffers: 1,
                samples: 4,
                ..with_caveat(2, attrib::SLOW_CONFIG)
            },
        ];
        let best = choose(&candidates).unwrap();
        assert_eq!(candidates[best].fbconfig_id, 2);
    }

    #[test]
    fn equal_rank_keeps_order() {
        let candidates = [with_caveat(7, attrib::NONE), with_caveat(8, attrib::NONE)];
        assert_eq!(choose(&candidates), Some(0));
        assert_eq!(choose(&[]), None);
    }
}
