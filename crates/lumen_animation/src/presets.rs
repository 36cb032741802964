//! Motion presets for the site's recurring patterns
//!
//! Entry tweens animate *from* the listed state back to the element's
//! resting state, so they compose with scroll bindings that render the
//! from-state before triggering.

use crate::config::{CursorConfig, MagneticConfig, RevealConfig, TiltConfig};
use crate::easing::Easing;
use crate::error::{AnimationError, Result};
use crate::pointer::PointerSubscription;
use crate::props::TransformProps;
use crate::scroll::{ScrollEdge, ScrollTrigger};
use crate::stagger::Stagger;
use crate::timeline::{Position, Timeline};
use crate::tween::Tween;
use lumen_core::TargetId;

/// Named easings of the design system
pub mod ease {
    use crate::easing::Easing;

    /// `power4.out`
    pub const SMOOTH: Easing = Easing::EaseOutQuint;
    /// `back.out(1.7)`
    pub const BOUNCE: Easing = Easing::BackOut(1.7);
    /// `expo.out`
    pub const EXPO: Easing = Easing::EaseOutExpo;
    /// `elastic.out(1, 0.3)`
    pub const ELASTIC: Easing = Easing::ElasticOut {
        amplitude: 1.0,
        period: 0.3,
    };
    /// `power2.inOut`
    pub const POWER2: Easing = Easing::EaseInOutCubic;
    /// `power3.out`
    pub const POWER3: Easing = Easing::EaseOutQuart;
    /// `circ.out`
    pub const CIRC: Easing = Easing::EaseOutCirc;
}

/// Pre-built tweens, timelines and subscriptions
pub struct MotionPreset;

impl MotionPreset {
    // ========================================================================
    // Entry tweens
    // ========================================================================

    /// Rise 60px while fading in
    pub fn fade_up(target: TargetId) -> Tween {
        Tween::from_props(target, TransformProps::opacity(0.0).with_y(60.0), 1.0).ease(ease::SMOOTH)
    }

    pub fn fade_in(target: TargetId) -> Tween {
        Tween::from_props(target, TransformProps::opacity(0.0), 0.8).ease(ease::SMOOTH)
    }

    /// Grow from 95% while fading in
    pub fn scale_in(target: TargetId) -> Tween {
        Tween::from_props(target, TransformProps::opacity(0.0).with_scale(0.95), 0.6)
            .ease(ease::SMOOTH)
    }

    pub fn slide_in_left(target: TargetId) -> Tween {
        Tween::from_props(target, TransformProps::opacity(0.0).with_x(-100.0), 1.0)
            .ease(ease::SMOOTH)
    }

    pub fn slide_in_right(target: TargetId) -> Tween {
        Tween::from_props(target, TransformProps::opacity(0.0).with_x(100.0), 1.0)
            .ease(ease::SMOOTH)
    }

    /// Wipe in from the top by shrinking the bottom clip inset
    pub fn clip_reveal(target: TargetId) -> Tween {
        Tween::from_to(
            target,
            TransformProps::new().with_clip_inset([0.0, 0.0, 100.0, 0.0]),
            TransformProps::new().with_clip_inset([0.0, 0.0, 0.0, 0.0]),
            1.2,
        )
        .ease(ease::EXPO)
    }

    // ========================================================================
    // Timelines
    // ========================================================================

    /// Overlay wipes away, then the page content rises in half a second
    /// before the wipe ends
    pub fn page_transition(overlay: TargetId, container: TargetId) -> Result<Timeline> {
        Timeline::builder()
            .label("page-transition")
            .add(
                Tween::from_to(
                    overlay,
                    TransformProps::new().with_scale_xy(1.0, 1.0),
                    TransformProps::new().with_scale_xy(1.0, 0.0),
                    1.0,
                )
                .ease(Easing::EaseInOutQuint),
            )
            .add_at(
                Tween::from_to(
                    container,
                    TransformProps::opacity(0.0).with_y(30.0),
                    TransformProps::opacity(1.0).with_y(0.0),
                    0.8,
                )
                .ease(ease::POWER3),
                Position::AfterPrevious(-0.5),
            )
            .build()
    }

    /// Staggered rise of split characters or words
    pub fn text_reveal(pieces: &[TargetId], config: &RevealConfig) -> Result<Timeline> {
        let Some(&first) = pieces.first() else {
            return Err(AnimationError::EmptyStagger);
        };
        let template = Tween::from_props(
            first,
            TransformProps::opacity(0.0)
                .with_y(config.y)
                .with_rotate_x(config.rotate_x),
            config.duration,
        )
        .ease(config.ease);
        Timeline::builder()
            .label("text-reveal")
            .stagger(&template, pieces, Stagger::each(config.stagger), Position::Sequence)
            .build()
    }

    /// Scroll trigger plus staggered reveal for a block of split text
    pub fn reveal_on_scroll(
        container: TargetId,
        pieces: &[TargetId],
        config: &RevealConfig,
    ) -> Result<(ScrollTrigger, Timeline)> {
        let start: ScrollEdge = config.start.parse()?;
        let timeline = Self::text_reveal(pieces, config)?;
        Ok((ScrollTrigger::once(container, start), timeline))
    }

    // ========================================================================
    // Pointer subscriptions
    // ========================================================================

    /// Small dot that tracks the pointer closely and vanishes over links
    pub fn cursor_dot(dot: TargetId, config: &CursorConfig) -> PointerSubscription {
        PointerSubscription::follow(dot, config.dot_duration)
            .ease(config.dot_ease)
            .on_hover(config.dot_hover_scale, config.hover_duration, config.dot_ease)
            .hide_on_document_leave()
    }

    /// Ring that trails the dot and grows over links
    pub fn cursor_ring(ring: TargetId, config: &CursorConfig) -> PointerSubscription {
        PointerSubscription::follow(ring, config.ring_duration)
            .ease(config.ring_ease)
            .on_hover(config.ring_hover_scale, config.hover_duration, config.ring_ease)
            .hide_on_document_leave()
    }

    /// Soft glow centered on the pointer inside a section
    pub fn cursor_glow(glow: TargetId, config: &CursorConfig) -> PointerSubscription {
        PointerSubscription::follow(glow, config.glow_duration)
            .ease(config.glow_ease)
            .with_offset(-config.glow_offset, -config.glow_offset)
    }

    /// Button pulled toward the pointer, with its content pulled half as far
    /// for depth. Both spring back on leave.
    pub fn magnetic_button(
        button: TargetId,
        content: TargetId,
        config: &MagneticConfig,
    ) -> [PointerSubscription; 2] {
        let pull = |target: TargetId, strength: f32| {
            PointerSubscription::magnetic(target, strength, config.duration)
                .ease(config.ease)
                .on_leave(config.release_duration, config.release_ease)
        };
        [
            pull(button, config.strength),
            pull(content, config.strength * config.content_factor),
        ]
    }

    /// 3D card tilt that resets when the pointer leaves the card
    pub fn card_tilt(card: TargetId, config: &TiltConfig) -> PointerSubscription {
        PointerSubscription::tilt(card, config.degrees, config.duration)
            .ease(config.ease)
            .on_leave(config.duration, config.ease)
    }
}
