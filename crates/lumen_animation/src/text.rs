//! Text splitting and scramble reveals
//!
//! Splitting produces the pieces a host renders as individually animated
//! targets. [`ScrambleText`] is frame-indexed: the string shown at a given
//! frame depends only on the text, the seed and the frame number.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Non-breaking space, so split characters keep their width
pub const NBSP: char = '\u{00A0}';

const GLYPHS: &[char] = &[
    '!', '<', '>', '-', '_', '\\', '/', '[', ']', '{', '}', '—', '=', '+', '*', '^', '?',
    '#', '_', '_', '_', '_', '_', '_', '_', '_',
];

/// Frames per second the scramble is timed against
pub const SCRAMBLE_FPS: f32 = 60.0;

/// One piece per character, with spaces made non-breaking
///
/// Note: This splits on code points, not grapheme clusters. A letter with a
/// combining accent or a composite emoji becomes several pieces.
pub fn split_chars(text: &str) -> Vec<char> {
    text.chars().map(|c| if c == ' ' { NBSP } else { c }).collect()
}

/// Pieces separated by single spaces
pub fn split_words(text: &str) -> Vec<&str> {
    text.split(' ').collect()
}

/// Deterministic text scramble
#[derive(Clone, Debug)]
pub struct ScrambleText {
    text: Vec<char>,
    total_frames: u64,
    seed: u64,
}

impl ScrambleText {
    pub fn new(text: &str, duration: f32) -> Self {
        let duration = if duration.is_finite() { duration.max(0.0) } else { 0.0 };
        Self {
            text: text.chars().collect(),
            total_frames: (duration * SCRAMBLE_FPS).ceil() as u64,
            seed: 0,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }

    pub fn is_complete(&self, frame: u64) -> bool {
        frame >= self.total_frames
    }

    /// Text shown `elapsed` seconds after the scramble starts
    pub fn at(&self, elapsed: f32) -> String {
        let frame = if elapsed.is_finite() && elapsed > 0.0 {
            (elapsed * SCRAMBLE_FPS).floor() as u64
        } else {
            0
        };
        self.frame(frame)
    }

    /// Text shown at `frame`: a revealed prefix, then glyphs. Spaces stay spaces.
    pub fn frame(&self, frame: u64) -> String {
        if self.is_complete(frame) {
            return self.text.iter().collect();
        }
        let revealed = (self.text.len() as u64 * frame / self.total_frames) as usize;
        let mut rng = StdRng::seed_from_u64(self.seed.wrapping_mul(0x9E37_79B9_7F4A_7C15) ^ frame);
        self.text
            .iter()
            .enumerate()
            .map(|(i, &c)| {
                if i < revealed || c == ' ' {
                    c
                } else {
                    GLYPHS[rng.gen_range(0..GLYPHS.len())]
                }
            })
            .collect()
    }
}
