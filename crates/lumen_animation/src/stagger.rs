//! Stagger expansion
//!
//! Expands one tween template over many targets, offsetting each copy's
//! delay by its rank. The rank comes from a [`StaggerOrder`]: `FromCenter`
//! ranks by distance from the median index so the middle element starts
//! first and symmetric pairs start together.

use crate::error::{AnimationError, Result};
use crate::tween::Tween;
use lumen_core::TargetId;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Order in which staggered targets start
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum StaggerOrder {
    /// First target starts first
    #[default]
    Forward,
    /// Last target starts first
    Reverse,
    /// Middle target(s) start first, spreading outward
    FromCenter,
    /// Seeded shuffle; the same seed always gives the same order
    Random { seed: u64 },
}

/// Spacing between consecutive ranks
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum StaggerSpacing {
    /// Seconds between ranks
    Each(f32),
    /// Total seconds spread across all ranks
    Amount(f32),
}

/// Stagger configuration
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Stagger {
    pub spacing: StaggerSpacing,
    pub order: StaggerOrder,
}

impl Stagger {
    /// Fixed delay between ranks
    pub fn each(seconds: f32) -> Self {
        Self {
            spacing: StaggerSpacing::Each(seconds),
            order: StaggerOrder::Forward,
        }
    }

    /// Distribute `seconds` across all ranks
    pub fn amount(seconds: f32) -> Self {
        Self {
            spacing: StaggerSpacing::Amount(seconds),
            order: StaggerOrder::Forward,
        }
    }

    pub fn from(mut self, order: StaggerOrder) -> Self {
        self.order = order;
        self
    }

    /// Start offset for each of `count` targets, in target order
    pub fn delays(&self, count: usize) -> Vec<f32> {
        let ranks = ranks(count, self.order);
        let max_rank = ranks.iter().copied().fold(0.0_f32, f32::max);
        let each = match self.spacing {
            StaggerSpacing::Each(seconds) => seconds,
            StaggerSpacing::Amount(total) if max_rank > 0.0 => total / max_rank,
            StaggerSpacing::Amount(_) => 0.0,
        };
        ranks.into_iter().map(|rank| rank * each).collect()
    }

    /// Expand `template` into one tween per target
    pub fn expand(&self, template: &Tween, targets: &[TargetId]) -> Result<Vec<Tween>> {
        if targets.is_empty() {
            return Err(AnimationError::EmptyStagger);
        }
        let spacing = match self.spacing {
            StaggerSpacing::Each(s) | StaggerSpacing::Amount(s) => s,
        };
        if !spacing.is_finite() || spacing < 0.0 {
            return Err(AnimationError::InvalidDelay(spacing));
        }
        template.validate()?;

        Ok(targets
            .iter()
            .zip(self.delays(targets.len()))
            .map(|(&target, offset)| {
                let mut tween = template.retarget(target);
                tween.delay += offset;
                tween
            })
            .collect())
    }
}

/// Expand `tween` over `targets` with `each` seconds between ranks
pub fn expand_stagger(
    tween: &Tween,
    targets: &[TargetId],
    each: f32,
    order: StaggerOrder,
) -> Result<Vec<Tween>> {
    Stagger::each(each).from(order).expand(tween, targets)
}

/// Rank of each index (rank 0 starts first)
fn ranks(count: usize, order: StaggerOrder) -> Vec<f32> {
    match order {
        StaggerOrder::Forward => (0..count).map(|i| i as f32).collect(),
        StaggerOrder::Reverse => (0..count).map(|i| (count - 1 - i) as f32).collect(),
        StaggerOrder::FromCenter => {
            let median = count.saturating_sub(1) as f32 / 2.0;
            (0..count).map(|i| (i as f32 - median).abs()).collect()
        }
        StaggerOrder::Random { seed } => {
            let mut order: Vec<usize> = (0..count).collect();
            order.shuffle(&mut StdRng::seed_from_u64(seed));
            let mut ranks = vec![0.0; count];
            for (rank, index) in order.into_iter().enumerate() {
                ranks[index] = rank as f32;
            }
            ranks
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::props::TransformProps;
    use lumen_core::{TargetStore, TransformState};

    fn targets(n: usize) -> Vec<TargetId> {
        let mut store = TargetStore::new();
        (0..n)
            .map(|i| store.insert(format!("char-{i}"), TransformState::IDENTITY))
            .collect()
    }

    #[test]
    fn test_forward_and_reverse() {
        let forward = Stagger::each(0.1).delays(4);
        let reverse = Stagger::each(0.1).from(StaggerOrder::Reverse).delays(4);
        assert!((forward[3] - 0.3).abs() < 1e-6);
        assert!((reverse[0] - 0.3).abs() < 1e-6);
        assert_eq!(reverse[3], 0.0);
    }

    #[test]
    fn test_from_center_is_symmetric() {
        let delays = Stagger::each(0.1).from(StaggerOrder::FromCenter).delays(5);
        assert_eq!(delays[2], 0.0);
        assert!((delays[1] - delays[3]).abs() < 1e-6);
        assert!((delays[0] - delays[4]).abs() < 1e-6);
        assert!((delays[0] - 0.2).abs() < 1e-6);

        // Even count: the two middle elements tie
        let even = Stagger::each(0.1).from(StaggerOrder::FromCenter).delays(4);
        assert!((even[1] - even[2]).abs() < 1e-6);
    }

    #[test]
    fn test_random_is_seeded_permutation() {
        let a = Stagger::each(1.0).from(StaggerOrder::Random { seed: 7 }).delays(8);
        let b = Stagger::each(1.0).from(StaggerOrder::Random { seed: 7 }).delays(8);
        assert_eq!(a, b);

        let mut sorted = a.clone();
        sorted.sort_by(|x, y| x.total_cmp(y));
        assert_eq!(sorted, (0..8).map(|i| i as f32).collect::<Vec<_>>());
    }

    #[test]
    fn test_amount_spreads_total() {
        let delays = Stagger::amount(2.0).delays(5);
        assert!((delays[4] - 2.0).abs() < 1e-6);
        assert_eq!(Stagger::amount(2.0).delays(1), vec![0.0]);
    }

    #[test]
    fn test_expand_adds_to_existing_delay() {
        let ids = targets(3);
        let template = Tween::from_props(ids[0], TransformProps::opacity(0.0), 0.5).delay(0.2);
        let tweens = expand_stagger(&template, &ids, 0.05, StaggerOrder::Forward).unwrap();

        assert_eq!(tweens.len(), 3);
        assert_eq!(tweens[2].target, ids[2]);
        assert!((tweens[2].delay - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_expand_empty_is_error() {
        let ids = targets(1);
        let template = Tween::to(ids[0], TransformProps::opacity(1.0), 0.5);
        assert!(matches!(
            expand_stagger(&template, &[], 0.1, StaggerOrder::Forward),
            Err(AnimationError::EmptyStagger)
        ));
    }
}
