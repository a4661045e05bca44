//! Immutable per-gesture point clouds, all of one particle count.

use crate::cloud::PointCloud;
use crate::error::{MorphError, Result};
use crate::gesture::Gesture;
use std::collections::BTreeMap;
use std::sync::Arc;

/// A registered target shape. Shared, never mutated after registration.
#[derive(Debug, Clone)]
pub struct RegisteredState {
    pub positions: Arc<[f32]>,
    pub colors: Option<Arc<[f32]>>,
}

#[derive(Debug, Clone)]
pub struct StateRegistry {
    particle_count: usize,
    states: BTreeMap<Gesture, RegisteredState>,
}

impl StateRegistry {
    pub fn new(particle_count: usize) -> Self {
        Self {
            particle_count,
            states: BTreeMap::new(),
        }
    }

    /// Register (or replace) the cloud for `gesture`. Lengths must match the
    /// registry's particle count exactly; nothing is resized here.
    pub fn register(&mut self, gesture: Gesture, cloud: PointCloud) -> Result<()> {
        let expected = self.particle_count * 3;
        if cloud.positions.len() != expected {
            return Err(MorphError::LengthMismatch {
                gesture,
                expected,
                actual: cloud.positions.len(),
            });
        }
        if let Some(colors) = &cloud.colors {
            if colors.len() != cloud.positions.len() {
                return Err(MorphError::ColorMismatch {
                    positions: cloud.positions.len(),
                    colors: colors.len(),
                });
            }
        }

        self.states.insert(
            gesture,
            RegisteredState {
                positions: cloud.positions.into(),
                colors: cloud.colors.map(Into::into),
            },
        );
        Ok(())
    }

    pub fn get(&self, gesture: Gesture) -> Result<&RegisteredState> {
        self.states
            .get(&gesture)
            .ok_or(MorphError::UnknownState(gesture))
    }

    #[inline]
    pub fn contains(&self, gesture: Gesture) -> bool {
        self.states.contains_key(&gesture)
    }

    #[inline]
    pub fn particle_count(&self) -> usize {
        self.particle_count
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn gestures(&self) -> impl Iterator<Item = Gesture> + '_ {
        self.states.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_mismatched_lengths() {
        let mut reg = StateRegistry::new(2);
        reg.register(Gesture::Hero, PointCloud::new(vec![0.0; 6], None)).unwrap();

        let err = reg
            .register(Gesture::Vision, PointCloud::new(vec![0.0; 9], None))
            .unwrap_err();
        assert!(matches!(err, MorphError::LengthMismatch { actual: 9, .. }));

        let err = reg
            .register(Gesture::Vision, PointCloud::new(vec![0.0; 6], Some(vec![1.0; 3])))
            .unwrap_err();
        assert!(matches!(err, MorphError::ColorMismatch { .. }));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn unknown_gesture_lookup_fails() {
        let reg = StateRegistry::new(1);
        assert!(matches!(
            reg.get(Gesture::Globe),
            Err(MorphError::UnknownState(Gesture::Globe))
        ));
    }
}
