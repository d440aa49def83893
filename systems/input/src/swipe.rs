//! Swipe gesture classification.

use glam::Vec2;
use grower_core::Direction;
use tracing::debug;

/// Thresholds that decide whether a press-release pair counts as a swipe.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SwipeSettings {
    /// Minimum travelled distance between press and release.
    pub min_distance: f32,
    /// Maximum seconds between press and release.
    pub max_duration: f32,
    /// Minimum dot product between the swipe and a cardinal axis.
    pub dot_threshold: f32,
}

impl Default for SwipeSettings {
    fn default() -> Self {
        Self {
            min_distance: 0.2,
            max_duration: 1.0,
            dot_threshold: 0.9,
        }
    }
}

/// Tracks one press at a time and classifies it on release.
#[derive(Clone, Debug, PartialEq)]
pub struct SwipeDetector {
    settings: SwipeSettings,
    start: Option<(Vec2, f32)>,
}

impl SwipeDetector {
    /// Creates a detector with the provided thresholds.
    #[must_use]
    pub const fn new(settings: SwipeSettings) -> Self {
        Self {
            settings,
            start: None,
        }
    }

    /// Thresholds used for classification.
    #[must_use]
    pub const fn settings(&self) -> &SwipeSettings {
        &self.settings
    }

    /// Records the start of a gesture, replacing any unfinished one.
    pub fn begin(&mut self, position: Vec2, time: f32) {
        self.start = Some((position, time));
    }

    /// Finishes the gesture and returns its direction when it qualifies.
    pub fn end(&mut self, position: Vec2, time: f32) -> Option<Direction> {
        let (origin, started) = self.start.take()?;
        let delta = position - origin;
        let duration = time - started;
        if delta.length() < self.settings.min_distance || duration > self.settings.max_duration {
            debug!(distance = delta.length(), duration, "gesture too short or too slow");
            return None;
        }

        let heading = delta.normalize_or_zero();
        let axes = [
            (Vec2::Y, Direction::Up),
            (Vec2::NEG_Y, Direction::Down),
            (Vec2::NEG_X, Direction::Left),
            (Vec2::X, Direction::Right),
        ];
        let direction = axes
            .into_iter()
            .find(|(axis, _)| axis.dot(heading) > self.settings.dot_threshold)
            .map(|(_, direction)| direction);
        if direction.is_none() {
            debug!(?heading, "no significant swipe detected");
        }
        direction
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn release_without_press_is_ignored() {
        let mut detector = SwipeDetector::new(SwipeSettings::default());
        assert_eq!(detector.end(Vec2::new(5.0, 0.0), 0.1), None);
    }

    #[test]
    fn press_is_consumed_by_release() {
        let mut detector = SwipeDetector::new(SwipeSettings::default());
        detector.begin(Vec2::ZERO, 0.0);
        assert_eq!(detector.end(Vec2::new(1.0, 0.0), 0.2), Some(Direction::Right));
        assert_eq!(detector.end(Vec2::new(2.0, 0.0), 0.3), None);
    }
}
