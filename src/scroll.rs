//! Scroll gesture mapping.
//!
//! Touch/wheel deltas accumulate until they cross the configured threshold;
//! each crossing emits exactly one scroll command. The thresholds and the
//! emitted control sequences are tunable configuration, not a contract.

use crate::config::GestureConfig;

/// Direction of one scroll step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollDirection {
    Up,
    Down,
}

/// Accumulates vertical gesture deltas and emits discrete scroll steps.
#[derive(Debug)]
pub struct GestureMapper {
    threshold_px: f32,
    accumulated: f32,
}

impl GestureMapper {
    /// Create a mapper from the gesture configuration.
    pub fn new(config: &GestureConfig) -> Self {
        Self {
            threshold_px: config.scroll_threshold_px.max(1.0),
            accumulated: 0.0,
        }
    }

    /// Feed a vertical movement delta (positive = downward). Returns one
    /// direction per threshold crossing; partial movement carries over to
    /// the next call.
    pub fn on_delta(&mut self, delta_y: f32) -> Vec<ScrollDirection> {
        self.accumulated += delta_y;

        let mut steps = Vec::new();
        while self.accumulated >= self.threshold_px {
            self.accumulated -= self.threshold_px;
            steps.push(ScrollDirection::Down);
        }
        while self.accumulated <= -self.threshold_px {
            self.accumulated += self.threshold_px;
            steps.push(ScrollDirection::Up);
        }
        steps
    }

    /// Drop any accumulated partial movement (gesture ended).
    pub fn reset(&mut self) {
        self.accumulated = 0.0;
    }
}

/// The control sequence for one scroll step, per configuration.
pub fn sequence_for(config: &GestureConfig, direction: ScrollDirection) -> &str {
    match direction {
        ScrollDirection::Up => &config.scroll_up_seq,
        ScrollDirection::Down => &config.scroll_down_seq,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapper() -> GestureMapper {
        GestureMapper::new(&GestureConfig {
            scroll_threshold_px: 40.0,
            ..GestureConfig::default()
        })
    }

    #[test]
    fn below_threshold_emits_nothing() {
        let mut m = mapper();
        assert!(m.on_delta(39.0).is_empty());
    }

    #[test]
    fn crossing_threshold_emits_exactly_one_command() {
        let mut m = mapper();
        assert_eq!(m.on_delta(40.0), vec![ScrollDirection::Down]);
        // The consumed threshold doesn't double-fire.
        assert!(m.on_delta(0.0).is_empty());
    }

    #[test]
    fn partial_deltas_accumulate_across_calls() {
        let mut m = mapper();
        assert!(m.on_delta(-25.0).is_empty());
        assert_eq!(m.on_delta(-20.0), vec![ScrollDirection::Up]);
    }

    #[test]
    fn large_delta_emits_multiple_steps() {
        let mut m = mapper();
        assert_eq!(
            m.on_delta(85.0),
            vec![ScrollDirection::Down, ScrollDirection::Down]
        );
    }

    #[test]
    fn reset_drops_partial_movement() {
        let mut m = mapper();
        m.on_delta(30.0);
        m.reset();
        assert!(m.on_delta(30.0).is_empty());
    }

    #[test]
    fn sequences_come_from_config() {
        let config = GestureConfig::default();
        assert_eq!(sequence_for(&config, ScrollDirection::Up), "\x1b[A");
        assert_eq!(sequence_for(&config, ScrollDirection::Down), "\x1b[B");
    }
}
