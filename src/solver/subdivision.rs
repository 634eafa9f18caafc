//! Adaptive timestep subdivision.
//!
//! Each interval is solved once with the full step and once as two half
//! steps. If the two estimates agree to within the error threshold, the
//! (more accurate) half-step pair is accepted; otherwise both halves are
//! subdivided independently. Subdivision stops unconditionally once the
//! half step would drop below `min_dt`, or once `max_depth` halvings deep.
//!
//! The binary tree of intervals is walked with an explicit stack, so deep
//! subdivision never grows the call stack.

use crate::error::{CircuitError, Result};

use super::{DEFAULT_ERROR_THRESHOLD, DEFAULT_MAX_DEPTH, DEFAULT_MIN_DT};

/// Something that can be advanced in time and compared.
pub trait Steppable<S> {
    /// Advance `state` by `dt`.
    fn update(&self, state: &S, dt: f64) -> Result<S>;

    /// Discrepancy between two candidate states.
    fn distance(&self, a: &S, b: &S) -> f64;
}

/// An accepted sub-step and its length.
#[derive(Debug, Clone, PartialEq)]
pub struct SubStep<S> {
    pub state: S,
    pub dt: f64,
}

/// The ordered sub-steps covering one subdivided interval.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultSet<S> {
    steps: Vec<SubStep<S>>,
    floor_hits: usize,
}

impl<S> ResultSet<S> {
    pub fn steps(&self) -> &[SubStep<S>] {
        &self.steps
    }

    pub fn into_steps(self) -> Vec<SubStep<S>> {
        self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Sum of all sub-step lengths.
    pub fn total_time(&self) -> f64 {
        self.steps.iter().map(|s| s.dt).sum()
    }

    pub fn final_state(&self) -> Option<&S> {
        self.steps.last().map(|s| &s.state)
    }

    /// Number of intervals accepted above the error threshold because
    /// `min_dt` or `max_depth` stopped further subdivision.
    pub fn floor_hits(&self) -> usize {
        self.floor_hits
    }
}

/// A pending interval. The full-step estimate is carried along when it is
/// already known (the first half of a rejected interval).
struct Interval<S> {
    dt: f64,
    depth: usize,
    coarse: Option<S>,
}

/// Adaptive subdivision settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimestepSubdivisions {
    /// Largest accepted distance between the full-step and half-step estimates.
    pub error_threshold: f64,
    /// Half steps shorter than this are accepted regardless of error.
    pub min_dt: f64,
    /// Halvings after which an interval is accepted regardless of error.
    pub max_depth: usize,
}

impl Default for TimestepSubdivisions {
    fn default() -> Self {
        Self {
            error_threshold: DEFAULT_ERROR_THRESHOLD,
            min_dt: DEFAULT_MIN_DT,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl TimestepSubdivisions {
    pub fn new(error_threshold: f64, min_dt: f64) -> Self {
        Self {
            error_threshold,
            min_dt,
            ..Self::default()
        }
    }

    /// Set the recursion depth guard.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    fn validate(&self, dt: f64) -> Result<()> {
        if !(self.error_threshold.is_finite() && self.error_threshold >= 0.0) {
            return Err(CircuitError::invalid_simulation_param(format!(
                "error threshold must be non-negative and finite, got {}",
                self.error_threshold
            )));
        }
        if !(self.min_dt.is_finite() && self.min_dt > 0.0) {
            return Err(CircuitError::invalid_simulation_param(format!(
                "minimum time step must be positive and finite, got {}",
                self.min_dt
            )));
        }
        if !(dt.is_finite() && dt > 0.0) {
            return Err(CircuitError::invalid_simulation_param(format!(
                "time step must be positive and finite, got {}",
                dt
            )));
        }
        Ok(())
    }

    /// Advance `initial` by `dt`, returning every accepted sub-step in order.
    pub fn step_in_time<S, P>(&self, initial: S, steppable: &P, dt: f64) -> Result<ResultSet<S>>
    where
        P: Steppable<S>,
    {
        self.validate(dt)?;

        let mut steps: Vec<SubStep<S>> = Vec::new();
        let mut floor_hits = 0;
        let mut pending = vec![Interval {
            dt,
            depth: 0,
            coarse: None,
        }];

        while let Some(interval) = pending.pop() {
            let start = steps.last().map(|s| &s.state).unwrap_or(&initial);
            let half_dt = interval.dt / 2.0;

            let coarse = match interval.coarse {
                Some(coarse) => coarse,
                None => steppable.update(start, interval.dt)?,
            };
            let half = steppable.update(start, half_dt)?;
            let fine = steppable.update(&half, half_dt)?;
            let error = steppable.distance(&coarse, &fine);

            if error <= self.error_threshold {
                log::trace!("accepted dt={:e} (error {:e})", interval.dt, error);
            } else if half_dt < self.min_dt {
                floor_hits += 1;
                log::debug!(
                    "accepted dt={:e} at minimum step with error {:e} > {:e}",
                    interval.dt,
                    error,
                    self.error_threshold
                );
            } else if interval.depth >= self.max_depth {
                floor_hits += 1;
                log::warn!(
                    "subdivision depth limit {} reached at dt={:e} with error {:e}",
                    self.max_depth,
                    interval.dt,
                    error
                );
            } else {
                // Second half goes first so the first half is popped next
                pending.push(Interval {
                    dt: half_dt,
                    depth: interval.depth + 1,
                    coarse: None,
                });
                pending.push(Interval {
                    dt: half_dt,
                    depth: interval.depth + 1,
                    coarse: Some(half),
                });
                continue;
            }

            steps.push(SubStep {
                state: half,
                dt: half_dt,
            });
            steps.push(SubStep {
                state: fine,
                dt: half_dt,
            });
        }

        Ok(ResultSet { steps, floor_hits })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::cell::Cell;

    /// Exponential decay x' = -k x, integrated with forward Euler.
    struct Decay {
        k: f64,
        updates: Cell<usize>,
    }

    impl Steppable<f64> for Decay {
        fn update(&self, state: &f64, dt: f64) -> Result<f64> {
            self.updates.set(self.updates.get() + 1);
            Ok(state * (1.0 - self.k * dt))
        }

        fn distance(&self, a: &f64, b: &f64) -> f64 {
            (a - b).abs()
        }
    }

    /// Never converges: every pair of states is infinitely far apart.
    struct Divergent {
        updates: Cell<usize>,
    }

    impl Steppable<f64> for Divergent {
        fn update(&self, state: &f64, dt: f64) -> Result<f64> {
            self.updates.set(self.updates.get() + 1);
            Ok(state + dt)
        }

        fn distance(&self, _: &f64, _: &f64) -> f64 {
            f64::INFINITY
        }
    }

    /// Tracks elapsed time; fails once it passes a deadline.
    struct FailsAfter(f64);

    impl Steppable<f64> for FailsAfter {
        fn update(&self, state: &f64, dt: f64) -> Result<f64> {
            if state + dt > self.0 {
                Err(CircuitError::SingularMatrix)
            } else {
                Ok(state + dt)
            }
        }

        fn distance(&self, _: &f64, _: &f64) -> f64 {
            0.0
        }
    }

    #[test]
    fn test_accepts_without_subdividing_when_within_threshold() {
        let decay = Decay {
            k: 1.0,
            updates: Cell::new(0),
        };
        let result = TimestepSubdivisions::new(1.0, 1e-8)
            .step_in_time(1.0, &decay, 0.1)
            .unwrap();

        assert_eq!(result.len(), 2);
        assert_eq!(decay.updates.get(), 3);
        assert_relative_eq!(result.total_time(), 0.1);
        assert_relative_eq!(*result.final_state().unwrap(), 0.95 * 0.95);
        assert_eq!(result.floor_hits(), 0);
    }

    #[test]
    fn test_halts_when_half_step_drops_below_min_dt() {
        let divergent = Divergent {
            updates: Cell::new(0),
        };
        let result = TimestepSubdivisions::new(1e-6, 0.1)
            .step_in_time(0.0, &divergent, 1.0)
            .unwrap();

        // 1 -> 0.5 -> 0.25 -> 0.125, whose half (0.0625) is below 0.1
        assert_eq!(result.len(), 16);
        assert!(result.steps().iter().all(|s| s.dt == 0.0625));
        assert_eq!(result.floor_hits(), 8);
        assert_relative_eq!(result.total_time(), 1.0);
        assert_relative_eq!(*result.final_state().unwrap(), 1.0);
        // 15 intervals visited, 7 of them reuse their parent's half step
        assert_eq!(divergent.updates.get(), 15 * 3 - 7);
    }

    #[test]
    fn test_depth_guard_stops_pathological_distance() {
        let divergent = Divergent {
            updates: Cell::new(0),
        };
        let result = TimestepSubdivisions::new(1e-6, f64::MIN_POSITIVE)
            .with_max_depth(3)
            .step_in_time(0.0, &divergent, 1.0)
            .unwrap();

        assert_eq!(result.len(), 16);
        assert_eq!(result.floor_hits(), 8);
        assert_relative_eq!(result.total_time(), 1.0);
    }

    #[test]
    fn test_refines_where_error_is_large() {
        let decay = Decay {
            k: 50.0,
            updates: Cell::new(0),
        };
        let subdivisions = TimestepSubdivisions::new(1e-4, 1e-9);
        let result = subdivisions.step_in_time(1.0, &decay, 0.02).unwrap();

        assert!(result.len() > 2);
        assert_eq!(result.floor_hits(), 0);
        assert_relative_eq!(result.total_time(), 0.02, epsilon = 1e-15);
        // Forward Euler with small steps lands close to the exact decay
        assert_relative_eq!(*result.final_state().unwrap(), (-1.0f64).exp(), epsilon = 1e-2);
    }

    #[test]
    fn test_sub_steps_are_contiguous() {
        let divergent = Divergent {
            updates: Cell::new(0),
        };
        let result = TimestepSubdivisions::new(1e-6, 0.2)
            .step_in_time(0.0, &divergent, 1.0)
            .unwrap();

        // The state is elapsed time, so it must equal the running sum of dt
        let mut elapsed = 0.0;
        for step in result.steps() {
            elapsed += step.dt;
            assert_relative_eq!(step.state, elapsed, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_update_errors_propagate() {
        let result = TimestepSubdivisions::default().step_in_time(0.0, &FailsAfter(0.5), 1.0);
        assert_eq!(result, Err(CircuitError::SingularMatrix));
    }

    #[test]
    fn test_rejects_invalid_settings() {
        let divergent = Divergent {
            updates: Cell::new(0),
        };
        assert!(TimestepSubdivisions::new(-1.0, 1e-8)
            .step_in_time(0.0, &divergent, 1.0)
            .is_err());
        assert!(TimestepSubdivisions::new(1e-6, 0.0)
            .step_in_time(0.0, &divergent, 1.0)
            .is_err());
        assert!(TimestepSubdivisions::default()
            .step_in_time(0.0, &divergent, -1.0)
            .is_err());
        assert_eq!(divergent.updates.get(), 0);
    }
}
