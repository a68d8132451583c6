//! Kaplan-Meier survival estimation
//!
//! Observations are right-censored durations: each one has a time and a flag
//! telling whether the event (death, failure, ...) was observed at that time
//! or the observation was censored.
//!
//! ```text
//! Event:     |----x   (failed at t)
//! Censored:  |------> (still alive at t, true time unknown)
//! ```
//!
//! The estimator walks observations in ascending time order and groups equal
//! times together, so tied observations produce a single step:
//!
//! ```text
//! S(t_i) = S(t_{i-1}) * (n_i - d_i) / n_i
//! ```
//!
//! where `n_i` is the number still at risk when the group starts and `d_i`
//! the number of events in the group.

use serde::{Deserialize, Serialize};

/// One survival observation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    /// Time of the event or of censoring
    pub time: f64,
    /// `true` when the event was observed, `false` when censored
    pub event: bool,
}

impl Observation {
    pub fn new(time: f64, event: bool) -> Self {
        Self { time, event }
    }
}

/// A point of the survival step function
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SurvivalStep {
    /// Time of the group this step closes
    pub time: f64,
    /// Estimated survival probability after the group
    pub survival: f64,
    /// Fraction of all observations still at risk after the group's events
    pub at_risk: f64,
}

/// Kaplan-Meier survival curve
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KaplanMeier {
    steps: Vec<SurvivalStep>,
    observations: usize,
    events: usize,
}

impl KaplanMeier {
    /// Time of the initial step every curve starts with
    pub const ORIGIN: f64 = 0.0;

    /// Estimate the survival curve from rank-ordered observations
    ///
    /// Observations must be sorted by ascending time (for example by walking
    /// a variable's ranking). NaN times are skipped. The curve always starts
    /// with `(0, 1, 1)` and ends with the final, possibly partial, group.
    ///
    /// Time complexity: O(n)
    pub fn estimate<I>(ranked: I) -> Self
    where
        I: IntoIterator<Item = Observation>,
    {
        let observations: Vec<Observation> = ranked
            .into_iter()
            .filter(|o| !o.time.is_nan())
            .collect();
        let total = observations.len();

        let mut steps = vec![SurvivalStep {
            time: Self::ORIGIN,
            survival: 1.0,
            at_risk: 1.0,
        }];
        let events = observations.iter().filter(|o| o.event).count();
        if total == 0 {
            return Self {
                steps,
                observations: 0,
                events: 0,
            };
        }

        let mut survival = 1.0;
        let mut at_risk = total;
        let mut deaths = 0usize;
        let mut group_size = 0usize;
        let mut group_time: Option<f64> = None;

        for obs in &observations {
            if group_time != Some(obs.time) {
                if let Some(time) = group_time {
                    survival *= (at_risk - deaths) as f64 / at_risk as f64;
                    steps.push(SurvivalStep {
                        time,
                        survival,
                        at_risk: (at_risk - deaths) as f64 / total as f64,
                    });
                    at_risk -= group_size;
                }
                group_time = Some(obs.time);
                deaths = 0;
                group_size = 0;
            }
            group_size += 1;
            if obs.event {
                deaths += 1;
            }
        }

        // flush the last group
        if let Some(time) = group_time {
            survival *= (at_risk - deaths) as f64 / at_risk as f64;
            steps.push(SurvivalStep {
                time,
                survival,
                at_risk: (at_risk - deaths) as f64 / total as f64,
            });
        }

        Self {
            steps,
            observations: total,
            events,
        }
    }

    /// Steps of the curve, starting with the origin
    pub fn steps(&self) -> &[SurvivalStep] {
        &self.steps
    }

    /// Number of observations used
    pub fn observations(&self) -> usize {
        self.observations
    }

    /// Number of observed events
    pub fn events(&self) -> usize {
        self.events
    }

    /// Number of censored observations
    pub fn censored(&self) -> usize {
        self.observations - self.events
    }

    /// Survival probability at time `t` (right-continuous step function)
    pub fn survival_at(&self, t: f64) -> f64 {
        self.steps
            .iter()
            .skip(1)
            .take_while(|step| step.time <= t)
            .last()
            .map(|step| step.survival)
            .unwrap_or(1.0)
    }

    /// Median survival time: first time the curve drops to 0.5 or below
    ///
    /// `None` when the curve never gets there (heavy censoring).
    pub fn median(&self) -> Option<f64> {
        self.steps
            .iter()
            .skip(1)
            .find(|step| step.survival <= 0.5)
            .map(|step| step.time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(data: &[(f64, bool)]) -> Vec<Observation> {
        data.iter().map(|&(t, e)| Observation::new(t, e)).collect()
    }

    #[test]
    fn test_ties_form_single_step() {
        let km = KaplanMeier::estimate(obs(&[(1.0, true), (2.0, true), (2.0, false), (3.0, true)]));
        let steps = km.steps();

        assert_eq!(steps.len(), 4);
        assert_eq!(steps[0], SurvivalStep { time: 0.0, survival: 1.0, at_risk: 1.0 });
        assert_eq!(steps[1].time, 1.0);
        assert!((steps[1].survival - 0.75).abs() < 1e-12);
        assert!((steps[1].at_risk - 0.75).abs() < 1e-12);
        assert_eq!(steps[2].time, 2.0);
        assert!((steps[2].survival - 0.5).abs() < 1e-12);
        assert!((steps[2].at_risk - 0.5).abs() < 1e-12);
        assert_eq!(steps[3].time, 3.0);
        assert!(steps[3].survival.abs() < 1e-12);
    }

    #[test]
    fn test_censoring_keeps_curve_flat() {
        let km = KaplanMeier::estimate(obs(&[(1.0, true), (2.0, false), (3.0, true)]));
        let steps = km.steps();

        assert!((steps[1].survival - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(steps[2].survival, steps[1].survival);
        assert!(steps[3].survival < steps[2].survival);
        assert_eq!(km.events(), 2);
        assert_eq!(km.censored(), 1);
    }

    #[test]
    fn test_empty_input() {
        let km = KaplanMeier::estimate(Vec::new());
        assert_eq!(km.steps().len(), 1);
        assert_eq!(km.observations(), 0);
        assert_eq!(km.median(), None);
        assert_eq!(km.survival_at(10.0), 1.0);
    }

    #[test]
    fn test_all_censored() {
        let km = KaplanMeier::estimate(obs(&[(5.0, false), (6.0, false)]));
        assert!(km.steps().iter().all(|s| s.survival == 1.0));
        assert_eq!(km.median(), None);
    }

    #[test]
    fn test_nan_times_are_skipped() {
        let km = KaplanMeier::estimate(obs(&[(f64::NAN, true), (1.0, true)]));
        assert_eq!(km.observations(), 1);
        assert_eq!(km.steps().len(), 2);
        assert_eq!(km.steps()[1].survival, 0.0);
    }

    #[test]
    fn test_survival_at_and_median() {
        let km = KaplanMeier::estimate(obs(&[(1.0, true), (2.0, true), (2.0, false), (3.0, true)]));
        assert_eq!(km.survival_at(0.5), 1.0);
        assert!((km.survival_at(1.5) - 0.75).abs() < 1e-12);
        assert!((km.survival_at(2.0) - 0.5).abs() < 1e-12);
        assert_eq!(km.median(), Some(2.0));
    }

    #[test]
    fn test_serialize_steps() {
        let km = KaplanMeier::estimate(obs(&[(1.0, true)]));
        let json = serde_json::to_string(km.steps()).unwrap();
        assert!(json.contains("\"survival\""));
    }
}
