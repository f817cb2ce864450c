use serde::{Deserialize, Serialize};

use super::collaborators::PerformanceProvider;
use super::config::TestConfiguration;
use crate::error::Result;

/// Recorded performance of one combination (one value index per test variable).
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExperiencePerformance {
    pub combination: Vec<u8>,
    pub visits: u64,
    /// Accumulated engagement value across all visits.
    pub value: f64,
}

impl ExperiencePerformance {
    pub fn mean_value(&self) -> f64 {
        if self.visits == 0 {
            0.0
        } else {
            self.value / self.visits as f64
        }
    }

    /// The baseline selects the original value (index 0) of every variable.
    pub fn is_baseline(&self) -> bool {
        self.combination.iter().all(|&v| v == 0)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceSnapshot {
    #[serde(default)]
    pub experiences: Vec<ExperiencePerformance>,
}

impl PerformanceSnapshot {
    pub fn baseline(&self) -> Option<&ExperiencePerformance> {
        self.experiences.iter().find(|e| e.is_baseline())
    }

    /// Highest mean value among experiences that have traffic. `None` until the
    /// baseline itself has visits. Ties keep the earlier experience.
    pub fn best_experience(&self) -> Option<&ExperiencePerformance> {
        let baseline = self.baseline()?;
        if baseline.visits == 0 {
            return None;
        }
        self.experiences
            .iter()
            .filter(|e| e.visits > 0)
            .fold(None, |best: Option<&ExperiencePerformance>, e| match best {
                Some(b) if b.mean_value() >= e.mean_value() => Some(b),
                _ => Some(e),
            })
    }

    /// Relative change of a combination's mean value over the baseline's.
    /// Zero for unknown combinations or a zero baseline.
    pub fn experience_effect(&self, combination: &[u8]) -> f64 {
        let (Some(baseline), Some(experience)) = (
            self.baseline(),
            self.experiences
                .iter()
                .find(|e| e.combination.as_slice() == combination),
        ) else {
            return 0.0;
        };
        let base = baseline.mean_value();
        if base == 0.0 {
            return 0.0;
        }
        (experience.mean_value() - base) / base
    }
}

/// Effect of the current best experience against the baseline; 0 while no
/// best experience can be determined.
pub fn winning_effect(provider: &dyn PerformanceProvider, test: &TestConfiguration) -> Result<f64> {
    let performance = provider.performance(test)?;
    Ok(match performance.best_experience() {
        Some(best) => performance.experience_effect(&best.combination),
        None => 0.0,
    })
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum EffectTrend {
    Decrease,
    #[default]
    NoChange,
    Increase,
}

impl EffectTrend {
    /// Exact sign check: only `0.0` and `-0.0` are no-change, however small a
    /// nonzero effect is. NaN is reported as no-change.
    pub fn classify(effect: f64) -> Self {
        if effect < 0.0 {
            EffectTrend::Decrease
        } else if effect > 0.0 {
            EffectTrend::Increase
        } else {
            EffectTrend::NoChange
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EffectTrend::Decrease => "decrease",
            EffectTrend::NoChange => "no-change",
            EffectTrend::Increase => "increase",
        }
    }

    /// Style class understood by the reporting UI.
    pub fn css_class(&self) -> &'static str {
        match self {
            EffectTrend::Decrease => "value-decrease",
            EffectTrend::NoChange => "value-nochange",
            EffectTrend::Increase => "value-increase",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ReportError;
    use crate::experiments::config::{ExperienceSet, TestType};
    use crate::types::ItemId;

    fn exp(combination: &[u8], visits: u64, value: f64) -> ExperiencePerformance {
        ExperiencePerformance {
            combination: combination.to_vec(),
            visits,
            value,
        }
    }

    fn config() -> TestConfiguration {
        TestConfiguration {
            definition_id: ItemId::new(),
            host_item_id: ItemId::new(),
            device_id: ItemId::new(),
            device_name: "Default".to_string(),
            language_name: "en".to_string(),
            test_type: TestType::Page,
            test_set: ExperienceSet::default(),
        }
    }

    struct FixedPerformance(PerformanceSnapshot);

    impl PerformanceProvider for FixedPerformance {
        fn performance(&self, _test: &TestConfiguration) -> Result<PerformanceSnapshot> {
            Ok(self.0.clone())
        }
    }

    struct BrokenPerformance;

    impl PerformanceProvider for BrokenPerformance {
        fn performance(&self, _test: &TestConfiguration) -> Result<PerformanceSnapshot> {
            Err(ReportError::Store("analytics unavailable".into()))
        }
    }

    // ── Snapshot ────────────────────────────────────────────────────

    #[test]
    fn best_experience_picks_highest_mean_value() {
        let snapshot = PerformanceSnapshot {
            experiences: vec![exp(&[0, 0], 100, 50.0), exp(&[1, 0], 100, 80.0), exp(&[0, 1], 100, 60.0)],
        };
        assert_eq!(snapshot.best_experience().unwrap().combination, vec![1, 0]);
    }

    #[test]
    fn best_experience_can_be_the_baseline() {
        let snapshot = PerformanceSnapshot {
            experiences: vec![exp(&[0], 100, 90.0), exp(&[1], 100, 40.0)],
        };
        let best = snapshot.best_experience().unwrap();
        assert!(best.is_baseline());
        assert_eq!(snapshot.experience_effect(&best.combination), 0.0);
    }

    #[test]
    fn best_experience_ties_keep_first() {
        let snapshot = PerformanceSnapshot {
            experiences: vec![exp(&[0], 10, 5.0), exp(&[1], 10, 8.0), exp(&[2], 20, 16.0)],
        };
        assert_eq!(snapshot.best_experience().unwrap().combination, vec![1]);
    }

    #[test]
    fn no_best_experience_without_baseline_traffic() {
        let snapshot = PerformanceSnapshot {
            experiences: vec![exp(&[0], 0, 0.0), exp(&[1], 10, 8.0)],
        };
        assert!(snapshot.best_experience().is_none());
        assert!(PerformanceSnapshot::default().best_experience().is_none());
    }

    #[test]
    fn experience_effect_is_relative_to_baseline() {
        let snapshot = PerformanceSnapshot {
            experiences: vec![exp(&[0], 100, 50.0), exp(&[1], 100, 75.0), exp(&[2], 50, 20.0)],
        };
        assert!((snapshot.experience_effect(&[1]) - 0.5).abs() < 1e-12);
        assert!((snapshot.experience_effect(&[2]) + 0.2).abs() < 1e-12);
        assert_eq!(snapshot.experience_effect(&[9]), 0.0);
    }

    #[test]
    fn experience_effect_zero_baseline_is_zero() {
        let snapshot = PerformanceSnapshot {
            experiences: vec![exp(&[0], 100, 0.0), exp(&[1], 100, 10.0)],
        };
        assert_eq!(snapshot.experience_effect(&[1]), 0.0);
    }

    // ── winning_effect ──────────────────────────────────────────────

    #[test]
    fn winning_effect_uses_best_experience() {
        let provider = FixedPerformance(PerformanceSnapshot {
            experiences: vec![exp(&[0], 100, 40.0), exp(&[1], 100, 50.0)],
        });
        let effect = winning_effect(&provider, &config()).unwrap();
        assert!((effect - 0.25).abs() < 1e-12);
    }

    #[test]
    fn winning_effect_without_data_is_zero() {
        let provider = FixedPerformance(PerformanceSnapshot::default());
        assert_eq!(winning_effect(&provider, &config()).unwrap(), 0.0);
    }

    #[test]
    fn winning_effect_propagates_provider_failure() {
        assert!(winning_effect(&BrokenPerformance, &config()).is_err());
    }

    // ── Classification ──────────────────────────────────────────────

    #[test]
    fn classify_by_exact_sign() {
        assert_eq!(EffectTrend::classify(-0.3), EffectTrend::Decrease);
        assert_eq!(EffectTrend::classify(0.0), EffectTrend::NoChange);
        assert_eq!(EffectTrend::classify(0.3), EffectTrend::Increase);
    }

    #[test]
    fn classify_tiny_magnitudes_are_not_zero() {
        assert_eq!(EffectTrend::classify(f64::MIN_POSITIVE), EffectTrend::Increase);
        assert_eq!(EffectTrend::classify(-f64::MIN_POSITIVE), EffectTrend::Decrease);
        assert_eq!(EffectTrend::classify(1e-300), EffectTrend::Increase);
    }

    #[test]
    fn classify_negative_zero_and_nan_as_no_change() {
        assert_eq!(EffectTrend::classify(-0.0), EffectTrend::NoChange);
        assert_eq!(EffectTrend::classify(f64::NAN), EffectTrend::NoChange);
    }

    #[test]
    fn trend_serializes_kebab_case() {
        assert_eq!(
            serde_json::to_string(&EffectTrend::NoChange).unwrap(),
            "\"no-change\""
        );
        assert_eq!(EffectTrend::NoChange.as_str(), "no-change");
        assert_eq!(EffectTrend::Increase.css_class(), "value-increase");
    }
}
