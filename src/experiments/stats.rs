use super::collaborators::{EstimateRequest, EstimatorFactory, RunEstimate, RunEstimator};
use super::config::{Item, TestDefinition};
use crate::error::Result;
use crate::settings::ReportSettings;

// ── Result Structs ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampleSizeEstimate {
    pub per_arm: u64,
    pub total: u64,
}

impl SampleSizeEstimate {
    /// Sample size is unbounded (zero effect, certainty requested).
    pub fn is_unreachable(&self) -> bool {
        self.per_arm == u64::MAX
    }
}

// ── Sample Size ─────────────────────────────────────────────────────

/// Two-proportion power analysis, with every arm compared against the baseline
/// on an equal traffic split. Returns the per-arm and total visits needed to
/// detect `relative_mde` at the given power and alpha.
pub fn required_sample_size(
    baseline_rate: f64,
    relative_mde: f64,
    alpha: f64,
    power: f64,
    arms: u32,
) -> SampleSizeEstimate {
    let unreachable = SampleSizeEstimate {
        per_arm: u64::MAX,
        total: u64::MAX,
    };

    let p1 = baseline_rate;
    let p2 = baseline_rate * (1.0 + relative_mde);
    let delta = (p2 - p1).abs();
    if delta == 0.0 || !delta.is_finite() {
        return unreachable;
    }

    // z-values for alpha/2 upper tail and power
    let z_alpha = z_from_p(1.0 - alpha / 2.0);
    let z_power = z_from_p(power);

    let p_bar = (p1 + p2) / 2.0;

    // n = (z_alpha * sqrt(2*p_bar*(1-p_bar)) + z_power * sqrt(p1*(1-p1) + p2*(1-p2)))^2 / delta^2
    let numerator = z_alpha * (2.0 * p_bar * (1.0 - p_bar)).sqrt()
        + z_power * (p1 * (1.0 - p1) + p2 * (1.0 - p2)).sqrt();
    let per_arm = (numerator.powi(2) / delta.powi(2)).ceil();
    if !per_arm.is_finite() || per_arm >= u64::MAX as f64 {
        return unreachable;
    }

    let per_arm = per_arm as u64;
    SampleSizeEstimate {
        per_arm,
        total: per_arm.saturating_mul(u64::from(arms.max(1))),
    }
}

/// Inverse normal CDF approximation (Abramowitz & Stegun 26.2.23).
/// Returns z such that P(Z < z) = p.
fn z_from_p(p: f64) -> f64 {
    if p <= 0.0 {
        return f64::NEG_INFINITY;
    }
    if p >= 1.0 {
        return f64::INFINITY;
    }

    let (p_adj, sign) = if p < 0.5 { (p, -1.0) } else { (1.0 - p, 1.0) };
    let t = (-2.0 * p_adj.ln()).sqrt();

    let c0 = 2.515517;
    let c1 = 0.802853;
    let c2 = 0.010328;
    let d1 = 1.432788;
    let d2 = 0.189269;
    let d3 = 0.001308;

    let z = t - (c0 + c1 * t + c2 * t * t) / (1.0 + d1 * t + d2 * t * t + d3 * t * t * t);

    sign * z
}

// ── Run Estimator ───────────────────────────────────────────────────

/// Estimates how many days a test needs by dividing the sample it requires
/// by the host's daily traffic share.
///
/// One instance serves every language/device pair; the host item carries the
/// traffic figures.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleSizeEstimator {
    pub baseline_rate: f64,
    pub relative_mde: f64,
}

impl SampleSizeEstimator {
    pub fn new(baseline_rate: f64, relative_mde: f64) -> Self {
        Self {
            baseline_rate,
            relative_mde,
        }
    }

    pub fn from_settings(settings: &ReportSettings) -> Self {
        Self::new(
            settings.baseline_conversion_rate,
            settings.minimum_detectable_effect,
        )
    }
}

impl EstimatorFactory for SampleSizeEstimator {
    fn estimator(&self, language: &str, device_name: &str) -> Box<dyn RunEstimator + '_> {
        tracing::trace!(
            "sample size estimator for language={} device={:?}",
            language,
            device_name
        );
        Box::new(*self)
    }
}

impl RunEstimator for SampleSizeEstimator {
    fn get_estimate(
        &self,
        host: &Item,
        request: &EstimateRequest,
        definition: &TestDefinition,
    ) -> Result<RunEstimate> {
        let Some(daily_visits) = host.daily_visits.filter(|v| v.is_finite() && *v > 0.0) else {
            return Ok(RunEstimate::default());
        };

        let alpha = 1.0 - request.confidence_level_pct / 100.0;
        let sample = required_sample_size(
            self.baseline_rate,
            self.relative_mde,
            alpha,
            request.required_power,
            request.experience_count,
        );
        if sample.is_unreachable() {
            tracing::debug!(
                "test {} can never reach its sample size; no estimate",
                definition.id
            );
            return Ok(RunEstimate::default());
        }

        let daily_share = daily_visits * request.traffic_allocation_pct / 100.0;
        let days = (sample.total as f64 / daily_share).ceil();
        let estimated_day_count = if days.is_finite() && days <= f64::from(u32::MAX) {
            Some(days as u32)
        } else {
            None
        };

        tracing::trace!(
            "test {}: {} visits needed at {:.1}/day -> {:?} days",
            definition.id,
            sample.total,
            daily_share,
            estimated_day_count
        );
        Ok(RunEstimate {
            estimated_day_count,
        })
    }
}
