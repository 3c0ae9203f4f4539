use serde::{Deserialize, Serialize};

use crate::error::ImmunityError;

/// How a `DayCurve` fills in values between breakpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Interpolation {
    /// Straight-line interpolation between breakpoints.
    Linear,
    /// Log-linear interpolation: the value changes by a constant factor per
    /// day within a segment, so a pair of breakpoints expresses
    /// `factor^day`-style exponential decay (e.g. a half-life).
    Exponential,
}

/// A day-indexed, monotone-interpolated curve over ordered breakpoints.
///
/// One abstraction serves every day-keyed quantity in this engine: the ramp
/// to full effect, long-tail titer waning, and outcome-modifier factors.
/// Days before the first breakpoint hold its value; days past the last
/// breakpoint extrapolate the final segment (geometrically for
/// `Exponential`, linearly clamped at zero for `Linear`).
#[derive(Debug, Clone, PartialEq)]
pub struct DayCurve {
    days: Vec<f64>,
    values: Vec<f64>,
    interpolation: Interpolation,
}

impl DayCurve {
    /// Creates a curve from parallel day and value samples.
    /// # Errors
    /// - If `days` and `values` do not have the same length
    /// - If `days` is empty or not sorted in strictly ascending order
    /// - If any day or value is negative or non-finite
    pub fn new(
        days: Vec<f64>,
        values: Vec<f64>,
        interpolation: Interpolation,
    ) -> Result<Self, ImmunityError> {
        if days.len() != values.len() {
            return Err(ImmunityError::ConfigurationIncomplete(
                "`days` and `values` must have the same length.".to_string(),
            ));
        }
        if days.is_empty() {
            return Err(ImmunityError::ConfigurationIncomplete(
                "a day curve requires at least one breakpoint.".to_string(),
            ));
        }
        if days.iter().any(|&x| !x.is_finite() || x < 0.0) {
            return Err(ImmunityError::ConfigurationIncomplete(
                "`days` must be finite and non-negative.".to_string(),
            ));
        }
        if values.iter().any(|&x| !x.is_finite() || x < 0.0) {
            return Err(ImmunityError::ConfigurationIncomplete(
                "`values` must be finite and non-negative.".to_string(),
            ));
        }
        if days.windows(2).any(|w| w[0] >= w[1]) {
            return Err(ImmunityError::ConfigurationIncomplete(
                "`days` must be sorted in strictly ascending order.".to_string(),
            ));
        }
        Ok(Self {
            days,
            values,
            interpolation,
        })
    }

    /// A curve holding `value` on every day.
    /// # Errors
    /// - If `value` is negative or non-finite
    pub fn constant(value: f64) -> Result<Self, ImmunityError> {
        Self::new(vec![0.0], vec![value], Interpolation::Linear)
    }

    #[must_use]
    pub fn builder(interpolation: Interpolation) -> DayCurveBuilder {
        DayCurveBuilder {
            points: Vec::new(),
            interpolation,
        }
    }

    pub(crate) fn values(&self) -> &[f64] {
        &self.values
    }

    /// Evaluates the curve at `day`, which may fall before, between, or
    /// after the configured breakpoints.
    #[must_use]
    pub fn value_at(&self, day: f64) -> f64 {
        let n = self.days.len();
        if n == 1 || day <= self.days[0] {
            return self.values[0];
        }
        if day >= self.days[n - 1] {
            // Extrapolate the last segment
            return self.segment_value(n - 2, day);
        }
        // Index of the last breakpoint at or before `day`
        let upper = self.days.partition_point(|&d| d <= day);
        self.segment_value(upper - 1, day)
    }

    /// Interpolates (or extrapolates) along the segment starting at
    /// breakpoint `i`.
    fn segment_value(&self, i: usize, day: f64) -> f64 {
        let (x1, x2) = (self.days[i], self.days[i + 1]);
        let (y1, y2) = (self.values[i], self.values[i + 1]);
        match self.interpolation {
            Interpolation::Linear => linear_interpolation(x1, x2, y1, y2, day).max(0.0),
            Interpolation::Exponential => {
                // A zero endpoint has no finite log; fall back to linear
                if y1 <= 0.0 || y2 <= 0.0 {
                    return linear_interpolation(x1, x2, y1, y2, day).max(0.0);
                }
                y1 * (y2 / y1).powf((day - x1) / (x2 - x1))
            }
        }
    }
}

/// Fluent construction of a `DayCurve` breakpoint by breakpoint.
#[derive(Debug, Clone)]
pub struct DayCurveBuilder {
    points: Vec<(f64, f64)>,
    interpolation: Interpolation,
}

impl DayCurveBuilder {
    #[must_use]
    pub fn at_day(mut self, day: f64, value: f64) -> Self {
        self.points.push((day, value));
        self
    }

    /// # Errors
    /// - If the collected breakpoints fail `DayCurve::new` validation
    pub fn build(self) -> Result<DayCurve, ImmunityError> {
        let (days, values): (Vec<f64>, Vec<f64>) = self.points.into_iter().unzip();
        DayCurve::new(days, values, self.interpolation)
    }
}

#[must_use]
fn linear_interpolation(x1: f64, x2: f64, y1: f64, y2: f64, xp: f64) -> f64 {
    #[allow(clippy::float_cmp)]
    if x1 == x2 {
        return (y1 + y2) / 2.0;
    }
    y1 + (y2 - y1) / (x2 - x1) * (xp - x1)
}

#[cfg(test)]
mod test {
    use statrs::assert_almost_eq;

    use super::{DayCurve, Interpolation};
    use crate::error::ImmunityError;

    #[test]
    fn test_linear_between_breakpoints() {
        let curve = DayCurve::builder(Interpolation::Linear)
            .at_day(0.0, 0.0)
            .at_day(10.0, 5.0)
            .build()
            .unwrap();
        assert_almost_eq!(curve.value_at(4.0), 2.0, 1e-12);
        assert_almost_eq!(curve.value_at(10.0), 5.0, 1e-12);
    }

    #[test]
    fn test_holds_first_value_before_first_breakpoint() {
        let curve = DayCurve::builder(Interpolation::Linear)
            .at_day(5.0, 3.0)
            .at_day(10.0, 6.0)
            .build()
            .unwrap();
        assert_almost_eq!(curve.value_at(0.0), 3.0, 0.0);
        assert_almost_eq!(curve.value_at(5.0), 3.0, 0.0);
    }

    #[test]
    fn test_linear_extrapolation_clamped_at_zero() {
        let curve = DayCurve::builder(Interpolation::Linear)
            .at_day(0.0, 2.0)
            .at_day(10.0, 1.0)
            .build()
            .unwrap();
        assert_almost_eq!(curve.value_at(15.0), 0.5, 1e-12);
        // The line crosses zero at day 20 and must not go negative
        assert_almost_eq!(curve.value_at(40.0), 0.0, 0.0);
    }

    #[test]
    fn test_exponential_half_life() {
        // Breakpoints at one half-life apart express factor^day decay
        let curve = DayCurve::builder(Interpolation::Exponential)
            .at_day(0.0, 1.0)
            .at_day(60.0, 0.5)
            .build()
            .unwrap();
        assert_almost_eq!(curve.value_at(60.0), 0.5, 1e-12);
        assert_almost_eq!(curve.value_at(120.0), 0.25, 1e-12);
        assert_almost_eq!(curve.value_at(30.0), 0.5_f64.sqrt(), 1e-12);
        // Daily decay matches the closed form 0.5^(1/60)
        assert_almost_eq!(curve.value_at(1.0), 0.5_f64.powf(1.0 / 60.0), 1e-12);
    }

    #[test]
    fn test_exponential_with_zero_endpoint_falls_back_to_linear() {
        let curve = DayCurve::builder(Interpolation::Exponential)
            .at_day(0.0, 1.0)
            .at_day(10.0, 0.0)
            .build()
            .unwrap();
        assert_almost_eq!(curve.value_at(5.0), 0.5, 1e-12);
        assert_almost_eq!(curve.value_at(20.0), 0.0, 0.0);
    }

    #[test]
    fn test_constant_curve() {
        let curve = DayCurve::constant(0.4).unwrap();
        assert_almost_eq!(curve.value_at(0.0), 0.4, 0.0);
        assert_almost_eq!(curve.value_at(365.0), 0.4, 0.0);
    }

    #[test]
    fn test_unsorted_days_rejected() {
        let e = DayCurve::new(
            vec![0.0, 10.0, 5.0],
            vec![1.0, 2.0, 3.0],
            Interpolation::Linear,
        )
        .err();
        match e {
            Some(ImmunityError::ConfigurationIncomplete(msg)) => {
                assert_eq!(
                    msg,
                    "`days` must be sorted in strictly ascending order.".to_string()
                );
            }
            Some(ue) => panic!(
                "Expected an error that `days` must be sorted. Instead got {:?}",
                ue.to_string()
            ),
            None => panic!("Expected an error. Instead, passed with no errors."),
        }
    }

    #[test]
    fn test_length_mismatch_rejected() {
        assert!(DayCurve::new(vec![0.0, 1.0], vec![1.0], Interpolation::Linear).is_err());
    }

    #[test]
    fn test_empty_curve_rejected() {
        assert!(DayCurve::new(vec![], vec![], Interpolation::Linear).is_err());
    }

    #[test]
    fn test_negative_value_rejected() {
        assert!(DayCurve::new(vec![0.0], vec![-1.0], Interpolation::Linear).is_err());
    }
}
