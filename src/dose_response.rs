use serde::{Deserialize, Serialize};

use crate::day_curve::{DayCurve, Interpolation};
use crate::error::ImmunityError;
use crate::registry::{EventTypeId, VariantId};

/// Which protection outcome is being evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OutcomeKind {
    /// Probability that an exposure is neutralized before establishing
    /// infection. Titer-derived via the Hill dose-response function.
    BlocksInfection,
    /// Multiplicative factor on the probability of developing symptoms given
    /// infection.
    SymptomaticGivenInfected,
    /// Multiplicative factor on the probability of severe disease given
    /// symptoms.
    SevereGivenSymptomatic,
    /// Multiplicative factor on the onward infectiousness of a breakthrough
    /// case.
    InfectivityGivenBreakthrough,
}

impl OutcomeKind {
    /// Slot in the outcome-modifier table; `BlocksInfection` is titer-derived
    /// and has no static modifier curve.
    pub(crate) fn modifier_slot(self) -> Option<usize> {
        match self {
            OutcomeKind::BlocksInfection => None,
            OutcomeKind::SymptomaticGivenInfected => Some(0),
            OutcomeKind::SevereGivenSymptomatic => Some(1),
            OutcomeKind::InfectivityGivenBreakthrough => Some(2),
        }
    }
}

pub(crate) const NUM_MODIFIER_SLOTS: usize = 3;

/// Per-variant Hill dose-response parameters.
///
/// `ak50` is the titer at which infection-blocking probability is exactly
/// 50%; `beta` is the Hill coefficient controlling the steepness of the
/// sigmoid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DoseResponseParams {
    pub ak50: f64,
    pub beta: f64,
}

impl DoseResponseParams {
    /// # Errors
    /// - If `ak50` or `beta` is non-positive or non-finite
    pub fn new(ak50: f64, beta: f64) -> Result<Self, ImmunityError> {
        if !ak50.is_finite() || ak50 <= 0.0 {
            return Err(ImmunityError::ConfigurationIncomplete(
                "`ak50` must be positive and finite.".to_string(),
            ));
        }
        if !beta.is_finite() || beta <= 0.0 {
            return Err(ImmunityError::ConfigurationIncomplete(
                "`beta` must be positive and finite.".to_string(),
            ));
        }
        Ok(Self { ak50, beta })
    }
}

/// Growth-then-decay shape of one event type's titer contribution: a linear
/// ramp to the effective peak over `days_to_full_effect`, then waning along a
/// day-indexed curve of fraction-of-peak versus days since full effect.
#[derive(Debug, Clone, PartialEq)]
pub struct EventKinetics {
    days_to_full_effect: f64,
    waning: DayCurve,
}

impl EventKinetics {
    /// # Errors
    /// - If `days_to_full_effect` is negative or non-finite
    /// - If `waning` has a value above 1.0 or ever increases, which would let
    ///   a contribution outgrow its effective peak after full effect
    pub fn new(days_to_full_effect: f64, waning: DayCurve) -> Result<Self, ImmunityError> {
        if !days_to_full_effect.is_finite() || days_to_full_effect < 0.0 {
            return Err(ImmunityError::ConfigurationIncomplete(
                "`days_to_full_effect` must be non-negative and finite.".to_string(),
            ));
        }
        if waning.values().iter().any(|&v| v > 1.0)
            || waning.values().windows(2).any(|w| w[0] < w[1])
        {
            return Err(ImmunityError::ConfigurationIncomplete(
                "`waning` must be non-increasing with values at most 1.0.".to_string(),
            ));
        }
        Ok(Self {
            days_to_full_effect,
            waning,
        })
    }

    #[must_use]
    pub fn days_to_full_effect(&self) -> f64 {
        self.days_to_full_effect
    }

    /// The default waning curve: exponential decay with a 60-day antibody
    /// half-life.
    #[must_use]
    pub fn default_waning() -> DayCurve {
        DayCurve::builder(Interpolation::Exponential)
            .at_day(0.0, 1.0)
            .at_day(60.0, 0.5)
            .build()
            .expect("default waning curve is valid")
    }

    /// Fraction of the effective peak remaining at `elapsed` days since the
    /// event, covering both the ramp and the waning tail.
    #[must_use]
    pub fn fraction_of_peak(&self, elapsed: f64) -> f64 {
        if elapsed < 0.0 {
            return 0.0;
        }
        if elapsed < self.days_to_full_effect {
            return elapsed / self.days_to_full_effect;
        }
        self.waning.value_at(elapsed - self.days_to_full_effect)
    }
}

impl Default for EventKinetics {
    /// 21-day ramp to full effect and exponential waning with a 60-day
    /// antibody half-life.
    fn default() -> Self {
        Self {
            days_to_full_effect: 21.0,
            waning: Self::default_waning(),
        }
    }
}

/// Sparse store of outcome-modifier curves, dense-indexed over
/// (event type × variant × modifier slot). A missing curve means the event
/// type does not modify that outcome (factor 1.0).
#[derive(Debug, Clone)]
pub struct OutcomeModifierTable {
    num_variants: usize,
    curves: Vec<Option<DayCurve>>,
}

impl OutcomeModifierTable {
    pub(crate) fn new(num_variants: usize, curves: Vec<Option<DayCurve>>) -> Self {
        debug_assert!(
            num_variants == 0 || curves.len() % (num_variants * NUM_MODIFIER_SLOTS) == 0
        );
        Self {
            num_variants,
            curves,
        }
    }

    pub(crate) fn slot_index(&self, event_type: EventTypeId, variant: VariantId, slot: usize) -> usize {
        (event_type.index() * self.num_variants + variant.index()) * NUM_MODIFIER_SLOTS + slot
    }

    /// The outcome-modifier factor at `days_since_event` days after an event
    /// of this type, for the given variant and outcome.
    ///
    /// # Panics
    /// If `outcome` is `BlocksInfection`, which is titer-derived and has no
    /// static modifier curve.
    #[must_use]
    pub fn factor(
        &self,
        event_type: EventTypeId,
        variant: VariantId,
        outcome: OutcomeKind,
        days_since_event: f64,
    ) -> f64 {
        let slot = outcome
            .modifier_slot()
            .expect("BlocksInfection has no outcome-modifier curve");
        match &self.curves[self.slot_index(event_type, variant, slot)] {
            Some(curve) => curve.value_at(days_since_event),
            None => 1.0,
        }
    }
}

#[cfg(test)]
mod test {
    use statrs::assert_almost_eq;

    use super::{
        DoseResponseParams, EventKinetics, OutcomeKind, OutcomeModifierTable, NUM_MODIFIER_SLOTS,
    };
    use crate::day_curve::{DayCurve, Interpolation};
    use crate::error::ImmunityError;
    use crate::registry::{EventTypeId, VariantId};

    #[test]
    fn test_dose_response_params_validation() {
        assert!(DoseResponseParams::new(0.2, 1.0).is_ok());
        assert!(DoseResponseParams::new(0.0, 1.0).is_err());
        assert!(DoseResponseParams::new(0.2, -1.0).is_err());
        assert!(DoseResponseParams::new(f64::NAN, 1.0).is_err());
    }

    #[test]
    fn test_kinetics_ramp_then_waning() {
        let waning = DayCurve::builder(Interpolation::Exponential)
            .at_day(0.0, 1.0)
            .at_day(60.0, 0.5)
            .build()
            .unwrap();
        let kinetics = EventKinetics::new(49.0, waning).unwrap();
        assert_almost_eq!(kinetics.fraction_of_peak(0.0), 0.0, 0.0);
        assert_almost_eq!(kinetics.fraction_of_peak(24.5), 0.5, 1e-12);
        assert_almost_eq!(kinetics.fraction_of_peak(49.0), 1.0, 1e-12);
        // One half-life past full effect
        assert_almost_eq!(kinetics.fraction_of_peak(109.0), 0.5, 1e-12);
    }

    #[test]
    fn test_increasing_waning_rejected() {
        // An increasing tail segment would extrapolate without bound under
        // exponential interpolation, pushing contributions past the peak
        let waning = DayCurve::builder(Interpolation::Exponential)
            .at_day(0.0, 1.0)
            .at_day(60.0, 0.5)
            .at_day(120.0, 0.8)
            .build()
            .unwrap();
        let e = EventKinetics::new(21.0, waning).err();
        match e {
            Some(ImmunityError::ConfigurationIncomplete(msg)) => {
                assert_eq!(
                    msg,
                    "`waning` must be non-increasing with values at most 1.0.".to_string()
                );
            }
            Some(ue) => panic!(
                "Expected an error that the waning curve increases. Instead got {:?}",
                ue.to_string()
            ),
            None => panic!("Expected an error. Instead, passed with no errors."),
        }
    }

    #[test]
    fn test_waning_above_one_rejected() {
        let waning = DayCurve::builder(Interpolation::Linear)
            .at_day(0.0, 1.2)
            .at_day(60.0, 0.5)
            .build()
            .unwrap();
        assert!(EventKinetics::new(21.0, waning).is_err());
        // A flat curve at exactly 1.0 is still a valid no-decay tail
        assert!(EventKinetics::new(21.0, DayCurve::constant(1.0).unwrap()).is_ok());
    }

    #[test]
    fn test_kinetics_before_event_contributes_nothing() {
        let kinetics = EventKinetics::default();
        assert_almost_eq!(kinetics.fraction_of_peak(-1.0), 0.0, 0.0);
    }

    #[test]
    fn test_kinetics_zero_ramp_takes_full_effect_immediately() {
        let kinetics = EventKinetics::new(0.0, DayCurve::constant(1.0).unwrap()).unwrap();
        assert_almost_eq!(kinetics.fraction_of_peak(0.0), 1.0, 0.0);
    }

    #[test]
    fn test_kinetics_default_half_life() {
        let kinetics = EventKinetics::default();
        assert_almost_eq!(kinetics.days_to_full_effect(), 21.0, 0.0);
        assert_almost_eq!(kinetics.fraction_of_peak(21.0 + 60.0), 0.5, 1e-12);
    }

    #[test]
    fn test_modifier_table_defaults_to_one() {
        let table = OutcomeModifierTable::new(1, vec![None; NUM_MODIFIER_SLOTS]);
        let factor = table.factor(
            EventTypeId(0),
            VariantId(0),
            OutcomeKind::SymptomaticGivenInfected,
            30.0,
        );
        assert_almost_eq!(factor, 1.0, 0.0);
    }

    #[test]
    fn test_modifier_table_stored_curve() {
        let curve = DayCurve::builder(Interpolation::Linear)
            .at_day(0.0, 1.0)
            .at_day(100.0, 0.4)
            .build()
            .unwrap();
        let mut curves = vec![None; NUM_MODIFIER_SLOTS];
        curves[OutcomeKind::SevereGivenSymptomatic.modifier_slot().unwrap()] = Some(curve);
        let table = OutcomeModifierTable::new(1, curves);
        let factor = table.factor(
            EventTypeId(0),
            VariantId(0),
            OutcomeKind::SevereGivenSymptomatic,
            50.0,
        );
        assert_almost_eq!(factor, 0.7, 1e-12);
        // The other slots are unset and fall back to 1.0
        let factor = table.factor(
            EventTypeId(0),
            VariantId(0),
            OutcomeKind::InfectivityGivenBreakthrough,
            50.0,
        );
        assert_almost_eq!(factor, 1.0, 0.0);
    }

    #[test]
    #[should_panic(expected = "BlocksInfection has no outcome-modifier curve")]
    fn test_modifier_table_rejects_blocks_infection() {
        let table = OutcomeModifierTable::new(1, vec![None; NUM_MODIFIER_SLOTS]);
        let _ = table.factor(
            EventTypeId(0),
            VariantId(0),
            OutcomeKind::BlocksInfection,
            0.0,
        );
    }
}
