use crate::registry::{EventTypeId, VariantId};

/// Dense peak-titer table over the full (event type × variant) cross-product.
///
/// Row-major by event type. Completeness is enforced when the model is
/// sealed, so lookups are plain index arithmetic with no missing-key failure
/// mode; an out-of-range ID is a caller bug and panics.
#[derive(Debug, Clone)]
pub struct CrossReactivityTable {
    num_variants: usize,
    peaks: Vec<f64>,
}

impl CrossReactivityTable {
    pub(crate) fn new(num_variants: usize, peaks: Vec<f64>) -> Self {
        debug_assert!(num_variants == 0 || peaks.len() % num_variants == 0);
        Self {
            num_variants,
            peaks,
        }
    }

    /// The baseline peak titer an event of this type confers against the
    /// target variant.
    #[must_use]
    pub fn peak_titer(&self, event_type: EventTypeId, variant: VariantId) -> f64 {
        self.peaks[event_type.index() * self.num_variants + variant.index()]
    }
}

/// Dense refresh-factor table, same shape as `CrossReactivityTable`.
///
/// `None` means no refresh rule applies for the pair: a recurrence of the
/// event contributes its baseline peak unamplified.
#[derive(Debug, Clone)]
pub struct RefreshFactorTable {
    num_variants: usize,
    factors: Vec<Option<f64>>,
}

impl RefreshFactorTable {
    pub(crate) fn new(num_variants: usize, factors: Vec<Option<f64>>) -> Self {
        debug_assert!(num_variants == 0 || factors.len() % num_variants == 0);
        Self {
            num_variants,
            factors,
        }
    }

    /// The anamnestic-boosting factor applied to the event's peak when the
    /// person already carries titer against the variant, if one is defined.
    #[must_use]
    pub fn refresh_factor(&self, event_type: EventTypeId, variant: VariantId) -> Option<f64> {
        self.factors[event_type.index() * self.num_variants + variant.index()]
    }
}
