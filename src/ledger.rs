use std::cell::RefCell;

use log::trace;
use rand::Rng;
use serde::Serialize;

use crate::model::ImmunityModel;
use crate::registry::{EventTypeId, VariantId};
use crate::response_sampler::sample_response_multiplier;

/// Residual titer below this threshold counts as "no prior immunity" when
/// deciding whether a new event triggers anamnestic refresh boosting.
pub const TITER_EPSILON: f64 = 1e-9;

/// One immunizing event in a person's history: a vaccine dose or a recovered
/// natural infection. Created once, never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ImmuneEvent {
    pub event_type: EventTypeId,
    pub day: i64,
}

/// Per-person immune state: an append-only event log, a fixed individual
/// response multiplier, and a per-variant same-day titer cache.
///
/// A ledger is owned exclusively by its person. Queries take `&self` and are
/// pure apart from the cache; the `RefCell` keeps the type `!Sync`, which
/// matches the single-writer-per-person contract of the surrounding
/// simulation (share the sealed model across workers, never a ledger).
#[derive(Debug)]
pub struct PersonImmuneLedger {
    events: Vec<ImmuneEvent>,
    response_multiplier: f64,
    titer_cache: RefCell<Vec<Option<(i64, f64)>>>,
}

impl PersonImmuneLedger {
    /// Creates a ledger for a person entering the simulation, drawing the
    /// individual response multiplier from the model's lognormal
    /// heterogeneity distribution.
    #[must_use]
    pub fn new<R: Rng + ?Sized>(model: &ImmunityModel, rng: &mut R) -> Self {
        let multiplier = sample_response_multiplier(rng, model.immune_response_sigma());
        Self::with_response_multiplier(model, multiplier)
    }

    /// Creates a ledger with a known response multiplier, e.g. when
    /// restoring a person from a snapshot.
    ///
    /// # Panics
    /// If `multiplier` is non-positive or non-finite.
    #[must_use]
    pub fn with_response_multiplier(model: &ImmunityModel, multiplier: f64) -> Self {
        assert!(
            multiplier.is_finite() && multiplier > 0.0,
            "response multiplier must be positive and finite, got {multiplier}"
        );
        Self {
            events: Vec::new(),
            response_multiplier: multiplier,
            titer_cache: RefCell::new(vec![None; model.num_variants()]),
        }
    }

    #[must_use]
    pub fn response_multiplier(&self) -> f64 {
        self.response_multiplier
    }

    #[must_use]
    pub fn events(&self) -> &[ImmuneEvent] {
        &self.events
    }

    /// The most recent event at or before `day`, if any.
    #[must_use]
    pub fn latest_event_at(&self, day: i64) -> Option<&ImmuneEvent> {
        self.events.iter().rev().find(|event| event.day <= day)
    }

    /// Appends an immunizing event and invalidates cached titers.
    ///
    /// # Panics
    /// If `day` precedes the previously recorded event. The simulation clock
    /// is monotonic per person, so an out-of-order append is an integration
    /// bug; continuing would silently corrupt the titer history.
    pub fn record_event(&mut self, event_type: EventTypeId, day: i64) {
        if let Some(last) = self.events.last() {
            assert!(
                day >= last.day,
                "immune events must be recorded in non-decreasing day order (got day {day} after day {})",
                last.day
            );
        }
        trace!(
            "recording immune event: type {}, day {day}",
            event_type.index()
        );
        self.events.push(ImmuneEvent { event_type, day });
        self.titer_cache.borrow_mut().fill(None);
    }

    /// The person's titer against `variant` on `day`.
    ///
    /// Each past event contributes its effective peak scaled by its event
    /// type's ramp/waning kinetics; the person's raw titer is the maximum
    /// contribution, scaled by the individual response multiplier. Results
    /// are cached per variant for same-day repeat queries.
    ///
    /// # Panics
    /// If `variant` is out of range for the model this ledger was created
    /// against (an integration bug, not a data condition).
    #[must_use]
    pub fn titer(&self, model: &ImmunityModel, variant: VariantId, day: i64) -> f64 {
        {
            let cache = self.titer_cache.borrow();
            if let Some((cached_day, cached_titer)) = cache[variant.index()] {
                if cached_day == day {
                    return cached_titer;
                }
            }
        }
        let value = self.compute_titer(model, variant, day);
        self.titer_cache.borrow_mut()[variant.index()] = Some((day, value));
        value
    }

    fn compute_titer(&self, model: &ImmunityModel, variant: VariantId, day: i64) -> f64 {
        // Effective peaks are fixed at event time: each event sees only the
        // contributions of the events before it when the refresh rule asks
        // whether prior immunity existed.
        let mut effective_peaks: Vec<f64> = Vec::with_capacity(self.events.len());
        let mut raw_titer = 0.0_f64;
        for event in &self.events {
            if event.day > day {
                break;
            }
            let peak = model.peak_titer(event.event_type, variant);
            let mut effective = peak;
            if self.raw_titer_before(model, &effective_peaks, event.day) * self.response_multiplier
                > TITER_EPSILON
            {
                if let Some(factor) = model.refresh_factor(event.event_type, variant) {
                    effective = peak * factor;
                }
            }
            let effective = effective.min(model.max_titer());
            effective_peaks.push(effective);
            raw_titer = raw_titer.max(contribution(model, event, effective, day));
        }
        raw_titer * self.response_multiplier
    }

    /// Raw titer from the first `effective_peaks.len()` events evaluated
    /// just before `day` (an event taking effect on `day` itself does not
    /// count as prior immunity).
    fn raw_titer_before(&self, model: &ImmunityModel, effective_peaks: &[f64], day: i64) -> f64 {
        let mut raw_titer = 0.0_f64;
        for (event, &effective) in self.events.iter().zip(effective_peaks) {
            if event.day >= day {
                break;
            }
            raw_titer = raw_titer.max(contribution(model, event, effective, day));
        }
        raw_titer
    }
}

fn contribution(model: &ImmunityModel, event: &ImmuneEvent, effective_peak: f64, day: i64) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    let elapsed = (day - event.day) as f64;
    effective_peak * model.kinetics(event.event_type).fraction_of_peak(elapsed)
}
