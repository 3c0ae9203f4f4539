use std::collections::HashMap;

use log::{debug, trace};

use crate::cross_reactivity::{CrossReactivityTable, RefreshFactorTable};
use crate::day_curve::DayCurve;
use crate::dose_response::{
    DoseResponseParams, EventKinetics, OutcomeKind, OutcomeModifierTable, NUM_MODIFIER_SLOTS,
};
use crate::error::ImmunityError;
use crate::registry::{EventTypeId, ImmunityRegistry, VariantId};

/// Default ceiling on any effective peak titer.
pub const DEFAULT_MAX_TITER: f64 = 150.0;

/// Assembles the registry and calibration tables for an immunity model, then
/// seals them into an immutable `ImmunityModel`.
///
/// Table cells may be written in any order and are keyed by interned IDs;
/// `seal` lays everything out densely and validates the full
/// (event type × variant) cross-product so that a missing row is caught
/// before the first simulated day rather than mid-run.
#[derive(Debug)]
pub struct ImmunityModelBuilder {
    registry: ImmunityRegistry,
    peaks: HashMap<(usize, usize), f64>,
    refresh_factors: HashMap<(usize, usize), f64>,
    dose_response: HashMap<usize, DoseResponseParams>,
    kinetics: HashMap<usize, EventKinetics>,
    outcome_modifiers: HashMap<(usize, usize, usize), DayCurve>,
    immune_response_sigma: f64,
    max_titer: f64,
}

impl Default for ImmunityModelBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ImmunityModelBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            registry: ImmunityRegistry::new(),
            peaks: HashMap::new(),
            refresh_factors: HashMap::new(),
            dose_response: HashMap::new(),
            kinetics: HashMap::new(),
            outcome_modifiers: HashMap::new(),
            immune_response_sigma: 0.0,
            max_titer: DEFAULT_MAX_TITER,
        }
    }

    /// Registers a variant (and its implicit natural-infection event type)
    /// together with its Hill dose-response parameters.
    /// # Errors
    /// - If the variant name is already registered
    /// - If `ak50` or `beta` is invalid
    pub fn register_variant(
        &mut self,
        name: &str,
        ak50: f64,
        beta: f64,
    ) -> Result<VariantId, ImmunityError> {
        let params = DoseResponseParams::new(ak50, beta)?;
        let variant = self.registry.register_variant(name)?;
        self.dose_response.insert(variant.index(), params);
        Ok(variant)
    }

    /// Registers a vaccine product and returns its event-type ID.
    /// # Errors
    /// - If the event-type name is already registered
    pub fn register_vaccine(&mut self, name: &str) -> Result<EventTypeId, ImmunityError> {
        self.registry.register_vaccine(name)
    }

    /// The implicitly generated natural-infection event type for a variant.
    #[must_use]
    pub fn infection_event_type(&self, variant: VariantId) -> EventTypeId {
        self.registry.infection_event_type(variant)
    }

    /// Sets the baseline peak titer an event of this type confers against
    /// the variant.
    /// # Errors
    /// - If either ID is out of range for this builder's registry
    /// - If `peak_titer` is negative or non-finite
    pub fn set_peak_titer(
        &mut self,
        event_type: EventTypeId,
        variant: VariantId,
        peak_titer: f64,
    ) -> Result<(), ImmunityError> {
        self.check_ids(event_type, variant)?;
        if !peak_titer.is_finite() || peak_titer < 0.0 {
            return Err(ImmunityError::ConfigurationIncomplete(format!(
                "peak titer for event type `{}` against variant `{}` must be non-negative and finite",
                self.registry.event_type_name(event_type),
                self.registry.variant_name(variant)
            )));
        }
        self.peaks
            .insert((event_type.index(), variant.index()), peak_titer);
        Ok(())
    }

    /// Sets the anamnestic refresh factor for the pair. A NaN factor means
    /// "no refresh rule" and leaves the cell unset.
    /// # Errors
    /// - If either ID is out of range for this builder's registry
    /// - If `factor` is negative or infinite
    pub fn set_refresh_factor(
        &mut self,
        event_type: EventTypeId,
        variant: VariantId,
        factor: f64,
    ) -> Result<(), ImmunityError> {
        self.check_ids(event_type, variant)?;
        if factor.is_nan() {
            return Ok(());
        }
        if !factor.is_finite() || factor < 0.0 {
            return Err(ImmunityError::ConfigurationIncomplete(format!(
                "refresh factor for event type `{}` against variant `{}` must be non-negative and finite",
                self.registry.event_type_name(event_type),
                self.registry.variant_name(variant)
            )));
        }
        self.refresh_factors
            .insert((event_type.index(), variant.index()), factor);
        Ok(())
    }

    /// Sets the growth-then-decay kinetics of an event type. Event types
    /// without explicit kinetics get `EventKinetics::default()` at seal.
    /// # Errors
    /// - If the event-type ID is out of range for this builder's registry
    pub fn set_kinetics(
        &mut self,
        event_type: EventTypeId,
        kinetics: EventKinetics,
    ) -> Result<(), ImmunityError> {
        if event_type.index() >= self.registry.num_event_types() {
            return Err(ImmunityError::PreconditionViolated(format!(
                "event-type ID {} is not registered",
                event_type.index()
            )));
        }
        self.kinetics.insert(event_type.index(), kinetics);
        Ok(())
    }

    /// Sets the day-indexed outcome-modifier curve for the triple. Unset
    /// curves default to the constant factor 1.0 (no modification).
    /// # Errors
    /// - If either ID is out of range for this builder's registry
    /// - If `outcome` is `BlocksInfection`, which is titer-derived
    pub fn set_outcome_modifier(
        &mut self,
        event_type: EventTypeId,
        variant: VariantId,
        outcome: OutcomeKind,
        curve: DayCurve,
    ) -> Result<(), ImmunityError> {
        self.check_ids(event_type, variant)?;
        let Some(slot) = outcome.modifier_slot() else {
            return Err(ImmunityError::PreconditionViolated(
                "BlocksInfection is titer-derived and takes no outcome-modifier curve".to_string(),
            ));
        };
        self.outcome_modifiers
            .insert((event_type.index(), variant.index(), slot), curve);
        Ok(())
    }

    /// Sets the population-level lognormal response-heterogeneity sigma.
    /// # Errors
    /// - If `sigma` is negative or non-finite
    pub fn set_immune_response_sigma(&mut self, sigma: f64) -> Result<(), ImmunityError> {
        if !sigma.is_finite() || sigma < 0.0 {
            return Err(ImmunityError::ConfigurationIncomplete(
                "`immune_response_sigma` must be non-negative and finite.".to_string(),
            ));
        }
        self.immune_response_sigma = sigma;
        Ok(())
    }

    /// Sets the ceiling applied to effective peak titers.
    /// # Errors
    /// - If `max_titer` is non-positive or non-finite
    pub fn set_max_titer(&mut self, max_titer: f64) -> Result<(), ImmunityError> {
        if !max_titer.is_finite() || max_titer <= 0.0 {
            return Err(ImmunityError::ConfigurationIncomplete(
                "`max_titer` must be positive and finite.".to_string(),
            ));
        }
        self.max_titer = max_titer;
        Ok(())
    }

    fn check_ids(&self, event_type: EventTypeId, variant: VariantId) -> Result<(), ImmunityError> {
        if event_type.index() >= self.registry.num_event_types() {
            return Err(ImmunityError::PreconditionViolated(format!(
                "event-type ID {} is not registered",
                event_type.index()
            )));
        }
        if variant.index() >= self.registry.num_variants() {
            return Err(ImmunityError::PreconditionViolated(format!(
                "variant ID {} is not registered",
                variant.index()
            )));
        }
        Ok(())
    }

    /// Validates completeness over the registered ID space and produces the
    /// immutable model. Consuming the builder is the one-way "sealed" flag:
    /// no table can be touched afterwards.
    /// # Errors
    /// - If any (event type, variant) pair lacks a peak-titer entry
    /// - If any variant lacks dose-response parameters
    /// - If no variant is registered
    pub fn seal(self) -> Result<ImmunityModel, ImmunityError> {
        let registry = self.registry;
        let num_variants = registry.num_variants();
        let num_event_types = registry.num_event_types();
        if num_variants == 0 {
            return Err(ImmunityError::ConfigurationIncomplete(
                "at least one variant must be registered.".to_string(),
            ));
        }

        let mut peaks = Vec::with_capacity(num_event_types * num_variants);
        let mut refresh_factors = Vec::with_capacity(num_event_types * num_variants);
        for event_type in registry.event_type_ids() {
            for variant in registry.variant_ids() {
                let key = (event_type.index(), variant.index());
                let Some(&peak) = self.peaks.get(&key) else {
                    return Err(ImmunityError::ConfigurationIncomplete(format!(
                        "event type `{}` has no peak-titer entry against variant `{}`",
                        registry.event_type_name(event_type),
                        registry.variant_name(variant)
                    )));
                };
                peaks.push(peak);
                refresh_factors.push(self.refresh_factors.get(&key).copied());
            }
        }

        let mut dose_response = Vec::with_capacity(num_variants);
        for variant in registry.variant_ids() {
            let Some(&params) = self.dose_response.get(&variant.index()) else {
                return Err(ImmunityError::ConfigurationIncomplete(format!(
                    "variant `{}` has no dose-response parameters",
                    registry.variant_name(variant)
                )));
            };
            dose_response.push(params);
        }

        let kinetics = registry
            .event_type_ids()
            .map(|event_type| {
                self.kinetics
                    .get(&event_type.index())
                    .cloned()
                    .unwrap_or_default()
            })
            .collect();

        let mut curves = vec![None; num_event_types * num_variants * NUM_MODIFIER_SLOTS];
        for ((event, variant, slot), curve) in self.outcome_modifiers {
            curves[(event * num_variants + variant) * NUM_MODIFIER_SLOTS + slot] = Some(curve);
        }

        debug!(
            "sealed immunity model: {} variants, {} event types, sigma {}",
            num_variants, num_event_types, self.immune_response_sigma
        );

        Ok(ImmunityModel {
            registry,
            cross_reactivity: CrossReactivityTable::new(num_variants, peaks),
            refresh_factors: RefreshFactorTable::new(num_variants, refresh_factors),
            dose_response,
            kinetics,
            outcome_modifiers: OutcomeModifierTable::new(num_variants, curves),
            immune_response_sigma: self.immune_response_sigma,
            max_titer: self.max_titer,
        })
    }
}

/// Sealed, read-only calibration for the immune engine: registry,
/// cross-reactivity and refresh tables, dose-response parameters, event
/// kinetics, and outcome-modifier curves.
///
/// Immutable after `seal`, so it can be shared (`&ImmunityModel`) across
/// worker threads without synchronization while per-person ledgers stay
/// single-owner.
#[derive(Debug)]
pub struct ImmunityModel {
    registry: ImmunityRegistry,
    cross_reactivity: CrossReactivityTable,
    refresh_factors: RefreshFactorTable,
    dose_response: Vec<DoseResponseParams>,
    kinetics: Vec<EventKinetics>,
    outcome_modifiers: OutcomeModifierTable,
    immune_response_sigma: f64,
    max_titer: f64,
}

impl ImmunityModel {
    #[must_use]
    pub fn registry(&self) -> &ImmunityRegistry {
        &self.registry
    }

    #[must_use]
    pub fn num_variants(&self) -> usize {
        self.registry.num_variants()
    }

    #[must_use]
    pub fn num_event_types(&self) -> usize {
        self.registry.num_event_types()
    }

    #[must_use]
    pub fn peak_titer(&self, event_type: EventTypeId, variant: VariantId) -> f64 {
        self.cross_reactivity.peak_titer(event_type, variant)
    }

    #[must_use]
    pub fn refresh_factor(&self, event_type: EventTypeId, variant: VariantId) -> Option<f64> {
        self.refresh_factors.refresh_factor(event_type, variant)
    }

    #[must_use]
    pub fn dose_response(&self, variant: VariantId) -> &DoseResponseParams {
        &self.dose_response[variant.index()]
    }

    #[must_use]
    pub fn kinetics(&self, event_type: EventTypeId) -> &EventKinetics {
        &self.kinetics[event_type.index()]
    }

    /// The outcome-modifier factor `days_since_event` days after an event of
    /// this type, for the given variant and (non-blocking) outcome.
    #[must_use]
    pub fn outcome_factor(
        &self,
        event_type: EventTypeId,
        variant: VariantId,
        outcome: OutcomeKind,
        days_since_event: f64,
    ) -> f64 {
        trace!(
            "outcome factor query: event type {}, variant {}, {:?}, day offset {}",
            event_type.index(),
            variant.index(),
            outcome,
            days_since_event
        );
        self.outcome_modifiers
            .factor(event_type, variant, outcome, days_since_event)
    }

    #[must_use]
    pub fn immune_response_sigma(&self) -> f64 {
        self.immune_response_sigma
    }

    #[must_use]
    pub fn max_titer(&self) -> f64 {
        self.max_titer
    }
}
