use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::day_curve::{DayCurve, Interpolation};
use crate::dose_response::{EventKinetics, OutcomeKind};
use crate::error::ImmunityError;
use crate::model::{ImmunityModel, ImmunityModelBuilder};
use crate::registry::{EventTypeId, VariantId};

/// Name-keyed description of an immunity scenario, as a loader would
/// deserialize it from JSON. `build_model` resolves names to interned IDs
/// and seals the result; the crate prescribes no file format or I/O.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImmunityParams {
    /// Registered variants with their Hill dose-response parameters.
    pub variants: Vec<VariantParams>,
    /// Vaccine products and booster schedules.
    #[serde(default)]
    pub vaccines: Vec<EventRowParams>,
    /// Rows for the implicit natural-infection event types; `name` must be a
    /// registered variant name.
    #[serde(default)]
    pub infections: Vec<EventRowParams>,
    /// Lognormal sigma of the individual response multiplier.
    #[serde(default)]
    pub immune_response_sigma: f64,
    /// Ceiling on effective peak titers; defaults to 150.
    #[serde(default)]
    pub max_titer: Option<f64>,
}

/// One variant and its dose-response calibration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantParams {
    pub name: String,
    pub ak50: f64,
    pub beta: f64,
}

/// One immunizing-event class: its cross-reactivity row over all variants,
/// optional refresh factors, kinetics, and outcome-modifier curves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRowParams {
    pub name: String,
    /// Baseline peak titer by variant name; must cover every variant.
    pub peak_titers: HashMap<String, f64>,
    /// Anamnestic refresh factor by variant name; absent means no rule.
    #[serde(default)]
    pub refresh_factors: HashMap<String, f64>,
    /// Days until the event reaches full effect; defaults to 21.
    #[serde(default)]
    pub days_to_full_effect: Option<f64>,
    /// Waning curve of fraction-of-peak versus days since full effect;
    /// defaults to a 60-day half-life exponential.
    #[serde(default)]
    pub waning: Option<CurveParams>,
    #[serde(default)]
    pub outcome_modifiers: Vec<OutcomeModifierParams>,
}

/// Serializable form of a `DayCurve`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurveParams {
    pub interpolation: Interpolation,
    /// (day, value) breakpoints in ascending day order.
    pub points: Vec<(f64, f64)>,
}

impl CurveParams {
    fn to_curve(&self) -> Result<DayCurve, ImmunityError> {
        let (days, values): (Vec<f64>, Vec<f64>) = self.points.iter().copied().unzip();
        DayCurve::new(days, values, self.interpolation)
    }
}

/// A day-indexed modifier curve for one non-blocking outcome kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutcomeModifierParams {
    pub variant: String,
    pub outcome: OutcomeKind,
    pub curve: CurveParams,
}

impl ImmunityParams {
    /// Resolves names, assembles the builder, and seals the model.
    /// # Errors
    /// - If a row references an unknown variant name
    /// - If an infection row's name is not a registered variant
    /// - If any value or curve fails validation, or sealing finds the
    ///   cross-reactivity tables incomplete
    pub fn build_model(&self) -> Result<ImmunityModel, ImmunityError> {
        let mut builder = ImmunityModelBuilder::new();
        builder.set_immune_response_sigma(self.immune_response_sigma)?;
        if let Some(max_titer) = self.max_titer {
            builder.set_max_titer(max_titer)?;
        }

        let mut variant_ids: HashMap<&str, VariantId> = HashMap::new();
        for variant in &self.variants {
            let id = builder.register_variant(&variant.name, variant.ak50, variant.beta)?;
            variant_ids.insert(variant.name.as_str(), id);
        }

        let lookup_variant = |name: &str| -> Result<VariantId, ImmunityError> {
            variant_ids.get(name).copied().ok_or_else(|| {
                ImmunityError::ConfigurationIncomplete(format!(
                    "reference to unregistered variant `{name}`"
                ))
            })
        };

        let mut rows: Vec<(EventTypeId, &EventRowParams)> = Vec::new();
        for row in &self.vaccines {
            rows.push((builder.register_vaccine(&row.name)?, row));
        }
        let mut seen_infections: HashSet<&str> = HashSet::new();
        for row in &self.infections {
            // Vaccine rows are deduplicated by `register_vaccine`; infection
            // rows resolve to pre-existing event types and need their own check
            if !seen_infections.insert(row.name.as_str()) {
                return Err(ImmunityError::ConfigurationIncomplete(format!(
                    "infection row for variant `{}` appears more than once",
                    row.name
                )));
            }
            let variant = lookup_variant(&row.name)?;
            rows.push((builder.infection_event_type(variant), row));
        }

        for (event_type, row) in rows {
            for (variant_name, &peak) in &row.peak_titers {
                builder.set_peak_titer(event_type, lookup_variant(variant_name)?, peak)?;
            }
            for (variant_name, &factor) in &row.refresh_factors {
                builder.set_refresh_factor(event_type, lookup_variant(variant_name)?, factor)?;
            }
            if row.days_to_full_effect.is_some() || row.waning.is_some() {
                let waning = match &row.waning {
                    Some(curve) => curve.to_curve()?,
                    None => EventKinetics::default_waning(),
                };
                let ramp = row
                    .days_to_full_effect
                    .unwrap_or_else(|| EventKinetics::default().days_to_full_effect());
                builder.set_kinetics(event_type, EventKinetics::new(ramp, waning)?)?;
            }
            for modifier in &row.outcome_modifiers {
                builder.set_outcome_modifier(
                    event_type,
                    lookup_variant(&modifier.variant)?,
                    modifier.outcome,
                    modifier.curve.to_curve()?,
                )?;
            }
        }

        builder.seal()
    }
}
