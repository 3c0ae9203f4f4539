use crate::dose_response::{DoseResponseParams, OutcomeKind};
use crate::ledger::PersonImmuneLedger;
use crate::model::ImmunityModel;
use crate::registry::VariantId;

/// The protection a person's current immune state provides against one
/// outcome of an exposure to `variant` on `day`.
///
/// For `BlocksInfection` this is the probability that the exposure is
/// neutralized before establishing infection, derived from the person's
/// titer via the variant's Hill dose-response curve. For the remaining
/// outcome kinds it is the multiplicative factor of the most recent event's
/// outcome-modifier curve at the elapsed day (1.0 if the person has no event
/// history). All four outcomes are evaluated independently; composing them
/// into Bernoulli draws is the caller's business.
#[must_use]
pub fn protection(
    model: &ImmunityModel,
    ledger: &PersonImmuneLedger,
    variant: VariantId,
    day: i64,
    outcome: OutcomeKind,
) -> f64 {
    match outcome {
        OutcomeKind::BlocksInfection => {
            let titer = ledger.titer(model, variant, day);
            hill(titer, model.dose_response(variant))
        }
        _ => match ledger.latest_event_at(day) {
            None => 1.0,
            Some(event) => {
                #[allow(clippy::cast_precision_loss)]
                let elapsed = (day - event.day) as f64;
                model
                    .outcome_factor(event.event_type, variant, outcome, elapsed)
                    .clamp(0.0, 1.0)
            }
        },
    }
}

/// Hill function `t^beta / (t^beta + ak50^beta)`, evaluated on the titer
/// ratio `t / ak50` for numerical robustness at large `beta`.
fn hill(titer: f64, params: &DoseResponseParams) -> f64 {
    if titer <= 0.0 {
        return 0.0;
    }
    let powered = (titer / params.ak50).powf(params.beta);
    powered / (powered + 1.0)
}
