// Re-export commonly used types at the crate root
pub use day_curve::{DayCurve, DayCurveBuilder, Interpolation};
pub use dose_response::{DoseResponseParams, EventKinetics, OutcomeKind};
pub use error::ImmunityError;
pub use ledger::{ImmuneEvent, PersonImmuneLedger};
pub use model::{ImmunityModel, ImmunityModelBuilder};
pub use parameters::ImmunityParams;
pub use protection::protection;
pub use registry::{EventClass, EventTypeId, ImmunityRegistry, VariantId};

// Module declarations
pub mod cross_reactivity;
pub mod day_curve;
pub mod dose_response;
pub mod error;
pub mod ledger;
pub mod model;
pub mod parameters;
pub mod protection;
pub mod registry;
pub mod response_sampler;
