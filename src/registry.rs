use indexmap::IndexMap;
use serde::Serialize;

use crate::error::ImmunityError;

/// Interned index of a circulating virus variant.
///
/// Variants are registered once at scenario-build time and never removed, so
/// the index doubles as a dense array offset on the query path (no hashing
/// per titer lookup).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct VariantId(pub(crate) usize);

impl VariantId {
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// Interned index of an immunizing-event class: a vaccine product/dose
/// schedule, or "natural infection with variant V".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct EventTypeId(pub(crate) usize);

impl EventTypeId {
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// What kind of immunizing event an `EventTypeId` denotes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventClass {
    Vaccine,
    NaturalInfection(VariantId),
}

/// Arena of interned variant and event-type names.
///
/// Registering a variant implicitly registers its natural-infection event
/// type, so every variant always has exactly one infection event type and
/// the cross-reactivity tables can be validated over the full cross-product
/// at seal time.
#[derive(Debug, Default)]
pub struct ImmunityRegistry {
    variants: IndexMap<String, EventTypeId>,
    event_types: IndexMap<String, EventClass>,
}

impl ImmunityRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a variant and its implicit natural-infection event type.
    /// Returns the interned ID.
    /// # Errors
    /// - If the variant name is already registered
    pub fn register_variant(&mut self, name: &str) -> Result<VariantId, ImmunityError> {
        if self.variants.contains_key(name) {
            return Err(ImmunityError::ConfigurationIncomplete(format!(
                "variant `{name}` is registered more than once"
            )));
        }
        let infection_name = format!("infection_{name}");
        if self.event_types.contains_key(&infection_name) {
            return Err(ImmunityError::ConfigurationIncomplete(format!(
                "immunizing-event type `{infection_name}` is registered more than once"
            )));
        }
        let variant = VariantId(self.variants.len());
        let infection_event = EventTypeId(self.event_types.len());
        self.event_types
            .insert(infection_name, EventClass::NaturalInfection(variant));
        self.variants.insert(name.to_string(), infection_event);
        Ok(variant)
    }

    /// Registers a vaccine product (primary series or booster) and returns
    /// the interned event-type ID.
    /// # Errors
    /// - If the event-type name is already registered
    pub fn register_vaccine(&mut self, name: &str) -> Result<EventTypeId, ImmunityError> {
        if self.event_types.contains_key(name) {
            return Err(ImmunityError::ConfigurationIncomplete(format!(
                "immunizing-event type `{name}` is registered more than once"
            )));
        }
        let id = EventTypeId(self.event_types.len());
        self.event_types.insert(name.to_string(), EventClass::Vaccine);
        Ok(id)
    }

    /// Returns the implicitly generated natural-infection event type for a
    /// registered variant.
    #[must_use]
    pub fn infection_event_type(&self, variant: VariantId) -> EventTypeId {
        self.variants[variant.0]
    }

    #[must_use]
    pub fn variant_id(&self, name: &str) -> Option<VariantId> {
        self.variants.get_index_of(name).map(VariantId)
    }

    #[must_use]
    pub fn event_type_id(&self, name: &str) -> Option<EventTypeId> {
        self.event_types.get_index_of(name).map(EventTypeId)
    }

    #[must_use]
    pub fn variant_name(&self, variant: VariantId) -> &str {
        self.variants
            .get_index(variant.0)
            .expect("variant ID out of range for this registry")
            .0
    }

    #[must_use]
    pub fn event_type_name(&self, event_type: EventTypeId) -> &str {
        self.event_types
            .get_index(event_type.0)
            .expect("event-type ID out of range for this registry")
            .0
    }

    #[must_use]
    pub fn event_class(&self, event_type: EventTypeId) -> EventClass {
        *self
            .event_types
            .get_index(event_type.0)
            .expect("event-type ID out of range for this registry")
            .1
    }

    #[must_use]
    pub fn num_variants(&self) -> usize {
        self.variants.len()
    }

    #[must_use]
    pub fn num_event_types(&self) -> usize {
        self.event_types.len()
    }

    pub fn variant_ids(&self) -> impl Iterator<Item = VariantId> {
        (0..self.variants.len()).map(VariantId)
    }

    pub fn event_type_ids(&self) -> impl Iterator<Item = EventTypeId> {
        (0..self.event_types.len()).map(EventTypeId)
    }
}

#[cfg(test)]
mod test {
    use super::{EventClass, ImmunityRegistry};
    use crate::error::ImmunityError;

    #[test]
    fn test_register_variant_creates_infection_event_type() {
        let mut registry = ImmunityRegistry::new();
        let wild = registry.register_variant("Wild").unwrap();
        let infection = registry.infection_event_type(wild);
        assert_eq!(registry.event_type_name(infection), "infection_Wild");
        assert_eq!(
            registry.event_class(infection),
            EventClass::NaturalInfection(wild)
        );
    }

    #[test]
    fn test_ids_are_dense_in_registration_order() {
        let mut registry = ImmunityRegistry::new();
        let wild = registry.register_variant("Wild").unwrap();
        let delta = registry.register_variant("Delta").unwrap();
        let mrna = registry.register_vaccine("mRNA_primary").unwrap();
        assert_eq!(wild.index(), 0);
        assert_eq!(delta.index(), 1);
        assert_eq!(mrna.index(), 2);
        assert_eq!(registry.num_variants(), 2);
        // Two implicit infection event types plus the vaccine
        assert_eq!(registry.num_event_types(), 3);
    }

    #[test]
    fn test_lookup_by_name() {
        let mut registry = ImmunityRegistry::new();
        let wild = registry.register_variant("Wild").unwrap();
        let mrna = registry.register_vaccine("mRNA_primary").unwrap();
        assert_eq!(registry.variant_id("Wild"), Some(wild));
        assert_eq!(registry.event_type_id("mRNA_primary"), Some(mrna));
        assert_eq!(registry.variant_id("Omicron"), None);
        assert_eq!(registry.variant_name(wild), "Wild");
        assert_eq!(registry.event_class(mrna), EventClass::Vaccine);
    }

    #[test]
    fn test_duplicate_variant_rejected() {
        let mut registry = ImmunityRegistry::new();
        registry.register_variant("Wild").unwrap();
        let e = registry.register_variant("Wild").err();
        match e {
            Some(ImmunityError::ConfigurationIncomplete(msg)) => {
                assert_eq!(msg, "variant `Wild` is registered more than once".to_string());
            }
            Some(ue) => panic!(
                "Expected an error that the variant is already registered. Instead got {:?}",
                ue.to_string()
            ),
            None => panic!("Expected an error. Instead, registration passed with no errors."),
        }
    }

    #[test]
    fn test_variant_colliding_with_vaccine_name_rejected() {
        let mut registry = ImmunityRegistry::new();
        let vaccine = registry.register_vaccine("infection_Wild").unwrap();
        let e = registry.register_variant("Wild").err();
        match e {
            Some(ImmunityError::ConfigurationIncomplete(msg)) => {
                assert_eq!(
                    msg,
                    "immunizing-event type `infection_Wild` is registered more than once"
                        .to_string()
                );
            }
            Some(ue) => panic!(
                "Expected an error that the event-type name is taken. Instead got {:?}",
                ue.to_string()
            ),
            None => panic!("Expected an error. Instead, registration passed with no errors."),
        }
        // The rejected registration must leave the registry untouched
        assert_eq!(registry.event_class(vaccine), EventClass::Vaccine);
        assert_eq!(registry.num_variants(), 0);
        assert_eq!(registry.num_event_types(), 1);
    }

    #[test]
    fn test_duplicate_vaccine_rejected() {
        let mut registry = ImmunityRegistry::new();
        registry.register_vaccine("mRNA_primary").unwrap();
        assert!(registry.register_vaccine("mRNA_primary").is_err());
    }
}
