use criterion::Criterion;
use epi_immunity::{
    protection, DayCurve, EventKinetics, ImmunityModel, ImmunityModelBuilder, Interpolation,
    OutcomeKind, PersonImmuneLedger, VariantId,
};
use std::hint::black_box;

/// Four variants, two vaccines, and the implicit infection event types, with
/// a waning curve on every event type.
fn build_model() -> (ImmunityModel, Vec<VariantId>) {
    let mut builder = ImmunityModelBuilder::new();
    let variants: Vec<VariantId> = ["Wild", "Alpha", "Delta", "Omicron"]
        .iter()
        .map(|name| {
            builder
                .register_variant(name, 0.2, 1.2)
                .expect("Valid variant registration")
        })
        .collect();
    let mut event_types = vec![
        builder
            .register_vaccine("mRNA_primary")
            .expect("Valid vaccine registration"),
        builder
            .register_vaccine("mRNA_booster")
            .expect("Valid vaccine registration"),
    ];
    for &variant in &variants {
        event_types.push(builder.infection_event_type(variant));
    }

    let waning = DayCurve::builder(Interpolation::Exponential)
        .at_day(0.0, 1.0)
        .at_day(60.0, 0.5)
        .build()
        .expect("Valid waning curve");
    for (i, &event_type) in event_types.iter().enumerate() {
        builder
            .set_kinetics(
                event_type,
                EventKinetics::new(21.0, waning.clone()).expect("Valid kinetics"),
            )
            .expect("Registered event type");
        for (j, &variant) in variants.iter().enumerate() {
            #[allow(clippy::cast_precision_loss)]
            let peak = 5.0 + (i * variants.len() + j) as f64;
            builder
                .set_peak_titer(event_type, variant, peak)
                .expect("Registered IDs");
            builder
                .set_refresh_factor(event_type, variant, 1.5)
                .expect("Registered IDs");
        }
    }
    let model = builder.seal().expect("Complete model configuration");
    (model, variants)
}

pub fn titer_query_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("ledger::titer");
    let (model, variants) = build_model();
    let registry = model.registry();
    let mrna = registry.event_type_id("mRNA_primary").expect("Registered");
    let booster = registry.event_type_id("mRNA_booster").expect("Registered");
    let infection_delta = registry.infection_event_type(variants[2]);

    // A realistic lifetime history: primary series, booster, breakthrough
    let mut ledger = PersonImmuneLedger::with_response_multiplier(&model, 1.3);
    ledger.record_event(mrna, 0);
    ledger.record_event(booster, 180);
    ledger.record_event(infection_delta, 400);
    let wild = variants[0];

    group.bench_function("titer_cold", |b| {
        // Advance the day each iteration so the same-day cache misses
        let mut day = 401;
        b.iter(|| {
            day += 1;
            black_box(ledger.titer(&model, black_box(wild), black_box(day)));
        });
    });

    group.bench_function("titer_cached_same_day", |b| {
        ledger.titer(&model, wild, 500);
        b.iter(|| {
            black_box(ledger.titer(&model, black_box(wild), black_box(500)));
        });
    });

    group.bench_function("protection_blocks_infection", |b| {
        b.iter(|| {
            black_box(protection(
                &model,
                &ledger,
                black_box(wild),
                black_box(450),
                OutcomeKind::BlocksInfection,
            ));
        });
    });

    group.bench_function("protection_severity_modifier", |b| {
        b.iter(|| {
            black_box(protection(
                &model,
                &ledger,
                black_box(wild),
                black_box(450),
                OutcomeKind::SevereGivenSymptomatic,
            ));
        });
    });

    group.finish();
}
