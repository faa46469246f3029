//! Latency benchmarks for the inference path
//!
//! Covers feature transformation, a single forest prediction, and the
//! three-model defensive composition.
//!
//! Run with: cargo bench -p playcaller-models

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use playcaller_core::{ModelName, SituationInput};
use playcaller_models::{compose_defense, predict_situation, transform, FeatureFamily, ModelRegistry, ModelSource};

/// Build a balanced forest of `n_trees` depth-3 trees over `n_features` columns
fn forest_json(feature_names: &[&str], classes: &str, n_classes: usize, n_trees: usize) -> String {
    let leaf = |seed: usize| {
        let weights: Vec<String> = (0..n_classes)
            .map(|c| format!("{}.0", 1 + (seed + c) % 5))
            .collect();
        format!(r#"{{ "value": [{}] }}"#, weights.join(", "))
    };

    let trees: Vec<String> = (0..n_trees)
        .map(|t| {
            let f = |k: usize| (t + k) % feature_names.len();
            format!(
                r#"{{ "nodes": [
                    {{ "feature": {}, "threshold": 2.5, "left": 1, "right": 4 }},
                    {{ "feature": {}, "threshold": 5.5, "left": 2, "right": 3 }},
                    {}, {},
                    {{ "feature": {}, "threshold": 30.5, "left": 5, "right": 6 }},
                    {}, {}
                ] }}"#,
                f(0),
                f(1),
                leaf(t),
                leaf(t + 1),
                f(2),
                leaf(t + 2),
                leaf(t + 3)
            )
        })
        .collect();

    let names: Vec<String> = feature_names.iter().map(|n| format!("\"{}\"", n)).collect();
    format!(
        r#"{{ "kind": "random_forest", "feature_names": [{}], "classes": {}, "trees": [{}] }}"#,
        names.join(", "),
        classes,
        trees.join(", ")
    )
}

fn registry(n_trees: usize) -> ModelRegistry {
    let offense = FeatureFamily::Offense.feature_names();
    let defense = FeatureFamily::Defense.feature_names();

    let mut registry = ModelRegistry::new();
    registry.load(
        ModelName::Offense,
        &ModelSource::Inline(forest_json(offense, r#"["pass", "run"]"#, 2, n_trees)),
    );
    registry.load(
        ModelName::Pressure,
        &ModelSource::Inline(forest_json(defense, "[0, 1]", 2, n_trees)),
    );
    registry.load(
        ModelName::Coverage,
        &ModelSource::Inline(forest_json(defense, r#"["Base", "Cover 1", "Cover 3"]"#, 3, n_trees)),
    );
    registry.load(
        ModelName::Front,
        &ModelSource::Inline(forest_json(defense, r#"["3-man", "4-man"]"#, 2, n_trees)),
    );
    registry
}

fn benchmark_transform(c: &mut Criterion) {
    let input = SituationInput::new(3, 9, 35, 2, -3).with_seconds_remaining(240);

    let mut group = c.benchmark_group("Feature_Transform");
    for family in [FeatureFamily::Offense, FeatureFamily::Defense] {
        group.bench_with_input(BenchmarkId::new("transform", format!("{:?}", family)), &family, |b, family| {
            b.iter(|| transform(black_box(&input), *family))
        });
    }
    group.finish();
}

fn benchmark_predictions(c: &mut Criterion) {
    let input = SituationInput::new(3, 9, 35, 2, -3).with_seconds_remaining(240);

    let mut group = c.benchmark_group("Forest_Prediction");
    group.sample_size(100);

    for n_trees in [10, 100] {
        let registry = registry(n_trees);

        group.bench_with_input(BenchmarkId::new("offense", n_trees), &registry, |b, registry| {
            b.iter(|| predict_situation(registry, ModelName::Offense, black_box(&input)).unwrap())
        });

        group.bench_with_input(BenchmarkId::new("defense_composed", n_trees), &registry, |b, registry| {
            b.iter(|| compose_defense(registry, black_box(&input)).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_transform, benchmark_predictions);
criterion_main!(benches);
