// SPDX-FileCopyrightText: 2026 Ticketbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Property tests for preset resolution and template sanitizing.

use std::collections::BTreeMap;

use proptest::prelude::*;
use serde_json::{Map, Value, json};
use ticketbot_intake::catalogue::LEVEL_FIELDS;
use ticketbot_intake::{Catalogue, PresetResolver, PresetSchema, sanitize};

/// Catalogue trees over a small alphabet so values recur across branches.
fn catalogue_strategy() -> impl Strategy<Value = Value> {
    let name = prop::sample::select(vec!["A", "B", "C", "D"]);
    let leaf = prop::collection::vec(name.clone(), 1..3)
        .prop_map(|names| Value::Array(names.into_iter().map(Value::from).collect()));
    leaf.prop_recursive(3, 32, 3, move |inner| {
        prop::collection::btree_map(name.clone(), inner, 1..3).prop_map(|map| {
            Value::Object(
                map.into_iter()
                    .map(|(k, v)| (k.to_string(), v))
                    .collect::<Map<String, Value>>(),
            )
        })
    })
}

fn resolver(catalogue: &Value) -> PresetResolver {
    PresetResolver::new(Catalogue::from_value(catalogue), PresetSchema::default())
}

proptest! {
    #[test]
    fn offered_options_lie_on_a_catalogue_path(catalogue in catalogue_strategy(), picks in prop::collection::vec(any::<prop::sample::Index>(), 4)) {
        let resolver = resolver(&catalogue);
        let paths: Vec<Vec<String>> = resolver
            .catalogue()
            .paths()
            .into_iter()
            .map(|p| p.into_iter().map(str::to_string).collect())
            .collect();

        let mut answers = BTreeMap::new();
        for (level, field) in LEVEL_FIELDS.iter().enumerate() {
            let options = resolver.options_for(field, &answers);
            for option in &options {
                let reachable = paths.iter().any(|path| {
                    path.get(level) == Some(option)
                        && LEVEL_FIELDS[..level]
                            .iter()
                            .enumerate()
                            .all(|(i, f)| answers.get(*f).is_none_or(|a| path.get(i) == Some(a)))
                });
                prop_assert!(reachable, "{field}={option} is not on any path");
            }
            if options.is_empty() {
                break;
            }
            let choice = picks[level].get(&options).clone();
            answers.insert(field.to_string(), choice);
        }
    }

    #[test]
    fn eager_resolution_matches_lazy_lookup(catalogue in catalogue_strategy()) {
        let resolver = resolver(&catalogue);
        let report = resolver.resolve();
        for field in LEVEL_FIELDS {
            prop_assert_eq!(&report[field].options, &resolver.all_options(field));
        }
    }

    #[test]
    fn rating_responses_cover_the_whole_scale(
        scale in -5i64..40,
        responses in prop::collection::btree_map(0u8..50, "[a-z ]{0,8}", 0..12),
    ) {
        let responses: Map<String, Value> = responses
            .into_iter()
            .map(|(k, v)| (k.to_string(), Value::from(v)))
            .collect();
        let raw = json!({
            "rating_templates": [{"id": "r", "scale_size": scale, "responses": responses}]
        });
        let settings = sanitize(&raw, &PresetResolver::default(), 10);
        let template = &settings.rating_templates[0];
        prop_assert!((1..=10).contains(&template.scale_size));
        prop_assert_eq!(template.responses.len(), usize::from(template.scale_size));
        for value in 1..=template.scale_size {
            prop_assert!(template.response_for(value).is_some_and(|t| !t.is_empty()));
        }
        prop_assert!(template.response_for(template.scale_size + 1).is_none());
    }
}
