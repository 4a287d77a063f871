// SPDX-FileCopyrightText: 2026 Ticketbot Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Preset dependency resolution.
//!
//! A preset field's options come from one level of the [`Catalogue`]. The
//! engine asks [`PresetResolver::options_for`] with the answers collected so
//! far; administration and settings sanitization use the eager
//! [`PresetResolver::resolve`] report.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::catalogue::{Catalogue, LEVEL_FIELDS, level_of};

/// Group name of the built-in schema.
pub const DEFAULT_GROUP: &str = "location";

/// Named groups of preset fields that questions may reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresetSchema {
    pub groups: BTreeMap<String, Vec<String>>,
}

impl Default for PresetSchema {
    fn default() -> Self {
        Self {
            groups: BTreeMap::from([(
                DEFAULT_GROUP.to_string(),
                LEVEL_FIELDS.iter().map(|f| f.to_string()).collect(),
            )]),
        }
    }
}

impl PresetSchema {
    /// Parse `{"groups": {"<group>": ["<field>", ...]}}`. Falls back to the
    /// built-in schema when nothing usable is present.
    pub fn from_value(value: &serde_json::Value) -> Self {
        let mut groups = BTreeMap::new();
        if let Some(raw_groups) = value.get("groups").and_then(|g| g.as_object()) {
            for (group, fields) in raw_groups {
                let group = group.trim();
                let Some(fields) = fields.as_array() else {
                    continue;
                };
                let mut seen = BTreeSet::new();
                let fields: Vec<String> = fields
                    .iter()
                    .filter_map(|f| f.as_str().map(str::trim))
                    .filter(|f| !f.is_empty() && seen.insert(f.to_string()))
                    .map(str::to_string)
                    .collect();
                if !group.is_empty() && !fields.is_empty() {
                    groups.insert(group.to_string(), fields);
                }
            }
        }
        if groups.is_empty() {
            return Self::default();
        }
        Self { groups }
    }

    /// Returns `true` if `(group, field)` names a known preset field.
    pub fn contains(&self, group: &str, field: &str) -> bool {
        self.groups
            .get(group)
            .is_some_and(|fields| fields.iter().any(|f| f == field))
    }

    /// Distinct field names across all groups, sorted.
    pub fn fields(&self) -> BTreeSet<&str> {
        self.groups
            .values()
            .flat_map(|fields| fields.iter().map(String::as_str))
            .collect()
    }
}

/// Which upstream answers make an option reachable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionDependency {
    /// Upstream field → the values it may take for this option.
    pub upstream: BTreeMap<String, Vec<String>>,
    /// Distinct upstream tuples, listed only when there is more than one.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub paths: Vec<Vec<String>>,
}

/// Resolution result for one preset field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldOptions {
    pub options: Vec<String>,
    pub option_dependencies: BTreeMap<String, OptionDependency>,
}

/// Computes option lists for preset fields from a catalogue.
#[derive(Debug, Clone, Default)]
pub struct PresetResolver {
    catalogue: Catalogue,
    schema: PresetSchema,
}

impl PresetResolver {
    pub fn new(catalogue: Catalogue, schema: PresetSchema) -> Self {
        Self { catalogue, schema }
    }

    pub fn catalogue(&self) -> &Catalogue {
        &self.catalogue
    }

    pub fn schema(&self) -> &PresetSchema {
        &self.schema
    }

    /// Eagerly compute options and dependencies for every schema field.
    ///
    /// Fields that do not map to a catalogue level get an empty option list.
    pub fn resolve(&self) -> BTreeMap<String, FieldOptions> {
        let paths = self.catalogue.paths();
        self.schema
            .fields()
            .into_iter()
            .map(|field| {
                let resolved = match level_of(field) {
                    Some(level) => resolve_level(&paths, level),
                    None => FieldOptions::default(),
                };
                (field.to_string(), resolved)
            })
            .collect()
    }

    /// Sorted options for `field` that are consistent with `answers`.
    ///
    /// Every answered catalogue field (other than `field` itself) must lie on
    /// the same catalogue path as the returned option.
    pub fn options_for(&self, field: &str, answers: &BTreeMap<String, String>) -> Vec<String> {
        let Some(level) = self.catalogue_level(field) else {
            return Vec::new();
        };
        let constraints: Vec<(usize, &str)> = LEVEL_FIELDS
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != level)
            .filter_map(|(i, name)| answers.get(*name).map(|v| (i, v.trim())))
            .collect();

        let options: BTreeSet<&str> = self
            .catalogue
            .paths()
            .into_iter()
            .filter(|path| path.len() > level)
            .filter(|path| {
                constraints
                    .iter()
                    .all(|(i, value)| path.get(*i).is_some_and(|p| p == value))
            })
            .map(|path| path[level])
            .collect();
        options.into_iter().map(str::to_string).collect()
    }

    /// Every option of `field`, ignoring answers.
    pub fn all_options(&self, field: &str) -> Vec<String> {
        self.options_for(field, &BTreeMap::new())
    }

    fn catalogue_level(&self, field: &str) -> Option<usize> {
        if !self.schema.fields().contains(field) {
            return None;
        }
        level_of(field)
    }
}

fn resolve_level(paths: &[Vec<&str>], level: usize) -> FieldOptions {
    let mut by_option: BTreeMap<&str, BTreeSet<&[&str]>> = BTreeMap::new();
    for path in paths.iter().filter(|p| p.len() > level) {
        by_option
            .entry(path[level])
            .or_default()
            .insert(&path[..level]);
    }

    let mut resolved = FieldOptions::default();
    for (option, ancestors) in by_option {
        resolved.options.push(option.to_string());
        if level == 0 {
            continue;
        }
        let mut dependency = OptionDependency::default();
        for (i, upstream_field) in LEVEL_FIELDS.iter().enumerate().take(level) {
            let values: BTreeSet<&str> = ancestors.iter().map(|a| a[i]).collect();
            dependency.upstream.insert(
                upstream_field.to_string(),
                values.into_iter().map(str::to_string).collect(),
            );
        }
        if ancestors.len() > 1 {
            dependency.paths = ancestors
                .iter()
                .map(|a| a.iter().map(|s| s.to_string()).collect())
                .collect();
        }
        resolved
            .option_dependencies
            .insert(option.to_string(), dependency);
    }
    resolved
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn resolver(catalogue: serde_json::Value) -> PresetResolver {
        PresetResolver::new(Catalogue::from_value(&catalogue), PresetSchema::default())
    }

    fn answers(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn single_path_resolves_every_level() {
        let r = resolver(json!({"Acme": {"Cafe": {"Berlin": ["Store A"]}}}));
        let report = r.resolve();
        assert_eq!(report["business"].options, vec!["Acme"]);
        assert_eq!(report["location_name"].options, vec!["Store A"]);
        let dep = &report["city"].option_dependencies["Berlin"];
        assert_eq!(dep.upstream["business"], vec!["Acme"]);
        assert_eq!(dep.upstream["location_type"], vec!["Cafe"]);
        assert!(dep.paths.is_empty());
    }

    #[test]
    fn recurring_city_lists_ambiguous_paths() {
        let r = resolver(json!({
            "Acme": {"Cafe": {"Berlin": ["A1"]}},
            "Beta": {"Bar": {"Berlin": ["B1"], "Munich": ["B2"]}}
        }));
        let report = r.resolve();
        assert_eq!(report["city"].options, vec!["Berlin", "Munich"]);
        let berlin = &report["city"].option_dependencies["Berlin"];
        assert_eq!(berlin.upstream["business"], vec!["Acme", "Beta"]);
        assert_eq!(
            berlin.paths,
            vec![
                vec!["Acme".to_string(), "Cafe".to_string()],
                vec!["Beta".to_string(), "Bar".to_string()],
            ]
        );
        assert!(report["city"].option_dependencies["Munich"].paths.is_empty());
    }

    #[test]
    fn options_are_filtered_by_answers() {
        let r = resolver(json!({
            "Acme": {"Cafe": {"Berlin": ["A1"]}, "Shop": {"Hamburg": ["A2"]}},
            "Beta": {"Bar": {"Berlin": ["B1"]}}
        }));
        assert_eq!(
            r.options_for("location_type", &answers(&[("business", "Acme")])),
            vec!["Cafe", "Shop"]
        );
        assert_eq!(
            r.options_for("city", &answers(&[("business", "Beta")])),
            vec!["Berlin"]
        );
        assert_eq!(
            r.options_for(
                "location_name",
                &answers(&[("business", "Acme"), ("city", "Berlin")])
            ),
            vec!["A1"]
        );
    }

    #[test]
    fn downstream_answers_constrain_too() {
        let r = resolver(json!({
            "Acme": {"Cafe": {"Berlin": ["A1"]}},
            "Beta": {"Bar": {"Munich": ["B1"]}}
        }));
        assert_eq!(
            r.options_for("business", &answers(&[("city", "Munich")])),
            vec!["Beta"]
        );
    }

    #[test]
    fn unknown_field_is_unconstrained() {
        let schema = PresetSchema::from_value(&json!({
            "groups": {"location": ["business", "department"]}
        }));
        let r = PresetResolver::new(
            Catalogue::from_value(&json!({"Acme": {"Cafe": {"Berlin": ["A"]}}})),
            schema,
        );
        assert!(r.all_options("department").is_empty());
        assert!(r.resolve()["department"].options.is_empty());
        // Not in this schema, so not resolved either.
        assert!(r.all_options("city").is_empty());
    }

    #[test]
    fn schema_falls_back_to_default() {
        assert_eq!(PresetSchema::from_value(&json!({})), PresetSchema::default());
        assert_eq!(
            PresetSchema::from_value(&json!({"groups": {"  ": ["x"], "g": []}})),
            PresetSchema::default()
        );
        assert!(PresetSchema::default().contains("location", "city"));
        assert!(!PresetSchema::default().contains("location", "floor"));
    }

    #[test]
    fn empty_catalogue_gives_empty_options() {
        let r = resolver(json!({}));
        assert!(r.resolve().values().all(|f| f.options.is_empty()));
    }
}
