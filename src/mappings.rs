//! Result post-processing
//!
//! Pure projections over fetched record sequences: VAT configuration maps,
//! attribute to variation linking, minimal price configurations, shipping
//! package summaries and property name maps. All of them work on raw
//! records so they compose with any fetch result.

use crate::types::Record;
use serde_json::{json, Map, Value};
use tracing::warn;

// ============================================================================
// VAT
// ============================================================================

/// Map each country id to its tax id and VAT configuration ids.
///
/// A country can carry several configurations (differing date ranges or
/// restrictions); all of their ids are collected under one entry. An
/// optional subset restricts the mapping to the given country ids.
pub fn vat_id_mapping(records: &[Record], subset: Option<&[i64]>) -> Map<String, Value> {
    let mut mapping = Map::new();
    for entry in records {
        let Some(country_id) = entry.get("countryId").and_then(Value::as_i64) else {
            continue;
        };
        if subset.is_some_and(|subset| !subset.contains(&country_id)) {
            continue;
        }
        let Some(config_id) = entry.get("id").and_then(Value::as_i64) else {
            continue;
        };

        let country = country_id.to_string();
        match mapping.get_mut(&country) {
            Some(existing) => {
                if let Some(configs) = existing
                    .get_mut("config")
                    .and_then(Value::as_array_mut)
                {
                    configs.push(json!(config_id.to_string()));
                }
            }
            None => {
                mapping.insert(
                    country,
                    json!({
                        "config": [config_id.to_string()],
                        "TaxId": entry.get("taxIdNumber").cloned().unwrap_or(Value::Null),
                    }),
                );
            }
        }
    }
    mapping
}

// ============================================================================
// Attributes
// ============================================================================

/// Attach a `linked_variations` list to every attribute value.
///
/// The variations must carry `variationAttributeValues` (fetched with the
/// matching `with` argument); without them the attributes are returned
/// unchanged with a warning.
pub fn link_variations(mut attributes: Vec<Record>, variations: &[Record]) -> Vec<Record> {
    if attributes.is_empty() || variations.is_empty() {
        return attributes;
    }

    // attribute id -> value id -> variation ids
    let mut value_id_map: Map<String, Value> = Map::new();
    for variation in variations {
        let Some(attribute_values) = variation
            .get("variationAttributeValues")
            .and_then(Value::as_array)
        else {
            warn!("variations without attribute values used for attribute mapping");
            return attributes;
        };
        let Some(variation_id) = variation.get("id").cloned() else {
            continue;
        };
        for attribute_value in attribute_values {
            let (Some(attr_id), Some(value_id)) = (
                attribute_value.get("attributeId").and_then(Value::as_i64),
                attribute_value.get("valueId").and_then(Value::as_i64),
            ) else {
                continue;
            };
            let per_attribute = value_id_map
                .entry(attr_id.to_string())
                .or_insert_with(|| json!({}));
            if let Some(per_value) = per_attribute.as_object_mut() {
                let entry = per_value
                    .entry(value_id.to_string())
                    .or_insert_with(|| json!([]));
                if let Some(list) = entry.as_array_mut() {
                    list.push(variation_id.clone());
                }
            }
        }
    }

    for attribute in &mut attributes {
        let Some(attr_id) = attribute.get("id").and_then(Value::as_i64) else {
            continue;
        };
        let Some(per_attribute) = value_id_map.get(&attr_id.to_string()) else {
            continue;
        };
        let Some(values) = attribute.get_mut("values").and_then(Value::as_array_mut) else {
            continue;
        };
        for value in values {
            let Some(value_id) = value.get("id").and_then(Value::as_i64) else {
                continue;
            };
            if let Some(linked) = per_attribute.get(value_id.to_string()) {
                value["linked_variations"] = linked.clone();
            }
        }
    }

    attributes
}

// ============================================================================
// Prices
// ============================================================================

/// Reduce a sales price configuration to the ids that identify it.
///
/// Drops date information and the extra mapping layers; what remains is
/// enough to assign prices to variations.
pub fn shrink_price_configuration(data: &Record) -> Record {
    let Some(source) = data.as_object() else {
        return json!({});
    };

    let mut configuration = json!({
        "id": 0,
        "type": "",
        "position": 0,
        "names": {},
        "referrers": [],
        "accounts": [],
        "clients": [],
        "countries": [],
        "currencies": [],
        "customerClasses": [],
    });

    for key in ["id", "type", "position"] {
        if let Some(value) = source.get(key) {
            configuration[key] = value.clone();
        }
    }

    let key_subkey_map = [
        ("clients", "plentyId"),
        ("countries", "countryId"),
        ("currencies", "currency"),
        ("customerClasses", "customerClassId"),
        ("referrers", "referrerId"),
    ];
    for (key, subkey) in key_subkey_map {
        let Some(entities) = source.get(key).and_then(Value::as_array) else {
            continue;
        };
        let values: Vec<Value> = entities
            .iter()
            .filter_map(|entity| entity.get(subkey).cloned())
            .collect();
        configuration[key] = Value::Array(values);
    }

    // Names are keyed by language instead of listed
    if let Some(names) = source.get("names").and_then(Value::as_array) {
        for name in names {
            if let (Some(lang), Some(external)) = (
                name.get("lang").and_then(Value::as_str),
                name.get("nameExternal"),
            ) {
                configuration["names"][lang] = external.clone();
            }
        }
    }

    configuration
}

// ============================================================================
// Shipping packages
// ============================================================================

/// Summary depth for shipping package exports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageSummary {
    /// Only package number and per-variation quantities
    Minimal,
    /// The full package records including their raw content
    Full,
}

/// Summarize a list of packages (each with a fetched `content` list)
pub fn summarize_shipment_packages(packages: &[Record], mode: PackageSummary) -> Vec<Record> {
    match mode {
        PackageSummary::Full => packages.to_vec(),
        PackageSummary::Minimal => packages
            .iter()
            .map(|package| {
                let content: Vec<Value> = package
                    .get("content")
                    .and_then(Value::as_array)
                    .map_or(&[][..], Vec::as_slice)
                    .iter()
                    .map(|item| {
                        let mut entry = json!({
                            "variationId": item.get("itemVariationId")
                                .or_else(|| item.get("variationId"))
                                .cloned()
                                .unwrap_or(Value::Null),
                            "quantity": item.get("itemQuantity")
                                .or_else(|| item.get("quantity"))
                                .cloned()
                                .unwrap_or(Value::Null),
                        });
                        for key in ["batch", "bestBeforeDate"] {
                            if let Some(value) = item.get(key) {
                                entry[key] = value.clone();
                            }
                        }
                        entry
                    })
                    .collect();
                json!({
                    "id": package.get("id").cloned().unwrap_or(Value::Null),
                    "packageNumber": package.get("packageNumber").cloned()
                        .unwrap_or(Value::Null),
                    "content": content,
                })
            })
            .collect(),
    }
}

// ============================================================================
// Properties
// ============================================================================

/// Map property ids to their names per language.
///
/// Optional filters restrict the result to given property ids or languages;
/// records failing either filter are skipped.
pub fn property_name_map(
    records: &[Record],
    property_ids: Option<&[i64]>,
    langs: Option<&[String]>,
) -> Map<String, Value> {
    let mut mapping = Map::new();
    for record in records {
        let (Some(property_id), Some(lang), Some(name)) = (
            record.get("propertyId").and_then(Value::as_i64),
            record.get("lang").and_then(Value::as_str),
            record.get("name"),
        ) else {
            continue;
        };
        if property_ids.is_some_and(|ids| !ids.contains(&property_id)) {
            continue;
        }
        if langs.is_some_and(|langs| !langs.iter().any(|l| l == lang)) {
            continue;
        }
        mapping
            .entry(property_id.to_string())
            .or_insert_with(|| json!({}))[lang] = name.clone();
    }
    mapping
}

/// Map property ids to selection ids to per-language values
pub fn selection_map(records: &[Record]) -> Map<String, Value> {
    let mut mapping = Map::new();
    for selection in records {
        let (Some(property_id), Some(selection_id)) = (
            selection.get("propertyId").and_then(Value::as_i64),
            selection.get("id").and_then(Value::as_i64),
        ) else {
            continue;
        };
        let values = selection
            .pointer("/relation/relationValues")
            .and_then(Value::as_array)
            .map_or(&[][..], Vec::as_slice);

        let per_property = mapping
            .entry(property_id.to_string())
            .or_insert_with(|| json!({}));
        let entry = &mut per_property[selection_id.to_string()];
        if entry.is_null() {
            *entry = json!({});
        }
        for value in values {
            if let (Some(lang), Some(text)) = (
                value.get("lang").and_then(Value::as_str),
                value.get("value"),
            ) {
                entry[lang] = text.clone();
            }
        }
    }
    mapping
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_vat_id_mapping_groups_configs_per_country() {
        let records = vec![
            json!({"id": 1, "countryId": 1, "taxIdNumber": "DE12345"}),
            json!({"id": 7, "countryId": 1, "taxIdNumber": "DE12345"}),
            json!({"id": 3, "countryId": 14, "taxIdNumber": "AT98765"}),
        ];
        let mapping = vat_id_mapping(&records, None);
        assert_eq!(mapping["1"]["TaxId"], "DE12345");
        assert_eq!(mapping["1"]["config"], json!(["1", "7"]));
        assert_eq!(mapping["14"]["config"], json!(["3"]));

        let subset = vat_id_mapping(&records, Some(&[14]));
        assert!(!subset.contains_key("1"));
        assert!(subset.contains_key("14"));
    }

    #[test]
    fn test_link_variations_attaches_matches() {
        let attributes = vec![json!({
            "id": 3,
            "backendName": "color",
            "values": [{"id": 10, "backendName": "red"}, {"id": 11, "backendName": "blue"}],
        })];
        let variations = vec![
            json!({"id": 100, "variationAttributeValues": [{"attributeId": 3, "valueId": 10}]}),
            json!({"id": 101, "variationAttributeValues": [{"attributeId": 3, "valueId": 10}]}),
        ];

        let linked = link_variations(attributes, &variations);
        assert_eq!(
            linked[0]["values"][0]["linked_variations"],
            json!([100, 101])
        );
        // No variation carries the second value
        assert!(linked[0]["values"][1].get("linked_variations").is_none());
    }

    #[test]
    fn test_link_variations_without_attribute_values_is_a_no_op() {
        let attributes = vec![json!({"id": 3, "values": []})];
        let variations = vec![json!({"id": 100})];
        let linked = link_variations(attributes.clone(), &variations);
        assert_eq!(linked, attributes);
    }

    #[test]
    fn test_shrink_price_configuration() {
        let full = json!({
            "id": 5,
            "type": "default",
            "position": 0,
            "createdAt": "2020-01-01",
            "names": [{"lang": "de", "nameExternal": "Preis", "nameInternal": "x"}],
            "clients": [{"plentyId": 1000, "createdAt": "2020-01-01"}],
            "countries": [{"countryId": 1}],
            "currencies": [{"currency": "EUR"}],
            "customerClasses": [{"customerClassId": 1}],
            "referrers": [{"referrerId": 2}],
            "accounts": [],
        });
        let minimal = shrink_price_configuration(&full);
        assert_eq!(minimal["id"], 5);
        assert_eq!(minimal["names"]["de"], "Preis");
        assert_eq!(minimal["clients"], json!([1000]));
        assert_eq!(minimal["currencies"], json!(["EUR"]));
        assert_eq!(minimal["referrers"], json!([2]));
        assert!(minimal.get("createdAt").is_none());
    }

    #[test]
    fn test_summarize_packages_minimal() {
        let packages = vec![json!({
            "id": 40,
            "packageNumber": "PK-40",
            "weight": 1200,
            "content": [
                {"itemVariationId": 2345, "itemQuantity": 3, "batch": "B-1"},
                {"itemVariationId": 2346, "itemQuantity": 1},
            ],
        })];

        let minimal = summarize_shipment_packages(&packages, PackageSummary::Minimal);
        assert_eq!(minimal[0]["packageNumber"], "PK-40");
        assert!(minimal[0].get("weight").is_none());
        assert_eq!(minimal[0]["content"][0]["variationId"], 2345);
        assert_eq!(minimal[0]["content"][0]["quantity"], 3);
        assert_eq!(minimal[0]["content"][0]["batch"], "B-1");

        let full = summarize_shipment_packages(&packages, PackageSummary::Full);
        assert_eq!(full, packages);
    }

    #[test]
    fn test_property_name_map_filters() {
        let records = vec![
            json!({"propertyId": 1, "lang": "de", "name": "Farbe"}),
            json!({"propertyId": 1, "lang": "en", "name": "Color"}),
            json!({"propertyId": 2, "lang": "de", "name": "Material"}),
        ];

        let all = property_name_map(&records, None, None);
        assert_eq!(all["1"]["de"], "Farbe");
        assert_eq!(all["1"]["en"], "Color");
        assert_eq!(all["2"]["de"], "Material");

        let filtered =
            property_name_map(&records, Some(&[1]), Some(&["en".to_string()]));
        assert_eq!(filtered["1"], json!({"en": "Color"}));
        assert!(!filtered.contains_key("2"));
    }

    #[test]
    fn test_selection_map() {
        let records = vec![json!({
            "id": 30,
            "propertyId": 7,
            "relation": {"relationValues": [
                {"lang": "de", "value": "Rot"},
                {"lang": "en", "value": "Red"},
            ]},
        })];
        let mapping = selection_map(&records);
        assert_eq!(mapping["7"]["30"]["de"], "Rot");
        assert_eq!(mapping["7"]["30"]["en"], "Red");
    }
}
