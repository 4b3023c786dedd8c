//! Transfer templates for redistributions and reorders
//!
//! Creating a warehouse transfer takes multiple API calls: the order itself,
//! one transaction per storage location, and a booking step. The
//! [`TransferTemplate`] describes the whole movement up front; the builders
//! here turn it into the individual request payloads.

use crate::query::parse_w3c_date;
use crate::routes::order_types;
use crate::types::{ApiError, ReasonCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::error;

// ============================================================================
// Template types
// ============================================================================

/// A quantity assigned to one storage location
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LocationQuantity {
    /// Storage location id
    pub location_id: i64,
    /// Quantity moved at this location
    pub quantity: i64,
}

/// One source location of a transfer, with optional destination targets
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransferLocation {
    /// Storage location id the stock leaves from
    pub location_id: i64,
    /// Quantity taken from this location
    pub quantity: i64,
    /// Destination locations; their quantities must sum up to `quantity`
    #[serde(default)]
    pub targets: Vec<LocationQuantity>,
}

/// One variation moved by the transfer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransferVariation {
    /// Variation id on PlentyMarkets
    pub variation_id: i64,
    /// Display name for the order item
    pub name: String,
    /// Total quantity across all locations
    pub total_quantity: i64,
    /// Gross price per unit in system currency
    #[serde(default)]
    pub amount: Option<f64>,
    /// Optional referrer for the order item
    #[serde(default)]
    pub referrer_id: Option<i64>,
    /// Source locations; empty means no transactions for this variation
    #[serde(default)]
    pub locations: Vec<TransferLocation>,
    /// Batch number carried into every transaction
    #[serde(default)]
    pub batch: Option<String>,
    /// Best before date carried into every transaction
    #[serde(default)]
    pub best_before_date: Option<String>,
    /// Free-form identification carried into every transaction
    #[serde(default)]
    pub identification: Option<String>,
}

/// Blueprint for a redistribution or reorder
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransferTemplate {
    /// Plenty id (client/mandant) the order belongs to
    pub plenty_id: i64,
    /// Sender warehouse id (redistribution) or contact id (reorder)
    pub sender: i64,
    /// Receiver warehouse id
    pub receiver: i64,
    /// Variations moved by this transfer
    pub variations: Vec<TransferVariation>,
}

/// Which transfer order type a template is built into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferKind {
    /// Warehouse to warehouse movement
    Redistribution,
    /// Supplier contact to warehouse movement
    Reorder,
}

impl TransferKind {
    /// The order type id for this transfer
    pub fn type_id(self) -> i64 {
        match self {
            Self::Redistribution => order_types::REDISTRIBUTION,
            Self::Reorder => order_types::REORDER,
        }
    }

    /// The reference type of the sender relation
    fn sender_reference_type(self) -> &'static str {
        match self {
            Self::Redistribution => "warehouse",
            Self::Reorder => "contact",
        }
    }
}

// ============================================================================
// Validation
// ============================================================================

/// Check that the template quantities are consistent.
///
/// Per variation the location quantities must sum to the total quantity, and
/// per location the target quantities must sum to the location quantity.
/// Variations without locations skip the check.
pub fn validate_template(template: &TransferTemplate) -> Result<(), ApiError> {
    for variation in &template.variations {
        if variation.locations.is_empty() {
            continue;
        }
        let located: i64 = variation.locations.iter().map(|l| l.quantity).sum();
        if located != variation.total_quantity {
            error!(
                "Absolute quantity doesn't match the individual quantities for variation {}",
                variation.variation_id
            );
            return Err(ApiError::with_message(
                ReasonCode::InvalidTemplate,
                format!(
                    "location quantities don't sum to the total for variation {}",
                    variation.variation_id
                ),
            ));
        }
        for location in &variation.locations {
            if location.targets.is_empty() {
                continue;
            }
            let targeted: i64 = location.targets.iter().map(|t| t.quantity).sum();
            if targeted != location.quantity {
                error!(
                    "Quantity of location {} doesn't match the sum of its target locations \
                     for variation {}",
                    location.location_id, variation.variation_id
                );
                return Err(ApiError::with_message(
                    ReasonCode::InvalidTemplate,
                    format!(
                        "target quantities don't sum to location {} for variation {}",
                        location.location_id, variation.variation_id
                    ),
                ));
            }
        }
    }
    Ok(())
}

// ============================================================================
// Payload builders
// ============================================================================

/// Build the order creation payload for the transfer POST route
pub fn build_order_payload(kind: TransferKind, template: &TransferTemplate) -> Value {
    let order_items: Vec<Value> = template
        .variations
        .iter()
        .map(|variation| {
            let mut item = json!({
                "typeId": 1,
                "itemVariationId": variation.variation_id,
                "quantity": variation.total_quantity,
                "orderItemName": variation.name,
                "amounts": [{
                    "isSystemCurrency": true,
                    "priceOriginalGross": variation.amount.unwrap_or(0.0),
                }],
            });
            if let Some(referrer_id) = variation.referrer_id {
                item["referrerId"] = json!(referrer_id);
            }
            item
        })
        .collect();

    json!({
        "typeId": kind.type_id(),
        "plentyId": template.plenty_id,
        "orderItems": order_items,
        "relations": [
            {
                "referenceType": kind.sender_reference_type(),
                "referenceId": template.sender,
                "relation": "sender",
            },
            {
                "referenceType": "warehouse",
                "referenceId": template.receiver,
                "relation": "receiver",
            },
        ],
    })
}

fn build_transaction(
    order_item_id: i64,
    location_id: i64,
    quantity: i64,
    direction: &str,
    variation: &TransferVariation,
) -> Value {
    let mut transaction = json!({
        "orderItemId": order_item_id,
        "quantity": quantity,
        "direction": direction,
        "status": "regular",
        "warehouseLocationId": location_id,
    });
    if let Some(batch) = &variation.batch {
        transaction["batch"] = json!(batch);
    }
    if let Some(best_before) = &variation.best_before_date {
        transaction["bestBeforeDate"] = json!(best_before);
    }
    if let Some(identification) = &variation.identification {
        transaction["identification"] = json!(identification);
    }
    transaction
}

/// Build the transaction payloads for a created transfer order.
///
/// The order response supplies the order item ids; the template supplies the
/// locations. Redistributions get outgoing transactions per source location
/// and incoming ones per target; reorders have no source warehouse, so every
/// location becomes an incoming transaction.
///
/// Returns `(outgoing, incoming)`.
pub fn build_transactions(
    kind: TransferKind,
    order: &Value,
    template: &TransferTemplate,
) -> (Vec<Value>, Vec<Value>) {
    let mut outgoing = Vec::new();
    let mut incoming = Vec::new();

    let order_items = order
        .get("orderItems")
        .and_then(Value::as_array)
        .map_or(&[][..], Vec::as_slice);

    for item in order_items {
        let Some(order_item_id) = item.get("id").and_then(Value::as_i64) else {
            continue;
        };
        let Some(variation) = template.variations.iter().find(|v| {
            item.get("itemVariationId").and_then(Value::as_i64) == Some(v.variation_id)
        }) else {
            continue;
        };

        for location in &variation.locations {
            match kind {
                TransferKind::Redistribution => {
                    outgoing.push(build_transaction(
                        order_item_id,
                        location.location_id,
                        location.quantity,
                        "out",
                        variation,
                    ));
                    for target in &location.targets {
                        incoming.push(build_transaction(
                            order_item_id,
                            target.location_id,
                            target.quantity,
                            "in",
                            variation,
                        ));
                    }
                }
                TransferKind::Reorder => {
                    incoming.push(build_transaction(
                        order_item_id,
                        location.location_id,
                        location.quantity,
                        "in",
                        variation,
                    ));
                }
            }
        }
    }

    (outgoing, incoming)
}

/// Build the date-update payload for the redistribution PUT route
pub fn build_date_update_payload(date_type_id: i64, date: &str) -> Option<Value> {
    let date = parse_w3c_date(date)?;
    Some(json!({
        "dates": [{
            "typeId": date_type_id,
            "date": date,
        }],
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::order_dates;
    use pretty_assertions::assert_eq;

    fn template() -> TransferTemplate {
        TransferTemplate {
            plenty_id: 1000,
            sender: 104,
            receiver: 107,
            variations: vec![TransferVariation {
                variation_id: 2345,
                name: "test shirt".to_string(),
                total_quantity: 10,
                amount: Some(2.5),
                referrer_id: None,
                locations: vec![TransferLocation {
                    location_id: 11,
                    quantity: 10,
                    targets: vec![
                        LocationQuantity {
                            location_id: 21,
                            quantity: 6,
                        },
                        LocationQuantity {
                            location_id: 22,
                            quantity: 4,
                        },
                    ],
                }],
                batch: None,
                best_before_date: None,
                identification: None,
            }],
        }
    }

    #[test]
    fn test_validate_template_accepts_consistent_quantities() {
        assert!(validate_template(&template()).is_ok());

        // Variations without locations skip the check entirely
        let mut bare = template();
        bare.variations[0].locations.clear();
        assert!(validate_template(&bare).is_ok());
    }

    #[test]
    fn test_validate_template_rejects_location_mismatch() {
        let mut bad = template();
        bad.variations[0].total_quantity = 12;
        let error = validate_template(&bad).unwrap_err();
        assert_eq!(error.code, ReasonCode::InvalidTemplate);
    }

    #[test]
    fn test_validate_template_rejects_target_mismatch() {
        let mut bad = template();
        bad.variations[0].locations[0].targets[1].quantity = 5;
        let error = validate_template(&bad).unwrap_err();
        assert_eq!(error.code, ReasonCode::InvalidTemplate);
    }

    #[test]
    fn test_order_payload_redistribution() {
        let payload = build_order_payload(TransferKind::Redistribution, &template());
        assert_eq!(payload["typeId"], order_types::REDISTRIBUTION);
        assert_eq!(payload["plentyId"], 1000);
        assert_eq!(payload["relations"][0]["referenceType"], "warehouse");
        assert_eq!(payload["relations"][0]["referenceId"], 104);
        assert_eq!(payload["relations"][1]["relation"], "receiver");

        let item = &payload["orderItems"][0];
        assert_eq!(item["typeId"], 1);
        assert_eq!(item["itemVariationId"], 2345);
        assert_eq!(item["quantity"], 10);
        assert_eq!(item["amounts"][0]["priceOriginalGross"], 2.5);
    }

    #[test]
    fn test_order_payload_reorder_uses_contact_sender() {
        let payload = build_order_payload(TransferKind::Reorder, &template());
        assert_eq!(payload["typeId"], order_types::REORDER);
        assert_eq!(payload["relations"][0]["referenceType"], "contact");
    }

    #[test]
    fn test_transactions_split_outgoing_and_incoming() {
        let order = serde_json::json!({
            "id": 500,
            "orderItems": [{"id": 777, "itemVariationId": 2345}],
        });
        let (outgoing, incoming) =
            build_transactions(TransferKind::Redistribution, &order, &template());

        assert_eq!(outgoing.len(), 1);
        assert_eq!(outgoing[0]["orderItemId"], 777);
        assert_eq!(outgoing[0]["direction"], "out");
        assert_eq!(outgoing[0]["warehouseLocationId"], 11);
        assert_eq!(outgoing[0]["quantity"], 10);
        assert_eq!(outgoing[0]["status"], "regular");

        assert_eq!(incoming.len(), 2);
        assert_eq!(incoming[0]["direction"], "in");
        assert_eq!(incoming[0]["warehouseLocationId"], 21);
        assert_eq!(incoming[1]["quantity"], 4);
    }

    #[test]
    fn test_reorder_transactions_are_incoming_only() {
        let order = serde_json::json!({
            "id": 501,
            "orderItems": [{"id": 778, "itemVariationId": 2345}],
        });
        let (outgoing, incoming) =
            build_transactions(TransferKind::Reorder, &order, &template());
        assert!(outgoing.is_empty());
        assert_eq!(incoming.len(), 1);
        assert_eq!(incoming[0]["warehouseLocationId"], 11);
    }

    #[test]
    fn test_unmatched_order_items_are_skipped() {
        let order = serde_json::json!({
            "orderItems": [{"id": 779, "itemVariationId": 9999}],
        });
        let (outgoing, incoming) =
            build_transactions(TransferKind::Redistribution, &order, &template());
        assert!(outgoing.is_empty());
        assert!(incoming.is_empty());
    }

    #[test]
    fn test_batch_details_carry_into_transactions() {
        let mut with_batch = template();
        with_batch.variations[0].batch = Some("B-17".to_string());
        with_batch.variations[0].best_before_date = Some("2026-01-01".to_string());
        let order = serde_json::json!({
            "orderItems": [{"id": 780, "itemVariationId": 2345}],
        });
        let (outgoing, _) =
            build_transactions(TransferKind::Redistribution, &order, &with_batch);
        assert_eq!(outgoing[0]["batch"], "B-17");
        assert_eq!(outgoing[0]["bestBeforeDate"], "2026-01-01");
    }

    #[test]
    fn test_date_update_payload() {
        let payload = build_date_update_payload(order_dates::FINISH, "2023-05-02").unwrap();
        assert_eq!(payload["dates"][0]["typeId"], order_dates::FINISH);
        assert!(payload["dates"][0]["date"]
            .as_str()
            .unwrap()
            .starts_with("2023-05-02T00:00:00"));

        assert!(build_date_update_payload(order_dates::FINISH, "garbage").is_none());
    }
}
