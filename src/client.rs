//! The PlentyMarkets client
//!
//! A [`PlentyClient`] is one authenticated session: [`PlentyClient::connect`]
//! performs the login immediately and keeps the bearer token for the whole
//! session lifetime. All resource methods are thin glue over the generic
//! [`fetch`](PlentyClient::fetch) engine and the request executor; route
//! knowledge lives in [`crate::routes`], payload knowledge in
//! [`crate::query`] and [`crate::transfer`].

use crate::auth::{Authenticator, LoginMethod};
use crate::error::{Error, Result};
use crate::http::{ExecutorConfig, RequestExecutor};
use crate::mappings::{self, PackageSummary};
use crate::pagination::{collect_all_pages, collect_unpaginated};
use crate::query::{
    build_date_range, build_query_date, check_date_range, date_to_timestamp, parse_w3c_date,
    sanitize_query, validate_payload, DateType, PayloadKind, Query,
};
use crate::routes::{normalize_language, order_dates, order_types, Domain};
use crate::transfer::{self, TransferKind, TransferTemplate};
use crate::types::{
    ApiError, CallOutcome, FetchOutcome, OutputFormat, ReasonCode, Record, RecordSequence,
};
use chrono::{Local, Utc};
use serde_json::{json, Map, Value};
use std::time::Duration;
use tracing::{error, info, warn};

// ============================================================================
// Configuration
// ============================================================================

/// Configuration for one client session
#[derive(Debug)]
pub struct PlentyConfig {
    base_url: String,
    login: Option<LoginMethod>,
    output_format: OutputFormat,
    throttle_delay: Option<Duration>,
}

impl PlentyConfig {
    /// Start building a configuration for the given system url
    pub fn builder(base_url: impl Into<String>) -> PlentyConfigBuilder {
        PlentyConfigBuilder {
            config: PlentyConfig {
                base_url: base_url.into(),
                login: None,
                output_format: OutputFormat::default(),
                throttle_delay: None,
            },
        }
    }
}

/// Builder for [`PlentyConfig`]
#[derive(Debug)]
pub struct PlentyConfigBuilder {
    config: PlentyConfig,
}

impl PlentyConfigBuilder {
    /// Set the login strategy (required)
    #[must_use]
    pub fn login(mut self, login: LoginMethod) -> Self {
        self.config.login = Some(login);
        self
    }

    /// Set the output representation (default: structured records)
    #[must_use]
    pub fn output_format(mut self, format: OutputFormat) -> Self {
        self.config.output_format = format;
        self
    }

    /// Override the wait time between throttled request retries
    #[must_use]
    pub fn throttle_delay(mut self, delay: Duration) -> Self {
        self.config.throttle_delay = Some(delay);
        self
    }

    /// Finish the configuration
    pub fn build(self) -> PlentyConfig {
        self.config
    }
}

// ============================================================================
// Client
// ============================================================================

/// One authenticated session against a PlentyMarkets system
#[derive(Debug)]
pub struct PlentyClient {
    executor: RequestExecutor,
    output_format: OutputFormat,
}

impl PlentyClient {
    /// Authenticate and create a session.
    ///
    /// The login happens here; a rejected login is a hard initialization
    /// failure, there is no half-connected client.
    pub async fn connect(config: PlentyConfig) -> Result<Self> {
        let login = config
            .login
            .ok_or_else(|| Error::config("no login strategy configured"))?;
        let authenticator = Authenticator::new(login);
        let token = authenticator.login(&config.base_url).await?;

        let mut executor_config = ExecutorConfig::default();
        if let Some(delay) = config.throttle_delay {
            executor_config.throttle_delay = delay;
        }
        let executor = RequestExecutor::with_config(&config.base_url, token, executor_config)?;
        info!("session established for {}", executor.base_url());

        Ok(Self {
            executor,
            output_format: config.output_format,
        })
    }

    // ========================================================================
    // Generic fetch
    // ========================================================================

    /// Sanitize the query, collect every page and convert to the session's
    /// output representation.
    ///
    /// Invalid refine keys and additional values are dropped; an invalid
    /// language aborts before any request is sent.
    pub async fn fetch(
        &self,
        domain: Domain,
        path: &str,
        refine: Option<&Query>,
        additional: Option<&[&str]>,
        query: Query,
        lang: Option<&str>,
    ) -> Result<FetchOutcome> {
        let outcome = self
            .fetch_records(domain, path, refine, additional, query, lang)
            .await?;
        Ok(outcome.into_output(self.output_format))
    }

    /// Like [`fetch`](Self::fetch), but always yields raw records.
    ///
    /// Internal callers that post-process records use this so the output
    /// conversion happens exactly once, at the public boundary.
    async fn fetch_records(
        &self,
        domain: Domain,
        path: &str,
        refine: Option<&Query>,
        additional: Option<&[&str]>,
        query: Query,
        lang: Option<&str>,
    ) -> Result<FetchOutcome> {
        let query = match sanitize_query(domain, query, refine, additional, lang) {
            Ok(query) => query,
            Err(api_error) => return Ok(FetchOutcome::Error(api_error)),
        };
        collect_all_pages(&self.executor, domain, path, &query).await
    }

    // ========================================================================
    // Orders
    // ========================================================================

    /// Get all redistributions that have not been finished yet.
    ///
    /// Optionally restricted to one order, sender warehouse or receiver
    /// warehouse; `shipping_packages` additionally pulls the package content
    /// for every pending order.
    pub async fn get_pending_redistributions(
        &self,
        order_id: Option<i64>,
        sender_warehouse: Option<i64>,
        receiver_warehouse: Option<i64>,
        shipping_packages: Option<PackageSummary>,
    ) -> Result<FetchOutcome> {
        let mut refine = Query::new().with("orderType", order_types::REDISTRIBUTION);
        if let Some(order_id) = order_id {
            refine.insert("orderIds", order_id);
        }
        if let Some(sender) = sender_warehouse {
            refine.insert("sender.warehouse", sender);
        }
        if let Some(receiver) = receiver_warehouse {
            refine.insert("receiver.warehouse", receiver);
        }

        let mut orders = match self.pending_transfer_orders(&refine).await? {
            FetchOutcome::Records(orders) => orders,
            other => return Ok(other),
        };

        if let Some(mode) = shipping_packages {
            for order in &mut orders {
                let Some(order_id) = order.get("id").and_then(Value::as_i64) else {
                    continue;
                };
                if let Some(packages) =
                    self.get_shipping_packages_for_order(order_id, mode).await?
                {
                    order["shippingPackages"] = Value::Array(packages);
                }
            }
        }

        Ok(FetchOutcome::Records(orders).into_output(self.output_format))
    }

    /// Get all reorders that have not been finished yet
    pub async fn get_pending_reorders(
        &self,
        order_id: Option<i64>,
        sender_contact: Option<i64>,
        receiver_warehouse: Option<i64>,
    ) -> Result<FetchOutcome> {
        let mut refine = Query::new().with("orderType", order_types::REORDER);
        if let Some(order_id) = order_id {
            refine.insert("orderIds", order_id);
        }
        if let Some(sender) = sender_contact {
            refine.insert("sender.contact", sender);
        }
        if let Some(receiver) = receiver_warehouse {
            refine.insert("receiver.warehouse", receiver);
        }
        let outcome = self.pending_transfer_orders(&refine).await?;
        Ok(outcome.into_output(self.output_format))
    }

    /// Fetch transfer orders and drop the ones carrying a finish date
    async fn pending_transfer_orders(&self, refine: &Query) -> Result<FetchOutcome> {
        let outcome = self
            .fetch_records(
                Domain::Orders,
                "",
                Some(refine),
                Some(&["orderItems.transactions"]),
                Query::new(),
                None,
            )
            .await?;
        match outcome {
            FetchOutcome::Records(orders) => Ok(FetchOutcome::Records(
                orders
                    .into_iter()
                    .filter(|order| !order_is_finished(order))
                    .collect(),
            )),
            other => Ok(other),
        }
    }

    /// Get all orders within a date range.
    ///
    /// `date_type` selects which order event the range filters on. An
    /// invalid or empty range is rejected before any request.
    pub async fn get_orders_by_date(
        &self,
        start: &str,
        end: &str,
        date_type: DateType,
        refine: Option<&Query>,
        additional: Option<&[&str]>,
    ) -> Result<FetchOutcome> {
        let Some(range) = build_date_range(start, end) else {
            error!("Invalid range {start} -> {end}");
            return Ok(FetchOutcome::Error(ApiError::with_message(
                ReasonCode::Other("invalid_date_range".to_string()),
                format!("{start} -> {end}"),
            )));
        };
        if !check_date_range(&range) {
            return Ok(FetchOutcome::Error(ApiError::with_message(
                ReasonCode::Other("invalid_date_range".to_string()),
                format!("{} -> {}", range.start, range.end),
            )));
        }

        let query = build_query_date(&range, date_type);
        self.fetch(Domain::Orders, "", refine, additional, query, None)
            .await
    }

    // ========================================================================
    // Items and attributes
    // ========================================================================

    /// List all attributes.
    ///
    /// `variation_map` performs an extra variation request and attaches a
    /// `linked_variations` list to every attribute value.
    pub async fn get_attributes(
        &self,
        additional: Option<&[&str]>,
        last_update: Option<&str>,
        variation_map: bool,
    ) -> Result<FetchOutcome> {
        let mut query = Query::new();
        if let Some(last_update) = last_update {
            query.insert("updatedAt", last_update);
        }
        // The mapping needs attribute values; merge them into the field
        // selection so they survive alongside any caller-requested fields.
        let mut additional: Vec<&str> = additional.unwrap_or_default().to_vec();
        if variation_map && !additional.contains(&"values") {
            additional.push("values");
        }
        let additional = (!additional.is_empty()).then_some(additional.as_slice());

        let attributes = match self
            .fetch_records(Domain::Attributes, "", None, additional, query, None)
            .await?
        {
            FetchOutcome::Records(attributes) => attributes,
            other => return Ok(other),
        };

        let attributes = if variation_map {
            let variations = self
                .fetch_records(
                    Domain::Variations,
                    "",
                    None,
                    Some(&["variationAttributeValues"]),
                    Query::new(),
                    None,
                )
                .await?;
            match variations {
                FetchOutcome::Records(variations) => {
                    mappings::link_variations(attributes, &variations)
                }
                _ => attributes,
            }
        } else {
            attributes
        };

        Ok(FetchOutcome::Records(attributes).into_output(self.output_format))
    }

    /// Get product data
    pub async fn get_items(
        &self,
        refine: Option<&Query>,
        additional: Option<&[&str]>,
        last_update: Option<&str>,
        lang: Option<&str>,
    ) -> Result<FetchOutcome> {
        let mut query = Query::new();
        if let Some(last_update) = last_update {
            if let Some(timestamp) = date_to_timestamp(last_update) {
                query.insert("updatedBetween", timestamp);
            }
        }
        self.fetch(Domain::Items, "", refine, additional, query, lang)
            .await
    }

    /// Get variation data
    pub async fn get_variations(
        &self,
        refine: Option<&Query>,
        additional: Option<&[&str]>,
        lang: Option<&str>,
    ) -> Result<FetchOutcome> {
        self.fetch(Domain::Variations, "", refine, additional, Query::new(), lang)
            .await
    }

    /// Get a list of manufacturers (brands)
    pub async fn get_manufacturers(
        &self,
        refine: Option<&Query>,
        additional: Option<&[&str]>,
        last_update: Option<&str>,
    ) -> Result<FetchOutcome> {
        let mut query = Query::new();
        if let Some(last_update) = last_update {
            query.insert("updatedAt", last_update);
        }
        self.fetch(Domain::Manufacturers, "", refine, additional, query, None)
            .await
    }

    /// Get the sales price configurations.
    ///
    /// `minimal` shrinks every configuration to the ids that identify it.
    pub async fn get_price_configurations(
        &self,
        minimal: bool,
        last_update: Option<&str>,
    ) -> Result<FetchOutcome> {
        let mut query = Query::new();
        if let Some(last_update) = last_update {
            query.insert("updatedAt", last_update);
        }

        let prices = match self
            .fetch_records(Domain::SalesPrices, "", None, None, query, None)
            .await?
        {
            FetchOutcome::Records(prices) => prices,
            other => return Ok(other),
        };

        let prices = if minimal {
            prices
                .iter()
                .map(mappings::shrink_price_configuration)
                .collect()
        } else {
            prices
        };
        Ok(FetchOutcome::Records(prices).into_output(self.output_format))
    }

    /// Map each country id to its tax id and VAT configuration ids.
    ///
    /// Returns `None` when the request failed; the failure is logged.
    pub async fn get_vat_id_mappings(
        &self,
        subset: Option<&[i64]>,
    ) -> Result<Option<Map<String, Value>>> {
        let outcome = self
            .fetch_records(Domain::Vat, "", None, None, Query::new(), None)
            .await?;
        match outcome {
            FetchOutcome::Records(records) => {
                Ok(Some(mappings::vat_id_mapping(&records, subset)))
            }
            FetchOutcome::Error(api_error) => {
                error!("GET VAT configuration failed: {api_error}");
                Ok(None)
            }
            _ => Ok(None),
        }
    }

    /// Get a list of order referrers.
    ///
    /// This route reports no pages; a single request returns everything.
    pub async fn get_referrers(&self, column: Option<&str>) -> Result<FetchOutcome> {
        const VALID_COLUMNS: &[&str] = &[
            "backendName",
            "id",
            "isEditable",
            "isFilterable",
            "name",
            "orderOwnderId",
            "origin",
        ];

        let mut query = Query::new();
        if let Some(column) = column {
            if VALID_COLUMNS.contains(&column) {
                query.insert("columns", column);
            } else {
                warn!("Invalid column argument removed: {column}");
            }
        }

        let Some(body) = self.executor.get(Domain::Referrers, "", Some(&query)).await? else {
            return Ok(FetchOutcome::Empty);
        };
        if let Some(api_error) = ApiError::from_payload(&body) {
            return Ok(FetchOutcome::Error(api_error));
        }
        let Value::Array(records) = body else {
            return Err(Error::UnknownResponseShape);
        };
        Ok(FetchOutcome::Records(records).into_output(self.output_format))
    }

    // ========================================================================
    // Stock and warehouses
    // ========================================================================

    /// Get stock data (only locations with positive stock are reported)
    pub async fn get_stock(&self, refine: Option<&Query>) -> Result<FetchOutcome> {
        self.fetch(Domain::Stock, "", refine, None, Query::new(), None)
            .await
    }

    /// Get the storage locations of one warehouse
    pub async fn get_storage_locations(
        &self,
        warehouse_id: i64,
        refine: Option<&Query>,
        additional: Option<&[&str]>,
    ) -> Result<FetchOutcome> {
        self.fetch(
            Domain::Warehouses,
            &format!("/{warehouse_id}/stock/storageLocations"),
            refine,
            additional,
            Query::new(),
            None,
        )
        .await
    }

    /// Get every storage location holding the given variation, across all
    /// warehouses, ordered by best before date (oldest first)
    pub async fn get_variation_stock_batches(&self, variation_id: i64) -> Result<FetchOutcome> {
        let refine = Query::new().with("variationId", variation_id);
        let stock = match self
            .fetch_records(Domain::Stock, "", Some(&refine), None, Query::new(), None)
            .await?
        {
            FetchOutcome::Records(stock) => stock,
            other => return Ok(other),
        };

        let warehouse_ids: Vec<i64> = stock
            .iter()
            .filter_map(|entry| entry.get("warehouseId").and_then(Value::as_i64))
            .collect();

        let mut locations: RecordSequence = Vec::new();
        for warehouse_id in warehouse_ids {
            let outcome = self
                .fetch_records(
                    Domain::Warehouses,
                    &format!("/{warehouse_id}/stock/storageLocations"),
                    Some(&refine),
                    None,
                    Query::new(),
                    None,
                )
                .await?;
            match outcome {
                FetchOutcome::Records(records) => locations.extend(records),
                FetchOutcome::Error(api_error) => return Ok(FetchOutcome::Error(api_error)),
                _ => {}
            }
        }

        locations.sort_by(|a, b| {
            let key = |location: &Value| {
                location
                    .get("bestBeforeDate")
                    .and_then(Value::as_str)
                    .unwrap_or("")
                    .to_string()
            };
            key(a).cmp(&key(b))
        });
        Ok(FetchOutcome::Records(locations).into_output(self.output_format))
    }

    /// List the warehouses where the given variation is stored
    pub async fn get_variation_warehouses(
        &self,
        item_id: i64,
        variation_id: i64,
    ) -> Result<FetchOutcome> {
        self.fetch(
            Domain::Items,
            &format!("/{item_id}/variations/{variation_id}/variation_warehouses"),
            None,
            None,
            Query::new(),
            None,
        )
        .await
    }

    // ========================================================================
    // Contacts and properties
    // ========================================================================

    /// List contacts
    pub async fn get_contacts(
        &self,
        refine: Option<&Query>,
        additional: Option<&[&str]>,
    ) -> Result<FetchOutcome> {
        self.fetch(Domain::Contacts, "", refine, additional, Query::new(), None)
            .await
    }

    /// Map property ids to their names per language.
    ///
    /// Optional filters restrict the result to given property ids or
    /// languages. Returns `None` when the request failed or a language
    /// filter is invalid.
    pub async fn get_property_names(
        &self,
        property_ids: Option<&[i64]>,
        langs: Option<&[&str]>,
    ) -> Result<Option<Map<String, Value>>> {
        let langs = match langs {
            None => None,
            Some(langs) => {
                let normalized: Option<Vec<String>> =
                    langs.iter().map(|lang| normalize_language(lang)).collect();
                match normalized {
                    Some(normalized) => Some(normalized),
                    None => {
                        error!("Invalid language filter: {langs:?}");
                        return Ok(None);
                    }
                }
            }
        };

        let mut query = Query::new();
        if let Some([property_id]) = property_ids {
            // A single id can be filtered server-side
            query.insert("propertyId", *property_id);
        }

        let outcome = self
            .fetch_records(Domain::Properties, "/names", None, None, query, None)
            .await?;
        match outcome {
            FetchOutcome::Records(records) => Ok(Some(mappings::property_name_map(
                &records,
                property_ids,
                langs.as_deref(),
            ))),
            FetchOutcome::Error(api_error) => {
                error!("GET property names failed: {api_error}");
                Ok(None)
            }
            _ => Ok(None),
        }
    }

    /// Map property ids to selection ids to per-language values
    pub async fn get_property_selections(
        &self,
        refine: Option<&Query>,
    ) -> Result<Option<Map<String, Value>>> {
        let outcome = self
            .fetch_records(
                Domain::Properties,
                "/selections",
                refine,
                None,
                Query::new(),
                None,
            )
            .await?;
        match outcome {
            FetchOutcome::Records(records) => Ok(Some(mappings::selection_map(&records))),
            FetchOutcome::Error(api_error) => {
                error!("GET property selections failed: {api_error}");
                Ok(None)
            }
            _ => Ok(None),
        }
    }

    /// Get all names of one selection value
    pub async fn get_property_selection_names(&self, selection_id: i64) -> Result<FetchOutcome> {
        self.fetch(
            Domain::PropertiesV2,
            &format!("/selections/{selection_id}/names"),
            None,
            None,
            Query::new(),
            None,
        )
        .await
    }

    // ========================================================================
    // Shipping
    // ========================================================================

    /// Get shipping pallets, optionally restricted to one order
    pub async fn get_shipping_pallets(&self, order_id: Option<i64>) -> Result<FetchOutcome> {
        let mut query = Query::new();
        if let Some(order_id) = order_id {
            query.insert("orderId", order_id);
        }
        self.fetch(Domain::Orders, "/shipping/pallets", None, None, query, None)
            .await
    }

    /// Get the content of one shipping package
    pub async fn get_shipping_package_items(&self, package_id: i64) -> Result<FetchOutcome> {
        self.fetch(
            Domain::Orders,
            &format!("/shipping/packages/{package_id}/items"),
            None,
            None,
            Query::new(),
            None,
        )
        .await
    }

    /// Get all shipping packages of one order with their content.
    ///
    /// Returns `None` when the pallet request failed; package item
    /// failures leave the affected package without content.
    pub async fn get_shipping_packages_for_order(
        &self,
        order_id: i64,
        mode: PackageSummary,
    ) -> Result<Option<Vec<Record>>> {
        let query = Query::new().with("orderId", order_id);
        let pallets = match self
            .fetch_records(Domain::Orders, "/shipping/pallets", None, None, query, None)
            .await?
        {
            FetchOutcome::Records(pallets) => pallets,
            FetchOutcome::Error(api_error) => {
                error!("GET shipping pallets failed: {api_error}");
                return Ok(None);
            }
            _ => return Ok(None),
        };

        let mut packages: Vec<Record> = Vec::new();
        for pallet in &pallets {
            let pallet_packages = pallet
                .get("packages")
                .and_then(Value::as_array)
                .map_or(&[][..], Vec::as_slice);
            for package in pallet_packages {
                let mut package = package.clone();
                if let Some(package_id) = package.get("id").and_then(Value::as_i64) {
                    let items = self
                        .fetch_records(
                            Domain::Orders,
                            &format!("/shipping/packages/{package_id}/items"),
                            None,
                            None,
                            Query::new(),
                            None,
                        )
                        .await?;
                    if let FetchOutcome::Records(items) = items {
                        package["content"] = Value::Array(items);
                    }
                }
                packages.push(package);
            }
        }

        Ok(Some(mappings::summarize_shipment_packages(&packages, mode)))
    }

    // ========================================================================
    // BI
    // ========================================================================

    /// Get the list of BI raw data files.
    ///
    /// This route reports no pagination metadata; the probing paginator
    /// walks it with a forced page size.
    pub async fn get_bi_raw_files(&self, refine: Option<&Query>) -> Result<FetchOutcome> {
        let query = match sanitize_query(Domain::BiRawData, Query::new(), refine, None, None) {
            Ok(query) => query,
            Err(api_error) => return Ok(FetchOutcome::Error(api_error)),
        };
        let outcome = collect_unpaginated(&self.executor, Domain::BiRawData, "", &query).await?;
        Ok(outcome.into_output(self.output_format))
    }

    // ========================================================================
    // POST: items, attributes, images
    // ========================================================================

    /// Create a marketplace/client/listing availability for an item image
    pub async fn set_image_availability(
        &self,
        item_id: i64,
        image_id: i64,
        target: &AvailabilityTarget,
    ) -> Result<CallOutcome> {
        if item_id == 0 || image_id == 0 {
            return Ok(CallOutcome::Error(ApiError::new(
                ReasonCode::MissingParameter,
            )));
        }
        if target.id() == 0 {
            error!("Invalid target for availability configuration: {target:?}");
            return Ok(CallOutcome::Error(ApiError::new(ReasonCode::InvalidTarget)));
        }

        let payload = json!({
            "imageId": image_id,
            "type": target.kind(),
            "value": target.id().to_string(),
        });
        let response = self
            .executor
            .post(
                Domain::Items,
                &format!("/{item_id}/images/{image_id}/availabilities"),
                None,
                Some(&payload),
            )
            .await?;
        Ok(CallOutcome::from_response(response))
    }

    /// Create one or more items.
    ///
    /// Every element is validated and posted on its own; the result list
    /// matches the input order, failed elements carry their error value.
    pub async fn create_items(&self, items: &[Value]) -> Result<Vec<CallOutcome>> {
        let mut outcomes = Vec::with_capacity(items.len());
        for item in items {
            if !validate_payload(PayloadKind::Items, item) {
                outcomes.push(CallOutcome::Error(ApiError::new(ReasonCode::InvalidJson)));
                continue;
            }
            let response = self.executor.post(Domain::Items, "", None, Some(item)).await?;
            outcomes.push(CallOutcome::from_response(response));
        }
        Ok(outcomes)
    }

    /// Create one or more variations for an item
    pub async fn create_variations(
        &self,
        item_id: i64,
        variations: &[Value],
    ) -> Result<Vec<CallOutcome>> {
        if item_id == 0 {
            return Ok(vec![CallOutcome::Error(ApiError::new(
                ReasonCode::MissingParameter,
            ))]);
        }
        let path = format!("/{item_id}/variations");
        let mut outcomes = Vec::with_capacity(variations.len());
        for variation in variations {
            if !validate_payload(PayloadKind::Variations, variation) {
                outcomes.push(CallOutcome::Error(ApiError::new(ReasonCode::InvalidJson)));
                continue;
            }
            let response = self
                .executor
                .post(Domain::Items, &path, None, Some(variation))
                .await?;
            outcomes.push(CallOutcome::from_response(response));
        }
        Ok(outcomes)
    }

    /// Create a new attribute
    pub async fn create_attribute(&self, attribute: &Value) -> Result<CallOutcome> {
        if !validate_payload(PayloadKind::Attributes, attribute) {
            return Ok(CallOutcome::Error(ApiError::new(ReasonCode::InvalidJson)));
        }
        let response = self
            .executor
            .post(Domain::Attributes, "", None, Some(attribute))
            .await?;
        Ok(CallOutcome::from_response(response))
    }

    /// Create an attribute name in one language
    pub async fn create_attribute_name(
        &self,
        attribute_id: i64,
        lang: &str,
        name: &str,
    ) -> Result<CallOutcome> {
        if attribute_id == 0 || lang.is_empty() || name.is_empty() {
            return Ok(CallOutcome::Error(ApiError::new(
                ReasonCode::MissingParameter,
            )));
        }
        let Some(lang) = normalize_language(lang) else {
            return Ok(CallOutcome::Error(ApiError::new(
                ReasonCode::InvalidLanguage,
            )));
        };

        let payload = json!({
            "attributeId": attribute_id,
            "lang": lang,
            "name": name,
        });
        let response = self
            .executor
            .post(
                Domain::Attributes,
                &format!("/{attribute_id}/names"),
                None,
                Some(&payload),
            )
            .await?;
        Ok(CallOutcome::from_response(response))
    }

    /// Create one or more attribute values for an attribute
    pub async fn create_attribute_values(
        &self,
        attribute_id: i64,
        values: &[Value],
    ) -> Result<Vec<CallOutcome>> {
        if attribute_id == 0 {
            return Ok(vec![CallOutcome::Error(ApiError::new(
                ReasonCode::MissingParameter,
            ))]);
        }
        let path = format!("/{attribute_id}/values");
        let mut outcomes = Vec::with_capacity(values.len());
        for value in values {
            if !validate_payload(PayloadKind::AttributeValues, value) {
                outcomes.push(CallOutcome::Error(ApiError::new(ReasonCode::InvalidJson)));
                continue;
            }
            let response = self
                .executor
                .post(Domain::Attributes, &path, None, Some(value))
                .await?;
            outcomes.push(CallOutcome::from_response(response));
        }
        Ok(outcomes)
    }

    /// Create an attribute value name in one language
    pub async fn create_attribute_value_name(
        &self,
        value_id: i64,
        lang: &str,
        name: &str,
    ) -> Result<CallOutcome> {
        if value_id == 0 || lang.is_empty() || name.is_empty() {
            return Ok(CallOutcome::Error(ApiError::new(
                ReasonCode::MissingParameter,
            )));
        }
        let Some(lang) = normalize_language(lang) else {
            return Ok(CallOutcome::Error(ApiError::new(
                ReasonCode::InvalidLanguage,
            )));
        };

        let payload = json!({
            "valueId": value_id,
            "lang": lang,
            "name": name,
        });
        let response = self
            .executor
            .post(
                Domain::Items,
                &format!("/attribute_values/{value_id}/names"),
                None,
                Some(&payload),
            )
            .await?;
        Ok(CallOutcome::from_response(response))
    }

    // ========================================================================
    // POST: transfers, transactions, bookings
    // ========================================================================

    /// Create a redistribution from a transfer template.
    ///
    /// The order is created first, then one transaction per storage
    /// location. With `book_out` the outgoing side is booked immediately:
    /// initiation date, booking, incoming transactions, final booking and
    /// finish date. Failed transactions are logged and skipped; the order
    /// itself remains.
    pub async fn create_redistribution(
        &self,
        template: &TransferTemplate,
        book_out: bool,
    ) -> Result<CallOutcome> {
        if let Err(api_error) = transfer::validate_template(template) {
            return Ok(CallOutcome::Error(api_error));
        }

        let payload = transfer::build_order_payload(TransferKind::Redistribution, template);
        let response = self
            .executor
            .post(Domain::Redistributions, "", None, Some(&payload))
            .await?;
        let outcome = CallOutcome::from_response(response);
        let Some(order) = outcome.response().cloned() else {
            return Ok(outcome);
        };
        let order_id = order.get("id").and_then(Value::as_i64).unwrap_or(0);

        let (outgoing, incoming) =
            transfer::build_transactions(TransferKind::Redistribution, &order, template);
        self.create_transfer_transactions(&outgoing).await?;

        if book_out {
            let now = Local::now().format("%Y-%m-%dT%H:%M:%S").to_string();
            if let Some(update) =
                transfer::build_date_update_payload(order_dates::INITIATION, &now)
            {
                self.update_redistribution(order_id, &update).await?;
            }
            self.create_booking(order_id, None).await?;
        }

        self.create_transfer_transactions(&incoming).await?;

        if book_out {
            self.create_booking(order_id, None).await?;
            let now = Local::now().format("%Y-%m-%dT%H:%M:%S").to_string();
            if let Some(update) = transfer::build_date_update_payload(order_dates::FINISH, &now) {
                self.update_redistribution(order_id, &update).await?;
            }
        }

        Ok(CallOutcome::Response(order))
    }

    /// Create a reorder from a transfer template.
    ///
    /// Reorders come from a supplier contact, so there is no outgoing side
    /// and no automatic booking.
    pub async fn create_reorder(&self, template: &TransferTemplate) -> Result<CallOutcome> {
        if let Err(api_error) = transfer::validate_template(template) {
            return Ok(CallOutcome::Error(api_error));
        }

        let payload = transfer::build_order_payload(TransferKind::Reorder, template);
        let response = self
            .executor
            .post(Domain::Reorders, "", None, Some(&payload))
            .await?;
        let outcome = CallOutcome::from_response(response);
        let Some(order) = outcome.response().cloned() else {
            return Ok(outcome);
        };

        let (_, incoming) = transfer::build_transactions(TransferKind::Reorder, &order, template);
        self.create_transfer_transactions(&incoming).await?;

        Ok(CallOutcome::Response(order))
    }

    /// Post a batch of prepared transactions, logging failed ones
    async fn create_transfer_transactions(&self, transactions: &[Value]) -> Result<()> {
        for transaction in transactions {
            let Some(order_item_id) = transaction.get("orderItemId").and_then(Value::as_i64)
            else {
                continue;
            };
            let outcome = self.create_transaction(order_item_id, transaction).await?;
            if let Some(api_error) = outcome.error() {
                warn!("transaction creation failed ({api_error})");
            }
        }
        Ok(())
    }

    /// Create an incoming or outgoing transaction for an order item
    pub async fn create_transaction(
        &self,
        order_item_id: i64,
        transaction: &Value,
    ) -> Result<CallOutcome> {
        if !validate_payload(PayloadKind::Transactions, transaction) {
            return Ok(CallOutcome::Error(ApiError::new(ReasonCode::InvalidJson)));
        }
        let response = self
            .executor
            .post(
                Domain::Orders,
                &format!("/items/{order_item_id}/transactions"),
                None,
                Some(transaction),
            )
            .await?;
        Ok(CallOutcome::from_response(response))
    }

    /// Execute all pending transactions within an order
    pub async fn create_booking(
        &self,
        order_id: i64,
        delivery_note: Option<&str>,
    ) -> Result<CallOutcome> {
        let payload = match delivery_note {
            Some(delivery_note) => json!({ "deliveryNoteNumber": delivery_note }),
            None => json!({}),
        };
        let response = self
            .executor
            .post(
                Domain::Orders,
                &format!("/{order_id}/booking"),
                None,
                Some(&payload),
            )
            .await?;
        Ok(CallOutcome::from_response(response))
    }

    // ========================================================================
    // POST: properties
    // ========================================================================

    /// Create a selection value with names for a selection property.
    ///
    /// The API does not detect duplicate selections.
    pub async fn create_property_selection(
        &self,
        property_id: i64,
        position: i64,
        names: &[Value],
    ) -> Result<CallOutcome> {
        let payload = json!({
            "propertyId": property_id,
            "position": position,
            "names": names,
        });
        let response = self
            .executor
            .post(Domain::PropertiesV2, "/selections", None, Some(&payload))
            .await?;
        Ok(CallOutcome::from_response(response))
    }

    /// Create a name in one language for an existing selection value
    pub async fn create_property_selection_name(
        &self,
        property_id: i64,
        selection_id: i64,
        lang: &str,
        name: &str,
    ) -> Result<CallOutcome> {
        if property_id == 0 || lang.is_empty() || name.is_empty() {
            return Ok(CallOutcome::Error(ApiError::new(
                ReasonCode::MissingParameter,
            )));
        }
        let Some(lang) = normalize_language(lang) else {
            return Ok(CallOutcome::Error(ApiError::new(
                ReasonCode::InvalidLanguage,
            )));
        };

        let payload = json!({
            "propertyId": property_id,
            "selectionId": selection_id,
            "lang": lang,
            "name": name,
        });
        let response = self
            .executor
            .post(Domain::PropertiesV2, "/selections/names", None, Some(&payload))
            .await?;
        Ok(CallOutcome::from_response(response))
    }

    // ========================================================================
    // PUT
    // ========================================================================

    /// Change attributes of a redistribution, commonly its event dates
    pub async fn update_redistribution(
        &self,
        order_id: i64,
        update: &Value,
    ) -> Result<CallOutcome> {
        if order_id == 0 {
            return Ok(CallOutcome::Error(ApiError::new(
                ReasonCode::MissingParameter,
            )));
        }
        let response = self
            .executor
            .put(
                Domain::Redistributions,
                &format!("/{order_id}"),
                None,
                Some(update),
            )
            .await?;
        Ok(CallOutcome::from_response(response))
    }

    /// Book stock of a variation into a location, without transactions.
    ///
    /// The API only accepts positive quantities here; anything else is
    /// rejected before the request.
    pub async fn book_incoming_items(&self, booking: &StockBooking) -> Result<CallOutcome> {
        if booking.quantity <= 0.0 {
            return Ok(CallOutcome::Error(ApiError::new(
                ReasonCode::InvalidQuantity,
            )));
        }
        self.book_stock(booking, INCOMING_REASON, "bookIncomingItems")
            .await
    }

    /// Book stock of a variation out of a location, without transactions.
    ///
    /// The API only accepts negative quantities here.
    pub async fn book_outgoing_items(&self, booking: &StockBooking) -> Result<CallOutcome> {
        if booking.quantity >= 0.0 {
            return Ok(CallOutcome::Error(ApiError::new(
                ReasonCode::InvalidQuantity,
            )));
        }
        self.book_stock(booking, OUTGOING_REASON, "bookOutgoingItems")
            .await
    }

    async fn book_stock(
        &self,
        booking: &StockBooking,
        reason_id: i64,
        route: &str,
    ) -> Result<CallOutcome> {
        let mut payload = json!({
            "warehouseId": booking.warehouse_id,
            "storageLocationId": booking.location_id,
            "deliveredAt": Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            "currency": "EUR",
            "quantity": booking.quantity,
            "reasonId": reason_id,
        });
        if let Some(batch) = &booking.batch {
            payload["batch"] = json!(batch);
        }
        if let Some(best_before) = &booking.best_before_date {
            if let Some(w3c) = parse_w3c_date(best_before) {
                payload["bestBeforeDate"] = json!(w3c);
            }
        }

        let path = format!(
            "/{}/variations/{}/stock/{route}",
            booking.item_id, booking.variation_id
        );
        let response = self
            .executor
            .put(Domain::Items, &path, None, Some(&payload))
            .await?;
        Ok(CallOutcome::from_response(response))
    }

    /// Update a property selection name value
    pub async fn update_property_selection_name(
        &self,
        name_id: i64,
        name: &str,
    ) -> Result<CallOutcome> {
        if name_id == 0 || name.is_empty() {
            return Ok(CallOutcome::Error(ApiError::new(
                ReasonCode::MissingParameter,
            )));
        }
        let payload = json!({ "name": name });
        let response = self
            .executor
            .put(
                Domain::PropertiesV2,
                &format!("/selections/names/{name_id}"),
                None,
                Some(&payload),
            )
            .await?;
        Ok(CallOutcome::from_response(response))
    }
}

/// Stock movement booking reason: incoming goods
const INCOMING_REASON: i64 = 181;
/// Stock movement booking reason: outgoing goods
const OUTGOING_REASON: i64 = 201;

/// Parameters for a direct stock booking
#[derive(Debug, Clone)]
pub struct StockBooking {
    /// Item (variation container) id
    pub item_id: i64,
    /// Variation id
    pub variation_id: i64,
    /// Quantity; positive for incoming, negative for outgoing bookings
    pub quantity: f64,
    /// Target warehouse id
    pub warehouse_id: i64,
    /// Storage location id, 0 for the standard location
    pub location_id: i64,
    /// Optional batch number
    pub batch: Option<String>,
    /// Optional best before date
    pub best_before_date: Option<String>,
}

/// Target of an image availability configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AvailabilityTarget {
    /// A marketplace id (order origins)
    Marketplace(i64),
    /// A client (mandant) plenty id
    Mandant(i64),
    /// A listing id
    Listing(i64),
}

impl AvailabilityTarget {
    fn kind(self) -> &'static str {
        match self {
            Self::Marketplace(_) => "marketplace",
            Self::Mandant(_) => "mandant",
            Self::Listing(_) => "listing",
        }
    }

    fn id(self) -> i64 {
        match self {
            Self::Marketplace(id) | Self::Mandant(id) | Self::Listing(id) => id,
        }
    }
}

/// An order is finished once it carries a finish event date
fn order_is_finished(order: &Value) -> bool {
    order
        .get("dates")
        .and_then(Value::as_array)
        .map_or(&[][..], Vec::as_slice)
        .iter()
        .any(|date| date.get("typeId").and_then(Value::as_i64) == Some(order_dates::FINISH))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_order_is_finished() {
        let finished = json!({"dates": [
            {"typeId": order_dates::INITIATION, "date": "x"},
            {"typeId": order_dates::FINISH, "date": "y"},
        ]});
        let pending = json!({"dates": [{"typeId": order_dates::INITIATION, "date": "x"}]});
        let dateless = json!({"id": 1});

        assert!(order_is_finished(&finished));
        assert!(!order_is_finished(&pending));
        assert!(!order_is_finished(&dateless));
    }

    #[test]
    fn test_availability_target() {
        let target = AvailabilityTarget::Marketplace(104);
        assert_eq!(target.kind(), "marketplace");
        assert_eq!(target.id(), 104);
        assert_eq!(AvailabilityTarget::Mandant(1000).kind(), "mandant");
    }

    #[test]
    fn test_config_builder() {
        let config = PlentyConfig::builder("https://shop.example.com")
            .login(LoginMethod::plain("jane", "secret"))
            .output_format(OutputFormat::Tabular)
            .throttle_delay(Duration::from_millis(50))
            .build();
        assert_eq!(config.base_url, "https://shop.example.com");
        assert_eq!(config.output_format, OutputFormat::Tabular);
        assert_eq!(config.throttle_delay, Some(Duration::from_millis(50)));
        assert!(config.login.is_some());
    }
}
