//! Resource domains and static route tables
//!
//! Every request targets a [`Domain`], a named REST resource family that maps
//! to a fixed route prefix. Using an enum instead of free-form strings means
//! unknown domains are rejected at compile time rather than producing an
//! empty route at request time.

use std::fmt;

/// Order type ids used by the API
pub mod order_types {
    /// Regular sales order
    pub const SALES: i64 = 1;
    /// Reorder from a supplier contact
    pub const REORDER: i64 = 12;
    /// Stock redistribution between warehouses
    pub const REDISTRIBUTION: i64 = 15;
}

/// Order date type ids used by the API
pub mod order_dates {
    /// Order was initiated (stock booked out)
    pub const INITIATION: i64 = 16;
    /// Estimated delivery date
    pub const ESTIMATED_DELIVERY: i64 = 17;
    /// Order was finished (stock booked in)
    pub const FINISH: i64 = 18;
}

/// Language abbreviations accepted by the API
pub const VALID_LANGUAGES: &[&str] = &[
    "bg", "cn", "cz", "da", "de", "en", "es", "fr", "it", "nl", "nn", "pl", "pt", "ro", "ru",
    "se", "sk", "tr", "vn",
];

/// Check a language abbreviation and normalize it to lower case
pub fn normalize_language(lang: &str) -> Option<String> {
    let lang = lang.to_lowercase();
    VALID_LANGUAGES.contains(&lang.as_str()).then_some(lang)
}

// ============================================================================
// Domains
// ============================================================================

/// A named REST resource family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Domain {
    /// Sales and transfer orders
    Orders,
    /// Items (variation containers)
    Items,
    /// Item attributes
    Attributes,
    /// Item variations
    Variations,
    /// VAT configurations
    Vat,
    /// Sales price configurations
    SalesPrices,
    /// Manufacturers (brands)
    Manufacturers,
    /// Order referrers
    Referrers,
    /// Stock per warehouse
    Stock,
    /// Warehouses and storage locations
    Warehouses,
    /// Contacts
    Contacts,
    /// Properties (legacy route)
    Properties,
    /// Properties (v2 route)
    PropertiesV2,
    /// Redistribution orders
    Redistributions,
    /// Reorders
    Reorders,
    /// BI raw data search results
    BiRawData,
}

impl Domain {
    /// The fixed route prefix for this domain
    pub fn route(self) -> &'static str {
        match self {
            Self::Orders => "/rest/orders",
            Self::Items => "/rest/items",
            Self::Attributes => "/rest/items/attributes",
            Self::Variations => "/rest/items/variations",
            Self::Vat => "/rest/vat",
            Self::SalesPrices => "/rest/items/sales_prices",
            Self::Manufacturers => "/rest/items/manufacturers",
            Self::Referrers => "/rest/orders/referrers",
            Self::Stock => "/rest/stockmanagement/stock",
            Self::Warehouses => "/rest/warehouses",
            Self::Contacts => "/rest/accounts/contacts",
            Self::Properties => "/rest/properties",
            Self::PropertiesV2 => "/rest/v2/properties",
            Self::Redistributions => "/rest/redistributions",
            Self::Reorders => "/rest/reorders",
            Self::BiRawData => "/rest/bi/raw_data",
        }
    }

    /// Filter keys this domain accepts; anything else is dropped with a log
    pub fn refine_keys(self) -> &'static [&'static str] {
        match self {
            Self::Orders | Self::Redistributions | Self::Reorders => &[
                "orderType",
                "orderIds",
                "referrerId",
                "contactId",
                "ownerId",
                "statusFrom",
                "statusTo",
                "sender.contact",
                "sender.warehouse",
                "receiver.warehouse",
            ],
            Self::Items => &["id", "flagOne", "flagTwo", "manufacturerId", "tagIds"],
            Self::Variations => &[
                "id",
                "itemId",
                "flagOne",
                "flagTwo",
                "categoryId",
                "isActive",
                "numberExact",
            ],
            Self::Manufacturers => &["name"],
            Self::Contacts => &["email", "name", "number", "typeId"],
            Self::Stock | Self::Warehouses => &["variationId", "warehouseId"],
            Self::Properties | Self::PropertiesV2 => &["propertyId"],
            Self::BiRawData => &["dataName", "period"],
            Self::Attributes | Self::Vat | Self::SalesPrices | Self::Referrers => &[],
        }
    }

    /// Values accepted for the `with` query of this domain
    pub fn additional_values(self) -> &'static [&'static str] {
        match self {
            Self::Orders | Self::Redistributions | Self::Reorders => &[
                "addresses",
                "relations",
                "comments",
                "documents",
                "shippingPackages",
                "orderItems.transactions",
                "orderItems.variation",
            ],
            Self::Items => &["variations", "itemImages", "itemProperties", "itemCrossSelling"],
            Self::Variations => &[
                "variationAttributeValues",
                "stock",
                "images",
                "unit",
                "properties",
                "variationSalesPrices",
            ],
            Self::Attributes => &["values", "names", "maps"],
            Self::Manufacturers => &["commisions", "externals"],
            Self::Contacts => &["addresses", "accounts", "options"],
            Self::Warehouses => &["warehouseLocation"],
            Self::Properties | Self::PropertiesV2 => &["names", "selections"],
            Self::Vat | Self::SalesPrices | Self::Referrers | Self::Stock | Self::BiRawData => &[],
        }
    }

    /// Orders expect array-style `with[]` parameters, everything else a
    /// comma-joined `with` value
    pub fn uses_array_with(self) -> bool {
        matches!(self, Self::Orders | Self::Redistributions | Self::Reorders)
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Orders => "orders",
            Self::Items => "items",
            Self::Attributes => "attributes",
            Self::Variations => "variations",
            Self::Vat => "vat",
            Self::SalesPrices => "sales_prices",
            Self::Manufacturers => "manufacturers",
            Self::Referrers => "referrers",
            Self::Stock => "stock",
            Self::Warehouses => "warehouses",
            Self::Contacts => "contacts",
            Self::Properties => "properties",
            Self::PropertiesV2 => "v2_properties",
            Self::Redistributions => "redistributions",
            Self::Reorders => "reorders",
            Self::BiRawData => "bi_raw_data",
        };
        f.write_str(name)
    }
}
