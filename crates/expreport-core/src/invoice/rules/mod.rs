//! Rule-based field extractors for the commercial invoice template.
//!
//! Every rule maps text to an optional field; the extractor owns the defaults.

pub mod amounts;
pub mod country;
pub mod dates;
pub mod fields;
pub mod location;
pub mod nc8;
pub mod patterns;

pub use amounts::{
    Currency, NumberLocale, TotalValue, extract_net_weight, extract_total_value,
    parse_localized_number, parse_mixed_number,
};
pub use country::country_code_from_address;
pub use dates::parse_shipment_date;
pub use fields::{
    classify_document, extract_company, extract_destination_address, extract_invoice_number,
    extract_labeled, extract_origin, last_line,
};
pub use location::{LOCATION_RULES, LocationRule, resolve_delivery_location};
pub use nc8::{
    CREDIT_NOTE_CODE, CodeEntry, INTERNAL_ORDER_CODE, UNKNOWN_CODE, extract_code_entries,
    format_nc8_code, is_internal_order,
};
