//! Structural gate in front of aggregation.

use crate::SchemaError;

pub const FIELD_DATE: &str = "Date";
pub const FIELD_CAMPAIGN: &str = "Campaign";
pub const FIELD_PLATFORM: &str = "Platform";
pub const FIELD_IMPRESSIONS: &str = "Impressions";
pub const FIELD_CLICKS: &str = "Clicks";
pub const FIELD_CONVERSIONS: &str = "Conversions";
pub const FIELD_REVENUE: &str = "Revenue";
pub const FIELD_ENGAGEMENT_RATE: &str = "Engagement_Rate";

/// Fields every record collection must carry, in canonical column order.
pub const REQUIRED_FIELDS: [&str; 8] = [
    FIELD_DATE,
    FIELD_CAMPAIGN,
    FIELD_PLATFORM,
    FIELD_IMPRESSIONS,
    FIELD_CLICKS,
    FIELD_CONVERSIONS,
    FIELD_REVENUE,
    FIELD_ENGAGEMENT_RATE,
];

/// Check that every `required` name appears in `fields`.
///
/// Missing names are reported in `required` order. Unknown extra fields and
/// row count never matter.
pub fn validate_fields<S: AsRef<str>>(fields: &[S], required: &[&str]) -> Result<(), SchemaError> {
    let missing: Vec<String> = required
        .iter()
        .filter(|name| !fields.iter().any(|f| f.as_ref() == **name))
        .map(|name| name.to_string())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(SchemaError { missing })
    }
}
