use chrono::NaiveDateTime;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::warn;

pub const SALARY_NOT_PROVIDED: &str = "Not provided";

/// One search API response. Every nested object may be absent or malformed.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPage {
    #[serde(default, deserialize_with = "listings")]
    pub data: Option<Vec<RawListing>>,
    #[serde(default, deserialize_with = "lenient")]
    pub total_pages: Option<u32>,
    #[serde(default, deserialize_with = "lenient")]
    pub user_query_id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub search_params: Option<SearchParams>,
    #[serde(default, deserialize_with = "lenient")]
    pub pagination_parameters: Option<PaginationParameters>,
    #[serde(default, deserialize_with = "lenient")]
    pub sol_metadata: Option<SolMetadata>,
}

impl RawPage {
    pub fn listings(&self) -> &[RawListing] {
        self.data.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchParams {
    #[serde(default, deserialize_with = "lenient")]
    pub solid: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub include: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationParameters {
    #[serde(default, deserialize_with = "lenient")]
    pub had_premium_listings: Option<bool>,
    #[serde(default, deserialize_with = "lenient")]
    pub page_size: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolMetadata {
    #[serde(default)]
    pub request_token: Option<Value>,
}

/// A nested listing object, or whatever the API sent in its place.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Nested<T> {
    Shaped(T),
    Malformed(Value),
}

impl<T> Nested<T> {
    pub fn shaped(&self) -> Option<&T> {
        match self {
            Nested::Shaped(inner) => Some(inner),
            Nested::Malformed(_) => None,
        }
    }

    pub fn malformed(&self) -> Option<&Value> {
        match self {
            Nested::Shaped(_) => None,
            Nested::Malformed(value) => Some(value),
        }
    }
}

/// A single listing as the API nests it. Leaves stay untyped until validation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawListing {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub title: Option<Value>,
    #[serde(default)]
    pub advertiser: Option<Nested<Advertiser>>,
    #[serde(default)]
    pub branding: Option<Nested<Branding>>,
    #[serde(default)]
    pub location: Option<Value>,
    #[serde(default)]
    pub area: Option<Value>,
    #[serde(default)]
    pub suburb: Option<Value>,
    #[serde(default)]
    pub work_type: Option<Value>,
    #[serde(default)]
    pub work_arrangements: Option<Nested<WorkArrangements>>,
    /// `None` when the key is missing, `Some(Value::Null)` when sent as null.
    #[serde(default, deserialize_with = "present")]
    pub salary: Option<Value>,
    #[serde(default)]
    pub listing_date: Option<Value>,
    #[serde(default)]
    pub teaser: Option<Value>,
    #[serde(default)]
    pub classification: Option<Nested<Described>>,
    #[serde(default)]
    pub sub_classification: Option<Nested<Described>>,
    #[serde(default)]
    pub is_premium: Option<Value>,
    #[serde(default, rename = "isStandOut")]
    pub is_standout: Option<Value>,
    #[serde(default)]
    pub job_location: Option<Nested<JobLocation>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Advertiser {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub description: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Described {
    #[serde(default)]
    pub description: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Branding {
    #[serde(default)]
    pub assets: Option<BrandingAssets>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BrandingAssets {
    #[serde(default)]
    pub logo: Option<Logo>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Logo {
    #[serde(default)]
    pub strategies: Option<LogoStrategies>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoStrategies {
    #[serde(default)]
    pub serp_logo: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkArrangements {
    #[serde(default)]
    pub data: Option<Vec<WorkArrangement>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkArrangement {
    #[serde(default)]
    pub label: Option<Label>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Label {
    #[serde(default)]
    pub text: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobLocation {
    #[serde(default)]
    pub label: Option<Value>,
}

/// Page metadata: decodes `T` when the value has the expected shape; anything
/// else (including `null`) becomes `None` instead of failing the whole page.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(None);
    }

    match serde_json::from_value(value) {
        Ok(decoded) => Ok(Some(decoded)),
        Err(e) => {
            warn!(
                expected = std::any::type_name::<T>(),
                error = %e,
                "Ignoring malformed payload field"
            );
            Ok(None)
        }
    }
}

/// Each entry decodes on its own. Entries that are not objects become empty
/// listings, which fail validation for lack of an id.
fn listings<'de, D>(deserializer: D) -> Result<Option<Vec<RawListing>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Array(items) => Ok(Some(
            items
                .into_iter()
                .map(|item| serde_json::from_value(item).unwrap_or_default())
                .collect(),
        )),
        Value::Null => Ok(None),
        other => {
            warn!(found = %other, "Ignoring non-array listing data");
            Ok(None)
        }
    }
}

fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// Flattened listing before schema coercion.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateJob {
    pub job_id: Option<Value>,
    pub job_title: Option<Value>,
    pub company: Option<Value>,
    pub company_logo_url: Option<Value>,
    pub location: Option<Value>,
    pub area: Option<Value>,
    pub suburb: Option<Value>,
    pub work_type: Option<Value>,
    pub work_arrangement: Option<Value>,
    pub salary: Option<Value>,
    pub listing_date: NaiveDateTime,
    pub teaser: Option<Value>,
    pub classification: Option<Value>,
    pub sub_classification: Option<Value>,
    pub is_premium: Option<Value>,
    pub is_standout: Option<Value>,
    pub job_location_label: Option<Value>,
    pub job_advertiser_id: Option<Value>,
    pub request_token: Option<Value>,
    /// First nested object that arrived with the wrong shape, by target field.
    pub malformed: Option<(&'static str, Value)>,
}

/// The persisted unit, keyed by `job_id`.
#[derive(Debug, Clone, PartialEq)]
pub struct JobRecord {
    pub job_id: String,
    pub job_title: Option<String>,
    pub company: Option<String>,
    pub company_logo_url: Option<String>,
    pub location: Option<String>,
    pub area: Option<String>,
    pub suburb: Option<String>,
    pub work_type: Option<String>,
    pub work_arrangement: Option<String>,
    pub salary: Option<String>,
    pub listing_date: NaiveDateTime,
    pub teaser: Option<String>,
    pub classification: Option<String>,
    pub sub_classification: Option<String>,
    pub is_premium: Option<bool>,
    pub is_standout: Option<bool>,
    pub job_location_label: Option<String>,
    pub job_advertiser_id: Option<String>,
    pub request_token: Option<String>,
}
