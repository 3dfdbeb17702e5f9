use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

/// One reported emergency case as delivered by the SOS API.
///
/// Every field is optional on the wire; accessors apply the defaulting
/// rules the aggregators rely on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SosRecord {
    #[serde(deserialize_with = "lenient")]
    pub id: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub reference_number: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub full_name: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub phone_number: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub address: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub district: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub status: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub priority: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub emergency_type: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub number_of_people: Option<u64>,
    #[serde(deserialize_with = "lenient")]
    pub has_children: Option<bool>,
    #[serde(deserialize_with = "lenient")]
    pub has_elderly: Option<bool>,
    #[serde(deserialize_with = "lenient")]
    pub has_disabled: Option<bool>,
    #[serde(deserialize_with = "lenient")]
    pub has_medical_emergency: Option<bool>,
    #[serde(deserialize_with = "lenient")]
    pub source: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub created_at: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub rescued_at: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub completed_at: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub updated_at: Option<String>,
}

impl SosRecord {
    /// District key used by the district rollup: trimmed, empty becomes "Unknown".
    pub fn district_key(&self) -> &str {
        match self.district.as_deref().map(str::trim) {
            Some(d) if !d.is_empty() => d,
            _ => UNKNOWN_DISTRICT,
        }
    }

    /// Trimmed district, or `None` when missing or blank.
    pub fn known_district(&self) -> Option<&str> {
        non_blank(self.district.as_deref())
    }

    /// Source key used by the source cross-tabs; unset becomes "OTHER".
    pub fn source_key(&self) -> &str {
        non_blank(self.source.as_deref()).unwrap_or(OTHER_SOURCE)
    }

    pub fn people(&self) -> u64 {
        self.number_of_people.unwrap_or(0)
    }

    pub fn has_children(&self) -> bool {
        self.has_children.unwrap_or(false)
    }

    pub fn has_elderly(&self) -> bool {
        self.has_elderly.unwrap_or(false)
    }

    pub fn has_disabled(&self) -> bool {
        self.has_disabled.unwrap_or(false)
    }

    pub fn has_medical_emergency(&self) -> bool {
        self.has_medical_emergency.unwrap_or(false)
    }

    pub fn created(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(self.created_at.as_deref())
    }

    pub fn rescued(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(self.rescued_at.as_deref())
    }

    pub fn completed(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(self.completed_at.as_deref())
    }

    pub fn updated(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(self.updated_at.as_deref())
    }
}

pub const UNKNOWN_DISTRICT: &str = "Unknown";
pub const OTHER_SOURCE: &str = "OTHER";
pub const TOTAL_LABEL: &str = "TOTAL";

pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Field-level fallback: a value of the wrong type or range becomes the
/// field's default instead of failing the whole page.
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).unwrap_or_default())
}

/// Parse an ISO timestamp. Offset-less values are read as UTC; a bare date is
/// midnight UTC. Anything else is `None`.
pub fn parse_timestamp(raw: Option<&str>) -> Option<DateTime<Utc>> {
    let raw = non_blank(raw)?;
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .map(|date| date.and_time(NaiveTime::MIN).and_utc())
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ApiStats {
    pub total_people: Option<u64>,
    pub missing_people_count: Option<u64>,
    pub by_status: BTreeMap<String, u64>,
    pub by_priority: BTreeMap<String, u64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Pagination {
    #[serde(deserialize_with = "lenient")]
    pub current_page: u32,
    #[serde(deserialize_with = "lenient")]
    pub total_pages: u32,
    #[serde(deserialize_with = "lenient")]
    pub total_count: u64,
    #[serde(deserialize_with = "lenient")]
    pub limit: u32,
    #[serde(deserialize_with = "lenient")]
    pub has_next_page: bool,
    #[serde(deserialize_with = "lenient")]
    pub has_prev_page: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResponse {
    pub success: bool,
    #[serde(default, alias = "records")]
    pub data: Vec<SosRecord>,
    #[serde(default, deserialize_with = "lenient")]
    pub stats: Option<ApiStats>,
    #[serde(default, deserialize_with = "lenient")]
    pub pagination: Option<Pagination>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistrictSummary {
    pub district: String,
    pub total: u64,
    pub total_people: u64,
    pub pending: u64,
    pub verified: u64,
    pub acknowledged: u64,
    pub in_progress: u64,
    pub rescued: u64,
    pub completed: u64,
    pub cannot_contact: u64,
    pub missing: u64,
    pub critical: u64,
    pub high: u64,
    pub medium: u64,
    pub low: u64,
    pub trapped: u64,
    pub food_water: u64,
    pub medical: u64,
    pub rescue_assistance: u64,
    pub missing_person: u64,
    pub other: u64,
    pub has_children: u64,
    pub has_elderly: u64,
    pub has_disabled: u64,
    pub has_medical_emergency: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DistrictTypePoint {
    pub district: String,
    pub emergency_type: String,
    pub people_sum: u64,
    pub request_count: u64,
}

/// Per-source counts keyed by a category label (status, priority or type).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceBreakdown {
    pub source: String,
    pub total: u64,
    pub counts: BTreeMap<String, u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistrictCount {
    pub district: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceCount {
    pub source: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceComparison {
    pub source: String,
    pub total: u64,
    pub people: u64,
    pub critical: u64,
    pub rescued: u64,
    pub pending: u64,
    pub verified: u64,
    pub cannot_contact: u64,
    pub with_children: u64,
    pub with_elderly: u64,
    pub with_medical: u64,
    pub rescue_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourcePeople {
    pub source: String,
    pub people: u64,
    pub requests: u64,
    pub avg_people: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseTime {
    pub district: String,
    pub avg_hours: f64,
    pub count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HourlyCount {
    pub hour: NaiveDateTime,
    pub count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CumulativeCount {
    pub date: NaiveDate,
    pub count: u64,
    pub cumulative: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RescueDay {
    pub date: NaiveDate,
    pub rescued: u64,
    pub completed: u64,
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyBreakdown {
    pub date: NaiveDate,
    pub counts: BTreeMap<String, u64>,
}
