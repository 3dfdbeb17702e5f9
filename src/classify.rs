use serde::Serialize;

use crate::models::SosRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Pending,
    Verified,
    Acknowledged,
    InProgress,
    Rescued,
    Completed,
    CannotContact,
    Cancelled,
    Unrecognized,
}

impl Status {
    /// Exact, case-insensitive match; absent or unknown values are `Unrecognized`.
    pub fn classify(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return Status::Unrecognized;
        };
        match raw.to_uppercase().as_str() {
            "PENDING" => Status::Pending,
            "VERIFIED" => Status::Verified,
            "ACKNOWLEDGED" => Status::Acknowledged,
            "IN_PROGRESS" => Status::InProgress,
            "RESCUED" => Status::Rescued,
            "COMPLETED" => Status::Completed,
            "CANNOT_CONTACT" => Status::CannotContact,
            "CANCELLED" => Status::Cancelled,
            _ => Status::Unrecognized,
        }
    }

    pub fn as_str(self) -> Option<&'static str> {
        match self {
            Status::Pending => Some("PENDING"),
            Status::Verified => Some("VERIFIED"),
            Status::Acknowledged => Some("ACKNOWLEDGED"),
            Status::InProgress => Some("IN_PROGRESS"),
            Status::Rescued => Some("RESCUED"),
            Status::Completed => Some("COMPLETED"),
            Status::CannotContact => Some("CANNOT_CONTACT"),
            Status::Cancelled => Some("CANCELLED"),
            Status::Unrecognized => None,
        }
    }

    /// Everything except PENDING, CANCELLED and CANNOT_CONTACT counts as
    /// verified, including unrecognized and absent statuses.
    pub fn counts_as_verified(self) -> bool {
        !matches!(
            self,
            Status::Pending | Status::Cancelled | Status::CannotContact
        )
    }

    /// A completed case is also a rescued one.
    pub fn counts_as_rescued(self) -> bool {
        matches!(self, Status::Rescued | Status::Completed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    Critical,
    High,
    Medium,
    Low,
    Unrecognized,
}

impl Priority {
    pub fn classify(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return Priority::Unrecognized;
        };
        match raw.to_uppercase().as_str() {
            "CRITICAL" => Priority::Critical,
            "HIGH" => Priority::High,
            "MEDIUM" => Priority::Medium,
            "LOW" => Priority::Low,
            _ => Priority::Unrecognized,
        }
    }

    pub fn as_str(self) -> Option<&'static str> {
        match self {
            Priority::Critical => Some("CRITICAL"),
            Priority::High => Some("HIGH"),
            Priority::Medium => Some("MEDIUM"),
            Priority::Low => Some("LOW"),
            Priority::Unrecognized => None,
        }
    }

    pub const ALL: [Priority; 4] = [
        Priority::Critical,
        Priority::High,
        Priority::Medium,
        Priority::Low,
    ];
}

/// Emergency category; the six variants partition every record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum EmergencyCategory {
    Trapped,
    FoodWater,
    Medical,
    RescueAssistance,
    MissingPerson,
    Other,
}

impl EmergencyCategory {
    /// Case-insensitive substring match, first hit wins:
    /// TRAPPED, FOOD|WATER, MEDICAL, RESCUE, MISSING, else other.
    pub fn classify(raw: Option<&str>) -> Self {
        let token = raw.unwrap_or_default().to_uppercase();
        if token.contains("TRAPPED") {
            EmergencyCategory::Trapped
        } else if token.contains("FOOD") || token.contains("WATER") {
            EmergencyCategory::FoodWater
        } else if token.contains("MEDICAL") {
            EmergencyCategory::Medical
        } else if token.contains("RESCUE") {
            EmergencyCategory::RescueAssistance
        } else if token.contains("MISSING") {
            EmergencyCategory::MissingPerson
        } else {
            EmergencyCategory::Other
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            EmergencyCategory::Trapped => "Trapped",
            EmergencyCategory::FoodWater => "Food/Water",
            EmergencyCategory::Medical => "Medical",
            EmergencyCategory::RescueAssistance => "Rescue",
            EmergencyCategory::MissingPerson => "Missing Person",
            EmergencyCategory::Other => "Other",
        }
    }

    pub const ALL: [EmergencyCategory; 6] = [
        EmergencyCategory::Trapped,
        EmergencyCategory::FoodWater,
        EmergencyCategory::Medical,
        EmergencyCategory::RescueAssistance,
        EmergencyCategory::MissingPerson,
        EmergencyCategory::Other,
    ];
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct VulnerableGroups {
    pub children: bool,
    pub elderly: bool,
    pub disabled: bool,
    pub medical_emergency: bool,
}

/// Every bucket a single record contributes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub status: Status,
    pub verified: bool,
    pub priority: Priority,
    pub emergency: EmergencyCategory,
    pub vulnerable: VulnerableGroups,
}

pub fn classify(record: &SosRecord) -> Classification {
    let status = Status::classify(record.status.as_deref());
    Classification {
        status,
        verified: status.counts_as_verified(),
        priority: Priority::classify(record.priority.as_deref()),
        emergency: EmergencyCategory::classify(record.emergency_type.as_deref()),
        vulnerable: VulnerableGroups {
            children: record.has_children(),
            elderly: record.has_elderly(),
            disabled: record.has_disabled(),
            medical_emergency: record.has_medical_emergency(),
        },
    }
}

/// Display label for cross-tabs: canonical name when recognized, otherwise
/// the trimmed upper-cased raw value, or "UNKNOWN" when absent.
pub(crate) fn category_label(canonical: Option<&'static str>, raw: Option<&str>) -> String {
    match canonical {
        Some(name) => name.to_string(),
        None => crate::models::non_blank(raw)
            .map(str::to_uppercase)
            .unwrap_or_else(|| "UNKNOWN".to_string()),
    }
}
