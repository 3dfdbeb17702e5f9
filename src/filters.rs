use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::models::SosRecord;

/// Tri-state match on an optional boolean flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FlagFilter {
    #[default]
    Any,
    Yes,
    No,
}

impl FlagFilter {
    pub fn matches(self, flag: bool) -> bool {
        match self {
            FlagFilter::Any => true,
            FlagFilter::Yes => flag,
            FlagFilter::No => !flag,
        }
    }
}

/// Field filters use exact raw-string equality, as the dropdown values are
/// taken verbatim from the records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecordFilter {
    pub district: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub emergency_type: Option<String>,
    pub has_children: FlagFilter,
    pub has_elderly: FlagFilter,
    pub has_medical_emergency: FlagFilter,
    pub search: Option<String>,
}

fn field_matches(wanted: &Option<String>, actual: &Option<String>) -> bool {
    match wanted {
        None => true,
        Some(value) => actual.as_deref() == Some(value.as_str()),
    }
}

impl RecordFilter {
    pub fn matches(&self, record: &SosRecord) -> bool {
        if !field_matches(&self.district, &record.district)
            || !field_matches(&self.status, &record.status)
            || !field_matches(&self.priority, &record.priority)
            || !field_matches(&self.emergency_type, &record.emergency_type)
        {
            return false;
        }
        if !self.has_children.matches(record.has_children())
            || !self.has_elderly.matches(record.has_elderly())
            || !self.has_medical_emergency.matches(record.has_medical_emergency())
        {
            return false;
        }

        match self.search.as_deref().filter(|q| !q.is_empty()) {
            None => true,
            Some(query) => {
                let query = query.to_lowercase();
                [
                    &record.full_name,
                    &record.reference_number,
                    &record.phone_number,
                    &record.address,
                    &record.district,
                ]
                .into_iter()
                .flatten()
                .any(|field| field.to_lowercase().contains(&query))
            }
        }
    }

    /// Matching records in input order.
    pub fn apply<'a, I>(&self, records: I) -> Vec<&'a SosRecord>
    where
        I: IntoIterator<Item = &'a SosRecord>,
    {
        records.into_iter().filter(|r| self.matches(r)).collect()
    }

    pub fn active_count(&self) -> usize {
        let fields = [
            &self.district,
            &self.status,
            &self.priority,
            &self.emergency_type,
        ]
        .into_iter()
        .filter(|f| f.is_some())
        .count();
        let flags = [
            self.has_children,
            self.has_elderly,
            self.has_medical_emergency,
        ]
        .into_iter()
        .filter(|f| *f != FlagFilter::Any)
        .count();
        let search = usize::from(self.search.as_deref().is_some_and(|q| !q.is_empty()));
        fields + flags + search
    }

    pub fn is_active(&self) -> bool {
        self.active_count() > 0
    }
}

/// Distinct values offered by each filter dropdown.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterOptions {
    pub districts: Vec<String>,
    pub statuses: Vec<String>,
    pub priorities: Vec<String>,
    pub emergency_types: Vec<String>,
}

impl FilterOptions {
    pub fn from_records<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a SosRecord>,
    {
        let mut districts = BTreeSet::new();
        let mut statuses = BTreeSet::new();
        let mut priorities = BTreeSet::new();
        let mut emergency_types = BTreeSet::new();

        for record in records {
            for (set, value) in [
                (&mut districts, &record.district),
                (&mut statuses, &record.status),
                (&mut priorities, &record.priority),
                (&mut emergency_types, &record.emergency_type),
            ] {
                if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
                    set.insert(value.to_string());
                }
            }
        }

        Self {
            districts: districts.into_iter().collect(),
            statuses: statuses.into_iter().collect(),
            priorities: priorities.into_iter().collect(),
            emergency_types: emergency_types.into_iter().collect(),
        }
    }
}
