use std::collections::HashMap;

use crate::classify::{classify, EmergencyCategory, Priority, Status};
use crate::models::{DistrictSummary, SosRecord, TOTAL_LABEL};

impl DistrictSummary {
    pub fn empty(district: impl Into<String>) -> Self {
        Self {
            district: district.into(),
            ..Default::default()
        }
    }

    /// Fold one record into this row.
    pub fn record(&mut self, record: &SosRecord) {
        let class = classify(record);

        self.total += 1;
        self.total_people += record.people();

        match class.status {
            Status::Pending => self.pending += 1,
            Status::Acknowledged => self.acknowledged += 1,
            Status::InProgress => self.in_progress += 1,
            Status::Rescued => self.rescued += 1,
            Status::Completed => {
                self.completed += 1;
                self.rescued += 1;
            }
            Status::CannotContact => self.cannot_contact += 1,
            Status::Verified | Status::Cancelled | Status::Unrecognized => {}
        }
        if class.verified {
            self.verified += 1;
        }

        match class.priority {
            Priority::Critical => self.critical += 1,
            Priority::High => self.high += 1,
            Priority::Medium => self.medium += 1,
            Priority::Low => self.low += 1,
            Priority::Unrecognized => {}
        }

        match class.emergency {
            EmergencyCategory::Trapped => self.trapped += 1,
            EmergencyCategory::FoodWater => self.food_water += 1,
            EmergencyCategory::Medical => self.medical += 1,
            EmergencyCategory::RescueAssistance => self.rescue_assistance += 1,
            EmergencyCategory::MissingPerson => {
                self.missing_person += 1;
                self.missing += 1;
            }
            EmergencyCategory::Other => self.other += 1,
        }

        let groups = class.vulnerable;
        self.has_children += u64::from(groups.children);
        self.has_elderly += u64::from(groups.elderly);
        self.has_disabled += u64::from(groups.disabled);
        self.has_medical_emergency += u64::from(groups.medical_emergency);
    }

    /// Add every counter of `other` into this row, keeping this row's label.
    pub fn absorb(&mut self, other: &DistrictSummary) {
        self.total += other.total;
        self.total_people += other.total_people;
        self.pending += other.pending;
        self.verified += other.verified;
        self.acknowledged += other.acknowledged;
        self.in_progress += other.in_progress;
        self.rescued += other.rescued;
        self.completed += other.completed;
        self.cannot_contact += other.cannot_contact;
        self.missing += other.missing;
        self.critical += other.critical;
        self.high += other.high;
        self.medium += other.medium;
        self.low += other.low;
        self.trapped += other.trapped;
        self.food_water += other.food_water;
        self.medical += other.medical;
        self.rescue_assistance += other.rescue_assistance;
        self.missing_person += other.missing_person;
        self.other += other.other;
        self.has_children += other.has_children;
        self.has_elderly += other.has_elderly;
        self.has_disabled += other.has_disabled;
        self.has_medical_emergency += other.has_medical_emergency;
    }

    pub fn emergency_count(&self, category: EmergencyCategory) -> u64 {
        match category {
            EmergencyCategory::Trapped => self.trapped,
            EmergencyCategory::FoodWater => self.food_water,
            EmergencyCategory::Medical => self.medical,
            EmergencyCategory::RescueAssistance => self.rescue_assistance,
            EmergencyCategory::MissingPerson => self.missing_person,
            EmergencyCategory::Other => self.other,
        }
    }

    pub fn priority_count(&self, priority: Priority) -> u64 {
        match priority {
            Priority::Critical => self.critical,
            Priority::High => self.high,
            Priority::Medium => self.medium,
            Priority::Low => self.low,
            Priority::Unrecognized => 0,
        }
    }
}

/// One row per district, largest first; ties keep first-seen order.
pub fn summarize_districts<'a, I>(records: I) -> Vec<DistrictSummary>
where
    I: IntoIterator<Item = &'a SosRecord>,
{
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut rows: Vec<DistrictSummary> = Vec::new();

    for record in records {
        let district = record.district_key();
        let slot = match index.get(district) {
            Some(&slot) => slot,
            None => {
                index.insert(district.to_string(), rows.len());
                rows.push(DistrictSummary::empty(district));
                rows.len() - 1
            }
        };
        rows[slot].record(record);
    }

    rows.sort_by(|a, b| b.total.cmp(&a.total));
    rows
}

/// Collapse summary rows into a single "TOTAL" row.
pub fn calculate_totals(summaries: &[DistrictSummary]) -> DistrictSummary {
    summaries
        .iter()
        .fold(DistrictSummary::empty(TOTAL_LABEL), |mut acc, row| {
            acc.absorb(row);
            acc
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn case(
        district: &str,
        status: &str,
        priority: &str,
        emergency_type: &str,
        people: u64,
    ) -> SosRecord {
        SosRecord {
            district: Some(district.to_string()),
            status: Some(status.to_string()),
            priority: Some(priority.to_string()),
            emergency_type: Some(emergency_type.to_string()),
            number_of_people: Some(people),
            ..Default::default()
        }
    }

    fn mixed_records() -> Vec<SosRecord> {
        let statuses = [
            "PENDING",
            "VERIFIED",
            "acknowledged",
            "IN_PROGRESS",
            "RESCUED",
            "COMPLETED",
            "CANNOT_CONTACT",
            "CANCELLED",
            "ARCHIVED",
        ];
        let types = ["TRAPPED", "FOOD", "MEDICAL", "RESCUE", "MISSING_PERSON", "SHELTER"];
        let districts = ["Colombo", "Kandy", " Galle ", "", "Matara"];
        (0..45)
            .map(|i| {
                let mut record = case(
                    districts[i % districts.len()],
                    statuses[i % statuses.len()],
                    ["CRITICAL", "HIGH", "MEDIUM", "LOW", "URGENT"][i % 5],
                    types[i % types.len()],
                    (i % 4) as u64,
                );
                record.has_children = Some(i % 2 == 0);
                record.has_elderly = Some(i % 3 == 0);
                if i % 7 == 0 {
                    record.number_of_people = None;
                }
                record
            })
            .collect()
    }

    #[test]
    fn scenario_colombo_and_unknown() {
        let records = vec![
            case("Colombo", "PENDING", "CRITICAL", "TRAPPED_UNDER_DEBRIS", 3),
            case("Colombo", "RESCUED", "HIGH", "FOOD_WATER_SHORTAGE", 2),
            case("", "VERIFIED", "LOW", "OTHER", 1),
        ];
        let rows = summarize_districts(&records);
        assert_eq!(rows.len(), 2);

        let colombo = &rows[0];
        assert_eq!(colombo.district, "Colombo");
        assert_eq!(colombo.total, 2);
        assert_eq!(colombo.total_people, 5);
        assert_eq!(colombo.pending, 1);
        assert_eq!(colombo.rescued, 1);
        assert_eq!(colombo.critical, 1);
        assert_eq!(colombo.high, 1);
        assert_eq!(colombo.trapped, 1);
        assert_eq!(colombo.food_water, 1);
        assert_eq!(colombo.verified, 1);

        let unknown = &rows[1];
        assert_eq!(unknown.district, "Unknown");
        assert_eq!(unknown.total, 1);
        assert_eq!(unknown.total_people, 1);
        assert_eq!(unknown.low, 1);
        assert_eq!(unknown.other, 1);
        assert_eq!(unknown.verified, 1);
    }

    #[test]
    fn conserves_records_and_people() {
        let records = mixed_records();
        let rows = summarize_districts(&records);
        let total: u64 = rows.iter().map(|r| r.total).sum();
        let people: u64 = rows.iter().map(|r| r.total_people).sum();
        assert_eq!(total, records.len() as u64);
        assert_eq!(people, records.iter().map(SosRecord::people).sum::<u64>());
    }

    #[test]
    fn emergency_buckets_partition_each_district() {
        for row in summarize_districts(&mixed_records()) {
            let buckets: u64 = EmergencyCategory::ALL
                .iter()
                .map(|c| row.emergency_count(*c))
                .sum();
            assert_eq!(buckets, row.total, "{}", row.district);
        }
    }

    #[test]
    fn verified_complements_excluded_statuses() {
        let records = mixed_records();
        for row in summarize_districts(&records) {
            let excluded = records
                .iter()
                .filter(|r| r.district_key() == row.district)
                .filter(|r| !Status::classify(r.status.as_deref()).counts_as_verified())
                .count() as u64;
            assert_eq!(row.verified, row.total - excluded, "{}", row.district);
        }
    }

    #[test]
    fn completed_also_counts_as_rescued() {
        let records = vec![case("Kandy", "completed", "LOW", "OTHER", 1)];
        let row = &summarize_districts(&records)[0];
        assert_eq!(row.completed, 1);
        assert_eq!(row.rescued, 1);
    }

    #[test]
    fn missing_person_bumps_missing_counter() {
        let records = vec![case("Kandy", "PENDING", "LOW", "missing_person", 1)];
        let row = &summarize_districts(&records)[0];
        assert_eq!(row.missing_person, 1);
        assert_eq!(row.missing, 1);
    }

    #[test]
    fn aggregation_is_idempotent() {
        let records = mixed_records();
        assert_eq!(summarize_districts(&records), summarize_districts(&records));
    }

    #[test]
    fn shuffling_keeps_per_district_counters() {
        let records = mixed_records();
        let mut reversed = records.clone();
        reversed.reverse();
        let mut rotated = records.clone();
        rotated.rotate_left(17);

        let by_name = |rows: Vec<DistrictSummary>| {
            let mut rows = rows;
            rows.sort_by(|a, b| a.district.cmp(&b.district));
            rows
        };
        let baseline = by_name(summarize_districts(&records));
        assert_eq!(baseline, by_name(summarize_districts(&reversed)));
        assert_eq!(baseline, by_name(summarize_districts(&rotated)));
    }

    #[test]
    fn ties_keep_first_seen_order() {
        let records = vec![
            case("Galle", "PENDING", "LOW", "OTHER", 1),
            case("Badulla", "PENDING", "LOW", "OTHER", 1),
            case("Kegalle", "PENDING", "LOW", "OTHER", 1),
            case("Kegalle", "PENDING", "LOW", "OTHER", 1),
            case("Badulla", "PENDING", "LOW", "OTHER", 1),
        ];
        let order: Vec<String> = summarize_districts(&records)
            .into_iter()
            .map(|r| r.district)
            .collect();
        assert_eq!(order, vec!["Badulla", "Kegalle", "Galle"]);
    }

    #[test]
    fn district_names_are_case_sensitive() {
        let records = vec![
            case("colombo", "PENDING", "LOW", "OTHER", 1),
            case("Colombo", "PENDING", "LOW", "OTHER", 1),
        ];
        assert_eq!(summarize_districts(&records).len(), 2);
    }

    #[test]
    fn totals_match_unfiltered_rollup() {
        let records = mixed_records();
        let totals = calculate_totals(&summarize_districts(&records));

        let mut everything = DistrictSummary::empty(TOTAL_LABEL);
        for record in &records {
            everything.record(record);
        }
        assert_eq!(totals, everything);
        assert_eq!(totals.district, "TOTAL");
        assert_eq!(totals.total, records.len() as u64);
    }

    #[test]
    fn empty_inputs_are_fine() {
        assert!(summarize_districts(&[]).is_empty());
        let totals = calculate_totals(&[]);
        assert_eq!(totals.total, 0);

        let blank = vec![SosRecord::default(); 3];
        let rows = summarize_districts(&blank);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].total, 3);
        assert_eq!(rows[0].other, 3);
        assert_eq!(rows[0].verified, 3);
        assert_eq!(rows[0].total_people, 0);
    }
}
