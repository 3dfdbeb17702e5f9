use std::collections::{BTreeMap, HashMap};

use crate::classify::{category_label, Priority, Status};
use crate::models::{
    non_blank, DistrictCount, DistrictTypePoint, ResponseTime, SosRecord, SourceBreakdown, SourceComparison,
    SourceCount, SourcePeople,
};

/// Samples outside (0, 720] hours are treated as data-entry outliers.
pub const MAX_RESPONSE_HOURS: f64 = 720.0;

/// Insertion-ordered fold keyed by string.
struct Keyed<T> {
    index: HashMap<String, usize>,
    rows: Vec<T>,
}

impl<T> Keyed<T> {
    fn new() -> Self {
        Self {
            index: HashMap::new(),
            rows: Vec::new(),
        }
    }

    fn entry(&mut self, key: &str, init: impl FnOnce() -> T) -> &mut T {
        let slot = match self.index.get(key) {
            Some(&slot) => slot,
            None => {
                self.index.insert(key.to_string(), self.rows.len());
                self.rows.push(init());
                self.rows.len() - 1
            }
        };
        &mut self.rows[slot]
    }

    fn into_rows(self) -> Vec<T> {
        self.rows
    }
}

pub(crate) fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// One point per non-empty (district, emergency type) combination, largest
/// request count first. Records missing either field are left out.
pub fn district_by_type<'a, I>(records: I) -> Vec<DistrictTypePoint>
where
    I: IntoIterator<Item = &'a SosRecord>,
{
    let mut points: Keyed<DistrictTypePoint> = Keyed::new();

    for record in records {
        let (Some(district), Some(emergency_type)) = (
            record.known_district(),
            non_blank(record.emergency_type.as_deref()),
        ) else {
            continue;
        };
        let key = format!("{district}\u{1f}{emergency_type}");
        let point = points.entry(&key, || DistrictTypePoint {
            district: district.to_string(),
            emergency_type: emergency_type.to_string(),
            people_sum: 0,
            request_count: 0,
        });
        point.people_sum += record.people();
        point.request_count += 1;
    }

    let mut points = points.into_rows();
    points.sort_by(|a, b| b.request_count.cmp(&a.request_count));
    points
}

fn source_breakdown<'a, I, F>(records: I, label: F) -> Vec<SourceBreakdown>
where
    I: IntoIterator<Item = &'a SosRecord>,
    F: Fn(&SosRecord) -> String,
{
    let mut sources: Keyed<SourceBreakdown> = Keyed::new();

    for record in records {
        let source = record.source_key();
        let row = sources.entry(source, || SourceBreakdown {
            source: source.to_string(),
            total: 0,
            counts: BTreeMap::new(),
        });
        row.total += 1;
        *row.counts.entry(label(record)).or_insert(0) += 1;
    }

    let mut rows = sources.into_rows();
    rows.sort_by(|a, b| b.total.cmp(&a.total));
    rows
}

pub fn source_by_status<'a, I>(records: I) -> Vec<SourceBreakdown>
where
    I: IntoIterator<Item = &'a SosRecord>,
{
    source_breakdown(records, |r| {
        category_label(
            Status::classify(r.status.as_deref()).as_str(),
            r.status.as_deref(),
        )
    })
}

pub fn source_by_priority<'a, I>(records: I) -> Vec<SourceBreakdown>
where
    I: IntoIterator<Item = &'a SosRecord>,
{
    source_breakdown(records, |r| {
        category_label(
            Priority::classify(r.priority.as_deref()).as_str(),
            r.priority.as_deref(),
        )
    })
}

/// Keyed by the raw emergency type token; unset becomes "OTHER".
pub fn source_by_emergency_type<'a, I>(records: I) -> Vec<SourceBreakdown>
where
    I: IntoIterator<Item = &'a SosRecord>,
{
    source_breakdown(records, |r| {
        non_blank(r.emergency_type.as_deref())
            .unwrap_or("OTHER")
            .to_string()
    })
}

pub fn source_distribution<'a, I>(records: I) -> Vec<SourceCount>
where
    I: IntoIterator<Item = &'a SosRecord>,
{
    let mut sources: Keyed<SourceCount> = Keyed::new();
    for record in records {
        let source = record.source_key();
        sources
            .entry(source, || SourceCount {
                source: source.to_string(),
                count: 0,
            })
            .count += 1;
    }
    let mut rows = sources.into_rows();
    rows.sort_by(|a, b| b.count.cmp(&a.count));
    rows
}

/// CRITICAL plus the API's HIGHLY_CRITICAL, which the priority enum folds
/// into `Unrecognized`.
fn is_critical(record: &SosRecord) -> bool {
    Priority::classify(record.priority.as_deref()) == Priority::Critical
        || non_blank(record.priority.as_deref())
            .is_some_and(|p| p.eq_ignore_ascii_case("HIGHLY_CRITICAL"))
}

pub fn source_comparison<'a, I>(records: I) -> Vec<SourceComparison>
where
    I: IntoIterator<Item = &'a SosRecord>,
{
    let mut sources: Keyed<SourceComparison> = Keyed::new();

    for record in records {
        let source = record.source_key();
        let row = sources.entry(source, || SourceComparison {
            source: source.to_string(),
            total: 0,
            people: 0,
            critical: 0,
            rescued: 0,
            pending: 0,
            verified: 0,
            cannot_contact: 0,
            with_children: 0,
            with_elderly: 0,
            with_medical: 0,
            rescue_rate: 0.0,
        });
        row.total += 1;
        row.people += record.people();
        if is_critical(record) {
            row.critical += 1;
        }
        // Exact status here, unlike the complementary "verified" of the district rollup.
        match Status::classify(record.status.as_deref()) {
            Status::Rescued => row.rescued += 1,
            Status::Pending => row.pending += 1,
            Status::Verified => row.verified += 1,
            Status::CannotContact => row.cannot_contact += 1,
            _ => {}
        }
        row.with_children += u64::from(record.has_children());
        row.with_elderly += u64::from(record.has_elderly());
        row.with_medical += u64::from(record.has_medical_emergency());
    }

    let mut rows = sources.into_rows();
    for row in rows.iter_mut() {
        row.rescue_rate = if row.total == 0 {
            0.0
        } else {
            round1(row.rescued as f64 / row.total as f64 * 100.0)
        };
    }
    rows.sort_by(|a, b| b.total.cmp(&a.total));
    rows
}

/// Case counts per district for one source, or every source when `source`
/// is `None`. Unset sources match "OTHER"; unset districts count as
/// "Unknown". Busiest `top_n` districts first.
pub fn districts_by_source<'a, I>(records: I, source: Option<&str>, top_n: usize) -> Vec<DistrictCount>
where
    I: IntoIterator<Item = &'a SosRecord>,
{
    let mut districts: Keyed<DistrictCount> = Keyed::new();
    for record in records {
        if source.is_some_and(|s| s != record.source_key()) {
            continue;
        }
        let district = record.district_key();
        districts
            .entry(district, || DistrictCount {
                district: district.to_string(),
                count: 0,
            })
            .count += 1;
    }
    let mut rows = districts.into_rows();
    rows.sort_by(|a, b| b.count.cmp(&a.count));
    rows.truncate(top_n);
    rows
}

pub fn people_by_source<'a, I>(records: I) -> Vec<SourcePeople>
where
    I: IntoIterator<Item = &'a SosRecord>,
{
    let mut sources: Keyed<SourcePeople> = Keyed::new();
    for record in records {
        let source = record.source_key();
        let row = sources.entry(source, || SourcePeople {
            source: source.to_string(),
            people: 0,
            requests: 0,
            avg_people: 0.0,
        });
        row.people += record.people();
        row.requests += 1;
    }

    let mut rows = sources.into_rows();
    for row in rows.iter_mut() {
        row.avg_people = if row.requests == 0 {
            0.0
        } else {
            round1(row.people as f64 / row.requests as f64)
        };
    }
    rows.sort_by(|a, b| b.people.cmp(&a.people));
    rows
}

/// Hours from creation to resolution, when both timestamps parse and the
/// result lies in (0, 720]. A set `rescuedAt` wins even if unparseable;
/// `completedAt` is only read when `rescuedAt` is unset.
pub fn response_hours(record: &SosRecord) -> Option<f64> {
    let created = record.created()?;
    let resolved = match non_blank(record.rescued_at.as_deref()) {
        Some(_) => record.rescued(),
        None => record.completed(),
    }?;
    let hours = (resolved - created).num_milliseconds() as f64 / 3_600_000.0;
    (hours > 0.0 && hours <= MAX_RESPONSE_HOURS).then_some(hours)
}

/// Average response time per district, fastest first.
pub fn response_times<'a, I>(records: I) -> Vec<ResponseTime>
where
    I: IntoIterator<Item = &'a SosRecord>,
{
    let mut districts: Keyed<(String, f64, u64)> = Keyed::new();

    for record in records {
        let Some(district) = record.known_district() else {
            continue;
        };
        let Some(hours) = response_hours(record) else {
            continue;
        };
        let entry = districts.entry(district, || (district.to_string(), 0.0, 0));
        entry.1 += hours;
        entry.2 += 1;
    }

    let mut rows: Vec<ResponseTime> = districts
        .into_rows()
        .into_iter()
        .map(|(district, total_hours, count)| ResponseTime {
            district,
            avg_hours: round1(total_hours / count as f64),
            count,
        })
        .collect();
    rows.sort_by(|a, b| {
        a.avg_hours
            .partial_cmp(&b.avg_hours)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    rows
}

/// Mean of the per-district averages, rounded to one decimal.
pub fn overall_response_hours(rows: &[ResponseTime]) -> f64 {
    if rows.is_empty() {
        return 0.0;
    }
    round1(rows.iter().map(|r| r.avg_hours).sum::<f64>() / rows.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sourced(district: &str, source: Option<&str>, emergency_type: &str, people: u64) -> SosRecord {
        SosRecord {
            district: Some(district.to_string()),
            source: source.map(str::to_string),
            emergency_type: Some(emergency_type.to_string()),
            number_of_people: Some(people),
            ..Default::default()
        }
    }

    fn timed(district: &str, created: &str, rescued: Option<&str>, completed: Option<&str>) -> SosRecord {
        SosRecord {
            district: Some(district.to_string()),
            created_at: Some(created.to_string()),
            rescued_at: rescued.map(str::to_string),
            completed_at: completed.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn district_type_drops_incomplete_combinations() {
        let records = vec![
            sourced("Colombo", None, "TRAPPED", 3),
            sourced("Colombo", None, "TRAPPED", 2),
            sourced("Colombo", None, "MEDICAL", 1),
            sourced("", None, "TRAPPED", 4),
            SosRecord {
                district: Some("Kandy".to_string()),
                ..Default::default()
            },
        ];
        let points = district_by_type(&records);
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].district, "Colombo");
        assert_eq!(points[0].emergency_type, "TRAPPED");
        assert_eq!(points[0].people_sum, 5);
        assert_eq!(points[0].request_count, 2);
        assert_eq!(points[1].emergency_type, "MEDICAL");
    }

    #[test]
    fn unset_source_becomes_other() {
        let records = vec![
            SosRecord {
                source: Some("SMS".to_string()),
                status: Some("pending".to_string()),
                ..Default::default()
            },
            SosRecord {
                status: Some("RESCUED".to_string()),
                ..Default::default()
            },
            SosRecord {
                source: Some("  ".to_string()),
                ..Default::default()
            },
        ];
        let rows = source_by_status(&records);
        assert_eq!(rows[0].source, "OTHER");
        assert_eq!(rows[0].total, 2);
        assert_eq!(rows[0].counts.get("RESCUED"), Some(&1));
        assert_eq!(rows[0].counts.get("UNKNOWN"), Some(&1));
        assert_eq!(rows[1].source, "SMS");
        assert_eq!(rows[1].counts.get("PENDING"), Some(&1));
    }

    #[test]
    fn source_breakdowns_cover_priority_and_type() {
        let mut records = vec![
            sourced("Galle", Some("WEB"), "FOOD_WATER", 2),
            sourced("Galle", Some("WEB"), "", 1),
            sourced("Galle", Some("HELAKURU_APP"), "TRAPPED", 1),
        ];
        records[0].priority = Some("high".to_string());
        records[1].priority = Some("urgent".to_string());

        let priorities = source_by_priority(&records);
        assert_eq!(priorities[0].source, "WEB");
        assert_eq!(priorities[0].counts.get("HIGH"), Some(&1));
        assert_eq!(priorities[0].counts.get("URGENT"), Some(&1));

        let types = source_by_emergency_type(&records);
        assert_eq!(types[0].counts.get("FOOD_WATER"), Some(&1));
        assert_eq!(types[0].counts.get("OTHER"), Some(&1));
        assert_eq!(types[1].source, "HELAKURU_APP");
    }

    #[test]
    fn source_comparison_rates() {
        let mut records = vec![
            sourced("Galle", Some("WEB"), "TRAPPED", 2),
            sourced("Galle", Some("WEB"), "TRAPPED", 1),
            sourced("Galle", Some("WEB"), "TRAPPED", 1),
            sourced("Galle", Some("SMS"), "TRAPPED", 5),
        ];
        records[0].status = Some("RESCUED".to_string());
        records[1].status = Some("PENDING".to_string());
        records[2].status = Some("UNHEARD".to_string());
        records[0].priority = Some("CRITICAL".to_string());
        records[1].has_children = Some(true);

        let rows = source_comparison(&records);
        let web = &rows[0];
        assert_eq!(web.source, "WEB");
        assert_eq!(web.total, 3);
        assert_eq!(web.people, 4);
        assert_eq!(web.rescued, 1);
        assert_eq!(web.pending, 1);
        assert_eq!(web.verified, 0);
        assert_eq!(web.critical, 1);
        assert_eq!(web.with_children, 1);
        assert!((web.rescue_rate - 33.3).abs() < 1e-9);

        let people = people_by_source(&records);
        assert_eq!(people[0].source, "SMS");
        assert_eq!(people[0].people, 5);
        assert!((people[1].avg_people - 1.3).abs() < 1e-9);

        let dist = source_distribution(&records);
        assert_eq!(dist[0], SourceCount { source: "WEB".to_string(), count: 3 });
    }

    #[test]
    fn highly_critical_counts_as_critical_per_source() {
        let mut records = vec![
            sourced("Galle", Some("WEB"), "TRAPPED", 1),
            sourced("Galle", Some("WEB"), "TRAPPED", 1),
            sourced("Galle", Some("WEB"), "TRAPPED", 1),
        ];
        records[0].priority = Some("HIGHLY_CRITICAL".to_string());
        records[1].priority = Some("critical".to_string());
        records[2].priority = Some("HIGH".to_string());

        let rows = source_comparison(&records);
        assert_eq!(rows[0].critical, 2);
    }

    #[test]
    fn districts_by_source_filters_and_ranks() {
        let mut records = vec![
            sourced("Galle", Some("WEB"), "TRAPPED", 1),
            sourced("Kandy", Some("WEB"), "TRAPPED", 1),
            sourced("Kandy", Some("WEB"), "TRAPPED", 1),
            sourced("Galle", Some("SMS"), "TRAPPED", 1),
            sourced("Galle", None, "TRAPPED", 1),
            sourced("", None, "TRAPPED", 1),
        ];
        records.push(SosRecord::default());

        let web = districts_by_source(&records, Some("WEB"), 10);
        assert_eq!(
            web,
            vec![
                DistrictCount { district: "Kandy".to_string(), count: 2 },
                DistrictCount { district: "Galle".to_string(), count: 1 },
            ]
        );

        let other = districts_by_source(&records, Some("OTHER"), 10);
        assert_eq!(other[0], DistrictCount { district: "Unknown".to_string(), count: 2 });
        assert_eq!(other[1], DistrictCount { district: "Galle".to_string(), count: 1 });

        let all = districts_by_source(&records, None, 1);
        assert_eq!(all, vec![DistrictCount { district: "Galle".to_string(), count: 3 }]);
    }

    #[test]
    fn response_window_excludes_outliers() {
        let created = "2025-11-01T00:00:00Z";
        let zero = timed("A", created, Some(created), None);
        let too_long = timed("A", created, Some("2025-12-01T01:00:00Z"), None);
        let just_inside = timed("A", created, Some("2025-11-30T23:54:00Z"), None);
        let boundary = timed("A", created, Some("2025-12-01T00:00:00Z"), None);

        assert_eq!(response_hours(&zero), None);
        assert_eq!(response_hours(&too_long), None);
        let hours = response_hours(&just_inside).unwrap();
        assert!((hours - 719.9).abs() < 1e-9);
        assert_eq!(response_hours(&boundary), Some(720.0));
    }

    #[test]
    fn response_falls_back_to_completed_at() {
        let record = timed(
            "Kandy",
            "2025-11-01T00:00:00Z",
            None,
            Some("2025-11-01T06:00:00Z"),
        );
        assert_eq!(response_hours(&record), Some(6.0));

        let unparseable = timed("Kandy", "2025-11-01T00:00:00Z", Some("soon"), None);
        assert_eq!(response_hours(&unparseable), None);

        let garbled_rescue = timed(
            "Kandy",
            "2025-11-01T00:00:00Z",
            Some("soon"),
            Some("2025-11-01T06:00:00Z"),
        );
        assert_eq!(response_hours(&garbled_rescue), None);

        let blank_rescue = timed(
            "Kandy",
            "2025-11-01T00:00:00Z",
            Some(" "),
            Some("2025-11-01T03:00:00Z"),
        );
        assert_eq!(response_hours(&blank_rescue), Some(3.0));

        let negative = timed("Kandy", "2025-11-02T00:00:00Z", Some("2025-11-01T00:00:00Z"), None);
        assert_eq!(response_hours(&negative), None);
    }

    #[test]
    fn response_times_average_and_sort() {
        let records = vec![
            timed("Slow", "2025-11-01T00:00:00Z", Some("2025-11-01T10:00:00Z"), None),
            timed("Slow", "2025-11-01T00:00:00Z", Some("2025-11-01T05:00:00Z"), None),
            timed("Fast", "2025-11-01T00:00:00Z", Some("2025-11-01T01:20:00Z"), None),
            timed("Fast", "2025-11-01T00:00:00Z", Some("2025-11-01T00:00:00Z"), None),
            timed("", "2025-11-01T00:00:00Z", Some("2025-11-01T01:00:00Z"), None),
        ];
        let rows = response_times(&records);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].district, "Fast");
        assert_eq!(rows[0].count, 1);
        assert!((rows[0].avg_hours - 1.3).abs() < 1e-9);
        assert_eq!(rows[1].district, "Slow");
        assert!((rows[1].avg_hours - 7.5).abs() < 1e-9);
        assert!((overall_response_hours(&rows) - 4.4).abs() < 1e-9);
        assert_eq!(overall_response_hours(&[]), 0.0);
    }
}
