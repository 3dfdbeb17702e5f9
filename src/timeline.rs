use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Timelike, Utc};
use serde::Serialize;

use crate::classify::{category_label, Priority, Status};
use crate::models::{
    CumulativeCount, DailyBreakdown, DailyCount, HourlyCount, RescueDay, SosRecord,
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, clap::ValueEnum)]
pub enum TimeRange {
    #[default]
    All,
    #[value(name = "7d")]
    Last7Days,
    #[value(name = "24h")]
    Last24Hours,
}

impl TimeRange {
    pub fn cutoff(self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            TimeRange::All => None,
            TimeRange::Last7Days => Some(now - Duration::days(7)),
            TimeRange::Last24Hours => Some(now - Duration::hours(24)),
        }
    }

    pub fn contains(self, at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        self.cutoff(now).map_or(true, |cutoff| at >= cutoff)
    }

    /// Records created inside the range; undated records are dropped.
    pub fn select<'a, I>(self, records: I, now: DateTime<Utc>) -> Vec<&'a SosRecord>
    where
        I: IntoIterator<Item = &'a SosRecord>,
    {
        records
            .into_iter()
            .filter(|r| r.created().is_some_and(|at| self.contains(at, now)))
            .collect()
    }
}

pub fn date_key<Tz: TimeZone>(at: DateTime<Utc>, tz: &Tz) -> NaiveDate {
    at.with_timezone(tz).date_naive()
}

/// Local date and hour with minutes and seconds zeroed.
pub fn hour_key<Tz: TimeZone>(at: DateTime<Utc>, tz: &Tz) -> NaiveDateTime {
    let local = at.with_timezone(tz).naive_local();
    local
        .date()
        .and_hms_opt(local.hour(), 0, 0)
        .unwrap_or(local)
}

fn count_by<'a, I, K, F>(records: I, key: F) -> BTreeMap<K, u64>
where
    I: IntoIterator<Item = &'a SosRecord>,
    K: Ord,
    F: Fn(DateTime<Utc>) -> K,
{
    let mut counts = BTreeMap::new();
    for at in records.into_iter().filter_map(SosRecord::created) {
        *counts.entry(key(at)).or_insert(0) += 1;
    }
    counts
}

pub fn daily_counts<'a, I, Tz>(records: I, tz: &Tz) -> Vec<DailyCount>
where
    I: IntoIterator<Item = &'a SosRecord>,
    Tz: TimeZone,
{
    count_by(records, |at| date_key(at, tz))
        .into_iter()
        .map(|(date, count)| DailyCount { date, count })
        .collect()
}

pub fn hourly_counts<'a, I, Tz>(records: I, tz: &Tz) -> Vec<HourlyCount>
where
    I: IntoIterator<Item = &'a SosRecord>,
    Tz: TimeZone,
{
    count_by(records, |at| hour_key(at, tz))
        .into_iter()
        .map(|(hour, count)| HourlyCount { hour, count })
        .collect()
}

/// Daily counts in date order with a running total.
pub fn cumulative_counts<'a, I, Tz>(records: I, tz: &Tz) -> Vec<CumulativeCount>
where
    I: IntoIterator<Item = &'a SosRecord>,
    Tz: TimeZone,
{
    daily_counts(records, tz)
        .into_iter()
        .scan(0u64, |running, day| {
            *running += day.count;
            Some(CumulativeCount {
                date: day.date,
                count: day.count,
                cumulative: *running,
            })
        })
        .collect()
}

/// Rescued and completed cases per day of resolution (rescuedAt, completedAt,
/// then updatedAt). `range` applies to that resolution date.
pub fn rescue_timeline<'a, I, Tz>(
    records: I,
    tz: &Tz,
    range: TimeRange,
    now: DateTime<Utc>,
) -> Vec<RescueDay>
where
    I: IntoIterator<Item = &'a SosRecord>,
    Tz: TimeZone,
{
    let mut days: BTreeMap<NaiveDate, (u64, u64)> = BTreeMap::new();

    for record in records {
        let status = Status::classify(record.status.as_deref());
        let has_resolution = record.rescued_at.is_some() || record.completed_at.is_some();
        if !has_resolution && !status.counts_as_rescued() {
            continue;
        }
        let Some(at) = record
            .rescued()
            .or_else(|| record.completed())
            .or_else(|| record.updated())
        else {
            continue;
        };
        if !range.contains(at, now) {
            continue;
        }
        let day = days.entry(date_key(at, tz)).or_insert((0, 0));
        match status {
            Status::Rescued => day.0 += 1,
            Status::Completed => day.1 += 1,
            _ => {}
        }
    }

    days.into_iter()
        .map(|(date, (rescued, completed))| RescueDay {
            date,
            rescued,
            completed,
            total: rescued + completed,
        })
        .collect()
}

fn daily_breakdown<'a, I, Tz, F>(records: I, tz: &Tz, label: F) -> Vec<DailyBreakdown>
where
    I: IntoIterator<Item = &'a SosRecord>,
    Tz: TimeZone,
    F: Fn(&SosRecord) -> Option<String>,
{
    let mut days: BTreeMap<NaiveDate, BTreeMap<String, u64>> = BTreeMap::new();
    for record in records {
        let (Some(at), Some(label)) = (record.created(), label(record)) else {
            continue;
        };
        *days
            .entry(date_key(at, tz))
            .or_default()
            .entry(label)
            .or_insert(0) += 1;
    }
    days.into_iter()
        .map(|(date, counts)| DailyBreakdown { date, counts })
        .collect()
}

/// Per-day status counts; records without a status are skipped.
pub fn status_timeline<'a, I, Tz>(records: I, tz: &Tz) -> Vec<DailyBreakdown>
where
    I: IntoIterator<Item = &'a SosRecord>,
    Tz: TimeZone,
{
    daily_breakdown(records, tz, |r| {
        r.status.as_deref().filter(|s| !s.trim().is_empty())?;
        Some(category_label(
            Status::classify(r.status.as_deref()).as_str(),
            r.status.as_deref(),
        ))
    })
}

pub fn priority_timeline<'a, I, Tz>(records: I, tz: &Tz) -> Vec<DailyBreakdown>
where
    I: IntoIterator<Item = &'a SosRecord>,
    Tz: TimeZone,
{
    daily_breakdown(records, tz, |r| {
        r.priority.as_deref().filter(|p| !p.trim().is_empty())?;
        Some(category_label(
            Priority::classify(r.priority.as_deref()).as_str(),
            r.priority.as_deref(),
        ))
    })
}

pub fn source_timeline<'a, I, Tz>(records: I, tz: &Tz) -> Vec<DailyBreakdown>
where
    I: IntoIterator<Item = &'a SosRecord>,
    Tz: TimeZone,
{
    daily_breakdown(records, tz, |r| Some(r.source_key().to_string()))
}

/// Daily counts for the `top_n` busiest districts only.
pub fn district_timeline<'a, I, Tz>(records: I, tz: &Tz, top_n: usize) -> Vec<DailyBreakdown>
where
    I: IntoIterator<Item = &'a SosRecord>,
    Tz: TimeZone,
{
    let records: Vec<&'a SosRecord> = records.into_iter().collect();

    let mut order: Vec<(&str, u64)> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();
    for district in records.iter().copied().filter_map(SosRecord::known_district) {
        match index.get(district) {
            Some(&slot) => order[slot].1 += 1,
            None => {
                index.insert(district, order.len());
                order.push((district, 1));
            }
        }
    }
    order.sort_by(|a, b| b.1.cmp(&a.1));
    let top: Vec<&str> = order.into_iter().take(top_n).map(|(d, _)| d).collect();

    daily_breakdown(records, tz, |r| {
        r.known_district()
            .filter(|d| top.contains(d))
            .map(str::to_string)
    })
}
