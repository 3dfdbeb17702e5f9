use std::fmt::Write;

use chrono::{DateTime, TimeZone, Utc};

use crate::classify::{EmergencyCategory, Priority};
use crate::crosstab::{overall_response_hours, response_times, source_comparison};
use crate::models::{DistrictSummary, SosRecord};
use crate::summary::{calculate_totals, summarize_districts};
use crate::timeline::daily_counts;

pub const CSV_HEADERS: [&str; 18] = [
    "District",
    "Total Cases",
    "Total People",
    "Pending",
    "Verified",
    "Rescued",
    "Cannot Contact",
    "Missing",
    "Critical",
    "High",
    "Medium",
    "Low",
    "Trapped",
    "Food/Water",
    "Medical",
    "Rescue",
    "Missing Person",
    "Other",
];

fn csv_row(d: &DistrictSummary) -> Vec<String> {
    let mut row = vec![d.district.clone()];
    row.extend(
        [
            d.total,
            d.total_people,
            d.pending,
            d.verified,
            d.rescued,
            d.cannot_contact,
            d.missing,
            d.critical,
            d.high,
            d.medium,
            d.low,
            d.trapped,
            d.food_water,
            d.medical,
            d.rescue_assistance,
            d.missing_person,
            d.other,
        ]
        .iter()
        .map(u64::to_string),
    );
    row
}

/// One CSV row per district, columns in [`CSV_HEADERS`] order.
pub fn write_csv<W: std::io::Write>(out: W, summaries: &[DistrictSummary]) -> csv::Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(CSV_HEADERS)?;
    for summary in summaries {
        writer.write_record(csv_row(summary))?;
    }
    writer.flush()?;
    Ok(())
}

pub fn export_file_name(now: DateTime<Utc>) -> String {
    format!("flood-support-report-{}.csv", now.date_naive())
}

pub fn build_report<Tz: TimeZone>(
    scope: Option<&str>,
    generated_at: DateTime<Utc>,
    records: &[&SosRecord],
    tz: &Tz,
) -> String {
    let summaries = summarize_districts(records.iter().copied());
    let totals = calculate_totals(&summaries);

    let mut output = String::new();
    let scope_label = scope.unwrap_or("all records");

    let _ = writeln!(output, "# Flood SOS District Report");
    let _ = writeln!(
        output,
        "Generated for {} at {}",
        scope_label,
        generated_at.format("%Y-%m-%d %H:%M UTC")
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## Headline");

    if totals.total == 0 {
        let _ = writeln!(output, "No cases recorded for this scope.");
        return output;
    }

    for (label, value) in [
        ("Total cases", totals.total),
        ("People affected", totals.total_people),
        ("Critical", totals.critical),
        ("Pending", totals.pending),
        ("Verified", totals.verified),
        ("Rescued", totals.rescued),
        ("Missing", totals.missing),
        ("Cannot contact", totals.cannot_contact),
    ] {
        let _ = writeln!(output, "- {label}: {value}");
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Districts");
    let _ = writeln!(
        output,
        "| District | Cases | People | Pending | Verified | Rescued | Critical | High | Medium | Low |"
    );
    let _ = writeln!(output, "|---|---|---|---|---|---|---|---|---|---|");
    for d in &summaries {
        let _ = write!(
            output,
            "| {} | {} | {} | {} | {} | {} |",
            d.district, d.total, d.total_people, d.pending, d.verified, d.rescued
        );
        for priority in Priority::ALL {
            let _ = write!(output, " {} |", d.priority_count(priority));
        }
        let _ = writeln!(output);
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Emergency Mix");
    for category in EmergencyCategory::ALL {
        let count = totals.emergency_count(category);
        if count > 0 {
            let _ = writeln!(
                output,
                "- {}: {} ({:.1}%)",
                category.label(),
                count,
                count as f64 / totals.total as f64 * 100.0
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Sources");
    for source in source_comparison(records.iter().copied()) {
        let _ = writeln!(
            output,
            "- {}: {} cases, {} people, rescue rate {:.1}%",
            source.source, source.total, source.people, source.rescue_rate
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Response Times");
    let times = response_times(records.iter().copied());
    if times.is_empty() {
        let _ = writeln!(output, "No resolved cases with usable timestamps.");
    } else {
        let _ = writeln!(
            output,
            "Average across districts: {:.1} hours",
            overall_response_hours(&times)
        );
        for row in times.iter().take(15) {
            let _ = writeln!(
                output,
                "- {}: {:.1} hours over {} cases",
                row.district, row.avg_hours, row.count
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Daily Submissions");
    let days = daily_counts(records.iter().copied(), tz);
    if days.is_empty() {
        let _ = writeln!(output, "No dated submissions.");
    } else {
        for day in &days {
            let _ = writeln!(output, "- {}: {}", day.date, day.count);
        }
    }

    output
}
