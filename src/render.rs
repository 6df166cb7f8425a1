//! Terminal tables for the `lotcost` commands.

use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color, ContentArrangement, Table};
use core_types::{
    ChargeTypeDeviationRecord, ConsistencyIssue, DeviationTier, ExporterConsistencyResult,
    OutlierRecord, Severity,
};
use detectors::Detection;
use engine::{ChargeBreakdownLine, ConsistencyReport};
use rust_decimal::Decimal;

fn new_table(header: Vec<&str>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    table
}

fn severity_cell(severity: Severity) -> Cell {
    let color = match severity {
        Severity::High => Color::Red,
        Severity::Medium => Color::Yellow,
        Severity::Low => Color::Green,
    };
    Cell::new(severity).fg(color)
}

fn money(amount: Decimal) -> String {
    amount.round_dp(2).to_string()
}

fn cost(cost: Option<Decimal>) -> String {
    cost.map(|c| c.round_dp(4).to_string())
        .unwrap_or_else(|| "n/a".to_string())
}

pub fn print_report(report: &ConsistencyReport, min_severity: Option<Severity>) {
    let global = &report.baseline.global;
    println!(
        "{} lots ({} without a cost); market average {:.4}/box, sd {:.4}, CV {:.1}%",
        report.summary.lots,
        report.summary.lots_without_cost,
        global.mean,
        global.std_dev,
        global.cv
    );
    println!(
        "Issues: {} high, {} medium, {} low ({} statistical outliers); {} consistent lots",
        report.summary.high_issues,
        report.summary.medium_issues,
        report.summary.low_issues,
        report.summary.statistical_outliers,
        report.summary.consistent_lots
    );

    println!("\nInternal consistency");
    let issues: Vec<&ConsistencyIssue> = match min_severity {
        Some(min) => report.issues_at_least(min).collect(),
        None => report.internal_issues.iter().collect(),
    };
    print_issues(&issues);

    println!("\nExporters vs market");
    print_exporters(&report.exporter_results);

    println!("\nPopulation outliers (2σ)");
    print_outliers(&report.population_outliers);
}

fn print_issues(issues: &[&ConsistencyIssue]) {
    let mut table = new_table(vec![
        "Lot", "Exporter", "Severity", "Kind", "Cost/box", "Charges", "Detail",
    ]);
    for issue in issues {
        table.add_row(vec![
            Cell::new(&issue.lot_id),
            Cell::new(&issue.exporter),
            severity_cell(issue.severity),
            Cell::new(issue.kind),
            Cell::new(cost(issue.cost_per_box)),
            Cell::new(money(issue.total_charges)),
            Cell::new(&issue.description),
        ]);
    }
    println!("{table}");
}

fn print_exporters(results: &[ExporterConsistencyResult]) {
    let mut table = new_table(vec![
        "Exporter", "Lots", "Avg cost/box", "CV %", "Class", "σ vs market", "vs market %",
        "Severity", "Notes",
    ]);
    for result in results {
        table.add_row(vec![
            Cell::new(&result.exporter),
            Cell::new(format!("{}/{}", result.valid_lots, result.total_lots)),
            Cell::new(format!("{:.4}", result.avg_cost_per_box)),
            Cell::new(format!("{:.1}", result.cv)),
            Cell::new(result.classification),
            Cell::new(format!("{:.2}", result.deviation_from_global_sigma)),
            Cell::new(format!(
                "{:+.1} ({})",
                result.performance_vs_market_pct, result.performance_category
            )),
            severity_cell(result.severity),
            Cell::new(result.issues.join("; ")),
        ]);
    }
    println!("{table}");
}

fn print_outliers(outliers: &[OutlierRecord]) {
    let mut table = new_table(vec!["Lot", "Exporter", "Cost/box", "σ", "Direction"]);
    for outlier in outliers {
        table.add_row(vec![
            Cell::new(&outlier.lot_id),
            Cell::new(&outlier.exporter),
            Cell::new(cost(Some(outlier.cost_per_box))),
            Cell::new(format!("{:.2}", outlier.deviation_sigma)),
            Cell::new(format!("{:?}", outlier.direction)),
        ]);
    }
    println!("{table}");
}

fn print_deviations(records: &[ChargeTypeDeviationRecord]) {
    let mut table = new_table(vec!["Lot", "Exporter", "Cost/box", "Deviation %", "Tier"]);
    for record in records {
        let color = match record.severity {
            DeviationTier::High => Color::Red,
            DeviationTier::Medium => Color::Yellow,
            DeviationTier::Normal => Color::Green,
        };
        table.add_row(vec![
            Cell::new(&record.lot_id),
            Cell::new(&record.exporter),
            Cell::new(cost(Some(record.cost_per_box))),
            Cell::new(format!("{:+}", record.percentage_deviation.round_dp(2))),
            Cell::new(record.severity).fg(color),
        ]);
    }
    println!("{table}");
}

pub fn print_detection(detection: &Detection) {
    if detection.is_empty() {
        println!("No records.");
        return;
    }
    match detection {
        Detection::Internal(issues) => {
            let issues: Vec<&ConsistencyIssue> = issues.iter().collect();
            print_issues(&issues);
        }
        Detection::Population(outliers) => print_outliers(outliers),
        Detection::ChargeType(records) => print_deviations(records),
    }
}

pub fn print_breakdown(lot_id: &str, lines: &[ChargeBreakdownLine]) {
    let mut table = new_table(vec!["Charge type", "Amount", "Counted"]);
    let mut counted = Decimal::ZERO;
    for line in lines {
        if !line.excluded {
            counted = counted.saturating_add(line.amount);
        }
        table.add_row(vec![
            Cell::new(&line.charge_type),
            Cell::new(money(line.amount)),
            Cell::new(if line.excluded { "no (excluded)" } else { "yes" }),
        ]);
    }
    println!("Lot {lot_id}: {} counted toward cost", money(counted));
    println!("{table}");
}
