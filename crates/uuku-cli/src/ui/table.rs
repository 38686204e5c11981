//! Tables for install plans and version checks.

use comfy_table::presets::NOTHING;
use comfy_table::{Cell, Color, Table};
use uuku_core::pipeline::{CheckReport, InstallReport};
use uuku_core::plan::InstallPlan;

fn table(header: &[&str]) -> Table {
    let mut table = Table::new();
    table.load_preset(NOTHING).set_header(header.to_vec());
    table
}

/// Install plan: one row per package, in install order.
pub fn plan_table(plan: &InstallPlan) -> Table {
    let mut table = table(&["#", "Role", "Package"]);
    for (i, step) in plan.steps().iter().enumerate() {
        table.add_row(vec![
            Cell::new(i + 1).fg(Color::DarkGrey),
            Cell::new(step.role.label()),
            Cell::new(step.file.as_str()).fg(Color::Cyan),
        ]);
    }
    table
}

/// Per-package result of an install run.
pub fn report_table(report: &InstallReport) -> Table {
    let mut table = table(&["Package", "Result"]);
    for file in &report.installed {
        table.add_row(vec![
            Cell::new(file.as_str()),
            Cell::new("installed").fg(Color::Green),
        ]);
    }
    for (file, reason) in &report.failed {
        table.add_row(vec![
            Cell::new(file.as_str()),
            Cell::new(format!("failed: {reason}")).fg(Color::Red),
        ]);
    }
    for image in &report.signed {
        table.add_row(vec![
            Cell::new(image.display()),
            Cell::new("signed").fg(Color::Green),
        ]);
    }
    table
}

/// Latest upstream version next to the running kernel.
pub fn check_table(report: &CheckReport) -> Table {
    let status = match &report.reason {
        Some(reason) => Cell::new(reason).fg(Color::Green),
        None => Cell::new("update available").fg(Color::Yellow),
    };
    let mut table = table(&["Latest", "Running", "Status"]);
    table.add_row(vec![
        Cell::new(&report.latest).fg(Color::Cyan),
        Cell::new(&report.running),
        status,
    ]);
    table
}
