//! Text-table rendering for resolver output, group lists, and mutation
//! reports.

use colored::Colorize;

use fl_core::{BatchStatus, DisplayRow, GroupInfo, GroupMembership, MutationReport};

/// Lays out rows under headers with space-padded columns. Pure so the
/// layout is testable; callers print the result. Widths are measured in
/// chars, not bytes, so accented names stay aligned.
pub fn format_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (idx, cell) in row.iter().enumerate() {
            if idx < widths.len() {
                widths[idx] = widths[idx].max(cell.chars().count());
            }
        }
    }

    let mut out = String::new();
    let render_line = |cells: Vec<&str>| -> String {
        cells
            .iter()
            .enumerate()
            .map(|(idx, cell)| format!("{:<width$}", cell, width = widths[idx]))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };
    out.push_str(&render_line(headers.to_vec()));
    out.push('\n');
    out.push_str(&widths.iter().map(|w| "─".repeat(*w)).collect::<Vec<_>>().join("──"));
    out.push('\n');
    for row in rows {
        out.push_str(&render_line(row.iter().map(String::as_str).collect()));
        out.push('\n');
    }
    out
}

fn opt(value: &Option<String>) -> String {
    value.clone().unwrap_or_else(|| "-".to_string())
}

/// Prints the flattened assignment rows for one domain.
pub fn print_assignment_rows(rows: &[DisplayRow]) {
    if rows.is_empty() {
        println!("No assignments found");
        return;
    }
    let table_rows: Vec<Vec<String>> = rows
        .iter()
        .map(|row| {
            vec![
                row.subject_name.clone(),
                row.group_name.clone(),
                row.membership_kind
                    .map(|k| k.to_string())
                    .unwrap_or_else(|| "-".to_string()),
                row.audience
                    .map(|a| a.to_string())
                    .unwrap_or_else(|| "-".to_string()),
                opt(&row.intent),
                opt(&row.detail),
            ]
        })
        .collect();
    print!(
        "{}",
        format_table(
            &["Name", "Group", "Membership", "Audience", "Intent", "Detail"],
            &table_rows,
        )
    );
    for row in rows {
        if let Some(error) = &row.error {
            println!("  {} {}: {}", "!".red(), row.subject_name, error);
        }
    }
}

/// Prints an aggregated membership map, dynamic groups flagged.
pub fn print_membership(groups: &[&GroupMembership]) {
    if groups.is_empty() {
        println!("No group memberships found");
        return;
    }
    let rows: Vec<Vec<String>> = groups
        .iter()
        .map(|g| {
            vec![
                g.display_name.clone(),
                g.group_id.clone(),
                if g.is_dynamic { "dynamic" } else { "assigned" }.to_string(),
            ]
        })
        .collect();
    print!("{}", format_table(&["Group", "Id", "Membership"], &rows));
}

/// Prints group-search results, numbered for selection.
pub fn print_search_results(results: &[GroupInfo]) {
    if results.is_empty() {
        println!("No groups matched");
        return;
    }
    for (idx, group) in results.iter().enumerate() {
        let marker = if group.is_dynamic {
            " (dynamic, not selectable)".yellow().to_string()
        } else {
            String::new()
        };
        println!("  {}. {} [{}]{}", idx + 1, group.display_name.cyan(), group.id, marker);
    }
}

/// Prints a batch mutation report with per-group outcomes.
pub fn print_mutation_report(report: &MutationReport) {
    for outcome in &report.outcomes {
        match &outcome.error {
            None => println!("  {} {}", "ok".green(), outcome.group_name),
            Some(error) => println!("  {} {}: {}", "failed".red(), outcome.group_name, error),
        }
    }
    let status = match report.status {
        BatchStatus::AllSucceeded => "all succeeded".green(),
        BatchStatus::PartialFailure => "partial failure".yellow(),
        BatchStatus::AllFailed => "all failed".red(),
    };
    println!();
    println!("{}: {} ({})", "Result".bold(), report.summary, status);
}
