//! Rendering consumes the finished snapshot only; nothing here feeds back
//! into aggregation.

use crate::error::Result;
use crate::model::{AnalysisReport, PeriodBucket};
use console::style;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

pub fn output_json(report: &AnalysisReport) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(report)?);
    Ok(())
}

pub fn output_authors_ndjson(report: &AnalysisReport) -> Result<()> {
    for entry in &report.authors {
        println!("{}", serde_json::to_string(entry)?);
    }
    Ok(())
}

pub fn output_files_ndjson(report: &AnalysisReport) -> Result<()> {
    for entry in &report.files {
        println!("{}", serde_json::to_string(entry)?);
    }
    Ok(())
}

pub fn output_periods_ndjson(report: &AnalysisReport) -> Result<()> {
    for entry in &report.periods {
        println!("{}", serde_json::to_string(entry)?);
    }
    Ok(())
}

pub fn output_authors_table(report: &AnalysisReport, limit: usize) {
    println!(
        "{:<30} {:>7} {:>7} {:>8} {:>8} {:>8} {:>6} {:>6}",
        style("Author").bold(),
        style("Commits").bold(),
        style("Merges").bold(),
        style("Added").bold(),
        style("Deleted").bold(),
        style("Net").bold(),
        style("Files").bold(),
        style("Days").bold()
    );
    println!("{}", "─".repeat(88));
    for entry in report.authors.iter().take(limit) {
        println!(
            "{:<30} {:>7} {:>7} {:>8} {:>8} {:>8} {:>6} {:>6}",
            truncate(&entry.display_name, 30),
            entry.commits,
            entry.merges,
            entry.added_lines,
            entry.deleted_lines,
            entry.net_lines,
            entry.files_touched,
            entry.active_days
        );
    }
    if report.authors.len() > limit {
        println!("\n... and {} more authors", report.authors.len() - limit);
    }
    print_run_notes(report);
}

pub fn output_files_table(report: &AnalysisReport, limit: usize) {
    println!(
        "{:<50} {:>8} {:>8} {:>8} {:>7} {:>7} {:>7}",
        style("Path").bold(),
        style("Added").bold(),
        style("Deleted").bold(),
        style("Churn").bold(),
        style("Commits").bold(),
        style("Authors").bold(),
        style("Binary").bold()
    );
    println!("{}", "─".repeat(100));
    for entry in report.files.iter().take(limit) {
        println!(
            "{:<50} {:>8} {:>8} {:>8} {:>7} {:>7} {:>7}",
            truncate(&entry.path, 50),
            entry.added_lines,
            entry.deleted_lines,
            entry.churn,
            entry.commits,
            entry.authors,
            entry.binary_changes
        );
    }
    if report.files.len() > limit {
        println!("\n... and {} more entries", report.files.len() - limit);
    }
    print_run_notes(report);
}

pub fn output_activity(report: &AnalysisReport) {
    if report.periods.is_empty() {
        println!("No data to display");
        return;
    }

    let bucket_name = match report.bucket {
        PeriodBucket::Day => "Daily",
        PeriodBucket::Week => "Weekly",
        PeriodBucket::Month => "Monthly",
    };
    println!("{}", style(format!("{bucket_name} Activity")).bold());
    println!("{}", "─".repeat(60));

    let max_commits = report.periods.iter().map(|p| p.commits).max().unwrap_or(1);
    let max_churn = report.periods.iter().map(|p| p.churn).max().unwrap_or(1);

    for period in &report.periods {
        let commit_intensity = ((period.commits as f64 / max_commits as f64) * 5.0) as u32;
        let churn_intensity = ((period.churn as f64 / max_churn as f64) * 5.0) as u32;

        let commit_char = match commit_intensity {
            0 => " ",
            1 => "▁",
            2 => "▃",
            3 => "▅",
            4 => "▇",
            _ => "█",
        };
        let churn_char = match churn_intensity {
            0 => " ",
            1 => "░",
            2 => "▒",
            3 => "▓",
            _ => "█",
        };

        println!(
            "{:<10} {} {} commits: {:>4}, churn: {:>7}, authors: {:>3}",
            period.period,
            style(commit_char).green(),
            style(churn_char).blue(),
            period.commits,
            period.churn,
            period.authors
        );
    }

    println!("\n{}", style("Legend").bold());
    println!("  {} commit intensity", style("▁▃▅▇█").green());
    println!("  {} churn intensity", style("░▒▓█").blue());
    print_run_notes(report);
}

pub fn output_summary(report: &AnalysisReport) {
    println!("{}", style("Repository Summary").bold());
    println!("{}", "─".repeat(50));

    let totals = &report.totals;
    println!("Total commits: {}", style(totals.commits).cyan());
    println!("Merge commits: {}", style(totals.merges).cyan());
    println!("Lines added: {}", style(totals.added_lines).green());
    println!("Lines deleted: {}", style(totals.deleted_lines).red());
    println!("Net lines: {}", style(totals.net_lines).cyan());
    println!("Binary changes: {}", style(totals.binary_changes).yellow());
    println!("Authors: {}", style(report.authors.len()).yellow());
    println!(
        "Avg files/commit: {}",
        style(format!("{:.2}", totals.avg_files_per_commit())).cyan()
    );

    if let (Some(first), Some(last)) = (totals.first_commit, totals.last_commit) {
        println!(
            "Date range: {} to {}",
            style(first.format("%Y-%m-%d")).dim(),
            style(last.format("%Y-%m-%d")).dim()
        );
    }

    if !report.authors.is_empty() {
        println!("\n{}", style("Top Authors").bold());
        for entry in report.authors.iter().take(5) {
            println!(
                "  {:<30} {:>6} commits, {:>8} churn",
                truncate(&entry.display_name, 30),
                entry.commits,
                entry.churn
            );
        }
    }

    if !report.extensions.is_empty() {
        println!("\n{}", style("Top Extensions").bold());
        for entry in report.extensions.iter().take(5) {
            let name = if entry.extension.is_empty() {
                "(none)"
            } else {
                &entry.extension
            };
            println!(
                "  {:<10} {:>6} commits, {:>6} files, +{} -{}",
                name, entry.commits, entry.files_changed, entry.added_lines, entry.deleted_lines
            );
        }
    }

    print_run_notes(report);
}

fn print_run_notes(report: &AnalysisReport) {
    if report.partial {
        println!(
            "\n{}",
            style("Note: analysis stopped early; results are partial.").yellow()
        );
    }
    if !report.skipped.is_empty() {
        println!(
            "\n{}",
            style(format!("{} commit(s) skipped:", report.skipped.len())).yellow()
        );
        for skip in &report.skipped {
            println!("  {} {}", short_hash(&skip.hash), skip.reason);
        }
    }
}

pub fn write_markdown<P: AsRef<Path>>(report: &AnalysisReport, path: P) -> Result<()> {
    let mut md = String::new();
    writeln!(md, "# Analysis Report: {}", report.repository_path).ok();
    writeln!(md).ok();
    writeln!(md, "## Summary").ok();
    writeln!(md, "- Total commits: {}", report.totals.commits).ok();
    writeln!(
        md,
        "- Lines added: {}, deleted: {}, net: {}",
        report.totals.added_lines, report.totals.deleted_lines, report.totals.net_lines
    )
    .ok();
    writeln!(md, "- Merge commits: {}", report.totals.merges).ok();
    if let (Some(first), Some(last)) = (report.totals.first_commit, report.totals.last_commit) {
        writeln!(
            md,
            "- Period: {} to {}",
            first.format("%Y-%m-%d"),
            last.format("%Y-%m-%d")
        )
        .ok();
    }
    if report.partial {
        writeln!(md, "- **Partial analysis**: traversal stopped early").ok();
    }

    writeln!(md).ok();
    writeln!(md, "## Top Authors").ok();
    writeln!(md, "| Author | Commits | Added | Deleted | Net |").ok();
    writeln!(md, "|---|---|---|---|---|").ok();
    for entry in report.authors.iter().take(10) {
        writeln!(
            md,
            "| {} | {} | {} | {} | {} |",
            entry.display_name, entry.commits, entry.added_lines, entry.deleted_lines, entry.net_lines
        )
        .ok();
    }

    writeln!(md).ok();
    writeln!(md, "## Top Files by Churn").ok();
    writeln!(md, "| Path | Churn | Commits | Authors |").ok();
    writeln!(md, "|---|---|---|---|").ok();
    for entry in report.files.iter().take(10) {
        writeln!(
            md,
            "| {} | {} | {} | {} |",
            entry.path, entry.churn, entry.commits, entry.authors
        )
        .ok();
    }

    if !report.skipped.is_empty() {
        writeln!(md).ok();
        writeln!(md, "## Skipped Commits").ok();
        for skip in &report.skipped {
            writeln!(md, "- `{}`: {}", short_hash(&skip.hash), skip.reason).ok();
        }
    }

    fs::write(path, md)?;
    Ok(())
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max.saturating_sub(1)).collect();
        format!("{cut}…")
    }
}

fn short_hash(hash: &str) -> String {
    hash.chars().take(8).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::Aggregator;
    use crate::extract::Extractor;
    use crate::identity::AliasTable;
    use crate::model::{MergeDiffMode, SkippedCommit};
    use crate::source::memory::record;

    fn sample_report() -> AnalysisReport {
        let aliases = AliasTable::empty();
        let extractor = Extractor::new(&aliases, MergeDiffMode::None);
        let mut agg = Aggregator::new(PeriodBucket::Week);
        agg.record_commit(&extractor.extract(&record("a", &[], ("Jane", "jane@x.com"), 0, vec![])));
        agg.finish(
            "/tmp/repo".to_string(),
            vec![SkippedCommit {
                hash: "0123456789abcdef".to_string(),
                reason: "unreadable".to_string(),
            }],
            true,
        )
    }

    #[test]
    fn markdown_report_mentions_partial_and_skipped() {
        let report = sample_report();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.md");
        write_markdown(&report, &path).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("Partial analysis"));
        assert!(content.contains("01234567"));
        assert!(content.contains("Jane"));
    }

    #[test]
    fn truncate_keeps_short_strings_intact() {
        assert_eq!(truncate("short", 30), "short");
        assert_eq!(truncate("abcdefgh", 5), "abcd…");
    }
}
