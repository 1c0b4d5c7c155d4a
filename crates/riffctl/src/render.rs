use anyhow::Result;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use kcriff::manifest::Model;
use kcriff::{BatchReport, DownloadOutcome};

pub fn member_style() -> Result<ProgressStyle> {
    Ok(
        ProgressStyle::with_template("{msg:24} [{bar:40.cyan/blue}] {pos:>3}%")?
            .progress_chars("=>-"),
    )
}

pub fn overall_style() -> Result<ProgressStyle> {
    Ok(
        ProgressStyle::with_template("{msg:24} [{bar:40.green/white}] {pos:>3}%")?
            .progress_chars("#>-"),
    )
}

pub fn percent(progress: f64) -> u64 {
    progress.clamp(0.0, 100.0).round() as u64
}

/// Human-readable byte count in decimal units.
pub fn size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1000.0 && unit < UNITS.len() - 1 {
        value /= 1000.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

pub fn parameters(count: u64) -> String {
    match count {
        0 => "-".to_string(),
        n if n >= 1_000_000_000 => format!("{:.1}B", n as f64 / 1e9),
        n => format!("{:.0}M", n as f64 / 1e6),
    }
}

pub fn model_row(model: &Model) -> String {
    let mut flags = Vec::new();
    if model.downloaded {
        flags.push("downloaded".green().to_string());
    }
    if model.recommended {
        flags.push("recommended".yellow().to_string());
    }
    format!(
        "{:<24} {:>9} {:>7}  {}",
        model.name.cyan(),
        size(model.size_bytes),
        parameters(model.parameter_count),
        flags.join(" ")
    )
}

pub fn finish_bar(bar: &ProgressBar, outcome: &DownloadOutcome) {
    if let DownloadOutcome::Completed(status) = outcome {
        bar.set_position(percent(status.progress));
    }
    let label = match outcome {
        DownloadOutcome::Completed(_) => "✅ done".green(),
        DownloadOutcome::Cancelled => "⏹ cancelled".yellow(),
        other => format!("❌ {}", other).red(),
    };
    bar.finish_with_message(format!("{} {}", bar.message(), label));
}

pub fn summary(report: &BatchReport) -> String {
    let mut lines = vec![format!(
        "{} succeeded, {} failed, {} cancelled",
        report.succeeded().len().to_string().green(),
        report.failed().len().to_string().red(),
        report.cancelled().len().to_string().yellow()
    )];
    for member in report.outcomes.iter().filter(|m| m.outcome.is_failure()) {
        lines.push(format!("  {} {}", member.model.red(), member.outcome));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sizes_use_decimal_units() {
        assert_eq!(size(512), "512 B");
        assert_eq!(size(4_100_000_000), "4.1 GB");
        assert_eq!(size(1_500_000), "1.5 MB");
    }

    #[test]
    fn parameter_counts() {
        assert_eq!(parameters(7_300_000_000), "7.3B");
        assert_eq!(parameters(350_000_000), "350M");
        assert_eq!(parameters(0), "-");
    }

    #[test]
    fn percent_is_clamped() {
        assert_eq!(percent(97.5), 98);
        assert_eq!(percent(-3.0), 0);
        assert_eq!(percent(140.0), 100);
    }
}
