//! Formatting for sizes, durations and the build summary.

use console::Term;
use owo_colors::OwoColorize;
use std::time::Duration;

/// Human-readable byte count using binary units.
///
/// ```
/// use kiln_cli::ui::format_size;
///
/// assert_eq!(format_size(500), "500 B");
/// assert_eq!(format_size(1536), "1.50 KB");
/// ```
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];

    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }

    match unit {
        0 => format!("{bytes} B"),
        _ => format!("{size:.2} {}", UNITS[unit]),
    }
}

/// Milliseconds below one second, seconds below one minute, then `Xm Ys`.
pub fn format_duration(duration: Duration) -> String {
    let millis = duration.as_millis();
    if millis < 1000 {
        format!("{millis}ms")
    } else if millis < 60_000 {
        format!("{:.2}s", duration.as_secs_f64())
    } else {
        let secs = duration.as_secs();
        format!("{}m {}s", secs / 60, secs % 60)
    }
}

/// Print the files written by a build, with sizes and the build time.
///
/// ```no_run
/// use std::time::Duration;
/// use kiln_cli::ui::print_build_summary;
///
/// print_build_summary(
///     &[("public/index.js".to_string(), 15_234)],
///     Duration::from_millis(450),
/// );
/// ```
pub fn print_build_summary(files: &[(String, u64)], elapsed: Duration) {
    let term = Term::stderr();
    let width = (term.size().1 as usize).min(80);

    eprintln!("\n{}", "Build Summary".bold().underline());
    eprintln!("{}", "─".repeat(width));

    let name_width = files.iter().map(|(name, _)| name.len()).max().unwrap_or(0);
    for (name, size) in files {
        eprintln!(
            "  {:<name_width$}  {:>10}",
            name.cyan(),
            format_size(*size).dimmed(),
        );
    }

    eprintln!("{}", "─".repeat(width));

    let total_size: u64 = files.iter().map(|(_, size)| size).sum();
    eprintln!(
        "  {} {} in {}",
        "Total:".bold(),
        format_size(total_size).green(),
        format_duration(elapsed).green()
    );
}
