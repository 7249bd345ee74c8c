//! Output formatting utilities

use colored::*;

/// Scale an operation rate to `Mops`, `Kops` or `ops`
pub fn format_throughput(ops: usize, seconds: f64) -> String {
    let rate = if seconds > 0.0 {
        ops as f64 / seconds
    } else {
        f64::INFINITY
    };
    if rate >= 1e6 {
        format!("{:.3} Mops", rate * 1e-6)
    } else if rate >= 1e3 {
        format!("{:.3} Kops", rate * 1e-3)
    } else {
        format!("{:.3} ops", rate)
    }
}

/// Prefix-length histogram, one line per populated length
pub fn format_histogram(histogram: &[usize]) -> String {
    let max = histogram.iter().copied().max().unwrap_or(0).max(1);
    let mut output = String::new();
    for (len, &count) in histogram.iter().enumerate() {
        if count == 0 {
            continue;
        }
        let bar = "#".repeat((count * 40).div_ceil(max));
        output.push_str(&format!("  /{:<2} {:>8}  {}\n", len, count, bar.dimmed()));
    }
    output
}

/// Format error message
pub fn format_error(msg: &str) -> String {
    format!("{} {}", "Error:".red().bold(), msg)
}

/// Format success message
pub fn format_success(msg: &str) -> String {
    format!("{} {}", "✓".green().bold(), msg)
}

/// Format info message
pub fn format_info(msg: &str) -> String {
    format!("{} {}", "→".green().bold(), msg)
}
