//! Output formatting for CLI commands
//!
//! Provides utilities for formatting command output in human-readable
//! or JSON formats. Supports colored output (respects NO_COLOR env var).

use crate::cli::OutputFormat;
use crate::core::types::{IndexStats, JobSnapshot, JobStatus};

/// Color scheme for CLI output
pub mod colors {
    use colored::{ColoredString, Colorize};

    /// Style for labels/headers
    pub fn label(s: &str) -> ColoredString {
        s.bold()
    }

    /// Style for site and job IDs
    pub fn id(s: &str) -> ColoredString {
        s.cyan()
    }

    /// Style for numbers/counts
    pub fn number(s: &str) -> ColoredString {
        s.yellow()
    }

    /// Style for success messages
    pub fn success(s: &str) -> ColoredString {
        s.green()
    }

    /// Style for warning messages
    pub fn warning(s: &str) -> ColoredString {
        s.yellow()
    }

    /// Style for error messages
    pub fn error(s: &str) -> ColoredString {
        s.red().bold()
    }

    /// Style for dim/secondary text
    pub fn dim(s: &str) -> ColoredString {
        s.dimmed()
    }
}

/// Format bytes into human-readable size
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    let gb_val = bytes as f64 / GB as f64;
    let mb_val = bytes as f64 / MB as f64;
    let kb_val = bytes as f64 / KB as f64;

    if bytes >= GB {
        format!("{gb_val:.1} GB")
    } else if bytes >= MB {
        format!("{mb_val:.1} MB")
    } else if bytes >= KB {
        format!("{kb_val:.1} KB")
    } else {
        format!("{bytes} B")
    }
}

/// Format duration into human-readable string
pub fn format_duration(secs: f64) -> String {
    if secs >= 60.0 {
        let mins = (secs / 60.0).floor();
        let remaining_secs = secs - (mins * 60.0);
        format!("{mins:.0}m {remaining_secs:.1}s")
    } else if secs >= 1.0 {
        format!("{secs:.2}s")
    } else {
        let ms = secs * 1000.0;
        format!("{ms:.0}ms")
    }
}

/// Format relative time (e.g., "2h ago", "3d ago")
pub fn format_relative_time(timestamp: &chrono::DateTime<chrono::Utc>) -> String {
    let now = chrono::Utc::now();
    let duration = now.signed_duration_since(*timestamp);

    let secs = duration.num_seconds();
    if secs < 0 {
        return "in the future".to_string();
    }

    let mins = duration.num_minutes();
    let hours = duration.num_hours();
    let days = duration.num_days();

    if days > 0 {
        format!("{days}d ago")
    } else if hours > 0 {
        format!("{hours}h ago")
    } else if mins > 0 {
        format!("{mins}m ago")
    } else {
        "just now".to_string()
    }
}

/// One-line progress summary of a running job
pub fn format_progress(snapshot: &JobSnapshot) -> String {
    let percent = (snapshot.progress * 100.0).floor();
    let mut line = format!(
        "[{percent:>3.0}%] sites {}/{}  files {}  folders {}",
        snapshot.sites_processed,
        snapshot.sites_total,
        snapshot.files_processed,
        snapshot.folders_processed
    );
    if let Some(site) = &snapshot.current_site {
        line.push_str(&format!("  {site}"));
        if let Some(folder) = &snapshot.current_folder {
            line.push_str(&format!(" {folder}"));
        }
    }
    line
}

/// Colored label for a job status
pub fn format_status(status: JobStatus) -> String {
    let text = status.as_str();
    match status {
        JobStatus::Completed => colors::success(text).to_string(),
        JobStatus::Failed => colors::error(text).to_string(),
        JobStatus::Cancelled => colors::warning(text).to_string(),
        JobStatus::Queued | JobStatus::Running => colors::dim(text).to_string(),
    }
}

/// Print index statistics in human-readable form
pub fn print_stats(stats: &IndexStats) {
    print_header("Index:");
    println!(
        "  Sites:   {}",
        colors::number(&stats.total_sites.to_string())
    );
    println!(
        "  Files:   {}",
        colors::number(&stats.total_files.to_string())
    );
    println!(
        "  Folders: {}",
        colors::number(&stats.total_folders.to_string())
    );
    println!("  Size:    {}", colors::number(&format_bytes(stats.total_size)));
    if let Some(last) = &stats.last_indexed {
        println!("  Indexed: {}", colors::dim(&format_relative_time(last)));
    }

    if !stats.file_types.is_empty() {
        print_header("File types:");
        for (file_type, count) in &stats.file_types {
            println!("  {:<10} {}", file_type, colors::number(&count.to_string()));
        }
    }

    if !stats.sites.is_empty() {
        print_header("Sites:");
        for site in &stats.sites {
            println!(
                "  {} ({}): {} files, {} folders, {}",
                site.site_name,
                colors::id(&site.site_id),
                colors::number(&site.total_files.to_string()),
                colors::number(&site.total_folders.to_string()),
                format_bytes(site.total_size)
            );
        }
    }
}

/// Print `data` as pretty JSON on stdout
pub fn print_json<T: serde::Serialize>(data: &T) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(data)?);
    Ok(())
}

/// Print a warning message
pub fn print_warning(message: &str) {
    eprintln!("{}: {}", colors::warning("Warning"), message);
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{}: {}", colors::error("Error"), message);
}

/// Print a header/title
pub fn print_header(title: &str) {
    println!("{}", colors::label(title));
}
