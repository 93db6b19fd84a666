//! Crawl command - run one indexing job in-process

use crate::cli::output::{self, colors, format_duration, format_progress, format_status};
use crate::cli::OutputFormat;
use crate::core::config::Config;
use crate::core::services::Services;
use crate::core::types::{IndexStats, JobSnapshot, JobStatus, SiteSelection};
use clap::Args;
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;
use std::time::Instant;

/// Arguments for the crawl command
#[derive(Args, Debug)]
pub struct CrawlArgs {
    /// JSON provider fixture (overrides [provider].fixture)
    #[arg(long)]
    pub fixture: Option<PathBuf>,

    /// Site to index, as ID (content and mail), ID:content or ID:mail.
    /// Repeat for several sites. Defaults to the content of every site.
    #[arg(long, short = 's', value_parser = parse_site)]
    pub site: Vec<SiteSelection>,

    /// Suppress progress output
    #[arg(long, short = 'q')]
    pub quiet: bool,
}

/// Crawl result response
#[derive(Debug, Serialize)]
pub struct CrawlResponse {
    pub job: JobSnapshot,
    pub stats: IndexStats,
    pub duration_secs: f64,
}

/// Parse `ID`, `ID:content` or `ID:mail`
pub fn parse_site(raw: &str) -> Result<SiteSelection, String> {
    let raw = raw.trim();
    let selection = match raw.rsplit_once(':') {
        Some((id, "content")) => SiteSelection::content_only(id),
        Some((id, "mail")) => SiteSelection::mail_only(id),
        _ => SiteSelection {
            site_id: raw.to_string(),
            index_content: true,
            index_mail: true,
        },
    };

    if selection.site_id.is_empty() {
        return Err(format!("'{raw}' does not name a site"));
    }
    Ok(selection)
}

/// Execute the crawl command
pub async fn execute(
    args: CrawlArgs,
    mut config: Config,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(fixture) = args.fixture {
        config.provider.fixture = Some(fixture);
    }
    if config.provider.fixture.is_none() {
        return Err("No provider fixture given. Pass --fixture PATH or set [provider].fixture.".into());
    }

    let services = Services::from_config(config)?;
    let start = Instant::now();

    let selection = if args.site.is_empty() {
        let sites = services.jobs.discover_sites().await?;
        if sites.is_empty() {
            return Err("The provider lists no sites to crawl.".into());
        }
        sites
            .iter()
            .map(|s| SiteSelection::content_only(s.id.clone()))
            .collect()
    } else {
        args.site
    };

    let job_id = services.jobs.start_job(selection)?.job_id;
    let mut updates = services
        .jobs
        .subscribe()
        .ok_or("Indexing job disappeared before it could be followed")?;

    let show_progress = format == OutputFormat::Human && !args.quiet;
    let mut cancel_sent = false;

    loop {
        let snapshot = updates.borrow_and_update().clone();
        if show_progress {
            eprint!("\r{:<100}", format_progress(&snapshot));
            let _ = std::io::stderr().flush();
        }
        if snapshot.status.is_terminal() {
            break;
        }

        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = tokio::signal::ctrl_c(), if !cancel_sent => {
                cancel_sent = true;
                services.jobs.cancel();
                output::print_warning("Cancelling, waiting for in-flight work to finish...");
            }
        }
    }
    if show_progress {
        eprintln!();
    }

    let response = CrawlResponse {
        job: services.jobs.get_status(Some(&job_id))?,
        stats: services.store.stats(),
        duration_secs: start.elapsed().as_secs_f64(),
    };

    match format {
        OutputFormat::Human => print_human(&response),
        OutputFormat::Json => output::print_json(&response)?,
    }

    if response.job.status == JobStatus::Failed {
        return Err(response
            .job
            .error_message
            .unwrap_or_else(|| "indexing job failed".to_string())
            .into());
    }

    Ok(())
}

fn print_human(response: &CrawlResponse) {
    let job = &response.job;
    println!(
        "Job {} {} in {}",
        colors::id(&job.job_id),
        format_status(job.status),
        format_duration(response.duration_secs)
    );
    println!(
        "  Processed {} sites, {} files, {} folders",
        colors::number(&job.sites_processed.to_string()),
        colors::number(&job.files_processed.to_string()),
        colors::number(&job.folders_processed.to_string())
    );

    for failure in &job.site_errors {
        let site = if failure.site_name.is_empty() {
            &failure.site_id
        } else {
            &failure.site_name
        };
        output::print_error(&format!("{site}: {}", failure.message));
    }

    println!();
    output::print_stats(&response.stats);
}
