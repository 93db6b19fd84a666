//! Bounded-concurrency crawl of sites, folders and mailboxes.
//!
//! Two pools bound the provider load: at most `concurrency` sites are
//! crawled at once, and within a site at most `folder_concurrency`
//! folders (or mailboxes) are listed at once. The cancellation token is
//! checked before each site, folder, page and mailbox is started; work
//! already dispatched is awaited, never aborted.

use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::core::cache::{DiscoveryCache, MAILBOX_USERS_KEY, SITES_KEY};
use crate::core::crawler::retry::{with_retry, RetryPolicy};
use crate::core::crawler::{
    CrawlPlan, CrawlResult, ProgressSink, SiteCrawl, SourceCrawl, UnitProgress,
};
use crate::core::provider::{
    AttachmentEntry, DriveEntry, ProviderClient, ProviderError, ProviderResult, ROOT_FOLDER,
};
use crate::core::text::fold;
use crate::core::types::{file_type_from_name, IndexRecord, MailboxUser, Site, SiteFailure, Source};

/// Concurrency and retry settings for a crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrawlOptions {
    pub concurrency: usize,
    pub folder_concurrency: usize,
    pub retry: RetryPolicy,
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self {
            concurrency: 5,
            folder_concurrency: 4,
            retry: RetryPolicy::default(),
        }
    }
}

struct Shared {
    provider: Arc<dyn ProviderClient>,
    cache: Arc<DiscoveryCache>,
    options: CrawlOptions,
}

/// Crawls sites through a [`ProviderClient`]. Cheap to clone.
#[derive(Clone)]
pub struct CrawlScheduler {
    shared: Arc<Shared>,
}

#[derive(Debug, Clone)]
struct FolderTask {
    id: String,
    /// "" for the root, otherwise "/a/b"
    path: String,
}

impl FolderTask {
    fn root() -> Self {
        Self {
            id: ROOT_FOLDER.to_string(),
            path: String::new(),
        }
    }

    fn label(&self) -> String {
        if self.path.is_empty() {
            "/".to_string()
        } else {
            self.path.clone()
        }
    }

    fn is_root(&self) -> bool {
        self.id == ROOT_FOLDER
    }
}

struct FolderOutcome {
    folder: FolderTask,
    records: Vec<IndexRecord>,
    subfolders: Vec<FolderTask>,
    error: Option<ProviderError>,
    interrupted: bool,
}

struct MailboxOutcome {
    user: MailboxUser,
    records: Vec<IndexRecord>,
    error: Option<ProviderError>,
    interrupted: bool,
}

impl CrawlScheduler {
    pub fn new(
        provider: Arc<dyn ProviderClient>,
        cache: Arc<DiscoveryCache>,
        options: CrawlOptions,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                provider,
                cache,
                options,
            }),
        }
    }

    pub fn options(&self) -> &CrawlOptions {
        &self.shared.options
    }

    /// List the tenant's sites through the discovery cache
    pub async fn discover_sites(
        &self,
        cancel: &CancellationToken,
    ) -> ProviderResult<Arc<Vec<Site>>> {
        let shared = &self.shared;
        shared
            .cache
            .sites
            .get_or_fetch(SITES_KEY, shared.cache.ttl, || async {
                let sites = with_retry(&shared.options.retry, cancel, "list sites", || {
                    shared.provider.list_sites()
                })
                .await?;
                tracing::info!("Discovered {} sites", sites.len());
                Ok::<_, ProviderError>(Arc::new(sites))
            })
            .await
    }

    /// List the tenant's mailbox users through the discovery cache
    pub async fn mailbox_users(
        &self,
        cancel: &CancellationToken,
    ) -> ProviderResult<Arc<Vec<MailboxUser>>> {
        let shared = &self.shared;
        shared
            .cache
            .mailbox_users
            .get_or_fetch(MAILBOX_USERS_KEY, shared.cache.ttl, || async {
                let users = with_retry(&shared.options.retry, cancel, "list mailbox users", || {
                    shared.provider.list_mailbox_users()
                })
                .await?;
                tracing::info!("Found {} mailbox users", users.len());
                Ok::<_, ProviderError>(Arc::new(users))
            })
            .await
    }

    /// Crawl every plan, reporting to `sink` as units and sites finish.
    ///
    /// Returns once every dispatched site has finished. Sites not yet
    /// dispatched when `cancel` fires are skipped.
    pub async fn crawl(
        &self,
        plans: Vec<CrawlPlan>,
        sink: Arc<dyn ProgressSink>,
        cancel: CancellationToken,
    ) -> CrawlResult {
        let semaphore = Arc::new(Semaphore::new(self.shared.options.concurrency.max(1)));
        let mut tasks = JoinSet::new();
        let mut result = CrawlResult::default();

        for plan in plans {
            let Ok(permit) = Arc::clone(&semaphore).acquire_owned().await else {
                break;
            };
            if cancel.is_cancelled() {
                tracing::info!("Cancellation requested, not dispatching remaining sites");
                break;
            }

            let scheduler = self.clone();
            let sink = Arc::clone(&sink);
            let cancel = cancel.clone();
            tasks.spawn(async move {
                let _permit = permit;
                sink.site_started(&plan.site);
                let crawl = scheduler.crawl_site(plan, sink.as_ref(), &cancel).await;
                let failures = crawl.failures.clone();
                sink.site_completed(crawl);
                failures
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(failures) => {
                    result.sites_crawled += 1;
                    result.failures.extend(failures);
                }
                Err(e) => {
                    tracing::error!("Site crawl task failed: {}", e);
                    result.failures.push(SiteFailure {
                        site_id: String::new(),
                        site_name: String::new(),
                        message: format!("crawl task failed: {e}"),
                    });
                }
            }
        }

        result.cancelled = cancel.is_cancelled();
        result
    }

    async fn crawl_site(
        &self,
        plan: CrawlPlan,
        sink: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> SiteCrawl {
        let site = plan.site;
        tracing::info!("Crawling site {} ({})", site.name, site.id);

        let mut failures = Vec::new();
        let content = if plan.index_content {
            Some(self.crawl_content(&site, sink, cancel, &mut failures).await)
        } else {
            None
        };
        let mail = if plan.index_mail {
            Some(self.crawl_mail(&site, sink, cancel, &mut failures).await)
        } else {
            None
        };

        tracing::info!(
            "Finished site {}: {} content records, {} mail records, {} errors",
            site.id,
            content.as_ref().map_or(0, |c| c.records.len()),
            mail.as_ref().map_or(0, |m| m.records.len()),
            failures.len()
        );

        SiteCrawl {
            site,
            content,
            mail,
            failures,
        }
    }

    async fn crawl_content(
        &self,
        site: &Site,
        sink: &dyn ProgressSink,
        cancel: &CancellationToken,
        failures: &mut Vec<SiteFailure>,
    ) -> SourceCrawl {
        let semaphore = Arc::new(Semaphore::new(
            self.shared.options.folder_concurrency.max(1),
        ));
        let mut queue = VecDeque::from([FolderTask::root()]);
        let mut tasks: JoinSet<FolderOutcome> = JoinSet::new();
        let mut crawl = SourceCrawl {
            complete: true,
            ..SourceCrawl::default()
        };
        let mut done = 0;

        loop {
            while let Some(folder) = queue.pop_front() {
                if cancel.is_cancelled() {
                    crawl.complete = false;
                    queue.clear();
                    break;
                }
                tasks.spawn(list_folder(
                    Arc::clone(&self.shared),
                    site.id.clone(),
                    folder,
                    Arc::clone(&semaphore),
                    cancel.clone(),
                ));
            }

            let Some(joined) = tasks.join_next().await else {
                break;
            };
            done += 1;

            let outcome = match joined {
                Ok(outcome) => outcome,
                Err(e) => {
                    crawl.complete = false;
                    failures.push(site_failure(site, format!("folder task failed: {e}")));
                    continue;
                }
            };

            if outcome.interrupted {
                crawl.complete = false;
            }
            if let Some(err) = &outcome.error {
                crawl.complete = false;
                tracing::warn!(
                    "Failed to list folder {} in site {}: {}",
                    outcome.folder.label(),
                    site.id,
                    err
                );
                failures.push(site_failure(
                    site,
                    format!("folder {}: {}", outcome.folder.label(), err),
                ));
            }

            let counted = !outcome.folder.is_root() && !outcome.interrupted;
            if counted {
                crawl.folders += 1;
            }
            let files = outcome.records.len();
            queue.extend(outcome.subfolders);
            crawl.records.extend(outcome.records);

            tracing::debug!(
                "Listed {} in site {}: {} files",
                outcome.folder.label(),
                site.id,
                files
            );
            sink.unit_completed(UnitProgress {
                site_id: site.id.clone(),
                label: outcome.folder.label(),
                files,
                folders: usize::from(counted),
                done_units: done,
                pending_units: queue.len() + tasks.len(),
            });
        }

        crawl.records.sort_by(|a, b| a.id.cmp(&b.id));
        crawl
    }

    async fn crawl_mail(
        &self,
        site: &Site,
        sink: &dyn ProgressSink,
        cancel: &CancellationToken,
        failures: &mut Vec<SiteFailure>,
    ) -> SourceCrawl {
        let mut crawl = SourceCrawl::default();

        let users = match self.mailbox_users(cancel).await {
            Ok(users) => users,
            Err(ProviderError::Cancelled) => return crawl,
            Err(e) => {
                tracing::warn!("Failed to list mailbox users for site {}: {}", site.id, e);
                failures.push(site_failure(site, format!("mailbox users: {e}")));
                return crawl;
            }
        };

        let mut queue: VecDeque<MailboxUser> = users
            .iter()
            .filter(|user| mailbox_matches_site(user, site))
            .cloned()
            .collect();
        tracing::debug!("{} mailboxes belong to site {}", queue.len(), site.id);

        let semaphore = Arc::new(Semaphore::new(
            self.shared.options.folder_concurrency.max(1),
        ));
        let mut tasks: JoinSet<MailboxOutcome> = JoinSet::new();
        crawl.complete = true;
        let mut done = 0;

        while let Some(user) = queue.pop_front() {
            if cancel.is_cancelled() {
                crawl.complete = false;
                queue.clear();
                break;
            }
            tasks.spawn(list_mailbox(
                Arc::clone(&self.shared),
                site.id.clone(),
                user,
                Arc::clone(&semaphore),
                cancel.clone(),
            ));
        }

        while let Some(joined) = tasks.join_next().await {
            done += 1;
            let outcome = match joined {
                Ok(outcome) => outcome,
                Err(e) => {
                    crawl.complete = false;
                    failures.push(site_failure(site, format!("mailbox task failed: {e}")));
                    continue;
                }
            };

            if outcome.interrupted {
                crawl.complete = false;
            }
            if let Some(err) = &outcome.error {
                crawl.complete = false;
                tracing::warn!(
                    "Failed to list attachments for {} in site {}: {}",
                    outcome.user.mail,
                    site.id,
                    err
                );
                failures.push(site_failure(
                    site,
                    format!("mailbox {}: {}", outcome.user.mail, err),
                ));
            }

            let files = outcome.records.len();
            crawl.records.extend(outcome.records);
            sink.unit_completed(UnitProgress {
                site_id: site.id.clone(),
                label: mailbox_label(&outcome.user),
                files,
                folders: 0,
                done_units: done,
                pending_units: tasks.len(),
            });
        }

        crawl.records.sort_by(|a, b| a.id.cmp(&b.id));
        crawl
    }
}

async fn list_folder(
    shared: Arc<Shared>,
    site_id: String,
    folder: FolderTask,
    semaphore: Arc<Semaphore>,
    cancel: CancellationToken,
) -> FolderOutcome {
    let mut outcome = FolderOutcome {
        folder,
        records: Vec::new(),
        subfolders: Vec::new(),
        error: None,
        interrupted: false,
    };

    let Ok(_permit) = semaphore.acquire_owned().await else {
        outcome.interrupted = true;
        return outcome;
    };

    let folder_id = outcome.folder.id.clone();
    let what = format!("list folder {} in {}", outcome.folder.label(), site_id);
    let mut page: Option<String> = None;

    loop {
        if cancel.is_cancelled() {
            outcome.interrupted = true;
            return outcome;
        }

        let listing = with_retry(&shared.options.retry, &cancel, &what, || {
            shared
                .provider
                .list_folder_page(&site_id, &folder_id, page.as_deref())
        })
        .await;

        let listing = match listing {
            Ok(listing) => listing,
            Err(ProviderError::Cancelled) => {
                outcome.interrupted = true;
                return outcome;
            }
            Err(e) => {
                outcome.error = Some(e);
                return outcome;
            }
        };

        for entry in listing.entries {
            match entry {
                DriveEntry::Folder { id, name } => {
                    let path = format!("{}/{}", outcome.folder.path, name);
                    outcome.subfolders.push(FolderTask { id, path });
                }
                file @ DriveEntry::File { .. } => {
                    if let Some(record) = content_record(&site_id, &outcome.folder.path, file) {
                        outcome.records.push(record);
                    }
                }
            }
        }

        match listing.next_page {
            Some(next) => page = Some(next),
            None => return outcome,
        }
    }
}

async fn list_mailbox(
    shared: Arc<Shared>,
    site_id: String,
    user: MailboxUser,
    semaphore: Arc<Semaphore>,
    cancel: CancellationToken,
) -> MailboxOutcome {
    let mut outcome = MailboxOutcome {
        user,
        records: Vec::new(),
        error: None,
        interrupted: false,
    };

    let Ok(_permit) = semaphore.acquire_owned().await else {
        outcome.interrupted = true;
        return outcome;
    };

    let user_id = outcome.user.id.clone();
    let what = format!("list attachments for {}", outcome.user.mail);
    let mut page: Option<String> = None;

    loop {
        if cancel.is_cancelled() {
            outcome.interrupted = true;
            return outcome;
        }

        let listing = with_retry(&shared.options.retry, &cancel, &what, || {
            shared.provider.list_attachments(&user_id, page.as_deref())
        })
        .await;

        let listing = match listing {
            Ok(listing) => listing,
            Err(ProviderError::Cancelled) => {
                outcome.interrupted = true;
                return outcome;
            }
            Err(ProviderError::NotFound(_)) => {
                tracing::debug!("No mailbox for {}, skipping", outcome.user.mail);
                return outcome;
            }
            Err(e) => {
                outcome.error = Some(e);
                return outcome;
            }
        };

        outcome.records.extend(
            listing
                .entries
                .into_iter()
                .map(|attachment| mail_record(&site_id, &outcome.user, attachment)),
        );

        match listing.next_page {
            Some(next) => page = Some(next),
            None => return outcome,
        }
    }
}

/// Whether `user`'s mailbox belongs to `site`.
///
/// True when the display name contains the site name (folded), or the
/// mail address contains the site name with spaces replaced by dots.
pub fn mailbox_matches_site(user: &MailboxUser, site: &Site) -> bool {
    let site_name = fold(site.name.trim());
    if site_name.is_empty() {
        return false;
    }

    if fold(&user.display_name).contains(&site_name) {
        return true;
    }

    let dotted = site_name.replace(' ', ".");
    fold(&user.mail).contains(&dotted)
}

fn mailbox_label(user: &MailboxUser) -> String {
    if user.display_name.is_empty() {
        user.mail.clone()
    } else {
        user.display_name.clone()
    }
}

fn site_failure(site: &Site, message: String) -> SiteFailure {
    SiteFailure {
        site_id: site.id.clone(),
        site_name: site.name.clone(),
        message,
    }
}

fn content_record(site_id: &str, folder_path: &str, entry: DriveEntry) -> Option<IndexRecord> {
    let DriveEntry::File {
        id,
        name,
        url,
        size,
        created_by,
        created_at,
        modified_at,
        mime_type,
    } = entry
    else {
        return None;
    };

    Some(IndexRecord {
        file_type: file_type_from_name(&name),
        path: format!("{folder_path}/{name}"),
        id,
        name,
        source: Source::Content,
        url,
        owner: created_by,
        created_at,
        modified_at,
        parent_site_id: site_id.to_string(),
        size_bytes: size,
        mime_type,
    })
}

/// Attachment ids are scoped to the site, since one mailbox can match
/// several sites.
fn mail_record(site_id: &str, user: &MailboxUser, attachment: AttachmentEntry) -> IndexRecord {
    IndexRecord {
        id: format!("{site_id}:{}", attachment.id),
        file_type: file_type_from_name(&attachment.name),
        name: attachment.name,
        source: Source::Mail,
        url: attachment.url,
        owner: attachment.sender.or_else(|| Some(user.mail.clone())),
        created_at: attachment.received_at,
        modified_at: attachment.received_at,
        parent_site_id: site_id.to_string(),
        size_bytes: attachment.size,
        path: attachment.subject,
        mime_type: attachment.mime_type,
    }
}
