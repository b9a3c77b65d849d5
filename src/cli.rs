use anyhow::{bail, Context, Result};
use std::io::{self, BufRead, Write};
use std::path::Path;
use std::process::Command;
use tracing::info;

use crate::{
    analytics::AnalyticsReport,
    cli_types::{AddArgs, ListArgs, LookupArgs, RefineArgs, RejectArgs, ReviewArgs},
    discover::{discover_with, DiscoveryEvent, DiscoveryReport},
    error::CatalogError,
    scanner::WalkOptions,
    storage::{LifecycleStore, ListFilter, MemoryCatalog, Page, SqliteCatalog},
    types::{CatalogEntry, RefineRequest, Stage, DEFAULT_REJECTION_REASON},
    ui::UIManager,
    CliConfig,
};

/// Outcome counters for one `review` session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReviewSummary {
    pub refined: usize,
    pub rejected: usize,
    pub skipped: usize,
}

pub struct CliApp {
    config: CliConfig,
    store: SqliteCatalog,
    ui: UIManager,
}

impl CliApp {
    pub fn new(config: CliConfig, colors_enabled: bool) -> Result<Self> {
        info!("Initializing music tracker");

        let ui = UIManager::new(colors_enabled && config.output.colors);
        let store = SqliteCatalog::open(&config.database.path).with_context(|| {
            format!("Failed to open catalog at {}", config.database.path.display())
        })?;

        Ok(Self { config, store, ui })
    }

    pub fn store(&self) -> &SqliteCatalog {
        &self.store
    }

    pub fn add(&mut self, args: AddArgs) -> Result<DiscoveryReport> {
        let mut options: WalkOptions = self.config.walk_options();
        if args.follow_symlinks {
            options.follow_symlinks = true;
        }
        if args.max_depth.is_some() {
            options.max_depth = args.max_depth;
        }

        self.ui.print_header(if args.dry_run {
            "Discovery preview (dry run)"
        } else {
            "Discovery"
        });

        let spinner = self
            .ui
            .create_spinner(&format!("Scanning {}", args.path.display()));
        let progress = |event: DiscoveryEvent<'_>| {
            if let DiscoveryEvent::Added { artifact, .. } = event {
                spinner.set_message(format!("Found {}", artifact.title));
            }
        };

        let result = if args.dry_run {
            // Run against a throwaway copy so nothing is persisted
            let mut preview = MemoryCatalog::from_entries(self.store.all_entries()?)?;
            discover_with(&mut preview, &args.path, &options, progress)
        } else {
            discover_with(&mut self.store, &args.path, &options, progress)
        };
        spinner.finish_and_clear();
        let report = result.with_context(|| format!("Failed to scan {}", args.path.display()))?;

        let verb = if args.dry_run { "Would add" } else { "Added" };
        for added in &report.added {
            self.ui.print_success(&format!(
                "{} [{}] {} ({})",
                verb,
                added.id,
                added.title,
                added.tool_family.display_name()
            ));
        }
        for failure in &report.failures {
            self.ui.print_warning(failure);
        }

        self.ui.print_info(&format!(
            "\n{} new, {} already cataloged, {} errors",
            report.inserted, report.duplicates, report.errors
        ));
        if report.walk.pruned_dirs > 0 {
            self.ui.print_info(&format!(
                "Skipped {} backup folders and {} backup/versioned files",
                report.walk.pruned_dirs, report.walk.skipped
            ));
        }
        Ok(report)
    }

    pub fn list(&self, args: ListArgs) -> Result<()> {
        let filter = ListFilter {
            tool_family: args.daw,
        };
        let page = Page {
            limit: Some(args.limit.unwrap_or(self.config.output.page_size)),
            offset: args.offset,
        };
        let entries = self.store.list_by_stage(args.stage, &filter, page)?;

        self.ui.print_header(&format!("{} projects", capitalize(args.stage.as_str())));
        if entries.is_empty() {
            self.ui.print_info(&format!("No {} projects found", args.stage));
            return Ok(());
        }
        self.ui.print_info(&self.ui.render_entries(&entries));
        self.ui.print_info(&format!("Showing {} from offset {}", entries.len(), args.offset));
        Ok(())
    }

    /// Entries matching an id or a title fragment.
    fn lookup(&self, target: &str) -> Result<Vec<CatalogEntry>> {
        if let Ok(id) = target.trim().parse::<i64>() {
            return Ok(self.store.find_by_id(id)?.into_iter().collect());
        }
        Ok(self.store.find_by_title(target)?)
    }

    /// Exactly one entry, or an error that lists the candidates.
    fn lookup_one(&self, target: &str) -> Result<CatalogEntry> {
        let mut matches = self.lookup(target)?;
        match matches.len() {
            0 => bail!("No project matches '{}'", target),
            1 => Ok(matches.remove(0)),
            n => {
                self.ui.print_info(&self.ui.render_entries(&matches));
                bail!("'{}' matches {} projects; use an id", target, n)
            }
        }
    }

    pub fn show(&self, args: LookupArgs) -> Result<()> {
        let matches = self.lookup(&args.target)?;
        match matches.as_slice() {
            [] => bail!("No project matches '{}'", args.target),
            [entry] => {
                self.ui.print_header(entry.title());
                self.ui.print_info(&self.ui.render_entry(entry));
            }
            several => {
                self.ui.print_warning(&format!(
                    "'{}' matches {} projects",
                    args.target,
                    several.len()
                ));
                self.ui.print_info(&self.ui.render_entries(several));
            }
        }
        Ok(())
    }

    pub fn refine(&mut self, args: RefineArgs) -> Result<()> {
        let entry = self
            .store
            .refine(args.id, &args.to_request())
            .with_context(|| format!("Could not refine project {}", args.id))?;
        self.ui.print_success(&format!("Refined [{}] {}", entry.id, entry.title()));
        Ok(())
    }

    pub fn reject(&mut self, args: RejectArgs) -> Result<()> {
        let entry = self
            .store
            .reject(args.id, &args.reason)
            .with_context(|| format!("Could not reject project {}", args.id))?;
        self.ui.print_success(&format!(
            "Rejected [{}] {}: {}",
            entry.id,
            entry.title(),
            args.reason
        ));
        Ok(())
    }

    pub fn open(&self, args: LookupArgs) -> Result<()> {
        let entry = self.lookup_one(&args.target)?;
        open_path(&entry.artifact.path)?;
        self.ui.print_success(&format!("Opened {}", entry.title()));
        Ok(())
    }

    pub fn stats(&self) -> Result<()> {
        let stats = self.store.stats()?;
        self.ui.print_header("Catalog statistics");
        self.ui.print_info(&self.ui.render_stats(&stats));
        Ok(())
    }

    pub fn analytics(&self) -> Result<()> {
        let report = AnalyticsReport::from_entries(&self.store.all_entries()?);
        self.ui.print_header("Music Tracker Analytics");
        self.ui.print_info(&report.to_string());
        Ok(())
    }

    pub fn review(&mut self, args: ReviewArgs) -> Result<()> {
        let stdin = io::stdin();
        let mut input = stdin.lock();
        let summary = self.review_with(&mut input, args.limit)?;
        self.ui.print_info(&format!(
            "\nReviewed: {} refined, {} rejected, {} skipped",
            summary.refined, summary.rejected, summary.skipped
        ));
        Ok(())
    }

    /// Interactive review over raw entries, newest first, reading answers from `input`.
    pub fn review_with<R: BufRead>(&mut self, input: &mut R, limit: Option<usize>) -> Result<ReviewSummary> {
        let page = Page { limit, offset: 0 };
        let entries = self
            .store
            .list_by_stage(Stage::Raw, &ListFilter::default(), page)?;
        let mut summary = ReviewSummary::default();

        if entries.is_empty() {
            self.ui.print_info("Nothing to review");
            return Ok(summary);
        }

        let total = entries.len();
        'entries: for (index, entry) in entries.into_iter().enumerate() {
            self.ui.print_header(&format!("[{}/{}] {}", index + 1, total, entry.title()));
            self.ui.print_info(&self.ui.render_entry(&entry));

            loop {
                let choice = match prompt(input, "[r]efine, [o]pen, [x] reject, [s]kip, [q]uit")? {
                    Some(choice) => choice.to_lowercase(),
                    None => break 'entries,
                };
                match choice.as_str() {
                    "r" | "refine" => {
                        let request = match prompt_refinement(input, &self.ui)? {
                            Some(request) => request,
                            None => break 'entries,
                        };
                        match self.store.refine(entry.id, &request) {
                            Ok(refined) => {
                                self.ui.print_success(&format!("Refined {}", refined.title()));
                                summary.refined += 1;
                                break;
                            }
                            Err(err) => self.ui.print_error(&err.to_string()),
                        }
                    }
                    "o" | "open" => {
                        if let Err(err) = open_path(&entry.artifact.path) {
                            self.ui.print_error(&err.to_string());
                        }
                    }
                    "x" | "reject" => {
                        let reason = match prompt(input, "Reason")? {
                            Some(reason) if !reason.is_empty() => reason,
                            Some(_) => DEFAULT_REJECTION_REASON.to_string(),
                            None => break 'entries,
                        };
                        self.store.reject(entry.id, &reason)?;
                        self.ui.print_success(&format!("Rejected {}", entry.title()));
                        summary.rejected += 1;
                        break;
                    }
                    "" | "s" | "skip" => {
                        summary.skipped += 1;
                        break;
                    }
                    "q" | "quit" => break 'entries,
                    other => self.ui.print_warning(&format!("Unknown choice '{}'", other)),
                }
            }
        }

        Ok(summary)
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Print `label` and read one trimmed line. `None` at end of input.
fn prompt<R: BufRead>(input: &mut R, label: &str) -> Result<Option<String>> {
    print!("{}: ", label);
    io::stdout().flush().context("Failed to flush stdout")?;

    let mut line = String::new();
    if input.read_line(&mut line).context("Failed to read input")? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

/// Ask for each refinement field; blank answers leave the field unset.
fn prompt_refinement<R: BufRead>(input: &mut R, ui: &UIManager) -> Result<Option<RefineRequest>> {
    let mut request = RefineRequest::default();
    let fields = [
        "Genre",
        "BPM",
        "Key",
        "Rating (1-10)",
        "Status (default: complete)",
        "Tags (comma-separated)",
        "Collaboration",
        "Description",
    ];

    for field in fields {
        let answer = match prompt(input, field)? {
            Some(answer) => answer,
            None => return Ok(None),
        };
        if answer.is_empty() {
            continue;
        }
        match field {
            "Genre" => request.genre = Some(answer),
            "BPM" => match answer.parse() {
                Ok(bpm) => request.bpm = Some(bpm),
                Err(_) => ui.print_warning(&format!("Ignoring BPM '{}'", answer)),
            },
            "Key" => request.key = Some(answer),
            "Rating (1-10)" => match answer.parse() {
                Ok(rating) => request.rating = Some(rating),
                Err(_) => ui.print_warning(&format!("Ignoring rating '{}'", answer)),
            },
            "Status (default: complete)" => request.status = Some(answer),
            "Tags (comma-separated)" => request.tags = crate::types::parse_tags(&answer),
            "Collaboration" => request.collaboration = Some(answer),
            _ => request.description = Some(answer),
        }
    }
    Ok(Some(request))
}

fn launcher(path: &Path) -> Command {
    #[cfg(target_os = "macos")]
    {
        let mut command = Command::new("open");
        command.arg(path);
        command
    }
    #[cfg(target_os = "windows")]
    {
        let mut command = Command::new("cmd");
        command.args(["/C", "start", ""]).arg(path);
        command
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        let mut command = Command::new("xdg-open");
        command.arg(path);
        command
    }
}

/// Launch the project with the platform's default program.
fn open_path(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(CatalogError::ProjectFileMissing(path.to_path_buf()).into());
    }
    launcher(path)
        .spawn()
        .with_context(|| format!("Failed to launch {}", path.display()))?;
    Ok(())
}
