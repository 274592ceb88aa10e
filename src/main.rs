//! pensum CLI: obligation tracking from the terminal.

use std::io::Write as _;
use std::path::PathBuf;

use chrono::{DateTime, FixedOffset, Local, NaiveTime};
use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};

use pensum::calendar::{self, TimezoneSnapshot};
use pensum::client::{discover_server, PensumClient};
use pensum::config::Config;
use pensum::extract::{self, Extractor, HttpExtractor, PhraseExtractor};
use pensum::obligation::{Obligation, ObligationDraft, ObligationId, UpdatePatch, Urgency};
use pensum::paths::PensumPaths;
use pensum::tracker::{CaptureOutcome, Tracker, TrackerConfig};

#[derive(Parser)]
#[command(name = "pensum", version, about = "Obligation tracker")]
struct Cli {
    /// Obligation collection file (overrides config and XDG default).
    #[arg(long, global = true)]
    data_file: Option<PathBuf>,

    /// Connect to a pensumd server at this base URL instead of local data.
    #[arg(long, global = true)]
    server: Option<String>,

    /// Force local mode even when a pensumd server is discoverable.
    #[arg(long, global = true)]
    local: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Capture an obligation from free text ("send the invoice by friday").
    Add {
        /// The obligation text; a trailing date phrase is grounded automatically.
        text: Vec<String>,

        /// Explicit due date (YYYY-MM-DD, an RFC 3339 instant, or a phrase
        /// like "next tuesday"); skips extraction.
        #[arg(long)]
        due: Option<String>,

        /// Estimated duration in minutes.
        #[arg(long)]
        minutes: Option<u32>,

        /// Urgency: immediate or normal.
        #[arg(long)]
        urgency: Option<String>,
    },

    /// List all obligations (runs the missed-sweep first).
    List,

    /// Show the agenda grouped by horizon: Missed, Now, Today, This Week, Later.
    Agenda,

    /// Toggle an obligation between done and pending.
    Done {
        /// Obligation id.
        id: u64,
    },

    /// Edit an obligation's fields.
    Edit {
        /// Obligation id.
        id: u64,

        /// New title.
        #[arg(long)]
        title: Option<String>,

        /// New due date (same forms as `add --due`), or "none" to clear.
        #[arg(long)]
        due: Option<String>,

        /// New estimated duration in minutes, or "none" to clear.
        #[arg(long)]
        minutes: Option<String>,

        /// New urgency (immediate/normal), or "none" to clear.
        #[arg(long)]
        urgency: Option<String>,
    },

    /// Delete an obligation.
    Rm {
        /// Obligation id.
        id: u64,
    },

    /// Delete every obligation.
    Clear {
        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },

    /// Show tracker statistics.
    Info,

    /// Show the local calendar snapshot and upcoming weekdays.
    Now,
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let now = Local::now().fixed_offset();

    let paths = PensumPaths::resolve().into_diagnostic()?;
    let config = Config::load(&paths.global_config_file()).into_diagnostic()?;

    let mut client = open_client(&cli, &config, &paths)?;
    let extractor = make_extractor(&config);

    match cli.command {
        Commands::Add {
            text,
            due,
            minutes,
            urgency,
        } => {
            let text = text.join(" ");
            if text.trim().is_empty() {
                miette::bail!("nothing to add: pass the obligation text");
            }

            let urgency = urgency
                .as_deref()
                .map(|s| {
                    Urgency::from_label(s)
                        .ok_or_else(|| miette::miette!("unknown urgency: {s}"))
                })
                .transpose()?;

            if due.is_some() || minutes.is_some() || urgency.is_some() {
                // Structured path: no extraction involved.
                let draft = ObligationDraft {
                    title: text,
                    due_at: due.as_deref().map(|d| parse_due(d, now)).transpose()?,
                    estimated_minutes: minutes,
                    urgency,
                };
                let obligation = client.add(draft, now).into_diagnostic()?;
                print_added(&obligation);
            } else {
                let outcome = client
                    .capture(extractor.as_ref(), &text, now)
                    .into_diagnostic()?;
                resolve_capture(&mut client, outcome, now)?;
            }
        }

        Commands::List => {
            let obligations = client.list_all(now).into_diagnostic()?;
            if obligations.is_empty() {
                println!("No obligations.");
            } else {
                println!("Obligations ({}):", obligations.len());
                for obligation in &obligations {
                    print_row(obligation);
                }
            }
        }

        Commands::Agenda => {
            let view = client.horizon(now).into_diagnostic()?;
            if view.is_empty() {
                println!("Nothing on the agenda.");
            }
            for (bucket, items) in view.sections() {
                if items.is_empty() {
                    continue;
                }
                println!("{} ({}):", bucket.heading(), items.len());
                for obligation in items {
                    print_row(obligation);
                }
            }
        }

        Commands::Done { id } => {
            let obligation = client
                .toggle_done(ObligationId::new(id))
                .into_diagnostic()?;
            println!("{} \"{}\" is now {}.", obligation.id, obligation.title, obligation.status);
        }

        Commands::Edit {
            id,
            title,
            due,
            minutes,
            urgency,
        } => {
            let patch = UpdatePatch {
                title,
                due_at: due
                    .as_deref()
                    .map(|d| clearable(d, |v| parse_due(v, now)))
                    .transpose()?,
                estimated_minutes: minutes
                    .as_deref()
                    .map(|m| {
                        clearable(m, |v| {
                            v.parse::<u32>()
                                .map_err(|_| miette::miette!("invalid minutes: {v}"))
                        })
                    })
                    .transpose()?,
                urgency: urgency
                    .as_deref()
                    .map(|u| {
                        clearable(u, |v| {
                            Urgency::from_label(v)
                                .ok_or_else(|| miette::miette!("unknown urgency: {v}"))
                        })
                    })
                    .transpose()?,
            };
            if patch.is_empty() {
                miette::bail!(
                    "nothing to change: pass at least one of --title/--due/--minutes/--urgency"
                );
            }
            let obligation = client
                .update(ObligationId::new(id), patch, now)
                .into_diagnostic()?;
            println!("Updated {}:", obligation.id);
            print_row(&obligation);
        }

        Commands::Rm { id } => {
            let obligation = client.delete(ObligationId::new(id)).into_diagnostic()?;
            println!("Deleted {} \"{}\".", obligation.id, obligation.title);
        }

        Commands::Clear { yes } => {
            if !yes && !confirm("Delete ALL obligations?")? {
                println!("Aborted.");
                return Ok(());
            }
            let removed = client.clear_all().into_diagnostic()?;
            println!("Removed {removed} obligation(s).");
        }

        Commands::Info => {
            let info = client.info().into_diagnostic()?;
            print!("{info}");
        }

        Commands::Now => {
            let snapshot = TimezoneSnapshot::capture(now);
            println!("Local calendar snapshot");
            println!("  timezone:  {} (UTC{:+})", snapshot.timezone, snapshot.offset_hours);
            println!("  date:      {} ({})", snapshot.local_date, snapshot.weekday);
            println!("  time:      {}", snapshot.local_time.format("%H:%M:%S"));
            println!("Next weekday occurrences:");
            for (day, date) in calendar::next_weekday_occurrences(now) {
                println!("  {:<9} {date}", calendar::weekday_name(day));
            }
        }
    }

    Ok(())
}

/// Pick local or remote mode: an explicit `--server` wins, then a discovered
/// daemon (unless `--local`), then a local tracker over the data file.
fn open_client(cli: &Cli, config: &Config, paths: &PensumPaths) -> Result<PensumClient> {
    if let Some(url) = &cli.server {
        return Ok(PensumClient::remote(url.clone()));
    }
    if !cli.local {
        if let Some(info) = discover_server(paths) {
            tracing::debug!(url = %info.base_url(), "using discovered pensumd");
            return Ok(PensumClient::remote(info.base_url()));
        }
    }

    paths.ensure_dirs().into_diagnostic()?;
    let data_path = cli
        .data_file
        .clone()
        .or_else(|| config.data_file.clone())
        .unwrap_or_else(|| paths.obligations_file());
    let tracker = Tracker::new(TrackerConfig {
        data_path: Some(data_path),
    })
    .into_diagnostic()?;
    Ok(PensumClient::Local(tracker))
}

fn make_extractor(config: &Config) -> Box<dyn Extractor> {
    match &config.extractor_endpoint {
        Some(endpoint) => Box::new(HttpExtractor::new(endpoint.clone())),
        None => Box::new(PhraseExtractor::new()),
    }
}

/// Drive the clarification loop: re-prompt for a date phrase until the
/// extraction grounds, or the user gives up with an empty line (committing
/// the obligation undated).
fn resolve_capture(
    client: &mut PensumClient,
    mut outcome: CaptureOutcome,
    now: DateTime<FixedOffset>,
) -> Result<()> {
    loop {
        match outcome {
            CaptureOutcome::Added { obligation } => {
                print_added(&obligation);
                return Ok(());
            }
            CaptureOutcome::NeedsClarification { mut draft } => {
                println!("When is \"{}\" due? (e.g. \"friday\", \"mid month\"; empty for no due date)", draft.title);
                let phrase = prompt("due> ")?;
                if phrase.trim().is_empty() {
                    draft.due_at = None;
                    let obligation = client.add(draft, now).into_diagnostic()?;
                    print_added(&obligation);
                    return Ok(());
                }
                outcome = client.clarify(draft, &phrase, now).into_diagnostic()?;
                if matches!(outcome, CaptureOutcome::NeedsClarification { .. }) {
                    println!("Could not understand \"{}\".", phrase.trim());
                }
            }
        }
    }
}

/// Parse a due argument: a civil date (due at 09:00 local), an RFC 3339
/// instant, or a relative phrase.
fn parse_due(input: &str, now: DateTime<FixedOffset>) -> Result<DateTime<FixedOffset>> {
    if let Ok(date) = calendar::parse_local_date(input) {
        let nine = NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN);
        return date
            .and_time(nine)
            .and_local_timezone(*now.offset())
            .single()
            .ok_or_else(|| miette::miette!("ambiguous local time for {input}"));
    }
    if let Ok(instant) = DateTime::parse_from_rfc3339(input) {
        return Ok(instant);
    }
    extract::ground_due_phrase(now, input)
        .ok_or_else(|| miette::miette!("cannot interpret due date: {input:?}"))
}

/// Interpret "none" as an explicit clear; anything else goes through `parse`.
fn clearable<T>(input: &str, parse: impl FnOnce(&str) -> Result<T>) -> Result<Option<T>> {
    if input.eq_ignore_ascii_case("none") {
        Ok(None)
    } else {
        parse(input).map(Some)
    }
}

fn print_added(obligation: &Obligation) {
    println!("Added {}:", obligation.id);
    print_row(obligation);
}

fn print_row(obligation: &Obligation) {
    let due = obligation
        .due_at
        .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string());
    let minutes = obligation
        .estimated_minutes
        .map(|m| format!("{m}m"))
        .unwrap_or_else(|| "-".to_string());
    let urgency = obligation
        .urgency
        .map(|u| u.as_label().to_string())
        .unwrap_or_else(|| "-".to_string());
    println!(
        "  {:>5}  [{:<7}]  due {:<16}  est {:<5}  {:<9}  {}",
        obligation.id.to_string(),
        obligation.status.as_label(),
        due,
        minutes,
        urgency,
        obligation.title
    );
}

fn prompt(label: &str) -> Result<String> {
    print!("{label}");
    std::io::stdout().flush().into_diagnostic()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line).into_diagnostic()?;
    Ok(line.trim_end().to_string())
}

fn confirm(question: &str) -> Result<bool> {
    let answer = prompt(&format!("{question} [y/N] "))?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}
