//! `outcomes`: command-line front end for the academic-outcomes store.
//!
//! # Usage
//!
//! ```
//! outcomes terms add 202410 --name "Fall 2024" --year 2024-2025
//! outcomes import cslo courses.csv --term 202410
//! outcomes replicate --from 202410 --to 202510
//! outcomes clear --term 202510 --yes
//! ```
//!
//! Settings come from `outcomes.toml` (or `--config`), then `OUTCOMES_*`
//! environment variables, then flags.

mod settings;

use std::{fs::File, path::PathBuf};

use anyhow::{Context as _, bail};
use clap::{Parser, Subcommand};
use outcomes_core::{
  curriculum::{NewTerm, Term},
  import::{ImportKind, ImportReport, ImportRequest, ImportScope},
  store::CurriculumStore,
  summary::{EntityRef, TermCounts},
};
use outcomes_store_sqlite::SqliteStore;
use serde::Serialize;
use settings::Settings;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(author, version, about = "Academic outcomes reconciliation")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "outcomes.toml")]
  config: PathBuf,

  /// SQLite database file (overrides `database_path`).
  #[arg(long, value_name = "FILE")]
  db: Option<PathBuf>,

  /// Identity recorded in audit columns (overrides `acting_user`).
  #[arg(long)]
  user: Option<String>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Manage academic terms.
  #[command(subcommand)]
  Terms(TermsCommand),

  /// Reconcile a CSV feed into the store.
  Import {
    /// Feed kind: islo, pslo, cslo, courses, sections, slos,
    /// program-outcomes, enrollment, assessments.
    kind:        String,
    file:        PathBuf,
    /// Banner code of the term the feed belongs to.
    #[arg(long)]
    term:        Option<String>,
    /// Institution owning ISLO rows (overrides `institution_code`).
    #[arg(long)]
    institution: Option<String>,
    /// Print the report as JSON.
    #[arg(long)]
    json:        bool,
  },

  /// Copy a term's curriculum into another term.
  Replicate {
    #[arg(long, value_name = "BANNER")]
    from: String,
    #[arg(long, value_name = "BANNER")]
    to:   String,
  },

  /// Remove a term's curriculum. Without `--yes` only shows what would go.
  Clear {
    #[arg(long, value_name = "BANNER")]
    term: String,
    #[arg(long)]
    yes:  bool,
  },

  /// Delete one program, course, or SLO by id.
  Delete { kind: String, id: i64 },

  /// Summarise a term's curriculum.
  Show { term: String },
}

#[derive(Subcommand, Debug)]
enum TermsCommand {
  Add {
    banner: String,
    #[arg(long)]
    name:   Option<String>,
    #[arg(long)]
    year:   Option<String>,
  },
  List,
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();

  let mut settings = Settings::load(&cli.config)?;
  if let Some(db) = cli.db {
    settings.database_path = settings::expand_tilde(&db);
  }
  if cli.user.is_some() {
    settings.acting_user = cli.user;
  }

  let path = &settings.database_path;
  let store = SqliteStore::open(path)
    .await
    .with_context(|| format!("failed to open store at {path:?}"))?;

  run(&store, &settings, cli.command).await
}

async fn run(
  store: &SqliteStore,
  settings: &Settings,
  command: Command,
) -> anyhow::Result<()> {
  let user = settings.acting_user.clone();
  match command {
    Command::Terms(TermsCommand::Add { banner, name, year }) => {
      let term = store
        .create_term(
          NewTerm { banner_term: banner, academic_year: year, name },
          user,
        )
        .await?;
      println!("created term {} (id {})", term.banner_term, term.id);
    }
    Command::Terms(TermsCommand::List) => {
      for term in store.list_terms().await? {
        print_term(&term);
      }
    }
    Command::Import { kind, file, term, institution, json } => {
      let kind = ImportKind::parse(&kind)?;
      let term_id = match term {
        Some(banner) => Some(lookup_term(store, &banner).await?.id),
        None => None,
      };
      let data = File::open(&file)
        .map_err(outcomes_csv::Error::from)
        .and_then(outcomes_csv::read_upload)
        .with_context(|| format!("failed to read {}", file.display()))?;

      let request = ImportRequest {
        kind,
        scope: ImportScope {
          term_id,
          institution_code: Some(
            institution.unwrap_or_else(|| settings.institution_code.clone()),
          ),
          acting_user: user,
          max_messages: settings.max_report_messages,
        },
        data,
      };
      let report = store.import(request).await?;
      if json {
        print_json(&report)?;
      } else {
        print_report(&report);
      }
    }
    Command::Replicate { from, to } => {
      let source = lookup_term(store, &from).await?;
      let target = lookup_term(store, &to).await?;
      let summary = store.replicate_term(source.id, target.id, user).await?;
      println!("replicated {} -> {}", source.banner_term, target.banner_term);
      print_levels(
        summary.programs,
        summary.outcomes,
        summary.courses,
        summary.sections,
        summary.slos,
      );
    }
    Command::Clear { term, yes } => {
      let term = lookup_term(store, &term).await?;
      if !yes {
        let counts = store.term_counts(term.id).await?;
        println!("term {} holds:", term.banner_term);
        print_counts(&counts);
        println!("re-run with --yes to clear it");
        return Ok(());
      }
      let summary = store.clear_term(term.id).await?;
      println!("cleared {}", term.banner_term);
      print_levels(
        summary.programs,
        summary.outcomes,
        summary.courses,
        summary.sections,
        summary.slos,
      );
    }
    Command::Delete { kind, id } => {
      let entity = EntityRef::parse(&kind, id)?;
      store.delete(entity).await?;
      println!("deleted {entity}");
    }
    Command::Show { term } => {
      let term = lookup_term(store, &term).await?;
      print_term(&term);
      print_counts(&store.term_counts(term.id).await?);
      for program in store.list_programs(term.id).await? {
        let degree = program.degree_type.as_deref().unwrap_or("-");
        println!("\n{}  {} ({degree})", program.program_code, program.name);
        for outcome in store.list_program_outcomes(program.id).await? {
          println!("  {:<10} {}", outcome.outcome_code, outcome.description);
        }
      }
    }
  }
  Ok(())
}

async fn lookup_term(store: &SqliteStore, banner: &str) -> anyhow::Result<Term> {
  match store.find_term(banner).await? {
    Some(term) => Ok(term),
    None => bail!("no term with banner code {banner:?}"),
  }
}

// ─── Output ───────────────────────────────────────────────────────────────────

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}

fn print_term(term: &Term) {
  println!(
    "{:<8} {:<20} {:<10}{}",
    term.banner_term,
    term.name.as_deref().unwrap_or("-"),
    term.academic_year.as_deref().unwrap_or("-"),
    if term.is_active { "" } else { " (inactive)" },
  );
}

fn print_counts(counts: &TermCounts) {
  print_levels(
    counts.programs,
    counts.outcomes,
    counts.courses,
    counts.sections,
    counts.slos,
  );
}

fn print_levels(programs: usize, outcomes: usize, courses: usize, sections: usize, slos: usize) {
  println!("  programs: {programs}");
  println!("  outcomes: {outcomes}");
  println!("  courses:  {courses}");
  println!("  sections: {sections}");
  println!("  slos:     {slos}");
}

fn print_report(report: &ImportReport) {
  println!(
    "{}: {} imported, {} updated, {} duplicate, {} skipped",
    report.kind, report.imported, report.updated, report.duplicates, report.skipped,
  );
  for message in &report.errors {
    println!("  {message}");
  }
}
