//! CLI: enqueue jobs onto the worker's queue.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};

use tmdb_mirror::config::Config;
use tmdb_mirror::db::Db;
use tmdb_mirror::jobs::queue::{enqueue_job, Enqueue};
use tmdb_mirror::jobs::JobKind;
use tmdb_mirror::logging::init_tracing;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "snake_case")]
enum JobTypeArg {
    FullSweep,
    MissingIds,
    PruneDeleted,
    ChangesSync,
    CreateTables,
    AddMovie,
    AddSeries,
    TestWebhook,
}

#[derive(Debug, Parser)]
#[command(name = "enqueue-job", about = "Enqueue TMDB mirror jobs")]
struct Cli {
    /// Type of job to enqueue
    #[arg(value_enum)]
    job_type: JobTypeArg,

    /// TMDB id for add_movie/add_series
    #[arg(long)]
    id: Option<i64>,

    /// Force full sweep regardless of row counts
    #[arg(long)]
    force: bool,

    /// Message for test_webhook
    #[arg(long)]
    message: Option<String>,
}

fn job_kind(cli: &Cli) -> Result<JobKind, String> {
    match cli.job_type {
        JobTypeArg::FullSweep => Ok(JobKind::FullSweep { force: cli.force }),
        JobTypeArg::MissingIds => Ok(JobKind::MissingIds),
        JobTypeArg::PruneDeleted => Ok(JobKind::PruneDeleted),
        JobTypeArg::ChangesSync => Ok(JobKind::ChangesSync),
        JobTypeArg::CreateTables => Ok(JobKind::CreateTables),
        JobTypeArg::AddMovie => match cli.id {
            Some(id) if id > 0 => Ok(JobKind::AddMovie(id)),
            _ => Err("--id is required (and must be positive) for add_movie".to_string()),
        },
        JobTypeArg::AddSeries => match cli.id {
            Some(id) if id > 0 => Ok(JobKind::AddSeries(id)),
            _ => Err("--id is required (and must be positive) for add_series".to_string()),
        },
        JobTypeArg::TestWebhook => Ok(JobKind::TestWebhook(
            cli.message
                .clone()
                .unwrap_or_else(|| "Test webhook message".to_string()),
        )),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let kind = match job_kind(&cli) {
        Ok(kind) => kind,
        Err(message) => {
            eprintln!("error: {message}");
            std::process::exit(2);
        }
    };

    let cfg = Config::from_env().context("configuration error")?;
    init_tracing(&cfg);

    let db = Db::connect(&cfg.database_uri, 1).await?;
    match enqueue_job(&db.pool, &kind).await? {
        Enqueue::Queued => println!("queued {}", kind.name()),
        Enqueue::AlreadyRunning => println!("{} is already running; not queued", kind.name()),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(job_type: JobTypeArg, id: Option<i64>) -> Cli {
        Cli {
            job_type,
            id,
            force: false,
            message: None,
        }
    }

    #[test]
    fn add_jobs_require_an_id() {
        assert!(job_kind(&cli(JobTypeArg::AddMovie, None)).is_err());
        assert!(job_kind(&cli(JobTypeArg::AddMovie, Some(0))).is_err());
        assert_eq!(
            job_kind(&cli(JobTypeArg::AddMovie, Some(603))),
            Ok(JobKind::AddMovie(603))
        );
        assert_eq!(
            job_kind(&cli(JobTypeArg::AddSeries, Some(1396))),
            Ok(JobKind::AddSeries(1396))
        );
    }

    #[test]
    fn force_flag_reaches_full_sweep() {
        let mut c = cli(JobTypeArg::FullSweep, None);
        c.force = true;
        assert_eq!(job_kind(&c), Ok(JobKind::FullSweep { force: true }));
    }
}
