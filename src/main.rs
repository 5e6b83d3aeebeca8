use chrono::Utc;
use clap::{Args, Parser, Subcommand, ValueEnum};
use mergetime::config::{AppConfig, RepoId};
use mergetime::github::GitHubClient;
use mergetime::options::{AuthOptions, TOKEN_OPTION};
use mergetime::output::{self, Report};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const EXIT_FAILURE: i32 = 1;
const EXIT_USAGE: i32 = 2;

#[derive(Subcommand, Debug)]
enum Command {
    /// Mean time to merge with its standard error
    Time(AnalysisArgs),
    /// Mean, standard deviation and 50/95/99% percentiles of time to merge
    Distribution(AnalysisArgs),
}

impl Command {
    fn split(&self) -> (Report, &AnalysisArgs) {
        match self {
            Command::Time(args) => (Report::Time, args),
            Command::Distribution(args) => (Report::Distribution, args),
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Table,
    Json,
}

#[derive(Args, Debug)]
struct AnalysisArgs {
    /// Repositories to analyze, as owner/name
    #[arg(required = true)]
    repos: Vec<RepoId>,

    #[arg(long, help = token_help())]
    token: Option<String>,

    /// Query GitHub without authenticating
    #[arg(long)]
    anonymous: bool,

    /// Only count pull requests created in the last N days (0 = all)
    #[arg(short = 'd', long, default_value_t = 0, value_parser = clap::value_parser!(i64).range(0..))]
    last_days: i64,

    /// Also list every counted pull request, slowest first
    #[arg(short, long)]
    verbose: bool,

    #[arg(long, value_enum, default_value_t = Format::Table)]
    format: Format,

    /// Repositories fetched at the same time (defaults to FETCH_CONCURRENCY or 1)
    #[arg(long)]
    concurrency: Option<usize>,
}

fn token_help() -> String {
    format!(
        "GitHub token (defaults to GITHUB_TOKEN). {}",
        TOKEN_OPTION.help_suffix()
    )
}

#[derive(Parser, Debug)]
#[command(name = "mergetime")]
#[command(about = "How long pull requests take to get merged", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mergetime=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let (report, args) = cli.command.split();

    let config = match AppConfig::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {}", e);
            std::process::exit(EXIT_USAGE);
        }
    };

    let auth = AuthOptions {
        token: args.token.clone(),
        env_token: config.github_token.clone(),
        anonymous: args.anonymous,
    };
    let token = match auth.validate() {
        Ok(t) => t,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(EXIT_USAGE);
        }
    };

    if let Err(e) = run(args, report, &config, token).await {
        eprintln!("{}", output::format_error(&e));
        std::process::exit(EXIT_FAILURE);
    }
}

async fn run(
    args: &AnalysisArgs,
    report: Report,
    config: &AppConfig,
    token: Option<String>,
) -> anyhow::Result<()> {
    let client = GitHubClient::new(token, config.max_github_api_pages)?;
    let concurrency = args.concurrency.unwrap_or(config.fetch_concurrency);

    let analysis = mergetime::analyze(
        &client,
        &args.repos,
        args.last_days,
        Utc::now(),
        concurrency,
    )
    .await?;

    match args.format {
        Format::Json => {
            println!(
                "{}",
                output::format_json(&analysis.summaries, &analysis.report, args.verbose)?
            );
        }
        Format::Table => {
            for (repo, outcome) in analysis.report.empty_repos() {
                if let Some(notice) = output::format_notice(repo, outcome) {
                    eprintln!("{}", notice);
                }
            }

            if args.verbose {
                let records = analysis.report.records_by_elapsed_desc();
                println!("{}\n", output::format_records_table(&records));
            }

            if !analysis.summaries.is_empty() {
                println!("{}", output::format_summary_table(&analysis.summaries, report));
            }
        }
    }

    Ok(())
}
