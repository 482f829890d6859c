use clap::{Parser, Subcommand};

use commentgate::config::Config;
use commentgate::github::GitHubClient;
use commentgate::{CommentDraft, SubmissionFailure, SubmitError, submit};

#[derive(Parser)]
#[command(name = "commentgate")]
#[command(version, about = "Pull-request-gated comment storage for static sites")]
struct Cli {
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit a comment to an entry's moderation pull request
    Submit {
        /// Entry (post) id the comment belongs to
        #[arg(long)]
        entry: String,

        /// Commenter display name
        #[arg(long)]
        name: String,

        /// Comment body
        #[arg(long)]
        body: String,

        #[arg(long, default_value = "")]
        website: String,

        #[arg(long, default_value = "")]
        email: String,

        /// Id of the thread root this comment replies to
        #[arg(long, default_value = "")]
        reply_thread: String,

        /// Id of the specific comment this comment replies to
        #[arg(long, default_value = "")]
        reply_id: String,

        /// Base branch to gate on (defaults to COMMENTGATE_BASE)
        #[arg(long)]
        base: Option<String>,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "commentgate=debug"
    } else {
        "commentgate=info"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<String, SubmitError> {
    let config = Config::from_env()?;
    let host = GitHubClient::new(&config)?;

    match cli.command {
        Commands::Submit {
            entry,
            name,
            body,
            website,
            email,
            reply_thread,
            reply_id,
            base,
        } => {
            let base = base.unwrap_or_else(|| config.default_base.clone());
            let draft = CommentDraft {
                name,
                body,
                website,
                email,
                reply_thread,
                reply_id,
                reply_name: String::new(),
            };
            let outcome = submit(&host, &base, &entry, draft).await?;
            serde_json::to_string_pretty(&outcome)
                .map_err(|e| SubmitError::Other(anyhow::Error::new(e)))
        }
    }
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(output) => println!("{output}"),
        Err(err) => {
            let failure = SubmissionFailure::from(&err);
            let rendered = serde_json::to_string(&failure)
                .unwrap_or_else(|_| format!("{{\"errorMessage\":{:?}}}", err.to_string()));
            eprintln!("{rendered}");
            std::process::exit(if failure.is_client_fault { 2 } else { 1 });
        }
    }
}
