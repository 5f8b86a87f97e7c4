use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

use skillbridge_client::config::Config;
use skillbridge_client::http::UnauthorizedHandler;
use skillbridge_client::insights::{skill_match_percent, summarize_utilization};
use skillbridge_client::{ApiClient, FileStore, ReqwestTransport, Session, SkillBridgeApi};

#[derive(Parser)]
#[command(name = "skillbridge")]
#[command(about = "SkillBridge workforce allocation CLI")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Log in and persist the session token
    Login { email: String, password: String },
    /// Clear the persisted session
    Logout,
    /// Show the logged-in identity and profile
    Whoami,
    /// List projects
    Projects {
        #[arg(long, default_value_t = false)]
        active: bool,
    },
    /// List my skills
    Skills,
    /// List bench employees
    Bench,
    /// Team utilization counts
    Utilization,
    /// Rank bench employees by skill match against a project
    Match { project_id: Uuid },
}

#[derive(Serialize)]
struct MatchRow {
    employee: String,
    email: String,
    match_percent: u32,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env()?;

    // Logs go to stderr so stdout stays machine-readable JSON.
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "skillbridge_client={0},skillbridge={0}",
                &config.rust_log
            ))
        }))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!(
        "SkillBridge client v{} -> {}",
        env!("CARGO_PKG_VERSION"),
        config.api_url
    );

    let transport = ReqwestTransport::new(config.api_url.clone())
        .context("Failed to build HTTP client")?;
    let store = FileStore::new(config.session_file.clone());
    let on_unauthorized: UnauthorizedHandler = Arc::new(|| {
        warn!("Session expired or invalid. Run `skillbridge login` again.");
    });
    let client = ApiClient::new(Arc::new(transport), Arc::new(store), on_unauthorized);

    let session = Session::new(client.clone());
    let api = SkillBridgeApi::new(client);

    match cli.command {
        Command::Login { email, password } => print(&session.login(&email, &password).await?),
        Command::Logout => session.logout()?,
        Command::Whoami => {
            let claims = session
                .current()?
                .context("Not logged in. Run `skillbridge login` first.")?;
            info!("Token subject: {}", claims.sub);
            print(&api.users.me().await?)
        }
        Command::Projects { active } => {
            let projects = if active {
                api.projects.active().await?
            } else {
                api.projects.all().await?
            };
            print(&projects)
        }
        Command::Skills => print(&api.skills.mine().await?),
        Command::Bench => print(&api.users.bench().await?),
        Command::Utilization => {
            print(&summarize_utilization(&api.allocations.team_utilization().await?))
        }
        Command::Match { project_id } => {
            let (project, bench) = tokio::try_join!(
                api.projects.find(project_id),
                api.users.bench()
            )?;
            let project = project.with_context(|| format!("Project {project_id} not found"))?;

            let mut rows: Vec<MatchRow> = bench
                .iter()
                .map(|emp| MatchRow {
                    employee: emp.display_name(),
                    email: emp.email.clone(),
                    match_percent: skill_match_percent(&emp.skills, &project.tech_stack),
                })
                .collect();
            rows.sort_by(|a, b| b.match_percent.cmp(&a.match_percent));
            print(&rows)
        }
    }

    Ok(())
}

fn print<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{json}"),
        Err(e) => warn!("Could not render output: {e}"),
    }
}
