//! # Flaps CLI
//!
//! Command-line interface for Nubster Flaps: the administrative surface for
//! flags, environments, and emergency kill switches. Talks to
//! [`flaps_storage::Repositories`] directly rather than through the HTTP
//! server, since this is an operator tool, not one of the wire adapters.

use clap::{Parser, Subcommand};
use uuid::Uuid;

use flaps_core::{
    Environment, Flag, FlagEnvironment, FlagKey, FlagType, FlagVariant, ProjectId, UserId,
};
use flaps_storage::{DatabaseConfig, InMemoryChangeBus, Repositories};

#[derive(Parser)]
#[command(name = "flaps")]
#[command(author, version, about = "Nubster Flaps CLI - Feature Flags Management", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage flags
    Flag {
        #[command(subcommand)]
        action: FlagCommands,
    },
    /// Manage projects (read-only here; projects are owned by the Workspace API)
    Project {
        #[command(subcommand)]
        action: ProjectCommands,
    },
    /// Manage environments
    Env {
        #[command(subcommand)]
        action: EnvCommands,
    },
    /// Evaluate a flag
    Eval {
        /// Project ID
        #[arg(long)]
        project: String,
        /// Flag key
        #[arg(short, long)]
        flag: String,
        /// Environment key
        #[arg(short, long, default_value = "dev")]
        env: String,
        /// User ID to evaluate as
        #[arg(short, long)]
        user: Option<String>,
    },
    /// Kill switch - emergency disable a flag in an environment
    Kill {
        /// Project ID
        #[arg(long)]
        project: String,
        /// Flag key
        flag: String,
        /// Environment key
        #[arg(short, long, default_value = "prod")]
        env: String,
        /// Reason for kill switch, recorded on the overlay
        #[arg(short, long)]
        reason: String,
    },
    /// Export flags configuration (not implemented: no bulk export surface yet)
    Export {
        #[arg(short, long)]
        project: String,
        #[arg(short, long, default_value = "json")]
        format: String,
    },
    /// Import flags configuration (not implemented: no bulk import surface yet)
    Import {
        file: String,
        #[arg(short, long)]
        project: String,
        #[arg(short, long, default_value = "dry-run")]
        mode: String,
    },
    /// Compare environments (not implemented: no diff surface yet)
    Diff {
        #[arg(short, long)]
        project: String,
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
    },
    /// Sync environments (not implemented: no sync surface yet)
    Sync {
        #[arg(short, long)]
        project: String,
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
    },
}

#[derive(Subcommand)]
enum FlagCommands {
    /// List flags
    List {
        #[arg(short, long)]
        project: String,
    },
    /// Get flag details
    Get {
        key: String,
        #[arg(short, long)]
        project: String,
    },
    /// Create a new flag
    Create {
        key: String,
        #[arg(short, long)]
        name: String,
        #[arg(short, long)]
        project: String,
        /// Flag type: boolean, percentage, variant, segment
        #[arg(short, long, default_value = "boolean")]
        r#type: String,
    },
    /// Toggle a flag in an environment
    Toggle {
        key: String,
        #[arg(short, long)]
        project: String,
        #[arg(short, long)]
        env: String,
        #[arg(short, long)]
        enabled: bool,
    },
    /// Delete a flag
    Delete {
        key: String,
        #[arg(short, long)]
        project: String,
    },
    /// Archive a flag, forcing enabled=false across every environment
    Archive {
        key: String,
        #[arg(short, long)]
        project: String,
    },
}

#[derive(Subcommand)]
enum ProjectCommands {
    List,
    Get {
        key: String,
    },
    Create {
        key: String,
        #[arg(short, long)]
        name: String,
    },
    Delete {
        key: String,
    },
}

#[derive(Subcommand)]
enum EnvCommands {
    List {
        #[arg(short, long)]
        project: String,
    },
    Create {
        key: String,
        #[arg(short, long)]
        name: String,
        #[arg(short, long)]
        project: String,
    },
    Delete {
        key: String,
        #[arg(short, long)]
        project: String,
    },
}

fn parse_project_id(raw: &str) -> anyhow::Result<ProjectId> {
    Ok(ProjectId::from_uuid(raw.parse::<Uuid>().map_err(|_| {
        anyhow::anyhow!("invalid project id {raw:?}: expected a UUID")
    })?))
}

fn parse_flag_type(raw: &str) -> anyhow::Result<FlagType> {
    match raw {
        "boolean" => Ok(FlagType::Boolean),
        "percentage" => Ok(FlagType::Percentage),
        "variant" => Ok(FlagType::Variant),
        "segment" => Ok(FlagType::Segment),
        other => anyhow::bail!("unknown flag type {other:?}: expected boolean, percentage, variant, or segment"),
    }
}

async fn connect() -> anyhow::Result<Repositories> {
    dotenvy::dotenv().ok();
    let database_url = std::env::var("DATABASE_URL")
        .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?;
    let config = DatabaseConfig {
        url: database_url,
        ..DatabaseConfig::default()
    };
    Ok(Repositories::connect(&config, InMemoryChangeBus::default()).await?)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Flag { action } => run_flag(action).await,
        Commands::Env { action } => run_env(action).await,
        Commands::Project { action } => run_project(action),
        Commands::Eval { project, flag, env, user } => run_eval(project, flag, env, user).await,
        Commands::Kill { project, flag, env, reason } => run_kill(project, flag, env, reason).await,
        Commands::Export { project, format } => {
            println!("export not supported: no bulk export surface (project={project}, format={format})");
            Ok(())
        },
        Commands::Import { file, project, mode } => {
            println!("import not supported: no bulk import surface (file={file}, project={project}, mode={mode})");
            Ok(())
        },
        Commands::Diff { project, from, to } => {
            println!("diff not supported: no environment-diff surface (project={project}, from={from}, to={to})");
            Ok(())
        },
        Commands::Sync { project, from, to } => {
            println!("sync not supported: no environment-sync surface (project={project}, from={from}, to={to})");
            Ok(())
        },
    }
}

async fn run_flag(action: FlagCommands) -> anyhow::Result<()> {
    let repos = connect().await?;

    match action {
        FlagCommands::List { project } => {
            let project_id = parse_project_id(&project)?;
            let flags = repos.list_flags(project_id).await?;
            if flags.is_empty() {
                println!("no flags in project {project}");
            }
            for flag in flags {
                println!(
                    "{:<30} {:<10?} archived={} permanent={}",
                    flag.key.as_str(),
                    flag.flag_type,
                    flag.archived,
                    flag.permanent
                );
            }
        },
        FlagCommands::Get { key, project } => {
            let project_id = parse_project_id(&project)?;
            let flag_key = FlagKey::try_new(&key)
                .ok_or_else(|| anyhow::anyhow!("invalid flag key {key:?}"))?;
            match repos.get_flag_by_key(project_id, &flag_key).await? {
                Some(flag) => println!("{flag:#?}"),
                None => println!("flag {key} not found in project {project}"),
            }
        },
        FlagCommands::Create { key, name, project, r#type } => {
            let project_id = parse_project_id(&project)?;
            let flag_type = parse_flag_type(&r#type)?;
            let created_by = UserId::new("cli");
            let flag = match flag_type {
                FlagType::Boolean => Flag::new_boolean(key, name, project_id, created_by),
                FlagType::Percentage => Flag::new_percentage(key, name, project_id, created_by),
                FlagType::Variant => Flag::new_variant(key, name, Vec::<FlagVariant>::new(), project_id, created_by),
                FlagType::Segment => Flag::new_segment(key, name, project_id, created_by),
            };
            repos.create_flag(&flag).await?;
            println!("created flag {} ({:?})", flag.key.as_str(), flag.flag_type);
        },
        FlagCommands::Toggle { key, project, env, enabled } => {
            let project_id = parse_project_id(&project)?;
            let flag_key = FlagKey::try_new(&key)
                .ok_or_else(|| anyhow::anyhow!("invalid flag key {key:?}"))?;
            let flag = repos
                .get_flag_by_key(project_id, &flag_key)
                .await?
                .ok_or_else(|| anyhow::anyhow!("flag {key} not found"))?;
            let environment = repos
                .get_environment_by_key(project_id, &env)
                .await?
                .ok_or_else(|| anyhow::anyhow!("environment {env} not found"))?;

            let mut overlay = repos
                .get_overlay(flag.id, environment.id)
                .await?
                .unwrap_or_else(|| FlagEnvironment::new(flag.id, environment.id));
            overlay.toggle(enabled);
            repos.upsert_overlay(&overlay).await?;
            println!("flag {key} in {env} is now enabled={enabled}");
        },
        FlagCommands::Delete { key, project } => {
            let project_id = parse_project_id(&project)?;
            let flag_key = FlagKey::try_new(&key)
                .ok_or_else(|| anyhow::anyhow!("invalid flag key {key:?}"))?;
            let flag = repos
                .get_flag_by_key(project_id, &flag_key)
                .await?
                .ok_or_else(|| anyhow::anyhow!("flag {key} not found"))?;
            repos.delete_flag(flag.id).await?;
            println!("deleted flag {key}");
        },
        FlagCommands::Archive { key, project } => {
            let project_id = parse_project_id(&project)?;
            let flag_key = FlagKey::try_new(&key)
                .ok_or_else(|| anyhow::anyhow!("invalid flag key {key:?}"))?;
            let flag = repos
                .get_flag_by_key(project_id, &flag_key)
                .await?
                .ok_or_else(|| anyhow::anyhow!("flag {key} not found"))?;
            repos.archive_flag(flag.id).await?;
            println!("archived flag {key}: disabled in every environment");
        },
    }
    Ok(())
}

async fn run_env(action: EnvCommands) -> anyhow::Result<()> {
    let repos = connect().await?;

    match action {
        EnvCommands::List { project } => {
            let project_id = parse_project_id(&project)?;
            for env in repos.list_environments(project_id).await? {
                println!("{:<12} {} (production={})", env.key, env.name, env.is_production);
            }
        },
        EnvCommands::Create { key, name, project } => {
            let project_id = parse_project_id(&project)?;
            let environment = Environment::new(key, name, project_id);
            repos.create_environment(&environment).await?;
            println!("created environment {}", environment.key);
        },
        EnvCommands::Delete { key, project } => {
            let project_id = parse_project_id(&project)?;
            let environment = repos
                .get_environment_by_key(project_id, &key)
                .await?
                .ok_or_else(|| anyhow::anyhow!("environment {key} not found"))?;
            repos.delete_environment(environment.id).await?;
            println!("deleted environment {key}");
        },
    }
    Ok(())
}

fn run_project(action: ProjectCommands) -> anyhow::Result<()> {
    // Projects are owned by the Workspace API, not local storage; this CLI
    // has no Workspace API client configured, so project administration
    // happens there, not here.
    match action {
        ProjectCommands::List => println!("project administration happens in the Workspace API"),
        ProjectCommands::Get { key } => println!("project {key}: see the Workspace API"),
        ProjectCommands::Create { key, name } => {
            println!("create project {key} ({name}) in the Workspace API")
        },
        ProjectCommands::Delete { key } => println!("delete project {key} in the Workspace API"),
    }
    Ok(())
}

async fn run_eval(project: String, flag: String, env: String, user: Option<String>) -> anyhow::Result<()> {
    let repos = connect().await?;
    let project_id = parse_project_id(&project)?;
    let flag_key =
        FlagKey::try_new(&flag).ok_or_else(|| anyhow::anyhow!("invalid flag key {flag:?}"))?;

    let flag_record = repos
        .get_flag_by_key(project_id, &flag_key)
        .await?
        .ok_or_else(|| anyhow::anyhow!("flag {flag} not found"))?;
    let environment = repos
        .get_environment_by_key(project_id, &env)
        .await?
        .ok_or_else(|| anyhow::anyhow!("environment {env} not found"))?;
    let overlay = repos.get_overlay(flag_record.id, environment.id).await?;
    let segments = repos.list_segments(project_id).await?;

    let context = match user {
        Some(user_id) => flaps_core::EvaluationContext::with_user_id(user_id),
        None => flaps_core::EvaluationContext::new(),
    };

    let evaluator = flaps_core::Evaluator::with_segments(segments);
    let decision = evaluator.evaluate(&flag_record, overlay.as_ref(), &context);

    println!(
        "{} -> enabled={} variant={:?} reason={}",
        flag, decision.enabled, decision.variant, decision.reason
    );
    Ok(())
}

async fn run_kill(project: String, flag: String, env: String, reason: String) -> anyhow::Result<()> {
    let repos = connect().await?;
    let project_id = parse_project_id(&project)?;
    let flag_key =
        FlagKey::try_new(&flag).ok_or_else(|| anyhow::anyhow!("invalid flag key {flag:?}"))?;

    let flag_record = repos
        .get_flag_by_key(project_id, &flag_key)
        .await?
        .ok_or_else(|| anyhow::anyhow!("flag {flag} not found"))?;
    let environment = repos
        .get_environment_by_key(project_id, &env)
        .await?
        .ok_or_else(|| anyhow::anyhow!("environment {env} not found"))?;

    let mut overlay = repos
        .get_overlay(flag_record.id, environment.id)
        .await?
        .unwrap_or_else(|| FlagEnvironment::new(flag_record.id, environment.id));
    overlay.toggle(false);
    overlay.metadata = serde_json::json!({ "kill_reason": reason, "killed_at": chrono::Utc::now() });
    repos.upsert_overlay(&overlay).await?;

    tracing::warn!(flag = %flag, env = %env, reason = %reason, "kill switch engaged");
    println!("killed {flag} in {env}: {reason}");
    Ok(())
}
