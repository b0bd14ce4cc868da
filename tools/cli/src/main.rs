//! pirkit CLI - post-incident review documents on Google Drive.
//!
//! This tool authenticates against the Drive API and finds or creates the
//! folders and documents of the incident review layout.

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use pirkit_common::{ResourceId, ResourceKind};
use pirkit_drive::gdrive::{
    self, AccessTokenSource, CodeProvider, DriveClient, StaticCodeProvider, StdinCodeProvider,
};
use pirkit_drive::{
    prepare_incident_document, AuthMode, DriveApi, DriveFile, FileQuery, Materializer, Resolution,
    Resolver, Settings,
};

#[derive(Parser)]
#[command(name = "pirkit")]
#[command(about = "pirkit - Post incident review documents on Google Drive")]
#[command(version)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Settings file (default: ./pirkit.json, then the user config directory).
    #[arg(short, long, global = true, env = "PIRKIT_CONFIG")]
    config: Option<PathBuf>,

    /// Override the configured authentication mode.
    #[arg(long, global = true, value_enum)]
    auth_mode: Option<AuthModeArg>,

    /// Override the configured shared drive id.
    #[arg(long, global = true)]
    drive_id: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum AuthModeArg {
    Oauth,
    Token,
    ServiceAccount,
}

impl From<AuthModeArg> for AuthMode {
    fn from(arg: AuthModeArg) -> Self {
        match arg {
            AuthModeArg::Oauth => AuthMode::Oauth,
            AuthModeArg::Token => AuthMode::Token,
            AuthModeArg::ServiceAccount => AuthMode::ServiceAccount,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum KindArg {
    Folder,
    Document,
}

impl From<KindArg> for ResourceKind {
    fn from(arg: KindArg) -> Self {
        match arg {
            KindArg::Folder => ResourceKind::Folder,
            KindArg::Document => ResourceKind::Document,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Authorize and cache a user token.
    Auth {
        /// Ignore the cached token and authorize again.
        #[arg(short, long)]
        force: bool,

        /// Authorization code or redirect URL, instead of prompting.
        #[arg(long)]
        code: Option<String>,

        /// Open the authorization URL in a browser.
        #[arg(long)]
        open: bool,
    },

    /// List shared drives visible to the account.
    Drives,

    /// List files (first page).
    Files,

    /// Look up a named resource under a parent.
    Find {
        /// Parent folder id (default: the configured root parent).
        #[arg(short, long)]
        parent: Option<String>,

        /// Resource name.
        #[arg(short, long)]
        name: String,

        #[arg(short, long, value_enum, default_value = "folder")]
        kind: KindArg,
    },

    /// Find a folder, creating it when missing.
    Folder {
        /// Parent folder id (default: the configured root parent).
        #[arg(short, long)]
        parent: Option<String>,

        /// Folder name.
        #[arg(short, long)]
        name: String,
    },

    /// Find a document, copying it from a template when missing.
    Document {
        /// Parent folder id.
        #[arg(short, long)]
        parent: String,

        /// Document name.
        #[arg(short, long)]
        name: String,

        /// Template document id.
        #[arg(short, long)]
        template: String,
    },

    /// Print the browser link of a resource.
    Link {
        /// Resource id.
        id: String,
    },

    /// Prepare the review document for an incident.
    Incident {
        /// Team folder name.
        #[arg(short, long)]
        team: String,

        /// Incident document name.
        #[arg(short, long)]
        name: String,

        /// Print the result as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show the effective settings.
    Config {
        /// Write the effective settings to this path.
        #[arg(long)]
        write: Option<PathBuf>,
    },

    /// Generate shell completions.
    Completions {
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    if let Commands::Completions { shell } = cli.command {
        let mut cmd = Cli::command();
        clap_complete::generate(shell, &mut cmd, "pirkit", &mut std::io::stdout());
        return Ok(());
    }

    let settings = load_settings(&cli)?;

    match cli.command {
        Commands::Auth { force, code, open } => cmd_auth(settings, force, code, open).await,
        Commands::Drives => cmd_drives(&settings).await,
        Commands::Files => cmd_files(&settings).await,
        Commands::Find { parent, name, kind } => {
            cmd_find(&settings, parent.as_deref(), &name, kind.into()).await
        }
        Commands::Folder { parent, name } => cmd_folder(&settings, parent.as_deref(), &name).await,
        Commands::Document {
            parent,
            name,
            template,
        } => cmd_document(&settings, &parent, &name, &template).await,
        Commands::Link { id } => cmd_link(&settings, &id).await,
        Commands::Incident { team, name, json } => cmd_incident(&settings, &team, &name, json).await,
        Commands::Config { write } => cmd_config(&settings, write.as_deref()),
        Commands::Completions { .. } => Ok(()),
    }
}

/// Load settings and apply command-line overrides.
fn load_settings(cli: &Cli) -> Result<Settings> {
    let mut settings =
        Settings::load_or_default(cli.config.as_deref()).context("Failed to load settings")?;

    if let Some(mode) = cli.auth_mode {
        settings.auth.mode = mode.into();
    }
    if let Some(drive_id) = &cli.drive_id {
        settings.drive.drive_id = Some(drive_id.clone());
    }

    Ok(settings)
}

/// Authenticate and build a Drive client, prompting on stdin when needed.
async fn connect(settings: &Settings) -> Result<DriveClient> {
    let provider = StdinCodeProvider::new(settings.auth.open_browser);
    gdrive::connect(settings, &provider)
        .await
        .context("Unable to retrieve Drive client")
}

fn parse_id(id: &str) -> Result<ResourceId> {
    ResourceId::new(id).with_context(|| format!("Invalid resource id: {:?}", id))
}

fn parent_or_root(settings: &Settings, parent: Option<&str>) -> Result<ResourceId> {
    match parent {
        Some(id) => parse_id(id),
        None => settings
            .drive
            .root_parent()
            .context("Invalid root parent id"),
    }
}

/// Authorize and cache a token.
async fn cmd_auth(mut settings: Settings, force: bool, code: Option<String>, open: bool) -> Result<()> {
    settings.auth.open_browser |= open;

    let provider: Box<dyn CodeProvider> = match code {
        Some(code) => Box::new(StaticCodeProvider::new(code)),
        None => Box::new(StdinCodeProvider::new(settings.auth.open_browser)),
    };

    let tokens: Arc<dyn AccessTokenSource> = match settings.auth.mode {
        AuthMode::Oauth => Arc::new(
            gdrive::user_token_manager(&settings.auth, provider.as_ref(), force)
                .await
                .context("Authorization failed")?,
        ),
        _ => {
            if force {
                tracing::warn!("--force only applies to oauth mode");
            }
            gdrive::token_source(&settings.auth, provider.as_ref())
                .await
                .context("Failed to load credentials")?
        }
    };

    tokens
        .access_token()
        .await
        .context("Unable to obtain an access token")?;

    println!("Authenticated ({:?} mode).", settings.auth.mode);
    if settings.auth.mode == AuthMode::Oauth {
        println!("  Token: {}", settings.auth.token_path.display());
    }

    Ok(())
}

/// List shared drives.
async fn cmd_drives(settings: &Settings) -> Result<()> {
    let client = connect(settings).await?;
    let drives = client
        .list_drives()
        .await
        .context("Unable to list shared drives")?;

    if drives.is_empty() {
        println!("No shared drives found.");
    } else {
        println!("Shared drives:");
        for drive in drives {
            println!("  {} ({})", drive.name, drive.id);
        }
    }

    Ok(())
}

/// List files.
async fn cmd_files(settings: &Settings) -> Result<()> {
    let client = connect(settings).await?;
    let list = client
        .list_all_files()
        .await
        .context("Unable to retrieve files")?;

    if list.files.is_empty() {
        println!("No files found.");
    } else {
        println!("Files:");
        for file in &list.files {
            let tag = if file.is_folder() { "[DIR] " } else { "[FILE]" };
            println!("  {} {} ({})", tag, file.name, file.id);
        }
    }
    if list.next_page_token.is_some() {
        println!("  ... more results not shown");
    }

    Ok(())
}

/// Resolve a name and report what was found.
async fn cmd_find(
    settings: &Settings,
    parent: Option<&str>,
    name: &str,
    kind: ResourceKind,
) -> Result<()> {
    let parent = parent_or_root(settings, parent)?;
    let client = connect(settings).await?;

    let file = find_resource(&client, &FileQuery::new(parent, name, kind)).await?;
    println!("Found: {} ({})", file.name, file.id);

    Ok(())
}

/// Resolve `query` to exactly one resource. Missing or duplicate matches fail.
async fn find_resource(api: &dyn DriveApi, query: &FileQuery) -> Result<DriveFile> {
    match Resolver::new(api)
        .resolve(query)
        .await
        .context("Lookup failed")?
    {
        Resolution::Found(file) => Ok(file),
        Resolution::NotFound => {
            anyhow::bail!("No {} named {:?} under {}", query.kind, query.name, query.parent)
        }
        Resolution::Ambiguous(count) => anyhow::bail!(
            "Ambiguous: {} {}s named {:?} under {}",
            count,
            query.kind,
            query.name,
            query.parent
        ),
    }
}

/// Get or create a folder.
async fn cmd_folder(settings: &Settings, parent: Option<&str>, name: &str) -> Result<()> {
    let parent = parent_or_root(settings, parent)?;
    let client = connect(settings).await?;

    let resolved = Materializer::new(&client)
        .get_or_create_folder(&parent, name)
        .await
        .context("Failed to get or create folder")?;

    info!("Folder {} ({})", name, resolved.id);
    let verb = if resolved.created { "Created" } else { "Found" };
    println!("{} folder: {}", verb, resolved.id);

    Ok(())
}

/// Get or copy a document.
async fn cmd_document(settings: &Settings, parent: &str, name: &str, template: &str) -> Result<()> {
    let parent = parse_id(parent)?;
    let template = parse_id(template)?;
    let client = connect(settings).await?;

    let resolved = Materializer::new(&client)
        .get_or_copy_document(&parent, name, &template)
        .await
        .context("Failed to get or copy document")?;

    let verb = if resolved.created { "Copied" } else { "Found" };
    println!("{} document: {}", verb, resolved.id);

    Ok(())
}

/// Print the browser link of a resource.
async fn cmd_link(settings: &Settings, id: &str) -> Result<()> {
    let id = parse_id(id)?;
    let client = connect(settings).await?;

    let file = client
        .get_file(&id)
        .await
        .context("Failed to get file")?;

    match file.web_view_link {
        Some(link) => println!("{}", link),
        None => anyhow::bail!("No link available for {}", id),
    }

    Ok(())
}

/// Prepare the incident document.
async fn cmd_incident(settings: &Settings, team: &str, name: &str, json: bool) -> Result<()> {
    let root_parent = settings
        .drive
        .root_parent()
        .context("Invalid root parent id")?;
    let client = connect(settings).await?;

    let doc = prepare_incident_document(&client, &settings.layout, &root_parent, team, name)
        .await
        .context("Failed to prepare incident document")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&doc)?);
        return Ok(());
    }

    println!("Incident document ready!");
    println!("  Team folder: {}", doc.team_folder_id);
    println!("  Document: {}", doc.document_id);
    if let Some(link) = &doc.link {
        println!("  Link: {}", link);
    }

    Ok(())
}

/// Show or write the effective settings.
fn cmd_config(settings: &Settings, write: Option<&Path>) -> Result<()> {
    let json = settings.to_json().context("Failed to serialize settings")?;

    match write {
        Some(path) => {
            std::fs::write(path, format!("{}\n", json))
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Settings written to {}", path.display());
        }
        None => println!("{}", json),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pirkit_drive::MemoryDrive;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_overrides_apply() {
        let cli = Cli::try_parse_from([
            "pirkit",
            "--config",
            "/nonexistent/pirkit.json",
            "--auth-mode",
            "service-account",
            "--drive-id",
            "0ABC",
            "config",
        ])
        .unwrap();

        assert!(matches!(cli.auth_mode, Some(AuthModeArg::ServiceAccount)));
        assert_eq!(cli.drive_id.as_deref(), Some("0ABC"));
        // Explicit config paths must exist.
        assert!(load_settings(&cli).is_err());
    }

    #[test]
    fn test_incident_args() {
        let cli = Cli::try_parse_from(["pirkit", "incident", "-t", "Team squad 8", "-n", "Outage"])
            .unwrap();

        match cli.command {
            Commands::Incident { team, name, json } => {
                assert_eq!(team, "Team squad 8");
                assert_eq!(name, "Outage");
                assert!(!json);
            }
            _ => panic!("expected incident command"),
        }
    }

    #[tokio::test]
    async fn test_find_resource_requires_exactly_one_match() {
        let drive = MemoryDrive::new();
        drive.insert("PIR", "root", "Post Incident Review", ResourceKind::Folder).await;
        drive.insert("A", "root", "Team", ResourceKind::Folder).await;
        drive.insert("B", "root", "Team", ResourceKind::Folder).await;
        let root = ResourceId::new("root").unwrap();

        let found = find_resource(&drive, &FileQuery::folder(root.clone(), "Post Incident Review"))
            .await
            .unwrap();
        assert_eq!(found.id, "PIR");

        let missing = find_resource(&drive, &FileQuery::folder(root.clone(), "Nope")).await;
        assert!(missing.unwrap_err().to_string().starts_with("No folder"));

        let duplicate = find_resource(&drive, &FileQuery::folder(root, "Team")).await;
        assert!(duplicate.unwrap_err().to_string().starts_with("Ambiguous: 2 folders"));
    }

    #[test]
    fn test_find_kind_defaults_to_folder() {
        let cli = Cli::try_parse_from(["pirkit", "find", "-n", "Post Incident Review"]).unwrap();
        match cli.command {
            Commands::Find { kind, .. } => {
                assert_eq!(ResourceKind::from(kind), ResourceKind::Folder)
            }
            _ => panic!("expected find command"),
        }
    }
}
