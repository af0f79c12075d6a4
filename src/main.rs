use clap::{
    ArgAction, CommandFactory, Parser, Subcommand,
    builder::{
        Styles,
        styling::{AnsiColor, Effects},
    },
};
use clap_complete::{Shell, generate};
use tracing_subscriber::EnvFilter;

use plsort::{cli, config, error};

fn styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::White.on_default() | Effects::BOLD)
        .usage(AnsiColor::White.on_default() | Effects::BOLD)
        .literal(AnsiColor::BrightBlue.on_default())
        .placeholder(AnsiColor::BrightGreen.on_default())
}

#[derive(Parser, Debug, Clone)]
#[clap(
  version = env!("CARGO_PKG_VERSION"),
  name=env!("CARGO_PKG_NAME"),
  bin_name=env!("CARGO_PKG_NAME"),
  author=env!("CARGO_PKG_AUTHORS"),
  about=env!("CARGO_PKG_DESCRIPTION"),
  styles=styles(),
)]
struct Cli {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Sort one playlist by release date now
    Sort(SortOptions),

    /// Sort every opted-in playlist of every opted-in user
    Run,

    /// Start the HTTP service with the cron trigger endpoint
    Serve,

    /// Handle registered playlists
    Playlists(PlaylistsOptions),

    /// Handle users and their credentials
    Principals(PrincipalsOptions),

    /// Show recent sort outcomes of a user
    Logs(LogsOptions),

    /// Show audio features of a playlist's tracks
    Features(FeaturesOptions),

    /// Get shell completions
    Completions(CompletionsOption),
}

#[derive(Parser, Debug, Clone)]
pub struct SortOptions {
    /// Spotify user id
    principal: String,
    /// Spotify playlist id
    playlist: String,
}

#[derive(Parser, Debug, Clone)]
pub struct PlaylistsOptions {
    #[command(subcommand)]
    pub command: PlaylistsSubcommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum PlaylistsSubcommand {
    /// List registered playlists
    List { principal: String },
    /// Register all playlists the user owns
    Sync { principal: String },
    /// Enable auto-sort for a playlist
    Enable { principal: String, playlist: String },
    /// Disable auto-sort for a playlist
    Disable { principal: String, playlist: String },
}

#[derive(Parser, Debug, Clone)]
pub struct PrincipalsOptions {
    #[command(subcommand)]
    pub command: PrincipalsSubcommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum PrincipalsSubcommand {
    /// Store a user's refresh token
    Add(PrincipalAddOpts),
    /// Turn auto-sort on or off for a user
    AutoSort {
        principal: String,
        #[clap(action = ArgAction::Set)]
        enabled: bool,
    },
}

#[derive(Parser, Debug, Clone)]
pub struct PrincipalAddOpts {
    /// Spotify user id
    principal: String,

    /// Refresh token obtained from the authorization flow
    #[clap(long)]
    refresh_token: String,

    /// Register the user with auto-sort turned off
    #[clap(long)]
    no_auto_sort: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct LogsOptions {
    principal: String,

    /// Number of entries to show
    #[clap(long, default_value_t = 20)]
    limit: usize,
}

#[derive(Parser, Debug, Clone)]
pub struct FeaturesOptions {
    principal: String,
    playlist: String,
}

#[derive(Parser, Debug, Clone)]
pub struct CompletionsOption {
    shell: Shell,
}

#[tokio::main]
async fn main() {
    if let Err(e) = config::load_env().await {
        error!("Cannot load environment. Err: {}", e);
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("plsort=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Sort(opt) => cli::sort(opt.principal, opt.playlist).await,
        Command::Run => cli::run().await,
        Command::Serve => cli::serve().await,

        Command::Playlists(opt) => match opt.command {
            PlaylistsSubcommand::List { principal } => cli::list_playlists(principal).await,
            PlaylistsSubcommand::Sync { principal } => cli::sync_playlists(principal).await,
            PlaylistsSubcommand::Enable {
                principal,
                playlist,
            } => cli::set_playlist_auto_sort(principal, playlist, true).await,
            PlaylistsSubcommand::Disable {
                principal,
                playlist,
            } => cli::set_playlist_auto_sort(principal, playlist, false).await,
        },

        Command::Principals(opt) => match opt.command {
            PrincipalsSubcommand::Add(a) => {
                cli::add_principal(a.principal, a.refresh_token, !a.no_auto_sort).await
            }
            PrincipalsSubcommand::AutoSort { principal, enabled } => {
                cli::set_principal_auto_sort(principal, enabled).await
            }
        },

        Command::Logs(opt) => cli::logs(opt.principal, opt.limit).await,
        Command::Features(opt) => cli::features(opt.principal, opt.playlist).await,
        Command::Completions(opt) => {
            let mut cmd = Cli::command_for_update();
            let name = cmd.get_name().to_string();
            generate(opt.shell, &mut cmd, name, &mut std::io::stdout())
        }
    }
}
