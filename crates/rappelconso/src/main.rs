use crate::prelude::*;
use clap::Parser;

mod error;
mod mcp;
mod prelude;
mod recalls;

#[derive(Debug, clap::Parser)]
#[command(
    author,
    version,
    about,
    long_about = "Query the RappelConso product recall dataset from the terminal or through MCP"
)]
pub struct App {
    #[command(subcommand)]
    pub command: SubCommands,

    #[clap(flatten)]
    global: Global,
}

#[derive(Debug, Clone, clap::Args)]
pub struct Global {
    /// RappelConso records endpoint
    #[clap(
        long,
        env = "RAPPELCONSO_BASE_URL",
        global = true,
        default_value = crate::recalls::DEFAULT_BASE_URL
    )]
    base_url: String,

    /// Upstream request timeout, in seconds
    #[clap(long, env = "RAPPELCONSO_TIMEOUT", global = true, default_value = "30")]
    timeout: u64,

    /// Whether to display additional information.
    #[clap(long, env = "RAPPELCONSO_VERBOSE", global = true, default_value = "false")]
    verbose: bool,
}

#[derive(Debug, clap::Parser)]
pub enum SubCommands {
    /// Product recall queries (search, latest, categories)
    Recalls(crate::recalls::App),

    /// Model Context Protocol server
    MCP(crate::mcp::App),
}

/// Logs go to stderr so the stdio transport keeps stdout for JSON-RPC.
fn init_logger(verbose: bool) {
    let default_filter = if verbose {
        "warn,rappelconso=debug"
    } else {
        "warn"
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let app = App::parse();
    init_logger(app.global.verbose);

    match app.command {
        SubCommands::Recalls(sub_app) => crate::recalls::run(sub_app, app.global).await,
        SubCommands::MCP(sub_app) => crate::mcp::run(sub_app, app.global).await,
    }
    .map_err(|err: color_eyre::eyre::Report| eyre!(err))
}
