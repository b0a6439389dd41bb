#[derive(Debug, clap::Parser)]
#[command(name = "mcp")]
#[command(about = "Expose the recall tools over the Model Context Protocol")]
pub struct App {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, clap::Subcommand)]
pub enum Commands {
    /// Serve line-delimited JSON-RPC on stdin/stdout
    #[clap(name = "stdio")]
    Stdio,

    /// Serve JSON-RPC over HTTP (GET /sse, POST /message)
    #[clap(name = "sse")]
    Sse(SseOptions),
}

#[derive(Debug, clap::Args)]
#[command(after_help = "EXAMPLES:
  rappelconso mcp sse --port 8000
  rappelconso mcp sse --host 0.0.0.0 --port 8000 --timeout 10")]
pub struct SseOptions {
    /// Port to listen on
    #[arg(short, long, default_value = "8000", env = "RAPPELCONSO_MCP_PORT")]
    pub port: u16,

    /// Host to bind to
    #[arg(long, default_value = "127.0.0.1", env = "RAPPELCONSO_MCP_HOST")]
    pub host: String,
}
