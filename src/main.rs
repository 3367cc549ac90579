//! zesty - grounded persona chat
//!
//! REPL by default; `--serve` exposes the same engine over HTTP/SSE.

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt};

use zesty::config::{Config, config_dir};
use zesty::persona::Persona;
use zesty::prompt::MentionPolicy;
use zesty::repl::Repl;
use zesty::{ChatEngine, server};

#[derive(Parser)]
#[command(name = "zesty")]
#[command(version, about = "Persona chat grounded in live time, weather and search")]
struct Args {
    /// Run as HTTP server instead of REPL
    #[arg(long)]
    serve: bool,

    /// HTTP server host
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// HTTP server port
    #[arg(long, default_value = "3000")]
    port: u16,

    /// Persona: sassy, zesty or professional
    #[arg(long, short = 'p')]
    persona: Option<Persona>,

    /// Home location used for local time and weather
    #[arg(long, short = 'l')]
    location: Option<String>,

    /// Model id
    #[arg(long, short = 'm')]
    model: Option<String>,

    /// Mention policy: only-when-asked or proactive
    #[arg(long)]
    mention_policy: Option<MentionPolicy>,

    /// Groq API key
    #[arg(long, env = "GROQ_API_KEY", hide_env_values = true)]
    groq_api_key: Option<String>,

    /// Tavily API key (enables web search)
    #[arg(long, env = "TAVILY_API_KEY", hide_env_values = true)]
    tavily_api_key: Option<String>,
}

impl Args {
    /// CLI flags win over env and config file
    fn apply(self, config: &mut Config) {
        if let Some(persona) = self.persona {
            config.persona = persona;
        }
        if let Some(location) = self.location {
            config.home_location = location.trim().to_string();
        }
        if let Some(model) = self.model {
            config.model = model;
        }
        if let Some(policy) = self.mention_policy {
            config.mention_policy = policy;
        }
        if let Some(key) = self.groq_api_key.filter(|k| !k.trim().is_empty()) {
            config.groq_api_key = Some(key);
        }
        if let Some(key) = self.tavily_api_key.filter(|k| !k.trim().is_empty()) {
            config.tavily_api_key = Some(key);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (from ~/.zesty/.env or current dir)
    let env_path = Some(config_dir().join(".env")).filter(|p| p.exists());
    if let Some(path) = env_path {
        let _ = dotenvy::from_path(&path);
    } else {
        let _ = dotenvy::dotenv();
    }

    // Logs go to stderr so streamed replies on stdout stay clean
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("zesty=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let serve = args.serve;
    let host = args.host.clone();
    let port = args.port;

    let mut config = Config::load();
    args.apply(&mut config);

    if serve {
        return server::run(&config, &host, port).await;
    }

    let engine = ChatEngine::from_config(&config)
        .context("GROQ_API_KEY required (set via --groq-api-key, env var, or ~/.zesty/config.toml)")?;
    let mut repl = Repl::new(engine, &config)?;
    repl.run().await
}
