//! CLI binary for codescribe.
//!
//! `serve` runs the HTTP service; `compose` prints the prompt a request would
//! produce without calling the completion service.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use codescribe::config::{DEFAULT_ALLOWED_ORIGIN, DEFAULT_BIND_ADDR, DEFAULT_MAX_UPLOAD_BYTES, DEFAULT_MODEL};
use codescribe::{
    compose_prompt, extract_standard, serve, DetailLevel, LlmGateway, ServiceConfig,
    TransformOptions, UploadedFile,
};
use std::io::{self, Read, Write};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

const AFTER_HELP: &str = r#"EXAMPLES:
  # Serve on the default address for an editor running on localhost:4200
  codescribe serve

  # Serve publicly for a deployed front-end
  codescribe serve --bind 0.0.0.0:8080 --allowed-origin https://editor.example.com

  # Preview the prompt for a file, following a PDF coding standard
  codescribe compose src/main.py --standard pep8.pdf --rename --comments advanced

  # Pipe code in
  cat util.js | codescribe compose - --comments basic

REQUEST FORMAT (POST /api/chat, multipart/form-data):
  apiKey           caller's completion-service key (required)
  prompt           code to transform (required)
  detailLevel      basic | intermediate | advanced (default basic)
  renameVariables  "true" to rename identifiers
  addComments      "true" to add comments
  file             optional coding standard, must end in .pdf

ENVIRONMENT VARIABLES:
  CODESCRIBE_BIND              Listener address
  CODESCRIBE_ALLOWED_ORIGIN    The one origin allowed cross-origin access
  CODESCRIBE_MODEL             Completion model ID
  CODESCRIBE_MAX_UPLOAD_BYTES  Request body cap
  RUST_LOG                     tracing filter, overrides --verbose
"#;

/// Comment and rename source code with an LLM, following a PDF coding standard.
#[derive(Parser, Debug)]
#[command(
    name = "codescribe",
    version,
    about = "Comment and rename source code with an LLM, following a PDF coding standard",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "CODESCRIBE_VERBOSE")]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP service.
    Serve(ServeArgs),
    /// Print the prompt that would be sent, without calling the service.
    Compose(ComposeArgs),
}

#[derive(clap::Args, Debug)]
struct ServeArgs {
    /// Address to listen on.
    #[arg(long, env = "CODESCRIBE_BIND", default_value = DEFAULT_BIND_ADDR)]
    bind: SocketAddr,

    /// Origin allowed to make credentialed cross-origin requests.
    #[arg(long, env = "CODESCRIBE_ALLOWED_ORIGIN", default_value = DEFAULT_ALLOWED_ORIGIN)]
    allowed_origin: String,

    /// Completion model ID.
    #[arg(long, env = "CODESCRIBE_MODEL", default_value = DEFAULT_MODEL)]
    model: String,

    /// Maximum request body size in bytes.
    #[arg(long, env = "CODESCRIBE_MAX_UPLOAD_BYTES", default_value_t = DEFAULT_MAX_UPLOAD_BYTES)]
    max_upload_bytes: usize,
}

#[derive(clap::Args, Debug)]
struct ComposeArgs {
    /// File holding the code, or `-` for stdin.
    code: PathBuf,

    /// Coding-standard PDF to embed.
    #[arg(long)]
    standard: Option<PathBuf>,

    /// Ask for identifiers to be renamed.
    #[arg(long)]
    rename: bool,

    /// Ask for comments at this level.
    #[arg(long, value_enum)]
    comments: Option<DetailArg>,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum DetailArg {
    Basic,
    Intermediate,
    Advanced,
}

impl From<DetailArg> for DetailLevel {
    fn from(v: DetailArg) -> Self {
        match v {
            DetailArg::Basic => DetailLevel::Basic,
            DetailArg::Intermediate => DetailLevel::Intermediate,
            DetailArg::Advanced => DetailLevel::Advanced,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.verbose {
        "debug"
    } else {
        "info,tower_http=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Command::Serve(args) => run_serve(args).await,
        Command::Compose(args) => run_compose(args).await,
    }
}

async fn run_serve(args: ServeArgs) -> Result<()> {
    let config = ServiceConfig::builder()
        .bind_addr(args.bind)
        .allowed_origin(args.allowed_origin)
        .model(args.model)
        .max_upload_bytes(args.max_upload_bytes)
        .build()
        .context("Invalid configuration")?;
    tracing::debug!("{:?}", config);

    let gateway = Arc::new(LlmGateway::from_config(&config));
    serve(config, gateway).await.context("Server failed")?;
    Ok(())
}

async fn run_compose(args: ComposeArgs) -> Result<()> {
    let code = read_code(&args.code).await?;
    let code = code.trim();
    if code.is_empty() {
        anyhow::bail!("No code to compose a prompt for");
    }

    let standard = match args.standard {
        Some(ref path) => {
            let bytes = tokio::fs::read(path)
                .await
                .with_context(|| format!("Failed to read coding standard {:?}", path))?;
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            let text = extract_standard(Some(UploadedFile::new(file_name, bytes))).await;
            if text.is_empty() {
                eprintln!("warning: {:?} yielded no text; composing without a standard", path);
            }
            text
        }
        None => String::new(),
    };

    let options = TransformOptions {
        rename_identifiers: args.rename,
        comments: args.comments.map(DetailLevel::from),
    };

    let prompt = compose_prompt(&standard, code, options);
    io::stdout()
        .lock()
        .write_all(prompt.as_bytes())
        .context("Failed to write to stdout")?;
    Ok(())
}

async fn read_code(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read code from stdin")?;
        Ok(buf)
    } else {
        tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read code from {:?}", path))
    }
}
