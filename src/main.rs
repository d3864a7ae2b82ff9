use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use artisan_artifact::{FsStore, persist_result};
use artisan_config::{KitConfig, default_data_dir};
use artisan_flows::Flow;
use artisan_pipeline::{
  ChannelNotifier, GenerationClient, GenerationNotifier, MediaKind, MediaPayload, Orchestrator,
  PollConfig,
};
use artisan_provider::GoogleGenAiClient;
use artisan_server::AppState;

/// Artisan - marketing content generation for handcrafted products
#[derive(Parser)]
#[command(name = "artisan")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Path to the data directory (default: ~/.artisan)
  #[arg(long, global = true)]
  data_dir: Option<PathBuf>,

  /// Path to the config file (default: {data_dir}/config.json when present)
  #[arg(long, global = true, env = "ARTISAN_CONFIG")]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Run a flow once and write its outputs
  Run {
    /// Flow name, e.g. enhance-image or festival-video
    flow: String,

    /// Image file or URL
    #[arg(long)]
    image: Option<String>,

    /// Audio file or URL
    #[arg(long)]
    audio: Option<String>,

    /// Template parameter as key=value (repeatable)
    #[arg(long = "param", value_parser = parse_param)]
    params: Vec<(String, serde_json::Value)>,

    /// Variation to run (repeatable; default: all of the flow's variations)
    #[arg(long = "variation")]
    variations: Vec<String>,

    /// Directory for generated assets (default: from config)
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Print generation events to stderr as JSON lines
    #[arg(long)]
    events: bool,
  },

  /// Serve the HTTP API
  Serve {
    /// Address to bind (default: from config)
    #[arg(long)]
    bind: Option<String>,
  },

  /// List available flows
  Flows,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .with_writer(std::io::stderr)
    .init();

  let cli = Cli::parse();

  let data_dir = match cli.data_dir {
    Some(dir) => dir,
    None => default_data_dir().context("could not determine home directory")?,
  };

  match cli.command {
    Some(Commands::Run {
      flow,
      image,
      audio,
      params,
      variations,
      output_dir,
      events,
    }) => {
      let config = load_config(cli.config.as_deref(), &data_dir)?;
      let output_dir = output_dir.unwrap_or_else(|| config.output_dir_or(&data_dir));
      let args = RunArgs {
        flow: flow.parse()?,
        image,
        audio,
        params: params.into_iter().collect(),
        variations,
        output_dir,
        events,
      };
      let rt = tokio::runtime::Runtime::new()?;
      rt.block_on(async { run_flow(config, args).await })?;
    }
    Some(Commands::Serve { bind }) => {
      let config = load_config(cli.config.as_deref(), &data_dir)?;
      let rt = tokio::runtime::Runtime::new()?;
      rt.block_on(async { serve(config, bind).await })?;
    }
    Some(Commands::Flows) => {
      for flow in Flow::ALL {
        println!(
          "{:<18} variations: {}  params: {}",
          flow.name(),
          flow.variations().join(", "),
          flow.required_params().join(", ")
        );
      }
    }
    None => {
      println!("artisan - use --help to see available commands");
    }
  }

  Ok(())
}

struct RunArgs {
  flow: Flow,
  image: Option<String>,
  audio: Option<String>,
  params: serde_json::Map<String, serde_json::Value>,
  variations: Vec<String>,
  output_dir: PathBuf,
  events: bool,
}

fn load_config(path: Option<&Path>, data_dir: &Path) -> Result<KitConfig> {
  let config =
    KitConfig::load_or_default(path, data_dir).context("failed to load configuration")?;
  config.validate().context("invalid configuration")?;
  Ok(config)
}

fn poll_config(config: &KitConfig) -> PollConfig {
  PollConfig {
    interval: config.poll.interval(),
    max_attempts: config.poll.max_attempts,
  }
}

fn build_client(config: &KitConfig) -> Result<Arc<dyn GenerationClient>> {
  let client =
    GoogleGenAiClient::from_config(&config.provider).context("failed to create provider client")?;
  Ok(Arc::new(client))
}

/// Cancel `token` on Ctrl-C.
fn cancel_on_ctrl_c(token: CancellationToken) {
  tokio::spawn(async move {
    if tokio::signal::ctrl_c().await.is_ok() {
      eprintln!("Interrupted, cancelling");
      token.cancel();
    }
  });
}

async fn run_flow(config: KitConfig, args: RunArgs) -> Result<()> {
  let client = build_client(&config)?;

  let mut media = MediaPayload::None;
  if let Some(image) = &args.image {
    media = load_media(MediaKind::Image, image).await?;
  }
  if let Some(audio) = &args.audio {
    // Audio-only flows take the audio even when an image is given too.
    if media.is_none() || args.flow.media() == artisan_flows::MediaRequirement::Audio {
      media = load_media(MediaKind::Audio, audio).await?;
    }
  }

  let variations = (!args.variations.is_empty()).then_some(args.variations);
  let request = args.flow.prepare(media, args.params, variations)?;
  eprintln!(
    "Running {} ({}) with {} variation(s)",
    args.flow,
    request.request_id(),
    request.variations().len()
  );

  let cancel = CancellationToken::new();
  cancel_on_ctrl_c(cancel.clone());

  let result = if args.events {
    let (notifier, mut events) = ChannelNotifier::channel();
    let printer = tokio::spawn(async move {
      while let Some(event) = events.recv().await {
        if let Ok(line) = serde_json::to_string(&event) {
          eprintln!("{}", line);
        }
      }
    });
    let orchestrator = Orchestrator::with_notifier(client, poll_config(&config), notifier);
    let result = execute(&orchestrator, args.flow, request, cancel).await;
    drop(orchestrator);
    let _ = printer.await;
    result?
  } else {
    let orchestrator = Orchestrator::new(client, poll_config(&config));
    execute(&orchestrator, args.flow, request, cancel).await?
  };

  for outcome in result.outcomes() {
    match &outcome.error {
      Some(error) => eprintln!("  {:<18} {:?}: {}", outcome.name, outcome.status, error),
      None => eprintln!("  {:<18} {:?}", outcome.name, outcome.status),
    }
  }

  let store = FsStore::new(&args.output_dir);
  let keys = persist_result(&store, &result)
    .await
    .context("failed to write outputs")?;

  info!(count = keys.len(), dir = %args.output_dir.display(), "outputs_written");
  for key in keys {
    println!("{}", args.output_dir.join(key).display());
  }

  Ok(())
}

async fn execute<N: GenerationNotifier>(
  orchestrator: &Orchestrator<N>,
  flow: Flow,
  request: artisan_pipeline::GenerationRequest,
  cancel: CancellationToken,
) -> Result<artisan_pipeline::GenerationResult> {
  flow
    .run(orchestrator, request, cancel)
    .await
    .map_err(|e| match e.details() {
      Some(details) => anyhow::anyhow!("{}: {}", e, details),
      None => anyhow::Error::new(e),
    })
    .with_context(|| format!("{} failed", flow))
}

async fn serve(config: KitConfig, bind: Option<String>) -> Result<()> {
  let client = build_client(&config)?;
  let orchestrator = Orchestrator::new(client, poll_config(&config));

  let shutdown = CancellationToken::new();
  cancel_on_ctrl_c(shutdown.clone());

  let bind = bind.unwrap_or_else(|| config.server.bind.clone());
  let state = AppState::new(Arc::new(orchestrator), shutdown.clone());
  artisan_server::serve(&bind, state, shutdown)
    .await
    .with_context(|| format!("server failed on {}", bind))
}

/// Load media from a local file, or reference it when given a URL.
async fn load_media(kind: MediaKind, source: &str) -> Result<MediaPayload> {
  if ["http://", "https://", "gs://"]
    .iter()
    .any(|scheme| source.starts_with(scheme))
  {
    return Ok(MediaPayload::reference(kind, source, None));
  }

  let path = Path::new(source);
  let data = tokio::fs::read(path)
    .await
    .with_context(|| format!("failed to read {} file: {}", kind, path.display()))?;
  let mime_type = mime_for_path(kind, path)?;
  Ok(MediaPayload::inline(kind, mime_type, data))
}

fn mime_for_path(kind: MediaKind, path: &Path) -> Result<&'static str> {
  let ext = path
    .extension()
    .and_then(|e| e.to_str())
    .map(|e| e.to_ascii_lowercase())
    .unwrap_or_default();

  let mime = match (kind, ext.as_str()) {
    (MediaKind::Image, "png") => "image/png",
    (MediaKind::Image, "jpg" | "jpeg") => "image/jpeg",
    (MediaKind::Image, "webp") => "image/webp",
    (MediaKind::Audio, "webm") => "audio/webm",
    (MediaKind::Audio, "mp3") => "audio/mpeg",
    (MediaKind::Audio, "wav") => "audio/wav",
    (MediaKind::Audio, "ogg") => "audio/ogg",
    (MediaKind::Audio, "m4a") => "audio/mp4",
    _ => bail!("unsupported {} file type: {}", kind, path.display()),
  };
  Ok(mime)
}

/// Parse `key=value`. Values that parse as JSON numbers or booleans keep
/// their type; everything else is a string.
fn parse_param(raw: &str) -> Result<(String, serde_json::Value), String> {
  let (key, value) = raw
    .split_once('=')
    .ok_or_else(|| format!("expected key=value, got '{}'", raw))?;
  let key = key.trim();
  if key.is_empty() {
    return Err(format!("empty parameter name in '{}'", raw));
  }

  let value = match serde_json::from_str::<serde_json::Value>(value) {
    Ok(parsed @ (serde_json::Value::Number(_) | serde_json::Value::Bool(_))) => parsed,
    _ => serde_json::Value::String(value.to_string()),
  };
  Ok((key.to_string(), value))
}
