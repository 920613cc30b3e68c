mod display;
mod error;
mod server;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use intentmux_ai::{ArtifactPaths, Engine};
use intentmux_core::ResolverConfig;
use intentmux_core::config::{DEFAULT_MAX_LEN, DEFAULT_SIMILARITY_FLOOR, DEFAULT_STRONG_MATCH};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "intentmux", version, about = "Hybrid intent resolution engine")]
struct Cli {
    /// Emit logs as JSON lines.
    #[arg(long, global = true, env = "INTENTMUX_LOG_JSON")]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve /predict, /chat and /health over HTTP.
    Serve {
        #[command(flatten)]
        artifacts: ArtifactArgs,

        #[arg(long, env = "INTENTMUX_BIND", default_value = "127.0.0.1:5000")]
        bind: SocketAddr,

        /// Per-request resolution deadline.
        #[arg(long, env = "INTENTMUX_TIMEOUT_MS", default_value_t = 2000)]
        timeout_ms: u64,
    },
    /// Resolve one utterance and print the result.
    Classify {
        #[command(flatten)]
        artifacts: ArtifactArgs,

        text: String,

        /// Show both path outcomes and the arbitration rule.
        #[arg(long)]
        explain: bool,
    },
    /// Load the artifacts and print what was found.
    Check {
        #[command(flatten)]
        artifacts: ArtifactArgs,
    },
}

#[derive(Args)]
struct ArtifactArgs {
    /// Directory holding the artifacts under their conventional names.
    #[arg(long, env = "INTENTMUX_ARTIFACTS_DIR", default_value = "model-train")]
    artifacts_dir: PathBuf,

    #[arg(long, env = "INTENTMUX_MODEL")]
    model: Option<PathBuf>,

    #[arg(long, env = "INTENTMUX_TOKENIZER")]
    tokenizer: Option<PathBuf>,

    #[arg(long, env = "INTENTMUX_ENCODER")]
    encoder: Option<PathBuf>,

    #[arg(long, env = "INTENTMUX_CORPUS")]
    corpus: Option<PathBuf>,

    #[arg(long, env = "INTENTMUX_MAX_LEN", default_value_t = DEFAULT_MAX_LEN)]
    max_len: usize,

    #[arg(long, env = "INTENTMUX_SIMILARITY_FLOOR", default_value_t = DEFAULT_SIMILARITY_FLOOR)]
    similarity_floor: f32,

    #[arg(long, env = "INTENTMUX_STRONG_MATCH", default_value_t = DEFAULT_STRONG_MATCH)]
    strong_match: f32,

    /// Serve even when the label encoder and classifier disagree on class count.
    #[arg(long, env = "INTENTMUX_ALLOW_LABEL_MISMATCH")]
    allow_label_mismatch: bool,
}

impl ArtifactArgs {
    fn paths(&self) -> ArtifactPaths {
        let defaults = ArtifactPaths::in_dir(&self.artifacts_dir);
        ArtifactPaths {
            model: self.model.clone().unwrap_or(defaults.model),
            tokenizer: self.tokenizer.clone().unwrap_or(defaults.tokenizer),
            encoder: self.encoder.clone().unwrap_or(defaults.encoder),
            corpus: self.corpus.clone().unwrap_or(defaults.corpus),
        }
    }

    fn config(&self) -> ResolverConfig {
        ResolverConfig {
            max_len: self.max_len,
            similarity_floor: self.similarity_floor,
            strong_match: self.strong_match,
            strict_labels: !self.allow_label_mismatch,
            ..ResolverConfig::default()
        }
    }

    fn load(&self) -> anyhow::Result<Engine> {
        let paths = self.paths();
        let start = Instant::now();
        let engine = intentmux_ai::load(&paths, self.config())
            .with_context(|| format!("loading artifacts from {}", self.artifacts_dir.display()))?;
        tracing::info!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            "artifacts loaded"
        );
        Ok(engine)
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);
    tracing::info!("intentmux v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::Serve {
            artifacts,
            bind,
            timeout_ms,
        } => {
            let engine = artifacts.load()?;
            server::serve(engine, bind, Duration::from_millis(timeout_ms)).await
        }
        Command::Classify {
            artifacts,
            text,
            explain,
        } => {
            anyhow::ensure!(!intentmux_core::text::is_blank(&text), "text must not be empty");
            let engine = artifacts.load()?;
            if explain {
                display::print_explanation(&text, &engine.explain(&text));
            } else {
                display::print_resolution(&text, &engine.resolve(&text));
            }
            Ok(())
        }
        Command::Check { artifacts } => {
            let engine = artifacts.load()?;
            display::print_report(engine.report());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn overrides_replace_conventional_paths() {
        let cli = Cli::parse_from([
            "intentmux",
            "check",
            "--artifacts-dir",
            "/srv/artifacts",
            "--encoder",
            "/tmp/labels.json",
        ]);
        let Command::Check { artifacts } = cli.command else {
            panic!("expected check");
        };
        let paths = artifacts.paths();
        assert_eq!(paths.encoder, PathBuf::from("/tmp/labels.json"));
        assert_eq!(paths.model, PathBuf::from("/srv/artifacts/intent_model.onnx"));
    }

    #[test]
    fn defaults_match_resolver_config() {
        let cli = Cli::parse_from(["intentmux", "classify", "hello", "--explain"]);
        let Command::Classify {
            artifacts,
            text,
            explain,
        } = cli.command
        else {
            panic!("expected classify");
        };
        assert_eq!(text, "hello");
        assert!(explain);
        assert_eq!(artifacts.config(), ResolverConfig::default());
    }

    #[test]
    fn allow_label_mismatch_relaxes_strictness() {
        let cli = Cli::parse_from(["intentmux", "check", "--allow-label-mismatch"]);
        let Command::Check { artifacts } = cli.command else {
            panic!("expected check");
        };
        assert!(!artifacts.config().strict_labels);
    }
}
