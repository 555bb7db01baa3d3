/// Model Fetch - command-line entry point.
///
/// Downloads a catalog model or an arbitrary `<repo>/<file>` from the hub,
/// resuming partial downloads. Exit codes: 0 success, 130 interrupted, 1 error.
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{ArgGroup, Parser};
use tracing::{info, warn};

use modelfetch::checksum::digest_matches;
use modelfetch::config::{self, DownloaderConfig};
use modelfetch::{HashAlgorithm, JsonLineProgress, ModelDownloader};
use modelfetch_shared::catalog;
use modelfetch_shared::errors::FetchError;
use modelfetch_shared::models::DownloadTarget;

const RULE_WIDTH: usize = 60;

#[derive(Parser, Debug)]
#[command(
    name = "modelfetch",
    version,
    about = "Download GGUF models from Hugging Face with resume support",
    after_help = "Examples:\n  \
        modelfetch --model floppa-12b-q4 --output-dir ~/Models\n  \
        modelfetch --list-models\n  \
        modelfetch --repo-id user/repo --filename model.gguf --output-dir ~/Models --verify"
)]
#[command(group(
    ArgGroup::new("source")
        .required(true)
        .args(["model", "repo_id", "list_models"])
))]
struct Cli {
    /// Catalog model to download (see --list-models)
    #[arg(long)]
    model: Option<String>,

    /// List available catalog models
    #[arg(long)]
    list_models: bool,

    /// Output directory [default: $MODELFETCH_OUTPUT_DIR or ~/Models]
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Always start from zero, discarding any partial download
    #[arg(long)]
    no_resume: bool,

    /// Check the file and print its checksum after downloading
    #[arg(long)]
    verify: bool,

    /// Emit progress as JSON lines on stdout
    #[arg(long)]
    json: bool,

    /// Custom Hugging Face repository id
    #[arg(long, requires = "filename")]
    repo_id: Option<String>,

    /// File inside the custom repository
    #[arg(long, requires = "repo_id")]
    filename: Option<String>,

    /// Digest used by --verify (md5, sha224, sha256, sha384, sha512)
    #[arg(long, default_value = "md5")]
    checksum: HashAlgorithm,

    /// Known digest to compare against (implies --verify)
    #[arg(long)]
    expected_checksum: Option<String>,

    /// Hub base URL [default: $MODELFETCH_HUB_URL or https://huggingface.co]
    #[arg(long)]
    hub_url: Option<String>,
}

enum Outcome {
    Done,
    Interrupted,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Load .env file
    dotenvy::dotenv().ok();

    // Logs go to stderr; stdout carries progress
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "modelfetch=info,modelfetch_shared=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(&cli).await {
        Ok(Outcome::Done) => ExitCode::SUCCESS,
        Ok(Outcome::Interrupted) => ExitCode::from(130),
        Err(e) => {
            eprintln!("\n✗ Error: {:#}", e);
            if e
                .downcast_ref::<FetchError>()
                .is_some_and(FetchError::is_resumable)
            {
                eprintln!("Partial download kept; run again to resume");
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli) -> anyhow::Result<Outcome> {
    if cli.list_models {
        list_models(cli.json)?;
        return Ok(Outcome::Done);
    }

    let target = resolve_target(cli)?;
    let output_dir = cli
        .output_dir
        .clone()
        .unwrap_or_else(config::default_output_dir);

    let mut config = DownloaderConfig::from_env();
    if let Some(hub_url) = &cli.hub_url {
        config = config.with_hub_url(hub_url.clone());
    }

    let downloader = ModelDownloader::new(target, &output_dir, config)
        .with_context(|| format!("Failed to prepare {}", output_dir.display()))?;
    let mut downloader = if cli.json {
        downloader.with_progress(JsonLineProgress::stdout())
    } else {
        downloader
    };

    if !cli.json {
        println!("Downloading: {}", downloader.target().display_name);
        println!("Output directory: {}", output_dir.display());
        println!("Repository: {}", downloader.target().repo_id);
        println!("{}", "-".repeat(RULE_WIDTH));
    }
    info!("Fetching {}", downloader.url());

    let temp_path = downloader.temp_path().to_path_buf();
    tokio::select! {
        result = fetch(&mut downloader, cli) => {
            result?;
            Ok(Outcome::Done)
        }
        _ = tokio::signal::ctrl_c() => {
            report_interrupt(&temp_path);
            Ok(Outcome::Interrupted)
        }
    }
}

fn resolve_target(cli: &Cli) -> Result<DownloadTarget, FetchError> {
    match (&cli.model, &cli.repo_id, &cli.filename) {
        (Some(key), _, _) => catalog::lookup(key),
        (None, Some(repo_id), Some(filename)) => {
            Ok(DownloadTarget::custom(repo_id.clone(), filename.clone()))
        }
        _ => Err(FetchError::Config(
            "Must specify --model or both --repo-id and --filename".into(),
        )),
    }
}

async fn fetch(downloader: &mut ModelDownloader, cli: &Cli) -> Result<(), FetchError> {
    let path = downloader.download(!cli.no_resume).await?;

    if !cli.json {
        println!("\n{}", "-".repeat(RULE_WIDTH));
        println!("✓ Download complete: {}", path.display());
    }

    if !(cli.verify || cli.expected_checksum.is_some()) {
        return Ok(());
    }

    if !cli.json {
        println!("\nVerifying download...");
    }
    if !downloader.verify(None).await {
        return Err(FetchError::Verification(format!(
            "{} is missing or empty",
            path.display()
        )));
    }

    let digest = downloader.checksum(cli.checksum).await?;
    if cli.json {
        let line = serde_json::json!({
            "algorithm": cli.checksum.as_str(),
            "checksum": digest,
            "path": path.display().to_string(),
        });
        println!("{}", line);
    } else {
        println!("{}: {}", cli.checksum.as_str().to_uppercase(), digest);
    }

    if let Some(expected) = &cli.expected_checksum {
        if !digest_matches(&digest, expected) {
            warn!("Checksum mismatch for {}", path.display());
            return Err(FetchError::Verification(format!(
                "{} mismatch: expected {}, got {}",
                cli.checksum, expected, digest
            )));
        }
        if !cli.json {
            println!("Checksum matches expected value");
        }
    }

    Ok(())
}

fn list_models(json: bool) -> Result<(), FetchError> {
    let models = catalog::list();

    if json {
        let mut map = serde_json::Map::new();
        for (key, target) in models {
            map.insert(key.to_string(), serde_json::to_value(target)?);
        }
        println!("{}", serde_json::to_string_pretty(&map)?);
        return Ok(());
    }

    println!("Available Models:");
    println!("{}", "=".repeat(RULE_WIDTH));
    for (key, target) in models {
        println!("\n{}:", key);
        println!("  Name: {}", target.display_name);
        println!("  Size: {:.2} GB", target.size_gb);
        println!("  Quantization: {}", target.quantization);
    }
    Ok(())
}

fn report_interrupt(temp_path: &Path) {
    eprintln!("\n\nDownload interrupted by user");
    if temp_path.exists() {
        eprintln!("Partial download saved to: {}", temp_path.display());
        eprintln!("Run again to continue");
    }
}
