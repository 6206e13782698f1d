//! # Bucket Image Optimizer - Main Entry Point
//!
//! Questo è il punto di ingresso principale dell'applicazione.
//!
//! ## Responsabilità:
//! - Parsing degli argomenti della command line con `clap`
//! - Inizializzazione del sistema di logging con `tracing` (su stderr)
//! - Scelta del backend di storage (R2 dalle variabili d'ambiente o directory locale)
//! - Creazione della configurazione e avvio dell'optimizer
//!
//! ## Flusso di esecuzione:
//! 1. Parsa gli argomenti CLI (prefix, pattern, workers, budget, ...)
//! 2. Configura il logging (INFO o DEBUG a seconda del flag verbose)
//! 3. Apre lo store: `--local <dir>` oppure R2 con `R2_ENDPOINT`,
//!    `R2_ACCESS_KEY_ID`, `R2_SECRET_ACCESS_KEY`, `R2_BUCKET_NAME`
//! 4. Con `--list` mostra solo i candidati, altrimenti esegue il run completo
//!
//! ## Esempio di utilizzo:
//! ```bash
//! bucket-optimizer --prefix uiprompt/themes/ --workers 8 --max-size 0.5
//! bucket-optimizer --local ./bucket --target avif --yes --json
//! ```

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use bucket_image_optimizer::{
    confirm::{AutoApprove, Confirm, ConsolePrompt},
    progress::ProgressManager,
    report::candidate_table,
    store::{LocalStore, S3Store, StoreHandle},
    BucketOptimizer, Codec, Config, EncodingBudget, QualityLadder, TargetPolicy,
};

#[derive(Parser)]
#[command(name = "bucket-optimizer")]
#[command(about = "Download, recompress and re-upload images from an S3-compatible bucket")]
struct Args {
    /// Key prefix to scan
    #[arg(long, default_value = "uiprompt/themes/")]
    prefix: String,

    /// Custom regex for matching keys (replaces the default <prefix>*/<image file> rule)
    #[arg(long)]
    pattern: Option<String>,

    /// Number of parallel workers
    #[arg(short, long, default_value = "5")]
    workers: usize,

    /// Maximum width in pixels
    #[arg(long, default_value = "1200")]
    max_width: u32,

    /// Maximum file size in MB
    #[arg(long, default_value = "1.0")]
    max_size: f64,

    /// JPEG starting quality (1-100)
    #[arg(long, default_value = "85")]
    jpeg_quality: u8,

    /// JPEG quality floor
    #[arg(long, default_value = "40")]
    jpeg_floor: u8,

    /// WebP starting quality (1-100)
    #[arg(long, default_value = "85")]
    webp_quality: u8,

    /// WebP quality floor
    #[arg(long, default_value = "40")]
    webp_floor: u8,

    /// AVIF starting quality (1-100)
    #[arg(long, default_value = "75")]
    avif_quality: u8,

    /// AVIF quality floor
    #[arg(long, default_value = "30")]
    avif_floor: u8,

    /// Quality decrement between attempts
    #[arg(long, default_value = "10")]
    quality_step: u8,

    /// Rewrite every image into one codec (png, jpeg, webp, gif, avif)
    #[arg(long)]
    target: Option<Codec>,

    /// Size threshold (commit only if new size < original * threshold)
    #[arg(short, long, default_value = "0.95")]
    threshold: f64,

    /// Process without writing or deleting anything
    #[arg(long)]
    dry_run: bool,

    /// Only list the files that would be processed
    #[arg(long)]
    list: bool,

    /// Approve processing and deletion without asking
    #[arg(short, long)]
    yes: bool,

    /// Emit JSON events on stdout (requires --yes)
    #[arg(long)]
    json: bool,

    /// Use a local directory as the bucket instead of R2
    #[arg(long)]
    local: Option<PathBuf>,

    /// S3-compatible endpoint URL
    #[arg(long, env = "R2_ENDPOINT", hide_env_values = true)]
    endpoint: Option<String>,

    /// Access key id
    #[arg(long, env = "R2_ACCESS_KEY_ID", hide_env_values = true)]
    access_key_id: Option<String>,

    /// Secret access key
    #[arg(long, env = "R2_SECRET_ACCESS_KEY", hide_env_values = true)]
    secret_access_key: Option<String>,

    /// Bucket name
    #[arg(long, env = "R2_BUCKET_NAME")]
    bucket: Option<String>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn config(&self) -> Config {
        let budget = EncodingBudget {
            max_width_px: self.max_width,
            max_size_mb: self.max_size,
            jpeg: QualityLadder::new(self.jpeg_quality, self.jpeg_floor, self.quality_step),
            webp: QualityLadder::new(self.webp_quality, self.webp_floor, self.quality_step),
            avif: QualityLadder::new(self.avif_quality, self.avif_floor, self.quality_step),
            ..Default::default()
        };
        Config {
            prefix: self.prefix.clone(),
            pattern: self.pattern.clone(),
            workers: self.workers,
            budget,
            target: self.target.map(TargetPolicy::Normalize).unwrap_or_default(),
            size_threshold: self.threshold,
            dry_run: self.dry_run,
            json_output: self.json,
            show_progress: !self.json,
        }
    }

    fn open_store(&self) -> Result<StoreHandle> {
        if let Some(ref root) = self.local {
            let store = LocalStore::new(root)?;
            info!("Using local directory {} as bucket", root.display());
            return Ok(Arc::new(store));
        }

        match (&self.endpoint, &self.access_key_id, &self.secret_access_key, &self.bucket) {
            (Some(endpoint), Some(key_id), Some(secret), Some(bucket)) => {
                info!("Using bucket {} at {}", bucket, endpoint);
                Ok(Arc::new(S3Store::new(bucket, endpoint, key_id, secret)))
            }
            _ => Err(anyhow::anyhow!(
                "Missing required environment variables. Please set R2_ENDPOINT, R2_ACCESS_KEY_ID, \
                 R2_SECRET_ACCESS_KEY, and R2_BUCKET_NAME (or use --local <dir>)"
            )),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging; stdout is reserved for tables and JSON events
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(if args.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        })
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    if args.json && !args.yes && !args.list {
        return Err(anyhow::anyhow!("--json cannot prompt for confirmation, pass --yes as well"));
    }

    let store = args.open_store()?;
    let optimizer = BucketOptimizer::new(args.config(), store)?;

    if args.list {
        info!("Listing files that would be processed");
        let spinner = ProgressManager::spinner("Listing bucket...");
        let objects = optimizer.discover().await?;
        spinner.finish_and_clear();

        println!("{}", candidate_table(&objects).render());
        println!("\nList mode: no files were processed");
        return Ok(());
    }

    let confirm: Box<dyn Confirm> = if args.yes {
        Box::new(AutoApprove)
    } else {
        Box::new(ConsolePrompt)
    };
    optimizer.run(confirm.as_ref()).await?;

    Ok(())
}
