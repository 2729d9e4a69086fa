use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use engine_logging::{engine_info, engine_warn, LogDestination};
use log::LevelFilter;
use scanner_core::ScanConfig;
use scanner_engine::{HttpCardProvider, MemoryCardProvider, ProviderRegistry, ProviderSettings};

/// CLI entry point
#[derive(Parser, Debug)]
#[command(name = "like-scanner")]
#[command(about = "Resumable threshold scanner for profile media cards")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[command(flatten)]
    pub scan: ScanArgs,

    /// Where log output goes: terminal, file or both
    #[arg(long, env = "SCANNER_LOG", default_value_t = LogDestination::Terminal, global = true)]
    pub log: LogDestination,

    #[arg(long, env = "SCANNER_LOG_LEVEL", default_value_t = LevelFilter::Info, global = true)]
    pub log_level: LevelFilter,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Serve the continue-scan HTTP API
    Serve(ServeArgs),
    /// Scan one profile from the command line, checkpointing as it goes
    Scan(RunArgs),
}

/// Settings shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct ScanArgs {
    /// Minimum metric (saves/likes) for a card to count as a hit
    #[arg(long, env = "LIKES_THRESHOLD", default_value_t = 20, global = true)]
    pub threshold: u64,

    /// Consecutive misses after which a scan reports no_hits_after_limit
    #[arg(long, env = "MAX_FAILS", default_value_t = 20, global = true)]
    pub max_failures: u32,

    /// Base URL of the savee card provider
    #[arg(long, env = "SAVEE_PROVIDER_URL", global = true)]
    pub savee_provider_url: Option<String>,

    /// Base URL of the cosmos card provider
    #[arg(long, env = "COSMOS_PROVIDER_URL", global = true)]
    pub cosmos_provider_url: Option<String>,

    /// Per-request timeout for provider calls, in seconds
    #[arg(long, env = "PROVIDER_TIMEOUT_SECS", default_value_t = 30, global = true)]
    pub provider_timeout_secs: u64,
}

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    /// Address the HTTP API listens on
    #[arg(long, env = "SCANNER_BIND", default_value = "0.0.0.0:8000")]
    pub bind: SocketAddr,
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Platform whose provider serves the profile (savee, cosmos, ...)
    #[arg(long)]
    pub platform: String,

    /// Profile reference passed through to the provider
    #[arg(long)]
    pub profile: String,

    /// Index to start from when no checkpoint exists yet
    #[arg(long, default_value_t = 0)]
    pub start_index: u64,

    /// Checkpoint file; defaults to .scanner/<platform>_<profile>.ron
    #[arg(long, env = "SCANNER_CHECKPOINT")]
    pub checkpoint: Option<PathBuf>,

    /// Stop once the checkpoint has recorded this many hits today
    #[arg(long, env = "DAILY_IMAGE_LIMIT", default_value_t = 400)]
    pub daily_hit_limit: u64,

    /// Stop after evaluating this many positions
    #[arg(long)]
    pub max_steps: Option<u64>,

    /// Start a new logical session: carried-over failures are reset
    #[arg(long, default_value_t = false)]
    pub new_session: bool,

    /// Serve the platform from these in-memory metrics instead of a provider
    #[arg(long, value_delimiter = ',')]
    pub demo_metrics: Vec<u64>,
}

impl ScanArgs {
    pub fn scan_config(&self) -> anyhow::Result<ScanConfig> {
        ScanConfig::new(self.threshold, self.max_failures)
            .context("invalid scan configuration (LIKES_THRESHOLD / MAX_FAILS)")
    }

    pub fn provider_settings(&self) -> ProviderSettings {
        ProviderSettings {
            request_timeout: Duration::from_secs(self.provider_timeout_secs),
            ..ProviderSettings::default()
        }
    }

    /// Registry with one HTTP provider per configured platform URL.
    pub fn build_registry(&self) -> anyhow::Result<ProviderRegistry> {
        let mut registry = ProviderRegistry::new();
        let platforms = [
            ("savee", self.savee_provider_url.as_deref()),
            ("cosmos", self.cosmos_provider_url.as_deref()),
        ];
        for (platform, base_url) in platforms {
            let Some(base_url) = base_url else {
                continue;
            };
            let provider = HttpCardProvider::new(base_url, self.provider_settings())
                .with_context(|| format!("invalid {platform} provider url '{base_url}'"))?;
            registry.register(platform, Arc::new(provider));
        }
        Ok(registry)
    }

    pub fn log_effective(&self, config: &ScanConfig) {
        engine_info!("Like-Scanner configuration:");
        engine_info!("  threshold          = {}", config.threshold());
        engine_info!("  max_failures       = {}", config.max_failures());
        engine_info!("  provider_timeout   = {}s", self.provider_timeout_secs);
        engine_info!(
            "  savee_provider     = {}",
            self.savee_provider_url.as_deref().unwrap_or("-")
        );
        engine_info!(
            "  cosmos_provider    = {}",
            self.cosmos_provider_url.as_deref().unwrap_or("-")
        );
        if self.savee_provider_url.is_none() && self.cosmos_provider_url.is_none() {
            engine_warn!("No provider URLs configured; only demo metrics can be scanned");
        }
    }
}

impl RunArgs {
    pub fn checkpoint_path(&self) -> PathBuf {
        self.checkpoint.clone().unwrap_or_else(|| {
            PathBuf::from(".scanner").join(format!(
                "{}_{}.ron",
                sanitize(&self.platform),
                sanitize(&self.profile)
            ))
        })
    }

    /// Registry for this run; demo metrics replace the platform's provider.
    pub fn registry(&self, scan: &ScanArgs) -> anyhow::Result<ProviderRegistry> {
        let registry = scan.build_registry()?;
        if self.demo_metrics.is_empty() {
            return Ok(registry);
        }
        let demo = MemoryCardProvider::new().with_metrics(&self.profile, &self.demo_metrics);
        Ok(registry.with(self.platform.clone(), Arc::new(demo)))
    }
}

fn sanitize(raw: &str) -> String {
    raw.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
        .collect()
}
