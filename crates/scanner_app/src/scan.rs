//! `like-scanner scan`: walk one profile from the command line.
//!
//! Progress is checkpointed after every card, so Ctrl-C (or any crash) only
//! pauses the scan; running the same command again resumes it.

use anyhow::Context;
use engine_logging::{engine_info, engine_warn};
use scanner_core::ScanConfig;
use scanner_engine::{
    CheckpointStore, HitRecord, RunLimits, RunStop, RunSummary, ScanRunner, SessionCoordinator,
};
use tokio_util::sync::CancellationToken;

use crate::cli::{RunArgs, ScanArgs};

pub async fn run(args: RunArgs, scan: &ScanArgs, config: ScanConfig) -> anyhow::Result<()> {
    let registry = args.registry(scan)?;
    let provider = registry.get(&args.platform).with_context(|| {
        format!(
            "no card provider configured for platform '{}' (set {}_PROVIDER_URL or pass --demo-metrics)",
            args.platform,
            args.platform.to_ascii_uppercase()
        )
    })?;

    let store = CheckpointStore::new(args.checkpoint_path())
        .context("invalid checkpoint path")?;
    engine_info!("Checkpoint file: {:?}", store.path());

    let cancel = CancellationToken::new();
    spawn_ctrl_c(cancel.clone());

    let runner = ScanRunner::new(SessionCoordinator::new(provider, config))
        .with_store(store)
        .with_limits(RunLimits {
            daily_hits: Some(args.daily_hit_limit),
            max_steps: args.max_steps,
        })
        .with_cancellation(cancel)
        .new_session(args.new_session);

    let summary = runner
        .run(&args.platform, &args.profile, args.start_index)
        .await
        .context("scan run failed")?;
    report(&summary)
}

fn spawn_ctrl_c(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            engine_info!("Interrupt received; pausing scan");
            cancel.cancel();
        }
    });
}

fn report(summary: &RunSummary) -> anyhow::Result<()> {
    for card in &summary.hits {
        let line = serde_json::to_string(&HitRecord::from(card))?;
        println!("{line}");
    }
    engine_info!(
        "Run finished: {:?}; {} positions evaluated, {} hits this run, {} today, {} total; resume at index {}",
        summary.stop,
        summary.steps,
        summary.hits.len(),
        summary.checkpoint.hits_today,
        summary.checkpoint.hits,
        summary.checkpoint.next_index
    );
    match &summary.stop {
        RunStop::ProviderFailure(reason) => {
            engine_warn!("Provider failure: {}", reason);
            anyhow::bail!(
                "provider failure ({reason}); rerun to retry index {}",
                summary.checkpoint.next_index
            )
        }
        _ => Ok(()),
    }
}
