use market_watch::config::{Config, SourceKind};
use market_watch::notifier::{self, WebhookNotifier};
use market_watch::sources::{CsvExportSource, ListingPageSource, SnapshotSource};
use market_watch::watch_core::WatchEngine;
use std::time::Duration;

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();

    // Logs to stderr; level via RUST_LOG, default info
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("❌ {}", e);
            std::process::exit(1);
        }
    };

    log::info!("🚀 Starting market watch");
    log::info!("📊 Configuration:");
    match config.source {
        SourceKind::Csv => log::info!("   Source: CSV export at {}", config.data_path),
        SourceKind::Listing => log::info!(
            "   Source: listing page {} ({}, {} page(s))",
            config.listing.base_url,
            config.listing.platform,
            config.listing.pages
        ),
    }
    log::info!(
        "   Poll interval: {}s | cooldown: {}min",
        config.poll_interval_secs,
        config.cooldown_minutes
    );
    log::info!(
        "   Thresholds: discount {:.0}% (z {:.1}) | fake drop {:.0}% | spike {:.0}%",
        config.min_discount * 100.0,
        config.zscore_min,
        config.fake_drop_pct * 100.0,
        config.spike_pct * 100.0
    );

    let mut source: Box<dyn SnapshotSource> = match config.source {
        SourceKind::Csv => Box::new(CsvExportSource::new(&config.data_path)),
        SourceKind::Listing => Box::new(ListingPageSource::new(config.listing.clone())),
    };
    let mut engine = WatchEngine::new(&config);
    let webhook = WebhookNotifier::new(config.webhook_url.clone());

    let mut timer = tokio::time::interval(Duration::from_secs(config.poll_interval_secs));

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                log::info!("🛑 Interrupt received, shutting down");
                break;
            }
            _ = timer.tick() => {
                run_cycle(source.as_mut(), &mut engine, &webhook, config.notify_webhook).await;
            }
        }
    }
}

/// One poll cycle: acquire, detect, deliver. Nothing in here is fatal; the
/// loop must survive indefinitely short of an explicit interrupt.
async fn run_cycle(
    source: &mut dyn SnapshotSource,
    engine: &mut WatchEngine,
    webhook: &WebhookNotifier,
    notify: bool,
) {
    let snapshots = source.poll().await;
    if snapshots.is_empty() {
        return;
    }
    log::info!("📥 {} snapshots read, running detectors", snapshots.len());

    let alerts = engine.process_batch(snapshots);
    for alert in alerts {
        let content = notifier::format_alert(&alert.snapshot, &alert.detection);
        if notify {
            match webhook.send(&content).await {
                Ok(()) => log::info!("✅ Alert delivered"),
                Err(e) => log::warn!("⚠️  Webhook delivery failed: {}", e),
            }
        } else {
            log::info!("[ALERT] {}", content.replace('\n', " | "));
        }
    }
}
