//! `scout` command: wires configuration, clients and the store into a run.

use std::time::Duration;

use artcrm_core::AppConfig;
use artcrm_db::PgContactStore;
use artcrm_scout::{
    GooglePlacesClient, ModelRouter, NotificationBus, OverpassClient, Scout, ScoutDeps,
    ScoutEvent, ScoutOptions, ScoutRequest, ScoutRunResult, ShutdownSignal,
};

use crate::ScoutArgs;

pub(crate) fn build_request(args: ScoutArgs) -> ScoutRequest {
    ScoutRequest {
        city: args.city,
        country: args.country,
        categories: args.categories,
        radius_km: args.radius_km,
        model: args.model,
        use_primary: !args.no_google,
        use_secondary: !args.no_osm,
        skip_duplicates: !args.update_existing,
    }
}

pub(crate) async fn run_scout(
    pool: sqlx::PgPool,
    config: &AppConfig,
    args: ScoutArgs,
) -> anyhow::Result<()> {
    let request = build_request(args);
    let delay = Duration::from_millis(config.scout_rate_limit_ms);

    let google = GooglePlacesClient::new(
        config.google_maps_api_key.as_deref(),
        config.request_timeout_secs,
        &config.user_agent,
        delay,
    )
    .map_err(|e| anyhow::anyhow!("failed to build Google Places client: {e}"))?;
    let overpass = OverpassClient::new(
        &config.overpass_url,
        config.request_timeout_secs,
        &config.user_agent,
    )
    .map_err(|e| anyhow::anyhow!("failed to build Overpass client: {e}"))?;
    let model = ModelRouter::from_config(config)
        .map_err(|e| anyhow::anyhow!("failed to build model clients: {e}"))?;
    let store = PgContactStore::new(pool);

    let mut bus = NotificationBus::new();
    bus.subscribe("console", |event| {
        if let ScoutEvent::ContactCreated { contact_id, name, source } = event {
            println!("  + #{contact_id} {name} ({source})");
        }
        Ok(())
    });

    let shutdown = ShutdownSignal::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        wait_for_shutdown().await;
        trigger.trigger();
    });

    let scout = Scout::new(
        ScoutDeps {
            primary: &google,
            secondary: &overpass,
            model: &model,
            store: &store,
            bus: &bus,
        },
        ScoutOptions::from_app_config(config),
    )
    .with_shutdown(shutdown);

    let result = scout.run(&request).await?;
    print_summary(&result);
    Ok(())
}

fn print_summary(result: &ScoutRunResult) {
    let stats = &result.stats;
    let sources: Vec<&str> = stats.sources_used.iter().map(|s| s.as_str()).collect();
    println!(
        "scout {}, {}: found {}, inserted {}, merged {}, skipped {}",
        stats.city,
        stats.country,
        stats.total_found,
        stats.total_inserted,
        stats.total_merged,
        stats.total_skipped
    );
    println!("  sources: [{}]", sources.join(", "));
    for (category, count) in &stats.counts_by_category {
        println!("  {category}: {count}");
    }
    if stats.interrupted {
        println!("  interrupted before completion");
    }
    if let Some(path) = &result.results_file {
        println!("  results: {}", path.display());
    }
}

async fn wait_for_shutdown() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal; finishing the current step");
}
