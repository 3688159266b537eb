use mintforge::api::{ApiServer, AppState};
use mintforge::config::Settings;
use mintforge::error::Result;
use mintforge::monitoring::log_utils::prune_logs;
use mintforge::monitoring::{
    check_fee_payer, init_logging, install_metrics_exporter, run_periodic_health_checks,
    ComponentStatus,
};
use mintforge::{
    ChainClient, DeploymentOrchestrator, HttpMetadataPublisher, InMemoryMetadataPublisher,
    MetadataPublisher, ProvisionerRegistry, RpcChainClient,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

const HEALTH_CHECK_INTERVAL: Duration = Duration::from_secs(300);

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration (reads .env first)
    let settings = Settings::from_env()?;

    // Initialize logging
    let _guard = init_logging(&settings.log_dir, "debug", &settings.log_level)?;
    match prune_logs(&settings.log_dir, settings.log_retention) {
        Ok(0) => {}
        Ok(removed) => info!(removed = removed, "Pruned old log files"),
        Err(e) => warn!(error = %e, "Failed to prune log directory"),
    }

    let main_span = tracing::info_span!("main_execution");
    let _main_span_guard = main_span.enter();

    info!("Starting mintforge token launch service...");
    info!(
        network = %settings.network,
        rpc_url = %settings.rpc_url()?,
        simulation_mode = settings.simulation_mode,
        "Configuration loaded successfully"
    );

    if let Some(addr) = &settings.metrics_bind_address {
        install_metrics_exporter(addr)?;
    }

    // Initialize components
    let chain: Arc<dyn ChainClient> = Arc::new(RpcChainClient::from_settings(&settings)?);

    let metadata: Arc<dyn MetadataPublisher> = match &settings.metadata_endpoint {
        Some(endpoint) => Arc::new(HttpMetadataPublisher::new(
            endpoint,
            settings.metadata_public_base.as_deref(),
            settings.step_timeout(),
        )?),
        None => {
            warn!("METADATA_ENDPOINT not set, metadata is kept in memory only");
            Arc::new(InMemoryMetadataPublisher::new())
        }
    };

    let orchestrator = Arc::new(DeploymentOrchestrator::new(
        chain.clone(),
        metadata,
        ProvisionerRegistry::with_defaults(chain.clone()),
        settings.orchestrator_config(),
    ));

    let health = check_fee_payer(chain.as_ref(), settings.min_wallet_balance_lamports).await;
    match &health.status {
        ComponentStatus::Ok => info!(payer = %chain.fee_payer(), "Fee payer ready"),
        ComponentStatus::Warning(msg) => {
            warn!(payer = %chain.fee_payer(), message = %msg, "Fee payer check")
        }
        ComponentStatus::Error(msg) => {
            error!(payer = %chain.fee_payer(), message = %msg, "Fee payer check failed")
        }
    }
    tokio::spawn(run_periodic_health_checks(
        chain.clone(),
        settings.min_wallet_balance_lamports,
        HEALTH_CHECK_INTERVAL,
    ));

    info!("Components initialized successfully");

    let state = Arc::new(AppState::new(orchestrator, settings.max_logo_bytes as usize));
    ApiServer::new(state, settings.bind_address.clone())
        .start()
        .await?;

    info!("mintforge shutting down...");
    Ok(())
}
