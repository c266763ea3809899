use anyhow::{anyhow, Context, Result};
use split_aggr::clock::SystemClock;
use split_aggr::config::AppConfig;
use split_aggr::control::AdmissionControl;
use split_aggr::oracle::HttpPriceOracle;
use split_aggr::router::router::create_api_router;
use split_aggr::router::Router;
use split_aggr::venues::{HttpVenue, VenueAdapter, VenueId, VenueInfo};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing().context("initialize tracing subscriber")?;

    if let Err(err) = run().await {
        tracing::error!(error = ?err, "fatal aggregator error");
        std::process::exit(1);
    }
    Ok(())
}

async fn run() -> Result<()> {
    let config = AppConfig::load().context("load configuration from environment")?;
    let engine = config.engine.clone();

    let mut router = Router::new(engine.clone(), Arc::new(SystemClock))
        .with_admission(AdmissionControl::new(config.max_inflight, config.rate_per_sec));

    if let Some(endpoint) = &config.oracle_endpoint {
        let oracle = HttpPriceOracle::new(endpoint.clone(), engine.quote_timeout())
            .with_context(|| format!("initialize price oracle {endpoint}"))?;
        router = router.with_oracle(Arc::new(oracle));
        info!(endpoint = %endpoint, "price oracle fallback enabled");
    } else {
        warn!("oracle endpoint not provided; unknown price impact treated as zero");
    }
    let router = Arc::new(router);

    for venue in &config.venues {
        let id = VenueId::new(venue.id.clone());
        let adapter = HttpVenue::new(
            id.clone(),
            venue.endpoint.clone(),
            engine.default_gas_estimate,
            engine.quote_timeout(),
        )
        .with_context(|| format!("initialize venue {}", venue.id))?;
        let mut info = VenueInfo::new(id, Arc::new(adapter) as Arc<dyn VenueAdapter>)
            .with_fee_tiers(venue.fee_tiers.clone());
        info.enabled = venue.enabled;
        router.register_venue(info).await;
    }
    if config.venues.is_empty() {
        warn!("no venues configured; quotes will be empty until venues are registered");
    }

    let app = App { config, router };
    app.run().await
}

struct App {
    config: AppConfig,
    router: Arc<Router>,
}

impl App {
    async fn run(self) -> Result<()> {
        info!(
            address = %self.config.listen_addr,
            venues = self.config.venues.len(),
            max_splits = self.config.engine.max_splits,
            fee_bps = self.config.engine.platform_fee_bps,
            "split aggregator online"
        );

        let listener = tokio::net::TcpListener::bind(self.config.listen_addr)
            .await
            .with_context(|| format!("bind API server address {}", self.config.listen_addr))?;
        let api_router = create_api_router(self.router.clone());
        info!(address = %self.config.listen_addr, "HTTP API server starting");
        let _api_handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, api_router).await {
                warn!(error = %e, "API server error");
            }
        });

        let mut ticker = tokio::time::interval(Duration::from_secs(30));
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let stats = self.router.stats().await;
                    info!(
                        swaps = stats.swaps.swap_count,
                        volume = %stats.swaps.cumulative_volume,
                        gas_saved = stats.swaps.cumulative_gas_saved,
                        quotes = stats.quotes_served,
                        routes = stats.execution.total_routes,
                        routes_failed = stats.execution.failed_routes,
                        success_rate = stats.execution.success_rate,
                        "split aggregator heartbeat"
                    );
                    for venue in &stats.open_breakers {
                        debug!(venue = %venue, "venue circuit open");
                    }
                }
                res = tokio::signal::ctrl_c() => {
                    if let Err(err) = res {
                        warn!(error = %err, "ctrl_c listener error");
                    }
                    info!("Shutdown signal received, exiting");
                    break;
                }
            }
        }
        Ok(())
    }
}

fn init_tracing() -> Result<()> {
    let env_filter =
        std::env::var("RUST_LOG").unwrap_or_else(|_| "info,hyper=warn,reqwest=warn".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(env_filter))
        .with_target(false)
        .try_init()
        .map_err(|err| anyhow!("tracing subscriber init: {err}"))
}
