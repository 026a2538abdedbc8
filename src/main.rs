//! Campus energy monitor entry point: CLI wiring, simulator startup and the
//! HTTP server or `--watch` client.

use std::path::Path;
use std::process;
use std::sync::Arc;

use chrono::Utc;
use env_logger::Env;
use log::{error, info};

use campus_energy::cli::{self, CliOptions};
use campus_energy::config::{ConfigError, ServiceConfig};
use campus_energy::devices::Reading;
use campus_energy::io::export::export_csv;
use campus_energy::registry::DeviceRegistry;
use campus_energy::sim::engine::Simulator;
use campus_energy::sim::rng::SimRng;

fn load_config(opts: &CliOptions) -> Result<ServiceConfig, ConfigError> {
    // --config takes priority, then --preset (which the parser defaults to campus)
    let mut config = match (&opts.config, &opts.preset) {
        (Some(path), _) => ServiceConfig::from_toml_file(path)?,
        (None, Some(name)) => ServiceConfig::from_preset(name)?,
        (None, None) => ServiceConfig::campus(),
    };
    if let Some(seed) = opts.seed {
        config.simulation.seed = seed;
    }
    if let Some(port) = opts.port {
        config.server.port = port;
    }
    Ok(config)
}

/// Builds the fleet into a fresh registry and wraps it in a simulator.
fn build_simulator(config: &ServiceConfig) -> Result<Simulator, ConfigError> {
    let fleet = config.fleet()?;
    let mut rng = SimRng::new(config.simulation.seed);
    let devices = fleet.build(&mut rng, &config.tariff, Utc::now());
    info!(
        "built {} devices from the \"{}\" fleet (seed {})",
        devices.len(),
        config.simulation.fleet,
        config.simulation.seed
    );
    let registry = DeviceRegistry::new(devices, config.simulation.history_limit, config.tariff);
    Ok(Simulator::new(Arc::new(registry), config.sim_config()))
}

/// Every retained reading, device by device.
fn all_readings(registry: &DeviceRegistry) -> Vec<Reading> {
    registry
        .all()
        .iter()
        .filter_map(|d| registry.readings(&d.id, registry.history_limit()).ok())
        .flatten()
        .collect()
}

fn write_readings(registry: &DeviceRegistry, path: &Path) -> Result<(), String> {
    let readings = all_readings(registry);
    export_csv(&readings, path)
        .map_err(|e| format!("failed to write CSV to {}: {e}", path.display()))?;
    info!("{} readings written to {}", readings.len(), path.display());
    Ok(())
}

#[cfg(feature = "api")]
mod live {
    use std::path::PathBuf;
    use std::sync::Arc;

    use log::{info, warn};

    use campus_energy::analytics::Overview;
    use campus_energy::api::{self, AppState};
    use campus_energy::config::ServiceConfig;
    use campus_energy::devices::Device;
    use campus_energy::poller::{HttpSource, Poller};
    use campus_energy::sim::ticker::spawn_ticker;

    async fn shutdown_signal() {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("shutting down"),
            Err(e) => {
                warn!("cannot listen for ctrl-c ({e}); running until killed");
                std::future::pending::<()>().await;
            }
        }
    }

    /// Warms up the fleet, ticks it in the background and serves the API
    /// until ctrl-c.
    pub async fn serve(
        config: ServiceConfig,
        readings_out: Option<PathBuf>,
    ) -> Result<(), String> {
        let mut sim = super::build_simulator(&config).map_err(|e| e.to_string())?;
        sim.run(config.simulation.warmup_ticks);
        let registry = Arc::clone(sim.registry());
        let ticker = spawn_ticker(sim, config.tick_interval());

        let addr = config.socket_addr().map_err(|e| e.to_string())?;
        if config.server.api_key.is_none() {
            info!("no server.api_key configured; /v1/analytics will reject every request");
        }
        let state = Arc::new(AppState {
            registry: Arc::clone(&registry),
            api_key: config.server.api_key.clone(),
            ticks: ticker.subscribe(),
        });

        api::serve(state, addr, shutdown_signal())
            .await
            .map_err(|e| format!("server error on {addr}: {e}"))?;
        ticker.shutdown();

        match readings_out {
            Some(path) => super::write_readings(&registry, &path),
            None => Ok(()),
        }
    }

    /// Polls a running server and logs what changes until ctrl-c.
    pub async fn watch(base_url: &str, config: &ServiceConfig) -> Result<(), String> {
        let mut devices = Poller::spawn(
            "devices",
            HttpSource::<Vec<Device>>::new(base_url, "/realtime/devices"),
            config.polling.devices_interval(),
        );
        let mut overview = Poller::spawn(
            "analytics",
            HttpSource::<Overview>::new(base_url, "/analytics?type=overview"),
            config.polling.analytics_interval(),
        );
        info!("watching {base_url}");

        let shutdown = shutdown_signal();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                alive = devices.changed() => {
                    if !alive {
                        break;
                    }
                    if let Some(list) = devices.snapshot().data {
                        let anomalous: Vec<&str> = list
                            .iter()
                            .filter(|d| d.anomaly_detected)
                            .map(|d| d.id.as_str())
                            .collect();
                        info!("{} devices, anomalies: {anomalous:?}", list.len());
                    }
                }
                alive = overview.changed() => {
                    if !alive {
                        break;
                    }
                    if let Some(report) = overview.snapshot().data {
                        println!("\n{report}");
                    }
                }
                _ = &mut shutdown => break,
            }
        }

        devices.cancel();
        overview.cancel();
        Ok(())
    }
}

/// Without the HTTP stack: warm up, print the overview, optionally export.
#[cfg(not(feature = "api"))]
fn run_offline(config: &ServiceConfig, opts: &CliOptions) -> Result<(), String> {
    let mut sim = build_simulator(config).map_err(|e| e.to_string())?;
    for summary in sim.run(config.simulation.warmup_ticks) {
        println!("{summary}");
    }
    let registry = sim.registry();
    println!(
        "\n{}",
        campus_energy::analytics::Overview::from_devices(&registry.all(), registry.tariff())
    );
    match &opts.readings_out {
        Some(path) => write_readings(registry, path),
        None => Ok(()),
    }
}

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let opts = match cli::parse_args() {
        Ok(opts) => opts,
        Err(e) => {
            eprintln!("error: {e}");
            cli::print_usage();
            process::exit(1);
        }
    };
    if opts.help {
        cli::print_usage();
        return;
    }

    let config = match load_config(&opts) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            process::exit(1);
        }
    };

    let errors = config.validate();
    if !errors.is_empty() {
        for e in &errors {
            eprintln!("{e}");
        }
        process::exit(1);
    }

    #[cfg(feature = "api")]
    let result = {
        let rt = tokio::runtime::Runtime::new().unwrap_or_else(|e| {
            eprintln!("error: failed to create tokio runtime: {e}");
            process::exit(1);
        });
        match &opts.watch {
            Some(url) => rt.block_on(live::watch(url, &config)),
            None => rt.block_on(live::serve(config, opts.readings_out.clone())),
        }
    };

    #[cfg(not(feature = "api"))]
    let result = match &opts.watch {
        Some(_) => Err("--watch needs the `api` feature".to_string()),
        None => run_offline(&config, &opts),
    };

    if let Err(e) = result {
        error!("{e}");
        process::exit(1);
    }
}
