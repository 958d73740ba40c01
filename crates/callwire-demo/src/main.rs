#![doc = include_str!("../README.md")]

mod config;
mod scenarios;
mod telemetry;

use callwire_services::{
    CalculatorClient, GreeterClient,
    callwire::{Client, Server, local},
    registry,
};
use clap::Parser;
use config::{CliArgs, DemoConfig};
use scenarios::Scenarios;
use telemetry::init_telemetry;
use tokio::signal;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = DemoConfig::try_from(args)?;

    init_telemetry()?;
    log_startup_info(&config);

    let (transport, incoming) = local(&config.engine);
    let server = Server::new(registry(config.greeter)?, config.engine.clone());
    let serving = tokio::spawn(async move {
        server
            .serve_with_shutdown(incoming, shutdown_signal())
            .await;
    });

    let client = Client::with_config(transport, config.engine.clone());
    let scenarios = Scenarios::new(
        CalculatorClient::new(client.clone()),
        GreeterClient::new(client),
        config.inputs,
    );
    let outcome = scenarios.run(config.scenario).await;

    // Dropping the last client ends the incoming stream, letting the server
    // drain and return.
    drop(scenarios);
    serving.await?;

    #[cfg(feature = "tracing")]
    tracing::info!("Demo finished");
    outcome
}

fn log_startup_info(_config: &DemoConfig) {
    if cfg!(debug_assertions) {
        #[cfg(feature = "tracing")]
        tracing::info!("Starting callwire demo with full config: {:#?}", _config);
    } else {
        #[cfg(feature = "tracing")]
        tracing::info!(
            "Starting callwire demo: scenario {:?}, channel capacity {}",
            _config.scenario,
            _config.engine.channel_capacity
        );
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(_e) => {
                #[cfg(feature = "tracing")]
                tracing::error!("Failed to install SIGTERM handler: {:?}", _e);
                core::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = core::future::pending::<()>();

    let ctrl_c = async {
        if let Err(_e) = signal::ctrl_c().await {
            #[cfg(feature = "tracing")]
            tracing::error!("Failed to install Ctrl+C handler: {:?}", _e);
            core::future::pending::<()>().await;
        }
    };

    tokio::select! {
        () = ctrl_c => {
            #[cfg(feature = "tracing")]
            tracing::info!("Received Ctrl+C signal");
        },
        () = terminate => {
            #[cfg(feature = "tracing")]
            tracing::info!("Received SIGTERM signal");
        },
    }

    #[cfg(feature = "tracing")]
    tracing::info!("Shutdown signal received, draining in-flight calls...");
}
