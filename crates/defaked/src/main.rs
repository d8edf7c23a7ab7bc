use anyhow::Result;
use tracing_subscriber::EnvFilter;

mod config;
mod dbus_interface;
mod engine;

use config::{BusKind, Config};
use dbus_interface::ScannerService;

const BUS_NAME: &str = "org.defake.Scanner1";
const OBJECT_PATH: &str = "/org/defake/Scanner1";

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    tracing::info!("defaked starting");

    let config = Config::load()?;
    tracing::info!(
        model_dir = %config.model_dir.display(),
        frame_count = config.frame_count,
        detection = config.detection_enabled,
        bus = ?config.bus,
        "configuration loaded"
    );

    let engine = engine::spawn_engine(&config)?;

    let builder = match config.bus {
        BusKind::Session => zbus::connection::Builder::session()?,
        BusKind::System => zbus::connection::Builder::system()?,
    };
    let service = ScannerService { engine, config };
    let _conn = builder
        .name(BUS_NAME)?
        .serve_at(OBJECT_PATH, service)?
        .build()
        .await?;

    tracing::info!(bus_name = BUS_NAME, "defaked ready");

    tokio::signal::ctrl_c().await?;
    tracing::info!("defaked shutting down");

    Ok(())
}
