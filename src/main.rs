//! Pan-Tilt Camserver
//!
//! Main entry point: startup sequencing (PWM backend first, camera
//! second, serving last) and teardown in fixed order on every exit path.

use pantilt_camserver::{
    actuator::{ActuatorController, PigpioClient},
    camera::{RpicamSensor, SensorDriver, TestPatternSensor},
    state::{AppConfig, AppState, CameraSource},
    stream_hub::StreamHub,
    web_api,
};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pantilt_camserver=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting pantilt-camserver v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = AppConfig::default();
    tracing::info!(
        host = %config.host,
        port = config.port,
        camera_source = ?config.camera_source,
        pigpio = %format!("{}:{}", config.pigpio_addr, config.pigpio_port),
        azimuth_pin = config.servo.azimuth_pin,
        elevation_pin = config.servo.elevation_pin,
        "Configuration loaded"
    );

    // PWM backend first: nothing else starts without confirmed daemon
    // connectivity, and the camera is never touched on this failure path
    let backend = PigpioClient::connect(&config.pigpio_addr, config.pigpio_port)
        .await
        .map_err(|e| {
            anyhow::anyhow!("{}. Make sure the daemon is running with 'sudo pigpiod'", e)
        })?;

    let actuator = Arc::new(ActuatorController::new(
        Box::new(backend),
        config.servo.clone(),
    ));
    tracing::info!("ActuatorController initialized");

    // Camera acquisition; a failure here must still release the PWM handle
    let sensor = match acquire_sensor(&config) {
        Ok(sensor) => sensor,
        Err(e) => {
            actuator.shutdown().await;
            return Err(e.into());
        }
    };

    let hub = Arc::new(StreamHub::new(config.jpeg_quality));
    let hub_cancel = CancellationToken::new();
    let hub_task = hub.clone().run(sensor, hub_cancel.clone());
    tracing::info!("Stream hub started");

    let state = AppState {
        config: config.clone(),
        hub,
        actuator: actuator.clone(),
        started_at: Instant::now(),
    };

    let serve_result = serve(&config, state).await;

    // Teardown, fixed order: the server has stopped accepting sessions;
    // stop the capture loop, de-energize the servos, then join the loop
    // so the sensor is released before we exit
    hub_cancel.cancel();
    actuator.shutdown().await;
    if let Err(e) = hub_task.await {
        tracing::warn!(error = %e, "Stream hub task panicked");
    }

    serve_result?;
    tracing::info!("Clean shutdown complete");
    Ok(())
}

fn acquire_sensor(config: &AppConfig) -> pantilt_camserver::Result<Box<dyn SensorDriver>> {
    let (w, h, fps) = (config.camera_width, config.camera_height, config.camera_fps);
    match config.camera_source {
        CameraSource::Rpicam => Ok(Box::new(RpicamSensor::spawn(w, h, fps)?)),
        CameraSource::TestPattern => Ok(Box::new(TestPatternSensor::new(w, h, fps))),
    }
}

async fn serve(config: &AppConfig, state: AppState) -> anyhow::Result<()> {
    let app = web_api::create_router(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http());

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
