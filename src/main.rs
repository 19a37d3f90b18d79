use env_logger::Env;
use log::{error, info};
use service_dashboard::cli::configure_cli;
use service_dashboard::config::load_config;
use service_dashboard::inbound::server::{AppState, create_app};
use service_dashboard::outbound::docker::DockerRuntime;
use tokio::net::TcpListener;
use tokio::sync::watch;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + 'static>> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = configure_cli();
    let mut config = load_config(&cli.config)?;
    if let Some(port) = cli.port {
        config.port = port;
    }

    let runtime = DockerRuntime::connect(config.docker_socket.as_deref())?;
    let state = AppState::from_config(runtime, &config);
    info!(
        "watching {} services, pushing every {:?}",
        state.aggregator.registry().len(),
        config.poll_interval()
    );

    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    ctrlc::set_handler(move || {
        info!("Received shutdown signal, gracefully shutting down...");
        if shutdown_tx.send(true).is_err() {
            error!("server already stopped");
        }
    })?;

    let app = create_app(state);
    let address = format!("{}:{}", config.bind, config.port);
    let listener = TcpListener::bind(&address).await?;

    info!("Service Dashboard running at http://{address}");
    info!("  GET    /api/services                         - health of every service");
    info!("  GET    /api/logs/:container?tail=N           - container logs");
    info!("  GET    /api/containers                       - all containers");
    info!("  POST   /api/containers/:container/:action    - pause|unpause|stop|start|restart");
    info!("  GET    /ws                                   - live status updates");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.changed().await;
        })
        .await?;

    Ok(())
}
