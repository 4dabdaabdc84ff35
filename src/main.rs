mod config;
mod messages;
mod notify;
mod outage;
mod probe;
mod schedule;
mod scheduler;
mod source;
mod state;
mod storage;
mod types;
mod voltage;

use anyhow::Result;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    // Inicializa o sistema de logging (tracing)
    tracing_subscriber::fmt::init();

    // Configuração ausente ou inválida é o único erro fatal
    let config: Arc<config::Config> = Arc::new(config::Config::load()?);
    config.validate().map_err(anyhow::Error::msg)?;
    let tz = config.tz().map_err(anyhow::Error::msg)?;
    info!(
        "Configuração carregada: alvo {}:{}, grupo {}",
        config.target_host, config.target_port, config.schedule_group
    );

    let storage: Arc<storage::Storage> =
        Arc::new(storage::Storage::connect(&config.database_url).await?);
    info!("Banco de dados conectado");

    let voltage_source: Arc<dyn voltage::VoltageSource> = Arc::new(voltage::NoVoltage);
    let reconciler = Arc::new(
        scheduler::Reconciler::start(
            schedule::ScheduleModel::new(config.schedule_group.clone(), tz),
            scheduler::Collaborators {
                store: storage.clone(),
                events: storage.clone(),
                schedules: storage.clone(),
                voltages: storage.clone(),
                notifier: Arc::new(notify::LogChannel::default()),
                source: Arc::new(source::GithubSource::new(config.github.clone())?),
                voltage: Arc::clone(&voltage_source),
            },
            Utc::now(),
        )
        .await,
    );

    let initial = reconciler.power_state().await;
    info!("Estado inicial: {:?}", initial);
    let detector = outage::OutageDetector::new(initial, config.outage_threshold());

    let cancel = CancellationToken::new();
    let (event_tx, event_rx) = mpsc::channel(16);
    let readings = voltage::subscribe(
        voltage_source,
        config.voltage_interval(),
        cancel.clone(),
    );

    // A primeira consulta do cronograma acontece no primeiro tick do laço
    let handles: Vec<task::JoinHandle<()>> = vec![
        task::spawn(scheduler::run_probe_loop(
            Arc::clone(&config),
            probe::ConnectivityProbe::new(),
            detector,
            event_tx,
            cancel.clone(),
        )),
        task::spawn(scheduler::run_event_loop(
            Arc::clone(&reconciler),
            event_rx,
            cancel.clone(),
        )),
        task::spawn(scheduler::run_schedule_loop(
            Arc::clone(&config),
            Arc::clone(&reconciler),
            cancel.clone(),
        )),
        task::spawn(scheduler::run_voltage_loop(
            Arc::clone(&reconciler),
            readings,
            cancel.clone(),
        )),
    ];

    shutdown_signal().await;
    info!("Sinal de parada recebido, encerrando laços");
    cancel.cancel();

    for handle in handles {
        if let Err(e) = handle.await {
            error!("Erro ao aguardar tarefa: {:?}", e);
        }
    }

    reconciler.save().await;
    info!("Monitor encerrado");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Falha ao escutar Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Falha ao escutar SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
