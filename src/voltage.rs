use async_trait::async_trait;
use chrono::TimeDelta;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Janela das estatísticas exibidas na mensagem de status.
pub const STATS_WINDOW: TimeDelta = TimeDelta::hours(24);

/// Leitura de tensão da rede no local monitorado.
#[async_trait]
pub trait VoltageSource: Send + Sync {
    async fn read_now(&self) -> Option<f64>;
}

/// Fonte usada quando não há medidor configurado.
#[derive(Debug, Default)]
pub struct NoVoltage;

#[async_trait]
impl VoltageSource for NoVoltage {
    async fn read_now(&self) -> Option<f64> {
        None
    }
}

/// Lê a fonte a cada `every` e entrega as leituras válidas no canal.
/// A tarefa termina com `cancel` ou quando o receptor é descartado.
pub fn subscribe(
    source: Arc<dyn VoltageSource>,
    every: Duration,
    cancel: CancellationToken,
) -> mpsc::Receiver<f64> {
    let (tx, rx) = mpsc::channel(8);
    tokio::spawn(async move {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }
            let Some(voltage) = source.read_now().await else {
                debug!("[TENSAO] Sem leitura neste ciclo");
                continue;
            };
            if tx.send(voltage).await.is_err() {
                break;
            }
        }
    });
    rx
}
