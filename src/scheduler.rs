// src/scheduler.rs

use crate::notify::NotificationChannel;
use crate::outage::OutageDetector;
use crate::probe::ConnectivityProbe;
use crate::schedule::{ScheduleModel, ScheduleRecord};
use crate::source::ScheduleSource;
use crate::state::{SessionState, StateManager, SyncOutcome, seconds};
use crate::storage::{EventLog, ScheduleHistory, StateStore, VoltageLog};
use crate::types::{PowerEvent, PowerState, ProbeResult, VoltageStats};
use crate::voltage::{STATS_WINDOW, VoltageSource};
use crate::{config::Config, messages};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock, mpsc};
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Colaboradores externos usados pelo orquestrador.
pub struct Collaborators {
    pub store: Arc<dyn StateStore>,
    pub events: Arc<dyn EventLog>,
    pub schedules: Arc<dyn ScheduleHistory>,
    pub voltages: Arc<dyn VoltageLog>,
    pub notifier: Arc<dyn NotificationChannel>,
    pub source: Arc<dyn ScheduleSource>,
    pub voltage: Arc<dyn VoltageSource>,
}

/// Dono do estado de sessão. Toda mutação passa pelo mutex `state`, e o
/// salvamento acontece com ele travado.
pub struct Reconciler {
    state: Mutex<StateManager>,
    schedule: RwLock<ScheduleModel>,
    events: Arc<dyn EventLog>,
    schedules: Arc<dyn ScheduleHistory>,
    voltages: Arc<dyn VoltageLog>,
    notifier: Arc<dyn NotificationChannel>,
    source: Arc<dyn ScheduleSource>,
    voltage: Arc<dyn VoltageSource>,
}

impl Reconciler {
    /// Retoma o estado salvo e o último cronograma do histórico.
    pub async fn start(
        mut schedule: ScheduleModel,
        collaborators: Collaborators,
        now: DateTime<Utc>,
    ) -> Self {
        let Collaborators {
            store,
            events,
            schedules,
            voltages,
            notifier,
            source,
            voltage,
        } = collaborators;

        let state = StateManager::resume(store, now).await;

        match schedules.latest_schedule().await {
            Ok(Some(record)) => {
                info!(
                    "[AGENDA] Cronograma carregado do banco de dados (last_updated={})",
                    record.last_updated
                );
                schedule.set_cached(record.data);
            }
            Ok(None) => {}
            Err(e) => error!("[AGENDA] Erro ao carregar cronograma: {:?}", e),
        }
        if schedule.cached().is_none() {
            info!("[AGENDA] Sem cronograma em cache, aguardando a primeira consulta");
        }

        if let Some(message) = state.state().last_message_ref {
            info!("[ESTADO] Retomando atualizações da mensagem {}", message.0);
        }

        Self {
            state: Mutex::new(state),
            schedule: RwLock::new(schedule),
            events,
            schedules,
            voltages,
            notifier,
            source,
            voltage,
        }
    }

    pub async fn snapshot(&self) -> SessionState {
        self.state.lock().await.state().clone()
    }

    pub async fn power_state(&self) -> PowerState {
        self.state.lock().await.state().power_state()
    }

    pub async fn save(&self) {
        self.state.lock().await.save().await;
    }

    /// Aplica uma transição do detector, registra e notifica.
    pub async fn handle_event(&self, event: PowerEvent, now: DateTime<Utc>) {
        let (duration, event_time) = {
            let mut state = self.state.lock().await;
            let Some(duration) = state.apply_transition(&event).await else {
                debug!("[ESTADO] Evento {:?} já refletido no estado, ignorando", event);
                return;
            };
            // A mensagem de energia presente deixa de receber atualizações.
            if matches!(event, PowerEvent::Lost { .. }) {
                state.clear_message().await;
            }
            (duration, state.state().last_change(now))
        };

        let lit = event.target().is_lit();
        info!(
            "[ESTADO] Energia {} em {} (estado anterior durou {}s)",
            if lit { "ON" } else { "OFF" },
            event_time,
            duration.num_seconds()
        );

        if let Err(e) = self.events.append(event.kind(), event_time).await {
            error!("[STORAGE] Erro ao registrar evento {:?}: {:?}", event.kind(), e);
        }

        let (tz, next) = {
            let schedule = self.schedule.read().await;
            (schedule.tz(), schedule.next_event(lit, now))
        };
        let (voltage, stats) = if lit {
            (self.voltage.read_now().await, self.voltage_stats(now).await)
        } else {
            (None, None)
        };
        let text = messages::format_status(
            lit,
            seconds(duration),
            &event_time.with_timezone(&tz),
            next.as_ref(),
            voltage,
            stats.as_ref(),
        );

        match self.notifier.send(&text, None).await {
            Ok(message) => self.state.lock().await.set_message(message, duration).await,
            Err(e) => error!("[NOTIFICACAO] Falha ao enviar mensagem de energia: {:?}", e),
        }
    }

    /// Consulta a fonte; aceita só payloads completos e notifica apenas quando
    /// o conteúdo relevante do grupo mudou.
    pub async fn refresh_schedule(&self, now: DateTime<Utc>) {
        let last_token = self.state.lock().await.state().last_sync_token.clone();

        let update = match self.source.fetch(&last_token).await {
            Ok(Some(update)) => update,
            Ok(None) => {
                debug!("[AGENDA] Nenhum commit novo");
                return;
            }
            Err(e) => {
                warn!("[AGENDA] Erro ao consultar cronograma: {}", e);
                return;
            }
        };

        let (complete, fingerprint, filtered, caption, had_cache) = {
            let schedule = self.schedule.read().await;
            let local = now.with_timezone(&schedule.tz());
            let today = local.date_naive();
            let tomorrow = today.succ_opt().unwrap_or(today);
            (
                schedule.is_complete(&update.payload, today, tomorrow),
                schedule.fingerprint(&update.payload, today, tomorrow),
                schedule.filter_for_group(&update.payload),
                messages::format_schedule_caption(&schedule, &update.payload, local),
                schedule.cached().is_some(),
            )
        };

        let outcome = {
            let mut state = self.state.lock().await;
            let changed = fingerprint != state.state().last_fingerprint;
            state
                .apply_schedule_sync(&update.token, &fingerprint, changed, complete)
                .await
        };

        if !complete {
            warn!("[AGENDA] Cronograma incompleto (falta hoje ou amanhã), ignorando atualização");
            return;
        }

        let last_updated = filtered
            .last_updated()
            .map(str::to_string)
            .unwrap_or_else(|| now.to_rfc3339());
        self.schedule.write().await.set_cached(update.payload);

        // Sem mudança só grava quando ainda não havia cronograma em cache
        let record = match outcome {
            SyncOutcome::Notify => Some(ScheduleRecord {
                data: filtered,
                last_updated,
                update_message: Some(caption.clone()),
            }),
            SyncOutcome::Quiet if !had_cache => Some(ScheduleRecord {
                data: filtered,
                last_updated,
                update_message: None,
            }),
            SyncOutcome::Quiet => None,
        };
        if let Some(record) = record {
            if let Err(e) = self.schedules.append_schedule(&record).await {
                error!("[AGENDA] Erro ao salvar cronograma: {:?}", e);
            }
        }

        match outcome {
            SyncOutcome::Quiet => {
                info!("[AGENDA] Cronograma do grupo não mudou, sem notificação");
            }
            SyncOutcome::Notify => {
                info!("[AGENDA] Fingerprint mudou, enviando atualização");
                if let Err(e) = self.notifier.send(&caption, Some(&update.image)).await {
                    error!("[NOTIFICACAO] Falha ao enviar cronograma: {:?}", e);
                }
            }
        }
        self.refresh_status_message(now).await;
    }

    /// Reescreve a última mensagem de status com o próximo evento atual.
    pub async fn refresh_status_message(&self, now: DateTime<Utc>) {
        let voltage = if self.power_state().await.is_lit() {
            self.voltage.read_now().await
        } else {
            None
        };
        self.edit_status(voltage, now).await;
    }

    /// Nova leitura de tensão: com energia é registrada, marcada com a
    /// mensagem ativa, e a mensagem é reescrita.
    pub async fn on_voltage(&self, voltage: f64, now: DateTime<Utc>) {
        let snapshot = self.snapshot().await;
        if !snapshot.lit {
            return;
        }
        if let Err(e) = self
            .voltages
            .append_voltage(voltage, snapshot.last_message_ref, now)
            .await
        {
            error!("[TENSAO] Erro ao registrar leitura: {:?}", e);
        }
        self.edit_status(Some(voltage), now).await;
    }

    async fn voltage_stats(&self, now: DateTime<Utc>) -> Option<VoltageStats> {
        match self.voltages.voltage_stats(now - STATS_WINDOW).await {
            Ok(stats) => stats,
            Err(e) => {
                warn!("[TENSAO] Erro ao calcular estatísticas: {:?}", e);
                None
            }
        }
    }

    async fn edit_status(&self, voltage: Option<f64>, now: DateTime<Utc>) {
        let snapshot = self.snapshot().await;
        let Some(message) = snapshot.last_message_ref else {
            return;
        };

        let (tz, next) = {
            let schedule = self.schedule.read().await;
            (schedule.tz(), schedule.next_event(snapshot.lit, now))
        };
        let stats = if snapshot.lit {
            self.voltage_stats(now).await
        } else {
            None
        };
        let text = messages::format_status(
            snapshot.lit,
            snapshot.last_known_duration,
            &snapshot.last_change(now).with_timezone(&tz),
            next.as_ref(),
            voltage,
            stats.as_ref(),
        );
        if let Err(e) = self.notifier.edit(message, &text, None).await {
            debug!("[NOTIFICACAO] Não foi possível editar a mensagem {}: {:?}", message.0, e);
        }
    }
}

/// Laço de sondagem: a sonda roda fora de qualquer trava e o detector
/// pertence só a este laço. Transições vão para o canal de eventos.
pub async fn run_probe_loop(
    config: Arc<Config>,
    probe: ConnectivityProbe,
    mut detector: OutageDetector,
    events: mpsc::Sender<PowerEvent>,
    cancel: CancellationToken,
) {
    let mut ticker = interval(config.probe_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let success = probe
            .probe(&config.target_host, config.target_port, config.probe_timeout())
            .await;
        let now = Utc::now();
        debug!(
            "[SONDA] {}:{} -> {} (estado {:?})",
            config.target_host,
            config.target_port,
            if success { "ok" } else { "falhou" },
            detector.current()
        );

        let result = ProbeResult {
            success,
            observed_at: now,
        };
        if let Some(event) = detector.check(result) {
            if events.send(event).await.is_err() {
                warn!("[SONDA] Canal de eventos fechado, encerrando laço de sondagem");
                break;
            }
        }
    }
    info!("[SONDA] Laço de sondagem encerrado");
}

/// Consome as transições do detector. Ao cancelar, aplica o que já estava
/// na fila antes de sair.
pub async fn run_event_loop(
    reconciler: Arc<Reconciler>,
    mut events: mpsc::Receiver<PowerEvent>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            event = events.recv() => match event {
                Some(event) => reconciler.handle_event(event, Utc::now()).await,
                None => break,
            },
        }
    }
    while let Ok(event) = events.try_recv() {
        reconciler.handle_event(event, Utc::now()).await;
    }
    info!("[ESTADO] Laço de eventos encerrado");
}

/// Falhas de consulta são só registradas; a próxima volta tenta de novo.
pub async fn run_schedule_loop(
    config: Arc<Config>,
    reconciler: Arc<Reconciler>,
    cancel: CancellationToken,
) {
    let mut ticker = interval(config.schedule_fetch_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }
        reconciler.refresh_schedule(Utc::now()).await;
    }
    info!("[AGENDA] Laço do cronograma encerrado");
}

pub async fn run_voltage_loop(
    reconciler: Arc<Reconciler>,
    mut readings: mpsc::Receiver<f64>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            reading = readings.recv() => match reading {
                Some(voltage) => reconciler.on_voltage(voltage, Utc::now()).await,
                None => break,
            },
        }
    }
    info!("[TENSAO] Laço de tensão encerrado");
}
