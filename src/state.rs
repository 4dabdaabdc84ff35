//! state.rs — Estado de sessão durável
//!
//! Registro único do processo: lit/dark, instante da última transição e
//! controle de sincronização do cronograma. Toda mutação é salva na hora;
//! uma falha de escrita é apenas registrada e o estado em memória continua
//! valendo até o fim do processo.

use crate::storage::StateStore;
use crate::types::{MessageRef, PowerEvent, PowerState};
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Chave do registro no armazenamento chave-valor.
pub const STATE_KEY: &str = "session_state";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionState {
    pub lit: bool,
    /// `None` só em registros antigos; tratado como "agora".
    pub last_change_at: Option<DateTime<Utc>>,
    pub last_sync_token: String,
    pub last_fingerprint: String,
    pub last_message_ref: Option<MessageRef>,
    /// Duração (segundos) exibida na última mensagem de status.
    pub last_known_duration: f64,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            lit: true,
            last_change_at: None,
            last_sync_token: String::new(),
            last_fingerprint: String::new(),
            last_message_ref: None,
            last_known_duration: 0.0,
        }
    }
}

impl SessionState {
    pub fn last_change(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.last_change_at.unwrap_or(now)
    }

    pub fn power_state(&self) -> PowerState {
        PowerState::from_lit(self.lit)
    }
}

/// Resultado de uma sincronização do cronograma.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    Notify,
    Quiet,
}

/// Dono exclusivo do `SessionState`; o orquestrador o mantém atrás de um mutex.
pub struct StateManager {
    state: SessionState,
    store: Arc<dyn StateStore>,
}

impl StateManager {
    /// Sem registro anterior assume energia presente desde `now`. Com registro,
    /// restaura todos os campos sem recalcular nada.
    pub async fn resume(store: Arc<dyn StateStore>, now: DateTime<Utc>) -> Self {
        let loaded = match store.get(STATE_KEY).await {
            Ok(Some(raw)) => match serde_json::from_str::<SessionState>(&raw) {
                Ok(state) => Some(state),
                Err(e) => {
                    error!("[ESTADO] Registro ilegível, usando padrão: {}", e);
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                error!("[ESTADO] Falha ao carregar estado, usando padrão: {:?}", e);
                None
            }
        };

        match loaded {
            Some(state) => {
                info!(
                    "[ESTADO] Estado carregado: lit={}, última mudança={:?}",
                    state.lit, state.last_change_at
                );
                Self { state, store }
            }
            None => {
                info!("[ESTADO] Nenhum estado salvo, iniciando com energia presente");
                let manager = Self {
                    state: SessionState {
                        last_change_at: Some(now),
                        ..SessionState::default()
                    },
                    store,
                };
                manager.save().await;
                manager
            }
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub async fn save(&self) {
        let raw = match serde_json::to_string(&self.state) {
            Ok(raw) => raw,
            Err(e) => {
                error!("[ESTADO] Falha ao serializar estado: {}", e);
                return;
            }
        };
        if let Err(e) = self.store.set(STATE_KEY, &raw).await {
            error!("[ESTADO] Falha ao salvar estado: {:?}", e);
        }
    }

    /// Aplica uma transição do detector e devolve a duração do estado anterior.
    /// Não faz nada se a direção já coincide com o estado atual.
    pub async fn apply_transition(&mut self, event: &PowerEvent) -> Option<TimeDelta> {
        let target = event.target();
        if self.state.power_state() == target {
            return None;
        }

        let previous = self.state.last_change_at.unwrap_or(event.at());
        if event.at() < previous {
            warn!(
                "[ESTADO] Transição datada de {} anterior à última mudança {}, ajustando",
                event.at(),
                previous
            );
        }
        let at = event.at().max(previous);
        let duration = (at - previous).max(TimeDelta::zero());

        self.state.lit = target.is_lit();
        self.state.last_change_at = Some(at);
        self.save().await;
        Some(duration)
    }

    /// O token avança sempre; o fingerprint só quando mudou e o payload está
    /// completo, e só então há notificação.
    pub async fn apply_schedule_sync(
        &mut self,
        token: &str,
        fingerprint: &str,
        changed: bool,
        complete: bool,
    ) -> SyncOutcome {
        self.state.last_sync_token = token.to_string();
        let outcome = if changed && complete {
            self.state.last_fingerprint = fingerprint.to_string();
            SyncOutcome::Notify
        } else {
            SyncOutcome::Quiet
        };
        self.save().await;
        outcome
    }

    pub fn current_duration(&self, now: DateTime<Utc>) -> TimeDelta {
        (now - self.state.last_change(now)).max(TimeDelta::zero())
    }

    pub async fn set_message(&mut self, message: MessageRef, duration: TimeDelta) {
        self.state.last_message_ref = Some(message);
        self.state.last_known_duration = seconds(duration);
        self.save().await;
    }

    pub async fn clear_message(&mut self) {
        self.state.last_message_ref = None;
        self.state.last_known_duration = 0.0;
        self.save().await;
    }
}

pub fn seconds(duration: TimeDelta) -> f64 {
    duration.num_milliseconds() as f64 / 1000.0
}
