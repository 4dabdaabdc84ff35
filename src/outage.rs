//! outage.rs — Detector de falta de energia com histerese
//!
//! Transforma o sinal ruidoso de alcançabilidade em eventos Lit/Dark.
//! A perda exige falha contínua por `threshold`; a volta exige um único sucesso.

use crate::types::{PowerEvent, PowerState, ProbeResult};
use chrono::{DateTime, TimeDelta, Utc};
use tracing::{info, warn};

/// Estado interno do detector. Nunca toca no estado persistido.
#[derive(Debug, Clone)]
pub struct OutageDetector {
    current: PowerState,
    first_failure_at: Option<DateTime<Utc>>,
    alert_pending: bool,
    threshold: TimeDelta,
}

impl OutageDetector {
    /// `initial` vem do estado retomado, não é re-derivado das sondas.
    pub fn new(initial: PowerState, threshold: TimeDelta) -> Self {
        Self {
            current: initial,
            first_failure_at: None,
            alert_pending: false,
            threshold,
        }
    }

    pub fn current(&self) -> PowerState {
        self.current
    }

    /// Processa uma sondagem e devolve a transição, se houver.
    pub fn check(&mut self, result: ProbeResult) -> Option<PowerEvent> {
        if result.success {
            self.first_failure_at = None;
            self.alert_pending = false;

            if self.current == PowerState::Dark {
                info!("[DETECTOR] Conexão restabelecida, disparando evento de energia ON");
                self.current = PowerState::Lit;
                return Some(PowerEvent::Restored {
                    at: result.observed_at,
                });
            }
            return None;
        }

        let first_failure = match self.first_failure_at {
            Some(first) => first,
            None => {
                warn!("[DETECTOR] Sonda falhou, iniciando janela de histerese");
                self.first_failure_at = Some(result.observed_at);
                result.observed_at
            }
        };

        if self.current == PowerState::Dark {
            return None;
        }

        let elapsed = (result.observed_at - first_failure).max(TimeDelta::zero());
        if elapsed >= self.threshold {
            warn!(
                "[DETECTOR] Sonda falhando há {}s, disparando evento de energia OFF",
                elapsed.num_seconds()
            );
            self.current = PowerState::Dark;
            self.alert_pending = false;
            return Some(PowerEvent::Lost { at: first_failure });
        }

        if !self.alert_pending {
            info!(
                "[DETECTOR] Sonda falhou... alerta pendente em {}s",
                (self.threshold - elapsed).num_seconds()
            );
            self.alert_pending = true;
        }
        None
    }
}
