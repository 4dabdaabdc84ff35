use chrono::{DateTime, TimeDelta, Utc};
use chrono_tz::Tz;
use postgres_types::{FromSql, ToSql};
use serde::{Deserialize, Serialize};

/// Estado de energia inferido do local monitorado.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PowerState {
    Lit,
    Dark,
}

impl PowerState {
    pub fn from_lit(lit: bool) -> Self {
        if lit { PowerState::Lit } else { PowerState::Dark }
    }

    pub fn is_lit(self) -> bool {
        self == PowerState::Lit
    }
}

/// Resultado de uma única sondagem. Não é persistido.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeResult {
    pub success: bool,
    pub observed_at: DateTime<Utc>,
}

/// Transição emitida pelo detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerEvent {
    /// `at` é o instante da primeira falha da janela, não o do disparo.
    Lost { at: DateTime<Utc> },
    Restored { at: DateTime<Utc> },
}

impl PowerEvent {
    pub fn at(&self) -> DateTime<Utc> {
        match *self {
            PowerEvent::Lost { at } | PowerEvent::Restored { at } => at,
        }
    }

    /// Estado resultante da transição.
    pub fn target(&self) -> PowerState {
        match self {
            PowerEvent::Lost { .. } => PowerState::Dark,
            PowerEvent::Restored { .. } => PowerState::Lit,
        }
    }

    pub fn kind(&self) -> EventKind {
        match self {
            PowerEvent::Lost { .. } => EventKind::Off,
            PowerEvent::Restored { .. } => EventKind::On,
        }
    }
}

/// Enum para tipo de evento de energia (PostgreSQL)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSql, FromSql)]
#[postgres(name = "power_event_kind", rename_all = "lowercase")]
pub enum EventKind {
    On,
    Off,
}

/// Referência opaca a uma mensagem já enviada pelo canal de notificação.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct MessageRef(pub i64);

/// Intervalo contínuo de falta de energia confirmada, `start < end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutagePeriod {
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
}

impl OutagePeriod {
    pub fn duration(&self) -> TimeDelta {
        self.end - self.start
    }
}

/// Próximo evento do cronograma exibido na mensagem de status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextEvent {
    Outage {
        period: OutagePeriod,
        is_tomorrow: bool,
    },
    PowerOn {
        at: DateTime<Tz>,
        is_tomorrow: bool,
    },
}

/// Mínimo, máximo e média das leituras de tensão numa janela.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoltageStats {
    pub min: f64,
    pub max: f64,
    pub avg: f64,
}
