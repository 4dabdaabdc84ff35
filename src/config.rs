use chrono_tz::Tz;
use config as config_crate;
use serde::Deserialize;
use std::time::Duration;

/// Configuração operacional do sistema.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Host monitorado (IP ou nome DNS). Obrigatório.
    pub target_host: String,
    /// Porta TCP usada na sonda.
    #[serde(default = "default_target_port")]
    pub target_port: u16,
    /// Intervalo entre sondagens em segundos.
    #[serde(default = "default_probe_interval_secs")]
    pub probe_interval_secs: u64,
    /// Timeout em segundos para cada sondagem.
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,
    /// Tempo contínuo de falha (segundos) até declarar falta de energia.
    #[serde(default = "default_outage_threshold_secs")]
    pub outage_threshold_secs: u64,
    /// Intervalo entre consultas ao cronograma em segundos.
    #[serde(default = "default_schedule_fetch_interval_secs")]
    pub schedule_fetch_interval_secs: u64,
    /// Intervalo entre leituras de tensão em segundos.
    #[serde(default = "default_voltage_interval_secs")]
    pub voltage_interval_secs: u64,
    /// Grupo do cronograma monitorado (ex.: "GPV6.2").
    #[serde(default = "default_schedule_group")]
    pub schedule_group: String,
    /// Fuso horário IANA usado para datas do cronograma.
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// URL de conexão com o banco PostgreSQL. Obrigatório.
    pub database_url: String,
    #[serde(default)]
    pub github: GithubConfig,
}

/// Origem do cronograma publicado no GitHub.
#[derive(Debug, Clone, Deserialize)]
pub struct GithubConfig {
    #[serde(default = "default_github_repo")]
    pub repo: String,
    #[serde(default = "default_github_branch")]
    pub branch: String,
    #[serde(default = "default_github_json_path")]
    pub json_path: String,
    #[serde(default = "default_github_image_path")]
    pub image_path: String,
    /// Token opcional; sem ele a API pública tem limite de requisições menor.
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "default_github_api_url")]
    pub api_url: String,
    #[serde(default = "default_github_raw_url")]
    pub raw_url: String,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            repo: default_github_repo(),
            branch: default_github_branch(),
            json_path: default_github_json_path(),
            image_path: default_github_image_path(),
            token: None,
            api_url: default_github_api_url(),
            raw_url: default_github_raw_url(),
        }
    }
}

fn default_target_port() -> u16 {
    8443
}
fn default_probe_interval_secs() -> u64 {
    10
}
fn default_probe_timeout_secs() -> u64 {
    5
}
fn default_outage_threshold_secs() -> u64 {
    120
}
fn default_schedule_fetch_interval_secs() -> u64 {
    120
}
fn default_voltage_interval_secs() -> u64 {
    120
}
fn default_schedule_group() -> String {
    "GPV6.2".into()
}
fn default_timezone() -> String {
    "Europe/Kyiv".into()
}
fn default_github_repo() -> String {
    "Baskerville42/outage-data-ua".into()
}
fn default_github_branch() -> String {
    "main".into()
}
fn default_github_json_path() -> String {
    "data/kyiv-region.json".into()
}
fn default_github_image_path() -> String {
    "images/kyiv-region/gpv-6-2-emergency.png".into()
}
fn default_github_api_url() -> String {
    "https://api.github.com".into()
}
fn default_github_raw_url() -> String {
    "https://raw.githubusercontent.com".into()
}

impl Config {
    /// Carrega `config.toml` (opcional) e sobrescreve com variáveis `MONITOR__*`.
    pub fn load() -> anyhow::Result<Self> {
        let settings = config_crate::Config::builder()
            .add_source(config_crate::File::with_name("config").required(false))
            .add_source(config_crate::Environment::with_prefix("MONITOR").separator("__"))
            .build()?;
        let config: Config = settings.try_deserialize()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.target_host.trim().is_empty() {
            return Err("target_host é obrigatório".into());
        }
        if self.database_url.trim().is_empty() {
            return Err("database_url é obrigatório".into());
        }
        if self.probe_interval_secs == 0 {
            return Err("probe_interval_secs deve ser maior que zero".into());
        }
        if self.probe_timeout_secs == 0 {
            return Err("probe_timeout_secs deve ser maior que zero".into());
        }
        if self.schedule_fetch_interval_secs == 0 {
            return Err("schedule_fetch_interval_secs deve ser maior que zero".into());
        }
        if self.voltage_interval_secs == 0 {
            return Err("voltage_interval_secs deve ser maior que zero".into());
        }
        if self.schedule_group.trim().is_empty() {
            return Err("schedule_group não pode ser vazio".into());
        }
        self.tz()?;
        Ok(())
    }

    pub fn tz(&self) -> Result<Tz, String> {
        self.timezone
            .parse::<Tz>()
            .map_err(|e| format!("timezone inválido ({}): {}", self.timezone, e))
    }

    pub fn probe_interval(&self) -> Duration {
        Duration::from_secs(self.probe_interval_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn outage_threshold(&self) -> chrono::TimeDelta {
        chrono::TimeDelta::seconds(self.outage_threshold_secs as i64)
    }

    pub fn schedule_fetch_interval(&self) -> Duration {
        Duration::from_secs(self.schedule_fetch_interval_secs)
    }

    pub fn voltage_interval(&self) -> Duration {
        Duration::from_secs(self.voltage_interval_secs)
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        target_host: "127.0.0.1".into(),
        target_port: default_target_port(),
        probe_interval_secs: 1,
        probe_timeout_secs: 1,
        outage_threshold_secs: 120,
        schedule_fetch_interval_secs: 1,
        voltage_interval_secs: 1,
        schedule_group: "GPV6.2".into(),
        timezone: "Europe/Kyiv".into(),
        database_url: "postgres://localhost/test".into(),
        github: GithubConfig::default(),
    }
}
