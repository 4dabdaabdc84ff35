//! probe.rs — Sonda de alcançabilidade TCP com timeout rígido
//!
//! Recusa, timeout, rede inalcançável e falha de DNS colapsam em `false`.
//! Não há retentativa aqui: a histerese é responsabilidade do detector.

use std::net::{IpAddr, SocketAddr};
use tokio::net::TcpStream;
use tokio::time::{Duration, timeout};
use tracing::debug;
use trust_dns_resolver::TokioAsyncResolver;
use trust_dns_resolver::config::{ResolverConfig, ResolverOpts};

/// Executa a checagem de conectividade contra host:porta.
pub struct ConnectivityProbe {
    resolver: TokioAsyncResolver,
}

impl ConnectivityProbe {
    pub fn new() -> Self {
        Self {
            resolver: TokioAsyncResolver::tokio(ResolverConfig::default(), ResolverOpts::default()),
        }
    }

    /// Retorna true sse a conexão completa dentro de `limit` (DNS incluso).
    pub async fn probe(&self, host: &str, port: u16, limit: Duration) -> bool {
        match timeout(limit, self.connect(host, port)).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                debug!("[SONDA] {}:{} falhou: {}", host, port, e);
                false
            }
            Err(_) => {
                debug!("[SONDA] {}:{} excedeu {:?}", host, port, limit);
                false
            }
        }
    }

    async fn connect(&self, host: &str, port: u16) -> anyhow::Result<()> {
        let ip = match host.parse::<IpAddr>() {
            Ok(ip) => ip,
            Err(_) => self
                .resolver
                .lookup_ip(host)
                .await?
                .iter()
                .next()
                .ok_or_else(|| anyhow::anyhow!("nenhum endereço para {host}"))?,
        };
        let stream = TcpStream::connect(SocketAddr::new(ip, port)).await?;
        drop(stream);
        Ok(())
    }
}

impl Default for ConnectivityProbe {
    fn default() -> Self {
        Self::new()
    }
}
