//! Process plumbing: arguments, configuration, logging, runtime and shutdown

use std::net::{IpAddr, SocketAddr};

use anyhow::{Context, Result};
use trust_dns_resolver::config as resolveconf;
use trust_dns_resolver::TokioAsyncResolver;

pub mod args;
pub mod config;
pub mod log;
pub mod rt;
pub mod shutdown;

pub use log::init_logging;

/// resolves the destination once, at startup. IP literals are used as-is,
/// names go through DNS and the first IPv4 answer wins (any answer if there is no IPv4 one)
pub async fn lookup_destination(host: &str, port: u16) -> Result<SocketAddr> {
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(SocketAddr::new(ip, port));
    }
    info!("Performing DNS lookup of destination (host={host})");
    let resolver = TokioAsyncResolver::tokio(
        resolveconf::ResolverConfig::default(),
        resolveconf::ResolverOpts::default(),
    );
    let addrs = resolver
        .lookup_ip(host)
        .await
        .with_context(|| format!("failed to resolve destination `{host}`"))?
        .into_iter()
        .inspect(|addr| debug!("Resolved IP {addr}"))
        .collect::<Vec<_>>();
    let ip = addrs
        .iter()
        .find(|addr| addr.is_ipv4())
        .or_else(|| addrs.first())
        .copied()
        .ok_or_else(|| anyhow!("no addresses found for destination `{host}`"))?;
    Ok(SocketAddr::new(ip, port))
}
