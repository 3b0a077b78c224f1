// src/identity.rs

//! Client identity extraction.
//!
//! The limiter keys buckets by an opaque string. Producing that string from
//! request metadata is the extractor's job; a failure here must never fall
//! back to a shared key.

// dependencies
use crate::errors::IdentityError;
use axum::extract::ConnectInfo;
use axum::http::{HeaderName, Request};
use std::net::{IpAddr, SocketAddr};

/// Derives a stable client identity from an inbound request.
pub trait IdentityExtractor: Send + Sync {
    fn extract<B>(&self, request: &Request<B>) -> Result<String, IdentityError>;
}

/// Keys clients by the IP of the connected peer, ignoring the port.
///
/// Needs the router to be served with
/// `into_make_service_with_connect_info::<SocketAddr>()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PeerIpExtractor;

impl IdentityExtractor for PeerIpExtractor {
    fn extract<B>(&self, request: &Request<B>) -> Result<String, IdentityError> {
        let ConnectInfo(addr) = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .ok_or(IdentityError::MissingPeerAddr)?;

        let ip = addr.ip();
        if ip.is_unspecified() {
            return Err(IdentityError::MalformedAddr(addr.to_string()));
        }
        Ok(ip.to_string())
    }
}

/// Keys clients by a raw `host:port` peer address carried in a header.
///
/// For deployments behind a proxy that reports the original connection's
/// remote address (for example `x-remote-addr: 203.0.113.7:51234`). The
/// header must only be trusted when the proxy overwrites it.
#[derive(Debug, Clone)]
pub struct RemoteAddrHeaderExtractor {
    header: HeaderName,
}

impl RemoteAddrHeaderExtractor {
    pub fn new(header: HeaderName) -> Self {
        Self { header }
    }

    pub fn header(&self) -> &HeaderName {
        &self.header
    }
}

impl IdentityExtractor for RemoteAddrHeaderExtractor {
    fn extract<B>(&self, request: &Request<B>) -> Result<String, IdentityError> {
        let value = request
            .headers()
            .get(&self.header)
            .ok_or(IdentityError::MissingPeerAddr)?;
        let raw = value.to_str().map_err(|_| {
            IdentityError::MalformedAddr(String::from_utf8_lossy(value.as_bytes()).into_owned())
        })?;
        split_host_port(raw.trim())
    }
}

/// Split a raw `host:port` remote address and return the host.
///
/// Bracketed IPv6 (`[::1]:8080`) is accepted; a missing port, an empty host
/// or an unbracketed IPv6 address is malformed.
pub fn split_host_port(remote_addr: &str) -> Result<String, IdentityError> {
    let malformed = || IdentityError::MalformedAddr(remote_addr.to_string());

    if let Ok(addr) = remote_addr.parse::<SocketAddr>() {
        return Ok(addr.ip().to_string());
    }

    let (host, port) = remote_addr.rsplit_once(':').ok_or_else(malformed)?;
    if port.is_empty() || port.parse::<u16>().is_err() {
        return Err(malformed());
    }

    let host = match host.strip_prefix('[') {
        Some(inner) => inner.strip_suffix(']').ok_or_else(malformed)?,
        None if host.contains(':') => return Err(malformed()),
        None => host,
    };
    if host.is_empty() || host.contains(['[', ']']) {
        return Err(malformed());
    }

    // normalise literal addresses so "::1" and "0:0::1" share a bucket
    Ok(host
        .parse::<IpAddr>()
        .map(|ip| ip.to_string())
        .unwrap_or_else(|_| host.to_string()))
}
