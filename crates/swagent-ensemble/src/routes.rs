//! Route chunks applied by the ensemble.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;
use swagent_types::IpPrefix;

/// Whether a chunk is being programmed or withdrawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteOp {
    Add,
    Delete,
}

impl fmt::Display for RouteOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteOp::Add => f.write_str("add"),
            RouteOp::Delete => f.write_str("delete"),
        }
    }
}

/// A unicast route as handed to the switch runtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnicastRoute {
    pub prefix: IpPrefix,
    #[serde(default)]
    pub next_hops: Vec<IpAddr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_distance: Option<u8>,
}

impl UnicastRoute {
    pub fn new(prefix: IpPrefix, next_hops: Vec<IpAddr>) -> Self {
        Self {
            prefix,
            next_hops,
            admin_distance: None,
        }
    }

    pub fn with_admin_distance(mut self, distance: u8) -> Self {
        self.admin_distance = Some(distance);
        self
    }
}

/// An ordered batch of routes applied in one runtime update.
pub type RouteChunk = Vec<UnicastRoute>;

/// Produces the route chunks for a scale or distribution scenario.
pub trait RouteDistributionGenerator: Send + Sync {
    fn route_chunks(&self) -> Vec<RouteChunk>;
}

/// Splits routes into chunks of at most `chunk_size`, keeping order.
/// A zero chunk size puts everything in a single chunk.
pub fn chunk_routes(routes: Vec<UnicastRoute>, chunk_size: usize) -> Vec<RouteChunk> {
    if routes.is_empty() {
        return Vec::new();
    }
    if chunk_size == 0 {
        return vec![routes];
    }
    let mut chunks = Vec::with_capacity(routes.len().div_ceil(chunk_size));
    let mut iter = routes.into_iter().peekable();
    while iter.peek().is_some() {
        chunks.push(iter.by_ref().take(chunk_size).collect());
    }
    chunks
}

/// Generator over a fixed list of routes.
#[derive(Debug, Clone)]
pub struct StaticRouteGenerator {
    routes: Vec<UnicastRoute>,
    chunk_size: usize,
}

impl StaticRouteGenerator {
    pub fn new(routes: Vec<UnicastRoute>, chunk_size: usize) -> Self {
        Self { routes, chunk_size }
    }
}

impl RouteDistributionGenerator for StaticRouteGenerator {
    fn route_chunks(&self) -> Vec<RouteChunk> {
        chunk_routes(self.routes.clone(), self.chunk_size)
    }
}
