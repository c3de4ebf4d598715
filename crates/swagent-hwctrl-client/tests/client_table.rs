//! Client table against real hw agent servers on loopback.

use pretty_assertions::assert_eq;
use std::collections::BTreeMap;
use std::net::{Ipv6Addr, SocketAddr, TcpListener};
use std::sync::Arc;
use std::time::{Duration, Instant};
use swagent_hwctrl_client::{
    ClientOptions, HwCtrlError, HwCtrlServer, HwCtrlService, HwSwitchClientTable,
};
use swagent_types::{FabricEndpoint, Reachability, SwitchId, SwitchInfo};
use tokio::runtime::Runtime;

struct FixedReachability(Reachability);

#[async_trait::async_trait]
impl HwCtrlService for FixedReachability {
    async fn get_hw_fabric_reachability(&self) -> Result<Reachability, String> {
        Ok(self.0.clone())
    }
}

/// Finds two consecutive free ports on the loopback and returns the first.
fn free_port_pair() -> u16 {
    for _ in 0..50 {
        let first = TcpListener::bind("[::1]:0").unwrap();
        let port = first.local_addr().unwrap().port();
        if port == u16::MAX {
            continue;
        }
        if TcpListener::bind((Ipv6Addr::LOCALHOST, port + 1)).is_ok() {
            return port;
        }
    }
    panic!("no consecutive free ports");
}

fn fast_options() -> ClientOptions {
    ClientOptions {
        connect_timeout: Duration::from_millis(500),
        request_timeout: Duration::from_secs(5),
        ..ClientOptions::default()
    }
}

fn two_switches() -> BTreeMap<SwitchId, SwitchInfo> {
    BTreeMap::from([
        (SwitchId::new(1), SwitchInfo::new(0)),
        (SwitchId::new(2), SwitchInfo::new(1)),
    ])
}

/// Starts a hw agent on `port` in its own runtime; the test thread
/// stays outside any runtime so client calls may block.
fn start_agent(runtime: &Runtime, port: u16, reachability: Reachability) -> HwCtrlServer {
    let addr = SocketAddr::from((Ipv6Addr::LOCALHOST, port));
    runtime
        .block_on(HwCtrlServer::bind(
            addr,
            Arc::new(FixedReachability(reachability)),
        ))
        .unwrap()
}

#[test]
fn test_construction_does_not_connect() {
    let start = Instant::now();
    let table = HwSwitchClientTable::with_options(5931, &two_switches(), fast_options()).unwrap();
    assert!(start.elapsed() < Duration::from_secs(1));

    assert_eq!(table.len(), 2);
    for switch_id in [SwitchId::new(1), SwitchId::new(2)] {
        let client = table.get_client(switch_id).unwrap();
        assert_eq!(client.switch_id(), switch_id);
        assert!(!client.is_initialized());
    }
    assert!(matches!(
        table.get_client(SwitchId::new(3)),
        Err(HwCtrlError::NoClient { .. })
    ));
}

#[test]
fn test_reachability_unknown_then_known() {
    let base_port = free_port_pair();
    let table =
        HwSwitchClientTable::with_options(base_port, &two_switches(), fast_options()).unwrap();
    assert_eq!(table.port_for(SwitchId::new(1)), Some(base_port));
    assert_eq!(table.port_for(SwitchId::new(2)), Some(base_port + 1));

    // Nothing listens yet.
    assert_eq!(table.get_fabric_reachability(SwitchId::new(1)).unwrap(), None);

    let runtime = Runtime::new().unwrap();
    let expected = Reachability::from([(100, FabricEndpoint::new(3, 7))]);
    let agent = start_agent(&runtime, base_port, expected.clone());

    // The same client reconnects on the next call.
    assert_eq!(
        table.get_fabric_reachability(SwitchId::new(1)).unwrap(),
        Some(expected)
    );

    // Switch 2 has no agent; the failure stays local to it.
    assert_eq!(table.get_fabric_reachability(SwitchId::new(2)).unwrap(), None);

    runtime.block_on(agent.shutdown());
}

#[test]
fn test_empty_reachability_is_not_unknown() {
    let base_port = free_port_pair();
    let runtime = Runtime::new().unwrap();
    let agent = start_agent(&runtime, base_port + 1, Reachability::new());

    let table =
        HwSwitchClientTable::with_options(base_port, &two_switches(), fast_options()).unwrap();
    assert_eq!(
        table.get_fabric_reachability(SwitchId::new(2)).unwrap(),
        Some(Reachability::new())
    );

    runtime.block_on(agent.shutdown());
}

#[test]
fn test_agent_restart_recovers() {
    let base_port = free_port_pair();
    let runtime = Runtime::new().unwrap();
    let first = Reachability::from([(100, FabricEndpoint::new(3, 7))]);
    let agent = start_agent(&runtime, base_port, first.clone());

    let table =
        HwSwitchClientTable::with_options(base_port, &two_switches(), fast_options()).unwrap();
    assert_eq!(
        table.get_fabric_reachability(SwitchId::new(1)).unwrap(),
        Some(first)
    );

    runtime.block_on(agent.shutdown());
    let second = Reachability::from([(101, FabricEndpoint::new(4, 9))]);
    let agent = start_agent(&runtime, base_port, second.clone());

    assert_eq!(
        table.get_fabric_reachability(SwitchId::new(1)).unwrap(),
        Some(second)
    );
    runtime.block_on(agent.shutdown());
}

#[test]
fn test_default_host_reaches_ipv6_loopback_agent() {
    let base_port = free_port_pair();
    let runtime = Runtime::new().unwrap();
    let expected = Reachability::from([(100, FabricEndpoint::new(3, 7))]);
    let agent = start_agent(&runtime, base_port, expected.clone());

    let switches = BTreeMap::from([(SwitchId::new(1), SwitchInfo::new(0))]);
    let table = HwSwitchClientTable::new(base_port, &switches).unwrap();
    assert_eq!(
        table.get_fabric_reachability(SwitchId::new(1)).unwrap(),
        Some(expected)
    );

    runtime.block_on(agent.shutdown());
}
