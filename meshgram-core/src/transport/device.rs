use async_trait::async_trait;
use meshtastic::api::state::Configured;
use meshtastic::api::{ConnectedStreamApi, StreamApi};
use meshtastic::packet::{PacketDestination, PacketReceiver, PacketRouter};
use meshtastic::protobufs;
use meshtastic::types::NodeId;
use meshtastic::utils;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{RadioConnector, RadioLink};
use crate::error::{BridgeError, Result};
use crate::event::{EventSink, InboundRadioEvent};
use crate::nodes::{NodeDirectory, NodeInfo, node_id};

/// Port the Meshtastic firmware listens on for API clients
const DEFAULT_TCP_PORT: u16 = 4403;

/// Connects to a Meshtastic node over TCP
#[derive(Debug, Clone, Copy, Default)]
pub struct MeshtasticConnector;

pub struct MeshtasticLink {
    api: Option<ConnectedStreamApi<Configured>>,
    packet_pump: Option<JoinHandle<()>>,
    nodes: NodeDirectory,
}

fn with_default_port(host: &str) -> String {
    if host.contains(':') {
        host.to_string()
    } else {
        format!("{host}:{DEFAULT_TCP_PORT}")
    }
}

#[async_trait]
impl RadioConnector for MeshtasticConnector {
    type Link = MeshtasticLink;

    async fn connect(&self, host: &str, sink: EventSink) -> Result<MeshtasticLink> {
        let address = with_default_port(host);
        info!("Connecting via TCP to {address}");

        let stream = utils::stream::build_tcp_stream(address.clone())
            .await
            .map_err(|e| BridgeError::Transport(format!("TCP connect to {address}: {e}")))?;
        let (packet_receiver, connected_api) = StreamApi::new().connect(stream).await;

        debug!("Configuring connection...");
        let config_id = utils::generate_rand_id();
        let api = connected_api
            .configure(config_id)
            .await
            .map_err(|e| BridgeError::Transport(format!("configure: {e}")))?;

        let nodes = NodeDirectory::new();
        let packet_pump = tokio::spawn(pump_packets(packet_receiver, nodes.clone(), sink));

        Ok(MeshtasticLink {
            api: Some(api),
            packet_pump: Some(packet_pump),
            nodes,
        })
    }
}

#[async_trait]
impl RadioLink for MeshtasticLink {
    async fn send_text(&mut self, text: &str) -> Result<()> {
        let api = self.api.as_mut().ok_or(BridgeError::NotConnected)?;
        let mut router = SilentRouter;

        api.send_text(
            &mut router,
            text.to_string(),
            PacketDestination::Broadcast,
            false,
            0u32.into(),
        )
        .await
        .map_err(|e| BridgeError::Transport(e.to_string()))?;

        debug!("Broadcast {len} bytes on channel 0", len = text.len());
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(pump) = self.packet_pump.take() {
            pump.abort();
        }

        if let Some(api) = self.api.take() {
            api.disconnect()
                .await
                .map_err(|e| BridgeError::Transport(e.to_string()))?;
        }

        Ok(())
    }

    fn nodes(&self) -> NodeDirectory {
        self.nodes.clone()
    }
}

/// Runs on the runtime's worker threads: keeps the node directory current
/// and hands text packets to the sink.
async fn pump_packets(mut receiver: PacketReceiver, nodes: NodeDirectory, sink: EventSink) {
    debug!("Starting packet processing loop");

    while let Some(packet) = receiver.recv().await {
        if let Some(event) = process_from_radio(packet, &nodes).await
            && !sink.deliver(event)
        {
            break;
        }
    }

    warn!("Packet processing loop ended");
}

async fn process_from_radio(
    from_radio: protobufs::FromRadio,
    nodes: &NodeDirectory,
) -> Option<InboundRadioEvent> {
    match from_radio.payload_variant? {
        protobufs::from_radio::PayloadVariant::MyInfo(my_info) => {
            nodes.set_my_node_num(my_info.my_node_num).await;
            debug!("Local node is {}", node_id(my_info.my_node_num));
            None
        }

        protobufs::from_radio::PayloadVariant::NodeInfo(node_info) => {
            let user = node_info.user.unwrap_or_default();
            nodes
                .update_node(NodeInfo {
                    id: node_id(node_info.num),
                    num: node_info.num,
                    long_name: user.long_name,
                    short_name: user.short_name,
                    last_heard: Some(node_info.last_heard as u64),
                })
                .await;
            debug!("Updated node info for {}", node_id(node_info.num));
            None
        }

        protobufs::from_radio::PayloadVariant::Packet(mesh_packet) => {
            text_event(mesh_packet, nodes).await
        }

        _ => None,
    }
}

async fn text_event(
    mesh_packet: protobufs::MeshPacket,
    nodes: &NodeDirectory,
) -> Option<InboundRadioEvent> {
    let data = match mesh_packet.payload_variant.as_ref()? {
        protobufs::mesh_packet::PayloadVariant::Decoded(data) => data,
        protobufs::mesh_packet::PayloadVariant::Encrypted(_) => return None,
    };

    if data.portnum() != protobufs::PortNum::TextMessageApp {
        return None;
    }

    if nodes.my_node_num().await == Some(mesh_packet.from) {
        return None;
    }

    let text = String::from_utf8_lossy(&data.payload).to_string();
    if text.is_empty() {
        return None;
    }

    let received_at = chrono::DateTime::from_timestamp(mesh_packet.rx_time as i64, 0)
        .filter(|_| mesh_packet.rx_time > 0)
        .unwrap_or_else(chrono::Utc::now);

    Some(InboundRadioEvent {
        sender_id: node_id(mesh_packet.from),
        text,
        snr: mesh_packet.rx_snr,
        rssi: mesh_packet.rx_rssi,
        hop_limit: mesh_packet.hop_limit,
        hop_start: mesh_packet.hop_start,
        received_at,
    })
}

/// Outgoing-only router; replies are consumed by the packet pump instead
struct SilentRouter;

impl PacketRouter<(), std::convert::Infallible> for SilentRouter {
    fn handle_packet_from_radio(
        &mut self,
        _packet: protobufs::FromRadio,
    ) -> std::result::Result<(), std::convert::Infallible> {
        Ok(())
    }

    fn handle_mesh_packet(
        &mut self,
        _packet: protobufs::MeshPacket,
    ) -> std::result::Result<(), std::convert::Infallible> {
        Ok(())
    }

    fn source_node_id(&self) -> NodeId {
        0u32.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_port_appended() {
        assert_eq!(with_default_port("192.168.1.1"), "192.168.1.1:4403");
        assert_eq!(with_default_port("mesh.local:4000"), "mesh.local:4000");
    }
}
