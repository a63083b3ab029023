use crate::resolver::{ArpResolver, Decision};
use crate::services::{ConnectPoint, OutboundPacket, PacketService};
use arproxy_packets::EthernetFrame;
use std::sync::Arc;

/// One inbound frame as handed to packet processors by the dispatch fabric.
#[derive(Clone, Debug)]
pub struct PacketContext {
    received_from: ConnectPoint,
    frame: EthernetFrame,
    handled: bool,
}

impl PacketContext {
    pub fn new(received_from: ConnectPoint, frame: EthernetFrame) -> Self {
        PacketContext {
            received_from,
            frame,
            handled: false,
        }
    }

    pub fn received_from(&self) -> &ConnectPoint {
        &self.received_from
    }

    pub fn frame(&self) -> &EthernetFrame {
        &self.frame
    }

    pub fn is_handled(&self) -> bool {
        self.handled
    }

    /// Marks the packet consumed so no later processor acts on it. Returns false if it already was.
    pub fn block(&mut self) -> bool {
        !std::mem::replace(&mut self.handled, true)
    }
}

/// Called by the dispatch fabric for every packet it delivers, possibly from many threads at once.
pub trait PacketProcessor: Send + Sync {
    fn process(&self, context: &mut PacketContext);
}

/// Runs inbound ARP through the resolver and carries out its decision.
pub struct ArpPacketProcessor {
    resolver: ArpResolver,
    packets: Arc<dyn PacketService>,
}

impl ArpPacketProcessor {
    pub fn new(resolver: ArpResolver, packets: Arc<dyn PacketService>) -> Self {
        ArpPacketProcessor { resolver, packets }
    }

    fn apply(&self, received_from: &ConnectPoint, decision: Decision) {
        let (port, frame) = match decision {
            Decision::Emit(frame) => (received_from.port, frame),
            Decision::Forward(port, frame) => (port, frame),
            Decision::Drop => return,
        };
        self.packets.emit(OutboundPacket {
            device: received_from.device.clone(),
            port,
            frame,
        });
    }
}

impl PacketProcessor for ArpPacketProcessor {
    fn process(&self, context: &mut PacketContext) {
        if context.is_handled() {
            return;
        }

        let decision = match self.resolver.resolve(context.received_from(), context.frame()) {
            Some(decision) => decision,
            None => return,
        };
        self.apply(context.received_from(), decision);
        context.block();
    }
}
