//! Scripted server for driving a `SyncCoordinator` end to end.

#![allow(dead_code)]

use arena_net::protocol::{AckBody, LobbyBody, ResetBody};
use arena_net::{
    decode, encode, ChannelTransport, NoInput, Packet, PacketKind, Payload, SequenceNumber,
    SyncConfig, SyncCoordinator, Transport, PACKET_SIZE,
};
use arena_shared::Vec2;

/// Server id stamped on scripted packets.
pub const SERVER_ID: u8 = 0;

/// Id the scripted server assigns to the client.
pub const CLIENT_ID: u8 = 3;

/// The server end of a link. Generic so tests can impair it.
pub struct ScriptedPeer<T> {
    pub transport: T,
    next_sequence: SequenceNumber,
}

impl<T: Transport> ScriptedPeer<T> {
    pub fn new(mut transport: T) -> Self {
        transport
            .connect("127.0.0.1:5000".parse().unwrap())
            .unwrap();
        Self {
            transport,
            next_sequence: 1000,
        }
    }

    /// Sends `payload` from the server. Returns its sequence number.
    pub fn push(&mut self, payload: Payload) -> SequenceNumber {
        self.push_from(SERVER_ID, payload)
    }

    /// Sends `payload` stamped with an arbitrary sender id.
    pub fn push_from(&mut self, sender: u8, payload: Payload) -> SequenceNumber {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.push_raw(&Packet::new(sequence, sender, 0.0, payload));
        sequence
    }

    /// Sends an exact packet, sequence included.
    pub fn push_raw(&mut self, packet: &Packet) {
        self.transport.send(&encode(packet)).unwrap();
    }

    /// Everything the client sent since the last drain.
    pub fn drain(&mut self) -> Vec<Packet> {
        let mut buffer = [0u8; PACKET_SIZE];
        let mut packets = Vec::new();
        while let Some(len) = self.transport.try_receive(&mut buffer) {
            packets.push(decode(&buffer[..len]).unwrap());
        }
        packets
    }

    /// Acks every guaranteed packet in `packets`.
    pub fn ack_all(&mut self, packets: &[Packet]) {
        for packet in packets.iter().filter(|p| p.is_guaranteed()) {
            self.push(Payload::Ack(AckBody::answering(packet)));
        }
    }
}

/// Kinds of `packets`, in order.
pub fn kinds(packets: &[Packet]) -> Vec<PacketKind> {
    packets.iter().map(Packet::kind).collect()
}

/// A connected client and its server, with the lobby join already drained.
pub fn connected() -> (SyncCoordinator<ChannelTransport>, ScriptedPeer<ChannelTransport>) {
    let (client, server) = ChannelTransport::pair();
    let mut peer = ScriptedPeer::new(server);
    let mut sync = SyncCoordinator::new(SyncConfig::default(), client);
    sync.connect(0.0).unwrap();

    let hello = peer.drain();
    assert_eq!(kinds(&hello), vec![PacketKind::JoinRoom]);
    peer.ack_all(&hello);
    (sync, peer)
}

/// Scripts lobby then room entry, ticks at `now` and drains the replies.
pub fn enter_room(
    sync: &mut SyncCoordinator<ChannelTransport>,
    peer: &mut ScriptedPeer<ChannelTransport>,
    now: f64,
) {
    peer.push(Payload::LobbyUpdate(LobbyBody::new([1, 0, 0, 0, 0, 0, 0, 0])));
    peer.push(Payload::GameReset(ResetBody::new(
        CLIENT_ID,
        Vec2::new(250.0, 250.0),
        0.0,
    )));
    sync.tick(now, &NoInput);
    assert!(sync.rooms().is_in_room());
    peer.drain();
}
