//! Sessions over a seeded, impaired link.
//!
//! Both directions lose, duplicate and reorder datagrams. Guaranteed
//! traffic must still get through and be applied exactly once.

mod support;

use arena_net::protocol::{LobbyBody, ResetBody, RoomBody, UpdateBody};
use arena_net::{
    ChannelTransport, EntityId, LossyTransport, NetworkConditions, NoInput, Packet, PacketKind,
    Payload, SyncConfig, SyncCoordinator, SyncEvent,
};
use arena_shared::Vec2;
use support::{ScriptedPeer, CLIENT_ID};

type LossyLink = LossyTransport<ChannelTransport>;

const TICK: f64 = 0.05;

fn lossy_session(
    conditions: NetworkConditions,
    seed: u64,
) -> (SyncCoordinator<LossyLink>, ScriptedPeer<LossyLink>) {
    let (client, server) = ChannelTransport::pair();
    let mut config = SyncConfig::default();
    config.timing.max_resends = 0;

    let sync = SyncCoordinator::new(config, LossyTransport::new(client, conditions, seed));
    let peer = ScriptedPeer::new(LossyTransport::new(server, conditions, seed ^ 0x5eed));
    (sync, peer)
}

fn acks_for(packets: &[Packet], kind: PacketKind, sequence: u32) -> bool {
    packets.iter().any(|p| match p.payload {
        Payload::Ack(body) => body.acked_kind() == Some(kind) && body.acked_sequence == sequence,
        _ => false,
    })
}

#[test]
fn test_guaranteed_traffic_survives_hostile_link() {
    let (mut sync, mut peer) = lossy_session(NetworkConditions::HOSTILE, 7);
    sync.connect(0.0).unwrap();

    let reset = Packet::new(
        500,
        0,
        0.0,
        Payload::GameReset(ResetBody::new(CLIENT_ID, Vec2::new(100.0, 100.0), 0.0)),
    );
    let mut saw_join = false;
    let mut reset_acked = false;
    let mut entered = 0;

    for i in 0..400 {
        let now = f64::from(i) * TICK;

        let received = peer.drain();
        saw_join |= received
            .iter()
            .any(|p| p.payload == Payload::JoinRoom(RoomBody::lobby()));
        reset_acked |= acks_for(&received, PacketKind::GameReset, reset.sequence);
        peer.ack_all(&received);

        // The scripted server keeps re-sending until it hears back
        if saw_join && !reset_acked {
            peer.push_raw(&reset);
        }
        peer.transport.flush().unwrap();

        let report = sync.tick(now, &NoInput);
        entered += report
            .events
            .iter()
            .filter(|e| matches!(e, SyncEvent::EnteredRoom { .. }))
            .count();
    }

    assert!(saw_join);
    assert!(reset_acked);
    assert_eq!(entered, 1);
    assert!(sync.rooms().is_in_room());
    assert_eq!(sync.local().id, EntityId(CLIENT_ID));

    let impaired = *sync.transport().simulation_stats();
    assert!(impaired.dropped > 0);
    assert!(impaired.duplicated > 0);
    assert!(sync.reliability().stats().resends > 0);

    // Heal the link and let the last acks land
    sync.transport_mut().set_conditions(NetworkConditions::PERFECT);
    peer.transport.set_conditions(NetworkConditions::PERFECT);
    for i in 400..420 {
        let received = peer.drain();
        peer.ack_all(&received);
        peer.transport.flush().unwrap();
        sync.tick(f64::from(i) * TICK, &NoInput);
    }
    assert_eq!(sync.reliability().outstanding_len(), 0);
}

#[test]
fn test_duplicated_burst_applied_once() {
    let everything_twice = NetworkConditions {
        packet_loss_percent: 0,
        duplicate_percent: 100,
        out_of_order_percent: 0,
    };
    let (mut sync, mut peer) = lossy_session(everything_twice, 11);
    sync.connect(0.0).unwrap();
    peer.drain();

    peer.push(Payload::LobbyUpdate(LobbyBody::new([0; 8])));
    peer.push(Payload::GameReset(ResetBody::new(CLIENT_ID, Vec2::ZERO, 0.0)));
    peer.push_from(
        7,
        Payload::GameUpdate(UpdateBody::new(
            Vec2::new(1.0, 2.0),
            Vec2::ZERO,
            Vec2::ZERO,
            0.0,
            1,
            0,
        )),
    );

    let report = sync.tick(0.0, &NoInput);
    assert_eq!(report.dispatched, 3);
    assert_eq!(sync.stats().duplicates, 3);
    assert_eq!(
        report.events,
        vec![
            SyncEvent::LobbyUpdated,
            SyncEvent::EnteredRoom {
                id: EntityId(CLIENT_ID)
            },
            SyncEvent::EntitySpawned(EntityId(7)),
        ]
    );

    // One ack per distinct guaranteed packet, even though the client
    // itself sends everything twice
    let sent = peer.drain();
    let acks_on_wire = sent
        .iter()
        .filter(|p| p.kind() == PacketKind::Ack)
        .count();
    assert_eq!(acks_on_wire, 2);
    assert_eq!(sync.stats().acks_sent, 1);
}
