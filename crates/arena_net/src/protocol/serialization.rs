//! # Packet Serialization
//!
//! Zero-allocation serialization for network packets.
//!
//! ## Design
//!
//! - Fixed-size output buffer (every packet is [`PACKET_SIZE`] bytes)
//! - Little-endian scalars, Pod bodies copied verbatim
//! - Unused payload bytes are always zero, so equal packets encode equally

use bytemuck::{bytes_of, Pod};

use super::packets::{
    AckBody, FireBody, HitBody, LobbyBody, Packet, PacketKind, Payload, ResetBody, RespawnBody,
    RoomBody, UpdateBody, HEADER_SIZE, PACKET_SIZE, PAYLOAD_SIZE,
};
use crate::error::DecodeError;

/// Packet serializer - writes one packet into a fixed buffer.
///
/// Reusable across packets to avoid re-zeroing a fresh array each time.
pub struct PacketSerializer {
    buffer: [u8; PACKET_SIZE],
    position: usize,
}

impl PacketSerializer {
    /// Creates a new serializer with a zeroed buffer.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            buffer: [0u8; PACKET_SIZE],
            position: 0,
        }
    }

    /// Resets the serializer for reuse.
    #[inline]
    pub fn reset(&mut self) {
        self.buffer = [0u8; PACKET_SIZE];
        self.position = 0;
    }

    /// Returns the number of bytes written.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.position
    }

    /// Returns true if no bytes have been written.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.position == 0
    }

    /// Returns the full packet buffer.
    #[inline]
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; PACKET_SIZE] {
        &self.buffer
    }

    #[inline]
    fn write_bytes(&mut self, bytes: &[u8]) {
        let end = self.position + bytes.len();
        self.buffer[self.position..end].copy_from_slice(bytes);
        self.position = end;
    }

    /// Writes a single byte.
    #[inline]
    pub fn write_u8(&mut self, value: u8) {
        self.write_bytes(&[value]);
    }

    /// Writes a u32 in little-endian format.
    #[inline]
    pub fn write_u32(&mut self, value: u32) {
        self.write_bytes(&value.to_le_bytes());
    }

    /// Writes a f64 in little-endian format.
    #[inline]
    pub fn write_f64(&mut self, value: f64) {
        self.write_bytes(&value.to_le_bytes());
    }

    /// Writes a Pod type directly.
    #[inline]
    pub fn write_pod<T: Pod>(&mut self, value: &T) {
        self.write_bytes(bytes_of(value));
    }

    /// Serializes a complete packet and returns the encoded bytes.
    pub fn serialize(&mut self, packet: &Packet) -> &[u8; PACKET_SIZE] {
        self.reset();
        self.write_u8(packet.kind() as u8);
        self.write_u32(packet.sequence);
        self.write_u8(packet.sender_id);
        self.write_f64(packet.timestamp);
        self.write_payload(&packet.payload);
        &self.buffer
    }

    fn write_payload(&mut self, payload: &Payload) {
        match payload {
            Payload::JoinRoom(body) | Payload::CreateRoom(body) => self.write_pod(body),
            Payload::LobbyUpdate(body) => self.write_pod(body),
            Payload::GameReset(body) => self.write_pod(body),
            Payload::GameUpdate(body) => self.write_pod(body),
            Payload::Hit(body) => self.write_pod(body),
            Payload::Fire(body) => self.write_pod(body),
            Payload::Respawn(body) => self.write_pod(body),
            Payload::Ack(body) | Payload::Nack(body) => self.write_pod(body),
            Payload::ReturnToLobby | Payload::KeepAlive => {}
        }
    }
}

impl Default for PacketSerializer {
    fn default() -> Self {
        Self::new()
    }
}

/// Packet deserializer - reads one packet from a received datagram.
pub struct PacketDeserializer<'a> {
    buffer: &'a [u8],
    position: usize,
}

impl<'a> PacketDeserializer<'a> {
    /// Creates a new deserializer from a buffer.
    #[must_use]
    pub const fn new(buffer: &'a [u8]) -> Self {
        Self {
            buffer,
            position: 0,
        }
    }

    #[inline]
    fn read_array<const N: usize>(&mut self) -> Option<[u8; N]> {
        let end = self.position.checked_add(N)?;
        let bytes = self.buffer.get(self.position..end)?.try_into().ok()?;
        self.position = end;
        Some(bytes)
    }

    /// Reads a single byte.
    #[inline]
    pub fn read_u8(&mut self) -> Option<u8> {
        self.read_array::<1>().map(|[value]| value)
    }

    /// Reads a u32 in little-endian format.
    #[inline]
    pub fn read_u32(&mut self) -> Option<u32> {
        self.read_array().map(u32::from_le_bytes)
    }

    /// Reads a f64 in little-endian format.
    #[inline]
    pub fn read_f64(&mut self) -> Option<f64> {
        self.read_array().map(f64::from_le_bytes)
    }

    /// Reads a Pod type directly, then skips to the end of the payload
    /// area.
    #[inline]
    pub fn read_pod<T: Pod>(&mut self) -> Option<T> {
        let size = std::mem::size_of::<T>();
        let slice = self.buffer.get(self.position..self.position + size)?;
        self.position += size;
        bytemuck::try_pod_read_unaligned(slice).ok()
    }

    /// Deserializes a packet from the buffer.
    ///
    /// # Errors
    ///
    /// [`DecodeError::WrongSize`] unless the buffer is exactly
    /// [`PACKET_SIZE`] bytes, [`DecodeError::UnknownKind`] if the type tag
    /// names no packet kind.
    pub fn deserialize(&mut self) -> Result<Packet, DecodeError> {
        let truncated = DecodeError::wrong_size(self.buffer.len());
        if self.buffer.len() != PACKET_SIZE {
            return Err(truncated);
        }

        let tag = self.read_u8().ok_or(truncated)?;
        let kind = PacketKind::from_u8(tag).ok_or(DecodeError::UnknownKind(tag))?;
        let sequence = self.read_u32().ok_or(truncated)?;
        let sender_id = self.read_u8().ok_or(truncated)?;
        let timestamp = self.read_f64().ok_or(truncated)?;
        debug_assert_eq!(self.position, HEADER_SIZE);

        let payload = self.read_payload(kind).ok_or(truncated)?;
        Ok(Packet::new(sequence, sender_id, timestamp, payload))
    }

    fn read_payload(&mut self, kind: PacketKind) -> Option<Payload> {
        Some(match kind {
            PacketKind::JoinRoom => Payload::JoinRoom(self.read_pod::<RoomBody>()?),
            PacketKind::CreateRoom => Payload::CreateRoom(self.read_pod::<RoomBody>()?),
            PacketKind::LobbyUpdate => Payload::LobbyUpdate(self.read_pod::<LobbyBody>()?),
            PacketKind::GameReset => Payload::GameReset(self.read_pod::<ResetBody>()?),
            PacketKind::GameUpdate => Payload::GameUpdate(self.read_pod::<UpdateBody>()?),
            PacketKind::Hit => Payload::Hit(self.read_pod::<HitBody>()?),
            PacketKind::Fire => Payload::Fire(self.read_pod::<FireBody>()?),
            PacketKind::Respawn => Payload::Respawn(self.read_pod::<RespawnBody>()?),
            PacketKind::ReturnToLobby => Payload::ReturnToLobby,
            PacketKind::Ack => Payload::Ack(self.read_pod::<AckBody>()?),
            PacketKind::Nack => Payload::Nack(self.read_pod::<AckBody>()?),
            PacketKind::KeepAlive => Payload::KeepAlive,
        })
    }
}

impl Payload {
    /// Payload area as it appears on the wire, zero-filled past the body.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; PAYLOAD_SIZE] {
        let mut serializer = PacketSerializer::new();
        serializer.write_payload(self);
        let mut bytes = [0u8; PAYLOAD_SIZE];
        bytes.copy_from_slice(&serializer.as_bytes()[..PAYLOAD_SIZE]);
        bytes
    }
}

/// Encodes a packet into its fixed-size wire form.
#[must_use]
pub fn encode(packet: &Packet) -> [u8; PACKET_SIZE] {
    *PacketSerializer::new().serialize(packet)
}

/// Decodes one datagram.
///
/// # Errors
///
/// See [`PacketDeserializer::deserialize`].
pub fn decode(bytes: &[u8]) -> Result<Packet, DecodeError> {
    PacketDeserializer::new(bytes).deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use arena_shared::Vec2;

    fn sample_packets() -> Vec<Packet> {
        vec![
            Packet::new(1, 0, 0.0, Payload::JoinRoom(RoomBody::lobby())),
            Packet::new(2, 0, 0.5, Payload::CreateRoom(RoomBody::new(4))),
            Packet::new(3, 0, 1.0, Payload::LobbyUpdate(LobbyBody::new([0, 8, 3, 0, 0, 0, 0, 1]))),
            Packet::new(4, 0, 1.5, Payload::GameReset(ResetBody::new(5, Vec2::new(1.0, 2.0), 90.0))),
            Packet::new(
                5,
                7,
                2.0,
                Payload::GameUpdate(UpdateBody::new(
                    Vec2::new(10.0, 20.0),
                    Vec2::new(1.0, 0.0),
                    Vec2::new(0.0, -0.5),
                    45.0,
                    1,
                    12,
                )),
            ),
            Packet::new(6, 0, 2.5, Payload::Hit(HitBody { target_id: 3, damage: 1 })),
            Packet::new(7, 2, 3.0, Payload::Fire(FireBody { instigator_id: 2 })),
            Packet::new(8, 0, 3.5, Payload::Respawn(RespawnBody { position: Vec2::new(9.0, 9.0), orientation: -90.0 })),
            Packet::new(9, 0, 4.0, Payload::ReturnToLobby),
            Packet::new(10, 1, 4.5, Payload::Ack(AckBody::new(PacketKind::Fire, 7))),
            Packet::new(11, 1, 5.0, Payload::Nack(AckBody::new(PacketKind::JoinRoom, 1))),
            Packet::new(u32::MAX, 255, 1e9, Payload::KeepAlive),
        ]
    }

    #[test]
    fn test_every_kind_roundtrips() {
        for packet in sample_packets() {
            let bytes = encode(&packet);
            assert_eq!(bytes.len(), PACKET_SIZE);

            let decoded = decode(&bytes).expect("valid packet");
            assert_eq!(decoded, packet);
            assert_eq!(decoded.payload, packet.payload);
            assert_eq!(decoded.timestamp.to_bits(), packet.timestamp.to_bits());
        }
    }

    #[test]
    fn test_header_layout_is_little_endian() {
        let packet = Packet::new(0x0403_0201, 9, 1.0, Payload::KeepAlive);
        let bytes = encode(&packet);

        assert_eq!(bytes[0], PacketKind::KeepAlive as u8);
        assert_eq!(&bytes[1..5], &[1, 2, 3, 4]);
        assert_eq!(bytes[5], 9);
        assert_eq!(&bytes[6..14], &1.0f64.to_le_bytes());
        assert!(bytes[HEADER_SIZE..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_short_body_is_zero_padded() {
        let packet = Packet::new(1, 0, 0.0, Payload::Hit(HitBody { target_id: 4, damage: 2 }));
        let bytes = encode(&packet);
        assert_eq!(&bytes[HEADER_SIZE..HEADER_SIZE + 2], &[4, 2]);
        assert!(bytes[HEADER_SIZE + 2..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_wrong_size_rejected() {
        let bytes = encode(&Packet::new(1, 0, 0.0, Payload::KeepAlive));

        assert_eq!(decode(&bytes[..PACKET_SIZE - 1]), Err(DecodeError::wrong_size(PACKET_SIZE - 1)));
        assert_eq!(decode(&[]), Err(DecodeError::wrong_size(0)));

        let mut long = bytes.to_vec();
        long.push(0);
        assert_eq!(decode(&long), Err(DecodeError::wrong_size(PACKET_SIZE + 1)));
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let mut bytes = encode(&Packet::new(1, 0, 0.0, Payload::KeepAlive));
        bytes[0] = 0;
        assert_eq!(decode(&bytes), Err(DecodeError::UnknownKind(0)));
        bytes[0] = 200;
        assert_eq!(decode(&bytes), Err(DecodeError::UnknownKind(200)));
    }

    #[test]
    fn test_serializer_reuse_clears_previous_payload() {
        let mut serializer = PacketSerializer::new();
        let update = Packet::new(
            1,
            0,
            0.0,
            Payload::GameUpdate(UpdateBody::new(Vec2::new(5.0, 5.0), Vec2::ZERO, Vec2::ZERO, 0.0, 1, 0)),
        );
        serializer.serialize(&update);
        let keep_alive = *serializer.serialize(&Packet::new(2, 0, 0.0, Payload::KeepAlive));

        assert!(keep_alive[HEADER_SIZE..].iter().all(|&b| b == 0));
        assert_eq!(serializer.len(), HEADER_SIZE);
    }

    #[test]
    fn test_payload_bytes_match_wire() {
        let packet = Packet::new(1, 0, 0.0, Payload::Fire(FireBody { instigator_id: 6 }));
        let bytes = encode(&packet);
        assert_eq!(&bytes[HEADER_SIZE..], &packet.payload.to_bytes());
    }
}
