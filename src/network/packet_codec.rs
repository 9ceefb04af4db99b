//! Encoding and decoding of [`Packet`]s.
//!
//! # Wire format
//!
//! A packet is a sequence of 32-bit little-endian words. Floats are stored by
//! bit pattern, booleans as `0`/`1`.
//!
//! | Section | Words |
//! |---------|-------|
//! | header | `sync`, `sender`, `ack_tic`, `tic` |
//! | event range | `events_count`, `first_tic` |
//! | snapshot flag | `has_snapshot` |
//! | events | per tic in the range: flags word, then buttons / spawn `x y z` / client as flagged |
//! | snapshot | `map_seed`, `start_seed`, `actor_count`, per actor: kind, client, buttons, position, velocity |
//! | debug trailer | only with [`WireConfig::debug_trailer`]: `has_debug`, then `byte_len` and the padded bincode payload |
//!
//! The tic of an event is never written: it is `first_tic` plus the entry's
//! index. Tics inside the range without an event cost one zero flags word,
//! and decode as [placeholders](ClientEvent::is_placeholder).
//!
//! With [`CompressionMode::Rle`] the word stream passes through
//! [`rle`](crate::rle) in both directions.

use std::sync::Arc;

use crate::buttons::InputButtons;
use crate::config::{CompressionMode, WireConfig};
use crate::error::{CorruptReason, InvalidRequestKind, SizeUnit};
use crate::network::buffers::{WireBuffers, WordReader, WordWriter};
use crate::network::codec;
use crate::network::packet::{
    ActorInit, ClientEvent, DebugPayload, EventFlags, Packet, Snapshot, Vec3,
};
use crate::report_diagnostic_to;
use crate::rle::WORD_BYTES;
use crate::state::ActorKind;
use crate::telemetry::{DiagnosticKind, DiagnosticObserver, DiagnosticSeverity};
use crate::{ClientId, Result, Tic, TicwireError};

/// Words of the fixed header: header, event range and snapshot flag.
pub const HEADER_WORDS: usize = 7;

const SNAPSHOT_HEADER_WORDS: usize = 3;

/// Encodes and decodes packets through an owned set of scratch buffers.
///
/// Every call takes `&mut self`: the buffer returned by [`encode`](Self::encode)
/// stays valid until the next call on the same codec.
///
/// # Example
///
/// ```
/// use ticwire::{ClientEvent, ClientId, Packet, PacketCodec, Tic, WireConfig};
/// use ticwire::buttons::InputButtons;
///
/// let mut codec = PacketCodec::new(WireConfig::uncompressed())?;
/// let packet = Packet {
///     sender: ClientId::new(1),
///     events: vec![
///         ClientEvent::buttons(Tic::new(5), InputButtons::from_bits(1)),
///         ClientEvent::buttons(Tic::new(8), InputButtons::from_bits(2)),
///     ],
///     ..Packet::default()
/// };
///
/// // Seven header words, four flags words and two button words.
/// assert_eq!(codec.encode(&packet)?.len(), 13 * 4);
///
/// let bytes = codec.encode_to_vec(&packet)?;
/// let decoded = codec.decode(&bytes)?;
/// assert_eq!(decoded.events.len(), 4);
/// assert_eq!(decoded.active_events().count(), 2);
/// # Ok::<(), ticwire::TicwireError>(())
/// ```
pub struct PacketCodec {
    config: WireConfig,
    buffers: WireBuffers,
    observer: Option<Arc<dyn DiagnosticObserver>>,
}

impl std::fmt::Debug for PacketCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PacketCodec")
            .field("config", &self.config)
            .field("has_observer", &self.observer.is_some())
            .finish_non_exhaustive()
    }
}

impl PacketCodec {
    /// Creates a codec, allocating its scratch buffers once.
    ///
    /// # Errors
    ///
    /// Returns [`TicwireError::InvalidConfig`] if `config` does not validate.
    pub fn new(config: WireConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            buffers: WireBuffers::new(config.capacity_words),
            observer: None,
        })
    }

    /// Sends diagnostics to `observer` instead of the default tracing observer.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn DiagnosticObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// The configuration this codec was created with.
    #[must_use]
    pub fn config(&self) -> &WireConfig {
        &self.config
    }

    /// Encodes `packet`, returning a view of the scratch buffer.
    ///
    /// Events are written in tic order; `packet` itself is not modified.
    ///
    /// # Errors
    ///
    /// - [`TicwireError::InvalidRequest`] if two events share a tic or the
    ///   event range spans more than `u32::MAX` tics.
    /// - [`TicwireError::EncodeOverflow`] in words if the encoding exceeds the
    ///   word capacity, or in bytes if the compressed form exceeds the byte
    ///   capacity. Nothing is truncated.
    /// - [`TicwireError::Serialization`] if the debug payload fails to serialize.
    pub fn encode(&mut self, packet: &Packet) -> Result<&[u8]> {
        let words = match self.write_words(packet) {
            Ok(words) => words,
            Err(err) => {
                self.report_encode_failure(&err);
                return Err(err);
            },
        };

        match self.config.compression {
            CompressionMode::None => {
                tracing::trace!(words, "encoded packet");
                Ok(self.buffers.word_bytes(words))
            },
            CompressionMode::Rle => match self.buffers.compress(words) {
                Ok(bytes) => {
                    tracing::trace!(words, bytes, "encoded packet");
                    Ok(self.buffers.compressed(bytes))
                },
                Err(err) => {
                    self.report_encode_failure(&err);
                    Err(err)
                },
            },
        }
    }

    /// Encodes `packet` into an owned buffer.
    ///
    /// # Errors
    ///
    /// Same as [`encode`](Self::encode).
    pub fn encode_to_vec(&mut self, packet: &Packet) -> Result<Vec<u8>> {
        self.encode(packet).map(<[u8]>::to_vec)
    }

    /// Decodes a received buffer.
    ///
    /// A rejected buffer is never partially returned. Each rejection is also
    /// reported as a [`DiagnosticKind::MalformedPacket`] warning.
    ///
    /// # Errors
    ///
    /// - [`TicwireError::DecodeTruncated`] if the buffer ends before a required field.
    /// - [`TicwireError::DecodeCorrupt`] for every malformed layout, see
    ///   [`CorruptReason`].
    pub fn decode(&mut self, bytes: &[u8]) -> Result<Packet> {
        let result = self.load(bytes).and_then(|words| {
            let reader = self.buffers.reader(words);
            read_packet(reader, &self.config)
        });
        if let Err(err) = &result {
            report_diagnostic_to!(
                &self.observer,
                DiagnosticSeverity::Warning,
                DiagnosticKind::MalformedPacket,
                "dropped packet of {} bytes: {}",
                bytes.len(),
                err
            );
        }
        result
    }

    fn load(&mut self, bytes: &[u8]) -> Result<usize> {
        match self.config.compression {
            CompressionMode::None => self.buffers.load_words(bytes),
            CompressionMode::Rle => self.buffers.decompress(bytes),
        }
    }

    fn report_encode_failure(&self, err: &TicwireError) {
        if let TicwireError::EncodeOverflow { .. } = err {
            report_diagnostic_to!(
                &self.observer,
                DiagnosticSeverity::Warning,
                DiagnosticKind::EncodeOverflow,
                "packet not sent: {}",
                err
            );
        }
    }

    /// Validates `packet`, sizes it and writes its words. Returns the word count.
    fn write_words(&mut self, packet: &Packet) -> Result<usize> {
        let range = self.sort_events(packet)?;

        let debug = if self.config.debug_trailer {
            self.buffers.trailer.clear();
            if let Some(debug) = &packet.debug {
                codec::encode_append(debug, &mut self.buffers.trailer)?;
            }
            Some(packet.debug.is_some())
        } else {
            None
        };

        let required = encoded_words(packet, range, debug.map(|_| self.buffers.trailer.len()));
        let capacity = self.buffers.capacity_words();
        if required > capacity {
            return Err(TicwireError::EncodeOverflow {
                required,
                capacity,
                unit: SizeUnit::Words,
            });
        }

        let (mut writer, order, trailer) = self.buffers.writer_with_scratch();
        write_header(&mut writer, packet, range)?;
        write_events(&mut writer, packet, order, range)?;
        if let Some(snapshot) = &packet.snapshot {
            write_snapshot(&mut writer, snapshot)?;
        }
        if let Some(has_debug) = debug {
            writer.push_bool(has_debug)?;
            if has_debug {
                writer.push(trailer.len() as u32)?;
                writer.push_padded(trailer)?;
            }
        }
        debug_assert_eq!(writer.len(), required);
        Ok(writer.len())
    }

    /// Sorts the event index by tic and returns the event range as
    /// `(first_tic, events_count)`.
    fn sort_events(&mut self, packet: &Packet) -> Result<Option<(Tic, u32)>> {
        let events = &packet.events;
        let order = &mut self.buffers.order;
        order.clear();
        order.extend(0..events.len());
        order.sort_by_key(|&i| events[i].tic);

        for pair in order.windows(2) {
            let (prev, next) = (&events[pair[0]], &events[pair[1]]);
            if prev.tic == next.tic {
                return Err(TicwireError::InvalidRequest {
                    kind: InvalidRequestKind::DuplicateEventTic {
                        tic: next.tic,
                        client: next.client,
                    },
                });
            }
        }

        let (Some(&first), Some(&last)) = (order.first(), order.last()) else {
            return Ok(None);
        };
        let (first, last) = (events[first].tic, events[last].tic);
        let Ok(count) = u32::try_from(last - first + 1) else {
            return Err(TicwireError::InvalidRequest {
                kind: InvalidRequestKind::EventRangeTooWide { first, last },
            });
        };
        Ok(Some((first, count)))
    }
}

/// Number of words `packet` encodes to, given its event range and, when the
/// trailer is enabled, the serialized debug payload length.
fn encoded_words(packet: &Packet, range: Option<(Tic, u32)>, trailer: Option<usize>) -> usize {
    let mut words = HEADER_WORDS;
    if let Some((_, count)) = range {
        words += count as usize;
        words += packet
            .events
            .iter()
            .map(|e| EventFlags::of(e).payload_words())
            .sum::<usize>();
    }
    if let Some(snapshot) = &packet.snapshot {
        words += SNAPSHOT_HEADER_WORDS + snapshot.actors.len() * ActorInit::WIRE_WORDS;
    }
    if let Some(trailer_len) = trailer {
        words += 1;
        if packet.debug.is_some() {
            words += 1 + trailer_len.div_ceil(WORD_BYTES);
        }
    }
    words
}

fn write_header(
    writer: &mut WordWriter<'_>,
    packet: &Packet,
    range: Option<(Tic, u32)>,
) -> Result<()> {
    let (first_tic, count) = range.unwrap_or((Tic::ZERO, 0));
    writer.push_bool(packet.sync)?;
    writer.push(packet.sender.as_u32())?;
    writer.push(packet.ack_tic.as_u32())?;
    writer.push(packet.tic.as_u32())?;
    writer.push(count)?;
    writer.push(first_tic.as_u32())?;
    writer.push_bool(packet.snapshot.is_some())
}

fn write_events(
    writer: &mut WordWriter<'_>,
    packet: &Packet,
    order: &[usize],
    range: Option<(Tic, u32)>,
) -> Result<()> {
    let Some((first_tic, count)) = range else {
        return Ok(());
    };
    let mut sorted = order.iter().map(|&i| &packet.events[i]).peekable();
    for offset in 0..count {
        let tic = first_tic + offset;
        match sorted.next_if(|e| e.tic == tic) {
            Some(event) => write_event(writer, event)?,
            None => writer.push(0)?,
        }
    }
    Ok(())
}

fn write_event(writer: &mut WordWriter<'_>, event: &ClientEvent) -> Result<()> {
    writer.push(EventFlags::of(event).bits())?;
    if let Some(buttons) = event.buttons {
        writer.push(buttons.bits())?;
    }
    if let Some(spawn) = event.spawn {
        write_vec3(writer, spawn)?;
    }
    if let Some(client) = event.client {
        writer.push(client.as_u32())?;
    }
    Ok(())
}

fn write_snapshot(writer: &mut WordWriter<'_>, snapshot: &Snapshot) -> Result<()> {
    writer.push(snapshot.map_seed)?;
    writer.push(snapshot.start_seed)?;
    writer.push(snapshot.actors.len() as u32)?;
    for actor in &snapshot.actors {
        writer.push(actor.kind as u32)?;
        writer.push(actor.client.as_u32())?;
        writer.push(actor.buttons.bits())?;
        write_vec3(writer, actor.position)?;
        write_vec3(writer, actor.velocity)?;
    }
    Ok(())
}

fn write_vec3(writer: &mut WordWriter<'_>, v: Vec3) -> Result<()> {
    writer.push_f32(v.x)?;
    writer.push_f32(v.y)?;
    writer.push_f32(v.z)
}

fn read_packet(mut reader: WordReader<'_>, config: &WireConfig) -> Result<Packet> {
    let capacity_words = config.capacity_words;

    let sync = reader.next_bool()?;
    let sender = ClientId::new(reader.next_u32()?);
    let ack_tic = Tic::new(reader.next_u32()?);
    let tic = Tic::new(reader.next_u32()?);
    let count = reader.next_u32()?;
    let first_tic = reader.next_u32()?;
    let has_snapshot = reader.next_bool()?;

    if count as usize > capacity_words {
        return Err(TicwireError::corrupt(CorruptReason::EventCountOutOfBounds {
            count,
            capacity_words,
        }));
    }
    if count > 0 && first_tic.checked_add(count - 1).is_none() {
        return Err(TicwireError::corrupt(CorruptReason::TicRangeOverflow {
            first_tic,
            count,
        }));
    }

    let mut events = Vec::with_capacity(count as usize);
    for offset in 0..count {
        events.push(read_event(&mut reader, Tic::new(first_tic + offset))?);
    }

    let snapshot = if has_snapshot {
        Some(read_snapshot(&mut reader, capacity_words)?)
    } else {
        None
    };

    let debug = if config.debug_trailer {
        read_debug(&mut reader)?
    } else {
        None
    };

    if reader.remaining() > 0 {
        return Err(TicwireError::corrupt(CorruptReason::TrailingWords {
            remaining: reader.remaining(),
        }));
    }

    Ok(Packet {
        sync,
        sender,
        ack_tic,
        tic,
        events,
        snapshot,
        debug,
    })
}

fn read_event(reader: &mut WordReader<'_>, tic: Tic) -> Result<ClientEvent> {
    let word = reader.next_u32()?;
    let flags = EventFlags::from_word(word).ok_or(TicwireError::corrupt(
        CorruptReason::UnknownEventFlags { tic, flags: word },
    ))?;
    let buttons = if flags.has(EventFlags::BUTTONS) {
        Some(InputButtons::from_bits(reader.next_u32()?))
    } else {
        None
    };
    let spawn = if flags.has(EventFlags::SPAWN) {
        Some(read_vec3(reader)?)
    } else {
        None
    };
    let client = if flags.has(EventFlags::CLIENT) {
        Some(ClientId::new(reader.next_u32()?))
    } else {
        None
    };
    Ok(ClientEvent {
        tic,
        buttons,
        spawn,
        client,
    })
}

fn read_snapshot(reader: &mut WordReader<'_>, capacity_words: usize) -> Result<Snapshot> {
    let map_seed = reader.next_u32()?;
    let start_seed = reader.next_u32()?;
    let actor_count = reader.next_u32()?;
    if (actor_count as usize).saturating_mul(ActorInit::WIRE_WORDS) > capacity_words {
        return Err(TicwireError::corrupt(CorruptReason::ActorCountOutOfBounds {
            count: actor_count,
            capacity_words,
        }));
    }

    let mut actors = Vec::with_capacity(actor_count as usize);
    for _ in 0..actor_count {
        let offset = reader.offset();
        let value = reader.next_u32()?;
        let kind = match ActorKind::try_from(value) {
            Ok(kind) => kind,
            Err(_) => {
                return Err(TicwireError::corrupt(CorruptReason::UnknownActorKind {
                    offset,
                    value,
                }));
            },
        };
        actors.push(ActorInit {
            kind,
            client: ClientId::new(reader.next_u32()?),
            buttons: InputButtons::from_bits(reader.next_u32()?),
            position: read_vec3(reader)?,
            velocity: read_vec3(reader)?,
        });
    }

    Ok(Snapshot {
        map_seed,
        start_seed,
        actors,
    })
}

fn read_debug(reader: &mut WordReader<'_>) -> Result<Option<DebugPayload>> {
    if !reader.next_bool()? {
        return Ok(None);
    }
    let byte_len = reader.next_u32()?;
    let bytes = reader.next_padded(byte_len as usize)?;
    codec::decode_exact(bytes).map(Some)
}

fn read_vec3(reader: &mut WordReader<'_>) -> Result<Vec3> {
    Ok(Vec3 {
        x: reader.next_f32()?,
        y: reader.next_f32()?,
        z: reader.next_f32()?,
    })
}

#[cfg(test)]
#[allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use crate::assert_diagnostic;
    use crate::state::{ActorRecord, StateData};
    use crate::telemetry::CollectingObserver;

    fn buttons(tic: u32, bits: u32) -> ClientEvent {
        ClientEvent::buttons(Tic::new(tic), InputButtons::from_bits(bits))
    }

    fn gap_packet() -> Packet {
        Packet {
            sender: ClientId::new(3),
            ack_tic: Tic::new(2),
            tic: Tic::new(9),
            events: vec![buttons(8, 0x2), buttons(5, 0x1)],
            ..Packet::default()
        }
    }

    fn codec(config: WireConfig) -> PacketCodec {
        PacketCodec::new(config).unwrap()
    }

    fn words(bytes: &[u8]) -> Vec<u32> {
        bytes
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes(c.try_into().unwrap()))
            .collect()
    }

    fn snapshot(actors: usize) -> Snapshot {
        Snapshot {
            map_seed: 77,
            start_seed: 0x1234_5678,
            actors: (0..actors)
                .map(|i| ActorInit {
                    kind: ActorKind::ALL[i % ActorKind::COUNT],
                    client: ClientId::new(i as u32),
                    buttons: InputButtons::from_bits(0x40 * i as u32),
                    position: Vec3::new(i as f32, -1.5, 0.25),
                    velocity: Vec3::new(0.0, -0.0, f32::MIN_POSITIVE),
                })
                .collect(),
        }
    }

    #[test]
    fn test_gap_layout() {
        let mut codec = codec(WireConfig::uncompressed());
        let encoded = words(codec.encode(&gap_packet()).unwrap());
        assert_eq!(
            encoded,
            vec![0, 3, 2, 9, 4, 5, 0, 1, 0x1, 0, 0, 1, 0x2],
            "header, range, flag-word per tic, buttons for tics 5 and 8"
        );
    }

    #[test]
    fn test_gap_fidelity() {
        let mut codec = codec(WireConfig::default());
        let bytes = codec.encode_to_vec(&gap_packet()).unwrap();
        let decoded = codec.decode(&bytes).unwrap();

        let tics: Vec<u32> = decoded.events.iter().map(|e| e.tic.as_u32()).collect();
        assert_eq!(tics, vec![5, 6, 7, 8]);
        assert!(!decoded.events[0].is_placeholder());
        assert!(decoded.events[1].is_placeholder());
        assert!(decoded.events[2].is_placeholder());
        assert_eq!(decoded.events[3].buttons, Some(InputButtons::from_bits(0x2)));

        let active: Vec<ClientEvent> = decoded.active_events().copied().collect();
        let mut expected = gap_packet().events;
        expected.sort_by_key(|e| e.tic);
        assert_eq!(active, expected);
    }

    #[test]
    fn test_encode_does_not_mutate_packet() {
        let packet = gap_packet();
        let before = packet.clone();
        codec(WireConfig::default()).encode(&packet).unwrap();
        assert_eq!(packet, before);
    }

    #[test]
    fn test_empty_packet_is_header_only() {
        let mut codec = codec(WireConfig::uncompressed());
        let encoded = words(codec.encode(&Packet::default()).unwrap());
        assert_eq!(encoded, vec![0; HEADER_WORDS]);
        let bytes = codec.encode_to_vec(&Packet::default()).unwrap();
        assert_eq!(codec.decode(&bytes).unwrap(), Packet::default());
    }

    #[test]
    fn test_all_event_fields_roundtrip() {
        let packet = Packet {
            sync: true,
            sender: ClientId::new(1),
            tic: Tic::new(100),
            events: vec![
                ClientEvent {
                    tic: Tic::new(99),
                    buttons: Some(InputButtons::from_bits(0xFFFF_FFFF)),
                    spawn: Some(Vec3::new(1.0, f32::NAN, -3.5)),
                    client: Some(ClientId::new(6)),
                },
                ClientEvent {
                    tic: Tic::new(100),
                    buttons: None,
                    spawn: None,
                    client: Some(ClientId::new(2)),
                },
            ],
            ..Packet::default()
        };
        for config in [WireConfig::default(), WireConfig::uncompressed()] {
            let mut codec = codec(config);
            let bytes = codec.encode_to_vec(&packet).unwrap();
            let decoded = codec.decode(&bytes).unwrap();
            let spawn = decoded.events[0].spawn.unwrap();
            assert!(spawn.y.is_nan());
            assert_eq!(spawn.y.to_bits(), f32::NAN.to_bits());
            assert_eq!(decoded.events[1], packet.events[1]);
            assert_eq!(decoded.events[0].client, Some(ClientId::new(6)));
            assert!(decoded.sync);
        }
    }

    #[test]
    fn test_overflow_boundary() {
        let config = WireConfig {
            compression: CompressionMode::None,
            capacity_words: 13,
            ..WireConfig::default()
        };
        let mut codec = codec(config);
        assert_eq!(codec.encode(&gap_packet()).unwrap().len(), 13 * 4);

        let mut larger = gap_packet();
        larger.events[0].client = Some(ClientId::new(4));
        assert_eq!(
            codec.encode(&larger).unwrap_err(),
            TicwireError::EncodeOverflow {
                required: 14,
                capacity: 13,
                unit: SizeUnit::Words,
            }
        );
    }

    #[test]
    fn test_full_capacity_without_runs_encodes_compressed() {
        let config = WireConfig {
            compression: CompressionMode::Rle,
            capacity_words: 13,
            ..WireConfig::default()
        };
        // header + 3 button events, no two neighbouring words equal
        let packet = Packet {
            sync: true,
            sender: ClientId::new(3),
            ack_tic: Tic::new(2),
            tic: Tic::new(9),
            events: vec![buttons(20, 0x10), buttons(21, 0x20), buttons(22, 0x40)],
            ..Packet::default()
        };
        let mut codec = codec(config);
        let bytes = codec.encode_to_vec(&packet).unwrap();
        assert_eq!(bytes.len(), 13 * 4 + 1);

        let mut peer = PacketCodec::new(config).unwrap();
        assert_eq!(peer.decode(&bytes).unwrap(), packet);
    }

    #[test]
    fn test_overflow_is_reported() {
        let observer = Arc::new(CollectingObserver::new());
        let config = WireConfig {
            capacity_words: HEADER_WORDS,
            ..WireConfig::default()
        };
        let mut codec = codec(config).with_observer(observer.clone());
        assert!(codec.encode(&gap_packet()).is_err());
        assert_diagnostic!(observer, DiagnosticKind::EncodeOverflow);
    }

    #[test]
    fn test_duplicate_tic_rejected() {
        let mut packet = gap_packet();
        packet.events.push(ClientEvent {
            client: Some(ClientId::new(7)),
            ..buttons(5, 0x4)
        });
        let err = codec(WireConfig::default()).encode(&packet).unwrap_err();
        assert!(matches!(
            err,
            TicwireError::InvalidRequest {
                kind: InvalidRequestKind::DuplicateEventTic { tic, .. }
            } if tic == Tic::new(5)
        ));
    }

    #[test]
    fn test_event_range_too_wide() {
        let packet = Packet {
            events: vec![buttons(0, 1), buttons(u32::MAX, 1)],
            ..Packet::default()
        };
        let err = codec(WireConfig::default()).encode(&packet).unwrap_err();
        assert!(matches!(
            err,
            TicwireError::InvalidRequest {
                kind: InvalidRequestKind::EventRangeTooWide { .. }
            }
        ));
    }

    #[test]
    fn test_snapshot_roundtrip() {
        let packet = Packet {
            sync: true,
            snapshot: Some(snapshot(3)),
            ..gap_packet()
        };
        for config in [WireConfig::default(), WireConfig::uncompressed()] {
            let mut codec = codec(config);
            let bytes = codec.encode_to_vec(&packet).unwrap();
            let decoded = codec.decode(&bytes).unwrap();
            let snap = decoded.snapshot.unwrap();
            assert_eq!(snap, snapshot(3));
            assert_eq!(
                snap.actors[0].velocity.y.to_bits(),
                (-0.0f32).to_bits(),
                "negative zero survives"
            );
        }
    }

    #[test]
    fn test_debug_trailer_roundtrip() {
        let mut state = StateData {
            tic: Tic::new(8),
            seed: 5,
            next_id: 9,
            ..StateData::default()
        };
        state.actors_of_mut(ActorKind::Player).push(ActorRecord {
            id: 1,
            hp: 100,
            ..ActorRecord::default()
        });
        let packet = Packet {
            debug: Some(DebugPayload {
                tic: Tic::new(8),
                seed: 5,
                next_id: 9,
                state: Some(state.clone()),
                final_state: Some(state),
            }),
            ..gap_packet()
        };

        let mut codec = codec(WireConfig::debug());
        let bytes = codec.encode_to_vec(&packet).unwrap();
        let decoded = codec.decode(&bytes).unwrap();
        assert_eq!(decoded.debug, packet.debug);

        let without = Packet {
            debug: None,
            ..packet.clone()
        };
        let bytes = codec.encode_to_vec(&without).unwrap();
        assert_eq!(codec.decode(&bytes).unwrap().debug, None);
    }

    #[test]
    fn test_debug_payload_dropped_without_trailer() {
        let packet = Packet {
            debug: Some(DebugPayload::default()),
            ..gap_packet()
        };
        let mut codec = codec(WireConfig::uncompressed());
        let bytes = codec.encode_to_vec(&packet).unwrap();
        assert_eq!(bytes.len(), 13 * 4);
        assert_eq!(codec.decode(&bytes).unwrap().debug, None);
    }

    #[test]
    fn test_decode_truncated() {
        let mut codec = codec(WireConfig::uncompressed());
        let bytes = codec.encode_to_vec(&gap_packet()).unwrap();
        let err = codec.decode(&bytes[..bytes.len() - 4]).unwrap_err();
        assert_eq!(
            err,
            TicwireError::DecodeTruncated {
                needed: 13,
                available: 12,
                unit: SizeUnit::Words,
            }
        );
    }

    #[test]
    fn test_decode_rejects_event_count_past_capacity() {
        let mut raw = vec![0u32; HEADER_WORDS];
        raw[4] = 10_000;
        let bytes: Vec<u8> = raw.iter().flat_map(|w| w.to_le_bytes()).collect();
        let err = codec(WireConfig::uncompressed()).decode(&bytes).unwrap_err();
        assert!(matches!(
            err,
            TicwireError::DecodeCorrupt {
                reason: CorruptReason::EventCountOutOfBounds { count: 10_000, .. }
            }
        ));
    }

    #[test]
    fn test_decode_rejects_tic_range_overflow() {
        let raw = [0u32, 0, 0, 0, 2, u32::MAX, 0, 0, 0];
        let bytes: Vec<u8> = raw.iter().flat_map(|w| w.to_le_bytes()).collect();
        let err = codec(WireConfig::uncompressed()).decode(&bytes).unwrap_err();
        assert!(matches!(
            err,
            TicwireError::DecodeCorrupt {
                reason: CorruptReason::TicRangeOverflow { .. }
            }
        ));
    }

    #[test]
    fn test_decode_rejects_unknown_flags_and_kind() {
        let raw = [0u32, 0, 0, 0, 1, 4, 0, 0x8];
        let bytes: Vec<u8> = raw.iter().flat_map(|w| w.to_le_bytes()).collect();
        let err = codec(WireConfig::uncompressed()).decode(&bytes).unwrap_err();
        assert_eq!(
            err,
            TicwireError::corrupt(CorruptReason::UnknownEventFlags {
                tic: Tic::new(4),
                flags: 0x8,
            })
        );

        let raw = [0u32, 0, 0, 0, 0, 0, 1, 0, 0, 1, 9, 0, 0, 0, 0, 0, 0, 0, 0];
        let bytes: Vec<u8> = raw.iter().flat_map(|w| w.to_le_bytes()).collect();
        let err = codec(WireConfig::uncompressed()).decode(&bytes).unwrap_err();
        assert_eq!(
            err,
            TicwireError::corrupt(CorruptReason::UnknownActorKind {
                offset: 10,
                value: 9,
            })
        );
    }

    #[test]
    fn test_decode_rejects_trailing_words() {
        let mut codec = codec(WireConfig::uncompressed());
        let mut bytes = codec.encode_to_vec(&gap_packet()).unwrap();
        bytes.extend_from_slice(&[0; 4]);
        assert_eq!(
            codec.decode(&bytes).unwrap_err(),
            TicwireError::corrupt(CorruptReason::TrailingWords { remaining: 1 })
        );
    }

    #[test]
    fn test_decode_failure_is_reported() {
        let observer = Arc::new(CollectingObserver::new());
        let mut codec = codec(WireConfig::uncompressed()).with_observer(observer.clone());
        assert!(codec.decode(&[1, 2, 3]).is_err());
        assert_diagnostic!(observer, DiagnosticKind::MalformedPacket);
        assert_eq!(observer.len(), 1);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = WireConfig {
            capacity_words: 2,
            ..WireConfig::default()
        };
        assert!(matches!(
            PacketCodec::new(config),
            Err(TicwireError::InvalidConfig { .. })
        ));
    }
}
