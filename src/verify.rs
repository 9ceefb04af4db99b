//! Cross-peer determinism verification.
//!
//! Peers running the same simulation attach a [`DebugPayload`] to outgoing
//! packets. A receiver whose own simulation has just finished the tic the
//! payload describes compares it against its local state and reports every
//! difference. Nothing is corrected; reports are informational.
//!
//! Comparison is bit-exact: `0.0` and `-0.0` differ, identical `NaN`s match.
//!
//! # Example
//!
//! ```
//! use ticwire::verify::{compare_counters, DivergenceKind};
//! use ticwire::{ClientId, StateCounters, Tic};
//!
//! let local = StateCounters { tic: Tic::new(10), seed: 1, next_id: 5 };
//! let remote = StateCounters { seed: 2, ..local };
//! let reports = compare_counters(ClientId::new(2), &local, &remote);
//! assert_eq!(reports.len(), 1);
//! assert!(matches!(reports[0].kind, DivergenceKind::CounterMismatch { .. }));
//! ```

use std::fmt;
use std::sync::Arc;

use crate::config::VerifierConfig;
use crate::network::packet::{DebugPayload, Packet};
use crate::state::{ActorKind, ActorRecord, StateCounters, StateData};
use crate::telemetry::{
    report_to_observer, Diagnostic, DiagnosticKind, DiagnosticObserver, DiagnosticSeverity,
};
use crate::{ClientId, Tic};

/// Version of [`ACTOR_FIELDS`]. Bumped whenever a field is added, removed or reordered.
pub const ACTOR_FIELDS_VERSION: u32 = 1;

/// One compared field of an [`ActorRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum ActorField {
    X,
    Y,
    Z,
    U,
    V,
    W,
    S,
    T,
    Id,
    Kind,
    Client,
    Buttons,
    Weapon,
    Hp,
    Anim0,
    AnimHit,
}

/// Every field compared per actor, in comparison order.
pub const ACTOR_FIELDS: [ActorField; 16] = [
    ActorField::X,
    ActorField::Y,
    ActorField::Z,
    ActorField::U,
    ActorField::V,
    ActorField::W,
    ActorField::S,
    ActorField::T,
    ActorField::Id,
    ActorField::Kind,
    ActorField::Client,
    ActorField::Buttons,
    ActorField::Weapon,
    ActorField::Hp,
    ActorField::Anim0,
    ActorField::AnimHit,
];

impl ActorField {
    /// Returns the field name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::X => "x",
            Self::Y => "y",
            Self::Z => "z",
            Self::U => "u",
            Self::V => "v",
            Self::W => "w",
            Self::S => "s",
            Self::T => "t",
            Self::Id => "id",
            Self::Kind => "kind",
            Self::Client => "client",
            Self::Buttons => "buttons",
            Self::Weapon => "weapon",
            Self::Hp => "hp",
            Self::Anim0 => "anim0",
            Self::AnimHit => "anim_hit",
        }
    }

    /// Reads this field from `actor`.
    #[must_use]
    pub fn value(self, actor: &ActorRecord) -> FieldValue {
        match self {
            Self::X => FieldValue::F32(actor.x),
            Self::Y => FieldValue::F32(actor.y),
            Self::Z => FieldValue::F32(actor.z),
            Self::U => FieldValue::F32(actor.u),
            Self::V => FieldValue::F32(actor.v),
            Self::W => FieldValue::F32(actor.w),
            Self::S => FieldValue::F32(actor.s),
            Self::T => FieldValue::F32(actor.t),
            Self::Id => FieldValue::U32(actor.id),
            Self::Kind => FieldValue::U32(actor.kind as u32),
            Self::Client => FieldValue::U32(actor.client.as_u32()),
            Self::Buttons => FieldValue::U32(actor.buttons.bits()),
            Self::Weapon => FieldValue::U32(actor.weapon),
            Self::Hp => FieldValue::U32(actor.hp),
            Self::Anim0 => FieldValue::U32(actor.anim0),
            Self::AnimHit => FieldValue::U32(actor.anim_hit),
        }
    }
}

impl fmt::Display for ActorField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The value of one compared field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue {
    /// A simulation float.
    F32(f32),
    /// An integer or id.
    U32(u32),
}

impl FieldValue {
    /// Bit-exact equality.
    #[must_use]
    pub fn bit_eq(self, other: Self) -> bool {
        match (self, other) {
            (Self::F32(a), Self::F32(b)) => a.to_bits() == b.to_bits(),
            (Self::U32(a), Self::U32(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::F32(v) => write!(f, "{v} ({:#010x})", v.to_bits()),
            Self::U32(v) => write!(f, "{v}"),
        }
    }
}

/// A scalar compared outside the actor lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Counter {
    /// Simulation RNG state.
    Seed,
    /// Next entity id to allocate.
    NextId,
    /// World generation seed.
    MapSeed,
}

impl Counter {
    /// Returns the counter name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Seed => "seed",
            Self::NextId => "next_id",
            Self::MapSeed => "map_seed",
        }
    }
}

/// Which capture a report compares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CaptureStage {
    /// The counters of the debug payload.
    Counters,
    /// The state captured by the debug hook.
    Debug,
    /// The final state of the tic.
    Final,
}

impl CaptureStage {
    /// Returns a string representation suitable for logging.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Counters => "counters",
            Self::Debug => "debug",
            Self::Final => "final",
        }
    }
}

impl fmt::Display for CaptureStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What differed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DivergenceKind {
    /// A counter differs.
    CounterMismatch {
        /// The counter.
        counter: Counter,
        /// Our value.
        local: u32,
        /// The peer's value.
        remote: u32,
    },
    /// One actor list has a different length.
    ActorCountMismatch {
        /// Kind of the list.
        kind: ActorKind,
        /// Our length.
        local: usize,
        /// The peer's length.
        remote: usize,
    },
    /// One field of one actor differs.
    FieldMismatch {
        /// Kind of the actor's list.
        kind: ActorKind,
        /// Position within the list.
        index: usize,
        /// The field.
        field: ActorField,
        /// Our value.
        local: FieldValue,
        /// The peer's value.
        remote: FieldValue,
    },
}

impl fmt::Display for DivergenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CounterMismatch {
                counter,
                local,
                remote,
            } => write!(
                f,
                "{} mismatch: local={} remote={}",
                counter.as_str(),
                local,
                remote
            ),
            Self::ActorCountMismatch {
                kind,
                local,
                remote,
            } => write!(
                f,
                "{} list size mismatch: local={} remote={}",
                kind, local, remote
            ),
            Self::FieldMismatch {
                kind,
                index,
                field,
                local,
                remote,
            } => write!(
                f,
                "{}[{}].{} mismatch: local={} remote={}",
                kind, index, field, local, remote
            ),
        }
    }
}

/// One detected difference between our state and a peer's.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DivergenceReport {
    /// Tic both states describe.
    pub tic: Tic,
    /// The peer.
    pub from: ClientId,
    /// Which capture was compared.
    pub stage: CaptureStage,
    /// What differed.
    pub kind: DivergenceKind,
}

impl DivergenceReport {
    /// Converts this report into an error-level [`DiagnosticKind::Divergence`].
    #[must_use]
    pub fn to_diagnostic(&self) -> Diagnostic {
        Diagnostic::new(
            DiagnosticSeverity::Error,
            DiagnosticKind::Divergence,
            self.to_string(),
            concat!(file!(), ":", line!()),
        )
        .with_tic(self.tic)
        .with_context("from", self.from.to_string())
        .with_context("stage", self.stage.as_str())
    }
}

impl fmt::Display for DivergenceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] client {} tic {}: {}",
            self.stage, self.from, self.tic, self.kind
        )
    }
}

fn counter_report(
    from: ClientId,
    tic: Tic,
    stage: CaptureStage,
    counter: Counter,
    local: u32,
    remote: u32,
) -> Option<DivergenceReport> {
    (local != remote).then_some(DivergenceReport {
        tic,
        from,
        stage,
        kind: DivergenceKind::CounterMismatch {
            counter,
            local,
            remote,
        },
    })
}

/// Compares the counters of a peer's debug payload against ours.
///
/// Returns one [`DivergenceKind::CounterMismatch`] per differing counter,
/// seed first. Reports carry the remote tic.
#[must_use]
pub fn compare_counters(
    from: ClientId,
    local: &StateCounters,
    remote: &StateCounters,
) -> Vec<DivergenceReport> {
    let stage = CaptureStage::Counters;
    [
        counter_report(from, remote.tic, stage, Counter::Seed, local.seed, remote.seed),
        counter_report(
            from,
            remote.tic,
            stage,
            Counter::NextId,
            local.next_id,
            remote.next_id,
        ),
    ]
    .into_iter()
    .flatten()
    .collect()
}

/// Compares two full states.
///
/// Counters are compared first (`next_id`, `seed`, `map_seed`), then each
/// actor list by kind. Lists of different length yield a single
/// [`DivergenceKind::ActorCountMismatch`]; lists of equal length are
/// compared pairwise by index over every field of [`ACTOR_FIELDS`], and
/// every differing field is reported.
#[must_use]
pub fn compare_full_state(
    from: ClientId,
    stage: CaptureStage,
    local: &StateData,
    remote: &StateData,
) -> Vec<DivergenceReport> {
    let tic = remote.tic;
    let mut reports: Vec<DivergenceReport> = [
        counter_report(from, tic, stage, Counter::NextId, local.next_id, remote.next_id),
        counter_report(from, tic, stage, Counter::Seed, local.seed, remote.seed),
        counter_report(
            from,
            tic,
            stage,
            Counter::MapSeed,
            local.map_seed,
            remote.map_seed,
        ),
    ]
    .into_iter()
    .flatten()
    .collect();

    for kind in ActorKind::ALL {
        let (ours, theirs) = (local.actors_of(kind), remote.actors_of(kind));
        if ours.len() != theirs.len() {
            reports.push(DivergenceReport {
                tic,
                from,
                stage,
                kind: DivergenceKind::ActorCountMismatch {
                    kind,
                    local: ours.len(),
                    remote: theirs.len(),
                },
            });
            continue;
        }
        for (index, (a, b)) in ours.iter().zip(theirs).enumerate() {
            for field in ACTOR_FIELDS {
                let (local, remote) = (field.value(a), field.value(b));
                if !local.bit_eq(remote) {
                    reports.push(DivergenceReport {
                        tic,
                        from,
                        stage,
                        kind: DivergenceKind::FieldMismatch {
                            kind,
                            index,
                            field,
                            local,
                            remote,
                        },
                    });
                }
            }
        }
    }
    reports
}

/// Drives verification across outgoing and incoming packets.
///
/// # Example
///
/// ```
/// use ticwire::{ClientId, DeterminismVerifier, Packet, StateData, Tic, VerifierConfig};
///
/// let mut verifier = DeterminismVerifier::new(VerifierConfig::full_state());
///
/// // Local side: the debug hook captures tic 9, the tic then completes.
/// let state = StateData { tic: Tic::new(9), seed: 4, ..StateData::default() };
/// verifier.record_local_state(state.clone());
/// let final_state = StateData { tic: Tic::new(10), ..state };
/// let mut packet = Packet::default();
/// verifier.attach_debug(&mut packet, final_state.counters(), &final_state);
///
/// // Remote side: an identical simulation at confirmed tic 11 sees no divergence.
/// let reports = verifier.check_packet(
///     ClientId::new(1),
///     &packet,
///     &final_state.counters(),
///     &final_state,
///     Tic::new(11),
/// );
/// assert!(reports.is_empty());
/// ```
pub struct DeterminismVerifier {
    config: VerifierConfig,
    debug_state: Option<StateData>,
    observer: Option<Arc<dyn DiagnosticObserver>>,
}

impl fmt::Debug for DeterminismVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeterminismVerifier")
            .field("config", &self.config)
            .field("debug_state_tic", &self.debug_state.as_ref().map(|s| s.tic))
            .field("has_observer", &self.observer.is_some())
            .finish()
    }
}

impl DeterminismVerifier {
    /// Creates a verifier reporting to the default tracing observer.
    #[must_use]
    pub fn new(config: VerifierConfig) -> Self {
        Self {
            config,
            debug_state: None,
            observer: None,
        }
    }

    /// Sends divergence diagnostics to `observer`.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn DiagnosticObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// The configuration this verifier was created with.
    #[must_use]
    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    /// The last state passed to [`record_local_state`](Self::record_local_state).
    #[must_use]
    pub fn debug_state(&self) -> Option<&StateData> {
        self.debug_state.as_ref()
    }

    /// Retains the state captured by the local debug hook.
    ///
    /// The hook runs before the tic counter advances, so the retained copy is
    /// stamped with the following tic. Ignored unless full-state capture is on.
    pub fn record_local_state(&mut self, mut state: StateData) {
        if !(self.config.enabled && self.config.full_state) {
            return;
        }
        state.tic = state.tic.checked_add(1).unwrap_or(state.tic);
        self.debug_state = Some(state);
    }

    /// Attaches a debug payload to an outgoing packet.
    ///
    /// The payload always carries `counters`; with full-state capture it also
    /// carries the retained debug state and a copy of `final_state`.
    pub fn attach_debug(&self, packet: &mut Packet, counters: StateCounters, final_state: &StateData) {
        if !self.config.enabled {
            return;
        }
        let mut payload = DebugPayload::from(counters);
        if self.config.full_state {
            payload.state = self.debug_state.clone();
            payload.final_state = Some(final_state.clone());
        }
        packet.debug = Some(payload);
    }

    /// Checks a received packet against local state.
    ///
    /// Only runs when the packet's debug payload describes the tic just before
    /// `local_confirmed_tic`; any other packet yields no reports. Every report is
    /// also sent to the observer.
    #[must_use = "divergence reports are also sent to the observer, but the returned list should be inspected"]
    pub fn check_packet(
        &self,
        from: ClientId,
        packet: &Packet,
        local: &StateCounters,
        local_final: &StateData,
        local_confirmed_tic: Tic,
    ) -> Vec<DivergenceReport> {
        if !self.config.enabled {
            return Vec::new();
        }
        let Some(payload) = &packet.debug else {
            return Vec::new();
        };
        if local_confirmed_tic.prev() != Some(payload.tic) {
            return Vec::new();
        }

        let mut reports = compare_counters(from, local, &payload.counters());
        if self.config.full_state {
            if let (Some(ours), Some(theirs)) = (&self.debug_state, &payload.state) {
                reports.extend(compare_full_state(from, CaptureStage::Debug, ours, theirs));
            }
            if let Some(theirs) = &payload.final_state {
                reports.extend(compare_full_state(
                    from,
                    CaptureStage::Final,
                    local_final,
                    theirs,
                ));
            }
        }

        for report in &reports {
            report_to_observer(self.observer.as_ref(), &report.to_diagnostic());
        }
        if !reports.is_empty() {
            tracing::debug!(
                from = from.as_u32(),
                tic = payload.tic.as_u32(),
                count = reports.len(),
                "divergence detected"
            );
        }
        reports
    }
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
    use crate::telemetry::CollectingObserver;
    use crate::{assert_diagnostic, assert_no_diagnostics};

    fn actor(id: u32) -> ActorRecord {
        ActorRecord {
            id,
            x: id as f32,
            hp: 10,
            ..ActorRecord::default()
        }
    }

    fn state(tic: u32) -> StateData {
        let mut state = StateData {
            tic: Tic::new(tic),
            seed: 99,
            next_id: 4,
            map_seed: 7,
            ..StateData::default()
        };
        state.actors_of_mut(ActorKind::Player).push(actor(1));
        state.actors_of_mut(ActorKind::Barrel).push(actor(2));
        state.actors_of_mut(ActorKind::Barrel).push(actor(3));
        state
    }

    #[test]
    fn test_fields_cover_every_record_field() {
        assert_eq!(ACTOR_FIELDS.len(), 16);
        let names: Vec<&str> = ACTOR_FIELDS.iter().map(|f| f.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "x", "y", "z", "u", "v", "w", "s", "t", "id", "kind", "client", "buttons",
                "weapon", "hp", "anim0", "anim_hit"
            ]
        );
    }

    #[test]
    fn test_identical_states_have_no_reports() {
        let reports = compare_full_state(ClientId::new(1), CaptureStage::Final, &state(5), &state(5));
        assert!(reports.is_empty());
    }

    #[test]
    fn test_field_mismatch() {
        let local = state(5);
        let mut remote = state(5);
        remote.actors_of_mut(ActorKind::Barrel)[1].hp = 9;

        let reports = compare_full_state(ClientId::new(2), CaptureStage::Debug, &local, &remote);
        assert_eq!(reports.len(), 1);
        assert_eq!(
            reports[0].kind,
            DivergenceKind::FieldMismatch {
                kind: ActorKind::Barrel,
                index: 1,
                field: ActorField::Hp,
                local: FieldValue::U32(10),
                remote: FieldValue::U32(9),
            }
        );
        assert_eq!(reports[0].stage, CaptureStage::Debug);
        assert_eq!(reports[0].from, ClientId::new(2));
    }

    #[test]
    fn test_all_differing_fields_reported() {
        let local = state(5);
        let mut remote = state(5);
        let player = &mut remote.actors_of_mut(ActorKind::Player)[0];
        player.u = 0.5;
        player.weapon = 3;
        player.anim_hit = 1;
        let reports = compare_full_state(ClientId::new(2), CaptureStage::Final, &local, &remote);
        let fields: Vec<ActorField> = reports
            .iter()
            .filter_map(|r| match r.kind {
                DivergenceKind::FieldMismatch { field, .. } => Some(field),
                _ => None,
            })
            .collect();
        assert_eq!(
            fields,
            vec![ActorField::U, ActorField::Weapon, ActorField::AnimHit]
        );
    }

    #[test]
    fn test_float_comparison_is_bitwise() {
        let mut local = state(5);
        let mut remote = state(5);
        local.actors_of_mut(ActorKind::Player)[0].z = 0.0;
        remote.actors_of_mut(ActorKind::Player)[0].z = -0.0;
        let reports = compare_full_state(ClientId::new(2), CaptureStage::Final, &local, &remote);
        assert_eq!(reports.len(), 1);

        local.actors_of_mut(ActorKind::Player)[0].z = f32::NAN;
        remote.actors_of_mut(ActorKind::Player)[0].z = f32::NAN;
        let reports = compare_full_state(ClientId::new(2), CaptureStage::Final, &local, &remote);
        assert!(reports.is_empty());
    }

    #[test]
    fn test_list_size_mismatch_skips_fields() {
        let local = state(5);
        let mut remote = state(5);
        remote.actors_of_mut(ActorKind::Barrel).pop();
        remote.actors_of_mut(ActorKind::Barrel)[0].hp = 1;

        let reports = compare_full_state(ClientId::new(2), CaptureStage::Final, &local, &remote);
        assert_eq!(
            reports,
            vec![DivergenceReport {
                tic: Tic::new(5),
                from: ClientId::new(2),
                stage: CaptureStage::Final,
                kind: DivergenceKind::ActorCountMismatch {
                    kind: ActorKind::Barrel,
                    local: 2,
                    remote: 1,
                },
            }]
        );
    }

    #[test]
    fn test_counter_mismatches_in_order() {
        let local = state(5);
        let remote = StateData {
            next_id: 5,
            seed: 100,
            map_seed: 8,
            ..state(5)
        };
        let counters: Vec<Counter> = compare_full_state(
            ClientId::new(2),
            CaptureStage::Final,
            &local,
            &remote,
        )
        .iter()
        .filter_map(|r| match r.kind {
            DivergenceKind::CounterMismatch { counter, .. } => Some(counter),
            _ => None,
        })
        .collect();
        assert_eq!(counters, vec![Counter::NextId, Counter::Seed, Counter::MapSeed]);
    }

    #[test]
    fn test_report_to_diagnostic() {
        let report = DivergenceReport {
            tic: Tic::new(12),
            from: ClientId::new(3),
            stage: CaptureStage::Final,
            kind: DivergenceKind::CounterMismatch {
                counter: Counter::Seed,
                local: 1,
                remote: 2,
            },
        };
        let diagnostic = report.to_diagnostic();
        assert_eq!(diagnostic.severity, DiagnosticSeverity::Error);
        assert_eq!(diagnostic.kind, DiagnosticKind::Divergence);
        assert_eq!(diagnostic.tic, Some(Tic::new(12)));
        assert_eq!(diagnostic.context["from"], "3");
        assert_eq!(diagnostic.context["stage"], "final");
        assert!(diagnostic.message.contains("seed mismatch: local=1 remote=2"));
    }

    fn remote_packet(verifier: &DeterminismVerifier, debug_state: StateData, final_state: &StateData) -> Packet {
        let mut remote = DeterminismVerifier::new(*verifier.config());
        remote.record_local_state(debug_state);
        let mut packet = Packet::default();
        remote.attach_debug(&mut packet, final_state.counters(), final_state);
        packet
    }

    #[test]
    fn test_record_local_state_advances_tic() {
        let mut verifier = DeterminismVerifier::new(VerifierConfig::full_state());
        verifier.record_local_state(state(9));
        assert_eq!(verifier.debug_state().unwrap().tic, Tic::new(10));

        let mut counters_only = DeterminismVerifier::new(VerifierConfig::default());
        counters_only.record_local_state(state(9));
        assert!(counters_only.debug_state().is_none());
    }

    #[test]
    fn test_attach_debug_respects_config() {
        let final_state = state(10);
        let mut packet = Packet::default();

        DeterminismVerifier::new(VerifierConfig::disabled()).attach_debug(
            &mut packet,
            final_state.counters(),
            &final_state,
        );
        assert!(packet.debug.is_none());

        DeterminismVerifier::new(VerifierConfig::default()).attach_debug(
            &mut packet,
            final_state.counters(),
            &final_state,
        );
        let debug = packet.debug.as_ref().unwrap();
        assert_eq!(debug.counters(), final_state.counters());
        assert!(debug.state.is_none());
        assert!(debug.final_state.is_none());
    }

    #[test]
    fn test_check_packet_trigger_condition() {
        let observer = Arc::new(CollectingObserver::new());
        let mut verifier =
            DeterminismVerifier::new(VerifierConfig::full_state()).with_observer(observer.clone());
        verifier.record_local_state(state(9));
        let final_state = state(10);

        let mut remote_final = state(10);
        remote_final.seed = 1;
        let packet = remote_packet(&verifier, state(9), &remote_final);

        for confirmed in [10, 12, 0] {
            let reports = verifier.check_packet(
                ClientId::new(2),
                &packet,
                &final_state.counters(),
                &final_state,
                Tic::new(confirmed),
            );
            assert!(reports.is_empty(), "confirmed tic {confirmed}");
        }
        assert_no_diagnostics!(observer);

        let reports = verifier.check_packet(
            ClientId::new(2),
            &packet,
            &final_state.counters(),
            &final_state,
            Tic::new(11),
        );
        let stages: Vec<CaptureStage> = reports.iter().map(|r| r.stage).collect();
        assert_eq!(stages, vec![CaptureStage::Counters, CaptureStage::Final]);
        assert_diagnostic!(observer, DiagnosticKind::Divergence);
        assert_eq!(observer.len(), 2);
    }

    #[test]
    fn test_check_packet_compares_debug_capture() {
        let mut verifier = DeterminismVerifier::new(VerifierConfig::full_state());
        verifier.record_local_state(state(9));
        let final_state = state(10);

        let mut remote_debug = state(9);
        remote_debug.actors_of_mut(ActorKind::Player)[0].x = 42.0;
        let packet = remote_packet(&verifier, remote_debug, &final_state);

        let reports = verifier.check_packet(
            ClientId::new(2),
            &packet,
            &final_state.counters(),
            &final_state,
            Tic::new(11),
        );
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].stage, CaptureStage::Debug);
        assert_eq!(reports[0].tic, Tic::new(10));
    }

    #[test]
    fn test_divergence_is_logged_at_debug_level() {
        let observer = Arc::new(CollectingObserver::new());
        let mut verifier =
            DeterminismVerifier::new(VerifierConfig::full_state()).with_observer(observer.clone());
        verifier.record_local_state(state(9));
        let final_state = state(10);
        let mut remote_final = final_state.clone();
        remote_final.seed ^= 0x10;
        let packet = remote_packet(&verifier, state(9), &remote_final);

        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .finish();
        let reports = tracing::subscriber::with_default(subscriber, || {
            verifier.check_packet(
                ClientId::new(2),
                &packet,
                &final_state.counters(),
                &final_state,
                Tic::new(11),
            )
        });
        assert_eq!(reports.len(), 2);
        assert!(reports.iter().all(|r| r.tic == Tic::new(10)));
        assert_eq!(observer.len(), 2);
    }

    #[test]
    fn test_counters_only_mode_ignores_states() {
        let verifier = DeterminismVerifier::new(VerifierConfig::default());
        let mut packet = Packet::default();
        let mut remote_final = state(10);
        remote_final.actors_of_mut(ActorKind::Item).push(actor(9));
        let payload = DebugPayload {
            final_state: Some(remote_final),
            ..DebugPayload::from(state(10).counters())
        };
        packet.debug = Some(payload);

        let local = state(10);
        let reports = verifier.check_packet(
            ClientId::new(2),
            &packet,
            &local.counters(),
            &local,
            Tic::new(11),
        );
        assert!(reports.is_empty());
    }
}
