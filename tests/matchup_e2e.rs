use std::io;
use std::sync::{Arc, Mutex};

use matchup::{
    ConflictError, IdentityKind, IdentityRegistry, Matchup, ObservationRecord, Outcome,
    RawRecord, RosterEntry, RoundSignature, SlotId, Subject,
};

fn sig(state: &str, sequence: i64) -> RoundSignature {
    RoundSignature::new(state, sequence)
}

fn witnessed(subject: &str, state: &str, sequence: i64, observer: &str) -> ObservationRecord {
    ObservationRecord::witnessed(
        Subject::Identity(subject.to_string()),
        sig(state, sequence),
        observer,
    )
}

fn witnessed_slot(slot: &str, state: &str, sequence: i64, observer: &str) -> ObservationRecord {
    ObservationRecord::witnessed(
        Subject::Slot(SlotId::from(slot)),
        sig(state, sequence),
        observer,
    )
}

fn self_report(slot: &str, state: &str, sequence: i64) -> ObservationRecord {
    ObservationRecord::self_report(slot, sig(state, sequence))
}

fn name_of(matchup: &Matchup, slot: &str) -> Option<String> {
    matchup
        .registry()
        .get(&SlotId::from(slot))
        .and_then(|s| s.name().map(ToString::to_string))
}

fn address_of(matchup: &Matchup, slot: &str) -> Option<String> {
    matchup
        .registry()
        .get(&SlotId::from(slot))
        .and_then(|s| s.address().map(ToString::to_string))
}

#[test]
fn empty_roster_resolves_vacuously() {
    let mut matchup = Matchup::new(IdentityRegistry::default(), Vec::new());
    assert_eq!(matchup.run_all().unwrap(), 1);
}

#[test]
fn all_slots_already_named() {
    let registry = IdentityRegistry::from_roster(vec![
        RosterEntry::named("1", "db-east-1"),
        RosterEntry::named("2", "db-east-2"),
        RosterEntry::named("3", "db-east-3"),
    ])
    .unwrap();
    let mut matchup = Matchup::new(registry, Vec::new());
    assert_eq!(matchup.run(IdentityKind::Name).unwrap(), Outcome::Resolved);
}

#[test]
fn one_known_one_unknown_by_hostname() {
    // The known member's log stream names its peer across three rounds; the
    // unknown member self-reports in the same rounds. Elimination attributes
    // the peer name to the unknown slot.
    let registry = IdentityRegistry::from_roster(vec![
        RosterEntry::named("1", "db-east-1"),
        RosterEntry::unresolved("2"),
    ])
    .unwrap();
    let records = vec![
        witnessed("db-east-1", "PRIMARY", 1, "db-east-2"),
        witnessed("db-east-1", "SECONDARY", 2, "db-east-2"),
        witnessed("db-east-1", "ARBITER", 2, "db-east-2"),
        self_report("2", "PRIMARY", 1),
        self_report("2", "SECONDARY", 2),
        self_report("2", "ARBITER", 7),
    ];
    let mut matchup = Matchup::new(registry, records);
    assert_eq!(matchup.run(IdentityKind::Name).unwrap(), Outcome::Resolved);
    assert_eq!(name_of(&matchup, "2").as_deref(), Some("db-east-2"));
}

#[test]
fn one_known_one_unknown_by_address() {
    let registry = IdentityRegistry::from_roster(vec![
        RosterEntry::addressed("1", "1.1.1.1"),
        RosterEntry::unresolved("2"),
    ])
    .unwrap();
    let records = vec![
        witnessed("1.1.1.1", "PRIMARY", 1, "2.2.2.2"),
        witnessed("1.1.1.1", "SECONDARY", 2, "2.2.2.2"),
        self_report("2", "PRIMARY", 1),
        self_report("2", "SECONDARY", 2),
    ];
    let mut matchup = Matchup::new(registry, records);
    assert_eq!(matchup.run(IdentityKind::Address).unwrap(), Outcome::Resolved);
    assert_eq!(address_of(&matchup, "2").as_deref(), Some("2.2.2.2"));
}

#[test]
fn two_known_one_unknown() {
    // Two resolved members independently name the same third party in the
    // rounds where the unknown slot self-reports.
    let registry = IdentityRegistry::from_roster(vec![
        RosterEntry::named("1", "db-east-1"),
        RosterEntry::named("2", "db-east-2"),
        RosterEntry::unresolved("3"),
    ])
    .unwrap();
    let records = vec![
        witnessed("db-east-1", "PRIMARY", 1, "db-east-3"),
        witnessed("db-east-2", "PRIMARY", 1, "db-east-3"),
        self_report("3", "PRIMARY", 1),
        witnessed("db-east-1", "SECONDARY", 2, "db-east-3"),
        witnessed("db-east-2", "SECONDARY", 2, "db-east-3"),
        self_report("3", "SECONDARY", 2),
    ];
    let mut matchup = Matchup::new(registry, records);
    assert_eq!(matchup.run(IdentityKind::Name).unwrap(), Outcome::Resolved);
    assert_eq!(name_of(&matchup, "3").as_deref(), Some("db-east-3"));
}

#[test]
fn one_known_two_unknown() {
    // Each unknown member is corroborated in rounds where the other members'
    // vantage points name exactly one unattributed identity.
    let registry = IdentityRegistry::from_roster(vec![
        RosterEntry::unresolved("1"),
        RosterEntry::named("2", "db-west-2"),
        RosterEntry::unresolved("3"),
    ])
    .unwrap();
    let records = vec![
        // Rounds naming slot 1's identity.
        self_report("1", "UNKNOWN", 6),
        witnessed("db-west-2", "UNKNOWN", 6, "db-west-1"),
        witnessed_slot("3", "UNKNOWN", 6, "db-west-1"),
        self_report("1", "ARBITER", 7),
        witnessed("db-west-2", "ARBITER", 7, "db-west-1"),
        witnessed_slot("3", "ARBITER", 7, "db-west-1"),
        // Rounds naming slot 3's identity.
        witnessed_slot("1", "PRIMARY", 1, "db-west-3"),
        witnessed("db-west-2", "PRIMARY", 1, "db-west-3"),
        self_report("3", "PRIMARY", 1),
        witnessed_slot("1", "FATAL", 4, "db-west-3"),
        witnessed("db-west-2", "FATAL", 4, "db-west-3"),
        self_report("3", "FATAL", 4),
    ];
    let mut matchup = Matchup::new(registry, records);
    assert_eq!(matchup.run(IdentityKind::Name).unwrap(), Outcome::Resolved);
    assert_eq!(name_of(&matchup, "1").as_deref(), Some("db-west-1"));
    assert_eq!(name_of(&matchup, "3").as_deref(), Some("db-west-3"));
}

#[test]
fn known_names_unknown_addresses_resolve_by_complement() {
    // No member ever self-reports, but every member's stream names its two
    // peers by address: each slot's own address is the one it never mentions.
    let registry = IdentityRegistry::from_roster(vec![
        RosterEntry::named("1", "db-east-1"),
        RosterEntry::named("2", "db-east-2"),
        RosterEntry::named("3", "db-east-3"),
    ])
    .unwrap();
    let records = vec![
        witnessed_slot("1", "PRIMARY", 1, "2.2.2.2"),
        witnessed_slot("1", "SECONDARY", 2, "3.3.3.3"),
        witnessed_slot("2", "ARBITER", 7, "1.1.1.1"),
        witnessed_slot("2", "RECOVERING", 3, "3.3.3.3"),
        witnessed_slot("3", "DOWN", 8, "1.1.1.1"),
        witnessed_slot("3", "FATAL", 4, "2.2.2.2"),
    ];
    let mut matchup = Matchup::new(registry, records);
    assert_eq!(matchup.run(IdentityKind::Address).unwrap(), Outcome::Resolved);
    assert_eq!(address_of(&matchup, "1").as_deref(), Some("1.1.1.1"));
    assert_eq!(address_of(&matchup, "2").as_deref(), Some("2.2.2.2"));
    assert_eq!(address_of(&matchup, "3").as_deref(), Some("3.3.3.3"));
}

#[test]
fn known_addresses_unknown_names_resolve_by_complement() {
    let registry = IdentityRegistry::from_roster(vec![
        RosterEntry::addressed("1", "1.1.1.1"),
        RosterEntry::addressed("2", "2.2.2.2"),
        RosterEntry::addressed("3", "3.3.3.3"),
    ])
    .unwrap();
    let records = vec![
        witnessed_slot("1", "PRIMARY", 1, "db-b"),
        witnessed_slot("1", "SECONDARY", 2, "db-c"),
        witnessed_slot("2", "ARBITER", 7, "db-a"),
        witnessed_slot("2", "RECOVERING", 3, "db-c"),
        witnessed_slot("3", "DOWN", 8, "db-a"),
        witnessed_slot("3", "FATAL", 4, "db-b"),
    ];
    let mut matchup = Matchup::new(registry, records);
    assert_eq!(matchup.run(IdentityKind::Name).unwrap(), Outcome::Resolved);
    assert_eq!(name_of(&matchup, "1").as_deref(), Some("db-a"));
    assert_eq!(name_of(&matchup, "2").as_deref(), Some("db-b"));
    assert_eq!(name_of(&matchup, "3").as_deref(), Some("db-c"));
}

#[test]
fn missing_member_still_deduced_by_complement() {
    // Four-member deployment, one member's log stream never collected: the
    // rostered slots still resolve, and the stray identity stays unattributed.
    let registry = IdentityRegistry::from_roster(vec![
        RosterEntry {
            slot: SlotId::from("1"),
            name: Some("db-east-1".to_string()),
            address: Some("1.1.1.1".to_string()),
        },
        RosterEntry {
            slot: SlotId::from("2"),
            name: Some("db-east-2".to_string()),
            address: Some("2.2.2.2".to_string()),
        },
        RosterEntry::named("3", "db-east-3"),
    ])
    .unwrap();
    let records = vec![
        witnessed_slot("1", "PRIMARY", 1, "2.2.2.2"),
        witnessed_slot("1", "PRIMARY", 1, "3.3.3.3"),
        witnessed_slot("1", "PRIMARY", 1, "4.4.4.4"),
        witnessed_slot("2", "PRIMARY", 1, "1.1.1.1"),
        witnessed_slot("2", "PRIMARY", 1, "3.3.3.3"),
        witnessed_slot("2", "PRIMARY", 1, "4.4.4.4"),
        witnessed_slot("3", "PRIMARY", 1, "1.1.1.1"),
        witnessed_slot("3", "PRIMARY", 1, "2.2.2.2"),
        witnessed_slot("3", "PRIMARY", 1, "4.4.4.4"),
    ];
    let mut matchup = Matchup::new(registry, records);
    // Slot 3's address is deducible by complement; 4.4.4.4 belongs to the
    // missing member and is attributed to nobody.
    assert_eq!(matchup.run(IdentityKind::Address).unwrap(), Outcome::Resolved);
    assert_eq!(address_of(&matchup, "3").as_deref(), Some("3.3.3.3"));
    assert!(matchup
        .registry()
        .owner(IdentityKind::Address, "4.4.4.4")
        .is_none());
}

#[test]
fn underdetermined_corpus_stays_partial() {
    // One collected stream out of three members: nothing is deducible.
    let registry =
        IdentityRegistry::from_roster(vec![RosterEntry::unresolved("1")]).unwrap();
    let records = vec![
        witnessed_slot("1", "PRIMARY", 1, "2.2.2.2"),
        witnessed_slot("1", "PRIMARY", 1, "3.3.3.3"),
        witnessed_slot("1", "PRIMARY", 1, "4.4.4.4"),
    ];
    let mut matchup = Matchup::new(registry, records);
    assert_eq!(matchup.run(IdentityKind::Address).unwrap(), Outcome::Partial);
    assert_eq!(address_of(&matchup, "1"), None);
}

#[test]
fn five_member_ring_terminates_partial() {
    // Symmetric ring: every vantage point is two-way ambiguous, no unique
    // elimination step exists, and the run must reach its fixed point.
    let names = ["db-a", "db-b", "db-c", "db-d", "db-e"];
    let registry = IdentityRegistry::from_roster(
        (1..=5).map(|i| RosterEntry::unresolved(i.to_string())),
    )
    .unwrap();
    let mut records = Vec::new();
    for i in 0..5usize {
        let j = (i + 1) % 5;
        let a = (i + 1).to_string();
        let b = (j + 1).to_string();
        records.push(witnessed_slot(&a, "ARBITER", 7, names[j]));
        records.push(witnessed_slot(&b, "ARBITER", 7, names[i]));
    }
    let mut matchup = Matchup::new(registry, records);
    assert_eq!(matchup.run(IdentityKind::Name).unwrap(), Outcome::Partial);
}

#[test]
fn run_all_resolves_both_kinds_independently() {
    let registry = IdentityRegistry::from_roster(vec![
        RosterEntry {
            slot: SlotId::from("1"),
            name: Some("db-east-1".to_string()),
            address: Some("1.1.1.1".to_string()),
        },
        RosterEntry::unresolved("2"),
    ])
    .unwrap();
    let records = vec![
        witnessed_slot("1", "PRIMARY", 1, "db-east-2"),
        witnessed_slot("1", "PRIMARY", 1, "2.2.2.2"),
        self_report("2", "PRIMARY", 1),
    ];
    let mut matchup = Matchup::new(registry, records);
    assert_eq!(matchup.run_all().unwrap(), 1);
    assert_eq!(name_of(&matchup, "2").as_deref(), Some("db-east-2"));
    assert_eq!(address_of(&matchup, "2").as_deref(), Some("2.2.2.2"));

    // Re-running an unchanged matchup is idempotent.
    let snapshot = matchup.registry().snapshot();
    assert_eq!(matchup.run_all().unwrap(), 1);
    assert_eq!(matchup.registry().snapshot(), snapshot);
}

#[test]
fn raw_ingestion_from_json_documents() {
    let registry = IdentityRegistry::from_roster(vec![
        RosterEntry::named("1", "db-east-1"),
        RosterEntry::unresolved("2"),
    ])
    .unwrap();
    let raw: Vec<RawRecord> = serde_json::from_value(serde_json::json!([
        { "subject": "db-east-1", "state": "PRIMARY", "sequence": 1,
          "observer": "db-east-2", "observed_at": "2012-07-09T14:00:00Z" },
        { "subject": "2", "state": "PRIMARY", "sequence": 1, "observer": "self" },
        // Malformed: no round signature. Rejected with a warning.
        { "subject": "2", "observer": "self" }
    ]))
    .unwrap();

    let mut matchup = Matchup::from_raw(registry, raw);
    assert_eq!(matchup.rejected_records(), 1);
    assert_eq!(matchup.run(IdentityKind::Name).unwrap(), Outcome::Resolved);
    assert_eq!(name_of(&matchup, "2").as_deref(), Some("db-east-2"));
}

/// Shared buffer standing in for the log destination, so a test can assert
/// on what ingestion emitted.
#[derive(Clone, Default)]
struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl LogCapture {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for LogCapture {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

#[test]
fn raw_ingestion_warns_on_each_rejected_record() {
    let capture = LogCapture::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(capture.clone())
        .with_max_level(tracing::Level::WARN)
        .with_ansi(false)
        .without_time()
        .finish();

    let registry = IdentityRegistry::from_roster(vec![
        RosterEntry::named("1", "db-east-1"),
        RosterEntry::unresolved("2"),
    ])
    .unwrap();
    let raw: Vec<RawRecord> = serde_json::from_value(serde_json::json!([
        { "subject": "db-east-1", "state": "PRIMARY", "sequence": 1, "observer": "db-east-2" },
        // Malformed: no round signature.
        { "subject": "2", "observer": "self" }
    ]))
    .unwrap();

    let matchup =
        tracing::subscriber::with_default(subscriber, || Matchup::from_raw(registry, raw));
    assert_eq!(matchup.rejected_records(), 1);

    let log = capture.contents();
    assert!(log.contains("rejected malformed observation record"));
    // The warning names the offending field.
    assert!(log.contains("state"));
}

#[test]
fn roster_conflicts_surface_before_a_run_starts() {
    let err = IdentityRegistry::from_roster(vec![
        RosterEntry::named("1", "db-east-1"),
        RosterEntry::named("2", "db-east-1"),
    ])
    .unwrap_err();
    assert!(matches!(err, ConflictError::IdentityTaken { .. }));
}

#[test]
fn snapshot_serializes_for_persistence() {
    let registry = IdentityRegistry::from_roster(vec![
        RosterEntry::named("1", "db-east-1"),
        RosterEntry::unresolved("2"),
    ])
    .unwrap();
    let records = vec![
        witnessed("db-east-1", "PRIMARY", 1, "db-east-2"),
        self_report("2", "PRIMARY", 1),
    ];
    let mut matchup = Matchup::new(registry, records);
    matchup.run(IdentityKind::Name).unwrap();

    let snapshot = matchup.into_registry().snapshot();
    let json = serde_json::to_value(&snapshot).unwrap();
    assert_eq!(
        json,
        serde_json::json!([
            { "id": "1", "name": "db-east-1" },
            { "id": "2", "name": "db-east-2" }
        ])
    );
}
