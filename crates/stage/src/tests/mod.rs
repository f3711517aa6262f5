//! Gemeinsame Test-Doubles fuer das Stage-Subsystem
//!
//! Alle Collaborator-Schnittstellen (Kommando-Kanal, Peer-Verbindung,
//! Gruppen-Verzeichnis) werden durch skriptbare Mocks ersetzt; die
//! Tests fahren damit komplette Join/Kick/Broadcast-Zyklen ohne
//! echten Transport.

mod manager_tests;

use crate::directory::{GroupDirectory, GroupProfile, Identitaet};
use crate::facade::StageService;
use crate::rtc::{PeerConnection, PeerConnectionFactory};
use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use rudel_core::event::RudelEvent;
use rudel_core::types::{GroupId, SlotId, SubscriberId};
use rudel_core::{Result, RudelError};
use rudel_protocol::commands::Command;
use rudel_protocol::response::RpcResponse;
use rudel_protocol::stage::{Slot, StageSettings};
use rudel_protocol::SignalingChannel;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Notify};

/// Subscriber-ID des Test-Bots
pub const SELBST: SubscriberId = SubscriberId(1000);

// ---------------------------------------------------------------------------
// MockKanal
// ---------------------------------------------------------------------------

/// Skriptbarer Kommando-Kanal
///
/// Antworten werden pro Kommando eingereiht; ohne Skript antwortet der
/// Kanal mit Erfolg und leerem Body. Jedes gesendete Kommando wird
/// mitgeschnitten.
pub struct MockKanal {
    antworten: Mutex<HashMap<Command, VecDeque<RpcResponse>>>,
    gesendet: Mutex<Vec<(Command, Value)>>,
}

impl MockKanal {
    pub fn neu() -> Arc<Self> {
        Arc::new(Self {
            antworten: Mutex::new(HashMap::new()),
            gesendet: Mutex::new(Vec::new()),
        })
    }

    pub fn antwort_einreihen(&self, command: Command, antwort: RpcResponse) {
        self.antworten
            .lock()
            .entry(command)
            .or_default()
            .push_back(antwort);
    }

    pub fn gesendete(&self) -> Vec<(Command, Value)> {
        self.gesendet.lock().clone()
    }

    pub fn gesendet_anzahl(&self, command: Command) -> usize {
        self.gesendet
            .lock()
            .iter()
            .filter(|(c, _)| *c == command)
            .count()
    }
}

#[async_trait]
impl SignalingChannel for MockKanal {
    async fn emit(&self, command: Command, payload: Value) -> Result<RpcResponse> {
        self.gesendet.lock().push((command, payload));
        let antwort = self
            .antworten
            .lock()
            .get_mut(&command)
            .and_then(|q| q.pop_front());
        Ok(antwort.unwrap_or_else(|| RpcResponse::ok(Value::Null)))
    }
}

// ---------------------------------------------------------------------------
// MockPeer + MockFabrik
// ---------------------------------------------------------------------------

/// Peer-Verbindung mit manuell ausloesbarem Bereit-Signal
pub struct MockPeer {
    bereit: Notify,
    bereit_schlaegt_fehl: AtomicBool,
    geschlossen: AtomicBool,
    frames: Mutex<Vec<Bytes>>,
}

impl MockPeer {
    pub fn neu() -> Arc<Self> {
        Arc::new(Self {
            bereit: Notify::new(),
            bereit_schlaegt_fehl: AtomicBool::new(false),
            geschlossen: AtomicBool::new(false),
            frames: Mutex::new(Vec::new()),
        })
    }

    /// Loest das einmalige Bereit-Signal aus
    pub fn melde_bereit(&self) {
        self.bereit.notify_one();
    }

    /// Laesst den naechsten Bereit-Wartenden scheitern
    pub fn bereit_fehlschlagen_lassen(&self) {
        self.bereit_schlaegt_fehl.store(true, Ordering::SeqCst);
        self.bereit.notify_one();
    }

    pub fn ist_geschlossen(&self) -> bool {
        self.geschlossen.load(Ordering::SeqCst)
    }

    pub fn frame_anzahl(&self) -> usize {
        self.frames.lock().len()
    }
}

#[async_trait]
impl PeerConnection for MockPeer {
    async fn create_offer(&self) -> Result<String> {
        Ok("v=0 mock-offer".to_string())
    }

    async fn apply_answer(&self, _sdp: &str) -> Result<()> {
        Ok(())
    }

    async fn warte_auf_bereit(&self) -> Result<()> {
        self.bereit.notified().await;
        if self.bereit_schlaegt_fehl.load(Ordering::SeqCst) {
            return Err(RudelError::Transport("ICE fehlgeschlagen".into()));
        }
        Ok(())
    }

    async fn sende_audio(&self, frame: Bytes) -> Result<()> {
        self.frames.lock().push(frame);
        Ok(())
    }

    async fn schliessen(&self) {
        self.geschlossen.store(true, Ordering::SeqCst);
    }
}

/// Fabrik die jede erzeugte Peer-Verbindung fuer den Test aufhebt
pub struct MockFabrik {
    pub peers: Mutex<Vec<(GroupId, Arc<MockPeer>)>>,
}

impl MockFabrik {
    pub fn neu() -> Arc<Self> {
        Arc::new(Self {
            peers: Mutex::new(Vec::new()),
        })
    }

    /// Zuletzt erzeugte Peer-Verbindung einer Gruppe
    pub fn peer(&self, group_id: GroupId) -> Arc<MockPeer> {
        self.peers
            .lock()
            .iter()
            .rev()
            .find(|(gid, _)| *gid == group_id)
            .map(|(_, peer)| Arc::clone(peer))
            .expect("keine Peer-Verbindung fuer diese Gruppe erzeugt")
    }

    pub fn erzeugte_anzahl(&self) -> usize {
        self.peers.lock().len()
    }
}

impl PeerConnectionFactory for MockFabrik {
    fn verbindung_erstellen(&self, group_id: GroupId) -> Arc<dyn PeerConnection> {
        let peer = MockPeer::neu();
        self.peers.lock().push((group_id, Arc::clone(&peer)));
        peer
    }
}

// ---------------------------------------------------------------------------
// MockGruppen
// ---------------------------------------------------------------------------

/// Gruppen-Verzeichnis aus einer festen Tabelle
pub struct MockGruppen {
    profile: DashMap<GroupId, GroupProfile>,
}

impl MockGruppen {
    pub fn neu() -> Arc<Self> {
        Arc::new(Self {
            profile: DashMap::new(),
        })
    }

    pub fn gruppe_mit_stage(&self, group_id: GroupId, enabled: bool, min_reputation_level: u32) {
        self.profile.insert(
            group_id,
            GroupProfile {
                id: group_id,
                name: format!("gruppe-{}", group_id.inner()),
                audio_config: Some(StageSettings {
                    enabled,
                    min_reputation_level,
                }),
            },
        );
    }

    pub fn gruppe_ohne_stage(&self, group_id: GroupId) {
        self.profile.insert(
            group_id,
            GroupProfile {
                id: group_id,
                name: format!("gruppe-{}", group_id.inner()),
                audio_config: None,
            },
        );
    }
}

#[async_trait]
impl GroupDirectory for MockGruppen {
    async fn group_by_id(
        &self,
        group_id: GroupId,
        _force_refresh: bool,
    ) -> Result<Option<GroupProfile>> {
        Ok(self.profile.get(&group_id).map(|r| r.clone()))
    }
}

// ---------------------------------------------------------------------------
// Testumgebung
// ---------------------------------------------------------------------------

/// Komplett verdrahteter StageService mit allen Mocks
pub struct TestUmgebung {
    pub service: Arc<StageService>,
    pub kanal: Arc<MockKanal>,
    pub gruppen: Arc<MockGruppen>,
    pub fabrik: Arc<MockFabrik>,
    pub identitaet: Arc<RwLock<Identitaet>>,
}

pub fn umgebung() -> TestUmgebung {
    let kanal = MockKanal::neu();
    let gruppen = MockGruppen::neu();
    let fabrik = MockFabrik::neu();
    let identitaet = Arc::new(RwLock::new(Identitaet {
        subscriber_id: SELBST,
        reputation: 10.0,
    }));

    let service = StageService::neu(
        Arc::clone(&kanal) as Arc<dyn SignalingChannel>,
        Arc::clone(&gruppen) as Arc<dyn GroupDirectory>,
        Arc::clone(&identitaet),
        Arc::clone(&fabrik) as Arc<dyn PeerConnectionFactory>,
    );

    TestUmgebung {
        service,
        kanal,
        gruppen,
        fabrik,
        identitaet,
    }
}

/// Slot-Listen-Antwort im Wire-Format der Plattform
pub fn slot_listen_antwort(slots: &[Slot]) -> RpcResponse {
    RpcResponse::ok(serde_json::to_value(slots).expect("Slots serialisierbar"))
}

/// n freie, ungesperrte Slots mit IDs 1..=n
pub fn freie_slots(anzahl: u32) -> Vec<Slot> {
    (1..=anzahl).map(|i| Slot::frei(SlotId(i))).collect()
}

/// Erfolgreiche Join-Antwort: SDP-Answer plus belegter Slot
pub fn join_antwort(slot_id: SlotId, occupier: SubscriberId) -> RpcResponse {
    RpcResponse::ok(serde_json::json!({
        "sdp": "v=0 mock-answer",
        "slot": { "id": slot_id.inner(), "occupierId": occupier.inner() }
    }))
}

/// Wartet auf das naechste Bus-Ereignis (mit Frist)
pub async fn naechstes_ereignis(rx: &mut broadcast::Receiver<RudelEvent>) -> RudelEvent {
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("kein Ereignis innerhalb der Frist")
        .expect("Event-Bus geschlossen")
}

/// Liest Ereignisse bis das Praedikat zutrifft und gibt den Treffer zurueck
pub async fn ereignis_bis(
    rx: &mut broadcast::Receiver<RudelEvent>,
    praedikat: impl Fn(&RudelEvent) -> bool,
) -> RudelEvent {
    loop {
        let ereignis = naechstes_ereignis(rx).await;
        if praedikat(&ereignis) {
            return ereignis;
        }
    }
}
