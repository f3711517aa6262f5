//! Session-Registry – hoechstens ein Stage-Client pro Gruppe
//!
//! Die Registry ist der einzige veraenderliche geteilte Zustand des
//! Subsystems. Anlegen laeuft single-flight ueber die Entry-API der
//! DashMap: zwei gleichzeitige `get_or_create`-Aufrufe fuer dieselbe
//! Gruppe liefern garantiert dieselbe Instanz.
//!
//! Pro Client laeuft ein Weiterleitungs-Task der den internen
//! Ereignisstrom ueber eine feste Zuordnungstabelle in nach aussen
//! sichtbare [`RudelEvent`]s mit Gruppen-Kontext uebersetzt. Terminale
//! Ereignisse tragen den Client VOR dem Re-Emit aus der Registry aus —
//! ein nachfolgender Lookup sieht nie einen beendeten Client.

use crate::client::{ClientEreignis, StageClient};
use crate::rtc::PeerConnectionFactory;
use dashmap::DashMap;
use rudel_core::event::RudelEvent;
use rudel_core::types::GroupId;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};

/// Kapazitaet des nach aussen gerichteten Event-Busses
const EVENT_BUS_KAPAZITAET: usize = 256;

struct ManagerInner {
    clients: DashMap<GroupId, StageClient>,
    fabrik: Arc<dyn PeerConnectionFactory>,
    ereignisse: broadcast::Sender<RudelEvent>,
}

/// Registry aller aktiven Stage-Sessions, indiziert nach Gruppen-ID
#[derive(Clone)]
pub struct StageManager {
    inner: Arc<ManagerInner>,
}

impl StageManager {
    /// Erstellt eine leere Registry
    pub fn neu(fabrik: Arc<dyn PeerConnectionFactory>) -> Self {
        let (ereignisse, _) = broadcast::channel(EVENT_BUS_KAPAZITAET);
        Self {
            inner: Arc::new(ManagerInner {
                clients: DashMap::new(),
                fabrik,
                ereignisse,
            }),
        }
    }

    /// Abonniert den nach aussen gerichteten Event-Bus
    pub fn abonnieren(&self) -> broadcast::Receiver<RudelEvent> {
        self.inner.ereignisse.subscribe()
    }

    /// Liefert den bestehenden Client oder None, legt nie an
    pub fn get(&self, group_id: GroupId) -> Option<StageClient> {
        self.inner.clients.get(&group_id).map(|r| r.clone())
    }

    /// Liefert den bestehenden Client oder legt genau einen neuen an
    pub fn get_or_create(&self, group_id: GroupId) -> StageClient {
        self.inner
            .clients
            .entry(group_id)
            .or_insert_with(|| Self::client_erstellen(&self.inner, group_id))
            .clone()
    }

    fn client_erstellen(inner: &Arc<ManagerInner>, group_id: GroupId) -> StageClient {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let peer = inner.fabrik.verbindung_erstellen(group_id);
        let client = StageClient::neu(group_id, peer, tx);

        let weiterleitung = Arc::clone(inner);
        tokio::spawn(async move {
            while let Some(ereignis) = rx.recv().await {
                let terminal = ereignis.ist_terminal();
                if terminal {
                    // Austragen bevor das Ereignis sichtbar wird
                    weiterleitung.clients.remove(&group_id);
                    tracing::debug!(group_id = %group_id, "Stage-Client ausgetragen");
                }
                let _ = weiterleitung.ereignisse.send(uebersetzen(group_id, ereignis));
                if terminal {
                    break;
                }
            }
        });

        tracing::debug!(group_id = %group_id, "Stage-Client registriert");
        client
    }

    /// Beendet die Session einer Gruppe und traegt sie aus
    ///
    /// No-op wenn keine Session existiert.
    pub async fn remove(&self, group_id: GroupId) {
        if let Some((_, client)) = self.inner.clients.remove(&group_id) {
            client.trennen(false).await;
        }
    }

    /// Beendet alle Sessions (Reconnect-Zyklus)
    pub async fn bereinigen(&self) {
        let gruppen: Vec<GroupId> = self.inner.clients.iter().map(|e| *e.key()).collect();
        for group_id in gruppen {
            self.remove(group_id).await;
        }
    }

    /// Anzahl der registrierten Sessions
    pub fn anzahl(&self) -> usize {
        self.inner.clients.len()
    }

    /// Prueft ob eine Gruppe eine registrierte Session hat
    pub fn ist_registriert(&self, group_id: GroupId) -> bool {
        self.inner.clients.contains_key(&group_id)
    }
}

/// Feste Zuordnungstabelle interner Ereignisse auf Bus-Events
fn uebersetzen(group_id: GroupId, ereignis: ClientEreignis) -> RudelEvent {
    match ereignis {
        ClientEreignis::Verbindet => RudelEvent::StageClientVerbindet { group_id },
        ClientEreignis::Verbunden => RudelEvent::StageClientVerbunden { group_id },
        ClientEreignis::Bereit => RudelEvent::StageClientBereit { group_id },
        ClientEreignis::Getrennt => RudelEvent::StageClientGetrennt { group_id },
        ClientEreignis::Gekickt => RudelEvent::StageClientGekickt { group_id },
        ClientEreignis::Fehler(grund) => RudelEvent::StageClientFehler { group_id, grund },
        ClientEreignis::BroadcastGestartet => RudelEvent::StageBroadcastGestartet { group_id },
        ClientEreignis::BroadcastGestoppt => RudelEvent::StageBroadcastGestoppt { group_id },
        ClientEreignis::Stumm => RudelEvent::StageClientStumm { group_id },
        ClientEreignis::Freigeschaltet => RudelEvent::StageClientFreigeschaltet { group_id },
        ClientEreignis::Dauer(sekunden) => RudelEvent::StageBroadcastDauer { group_id, sekunden },
    }
}
