//! Stage-Client – eine WebRTC-Session fuer genau eine Gruppe
//!
//! Der Client fuehrt zwei Zustandsmaschinen:
//!
//! ```text
//! Verbindung:  IDLE -> CONNECTING -> CONNECTED -> READY
//!                 \________________________________/
//!                   jederzeit -> ERRORED (terminal)
//!              READY -> DISCONNECTED | KICKED (terminal)
//!
//! Broadcast (nur im Zustand READY gueltig):
//!              STOPPED -> PLAYING <-> PAUSED -> STOPPED
//! ```
//!
//! Jeder Zustandsuebergang erzeugt genau ein [`ClientEreignis`]; der
//! StageManager uebersetzt den Strom in nach aussen sichtbare Events
//! mit Gruppen-Kontext. Terminale Zustaende werden nie verlassen — eine
//! neue Session bekommt einen frischen Client.

use crate::rtc::PeerConnection;
use bytes::Bytes;
use parking_lot::Mutex;
use rudel_core::types::{GroupId, SlotId};
use rudel_core::{Result, RudelError};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

// ---------------------------------------------------------------------------
// Zustaende
// ---------------------------------------------------------------------------

/// Verbindungszustand einer Stage-Session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Idle,
    Connecting,
    Connected,
    Ready,
    Disconnected,
    Errored,
    Kicked,
}

impl ConnectionState {
    /// Terminale Zustaende erfordern vollstaendigen Abbau der Session
    pub fn ist_terminal(&self) -> bool {
        matches!(self, Self::Disconnected | Self::Errored | Self::Kicked)
    }
}

/// Broadcast-Zustand, nur im Verbindungszustand READY von Bedeutung
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BroadcastState {
    Stopped,
    Playing,
    Paused,
}

// ---------------------------------------------------------------------------
// Interne Lebenszyklus-Ereignisse
// ---------------------------------------------------------------------------

/// Lebenszyklus-Ereignisse eines Stage-Clients (ohne Gruppen-Kontext)
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEreignis {
    Verbindet,
    Verbunden,
    Bereit,
    Getrennt,
    Gekickt,
    Fehler(String),
    BroadcastGestartet,
    BroadcastGestoppt,
    Stumm,
    Freigeschaltet,
    Dauer(u64),
}

impl ClientEreignis {
    /// Terminale Ereignisse fuehren zur Austragung aus der Registry
    pub fn ist_terminal(&self) -> bool {
        matches!(self, Self::Getrennt | Self::Gekickt | Self::Fehler(_))
    }
}

// ---------------------------------------------------------------------------
// StageClient
// ---------------------------------------------------------------------------

struct ZustandsDaten {
    verbindung: ConnectionState,
    broadcast: BroadcastState,
    slot_id: Option<SlotId>,
    stumm: bool,
    /// Verhandlungs-Artefakte, write-once pro Verbindungsversuch
    sdp_offer: Option<String>,
    sdp_answer: Option<String>,
    dauer_task: Option<JoinHandle<()>>,
    bereit_task: Option<JoinHandle<()>>,
}

struct ClientInner {
    group_id: GroupId,
    peer: Arc<dyn PeerConnection>,
    zustand: Mutex<ZustandsDaten>,
    ereignis_tx: mpsc::UnboundedSender<ClientEreignis>,
}

/// Eine Stage-Session fuer genau eine Gruppe
///
/// Clone teilt den inneren Zustand (Arc); die Registry und die
/// Hintergrund-Tasks halten Klone derselben Session.
#[derive(Clone)]
pub struct StageClient {
    inner: Arc<ClientInner>,
}

impl StageClient {
    /// Erstellt einen frischen Client im Zustand IDLE
    pub fn neu(
        group_id: GroupId,
        peer: Arc<dyn PeerConnection>,
        ereignis_tx: mpsc::UnboundedSender<ClientEreignis>,
    ) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                group_id,
                peer,
                zustand: Mutex::new(ZustandsDaten {
                    verbindung: ConnectionState::Idle,
                    broadcast: BroadcastState::Stopped,
                    slot_id: None,
                    stumm: false,
                    sdp_offer: None,
                    sdp_answer: None,
                    dauer_task: None,
                    bereit_task: None,
                }),
                ereignis_tx,
            }),
        }
    }

    /// Gruppen-ID dieser Session
    pub fn group_id(&self) -> GroupId {
        self.inner.group_id
    }

    fn emit(&self, ereignis: ClientEreignis) {
        tracing::debug!(
            group_id = %self.inner.group_id,
            ereignis = ?ereignis,
            "Stage-Client Ereignis"
        );
        let _ = self.inner.ereignis_tx.send(ereignis);
    }

    // -----------------------------------------------------------------------
    // Verbindungsaufbau
    // -----------------------------------------------------------------------

    /// Startet den Verbindungsaufbau und erstellt das SDP-Offer
    ///
    /// IDLE -> CONNECTING. Das IDLE-Gate serialisiert konkurrierende
    /// Join-Versuche: der zweite Aufruf scheitert sofort statt eine
    /// zweite Peer-Verbindung zu erzeugen.
    pub async fn create_offer(&self) -> Result<String> {
        {
            let mut z = self.inner.zustand.lock();
            if z.verbindung != ConnectionState::Idle {
                return Err(RudelError::Vorbedingung(format!(
                    "Verbindungsaufbau fuer {} laeuft bereits oder Session ist beendet",
                    self.inner.group_id
                )));
            }
            z.verbindung = ConnectionState::Connecting;
        }
        self.emit(ClientEreignis::Verbindet);

        match self.inner.peer.create_offer().await {
            Ok(offer) => {
                self.inner.zustand.lock().sdp_offer = Some(offer.clone());
                Ok(offer)
            }
            Err(e) => {
                let grund = format!("SDP-Offer fehlgeschlagen: {}", e);
                self.fehler(grund.clone()).await;
                Err(RudelError::Verhandlung(grund))
            }
        }
    }

    /// Wendet die SDP-Answer des Servers an und merkt sich den Slot
    ///
    /// CONNECTING -> CONNECTED; startet den Bereit-Waechter der den
    /// Uebergang CONNECTED -> READY ausfuehrt sobald der Transport das
    /// einmalige Bereit-Signal liefert.
    pub async fn apply_answer(&self, sdp: &str, slot_id: SlotId) -> Result<()> {
        {
            let z = self.inner.zustand.lock();
            if z.verbindung != ConnectionState::Connecting {
                return Err(RudelError::Vorbedingung(format!(
                    "SDP-Answer fuer {} ausserhalb des Verbindungsaufbaus",
                    self.inner.group_id
                )));
            }
            if z.sdp_answer.is_some() {
                return Err(RudelError::Verhandlung(
                    "SDP-Answer wurde bereits angewendet".into(),
                ));
            }
        }

        if let Err(e) = self.inner.peer.apply_answer(sdp).await {
            let grund = format!("SDP-Answer nicht anwendbar: {}", e);
            self.fehler(grund.clone()).await;
            return Err(RudelError::Verhandlung(grund));
        }

        {
            let mut z = self.inner.zustand.lock();
            z.sdp_answer = Some(sdp.to_string());
            z.verbindung = ConnectionState::Connected;
            z.slot_id = Some(slot_id);
        }
        self.emit(ClientEreignis::Verbunden);

        let waechter = {
            let client = self.clone();
            tokio::spawn(async move {
                match client.inner.peer.warte_auf_bereit().await {
                    Ok(()) => client.markiere_bereit(),
                    Err(e) => {
                        client
                            .fehler(format!("Transport meldet Fehler vor Bereitschaft: {}", e))
                            .await
                    }
                }
            })
        };
        self.inner.zustand.lock().bereit_task = Some(waechter);

        Ok(())
    }

    /// CONNECTED -> READY, vom Bereit-Waechter aufgerufen
    fn markiere_bereit(&self) {
        {
            let mut z = self.inner.zustand.lock();
            if z.verbindung != ConnectionState::Connected {
                return;
            }
            z.verbindung = ConnectionState::Ready;
        }
        self.emit(ClientEreignis::Bereit);
    }

    // -----------------------------------------------------------------------
    // Broadcast-Steuerung
    // -----------------------------------------------------------------------

    /// Sendet Audio-Daten; startet den Broadcast falls er gestoppt war
    ///
    /// STOPPED -> PLAYING. Ausserhalb von READY ist das ein Fehler.
    pub async fn broadcast(&self, daten: Bytes) -> Result<()> {
        let starten = {
            let mut z = self.inner.zustand.lock();
            if z.verbindung != ConnectionState::Ready {
                return Err(RudelError::NichtBereit(format!(
                    "Session fuer {} ist nicht bereit",
                    self.inner.group_id
                )));
            }
            match z.broadcast {
                BroadcastState::Stopped => {
                    z.broadcast = BroadcastState::Playing;
                    true
                }
                BroadcastState::Playing => false,
                BroadcastState::Paused => {
                    return Err(RudelError::Vorbedingung(
                        "Broadcast ist pausiert; zuerst fortsetzen".into(),
                    ));
                }
            }
        };

        if starten {
            self.emit(ClientEreignis::BroadcastGestartet);
            self.starte_dauer_ticker();
        }

        if let Err(e) = self.inner.peer.sende_audio(daten).await {
            let grund = format!("Audio-Versand fehlgeschlagen: {}", e);
            self.fehler(grund.clone()).await;
            return Err(RudelError::Verhandlung(grund));
        }
        Ok(())
    }

    /// PLAYING -> PAUSED; false wenn gerade nichts laeuft
    pub fn pause(&self) -> Result<bool> {
        let mut z = self.inner.zustand.lock();
        if z.verbindung != ConnectionState::Ready {
            return Err(RudelError::NichtBereit(format!(
                "Session fuer {} ist nicht bereit",
                self.inner.group_id
            )));
        }
        if z.broadcast == BroadcastState::Playing {
            z.broadcast = BroadcastState::Paused;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// PAUSED -> PLAYING; false wenn nichts pausiert war
    pub fn resume(&self) -> Result<bool> {
        let mut z = self.inner.zustand.lock();
        if z.verbindung != ConnectionState::Ready {
            return Err(RudelError::NichtBereit(format!(
                "Session fuer {} ist nicht bereit",
                self.inner.group_id
            )));
        }
        if z.broadcast == BroadcastState::Paused {
            z.broadcast = BroadcastState::Playing;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// PLAYING|PAUSED -> STOPPED; false wenn bereits gestoppt
    pub fn stop(&self) -> Result<bool> {
        let gestoppt = {
            let mut z = self.inner.zustand.lock();
            if z.verbindung != ConnectionState::Ready {
                return Err(RudelError::NichtBereit(format!(
                    "Session fuer {} ist nicht bereit",
                    self.inner.group_id
                )));
            }
            if z.broadcast == BroadcastState::Stopped {
                false
            } else {
                z.broadcast = BroadcastState::Stopped;
                if let Some(task) = z.dauer_task.take() {
                    task.abort();
                }
                true
            }
        };
        if gestoppt {
            self.emit(ClientEreignis::BroadcastGestoppt);
        }
        Ok(gestoppt)
    }

    /// Sekundentakt waehrend eines laufenden Broadcasts
    ///
    /// Pausierte Abschnitte zaehlen nicht; der Ticker endet mit dem
    /// Broadcast oder dem Abbau der Session.
    fn starte_dauer_ticker(&self) {
        let client = self.clone();
        let task = tokio::spawn(async move {
            let mut sekunden: u64 = 0;
            let mut takt = tokio::time::interval(Duration::from_secs(1));
            // interval feuert sofort; den ersten Tick verwerfen
            takt.tick().await;
            loop {
                takt.tick().await;
                let broadcast = client.inner.zustand.lock().broadcast;
                match broadcast {
                    BroadcastState::Playing => {
                        sekunden += 1;
                        client.emit(ClientEreignis::Dauer(sekunden));
                    }
                    BroadcastState::Paused => {}
                    BroadcastState::Stopped => break,
                }
            }
        });
        self.inner.zustand.lock().dauer_task = Some(task);
    }

    // -----------------------------------------------------------------------
    // Mute-Spiegelung
    // -----------------------------------------------------------------------

    /// Spiegelt den serverseitigen Mute-Zustand des eigenen Slots
    pub fn setze_stumm(&self, stumm: bool) {
        let geaendert = {
            let mut z = self.inner.zustand.lock();
            if z.stumm == stumm {
                false
            } else {
                z.stumm = stumm;
                true
            }
        };
        if geaendert {
            self.emit(if stumm {
                ClientEreignis::Stumm
            } else {
                ClientEreignis::Freigeschaltet
            });
        }
    }

    // -----------------------------------------------------------------------
    // Terminale Uebergaenge
    // -----------------------------------------------------------------------

    /// Beendet die Session: DISCONNECTED (selbst) oder KICKED (fremd)
    ///
    /// Idempotent; aus einem terminalen Zustand gibt es keinen Weg
    /// zurueck.
    pub async fn trennen(&self, gekickt: bool) {
        let war_aktiv = self.abbauen(if gekickt {
            ConnectionState::Kicked
        } else {
            ConnectionState::Disconnected
        });
        if war_aktiv {
            self.inner.peer.schliessen().await;
            self.emit(if gekickt {
                ClientEreignis::Gekickt
            } else {
                ClientEreignis::Getrennt
            });
        }
    }

    /// Terminale Fehlertransition (Verhandlung oder Transport)
    pub async fn fehler(&self, grund: impl Into<String>) {
        let grund = grund.into();
        let war_aktiv = self.abbauen(ConnectionState::Errored);
        if war_aktiv {
            tracing::warn!(
                group_id = %self.inner.group_id,
                grund = %grund,
                "Stage-Session fehlgeschlagen"
            );
            self.inner.peer.schliessen().await;
            self.emit(ClientEreignis::Fehler(grund));
        }
    }

    /// Setzt den terminalen Zustand und stoppt Hintergrund-Tasks
    ///
    /// Gibt false zurueck wenn die Session schon terminal war.
    fn abbauen(&self, ziel: ConnectionState) -> bool {
        let mut z = self.inner.zustand.lock();
        if z.verbindung.ist_terminal() {
            return false;
        }
        z.verbindung = ziel;
        z.broadcast = BroadcastState::Stopped;
        if let Some(task) = z.dauer_task.take() {
            task.abort();
        }
        // Der Bereit-Waechter wird nicht abgebrochen: markiere_bereit
        // prueft den Zustand und ist gegen verspaetete Signale immun.
        z.bereit_task.take();
        true
    }

    // -----------------------------------------------------------------------
    // Proben
    // -----------------------------------------------------------------------

    /// Aktueller Verbindungszustand
    pub fn verbindungszustand(&self) -> ConnectionState {
        self.inner.zustand.lock().verbindung
    }

    /// Aktueller Broadcast-Zustand
    pub fn broadcast_zustand(&self) -> BroadcastState {
        self.inner.zustand.lock().broadcast
    }

    /// Belegter Slot, erst nach erfolgreichem Join gesetzt
    pub fn slot_id(&self) -> Option<SlotId> {
        self.inner.zustand.lock().slot_id
    }

    pub fn ist_verbindend(&self) -> bool {
        self.verbindungszustand() == ConnectionState::Connecting
    }

    pub fn ist_verbunden(&self) -> bool {
        matches!(
            self.verbindungszustand(),
            ConnectionState::Connected | ConnectionState::Ready
        )
    }

    pub fn ist_bereit(&self) -> bool {
        self.verbindungszustand() == ConnectionState::Ready
    }

    pub fn ist_am_broadcasten(&self) -> bool {
        self.broadcast_zustand() == BroadcastState::Playing
    }

    pub fn ist_stumm(&self) -> bool {
        self.inner.zustand.lock().stumm
    }
}
