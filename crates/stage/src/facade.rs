//! StageService – oeffentlicher Vertrag des Stage-Subsystems
//!
//! Jede Operation durchlaeuft dieselben Stufen:
//! 1. strukturelle Validierung der Argumente (erste Verletzung gewinnt)
//! 2. Aufloesung der Stage-Konfiguration samt Enabled-Pruefung
//! 3. Slot-Aufloesung und Vorbedingungen (Existenz, Belegung, Sperre,
//!    Reputations-Gate)
//! 4. Delegation an StageClient bzw. Kommando-Kanal
//! 5. bei Erfolg optimistische Aktualisierung des Slot-Caches
//!
//! Fehler verlassen den Service immer mit angehaengter Aufruf-Signatur;
//! die Fehlerklasse bleibt dabei unveraendert (`kern()`).
//!
//! Proben (`is_*`, `pause`, `resume`, `stop`) behandeln "keine Session
//! fuer diese Gruppe" als Normalzustand und liefern false statt eines
//! Fehlers; Inhalts-Operationen (`join_slot`, `broadcast`, Kicks)
//! schlagen fehl.

use crate::client::StageClient;
use crate::directory::{GroupDirectory, Identitaet};
use crate::manager::StageManager;
use crate::rtc::PeerConnectionFactory;
use crate::slots::SlotRegister;
use bytes::Bytes;
use dashmap::DashMap;
use parking_lot::RwLock;
use rudel_core::event::RudelEvent;
use rudel_core::types::{GroupId, SlotId, SubscriberId};
use rudel_core::{AufrufKontext, Result, RudelError};
use rudel_protocol::commands::Command;
use rudel_protocol::push::{PushEvent, SlotUpdatePush};
use rudel_protocol::response::RpcResponse;
use rudel_protocol::stage::{
    BroadcastDisconnectRequest, BroadcastRequest, BroadcastUpdateRequest, GroupActiveListRequest,
    JoinSlotResponse, Slot, SlotLockUpdate, SlotUpdateRequest, StageInfo, StageSettings,
};
use rudel_protocol::SignalingChannel;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

/// Orchestriert SlotRegister, StageManager und Kommando-Kanal
pub struct StageService {
    kanal: Arc<dyn SignalingChannel>,
    gruppen: Arc<dyn GroupDirectory>,
    identitaet: Arc<RwLock<Identitaet>>,
    slots: SlotRegister,
    manager: StageManager,
    /// Plattformweite Stage-Themen (STAGE_LIST), lazy gefuellt
    stage_liste: RwLock<Vec<StageInfo>>,
    /// Aktive Stages pro Gruppe (STAGE_GROUP_ACTIVE_LIST)
    aktive_stages: DashMap<GroupId, Vec<StageInfo>>,
    /// Hoererzahlen aus groupAudioCountUpdate-Pushes
    hoererzahlen: DashMap<GroupId, u32>,
}

impl StageService {
    /// Erstellt den Service mit seinen Collaborator-Anbindungen
    pub fn neu(
        kanal: Arc<dyn SignalingChannel>,
        gruppen: Arc<dyn GroupDirectory>,
        identitaet: Arc<RwLock<Identitaet>>,
        fabrik: Arc<dyn PeerConnectionFactory>,
    ) -> Arc<Self> {
        Arc::new(Self {
            kanal: Arc::clone(&kanal),
            gruppen,
            identitaet,
            slots: SlotRegister::neu(kanal),
            manager: StageManager::neu(fabrik),
            stage_liste: RwLock::new(Vec::new()),
            aktive_stages: DashMap::new(),
            hoererzahlen: DashMap::new(),
        })
    }

    /// Abonniert die nach aussen gerichteten Stage-Ereignisse
    pub fn events(&self) -> broadcast::Receiver<RudelEvent> {
        self.manager.abonnieren()
    }

    // -----------------------------------------------------------------------
    // Gemeinsame Pruefstufen
    // -----------------------------------------------------------------------

    fn pruefe_group_id(group_id: GroupId) -> Result<()> {
        if !group_id.ist_gueltig() {
            return Err(RudelError::validierung(
                "group_id",
                "muss groesser als 0 sein",
            ));
        }
        Ok(())
    }

    fn pruefe_slot_id(slot_id: SlotId) -> Result<()> {
        if !slot_id.ist_gueltig() {
            return Err(RudelError::validierung(
                "slot_id",
                "muss groesser als 0 sein",
            ));
        }
        Ok(())
    }

    fn pruefe_subscriber_id(subscriber_id: SubscriberId) -> Result<()> {
        if !subscriber_id.ist_gueltig() {
            return Err(RudelError::validierung(
                "subscriber_id",
                "muss groesser als 0 sein",
            ));
        }
        Ok(())
    }

    /// Loest die Stage-Konfiguration auf (ohne Enabled-Pruefung)
    async fn settings_aufloesen(
        &self,
        group_id: GroupId,
        force_refresh: bool,
    ) -> Result<StageSettings> {
        let profil = self
            .gruppen
            .group_by_id(group_id, force_refresh)
            .await?
            .ok_or_else(|| RudelError::NichtGefunden(format!("Gruppe {}", group_id.inner())))?;

        profil.audio_config.ok_or_else(|| {
            RudelError::Konfiguration(format!(
                "Gruppe {} hat keine Stage-Konfiguration",
                group_id.inner()
            ))
        })
    }

    /// Pflicht-Pruefung vor jeder Slot-Mutation: Stage muss aktiv sein
    async fn settings_geprueft(&self, group_id: GroupId) -> Result<StageSettings> {
        let settings = self.settings_aufloesen(group_id, false).await?;
        if !settings.enabled {
            return Err(RudelError::StageDeaktiviert);
        }
        Ok(settings)
    }

    /// Slot-Liste laden; eine leere Liste ist fuer Mutationen unbrauchbar
    async fn slots_geladen(&self, group_id: GroupId) -> Result<Vec<Slot>> {
        let slots = self.slots.get(group_id, false).await?;
        if slots.is_empty() {
            return Err(RudelError::Konfiguration(format!(
                "keine Slots fuer Gruppe {} verfuegbar",
                group_id.inner()
            )));
        }
        Ok(slots)
    }

    fn payload<T: serde::Serialize>(wert: &T) -> Result<Value> {
        serde_json::to_value(wert)
            .map_err(|e| RudelError::Transport(format!("Payload nicht serialisierbar: {}", e)))
    }

    fn selbst(&self) -> Identitaet {
        *self.identitaet.read()
    }

    // -----------------------------------------------------------------------
    // Einstellungen und Listen
    // -----------------------------------------------------------------------

    /// Stage-Konfiguration einer Gruppe
    ///
    /// Schlaegt fuer deaktivierte Stages fehl — dieselbe Pruefung die
    /// jeder Slot-Mutation vorgeschaltet ist.
    pub async fn get_group_settings(
        &self,
        group_id: GroupId,
        force_refresh: bool,
    ) -> Result<StageSettings> {
        let ergebnis = async {
            Self::pruefe_group_id(group_id)?;
            let settings = self.settings_aufloesen(group_id, force_refresh).await?;
            if !settings.enabled {
                return Err(RudelError::StageDeaktiviert);
            }
            Ok(settings)
        }
        .await;
        ergebnis.aufruf(|| {
            format!(
                "stage.get_group_settings(group_id={}, force_refresh={})",
                group_id.inner(),
                force_refresh
            )
        })
    }

    /// Plattformweite Liste der Stage-Themen, gecacht bis zum Refresh
    pub async fn get_stage_list(&self, force_refresh: bool) -> Result<Vec<StageInfo>> {
        let ergebnis = async {
            if !force_refresh {
                let cache = self.stage_liste.read();
                if !cache.is_empty() {
                    return Ok(cache.clone());
                }
            }

            let antwort = self.kanal.emit(Command::StageList, Value::Null).await?;
            if antwort.success {
                *self.stage_liste.write() = antwort.body_als()?;
            }
            Ok(self.stage_liste.read().clone())
        }
        .await;
        ergebnis.aufruf(|| format!("stage.get_stage_list(force_refresh={})", force_refresh))
    }

    /// Aktive Stages einer Gruppe, gecacht pro Gruppe
    pub async fn get_stage_list_for_group(
        &self,
        group_id: GroupId,
        force_refresh: bool,
    ) -> Result<Vec<StageInfo>> {
        let ergebnis = async {
            Self::pruefe_group_id(group_id)?;
            self.settings_geprueft(group_id).await?;

            if !force_refresh {
                if let Some(liste) = self.aktive_stages.get(&group_id) {
                    if !liste.is_empty() {
                        return Ok(liste.clone());
                    }
                }
            }

            let anfrage = GroupActiveListRequest { id: group_id };
            let antwort = self
                .kanal
                .emit(Command::StageGroupActiveList, Self::payload(&anfrage)?)
                .await?;
            if antwort.success {
                self.aktive_stages.insert(group_id, antwort.body_als()?);
            }
            Ok(self
                .aktive_stages
                .get(&group_id)
                .map(|r| r.clone())
                .unwrap_or_default())
        }
        .await;
        ergebnis.aufruf(|| {
            format!(
                "stage.get_stage_list_for_group(group_id={}, force_refresh={})",
                group_id.inner(),
                force_refresh
            )
        })
    }

    /// Slot-Belegung einer Gruppe
    pub async fn get_slots(&self, group_id: GroupId, force_refresh: bool) -> Result<Vec<Slot>> {
        let ergebnis = async {
            Self::pruefe_group_id(group_id)?;
            self.settings_geprueft(group_id).await?;
            self.slots.get(group_id, force_refresh).await
        }
        .await;
        ergebnis.aufruf(|| {
            format!(
                "stage.get_slots(group_id={}, force_refresh={})",
                group_id.inner(),
                force_refresh
            )
        })
    }

    // -----------------------------------------------------------------------
    // Slot-Mutationen
    // -----------------------------------------------------------------------

    /// Aendert den Mute-Zustand eines Slots
    ///
    /// Stummschalten darf nur der Belegende selbst; Freischalten und
    /// Moderations-Eingriffe sind jedem erlaubt. Diese Asymmetrie ist
    /// eine Geschaeftsregel der Plattform.
    pub async fn update_slot_mute_state(
        &self,
        group_id: GroupId,
        slot_id: SlotId,
        is_muted: bool,
    ) -> Result<RpcResponse> {
        let ergebnis = async {
            Self::pruefe_group_id(group_id)?;
            Self::pruefe_slot_id(slot_id)?;
            self.settings_geprueft(group_id).await?;

            let slots = self.slots_geladen(group_id).await?;
            let slot = slots
                .iter()
                .find(|s| s.id == slot_id)
                .ok_or_else(|| RudelError::NichtGefunden(format!("Slot {}", slot_id.inner())))?;

            let occupier = slot.occupier_id.ok_or_else(|| {
                RudelError::Vorbedingung("kein Subscriber belegt diesen Slot".into())
            })?;

            let selbst = self.selbst().subscriber_id;
            if is_muted && occupier != selbst {
                return Err(RudelError::Vorbedingung(
                    "nur der Belegende kann seinen Slot stummschalten".into(),
                ));
            }

            let anfrage = BroadcastUpdateRequest {
                id: group_id,
                slot_id,
                occupier_id: occupier,
                occupier_muted: is_muted,
            };
            let antwort = self
                .kanal
                .emit(Command::GroupAudioBroadcastUpdate, Self::payload(&anfrage)?)
                .await?;

            if antwort.success {
                self.slots.setze_mute(group_id, slot_id, is_muted);
                if occupier == selbst {
                    if let Some(client) = self.manager.get(group_id) {
                        client.setze_stumm(is_muted);
                    }
                }
            }
            Ok(antwort)
        }
        .await;
        ergebnis.aufruf(|| {
            format!(
                "stage.update_slot_mute_state(group_id={}, slot_id={}, is_muted={})",
                group_id.inner(),
                slot_id.inner(),
                is_muted
            )
        })
    }

    /// Aendert den Sperr-Zustand eines Slots (jedem Aufrufer erlaubt)
    pub async fn update_slot_lock_state(
        &self,
        group_id: GroupId,
        slot_id: SlotId,
        is_locked: bool,
    ) -> Result<RpcResponse> {
        let ergebnis = async {
            Self::pruefe_group_id(group_id)?;
            Self::pruefe_slot_id(slot_id)?;
            self.settings_geprueft(group_id).await?;

            let slots = self.slots_geladen(group_id).await?;
            if !slots.iter().any(|s| s.id == slot_id) {
                return Err(RudelError::NichtGefunden(format!("Slot {}", slot_id.inner())));
            }

            let anfrage = SlotUpdateRequest {
                id: group_id,
                slot: SlotLockUpdate {
                    id: slot_id,
                    locked: is_locked,
                },
            };
            let antwort = self
                .kanal
                .emit(Command::GroupAudioSlotUpdate, Self::payload(&anfrage)?)
                .await?;

            if antwort.success {
                self.slots.setze_sperre(group_id, slot_id, is_locked);
            }
            Ok(antwort)
        }
        .await;
        ergebnis.aufruf(|| {
            format!(
                "stage.update_slot_lock_state(group_id={}, slot_id={}, is_locked={})",
                group_id.inner(),
                slot_id.inner(),
                is_locked
            )
        })
    }

    /// Gibt den eigenen Slot frei und beendet die Session
    pub async fn leave_slot(&self, group_id: GroupId) -> Result<RpcResponse> {
        let ergebnis = async {
            Self::pruefe_group_id(group_id)?;
            self.settings_geprueft(group_id).await?;

            let selbst = self.selbst().subscriber_id;
            let slots = self.slots_geladen(group_id).await?;
            let slot = slots
                .iter()
                .find(|s| s.occupier_id == Some(selbst))
                .ok_or_else(|| {
                    RudelError::Vorbedingung("Bot belegt keinen Slot in dieser Gruppe".into())
                })?;

            // Session vor dem Kommando abbauen; der Server bestaetigt
            // die Freigabe anschliessend per Push
            self.manager.remove(group_id).await;

            let anfrage = BroadcastDisconnectRequest {
                id: group_id,
                slot_id: slot.id,
                occupier_id: selbst,
            };
            let antwort = self
                .kanal
                .emit(
                    Command::GroupAudioBroadcastDisconnect,
                    Self::payload(&anfrage)?,
                )
                .await?;

            if antwort.success {
                self.slots.belegung_loeschen(group_id, slot.id);
            }
            Ok(antwort)
        }
        .await;
        ergebnis.aufruf(|| format!("stage.leave_slot(group_id={})", group_id.inner()))
    }

    /// Wirft den Belegenden eines Slots von der Stage
    pub async fn kick_slot(&self, group_id: GroupId, slot_id: SlotId) -> Result<RpcResponse> {
        let ergebnis = async {
            Self::pruefe_group_id(group_id)?;
            Self::pruefe_slot_id(slot_id)?;
            self.settings_geprueft(group_id).await?;

            let slots = self.slots_geladen(group_id).await?;
            let slot = slots
                .iter()
                .find(|s| s.id == slot_id)
                .ok_or_else(|| RudelError::NichtGefunden(format!("Slot {}", slot_id.inner())))?;
            let occupier = slot.occupier_id.ok_or_else(|| {
                RudelError::Vorbedingung("kein Subscriber belegt diesen Slot".into())
            })?;

            let anfrage = BroadcastDisconnectRequest {
                id: group_id,
                slot_id,
                occupier_id: occupier,
            };
            let antwort = self
                .kanal
                .emit(
                    Command::GroupAudioBroadcastDisconnect,
                    Self::payload(&anfrage)?,
                )
                .await?;

            if antwort.success {
                self.slots.belegung_loeschen(group_id, slot_id);
            }
            Ok(antwort)
        }
        .await;
        ergebnis.aufruf(|| {
            format!(
                "stage.kick_slot(group_id={}, slot_id={})",
                group_id.inner(),
                slot_id.inner()
            )
        })
    }

    /// Wirft einen Subscriber von der Stage, egal welchen Slot er haelt
    pub async fn kick_subscriber_from_stage(
        &self,
        group_id: GroupId,
        subscriber_id: SubscriberId,
    ) -> Result<RpcResponse> {
        let ergebnis = async {
            Self::pruefe_group_id(group_id)?;
            Self::pruefe_subscriber_id(subscriber_id)?;
            self.settings_geprueft(group_id).await?;

            let slots = self.slots_geladen(group_id).await?;
            let slot = slots
                .iter()
                .find(|s| s.occupier_id == Some(subscriber_id))
                .ok_or_else(|| {
                    RudelError::NichtGefunden(format!(
                        "Subscriber {} belegt keinen Slot in dieser Gruppe",
                        subscriber_id.inner()
                    ))
                })?;

            self.kick_slot(group_id, slot.id).await
        }
        .await;
        ergebnis.aufruf(|| {
            format!(
                "stage.kick_subscriber_from_stage(group_id={}, subscriber_id={})",
                group_id.inner(),
                subscriber_id.inner()
            )
        })
    }

    // -----------------------------------------------------------------------
    // Join und Verhandlung
    // -----------------------------------------------------------------------

    /// Belegt einen Slot
    ///
    /// Mit mitgeliefertem SDP (eigenes RTC des Aufrufers) geht das
    /// Kommando direkt raus und die Antwort kommt roh zurueck. Ohne SDP
    /// verwaltet der Service die Peer-Verbindung selbst: Offer erzeugen,
    /// Join senden, Answer anwenden. Beide Zweige teilen Validierung
    /// und Antwortbehandlung.
    pub async fn join_slot(
        &self,
        group_id: GroupId,
        slot_id: SlotId,
        sdp: Option<String>,
    ) -> Result<JoinSlotResponse> {
        let hat_eigenes_sdp = sdp.is_some();
        let ergebnis = async {
            Self::pruefe_group_id(group_id)?;
            Self::pruefe_slot_id(slot_id)?;

            let settings = self.settings_geprueft(group_id).await?;
            let selbst = self.selbst();
            if settings.min_reputation_level > selbst.stufe() {
                return Err(RudelError::Vorbedingung(format!(
                    "Stage erfordert mindestens Reputationsstufe {}",
                    settings.min_reputation_level
                )));
            }

            let slots = self.slots_geladen(group_id).await?;
            if slots
                .iter()
                .any(|s| s.occupier_id == Some(selbst.subscriber_id))
            {
                return Err(RudelError::Vorbedingung(
                    "Bot belegt bereits einen Slot in dieser Gruppe".into(),
                ));
            }

            let slot = slots
                .iter()
                .find(|s| s.id == slot_id)
                .ok_or_else(|| RudelError::NichtGefunden(format!("Slot {}", slot_id.inner())))?;
            if slot.ist_belegt() {
                return Err(RudelError::Vorbedingung(
                    "ein Subscriber belegt diesen Slot bereits".into(),
                ));
            }
            if slot.locked {
                return Err(RudelError::Vorbedingung("Slot ist gesperrt".into()));
            }

            match sdp {
                Some(eigenes_sdp) => {
                    // Aufrufer bringt sein eigenes RTC mit
                    let antwort = self.join_senden(group_id, slot_id, eigenes_sdp).await?;
                    if !antwort.success {
                        return Err(RudelError::Verhandlung(format!(
                            "Server hat den Join abgelehnt (code={:?})",
                            antwort.code
                        )));
                    }
                    let join: JoinSlotResponse = antwort.body_als()?;
                    self.slots.slot_einsetzen(group_id, join.slot.clone());
                    Ok(join)
                }
                None => {
                    let client = self.manager.get_or_create(group_id);
                    let offer = client.create_offer().await?;

                    match self.join_senden(group_id, slot_id, offer).await {
                        Ok(antwort) if antwort.success => {
                            let join: JoinSlotResponse = match antwort.body_als() {
                                Ok(join) => join,
                                Err(e) => {
                                    client.fehler(e.to_string()).await;
                                    return Err(e);
                                }
                            };
                            client.apply_answer(&join.sdp, join.slot.id).await?;
                            self.slots.slot_einsetzen(group_id, join.slot.clone());
                            Ok(join)
                        }
                        Ok(antwort) => {
                            let grund = format!(
                                "Server hat den Join abgelehnt (code={:?})",
                                antwort.code
                            );
                            client.fehler(grund.clone()).await;
                            Err(RudelError::Verhandlung(grund))
                        }
                        Err(e) => {
                            client.fehler(e.to_string()).await;
                            Err(e)
                        }
                    }
                }
            }
        }
        .await;
        ergebnis.aufruf(|| {
            format!(
                "stage.join_slot(group_id={}, slot_id={}, sdp={})",
                group_id.inner(),
                slot_id.inner(),
                if hat_eigenes_sdp { "extern" } else { "verwaltet" }
            )
        })
    }

    async fn join_senden(
        &self,
        group_id: GroupId,
        slot_id: SlotId,
        sdp: String,
    ) -> Result<RpcResponse> {
        let anfrage = BroadcastRequest {
            id: group_id,
            slot_id,
            sdp,
        };
        self.kanal
            .emit(Command::GroupAudioBroadcast, Self::payload(&anfrage)?)
            .await
    }

    /// Bereitschafts-Pruefung fuer den Konsum fremder Broadcasts
    ///
    /// TODO: Consume-Verhandlung anbinden sobald der Server Listen-Only-SDP
    /// auf diesem Kommando akzeptiert; bis dahin endet der Pfad nach den
    /// Pruefungen.
    pub async fn consume_slot(
        &self,
        group_id: GroupId,
        _slot_id: SlotId,
        _sdp: &str,
    ) -> Result<()> {
        let ergebnis = async {
            Self::pruefe_group_id(group_id)?;
            let client = self.manager.get(group_id).ok_or_else(|| {
                RudelError::Vorbedingung("Bot ist in dieser Gruppe nicht auf der Stage".into())
            })?;
            if !client.ist_bereit() {
                return Err(RudelError::NichtBereit(format!(
                    "Session fuer {} ist nicht bereit",
                    group_id
                )));
            }
            Ok(())
        }
        .await;
        ergebnis.aufruf(|| format!("stage.consume_slot(group_id={})", group_id.inner()))
    }

    // -----------------------------------------------------------------------
    // Broadcast-Steuerung
    // -----------------------------------------------------------------------

    /// Sendet Audio-Daten in die laufende Session
    pub async fn broadcast(&self, group_id: GroupId, daten: Bytes) -> Result<()> {
        let ergebnis = async {
            Self::pruefe_group_id(group_id)?;
            let client = self.manager.get(group_id).ok_or_else(|| {
                RudelError::Vorbedingung("Bot ist in dieser Gruppe nicht auf der Stage".into())
            })?;
            client.broadcast(daten).await
        }
        .await;
        ergebnis.aufruf(|| format!("stage.broadcast(group_id={})", group_id.inner()))
    }

    /// Pausiert den Broadcast; false wenn keine Session existiert
    pub async fn pause(&self, group_id: GroupId) -> Result<bool> {
        let ergebnis = async {
            Self::pruefe_group_id(group_id)?;
            match self.manager.get(group_id) {
                Some(client) => client.pause(),
                None => Ok(false),
            }
        }
        .await;
        ergebnis.aufruf(|| format!("stage.pause(group_id={})", group_id.inner()))
    }

    /// Setzt den Broadcast fort; false wenn keine Session existiert
    pub async fn resume(&self, group_id: GroupId) -> Result<bool> {
        let ergebnis = async {
            Self::pruefe_group_id(group_id)?;
            match self.manager.get(group_id) {
                Some(client) => client.resume(),
                None => Ok(false),
            }
        }
        .await;
        ergebnis.aufruf(|| format!("stage.resume(group_id={})", group_id.inner()))
    }

    /// Beendet den Broadcast; false wenn keine Session existiert
    pub async fn stop(&self, group_id: GroupId) -> Result<bool> {
        let ergebnis = async {
            Self::pruefe_group_id(group_id)?;
            match self.manager.get(group_id) {
                Some(client) => client.stop(),
                None => Ok(false),
            }
        }
        .await;
        ergebnis.aufruf(|| format!("stage.stop(group_id={})", group_id.inner()))
    }

    // -----------------------------------------------------------------------
    // Proben
    // -----------------------------------------------------------------------

    fn probe<T>(
        &self,
        group_id: GroupId,
        ohne_session: T,
        f: impl FnOnce(&StageClient) -> T,
    ) -> Result<T> {
        Self::pruefe_group_id(group_id)?;
        Ok(self
            .manager
            .get(group_id)
            .map_or(ohne_session, |client| f(&client)))
    }

    /// Ist der eigene Slot stummgeschaltet?
    pub fn is_muted(&self, group_id: GroupId) -> Result<bool> {
        self.probe(group_id, false, |c| c.ist_stumm())
            .aufruf(|| format!("stage.is_muted(group_id={})", group_id.inner()))
    }

    /// Laeuft gerade ein Broadcast?
    pub fn is_broadcasting(&self, group_id: GroupId) -> Result<bool> {
        self.probe(group_id, false, |c| c.ist_am_broadcasten())
            .aufruf(|| format!("stage.is_broadcasting(group_id={})", group_id.inner()))
    }

    /// Ist die Session verbunden (CONNECTED oder READY)?
    pub fn is_connected(&self, group_id: GroupId) -> Result<bool> {
        self.probe(group_id, false, |c| c.ist_verbunden())
            .aufruf(|| format!("stage.is_connected(group_id={})", group_id.inner()))
    }

    /// Laeuft der Verbindungsaufbau noch?
    pub fn is_connecting(&self, group_id: GroupId) -> Result<bool> {
        self.probe(group_id, false, |c| c.ist_verbindend())
            .aufruf(|| format!("stage.is_connecting(group_id={})", group_id.inner()))
    }

    /// Ist die Session vollstaendig etabliert?
    pub fn is_ready(&self, group_id: GroupId) -> Result<bool> {
        self.probe(group_id, false, |c| c.ist_bereit())
            .aufruf(|| format!("stage.is_ready(group_id={})", group_id.inner()))
    }

    /// Existiert eine Session fuer diese Gruppe?
    pub fn has_client(&self, group_id: GroupId) -> Result<bool> {
        Self::pruefe_group_id(group_id)
            .map(|_| self.manager.ist_registriert(group_id))
            .aufruf(|| format!("stage.has_client(group_id={})", group_id.inner()))
    }

    /// Der belegte Slot der eigenen Session, falls vorhanden
    pub fn slot_id(&self, group_id: GroupId) -> Result<Option<SlotId>> {
        self.probe(group_id, None, |c| c.slot_id())
            .aufruf(|| format!("stage.slot_id(group_id={})", group_id.inner()))
    }

    /// Letzte gepushte Hoererzahl der Gruppe
    pub fn audio_count(&self, group_id: GroupId) -> Option<u32> {
        self.hoererzahlen.get(&group_id).map(|r| *r)
    }

    // -----------------------------------------------------------------------
    // Push-Verarbeitung
    // -----------------------------------------------------------------------

    /// Startet den einmaligen Push-Konsum fuer dieses Subsystem
    ///
    /// Der Transport garantiert FIFO pro Gruppe; hier wird nichts
    /// umgeordnet.
    pub fn starte_push_verarbeitung(
        self: &Arc<Self>,
        mut rx: mpsc::UnboundedReceiver<PushEvent>,
    ) -> JoinHandle<()> {
        let service = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(ereignis) = rx.recv().await {
                service.verarbeite_push(ereignis).await;
            }
        })
    }

    /// Verteilt ein Push-Ereignis an Register und Session
    pub async fn verarbeite_push(&self, ereignis: PushEvent) {
        match ereignis {
            PushEvent::GroupAudioSlotUpdate(update) => self.verarbeite_slot_update(update).await,
            PushEvent::GroupAudioCountUpdate(update) => {
                self.hoererzahlen.insert(update.id, update.count);
            }
            PushEvent::GroupMemberUpdate(update) => self.slots.apply_occupancy_change(&update),
        }
    }

    async fn verarbeite_slot_update(&self, update: SlotUpdatePush) {
        self.slots.apply_push(update.id, update.slot.clone());

        let Some(client) = self.manager.get(update.id) else {
            return;
        };
        if client.slot_id() != Some(update.slot.id) {
            return;
        }

        let selbst = self.selbst().subscriber_id;
        if update.slot.occupier_id.is_none() {
            // Belegung beendet: eigener Ausloeser = Trennung, fremder = Kick
            let gekickt = update
                .source_subscriber_id
                .map_or(true, |quelle| quelle != selbst);
            client.trennen(gekickt).await;
        } else if update.slot.occupier_id == Some(selbst) {
            client.setze_stumm(update.slot.occupier_muted);
        }
    }

    // -----------------------------------------------------------------------
    // Aufraeumen
    // -----------------------------------------------------------------------

    /// Baut alle Sessions ab und verwirft saemtliche Caches
    ///
    /// Wird beim Reconnect-Zyklus der Socket-Verbindung aufgerufen; die
    /// naechste Operation fuellt die Caches neu.
    pub async fn bereinigen(&self) {
        self.manager.bereinigen().await;
        self.slots.alles_leeren();
        self.stage_liste.write().clear();
        self.aktive_stages.clear();
        self.hoererzahlen.clear();
        tracing::info!("Stage-Subsystem bereinigt");
    }
}
