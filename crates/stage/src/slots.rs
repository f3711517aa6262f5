//! Slot-Register – gecachte Slot-Belegung pro Gruppe
//!
//! Haelt pro Gruppe die geordnete Slot-Liste und pflegt sie aus zwei
//! Quellen: Pull-Antworten (GROUP_AUDIO_SLOT_LIST) und Push-Merges
//! (groupAudioSlotUpdate). Der Server bleibt autoritativ: das Register
//! entfernt nie selbststaendig Slots aus dem Bestand.
//!
//! Thread-safe durch DashMap; Clone teilt den inneren Zustand nicht —
//! das Register lebt genau einmal im StageService.

use dashmap::DashMap;
use rudel_core::types::{GroupId, SlotId};
use rudel_core::{Result, RudelError};
use rudel_protocol::commands::Command;
use rudel_protocol::push::MemberUpdatePush;
use rudel_protocol::stage::{Slot, SlotListRequest};
use rudel_protocol::SignalingChannel;
use std::sync::Arc;

/// Gecachte Slot-Listen aller Gruppen mit aktiver Stage-Nutzung
pub struct SlotRegister {
    kanal: Arc<dyn SignalingChannel>,
    cache: DashMap<GroupId, Vec<Slot>>,
}

impl SlotRegister {
    /// Erstellt ein leeres Slot-Register
    pub fn neu(kanal: Arc<dyn SignalingChannel>) -> Self {
        Self {
            kanal,
            cache: DashMap::new(),
        }
    }

    /// Liefert die geordnete Slot-Liste einer Gruppe
    ///
    /// Bedient sich aus dem Cache ausser bei `force_refresh` oder leerem
    /// Cache; der Abruf abonniert gleichzeitig die Slot-Push-Events der
    /// Gruppe.
    pub async fn get(&self, group_id: GroupId, force_refresh: bool) -> Result<Vec<Slot>> {
        if !force_refresh {
            if let Some(slots) = self.cache.get(&group_id) {
                if !slots.is_empty() {
                    return Ok(slots.clone());
                }
            }
        }

        let anfrage = SlotListRequest {
            id: group_id,
            subscribe: true,
        };
        let payload = serde_json::to_value(&anfrage)
            .map_err(|e| RudelError::Transport(format!("Payload nicht serialisierbar: {}", e)))?;
        let antwort = self.kanal.emit(Command::GroupAudioSlotList, payload).await?;

        if antwort.success {
            let slots: Vec<Slot> = antwort.body_als()?;
            tracing::debug!(group_id = %group_id, anzahl = slots.len(), "Slot-Liste aktualisiert");
            self.cache.insert(group_id, slots);
        }

        Ok(self
            .cache
            .get(&group_id)
            .map(|r| r.clone())
            .unwrap_or_default())
    }

    /// Merged einen gepushten Slot anhand seiner ID in den Cache
    ///
    /// Nachbar-Slots bleiben unangetastet; eine unbekannte Slot-ID wird
    /// eingefuegt. Fehlende Anzeige-Daten im Push loeschen vorhandene
    /// nicht.
    pub fn apply_push(&self, group_id: GroupId, slot: Slot) {
        let mut eintrag = self.cache.entry(group_id).or_default();
        match eintrag.iter_mut().find(|s| s.id == slot.id) {
            Some(vorhanden) => {
                vorhanden.occupier_id = slot.occupier_id;
                vorhanden.locked = slot.locked;
                vorhanden.occupier_muted = slot.occupier_muted;
                if slot.additional_info.is_some() {
                    vorhanden.additional_info = slot.additional_info;
                }
            }
            None => eintrag.push(slot),
        }
    }

    /// Aktualisiert Anzeige-Daten des Slots den ein Subscriber haelt
    ///
    /// Reagiert auf Mitglieder-Events; die Belegung selbst wird nie
    /// veraendert.
    pub fn apply_occupancy_change(&self, update: &MemberUpdatePush) {
        let Some(mut slots) = self.cache.get_mut(&update.id) else {
            return;
        };
        let Some(slot) = slots
            .iter_mut()
            .find(|s| s.occupier_id == Some(update.subscriber_id))
        else {
            return;
        };

        let info = slot.additional_info.get_or_insert_with(Default::default);
        if update.nickname.is_some() {
            info.nickname = update.nickname.clone();
        }
        if update.privileges.is_some() {
            info.privileges = update.privileges;
        }
        if update.online_state.is_some() {
            info.online_state = update.online_state;
        }
    }

    /// Setzt den Mute-Zustand eines Slots (nach bestaetigter Aenderung)
    pub fn setze_mute(&self, group_id: GroupId, slot_id: SlotId, muted: bool) {
        if let Some(mut slots) = self.cache.get_mut(&group_id) {
            if let Some(slot) = slots.iter_mut().find(|s| s.id == slot_id) {
                slot.occupier_muted = muted;
            }
        }
    }

    /// Setzt den Sperr-Zustand eines Slots (nach bestaetigter Aenderung)
    pub fn setze_sperre(&self, group_id: GroupId, slot_id: SlotId, locked: bool) {
        if let Some(mut slots) = self.cache.get_mut(&group_id) {
            if let Some(slot) = slots.iter_mut().find(|s| s.id == slot_id) {
                slot.locked = locked;
            }
        }
    }

    /// Ersetzt einen Slot durch den Stand aus einem Antwort-Koerper
    pub fn slot_einsetzen(&self, group_id: GroupId, slot: Slot) {
        self.apply_push(group_id, slot);
    }

    /// Loescht die Belegung eines Slots (nach bestaetigtem Disconnect)
    pub fn belegung_loeschen(&self, group_id: GroupId, slot_id: SlotId) {
        if let Some(mut slots) = self.cache.get_mut(&group_id) {
            if let Some(slot) = slots.iter_mut().find(|s| s.id == slot_id) {
                slot.occupier_id = None;
                slot.occupier_muted = false;
            }
        }
    }

    /// Verwirft den Cache einer Gruppe
    pub fn leeren(&self, group_id: GroupId) {
        self.cache.remove(&group_id);
    }

    /// Verwirft alle Caches (Reconnect-Zyklus)
    pub fn alles_leeren(&self) {
        self.cache.clear();
    }
}
