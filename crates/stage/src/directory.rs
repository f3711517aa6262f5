//! Zugriff auf Gruppen-Stammdaten und die eigene Identitaet
//!
//! Die Gruppen-Daten kommen aus dem Gruppen-Cache des umgebenden SDKs;
//! das Stage-Subsystem konsumiert sie nur ueber diesen Trait und haelt
//! keine eigene Kopie der Stammdaten.

use async_trait::async_trait;
use rudel_core::types::{GroupId, SubscriberId};
use rudel_core::Result;
use rudel_protocol::stage::StageSettings;

/// Stammdaten-Ausschnitt einer Gruppe, soweit das Stage-Subsystem ihn braucht
#[derive(Debug, Clone)]
pub struct GroupProfile {
    pub id: GroupId,
    pub name: String,
    /// Stage-Konfiguration der Gruppe (None = Gruppe hat keine Stage)
    pub audio_config: Option<StageSettings>,
}

/// Aufloesung von Gruppen-IDs zu Stammdaten
///
/// `force_refresh` umgeht den Cache des Anbieters. `Ok(None)` bedeutet:
/// die Gruppe existiert nicht bzw. ist nicht aufloesbar — das ist von
/// "Stage deaktiviert" strikt zu unterscheiden.
#[async_trait]
pub trait GroupDirectory: Send + Sync {
    /// Liefert die Stammdaten einer Gruppe oder None wenn unbekannt
    async fn group_by_id(&self, group_id: GroupId, force_refresh: bool)
        -> Result<Option<GroupProfile>>;
}

/// Identitaet des angemeldeten Bot-Kontos
///
/// Die Reputation ist eine Dezimalzahl (Stufe.Fortschritt); fuer das
/// Reputations-Gate zaehlt nur die abgerundete Stufe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Identitaet {
    pub subscriber_id: SubscriberId,
    pub reputation: f64,
}

impl Identitaet {
    /// Gibt die abgerundete Reputationsstufe zurueck
    pub fn stufe(&self) -> u32 {
        self.reputation.floor().max(0.0) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stufe_rundet_ab() {
        let ident = Identitaet {
            subscriber_id: SubscriberId(1),
            reputation: 4.9,
        };
        assert_eq!(ident.stufe(), 4);

        let ident = Identitaet {
            subscriber_id: SubscriberId(1),
            reputation: 5.0,
        };
        assert_eq!(ident.stufe(), 5);
    }
}
