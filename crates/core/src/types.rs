//! Gemeinsame Identifikationstypen fuer Rudel
//!
//! Alle IDs verwenden das Newtype-Pattern um Verwechslungen zwischen
//! verschiedenen ID-Arten zur Compilezeit auszuschliessen. Die Plattform
//! vergibt numerische IDs (immer > 0); `0` ist nie eine gueltige ID und
//! dient den Validierungspruefungen als Sentinel.

use serde::{Deserialize, Serialize};

/// Eindeutige Gruppen-ID (serverseitig vergeben, immer > 0)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupId(pub u64);

impl GroupId {
    /// Gibt den inneren Zahlwert zurueck
    pub fn inner(&self) -> u64 {
        self.0
    }

    /// Prueft ob die ID eine vom Server vergebene ID sein kann
    pub fn ist_gueltig(&self) -> bool {
        self.0 > 0
    }
}

impl std::fmt::Display for GroupId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "group:{}", self.0)
    }
}

/// Eindeutige Subscriber-ID (Benutzerkonto auf der Plattform)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriberId(pub u64);

impl SubscriberId {
    /// Gibt den inneren Zahlwert zurueck
    pub fn inner(&self) -> u64 {
        self.0
    }

    /// Prueft ob die ID eine vom Server vergebene ID sein kann
    pub fn ist_gueltig(&self) -> bool {
        self.0 > 0
    }
}

impl std::fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "subscriber:{}", self.0)
    }
}

/// Nummerierter Sitzplatz ("Slot") innerhalb einer Gruppen-Stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlotId(pub u32);

impl SlotId {
    /// Gibt den inneren Zahlwert zurueck
    pub fn inner(&self) -> u32 {
        self.0
    }

    /// Prueft ob die ID eine vom Server vergebene ID sein kann
    pub fn ist_gueltig(&self) -> bool {
        self.0 > 0
    }
}

impl std::fmt::Display for SlotId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "slot:{}", self.0)
    }
}
