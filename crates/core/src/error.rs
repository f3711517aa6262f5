//! Fehlertypen fuer Rudel
//!
//! Zentraler Fehler-Enum der alle Fehlerklassen des Stage-Subsystems
//! abdeckt. Die Klassen entsprechen den Pruefstufen der Facade:
//! Validierung der Argumente, Konfigurationsaufloesung, Vorbedingungen
//! gegen den Slot-Zustand und schliesslich die SDP-Verhandlung.
//!
//! Jede oeffentliche Facade-Methode haengt vor dem Weiterreichen die
//! rekonstruierte Aufruf-Signatur an den Fehler an (`mit_aufruf`). Der
//! Umschlag aendert die Fehlerklasse nicht: `kern()` liefert immer den
//! innersten Fehler fuer `matches!`-Pruefungen.

use thiserror::Error;

/// Globaler Result-Alias fuer Rudel
pub type Result<T> = std::result::Result<T, RudelError>;

/// Alle moeglichen Fehler im Stage-Subsystem
#[derive(Debug, Error)]
pub enum RudelError {
    // --- Validierung (synchron, nie wiederholt) ---
    #[error("Validierung fehlgeschlagen ({feld}): {grund}")]
    Validierung {
        feld: &'static str,
        grund: String,
    },

    // --- Konfiguration ---
    #[error("Stage ist fuer diese Gruppe deaktiviert")]
    StageDeaktiviert,

    #[error("Stage-Konfiguration nicht verfuegbar: {0}")]
    Konfiguration(String),

    // --- Ressourcen ---
    #[error("{0} nicht gefunden")]
    NichtGefunden(String),

    // --- Geschaeftsregeln (Belegung, Sperre, Reputation) ---
    #[error("Vorbedingung verletzt: {0}")]
    Vorbedingung(String),

    // --- SDP-Verhandlung (terminal fuer die Session) ---
    #[error("Verhandlung fehlgeschlagen: {0}")]
    Verhandlung(String),

    // --- Zustandspruefung ---
    #[error("Stage-Client ist nicht bereit: {0}")]
    NichtBereit(String),

    // --- Transport ---
    #[error("Transportfehler: {0}")]
    Transport(String),

    // --- Aufruf-Kontext (Umschlag, aendert die Fehlerklasse nicht) ---
    #[error("{quelle} [aufruf: {aufruf}]")]
    Aufruf {
        aufruf: String,
        #[source]
        quelle: Box<RudelError>,
    },

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl RudelError {
    /// Erstellt einen Validierungsfehler fuer ein bestimmtes Feld
    pub fn validierung(feld: &'static str, grund: impl Into<String>) -> Self {
        Self::Validierung {
            feld,
            grund: grund.into(),
        }
    }

    /// Haengt die rekonstruierte Aufruf-Signatur an den Fehler an
    ///
    /// Ein bereits vorhandener Kontext wird ersetzt: der aeusserste
    /// Aufrufer gewinnt, der Kern bleibt unveraendert.
    pub fn mit_aufruf(self, aufruf: impl Into<String>) -> Self {
        match self {
            Self::Aufruf { quelle, .. } => Self::Aufruf {
                aufruf: aufruf.into(),
                quelle,
            },
            andere => Self::Aufruf {
                aufruf: aufruf.into(),
                quelle: Box::new(andere),
            },
        }
    }

    /// Gibt den innersten Fehler zurueck (sieht durch `Aufruf`-Umschlaege)
    pub fn kern(&self) -> &RudelError {
        match self {
            Self::Aufruf { quelle, .. } => quelle.kern(),
            andere => andere,
        }
    }

    /// Gibt true zurueck wenn der Fehler eine Validierungsverletzung ist
    pub fn ist_validierung(&self) -> bool {
        matches!(self.kern(), Self::Validierung { .. })
    }

    /// Gibt true zurueck wenn der Fehler eine Vorbedingungsverletzung ist
    pub fn ist_vorbedingung(&self) -> bool {
        matches!(self.kern(), Self::Vorbedingung(_))
    }
}

/// Erweiterung fuer `Result` um Aufruf-Kontext kompakt anzuhaengen
pub trait AufrufKontext<T> {
    /// Haengt die Aufruf-Signatur an den Fehlerpfad an (lazy formatiert)
    fn aufruf<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T> AufrufKontext<T> for Result<T> {
    fn aufruf<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| e.mit_aufruf(f()))
    }
}
