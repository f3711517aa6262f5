//! Unit-Tests fuer die Session-Registry

use super::*;
use crate::manager::StageManager;

fn manager_mit_fabrik() -> (StageManager, Arc<MockFabrik>) {
    let fabrik = MockFabrik::neu();
    let manager = StageManager::neu(Arc::clone(&fabrik) as Arc<dyn PeerConnectionFactory>);
    (manager, fabrik)
}

#[tokio::test]
async fn get_or_create_legt_genau_einen_client_an() {
    let (manager, fabrik) = manager_mit_fabrik();
    let gid = GroupId(100);

    let erster = manager.get_or_create(gid);
    let zweiter = manager.get_or_create(gid);

    assert_eq!(manager.anzahl(), 1);
    assert_eq!(fabrik.erzeugte_anzahl(), 1, "keine zweite Peer-Verbindung");
    assert_eq!(erster.group_id(), zweiter.group_id());
}

#[tokio::test]
async fn get_legt_nie_an() {
    let (manager, fabrik) = manager_mit_fabrik();

    assert!(manager.get(GroupId(1)).is_none());
    assert_eq!(fabrik.erzeugte_anzahl(), 0);
}

#[tokio::test]
async fn verschiedene_gruppen_bekommen_eigene_clients() {
    let (manager, fabrik) = manager_mit_fabrik();

    manager.get_or_create(GroupId(1));
    manager.get_or_create(GroupId(2));
    manager.get_or_create(GroupId(3));

    assert_eq!(manager.anzahl(), 3);
    assert_eq!(fabrik.erzeugte_anzahl(), 3);
}

#[tokio::test]
async fn terminales_ereignis_traegt_client_aus() {
    let (manager, _fabrik) = manager_mit_fabrik();
    let gid = GroupId(100);
    let mut rx = manager.abonnieren();

    let client = manager.get_or_create(gid);
    client.trennen(false).await;

    let ereignis = naechstes_ereignis(&mut rx).await;
    assert_eq!(ereignis, RudelEvent::StageClientGetrennt { group_id: gid });
    // Austragung passiert vor dem Re-Emit: nach Sichtbarkeit des
    // Ereignisses darf kein Lookup mehr treffen
    assert!(manager.get(gid).is_none());
}

#[tokio::test]
async fn nach_austragung_entsteht_frischer_idle_client() {
    let (manager, fabrik) = manager_mit_fabrik();
    let gid = GroupId(100);
    let mut rx = manager.abonnieren();

    let client = manager.get_or_create(gid);
    client.create_offer().await.unwrap();
    client.trennen(false).await;
    ereignis_bis(&mut rx, |e| {
        matches!(e, RudelEvent::StageClientGetrennt { .. })
    })
    .await;

    let frisch = manager.get_or_create(gid);
    assert_eq!(
        frisch.verbindungszustand(),
        crate::client::ConnectionState::Idle
    );
    assert_eq!(fabrik.erzeugte_anzahl(), 2, "neue Session, neue Verbindung");
}

#[tokio::test]
async fn ereignisse_tragen_gruppen_kontext() {
    let (manager, fabrik) = manager_mit_fabrik();
    let gid = GroupId(42);
    let mut rx = manager.abonnieren();

    let client = manager.get_or_create(gid);
    client.create_offer().await.unwrap();
    client.apply_answer("v=0 answer", SlotId(1)).await.unwrap();
    fabrik.peer(gid).melde_bereit();

    assert_eq!(
        naechstes_ereignis(&mut rx).await,
        RudelEvent::StageClientVerbindet { group_id: gid }
    );
    assert_eq!(
        naechstes_ereignis(&mut rx).await,
        RudelEvent::StageClientVerbunden { group_id: gid }
    );
    assert_eq!(
        naechstes_ereignis(&mut rx).await,
        RudelEvent::StageClientBereit { group_id: gid }
    );
}

#[tokio::test]
async fn remove_beendet_session_und_meldet_trennung() {
    let (manager, fabrik) = manager_mit_fabrik();
    let gid = GroupId(100);
    let mut rx = manager.abonnieren();

    manager.get_or_create(gid);
    manager.remove(gid).await;

    assert_eq!(manager.anzahl(), 0);
    assert!(fabrik.peer(gid).ist_geschlossen());
    ereignis_bis(&mut rx, |e| {
        matches!(e, RudelEvent::StageClientGetrennt { group_id } if *group_id == gid)
    })
    .await;
}

#[tokio::test]
async fn remove_ohne_session_ist_no_op() {
    let (manager, _fabrik) = manager_mit_fabrik();
    manager.remove(GroupId(99)).await;
    assert_eq!(manager.anzahl(), 0);
}

#[tokio::test]
async fn bereinigen_raeumt_alle_sessions_ab() {
    let (manager, _fabrik) = manager_mit_fabrik();
    for i in 1..=5 {
        manager.get_or_create(GroupId(i));
    }
    assert_eq!(manager.anzahl(), 5);

    manager.bereinigen().await;
    assert_eq!(manager.anzahl(), 0);
}
