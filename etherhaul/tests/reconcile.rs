mod common;

use std::net::Ipv4Addr;

use common::{builder, open, open_with};
use etherhaul::{
    ConfigItem, Error, ShowQuery, ShowTable, ValidationError, VerificationError, apply_config,
    show_tables,
};

fn ip(slot: u32, address: [u8; 4], prefix_len: u8, vlan: u16) -> ConfigItem {
    ConfigItem::Ip {
        slot,
        address: Ipv4Addr::from(address),
        prefix_len,
        vlan,
    }
}

fn route(slot: u32, dest: [u8; 4], prefix_len: u8, next_hop: [u8; 4]) -> ConfigItem {
    ConfigItem::Route {
        slot,
        dest: Ipv4Addr::from(dest),
        prefix_len,
        next_hop: Ipv4Addr::from(next_hop),
    }
}

#[tokio::test]
async fn test_apply_changes_one_slot() {
    let (mut session, handle) = open().await;
    let items = [ip(3, [192, 168, 1, 100], 24, 0)];

    let outcome = apply_config(&mut session, &items).await.unwrap();

    assert!(outcome.changed);
    assert_eq!(
        outcome.diff,
        vec!["set ip 3 ip-addr 192.168.1.100 prefix-len 24 vlan 0"]
    );
    assert_eq!(outcome.items.len(), 1);
    assert!(outcome.items[0].changed);
    assert!(outcome.items[0].is_verified());
    assert_eq!(outcome.failures().count(), 0);

    assert_eq!(
        handle.received(),
        vec![
            "show ip 3",
            "set ip 3 ip-addr 192.168.1.100 prefix-len 24 vlan 0",
            "show ip 3",
        ]
    );
    assert_eq!(
        handle.state().ip[&3].address,
        Ipv4Addr::new(192, 168, 1, 100)
    );
}

#[tokio::test]
async fn test_apply_is_idempotent() {
    let (mut session, handle) = open().await;
    let items = [
        ip(3, [192, 168, 1, 100], 24, 0),
        route(2, [10, 0, 0, 0], 8, [192, 168, 1, 254]),
    ];

    let first = apply_config(&mut session, &items).await.unwrap();
    assert!(first.changed);
    assert_eq!(first.diff.len(), 2);

    handle.clear_received();
    let second = apply_config(&mut session, &items).await.unwrap();

    assert!(!second.changed);
    assert!(second.diff.is_empty());
    assert!(second.items.iter().all(|i| !i.changed && i.is_verified()));
    // Only queries on the second run
    assert_eq!(handle.received(), vec!["show ip 3", "show route 2"]);
}

#[tokio::test]
async fn test_matching_slot_sends_no_set() {
    let (mut session, handle) = open().await;
    let items = [
        ip(1, [172, 18, 128, 2], 24, 128),
        route(1, [0, 0, 0, 0], 0, [172, 18, 128, 1]),
    ];

    let outcome = apply_config(&mut session, &items).await.unwrap();

    assert!(!outcome.changed);
    assert!(handle.received_matching("set").is_empty());
}

#[tokio::test]
async fn test_invalid_item_rejected_before_io() {
    let (mut session, handle) = open().await;
    let items = [
        ip(3, [192, 168, 1, 100], 24, 0),
        ip(4, [10, 0, 0, 1], 24, 5000),
    ];

    let err = apply_config(&mut session, &items).await.unwrap_err();

    assert!(matches!(
        err,
        Error::Validation(ValidationError::InvalidVlan {
            index: 1,
            vlan: 5000
        })
    ));
    assert!(handle.received().is_empty());
}

#[tokio::test]
async fn test_zero_slot_rejected() {
    let (mut session, handle) = open().await;

    let err = apply_config(&mut session, &[route(0, [10, 0, 0, 0], 8, [10, 0, 0, 1])])
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        Error::Validation(ValidationError::InvalidSlot { index: 0, slot: 0 })
    ));
    assert!(handle.received().is_empty());
}

#[tokio::test]
async fn test_unapplied_set_reports_mismatch() {
    let (mut session, _handle) = open_with(builder(), |state| state.ignore_sets = true).await;
    let items = [
        ip(3, [192, 168, 1, 100], 24, 0),
        route(2, [10, 0, 0, 0], 8, [192, 168, 1, 254]),
    ];

    let outcome = apply_config(&mut session, &items).await.unwrap();

    assert!(outcome.changed);
    assert_eq!(outcome.failures().count(), 2);

    match &outcome.items[0].verification {
        Err(VerificationError::Mismatch { slot, differences }) => {
            assert_eq!(*slot, 3);
            assert_eq!(differences.len(), 1);
            assert_eq!(differences[0].field, "address");
            assert_eq!(differences[0].expected, "192.168.1.100");
            assert_eq!(differences[0].actual.as_deref(), Some("192.168.1.1"));
        }
        other => panic!("expected mismatch, got {other:?}"),
    }

    // A failed item does not stop the next one, and nothing is retried
    assert_eq!(outcome.items[1].commands.len(), 1);
}

#[tokio::test]
async fn test_rejected_query_fails_item_only() {
    let (mut session, handle) = open_with(builder(), |state| {
        state.rejected.push("show ip 3".to_string());
    })
    .await;
    let items = [
        ip(3, [192, 168, 1, 100], 24, 0),
        route(2, [10, 0, 0, 0], 8, [192, 168, 1, 254]),
    ];

    let outcome = apply_config(&mut session, &items).await.unwrap();

    assert!(matches!(
        outcome.items[0].verification,
        Err(VerificationError::Rejected { .. })
    ));
    assert!(!outcome.items[0].changed);
    assert!(outcome.items[1].is_verified());

    // No set for the item whose state could not be read
    assert_eq!(
        handle.received_matching("set"),
        vec!["set route 2 dest 10.0.0.0 prefix-len 8 next-hop 192.168.1.254"]
    );
}

#[tokio::test]
async fn test_unconfigured_slot_is_created() {
    let (mut session, handle) = open().await;
    let items = [route(5, [10, 0, 0, 0], 8, [192, 168, 1, 254])];

    let outcome = apply_config(&mut session, &items).await.unwrap();

    assert!(outcome.changed);
    assert!(outcome.items[0].is_verified());
    assert_eq!(
        handle.received(),
        vec![
            "show route 5",
            "set route 5 dest 10.0.0.0 prefix-len 8 next-hop 192.168.1.254",
            "show route 5",
        ]
    );
    assert_eq!(handle.state().routes[&5].next_hop, Ipv4Addr::new(192, 168, 1, 254));
}

#[tokio::test]
async fn test_unconfigured_slot_error_fails_item_only() {
    let (mut session, handle) = open_with(builder(), |state| state.missing_slot_error = true).await;
    let items = [
        route(5, [10, 0, 0, 0], 8, [192, 168, 1, 254]),
        ip(3, [192, 168, 1, 100], 24, 0),
    ];

    let outcome = apply_config(&mut session, &items).await.unwrap();

    assert!(matches!(
        outcome.items[0].verification,
        Err(VerificationError::Rejected { .. })
    ));
    assert!(!outcome.items[0].changed);
    assert!(outcome.items[1].is_verified());
    assert_eq!(
        handle.received_matching("set"),
        vec!["set ip 3 ip-addr 192.168.1.100 prefix-len 24 vlan 0"]
    );
}

#[tokio::test]
async fn test_unapplied_set_on_unconfigured_slot_reports_every_field() {
    let (mut session, _handle) = open_with(builder(), |state| state.ignore_sets = true).await;

    let outcome = apply_config(&mut session, &[ip(7, [10, 7, 0, 1], 24, 70)])
        .await
        .unwrap();

    match &outcome.items[0].verification {
        Err(VerificationError::Mismatch { slot, differences }) => {
            assert_eq!(*slot, 7);
            assert_eq!(differences.len(), 3);
            assert!(differences.iter().all(|d| d.actual.is_none()));
        }
        other => panic!("expected mismatch, got {other:?}"),
    }
}

#[tokio::test]
async fn test_show_tables_after_apply() {
    let (mut session, _handle) = open_with(builder(), |state| {
        state.rejected.push("show route".to_string());
    })
    .await;
    apply_config(&mut session, &[ip(3, [192, 168, 1, 100], 24, 0)])
        .await
        .unwrap();

    let queries = [ShowQuery::Ip { slot: Some(3) }, ShowQuery::Route { slot: None }];
    let report = show_tables(&mut session, &queries).await.unwrap();

    match &report.tables["ip_slot_3"] {
        ShowTable::Ip(table) => {
            assert_eq!(table.get(3).unwrap().address, Some(Ipv4Addr::new(192, 168, 1, 100)));
        }
        other => panic!("expected an ip table, got {other:?}"),
    }
    assert!(report.errors.contains_key("route_all"));
    assert!(!report.tables.contains_key("route_all"));
}
