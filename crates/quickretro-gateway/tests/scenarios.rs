mod common;

use serde_json::json;

use common::{BOARD, Harness, OWNER, note};
use quickretro_gateway::HubSettings;
use quickretro_store::BoardStore;

#[tokio::test]
async fn owner_registers_then_second_user_joins() {
    let h = Harness::new().await;

    let mut u1 = h.connect(OWNER).await;
    u1.send("reg", json!({ "nickname": "Ann" })).await;
    let reg = u1.next().await;
    assert_eq!(reg["typ"], "reg");
    assert_eq!(reg["isBoardOwner"], true);
    assert_eq!(reg["boardName"], "Sprint 12");
    assert_eq!(reg["users"].as_array().unwrap().len(), 1);
    assert_eq!(reg["columns"].as_array().unwrap().len(), 3);

    let mut u2 = h.connect("u2").await;
    u2.send("reg", json!({ "nickname": "Bob" })).await;

    let joined = u1.next().await;
    assert_eq!(joined, json!({ "typ": "joining", "nickname": "Bob", "xid": "2" }));

    let reg = u2.next().await;
    assert_eq!(reg["typ"], "reg");
    assert_eq!(reg["isBoardOwner"], false);
    assert_eq!(reg["users"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn posted_message_is_mine_only_for_its_author() {
    let h = Harness::new().await;
    let mut u1 = h.join(OWNER, "Ann").await;
    let mut u2 = h.join("u2", "Bob").await;
    u1.next_of("joining").await;

    u1.send("msg", note("m1", "colA", "hi")).await;

    let mine = u1.next().await;
    let theirs = u2.next().await;
    for frame in [&mine, &theirs] {
        assert_eq!(frame["typ"], "msg");
        assert_eq!(frame["id"], "m1");
        assert_eq!(frame["msg"], "hi");
        assert_eq!(frame["byxid"], "1");
        assert_eq!(frame["likes"], 0);
    }
    assert_eq!(mine["mine"], true);
    assert_eq!(theirs["mine"], false);
}

#[tokio::test]
async fn repeated_like_is_not_broadcast_again() {
    let h = Harness::new().await;
    let mut u1 = h.join(OWNER, "Ann").await;
    let mut u2 = h.join("u2", "Bob").await;
    u1.next_of("joining").await;
    u1.send("msg", note("m1", "colA", "hi")).await;
    u1.next().await;
    u2.next().await;

    u2.send("like", json!({ "msgId": "m1", "like": true })).await;
    let for_u1 = u1.next().await;
    let for_u2 = u2.next().await;
    assert_eq!(for_u1, json!({ "typ": "like", "id": "m1", "likes": 1, "liked": false }));
    assert_eq!(for_u2, json!({ "typ": "like", "id": "m1", "likes": 1, "liked": true }));

    u2.send("like", json!({ "msgId": "m1", "like": true })).await;
    u1.assert_silent().await;
    u2.assert_silent().await;

    u2.send("like", json!({ "msgId": "m1", "like": false })).await;
    assert_eq!(u1.next().await["likes"], 0);
}

#[tokio::test]
async fn locked_board_refuses_new_messages() {
    let h = Harness::new().await;
    let mut u1 = h.join(OWNER, "Ann").await;
    let mut u2 = h.join("u2", "Bob").await;
    u1.next_of("joining").await;

    u1.send("lock", json!({ "lock": true })).await;
    assert_eq!(u1.next().await, json!({ "typ": "lock", "lock": true }));
    assert_eq!(u2.next().await, json!({ "typ": "lock", "lock": true }));

    u2.send("msg", note("m2", "colA", "sneaky")).await;
    u1.assert_silent().await;
    u2.assert_silent().await;
    assert!(h.store.get_message("m2").await.unwrap().is_none());

    // Likes and timers are still allowed while locked.
    u1.send("timer", json!({ "expiryDurationInSeconds": 30 })).await;
    assert_eq!(u2.next().await["typ"], "timer");
}

#[tokio::test]
async fn timer_start_restart_and_stop() {
    let h = Harness::new().await;
    let mut u1 = h.join(OWNER, "Ann").await;
    let mut u2 = h.join("u2", "Bob").await;
    u1.next_of("joining").await;

    u1.send("timer", json!({ "expiryDurationInSeconds": 60 })).await;
    for conn in [&mut u1, &mut u2] {
        let frame = conn.next().await;
        assert_eq!(frame["typ"], "timer");
        let secs = frame["expiresInSeconds"].as_u64().unwrap();
        assert!((59..=60).contains(&secs), "unexpected remaining time {secs}");
    }

    u1.send("timer", json!({ "expiryDurationInSeconds": 120 })).await;
    u1.assert_silent().await;

    u1.send("timer", json!({ "stop": true })).await;
    assert_eq!(u1.next().await, json!({ "typ": "timer", "expiresInSeconds": 0 }));
    assert_eq!(u2.next().await, json!({ "typ": "timer", "expiresInSeconds": 0 }));

    u1.send("timer", json!({ "stop": true })).await;
    u1.assert_silent().await;
}

#[tokio::test]
async fn timer_duration_must_be_in_range() {
    let h = Harness::new().await;
    let mut u1 = h.join(OWNER, "Ann").await;

    u1.send("timer", json!({ "expiryDurationInSeconds": 0 })).await;
    u1.send("timer", json!({ "expiryDurationInSeconds": 3601 })).await;
    u1.assert_silent().await;

    u1.send("timer", json!({ "expiryDurationInSeconds": 3600 })).await;
    assert_eq!(u1.next().await["typ"], "timer");
}

#[tokio::test]
async fn mask_toggles_once_per_change() {
    let h = Harness::new().await;
    let mut u1 = h.join(OWNER, "Ann").await;

    u1.send("mask", json!({ "mask": true })).await;
    assert_eq!(u1.next().await, json!({ "typ": "mask", "mask": true }));
    u1.send("mask", json!({ "mask": true })).await;
    u1.assert_silent().await;
    assert!(h.store.get_board(BOARD).await.unwrap().unwrap().mask);
}

#[tokio::test]
async fn delete_removes_only_listed_comments() {
    let h = Harness::new().await;
    let mut u1 = h.join(OWNER, "Ann").await;
    u1.send("msg", note("m1", "colA", "parent")).await;
    u1.next().await;
    for id in ["c1", "c2"] {
        u1.send("msg", json!({ "id": id, "msg": "reply", "cat": "colA", "pid": "m1" })).await;
        u1.next().await;
    }

    u1.send("del", json!({ "msgId": "m1", "commentIds": ["c1"] })).await;
    assert_eq!(u1.next().await, json!({ "typ": "del", "id": "m1", "pid": "" }));

    assert!(h.store.get_message("m1").await.unwrap().is_none());
    assert!(h.store.get_message("c1").await.unwrap().is_none());
    let orphan = h.store.get_message("c2").await.unwrap().unwrap();
    assert_eq!(orphan.parent_id, "m1");
}

#[tokio::test]
async fn deleting_a_comment_leaves_its_parent() {
    let h = Harness::new().await;
    let mut u1 = h.join(OWNER, "Ann").await;
    u1.send("msg", note("m1", "colA", "parent")).await;
    u1.send("msg", json!({ "id": "c1", "msg": "reply", "cat": "colA", "pid": "m1" })).await;
    u1.next().await;
    u1.next().await;

    u1.send("del", json!({ "msgId": "c1" })).await;
    assert_eq!(u1.next().await, json!({ "typ": "del", "id": "c1", "pid": "m1" }));
    assert!(h.store.get_message("m1").await.unwrap().is_some());
    assert!(h.store.get_comments(BOARD).await.unwrap().is_empty());
}

#[tokio::test]
async fn category_change_moves_message_and_listed_comments() {
    let h = Harness::new().await;
    let mut u1 = h.join(OWNER, "Ann").await;
    u1.send("msg", note("m1", "colA", "parent")).await;
    u1.send("msg", note("m2", "colA", "other")).await;
    u1.send("msg", json!({ "id": "c1", "msg": "reply", "pid": "m1" })).await;
    u1.send("msg", json!({ "id": "c2", "msg": "reply", "pid": "m2" })).await;
    for _ in 0..4 {
        u1.next().await;
    }

    u1.send(
        "catchng",
        json!({ "msgId": "m1", "oldCategory": "colA", "newCategory": "colB", "commentIds": ["c1", "c2"] }),
    )
    .await;
    assert_eq!(
        u1.next().await,
        json!({ "typ": "catchng", "id": "m1", "cat": "colB", "commentIds": ["c1"] })
    );
    assert_eq!(h.store.get_message("c1").await.unwrap().unwrap().category, "colB");
    assert_eq!(h.store.get_message("c2").await.unwrap().unwrap().category, "colA");

    u1.send("catchng", json!({ "msgId": "m1", "newCategory": "colB" })).await;
    u1.send("catchng", json!({ "msgId": "m1", "newCategory": "nope" })).await;
    u1.assert_silent().await;
}

#[tokio::test]
async fn columns_with_messages_cannot_be_removed() {
    let h = Harness::new().await;
    let mut u1 = h.join(OWNER, "Ann").await;
    u1.send("msg", note("m1", "colC", "keep me")).await;
    u1.next().await;

    let mut cols = common::columns();
    cols.pop();
    u1.send("colreset", json!({ "columns": cols })).await;
    u1.assert_silent().await;

    let mut cols = common::columns();
    cols.remove(1);
    cols[0].text = "Went well".into();
    u1.send("colreset", json!({ "columns": cols })).await;
    let frame = u1.next().await;
    assert_eq!(frame["typ"], "colreset");
    let ids: Vec<&str> = frame["columns"].as_array().unwrap().iter().map(|c| c["id"].as_str().unwrap()).collect();
    assert_eq!(ids, vec!["colA", "colC"]);
    assert_eq!(frame["columns"][0]["text"], "Went well");
}

#[tokio::test]
async fn delete_all_purges_the_board() {
    let h = Harness::new().await;
    let mut u1 = h.join(OWNER, "Ann").await;
    u1.send("msg", note("m1", "colA", "bye")).await;
    u1.next().await;

    u1.send("delall", json!({})).await;
    assert_eq!(u1.next().await, json!({ "typ": "delall" }));
    assert!(!h.store.board_exists(BOARD).await.unwrap());
    assert!(h.store.get_message("m1").await.unwrap().is_none());
}

#[tokio::test]
async fn typing_reaches_everyone_but_the_sender() {
    let h = Harness::new().await;
    let mut u1 = h.join(OWNER, "Ann").await;
    let mut u2 = h.join("u2", "Bob").await;
    u1.next_of("joining").await;

    u2.send("t", json!({})).await;
    assert_eq!(u1.next().await, json!({ "typ": "t", "xid": "2", "nickname": "Bob" }));
    u2.assert_silent().await;
}

#[tokio::test]
async fn typing_can_be_switched_off() {
    let h = Harness::with_settings(HubSettings {
        typing_enabled: false,
        ..HubSettings::default()
    }).await;
    let mut u1 = h.join(OWNER, "Ann").await;
    let u2 = h.join("u2", "Bob").await;
    u1.next_of("joining").await;

    u2.send("t", json!({})).await;
    u1.assert_silent().await;
}

#[tokio::test]
async fn disconnect_notifies_the_rest_once() {
    let h = Harness::new().await;
    let mut u1 = h.join(OWNER, "Ann").await;
    let u2 = h.join("u2", "Bob").await;
    u1.next_of("joining").await;

    u2.leave().await;
    u2.leave().await;

    let closing = u1.next().await;
    assert_eq!(closing, json!({ "typ": "closing", "users": [{ "nickname": "Ann", "xid": "1" }] }));
    u1.assert_silent().await;
    assert_eq!(h.store.get_presence(BOARD).await.unwrap().len(), 1);
}

#[tokio::test]
async fn reconnect_keeps_external_id() {
    let h = Harness::new().await;
    let first = h.join("u2", "Bob").await;
    let xid = first.peer.xid.clone();
    first.leave().await;

    let again = h.join("u2", "Bobby").await;
    assert_eq!(again.peer.xid, xid);
}

#[tokio::test]
async fn last_disconnect_releases_the_subscription() {
    let h = Harness::new().await;
    let u1 = h.join(OWNER, "Ann").await;
    let u2 = h.join("u2", "Bob").await;
    assert_eq!(h.bridge.subscriptions(), vec![BOARD.to_string()]);

    u1.leave().await;
    assert_eq!(h.bridge.subscriptions(), vec![BOARD.to_string()]);
    u2.leave().await;
    assert!(h.bridge.subscriptions().is_empty());
}

#[tokio::test]
async fn slow_consumer_is_dropped_without_stalling_others() {
    let h = Harness::new().await;
    let mut u1 = h.join(OWNER, "Ann").await;
    let mut slow = h.connect_with_queue(BOARD, "u3", 1).await;

    u1.send("mask", json!({ "mask": true })).await;
    u1.send("mask", json!({ "mask": false })).await;
    assert_eq!(u1.next().await["mask"], true);
    assert_eq!(u1.next().await["mask"], false);

    // The slow queue kept its first frame and was then closed by the hub.
    assert_eq!(slow.next().await["mask"], true);
    assert!(slow.rx.recv().await.is_none());

    assert_eq!(u1.next().await["typ"], "closing");
}

#[tokio::test]
async fn events_reach_connections_on_another_process() {
    let a = Harness::new().await;
    let b = Harness::on(a.store.clone(), a.bus.clone(), HubSettings::default());

    let mut u1 = a.join(OWNER, "Ann").await;
    let mut u2 = b.join("u2", "Bob").await;
    assert_eq!(u1.next().await["typ"], "joining");

    u1.send("msg", note("m1", "colA", "across")).await;
    assert_eq!(u1.next().await["mine"], true);
    let remote = u2.next().await;
    assert_eq!(remote["id"], "m1");
    assert_eq!(remote["mine"], false);

    u2.send("like", json!({ "msgId": "m1", "like": true })).await;
    assert_eq!(u1.next().await["likes"], 1);
    assert_eq!(u2.next().await["liked"], true);
}

#[tokio::test]
async fn leaving_tab_drops_user_presence_but_not_other_tabs() {
    let h = Harness::new().await;
    let mut owner = h.join(OWNER, "Ann").await;
    let first_tab = h.join("u2", "Bob").await;
    let mut second_tab = h.join("u2", "Bob").await;
    assert_eq!(first_tab.peer.xid, second_tab.peer.xid);

    first_tab.leave().await;
    let closing = owner.next_of("closing").await;
    assert_eq!(closing["users"], json!([{ "nickname": "Ann", "xid": "1" }]));
    second_tab.assert_silent().await;
    assert_eq!(h.store.get_presence(BOARD).await.unwrap().len(), 1);

    owner.send("mask", json!({ "mask": true })).await;
    assert_eq!(second_tab.next().await, json!({ "typ": "mask", "mask": true }));
}
