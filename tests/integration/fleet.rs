//! Fleet sweeps against scripted fakes

use std::time::Duration;

use dgwatch::health::STATE_OFFLINE;

use crate::{checker, healthy_pair, target, Calls, FakeConnector, FakeNetwork};

#[tokio::test]
async fn test_empty_fleet() {
    let (checker, _) = checker(FakeNetwork::new(), FakeConnector::new());
    assert!(checker.check_fleet(&[]).await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_fleet_preserves_order() {
    let names = ["DB01", "DB02", "DB03", "DB04", "DB05"];
    let targets: Vec<_> = names.iter().map(|n| target(n)).collect();

    // The first target finishes last
    let mut connector = FakeConnector::new();
    for name in &names[1..] {
        connector = healthy_pair(connector, name);
    }
    let (checker, _) = checker(
        FakeNetwork::new()
            .hung("DB01-lb")
            .hung("DB01-prod")
            .hung("DB01-dr"),
        connector,
    );

    let statuses = checker.check_fleet(&targets).await;

    assert_eq!(statuses.len(), names.len());
    for (status, name) in statuses.iter().zip(names) {
        assert_eq!(status.name, name);
    }
    assert_eq!(statuses[0].prod_status, STATE_OFFLINE);
    assert_eq!(statuses[4].prod_status, "READ WRITE");
}

#[tokio::test(start_paused = true)]
async fn test_hung_databases_do_not_delay_others() {
    let targets: Vec<_> = ["SLOW1", "SLOW2", "SLOW3", "FAST"]
        .iter()
        .map(|n| target(n))
        .collect();

    let mut network = FakeNetwork::new().latency(Duration::from_millis(100));
    for name in ["SLOW1", "SLOW2", "SLOW3"] {
        for side in ["lb", "prod", "dr"] {
            network = network.hung(&format!("{}-{}", name, side));
        }
    }
    let connector = healthy_pair(
        FakeConnector::new().latency(Duration::from_millis(100)),
        "FAST",
    );
    let (checker, calls) = checker(network, connector);

    let started = tokio::time::Instant::now();
    let statuses = checker.check_fleet(&targets).await;
    let elapsed = started.elapsed();

    // Bounded by a single ping timeout, not the sum of them
    let ping_timeout = crate::test_settings().ping_timeout;
    assert!(elapsed >= ping_timeout, "elapsed {:?}", elapsed);
    assert!(elapsed < ping_timeout + Duration::from_secs(1), "elapsed {:?}", elapsed);

    for slow in &statuses[..3] {
        assert!(!slow.lb_alive);
        assert_eq!(slow.prod_status, STATE_OFFLINE);
        assert_eq!(slow.dr_status, STATE_OFFLINE);
    }
    let fast = &statuses[3];
    assert!(fast.lb_db_connect);
    assert_eq!(fast.prod_status, "READ WRITE");
    assert_eq!(fast.connections, Some(10));
    assert_eq!(fast.dr_lag_seconds, Some(4));

    assert_eq!(Calls::get(&calls.opened), 3);
    assert_eq!(Calls::get(&calls.closed), 3);
}

#[tokio::test]
async fn test_fleet_wire_format() {
    let (checker, _) = checker(
        FakeNetwork::new().down("ERP-dr"),
        healthy_pair(FakeConnector::new(), "CRM").db("ERP-prod", crate::FakeDb::standby(7)),
    );

    let statuses = checker.check_fleet(&[target("CRM"), target("ERP")]).await;
    let json = serde_json::to_value(&statuses).unwrap();

    assert_eq!(json[0]["name"], "CRM");
    assert_eq!(json[0]["connections"], 10);
    assert_eq!(json[0]["production_dgdelay"], -1);
    assert_eq!(json[0]["disaster_dgdelay"], 4);

    assert_eq!(json[1]["name"], "ERP");
    assert_eq!(json[1]["load_balancer_db_connect"], false);
    assert_eq!(json[1]["connections"], -1);
    assert_eq!(json[1]["production_role"], "PHYSICAL STANDBY");
    assert_eq!(json[1]["production_dgdelay"], 7);
    assert_eq!(json[1]["disaster_alive"], false);
    assert_eq!(json[1]["disaster_status"], "OFFLINE");
    assert_eq!(json[1]["disaster_role"], "UNKNOWN");
}
