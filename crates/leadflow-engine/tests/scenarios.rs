// SPDX-FileCopyrightText: 2026 Leadflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end engine scenarios over SQLite with a manual clock.

use leadflow_core::{LeadStore, QualificationTier};
use leadflow_engine::journey::{IdType, PageEntry};
use leadflow_test_utils::TestHarness;
use proptest::prelude::*;

#[tokio::test]
async fn behaviors_walk_a_lead_through_every_tier() {
    let h = TestHarness::builder().build().await.unwrap();
    let lead = h.engine.create_lead("s1", "ads").await.unwrap();
    assert_eq!(lead.lead_score, 5);
    assert_eq!(lead.lead_type, QualificationTier::Unqualified);

    let steps = [
        ("clicked_demo", 20, QualificationTier::Unqualified),
        ("cta_clicked", 35, QualificationTier::MarketingQualified),
        ("shared_contact", 45, QualificationTier::MarketingQualified),
        ("clicked_pricing", 55, QualificationTier::MarketingQualified),
        ("cta_clicked", 70, QualificationTier::SalesQualified),
    ];
    for (action, score, tier) in steps {
        let logged = h.engine.log_behavior("s1", action, None).await.unwrap();
        assert_eq!((logged.lead_score, logged.lead_type), (score, tier), "after {action}");
        let stored = h.storage.get_lead("s1").await.unwrap().unwrap();
        assert_eq!(stored.tier, tier);
    }

    let delivered = h.notifier.delivered().await;
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].score, 70);
}

#[tokio::test]
async fn page_visits_build_the_journey() {
    let h = TestHarness::builder().build().await.unwrap();
    h.lead("s1", "ads").await.unwrap();

    let q1 = h
        .engine
        .log_page_entry("s1", "q1", PageEntry::default())
        .await
        .unwrap();
    h.clock.advance(7);
    h.engine.log_page_exit(q1.id, None).await.unwrap();

    let journey = h.engine.get_journey("s1").await.unwrap();
    assert_eq!(journey.len(), 1);
    assert_eq!(journey[0].time_spent, Some(7));

    h.engine
        .log_page_entry("s1", "q2", PageEntry::default())
        .await
        .unwrap();
    let journey = h.engine.get_journey("s1").await.unwrap();
    assert_eq!(journey.len(), 2);
    assert_eq!(journey[1].time_spent, None);

    let visual = h.engine.visual_journey("s1", IdType::Session).await.unwrap();
    assert_eq!(visual.visual_journey[0].status, "completed");
    assert_eq!(visual.visual_journey[1].status, "current");
    assert_eq!(visual.statistics.completion_rate, "50.0%");
}

#[tokio::test]
async fn journey_is_ordered_by_entry_time() {
    let h = TestHarness::builder().build().await.unwrap();
    h.lead("s1", "ads").await.unwrap();
    h.clock.advance(30);
    h.engine
        .log_page_entry("s1", "later", PageEntry::default())
        .await
        .unwrap();
    h.clock.advance(-20);
    h.engine
        .log_page_entry("s1", "earlier", PageEntry::default())
        .await
        .unwrap();

    let pages: Vec<String> = h
        .engine
        .get_journey("s1")
        .await
        .unwrap()
        .into_iter()
        .map(|v| v.page_identifier)
        .collect();
    assert_eq!(pages, ["earlier", "later"]);
}

#[tokio::test]
async fn concurrent_deltas_are_not_lost() {
    let h = TestHarness::builder().build().await.unwrap();
    h.lead("s1", "ads").await.unwrap();

    let mut tasks = Vec::new();
    for _ in 0..20 {
        let engine = h.engine.clone();
        tasks.push(tokio::spawn(async move {
            engine.log_behavior("s1", "clicked_product", None).await
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }
    assert_eq!(h.score("s1").await.unwrap(), 5 + 20 * 5);
    let lead = h.storage.get_lead("s1").await.unwrap().unwrap();
    assert_eq!(lead.tier, QualificationTier::SalesQualified);
}

#[tokio::test]
async fn concurrent_customer_ids_are_unique() {
    let h = TestHarness::builder().build().await.unwrap();
    let mut tasks = Vec::new();
    for i in 0..10 {
        let sid = format!("s{i}");
        h.lead(&sid, "ads").await.unwrap();
        let engine = h.engine.clone();
        tasks.push(tokio::spawn(async move { engine.assign_customer_id(&sid).await }));
    }
    let mut ids = Vec::new();
    for task in tasks {
        ids.push(task.await.unwrap().unwrap());
    }
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 10);
    assert!(ids.iter().all(|id| id.starts_with("CID_20260309_")));
    assert_eq!(ids[9], "CID_20260309_0010");
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn stored_tier_always_matches_score(deltas in prop::collection::vec(-40i64..40, 1..8)) {
        let rt = tokio::runtime::Builder::new_multi_thread().enable_all().build().unwrap();
        rt.block_on(async {
            let h = TestHarness::builder().build().await.unwrap();
            h.lead("p", "ads").await.unwrap();
            let thresholds = h.config.workflow.thresholds;
            for delta in deltas {
                h.engine.apply_score_delta("p", delta).await.unwrap();
                let lead = h.storage.get_lead("p").await.unwrap().unwrap();
                assert_eq!(lead.tier, thresholds.classify(lead.score));
            }
        });
    }
}
