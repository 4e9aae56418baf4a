mod common;

use common::*;
use domain::DomainError;
use engine::{AreaOptions, EngineError, SearchParams, Viewer};
use std::sync::Arc;

#[tokio::test]
async fn unregistered_areas_are_errors() {
    let h = Harness::new().await;
    let err = h.api.manager().area(COMPONENT, "missing", CTX).unwrap_err();
    assert!(matches!(
        err,
        EngineError::UnknownArea { ref component, ref area } if component == COMPONENT && area == "missing"
    ));

    assert_eq!(
        h.api.manager().areas_in_component(COMPONENT),
        vec!["notes".to_string(), "plain".to_string()]
    );
    assert!(h.api.manager().areas_in_component("mod_other").is_empty());
}

#[tokio::test]
async fn area_names_are_validated() {
    let h = Harness::new().await;
    let mut manager = engine::CommentsManager::new(h.api.manager().state().clone());
    let err = manager
        .register_with_options(
            "mod demo",
            AREA,
            AreaOptions::default(),
            Arc::new(DemoHandler::default()),
        )
        .unwrap_err();
    assert!(matches!(err, EngineError::Domain(DomainError::InvalidName(_))));
}

#[tokio::test]
async fn options_come_from_settings() {
    let h = Harness::new().await;
    let manager = h.api.manager();

    let notes = manager.area(COMPONENT, AREA, CTX).unwrap();
    assert!(notes.options().allow_replies);
    assert!(notes.options().allow_pseudonym);

    let plain = manager.area(COMPONENT, "plain", CTX).unwrap();
    assert!(!plain.options().allow_replies);
    assert!(plain.options().allow_upvotes);
}

#[tokio::test]
async fn comments_are_found_by_id_alone() {
    let h = Harness::new().await;
    let c = h.post(ALICE, 77, "find me", "", None).await;

    let (section, comment) = h.api.manager().comment(c.id).await.unwrap().unwrap();
    assert_eq!(section.key().item_id, 77);
    assert_eq!(section.item().title(), "Note 77");
    assert_eq!(comment.content(), "find me");

    assert!(h.api.manager().comment(c.id + 1000).await.unwrap().is_none());
}

#[tokio::test]
async fn bulk_deletion_by_context_and_component() {
    let h = Harness::new().await;
    h.seed(CTX, 42, ALICE, 100, None).await;
    h.seed(CTX, 43, ALICE, 200, None).await;
    let kept = h.seed(CHILD_CTX, 8, ALICE, 300, None).await;
    h.seed(HIDDEN_CTX, 9, ALICE, 400, None).await;

    let manager = h.api.manager();
    assert_eq!(manager.delete_comments_in_context(&[CTX, HIDDEN_CTX]).await.unwrap(), 3);
    assert!(manager.comment(kept).await.unwrap().is_some());

    assert_eq!(manager.delete_component_comments("mod_other").await.unwrap(), 0);
    assert_eq!(manager.delete_component_comments(COMPONENT).await.unwrap(), 1);
    assert!(manager.comment(kept).await.unwrap().is_none());
}

#[tokio::test]
async fn section_and_area_wide_deletion() {
    let h = Harness::new().await;
    let top = h.seed(CTX, 42, ALICE, 100, None).await;
    h.seed(CTX, 42, BOB, 200, Some(top)).await;
    h.seed(CTX, 43, ALICE, 300, None).await;

    let section = h.section(CTX, 42).await;
    assert_eq!(section.delete_all().await.unwrap(), 2);

    let area = h.api.manager().area(COMPONENT, AREA, CTX).unwrap();
    let mut remaining = area.comments(SearchParams::default(), Viewer::Trusted);
    assert_eq!(remaining.count_total(true).await.unwrap(), 1);

    assert_eq!(area.delete_all().await.unwrap(), 1);
}
