mod common;

use aiohub_pipeline::sessions::{SaveResult, SessionsRepo};
use aiohub_pipeline::PipelineError;
use common::{org_id, try_setup_db};
use serde_json::json;
use serial_test::serial;
use uuid::Uuid;

#[tokio::test]
#[serial]
async fn save_with_matching_version_increments_by_one() {
    let Some(pool) = try_setup_db().await else {
        return;
    };
    let repo = SessionsRepo::new(pool.clone());

    let session = repo.create(org_id(), Uuid::new_v4()).await.unwrap();
    assert_eq!(session.version, 0);
    assert_eq!(session.status, "draft");

    // Walk the document up to version 5, then the save under test.
    for v in 0..5 {
        let result = repo
            .save_answers(session.id, &json!({ "progress": v }), v)
            .await
            .unwrap();
        assert!(matches!(result, SaveResult::Saved { new_version, .. } if new_version == v + 1));
    }

    let result = repo
        .save_answers(session.id, &json!({"q_final": true}), 5)
        .await
        .unwrap();
    let SaveResult::Saved { new_version, .. } = result else {
        panic!("expected save to commit");
    };
    assert_eq!(new_version, 6);

    let live = repo.get(session.id).await.unwrap().unwrap();
    assert_eq!(live.version, 6);
    assert_eq!(live.status, "in_progress");
}

#[tokio::test]
#[serial]
async fn stale_version_conflicts_and_writes_nothing() {
    let Some(pool) = try_setup_db().await else {
        return;
    };
    let repo = SessionsRepo::new(pool.clone());

    let session = repo.create(org_id(), Uuid::new_v4()).await.unwrap();
    repo.save_answers(session.id, &json!({"q1": "current"}), 0)
        .await
        .unwrap();

    // A second editor saved first; this caller still holds version 0.
    let result = repo
        .save_answers(session.id, &json!({"q1": "stale overwrite"}), 0)
        .await
        .unwrap();

    let SaveResult::Conflict { latest } = result else {
        panic!("expected a version conflict");
    };
    assert_eq!(latest.version, 1);
    assert_eq!(latest.answers["q1"], "current");

    // Nothing was written by the losing save.
    let live = repo.get(session.id).await.unwrap().unwrap();
    assert_eq!(live.version, 1);
    assert_eq!(live.answers["q1"], "current");
}

#[tokio::test]
#[serial]
async fn answers_merge_instead_of_replace() {
    let Some(pool) = try_setup_db().await else {
        return;
    };
    let repo = SessionsRepo::new(pool.clone());

    let session = repo.create(org_id(), Uuid::new_v4()).await.unwrap();
    repo.save_answers(session.id, &json!({"q1": "a", "q2": "b"}), 0)
        .await
        .unwrap();
    repo.save_answers(session.id, &json!({"q2": "b2", "q3": "c"}), 1)
        .await
        .unwrap();

    let live = repo.get(session.id).await.unwrap().unwrap();
    assert_eq!(live.answers, json!({"q1": "a", "q2": "b2", "q3": "c"}));
}

#[tokio::test]
#[serial]
async fn concurrent_saves_with_same_version_admit_exactly_one() {
    let Some(pool) = try_setup_db().await else {
        return;
    };
    let repo = SessionsRepo::new(pool.clone());
    let session = repo.create(org_id(), Uuid::new_v4()).await.unwrap();

    let repo_a = repo.clone();
    let repo_b = repo.clone();
    let id = session.id;

    let (a, b) = tokio::join!(
        async move { repo_a.save_answers(id, &json!({"editor": "a"}), 0).await.unwrap() },
        async move { repo_b.save_answers(id, &json!({"editor": "b"}), 0).await.unwrap() },
    );

    let a_won = matches!(a, SaveResult::Saved { .. });
    let b_won = matches!(b, SaveResult::Saved { .. });
    assert!(a_won ^ b_won, "exactly one concurrent save must win");

    let live = repo.get(session.id).await.unwrap().unwrap();
    assert_eq!(live.version, 1);
}

#[tokio::test]
#[serial]
async fn missing_and_soft_deleted_sessions_are_not_found() {
    let Some(pool) = try_setup_db().await else {
        return;
    };
    let repo = SessionsRepo::new(pool.clone());

    assert!(matches!(
        repo.save_answers(Uuid::new_v4(), &json!({"q": 1}), 0).await,
        Err(PipelineError::NotFound)
    ));

    let session = repo.create(org_id(), Uuid::new_v4()).await.unwrap();
    assert!(repo.soft_delete(session.id).await.unwrap());

    assert!(repo.get(session.id).await.unwrap().is_none());
    assert!(matches!(
        repo.save_answers(session.id, &json!({"q": 1}), 0).await,
        Err(PipelineError::NotFound)
    ));
}

#[tokio::test]
#[serial]
async fn answers_must_be_an_object() {
    let Some(pool) = try_setup_db().await else {
        return;
    };
    let repo = SessionsRepo::new(pool.clone());
    let session = repo.create(org_id(), Uuid::new_v4()).await.unwrap();

    assert!(matches!(
        repo.save_answers(session.id, &json!("not a map"), 0).await,
        Err(PipelineError::Validation(_))
    ));
}
