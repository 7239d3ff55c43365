#![forbid(unsafe_code)]

mod support;

use serde_json::json;
use support::{T0, TestDb};
use wq_storage::{
    AckRequest, ClaimRequest, EnqueueRequest, EnqueueResult, FailRequest, JobEventType,
    JobEventsRequest, JobStatus,
};

#[test]
fn deploy_job_retries_once_then_succeeds() {
    let db = TestDb::new();
    let mut store = db.open();

    let request = EnqueueRequest {
        payload: json!({"target": "alpha"}),
        idempotency_key: Some("deploy:alpha".to_string()),
        max_attempts: Some(3),
        now_ms: Some(T0),
        ..EnqueueRequest::new("deploy", "ui")
    };

    let first = store.enqueue(request.clone()).expect("enqueue");
    assert!(!first.deduped);
    let j1 = first.job_id.clone();

    let second = store.enqueue(request).expect("enqueue again");
    assert_eq!(
        second,
        EnqueueResult {
            job_id: j1.clone(),
            deduped: true,
        }
    );

    let claimed = store
        .claim_next(ClaimRequest {
            worker_id: "w1".to_string(),
            now_ms: Some(T0 + 100),
            lease_ms: None,
        })
        .expect("claim")
        .expect("job");
    assert_eq!(claimed.job_id, j1);
    assert_eq!(claimed.status, JobStatus::Running);
    assert_eq!(claimed.attempt, 1);

    let outcome = store
        .fail(FailRequest {
            job_id: j1.clone(),
            worker_id: "w1".to_string(),
            error: "ssh timeout".to_string(),
            now_ms: Some(T0 + 200),
            retry: None,
        })
        .expect("fail")
        .expect("owned");
    assert_eq!(outcome.status, JobStatus::Queued);
    let run_at = outcome.run_at_ms.expect("retry time");
    assert!(run_at > T0 + 200);

    let early = store
        .claim_next(ClaimRequest {
            worker_id: "w1".to_string(),
            now_ms: Some(run_at - 1),
            lease_ms: None,
        })
        .expect("claim");
    assert!(early.is_none());

    let reclaimed = store
        .claim_next(ClaimRequest {
            worker_id: "w1".to_string(),
            now_ms: Some(run_at),
            lease_ms: None,
        })
        .expect("claim")
        .expect("job");
    assert_eq!(reclaimed.job_id, j1);
    assert_eq!(reclaimed.attempt, 2);

    let acked = store
        .ack(AckRequest {
            job_id: j1.clone(),
            worker_id: "w1".to_string(),
            result: Some(json!({"ok": true})),
            now_ms: Some(run_at + 50),
        })
        .expect("ack");
    assert!(acked);

    let job = store.get(&j1).expect("get").expect("job");
    assert_eq!(job.status, JobStatus::Done);
    assert_eq!(job.result, Some(json!({"ok": true})));
    assert_eq!(job.payload, json!({"target": "alpha"}));
    assert_eq!(job.last_error, "ssh timeout");

    let history = store
        .job_events(JobEventsRequest {
            job_id: j1,
            limit: None,
        })
        .expect("events")
        .into_iter()
        .map(|e| (e.event_type, e.attempt))
        .collect::<Vec<_>>();
    assert_eq!(
        history,
        vec![
            (JobEventType::Enqueue, 0),
            (JobEventType::Claim, 1),
            (JobEventType::Retry, 1),
            (JobEventType::Claim, 2),
            (JobEventType::Ack, 2),
        ]
    );
}
