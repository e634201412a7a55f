//! Integration tests for the correlation engine.

use std::sync::Arc;
use std::time::Duration;

use prompt_relay::engine::{
    Delivery, Dispatcher, Relay, RelayConfig, SweepConfig, Sweeper, WaitConfig, WaitCoordinator,
};
use prompt_relay::error::Error;
use prompt_relay::event::WorkerEvent;
use prompt_relay::model::{RequestId, ResultDelivery, Submission, Task};
use prompt_relay::outbound::BroadcastOutbound;
use prompt_relay::store::CorrelationStore;
use tokio::time::Instant;

const TIMEOUT: Duration = Duration::from_secs(5);
const POLL: Duration = Duration::from_millis(500);

fn test_relay() -> Relay {
    Relay::new(RelayConfig {
        wait: WaitConfig {
            timeout: TIMEOUT,
            poll_interval: POLL,
        },
        ..RelayConfig::default()
    })
}

/// Answer every request with `answer(prompt)` after `delay`.
fn spawn_worker(relay: &Relay, delay: Duration, answer: fn(&str) -> String) {
    let mut events = relay.subscribe();
    let relay = relay.clone();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            if let WorkerEvent::NewRequest {
                request_id, prompt, ..
            } = event
            {
                tokio::time::sleep(delay).await;
                relay
                    .deliver(ResultDelivery::new(request_id, answer(&prompt)))
                    .unwrap();
            }
        }
    });
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

#[test]
fn missing_prompt_is_rejected_before_the_store() {
    let store = Arc::new(CorrelationStore::new());
    let dispatcher = Dispatcher::new(Arc::clone(&store), Arc::new(BroadcastOutbound::new(4)));

    let err = dispatcher.dispatch(Submission::default()).unwrap_err();
    assert!(matches!(err, Error::MissingField("prompt")));
    assert!(err.is_client_error());

    let err = dispatcher.dispatch(Submission::new("")).unwrap_err();
    assert!(matches!(err, Error::MissingField("prompt")));
    assert!(store.is_empty());
}

#[test]
fn whitespace_prompt_is_passed_through() {
    let task = Dispatcher::validate(Submission::new("   ")).unwrap();
    assert_eq!(task, Task::new("claude", "   "));
}

#[test]
fn model_defaults_to_claude_only_when_absent() {
    let task = Dispatcher::validate(Submission::new("hi")).unwrap();
    assert_eq!(task, Task::new("claude", "hi"));

    let task = Dispatcher::validate(Submission::new("hi").model("gpt-4o")).unwrap();
    assert_eq!(task.model, "gpt-4o");

    let task = Dispatcher::validate(Submission::new("hi").model("")).unwrap();
    assert_eq!(task.model, "");
}

#[tokio::test]
async fn entry_exists_before_worker_sees_the_request() {
    let store = Arc::new(CorrelationStore::new());
    let outbound = BroadcastOutbound::new(4);
    let mut worker = outbound.subscribe();
    let dispatcher = Dispatcher::new(Arc::clone(&store), Arc::new(outbound));

    let dispatched = dispatcher
        .dispatch(Submission::new("What is 2+2?").model("claude"))
        .unwrap();
    assert_eq!(dispatched.receivers, 1);

    match worker.recv().await.unwrap() {
        WorkerEvent::NewRequest {
            request_id,
            model,
            prompt,
        } => {
            assert_eq!(request_id, dispatched.id);
            assert_eq!(model, "claude");
            assert_eq!(prompt, "What is 2+2?");
            assert!(store.contains(request_id));
        }
        other => panic!("expected NewRequest, got {other:?}"),
    }
}

#[test]
fn dispatch_without_worker_still_records_entry() {
    let relay = test_relay();
    let dispatched = relay.dispatcher().dispatch(Submission::new("hi")).unwrap();

    assert_eq!(dispatched.receivers, 0);
    assert_eq!(relay.status().pending, 1);
}

// ---------------------------------------------------------------------------
// Collect
// ---------------------------------------------------------------------------

#[test]
fn delivery_missing_fields_is_client_error() {
    let relay = test_relay();

    let missing_result = ResultDelivery {
        request_id: Some(RequestId::new().to_string()),
        ..ResultDelivery::default()
    };
    assert!(relay.deliver(missing_result).unwrap_err().is_client_error());

    let missing_id = ResultDelivery {
        result: Some("4".to_string()),
        ..ResultDelivery::default()
    };
    assert!(relay.deliver(missing_id).unwrap_err().is_client_error());
}

#[test]
fn delivery_for_unknown_id_is_reported_not_failed() {
    let relay = test_relay();

    let outcome = relay
        .deliver(ResultDelivery::new(RequestId::new(), "orphan"))
        .unwrap();
    assert!(matches!(outcome, Delivery::Unknown(_)));

    let outcome = relay
        .deliver(ResultDelivery::new("not-a-uuid", "orphan"))
        .unwrap();
    assert_eq!(outcome, Delivery::Unknown("not-a-uuid".to_string()));
    assert!(relay.store().is_empty());
}

#[test]
fn delivery_completes_pending_entry() {
    let relay = test_relay();
    let dispatched = relay.dispatcher().dispatch(Submission::new("hi")).unwrap();

    let outcome = relay
        .deliver(ResultDelivery::new(dispatched.id, "hello"))
        .unwrap();
    assert_eq!(outcome, Delivery::Accepted(dispatched.id));

    let counts = relay.status();
    assert_eq!(counts.pending, 0);
    assert_eq!(counts.completed, 1);
}

// ---------------------------------------------------------------------------
// Wait
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn submit_returns_the_delivered_result() {
    let relay = test_relay();
    spawn_worker(&relay, Duration::from_millis(800), |prompt| {
        assert_eq!(prompt, "What is 2+2?");
        "4".to_string()
    });

    let answer = relay
        .submit(Submission::new("What is 2+2?").model("claude"))
        .await
        .unwrap();

    assert_eq!(answer.result, "4");
    assert_eq!(answer.model, "claude");
    assert_eq!(answer.prompt, "What is 2+2?");
    assert!(relay.store().is_empty());
}

#[tokio::test(start_paused = true)]
async fn concurrent_callers_each_get_their_own_result() {
    let relay = test_relay();
    spawn_worker(&relay, Duration::from_millis(100), |prompt| {
        format!("echo: {prompt}")
    });

    let calls: Vec<_> = (0..20)
        .map(|n| {
            let relay = relay.clone();
            tokio::spawn(async move { relay.submit(Submission::new(format!("prompt {n}"))).await })
        })
        .collect();

    for (n, call) in calls.into_iter().enumerate() {
        let answer = call.await.unwrap().unwrap();
        assert_eq!(answer.result, format!("echo: prompt {n}"));
    }
    assert!(relay.store().is_empty());
}

#[tokio::test(start_paused = true)]
async fn timeout_fires_within_one_poll_interval() {
    let relay = test_relay();

    let started = Instant::now();
    let err = relay.submit(Submission::new("nobody home")).await.unwrap_err();
    let elapsed = started.elapsed();

    assert!(matches!(err, Error::Timeout { after, .. } if after == TIMEOUT));
    assert!(elapsed >= TIMEOUT, "timed out early: {elapsed:?}");
    assert!(elapsed <= TIMEOUT + POLL, "timed out late: {elapsed:?}");
    assert!(relay.store().is_empty(), "timed-out entry must be removed");
}

#[tokio::test(start_paused = true)]
async fn timeout_not_aligned_to_poll_interval_is_still_bounded() {
    let store = Arc::new(CorrelationStore::new());
    let config = WaitConfig {
        timeout: Duration::from_millis(1_300),
        poll_interval: POLL,
    };
    let waiter = WaitCoordinator::new(Arc::clone(&store), config);
    let id = store.create(Task::new("claude", "hi"));

    let started = Instant::now();
    assert!(waiter.wait(id).await.is_err());
    let elapsed = started.elapsed();

    assert!(elapsed >= config.timeout);
    assert!(elapsed <= config.timeout + config.poll_interval);
}

#[tokio::test(start_paused = true)]
async fn late_result_after_timeout_is_dropped() {
    let relay = test_relay();
    spawn_worker(&relay, TIMEOUT + Duration::from_secs(2), |_| "late".to_string());

    let err = relay.submit(Submission::new("slow")).await.unwrap_err();
    assert!(matches!(err, Error::Timeout { .. }));

    // Let the worker's late delivery land
    tokio::time::sleep(Duration::from_secs(3)).await;
    assert!(relay.store().is_empty(), "late result must not resurrect the entry");
}

#[tokio::test(start_paused = true)]
async fn dropped_waiter_releases_its_entry() {
    let relay = test_relay();

    let pending = {
        let relay = relay.clone();
        tokio::spawn(async move { relay.submit(Submission::new("abandoned")).await })
    };
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(relay.status().pending, 1);

    pending.abort();
    let _ = pending.await;
    assert!(relay.store().is_empty());
}

// ---------------------------------------------------------------------------
// Sweep
// ---------------------------------------------------------------------------

#[test]
fn sweeper_removes_entries_past_ttl() {
    let store = Arc::new(CorrelationStore::new());
    let sweeper = Sweeper::new(
        Arc::clone(&store),
        SweepConfig {
            interval: Duration::from_secs(30),
            entry_ttl: Duration::ZERO,
        },
    );
    store.create(Task::new("claude", "forgotten"));
    std::thread::sleep(Duration::from_millis(5));

    assert_eq!(sweeper.sweep_once(), 1);
    assert!(store.is_empty());
}

#[test]
fn sweeper_keeps_live_entries() {
    let relay = test_relay();
    relay.dispatcher().dispatch(Submission::new("live")).unwrap();

    assert_eq!(relay.sweeper().sweep_once(), 0);
    assert_eq!(relay.status().pending, 1);
}

#[tokio::test]
async fn sweeper_stops_on_shutdown() {
    let relay = test_relay();
    let sweeper = relay.sweeper().clone();
    let handle = tokio::spawn({
        let sweeper = sweeper.clone();
        async move { sweeper.run().await }
    });

    sweeper.shutdown();
    tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("sweeper should stop")
        .unwrap();
}
