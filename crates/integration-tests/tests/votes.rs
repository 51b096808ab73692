mod support;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use rf_backend_memory::MemoryBackend;
use rf_core::{
    Backend, CommentId, CommentOptions, Document, Post, PostId, PostOptions, ResourceRef, Store,
    StoreError, UserId, VoteDirection, VoteOptions,
};
use support::{flaky_store, register, store, ticking_clock, FlakyBackend};

fn counters(post: &Post) -> (i64, i64, i64) {
    (post.upvotes, post.downvotes, post.score)
}

async fn post_by(store: &Store, author: &UserId) -> Post {
    store.create_post(author, "Title", "Body", PostOptions::default()).await.unwrap()
}

#[tokio::test]
async fn voting_the_same_way_twice_changes_nothing() {
    let (store, backend) = flaky_store();
    let alice = register(&store, "alice").await;
    let post = post_by(&store, &alice.id).await;
    let target = ResourceRef::post(&post.id);

    store.set_vote(&alice.id, &target, VoteDirection::Up, VoteOptions::default()).await.unwrap();
    let after_first = store.get_post(&post.id).await.unwrap();
    let mutations = backend.mutate_calls.load(Ordering::SeqCst);
    let vote_rev = backend.inner.get_vote(&alice.id, &target).await.unwrap().rev().map(String::from);
    assert!(vote_rev.is_some());

    store.set_vote(&alice.id, &target, VoteDirection::Up, VoteOptions::default()).await.unwrap();
    let after_second = store.get_post(&post.id).await.unwrap();

    let stored = backend.inner.get_vote(&alice.id, &target).await.unwrap();
    assert_eq!(stored.rev().map(String::from), vote_rev, "vote document was rewritten");
    assert_eq!(after_second, after_first);
    assert_eq!(backend.mutate_calls.load(Ordering::SeqCst), mutations);
    assert_eq!(counters(&after_second), (1, 0, 1));
}

#[tokio::test]
async fn switching_up_to_down_moves_each_counter() {
    let (store, _) = store();
    let alice = register(&store, "alice").await;
    let bob = register(&store, "bob").await;
    let post = post_by(&store, &alice.id).await;
    let target = ResourceRef::post(&post.id);

    // Someone else's vote keeps the baseline non-trivial.
    store.set_vote(&bob.id, &target, VoteDirection::Down, VoteOptions::default()).await.unwrap();
    let before = store.get_post(&post.id).await.unwrap();

    store.set_vote(&alice.id, &target, VoteDirection::Up, VoteOptions::default()).await.unwrap();
    store.set_vote(&alice.id, &target, VoteDirection::Down, VoteOptions::default()).await.unwrap();
    let after = store.get_post(&post.id).await.unwrap();

    assert_eq!(after.upvotes, before.upvotes);
    assert_eq!(after.downvotes, before.downvotes + 1);
    assert_eq!(after.score, before.score - 1);
    assert_eq!(after.score, after.upvotes - after.downvotes);
    assert_eq!(store.get_user_vote(&alice.id, &target).await.unwrap(), VoteDirection::Down);
}

#[tokio::test]
async fn up_then_down_relative_to_the_up_state() {
    let (store, _) = store();
    let alice = register(&store, "alice").await;
    let post = post_by(&store, &alice.id).await;
    let target = ResourceRef::post(&post.id);

    store.set_vote(&alice.id, &target, VoteDirection::Up, VoteOptions::default()).await.unwrap();
    let up = counters(&store.get_post(&post.id).await.unwrap());
    store.set_vote(&alice.id, &target, VoteDirection::Down, VoteOptions::default()).await.unwrap();
    let down = counters(&store.get_post(&post.id).await.unwrap());

    assert_eq!((down.0 - up.0, down.1 - up.1, down.2 - up.2), (-1, 1, -2));
}

#[tokio::test]
async fn retracting_a_vote_restores_the_counters() {
    let (store, _) = store();
    let alice = register(&store, "alice").await;
    let post = post_by(&store, &alice.id).await;
    let target = ResourceRef::post(&post.id);

    store.set_vote(&alice.id, &target, VoteDirection::Down, VoteOptions::default()).await.unwrap();
    store.set_vote(&alice.id, &target, VoteDirection::None, VoteOptions::default()).await.unwrap();

    let post = store.get_post(&post.id).await.unwrap();
    assert_eq!(counters(&post), (0, 0, 0));
    assert_eq!(store.get_user_vote(&alice.id, &target).await.unwrap(), VoteDirection::None);
}

#[tokio::test]
async fn counter_reconciliation_uses_the_store_attempt_budget() {
    let backend = Arc::new(FlakyBackend::new(Arc::new(MemoryBackend::new())));
    let store = Store::new(backend.clone())
        .with_clock(ticking_clock())
        .with_max_retries(7);
    let alice = register(&store, "alice").await;
    let bob = register(&store, "bob").await;
    let post = post_by(&store, &alice.id).await;
    let target = ResourceRef::post(&post.id);

    store.set_vote(&alice.id, &target, VoteDirection::Up, VoteOptions::default()).await.unwrap();
    store
        .set_vote(&bob.id, &target, VoteDirection::Down, VoteOptions::default().conflict_retry(2))
        .await
        .unwrap();

    assert_eq!(backend.budgets(), [7, 2]);
    assert_eq!(counters(&store.get_post(&post.id).await.unwrap()), (1, 1, 0));
}

#[tokio::test]
async fn missing_vote_reads_as_none() {
    let (store, _) = store();
    let alice = register(&store, "alice").await;
    let target = ResourceRef::post(&PostId::from("post:1"));
    assert_eq!(store.get_user_vote(&alice.id, &target).await.unwrap(), VoteDirection::None);
}

#[tokio::test]
async fn first_vote_of_none_is_a_no_op() {
    let (store, backend) = flaky_store();
    let alice = register(&store, "alice").await;
    let post = post_by(&store, &alice.id).await;

    store
        .set_vote(&alice.id, &ResourceRef::post(&post.id), VoteDirection::None, VoteOptions::default())
        .await
        .unwrap();
    assert_eq!(backend.mutate_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn vote_stands_when_counter_update_fails() {
    let (store, backend) = flaky_store();
    let alice = register(&store, "alice").await;
    let post = post_by(&store, &alice.id).await;
    let target = ResourceRef::post(&post.id);

    backend.fail_mutations(true);
    store.set_vote(&alice.id, &target, VoteDirection::Up, VoteOptions::default()).await.unwrap();

    assert_eq!(store.get_user_vote(&alice.id, &target).await.unwrap(), VoteDirection::Up);
    assert_eq!(counters(&store.get_post(&post.id).await.unwrap()), (0, 0, 0));
}

#[tokio::test]
async fn comment_votes_are_recorded_without_counters() {
    let (store, backend) = flaky_store();
    let alice = register(&store, "alice").await;
    let post = post_by(&store, &alice.id).await;
    let comment = store.add_comment(&post.id, &alice.id, "hi", CommentOptions::default()).await.unwrap();
    let mutations = backend.mutate_calls.load(Ordering::SeqCst);

    let target = ResourceRef::comment(&comment.id);
    store.set_vote(&alice.id, &target, VoteDirection::Up, VoteOptions::default()).await.unwrap();

    assert_eq!(store.get_user_vote(&alice.id, &target).await.unwrap(), VoteDirection::Up);
    assert_eq!(backend.mutate_calls.load(Ordering::SeqCst), mutations);
    assert_eq!(counters(&store.get_post(&post.id).await.unwrap()), (0, 0, 0));
}

#[tokio::test]
async fn empty_identifiers_are_rejected() {
    let (store, _) = store();
    let alice = register(&store, "alice").await;

    let err = store
        .set_vote(&UserId::from(""), &ResourceRef::post(&PostId::from("post:1")), VoteDirection::Up, VoteOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::InvalidInput(_)));

    let err = store
        .set_vote(&alice.id, &ResourceRef::comment(&CommentId::from("")), VoteDirection::Up, VoteOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::InvalidInput(_)));
}

#[tokio::test]
async fn vote_activity_is_opt_in() {
    let (store, backend) = flaky_store();
    let alice = register(&store, "alice").await;
    let post = post_by(&store, &alice.id).await;
    let target = ResourceRef::post(&post.id);

    store.set_vote(&alice.id, &target, VoteDirection::Up, VoteOptions::default()).await.unwrap();
    assert_eq!(backend.inner.activity_count(), 0);
    store
        .set_vote(&alice.id, &target, VoteDirection::Down, VoteOptions::default().track_activity())
        .await
        .unwrap();
    assert_eq!(backend.inner.activity_count(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_voters_are_all_counted() {
    let (store, _) = store();
    let alice = register(&store, "alice").await;
    let post = post_by(&store, &alice.id).await;

    let mut tasks = Vec::new();
    for n in 0..32 {
        let store = store.clone();
        let target = ResourceRef::post(&post.id);
        tasks.push(tokio::spawn(async move {
            let voter = UserId::new(&format!("voter{n}"));
            let direction = if n % 4 == 0 { VoteDirection::Down } else { VoteDirection::Up };
            store
                .set_vote(&voter, &target, direction, VoteOptions::default().conflict_retry(100))
                .await
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let post = store.get_post(&post.id).await.unwrap();
    assert_eq!(counters(&post), (24, 8, 16));
}
