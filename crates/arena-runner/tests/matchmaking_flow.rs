use std::sync::Arc;

use arena_core::{
    ArenaConfig, ArenaError, ArenaEvent, ConnectionId, GameMode, Gateways, MatchType,
    MemoryGateway, PlayerId, RatingBucket, RecordingBroadcaster, Target, TimeControl,
};
use arena_runner::{MatchRegistry, Matchmaker, SearchOutcome, SearchParams};

struct Harness {
    matchmaker: Matchmaker,
    registry: Arc<MatchRegistry>,
    store: Arc<MemoryGateway>,
    events: Arc<RecordingBroadcaster>,
}

fn harness() -> Harness {
    let store = Arc::new(MemoryGateway::default());
    let events = Arc::new(RecordingBroadcaster::new());
    let gateways = Gateways::new(store.clone(), events.clone(), store.clone());
    let (registry, _completions) = MatchRegistry::new(ArenaConfig::default(), gateways);
    Harness {
        matchmaker: Matchmaker::new(registry.clone()),
        registry,
        store,
        events,
    }
}

fn bucket() -> RatingBucket {
    RatingBucket::new(GameMode::Standard, TimeControl::BLITZ)
}

fn search(player: PlayerId) -> SearchParams {
    SearchParams {
        player,
        connection: ConnectionId::new(),
        mode: GameMode::Standard,
        match_type: MatchType::Rated,
        time_control: TimeControl::BLITZ,
    }
}

#[tokio::test(start_paused = true)]
async fn close_ratings_start_one_match() {
    let h = harness();
    let alice = h.store.add_player("alice", bucket(), 1500);
    let bob = h.store.add_player("bob", bucket(), 1650);

    match h.matchmaker.enqueue_search(search(alice)).await.unwrap() {
        SearchOutcome::Queued { position } => assert_eq!(position, 1),
        SearchOutcome::Matched(_) => panic!("nobody to pair with yet"),
    }
    let handle = match h.matchmaker.enqueue_search(search(bob)).await.unwrap() {
        SearchOutcome::Matched(handle) => handle,
        SearchOutcome::Queued { .. } => panic!("expected a pairing"),
    };

    let info = handle.info();
    let mut players = [info.white, info.black];
    players.sort();
    let mut expected = [alice, bob];
    expected.sort();
    assert_eq!(players, expected);
    assert_eq!(info.match_type, MatchType::Rated);

    assert_eq!(h.matchmaker.queue_len().await, 0);
    assert_eq!(h.registry.live_matches().await, vec![handle.id()]);

    let found: Vec<_> = h
        .events
        .events()
        .into_iter()
        .filter(|(_, e)| matches!(e, ArenaEvent::MatchFound { .. }))
        .map(|(target, _)| target)
        .collect();
    assert!(found.contains(&Target::Player(alice)));
    assert!(found.contains(&Target::Player(bob)));
}

#[tokio::test(start_paused = true)]
async fn distant_ratings_wait() {
    let h = harness();
    let low = h.store.add_player("low", bucket(), 1200);
    let high = h.store.add_player("high", bucket(), 1401);

    h.matchmaker.enqueue_search(search(low)).await.unwrap();
    match h.matchmaker.enqueue_search(search(high)).await.unwrap() {
        SearchOutcome::Queued { position } => assert_eq!(position, 2),
        SearchOutcome::Matched(_) => panic!("gap of 201 must not pair"),
    }
    assert!(h.registry.live_matches().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn searching_twice_is_a_conflict() {
    let h = harness();
    let p = h.store.add_player("p", bucket(), 1500);
    h.matchmaker.enqueue_search(search(p)).await.unwrap();
    assert!(matches!(
        h.matchmaker.enqueue_search(search(p)).await,
        Err(ArenaError::Conflict(_))
    ));
    assert_eq!(h.matchmaker.queue_len().await, 1);
}

#[tokio::test(start_paused = true)]
async fn unknown_players_are_not_queued() {
    let h = harness();
    let err = h.matchmaker.enqueue_search(search(PlayerId::new())).await;
    assert!(matches!(err, Err(ArenaError::Gateway(_))));
    assert_eq!(h.matchmaker.queue_len().await, 0);
}

#[tokio::test(start_paused = true)]
async fn cancel_and_disconnect_leave_the_queue() {
    let h = harness();
    let a = h.store.add_player("a", bucket(), 1000);
    let b = h.store.add_player("b", bucket(), 1500);
    let c = h.store.add_player("c", bucket(), 2000);

    h.matchmaker.enqueue_search(search(a)).await.unwrap();
    assert!(h.matchmaker.cancel_search(a).await);
    assert!(!h.matchmaker.cancel_search(a).await);
    assert!(h.events.names().contains(&"search_cancelled"));

    let shared = ConnectionId::new();
    let mut from_b = search(b);
    from_b.connection = shared;
    let mut from_c = search(c);
    from_c.connection = shared;
    h.matchmaker.enqueue_search(from_b).await.unwrap();
    h.matchmaker.enqueue_search(from_c).await.unwrap();
    assert!(h.matchmaker.is_searching(c).await);

    assert_eq!(h.matchmaker.cancel_by_connection(shared).await, 2);
    assert_eq!(h.matchmaker.queue_len().await, 0);
}
