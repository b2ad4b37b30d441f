use std::sync::Arc;
use std::time::Duration;

use arena_core::{
    ArenaConfig, ArenaError, ArenaEvent, CompetitionId, CompetitionStatus, GameMode, Gateways,
    MemoryGateway, PlayerId, RatingBucket, RecordingBroadcaster, TimeControl,
};
use arena_runner::{MatchCompletion, MatchRegistry};
use tokio::sync::mpsc::UnboundedReceiver;
use tournament::CompetitionService;

struct Harness {
    service: Arc<CompetitionService>,
    registry: Arc<MatchRegistry>,
    completions: UnboundedReceiver<MatchCompletion>,
    store: Arc<MemoryGateway>,
    events: Arc<RecordingBroadcaster>,
}

fn harness(swiss_rounds: Option<u32>) -> Harness {
    let mut config = ArenaConfig::default();
    config.competition.swiss_rounds = swiss_rounds;
    let store = Arc::new(MemoryGateway::default());
    let events = Arc::new(RecordingBroadcaster::new());
    let gateways = Gateways::new(store.clone(), events.clone(), store.clone());
    let (registry, completions) = MatchRegistry::new(config, gateways);
    Harness {
        service: CompetitionService::new(registry.clone()),
        registry,
        completions,
        store,
        events,
    }
}

fn bucket(mode: GameMode) -> RatingBucket {
    RatingBucket::new(mode, TimeControl::BLITZ)
}

fn rating(h: &Harness, player: PlayerId, mode: GameMode) -> i32 {
    h.store.player(player).unwrap().rating(bucket(mode)).unwrap()
}

/// Black resigns every open game of the current round; each completion is
/// handed to the service as it arrives.
async fn white_wins_round(h: &mut Harness, id: CompetitionId) {
    let snapshot = h.service.snapshot(id).await.unwrap();
    let games: Vec<_> = snapshot.round().unwrap().pending_games().collect();
    for (match_id, _, black) in games {
        h.registry.resign(match_id, black).await.unwrap();
        let completion = h.completions.recv().await.unwrap();
        assert_eq!(completion.competition, Some(id));
        h.service.on_match_completion(completion).await.unwrap();
    }
}

/// Let spawned tasks run until they wait on something.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

#[tokio::test(start_paused = true)]
async fn swiss_competition_runs_to_finish() {
    let mut h = harness(Some(2));
    let mode = GameMode::Standard;
    let a = h.store.add_player("a", bucket(mode), 1600);
    let b = h.store.add_player("b", bucket(mode), 1500);
    let c = h.store.add_player("c", bucket(mode), 1400);
    let d = h.store.add_player("d", bucket(mode), 1300);

    let id = h
        .service
        .create_competition("spring swiss", mode, TimeControl::BLITZ)
        .await
        .unwrap();
    for p in [d, c, b, a] {
        h.service.join(id, p).await.unwrap();
    }
    h.service.start_competition(id).await.unwrap();

    let snapshot = h.service.snapshot(id).await.unwrap();
    assert_eq!(snapshot.current_round, 1);
    assert_eq!(snapshot.entrants[0].player, a);
    assert_eq!(snapshot.round().unwrap().pending_games().count(), 2);
    assert_eq!(h.registry.live_matches().await.len(), 2);

    white_wins_round(&mut h, id).await;
    let snapshot = h.service.snapshot(id).await.unwrap();
    assert_eq!(snapshot.current_round, 2);
    // Winners get black against a loser they have not met.
    let round_two: Vec<_> = snapshot.round().unwrap().pending_games().collect();
    assert!(round_two.iter().any(|&(_, w, bl)| (w, bl) == (d, a)));
    assert!(round_two.iter().any(|&(_, w, bl)| (w, bl) == (b, c)));

    white_wins_round(&mut h, id).await;
    assert!(matches!(
        h.service.snapshot(id).await,
        Err(ArenaError::NotFound { .. })
    ));

    let record = h.store.competition(id).unwrap();
    assert_eq!(record.status, CompetitionStatus::Finished);
    // Everyone on one point; the highest rating leads.
    assert_eq!(record.winner, Some(a));
    assert_eq!(record.leaderboard.len(), 4);
    assert!(record.leaderboard.iter().all(|e| e.score == 1.0));

    assert_eq!(rating(&h, a, mode), 1590);
    assert_eq!(rating(&h, b, mode), 1501);
    assert_eq!(rating(&h, c, mode), 1399);
    assert_eq!(rating(&h, d, mode), 1310);
    for p in [a, b, c, d] {
        assert_eq!(h.store.player(p).unwrap().active_competition, None);
    }

    let names = h.events.names();
    for expected in [
        "competition_started",
        "round_started",
        "leaderboard_updated",
        "competition_finished",
    ] {
        assert!(names.contains(&expected), "missing {expected}");
    }
    assert_eq!(names.iter().filter(|n| **n == "round_started").count(), 2);
}

#[tokio::test(start_paused = true)]
async fn duplicate_and_late_completions_are_ignored() {
    let mut h = harness(Some(1));
    let mode = GameMode::Chess960;
    let a = h.store.add_player("a", bucket(mode), 1500);
    let b = h.store.add_player("b", bucket(mode), 1500);
    let c = h.store.add_player("c", bucket(mode), 1500);
    let d = h.store.add_player("d", bucket(mode), 1500);

    let id = h
        .service
        .create_competition("blitz 960", mode, TimeControl::BLITZ)
        .await
        .unwrap();
    for p in [a, b, c, d] {
        h.service.join(id, p).await.unwrap();
    }
    h.service.start_competition(id).await.unwrap();

    let snapshot = h.service.snapshot(id).await.unwrap();
    let games: Vec<_> = snapshot.round().unwrap().pending_games().collect();
    let (first, _, black) = games[0];
    h.registry.resign(first, black).await.unwrap();
    let completion = h.completions.recv().await.unwrap();

    h.service.on_match_completion(completion.clone()).await.unwrap();
    h.service.on_match_completion(completion.clone()).await.unwrap();
    let snapshot = h.service.snapshot(id).await.unwrap();
    assert_eq!(snapshot.standings.score(completion.white), 1.0);
    assert_eq!(snapshot.round().unwrap().pending_games().count(), 1);

    let (second, _, black) = games[1];
    h.registry.resign(second, black).await.unwrap();
    let last = h.completions.recv().await.unwrap();
    h.service.on_match_completion(last.clone()).await.unwrap();
    assert_eq!(
        h.store.competition(id).unwrap().status,
        CompetitionStatus::Finished
    );

    // The competition is gone; a replay changes nothing.
    h.service.on_match_completion(last).await.unwrap();
    assert!(h.service.active_competitions().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn special_game_is_a_single_match() {
    let mut h = harness(None);
    let mode = GameMode::ThreeCheck;
    let a = h.store.add_player("a", bucket(mode), 1500);
    let b = h.store.add_player("b", bucket(mode), 1500);
    let late = h.store.add_player("late", bucket(mode), 1500);

    let id = h
        .service
        .create_competition("three checks", mode, TimeControl::BLITZ)
        .await
        .unwrap();
    h.service.join(id, a).await.unwrap();
    h.service.join(id, b).await.unwrap();
    assert!(matches!(
        h.service.join(id, late).await,
        Err(ArenaError::Validation(_))
    ));

    h.service.start_competition(id).await.unwrap();
    let snapshot = h.service.snapshot(id).await.unwrap();
    assert_eq!(snapshot.total_rounds, 1);
    let (match_id, white, black) = snapshot.round().unwrap().pending_games().next().unwrap();

    // One failed rating write must not block the other.
    h.store.fail_player_patches(black);
    h.registry.resign(match_id, black).await.unwrap();
    let completion = h.completions.recv().await.unwrap();
    h.service.on_match_completion(completion).await.unwrap();

    let record = h.store.competition(id).unwrap();
    assert_eq!(record.status, CompetitionStatus::Finished);
    assert_eq!(record.winner, Some(white));
    assert_eq!(rating(&h, white, mode), 1510);
    assert_eq!(rating(&h, black, mode), 1500);
    assert_eq!(h.store.player(white).unwrap().active_competition, None);
}

#[tokio::test(start_paused = true)]
async fn enrollment_rules() {
    let h = harness(None);
    let mode = GameMode::Standard;
    let a = h.store.add_player("a", bucket(mode), 1500);
    let b = h.store.add_player("b", bucket(mode), 1500);

    let first = h
        .service
        .create_competition("first", mode, TimeControl::BLITZ)
        .await
        .unwrap();
    let second = h
        .service
        .create_competition("second", mode, TimeControl::BLITZ)
        .await
        .unwrap();

    h.service.join(first, a).await.unwrap();
    assert_eq!(h.store.player(a).unwrap().active_competition, Some(first));
    assert!(matches!(
        h.service.join(first, a).await,
        Err(ArenaError::Conflict(_))
    ));
    assert!(matches!(
        h.service.join(second, a).await,
        Err(ArenaError::Conflict(_))
    ));
    assert!(matches!(
        h.service.start_competition(first).await,
        Err(ArenaError::Validation(_))
    ));

    h.service.leave(first, a).await.unwrap();
    assert_eq!(h.store.player(a).unwrap().active_competition, None);
    h.service.join(second, a).await.unwrap();
    h.service.join(second, b).await.unwrap();
    assert_eq!(h.store.competition(second).unwrap().players, vec![a, b]);

    h.service.start_competition(second).await.unwrap();
    assert!(matches!(
        h.service.start_competition(second).await,
        Err(ArenaError::Conflict(_))
    ));
    assert!(matches!(
        h.service.leave(second, b).await,
        Err(ArenaError::Conflict(_))
    ));
    assert!(matches!(
        h.service.join(CompetitionId::new(), b).await,
        Err(ArenaError::NotFound { .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn odd_field_rotates_byes_through_listener() {
    let mut h = harness(Some(3));
    let mode = GameMode::Standard;
    let players: Vec<PlayerId> = (0..3)
        .map(|i| h.store.add_player(&format!("p{i}"), bucket(mode), 1400 + 100 * i))
        .collect();

    let id = h
        .service
        .create_competition("odd", mode, TimeControl::BLITZ)
        .await
        .unwrap();
    for &p in &players {
        h.service.join(id, p).await.unwrap();
    }
    let (_, dummy) = tokio::sync::mpsc::unbounded_channel();
    let completions = std::mem::replace(&mut h.completions, dummy);
    let listener = h.service.spawn_completion_listener(completions);

    h.service.start_competition(id).await.unwrap();
    for _ in 0..3 {
        let snapshot = h.service.snapshot(id).await.unwrap();
        let (match_id, _, black) = snapshot.round().unwrap().pending_games().next().unwrap();
        h.registry.resign(match_id, black).await.unwrap();
        settle().await;
    }

    assert_eq!(
        h.store.competition(id).unwrap().status,
        CompetitionStatus::Finished
    );
    let mut byes: Vec<PlayerId> = h
        .events
        .events()
        .into_iter()
        .filter_map(|(_, event)| match event {
            ArenaEvent::RoundStarted { pairings, .. } => Some(pairings),
            _ => None,
        })
        .flatten()
        .filter(|p| p.black.is_none())
        .map(|p| p.white)
        .collect();
    assert_eq!(byes.len(), 3);
    byes.sort();
    byes.dedup();
    assert_eq!(byes.len(), 3, "a player sat out twice");

    listener.abort();
}
