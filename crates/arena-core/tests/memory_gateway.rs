use arena_core::*;

fn bucket() -> RatingBucket {
    RatingBucket::new(GameMode::Standard, TimeControl::BLITZ)
}

#[tokio::test]
async fn ratings_fall_back_to_default_bucket_value() {
    let store = MemoryGateway::new(1500);
    let rated = store.add_player("alice", bucket(), 1720);
    let unrated = store.add_player("bob", RatingBucket::new(GameMode::ThreeCheck, TimeControl::BLITZ), 1300);

    assert_eq!(store.rating(rated, bucket()).await.unwrap(), 1720);
    assert_eq!(store.rating(unrated, bucket()).await.unwrap(), 1500);

    let missing = store.rating(PlayerId::new(), bucket()).await.unwrap_err();
    assert!(matches!(missing, GatewayError::NotFound { .. }));
}

#[tokio::test]
async fn player_patches_update_rating_and_marker() {
    let store = MemoryGateway::default();
    let id = store.add_player("carol", bucket(), 1200);
    let competition = CompetitionId::new();

    store
        .patch_player(
            id,
            PlayerPatch {
                rating: Some((bucket(), 1234)),
                active_competition: Some(Some(competition)),
            },
        )
        .await
        .unwrap();
    let record = store.player(id).unwrap();
    assert_eq!(record.rating(bucket()), Some(1234));
    assert_eq!(record.active_competition, Some(competition));

    store
        .patch_player(
            id,
            PlayerPatch {
                active_competition: Some(None),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(store.player(id).unwrap().active_competition, None);
}

#[tokio::test]
async fn injected_failures_only_hit_the_chosen_player() {
    let store = MemoryGateway::default();
    let broken = store.add_player("dave", bucket(), 1200);
    let fine = store.add_player("erin", bucket(), 1200);
    store.fail_player_patches(broken);

    let patch = PlayerPatch {
        rating: Some((bucket(), 1300)),
        ..Default::default()
    };
    assert!(matches!(
        store.patch_player(broken, patch.clone()).await,
        Err(GatewayError::Internal { .. })
    ));
    assert!(store.patch_player(fine, patch).await.is_ok());
}

#[tokio::test]
async fn recording_broadcaster_keeps_order() {
    let broadcaster = RecordingBroadcaster::new();
    let player = PlayerId::new();
    broadcaster
        .send(
            Target::Player(player),
            ArenaEvent::SearchQueued {
                player,
                queue_position: 1,
            },
        )
        .await
        .unwrap();
    broadcaster
        .send(Target::Player(player), ArenaEvent::SearchCancelled { player })
        .await
        .unwrap();
    assert_eq!(broadcaster.names(), vec!["search_queued", "search_cancelled"]);
}
