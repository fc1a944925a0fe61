//! Integration tests: multiple clients kept consistent over the bus.
//!
//! Each test builds one shared world and bus hub, connects a GM client
//! and one or two player clients, and drives a round through the same
//! message flow real clients would see. Draining is explicit: a client
//! only applies inbound messages when the test pumps it, which makes
//! message races easy to stage.

use std::time::Duration;

use simulcard::prelude::*;

type Client = SessionClient<MemoryHost, ChannelBus>;

// =========================================================================
// Fixture
// =========================================================================

const S1: &str = "s1";

fn world() -> MemoryWorld {
    let world = MemoryWorld::new();
    world.add_user("gm", "Gamemaster", true);
    world.add_user("u1", "Alice", true);
    world.add_user("u2", "Bob", true);
    world.add_token("t1", "Knight", "knight.webp", "knight-portrait.webp");
    world.add_token("t2", "Rogue", "rogue.webp", "rogue-portrait.webp");
    world.add_stack(S1, "Initiative Deck");
    let s1 = StackId::new(S1);
    world.add_card(&s1, "c1", "Ace", "ace.webp");
    world.add_card(&s1, "c2", "Two", "two.webp");
    world.add_card(&s1, "c3", "Three", "three.webp");
    world
}

fn client(
    world: &MemoryWorld,
    hub: &BusHub,
    user: &str,
    authority: bool,
    seed: u64,
) -> Client {
    SessionClient::seeded(
        MemoryHost::new(world.clone(), user, authority),
        hub.connect(),
        HostSettings::default(),
        seed,
    )
}

/// Participant configuration for the standard round:
/// the Knight picks manually, the Rogue draws automatically.
fn setups() -> Vec<ParticipantSetup> {
    vec![
        ParticipantSetup::new(
            TokenId::new("t1"),
            UserId::new("u1"),
            StackId::new(S1),
        ),
        ParticipantSetup::new(
            TokenId::new("t2"),
            UserId::new("u2"),
            StackId::new(S1),
        )
        .auto(),
    ]
}

/// Applies the next `n` inbound messages, failing the test on a stall.
async fn drain(c: &mut Client, n: usize) -> Vec<Applied> {
    let mut applied = Vec::with_capacity(n);
    for _ in 0..n {
        let event =
            tokio::time::timeout(Duration::from_secs(5), c.next_applied())
                .await
                .expect("timed out waiting for a bus message")
                .unwrap()
                .expect("bus closed unexpectedly");
        applied.push(event);
    }
    applied
}

fn card_of(c: &Client, token: &str) -> Option<CardId> {
    c.session()
        .unwrap()
        .participant(&TokenId::new(token))
        .unwrap()
        .card
        .clone()
}

// =========================================================================
// Start
// =========================================================================

#[tokio::test]
async fn test_start_replicates_to_participants() {
    let world = world();
    let hub = BusHub::new();
    let mut gm = client(&world, &hub, "gm", true, 1);
    let mut p1 = client(&world, &hub, "u1", false, 2);

    gm.start(&[], setups()).unwrap();
    assert!(gm.is_running());

    let applied = drain(&mut p1, 1).await;
    assert_eq!(
        applied[0],
        Applied::Started { actor: "Gamemaster".into() }
    );
    assert!(p1.is_running());
    assert_eq!(p1.session().unwrap().participants().len(), 2);
}

#[tokio::test]
async fn test_start_predraws_identical_card_everywhere() {
    let world = world();
    let hub = BusHub::new();
    let mut gm = client(&world, &hub, "gm", true, 7);
    let mut p1 = client(&world, &hub, "u1", false, 8);

    gm.start(&[], setups()).unwrap();
    drain(&mut p1, 1).await;

    // Knight chose nothing yet; Rogue got a pre-drawn card.
    assert_eq!(card_of(&gm, "t1"), None);
    let drawn = card_of(&gm, "t2").expect("auto participant must have a card");
    assert!(
        ["c1", "c2", "c3"].contains(&drawn.as_str()),
        "drawn card must come from the stack"
    );

    // The receiver got the same card from the start payload; it never
    // rolls its own dice.
    assert_eq!(card_of(&p1, "t2"), Some(drawn));
}

#[tokio::test]
async fn test_start_ignored_by_non_member() {
    let world = world();
    world.add_user("u3", "Carol", true);
    let hub = BusHub::new();
    let mut gm = client(&world, &hub, "gm", true, 1);
    let mut outsider = client(&world, &hub, "u3", false, 2);

    gm.start(&[], setups()).unwrap();

    let applied = drain(&mut outsider, 1).await;
    assert_eq!(applied[0], Applied::Ignored);
    assert!(!outsider.is_running());
}

#[tokio::test]
async fn test_start_requires_authority() {
    let world = world();
    let hub = BusHub::new();
    let mut p1 = client(&world, &hub, "u1", false, 1);

    let result = p1.start(&[], setups());
    assert!(matches!(
        result,
        Err(SimulcardError::AuthorityRequired(_))
    ));
}

#[tokio::test]
async fn test_start_while_running_fails_without_broadcast() {
    let world = world();
    let hub = BusHub::new();
    let mut gm = client(&world, &hub, "gm", true, 1);
    let mut p1 = client(&world, &hub, "u1", false, 2);

    gm.start(&[], setups()).unwrap();
    let result = gm.start(&[], setups());
    assert!(matches!(result, Err(SimulcardError::SessionActive)));

    // Exactly one start ever reached the bus: the existing round on the
    // other clients is untouched.
    let applied = drain(&mut p1, 1).await;
    assert!(matches!(applied[0], Applied::Started { .. }));
    assert!(p1.is_running());
}

#[tokio::test]
async fn test_start_with_no_participants_fails() {
    let world = world();
    let hub = BusHub::new();
    let mut gm = client(&world, &hub, "gm", true, 1);

    let result = gm.start(&[], vec![]);
    assert!(matches!(
        result,
        Err(SimulcardError::Session(SessionError::NoParticipants))
    ));
    assert!(!gm.is_running());
}

#[tokio::test]
async fn test_start_with_no_stacks_fails() {
    let world = MemoryWorld::new();
    world.add_user("gm", "Gamemaster", true);
    world.add_user("u1", "Alice", true);
    world.add_token("t1", "Knight", "knight.webp", "knight.webp");
    world.add_stack("empty", "Empty Deck");

    let hub = BusHub::new();
    let mut gm = client(&world, &hub, "gm", true, 1);

    let result = gm.start(&[], setups());
    assert!(matches!(result, Err(SimulcardError::NoEligibleStacks)));
    assert!(!gm.is_running());
}

#[tokio::test]
async fn test_start_falls_back_to_all_stacks_with_cards() {
    let world = world();
    let hub = BusHub::new();
    let mut gm = client(&world, &hub, "gm", true, 1);

    // The named candidate doesn't exist; the world's real deck is used.
    gm.start(&[StackId::new("no-such-deck")], setups()).unwrap();
    assert!(gm.is_running());
}

// =========================================================================
// Choose / validate
// =========================================================================

#[tokio::test]
async fn test_choose_card_replicates() {
    let world = world();
    let hub = BusHub::new();
    let mut gm = client(&world, &hub, "gm", true, 1);
    let mut p1 = client(&world, &hub, "u1", false, 2);

    gm.start(&[], setups()).unwrap();
    drain(&mut p1, 1).await;

    let changed = p1
        .choose_card(&TokenId::new("t1"), CardId::new("c1"))
        .unwrap();
    assert!(changed);

    let applied = drain(&mut gm, 1).await;
    assert_eq!(
        applied[0],
        Applied::Updated { participant: TokenId::new("t1") }
    );
    assert_eq!(card_of(&gm, "t1"), Some(CardId::new("c1")));
}

#[tokio::test]
async fn test_choose_unknown_card_is_a_resolution_error() {
    let world = world();
    let hub = BusHub::new();
    let mut gm = client(&world, &hub, "gm", true, 1);

    gm.start(&[], setups()).unwrap();
    let result = gm.choose_card(&TokenId::new("t1"), CardId::new("zzz"));
    assert!(matches!(
        result,
        Err(SimulcardError::Host(HostError::UnknownCard { .. }))
    ));
}

#[tokio::test]
async fn test_choose_after_lock_is_a_local_no_op() {
    let world = world();
    let hub = BusHub::new();
    let mut gm = client(&world, &hub, "gm", true, 1);
    let mut p1 = client(&world, &hub, "u1", false, 2);

    gm.start(&[], setups()).unwrap();
    drain(&mut p1, 1).await;

    p1.choose_card(&TokenId::new("t1"), CardId::new("c1")).unwrap();
    drain(&mut gm, 1).await;

    gm.validate().unwrap();
    drain(&mut p1, 1).await;

    // p1 has seen the lock; a further choice changes nothing and sends
    // nothing.
    let changed = p1
        .choose_card(&TokenId::new("t1"), CardId::new("c2"))
        .unwrap();
    assert!(!changed);
    assert_eq!(card_of(&p1, "t1"), Some(CardId::new("c1")));
}

#[tokio::test]
async fn test_update_racing_validate_is_dropped_at_receiver() {
    let world = world();
    let hub = BusHub::new();
    let mut gm = client(&world, &hub, "gm", true, 1);
    let mut p1 = client(&world, &hub, "u1", false, 2);

    gm.start(&[], setups()).unwrap();
    drain(&mut p1, 1).await;

    // The GM locks, but p1 chooses before its client sees the lock.
    // Both actions are legal locally; the transport decides who "wins"
    // at each receiver, and the lock guard keeps the outcome safe.
    gm.validate().unwrap();
    let changed = p1
        .choose_card(&TokenId::new("t1"), CardId::new("c1"))
        .unwrap();
    assert!(changed, "p1 has not seen the lock yet");

    // The GM's copy is locked, so p1's late update bounces off.
    let applied = drain(&mut gm, 1).await;
    assert_eq!(applied[0], Applied::Ignored);
    assert_eq!(card_of(&gm, "t1"), None);
}

// =========================================================================
// Reveal
// =========================================================================

#[tokio::test]
async fn test_reveal_replicates_and_announces() {
    let world = world();
    let hub = BusHub::new();
    let mut gm = client(&world, &hub, "gm", true, 1);
    let mut p1 = client(&world, &hub, "u1", false, 2);

    gm.start(&[], setups()).unwrap();
    drain(&mut p1, 1).await;
    p1.choose_card(&TokenId::new("t1"), CardId::new("c1")).unwrap();
    drain(&mut gm, 1).await;

    assert!(gm.reveal(&TokenId::new("t1")).unwrap());

    let applied = drain(&mut p1, 1).await;
    assert_eq!(
        applied[0],
        Applied::Revealed {
            participant: TokenId::new("t1"),
            actor: "Gamemaster".into(),
        }
    );
    assert!(
        p1.session()
            .unwrap()
            .participant(&TokenId::new("t1"))
            .unwrap()
            .revealed
    );

    // The revealer's client posted the chat announcement; receivers
    // never double-post.
    let announcements = gm.host().announcements();
    assert_eq!(announcements.len(), 1);
    assert_eq!(announcements[0].speaker, "Knight");
    assert_eq!(announcements[0].card, "Ace");
    assert_eq!(announcements[0].whisper_to, None);
    assert!(p1.host().announcements().is_empty());
}

#[tokio::test]
async fn test_reveal_whispers_to_participant_users() {
    let world = world();
    let hub = BusHub::new();
    let mut gm = SessionClient::seeded(
        MemoryHost::new(world.clone(), "gm", true),
        hub.connect(),
        HostSettings {
            whisper_reveals: true,
            ..HostSettings::default()
        },
        1,
    );

    gm.start(&[], setups()).unwrap();
    gm.choose_card(&TokenId::new("t1"), CardId::new("c1")).unwrap();
    gm.reveal(&TokenId::new("t1")).unwrap();

    let announcements = gm.host().announcements();
    assert_eq!(
        announcements[0].whisper_to,
        Some(vec![UserId::new("u1"), UserId::new("u2")])
    );
}

#[tokio::test]
async fn test_reveal_requires_authority() {
    let world = world();
    let hub = BusHub::new();
    let mut gm = client(&world, &hub, "gm", true, 1);
    let mut p1 = client(&world, &hub, "u1", false, 2);

    gm.start(&[], setups()).unwrap();
    drain(&mut p1, 1).await;

    let result = p1.reveal(&TokenId::new("t1"));
    assert!(matches!(
        result,
        Err(SimulcardError::AuthorityRequired(_))
    ));
}

#[tokio::test]
async fn test_duplicate_reveal_delivery_is_idempotent() {
    let world = world();
    let hub = BusHub::new();
    let mut gm = client(&world, &hub, "gm", true, 1);
    let mut p1 = client(&world, &hub, "u1", false, 2);

    gm.start(&[], setups()).unwrap();
    drain(&mut p1, 1).await;

    // Deliver the same reveal twice by hand, as a flaky transport might.
    let reveal = SessionMessage::Reveal {
        participant: TokenId::new("t1"),
        actor: "Gamemaster".into(),
    };
    let first = p1.apply(reveal.clone());
    let second = p1.apply(reveal);

    assert!(matches!(first, Applied::Revealed { .. }));
    assert_eq!(second, Applied::Ignored);
}

#[tokio::test]
async fn test_reveal_all_emits_one_message_per_participant() {
    let world = world();
    let hub = BusHub::new();
    let mut gm = client(&world, &hub, "gm", true, 1);
    let mut p1 = client(&world, &hub, "u1", false, 2);

    gm.start(&[], setups()).unwrap();
    drain(&mut p1, 1).await;
    gm.choose_card(&TokenId::new("t1"), CardId::new("c1")).unwrap();
    drain(&mut p1, 1).await;

    let revealed = gm.reveal_all().unwrap();
    assert_eq!(revealed, 2);
    assert!(gm.session().unwrap().all_revealed());

    let applied = drain(&mut p1, 2).await;
    assert!(applied.iter().all(|a| matches!(a, Applied::Revealed { .. })));
    assert!(p1.session().unwrap().all_revealed());

    // Already revealed: a second sweep does nothing.
    assert_eq!(gm.reveal_all().unwrap(), 0);
}

// =========================================================================
// Restart / close
// =========================================================================

#[tokio::test]
async fn test_restart_clears_and_redraws_identically() {
    let world = world();
    let hub = BusHub::new();
    let mut gm = client(&world, &hub, "gm", true, 1);
    let mut p1 = client(&world, &hub, "u1", false, 2);

    gm.start(&[], setups()).unwrap();
    drain(&mut p1, 1).await;
    p1.choose_card(&TokenId::new("t1"), CardId::new("c1")).unwrap();
    drain(&mut gm, 1).await;
    gm.validate().unwrap();
    gm.reveal_all().unwrap();
    drain(&mut p1, 3).await; // validate + 2 reveals

    gm.restart().unwrap();

    // restart + the auto participant's re-draw update
    let applied = drain(&mut p1, 2).await;
    assert_eq!(
        applied[0],
        Applied::Restarted { actor: "Gamemaster".into() }
    );
    assert_eq!(
        applied[1],
        Applied::Updated { participant: TokenId::new("t2") }
    );

    for c in [&gm, &p1] {
        let session = c.session().unwrap();
        assert!(!session.is_locked());
        assert!(!session.all_revealed());
        assert_eq!(
            session.participant(&TokenId::new("t1")).unwrap().card,
            None,
            "manual choice is cleared"
        );
    }

    // Both copies drew the same fresh card for the Rogue.
    let redrawn = card_of(&gm, "t2").expect("auto re-draw after restart");
    assert_eq!(card_of(&p1, "t2"), Some(redrawn));
}

#[tokio::test]
async fn test_close_tears_down_every_client() {
    let world = world();
    let hub = BusHub::new();
    let mut gm = client(&world, &hub, "gm", true, 1);
    let mut p1 = client(&world, &hub, "u1", false, 2);

    gm.start(&[], setups()).unwrap();
    drain(&mut p1, 1).await;

    gm.close().unwrap();
    assert!(!gm.is_running());

    let applied = drain(&mut p1, 1).await;
    assert_eq!(
        applied[0],
        Applied::Closed { actor: "Gamemaster".into() }
    );
    assert!(!p1.is_running());

    // Nothing left to close.
    assert!(matches!(gm.close(), Err(SimulcardError::NotRunning)));
}

#[tokio::test]
async fn test_late_joiner_ignores_mid_session_traffic() {
    let world = world();
    let hub = BusHub::new();
    let mut gm = client(&world, &hub, "gm", true, 1);

    gm.start(&[], setups()).unwrap();

    // u1's client connects after the start already went out.
    let mut late = client(&world, &hub, "u1", false, 2);
    gm.validate().unwrap();
    gm.reveal(&TokenId::new("t2")).unwrap();

    let applied = drain(&mut late, 2).await;
    assert_eq!(applied, vec![Applied::Ignored, Applied::Ignored]);
    assert!(!late.is_running());
}

// =========================================================================
// A complete round on a single client
// =========================================================================

/// Participants `[Knight(manual), Rogue(auto, 3-card stack)]`:
/// start → choose → validate → blocked choose → restart.
#[tokio::test]
async fn test_full_round_scenario() {
    let world = world();
    let hub = BusHub::new();
    let mut gm = client(&world, &hub, "gm", true, 42);

    gm.start(&[], setups()).unwrap();
    assert_eq!(card_of(&gm, "t1"), None);
    let first_draw = card_of(&gm, "t2").unwrap();

    gm.choose_card(&TokenId::new("t1"), CardId::new("c1")).unwrap();
    assert_eq!(card_of(&gm, "t1"), Some(CardId::new("c1")));

    assert!(gm.validate().unwrap());
    assert!(!gm.validate().unwrap(), "validate is idempotent");

    let changed = gm
        .choose_card(&TokenId::new("t1"), CardId::new("c2"))
        .unwrap();
    assert!(!changed);
    assert_eq!(card_of(&gm, "t1"), Some(CardId::new("c1")));

    gm.restart().unwrap();
    assert_eq!(card_of(&gm, "t1"), None);
    assert!(!gm.session().unwrap().is_locked());
    let second_draw = card_of(&gm, "t2").unwrap();
    assert!(
        ["c1", "c2", "c3"].contains(&second_draw.as_str()),
        "re-draw must come from the stack; first draw was {first_draw}"
    );
}
