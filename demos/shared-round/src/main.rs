//! A complete round across three simulated clients.
//!
//! One GM and two players share a world and a bus, exactly as three
//! browsers connected to the same host would. The GM starts a session,
//! Alice's client picks a card when it sees the start, Bob's participant
//! draws automatically, and the GM locks, reveals, and closes. Run with
//! `RUST_LOG=debug` to watch every replication message land.

use simulcard::prelude::*;

// ---------------------------------------------------------------------------
// World setup
// ---------------------------------------------------------------------------

fn build_world() -> MemoryWorld {
    let world = MemoryWorld::new();
    world.add_user("gm", "Gamemaster", true);
    world.add_user("alice", "Alice", true);
    world.add_user("bob", "Bob", true);
    world.add_token("knight", "Knight", "knight.webp", "knight-portrait.webp");
    world.add_token("rogue", "Rogue", "rogue.webp", "rogue-portrait.webp");
    world.add_stack("initiative", "Initiative Deck");

    let deck = StackId::new("initiative");
    for (id, name) in [
        ("ace", "Ace of Swords"),
        ("two", "Two of Swords"),
        ("three", "Three of Swords"),
        ("four", "Four of Swords"),
    ] {
        world.add_card(&deck, id, name, format!("{id}.webp"));
    }
    world
}

fn participants() -> Vec<ParticipantSetup> {
    vec![
        ParticipantSetup::new(
            TokenId::new("knight"),
            UserId::new("alice"),
            StackId::new("initiative"),
        ),
        ParticipantSetup::new(
            TokenId::new("rogue"),
            UserId::new("bob"),
            StackId::new("initiative"),
        )
        .auto(),
    ]
}

// ---------------------------------------------------------------------------
// Player client
// ---------------------------------------------------------------------------

type Client = SessionClient<MemoryHost, ChannelBus>;

/// Pumps one player's client until the session closes, picking a card
/// for every manual participant this player controls.
async fn run_player(mut client: Client, player: &'static str) {
    loop {
        match client.next_applied().await {
            Ok(Some(Applied::Started { actor })) => {
                tracing::info!(player, gm = %actor, "session started");
                choose_own_cards(&mut client, player);
            }
            Ok(Some(Applied::Updated { participant })) => {
                tracing::info!(player, %participant, "participant updated");
            }
            Ok(Some(Applied::Validated { .. })) => {
                tracing::info!(player, "choices are locked");
            }
            Ok(Some(Applied::Revealed { participant, .. })) => {
                tracing::info!(player, %participant, "card revealed");
            }
            Ok(Some(Applied::Restarted { .. })) => {
                tracing::info!(player, "round restarted");
            }
            Ok(Some(Applied::Closed { .. })) => {
                tracing::info!(player, "session closed, goodbye");
                break;
            }
            Ok(Some(Applied::Ignored)) => {}
            Ok(None) => break,
            Err(e) => {
                tracing::error!(player, error = %e, "client error");
                break;
            }
        }
    }
}

/// Picks the first available card for each of this player's own manual
/// participants.
fn choose_own_cards(client: &mut Client, player: &'static str) {
    let me = client.host().user_id();
    let picks: Vec<(TokenId, CardId)> = match client.session() {
        Some(session) => session
            .participants()
            .iter()
            .filter(|p| p.is_owned_by(&me) && !p.auto && p.card.is_none())
            .filter_map(|p| {
                let stack = client.host().stack(&p.stack).ok()?;
                let card = stack.available_cards(true).next()?.id.clone();
                Some((p.token.clone(), card))
            })
            .collect(),
        None => Vec::new(),
    };

    for (token, card) in picks {
        match client.choose_card(&token, card.clone()) {
            Ok(true) => {
                tracing::info!(player, %token, %card, "picked a card")
            }
            Ok(false) => {}
            Err(e) => tracing::warn!(player, error = %e, "pick failed"),
        }
    }
}

// ---------------------------------------------------------------------------
// Main: the GM drives the round
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let world = build_world();
    let hub = BusHub::new();

    let mut gm = SessionClient::new(
        MemoryHost::new(world.clone(), "gm", true),
        hub.connect(),
        HostSettings::default(),
    );
    let alice = SessionClient::new(
        MemoryHost::new(world.clone(), "alice", false),
        hub.connect(),
        HostSettings::default(),
    );
    let bob = SessionClient::new(
        MemoryHost::new(world.clone(), "bob", false),
        hub.connect(),
        HostSettings::default(),
    );

    let alice_task = tokio::spawn(run_player(alice, "alice"));
    let bob_task = tokio::spawn(run_player(bob, "bob"));

    gm.start(&[StackId::new("initiative")], participants())?;

    // Pump the GM's own inbound side until every participant has chosen.
    while !gm.session().is_some_and(Session::all_chosen) {
        if gm.next_applied().await?.is_none() {
            return Ok(());
        }
    }

    gm.validate()?;
    gm.reveal_all()?;

    let view = gm.view()?;
    for p in &view.participants {
        let card = p.card.as_ref().map_or("nothing", |c| c.name.as_str());
        tracing::info!(
            participant = %p.name,
            user = %p.user_name,
            card,
            "final reveal"
        );
    }

    gm.close()?;

    alice_task.await?;
    bob_task.await?;
    Ok(())
}
