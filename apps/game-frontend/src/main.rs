#![deny(warnings)]

//! Headless HUD shell: the session lives in one ECS resource and player
//! intents reach it only through the pending-command queue.

use bevy_ecs::prelude::*;
use estate_core::{GameConfig, PropertyId};
use estate_engine::{Command, Session, SessionState};
use rust_decimal::Decimal;

const CLASSIC: &str = include_str!("../../../assets/scenarios/classic.yaml");

#[derive(Resource)]
struct GameSession(Session);

/// Commands collected from input since the last frame, in arrival order.
#[derive(Resource, Default)]
struct PendingCommands(Vec<Command>);

#[derive(Resource, Default)]
struct HudState {
    turn: u32,
    cash: Decimal,
    net_worth: Decimal,
    holdings: usize,
    status: String,
    last_event: String,
}

fn apply_commands_system(
    mut session: ResMut<GameSession>,
    mut queue: ResMut<PendingCommands>,
    mut hud: ResMut<HudState>,
) {
    for cmd in queue.0.drain(..) {
        hud.last_event = match session.0.execute(cmd) {
            Ok(outcome) => format!("{outcome:?}"),
            Err(e) => format!("rejected: {e}"),
        };
    }
}

fn refresh_hud_system(session: Res<GameSession>, mut hud: ResMut<HudState>) {
    let snap = session.0.snapshot();
    hud.turn = snap.turn;
    hud.cash = snap.cash;
    hud.net_worth = snap.net_worth;
    hud.holdings = snap.holdings.len();
    hud.status = match snap.state {
        SessionState::Active => "active".into(),
        SessionState::Ended(reason) => format!("ended: {reason:?}"),
    };
}

fn build_world(session: Session) -> (World, Schedule) {
    let mut world = World::new();
    world.insert_resource(GameSession(session));
    world.insert_resource(PendingCommands::default());
    world.insert_resource(HudState::default());
    let mut schedule = Schedule::default();
    schedule.add_systems((apply_commands_system, refresh_hud_system).chain());
    (world, schedule)
}

fn main() -> anyhow::Result<()> {
    let cfg = GameConfig::from_yaml_str(CLASSIC)?;
    let (mut world, mut schedule) = build_world(Session::new(&cfg)?);
    // No run loop: headless demo of one purchase and one month.
    world.resource_mut::<PendingCommands>().0.extend([
        Command::Buy(PropertyId::new("maple-duplex")),
        Command::AdvanceTick,
    ]);
    schedule.run(&mut world);
    let s = world.resource::<HudState>();
    println!(
        "game-frontend: HUD ready | turn={} cash=${} net worth=${} holdings={} status={} last={}",
        s.turn, s.cash, s.net_worth, s.holdings, s.status, s.last_event
    );
    Ok(())
}
