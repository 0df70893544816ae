//! Tower Crash headless demo
//!
//! Runs the deterministic core against the ballistic physics stand-in with a
//! scripted pointer: periodic center-screen presses (throws when they land on
//! a target, silent no-ops otherwise) and short drags in between. Events are
//! logged as they drain. Usage: `tower-crash [seed] [frames]`.

use glam::Vec2;

use tower_crash::physics::BallisticWorld;
use tower_crash::sim::{FrameInput, GameEvent, GamePhase, GameSession};
use tower_crash::Tuning;

const DT: f32 = 1.0 / 60.0;

fn main() {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let seed: u64 = args
        .next()
        .and_then(|a| a.parse().ok())
        .unwrap_or(0xC0FFEE);
    let frames: u32 = args.next().and_then(|a| a.parse().ok()).unwrap_or(7200);

    let tuning = Tuning::load_or_default("tuning.json");
    let mut world = BallisticWorld::new();
    let mut session = GameSession::new(seed, tuning, &mut world);
    log::info!("running {frames} frames at {:.1} Hz", 1.0 / DT);

    for frame in 0..frames {
        let input = script(&session, frame);
        session.update(&mut world, &input, DT);

        for event in session.drain_events() {
            match event {
                GameEvent::PhaseChanged { phase } => {
                    log::info!("frame {frame}: phase -> {phase:?}")
                }
                GameEvent::TowerAdvanced { index } => {
                    log::info!("frame {frame}: advanced to tower {index}")
                }
                other => log::debug!("frame {frame}: {other:?}"),
            }
        }
    }

    log::info!(
        "done: phase {:?}, tower {}, {} blocks standing, {} throws left",
        session.phase,
        session.tower_index,
        session.tower.blocks.live_count(),
        session.ball.remaining,
    );
}

/// Scripted pointer: a press aimed just above screen center every second,
/// with a slow rightward drag through the half-second after each press
fn script(session: &GameSession, frame: u32) -> FrameInput {
    if session.phase != GamePhase::Play {
        return FrameInput::default();
    }

    let beat = frame % 60;
    match beat {
        0 => FrameInput {
            pointer_pressed: true,
            pointer: Vec2::new(0.0, 0.2),
            ..Default::default()
        },
        1..30 => FrameInput {
            pointer: Vec2::new(beat as f32 * 0.01, 0.2),
            ..Default::default()
        },
        30 => FrameInput {
            pointer_released: true,
            pointer: Vec2::new(0.3, 0.2),
            ..Default::default()
        },
        _ => FrameInput::default(),
    }
}
