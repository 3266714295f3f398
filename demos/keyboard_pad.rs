// Keyboard gamepad: stands in for the operator console during bench testing
//
// WASD drive, J/L rotate, Space fire, E intake, X belt, B aim, Y range,
// R reverse, F boost, Up/Down lift, 1/2/3 disabled/autonomous/teleop, Q quit
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode},
};
use std::time::{Duration, Instant};
use tracing::info;

use mecanum_shooter_runtime::config::{gamepad_topic, TOPIC_PHASE};
use mecanum_shooter_runtime::messages::{GamepadState, Phase};

const INPUT_TIMEOUT_MS: u64 = 150; // Release everything after this much time with no key

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let port: u8 = std::env::args()
        .nth(1)
        .map(|arg| arg.parse())
        .transpose()?
        .unwrap_or(0);

    info!("Opening Zenoh session...");
    let session = zenoh::open(zenoh::Config::default()).await?;
    let pub_pad = session.declare_publisher(gamepad_topic(port)).await?;
    let pub_phase = session.declare_publisher(TOPIC_PHASE).await?;

    info!("Controls: WASD=drive, J/L=rotate, Space=fire, E/X=intake/belt, B/Y=aim/range");
    info!("R=reverse, F=boost, Up/Down=lift, 1/2/3=disabled/auton/teleop, Q=quit");

    enable_raw_mode()?;
    let result = run_pad(&pub_pad, &pub_phase).await;
    disable_raw_mode()?;

    result
}

async fn run_pad(
    pub_pad: &zenoh::pubsub::Publisher<'_>,
    pub_phase: &zenoh::pubsub::Publisher<'_>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let mut pad = GamepadState::neutral();
    let mut last_input = Instant::now();

    loop {
        // Poll for key with 20ms timeout (50Hz effective rate)
        if event::poll(Duration::from_millis(20))? {
            if let Event::Key(KeyEvent { code, kind, .. }) = event::read()? {
                let pressed = kind == KeyEventKind::Press || kind == KeyEventKind::Repeat;
                if !pressed {
                    continue;
                }

                let mut phase = None;
                match code {
                    KeyCode::Char('w') => pad.left_y = -1.0,
                    KeyCode::Char('s') => pad.left_y = 1.0,
                    KeyCode::Char('a') => pad.left_x = -1.0,
                    KeyCode::Char('d') => pad.left_x = 1.0,
                    KeyCode::Char('j') => pad.right_x = -1.0,
                    KeyCode::Char('l') => pad.right_x = 1.0,
                    KeyCode::Char(' ') => pad.right_trigger = 1.0,
                    KeyCode::Char('e') => pad.a = true,
                    KeyCode::Char('x') => pad.x = true,
                    KeyCode::Char('b') => pad.b = true,
                    KeyCode::Char('y') => pad.y = true,
                    KeyCode::Char('r') => pad.left_bumper = true,
                    KeyCode::Char('f') => pad.right_bumper = true,
                    KeyCode::Up => pad.pov = 0,
                    KeyCode::Down => pad.pov = 180,

                    KeyCode::Char('1') => phase = Some(Phase::Disabled),
                    KeyCode::Char('2') => phase = Some(Phase::Autonomous),
                    KeyCode::Char('3') => phase = Some(Phase::Teleop),

                    // Quit
                    KeyCode::Char('q') | KeyCode::Esc => break,

                    _ => {}
                }

                match phase {
                    Some(phase) => {
                        info!("Phase: {:?}", phase);
                        pub_phase.put(serde_json::to_string(&phase)?).await?;
                    }
                    None => last_input = Instant::now(),
                }
            }
        }

        // Terminals only report key presses, so a quiet keyboard means hands off
        if last_input.elapsed() > Duration::from_millis(INPUT_TIMEOUT_MS) {
            pad = GamepadState::neutral();
        }

        // Always publish at ~50Hz
        pub_pad.put(serde_json::to_string(&pad)?).await?;
    }

    Ok(())
}
