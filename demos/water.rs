//! Water
//!
//! This demo walks a body of water through freezing, melting and boiling.
//!
//! Key concepts:
//! - Temperature derives the phase (Solid / Liquid / Gas)
//! - Entering a phase rescales the volume through a state hook
//! - A forbidden jump (Gas straight to Solid) is rolled back completely
//!
//! Run with: cargo run --example water
//! Set `RUST_LOG=cascade=debug` to watch the cascade.

use cascade::water::{self, freeze, warm};
use cascade::{Entity, Error};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(env_filter)
        .init();
}

fn dump(step: &str, water: &Entity) {
    println!("--- {step}");
    println!("{water}\n");
}

fn main() -> Result<(), Error> {
    init_tracing();

    let machine = water::machine()?;
    let mut water = water::water(machine)?;
    dump("initial", &water);

    freeze(&mut water, 15.0)?;
    dump("freeze 15", &water);

    freeze(&mut water, 15.0)?;
    dump("freeze 15", &water);

    warm(&mut water, 20.0)?;
    dump("warm 20", &water);

    warm(&mut water, 100.0)?;
    dump("warm 100", &water);

    // Gas cannot turn into Solid directly; the whole write is undone.
    match freeze(&mut water, 150.0) {
        Ok(()) => dump("freeze 150", &water),
        Err(err) => {
            println!("--- freeze 150 rejected: {err}");
            dump("after rollback", &water);
            freeze(&mut water, 80.0)?;
            dump("freeze 80", &water);
        }
    }

    println!("Phases visited:");
    for id in water.history().get_path() {
        println!("  {}", water.machine()[id]);
    }

    Ok(())
}
