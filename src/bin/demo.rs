//! demo - end-to-end synthetic run of the search/align/approach loop
//!
//! Wires the real perception adapter (synthetic camera + scripted detector)
//! to recording stub hardware and runs the controller through a full chase:
//! a few empty sweeps, target acquisition, an alignment that converges, a
//! first approach that falls short, re-acquisition, and a delivery.

use std::sync::atomic::AtomicBool;

use anyhow::Result;
use clap::Parser;

use bottlebot::{
    BoundingBox, CameraConfig, CameraGeometry, CameraPerception, CameraSource, ControlParams,
    Controller, Detection, Outcome, ScriptedBackend, StatusReporter, StubDisplay, StubDrive,
    StubRangeFinder, StubServoPair,
};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Sampled frames without a bottle before one appears.
    #[arg(long, default_value_t = 3)]
    misses: u32,
    /// Frame decimation stride.
    #[arg(long, default_value_t = 3)]
    stride: u32,
    /// Distance reported after the first approach (out of band by default).
    #[arg(long, default_value_t = 50.0)]
    first_distance: f64,
}

fn bottle(height: f32) -> Detection {
    // Keep the box in the lower half so the computed angle is non-zero.
    let y1 = 260.0;
    Detection {
        class_id: 0,
        bbox: BoundingBox::new(100.0, y1, 200.0, y1 + height),
        confidence: 0.9,
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    stage("script detector frames");
    let mut backend = ScriptedBackend::new();
    for _ in 0..args.misses {
        backend.push_empty_frame();
    }
    // Acquisition, then alignment heights that grow and stall.
    backend.push_frame(vec![bottle(60.0)]);
    for height in [70.0, 80.0, 80.0] {
        backend.push_frame(vec![bottle(height)]);
    }
    // Re-acquisition after the short first approach, stalling immediately.
    backend.push_frame(vec![bottle(80.0)]);
    backend.push_frame(vec![bottle(80.0)]);

    stage("wire synthetic camera + stub hardware");
    let mut source = CameraSource::new(CameraConfig::default())?;
    source.connect()?;
    let mut perception = CameraPerception::new(source, Box::new(backend), 0, 0.25, args.stride);

    let mut drive = StubDrive::new();
    let mut servos = StubServoPair::new();
    let mut range = StubRangeFinder::new(20.0);
    range.push_sample(args.first_distance);
    let mut display = StubDisplay::new();
    let mut status = StatusReporter::new(&mut display);

    stage("run controller");
    let interrupt = AtomicBool::new(false);
    let outcome = {
        let mut controller = Controller::new(
            &mut perception,
            &mut drive,
            &mut servos,
            &mut range,
            &mut status,
            CameraGeometry::default(),
            ControlParams::default(),
        );
        controller.run(&interrupt)?
    };
    bottlebot::quiesce(&mut drive, &mut servos, &mut status);

    println!("demo summary:");
    println!("  outcome: {:?}", outcome);
    println!("  frames pulled: {}", perception.frames_pulled());
    println!("  rotations issued: {}", drive.rotations().len());
    println!("  forward pushes: {}", drive.forward_count());
    println!("  gestures: {}", servos.gestures);
    println!("  display lines:");
    for (row, text) in &display.lines {
        println!("    [{}] {}", row, text);
    }

    if outcome != Outcome::Delivered {
        anyhow::bail!("demo run did not deliver");
    }
    Ok(())
}

fn stage(msg: &str) {
    eprintln!("demo: {}", msg);
}
