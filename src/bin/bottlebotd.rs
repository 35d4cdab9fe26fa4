//! bottlebotd - bottle retrieval control daemon
//!
//! This daemon:
//! 1. Loads configuration (file + env) and the class label list
//! 2. Connects the camera source and detector backend
//! 3. Claims the actuators, range finder, and status display
//! 4. Runs the search/align/approach controller to completion
//! 5. Unconditionally quiesces the hardware on every exit path

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};

use bottlebot::{
    detect, hw, BotConfig, CameraPerception, CameraSource, Controller, LabelMap, Outcome,
    StatusReporter,
};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cfg = BotConfig::load()?;
    log::info!(
        "bottlebotd {} starting, camera={} target={}",
        env!("CARGO_PKG_VERSION"),
        cfg.camera.device,
        cfg.detector.target_label
    );

    let interrupt = Arc::new(AtomicBool::new(false));
    {
        let flag = Arc::clone(&interrupt);
        ctrlc::set_handler(move || {
            flag.store(true, Ordering::SeqCst);
        })
        .context("install interrupt handler")?;
    }

    // Label list is loaded once at startup; a model whose labels do not
    // contain the target is a configuration error, caught before the robot
    // moves.
    let labels = if cfg.detector.labels_path.is_empty() {
        log::warn!("no label list configured, assuming single-class model");
        LabelMap::from_names([cfg.detector.target_label.clone()])
    } else {
        LabelMap::load(&cfg.detector.labels_path)?
    };
    let target_class = labels.require(&cfg.detector.target_label)?;

    let detector = detect::backend_from_config(&cfg.detector, &cfg.camera)?;
    let mut source = CameraSource::new(cfg.camera.source_config())?;
    source.connect()?;

    let mut perception = CameraPerception::new(
        source,
        detector,
        target_class,
        cfg.detector.min_confidence,
        cfg.control.sample_stride,
    );
    perception.warm_up()?;

    let mut rig = hw::rig_from_config(&cfg)?;
    let mut display = hw::display_from_config(&cfg)?;
    let mut status = StatusReporter::new(display.as_mut());

    let outcome = {
        let mut controller = Controller::new(
            &mut perception,
            rig.drive.as_mut(),
            rig.servos.as_mut(),
            rig.range.as_mut(),
            &mut status,
            cfg.camera.geometry(),
            cfg.control.params(),
        );
        controller.run(&interrupt)
    };

    // Unconditional cleanup: runs after delivery, interrupt, and hardware
    // fault alike, before any error propagates.
    bottlebot::quiesce(rig.drive.as_mut(), rig.servos.as_mut(), &mut status);

    match outcome? {
        Outcome::Delivered => log::info!("bottle delivered, shutting down"),
        Outcome::Interrupted => log::info!("terminated by operator"),
    }
    Ok(())
}
