use std::{
    io::{self, Write},
    path::{Path, PathBuf},
};

use anyhow::{bail, Context, Result};
use paddle_core::{BallSighting, TrackerSettings};
use paddle_world::{BallTracker, FrameReport, PaddleTarget};
use serde::Serialize;

use super::load_frame;

const FRAME_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp"];

/// Distance of the default paddle line from the bottom of the frame, in pixels.
const PADDLE_OFFSET: f64 = 80.0;

#[derive(Debug, Clone)]
pub struct TrackArgs {
    pub frames: PathBuf,
    pub paddle_y: Option<f64>,
    pub mirror: bool,
    pub json: bool,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TrackSummary {
    pub frames: usize,
    pub measured: usize,
    pub recovered: usize,
    pub predicted: usize,
    pub missed: usize,
    pub intersections: usize,
}

#[derive(Serialize)]
struct FrameRecord<'a> {
    index: usize,
    file: String,
    #[serde(flatten)]
    report: &'a FrameReport,
}

pub fn track(settings: &TrackerSettings, args: &TrackArgs) -> Result<TrackSummary> {
    let stdout = io::stdout();
    let summary = track_to(settings, args, &mut stdout.lock())?;
    log::info!(
        "Tracked {} frames: {} measured, {} recovered, {} predicted, {} without ball",
        summary.frames,
        summary.measured,
        summary.recovered,
        summary.predicted,
        summary.missed
    );
    Ok(summary)
}

fn track_to(
    settings: &TrackerSettings,
    args: &TrackArgs,
    out: &mut impl Write,
) -> Result<TrackSummary> {
    let paths = frame_paths(&args.frames)?;
    let mut tracker = BallTracker::new(settings);
    let mut summary = TrackSummary::default();

    for (index, path) in paths.iter().enumerate() {
        let frame = load_frame(path, args.mirror)?;
        let paddle_y = args
            .paddle_y
            .unwrap_or(frame.height() as f64 - PADDLE_OFFSET);
        let report = tracker.process(&frame, paddle_y);

        summary.frames += 1;
        match report.sighting {
            Some(BallSighting::Measured(_)) => summary.measured += 1,
            Some(BallSighting::Recovered(_)) => summary.recovered += 1,
            Some(BallSighting::Predicted(_)) => summary.predicted += 1,
            None => summary.missed += 1,
        }
        if report.intersection.is_some() {
            summary.intersections += 1;
        }

        let file = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        if args.json {
            let record = FrameRecord {
                index,
                file,
                report: &report,
            };
            serde_json::to_writer(&mut *out, &record)?;
            writeln!(out)?;
        } else {
            writeln!(out, "{:>5} {:<24} {}", index, file, describe(&report))?;
        }
    }

    Ok(summary)
}

/// Image files in `dir`, sorted by name.
fn frame_paths(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read frame directory {}", dir.display()))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<io::Result<Vec<_>>>()?;
    paths.retain(|path| {
        path.is_file()
            && path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| FRAME_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
    });
    paths.sort();

    if paths.is_empty() {
        bail!("No frames found in {}", dir.display());
    }
    Ok(paths)
}

fn describe(report: &FrameReport) -> String {
    let Some(sighting) = report.sighting else {
        return "no ball".to_string();
    };

    let d = sighting.detection();
    let mut line = format!("{:<9} ({}, {}) r={}", sighting.kind(), d.x, d.y, d.radius);
    if let Some(hit) = report.intersection {
        line.push_str(&format!("  hit x={} in {:.1}", hit.x, hit.time_to_intersect));
    }
    match report.target {
        Some(PaddleTarget::Intercept(x)) => line.push_str(&format!("  -> intercept {}", x)),
        Some(PaddleTarget::Follow(x)) => line.push_str(&format!("  -> follow {}", x)),
        None => {}
    }
    line
}
