use std::path::Path;

use anyhow::Result;
use paddle_core::TrackerSettings;

pub fn init_settings(path: &Path) -> Result<()> {
    TrackerSettings::default().store(path)?;
    println!("Wrote default settings to {}", path.display());
    Ok(())
}
