use gonogo_engine::Host;
use std::path::PathBuf;
use tracing::info;

/// Standalone stand-in for the survey container: the exported log is written
/// to `<dir>/<field>.json` and "advancing" just hands control back to the
/// display loop so it can shut down.
pub struct FileHost {
    dir: PathBuf,
}

impl FileHost {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl Host for FileHost {
    fn show_task(&mut self) {
        info!("task display shown");
    }

    fn hide_task(&mut self) {
        info!("task display hidden");
    }

    fn set_field(&mut self, name: &str, value: &str) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(format!("{name}.json"));
        std::fs::write(&path, value)?;
        info!(path = %path.display(), bytes = value.len(), "results written");
        Ok(())
    }

    fn advance(&mut self) {
        info!("run complete, handing control back");
    }
}
