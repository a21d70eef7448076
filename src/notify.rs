use crate::alerts::AlertTrigger;
use log::{debug, warn};
use std::path::PathBuf;
use std::process::Command;

/// Renders fired alerts: a console line plus an optional sound. Both are
/// best-effort and never propagate failures into the polling loop.
#[derive(Debug, Clone, Default)]
pub struct Notifier {
    sound_path: Option<PathBuf>,
}

impl Notifier {
    pub fn new(sound_path: Option<PathBuf>) -> Self {
        Self { sound_path }
    }

    pub fn notify(&self, trigger: &AlertTrigger) {
        println!(
            "[ALERT] {} = ${:.2} (crossed ${:.2})",
            trigger.symbol, trigger.price, trigger.threshold
        );
        self.play_sound();
    }

    fn play_sound(&self) {
        let path = match &self.sound_path {
            Some(path) => path,
            None => return,
        };
        if !path.exists() {
            debug!("Alert sound {} not found, skipping playback", path.display());
            return;
        }
        if let Err(err) = Command::new("aplay").arg("-q").arg(path).spawn() {
            warn!("Failed to play alert sound: {}", err);
        }
    }
}
