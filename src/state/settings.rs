use crate::dao::models::{Category, Record, SettingsState};

impl Default for SettingsState {
    fn default() -> Self {
        Self {
            music_volume: 1.0,
            sfx_volume: 1.0,
            music_enabled: true,
            sfx_enabled: true,
            vibration_enabled: true,
            notifications_enabled: true,
        }
    }
}

impl Record for SettingsState {
    const CATEGORY: Category = Category::Settings;

    fn normalize(&mut self) {
        self.music_volume = clamp_volume(self.music_volume);
        self.sfx_volume = clamp_volume(self.sfx_volume);
    }
}

impl SettingsState {
    /// Music volume in `[0, 1]`.
    pub fn music_volume(&self) -> f32 {
        self.music_volume
    }

    /// Effects volume in `[0, 1]`.
    pub fn sfx_volume(&self) -> f32 {
        self.sfx_volume
    }

    /// Whether music plays.
    pub fn music_enabled(&self) -> bool {
        self.music_enabled
    }

    /// Whether sound effects play.
    pub fn sfx_enabled(&self) -> bool {
        self.sfx_enabled
    }

    /// Whether haptics are on.
    pub fn vibration_enabled(&self) -> bool {
        self.vibration_enabled
    }

    /// Whether reminders are scheduled.
    pub fn notifications_enabled(&self) -> bool {
        self.notifications_enabled
    }

    /// Set the music volume, clamped to `[0, 1]`.
    pub fn set_music_volume(&mut self, volume: f32) {
        self.music_volume = clamp_volume(volume);
    }

    /// Set the sound effects volume, clamped to `[0, 1]`.
    pub fn set_sfx_volume(&mut self, volume: f32) {
        self.sfx_volume = clamp_volume(volume);
    }

    /// Toggle music.
    pub fn set_music_enabled(&mut self, enabled: bool) {
        self.music_enabled = enabled;
    }

    /// Toggle sound effects.
    pub fn set_sfx_enabled(&mut self, enabled: bool) {
        self.sfx_enabled = enabled;
    }

    /// Toggle vibration.
    pub fn set_vibration_enabled(&mut self, enabled: bool) {
        self.vibration_enabled = enabled;
    }

    /// Toggle notifications.
    pub fn set_notifications_enabled(&mut self, enabled: bool) {
        self.notifications_enabled = enabled;
    }
}

fn clamp_volume(volume: f32) -> f32 {
    if volume.is_nan() {
        return 0.0;
    }
    volume.clamp(0.0, 1.0)
}
