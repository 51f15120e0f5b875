use serde::{Deserialize, Serialize};

pub const MIN_WPM: u32 = 60;
pub const MAX_WPM: u32 = 1000;
pub const MIN_CHUNK_SIZE: usize = 1;
pub const MAX_CHUNK_SIZE: usize = 10;
pub const DEFAULT_SENTENCE_PAUSE_MS: u64 = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    #[default]
    Single,
    Chunked,
}

impl DisplayMode {
    pub fn label(&self) -> &'static str {
        match self {
            DisplayMode::Single => "single",
            DisplayMode::Chunked => "chunked",
        }
    }
}

/// Reading preferences that drive the playback engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub wpm: u32,
    pub mode: DisplayMode,
    pub chunk_size: usize,
    pub pause_at_sentence_end: bool,
    pub speed_variability: bool,
    pub sentence_pause_ms: u64,
    pub wpm_step: u32,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            wpm: 300,
            mode: DisplayMode::Single,
            chunk_size: 1,
            pause_at_sentence_end: false,
            speed_variability: false,
            sentence_pause_ms: DEFAULT_SENTENCE_PAUSE_MS,
            wpm_step: 50,
        }
    }
}

impl Preferences {
    /// Clamp every field into its valid domain.
    pub fn normalized(mut self) -> Self {
        self.wpm = clamp_wpm(self.wpm);
        self.chunk_size = clamp_chunk_size(self.chunk_size);
        self.wpm_step = self.wpm_step.max(1);
        self
    }

    /// Number of words advanced (and shown) per tick.
    pub fn step(&self) -> usize {
        match self.mode {
            DisplayMode::Single => 1,
            DisplayMode::Chunked => clamp_chunk_size(self.chunk_size),
        }
    }

    pub fn merge(&mut self, patch: &PreferencesPatch) {
        if let Some(wpm) = patch.wpm {
            self.wpm = wpm;
        }
        if let Some(mode) = patch.mode {
            self.mode = mode;
        }
        if let Some(chunk_size) = patch.chunk_size {
            self.chunk_size = chunk_size;
        }
        if let Some(val) = patch.pause_at_sentence_end {
            self.pause_at_sentence_end = val;
        }
        if let Some(val) = patch.speed_variability {
            self.speed_variability = val;
        }
        if let Some(val) = patch.sentence_pause_ms {
            self.sentence_pause_ms = val;
        }
        if let Some(val) = patch.wpm_step {
            self.wpm_step = val;
        }
        *self = self.normalized();
    }
}

pub fn clamp_wpm(wpm: u32) -> u32 {
    wpm.clamp(MIN_WPM, MAX_WPM)
}

pub fn clamp_chunk_size(chunk_size: usize) -> usize {
    chunk_size.clamp(MIN_CHUNK_SIZE, MAX_CHUNK_SIZE)
}

/// Partial preference update; `None` fields are left untouched.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PreferencesPatch {
    pub wpm: Option<u32>,
    pub mode: Option<DisplayMode>,
    pub chunk_size: Option<usize>,
    pub pause_at_sentence_end: Option<bool>,
    pub speed_variability: Option<bool>,
    pub sentence_pause_ms: Option<u64>,
    pub wpm_step: Option<u32>,
}

impl From<Preferences> for PreferencesPatch {
    fn from(prefs: Preferences) -> Self {
        Self {
            wpm: Some(prefs.wpm),
            mode: Some(prefs.mode),
            chunk_size: Some(prefs.chunk_size),
            pause_at_sentence_end: Some(prefs.pause_at_sentence_end),
            speed_variability: Some(prefs.speed_variability),
            sentence_pause_ms: Some(prefs.sentence_pause_ms),
            wpm_step: Some(prefs.wpm_step),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub show_progress_indicator: bool,
    pub show_top_bar: bool,
    pub orp_color: String,
    pub word_color: String,
    pub message_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            show_progress_indicator: true,
            show_top_bar: true,
            orp_color: "#c25b56".to_string(),
            word_color: "#ffffff".to_string(),
            message_timeout_secs: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CfgDefaultKeymaps {
    pub play_pause: String,
    pub restart: String,
    pub add_bookmark: String,
    pub resume_bookmark: String,
    pub faster: String,
    pub slower: String,
    pub toggle_mode: String,
    pub chunk_smaller: String,
    pub chunk_larger: String,
    pub sentence_pause: String,
    pub speed_variability: String,
    pub help: String,
    pub quit: String,
}

impl Default for CfgDefaultKeymaps {
    fn default() -> Self {
        Self {
            play_pause: "p".to_string(),
            restart: "r".to_string(),
            add_bookmark: "b".to_string(),
            resume_bookmark: "B".to_string(),
            faster: "+".to_string(),
            slower: "-".to_string(),
            toggle_mode: "m".to_string(),
            chunk_smaller: "<".to_string(),
            chunk_larger: ">".to_string(),
            sentence_pause: "s".to_string(),
            speed_variability: "v".to_string(),
            help: "?".to_string(),
            quit: "q".to_string(),
        }
    }
}

/// Reader actions reachable from the keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    PlayPause,
    Restart,
    AddBookmark,
    ResumeBookmark,
    Faster,
    Slower,
    ToggleMode,
    ChunkSmaller,
    ChunkLarger,
    SentencePause,
    SpeedVariability,
    Help,
    Quit,
}

impl CfgDefaultKeymaps {
    /// Resolve a typed character to the action bound to it, if any.
    pub fn action_for(&self, ch: char) -> Option<Action> {
        let bindings = [
            (&self.play_pause, Action::PlayPause),
            (&self.restart, Action::Restart),
            (&self.add_bookmark, Action::AddBookmark),
            (&self.resume_bookmark, Action::ResumeBookmark),
            (&self.faster, Action::Faster),
            (&self.slower, Action::Slower),
            (&self.toggle_mode, Action::ToggleMode),
            (&self.chunk_smaller, Action::ChunkSmaller),
            (&self.chunk_larger, Action::ChunkLarger),
            (&self.sentence_pause, Action::SentencePause),
            (&self.speed_variability, Action::SpeedVariability),
            (&self.help, Action::Help),
            (&self.quit, Action::Quit),
        ];
        bindings
            .into_iter()
            .find(|(key, _)| key.chars().count() == 1 && key.starts_with(ch))
            .map(|(_, action)| action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preferences_default() {
        let prefs = Preferences::default();
        assert_eq!(prefs.wpm, 300);
        assert_eq!(prefs.mode, DisplayMode::Single);
        assert_eq!(prefs.chunk_size, 1);
        assert!(!prefs.pause_at_sentence_end);
        assert!(!prefs.speed_variability);
        assert_eq!(prefs.sentence_pause_ms, 500);
        assert_eq!(prefs.step(), 1);
    }

    #[test]
    fn test_preferences_normalized_clamps() {
        let prefs = Preferences {
            wpm: 5000,
            chunk_size: 0,
            wpm_step: 0,
            ..Default::default()
        }
        .normalized();
        assert_eq!(prefs.wpm, MAX_WPM);
        assert_eq!(prefs.chunk_size, MIN_CHUNK_SIZE);
        assert_eq!(prefs.wpm_step, 1);

        let prefs = Preferences {
            wpm: 10,
            chunk_size: 50,
            ..Default::default()
        }
        .normalized();
        assert_eq!(prefs.wpm, MIN_WPM);
        assert_eq!(prefs.chunk_size, MAX_CHUNK_SIZE);
    }

    #[test]
    fn test_step_depends_on_mode() {
        let mut prefs = Preferences {
            chunk_size: 3,
            ..Default::default()
        };
        assert_eq!(prefs.step(), 1);
        prefs.mode = DisplayMode::Chunked;
        assert_eq!(prefs.step(), 3);
    }

    #[test]
    fn test_merge_partial_update() {
        let mut prefs = Preferences::default();
        prefs.merge(&PreferencesPatch {
            wpm: Some(450),
            pause_at_sentence_end: Some(true),
            ..Default::default()
        });
        assert_eq!(prefs.wpm, 450);
        assert!(prefs.pause_at_sentence_end);
        assert_eq!(prefs.mode, DisplayMode::Single);
        assert_eq!(prefs.chunk_size, 1);
    }

    #[test]
    fn test_preferences_deserialize_missing_fields() {
        let prefs: Preferences = serde_json::from_str(r#"{"wpm": 420, "mode": "chunked"}"#).unwrap();
        assert_eq!(prefs.wpm, 420);
        assert_eq!(prefs.mode, DisplayMode::Chunked);
        assert_eq!(prefs.sentence_pause_ms, DEFAULT_SENTENCE_PAUSE_MS);
    }

    #[test]
    fn test_settings_serialization() {
        let settings = Settings::default();
        let serialized = serde_json::to_string(&settings).unwrap();
        let deserialized: Settings = serde_json::from_str(&serialized).unwrap();
        assert_eq!(settings, deserialized);
    }

    #[test]
    fn test_keymap_lookup() {
        let mut keymaps = CfgDefaultKeymaps::default();
        assert_eq!(keymaps.action_for('p'), Some(Action::PlayPause));
        assert_eq!(keymaps.action_for('B'), Some(Action::ResumeBookmark));
        assert_eq!(keymaps.action_for('x'), None);

        keymaps.quit = "Q".to_string();
        assert_eq!(keymaps.action_for('q'), None);
        assert_eq!(keymaps.action_for('Q'), Some(Action::Quit));
    }
}
