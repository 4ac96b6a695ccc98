//! User configuration: key bindings and explorer settings.
//!
//! Stored as a simple key-value text file at
//! `$XDG_CONFIG_HOME/md-explorer/config.toml` (default
//! `~/.config/md-explorer/config.toml`).  Unknown keys are ignored and a
//! missing file means defaults.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::workspace::DEFAULT_HISTORY_LIMIT;

// ───────────────────────────────────────── actions ───────────

/// All configurable user actions in the explorer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    MoveUp,
    MoveDown,
    ExtendUp,
    ExtendDown,
    Expand,
    Collapse,
    Open,
    ToggleSelect,
    Rename,
    Delete,
    NewFile,
    NewFolder,
    Cut,
    Copy,
    Paste,
    ReorderUp,
    ReorderDown,
    SaveFile,
    CloseTab,
    NextTab,
    SaveWorkspace,
    Workspaces,
    Refresh,
    CycleSort,
    ShowControls,
    Quit,
}

impl Action {
    /// Ordered list of all actions (used for the controls menu).
    pub const ALL: &[Action] = &[
        Action::MoveUp,
        Action::MoveDown,
        Action::ExtendUp,
        Action::ExtendDown,
        Action::Expand,
        Action::Collapse,
        Action::Open,
        Action::ToggleSelect,
        Action::Rename,
        Action::Delete,
        Action::NewFile,
        Action::NewFolder,
        Action::Cut,
        Action::Copy,
        Action::Paste,
        Action::ReorderUp,
        Action::ReorderDown,
        Action::SaveFile,
        Action::CloseTab,
        Action::NextTab,
        Action::SaveWorkspace,
        Action::Workspaces,
        Action::Refresh,
        Action::CycleSort,
        Action::ShowControls,
        Action::Quit,
    ];

    /// Human-readable label and config-file key.
    fn names(self) -> (&'static str, &'static str) {
        match self {
            Action::MoveUp => ("Move Up", "move_up"),
            Action::MoveDown => ("Move Down", "move_down"),
            Action::ExtendUp => ("Extend Selection Up", "extend_up"),
            Action::ExtendDown => ("Extend Selection Down", "extend_down"),
            Action::Expand => ("Expand", "expand"),
            Action::Collapse => ("Collapse / Parent", "collapse"),
            Action::Open => ("Open File", "open"),
            Action::ToggleSelect => ("Toggle Selection", "toggle_select"),
            Action::Rename => ("Rename", "rename"),
            Action::Delete => ("Delete", "delete"),
            Action::NewFile => ("New File", "new_file"),
            Action::NewFolder => ("New Folder", "new_folder"),
            Action::Cut => ("Cut", "cut"),
            Action::Copy => ("Copy", "copy"),
            Action::Paste => ("Paste Into Folder", "paste"),
            Action::ReorderUp => ("Move Item Up", "reorder_up"),
            Action::ReorderDown => ("Move Item Down", "reorder_down"),
            Action::SaveFile => ("Save File", "save_file"),
            Action::CloseTab => ("Close Tab", "close_tab"),
            Action::NextTab => ("Next Tab", "next_tab"),
            Action::SaveWorkspace => ("Save Workspace", "save_workspace"),
            Action::Workspaces => ("Workspaces", "workspaces"),
            Action::Refresh => ("Refresh", "refresh"),
            Action::CycleSort => ("Cycle Sort", "cycle_sort"),
            Action::ShowControls => ("Controls", "show_controls"),
            Action::Quit => ("Quit", "quit"),
        }
    }

    pub fn label(self) -> &'static str {
        self.names().0
    }

    fn config_key(self) -> &'static str {
        self.names().1
    }

    fn from_config_key(s: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|a| a.config_key() == s)
    }
}

// ───────────────────────────────────────── key bind ──────────

/// A single key binding: key code plus modifiers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyBind {
    pub code: KeyCode,
    pub modifiers: KeyModifiers,
}

const MODIFIER_MASK: KeyModifiers = KeyModifiers::CONTROL
    .union(KeyModifiers::ALT)
    .union(KeyModifiers::SHIFT);

/// Special keys as `(code, display, config name)`.
const NAMED_KEYS: &[(KeyCode, &str, &str)] = &[
    (KeyCode::Char(' '), "Space", "Space"),
    (KeyCode::Up, "↑", "Up"),
    (KeyCode::Down, "↓", "Down"),
    (KeyCode::Left, "←", "Left"),
    (KeyCode::Right, "→", "Right"),
    (KeyCode::Enter, "Enter", "Enter"),
    (KeyCode::Esc, "Esc", "Esc"),
    (KeyCode::Tab, "Tab", "Tab"),
    (KeyCode::Backspace, "Bksp", "Backspace"),
    (KeyCode::Delete, "Del", "Delete"),
    (KeyCode::Home, "Home", "Home"),
    (KeyCode::End, "End", "End"),
    (KeyCode::PageUp, "PgUp", "PageUp"),
    (KeyCode::PageDown, "PgDn", "PageDown"),
];

impl KeyBind {
    pub fn new(code: KeyCode, modifiers: KeyModifiers) -> Self {
        Self { code, modifiers }
    }

    /// Only CTRL/ALT/SHIFT are compared.  Uppercase characters match with
    /// or without an explicit SHIFT, since terminals disagree on reporting it.
    pub fn matches(&self, event: KeyEvent) -> bool {
        if self.code != event.code {
            return false;
        }
        let mut theirs = event.modifiers & MODIFIER_MASK;
        if matches!(event.code, KeyCode::Char(c) if c.is_ascii_uppercase()) {
            theirs.remove(KeyModifiers::SHIFT);
        }
        let mut ours = self.modifiers & MODIFIER_MASK;
        if matches!(self.code, KeyCode::Char(c) if c.is_ascii_uppercase()) {
            ours.remove(KeyModifiers::SHIFT);
        }
        ours == theirs
    }

    /// Create a binding from a raw key event (used during rebinding).
    pub fn from_key_event(event: KeyEvent) -> Self {
        Self::new(event.code, event.modifiers & MODIFIER_MASK)
    }

    /// User-facing form, e.g. `"Alt+↑"`, `"Ctrl+s"`, `"q"`.
    pub fn display(&self) -> String {
        self.render(true)
    }

    /// Config-file form, e.g. `"Alt+Up"`.
    fn to_config_string(&self) -> String {
        self.render(false)
    }

    fn render(&self, pretty: bool) -> String {
        let mut s = String::new();
        for (flag, name) in [
            (KeyModifiers::CONTROL, "Ctrl+"),
            (KeyModifiers::ALT, "Alt+"),
            (KeyModifiers::SHIFT, "Shift+"),
        ] {
            if self.modifiers.contains(flag) {
                s.push_str(name);
            }
        }
        match NAMED_KEYS.iter().find(|(code, _, _)| *code == self.code) {
            Some((_, shown, written)) => s.push_str(if pretty { shown } else { written }),
            None => match self.code {
                KeyCode::Char(c) => s.push(c),
                KeyCode::F(n) => s.push_str(&format!("F{n}")),
                other => s.push_str(&format!("{other:?}")),
            },
        }
        s
    }

    /// Parse `"Ctrl+s"`, `"Alt+Up"`, `"q"`, `"F2"`.
    fn parse(s: &str) -> Option<Self> {
        let (mods, key) = match s.rfind('+') {
            // A lone "+" (or trailing "Ctrl++") binds the plus key itself.
            Some(i) if i + 1 == s.len() => (&s[..i.saturating_sub(1)], "+"),
            Some(i) => (&s[..i], &s[i + 1..]),
            None => ("", s),
        };

        let mut modifiers = KeyModifiers::NONE;
        for part in mods.split('+').filter(|p| !p.is_empty()) {
            modifiers |= match part.to_ascii_lowercase().as_str() {
                "ctrl" => KeyModifiers::CONTROL,
                "alt" => KeyModifiers::ALT,
                "shift" => KeyModifiers::SHIFT,
                _ => return None,
            };
        }

        let lower = key.to_ascii_lowercase();
        let code = match lower.as_str() {
            "return" => KeyCode::Enter,
            "escape" => KeyCode::Esc,
            "bksp" => KeyCode::Backspace,
            "del" => KeyCode::Delete,
            "pgup" => KeyCode::PageUp,
            "pgdn" => KeyCode::PageDown,
            _ => {
                if let Some((code, _, _)) = NAMED_KEYS
                    .iter()
                    .find(|(_, _, written)| written.eq_ignore_ascii_case(key))
                {
                    *code
                } else if lower.len() > 1 && lower.starts_with('f') {
                    KeyCode::F(lower[1..].parse().ok()?)
                } else {
                    let mut chars = key.chars();
                    let c = chars.next()?;
                    if chars.next().is_some() {
                        return None;
                    }
                    KeyCode::Char(c)
                }
            }
        };
        Some(Self::new(code, modifiers))
    }
}

// ───────────────────────────────────────── config ────────────

pub const DEFAULT_DOUBLE_CLICK_MS: u64 = 300;

/// Application configuration: key bindings and explorer settings.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bindings: HashMap<Action, Vec<KeyBind>>,
    /// Include dot files when scanning roots.
    pub show_hidden: bool,
    /// Skip paths matched by `.gitignore` when scanning roots.
    pub respect_gitignore: bool,
    /// Cap on the recent-file list.
    pub history_limit: usize,
    /// Override for the session state file location.
    pub state_file: Option<PathBuf>,
    /// Window for a repeated click on the same row.
    pub double_click_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bindings: Self::default_bindings(),
            show_hidden: false,
            respect_gitignore: true,
            history_limit: DEFAULT_HISTORY_LIMIT,
            state_file: None,
            double_click_ms: DEFAULT_DOUBLE_CLICK_MS,
        }
    }
}

impl AppConfig {
    pub fn default_bindings() -> HashMap<Action, Vec<KeyBind>> {
        use Action::*;
        use KeyCode::*;
        let n = KeyModifiers::NONE;
        let alt = KeyModifiers::ALT;
        let shift = KeyModifiers::SHIFT;
        let ctrl = KeyModifiers::CONTROL;
        let mut m = HashMap::new();

        m.insert(MoveUp, vec![KeyBind::new(Up, n), KeyBind::new(Char('k'), n)]);
        m.insert(MoveDown, vec![KeyBind::new(Down, n), KeyBind::new(Char('j'), n)]);
        m.insert(ExtendUp, vec![KeyBind::new(Up, shift), KeyBind::new(Char('K'), n)]);
        m.insert(ExtendDown, vec![KeyBind::new(Down, shift), KeyBind::new(Char('J'), n)]);
        m.insert(Expand, vec![KeyBind::new(Right, n), KeyBind::new(Char('l'), n)]);
        m.insert(Collapse, vec![KeyBind::new(Left, n), KeyBind::new(Char('h'), n)]);
        m.insert(Open, vec![KeyBind::new(Enter, n)]);
        m.insert(ToggleSelect, vec![KeyBind::new(Char(' '), n)]);
        m.insert(Rename, vec![KeyBind::new(F(2), n), KeyBind::new(Char('r'), n)]);
        m.insert(Action::Delete, vec![KeyBind::new(KeyCode::Delete, n), KeyBind::new(Char('d'), n)]);
        m.insert(NewFile, vec![KeyBind::new(Char('n'), n)]);
        m.insert(NewFolder, vec![KeyBind::new(Char('N'), n)]);
        m.insert(Cut, vec![KeyBind::new(Char('x'), n)]);
        m.insert(Copy, vec![KeyBind::new(Char('y'), n)]);
        m.insert(Paste, vec![KeyBind::new(Char('p'), n)]);
        m.insert(ReorderUp, vec![KeyBind::new(Up, alt)]);
        m.insert(ReorderDown, vec![KeyBind::new(Down, alt)]);
        m.insert(SaveFile, vec![KeyBind::new(Char('s'), ctrl)]);
        m.insert(CloseTab, vec![KeyBind::new(Char('w'), n)]);
        m.insert(NextTab, vec![KeyBind::new(Tab, n)]);
        m.insert(SaveWorkspace, vec![KeyBind::new(Char('S'), n)]);
        m.insert(Workspaces, vec![KeyBind::new(Char('W'), n)]);
        m.insert(Refresh, vec![KeyBind::new(F(5), n), KeyBind::new(Char('R'), n)]);
        m.insert(CycleSort, vec![KeyBind::new(Char('o'), n)]);
        m.insert(ShowControls, vec![KeyBind::new(Char('?'), n)]);
        m.insert(Quit, vec![KeyBind::new(Char('q'), n)]);

        m
    }

    /// The action bound to `event`.  On overlap the binding with more
    /// modifiers wins.
    pub fn match_key(&self, event: KeyEvent) -> Option<Action> {
        self.bindings
            .iter()
            .flat_map(|(&action, binds)| binds.iter().map(move |b| (action, b)))
            .filter(|(_, bind)| bind.matches(event))
            .max_by_key(|(action, bind)| {
                let index = Action::ALL.iter().position(|a| a == action);
                (bind.modifiers.bits().count_ones(), std::cmp::Reverse(index))
            })
            .map(|(action, _)| action)
    }

    /// Bind `bind` to `action`, taking it away from any other action.
    pub fn add_binding(&mut self, action: Action, bind: KeyBind) {
        for binds in self.bindings.values_mut() {
            binds.retain(|b| b != &bind);
        }
        self.bindings.entry(action).or_default().push(bind);
    }

    pub fn reset_defaults(&mut self) {
        self.bindings = Self::default_bindings();
    }

    /// Every binding of `action`, e.g. `"↑/k"`.
    pub fn display_bindings(&self, action: Action) -> String {
        match self.bindings.get(&action) {
            Some(binds) if !binds.is_empty() => {
                binds.iter().map(KeyBind::display).collect::<Vec<_>>().join("/")
            }
            _ => "unbound".into(),
        }
    }

    fn short_binding(&self, action: Action) -> String {
        self.bindings
            .get(&action)
            .and_then(|binds| binds.first())
            .map_or_else(|| "?".into(), KeyBind::display)
    }

    pub fn status_bar_hint(&self) -> String {
        format!(
            "{}: open | {}: rename | {}: delete | {}: new | {}/{}: cut/paste | {}: workspaces | {}: keys",
            self.short_binding(Action::Open),
            self.short_binding(Action::Rename),
            self.short_binding(Action::Delete),
            self.short_binding(Action::NewFile),
            self.short_binding(Action::Cut),
            self.short_binding(Action::Paste),
            self.short_binding(Action::Workspaces),
            self.short_binding(Action::ShowControls),
        )
    }

    // ── persistence ─────────────────────────────────────────────

    /// Load from the default location, falling back to defaults.
    pub fn load() -> Self {
        Self::load_from(&config_path())
    }

    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => Self::parse_config(&contents),
            Err(_) => Self::default(),
        }
    }

    pub fn save(&self) -> anyhow::Result<()> {
        self.save_to(&config_path())
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.serialise())?;
        Ok(())
    }

    fn parse_config(s: &str) -> Self {
        let mut config = Self::default();

        for line in s.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with('[') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let key = key.trim();
            let value = value.trim();

            match key {
                "show_hidden" => config.show_hidden = value == "true",
                "respect_gitignore" => config.respect_gitignore = value == "true",
                "history_limit" => {
                    if let Ok(v) = value.parse::<usize>() {
                        config.history_limit = v.min(500);
                    }
                }
                "state_file" => {
                    let value = value.trim_matches('"');
                    config.state_file = (!value.is_empty()).then(|| PathBuf::from(value));
                }
                "double_click_ms" => {
                    if let Ok(v) = value.parse::<u64>() {
                        config.double_click_ms = v.clamp(100, 2000);
                    }
                }
                _ => {
                    let Some(action) = Action::from_config_key(key) else {
                        continue;
                    };
                    let parsed: Vec<KeyBind> = value
                        .split(',')
                        .filter_map(|part| KeyBind::parse(part.trim().trim_matches('"')))
                        .collect();
                    if !parsed.is_empty() {
                        config.bindings.insert(action, parsed);
                    }
                }
            }
        }

        config
    }

    fn serialise(&self) -> String {
        let mut lines = vec![
            "# md-explorer configuration".to_string(),
            String::new(),
            "# Explorer settings".to_string(),
            format!("show_hidden = {}", self.show_hidden),
            format!("respect_gitignore = {}", self.respect_gitignore),
            format!("history_limit = {}", self.history_limit),
            format!("double_click_ms = {}", self.double_click_ms),
        ];
        if let Some(path) = &self.state_file {
            lines.push(format!("state_file = \"{}\"", path.display()));
        }
        lines.extend([
            String::new(),
            "# Key bindings".to_string(),
            "# Format: action = Key1, Key2, ...".to_string(),
            "# Modifiers: Ctrl+, Alt+, Shift+ (prefix)".to_string(),
            "# Special keys: Up, Down, Left, Right, Enter, Esc, Tab,".to_string(),
            "#   Backspace, Delete, Home, End, PageUp, PageDown, Space, F1-F12".to_string(),
            String::new(),
        ]);

        for &action in Action::ALL {
            if let Some(binds) = self.bindings.get(&action) {
                let keys: Vec<String> = binds.iter().map(KeyBind::to_config_string).collect();
                lines.push(format!("{} = {}", action.config_key(), keys.join(", ")));
            }
        }
        lines.push(String::new());
        lines.join("\n")
    }
}

/// `$XDG_CONFIG_HOME/md-explorer/config.toml`.
fn config_path() -> PathBuf {
    let config_dir = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".into());
            PathBuf::from(home).join(".config")
        });
    config_dir.join("md-explorer").join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn parses_modifiers_and_named_keys() {
        assert_eq!(
            KeyBind::parse("Alt+Up"),
            Some(KeyBind::new(KeyCode::Up, KeyModifiers::ALT))
        );
        assert_eq!(
            KeyBind::parse("ctrl+s"),
            Some(KeyBind::new(KeyCode::Char('s'), KeyModifiers::CONTROL))
        );
        assert_eq!(KeyBind::parse("F2"), Some(KeyBind::new(KeyCode::F(2), KeyModifiers::NONE)));
        assert_eq!(
            KeyBind::parse("+"),
            Some(KeyBind::new(KeyCode::Char('+'), KeyModifiers::NONE))
        );
        assert_eq!(KeyBind::parse("Hyper+x"), None);
        assert_eq!(KeyBind::parse("xy"), None);
    }

    #[test]
    fn uppercase_matches_with_or_without_shift() {
        let config = AppConfig::default();
        let plain = key(KeyCode::Char('N'), KeyModifiers::NONE);
        let shifted = key(KeyCode::Char('N'), KeyModifiers::SHIFT);
        assert_eq!(config.match_key(plain), Some(Action::NewFolder));
        assert_eq!(config.match_key(shifted), Some(Action::NewFolder));
        assert_eq!(
            config.match_key(key(KeyCode::Up, KeyModifiers::ALT)),
            Some(Action::ReorderUp)
        );
    }

    #[test]
    fn file_round_trip_keeps_settings_and_bindings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = AppConfig::default();
        config.show_hidden = true;
        config.history_limit = 5;
        config.state_file = Some(PathBuf::from("/tmp/state.json"));
        config.add_binding(Action::Rename, KeyBind::new(KeyCode::Char('m'), KeyModifiers::ALT));
        config.save_to(&path).unwrap();

        let back = AppConfig::load_from(&path);
        assert!(back.show_hidden);
        assert!(back.respect_gitignore);
        assert_eq!(back.history_limit, 5);
        assert_eq!(back.state_file, config.state_file);
        assert_eq!(back.bindings.get(&Action::Rename), config.bindings.get(&Action::Rename));
    }

    #[test]
    fn unknown_keys_and_missing_file_fall_back() {
        let config = AppConfig::parse_config("frobnicate = 3\nquit = \nhistory_limit = lots");
        assert_eq!(config.history_limit, DEFAULT_HISTORY_LIMIT);
        assert_eq!(config.display_bindings(Action::Quit), "q");

        let missing = AppConfig::load_from(Path::new("/definitely/not/here.toml"));
        assert!(!missing.show_hidden);
    }

    #[test]
    fn rebinding_steals_the_key() {
        let mut config = AppConfig::default();
        config.add_binding(Action::Quit, KeyBind::new(KeyCode::Char('d'), KeyModifiers::NONE));
        assert_eq!(
            config.match_key(key(KeyCode::Char('d'), KeyModifiers::NONE)),
            Some(Action::Quit)
        );
        assert_eq!(config.display_bindings(Action::Delete), "Del");
    }
}
