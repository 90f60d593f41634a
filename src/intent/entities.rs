//! Fixed phrase tables that turn loose wording into canonical entity values.
//! Table order matters: the first hit wins, so longer phrases come first.

use serde::{Deserialize, Serialize};

use super::types::{Entity, EntityKind, IntentKind};

const PACKAGE_PHRASES: &[(&str, &str)] = &[
    // browsers
    ("internet browser", "firefox"),
    ("web browser", "firefox"),
    ("browser", "firefox"),
    ("chrome", "google-chrome"),
    // editors
    ("that coding thing", "vscode"),
    ("that programming thing", "vscode"),
    ("that coding program", "vscode"),
    ("programming editor", "vscode"),
    ("programming thing", "vscode"),
    ("coding program", "vscode"),
    ("code editor", "vscode"),
    ("visual studio", "vscode"),
    ("vs code", "vscode"),
    ("text editor", "neovim"),
    // communication
    ("email client", "thunderbird"),
    ("email", "thunderbird"),
    ("mail", "thunderbird"),
    ("video chat", "zoom"),
    ("video call", "zoom"),
    ("chat", "discord"),
    // media
    ("music player", "spotify"),
    ("music", "spotify"),
    ("video player", "vlc"),
    ("movie player", "vlc"),
    ("photo editor", "gimp"),
    ("image editor", "gimp"),
    // office
    ("word processor", "libreoffice"),
    ("spreadsheet", "libreoffice"),
    ("office", "libreoffice"),
    // development
    ("python", "python3"),
    ("node", "nodejs"),
    // utilities
    ("calculator", "gnome-calculator"),
    ("terminal", "alacritty"),
    ("file manager", "nautilus"),
];

const TASK_PACKAGES: &[(&str, &str)] = &[
    ("browse", "firefox"),
    ("internet", "firefox"),
    ("code", "vscode"),
    ("program", "vscode"),
    ("develop", "vscode"),
    ("email", "thunderbird"),
    ("music", "spotify"),
    ("video", "vlc"),
    ("movie", "vlc"),
    ("photo", "gimp"),
    ("image", "gimp"),
    ("document", "libreoffice"),
    ("write", "libreoffice"),
    ("calculate", "gnome-calculator"),
    ("terminal", "alacritty"),
];

const SERVICE_NAMES: &[(&str, &str)] = &[
    ("wifi", "NetworkManager"),
    ("network", "NetworkManager"),
    ("internet", "NetworkManager"),
    ("sound", "pipewire"),
    ("audio", "pipewire"),
    ("bluetooth", "bluetooth"),
    ("docker", "docker"),
    ("ssh", "sshd"),
    ("web server", "nginx"),
    ("nginx", "nginx"),
    ("apache", "httpd"),
    ("database", "postgresql"),
    ("postgres", "postgresql"),
    ("mysql", "mysql"),
];

const TRAILING_FILLER: &[&str] = &[" please", " pls", " plz", " for me", " now"];

const LEADING_ARTICLES: &[&str] = &["a ", "an ", "the ", "some ", "my "];

/// Resolve a free-form package phrase to a package id.
/// Exact table match, then contained phrase, then the cleaned word itself.
/// Multi-word leftovers are not guessed at.
pub fn normalize_package_name(input: &str) -> Option<String> {
    let mut phrase = input.trim().to_lowercase();
    for filler in TRAILING_FILLER {
        if let Some(stripped) = phrase.strip_suffix(filler) {
            phrase = stripped.trim_end().to_string();
        }
    }
    for article in LEADING_ARTICLES {
        if let Some(stripped) = phrase.strip_prefix(article) {
            phrase = stripped.trim_start().to_string();
        }
    }
    if phrase.is_empty() {
        return None;
    }

    if let Some((_, pkg)) = PACKAGE_PHRASES.iter().find(|(key, _)| *key == phrase) {
        return Some(pkg.to_string());
    }
    if let Some((_, pkg)) = PACKAGE_PHRASES.iter().find(|(key, _)| contains_phrase(&phrase, key)) {
        return Some(pkg.to_string());
    }

    if phrase.split_whitespace().count() > 1 {
        return None;
    }
    let cleaned: String = phrase
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-')
        .collect();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

/// "i need to edit photos" -> gimp
pub fn infer_package_from_task(task: &str) -> Option<String> {
    let task = task.to_lowercase();
    TASK_PACKAGES
        .iter()
        .find(|(key, _)| task.contains(key))
        .map(|(_, pkg)| pkg.to_string())
}

/// Map a spoken service name to its unit name. Unmapped names keep only
/// characters valid in a systemd unit name.
pub fn normalize_service_name(input: &str) -> Option<String> {
    let name = input.trim().to_lowercase();
    let name = name
        .strip_prefix("the ")
        .or_else(|| name.strip_prefix("my "))
        .unwrap_or(&name)
        .trim();
    if let Some((_, unit)) = SERVICE_NAMES.iter().find(|(key, _)| *key == name) {
        return Some(unit.to_string());
    }
    let cleaned: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '@'))
        .collect();
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceAction {
    Status,
    Start,
    Stop,
    Restart,
    Enable,
    Disable,
}

impl ServiceAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceAction::Status => "status",
            ServiceAction::Start => "start",
            ServiceAction::Stop => "stop",
            ServiceAction::Restart => "restart",
            ServiceAction::Enable => "enable",
            ServiceAction::Disable => "disable",
        }
    }

    /// Unknown or missing actions fall back to a status check.
    pub fn parse(s: &str) -> Self {
        match s {
            "start" => ServiceAction::Start,
            "stop" => ServiceAction::Stop,
            "restart" => ServiceAction::Restart,
            "enable" => ServiceAction::Enable,
            "disable" => ServiceAction::Disable,
            _ => ServiceAction::Status,
        }
    }

    /// Read the action off the leading verb of a normalized request.
    pub fn from_request(text: &str) -> Self {
        const VERBS: &[(&str, ServiceAction)] = &[
            ("restart ", ServiceAction::Restart),
            ("start ", ServiceAction::Start),
            ("turn on ", ServiceAction::Start),
            ("launch ", ServiceAction::Start),
            ("stop ", ServiceAction::Stop),
            ("turn off ", ServiceAction::Stop),
            ("kill ", ServiceAction::Stop),
            ("enable ", ServiceAction::Enable),
            ("disable ", ServiceAction::Disable),
        ];
        VERBS
            .iter()
            .find(|(verb, _)| text.starts_with(verb))
            .map(|(_, action)| *action)
            .unwrap_or(ServiceAction::Status)
    }

    pub fn needs_sudo(&self) -> bool {
        !matches!(self, ServiceAction::Status)
    }

    pub fn needs_confirmation(&self) -> bool {
        matches!(
            self,
            ServiceAction::Stop | ServiceAction::Restart | ServiceAction::Disable
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProblemCategory {
    Network,
    Audio,
    Display,
    Print,
    Bluetooth,
    Performance,
    General,
}

impl ProblemCategory {
    const KEYWORDS: &'static [(ProblemCategory, &'static [&'static str])] = &[
        (
            ProblemCategory::Network,
            &["internet", "wifi", "network", "connection", "connect", "online", "ethernet"],
        ),
        (
            ProblemCategory::Audio,
            &["sound", "audio", "speaker", "headphone", "music", "hear", "volume"],
        ),
        (
            ProblemCategory::Display,
            &["screen", "display", "monitor", "resolution", "graphics", "see", "visual"],
        ),
        (ProblemCategory::Print, &["print", "printer", "printing"]),
        (ProblemCategory::Bluetooth, &["bluetooth", "wireless", "airpods"]),
        (
            ProblemCategory::Performance,
            &["slow", "lag", "freeze", "frozen", "stuck", "performance"],
        ),
    ];

    pub fn identify(description: &str) -> Self {
        let description = description.to_lowercase();
        Self::KEYWORDS
            .iter()
            .find(|(_, words)| words.iter().any(|w| description.contains(w)))
            .map(|(category, _)| *category)
            .unwrap_or(ProblemCategory::General)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProblemCategory::Network => "network",
            ProblemCategory::Audio => "audio",
            ProblemCategory::Display => "display",
            ProblemCategory::Print => "print",
            ProblemCategory::Bluetooth => "bluetooth",
            ProblemCategory::Performance => "performance",
            ProblemCategory::General => "general",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "network" => ProblemCategory::Network,
            "audio" => ProblemCategory::Audio,
            "display" => ProblemCategory::Display,
            "print" => ProblemCategory::Print,
            "bluetooth" => ProblemCategory::Bluetooth,
            "performance" => ProblemCategory::Performance,
            _ => ProblemCategory::General,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SettingCategory {
    FontSize,
    Volume,
    Brightness,
    Theme,
    Wallpaper,
    Mouse,
    Keyboard,
    General,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Increase,
    Decrease,
}

impl Direction {
    fn from_text(text: &str) -> Option<Self> {
        const UP: &[&str] = &["bigger", "larger", "increase", "raise", "boost", "louder", "brighter"];
        const DOWN: &[&str] = &["smaller", "decrease", "lower", "reduce", "quieter", "darker"];
        if UP.iter().any(|w| contains_word(text, w)) {
            Some(Direction::Increase)
        } else if DOWN.iter().any(|w| contains_word(text, w)) {
            Some(Direction::Decrease)
        } else {
            None
        }
    }
}

/// A resolved setting target. Only font size has a directional form today.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Setting {
    pub category: SettingCategory,
    pub direction: Option<Direction>,
}

impl Setting {
    const KEYWORDS: &'static [(SettingCategory, &'static [&'static str])] = &[
        (
            SettingCategory::FontSize,
            &["text", "font", "bigger", "larger", "smaller", "size", "read", "see"],
        ),
        (
            SettingCategory::Volume,
            &["sound", "audio", "louder", "quieter", "volume", "hear"],
        ),
        (SettingCategory::Brightness, &["bright", "dark", "dim", "light", "screen"]),
        (
            SettingCategory::Theme,
            &["theme", "color", "appearance", "dark mode", "light mode"],
        ),
        (SettingCategory::Wallpaper, &["wallpaper", "background", "desktop"]),
        (SettingCategory::Mouse, &["mouse", "cursor", "pointer", "click"]),
        (SettingCategory::Keyboard, &["keyboard", "typing", "keys"]),
    ];

    pub fn identify(description: &str) -> Self {
        let description = description.to_lowercase();
        let category = Self::KEYWORDS
            .iter()
            .find(|(_, words)| words.iter().any(|w| description.contains(w)))
            .map(|(category, _)| *category)
            .unwrap_or(SettingCategory::General);
        Self {
            category,
            direction: Direction::from_text(&description),
        }
    }

    pub fn as_value(&self) -> &'static str {
        match (self.category, self.direction) {
            (SettingCategory::FontSize, Some(Direction::Increase)) => "font-size-increase",
            (SettingCategory::FontSize, Some(Direction::Decrease)) => "font-size-decrease",
            (SettingCategory::FontSize, None) => "font-size",
            (SettingCategory::Volume, _) => "volume",
            (SettingCategory::Brightness, _) => "brightness",
            (SettingCategory::Theme, _) => "theme",
            (SettingCategory::Wallpaper, _) => "wallpaper",
            (SettingCategory::Mouse, _) => "mouse",
            (SettingCategory::Keyboard, _) => "keyboard",
            (SettingCategory::General, _) => "general",
        }
    }
}

/// Entities for a kind chosen without a rule capture (statistical path).
pub fn entities_for_kind(kind: IntentKind, text: &str) -> Vec<Entity> {
    match kind {
        IntentKind::Install | IntentKind::Remove => {
            const LEADS: &[&str] = &[
                "install ", "i need ", "i want ", "get me ", "download ", "remove ", "uninstall ",
            ];
            let rest = LEADS
                .iter()
                .find_map(|lead| text.strip_prefix(lead))
                .unwrap_or(text);
            normalize_package_name(rest)
                .map(|pkg| vec![Entity::new(EntityKind::Package, pkg, 0.7)])
                .unwrap_or_default()
        }
        IntentKind::Query => {
            if text.contains("installed") {
                vec![Entity::new(EntityKind::Package, "all", 0.9)]
            } else {
                Vec::new()
            }
        }
        IntentKind::Troubleshoot => match ProblemCategory::identify(text) {
            ProblemCategory::General => Vec::new(),
            category => vec![Entity::new(EntityKind::Problem, category.as_str(), 0.9)],
        },
        IntentKind::Config => {
            let setting = Setting::identify(text);
            if setting.category == SettingCategory::General {
                Vec::new()
            } else {
                vec![Entity::new(EntityKind::Setting, setting.as_value(), 0.8)]
            }
        }
        IntentKind::Service
        | IntentKind::Update
        | IntentKind::Maintenance
        | IntentKind::Logs
        | IntentKind::Unknown => Vec::new(),
    }
}

fn contains_word(text: &str, word: &str) -> bool {
    text.split_whitespace().any(|w| w == word)
}

/// Phrase containment on word boundaries, so "node" does not hit "anode".
fn contains_phrase(text: &str, phrase: &str) -> bool {
    let padded = format!(" {} ", text);
    padded.contains(&format!(" {} ", phrase))
}
