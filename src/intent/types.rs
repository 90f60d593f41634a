use serde::{Deserialize, Serialize};

/// Confidence assigned to `Unknown` when nothing else clears the bar.
pub const UNKNOWN_CONFIDENCE: f32 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentKind {
    Install,
    Remove,
    Update,
    Query,
    Service,
    Maintenance,
    Logs,
    Troubleshoot,
    Config,
    Unknown,
}

impl IntentKind {
    pub const ALL: [IntentKind; 10] = [
        IntentKind::Install,
        IntentKind::Remove,
        IntentKind::Update,
        IntentKind::Query,
        IntentKind::Service,
        IntentKind::Maintenance,
        IntentKind::Logs,
        IntentKind::Troubleshoot,
        IntentKind::Config,
        IntentKind::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            IntentKind::Install => "install",
            IntentKind::Remove => "remove",
            IntentKind::Update => "update",
            IntentKind::Query => "query",
            IntentKind::Service => "service",
            IntentKind::Maintenance => "maintenance",
            IntentKind::Logs => "logs",
            IntentKind::Troubleshoot => "troubleshoot",
            IntentKind::Config => "config",
            IntentKind::Unknown => "unknown",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim().to_lowercase();
        IntentKind::ALL.into_iter().find(|k| k.as_str() == s)
    }

    /// Short human label used when asking the user to pick between readings.
    pub fn label(&self) -> &'static str {
        match self {
            IntentKind::Install => "Install a program",
            IntentKind::Remove => "Remove a program",
            IntentKind::Update => "Update your system",
            IntentKind::Query => "See what's installed",
            IntentKind::Service => "Manage a background service",
            IntentKind::Maintenance => "Free up disk space",
            IntentKind::Logs => "Look at system logs",
            IntentKind::Troubleshoot => "Fix a problem",
            IntentKind::Config => "Change a setting",
            IntentKind::Unknown => "Something else",
        }
    }

    pub fn example(&self) -> &'static str {
        match self {
            IntentKind::Install => "install firefox",
            IntentKind::Remove => "remove firefox",
            IntentKind::Update => "update my system",
            IntentKind::Query => "show installed programs",
            IntentKind::Service => "restart docker",
            IntentKind::Maintenance => "free up space",
            IntentKind::Logs => "show recent errors",
            IntentKind::Troubleshoot => "my internet isn't working",
            IntentKind::Config => "make the text bigger",
            IntentKind::Unknown => "help",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Package,
    Service,
    Setting,
    Problem,
    Action,
    Timeframe,
    LogType,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Package => "package",
            EntityKind::Service => "service",
            EntityKind::Setting => "setting",
            EntityKind::Problem => "problem",
            EntityKind::Action => "action",
            EntityKind::Timeframe => "timeframe",
            EntityKind::LogType => "log_type",
        }
    }

    /// The entity a correction for this intent kind is expected to carry.
    pub fn primary_for(kind: IntentKind) -> Option<EntityKind> {
        match kind {
            IntentKind::Install | IntentKind::Remove => Some(EntityKind::Package),
            IntentKind::Service => Some(EntityKind::Service),
            IntentKind::Troubleshoot => Some(EntityKind::Problem),
            IntentKind::Config => Some(EntityKind::Setting),
            IntentKind::Maintenance => Some(EntityKind::Action),
            IntentKind::Logs => Some(EntityKind::LogType),
            IntentKind::Update | IntentKind::Query | IntentKind::Unknown => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub kind: EntityKind,
    pub value: String,
    pub confidence: f32, // 0.0 - 1.0
}

impl Entity {
    pub fn new(kind: EntityKind, value: impl Into<String>, confidence: f32) -> Self {
        Self {
            kind,
            value: value.into(),
            confidence: clamp_confidence(confidence),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    pub kind: IntentKind,
    pub confidence: f32,
    pub entities: Vec<Entity>,
    pub original_text: String,
    /// Competing readings kept when the recognizer could not commit.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub alternatives: Vec<Intent>,
}

impl Intent {
    pub fn new(kind: IntentKind, confidence: f32, entities: Vec<Entity>, original_text: &str) -> Self {
        Self {
            kind,
            confidence: clamp_confidence(confidence),
            entities,
            original_text: original_text.to_string(),
            alternatives: Vec::new(),
        }
    }

    pub fn unknown(original_text: &str) -> Self {
        Self::new(IntentKind::Unknown, UNKNOWN_CONFIDENCE, Vec::new(), original_text)
    }

    pub fn with_alternatives(mut self, alternatives: Vec<Intent>) -> Self {
        self.alternatives = alternatives;
        self
    }

    /// First entity of the given kind.
    pub fn entity(&self, kind: EntityKind) -> Option<&str> {
        self.entities
            .iter()
            .find(|e| e.kind == kind)
            .map(|e| e.value.as_str())
    }

    pub fn is_unknown(&self) -> bool {
        self.kind == IntentKind::Unknown
    }
}

pub fn clamp_confidence(c: f32) -> f32 {
    if c.is_nan() {
        return 0.0;
    }
    c.clamp(0.0, 1.0)
}
