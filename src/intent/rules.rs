//! Ordered regex rule table. Text arrives already normalized (lower-case,
//! no `?!.,`, single spaces), so patterns are written lower-case.

use regex::{Captures, Regex};
use std::sync::LazyLock;
use tracing::warn;

use super::entities::{
    infer_package_from_task, normalize_package_name, normalize_service_name, ProblemCategory,
    ServiceAction, Setting, SettingCategory,
};
use super::types::{Entity, EntityKind, Intent, IntentKind};

/// Fixed confidence of any rule hit.
pub const RULE_CONFIDENCE: f32 = 0.95;

/// How a rule turns its captures into entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extractor {
    Package,
    TaskPackage,
    Service,
    GarbageCollection,
    Logs,
    Problem,
    Setting,
    Nothing,
}

impl Extractor {
    fn extract(&self, caps: &Captures, text: &str) -> Vec<Entity> {
        let subject = caps.get(1).map(|m| m.as_str()).unwrap_or(text);
        match self {
            Extractor::Package => normalize_package_name(subject)
                .map(|pkg| vec![Entity::new(EntityKind::Package, pkg, 0.9)])
                .unwrap_or_default(),
            Extractor::TaskPackage => infer_package_from_task(subject)
                .map(|pkg| vec![Entity::new(EntityKind::Package, pkg, 0.8)])
                .unwrap_or_default(),
            Extractor::Service => {
                let action = ServiceAction::from_request(text);
                let mut entities = Vec::new();
                if let Some(svc) = normalize_service_name(subject) {
                    entities.push(Entity::new(EntityKind::Service, svc, 0.85));
                }
                entities.push(Entity::new(EntityKind::Action, action.as_str(), 0.9));
                entities
            }
            Extractor::GarbageCollection => {
                vec![Entity::new(EntityKind::Action, "garbage-collection", 0.95)]
            }
            Extractor::Logs => {
                let mut entities = Vec::new();
                if ["recent", "latest", "last"].iter().any(|w| text.contains(w)) {
                    entities.push(Entity::new(EntityKind::Timeframe, "recent", 0.9));
                }
                if text.contains("error") {
                    entities.push(Entity::new(EntityKind::LogType, "errors", 0.9));
                }
                entities
            }
            Extractor::Problem => {
                // Fall back to the whole sentence when the capture is too narrow.
                let mut category = ProblemCategory::identify(subject);
                if category == ProblemCategory::General {
                    category = ProblemCategory::identify(text);
                }
                vec![Entity::new(EntityKind::Problem, category.as_str(), 0.9)]
            }
            Extractor::Setting => {
                let setting = Setting::identify(text);
                let confidence = if setting.category == SettingCategory::General {
                    0.5
                } else {
                    0.9
                };
                vec![Entity::new(EntityKind::Setting, setting.as_value(), confidence)]
            }
            Extractor::Nothing => Vec::new(),
        }
    }
}

pub struct IntentRule {
    pub kind: IntentKind,
    pub patterns: Vec<Regex>,
    pub extractor: Extractor,
}

impl IntentRule {
    fn new(kind: IntentKind, extractor: Extractor, sources: &[&str]) -> Self {
        let patterns = sources
            .iter()
            .filter_map(|src| match Regex::new(src) {
                Ok(re) => Some(re),
                Err(e) => {
                    warn!("Dropping invalid {:?} rule pattern: {}", kind, e);
                    None
                }
            })
            .collect();
        Self {
            kind,
            patterns,
            extractor,
        }
    }
}

/// Groups are tried top to bottom. Narrow groups sit above the broad ones
/// that would otherwise swallow them ("remove old packages" before remove,
/// "get updates" before install, "show logs" before service status,
/// "help me change the wallpaper" before troubleshooting).
pub static RULES: LazyLock<Vec<IntentRule>> = LazyLock::new(|| {
    vec![
        IntentRule::new(
            IntentKind::Maintenance,
            Extractor::GarbageCollection,
            &[
                r"^(?:free up|clean up|clear) (?:some )?(?:disk )?space$",
                r"^(?:clean|cleanup|clean up|garbage collect|gc)(?: the)?(?: system| up)?$",
                r"^(?:remove|delete) (?:old|unused) (?:packages|stuff|files|generations)$",
            ],
        ),
        IntentRule::new(
            IntentKind::Remove,
            Extractor::Package,
            &[
                r"^(?:please |can you |could you )?(?:remove|uninstall|delete|get rid of|take off) (.+)$",
                r"^(?:i )?(?:don't|dont|do not) (?:need|want) (.+?) (?:anymore|any more)$",
            ],
        ),
        IntentRule::new(
            IntentKind::Update,
            Extractor::Nothing,
            &[
                r"^(?:please |can you )?(?:update|upgrade|refresh)(?: (?:my |the )?(?:system|computer|machine|everything|all))?$",
                r"^(?:check for|look for|find)(?: system| any)? updates?$",
                r"^(?:get|install) (?:the )?(?:latest|updates|upgrades)$",
                r"^(?:is|are) (?:there |my system |everything )?(?:any )?(?:updates?|up(?:-| )to(?:-| )date)$",
                r"^(?:make sure|ensure) (?:everything is|i'm|im|my system is|system is) (?:current|updated|up(?:-| )to(?:-| )date)$",
                r"^(?:make|get) everything (?:current|up to date|updated)$",
            ],
        ),
        IntentRule::new(
            IntentKind::Install,
            Extractor::TaskPackage,
            &[r"^(?:i )?(?:need|want) (?:to|a way to) (.+)$"],
        ),
        IntentRule::new(
            IntentKind::Install,
            Extractor::Package,
            &[
                r"^(?:i )?(?:need|want|would like|gotta have|require|must have)(?: a| an| the)? (.+)$",
                r"^(?:can you |please |could you )?(?:install|get|download|add|setup|set up|put)(?: me)? (.+?)(?: for me)?$",
                r"^(?:give me|i'd like|id like|lemme have) (.+)$",
                r"^(.+?) (?:is missing|not installed|isn't installed|isnt installed)$",
            ],
        ),
        IntentRule::new(
            IntentKind::Query,
            Extractor::Nothing,
            &[
                r"^(?:what's|whats|what is|show|list) (?:installed|on (?:here|this|my computer))$",
                r"^(?:show|list|display)(?: me)?(?: all| the)? (?:installed |my )?(?:programs?|apps?|software|packages?)$",
                r"^what (?:do i have|packages|programs)(?: installed)?$",
                r"^(?:what|which)(?: programs?| apps?| software)? (?:do i have|are|is) (?:installed|on (?:my |this )?(?:computer|system|machine))$",
            ],
        ),
        IntentRule::new(
            IntentKind::Logs,
            Extractor::Logs,
            &[
                r"^(?:show|check|view|display)(?: me)?(?: the)?(?: system)?(?: error)? logs?$",
                r"^(?:show|check|view)(?: me)?(?: the)? (?:recent|latest|last) (?:errors?|logs?)$",
                r"^what(?:'s| is) (?:in the )?(?:error )?logs?$",
            ],
        ),
        IntentRule::new(
            IntentKind::Service,
            Extractor::Service,
            &[
                r"^(?:is|check if) (.+?) (?:running|active|started|on)$",
                r"^(?:restart|start|stop|enable|disable) (.+?)(?: service)?$",
                r"^(?:show|check) (?:the )?status of (.+?)(?: service)?$",
                r"^(?:turn on|turn off|launch|kill) (.+)$",
            ],
        ),
        IntentRule::new(
            IntentKind::Config,
            Extractor::Setting,
            &[
                r"^(?:make|set|change)(?: the| my)? (.+?) (?:bigger|larger|smaller|louder|quieter|brighter|darker|faster|slower)$",
                r"^(?:increase|decrease|raise|lower|boost|reduce)(?: the| my)? (.+)$",
                r"^(?:how do i |can i |help me )?(?:change|adjust|modify|configure)(?: the| my)? (.+)$",
                r"^(?:where|how)(?: do i| can i)? (?:find |go to )?(?:settings?|preferences?|options?|config(?:uration)?)(?: for (.+))?$",
            ],
        ),
        IntentRule::new(
            IntentKind::Troubleshoot,
            Extractor::Problem,
            &[
                r"^(?:my |the )?(.+?) (?:isn't|isnt|is not|ain't|aint|won't|wont|doesn't|doesnt|don't|dont|not) (?:work|working|function|functioning)$",
                r"^(?:i )?(?:can't|cant|cannot|can not) (.+)$",
                r"^(?:help|fix|repair|troubleshoot|diagnose)(?: me)?(?: with)?(?: my| the)? (.+)$",
                r"^(?:my |the )?(.+?) (?:is |seems )?(?:broken|busted|dead|stuck|frozen|messed up|screwed up)$",
                r"^(?:no|lost|not getting any|don't have|dont have) (.+)$",
                r"^(?:my |the )?(.+?) (?:stopped|quit|crashed)$",
            ],
        ),
    ]
});

/// First matching pattern across the ordered table, as a 0.95-confidence intent.
pub fn match_rules(normalized: &str, original: &str) -> Option<Intent> {
    for rule in RULES.iter() {
        for pattern in &rule.patterns {
            if let Some(caps) = pattern.captures(normalized) {
                let entities = rule.extractor.extract(&caps, normalized);
                return Some(Intent::new(rule.kind, RULE_CONFIDENCE, entities, original));
            }
        }
    }
    None
}
