use crate::intent::recognizer::normalize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetaCommand {
    Help,
    History,
    Undo,
    Stats,
    Clear,
}

impl MetaCommand {
    /// Exact phrases only; "undo the firewall change" is an ordinary request.
    pub fn parse(text: &str) -> Option<Self> {
        match normalize(text).as_str() {
            "help" | "what can you do" | "what can i say" => Some(MetaCommand::Help),
            "history" | "show history" | "show my history" => Some(MetaCommand::History),
            "undo" | "undo that" | "undo last" | "rollback" | "roll back" => Some(MetaCommand::Undo),
            "stats" | "statistics" | "show stats" => Some(MetaCommand::Stats),
            "clear" | "clear history" => Some(MetaCommand::Clear),
            _ => None,
        }
    }
}

pub const HELP_TEXT: &str = "I can help you with:
- Installing software: \"install firefox\" or \"I need a web browser\"
- Removing software: \"remove vlc\"
- Updating your system: \"update my system\"
- Listing installed software: \"what's installed?\"
- Managing services: \"restart ssh\" or \"is nginx running?\"
- Freeing disk space: \"free up space\"
- Reading logs: \"show recent errors\"
- Fixing problems: \"my internet isn't working\"
- Changing settings: \"make the text bigger\"

Start with \"explain:\" to see what a request would do, or \"preview:\" for a dry run.
Combine requests with \"and\" or \"then\". Say \"undo\" to reverse the last change.";
