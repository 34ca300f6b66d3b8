use crate::error::CommandError;
use crate::search::SearchDirection;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandId {
    Bmark,
    Blist,
    Close,
    Coffset,
    Delbmark,
    Export,
    Info,
    Open,
    Print,
    Quit,
    Rotate,
    Set,
    Write,
}

/// Dynamic parameter list a command can offer to the completion engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionSource {
    Bookmarks,
    Export,
    Printers,
    Settings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandSpec {
    pub name: &'static str,
    pub abbreviation: Option<&'static str>,
    pub id: CommandId,
    pub completion: Option<CompletionSource>,
    pub description: &'static str,
}

impl CommandSpec {
    pub fn matches(&self, token: &str) -> bool {
        self.name == token || self.abbreviation == Some(token)
    }

    pub fn matches_prefix(&self, prefix: &str) -> bool {
        self.name.starts_with(prefix)
            || self
                .abbreviation
                .map_or(false, |abbreviation| abbreviation.starts_with(prefix))
    }
}

const fn command(
    name: &'static str,
    abbreviation: Option<&'static str>,
    id: CommandId,
    completion: Option<CompletionSource>,
    description: &'static str,
) -> CommandSpec {
    CommandSpec {
        name,
        abbreviation,
        id,
        completion,
        description,
    }
}

pub const COMMANDS: &[CommandSpec] = &[
    command("bmark", Some("b"), CommandId::Bmark, Some(CompletionSource::Bookmarks), "Bookmark current page"),
    command("blist", None, CommandId::Blist, Some(CompletionSource::Bookmarks), "Open a bookmark"),
    command("close", Some("c"), CommandId::Close, None, "Close current file"),
    command("coffset", None, CommandId::Coffset, None, "Correct page offset"),
    command("delbmark", None, CommandId::Delbmark, Some(CompletionSource::Bookmarks), "Delete a bookmark"),
    command("export", Some("e"), CommandId::Export, Some(CompletionSource::Export), "Export images or attachments"),
    command("info", Some("i"), CommandId::Info, None, "Show document information"),
    command("open", Some("o"), CommandId::Open, None, "Open a file"),
    command("print", Some("p"), CommandId::Print, Some(CompletionSource::Printers), "Print document"),
    command("quit", Some("q"), CommandId::Quit, None, "Quit"),
    command("rotate", Some("r"), CommandId::Rotate, None, "Rotate page"),
    command("set", Some("s"), CommandId::Set, Some(CompletionSource::Settings), "Set an option"),
    command("write", Some("w"), CommandId::Write, None, "Save document"),
];

/// Inputbar commands addressed by their leading character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecialCommand {
    pub identifier: char,
    /// Runs on every keystroke instead of on submit.
    pub live: bool,
    pub action: SpecialAction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecialAction {
    Search(SearchDirection),
}

pub const SPECIAL_COMMANDS: &[SpecialCommand] = &[
    SpecialCommand {
        identifier: '/',
        live: true,
        action: SpecialAction::Search(SearchDirection::Forward),
    },
    SpecialCommand {
        identifier: '?',
        live: true,
        action: SpecialAction::Search(SearchDirection::Backward),
    },
];

pub const COMMAND_PREFIX: char = ':';

/// A submitted command line split into its command and argument tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation<'a> {
    pub spec: &'static CommandSpec,
    pub args: Vec<&'a str>,
}

#[derive(Debug, Clone, Copy)]
pub struct CommandRegistry {
    commands: &'static [CommandSpec],
    special: &'static [SpecialCommand],
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl CommandRegistry {
    pub const fn standard() -> Self {
        Self {
            commands: COMMANDS,
            special: SPECIAL_COMMANDS,
        }
    }

    pub fn commands(&self) -> &'static [CommandSpec] {
        self.commands
    }

    /// Exact, case-sensitive lookup by full name or abbreviation.
    pub fn resolve(&self, token: &str) -> Option<&'static CommandSpec> {
        self.commands.iter().find(|spec| spec.matches(token))
    }

    pub fn matching<'a>(&self, prefix: &'a str) -> impl Iterator<Item = &'static CommandSpec> + 'a {
        let commands: &'static [CommandSpec] = self.commands;
        commands
            .iter()
            .filter(move |spec| spec.matches_prefix(prefix))
    }

    pub fn special(&self, identifier: char) -> Option<&'static SpecialCommand> {
        self.special.iter().find(|s| s.identifier == identifier)
    }

    /// Parses the text after the command prefix.
    pub fn parse<'a>(&self, line: &'a str) -> Result<Invocation<'a>, CommandError> {
        let mut tokens = line.split_whitespace();
        let name = tokens
            .next()
            .ok_or_else(|| CommandError::UnknownCommand(String::new()))?;
        let spec = self
            .resolve(name)
            .ok_or_else(|| CommandError::UnknownCommand(name.to_string()))?;
        Ok(Invocation {
            spec,
            args: tokens.collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_names_and_abbreviations_case_sensitively() {
        let registry = CommandRegistry::standard();
        assert_eq!(registry.resolve("quit").unwrap().id, CommandId::Quit);
        assert_eq!(registry.resolve("q").unwrap().id, CommandId::Quit);
        assert!(registry.resolve("Quit").is_none());
        assert!(registry.resolve("qu").is_none());
    }

    #[test]
    fn parse_splits_on_whitespace() {
        let registry = CommandRegistry::standard();
        let invocation = registry.parse("set  zoom_step   25").unwrap();
        assert_eq!(invocation.spec.id, CommandId::Set);
        assert_eq!(invocation.args, vec!["zoom_step", "25"]);

        let err = registry.parse("frobnicate now").unwrap_err();
        assert_eq!(err.to_string(), "unknown command: frobnicate");
    }

    #[test]
    fn prefix_matching_covers_abbreviations() {
        let registry = CommandRegistry::standard();
        let names: Vec<_> = registry.matching("b").map(|spec| spec.name).collect();
        assert_eq!(names, vec!["bmark", "blist"]);
        let names: Vec<_> = registry.matching("e").map(|spec| spec.name).collect();
        assert_eq!(names, vec!["export"]);
        assert_eq!(registry.matching("").count(), COMMANDS.len());
    }

    #[test]
    fn search_special_commands_are_live() {
        let registry = CommandRegistry::standard();
        let backward = registry.special('?').unwrap();
        assert!(backward.live);
        assert_eq!(
            backward.action,
            SpecialAction::Search(SearchDirection::Backward)
        );
        assert!(registry.special(':').is_none());
    }
}
