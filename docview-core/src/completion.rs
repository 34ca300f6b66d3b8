use crate::commands::{CommandId, CommandRegistry, CompletionSource, COMMAND_PREFIX};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub value: String,
    pub description: String,
}

impl Candidate {
    pub fn new(value: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            description: description.into(),
        }
    }
}

/// Candidates sharing an optional group label.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CandidateGroup {
    pub label: Option<String>,
    pub candidates: Vec<Candidate>,
}

/// Provides the dynamic parameter lists for commands.
pub trait CandidateSource {
    fn parameters(&self, source: CompletionSource) -> Vec<CandidateGroup>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionItem {
    pub value: String,
    pub description: String,
    pub command: Option<CommandId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionEntry {
    Item(CompletionItem),
    /// Non-selectable separator preceding the items of its group.
    Group(String),
}

impl CompletionEntry {
    pub fn is_group(&self) -> bool {
        matches!(self, CompletionEntry::Group(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionDirection {
    Next,
    Previous,
    NextGroup,
    PreviousGroup,
    Hide,
}

impl CompletionDirection {
    fn forward(self) -> bool {
        matches!(self, CompletionDirection::Next | CompletionDirection::NextGroup)
    }

    fn by_group(self) -> bool {
        matches!(
            self,
            CompletionDirection::NextGroup | CompletionDirection::PreviousGroup
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompletionMode {
    #[default]
    Command,
    Parameter,
}

/// Incremental completion over the command table or a command's parameter
/// list. The list is rebuilt whenever the inputbar text differs from what
/// the engine last wrote into it.
#[derive(Debug, Default)]
pub struct CompletionEngine {
    entries: Vec<CompletionEntry>,
    cursor: Option<usize>,
    mode: CompletionMode,
    written: Option<String>,
}

impl CompletionEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[CompletionEntry] {
        &self.entries
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn mode(&self) -> CompletionMode {
        self.mode
    }

    pub fn is_active(&self) -> bool {
        self.written.is_some()
    }

    pub fn hide(&mut self) {
        self.entries.clear();
        self.cursor = None;
        self.mode = CompletionMode::Command;
        self.written = None;
    }

    /// Advances the selection and returns the rewritten inputbar text, or
    /// `None` when nothing was selected.
    pub fn update(
        &mut self,
        text: &str,
        direction: CompletionDirection,
        registry: &CommandRegistry,
        source: &dyn CandidateSource,
    ) -> Option<String> {
        if direction == CompletionDirection::Hide {
            self.hide();
            return None;
        }
        let input = text.strip_prefix(COMMAND_PREFIX)?;
        let (command, parameter) = match input.split_once(' ') {
            Some((command, parameter)) => (command, Some(parameter)),
            None => (input, None),
        };

        if self.written.as_deref() != Some(text) {
            self.rebuild(command, parameter, registry, source);
            self.written = Some(text.to_string());
        }
        if self.entries.is_empty() {
            return None;
        }

        let selected = self.step(direction)?;
        let CompletionEntry::Item(item) = &self.entries[selected] else {
            return None;
        };
        let rewritten = match (self.mode, parameter) {
            (CompletionMode::Command, Some(parameter)) => {
                format!("{COMMAND_PREFIX}{} {parameter}", item.value)
            }
            (CompletionMode::Command, None) => format!("{COMMAND_PREFIX}{}", item.value),
            (CompletionMode::Parameter, _) => {
                format!("{COMMAND_PREFIX}{command} {}", item.value)
            }
        };
        self.written = Some(rewritten.clone());
        Some(rewritten)
    }

    fn rebuild(
        &mut self,
        command: &str,
        parameter: Option<&str>,
        registry: &CommandRegistry,
        source: &dyn CandidateSource,
    ) {
        self.entries.clear();
        self.cursor = None;

        let resolved = parameter.and_then(|parameter| {
            let spec = registry.resolve(command)?;
            Some((spec, spec.completion?, parameter))
        });

        if let Some((spec, completion, parameter)) = resolved {
            self.mode = CompletionMode::Parameter;
            for group in source.parameters(completion) {
                let items: Vec<_> = group
                    .candidates
                    .into_iter()
                    .filter(|candidate| candidate.value.starts_with(parameter))
                    .map(|candidate| {
                        CompletionEntry::Item(CompletionItem {
                            value: candidate.value,
                            description: candidate.description,
                            command: Some(spec.id),
                        })
                    })
                    .collect();
                if items.is_empty() {
                    continue;
                }
                if let Some(label) = group.label {
                    self.entries.push(CompletionEntry::Group(label));
                }
                self.entries.extend(items);
            }
        } else {
            self.mode = CompletionMode::Command;
            self.entries
                .extend(registry.matching(command).map(|spec| {
                    CompletionEntry::Item(CompletionItem {
                        value: spec.name.to_string(),
                        description: spec.description.to_string(),
                        command: Some(spec.id),
                    })
                }));
        }
    }

    /// Moves the cursor one selectable item (or one group) in `direction`,
    /// wrapping around at most once.
    fn step(&mut self, direction: CompletionDirection) -> Option<usize> {
        let n = self.entries.len();
        let by_group = direction.by_group() && self.mode == CompletionMode::Parameter;
        let mut current = self.cursor.unwrap_or(if direction == CompletionDirection::Next {
            n - 1
        } else {
            0
        });
        let mut crossed_group = false;
        for _ in 0..n {
            current = if direction.forward() {
                (current + 1) % n
            } else {
                (current + n - 1) % n
            };
            if self.entries[current].is_group() {
                crossed_group |= by_group;
                continue;
            }
            if by_group && !crossed_group {
                continue;
            }
            break;
        }
        if self.entries[current].is_group() {
            return None;
        }
        self.cursor = Some(current);
        Some(current)
    }
}
