use regex::Regex;

/// A single text transformation applied to one file's contents.
///
/// Two rule styles cover everything the patcher does: exact literal
/// substitution for constructor calls that are known byte-for-byte, and
/// guarded structural insertion for edits whose position must be located
/// by pattern (imports, state-variable declarations, deployments).
#[derive(Debug, Clone)]
pub enum PatchRule {
    /// Replace every non-overlapping occurrence of `old` with `new`,
    /// scanning left to right. Exact substring match, no pattern
    /// semantics. An absent `old` is a no-op, never an error.
    Literal { old: String, new: String },
    /// Insert fixed text at a position derived from a pattern match.
    Insert(InsertRule),
}

/// A guarded insertion at a computed anchor position.
#[derive(Debug, Clone)]
pub struct InsertRule {
    /// The first match of this pattern determines the insertion site.
    pub locator: Regex,
    /// Where within the locator match the text lands.
    pub anchor: InsertAnchor,
    /// The text to splice in, verbatim.
    pub text: String,
    /// Idempotence guard evaluated against the whole content.
    pub guard: InsertGuard,
}

/// Insertion offset relative to the locator match.
#[derive(Debug, Clone, Copy)]
pub enum InsertAnchor {
    /// Immediately after the end of the whole match.
    MatchEnd,
    /// Immediately after the end of the named capture group.
    GroupEnd(&'static str),
}

/// Applicability check for an [`InsertRule`].
///
/// `marker` must detect the rule's own prior insertion so that a second
/// run is a no-op. `requires` lets a rule depend on an earlier rule in
/// the same list having landed (e.g. declare a variable only if the
/// import is present).
#[derive(Debug, Clone)]
pub struct InsertGuard {
    /// If this matches, the insertion already happened; skip.
    pub marker: Regex,
    /// If present, must match or the rule does not apply.
    pub requires: Option<Regex>,
}

impl PatchRule {
    pub fn literal(old: impl Into<String>, new: impl Into<String>) -> Self {
        PatchRule::Literal {
            old: old.into(),
            new: new.into(),
        }
    }

    /// Apply this rule to `content`, returning the rewritten text or
    /// `None` when the rule does not change anything.
    pub fn apply(&self, content: &str) -> Option<String> {
        match self {
            PatchRule::Literal { old, new } => {
                if content.contains(old.as_str()) {
                    Some(content.replace(old.as_str(), new))
                } else {
                    None
                }
            }
            PatchRule::Insert(rule) => rule.apply(content),
        }
    }
}

impl InsertRule {
    fn apply(&self, content: &str) -> Option<String> {
        if let Some(requires) = &self.guard.requires {
            if !requires.is_match(content) {
                return None;
            }
        }
        if self.guard.marker.is_match(content) {
            return None;
        }

        let captures = self.locator.captures(content)?;
        let at = match self.anchor {
            InsertAnchor::MatchEnd => captures.get(0)?.end(),
            InsertAnchor::GroupEnd(name) => captures.name(name)?.end(),
        };

        let mut out = String::with_capacity(content.len() + self.text.len());
        out.push_str(&content[..at]);
        out.push_str(&self.text);
        out.push_str(&content[at..]);
        Some(out)
    }
}

/// Apply `rules` in declared order to an accumulating buffer.
///
/// Later rules see the output of earlier ones, so sequential rules can
/// compound within one run.
pub fn apply_all(content: &str, rules: &[PatchRule]) -> String {
    let mut buffer = content.to_string();
    for rule in rules {
        if let Some(next) = rule.apply(&buffer) {
            buffer = next;
        }
    }
    buffer
}
