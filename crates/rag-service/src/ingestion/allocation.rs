//! Allocation sentence parser
//!
//! Recognizes `<entity> at <period> allocated <breakdown>` where the breakdown is a
//! list of `<percentage><separator><project>` fragments, e.g.
//! `Li at 2024-Q1 allocated 60% to Apollo, 40% to Orion`.

use regex::Regex;

use crate::types::AllocationRecord;

/// Punctuation that may trail a project name inside a breakdown list
const TRAILING_PUNCT: &[char] = &[',', '，', '、', ';', '；', '.', '。'];

/// Conjunctions that may trail a project name before the next fragment
const CONJUNCTIONS: &[&str] = &["and", "&"];

/// Structured content of one allocation sentence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedAllocation {
    pub entity: String,
    pub period: String,
    /// Fragments in source order
    pub allocations: Vec<AllocationRecord>,
}

/// Parser for the allocation sentence shape
pub struct AllocationParser {
    sentence: Regex,
    share: Regex,
    separator: Regex,
}

impl Default for AllocationParser {
    fn default() -> Self {
        Self::new()
    }
}

impl AllocationParser {
    pub fn new() -> Self {
        let sentence = Regex::new(
            r"(?s)^\s*(?P<entity>\S+)\s+(?i:at)\s+(?P<period>\S+)\s+(?i:allocated)(?:\s+(?P<breakdown>.*?))?[\s.。]*$",
        )
        .expect("Invalid sentence regex");

        let share = Regex::new(r"\d+(?:\.\d+)?[%％]").expect("Invalid share regex");

        let separator = Regex::new(r"^[\s:：,，、]*(?:(?:to|in|on|for)(?:[\s:：]+|$))?")
            .expect("Invalid separator regex");

        Self {
            sentence,
            share,
            separator,
        }
    }

    /// Parse one sentence. Returns `None` when the text does not have the allocation shape.
    pub fn parse(&self, text: &str) -> Option<ParsedAllocation> {
        let caps = self.sentence.captures(text)?;
        let entity = caps.name("entity")?.as_str().to_string();
        let period = caps.name("period")?.as_str().to_string();
        let breakdown = caps.name("breakdown").map(|m| m.as_str()).unwrap_or("");

        Some(ParsedAllocation {
            entity,
            period,
            allocations: self.parse_breakdown(breakdown),
        })
    }

    /// Split a breakdown clause into records, in source order
    pub fn parse_breakdown(&self, breakdown: &str) -> Vec<AllocationRecord> {
        let shares: Vec<_> = self.share.find_iter(breakdown).collect();
        let mut records = Vec::with_capacity(shares.len());

        for (i, share) in shares.iter().enumerate() {
            let body_end = shares
                .get(i + 1)
                .map(|next| next.start())
                .unwrap_or(breakdown.len());
            let body = &breakdown[share.end()..body_end];

            let project = self.project_name(body);
            if project.is_empty() {
                continue;
            }

            records.push(AllocationRecord::new(project, share.as_str()));
        }

        records
    }

    fn project_name<'a>(&self, body: &'a str) -> &'a str {
        let sep_len = self.separator.find(body).map(|m| m.end()).unwrap_or(0);
        clean_project(&body[sep_len..])
    }
}

fn clean_project(raw: &str) -> &str {
    let mut name = raw.trim();
    loop {
        let trimmed = strip_conjunction(
            name.trim_end_matches(|c: char| c.is_whitespace() || TRAILING_PUNCT.contains(&c)),
        );
        if trimmed.len() == name.len() {
            break;
        }
        name = trimmed;
    }
    name
}

fn strip_conjunction(name: &str) -> &str {
    for conj in CONJUNCTIONS {
        let Some(split) = name.len().checked_sub(conj.len()) else {
            continue;
        };
        let (Some(head), Some(tail)) = (name.get(..split), name.get(split..)) else {
            continue;
        };
        if tail.eq_ignore_ascii_case(conj) && (head.is_empty() || head.ends_with(char::is_whitespace))
        {
            return head;
        }
    }
    name
}
