//! Path template matching.
//!
//! # Responsibilities
//! - Compile `/widgets/{id}` style templates into segment patterns
//! - Match a concrete request path, extracting the placeholder values
//!
//! # Design Decisions
//! - Matching is case-sensitive and segment-wise
//! - A placeholder never spans a `/` and never matches an empty string
//! - No regex; a placeholder binds greedily and backtracks within its segment

use std::fmt;

/// One piece of a path segment.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Part {
    Literal(String),
    Param(String),
}

/// A compiled path template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    template: String,
    segments: Vec<Vec<Part>>,
}

/// Errors raised while compiling a template.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatternError {
    #[error("unbalanced braces in path template `{0}`")]
    UnbalancedBraces(String),

    #[error("empty placeholder name in path template `{0}`")]
    EmptyPlaceholder(String),

    #[error("adjacent placeholders in one segment of path template `{0}`")]
    AdjacentPlaceholders(String),
}

impl PathPattern {
    /// Compile a template. Text outside braces is matched literally.
    pub fn parse(template: &str) -> Result<Self, PatternError> {
        let mut segments = Vec::new();

        for raw in template.split('/').skip(1) {
            segments.push(Self::parse_segment(template, raw)?);
        }

        Ok(Self {
            template: template.to_string(),
            segments,
        })
    }

    fn parse_segment(template: &str, raw: &str) -> Result<Vec<Part>, PatternError> {
        let mut parts = Vec::new();
        let mut rest = raw;

        while !rest.is_empty() {
            match rest.find('{') {
                Some(0) => {
                    let close = rest
                        .find('}')
                        .ok_or_else(|| PatternError::UnbalancedBraces(template.to_string()))?;
                    let name = &rest[1..close];
                    if name.is_empty() {
                        return Err(PatternError::EmptyPlaceholder(template.to_string()));
                    }
                    if name.contains('{') {
                        return Err(PatternError::UnbalancedBraces(template.to_string()));
                    }
                    if matches!(parts.last(), Some(Part::Param(_))) {
                        return Err(PatternError::AdjacentPlaceholders(template.to_string()));
                    }
                    parts.push(Part::Param(name.to_string()));
                    rest = &rest[close + 1..];
                }
                Some(open) => {
                    if rest[..open].contains('}') {
                        return Err(PatternError::UnbalancedBraces(template.to_string()));
                    }
                    parts.push(Part::Literal(rest[..open].to_string()));
                    rest = &rest[open..];
                }
                None => {
                    if rest.contains('}') {
                        return Err(PatternError::UnbalancedBraces(template.to_string()));
                    }
                    parts.push(Part::Literal(rest.to_string()));
                    rest = "";
                }
            }
        }

        Ok(parts)
    }

    /// The template this pattern was compiled from.
    pub fn template(&self) -> &str {
        &self.template
    }

    /// True when the template has no placeholders.
    pub fn is_literal(&self) -> bool {
        self.segments
            .iter()
            .flatten()
            .all(|part| matches!(part, Part::Literal(_)))
    }

    /// Number of segments made only of literal text. Used to order candidates.
    pub fn literal_segments(&self) -> usize {
        self.segments
            .iter()
            .filter(|segment| segment.iter().all(|part| matches!(part, Part::Literal(_))))
            .count()
    }

    /// Match a request path. Returns the placeholder values in template order.
    pub fn matches(&self, path: &str) -> Option<Vec<(String, String)>> {
        let mut params = Vec::new();
        let mut segments = path.split('/');

        // Both start with "/", so the first split piece is empty.
        if segments.next() != Some("") {
            return None;
        }

        let mut count = 0;
        for segment in segments {
            let pattern = self.segments.get(count)?;
            match_segment(pattern, segment, &mut params)?;
            count += 1;
        }

        (count == self.segments.len()).then_some(params)
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.template)
    }
}

fn match_segment(parts: &[Part], segment: &str, params: &mut Vec<(String, String)>) -> Option<()> {
    let Some((part, rest)) = parts.split_first() else {
        return segment.is_empty().then_some(());
    };

    match part {
        Part::Literal(text) => match_segment(rest, segment.strip_prefix(text.as_str())?, params),
        Part::Param(name) => {
            // Greedy like `[^/]+`: longest binding first, backtracking to
            // shorter ones when the remainder does not fit.
            let mark = params.len();
            for end in placeholder_ends(segment, rest.first()) {
                params.push((name.clone(), segment[..end].to_string()));
                if match_segment(rest, &segment[end..], params).is_some() {
                    return Some(());
                }
                params.truncate(mark);
            }
            None
        }
    }
}

/// Candidate end offsets for a placeholder, longest first. A placeholder is
/// always followed by a literal or by the end of the segment.
fn placeholder_ends<'a>(segment: &'a str, next: Option<&'a Part>) -> impl Iterator<Item = usize> + 'a {
    (1..=segment.len()).rev().filter(move |&end| {
        segment.is_char_boundary(end)
            && match next {
                Some(Part::Literal(text)) => segment[end..].starts_with(text.as_str()),
                _ => end == segment.len(),
            }
    })
}
