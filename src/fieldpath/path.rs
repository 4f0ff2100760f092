use crate::fieldpath::errors::FieldPathError;
use std::fmt;

/// One step of a field path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// A mapping key.
    Field(String),
    /// A sequence index. Applied to a mapping it addresses the decimal key.
    Index(usize),
    /// `[*]`: every element present at this position.
    Wildcard,
}

impl Segment {
    fn needs_brackets(name: &str) -> bool {
        name.is_empty() || name.contains(['.', '[', ']']) || name == "*"
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath {
    segments: Vec<Segment>,
}

impl FieldPath {
    pub fn new(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    pub fn parse(input: &str) -> Result<Self, FieldPathError> {
        let segments = parse_segments(input)?;
        if segments.is_empty() {
            return Err(FieldPathError::InvalidPath {
                input: input.to_string(),
                message: "empty field path".to_string(),
            });
        }
        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn has_wildcards(&self) -> bool {
        self.segments.contains(&Segment::Wildcard)
    }

    /// The path made of the first `len` segments.
    pub fn prefix(&self, len: usize) -> FieldPath {
        FieldPath {
            segments: self.segments[..len.min(self.segments.len())].to_vec(),
        }
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Field(name) if Segment::needs_brackets(name) => write!(f, "[{name}]")?,
                Segment::Field(name) => {
                    if idx > 0 {
                        write!(f, ".")?;
                    }
                    write!(f, "{name}")?;
                }
                Segment::Index(index) => write!(f, "[{index}]")?,
                Segment::Wildcard => write!(f, "[*]")?,
            }
        }
        Ok(())
    }
}

impl std::str::FromStr for FieldPath {
    type Err = FieldPathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FieldPath::parse(s)
    }
}

fn parse_segments(input: &str) -> Result<Vec<Segment>, FieldPathError> {
    let invalid = |message: &str| FieldPathError::InvalidPath {
        input: input.to_string(),
        message: message.to_string(),
    };

    let mut segments = Vec::new();
    let mut current = String::new();
    let mut chars = input.chars().peekable();
    // Set after `]` so that `a[0].b` does not read the dot as an empty field.
    let mut after_bracket = false;

    while let Some(ch) = chars.next() {
        match ch {
            '.' => {
                if current.is_empty() {
                    if !after_bracket {
                        return Err(invalid("empty path segment"));
                    }
                } else {
                    segments.push(Segment::Field(std::mem::take(&mut current)));
                }
                after_bracket = false;
                if chars.peek().is_none() {
                    return Err(invalid("trailing period"));
                }
            }
            '[' => {
                if !current.is_empty() {
                    segments.push(Segment::Field(std::mem::take(&mut current)));
                }
                let mut inner = String::new();
                let mut closed = false;
                for next in chars.by_ref() {
                    if next == ']' {
                        closed = true;
                        break;
                    }
                    inner.push(next);
                }
                if !closed {
                    return Err(invalid("unterminated '['"));
                }
                segments.push(bracket_segment(&inner).ok_or_else(|| invalid("empty brackets"))?);
                after_bracket = true;
            }
            ']' => return Err(invalid("unexpected ']'")),
            other => {
                if after_bracket {
                    return Err(invalid("expected '.' or '[' after ']'"));
                }
                current.push(other);
            }
        }
    }

    if !current.is_empty() {
        segments.push(Segment::Field(current));
    }

    Ok(segments)
}

fn bracket_segment(inner: &str) -> Option<Segment> {
    if inner.is_empty() {
        return None;
    }
    if inner == "*" {
        return Some(Segment::Wildcard);
    }
    // Digit runs beyond u32 are keys, never indices.
    if inner.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(index) = inner.parse::<u32>() {
            return Some(Segment::Index(index as usize));
        }
    }
    Some(Segment::Field(inner.to_string()))
}
