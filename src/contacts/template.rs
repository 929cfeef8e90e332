use crate::contacts::Contact;
use crate::domain::{MessageText, ValidationError};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Field(String),
}

/// Per-contact message body with `{placeholder}` fields.
///
/// `{name}` and `{phone}` are always available; any other placeholder names a
/// column of the imported contact file (case-insensitive). `{{` and `}}`
/// produce literal braces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageTemplate {
    segments: Vec<Segment>,
}

impl MessageTemplate {
    pub const FIELD: &'static str = "template";

    pub fn parse(source: &str) -> Result<Self, ValidationError> {
        if source.trim().is_empty() {
            return Err(ValidationError::Empty { field: Self::FIELD });
        }

        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = source.char_indices().peekable();

        while let Some((offset, ch)) = chars.next() {
            let doubled = chars.peek().is_some_and(|(_, next)| *next == ch);
            match ch {
                '{' | '}' if doubled => {
                    chars.next();
                    literal.push(ch);
                }
                '{' => {
                    let mut name = String::new();
                    let mut closed = false;
                    for (_, inner) in chars.by_ref() {
                        if inner == '}' {
                            closed = true;
                            break;
                        }
                        name.push(inner);
                    }
                    if !closed {
                        return Err(ValidationError::UnclosedPlaceholder { offset });
                    }
                    let name = name.trim().to_lowercase();
                    if name.is_empty() {
                        return Err(ValidationError::UnknownPlaceholder { name });
                    }
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Field(name));
                }
                other => literal.push(other),
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self { segments })
    }

    /// Placeholder names in order of appearance, lowercased.
    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Field(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    pub fn render(&self, contact: &Contact) -> Result<MessageText, ValidationError> {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Field(name) => out.push_str(lookup(contact, name)?),
            }
        }
        MessageText::new(out)
    }
}

fn lookup<'a>(contact: &'a Contact, name: &str) -> Result<&'a str, ValidationError> {
    match name {
        "name" => Ok(contact.name.as_deref().unwrap_or_default()),
        "phone" => Ok(contact.phone.as_str()),
        other => contact
            .metadata
            .get(other)
            .map(String::as_str)
            .ok_or_else(|| ValidationError::UnknownPlaceholder {
                name: other.to_owned(),
            }),
    }
}
