//! Structural classification of result records.
//!
//! The service sends record collections without a type tag, so the variant is
//! inferred from which distinguishing fields are present. All shape knowledge
//! lives here.

use serde_json::{Map, Number, Value};

use crate::error::UnrecognizedShapeError;

const REACTIONS: &str = "reactions";
const REPLIES: &str = "replies";
const REPLIER_ID: &str = "id_replier";
const REPLIER_NAME: &str = "full_name_replier";

/// Replier records changed shape upstream; both are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplierShape {
    /// `{id_replier, full_name_replier: {display_name, email, fullname}, discussions, responses}`
    Nested,
    /// `{user, count}`
    Flat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordShape {
    Message,
    Replier(ReplierShape),
}

/// Classifies a single record.
pub fn classify(record: &Value) -> Result<RecordShape, UnrecognizedShapeError> {
    classify_at(0, record)
}

/// Like [`classify`], reporting `index` on failure.
pub fn classify_at(index: usize, record: &Value) -> Result<RecordShape, UnrecognizedShapeError> {
    let unrecognized = || UnrecognizedShapeError {
        index,
        keys: record
            .as_object()
            .map(|object| object.keys().cloned().collect())
            .unwrap_or_default(),
    };
    let object = record.as_object().ok_or_else(unrecognized)?;

    let reactions = object.get(REACTIONS);
    let replies = object.get(REPLIES);
    if matches!(reactions, Some(Value::Object(_) | Value::Null))
        && matches!(replies, Some(Value::Array(_) | Value::Null))
    {
        return Ok(RecordShape::Message);
    }
    if object.contains_key(REPLIER_ID) {
        return Ok(RecordShape::Replier(ReplierShape::Nested));
    }
    if object.contains_key("user") && object.contains_key("count") {
        return Ok(RecordShape::Replier(ReplierShape::Flat));
    }
    Err(unrecognized())
}

/// A record viewed through its inferred shape. Borrows the payload.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultRecord<'a> {
    Message(MessageRecord<'a>),
    Replier(ReplierRecord<'a>),
}

impl<'a> ResultRecord<'a> {
    pub fn parse(index: usize, record: &'a Value) -> Result<Self, UnrecognizedShapeError> {
        let shape = classify_at(index, record)?;
        // classify_at only succeeds on objects.
        let Some(object) = record.as_object() else {
            return Err(UnrecognizedShapeError {
                index,
                keys: Vec::new(),
            });
        };
        Ok(match shape {
            RecordShape::Message => ResultRecord::Message(MessageRecord::from_object(object)),
            RecordShape::Replier(ReplierShape::Nested) => ResultRecord::Replier(ReplierRecord::Nested {
                id: object.get(REPLIER_ID),
                full_name: object.get(REPLIER_NAME).and_then(Value::as_object),
                discussions: object.get("discussions"),
                responses: object.get("responses"),
            }),
            RecordShape::Replier(ReplierShape::Flat) => ResultRecord::Replier(ReplierRecord::Flat {
                user: object.get("user"),
                count: object.get("count"),
            }),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MessageRecord<'a> {
    /// Every field except reactions and replies, in enumeration order.
    pub fields: Vec<(&'a str, &'a Value)>,
    pub reactions: Vec<(&'a str, &'a Value)>,
    pub replies: &'a [Value],
}

impl<'a> MessageRecord<'a> {
    fn from_object(object: &'a Map<String, Value>) -> Self {
        let fields = object
            .iter()
            .filter(|(key, _)| key.as_str() != REACTIONS && key.as_str() != REPLIES)
            .map(|(key, value)| (key.as_str(), value))
            .collect();
        let reactions = object
            .get(REACTIONS)
            .and_then(Value::as_object)
            .map(|map| map.iter().map(|(name, count)| (name.as_str(), count)).collect())
            .unwrap_or_default();
        let replies = object
            .get(REPLIES)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[]);
        Self {
            fields,
            reactions,
            replies,
        }
    }

    /// Sum of every numeric reaction count. Stays an integer unless some
    /// count is fractional; non-numeric counts are skipped.
    pub fn reactions_count(&self) -> Number {
        let counts: Vec<&Number> = self
            .reactions
            .iter()
            .filter_map(|(_, count)| match count {
                Value::Number(number) => Some(number),
                _ => None,
            })
            .collect();
        let integers: Option<Vec<i64>> = counts.iter().map(|number| number.as_i64()).collect();
        match integers {
            Some(values) => Number::from(values.into_iter().fold(0i64, i64::saturating_add)),
            None => {
                let total: f64 = counts.iter().filter_map(|number| number.as_f64()).sum();
                Number::from_f64(total).unwrap_or_else(|| Number::from(0))
            }
        }
    }

    /// `name:count` pairs joined by `"; "`.
    pub fn reactions_list(&self) -> String {
        self.reactions
            .iter()
            .map(|(name, count)| format!("{name}:{}", plain_text(Some(count))))
            .collect::<Vec<_>>()
            .join("; ")
    }

    pub fn replies_count(&self) -> usize {
        self.replies.len()
    }

    /// `author: message` per reply joined by `"; "`.
    pub fn replies_list(&self) -> String {
        self.replies
            .iter()
            .map(|reply| {
                format!(
                    "{}: {}",
                    plain_text(reply.get("author")),
                    plain_text(reply.get("message"))
                )
            })
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReplierRecord<'a> {
    Nested {
        id: Option<&'a Value>,
        full_name: Option<&'a Map<String, Value>>,
        discussions: Option<&'a Value>,
        responses: Option<&'a Value>,
    },
    Flat {
        user: Option<&'a Value>,
        count: Option<&'a Value>,
    },
}

impl<'a> ReplierRecord<'a> {
    pub fn replier_id(&self) -> Option<&'a Value> {
        match self {
            ReplierRecord::Nested { id, .. } => *id,
            ReplierRecord::Flat { user, .. } => *user,
        }
    }

    pub fn email(&self) -> Option<&'a Value> {
        self.name_field("email")
    }

    pub fn fullname(&self) -> Option<&'a Value> {
        self.name_field("fullname")
    }

    pub fn discussions(&self) -> Option<&'a Value> {
        match self {
            ReplierRecord::Nested { discussions, .. } => *discussions,
            ReplierRecord::Flat { .. } => None,
        }
    }

    /// The flat shape only carries a reply count.
    pub fn responses(&self) -> Option<&'a Value> {
        match self {
            ReplierRecord::Nested { responses, .. } => *responses,
            ReplierRecord::Flat { count, .. } => *count,
        }
    }

    fn name_field(&self, key: &str) -> Option<&'a Value> {
        match self {
            ReplierRecord::Nested {
                full_name: Some(name),
                ..
            } => name.get(key),
            _ => None,
        }
    }
}

/// Text of a scalar as it appears inside a joined list.
fn plain_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}
