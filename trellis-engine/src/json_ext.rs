use itertools::Itertools;
use serde::{Deserialize, Serialize};
use serde_json_bytes::ByteString;
use std::fmt;

pub use serde_json_bytes::Value;

/// A json object.
pub type Object = serde_json_bytes::Map<ByteString, Value>;

/// A path element in a response document, e.g. `/users/3/posts`.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathElement {
    /// An index path element.
    Index(usize),

    /// A key path element.
    Key(String),
}

impl fmt::Display for PathElement {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PathElement::Index(index) => write!(f, "{}", index),
            PathElement::Key(key) => f.write_str(key),
        }
    }
}

/// A path into a response document.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Path(pub Vec<PathElement>);

impl Path {
    pub fn empty() -> Path {
        Path(Vec::new())
    }

    pub fn push(&mut self, element: PathElement) {
        self.0.push(element);
    }

    pub fn pop(&mut self) -> Option<PathElement> {
        self.0.pop()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PathElement> {
        self.0.iter()
    }
}

impl From<&str> for Path {
    fn from(s: &str) -> Self {
        s.split('/')
            .filter(|element| !element.is_empty())
            .map(|element| {
                if let Ok(index) = element.parse::<usize>() {
                    PathElement::Index(index)
                } else {
                    PathElement::Key(element.to_string())
                }
            })
            .collect()
    }
}

impl From<String> for Path {
    fn from(s: String) -> Self {
        Path::from(s.as_str())
    }
}

impl FromIterator<PathElement> for Path {
    fn from_iter<I: IntoIterator<Item = PathElement>>(iter: I) -> Self {
        Path(iter.into_iter().collect())
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "/{}",
            self.iter().map(|element| element.to_string()).join("/")
        )
    }
}
