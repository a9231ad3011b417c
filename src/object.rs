use std::fmt::Display;
use std::hash::{BuildHasherDefault, Hash, Hasher};
use std::rc::Rc;

use indexmap::IndexMap;
use rustc_hash::FxHasher;

use crate::crawler::Response;
use crate::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectType {
    Null,
    Boolean,
    Integer,
    Float,
    String,
    Array,
    Hash,
    Function,
    Builtin,
    ReturnValue,
    Error,
    HtmlDocument,
    Selector,
    HttpResponse,
}

impl Display for ObjectType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ObjectType::Null => "NULL",
            ObjectType::Boolean => "BOOLEAN",
            ObjectType::Integer => "INTEGER",
            ObjectType::Float => "FLOAT",
            ObjectType::String => "STRING",
            ObjectType::Array => "ARRAY",
            ObjectType::Hash => "HASH",
            ObjectType::Function => "FUNCTION",
            ObjectType::Builtin => "BUILTIN",
            ObjectType::ReturnValue => "RETURN_VALUE",
            ObjectType::Error => "ERROR",
            ObjectType::HtmlDocument => "HTML_DOC",
            ObjectType::Selector => "SELECTOR",
            ObjectType::HttpResponse => "HTTP_RESPONSE",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HtmlDocument {
    pub content: String,
    pub url: String,
}

#[derive(Debug, Clone)]
pub enum Object {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Array(Rc<Vec<Object>>),
    Hash(Shared<HashObject>),
    Function(Rc<Function>),
    Builtin(Rc<Builtin>),
    ReturnValue(Box<Object>),
    Error(Rc<ErrorObject>),
    HtmlDocument(Rc<HtmlDocument>),
    Selector(String),
    HttpResponse(Rc<Response>),
}

impl Object {
    pub fn type_name(&self) -> ObjectType {
        match self {
            Object::Null => ObjectType::Null,
            Object::Boolean(_) => ObjectType::Boolean,
            Object::Integer(_) => ObjectType::Integer,
            Object::Float(_) => ObjectType::Float,
            Object::String(_) => ObjectType::String,
            Object::Array(_) => ObjectType::Array,
            Object::Hash(_) => ObjectType::Hash,
            Object::Function(_) => ObjectType::Function,
            Object::Builtin(_) => ObjectType::Builtin,
            Object::ReturnValue(_) => ObjectType::ReturnValue,
            Object::Error(_) => ObjectType::Error,
            Object::HtmlDocument(_) => ObjectType::HtmlDocument,
            Object::Selector(_) => ObjectType::Selector,
            Object::HttpResponse(_) => ObjectType::HttpResponse,
        }
    }

    /// The key this value is stored under in a hash, or `None` for kinds
    /// that cannot be hash keys.
    pub fn hash_key(&self) -> Option<HashKey> {
        let digest = match self {
            Object::Integer(i) => *i as u64,
            Object::Boolean(b) => u64::from(*b),
            Object::String(s) | Object::Selector(s) => {
                let mut hasher = FxHasher::default();
                s.hash(&mut hasher);
                hasher.finish()
            }
            _ => return None,
        };

        Some(HashKey { object_type: self.type_name(), digest })
    }

    pub fn array(items: Vec<Object>) -> Self {
        Object::Array(Rc::new(items))
    }

    pub fn hash(hash: HashObject) -> Self {
        Object::Hash(Rc::new(std::cell::RefCell::new(hash)))
    }

    pub fn error(error: ErrorObject) -> Self {
        Object::Error(Rc::new(error))
    }

    pub fn string(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&LiteralValue> for Object {
    fn from(value: &LiteralValue) -> Self {
        match value {
            LiteralValue::Null => Object::Null,
            LiteralValue::Boolean(b) => Object::Boolean(*b),
            LiteralValue::Integer(i) => Object::Integer(*i),
            LiteralValue::Float(n) => Object::Float(*n),
            LiteralValue::String(s) => Object::String(s.clone()),
        }
    }
}

impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Boolean(left), Self::Boolean(right)) => left == right,
            (Self::Integer(left), Self::Integer(right)) => left == right,
            (Self::Float(left), Self::Float(right)) => left == right,
            (Self::Integer(left), Self::Float(right)) => (*left as f64) == *right,
            (Self::Float(left), Self::Integer(right)) => *left == (*right as f64),
            (Self::String(left), Self::String(right)) => left == right,
            (Self::Selector(left), Self::Selector(right)) => left == right,
            (Self::Array(left), Self::Array(right)) => left == right,
            (Self::Hash(left), Self::Hash(right)) => {
                Rc::ptr_eq(left, right) || *left.borrow() == *right.borrow()
            }
            (Self::Function(left), Self::Function(right)) => Rc::ptr_eq(left, right),
            (Self::Builtin(left), Self::Builtin(right)) => Rc::ptr_eq(left, right),
            (Self::ReturnValue(left), Self::ReturnValue(right)) => left == right,
            (Self::Error(left), Self::Error(right)) => left == right,
            (Self::HtmlDocument(left), Self::HtmlDocument(right)) => left == right,
            (Self::HttpResponse(left), Self::HttpResponse(right)) => left == right,
            _ => false,
        }
    }
}

impl Display for Object {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Integer(i) => write!(f, "{i}"),
            Self::Float(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s}"),
            Self::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Self::Hash(hash) => write!(f, "{}", hash.borrow()),
            Self::Function(function) => write!(f, "{function}"),
            Self::Builtin(builtin) => write!(f, "{builtin}"),
            Self::ReturnValue(value) => write!(f, "{value}"),
            Self::Error(error) => write!(f, "{error}"),
            Self::HtmlDocument(doc) => write!(f, "HTMLDocument({})", doc.url),
            Self::Selector(pattern) => write!(f, "@{pattern}"),
            Self::HttpResponse(response) => {
                write!(f, "HTTPResponse({}, {})", response.status, response.url)
            }
        }
    }
}

/// Identity of a hashable value: its type tag plus a 64-bit digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HashKey {
    pub object_type: ObjectType,
    pub digest: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HashPair {
    pub key: Object,
    pub value: Object,
}

type FxIndexMap<K, V> = IndexMap<K, V, BuildHasherDefault<FxHasher>>;

/// Insertion-ordered hash. Rewriting an existing key keeps its slot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HashObject {
    pairs: FxIndexMap<HashKey, HashPair>,
}

impl HashObject {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `value` under `key`. Fails with the key's type when the key is
    /// not hashable.
    pub fn insert(&mut self, key: Object, value: Object) -> Result<(), ObjectType> {
        let hash_key = key.hash_key().ok_or_else(|| key.type_name())?;
        self.pairs.insert(hash_key, HashPair { key, value });
        Ok(())
    }

    pub fn insert_str(&mut self, key: &str, value: Object) {
        let key = Object::String(key.to_owned());
        if let Some(hash_key) = key.hash_key() {
            self.pairs.insert(hash_key, HashPair { key, value });
        }
    }

    pub fn get(&self, key: &Object) -> Result<Option<&Object>, ObjectType> {
        let hash_key = key.hash_key().ok_or_else(|| key.type_name())?;
        Ok(self.pairs.get(&hash_key).map(|pair| &pair.value))
    }

    pub fn remove(&mut self, key: &Object) -> Result<Option<Object>, ObjectType> {
        let hash_key = key.hash_key().ok_or_else(|| key.type_name())?;
        Ok(self.pairs.shift_remove(&hash_key).map(|pair| pair.value))
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn pairs(&self) -> impl Iterator<Item = &HashPair> {
        self.pairs.values()
    }

    pub fn keys(&self) -> impl Iterator<Item = &Object> {
        self.pairs.values().map(|pair| &pair.key)
    }

    pub fn values(&self) -> impl Iterator<Item = &Object> {
        self.pairs.values().map(|pair| &pair.value)
    }
}

impl Display for HashObject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{")?;
        for (i, pair) in self.pairs().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", pair.key, pair.value)?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn string(s: &str) -> Object {
        Object::String(s.to_owned())
    }

    #[test]
    fn equal_content_has_equal_keys() {
        assert_eq!(string("name").hash_key(), string("name").hash_key());
        assert_ne!(string("name").hash_key(), string("other").hash_key());
        assert_eq!(Object::Integer(7).hash_key(), Object::Integer(7).hash_key());
        assert_eq!(Object::Boolean(true).hash_key(), Object::Boolean(true).hash_key());
        assert_ne!(Object::Boolean(true).hash_key(), Object::Boolean(false).hash_key());
    }

    #[test]
    fn type_tag_separates_keys() {
        let selector = Object::Selector("h1".to_owned());
        assert_ne!(string("h1").hash_key(), selector.hash_key());
        assert_ne!(Object::Integer(1).hash_key(), Object::Boolean(true).hash_key());
    }

    #[test]
    fn unhashable_kinds() {
        assert_eq!(Object::Null.hash_key(), None);
        assert_eq!(Object::Float(1.5).hash_key(), None);
        assert_eq!(Object::array(vec![]).hash_key(), None);

        let mut hash = HashObject::new();
        assert_eq!(hash.insert(Object::array(vec![]), Object::Null), Err(ObjectType::Array));
    }

    #[test]
    fn last_write_wins_and_order_is_kept() {
        let mut hash = HashObject::new();
        hash.insert(string("a"), Object::Integer(1)).unwrap();
        hash.insert(string("b"), Object::Integer(2)).unwrap();
        hash.insert(string("a"), Object::Integer(3)).unwrap();

        assert_eq!(hash.len(), 2);
        assert_eq!(hash.get(&string("a")), Ok(Some(&Object::Integer(3))));
        assert_eq!(hash.to_string(), "{a: 3, b: 2}");

        assert_eq!(hash.remove(&string("a")), Ok(Some(Object::Integer(3))));
        assert_eq!(hash.remove(&string("a")), Ok(None));
        assert_eq!(hash.to_string(), "{b: 2}");
    }

    #[test]
    fn display_forms() {
        assert_eq!(Object::Null.to_string(), "null");
        assert_eq!(Object::Float(3.0).to_string(), "3");
        assert_eq!(Object::Float(0.5).to_string(), "0.5");
        assert_eq!(string("raw").to_string(), "raw");
        assert_eq!(
            Object::array(vec![Object::Integer(1), string("x")]).to_string(),
            "[1, x]"
        );
        assert_eq!(Object::Selector(".title".to_owned()).to_string(), "@.title");

        let doc = HtmlDocument { content: String::new(), url: "http://a".to_owned() };
        assert_eq!(Object::HtmlDocument(Rc::new(doc)).to_string(), "HTMLDocument(http://a)");
    }

    #[test]
    fn structural_equality() {
        assert_eq!(Object::Integer(2), Object::Float(2.0));
        assert_ne!(Object::Integer(2), string("2"));
        assert_eq!(
            Object::array(vec![Object::Integer(1), Object::Null]),
            Object::array(vec![Object::Integer(1), Object::Null])
        );

        let mut left = HashObject::new();
        left.insert(string("k"), Object::Boolean(true)).unwrap();
        let mut right = HashObject::new();
        right.insert(string("k"), Object::Boolean(true)).unwrap();
        assert_eq!(Object::hash(left), Object::hash(right));
    }

    #[test]
    fn type_names() {
        assert_eq!(Object::Integer(1).type_name().to_string(), "INTEGER");
        assert_eq!(Object::hash(HashObject::new()).type_name().to_string(), "HASH");
        assert_eq!(Object::Selector(String::new()).type_name().to_string(), "SELECTOR");
    }
}
