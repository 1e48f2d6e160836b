/*!
parser.rs - token -> typed value conversion.

Resolution order for a token against a target type:
  1. generic conversion (built-in primitive table, or the parameter's own
     `FromStr` converter for enums and similar)
  2. custom parser registered for that exact type via `add_type_parser`
  3. otherwise the token fails to parse

Values are type-erased (`Value`) and recovered by handlers through `Args`.
*/

use anyhow::{Result, bail};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::log_trace;

/// A parsed argument value.
pub type Value = Box<dyn Any + Send>;

/// Generic string converter. `None` means "could not convert".
pub type Converter = fn(&str) -> Option<Value>;

type ErasedParser = Box<dyn Fn(&str) -> Result<Value> + Send + Sync>;

/* ---- Type Identity ---- */

/// Identity of a parameter's target type plus a short display name.
#[derive(Clone, Copy, Debug)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    pub fn of<T: Any>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: short_type_name(std::any::type_name::<T>()),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

// `alloc::string::String` -> `String`; generic names are kept whole.
fn short_type_name(full: &'static str) -> &'static str {
    if full.contains('<') {
        return full;
    }
    full.rsplit("::").next().unwrap_or(full)
}

/* ---- Parser Extension API ---- */

/// Converts a single token into a host-defined type.
pub trait ArgumentParser: Send + Sync {
    type Output: Any + Send;

    fn parse(&self, token: &str) -> Result<Self::Output>;
}

/// Generic `FromStr` conversion, usable as a `Converter`.
pub fn from_str_value<T>(token: &str) -> Option<Value>
where
    T: FromStr + Any + Send,
{
    token.parse::<T>().ok().map(|v| Box::new(v) as Value)
}

fn bool_value(token: &str) -> Option<Value> {
    let l = token.trim().to_ascii_lowercase();
    let b = match l.as_str() {
        "true" | "1" | "yes" | "y" => true,
        "false" | "0" | "no" | "n" => false,
        _ => return None,
    };
    Some(Box::new(b))
}

fn string_value(token: &str) -> Option<Value> {
    Some(Box::new(token.to_string()))
}

/* ---- Registry ---- */

/// Built-in primitive converters plus the custom parsers registered by the host.
pub struct TypeParsers {
    builtin: HashMap<TypeId, Converter>,
    custom: HashMap<TypeId, (TypeKey, ErasedParser)>,
}

impl TypeParsers {
    pub fn new() -> Self {
        let mut builtin: HashMap<TypeId, Converter> = HashMap::new();
        macro_rules! primitive {
            ($($t:ty),* $(,)?) => {
                $( builtin.insert(TypeId::of::<$t>(), from_str_value::<$t>); )*
            };
        }
        primitive!(
            i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64, char
        );
        builtin.insert(TypeId::of::<bool>(), bool_value);
        builtin.insert(TypeId::of::<String>(), string_value);

        Self {
            builtin,
            custom: HashMap::new(),
        }
    }

    /// Register a custom parser for `P::Output`. A second registration for the
    /// same type is rejected; the first one stays in place.
    pub fn add_type_parser<P>(&mut self, parser: P) -> Result<()>
    where
        P: ArgumentParser + 'static,
    {
        self.insert(
            TypeKey::of::<P::Output>(),
            Box::new(move |token: &str| parser.parse(token).map(|v| Box::new(v) as Value)),
        )
    }

    /// Closure form of `add_type_parser`.
    pub fn add_type_parser_fn<T, F>(&mut self, parser: F) -> Result<()>
    where
        T: Any + Send,
        F: Fn(&str) -> Result<T> + Send + Sync + 'static,
    {
        self.insert(
            TypeKey::of::<T>(),
            Box::new(move |token: &str| parser(token).map(|v| Box::new(v) as Value)),
        )
    }

    fn insert(&mut self, key: TypeKey, parser: ErasedParser) -> Result<()> {
        if self.custom.contains_key(&key.id()) {
            bail!("a parser for type '{}' is already registered", key);
        }
        self.custom.insert(key.id(), (key, parser));
        Ok(())
    }

    pub fn has_custom<T: Any>(&self) -> bool {
        self.custom.contains_key(&TypeId::of::<T>())
    }

    /// Whether any conversion path (built-in or custom) exists for `key`.
    pub fn supports(&self, key: &TypeKey) -> bool {
        self.builtin.contains_key(&key.id()) || self.custom.contains_key(&key.id())
    }

    /// Parse `token` into the type named by `key`.
    ///
    /// `generic` overrides the built-in table entry (a parameter's own
    /// `FromStr` converter); the custom parser is the fallback either way.
    pub fn parse(&self, token: &str, key: &TypeKey, generic: Option<Converter>) -> Option<Value> {
        let first = generic.or_else(|| self.builtin.get(&key.id()).copied());
        if let Some(convert) = first
            && let Some(v) = convert(token)
        {
            return Some(v);
        }

        let (_, parser) = self.custom.get(&key.id())?;
        match parser(token) {
            Ok(v) => Some(v),
            Err(e) => {
                log_trace!("custom parser for '{}' rejected '{}': {e}", key, token);
                None
            }
        }
    }
}

impl Default for TypeParsers {
    fn default() -> Self {
        Self::new()
    }
}

/* ---- Tests ---- */
#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[derive(Debug, PartialEq)]
    struct Foo(u32);

    struct FixedFoo(u32);

    impl ArgumentParser for FixedFoo {
        type Output = Foo;

        fn parse(&self, _token: &str) -> Result<Foo> {
            Ok(Foo(self.0))
        }
    }

    fn parse_as<T: Any + Clone>(parsers: &TypeParsers, token: &str) -> Option<T> {
        parsers
            .parse(token, &TypeKey::of::<T>(), None)
            .and_then(|v| v.downcast::<T>().ok())
            .map(|b| *b)
    }

    #[test]
    fn builtin_primitives() {
        let p = TypeParsers::new();
        assert_eq!(parse_as::<i32>(&p, "-42"), Some(-42));
        assert_eq!(parse_as::<u8>(&p, "300"), None, "out of range");
        assert_eq!(parse_as::<f64>(&p, "2.5"), Some(2.5));
        assert_eq!(parse_as::<String>(&p, "hello"), Some("hello".to_string()));
        assert_eq!(parse_as::<char>(&p, "x"), Some('x'));
    }

    #[test]
    fn builtin_bool_spellings() {
        let p = TypeParsers::new();
        assert_eq!(parse_as::<bool>(&p, "TRUE"), Some(true));
        assert_eq!(parse_as::<bool>(&p, "no"), Some(false));
        assert_eq!(parse_as::<bool>(&p, "maybe"), None);
    }

    #[test]
    fn custom_type_needs_registration() {
        let mut p = TypeParsers::new();
        let key = TypeKey::of::<Foo>();
        assert!(p.parse("foo:7", &key, None).is_none());

        p.add_type_parser_fn(|t: &str| {
            t.strip_prefix("foo:")
                .and_then(|n| n.parse().ok())
                .map(Foo)
                .ok_or_else(|| anyhow!("not a foo"))
        })
        .unwrap();

        let v = p.parse("foo:7", &key, None).unwrap();
        assert_eq!(*v.downcast::<Foo>().unwrap(), Foo(7));
        assert!(p.parse("bar", &key, None).is_none());
    }

    #[test]
    fn custom_parser_is_fallback_for_primitives() {
        let mut p = TypeParsers::new();
        p.add_type_parser_fn(|t: &str| match t {
            "ten" => Ok(10),
            _ => Err(anyhow!("unknown number word")),
        })
        .unwrap();
        assert_eq!(parse_as::<i32>(&p, "3"), Some(3), "builtin wins");
        assert_eq!(parse_as::<i32>(&p, "ten"), Some(10), "custom fallback");
        assert_eq!(parse_as::<i32>(&p, "eleven"), None);
    }

    #[test]
    fn duplicate_registration_rejected() {
        let mut p = TypeParsers::new();
        p.add_type_parser_fn(|_: &str| Ok(Foo(1))).unwrap();
        let err = p.add_type_parser(FixedFoo(2)).unwrap_err();
        assert!(err.to_string().contains("already registered"));

        let v = p.parse("x", &TypeKey::of::<Foo>(), None).unwrap();
        assert_eq!(*v.downcast::<Foo>().unwrap(), Foo(1), "first parser kept");
    }

    #[test]
    fn type_key_names() {
        assert_eq!(TypeKey::of::<String>().name(), "String");
        assert_eq!(TypeKey::of::<i64>().to_string(), "i64");
        assert_eq!(TypeKey::of::<u8>(), TypeKey::of::<u8>());
    }
}
