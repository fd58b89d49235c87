use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, PartialEq)]
pub enum Error {
    FileMalformed,
    Pest(String),
    Serde(String),
    Io(String),
    Fmt(String),
    Template(String),
    Config(String),
    ParseInt(String),
    ParseFloat(String),
    LexError(String),
    MissingHeader(String),
    Directive(String),
    UnbalancedConditional(String),
    Redefinition(String),
    UnresolvedValue(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::FileMalformed => write!(f, "file malformed"),
            Error::Pest(message) => write!(f, "parse error: {}", message),
            Error::Serde(message) => write!(f, "model conversion error: {}", message),
            Error::Io(message) => write!(f, "io error: {}", message),
            Error::Fmt(message) => write!(f, "rustfmt error: {}", message),
            Error::Template(message) => write!(f, "template error: {}", message),
            Error::Config(message) => write!(f, "config error: {}", message),
            Error::ParseInt(message) => write!(f, "invalid integer: {}", message),
            Error::ParseFloat(message) => write!(f, "invalid float: {}", message),
            Error::LexError(message) => write!(f, "invalid tokens: {}", message),
            Error::MissingHeader(name) => write!(f, "header not found: {}", name),
            Error::Directive(message) => write!(f, "#error {}", message),
            Error::UnbalancedConditional(message) => {
                write!(f, "unbalanced conditional: {}", message)
            }
            Error::Redefinition(name) => write!(f, "conflicting redefinition of {}", name),
            Error::UnresolvedValue(value) => write!(f, "cannot resolve value {}", value),
        }
    }
}

impl std::error::Error for Error {}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Self::Serde(error.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Self::Io(error.to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Pointer {
    NormalPointer(String),
    DoublePointer(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Type {
    FundamentalType(String),
    UserType(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OpaqueType {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TypeAlias {
    pub as_const: Option<String>,
    pub base_type: Type,
    pub pointer: Option<Pointer>,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Constant {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Enumerator {
    pub name: String,
    pub value: Option<String>,
}

fn default_enum_type() -> Type {
    Type::FundamentalType("int".into())
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Enumeration {
    pub name: String,
    #[serde(default = "default_enum_type")]
    pub enum_type: Type,
    #[serde(default)]
    pub enumerators: Vec<Enumerator>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Field {
    pub as_const: Option<String>,
    pub field_type: Type,
    pub pointer: Option<Pointer>,
    pub name: String,
    pub as_array: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Structure {
    pub name: String,
    #[serde(default)]
    pub fields: Vec<Field>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Argument {
    pub as_const: Option<String>,
    pub argument_type: Type,
    pub pointer: Option<Pointer>,
    #[serde(default)]
    pub name: String,
    pub as_array: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Callback {
    pub return_const: Option<String>,
    pub return_type: Type,
    pub pointer: Option<Pointer>,
    pub name: String,
    #[serde(default)]
    pub arguments: Vec<Argument>,
    pub varargs: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Function {
    pub return_const: Option<String>,
    pub return_type: Type,
    pub pointer: Option<Pointer>,
    pub name: String,
    #[serde(default)]
    pub arguments: Vec<Argument>,
    pub varargs: Option<String>,
}

/// Shared library a header's functions resolve against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Library {
    Xplm,
    Widgets,
}

impl Library {
    pub fn from_file(name: &str) -> Option<Library> {
        if name.starts_with("XPLM") {
            Some(Library::Xplm)
        } else if name.starts_with("XP") {
            Some(Library::Widgets)
        } else {
            None
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Library::Xplm => "XPLM",
            Library::Widgets => "XPWidgets",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Header {
    pub opaque_types: Vec<OpaqueType>,
    pub type_aliases: Vec<TypeAlias>,
    pub constants: Vec<Constant>,
    pub enumerations: Vec<Enumeration>,
    pub structures: Vec<Structure>,
    pub callbacks: Vec<Callback>,
    pub functions: Vec<Function>,
}

#[derive(Debug, Default)]
pub struct Api {
    pub opaque_types: Vec<OpaqueType>,
    pub type_aliases: Vec<TypeAlias>,
    pub constants: Vec<Constant>,
    pub enumerations: Vec<Enumeration>,
    pub structures: Vec<Structure>,
    pub callbacks: Vec<Callback>,
    pub functions: Vec<(String, Vec<Function>)>,
    pub docs: HashMap<String, String>,
    names: HashMap<String, Declared>,
}

/// Snapshot of a declaration, used to tell an identical redefinition
/// (allowed, as in C) from a conflicting one.
#[derive(Debug, Clone, PartialEq)]
enum Declared {
    OpaqueType(OpaqueType),
    TypeAlias(TypeAlias),
    Constant(Constant),
    Enumeration(Enumeration),
    Structure(Structure),
    Callback(Callback),
    Function(Function),
}

impl Api {
    fn declare(&mut self, name: &str, declared: Declared) -> Result<bool, Error> {
        match self.names.get(name) {
            Some(existing) if existing == &declared => Ok(false),
            Some(_) => Err(Error::Redefinition(name.to_string())),
            None => {
                self.names.insert(name.to_string(), declared);
                Ok(true)
            }
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    pub fn merge(&mut self, library: Option<Library>, header: Header) -> Result<(), Error> {
        for value in header.opaque_types {
            if self.declare(&value.name, Declared::OpaqueType(value.clone()))? {
                self.opaque_types.push(value);
            }
        }
        for value in header.type_aliases {
            if self.declare(&value.name, Declared::TypeAlias(value.clone()))? {
                self.type_aliases.push(value);
            }
        }
        for value in header.constants {
            if self.declare(&value.name, Declared::Constant(value.clone()))? {
                self.constants.push(value);
            }
        }
        for value in header.enumerations {
            if self.declare(&value.name, Declared::Enumeration(value.clone()))? {
                self.enumerations.push(value);
            }
        }
        for value in header.structures {
            if self.declare(&value.name, Declared::Structure(value.clone()))? {
                self.structures.push(value);
            }
        }
        for value in header.callbacks {
            if self.declare(&value.name, Declared::Callback(value.clone()))? {
                self.callbacks.push(value);
            }
        }

        let link = match library {
            Some(library) => library.name().to_string(),
            None => {
                if !header.functions.is_empty() {
                    tracing::debug!(
                        "{} functions outside the SDK headers ignored",
                        header.functions.len()
                    );
                }
                return Ok(());
            }
        };
        for value in header.functions {
            if !self.declare(&value.name, Declared::Function(value.clone()))? {
                continue;
            }
            match self.functions.iter_mut().find(|(name, _)| name == &link) {
                Some((_, functions)) => functions.push(value),
                None => self.functions.push((link.clone(), vec![value])),
            }
        }
        Ok(())
    }

    pub fn function_count(&self) -> usize {
        self.functions.iter().map(|(_, functions)| functions.len()).sum()
    }
}
