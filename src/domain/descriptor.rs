// Signal descriptor domain model - identifies one archived signal
use crate::error::ArchiveError;
use std::fmt;
use std::str::FromStr;

/// Primitive type of one archived sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Double,
    Float,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Bool,
    Str,
    /// Enumerated device state, archived as an integer code.
    State,
}

impl ScalarKind {
    pub fn is_numeric(self) -> bool {
        !matches!(self, ScalarKind::Str)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ScalarKind::Double => "double",
            ScalarKind::Float => "float",
            ScalarKind::Int8 => "int8",
            ScalarKind::Int16 => "int16",
            ScalarKind::Int32 => "int32",
            ScalarKind::Int64 => "int64",
            ScalarKind::UInt8 => "uint8",
            ScalarKind::UInt16 => "uint16",
            ScalarKind::UInt32 => "uint32",
            ScalarKind::UInt64 => "uint64",
            ScalarKind::Bool => "bool",
            ScalarKind::Str => "string",
            ScalarKind::State => "state",
        }
    }
}

impl FromStr for ScalarKind {
    type Err = ArchiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "double" => Ok(ScalarKind::Double),
            "float" => Ok(ScalarKind::Float),
            "int8" | "char" => Ok(ScalarKind::Int8),
            "int16" | "short" => Ok(ScalarKind::Int16),
            "int32" | "long" => Ok(ScalarKind::Int32),
            "int64" | "long64" => Ok(ScalarKind::Int64),
            "uint8" | "uchar" => Ok(ScalarKind::UInt8),
            "uint16" | "ushort" => Ok(ScalarKind::UInt16),
            "uint32" | "ulong" => Ok(ScalarKind::UInt32),
            "uint64" | "ulong64" => Ok(ScalarKind::UInt64),
            "bool" | "boolean" => Ok(ScalarKind::Bool),
            "string" => Ok(ScalarKind::Str),
            "state" => Ok(ScalarKind::State),
            other => Err(ArchiveError::Decode(format!("unknown scalar kind: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    Scalar,
    Array,
}

impl FromStr for Shape {
    type Err = ArchiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scalar" => Ok(Shape::Scalar),
            "array" | "spectrum" => Ok(Shape::Array),
            other => Err(ArchiveError::Decode(format!("unknown shape: {other}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Access {
    ReadOnly,
    ReadWrite,
    WriteOnly,
}

impl FromStr for Access {
    type Err = ArchiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ro" | "read-only" => Ok(Access::ReadOnly),
            "rw" | "read-write" => Ok(Access::ReadWrite),
            "wo" | "write-only" => Ok(Access::WriteOnly),
            other => Err(ArchiveError::Decode(format!("unknown access tag: {other}"))),
        }
    }
}

/// Resolved identity of one archived signal. Created by the catalog
/// collaborator, immutable afterwards; drives ValueCodec dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalDescriptor {
    /// Stable backend identifier (e.g. a UUID column value).
    pub id: String,
    /// Fully qualified attribute name.
    pub name: String,
    pub kind: ScalarKind,
    pub shape: Shape,
    pub access: Access,
    pub display_name: String,
}

impl SignalDescriptor {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        kind: ScalarKind,
        shape: Shape,
        access: Access,
    ) -> Self {
        let name = name.into();
        let display_name = SignalName::parse(&name)
            .map(|n| n.attribute)
            .unwrap_or_else(|_| name.clone());
        Self {
            id: id.into(),
            name,
            kind,
            shape,
            access,
            display_name,
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.kind.is_numeric()
    }

    pub fn is_array(&self) -> bool {
        self.shape == Shape::Array
    }

    pub fn has_read_value(&self) -> bool {
        self.access != Access::WriteOnly
    }

    pub fn has_write_value(&self) -> bool {
        self.access != Access::ReadOnly
    }
}

impl fmt::Display for SignalDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:?} {:?})", self.name, self.kind, self.shape)
    }
}

/// Slash-delimited hierarchical signal name:
/// `host:port/domain/family/member/attribute`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalName {
    pub host: String,
    pub domain: String,
    pub family: String,
    pub member: String,
    pub attribute: String,
}

impl SignalName {
    pub fn parse(name: &str) -> Result<Self, ArchiveError> {
        let parts: Vec<&str> = name.split('/').filter(|p| !p.is_empty()).collect();
        if parts.len() != 5 {
            return Err(ArchiveError::NotFound(format!(
                "expected host:port/domain/family/member/attribute, got: {name}"
            )));
        }
        Ok(Self {
            host: parts[0].to_string(),
            domain: parts[1].to_string(),
            family: parts[2].to_string(),
            member: parts[3].to_string(),
            attribute: parts[4].to_string(),
        })
    }
}
