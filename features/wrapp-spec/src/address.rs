use std::fmt;

use crate::errors::AddressError;

/// Dotted path of field names, e.g. `engine_config.engine`
///
/// Every field reachable from a root config has exactly one canonical
/// address: the path under which it was first reached during instantiation.
/// Canonical addresses double as cache keys.
#[derive(Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(Vec<String>);

impl Address {
    /// The address of the root config itself
    pub fn root() -> Self {
        Address(Vec::new())
    }

    /// Parses a dotted path, rejecting empty paths and empty segments
    pub fn parse(path: &str) -> Result<Self, AddressError> {
        if path.is_empty() {
            return Err(AddressError::Invalid(path.to_string()));
        }

        let segments = path.split('.').map(str::to_string).collect::<Vec<_>>();
        if segments.iter().any(|segment| segment.trim().is_empty()) {
            return Err(AddressError::Invalid(path.to_string()));
        }

        Ok(Address(segments))
    }

    pub fn join(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment.into());
        Address(segments)
    }

    /// Appends all segments of `other`
    pub fn concat(&self, other: &Address) -> Self {
        let mut segments = self.0.clone();
        segments.extend(other.0.iter().cloned());
        Address(segments)
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Last segment, the field name
    pub fn name(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    /// Splits into the path of the owning config and the field name
    pub fn split_last(&self) -> Option<(Address, &str)> {
        let (last, parent) = self.0.split_last()?;
        Some((Address(parent.to_vec()), last.as_str()))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("<root>");
        }
        f.write_str(&self.0.join("."))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({self})")
    }
}
