//! Caller scope
//!
//! Every request acts within a scope: a single school, or a district that
//! covers all of its member schools. Scope is established from the bearer
//! token and enforced server-side; identifiers supplied in request bodies
//! are never trusted to widen it.

mod errors;
mod registry;
mod token;

pub use errors::{ScopeError, ScopeResult};
pub use registry::{SchoolDirectory, StaticDirectory};
pub use token::{ScopeClaims, ScopeRole, TokenConfig, TokenVerifier};

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// School identifier issued by the school/district registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchoolId(Uuid);

impl SchoolId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl From<Uuid> for SchoolId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl Default for SchoolId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SchoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// District identifier issued by the school/district registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DistrictId(Uuid);

impl DistrictId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl From<Uuid> for DistrictId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl Default for DistrictId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DistrictId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// The set of schools a caller may see and act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// A single school.
    School(SchoolId),
    /// Every school under the district, resolved through the registry.
    District(DistrictId),
}

impl Scope {
    /// Whether this scope covers the given school.
    pub fn covers(&self, school: SchoolId, directory: &dyn SchoolDirectory) -> bool {
        match self {
            Scope::School(own) => *own == school,
            Scope::District(district) => directory.district_of(school) == Some(*district),
        }
    }

    /// Whether this is a district scope.
    pub fn is_district(&self) -> bool {
        matches!(self, Scope::District(_))
    }

    /// Resolve the scope to its member schools.
    pub fn schools(&self, directory: &dyn SchoolDirectory) -> Vec<SchoolId> {
        match self {
            Scope::School(school) => vec![*school],
            Scope::District(district) => directory.schools_in(*district),
        }
    }
}
