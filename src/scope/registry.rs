//! School/district registry collaborator
//!
//! The registry is owned by another system; the ledger only needs to know
//! which schools exist and which district each belongs to. The trait is the
//! seam; `StaticDirectory` is the in-process implementation seeded from
//! configuration.

use std::collections::HashMap;

use uuid::Uuid;

use super::{DistrictId, SchoolId};

/// Read-only view of the school/district registry.
pub trait SchoolDirectory: Send + Sync {
    /// Whether the school is known to the registry.
    fn school_exists(&self, school: SchoolId) -> bool;

    /// The district a school belongs to, if the school is known.
    fn district_of(&self, school: SchoolId) -> Option<DistrictId>;

    /// All schools under a district. Empty for unknown districts.
    fn schools_in(&self, district: DistrictId) -> Vec<SchoolId>;
}

/// Directory backed by a fixed district-to-schools mapping.
///
/// A school belongs to at most one district; re-adding a school moves it.
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    schools_by_district: HashMap<DistrictId, Vec<SchoolId>>,
    district_by_school: HashMap<SchoolId, DistrictId>,
}

impl StaticDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a school under a district.
    pub fn add_school(&mut self, district: DistrictId, school: SchoolId) {
        if let Some(previous) = self.district_by_school.insert(school, district) {
            if let Some(schools) = self.schools_by_district.get_mut(&previous) {
                schools.retain(|s| *s != school);
            }
        }
        let schools = self.schools_by_district.entry(district).or_default();
        if !schools.contains(&school) {
            schools.push(school);
        }
    }

    /// Build a directory from raw configuration identifiers.
    pub fn from_map(districts: &HashMap<Uuid, Vec<Uuid>>) -> Self {
        let mut directory = Self::new();
        for (district, schools) in districts {
            for school in schools {
                directory.add_school(DistrictId::from(*district), SchoolId::from(*school));
            }
        }
        directory
    }
}

impl SchoolDirectory for StaticDirectory {
    fn school_exists(&self, school: SchoolId) -> bool {
        self.district_by_school.contains_key(&school)
    }

    fn district_of(&self, school: SchoolId) -> Option<DistrictId> {
        self.district_by_school.get(&school).copied()
    }

    fn schools_in(&self, district: DistrictId) -> Vec<SchoolId> {
        self.schools_by_district
            .get(&district)
            .cloned()
            .unwrap_or_default()
    }
}
