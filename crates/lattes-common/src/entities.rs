/// In-memory curriculum aggregate.
/// One `Curriculum` is built per source file and consumed once by the repository.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Curriculum (root aggregate)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Curriculum {
    pub researcher: Researcher,
    pub nationality: Option<Nationality>,
    pub expertise: Vec<Expertise>,
    pub education: Vec<Education>,
    pub experience: Vec<Experience>,
    pub address: Option<Address>,
    pub advising: Vec<Advising>,
}

impl Curriculum {
    /// An aggregate with only the researcher identity filled in.
    pub fn empty(researcher_id: impl Into<String>) -> Self {
        Self {
            researcher: Researcher::new(researcher_id),
            nationality: None,
            expertise: Vec::new(),
            education: Vec::new(),
            experience: Vec::new(),
            address: None,
            advising: Vec::new(),
        }
    }

    /// Lattes id of the researcher this curriculum belongs to.
    pub fn id(&self) -> &str {
        &self.researcher.id
    }

    /// Every institution referenced by education, experience and address,
    /// in document order. The same code may appear more than once.
    pub fn institutions(&self) -> impl Iterator<Item = &Institution> {
        self.education
            .iter()
            .filter_map(|e| e.institution.as_ref())
            .chain(self.experience.iter().filter_map(|e| e.institution.as_ref()))
            .chain(self.address.iter().filter_map(|a| a.institution.as_ref()))
    }
}

// ---------------------------------------------------------------------------
// Researcher
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Researcher {
    /// Lattes id, taken from the file name.
    pub id: String,
    pub full_name: Option<String>,
    pub citation_names: Option<String>,
    pub orcid: Option<String>,
    pub abstract_text: Option<String>,
}

impl Researcher {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            full_name: None,
            citation_names: None,
            orcid: None,
            abstract_text: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Nationality {
    pub born_country: Option<String>,
    pub nationality_code: Option<String>,
}

// ---------------------------------------------------------------------------
// Knowledge taxonomy (expertise areas and education study fields)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KnowledgeArea {
    pub major_area: Option<String>,
    pub area: Option<String>,
    pub sub_area: Option<String>,
    pub specialty: Option<String>,
}

impl KnowledgeArea {
    pub fn is_empty(&self) -> bool {
        self.major_area.is_none()
            && self.area.is_none()
            && self.sub_area.is_none()
            && self.specialty.is_none()
    }
}

pub type Expertise = KnowledgeArea;
pub type StudyField = KnowledgeArea;

// ---------------------------------------------------------------------------
// Education / Experience / Address
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Education {
    /// Section tag, e.g. GRADUACAO, MESTRADO, DOUTORADO, POS-DOUTORADO.
    pub category: String,
    pub course: Option<String>,
    pub start_year: Option<i32>,
    pub end_year: Option<i32>,
    pub institution: Option<Institution>,
    pub study_fields: Vec<StudyField>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Experience {
    pub institution: Option<Institution>,
    pub relationship: Option<String>,
    pub role: Option<String>,
    pub start_year: Option<i32>,
    pub end_year: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Address {
    pub country: Option<String>,
    pub state: Option<String>,
    pub city: Option<String>,
    pub neighborhood: Option<String>,
    pub postal_code: Option<String>,
    pub public_place: Option<String>,
    pub institution: Option<Institution>,
}

// ---------------------------------------------------------------------------
// Institution
// ---------------------------------------------------------------------------

/// Identity is `code`; upserted by code in storage.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Institution {
    pub code: String,
    pub name: Option<String>,
    pub abbreviation: Option<String>,
    pub country: Option<String>,
    pub state: Option<String>,
}

impl Institution {
    pub fn new(code: impl Into<String>, name: Option<String>) -> Self {
        Self {
            code: code.into(),
            name,
            abbreviation: None,
            country: None,
            state: None,
        }
    }

    /// Fill fields that are `None` here from `other`. Codes must match.
    pub fn merge_missing(&mut self, other: &Institution) {
        debug_assert_eq!(self.code, other.code);
        if self.name.is_none() {
            self.name = other.name.clone();
        }
        if self.abbreviation.is_none() {
            self.abbreviation = other.abbreviation.clone();
        }
        if self.country.is_none() {
            self.country = other.country.clone();
        }
        if self.state.is_none() {
            self.state = other.state.clone();
        }
    }
}

// ---------------------------------------------------------------------------
// Advising (researcher → researcher edge)
// ---------------------------------------------------------------------------

/// A concluded supervision. `student_id` is a Lattes id resolved at read
/// time; it is not required to exist in storage.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Advising {
    /// Supervision level, e.g. MESTRADO, DOUTORADO, POS-DOUTORADO.
    pub kind: String,
    pub year: Option<i32>,
    pub title: Option<String>,
    pub student_name: Option<String>,
    pub student_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uni(code: &str, name: Option<&str>) -> Institution {
        Institution::new(code, name.map(String::from))
    }

    #[test]
    fn test_institutions_walks_all_sections_in_order() {
        let mut c = Curriculum::empty("0001");
        c.education.push(Education {
            category: "GRADUACAO".into(),
            course: None,
            start_year: None,
            end_year: None,
            institution: Some(uni("A", None)),
            study_fields: vec![],
        });
        c.experience.push(Experience {
            institution: Some(uni("B", None)),
            relationship: None,
            role: None,
            start_year: None,
            end_year: None,
        });
        c.address = Some(Address {
            country: None,
            state: None,
            city: None,
            neighborhood: None,
            postal_code: None,
            public_place: None,
            institution: Some(uni("A", None)),
        });
        let codes: Vec<&str> = c.institutions().map(|i| i.code.as_str()).collect();
        assert_eq!(codes, vec!["A", "B", "A"]);
    }

    #[test]
    fn test_merge_missing_keeps_existing_values() {
        let mut a = uni("X", Some("First"));
        let mut b = uni("X", Some("Second"));
        b.abbreviation = Some("SEC".into());
        a.merge_missing(&b);
        assert_eq!(a.name.as_deref(), Some("First"));
        assert_eq!(a.abbreviation.as_deref(), Some("SEC"));
    }

    #[test]
    fn test_curriculum_serialises() {
        let c = Curriculum::empty("1234567890123456");
        let json = serde_json::to_string(&c).unwrap();
        assert!(json.contains("1234567890123456"));
    }
}
