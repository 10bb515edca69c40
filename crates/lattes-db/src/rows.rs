//! Flattening of curriculum aggregates into per-table rows.
//!
//! Collapses intra-batch duplicates by natural key before a batch is
//! written. This only reduces collisions inside one batch; rows already in
//! storage are handled by delete-and-reinsert (researcher-owned tables) and
//! upsert (institutions).

use std::collections::{HashMap, HashSet};

use lattes_common::{
    Address, Advising, Curriculum, Education, Experience, Institution, KnowledgeArea,
    Nationality, Researcher,
};
use serde::{Deserialize, Serialize};

/// Which natural keys are used to collapse rows inside one batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DedupScope {
    /// Keys include the researcher id: only a researcher's own repeated rows collapse.
    #[default]
    PerResearcher,
    /// Keys omit the researcher id: identical rows from different researchers
    /// in the same batch collapse into the first one.
    Global,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExpertiseRow {
    pub researcher_id: String,
    pub position: i64,
    pub area: KnowledgeArea,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EducationRow {
    pub researcher_id: String,
    pub category: String,
    pub course: Option<String>,
    pub start_year: Option<i32>,
    pub end_year: Option<i32>,
    pub institution_code: Option<String>,
    pub study_fields: Vec<KnowledgeArea>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExperienceRow {
    pub researcher_id: String,
    pub institution_code: Option<String>,
    pub relationship: Option<String>,
    pub role: Option<String>,
    pub start_year: Option<i32>,
    pub end_year: Option<i32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AddressRow {
    pub researcher_id: String,
    pub address: Address,
    pub institution_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AdvisingRow {
    pub advisor_id: String,
    pub advising: Advising,
}

/// Rows of one batch, ready for a single transaction.
#[derive(Debug, Clone, Default)]
pub struct BatchRows {
    pub researchers: Vec<Researcher>,
    pub nationalities: Vec<(String, Nationality)>,
    pub expertise: Vec<ExpertiseRow>,
    pub education: Vec<EducationRow>,
    pub experience: Vec<ExperienceRow>,
    pub addresses: Vec<AddressRow>,
    pub institutions: Vec<Institution>,
    pub advising: Vec<AdvisingRow>,
}

type EducationKey = (Option<String>, String, Option<String>, Option<i32>, Option<i32>, Option<String>);
type ExperienceKey = (Option<String>, Option<String>, Option<String>, Option<String>, Option<i32>, Option<i32>);
type AdvisingKey = (String, Option<String>, String, Option<i32>);

impl BatchRows {
    /// Flatten `batch` into table rows, collapsing duplicates per `scope`.
    ///
    /// If the same researcher id appears more than once, the last
    /// curriculum in batch order replaces the earlier ones.
    pub fn collect(batch: &[Curriculum], scope: DedupScope) -> Self {
        let mut rows = BatchRows::default();

        let mut last_index: HashMap<&str, usize> = HashMap::new();
        for (i, c) in batch.iter().enumerate() {
            last_index.insert(c.id(), i);
        }

        let mut institution_index: HashMap<String, usize> = HashMap::new();
        let mut expertise_keys: HashSet<(Option<String>, KnowledgeArea)> = HashSet::new();
        let mut education_index: HashMap<EducationKey, usize> = HashMap::new();
        let mut experience_keys: HashSet<ExperienceKey> = HashSet::new();
        let mut advising_keys: HashSet<AdvisingKey> = HashSet::new();

        for (i, c) in batch.iter().enumerate() {
            if last_index.get(c.id()) != Some(&i) {
                tracing::debug!(researcher_id = %c.id(), "Superseded by a later curriculum in the same batch");
                continue;
            }
            let rid = c.id().to_string();
            let scoped = |id: &str| match scope {
                DedupScope::PerResearcher => Some(id.to_string()),
                DedupScope::Global => None,
            };

            for inst in c.institutions() {
                match institution_index.get(&inst.code) {
                    Some(&idx) => rows.institutions[idx].merge_missing(inst),
                    None => {
                        institution_index.insert(inst.code.clone(), rows.institutions.len());
                        rows.institutions.push(inst.clone());
                    }
                }
            }

            rows.researchers.push(c.researcher.clone());

            if let Some(n) = &c.nationality {
                rows.nationalities.push((rid.clone(), n.clone()));
            }

            let mut position = 0;
            for area in &c.expertise {
                if !expertise_keys.insert((scoped(&rid), area.clone())) {
                    continue;
                }
                rows.expertise.push(ExpertiseRow {
                    researcher_id: rid.clone(),
                    position,
                    area: area.clone(),
                });
                position += 1;
            }

            for edu in &c.education {
                let key = education_key(scoped(&rid), edu);
                match education_index.get(&key) {
                    Some(&idx) => {
                        let fields = &mut rows.education[idx].study_fields;
                        for field in &edu.study_fields {
                            if !fields.contains(field) {
                                fields.push(field.clone());
                            }
                        }
                    }
                    None => {
                        education_index.insert(key, rows.education.len());
                        rows.education.push(education_row(&rid, edu));
                    }
                }
            }

            for exp in &c.experience {
                if !experience_keys.insert(experience_key(scoped(&rid), exp)) {
                    continue;
                }
                rows.experience.push(ExperienceRow {
                    researcher_id: rid.clone(),
                    institution_code: exp.institution.as_ref().map(|i| i.code.clone()),
                    relationship: exp.relationship.clone(),
                    role: exp.role.clone(),
                    start_year: exp.start_year,
                    end_year: exp.end_year,
                });
            }

            if let Some(addr) = &c.address {
                rows.addresses.push(AddressRow {
                    researcher_id: rid.clone(),
                    institution_code: addr.institution.as_ref().map(|i| i.code.clone()),
                    address: addr.clone(),
                });
            }

            // Advising edges are always keyed by their advisor.
            for adv in &c.advising {
                if advising_keys.insert(advising_key(&rid, adv)) {
                    rows.advising.push(AdvisingRow {
                        advisor_id: rid.clone(),
                        advising: adv.clone(),
                    });
                }
            }
        }

        rows
    }

    pub fn is_empty(&self) -> bool {
        self.researchers.is_empty()
    }

    /// Total rows across all tables, study fields included.
    pub fn row_count(&self) -> usize {
        self.researchers.len()
            + self.nationalities.len()
            + self.expertise.len()
            + self.education.len()
            + self.education.iter().map(|e| e.study_fields.len()).sum::<usize>()
            + self.experience.len()
            + self.addresses.len()
            + self.institutions.len()
            + self.advising.len()
    }
}

fn education_key(scope_id: Option<String>, edu: &Education) -> EducationKey {
    (
        scope_id,
        edu.category.clone(),
        edu.course.clone(),
        edu.start_year,
        edu.end_year,
        edu.institution.as_ref().map(|i| i.code.clone()),
    )
}

fn education_row(researcher_id: &str, edu: &Education) -> EducationRow {
    let mut study_fields: Vec<KnowledgeArea> = Vec::with_capacity(edu.study_fields.len());
    for field in &edu.study_fields {
        if !study_fields.contains(field) {
            study_fields.push(field.clone());
        }
    }
    EducationRow {
        researcher_id: researcher_id.to_string(),
        category: edu.category.clone(),
        course: edu.course.clone(),
        start_year: edu.start_year,
        end_year: edu.end_year,
        institution_code: edu.institution.as_ref().map(|i| i.code.clone()),
        study_fields,
    }
}

fn experience_key(scope_id: Option<String>, exp: &Experience) -> ExperienceKey {
    (
        scope_id,
        exp.institution.as_ref().map(|i| i.code.clone()),
        exp.relationship.clone(),
        exp.role.clone(),
        exp.start_year,
        exp.end_year,
    )
}

/// Student id when known, otherwise the student's name.
fn advising_key(advisor_id: &str, adv: &Advising) -> AdvisingKey {
    (
        advisor_id.to_string(),
        adv.student_id.clone().or_else(|| adv.student_name.clone()),
        adv.kind.clone(),
        adv.year,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn area(name: &str) -> KnowledgeArea {
        KnowledgeArea {
            major_area: Some("CIENCIAS_EXATAS_E_DA_TERRA".into()),
            area: Some(name.into()),
            sub_area: None,
            specialty: None,
        }
    }

    fn masters(code: &str) -> Education {
        Education {
            category: "MESTRADO".into(),
            course: Some("Ciência da Computação".into()),
            start_year: Some(2008),
            end_year: Some(2010),
            institution: Some(Institution::new(code, Some("Universidade".into()))),
            study_fields: vec![area("Computação")],
        }
    }

    fn curriculum(id: &str) -> Curriculum {
        let mut c = Curriculum::empty(id);
        c.expertise = vec![area("Computação"), area("Computação"), area("Matemática")];
        c.education = vec![masters("UNI001"), masters("UNI001")];
        c
    }

    #[test]
    fn test_collapses_duplicates_within_one_researcher() {
        let rows = BatchRows::collect(&[curriculum("A")], DedupScope::PerResearcher);
        assert_eq!(rows.expertise.len(), 2);
        assert_eq!(rows.expertise[1].position, 1);
        assert_eq!(rows.education.len(), 1);
        assert_eq!(rows.education[0].study_fields.len(), 1);
        assert_eq!(rows.institutions.len(), 1);
    }

    #[test]
    fn test_per_researcher_scope_keeps_rows_of_each_researcher() {
        let rows = BatchRows::collect(&[curriculum("A"), curriculum("B")], DedupScope::PerResearcher);
        assert_eq!(rows.researchers.len(), 2);
        assert_eq!(rows.education.len(), 2);
        assert_eq!(rows.expertise.len(), 4);
        assert_eq!(rows.institutions.len(), 1, "institutions collapse by code regardless of scope");
    }

    #[test]
    fn test_global_scope_collapses_across_researchers() {
        let rows = BatchRows::collect(&[curriculum("A"), curriculum("B")], DedupScope::Global);
        assert_eq!(rows.researchers.len(), 2);
        assert_eq!(rows.education.len(), 1);
        assert_eq!(rows.education[0].researcher_id, "A");
        assert_eq!(rows.expertise.len(), 2);
    }

    #[test]
    fn test_repeated_researcher_keeps_last_curriculum() {
        let first = curriculum("A");
        let mut second = Curriculum::empty("A");
        second.researcher.full_name = Some("Second".into());
        let rows = BatchRows::collect(&[first, second], DedupScope::PerResearcher);
        assert_eq!(rows.researchers.len(), 1);
        assert_eq!(rows.researchers[0].full_name.as_deref(), Some("Second"));
        assert!(rows.education.is_empty());
    }

    #[test]
    fn test_institution_fields_filled_from_later_reference() {
        let mut a = Curriculum::empty("A");
        a.education = vec![masters("UNI002")];
        let mut b = Curriculum::empty("B");
        let mut edu = masters("UNI002");
        if let Some(inst) = edu.institution.as_mut() {
            inst.abbreviation = Some("U2".into());
        }
        b.education = vec![edu];
        let rows = BatchRows::collect(&[a, b], DedupScope::PerResearcher);
        assert_eq!(rows.institutions.len(), 1);
        assert_eq!(rows.institutions[0].abbreviation.as_deref(), Some("U2"));
    }

    fn advising(student_id: Option<&str>, student_name: &str, title: &str) -> Advising {
        Advising {
            kind: "MESTRADO".into(),
            year: Some(2015),
            title: Some(title.into()),
            student_name: Some(student_name.into()),
            student_id: student_id.map(String::from),
        }
    }

    #[test]
    fn test_advising_collapses_on_student_kind_and_year() {
        let mut c = Curriculum::empty("A");
        c.advising = vec![
            advising(Some("S1"), "Maria", "Título original"),
            advising(Some("S1"), "Maria S.", "Título revisado"),
            advising(None, "João", "Outro trabalho"),
            advising(None, "João", "Outro trabalho (versão final)"),
            advising(None, "Ana", "Outro trabalho"),
        ];
        let rows = BatchRows::collect(&[c], DedupScope::PerResearcher);
        let students: Vec<_> = rows
            .advising
            .iter()
            .map(|r| r.advising.student_name.as_deref().unwrap_or_default())
            .collect();
        assert_eq!(students, vec!["Maria", "João", "Ana"]);
        assert_eq!(rows.advising[0].advising.title.as_deref(), Some("Título original"));
    }
}
