//! Curriculum parser.
//!
//! Turns one Lattes XML document plus the researcher id taken from its file
//! name into a [`Curriculum`]. Only a document that is not well-formed fails
//! as a whole; each section is extracted independently and defaults to empty
//! when its substructure is missing.
//!
//! Document layout consumed here:
//!
//! ```text
//! CURRICULO-VITAE
//! ├── DADOS-GERAIS                      researcher, nationality
//! │   ├── RESUMO-CV                     abstract
//! │   ├── ENDERECO/ENDERECO-PROFISSIONAL
//! │   ├── FORMACAO-ACADEMICA-TITULACAO/<category>[/AREAS-DO-CONHECIMENTO]
//! │   ├── ATUACOES-PROFISSIONAIS/ATUACAO-PROFISSIONAL/VINCULOS
//! │   └── AREAS-DE-ATUACAO/AREA-DE-ATUACAO
//! ├── OUTRA-PRODUCAO/ORIENTACOES-CONCLUIDAS/ORIENTACOES-CONCLUIDAS-PARA-*
//! └── DADOS-COMPLEMENTARES/INFORMACOES-ADICIONAIS-INSTITUICOES
//! ```

use std::io::BufRead;

use lattes_common::{
    Address, Advising, Curriculum, Education, Experience, KnowledgeArea, LattesError,
    Nationality, Researcher,
};
use thiserror::Error;
use tracing::debug;

use crate::institution::InstitutionResolver;
use crate::xml::{parse_document, Node};

/// Relationship value meaning "see the free-text other-relationship field".
pub const FREE_RELATIONSHIP: &str = "LIVRE";

const SUPERVISION_PREFIX: &str = "ORIENTACOES-CONCLUIDAS-PARA-";
const STUDY_FIELD_PREFIX: &str = "AREA-DO-CONHECIMENTO";

/// Why a section could not be extracted.
#[derive(Debug, Error, PartialEq)]
pub enum SectionError {
    #[error("section {0} not present")]
    Missing(&'static str),
}

/// Parse one document. `researcher_id` is trusted and not checked against
/// the document content.
pub fn parse_curriculum<R: BufRead>(researcher_id: &str, input: R) -> Result<Curriculum, LattesError> {
    let root = parse_document(input).map_err(|e| LattesError::parse(researcher_id, e))?;
    Ok(extract_curriculum(researcher_id, root.node()))
}

/// Build the aggregate from an already parsed root element.
pub fn extract_curriculum(researcher_id: &str, root: Node<'_>) -> Curriculum {
    let general = root.first("DADOS-GERAIS");
    let mut resolver = InstitutionResolver::new(
        root.path(&["DADOS-COMPLEMENTARES", "INFORMACOES-ADICIONAIS-INSTITUICOES"]),
    );

    let education = education(general, &mut resolver).unwrap_or_else(|e| {
        debug!(researcher_id, reason = %e, "No education extracted");
        Vec::new()
    });
    let experience = experience(general, &mut resolver).unwrap_or_else(|e| {
        debug!(researcher_id, reason = %e, "No experience extracted");
        Vec::new()
    });
    let address = address(general, &mut resolver)
        .map_err(|e| debug!(researcher_id, reason = %e, "No address extracted"))
        .ok();
    let expertise = expertise(general).unwrap_or_else(|e| {
        debug!(researcher_id, reason = %e, "No expertise extracted");
        Vec::new()
    });
    let advising = advising(root).unwrap_or_default();

    Curriculum {
        researcher: researcher(researcher_id, general),
        nationality: nationality(general).ok(),
        expertise,
        education,
        experience,
        address,
        advising,
    }
}

fn researcher(id: &str, general: Node<'_>) -> Researcher {
    Researcher {
        id: id.to_string(),
        full_name: general.text_of("NOME-COMPLETO"),
        citation_names: general.text_of("NOME-EM-CITACOES-BIBLIOGRAFICAS"),
        orcid: general.text_of("ORCID-ID"),
        abstract_text: general.first("RESUMO-CV").text_of("TEXTO-RESUMO-CV-RH"),
    }
}

fn nationality(general: Node<'_>) -> Result<Nationality, SectionError> {
    let nationality = Nationality {
        born_country: general.text_of("PAIS-DE-NASCIMENTO"),
        nationality_code: general.text_of("SIGLA-PAIS-NACIONALIDADE"),
    };
    if nationality.born_country.is_none() && nationality.nationality_code.is_none() {
        return Err(SectionError::Missing("DADOS-GERAIS/nationality"));
    }
    Ok(nationality)
}

fn knowledge_area(node: Node<'_>) -> KnowledgeArea {
    KnowledgeArea {
        major_area: node.text_of("NOME-GRANDE-AREA-DO-CONHECIMENTO"),
        area: node.text_of("NOME-DA-AREA-DO-CONHECIMENTO"),
        sub_area: node.text_of("NOME-DA-SUB-AREA-DO-CONHECIMENTO"),
        specialty: node.text_of("NOME-DA-ESPECIALIDADE"),
    }
}

/// Expertise areas in document order, not deduplicated.
fn expertise(general: Node<'_>) -> Result<Vec<KnowledgeArea>, SectionError> {
    let section = general.first("AREAS-DE-ATUACAO");
    if !section.is_present() {
        return Err(SectionError::Missing("AREAS-DE-ATUACAO"));
    }
    Ok(section
        .all("AREA-DE-ATUACAO")
        .into_iter()
        .map(knowledge_area)
        .filter(|area| !area.is_empty())
        .collect())
}

/// One record per child of FORMACAO-ACADEMICA-TITULACAO; the child tag is the category.
fn education(
    general: Node<'_>,
    resolver: &mut InstitutionResolver<'_>,
) -> Result<Vec<Education>, SectionError> {
    let section = general.first("FORMACAO-ACADEMICA-TITULACAO");
    if !section.is_present() {
        return Err(SectionError::Missing("FORMACAO-ACADEMICA-TITULACAO"));
    }

    let mut records = Vec::new();
    for entry in section.children() {
        let Some(category) = entry.name() else { continue };
        let study_fields = entry
            .first("AREAS-DO-CONHECIMENTO")
            .children()
            .filter(|c| c.name().is_some_and(|n| n.starts_with(STUDY_FIELD_PREFIX)))
            .map(knowledge_area)
            .filter(|area| !area.is_empty())
            .collect();

        records.push(Education {
            category: category.to_string(),
            course: entry.text_of("NOME-CURSO"),
            start_year: entry.int("ANO-DE-INICIO"),
            end_year: entry.int("ANO-DE-CONCLUSAO"),
            institution: resolver.resolve(
                entry.attribute("CODIGO-INSTITUICAO"),
                entry.attribute("NOME-INSTITUICAO"),
            ),
            study_fields,
        });
    }
    Ok(records)
}

/// One record per VINCULOS link inside each ATUACAO-PROFISSIONAL block,
/// all sharing the block's institution.
fn experience(
    general: Node<'_>,
    resolver: &mut InstitutionResolver<'_>,
) -> Result<Vec<Experience>, SectionError> {
    let section = general.first("ATUACOES-PROFISSIONAIS");
    if !section.is_present() {
        return Err(SectionError::Missing("ATUACOES-PROFISSIONAIS"));
    }

    let mut records = Vec::new();
    for bond in section.all("ATUACAO-PROFISSIONAL") {
        let institution = resolver.resolve(
            bond.attribute("CODIGO-INSTITUICAO"),
            bond.attribute("NOME-INSTITUICAO"),
        );
        for link in bond.all("VINCULOS") {
            records.push(Experience {
                institution: institution.clone(),
                relationship: relationship(link),
                role: link
                    .text_of("ENQUADRAMENTO-FUNCIONAL")
                    .or_else(|| link.text_of("OUTRO-ENQUADRAMENTO-FUNCIONAL-INFORMADO")),
                start_year: link.int("ANO-INICIO"),
                end_year: link.int("ANO-FIM"),
            });
        }
    }
    Ok(records)
}

/// The link's relationship, with the free-text value substituted for `LIVRE`.
pub fn relationship(link: Node<'_>) -> Option<String> {
    match link.attribute("TIPO-DE-VINCULO") {
        Some(FREE_RELATIONSHIP) => link.text_of("OUTRO-VINCULO-INFORMADO"),
        other => other.map(str::to_string),
    }
}

fn address(
    general: Node<'_>,
    resolver: &mut InstitutionResolver<'_>,
) -> Result<Address, SectionError> {
    let node = general.path(&["ENDERECO", "ENDERECO-PROFISSIONAL"]);
    if !node.is_present() {
        return Err(SectionError::Missing("ENDERECO-PROFISSIONAL"));
    }
    Ok(Address {
        country: node.text_of("PAIS"),
        state: node.text_of("UF"),
        city: node.text_of("CIDADE"),
        neighborhood: node.text_of("BAIRRO"),
        postal_code: node.text_of("CEP"),
        public_place: node.text_of("LOGRADOURO-COMPLEMENTO"),
        institution: resolver.resolve(
            node.attribute("CODIGO-INSTITUICAO-EMPRESA"),
            node.attribute("NOME-INSTITUICAO-EMPRESA"),
        ),
    })
}

/// Concluded supervisions, one per ORIENTACOES-CONCLUIDAS-PARA-* entry.
fn advising(root: Node<'_>) -> Result<Vec<Advising>, SectionError> {
    let section = root.path(&["OUTRA-PRODUCAO", "ORIENTACOES-CONCLUIDAS"]);
    if !section.is_present() {
        return Err(SectionError::Missing("ORIENTACOES-CONCLUIDAS"));
    }

    let mut records = Vec::new();
    for entry in section.children() {
        let Some(name) = entry.name() else { continue };
        let Some(kind) = name.strip_prefix(SUPERVISION_PREFIX) else { continue };
        let basic = entry.first(&format!("DADOS-BASICOS-DE-{name}"));
        let detail = entry.first(&format!("DETALHAMENTO-DE-{name}"));
        records.push(Advising {
            kind: kind.to_string(),
            year: basic.int("ANO"),
            title: basic.text_of("TITULO"),
            student_name: detail.text_of("NOME-DO-ORIENTADO"),
            student_id: detail.text_of("NUMERO-ID-ORIENTADO"),
        });
    }
    Ok(records)
}
