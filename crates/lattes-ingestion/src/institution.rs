//! Institution cross-referencing.
//!
//! Education, experience and address records only carry an institution code
//! and name. Abbreviation, country and state live in the document-local
//! `DADOS-COMPLEMENTARES/INFORMACOES-ADICIONAIS-INSTITUICOES` section and are
//! joined in here by exact code match.

use std::collections::HashMap;

use lattes_common::Institution;

use crate::xml::Node;

const ADDITIONAL_INFO: &str = "INFORMACAO-ADICIONAL-INSTITUICAO";

/// Resolves institution references for one document.
///
/// The first reference to a code fixes the resolved value; every later
/// reference to the same code gets an equal `Institution`.
pub struct InstitutionResolver<'a> {
    additional_info: Node<'a>,
    resolved: HashMap<String, Institution>,
}

impl<'a> InstitutionResolver<'a> {
    /// `additional_info` is the `INFORMACOES-ADICIONAIS-INSTITUICOES` node;
    /// it may be absent.
    pub fn new(additional_info: Node<'a>) -> Self {
        Self {
            additional_info,
            resolved: HashMap::new(),
        }
    }

    /// Resolve a reference. Returns `None` when the record has no code.
    pub fn resolve(&mut self, code: Option<&str>, name: Option<&str>) -> Option<Institution> {
        let code = code?;
        if let Some(known) = self.resolved.get(code) {
            return Some(known.clone());
        }

        let mut institution = Institution::new(code, name.map(str::to_string));
        if let Some(info) = self.lookup(code) {
            institution.abbreviation = info.text_of("SIGLA-INSTITUICAO");
            institution.country = info.text_of("NOME-PAIS-INSTITUICAO");
            institution.state = info.text_of("SIGLA-UF-INSTITUICAO");
        }

        self.resolved.insert(code.to_string(), institution.clone());
        Some(institution)
    }

    fn lookup(&self, code: &str) -> Option<Node<'a>> {
        self.additional_info
            .all(ADDITIONAL_INFO)
            .into_iter()
            .find(|entry| entry.attribute("CODIGO-INSTITUICAO") == Some(code))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::parse_document;

    const INFO: &str = r#"
<INFORMACOES-ADICIONAIS-INSTITUICOES>
  <INFORMACAO-ADICIONAL-INSTITUICAO CODIGO-INSTITUICAO="UNI001" SIGLA-INSTITUICAO="USP"
      NOME-PAIS-INSTITUICAO="Brasil" SIGLA-UF-INSTITUICAO="SP"/>
  <INFORMACAO-ADICIONAL-INSTITUICAO CODIGO-INSTITUICAO="UNI001" SIGLA-INSTITUICAO="DUP"/>
  <INFORMACAO-ADICIONAL-INSTITUICAO CODIGO-INSTITUICAO="UNI002" SIGLA-INSTITUICAO=""/>
</INFORMACOES-ADICIONAIS-INSTITUICOES>"#;

    #[test]
    fn test_first_matching_entry_wins() {
        let doc = parse_document(INFO.as_bytes()).unwrap();
        let mut resolver = InstitutionResolver::new(doc.node());
        let usp = resolver.resolve(Some("UNI001"), Some("Universidade de São Paulo")).unwrap();
        assert_eq!(usp.name.as_deref(), Some("Universidade de São Paulo"));
        assert_eq!(usp.abbreviation.as_deref(), Some("USP"));
        assert_eq!(usp.country.as_deref(), Some("Brasil"));
        assert_eq!(usp.state.as_deref(), Some("SP"));
    }

    #[test]
    fn test_no_match_leaves_fields_empty() {
        let doc = parse_document(INFO.as_bytes()).unwrap();
        let mut resolver = InstitutionResolver::new(doc.node());
        let other = resolver.resolve(Some("UNI999"), Some("Outra")).unwrap();
        assert_eq!(other.name.as_deref(), Some("Outra"));
        assert_eq!(other.abbreviation, None);
        assert_eq!(other.country, None);

        let empty = resolver.resolve(Some("UNI002"), None).unwrap();
        assert_eq!(empty.abbreviation, None, "empty attribute means no value");
    }

    #[test]
    fn test_same_code_resolves_to_equal_values() {
        let doc = parse_document(INFO.as_bytes()).unwrap();
        let mut resolver = InstitutionResolver::new(doc.node());
        let a = resolver.resolve(Some("UNI001"), Some("Universidade de São Paulo"));
        let b = resolver.resolve(Some("UNI001"), Some("USP - Campus Capital"));
        let c = resolver.resolve(Some("UNI001"), None);
        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(a.and_then(|i| i.name).as_deref(), Some("Universidade de São Paulo"));
    }

    #[test]
    fn test_missing_code_or_section() {
        let mut resolver = InstitutionResolver::new(Node::absent());
        assert_eq!(resolver.resolve(None, Some("Sem código")), None);
        let inst = resolver.resolve(Some("X"), Some("Nome")).unwrap();
        assert_eq!(inst.abbreviation, None);
        assert_eq!(resolver.resolve(Some("X"), None), Some(inst));
    }
}
