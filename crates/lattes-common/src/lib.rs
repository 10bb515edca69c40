//! lattes-common — Curriculum aggregate and error types shared by the Lattes crates.

pub mod error;
pub mod entities;

pub use entities::{
    Address, Advising, Curriculum, Education, Experience, Expertise, Institution,
    KnowledgeArea, Nationality, Researcher, StudyField,
};
pub use error::{LattesError, Result};
