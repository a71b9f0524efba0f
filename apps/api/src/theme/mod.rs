//! Presentation theme derivation from a document's drawing instructions.
//!
//! Derivers are pure functions. A deriver that finds nothing usable returns
//! its documented default and says so through `DerivationOutcome`; defaults
//! are not errors.

pub mod color;
pub mod font;

pub use color::{default_color_theme, derive_color_theme};
pub use font::{default_font_theme, derive_font_theme, derive_font_theme_from_names};

use crate::cache::{ArtifactSource, Computed};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DerivationOutcome {
    Derived,
    Defaulted,
}

/// A deriver result tagged with whether it came from the document or a default.
#[derive(Debug, Clone, PartialEq)]
pub struct Derivation<T> {
    pub value: T,
    pub outcome: DerivationOutcome,
}

impl<T> Derivation<T> {
    pub fn derived(value: T) -> Self {
        Self {
            value,
            outcome: DerivationOutcome::Derived,
        }
    }

    pub fn defaulted(value: T) -> Self {
        Self {
            value,
            outcome: DerivationOutcome::Defaulted,
        }
    }

    pub fn is_defaulted(&self) -> bool {
        self.outcome == DerivationOutcome::Defaulted
    }
}

impl<T> From<Derivation<T>> for Computed<T> {
    fn from(derivation: Derivation<T>) -> Self {
        let source = match derivation.outcome {
            DerivationOutcome::Derived => ArtifactSource::Derived,
            DerivationOutcome::Defaulted => ArtifactSource::Defaulted,
        };
        Computed::new(derivation.value, source)
    }
}
