//! Instrument classification and reference-table joins.
//!
//! Classification is a plain ordered rule table so the matching policy can be
//! inspected and tested on its own:
//!
//! - `classify` walks `RULES` and returns the category of the first marker
//!   found in the instrument name
//! - `synthesize_abbreviation` reuses the same table for the fallback
//!   abbreviation templates
//! - `ReferenceTable` performs the exact/partial lookups

use crate::domain::InstrumentType;

pub mod reference;

pub use reference::*;

/// Suffix added to synthesized abbreviations for semiannual-coupon bonds.
const SEMIANNUAL_MARKER: &str = "Juros Semestrais";
const SEMIANNUAL_SUFFIX: &str = " c JS";

/// One classification rule: a literal marker, its category, and the
/// abbreviation prefix used when no reference row matches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassRule {
    pub marker: &'static str,
    pub category: InstrumentType,
    pub abbreviation_prefix: &'static str,
}

/// Ordered by priority; first match wins.
///
/// Markers are the bare family words (`IPCA`, not `IPCA+`), and ` c JS` is
/// only added when the name says "Juros Semestrais", IGPM included.
///
/// Names can carry several tokens, so the inflation markers sit ahead of the
/// generic families and nothing acts as a catch-all.
pub const RULES: [ClassRule; 6] = [
    ClassRule {
        marker: "Prefixado",
        category: InstrumentType::Prefixado,
        abbreviation_prefix: "T Prefixado",
    },
    ClassRule {
        marker: "IPCA",
        category: InstrumentType::Inflacao,
        abbreviation_prefix: "T IPCA",
    },
    ClassRule {
        marker: "IGPM",
        category: InstrumentType::Inflacao,
        abbreviation_prefix: "T IGPM",
    },
    ClassRule {
        marker: "Selic",
        category: InstrumentType::Selic,
        abbreviation_prefix: "T Selic",
    },
    ClassRule {
        marker: "Educa",
        category: InstrumentType::Educa,
        abbreviation_prefix: "T Educa",
    },
    ClassRule {
        marker: "Renda",
        category: InstrumentType::Renda,
        abbreviation_prefix: "T Renda+",
    },
];

/// First rule whose marker appears in `name` (case-sensitive, like the published names).
pub fn matching_rule(name: &str) -> Option<&'static ClassRule> {
    RULES.iter().find(|rule| name.contains(rule.marker))
}

/// Category of an instrument from its free-text name. No match gives `Outro`.
pub fn classify(name: &str) -> InstrumentType {
    matching_rule(name)
        .map(|rule| rule.category)
        .unwrap_or(InstrumentType::Outro)
}

/// Build a display abbreviation from the rule templates.
///
/// `Tesouro IPCA+ com Juros Semestrais` / 2035 becomes `T IPCA c JS 2035`.
/// Names without a known marker fall back to `"<name> <year>"`.
pub fn synthesize_abbreviation(name: &str, maturity_year: i32) -> String {
    let name = name.trim();
    match matching_rule(name) {
        Some(rule) => {
            let suffix = if name.contains(SEMIANNUAL_MARKER) {
                SEMIANNUAL_SUFFIX
            } else {
                ""
            };
            format!("{}{suffix} {maturity_year}", rule.abbreviation_prefix)
        }
        None => format!("{name} {maturity_year}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_follows_rule_order() {
        assert_eq!(classify("Tesouro Prefixado"), InstrumentType::Prefixado);
        assert_eq!(
            classify("Tesouro Prefixado com Juros Semestrais"),
            InstrumentType::Prefixado
        );
        assert_eq!(classify("Tesouro IPCA+"), InstrumentType::Inflacao);
        assert_eq!(
            classify("Tesouro IGPM+ com Juros Semestrais"),
            InstrumentType::Inflacao
        );
        assert_eq!(classify("Tesouro Selic"), InstrumentType::Selic);
        assert_eq!(classify("Tesouro Educa+"), InstrumentType::Educa);
        assert_eq!(
            classify("Tesouro Renda+ Aposentadoria Extra"),
            InstrumentType::Renda
        );
        assert_eq!(classify("Tesouro XPTO"), InstrumentType::Outro);
    }

    #[test]
    fn first_marker_wins_when_several_match() {
        // Contrived, but pins the priority: Prefixado is checked before IPCA.
        assert_eq!(classify("Tesouro Prefixado IPCA"), InstrumentType::Prefixado);
        assert_eq!(classify("Tesouro IPCA Selic"), InstrumentType::Inflacao);
    }

    #[test]
    fn synthesized_abbreviations_use_templates() {
        assert_eq!(
            synthesize_abbreviation("Tesouro Prefixado com Juros Semestrais", 2037),
            "T Prefixado c JS 2037"
        );
        assert_eq!(synthesize_abbreviation("Tesouro IPCA+", 2099), "T IPCA 2099");
        assert_eq!(
            synthesize_abbreviation("Tesouro IGPM+ com Juros Semestrais", 2031),
            "T IGPM c JS 2031"
        );
        assert_eq!(
            synthesize_abbreviation("Tesouro Renda+ Aposentadoria Extra", 2089),
            "T Renda+ 2089"
        );
        assert_eq!(synthesize_abbreviation("Tesouro XPTO", 2099), "Tesouro XPTO 2099");
    }
}
