//! Static dictionary of institutions and their common abbreviations

use once_cell::sync::Lazy;

use super::normalize::normalize;

/// Canonical institution name and the aliases it is known by
#[derive(Debug, Clone, Copy)]
pub struct InstitutionEntry {
    pub canonical: &'static str,
    pub aliases: &'static [&'static str],
}

/// Order matters: the matcher stops at the first entry found in the document.
pub const INSTITUTIONS: &[InstitutionEntry] = &[
    InstitutionEntry {
        canonical: "Universidade de São Paulo",
        aliases: &["usp"],
    },
    InstitutionEntry {
        canonical: "Universidade Federal do Rio de Janeiro",
        aliases: &["ufrj"],
    },
    InstitutionEntry {
        canonical: "Universidade Estadual de Campinas",
        aliases: &["unicamp"],
    },
    InstitutionEntry {
        canonical: "Universidade Federal de Minas Gerais",
        aliases: &["ufmg"],
    },
    InstitutionEntry {
        canonical: "Universidade Federal do Paraná",
        aliases: &["ufpr"],
    },
    InstitutionEntry {
        canonical: "Universidade Tecnológica Federal do Paraná",
        aliases: &["utfpr"],
    },
    InstitutionEntry {
        canonical: "Pontifícia Universidade Católica",
        aliases: &["puc", "puc-rio", "puc-sp", "puc-mg", "puc-pr"],
    },
    InstitutionEntry {
        canonical: "Universidade Federal de Santa Catarina",
        aliases: &["ufsc"],
    },
    InstitutionEntry {
        canonical: "Universidade Federal do Rio Grande do Sul",
        aliases: &["ufrgs"],
    },
    InstitutionEntry {
        canonical: "Universidade de Brasília",
        aliases: &["unb"],
    },
    InstitutionEntry {
        canonical: "Universidade Federal da Bahia",
        aliases: &["ufba"],
    },
    InstitutionEntry {
        canonical: "Universidade Federal de Pernambuco",
        aliases: &["ufpe"],
    },
    InstitutionEntry {
        canonical: "Universidade Federal do Ceará",
        aliases: &["ufc"],
    },
    InstitutionEntry {
        canonical: "Universidade Federal Fluminense",
        aliases: &["uff"],
    },
    InstitutionEntry {
        canonical: "Universidade Federal de Goiás",
        aliases: &["ufg"],
    },
];

/// An entry with every name pre-normalized
#[derive(Debug)]
pub(crate) struct NormalizedEntry {
    pub canonical: &'static str,
    pub names: Vec<String>,
}

/// Built once on first use; the table itself never changes.
pub(crate) static NORMALIZED: Lazy<Vec<NormalizedEntry>> = Lazy::new(|| {
    INSTITUTIONS
        .iter()
        .map(|entry| NormalizedEntry {
            canonical: entry.canonical,
            names: std::iter::once(entry.canonical)
                .chain(entry.aliases.iter().copied())
                .map(normalize)
                .collect(),
        })
        .collect()
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalized_table_matches_source() {
        assert_eq!(NORMALIZED.len(), INSTITUTIONS.len());
        assert_eq!(NORMALIZED[0].names, vec!["universidade de sao paulo", "usp"]);
    }
}
