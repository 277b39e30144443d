//! Canonical display names for tenants.
//!
//! Duplicate tenant rows come from inconsistent signup input: stray
//! punctuation, a possessive here, the product name tacked on there.
//! Normalization is the pure function both the grouper and the renames
//! agree on.

/// Suffix sets stripped from the end of a name. Configurable because the
/// exact set of branding noise tokens is deployment-specific.
#[derive(Debug, Clone)]
pub struct NormalizerConfig {
    /// Product/branding tokens, including possessive forms (e.g. "pos",
    /// "pos's")
    pub boilerplate_suffixes: Vec<String>,
    /// Generic business nouns (e.g. "company")
    pub business_suffixes: Vec<String>,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            boilerplate_suffixes: vec!["pos".to_string(), "pos's".to_string()],
            business_suffixes: vec!["company".to_string()],
        }
    }
}

/// Normalize a raw tenant name to its canonical display form.
///
/// The steps are order-sensitive: boilerplate stripping runs again after
/// the possessive marker is removed so "<Name> <Suffix>'s" collapses
/// fully. Pure and idempotent; empty input yields an empty string.
pub fn normalize_name(raw: &str, config: &NormalizerConfig) -> String {
    let mut name = raw.trim().to_string();
    if name.is_empty() {
        return String::new();
    }

    name = name.replace(['\u{2018}', '\u{2019}', '`'], "'");
    name = name.replace(['_', '.'], " ");
    name = collapse_whitespace(&name);
    name = strip_trailing_token(&name, &config.boilerplate_suffixes);
    name = strip_trailing_token(&name, &config.business_suffixes);
    name = strip_trailing_possessive(&name);
    name = strip_trailing_token(&name, &config.boilerplate_suffixes);
    name = collapse_whitespace(&name);
    title_case(&name)
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Strip the last whitespace-separated word when it matches one of the
/// suffixes, case-insensitively
fn strip_trailing_token(s: &str, suffixes: &[String]) -> String {
    let trimmed = s.trim_end();
    let last = trimmed.rsplit(' ').next().unwrap_or("");
    if !last.is_empty()
        && suffixes
            .iter()
            .any(|suffix| last.eq_ignore_ascii_case(suffix))
    {
        trimmed[..trimmed.len() - last.len()].trim_end().to_string()
    } else {
        trimmed.to_string()
    }
}

fn strip_trailing_possessive(s: &str) -> String {
    let trimmed = s.trim_end();
    if let Some(stripped) = trimmed
        .strip_suffix("'s")
        .or_else(|| trimmed.strip_suffix("'S"))
    {
        return stripped.trim_end().to_string();
    }
    if let Some(stripped) = trimmed.strip_suffix('\'') {
        return stripped.trim_end().to_string();
    }
    trimmed.to_string()
}

/// Uppercase the first character of each word and lowercase the rest.
/// Acronyms are not special-cased.
fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(|c| c.to_lowercase()))
                    .collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalize(raw: &str) -> String {
        normalize_name(raw, &NormalizerConfig::default())
    }

    #[test]
    fn test_empty_and_blank_input() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   "), "");
        assert_eq!(normalize("\t\n"), "");
    }

    #[test]
    fn test_duplicate_variants_collapse() {
        // The three spellings a duplicate group typically arrives in
        assert_eq!(normalize("Acme Pos"), "Acme");
        assert_eq!(normalize("acme"), "Acme");
        assert_eq!(normalize("Acme's Company"), "Acme");
    }

    #[test]
    fn test_punctuation_and_whitespace() {
        assert_eq!(normalize("  acme_store  "), "Acme Store");
        assert_eq!(normalize("acme.store"), "Acme Store");
        assert_eq!(normalize("acme    store"), "Acme Store");
    }

    #[test]
    fn test_apostrophe_variants_unify() {
        assert_eq!(normalize("Acme\u{2019}s Company"), "Acme");
        assert_eq!(normalize("Acme`s Company"), "Acme");
    }

    #[test]
    fn test_boilerplate_after_possessive() {
        // "<Name> <Suffix>'s" needs the second boilerplate pass
        assert_eq!(normalize("Acme Pos's"), "Acme");
    }

    #[test]
    fn test_trailing_possessive_alone() {
        assert_eq!(normalize("Fatima's"), "Fatima");
        assert_eq!(normalize("Fatimas'"), "Fatimas");
    }

    #[test]
    fn test_suffix_only_in_trailing_position() {
        // "pos" mid-name is part of the name, not boilerplate
        assert_eq!(normalize("pos world supplies"), "Pos World Supplies");
    }

    #[test]
    fn test_title_casing() {
        assert_eq!(normalize("JOE'S BAKERY pos"), "Joe's Bakery");
        assert_eq!(normalize("the corner store"), "The Corner Store");
    }

    #[test]
    fn test_normalization_is_idempotent() {
        let inputs = [
            "Acme Pos",
            "acme",
            "Acme's Company",
            "  weird _ name.with.dots  ",
            "O\u{2019}Brien's Company Pos",
            "ALLCAPS STORE",
            "",
        ];
        let config = NormalizerConfig::default();
        for input in inputs {
            let once = normalize_name(input, &config);
            let twice = normalize_name(&once, &config);
            assert_eq!(once, twice, "not idempotent for {input:?}");
        }
    }

    #[test]
    fn test_configurable_suffixes() {
        let config = NormalizerConfig {
            boilerplate_suffixes: vec!["sellfast".to_string(), "sellfast's".to_string()],
            business_suffixes: vec!["shop".to_string()],
        };
        assert_eq!(normalize_name("Acme SellFast", &config), "Acme");
        assert_eq!(normalize_name("Acme Shop", &config), "Acme");
        // Default boilerplate no longer stripped
        assert_eq!(normalize_name("Acme Pos", &config), "Acme Pos");
    }
}
