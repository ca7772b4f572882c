//! English plural forms for resource names
//!
//! Resource names are lowercase identifiers ("note", "blog_post"); only the
//! last word of a snake_case name is inflected.

/// Utility for deriving URL collection names from singular resource names
pub struct Pluralizer;

const IRREGULAR: &[(&str, &str)] = &[
    ("person", "people"),
    ("child", "children"),
    ("man", "men"),
    ("woman", "women"),
    ("mouse", "mice"),
    ("datum", "data"),
    ("index", "indices"),
];

const UNCOUNTABLE: &[&str] = &["media", "news", "series", "species", "metadata", "info"];

impl Pluralizer {
    /// Convert a singular noun to its plural form
    ///
    /// # Examples
    ///
    /// ```
    /// use cms_builder::core::pluralize::Pluralizer;
    ///
    /// assert_eq!(Pluralizer::pluralize("user"), "users");
    /// assert_eq!(Pluralizer::pluralize("category"), "categories");
    /// assert_eq!(Pluralizer::pluralize("blog_post"), "blog_posts");
    /// assert_eq!(Pluralizer::pluralize("person"), "people");
    /// ```
    pub fn pluralize(singular: &str) -> String {
        let (prefix, word) = match singular.rfind('_') {
            Some(i) => singular.split_at(i + 1),
            None => ("", singular),
        };

        format!("{}{}", prefix, Self::pluralize_word(word))
    }

    fn pluralize_word(word: &str) -> String {
        if word.is_empty() || UNCOUNTABLE.contains(&word) {
            return word.to_string();
        }
        if let Some((_, plural)) = IRREGULAR.iter().find(|(s, _)| *s == word) {
            return plural.to_string();
        }

        let ends_with_vowel_y = ["ay", "ey", "iy", "oy", "uy"]
            .iter()
            .any(|suffix| word.ends_with(suffix));

        if word.ends_with('y') && !ends_with_vowel_y {
            format!("{}ies", &word[..word.len() - 1])
        } else if ["s", "sh", "ch", "x", "z"]
            .iter()
            .any(|suffix| word.ends_with(suffix))
        {
            format!("{word}es")
        } else if let Some(stem) = word.strip_suffix("fe") {
            format!("{stem}ves")
        } else if word.ends_with('f') && !word.ends_with("ff") && word != "roof" {
            format!("{}ves", &word[..word.len() - 1])
        } else {
            format!("{word}s")
        }
    }
}
