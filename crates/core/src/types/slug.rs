//! URL-safe store identifiers derived from display names.
//!
//! A slug is built in two steps. [`Slug::from_name`] normalizes a display name
//! into a *base* slug, and [`Slug::next_available`] picks the first free
//! member of the base's family (`base`, `base-2`, `base-3`, ...) given the
//! slugs already stored. Uniqueness is ultimately enforced by the database;
//! these functions only choose a candidate.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Maximum length of a base slug, before any numeric suffix.
const MAX_BASE_LENGTH: usize = 80;

/// Errors that can occur when parsing a [`Slug`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SlugError {
    /// Nothing slug-worthy was left after normalization.
    #[error("slug cannot be empty")]
    Empty,
    /// The input contains characters outside `[a-z0-9-]` or stray hyphens.
    #[error("slug contains invalid characters: {0:?}")]
    Invalid(String),
}

/// A URL-safe identifier: lowercase ASCII letters, digits and single hyphens.
///
/// ```
/// use raving_reviews_core::Slug;
///
/// let base = Slug::from_name("Café Río & Grill!").unwrap();
/// assert_eq!(base.as_str(), "cafe-rio-and-grill");
///
/// let taken = ["cafe-rio-and-grill".to_owned()];
/// assert_eq!(base.next_available(&taken).as_str(), "cafe-rio-and-grill-2");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Slug(String);

impl Slug {
    /// Parse an already-normalized slug (e.g. from a URL path).
    ///
    /// # Errors
    ///
    /// Returns [`SlugError`] if the input is empty or not in canonical form.
    pub fn parse(s: &str) -> Result<Self, SlugError> {
        if s.is_empty() {
            return Err(SlugError::Empty);
        }
        let canonical = s
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
            && !s.starts_with('-')
            && !s.ends_with('-')
            && !s.contains("--");
        if !canonical {
            return Err(SlugError::Invalid(s.to_owned()));
        }
        Ok(Self(s.to_owned()))
    }

    /// Normalize a display name into a base slug.
    ///
    /// Latin diacritics are folded to ASCII, `&` becomes `and`, and every run
    /// of other non-alphanumeric characters collapses into one hyphen.
    ///
    /// # Errors
    ///
    /// Returns [`SlugError::Empty`] when the name has no alphanumeric content.
    pub fn from_name(name: &str) -> Result<Self, SlugError> {
        let mut out = String::with_capacity(name.len());
        let mut pending_hyphen = false;

        for c in name.chars() {
            let folded: &str = match c {
                '&' => "and",
                c if c.is_ascii_alphanumeric() => {
                    push_word(&mut out, &mut pending_hyphen, c.to_ascii_lowercase());
                    continue;
                }
                c => fold_char(c).unwrap_or(""),
            };

            if folded.is_empty() {
                pending_hyphen = true;
                continue;
            }
            if c == '&' {
                pending_hyphen = true;
            }
            for f in folded.chars() {
                push_word(&mut out, &mut pending_hyphen, f);
            }
            if c == '&' {
                pending_hyphen = true;
            }
        }

        if out.len() > MAX_BASE_LENGTH {
            out.truncate(MAX_BASE_LENGTH);
            while out.ends_with('-') {
                out.pop();
            }
        }

        if out.is_empty() {
            return Err(SlugError::Empty);
        }
        Ok(Self(out))
    }

    /// Returns true if `candidate` belongs to this base slug's family:
    /// the base itself, or the base followed by `-<digits>`.
    ///
    /// The comparison is case-insensitive and anchored at both ends.
    #[must_use]
    pub fn is_family_member(&self, candidate: &str) -> bool {
        let base = self.0.as_bytes();
        let Some((head, rest)) = candidate.as_bytes().split_at_checked(base.len()) else {
            return false;
        };
        if !head.eq_ignore_ascii_case(base) {
            return false;
        }
        match rest {
            [] => true,
            [b'-', digits @ ..] => !digits.is_empty() && digits.iter().all(u8::is_ascii_digit),
            _ => false,
        }
    }

    /// Choose the slug to use given the family members already stored.
    ///
    /// With no existing members the base is returned unchanged. With `k`
    /// members the candidate is `base-(k+1)`; if gaps in the family make that
    /// exact slug already taken, the suffix keeps increasing until it is free.
    #[must_use]
    pub fn next_available(&self, existing: &[String]) -> Self {
        let members: Vec<&String> = existing
            .iter()
            .filter(|s| self.is_family_member(s))
            .collect();

        if members.is_empty() {
            return self.clone();
        }

        let mut suffix = members.len() + 1;
        loop {
            let candidate = self.with_suffix(suffix);
            if !members
                .iter()
                .any(|m| m.eq_ignore_ascii_case(&candidate.0))
            {
                return candidate;
            }
            suffix += 1;
        }
    }

    /// Append `-n` to this slug.
    #[must_use]
    pub fn with_suffix(&self, n: usize) -> Self {
        Self(format!("{}-{n}", self.0))
    }

    /// Returns the slug as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn push_word(out: &mut String, pending_hyphen: &mut bool, c: char) {
    if *pending_hyphen && !out.is_empty() {
        out.push('-');
    }
    *pending_hyphen = false;
    out.push(c);
}

/// Fold common Latin characters with diacritics to their ASCII base.
const fn fold_char(c: char) -> Option<&'static str> {
    Some(match c {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'À' | 'Á' | 'Â' | 'Ã' | 'Ä' | 'Å' => "a",
        'æ' | 'Æ' => "ae",
        'ç' | 'Ç' => "c",
        'è' | 'é' | 'ê' | 'ë' | 'È' | 'É' | 'Ê' | 'Ë' => "e",
        'ì' | 'í' | 'î' | 'ï' | 'Ì' | 'Í' | 'Î' | 'Ï' => "i",
        'ñ' | 'Ñ' => "n",
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'Ò' | 'Ó' | 'Ô' | 'Õ' | 'Ö' | 'Ø' => "o",
        'œ' | 'Œ' => "oe",
        'ß' => "ss",
        'ù' | 'ú' | 'û' | 'ü' | 'Ù' | 'Ú' | 'Û' | 'Ü' => "u",
        'ý' | 'ÿ' | 'Ý' => "y",
        _ => return None,
    })
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Slug {
    type Error = SlugError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Slug> for String {
    fn from(slug: Slug) -> Self {
        slug.0
    }
}

impl AsRef<str> for Slug {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn base(name: &str) -> Slug {
        Slug::from_name(name).unwrap()
    }

    #[test]
    fn test_from_name_basic() {
        assert_eq!(base("Cafe Rio").as_str(), "cafe-rio");
        assert_eq!(base("  Cafe   Rio  ").as_str(), "cafe-rio");
        assert_eq!(base("Cafe--Rio!!").as_str(), "cafe-rio");
    }

    #[test]
    fn test_from_name_folds_and_expands() {
        assert_eq!(base("Crème Brûlée").as_str(), "creme-brulee");
        assert_eq!(base("Fish & Chips").as_str(), "fish-and-chips");
        assert_eq!(base("Fish&Chips").as_str(), "fish-and-chips");
        assert_eq!(base("Straße 9").as_str(), "strasse-9");
    }

    #[test]
    fn test_from_name_empty() {
        assert_eq!(Slug::from_name("!!! ???"), Err(SlugError::Empty));
        assert_eq!(Slug::from_name("🍕"), Err(SlugError::Empty));
    }

    #[test]
    fn test_from_name_truncates_without_trailing_hyphen() {
        let name = format!("{} tail", "a".repeat(79));
        let slug = base(&name);
        assert!(slug.as_str().len() <= MAX_BASE_LENGTH);
        assert!(!slug.as_str().ends_with('-'));
    }

    #[test]
    fn test_family_membership() {
        let b = base("cafe rio");
        assert!(b.is_family_member("cafe-rio"));
        assert!(b.is_family_member("CAFE-RIO-12"));
        assert!(!b.is_family_member("cafe-rio-"));
        assert!(!b.is_family_member("cafe-rio-grande"));
        assert!(!b.is_family_member("cafe-rio-2x"));
        assert!(!b.is_family_member("my-cafe-rio"));
    }

    #[test]
    fn test_next_available_sequence() {
        let b = base("Cafe Rio");
        let mut taken: Vec<String> = Vec::new();
        for expected in ["cafe-rio", "cafe-rio-2", "cafe-rio-3"] {
            let next = b.next_available(&taken);
            assert_eq!(next.as_str(), expected);
            taken.push(next.into());
        }
    }

    #[test]
    fn test_next_available_ignores_other_families() {
        let b = base("Cafe Rio");
        let taken = vec!["cafe-rio-grande".to_owned(), "cafe".to_owned()];
        assert_eq!(b.next_available(&taken).as_str(), "cafe-rio");
    }

    #[test]
    fn test_next_available_skips_gaps() {
        let b = base("Cafe Rio");
        let taken = vec!["cafe-rio".to_owned(), "cafe-rio-3".to_owned()];
        assert_eq!(b.next_available(&taken).as_str(), "cafe-rio-4");
    }

    #[test]
    fn test_parse_canonical_only() {
        assert!(Slug::parse("cafe-rio-2").is_ok());
        assert!(Slug::parse("Cafe-Rio").is_err());
        assert!(Slug::parse("-cafe").is_err());
        assert!(Slug::parse("cafe--rio").is_err());
        assert_eq!(Slug::parse(""), Err(SlugError::Empty));
    }
}
