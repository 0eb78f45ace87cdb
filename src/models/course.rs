//! Catalog course label parsing.
//!
//! The scheduling surface renders course rows as free-form text like
//! `"CSCE 121\nIntroduction to Program Design"` or `"MATH 151 - Honors"`.
//! Subscribers configure courses by catalog label ("CSCE 121"), so both
//! sides are normalized through one pure function instead of ad-hoc
//! regex matching at the rendering boundary.

use regex::Regex;

/// A parsed catalog label: department code plus course number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseLabel {
    pub dept: String,
    pub number: String,
}

impl CourseLabel {
    /// Canonical "DEPT NUMBER" form used as the registry key.
    pub fn canonical(&self) -> String {
        format!("{} {}", self.dept, self.number)
    }
}

/// Parse a catalog label out of free-form rendered text.
///
/// Accepted shapes (first line only, leading whitespace ignored):
/// - `"CSCE 121"`
/// - `"CSCE 121 - Honors"` (trailing qualifiers dropped)
/// - `"CSCE 121\nIntroduction to Program Design"` (title line dropped)
/// - `"csce 121"` (department upper-cased)
///
/// Returns `None` when no `<letters> <digits>` prefix is present.
pub fn parse_course_label(text: &str) -> Option<CourseLabel> {
    let first_line = text.lines().next()?.trim();
    let re = Regex::new(r"^([A-Za-z]+)\s+(\d+[A-Za-z]*)").ok()?;
    let caps = re.captures(first_line)?;
    Some(CourseLabel {
        dept: caps[1].to_uppercase(),
        number: caps[2].to_uppercase(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_label() {
        let label = parse_course_label("CSCE 121").unwrap();
        assert_eq!(label.dept, "CSCE");
        assert_eq!(label.number, "121");
        assert_eq!(label.canonical(), "CSCE 121");
    }

    #[test]
    fn test_label_with_title_line() {
        let label = parse_course_label("MATH 151\nEngineering Mathematics I").unwrap();
        assert_eq!(label.canonical(), "MATH 151");
    }

    #[test]
    fn test_label_with_trailing_qualifier() {
        let label = parse_course_label("CSCE 121 - Honors").unwrap();
        assert_eq!(label.canonical(), "CSCE 121");
    }

    #[test]
    fn test_lowercase_department_is_normalized() {
        let label = parse_course_label("csce 221").unwrap();
        assert_eq!(label.dept, "CSCE");
    }

    #[test]
    fn test_suffixed_course_number() {
        let label = parse_course_label("CHEM 107h").unwrap();
        assert_eq!(label.number, "107H");
    }

    #[test]
    fn test_rejects_text_without_label() {
        assert!(parse_course_label("Introduction to Program Design").is_none());
        assert!(parse_course_label("").is_none());
        assert!(parse_course_label("121 CSCE").is_none());
    }
}
