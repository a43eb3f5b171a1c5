//! Validation utilities

use bigdecimal::BigDecimal;

use crate::types::*;

/// Validate that an amount is positive
pub fn validate_positive_amount(field: &str, amount: &BigDecimal) -> FinanceResult<()> {
    if *amount <= BigDecimal::from(0) {
        Err(FinanceError::InvalidField {
            field: field.to_string(),
            reason: "must be greater than zero".to_string(),
        })
    } else {
        Ok(())
    }
}

/// Validate that a rate is not negative
pub fn validate_rate(field: &str, rate: &BigDecimal) -> FinanceResult<()> {
    if *rate < BigDecimal::from(0) {
        Err(FinanceError::InvalidField {
            field: field.to_string(),
            reason: "cannot be negative".to_string(),
        })
    } else {
        Ok(())
    }
}

/// Validate that a discount percentage lies in 0-100
pub fn validate_percentage(field: &str, value: &BigDecimal) -> FinanceResult<()> {
    if *value < BigDecimal::from(0) || *value > BigDecimal::from(100) {
        Err(FinanceError::InvalidField {
            field: field.to_string(),
            reason: format!("{} is outside 0-100", value),
        })
    } else {
        Ok(())
    }
}

/// Check the canonical textual UUID layout: 8-4-4-4-12 hex digits, version
/// nibble 1-5 and variant nibble 8, 9, a or b. Case-insensitive.
pub fn is_canonical_uuid(candidate: &str) -> bool {
    let bytes = candidate.as_bytes();
    if bytes.len() != 36 {
        return false;
    }

    for (i, b) in bytes.iter().enumerate() {
        match i {
            8 | 13 | 18 | 23 => {
                if *b != b'-' {
                    return false;
                }
            }
            14 => {
                if !(b'1'..=b'5').contains(b) {
                    return false;
                }
            }
            19 => {
                if !matches!(b.to_ascii_lowercase(), b'8' | b'9' | b'a' | b'b') {
                    return false;
                }
            }
            _ => {
                if !b.is_ascii_hexdigit() {
                    return false;
                }
            }
        }
    }

    true
}

/// Collect every identifier that fails the UUID shape check, in input order
pub fn invalid_identifiers<S: AsRef<str>>(ids: &[S]) -> Vec<String> {
    ids.iter()
        .map(AsRef::as_ref)
        .filter(|id| !is_canonical_uuid(id))
        .map(str::to_string)
        .collect()
}

/// Keep only directory entries whose role is `student`
pub fn students_from_directory(users: Vec<DirectoryUser>) -> Vec<DirectoryUser> {
    users.into_iter().filter(|u| u.role == "student").collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_uuid_accepts_v4() {
        assert!(is_canonical_uuid("3f2b8c1e-9d4a-4c6b-8e2f-1a2b3c4d5e6f"));
        assert!(is_canonical_uuid("3F2B8C1E-9D4A-4C6B-BE2F-1A2B3C4D5E6F"));
        assert!(is_canonical_uuid(&uuid::Uuid::new_v4().to_string()));
    }

    #[test]
    fn test_canonical_uuid_rejects_bad_nibbles() {
        // version 0 and 6
        assert!(!is_canonical_uuid("3f2b8c1e-9d4a-0c6b-8e2f-1a2b3c4d5e6f"));
        assert!(!is_canonical_uuid("3f2b8c1e-9d4a-6c6b-8e2f-1a2b3c4d5e6f"));
        // variant c
        assert!(!is_canonical_uuid("3f2b8c1e-9d4a-4c6b-ce2f-1a2b3c4d5e6f"));
        // nil uuid
        assert!(!is_canonical_uuid("00000000-0000-0000-0000-000000000000"));
    }

    #[test]
    fn test_canonical_uuid_rejects_shape() {
        assert!(!is_canonical_uuid("not-a-uuid"));
        assert!(!is_canonical_uuid("3f2b8c1e9d4a4c6b8e2f1a2b3c4d5e6f"));
        assert!(!is_canonical_uuid("{3f2b8c1e-9d4a-4c6b-8e2f-1a2b3c4d5e6f}"));
        assert!(!is_canonical_uuid("3f2b8c1e-9d4a-4c6b-8e2f-1a2b3c4d5e6g"));
        assert!(!is_canonical_uuid(""));
    }

    #[test]
    fn test_invalid_identifiers_keeps_order() {
        let ids = [
            "b",
            "3f2b8c1e-9d4a-4c6b-8e2f-1a2b3c4d5e6f",
            "a",
        ];
        assert_eq!(invalid_identifiers(&ids), vec!["b".to_string(), "a".to_string()]);
    }

    #[test]
    fn test_students_from_directory() {
        let users = vec![
            DirectoryUser {
                id: "1".to_string(),
                name: "Ana".to_string(),
                email: "ana@example.com".to_string(),
                role: "student".to_string(),
            },
            DirectoryUser {
                id: "2".to_string(),
                name: "Bruno".to_string(),
                email: "bruno@example.com".to_string(),
                role: "admin".to_string(),
            },
        ];
        let students = students_from_directory(users);
        assert_eq!(students.len(), 1);
        assert_eq!(students[0].id, "1");
    }

    #[test]
    fn test_percentage_bounds() {
        assert!(validate_percentage("discount_percentage", &BigDecimal::from(0)).is_ok());
        assert!(validate_percentage("discount_percentage", &BigDecimal::from(100)).is_ok());
        assert!(validate_percentage("discount_percentage", &BigDecimal::from(101)).is_err());
        assert!(validate_percentage("discount_percentage", &BigDecimal::from(-1)).is_err());
    }
}
