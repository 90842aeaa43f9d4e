//! Dataset fingerprinting

use contracts::{DatasetFingerprint, Row};

/// Hash the ordered `(id, updated_at, name)` tuples of `rows`.
///
/// Fields are length-prefixed so adjacent values cannot run together. Row
/// order matters: the same rows in another order produce another digest.
pub fn fingerprint(rows: &[Row]) -> DatasetFingerprint {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&(rows.len() as u64).to_le_bytes());

    for row in rows {
        write_field(&mut hasher, row.id.as_bytes());
        hasher.update(&row.updated_at.timestamp_micros().to_le_bytes());
        match &row.name {
            Some(name) => {
                hasher.update(&[1]);
                write_field(&mut hasher, name.as_bytes());
            }
            None => {
                hasher.update(&[0]);
            }
        }
    }

    DatasetFingerprint::from_bytes(*hasher.finalize().as_bytes())
}

fn write_field(hasher: &mut blake3::Hasher, bytes: &[u8]) {
    hasher.update(&(bytes.len() as u64).to_le_bytes());
    hasher.update(bytes);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn t0() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_same_rows_same_fingerprint() {
        let a = vec![Row::new(1u64, t0()).with_name("North")];
        let b = vec![Row::new(1u64, t0()).with_name("North")];
        assert_eq!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn test_updated_at_changes_fingerprint() {
        let a = vec![Row::new(1u64, t0())];
        let b = vec![Row::new(1u64, t0() + Duration::seconds(1))];
        assert_ne!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn test_name_changes_fingerprint() {
        let a = vec![Row::new(1u64, t0()).with_name("North")];
        let b = vec![Row::new(1u64, t0()).with_name("South")];
        let c = vec![Row::new(1u64, t0())];
        assert_ne!(fingerprint(&a), fingerprint(&b));
        assert_ne!(fingerprint(&a), fingerprint(&c));
    }

    #[test]
    fn test_extra_columns_are_ignored() {
        let a = vec![Row::new(1u64, t0()).with_column("lat", 1.0)];
        let b = vec![Row::new(1u64, t0()).with_column("lat", 2.0)];
        assert_eq!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn test_field_boundaries_do_not_collide() {
        let a = vec![Row::new("ab", t0()).with_name("c")];
        let b = vec![Row::new("a", t0()).with_name("bc")];
        assert_ne!(fingerprint(&a), fingerprint(&b));
    }

    #[test]
    fn test_order_matters() {
        let r1 = Row::new(1u64, t0());
        let r2 = Row::new(2u64, t0());
        assert_ne!(
            fingerprint(&[r1.clone(), r2.clone()]),
            fingerprint(&[r2, r1])
        );
    }
}
