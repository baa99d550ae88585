//! Capture-event grouping and reference band selection.

use std::collections::BTreeMap;
use std::fmt;

use crate::record::CaptureRecord;

/// Identifies one synchronized capture.
///
/// Records without a capture UUID share the `Unidentified` group, which is
/// never merged with a UUID group and sorts after all of them.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GroupKey {
    Uuid(String),
    Unidentified,
}

impl GroupKey {
    pub fn for_record(record: &CaptureRecord) -> Self {
        if record.has_capture_uuid() {
            GroupKey::Uuid(record.capture_uuid.clone())
        } else {
            GroupKey::Unidentified
        }
    }
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GroupKey::Uuid(uuid) => write!(f, "{uuid}"),
            GroupKey::Unidentified => write!(f, "<no capture uuid>"),
        }
    }
}

/// Partition records by capture, keeping input order inside each group.
pub fn group_records(records: Vec<CaptureRecord>) -> BTreeMap<GroupKey, Vec<CaptureRecord>> {
    let mut groups: BTreeMap<GroupKey, Vec<CaptureRecord>> = BTreeMap::new();
    for record in records {
        groups
            .entry(GroupKey::for_record(&record))
            .or_default()
            .push(record);
    }
    groups
}

/// Index of the first record whose relative optical-center offset is below
/// `tolerance` on both axes.
pub fn select_reference(group: &[CaptureRecord], tolerance: f64) -> Option<usize> {
    group
        .iter()
        .position(|r| r.rel_x().abs() < tolerance && r.rel_y().abs() < tolerance)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(name: &str, uuid: &str, rel: (f64, f64)) -> CaptureRecord {
        CaptureRecord {
            file_name: name.to_string(),
            capture_uuid: uuid.to_string(),
            rel_x: Some(rel.0),
            rel_y: Some(rel.1),
            ..Default::default()
        }
    }

    #[test]
    fn test_uuid_and_fallback_groups_stay_apart() {
        let mut records = Vec::new();
        for i in 0..4 {
            records.push(rec(&format!("x{i}"), "X", (1.0, 1.0)));
        }
        for i in 0..3 {
            records.push(rec(&format!("n{i}"), "", (1.0, 1.0)));
        }

        let groups = group_records(records);
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[&GroupKey::Uuid("X".to_string())].len(), 4);
        assert_eq!(groups[&GroupKey::Unidentified].len(), 3);
    }

    #[test]
    fn test_fallback_sorts_last_and_uuids_lexicographic() {
        let records = vec![
            rec("a", "", (0.0, 0.0)),
            rec("b", "zzz", (0.0, 0.0)),
            rec("c", "A1", (0.0, 0.0)),
            // a literal "unknown" uuid is an ordinary uuid
            rec("d", "unknown", (0.0, 0.0)),
        ];
        let keys: Vec<GroupKey> = group_records(records).into_keys().collect();
        assert_eq!(
            keys,
            vec![
                GroupKey::Uuid("A1".to_string()),
                GroupKey::Uuid("unknown".to_string()),
                GroupKey::Uuid("zzz".to_string()),
                GroupKey::Unidentified,
            ]
        );
    }

    #[test]
    fn test_group_preserves_input_order() {
        let records = vec![
            rec("3.tif", "G", (0.0, 0.0)),
            rec("1.tif", "G", (0.0, 0.0)),
            rec("2.tif", "G", (0.0, 0.0)),
        ];
        let groups = group_records(records);
        let names: Vec<&str> = groups[&GroupKey::Uuid("G".to_string())]
            .iter()
            .map(|r| r.file_name.as_str())
            .collect();
        assert_eq!(names, ["3.tif", "1.tif", "2.tif"]);
    }

    #[test]
    fn test_first_qualifying_record_is_reference() {
        let group = vec![
            rec("0", "G", (5.0, 0.0)),
            rec("1", "G", (0.0, -2.0)),
            rec("2", "G", (0.0005, -0.0009)),
            rec("3", "G", (0.3, 0.3)),
            rec("4", "G", (0.01, 0.0)),
            rec("5", "G", (0.0, 0.0)),
        ];
        assert_eq!(select_reference(&group, 0.001), Some(2));
    }

    #[test]
    fn test_absent_offsets_qualify_as_reference() {
        let group = vec![
            rec("0", "G", (3.0, 3.0)),
            CaptureRecord {
                file_name: "1".to_string(),
                ..Default::default()
            },
        ];
        assert_eq!(select_reference(&group, 0.001), Some(1));
    }

    #[test]
    fn test_no_reference() {
        let group = vec![rec("0", "G", (0.001, 0.0)), rec("1", "G", (0.0, -0.002))];
        assert_eq!(select_reference(&group, 0.001), None);
    }
}
