use ldr_schemas::{CandidateKeySet, PrimaryRow, RowValidation};

#[test]
fn scenario_candidate_keys_skip_rejected_and_blank_rows() {
    let mut rejected = PrimaryRow::new("LD-003", "civil.csv", "0", "2024-01-01");
    rejected.validation = Some(RowValidation {
        valid: Some(false),
        messages: vec!["missing title".to_string()],
    });

    let rows = vec![
        PrimaryRow::new(" ld\u{2013}001 ", "civil.csv", "A", "2024-01-01"),
        PrimaryRow::new("LD-002", "mech.csv", "0", ""),
        PrimaryRow::new("\u{200B}", "mech.csv", "0", ""),
        rejected,
    ];

    let set = CandidateKeySet::from_primary_rows(&rows);

    assert_eq!(set.len(), 2);
    assert!(set.contains("LD-001"));
    assert!(set.contains("LD-002"));
    assert!(!set.contains("LD-003"));
}
