#[cfg(test)]
mod tests {
    use crate::error::PipelineError;
    use crate::types::{ExperimentalData, SectionMap};
    use serde_json::json;

    #[test]
    fn test_section_map_keeps_insertion_order() {
        let mut sections = SectionMap::new();
        assert!(sections.try_insert("Zeta", "z"));
        assert!(sections.try_insert("Alpha", "a"));
        assert!(sections.try_insert("Middle", "m"));

        let titles: Vec<_> = sections.titles().collect();
        assert_eq!(titles, vec!["Zeta", "Alpha", "Middle"]);
    }

    #[test]
    fn test_section_map_rejects_duplicate_insert() {
        let mut sections = SectionMap::new();
        assert!(sections.try_insert("Results", "first"));
        assert!(!sections.try_insert("Results", "second"));

        assert_eq!(sections.len(), 1);
        assert_eq!(sections.get("Results"), Some("first"));
    }

    #[test]
    fn test_section_map_json_preserves_order() {
        let mut sections = SectionMap::new();
        sections.try_insert("Introduction", "intro");
        sections.try_insert("Conclusion", "end");
        sections.try_insert("Discussion", "talk");

        let text = serde_json::to_string(&sections).unwrap();
        assert_eq!(
            text,
            r#"{"Introduction":"intro","Conclusion":"end","Discussion":"talk"}"#
        );

        let parsed: SectionMap = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, sections);
    }

    #[test]
    fn test_section_map_rejects_duplicate_json_keys() {
        let result: Result<SectionMap, _> =
            serde_json::from_str(r#"{"Results":"a","Results":"b"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_experimental_data_missing_keys_are_empty() {
        let data = ExperimentalData::from_value(json!({})).unwrap();

        assert!(data.is_empty());
        assert!(data.performance().is_empty());
        assert!(data.baseline().is_empty());
        assert!(data.results().is_empty());
        assert!(data.convergence().is_empty());
        assert!(data.comparison.is_none());
    }

    #[test]
    fn test_experimental_data_accepts_integers_and_comparison() {
        let data = ExperimentalData::from_value(json!({
            "baseline": [1, 2, 3],
            "comparison": {"ours": [0.9, 0.91], "prior": [0.8]}
        }))
        .unwrap();

        assert_eq!(data.baseline(), &[1.0, 2.0, 3.0]);
        let comparison = data.comparison.as_ref().unwrap();
        assert_eq!(comparison.len(), 2);
        assert_eq!(comparison["prior"], vec![0.8]);
    }

    #[test]
    fn test_experimental_data_keeps_unknown_keys() {
        let data = ExperimentalData::from_value(json!({
            "performance": [0.5],
            "notes": "collected on cluster B"
        }))
        .unwrap();

        assert_eq!(data.extra["notes"], json!("collected on cluster B"));
        let round_trip = serde_json::to_value(&data).unwrap();
        assert_eq!(round_trip["notes"], json!("collected on cluster B"));
    }

    #[test]
    fn test_experimental_data_rejects_non_numeric_entries() {
        let result = ExperimentalData::from_value(json!({"results": [0.1, "high"]}));
        assert!(matches!(result, Err(PipelineError::Analysis(_))));
    }

    #[test]
    fn test_experimental_data_rejects_non_object() {
        let result = ExperimentalData::from_value(json!([1, 2, 3]));
        match result {
            Err(PipelineError::Analysis(message)) => assert!(message.contains("an array")),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
