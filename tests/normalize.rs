use serde_json::json;

use dg_fantasy::PipelineError;
use dg_fantasy::normalize::{RawRecord, normalize_record, parse_blob};
use dg_fantasy::record::{Place, Tier};
use dg_fantasy::table::build_player_record;

const MESSY_DOUBLE_QUOTED: &str = r#"{'Place': [1, 'DNF'], 'Tier': ['M', 'ES'], 'Date': ['2024-03-01', '2024-04-12'], 'Tournament': ["O'Malley's Open", 'Discraft's Am Worlds'], 'Final': [True, False], 'Pool': [None, 'MA1'],}"#;

const MESSY_SINGLE_QUOTED: &str = r#"{'Place': [1, 'DNF'], 'Tier': ['M', 'ES'], 'Date': ['2024-03-01', '2024-04-12'], 'Tournament': ['O'Malley's Open', 'Discraft's Am Worlds'], 'Final': [True, False], 'Pool': [None, 'MA1'],}"#;

fn tournament_names(raw: &str) -> Vec<String> {
    let columns = normalize_record(&RawRecord::from(raw)).expect("blob should normalize");
    let record = build_player_record(&columns, None).expect("record should build");
    record
        .tournaments
        .into_iter()
        .map(|t| t.tournament_name)
        .collect()
}

#[test]
fn mixed_quote_blob_keeps_possessive_apostrophes() {
    assert_eq!(
        tournament_names(MESSY_DOUBLE_QUOTED),
        vec!["O'Malley's Open", "Discraft's Am Worlds"]
    );
}

#[test]
fn fully_single_quoted_blob_keeps_possessive_apostrophes() {
    assert_eq!(
        tournament_names(MESSY_SINGLE_QUOTED),
        vec!["O'Malley's Open", "Discraft's Am Worlds"]
    );
}

#[test]
fn literal_columns_become_json_values() {
    let value = parse_blob(MESSY_SINGLE_QUOTED).expect("blob should parse");
    assert_eq!(value["Final"], json!([true, false]));
    assert_eq!(value["Pool"], json!([null, "MA1"]));
    assert_eq!(value["Place"], json!([1, "DNF"]));
}

#[test]
fn messy_blob_types_its_rows() {
    let columns = normalize_record(&RawRecord::from(MESSY_SINGLE_QUOTED)).expect("normalize");
    let record = build_player_record(&columns, None).expect("build");
    assert_eq!(record.tournaments[0].place, Place::Finished(1));
    assert_eq!(record.tournaments[0].tier, Tier::M);
    assert_eq!(
        record.tournaments[1].place,
        Place::NonPlacing("DNF".to_string())
    );
    assert_eq!(record.tournaments[1].tier, Tier::ES);
}

#[test]
fn json_text_matches_structured_input() {
    let value = json!({
        "Place": [3, 1],
        "Tier": ["ES", "M"],
        "Date": ["2023-08-19", "2024-06-02"],
        "Tournament": ["Idlewild Open", "Champions Cup"],
    });
    let from_text = normalize_record(&RawRecord::Text(value.to_string())).expect("text");
    let from_value = normalize_record(&RawRecord::Structured(value)).expect("structured");
    assert_eq!(from_text, from_value);
    assert_eq!(
        build_player_record(&from_text, None).expect("text record"),
        build_player_record(&from_value, None).expect("structured record")
    );
}

#[test]
fn escaped_slashes_and_form_feeds_match_structured_input() {
    let text = r#"{"Place":[1],"Tier":["M"],"Date":["03\/17\/2024"],"Tournament":["A\/B Open\f"]}"#;
    let value: serde_json::Value = serde_json::from_str(text).expect("valid json");
    let from_text = normalize_record(&RawRecord::Text(text.to_string())).expect("text");
    let from_value = normalize_record(&RawRecord::Structured(value)).expect("structured");
    assert_eq!(from_text, from_value);

    let record = build_player_record(&from_text, None).expect("text record");
    assert_eq!(record.tournaments.len(), 1);
    assert_eq!(record.tournaments[0].tournament_name, "A/B Open");
    assert_eq!(record.tournaments[0].date.to_string(), "2024-03-17");
    assert_eq!(
        record,
        build_player_record(&from_value, None).expect("structured record")
    );
}

#[test]
fn list_wrapped_and_index_mapped_columns() {
    let value = json!([{
        "Place": {"1": 4, "0": 2},
        "Tier": {"0": "M", "1": "M"},
        "Date": {"0": "2024-01-01", "1": "2024-02-01"},
        "Tournament": {"1": "Second", "0": "First"},
    }]);
    let columns = normalize_record(&RawRecord::Structured(value)).expect("normalize");
    let record = build_player_record(&columns, None).expect("build");
    let names: Vec<&str> = record
        .tournaments
        .iter()
        .map(|t| t.tournament_name.as_str())
        .collect();
    assert_eq!(names, vec!["First", "Second"]);
    assert_eq!(record.tournaments[1].place, Place::Finished(4));
}

#[test]
fn unrecoverable_blob_reports_position() {
    let err = normalize_record(&RawRecord::from("{'Place': [1, 2 'Tier': ['M']}"))
        .expect_err("blob should not parse");
    match err {
        PipelineError::MalformedRecord {
            offset, context, ..
        } => {
            assert!(offset > 0);
            assert!(context.contains("Tier"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn scalar_blob_is_not_a_record() {
    let err = normalize_record(&RawRecord::from("42")).expect_err("scalar");
    assert!(matches!(err, PipelineError::MalformedRecord { .. }));
}
