use dg_fantasy::PipelineError;
use dg_fantasy::cohort::{CohortTable, column_stats, player_summary};

fn cohort() -> CohortTable {
    CohortTable::new(
        ["Ace", "Bea", "Cy", "Dee", "Eve"]
            .iter()
            .map(|p| p.to_string())
            .collect(),
    )
    .with_column(
        "composite_fantasy_points",
        vec![Some(310.0), Some(120.0), Some(45.5), Some(0.0), Some(88.0)],
    )
    .with_column(
        "composite_rating",
        vec![Some(1031.2), None, Some(987.4), Some(1002.0), None],
    )
}

#[test]
fn top_value_is_first_with_full_percentile() {
    let table = cohort();
    let stat = player_summary(&table, "composite_fantasy_points", "Ace")
        .expect("summary")
        .stat
        .expect("value present");
    assert_eq!(stat.rank_label(), "1/5");
    assert_eq!(stat.percentile, 100.0);
    assert_eq!(stat.percent_of_max, Some(100.0));
}

#[test]
fn bottom_value_ranks_last() {
    let table = cohort();
    let stats = column_stats(&table, "composite_fantasy_points").expect("column");
    let dee = stats[3].as_ref().expect("value present");
    assert_eq!(dee.rank_label(), "5/5");
    assert_eq!(dee.percentile, 20.0);
    assert_eq!(dee.percent_of_max, Some(0.0));
}

#[test]
fn missing_values_stay_out_of_the_cohort() {
    let table = cohort();
    let stats = column_stats(&table, "composite_rating").expect("column");
    assert!(stats[1].is_none());
    assert!(stats[4].is_none());
    let ace = stats[0].as_ref().expect("value present");
    assert_eq!(ace.rank_label(), "1/3");
    let cy = stats[2].as_ref().expect("value present");
    assert_eq!(cy.rank_label(), "3/3");
}

#[test]
fn unknown_column_and_player_are_errors() {
    let table = cohort();
    assert_eq!(
        column_stats(&table, "putting_c1x").expect_err("column"),
        PipelineError::ColumnNotFound("putting_c1x".to_string())
    );
    assert_eq!(
        player_summary(&table, "composite_rating", "Zed").expect_err("player"),
        PipelineError::PlayerNotFound("Zed".to_string())
    );
}
