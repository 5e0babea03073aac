//! `match` subcommand: show how products pair with catalog records.

use std::path::Path;

use assetsync_db::PgTargetStore;
use assetsync_pipeline::{match_records, MatchBasis, MatchedPair, TargetStore};

use crate::snapshot::load_snapshot;

pub(crate) async fn run_match(pool: sqlx::PgPool, source: &Path) -> anyhow::Result<()> {
    let sources = load_snapshot(source).await?;
    let targets = PgTargetStore::new(pool).list_records().await?;

    let pairs = match_records(&targets, &sources);
    let mut matched = 0usize;
    for pair in &pairs {
        if pair.source.is_some() {
            matched += 1;
        }
        println!("{}", describe(pair));
    }
    println!(
        "{matched} of {} products matched ({} catalog records)",
        pairs.len(),
        sources.len()
    );
    Ok(())
}

fn describe(pair: &MatchedPair<'_>) -> String {
    let target = pair.target;
    match (pair.source, pair.basis) {
        (Some(source), Some(basis)) => format!(
            "{} {:?} <- {} ({}, {} attachments)",
            target.id,
            target.name,
            source.external_id,
            basis_label(basis),
            source.attachments.len()
        ),
        _ => format!("{} {:?} <- unmatched", target.id, target.name),
    }
}

fn basis_label(basis: MatchBasis) -> &'static str {
    match basis {
        MatchBasis::ExternalId => "by id",
        MatchBasis::Name(0) => "by name",
        MatchBasis::Name(_) => "by alternate name",
    }
}

#[cfg(test)]
mod tests {
    use assetsync_core::{SourceRecord, TargetRecord};

    use super::*;

    #[test]
    fn describes_matched_and_unmatched_pairs() {
        let targets = vec![
            TargetRecord {
                id: "1".to_string(),
                name: "Widget".to_string(),
                alternate_names: vec![],
                external_id: None,
                asset_urls: vec![],
            },
            TargetRecord {
                id: "2".to_string(),
                name: "Lonely".to_string(),
                alternate_names: vec![],
                external_id: None,
                asset_urls: vec![],
            },
        ];
        let sources = vec![SourceRecord {
            external_id: "rec1".to_string(),
            name: "Widget".to_string(),
            attachments: vec![],
        }];

        let pairs = match_records(&targets, &sources);
        assert_eq!(describe(&pairs[0]), "1 \"Widget\" <- rec1 (by name, 0 attachments)");
        assert_eq!(describe(&pairs[1]), "2 \"Lonely\" <- unmatched");
    }
}
