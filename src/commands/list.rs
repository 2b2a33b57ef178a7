use anyhow::Result;
use std::cmp::Reverse;
use std::path::PathBuf;

use crate::commands::{CommandReport, VaultSession};
use crate::vault::enumerate::{ArchivedUnit, list_archived_units};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ListSort {
    /// Newest first.
    #[default]
    Archived,
    Name,
    Path,
}

#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    pub vault: Option<PathBuf>,
    pub filter: Option<String>,
    pub sort: ListSort,
}

/// Points for every query character found in order.
const MATCH_POINTS: u32 = 1;
/// Extra points when a match directly follows the previous one.
const ADJACENT_BONUS: u32 = 4;
/// Extra points when a match starts a path segment or word.
const BOUNDARY_BONUS: u32 = 3;

/// Score `candidate` against `query` as a case-insensitive subsequence.
/// `None` when some query character is missing. Whitespace in the query is
/// ignored.
pub fn fuzzy_score(query: &str, candidate: &str) -> Option<u32> {
    let hay = candidate.to_lowercase().chars().collect::<Vec<_>>();
    let mut score = 0u32;
    let mut pos = 0usize;
    let mut prev: Option<usize> = None;
    for needle in query.to_lowercase().chars().filter(|c| !c.is_whitespace()) {
        let found = hay[pos..].iter().position(|c| *c == needle)? + pos;
        score += MATCH_POINTS;
        if prev.is_some_and(|p| p + 1 == found) {
            score += ADJACENT_BONUS;
        }
        if found == 0 || matches!(hay[found - 1], '/' | ' ' | '-' | '_' | '.') {
            score += BOUNDARY_BONUS;
        }
        prev = Some(found);
        pos = found + 1;
    }
    Some(score)
}

fn sort_units(units: &mut [ArchivedUnit], sort: ListSort) {
    match sort {
        ListSort::Archived => {
            units.sort_by(|a, b| b.record.archived_at.cmp(&a.record.archived_at));
        }
        ListSort::Name => {
            units.sort_by_key(|u| u.unit.name().to_lowercase());
        }
        ListSort::Path => units.sort_by(|a, b| a.unit.path.cmp(&b.unit.path)),
    }
}

pub fn run(opts: &ListOptions) -> Result<CommandReport> {
    let session = VaultSession::open(opts.vault.as_deref())?;
    let mut report = CommandReport::new("list");
    let settings = &session.settings;

    let mut units = list_archived_units(
        &session.store,
        &settings.archive_folder,
        &settings.carrier_file_name,
    )?;
    sort_units(&mut units, opts.sort);

    if let Some(query) = opts.filter.as_deref().filter(|q| !q.trim().is_empty()) {
        let mut scored = units
            .into_iter()
            .filter_map(|u| fuzzy_score(query, &u.unit.path).map(|s| (s, u)))
            .collect::<Vec<_>>();
        scored.sort_by_key(|(score, _)| Reverse(*score));
        units = scored.into_iter().map(|(_, u)| u).collect();
    }

    report.detail(format!("archive_folder={}", settings.archive_folder));
    report.detail(format!("count={}", units.len()));
    for unit in &units {
        report.detail(format!(
            "{}{}  from={}  archived={}",
            unit.unit.path,
            if unit.unit.is_dir() { "/" } else { "" },
            unit.record.archived_from,
            unit.record.archived_at.as_deref().unwrap_or("unknown"),
        ));
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vault::record::ArchiveRecord;
    use crate::vault::store::Entry;

    fn unit(path: &str, at: Option<&str>) -> ArchivedUnit {
        ArchivedUnit {
            unit: Entry::file(path),
            record: ArchiveRecord {
                archived_at: at.map(ToOwned::to_owned),
                archived_from: format!("Projects/{path}"),
            },
        }
    }

    #[test]
    fn fuzzy_requires_ordered_subsequence() {
        assert!(fuzzy_score("mtg", "Archive/meeting.md").is_some());
        assert!(fuzzy_score("gtm", "Archive/meeting.md").is_none());
        assert!(fuzzy_score("MEET", "archive/meeting.md").is_some());
        assert_eq!(fuzzy_score("", "anything"), Some(0));
    }

    #[test]
    fn fuzzy_prefers_contiguous_boundary_matches() {
        let tight = fuzzy_score("plan", "Archive/plan.md").expect("tight");
        let loose = fuzzy_score("plan", "Archive/people-lan.md").expect("loose");
        assert!(tight > loose);
    }

    #[test]
    fn archived_sort_is_newest_first_with_unknown_last() {
        let mut units = vec![
            unit("Archive/a.md", Some("2024-01-01T00:00:00")),
            unit("Archive/b.md", None),
            unit("Archive/c.md", Some("2025-06-01T00:00:00")),
        ];
        sort_units(&mut units, ListSort::Archived);
        let order = units.iter().map(|u| u.unit.path.as_str()).collect::<Vec<_>>();
        assert_eq!(order, vec!["Archive/c.md", "Archive/a.md", "Archive/b.md"]);
    }

    #[test]
    fn name_sort_ignores_case_and_folder() {
        let mut units = vec![unit("Archive/x/Zeta.md", None), unit("Archive/alpha.md", None)];
        sort_units(&mut units, ListSort::Name);
        assert_eq!(units[0].unit.name(), "alpha.md");
    }
}
