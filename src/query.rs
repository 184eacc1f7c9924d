use std::cmp::Ordering;
use std::fmt;

use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;

use crate::app::ApplicationRecord;
use crate::catalog::Catalog;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum FilterSpec {
    #[default]
    All,
    UserOnly,
    SystemOnly,
}

impl FilterSpec {
    pub fn matches(&self, record: &ApplicationRecord) -> bool {
        match self {
            FilterSpec::All => true,
            FilterSpec::UserOnly => !record.is_system_app,
            FilterSpec::SystemOnly => record.is_system_app,
        }
    }
}

impl fmt::Display for FilterSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterSpec::All => write!(f, "all"),
            FilterSpec::UserOnly => write!(f, "user"),
            FilterSpec::SystemOnly => write!(f, "system"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum SortSpec {
    #[default]
    NameAsc,
    NameDesc,
    InstallAsc,
    InstallDesc,
}

impl SortSpec {
    /// Total order on the sort key. Equal keys compare `Equal` so a stable
    /// sort keeps their relative order.
    pub fn compare(&self, a: &ApplicationRecord, b: &ApplicationRecord) -> Ordering {
        match self {
            SortSpec::NameAsc => compare_names(a, b),
            SortSpec::NameDesc => compare_names(b, a),
            SortSpec::InstallAsc => a.install_time_millis.cmp(&b.install_time_millis),
            SortSpec::InstallDesc => b.install_time_millis.cmp(&a.install_time_millis),
        }
    }
}

impl fmt::Display for SortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortSpec::NameAsc => write!(f, "name-asc"),
            SortSpec::NameDesc => write!(f, "name-desc"),
            SortSpec::InstallAsc => write!(f, "install-asc"),
            SortSpec::InstallDesc => write!(f, "install-desc"),
        }
    }
}

fn compare_names(a: &ApplicationRecord, b: &ApplicationRecord) -> Ordering {
    a.name.to_lowercase().cmp(&b.name.to_lowercase())
}

/// Filter and sort a catalog snapshot.
///
/// The catalog has no inherent order, so records are first laid out by
/// package id; ties on the sort key then keep that order.
pub fn apply(catalog: &Catalog, filter: FilterSpec, sort: SortSpec) -> Vec<ApplicationRecord> {
    let mut base: Vec<&ApplicationRecord> = catalog.records().collect();
    base.sort_by(|a, b| a.package_id.cmp(&b.package_id));
    apply_ordered(base, filter, sort)
}

/// Filter then stably sort records that are already in a meaningful order.
pub fn apply_ordered<'a>(
    records: impl IntoIterator<Item = &'a ApplicationRecord>,
    filter: FilterSpec,
    sort: SortSpec,
) -> Vec<ApplicationRecord> {
    let mut selected: Vec<ApplicationRecord> = records
        .into_iter()
        .filter(|record| filter.matches(record))
        .cloned()
        .collect();
    selected.sort_by(|a, b| sort.compare(a, b));
    selected
}

/// Fuzzy search by name and package id, best match first.
pub fn search(query: &str, records: &[ApplicationRecord]) -> Vec<ApplicationRecord> {
    let matcher = SkimMatcherV2::default();
    let mut scored: Vec<(i64, &ApplicationRecord)> = records
        .iter()
        .filter_map(|record| {
            let name_score = matcher.fuzzy_match(&record.name, query).unwrap_or(0);
            let id_score = matcher
                .fuzzy_match(&record.package_id, query)
                .unwrap_or(0);
            let score = name_score.max(id_score);
            if score > 0 {
                Some((score, record))
            } else {
                None
            }
        })
        .collect();

    scored.sort_by(|a, b| b.0.cmp(&a.0));
    scored.into_iter().map(|(_, record)| record.clone()).collect()
}
