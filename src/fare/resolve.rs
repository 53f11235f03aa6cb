use itertools::Itertools;
use serde::Serialize;

use crate::{directory::StationDirectory, odpt::station::StationId};

const MAX_CANDIDATES: usize = 10;
/// One primary plus up to two more stations sharing its display name.
const MAX_PER_NAME: usize = 3;

/// Lines that win ties, in order. Anything else ranks after them.
const LINE_PRIORITY: &[&str] = &[
    "Ginza",
    "Marunouchi",
    "Hibiya",
    "Tozai",
    "Chiyoda",
    "Yurakucho",
    "Hanzomon",
    "Namboku",
    "Fukutoshin",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchQuality {
    Exact,
    Prefix,
    Substring,
}

/// Lower is better.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Rank {
    pub quality: MatchQuality,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Candidate {
    pub name: String,
    pub station_id: StationId,
    pub railway: String,
    pub rank: Rank,
    /// First of the candidates sharing this display name.
    pub primary: bool,
}

fn line_priority(railway: &str) -> usize {
    let line = railway.rsplit('.').next().unwrap_or(railway);
    LINE_PRIORITY
        .iter()
        .position(|&l| l == line)
        .unwrap_or(LINE_PRIORITY.len())
}

/// Case-folds, drops all whitespace (including U+3000) and folds full-width
/// ASCII to half-width.
pub fn normalize(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '\u{FF01}'..='\u{FF5E}' => char::from_u32(c as u32 - 0xFEE0).unwrap_or(c),
            _ => c,
        })
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

fn queries(input: &str) -> Vec<String> {
    let query = normalize(input);
    if query.is_empty() {
        return vec![];
    }

    match query.strip_suffix('駅') {
        Some(stem) if !stem.is_empty() => {
            let stem = stem.to_owned();
            vec![query, stem]
        }
        _ => vec![query],
    }
}

fn classify(name: &str, query: &str) -> Option<MatchQuality> {
    if name == query {
        Some(MatchQuality::Exact)
    } else if name.starts_with(query) {
        Some(MatchQuality::Prefix)
    } else if name.contains(query) {
        Some(MatchQuality::Substring)
    } else {
        None
    }
}

/// Ranks the stations matching `input`, most relevant first.
///
/// An empty result means the station was not found.
pub fn resolve(directory: &StationDirectory, input: &str) -> Vec<Candidate> {
    let queries = queries(input);
    if queries.is_empty() {
        return vec![];
    }

    directory
        .stations()
        .iter()
        .filter_map(|s| {
            let quality = s
                .names()
                .map(normalize)
                .filter_map(|name| queries.iter().filter_map(|q| classify(&name, q)).min())
                .min()?;

            Some(Candidate {
                name: s.display_name().to_owned(),
                station_id: s.id.clone(),
                railway: s.railway.clone(),
                rank: Rank {
                    quality,
                    line: line_priority(&s.railway),
                },
                primary: false,
            })
        })
        .unique_by(|c| (c.name.clone(), c.station_id.clone()))
        .into_group_map_by(|c| c.name.clone())
        .into_values()
        .map(|mut group| {
            group.sort_by(|a, b| {
                a.rank
                    .cmp(&b.rank)
                    .then_with(|| a.station_id.cmp(&b.station_id))
            });
            group.truncate(MAX_PER_NAME);
            group[0].primary = true;
            group
        })
        .sorted_by(|a, b| a[0].rank.cmp(&b[0].rank).then_with(|| a[0].name.cmp(&b[0].name)))
        .flatten()
        .take(MAX_CANDIDATES)
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::odpt::station::StationRecord;

    fn station(id: &str, name: &str, line: &str) -> StationRecord {
        StationRecord::new(
            StationId::new(id),
            name,
            &format!("odpt.Railway:TokyoMetro.{line}"),
        )
    }

    #[test]
    fn normalize_folds_case_width_and_spaces() {
        assert_eq!(normalize(" GIN ZA\u{3000}"), "ginza");
        assert_eq!(normalize("ｇｉｎｚａ"), "ginza");
        assert_eq!(normalize("渋 谷"), "渋谷");
    }

    #[test]
    fn exact_ranks_ahead_of_prefix_and_substring() {
        let directory = StationDirectory::new(vec![
            station("3", "Higashi-ginza", "Hibiya"),
            station("2", "Ginza-itchome", "Yurakucho"),
            station("1", "Ginza", "Ginza"),
        ]);

        let candidates = resolve(&directory, "GINZA");
        let qualities: Vec<_> = candidates.iter().map(|c| c.rank.quality).collect();
        assert_eq!(
            qualities,
            [
                MatchQuality::Exact,
                MatchQuality::Prefix,
                MatchQuality::Substring
            ]
        );
        assert_eq!(candidates[0].name, "Ginza");
    }

    #[test]
    fn matches_any_script() {
        let mut shibuya = station("g.shibuya", "渋谷", "Ginza");
        shibuya.title_ja = Some("渋谷".to_owned());
        shibuya.title_en = Some("Shibuya".to_owned());
        let directory = StationDirectory::new(vec![shibuya]);

        for input in ["渋谷", "渋谷駅", "shibuya", "Ｓｈｉｂｕｙａ"] {
            let candidates = resolve(&directory, input);
            assert_eq!(candidates.len(), 1, "{input}");
            assert_eq!(candidates[0].rank.quality, MatchQuality::Exact);
            assert_eq!(candidates[0].name, "渋谷");
        }
    }

    #[test]
    fn same_name_keeps_primary_and_two_more() {
        let directory = StationDirectory::new(vec![
            station("m.shinjuku", "Shinjuku", "Marunouchi"),
            station("f.shinjuku", "Shinjuku", "Fukutoshin"),
            station("x.shinjuku", "Shinjuku", "Oedo"),
            station("y.shinjuku", "Shinjuku", "Keio"),
            station("f.sanchome", "Shinjuku-sanchome", "Fukutoshin"),
            station("m.nishi", "Nishi-shinjuku", "Marunouchi"),
        ]);

        let candidates = resolve(&directory, "Shinjuku");
        let same_name: Vec<_> = candidates.iter().take(3).collect();
        assert!(same_name.iter().all(|c| c.name == "Shinjuku"));
        assert!(same_name[0].primary);
        assert!(!same_name[1].primary && !same_name[2].primary);
        assert_eq!(same_name[0].station_id, StationId::new("m.shinjuku"));
        assert_eq!(candidates.iter().filter(|c| c.name == "Shinjuku").count(), 3);
        assert_eq!(candidates[3].name, "Shinjuku-sanchome");
        assert_eq!(candidates[4].name, "Nishi-shinjuku");
    }

    #[test]
    fn line_priority_breaks_ties_before_name() {
        let directory = StationDirectory::new(vec![
            station("1", "Aoyama", "Fukutoshin"),
            station("2", "Azabu", "Ginza"),
            station("3", "Akasaka", "SomeOtherLine"),
        ]);

        let names: Vec<_> = resolve(&directory, "a")
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, ["Azabu", "Aoyama", "Akasaka"]);
    }

    #[test]
    fn at_most_ten_distinct_candidates() {
        let mut stations: Vec<_> = (0..15)
            .map(|i| station(&format!("s{i}"), &format!("Station {i}"), "Ginza"))
            .collect();
        stations.push(station("s0", "Station 0", "Ginza"));
        let directory = StationDirectory::new(stations);

        let candidates = resolve(&directory, "station");
        assert_eq!(candidates.len(), 10);
        let keys: HashSet<_> = candidates
            .iter()
            .map(|c| (c.name.clone(), c.station_id.clone()))
            .collect();
        assert_eq!(keys.len(), candidates.len());
    }

    #[test]
    fn no_match_is_empty() {
        let directory = StationDirectory::new(vec![station("1", "Ginza", "Ginza")]);
        assert!(resolve(&directory, "xyz123").is_empty());
        assert!(resolve(&directory, "   ").is_empty());
    }
}
