use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset};

use crate::odpt::information::TrainInformation;

const LINE_NAMES: &[(&str, &str)] = &[
    ("Ginza", "銀座線"),
    ("Marunouchi", "丸ノ内線"),
    ("Hibiya", "日比谷線"),
    ("Tozai", "東西線"),
    ("Chiyoda", "千代田線"),
    ("Yurakucho", "有楽町線"),
    ("Hanzomon", "半蔵門線"),
    ("Namboku", "南北線"),
    ("Fukutoshin", "副都心線"),
];

/// `odpt.Railway:TokyoMetro.Ginza` -> `銀座線`.
pub fn railway_name(railway: &str) -> String {
    match railway.split_once("TokyoMetro.") {
        Some((_, line)) => LINE_NAMES
            .iter()
            .find(|(key, _)| *key == line)
            .map(|(_, name)| (*name).to_owned())
            .unwrap_or_else(|| format!("{line}線")),
        None => railway.to_owned(),
    }
}

/// Anything other than normal or regular service counts as disrupted.
pub fn is_disrupted(text: &str) -> bool {
    !text.is_empty() && !text.contains("正常") && !text.contains("平常")
}

#[derive(Debug, Clone, PartialEq)]
pub struct Disruption {
    pub railway: String,
    pub status: String,
    pub time_of_origin: Option<DateTime<FixedOffset>>,
}

fn disruptions(info: &[TrainInformation]) -> impl Iterator<Item = Disruption> + '_ {
    info.iter().filter_map(|i| {
        let text = i.text.as_deref().filter(|t| is_disrupted(t))?;
        Some(Disruption {
            railway: i.railway.clone(),
            status: text.to_owned(),
            time_of_origin: i.time_of_origin,
        })
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatusReport {
    pub disrupted: Vec<Disruption>,
    pub normal: Vec<String>,
}

impl StatusReport {
    pub fn new(info: &[TrainInformation]) -> Self {
        let disrupted: Vec<Disruption> = disruptions(info).collect();
        let normal = info
            .iter()
            .filter(|i| !disrupted.iter().any(|d| d.railway == i.railway))
            .map(|i| i.railway.clone())
            .collect();

        Self { disrupted, normal }
    }
}

#[derive(Debug, Default, PartialEq)]
pub struct DelayChanges {
    /// Newly disrupted lines, or lines whose status text changed.
    pub new: Vec<Disruption>,
    pub resolved: Vec<Disruption>,
}

impl DelayChanges {
    pub fn is_empty(&self) -> bool {
        self.new.is_empty() && self.resolved.is_empty()
    }
}

/// Remembers the last poll so each change is reported once.
#[derive(Debug, Default)]
pub struct DelayTracker {
    previous: BTreeMap<String, Disruption>,
}

impl DelayTracker {
    pub fn update(&mut self, info: &[TrainInformation]) -> DelayChanges {
        let current: BTreeMap<String, Disruption> = disruptions(info)
            .map(|d| (d.railway.clone(), d))
            .collect();

        let new = current
            .values()
            .filter(|d| {
                self.previous
                    .get(&d.railway)
                    .map_or(true, |p| p.status != d.status)
            })
            .cloned()
            .collect();

        let resolved = self
            .previous
            .values()
            .filter(|p| !current.contains_key(&p.railway))
            .cloned()
            .collect();

        self.previous = current;
        DelayChanges { new, resolved }
    }
}
