use itertools::Itertools;

use crate::{
    directory::StationDirectory,
    fare::{
        resolve::Candidate,
        response::{Alternate, FareResponse, FareStatus, Side},
    },
    odpt::fare::Fares,
    status::{railway_name, Disruption, StatusReport},
    timetable::Departure,
    westjr::{DelayedTrain, Line},
};

const ATTRIBUTION: &str = "情報提供: 東京メトロオープンデータ";

fn fare_lines(fares: &Fares) -> Vec<String> {
    vec![
        format!("ICカード運賃: {}円", fares.ic),
        format!("切符運賃: {}円", fares.ticket),
        format!("こどもICカード運賃: {}円", fares.child_ic),
        format!("こども切符運賃: {}円", fares.child_ticket),
    ]
}

fn alternate_list(alternates: &[Alternate]) -> String {
    alternates
        .iter()
        .map(|a| format!("{} ({})", a.name, railway_name(&a.railway)))
        .join("、")
}

fn alternate_lines(response: &FareResponse) -> Vec<String> {
    let mut lines = vec![];
    if !response.alternates_from.is_empty() {
        lines.push(format!(
            "出発駅の他の候補: {}",
            alternate_list(&response.alternates_from)
        ));
    }
    if !response.alternates_to.is_empty() {
        lines.push(format!(
            "到着駅の他の候補: {}",
            alternate_list(&response.alternates_to)
        ));
    }
    lines
}

pub fn fare_message(response: &FareResponse) -> String {
    let from = &response.from_name;
    let to = &response.to_name;
    let mut lines = vec![];

    match response.status {
        FareStatus::Direct | FareStatus::Route => {
            lines.push(format!("**{from}駅 ⇔ {to}駅 の運賃**"));
            if let Some(route) = &response.route {
                lines.push(format!("経路: {}", route.join(" → ")));
            }
            if let Some(fares) = &response.fares {
                lines.extend(fare_lines(fares));
            }
            if response.status == FareStatus::Route {
                lines.push("※ ICカード運賃が最も安い経路で計算しています。".to_owned());
            }
            lines.extend(alternate_lines(response));
            lines.push(ATTRIBUTION.to_owned());
        }
        FareStatus::NotFound => {
            let names = response
                .not_found
                .iter()
                .map(|side| match side {
                    Side::From => format!("`{from}`"),
                    Side::To => format!("`{to}`"),
                })
                .join("、");
            lines.push(format!("指定された駅名が見つかりませんでした: {names}"));
            lines.push("駅名は「渋谷」や「Shibuya」のように入力してください。".to_owned());
        }
        FareStatus::NoFareData => {
            match &response.same_railway {
                Some(railway) => {
                    lines.push(format!(
                        "`{from}`駅と`{to}`駅は同じ{}内の駅です。",
                        railway_name(railway)
                    ));
                    lines.push(
                        "同じ路線内の運賃情報は東京メトロオープンデータAPIでは提供されていません。"
                            .to_owned(),
                    );
                    lines.push("詳細な運賃については東京メトロ公式サイトをご確認ください。".to_owned());
                }
                None => {
                    lines.push(format!("`{from}`駅から`{to}`駅への運賃情報が見つかりませんでした。"));
                }
            }
            lines.extend(alternate_lines(response));
        }
        FareStatus::Ambiguous => {
            lines.push("複数の駅が該当しました。駅名を選び直してください。".to_owned());
            lines.extend(alternate_lines(response));
        }
    }

    lines.join("\n")
}

pub fn candidates_message(input: &str, candidates: &[Candidate]) -> String {
    if candidates.is_empty() {
        return format!("`{input}`に該当する駅はありません。");
    }

    let list = candidates
        .iter()
        .map(|c| {
            let marker = if c.primary { "•" } else { "  ◦" };
            format!("{marker} {} ({})", c.name, railway_name(&c.railway))
        })
        .join("\n");
    format!("`{input}`の検索結果:\n{list}")
}

pub fn status_message(report: &StatusReport) -> String {
    if report.disrupted.is_empty() {
        return "✅ 運行状況\n現在、遅延は発生していません".to_owned();
    }

    let list = report
        .disrupted
        .iter()
        .map(|d| format!("**{}**: {}", railway_name(&d.railway), d.status))
        .join("\n");
    format!("🚨 現在の遅延情報\n{list}")
}

pub fn delay_notification(disruption: &Disruption) -> String {
    let message = format!(
        "🚨 遅延情報\n**{}**\n運行状況: {}",
        railway_name(&disruption.railway),
        disruption.status
    );
    match disruption.time_of_origin {
        Some(origin) => format!("{message}\n発生時刻: {}", origin.format("%Y-%m-%d %H:%M")),
        None => message,
    }
}

pub fn resolved_notification(disruption: &Disruption) -> String {
    format!(
        "✅ 運行正常化\n**{}**\n状況: 運行が正常化されました",
        railway_name(&disruption.railway)
    )
}

pub fn westjr_lines_message(groups: &[&[Line]]) -> String {
    let groups = groups
        .iter()
        .enumerate()
        .map(|(i, group)| {
            let lines = group
                .iter()
                .map(|line| format!("• {} [{}]", line.label(), line.key))
                .join("\n");
            format!("路線グループ{}\n{lines}", i + 1)
        })
        .join("\n");
    format!("以下の路線から選択してください：\n{groups}")
}

pub fn westjr_delay_message(line: &Line, trains: &[DelayedTrain]) -> String {
    let mut out = format!("**{}**\n", line.label());
    if trains.is_empty() {
        out.push_str("現在、遅延情報はありません。");
        return out;
    }

    let lines = trains
        .iter()
        .map(|t| {
            let near = match &t.near {
                Some(station) => format!("{station}辺り"),
                None => "位置不明".to_owned(),
            };
            let mut parts = vec![t.display_type.clone(), format!("{}行き", t.destination)];
            parts.extend(t.type_change.clone());
            parts.push(t.number.clone());
            parts.push(format!("{}分遅れ", t.delay_minutes));
            parts.push(near);
            parts.into_iter().filter(|part| !part.is_empty()).join(" ")
        })
        .join("\n");
    out.push_str(&lines);
    out
}

pub fn departures_message(
    directory: &StationDirectory,
    name: &str,
    departures: &[Departure],
) -> String {
    if departures.is_empty() {
        return format!("`{name}`駅の発車時刻が見つかりませんでした。");
    }

    let list = departures
        .iter()
        .map(|d| {
            let destinations = d
                .destinations
                .iter()
                .map(|id| directory.display_name(id))
                .join("・");
            let train_type = d.train_type.rsplit('.').next().unwrap_or(&d.train_type);
            format!(
                "{} {} {} {}行き ({})",
                d.time.format("%H:%M"),
                railway_name(&d.railway),
                train_type,
                destinations,
                d.train_number
            )
        })
        .join("\n");
    format!("**{name}駅の発車時刻**\n{list}")
}
