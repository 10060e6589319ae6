//! Console report: pipe table of the ranking with an index-return header.

use rsrank_core::ranking::{IndexReturns, RankingParams};
use rsrank_core::RankingSnapshot;

const MISSING: &str = "-";

/// Render the snapshot as a pipe table framed by `=` rules.
pub fn render_ranking(
    market: &str,
    snapshot: &RankingSnapshot,
    index_returns: &IndexReturns,
    params: &RankingParams,
) -> String {
    let periods: Vec<u32> = params.periods.iter().map(|p| p.days).collect();
    let with_sector = snapshot.rankings.iter().any(|e| e.sector.is_some());

    let mut headers: Vec<String> = vec!["Rank".into(), "Code".into(), "Name".into()];
    headers.extend(periods.iter().map(|p| format!("RS_{p}D")));
    headers.push("RS_Avg".into());
    headers.push("Disparity(%)".into());
    if with_sector {
        headers.push("Sector".into());
    }

    let rows: Vec<Vec<String>> = snapshot
        .rankings
        .iter()
        .map(|e| {
            let mut row = vec![e.rank.to_string(), e.code.clone(), e.name.clone()];
            row.extend(periods.iter().map(|p| {
                e.period_scores
                    .get(*p)
                    .map_or_else(|| MISSING.to_string(), |s| s.to_string())
            }));
            row.push(e.rs_avg.to_string());
            row.push(
                e.disparity
                    .map_or_else(|| MISSING.to_string(), |d| format!("{d:.1}")),
            );
            if with_sector {
                row.push(e.sector.clone().unwrap_or_default());
            }
            row
        })
        .collect();

    let table = pipe_table(&headers, &rows, 3);
    let width = table.lines().next().map_or(0, |l| l.chars().count());
    let rule = "=".repeat(width.max(40));

    let returns = index_returns
        .iter()
        .map(|(p, r)| format!("{p}D: {r:.1}%"))
        .collect::<Vec<_>>()
        .join(" | ");
    let weights = params
        .periods
        .iter()
        .map(|p| format!("{}D {:.2}", p.days, p.weight))
        .collect::<Vec<_>>()
        .join(" | ");

    let mut out = String::new();
    out.push_str(&rule);
    out.push('\n');
    out.push_str(&format!(
        "RS Ranking & {}-Day MA Disparity [{market}] ({})\n",
        params.ma_window, snapshot.update_time
    ));
    out.push_str(&format!("Index returns: {returns}\n"));
    out.push_str(&format!("Weights: {weights} | formula: {}\n", params.rs_formula));
    out.push_str("Disparity < 0: trading below its moving average\n");
    out.push_str(&rule);
    out.push('\n');
    out.push_str(&table);
    out.push_str(&rule);
    out.push('\n');
    out
}

/// Markdown-style pipe table. Columns `1..text_cols` and `Sector` are left
/// aligned, everything else is centered.
pub(crate) fn pipe_table(headers: &[String], rows: &[Vec<String>], text_cols: usize) -> String {
    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| {
            rows.iter()
                .filter_map(|r| r.get(i))
                .map(|c| c.chars().count())
                .chain(std::iter::once(h.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();
    let is_text = |i: usize| (i > 0 && i < text_cols) || headers[i] == "Sector";

    let line = |cells: &[String]| {
        let padded: Vec<String> = cells
            .iter()
            .enumerate()
            .map(|(i, c)| {
                if is_text(i) {
                    pad_left_aligned(c, widths[i])
                } else {
                    pad_centered(c, widths[i])
                }
            })
            .collect();
        format!("| {} |\n", padded.join(" | "))
    };

    let mut out = line(headers);
    let sep: Vec<String> = widths
        .iter()
        .enumerate()
        .map(|(i, w)| {
            if is_text(i) {
                format!(":{}", "-".repeat(w + 1))
            } else {
                format!(":{}:", "-".repeat(*w))
            }
        })
        .collect();
    out.push_str(&format!("|{}|\n", sep.join("|")));
    for row in rows {
        out.push_str(&line(row));
    }
    out
}

fn pad_left_aligned(s: &str, width: usize) -> String {
    let n = s.chars().count();
    format!("{s}{}", " ".repeat(width.saturating_sub(n)))
}

fn pad_centered(s: &str, width: usize) -> String {
    let n = s.chars().count();
    let total = width.saturating_sub(n);
    let left = total / 2;
    format!("{}{s}{}", " ".repeat(left), " ".repeat(total - left))
}
