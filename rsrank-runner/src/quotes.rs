//! Market board: latest value and day-over-day change for a fixed list of
//! yields, indices, futures, FX pairs and crypto.
//!
//! Treasury yields are published under `bonds` as flat `{tenor}_val`,
//! `{tenor}_chg` and `{tenor}_link` fields; everything else is an entry of
//! `items`.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use rsrank_core::data::DataProvider;
use rsrank_core::domain::format_update_time;
use rsrank_core::ranking::round_to;
use serde::de::{Deserializer, MapAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{info, warn};

/// Calendar days of history requested per instrument.
pub const QUOTE_LOOKBACK_DAYS: i64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstrumentKind {
    Yield,
    Index,
    Future,
    Etf,
    Fx,
    Crypto,
}

impl InstrumentKind {
    /// FX quotes need an extra decimal.
    pub fn decimals(self) -> i32 {
        match self {
            InstrumentKind::Fx => 3,
            _ => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    pub name: String,
    pub symbol: String,
    pub kind: InstrumentKind,
    pub link: String,
    /// Tenor label (`2Y`, `10Y`, ...) for yields published under `bonds`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenor: Option<String>,
}

impl Instrument {
    fn new(name: &str, symbol: &str, kind: InstrumentKind) -> Self {
        Self {
            name: name.to_string(),
            symbol: symbol.to_string(),
            kind,
            link: format!(
                "https://finance.yahoo.com/quote/{}/",
                symbol.replace('^', "%5E").replace('=', "%3D")
            ),
            tenor: None,
        }
    }

    fn bond(tenor: &str, name: &str, symbol: &str) -> Self {
        Self {
            tenor: Some(tenor.to_string()),
            ..Self::new(name, symbol, InstrumentKind::Yield)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteItem {
    pub name: String,
    pub symbol: String,
    pub price: f64,
    /// Percent change against the previous close.
    pub change: f64,
    #[serde(rename = "Link")]
    pub link: String,
}

/// One treasury yield on the board.
#[derive(Debug, Clone, PartialEq)]
pub struct BondQuote {
    pub tenor: String,
    pub value: f64,
    pub change: f64,
    pub link: String,
}

/// Yields keyed by tenor, serialized as a flat `{tenor}_val/_chg/_link` map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bonds(Vec<BondQuote>);

impl Bonds {
    pub fn get(&self, tenor: &str) -> Option<&BondQuote> {
        self.0.iter().find(|b| b.tenor == tenor)
    }

    pub fn iter(&self) -> impl Iterator<Item = &BondQuote> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn entry(&mut self, tenor: &str) -> &mut BondQuote {
        let idx = match self.0.iter().position(|b| b.tenor == tenor) {
            Some(idx) => idx,
            None => {
                self.0.push(BondQuote {
                    tenor: tenor.to_string(),
                    value: 0.0,
                    change: 0.0,
                    link: String::new(),
                });
                self.0.len() - 1
            }
        };
        &mut self.0[idx]
    }
}

impl FromIterator<BondQuote> for Bonds {
    fn from_iter<I: IntoIterator<Item = BondQuote>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Serialize for Bonds {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len() * 3))?;
        for bond in &self.0 {
            map.serialize_entry(&format!("{}_val", bond.tenor), &bond.value)?;
            map.serialize_entry(&format!("{}_chg", bond.tenor), &bond.change)?;
            map.serialize_entry(&format!("{}_link", bond.tenor), &bond.link)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Bonds {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct BondsVisitor;

        impl<'de> Visitor<'de> for BondsVisitor {
            type Value = Bonds;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of <tenor>_val, <tenor>_chg and <tenor>_link fields")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut bonds = Bonds::default();
                while let Some(key) = map.next_key::<String>()? {
                    if let Some(tenor) = key.strip_suffix("_val") {
                        bonds.entry(tenor).value = map.next_value()?;
                    } else if let Some(tenor) = key.strip_suffix("_chg") {
                        bonds.entry(tenor).change = map.next_value()?;
                    } else if let Some(tenor) = key.strip_suffix("_link") {
                        bonds.entry(tenor).link = map.next_value()?;
                    } else {
                        map.next_value::<serde::de::IgnoredAny>()?;
                    }
                }
                Ok(bonds)
            }
        }

        deserializer.deserialize_map(BondsVisitor)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketBoard {
    pub update_time: String,
    #[serde(default)]
    pub bonds: Bonds,
    pub items: Vec<QuoteItem>,
}

/// Treasury yields, US indices and futures, commodities, crypto, sector ETFs, FX.
pub fn default_instruments() -> Vec<Instrument> {
    use InstrumentKind::*;
    let bonds = [
        ("2Y", "US 2Y Yield", "2YY=F"),
        ("10Y", "US 10Y Yield", "^TNX"),
        ("30Y", "US 30Y Yield", "^TYX"),
    ]
    .into_iter()
    .map(|(tenor, name, symbol)| Instrument::bond(tenor, name, symbol));

    let items = [
        ("Dollar Index", "DX=F", Future),
        ("Nasdaq Composite", "^IXIC", Index),
        ("S&P 500", "^GSPC", Index),
        ("Nasdaq Futures", "NQ=F", Future),
        ("S&P 500 Futures", "ES=F", Future),
        ("WTI Crude", "CL=F", Future),
        ("Gold", "GC=F", Future),
        ("Bitcoin", "BTC-USD", Crypto),
        ("Semiconductors (SOXX)", "SOXX", Etf),
        ("Steel (SLX)", "SLX", Etf),
        ("Copper", "HG=F", Future),
        ("USD/JPY", "JPY=X", Fx),
        ("USD/KRW", "KRW=X", Fx),
    ]
    .into_iter()
    .map(|(name, symbol, kind)| Instrument::new(name, symbol, kind));

    bonds.chain(items).collect()
}

/// Quote one instrument from its last two closes.
pub fn quote(
    provider: &dyn DataProvider,
    instrument: &Instrument,
    end: NaiveDate,
) -> Option<QuoteItem> {
    let start = end - Duration::days(QUOTE_LOOKBACK_DAYS);
    let series = match provider.fetch(&instrument.symbol, start, end) {
        Ok(r) => r.series,
        Err(e) => {
            warn!(symbol = %instrument.symbol, kind = %e.kind(), error = %e, "quote skipped");
            return None;
        }
    };
    let points = series.points();
    let [.., prev, cur] = points else {
        warn!(symbol = %instrument.symbol, observations = points.len(), "quote skipped: fewer than 2 closes");
        return None;
    };
    let change = (cur.close - prev.close) / prev.close * 100.0;
    Some(QuoteItem {
        name: instrument.name.clone(),
        symbol: instrument.symbol.clone(),
        price: round_to(cur.close, instrument.kind.decimals()),
        change: round_to(change, 2),
        link: instrument.link.clone(),
    })
}

pub fn build_board(
    provider: &dyn DataProvider,
    instruments: &[Instrument],
    end: NaiveDate,
    generated_at: NaiveDateTime,
) -> MarketBoard {
    let mut bonds = Vec::new();
    let mut items = Vec::new();
    for instrument in instruments {
        let Some(item) = quote(provider, instrument, end) else {
            continue;
        };
        match &instrument.tenor {
            Some(tenor) => bonds.push(BondQuote {
                tenor: tenor.clone(),
                value: item.price,
                change: item.change,
                link: item.link,
            }),
            None => items.push(item),
        }
    }
    info!(
        bonds = bonds.len(),
        quoted = items.len(),
        requested = instruments.len(),
        "market board built"
    );
    MarketBoard {
        update_time: format_update_time(generated_at),
        bonds: bonds.into_iter().collect(),
        items,
    }
}

/// One console line per yield and item, `+`-signed change.
pub fn render_board(board: &MarketBoard, instruments: &[Instrument]) -> String {
    let bond_names: Vec<String> = board
        .bonds
        .iter()
        .map(|b| {
            instruments
                .iter()
                .find(|i| i.tenor.as_deref() == Some(b.tenor.as_str()))
                .map_or_else(|| format!("{} Yield", b.tenor), |i| i.name.clone())
        })
        .collect();
    let width = bond_names
        .iter()
        .map(|n| n.chars().count())
        .chain(board.items.iter().map(|i| i.name.chars().count()))
        .max()
        .unwrap_or(0);

    let mut out = format!("Updated: {}\n", board.update_time);
    for (bond, name) in board.bonds.iter().zip(&bond_names) {
        out.push_str(&format!(
            " > {:<width$} : {:>9.2}% ({:+.2}%)\n",
            name, bond.value, bond.change
        ));
    }
    if !board.bonds.is_empty() && !board.items.is_empty() {
        out.push_str(&format!("{}\n", "-".repeat(width + 24)));
    }
    for item in &board.items {
        let decimals = instruments
            .iter()
            .find(|i| i.symbol == item.symbol)
            .map_or(2, |i| i.kind.decimals()) as usize;
        out.push_str(&format!(
            " > {:<width$} : {:>10.decimals$} ({:+.2}%)\n",
            item.name, item.price, item.change
        ));
    }
    out
}
