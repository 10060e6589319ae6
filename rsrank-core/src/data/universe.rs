//! Symbol universe: the curated list of stocks a market ranks.
//!
//! Stored as TOML:
//!
//! ```toml
//! [[members]]
//! code = "NVDA"
//! name = "NVIDIA Corporation"
//! sector = "Tech"
//! ```
//!
//! Member order matters: it is the tie-break order of the ranking.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniverseMember {
    pub code: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sector: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Universe {
    pub members: Vec<UniverseMember>,
}

impl Universe {
    pub fn from_file(path: &Path) -> Result<Self, String> {
        let content =
            std::fs::read_to_string(path).map_err(|e| format!("read universe file: {e}"))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| format!("parse universe TOML: {e}"))
    }

    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("serialize universe: {e}"))
    }

    /// Parse `code,name` lines; blank and malformed lines are skipped and a
    /// repeated code keeps its first occurrence.
    pub fn from_code_name_lines(raw: &str) -> Self {
        let mut seen = HashSet::new();
        let members = raw
            .lines()
            .filter_map(|line| {
                let (code, name) = line.split_once(',')?;
                let code = code.trim();
                if code.is_empty() || !seen.insert(code.to_string()) {
                    return None;
                }
                Some(UniverseMember {
                    code: code.to_string(),
                    name: name.trim().to_string(),
                    sector: None,
                })
            })
            .collect();
        Self { members }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.members.iter().map(|m| m.code.as_str())
    }

    pub fn member(&self, code: &str) -> Option<&UniverseMember> {
        self.members.iter().find(|m| m.code == code)
    }

    /// Keep the first `n` members.
    pub fn truncated(mut self, n: usize) -> Self {
        self.members.truncate(n);
        self
    }

    /// First code that appears more than once.
    pub fn duplicate_code(&self) -> Option<&str> {
        let mut seen = HashSet::new();
        self.codes().find(|code| !seen.insert(*code))
    }

    /// KOSPI large caps, by market value at the time the list was curated.
    pub fn kospi_large_caps() -> Self {
        Self::from_code_name_lines(KOSPI_LARGE_CAPS).truncated(50)
    }

    /// US large caps grouped by sector.
    pub fn us_large_caps() -> Self {
        let members = US_LARGE_CAPS
            .iter()
            .flat_map(|(sector, tickers)| {
                tickers.iter().map(move |(code, name)| UniverseMember {
                    code: (*code).to_string(),
                    name: (*name).to_string(),
                    sector: Some((*sector).to_string()),
                })
            })
            .collect();
        Self { members }
    }
}

const KOSPI_LARGE_CAPS: &str = "\
005930,Samsung Electronics
000660,SK hynix
373220,LG Energy Solution
207940,Samsung Biologics
005380,Hyundai Motor Company
329180,HD Hyundai Motor Company
034020,Doosan Energy
012450,Hanwha Aerospace
105560,KB Financial
000270,Kia
068270,Celltrion
035420,NAVER
402340,SK Square
028260,Samsung C&T
055550,Shinhan Holdings
015760,KEPCO
009540,HD Hyundai Heavy Industries
032830,Samsung Life Insurance
051910,LG Chem
012330,Hyundai Mobis
035720,kakao
005490,POSCO Holdings
086790,Hana Financial Group
006400,Samsung SDI
010130,Korea Zinc
000810,Samsung Fire & Marine Insurance
096770,SK Innovation
034730,SK
316140,Woori Financial Group
138040,Meritz Financial Holdings
011200,HMM
003670,POSCO Future M
033780,KT&G
009150,Samsung Electro-Mechanics
024110,Industrial Bank of Korea
066570,LG Electronics
018260,Samsung SDS
352820,hive
030200,KT
003550,LG
086280,Hyundai Glovis
259960,Krafton
042700,Hanmi Semiconductor
017670,SK Telecom
323410,Kakao Bank
010950,S-Oil
326030,SK Biopharm
047050,POSCO International
090430,Amorepacific
";

type SectorList = (&'static str, &'static [(&'static str, &'static str)]);

const US_LARGE_CAPS: &[SectorList] = &[
    (
        "Tech",
        &[
            ("MSFT", "Microsoft Corporation"),
            ("GOOGL", "Alphabet Inc."),
            ("META", "Meta Platforms, Inc."),
            ("NVDA", "NVIDIA Corporation"),
            ("AAPL", "Apple Inc."),
            ("AMD", "Advanced Micro Devices"),
            ("AVGO", "Broadcom Inc."),
            ("MU", "Micron Technology"),
        ],
    ),
    (
        "Healthcare",
        &[
            ("LLY", "Eli Lilly and Company"),
            ("MRNA", "Moderna, Inc."),
            ("PFE", "Pfizer Inc."),
            ("JNJ", "Johnson & Johnson"),
        ],
    ),
    (
        "Consumer",
        &[
            ("AMZN", "Amazon.com, Inc."),
            ("WMT", "Walmart Inc."),
            ("TSLA", "Tesla, Inc."),
            ("GM", "General Motors"),
            ("F", "Ford Motor Company"),
            ("MGM", "MGM Resorts International"),
            ("MAR", "Marriott International"),
        ],
    ),
    (
        "Financials",
        &[
            ("JPM", "JPMorgan Chase & Co."),
            ("V", "Visa Inc."),
            ("BAC", "Bank of America"),
        ],
    ),
    (
        "Energy/Materials",
        &[
            ("XOM", "Exxon Mobil Corporation"),
            ("CVX", "Chevron Corporation"),
            ("SLB", "Schlumberger Limited"),
            ("ALB", "Albemarle Corporation"),
            ("RIO", "Rio Tinto Group"),
            ("NEM", "Newmont Corporation"),
            ("DOW", "Dow Inc."),
            ("NUE", "Nucor Corporation"),
        ],
    ),
    (
        "Industrials",
        &[
            ("CAT", "Caterpillar Inc."),
            ("DE", "John Deere & Co."),
            ("LMT", "Lockheed Martin"),
            ("RTX", "RTX Corporation"),
        ],
    ),
];
