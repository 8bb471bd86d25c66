// SPDX-FileCopyrightText: 2026 Watchtower contributors
// SPDX-License-Identifier: MIT

//! News feed ingestion and threat classification.
//!
//! Fetches a fixed table of world RSS feeds (plus two geo-targeted Google News
//! feeds for the local tab), keeps only items published within the last 24
//! hours, classifies each headline into an ordered severity tier, sorts by
//! severity then recency, and collapses near-duplicate titles.

use std::fmt;

use chrono::{DateTime, Duration, Utc};

use crate::fetch::FetchError;

/// Ordered severity tier for a headline. Higher sorts first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Severity {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn label(self) -> &'static str {
        match self {
            Severity::Critical => "CRITICAL",
            Severity::High => "HIGH",
            Severity::Medium => "MEDIUM",
            Severity::Low => "LOW",
            Severity::Info => "INFO",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One classified news article.
#[derive(Debug, Clone, PartialEq)]
pub struct NewsItem {
    pub title: String,
    pub source: String,
    pub published: DateTime<Utc>,
    pub url: String,
    pub severity: Severity,
    pub category: &'static str,
    pub is_local: bool,
}

/// A named feed endpoint.
#[derive(Debug, Clone)]
pub struct FeedSource {
    pub name: String,
    pub url: String,
}

/// World news RSS sources backing the global tab.
pub const GLOBAL_FEEDS: &[(&str, &str)] = &[
    ("Reuters", "https://feeds.reuters.com/reuters/topNews"),
    ("BBC World", "http://feeds.bbci.co.uk/news/world/rss.xml"),
    ("AP News", "https://rsshub.app/apnews/topics/apf-topnews"),
    ("Al Jazeera", "https://www.aljazeera.com/xml/rss/all.xml"),
    ("The Guardian", "https://www.theguardian.com/world/rss"),
    ("Defense News", "https://www.defensenews.com/arc/outboundfeeds/rss/"),
    ("Politico", "https://rss.politico.com/politics-news.xml"),
    ("Foreign Policy", "https://foreignpolicy.com/feed/"),
];

/// Geo-targeted feeds derived from the configured city/country.
pub fn local_feed_urls(city: &str, country: &str) -> Vec<FeedSource> {
    vec![
        FeedSource {
            name: "Google News Local".to_owned(),
            url: format!(
                "https://news.google.com/rss/search?q={}+news&hl=en&gl={country}&ceid={country}:en",
                city.replace(' ', "+"),
            ),
        },
        FeedSource {
            name: "Google News Country".to_owned(),
            url: format!(
                "https://news.google.com/rss/headlines/section/geo/{}",
                city.replace(' ', "%20"),
            ),
        },
    ]
}

struct KeywordTier {
    severity: Severity,
    category: &'static str,
    words: &'static [&'static str],
}

// Tier order is load-bearing: classification is first-match-wins, scanning
// from the top. Substring collisions between tiers resolve to the earlier
// (more severe) tier.
static THREAT_KEYWORDS: &[KeywordTier] = &[
    KeywordTier {
        severity: Severity::Critical,
        category: "conflict",
        words: &[
            "nuclear",
            "missile strike",
            "war declared",
            "invasion",
            "airstrike kills",
            "coup",
            "assassination",
            "mass casualty",
            "chemical weapon",
            "dirty bomb",
            "martial law",
            "genocide",
        ],
    },
    KeywordTier {
        severity: Severity::High,
        category: "security",
        words: &[
            "attack",
            "bombing",
            "explosion",
            "shooting",
            "killed",
            "hostage",
            "terrorist",
            "conflict",
            "offensive",
            "troops deployed",
            "sanctions",
            "ceasefire",
            "escalation",
            "warship",
            "military exercises",
        ],
    },
    KeywordTier {
        severity: Severity::High,
        category: "disaster",
        words: &[
            "earthquake",
            "tsunami",
            "hurricane",
            "typhoon",
            "flood kills",
            "wildfire",
            "eruption",
            "catastrophic",
        ],
    },
    KeywordTier {
        severity: Severity::Medium,
        category: "politics",
        words: &[
            "election",
            "protest",
            "crisis",
            "emergency",
            "shutdown",
            "impeachment",
            "indicted",
            "arrested",
            "detained",
            "expelled",
            "diplomatic",
            "summit",
            "agreement",
        ],
    },
    KeywordTier {
        severity: Severity::Medium,
        category: "economy",
        words: &[
            "recession",
            "crash",
            "collapse",
            "default",
            "bankrupt",
            "inflation",
            "unemployment spike",
            "rate hike",
            "supply chain",
        ],
    },
    KeywordTier {
        severity: Severity::Medium,
        category: "cyber",
        words: &[
            "hack",
            "breach",
            "ransomware",
            "cyberattack",
            "data leak",
            "malware",
            "phishing campaign",
            "zero-day",
        ],
    },
    KeywordTier {
        severity: Severity::Low,
        category: "general",
        words: &[
            "trade deal",
            "policy",
            "reform",
            "budget",
            "statement",
            "meeting",
            "conference",
            "report",
        ],
    },
];

/// Maps a headline to a severity tier and category.
///
/// Scans tiers in priority order and returns the first tier containing a
/// case-insensitive substring match; no match falls through to (Info,
/// "general"). Total and deterministic.
pub fn classify(title: &str) -> (Severity, &'static str) {
    let lower = title.to_lowercase();
    for tier in THREAT_KEYWORDS {
        if tier.words.iter().any(|kw| lower.contains(kw)) {
            return (tier.severity, tier.category);
        }
    }
    (Severity::Info, "general")
}

/// Fetches and classifies world news.
pub async fn fetch_global_news(client: &reqwest::Client) -> Result<Vec<NewsItem>, FetchError> {
    let sources = GLOBAL_FEEDS
        .iter()
        .map(|(name, url)| FeedSource {
            name: (*name).to_owned(),
            url: (*url).to_owned(),
        })
        .collect::<Vec<_>>();
    fetch_feeds(client, sources, false).await
}

/// Fetches and classifies geo-targeted local news.
pub async fn fetch_local_news(
    client: &reqwest::Client,
    city: &str,
    country: &str,
) -> Result<Vec<NewsItem>, FetchError> {
    fetch_feeds(client, local_feed_urls(city, country), true).await
}

/// Fetches every feed concurrently; a feed that fails or times out is
/// silently skipped so partial success is the normal case.
async fn fetch_feeds(
    client: &reqwest::Client,
    sources: Vec<FeedSource>,
    is_local: bool,
) -> Result<Vec<NewsItem>, FetchError> {
    let cutoff = Utc::now() - Duration::hours(24);

    let fetches = sources
        .into_iter()
        .map(|source| fetch_one_feed(client, source, cutoff, is_local));
    let batches = futures::future::join_all(fetches).await;

    let mut items = batches.into_iter().flatten().flatten().collect::<Vec<_>>();
    Ok(sort_and_dedup(&mut items))
}

async fn fetch_one_feed(
    client: &reqwest::Client,
    source: FeedSource,
    cutoff: DateTime<Utc>,
    is_local: bool,
) -> Option<Vec<NewsItem>> {
    let response = client.get(&source.url).send().await.ok()?;
    if !response.status().is_success() {
        return None;
    }
    let body = response.bytes().await.ok()?;
    let feed = feed_rs::parser::parse(body.as_ref()).ok()?;

    let mut items = Vec::new();
    for entry in feed.entries {
        let Some(title) = entry.title.map(|t| t.content) else {
            continue;
        };
        if title.is_empty() {
            continue;
        }
        let published = entry.published.or(entry.updated).unwrap_or_else(Utc::now);
        if published < cutoff {
            continue;
        }
        let (severity, category) = classify(&title);
        let url = entry
            .links
            .first()
            .map(|link| link.href.clone())
            .unwrap_or_default();
        items.push(NewsItem {
            title,
            source: source.name.clone(),
            published,
            url,
            severity,
            category,
            is_local,
        });
    }
    Some(items)
}

/// Sorts severity-first then newest-first, and collapses items sharing a
/// lowercase 40-character title prefix to the first-seen survivor.
pub fn sort_and_dedup(items: &mut Vec<NewsItem>) -> Vec<NewsItem> {
    items.sort_by(|a, b| {
        b.severity
            .cmp(&a.severity)
            .then_with(|| b.published.cmp(&a.published))
    });

    let mut seen = std::collections::HashSet::new();
    let mut deduped = Vec::with_capacity(items.len());
    for item in items.drain(..) {
        if seen.insert(dedup_key(&item.title)) {
            deduped.push(item);
        }
    }
    deduped
}

fn dedup_key(title: &str) -> String {
    title.to_lowercase().chars().take(40).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn item(title: &str, minutes_ago: i64) -> NewsItem {
        let (severity, category) = classify(title);
        NewsItem {
            title: title.to_owned(),
            source: "Test".to_owned(),
            published: Utc::now() - Duration::minutes(minutes_ago),
            url: String::new(),
            severity,
            category,
            is_local: false,
        }
    }

    #[rstest]
    #[case("Nuclear talks stall as tensions rise", Severity::Critical, "conflict")]
    #[case("Missile strike reported near border", Severity::Critical, "conflict")]
    #[case("Explosion rocks downtown district", Severity::High, "security")]
    #[case("Earthquake of magnitude 7.1 hits coast", Severity::High, "disaster")]
    #[case("Election results contested in runoff", Severity::Medium, "politics")]
    #[case("Inflation hits a three-decade high", Severity::Medium, "economy")]
    #[case("Ransomware gang hits hospital network", Severity::Medium, "cyber")]
    #[case("Ministers sign landmark trade deal", Severity::Low, "general")]
    #[case("Local bakery wins pastry award", Severity::Info, "general")]
    fn classifies_by_first_matching_tier(
        #[case] title: &str,
        #[case] severity: Severity,
        #[case] category: &'static str,
    ) {
        assert_eq!(classify(title), (severity, category));
    }

    #[test]
    fn critical_beats_medium_when_both_match() {
        // "nuclear" (critical) and "crisis" (medium) both match.
        let (severity, category) = classify("Nuclear crisis deepens after summit");
        assert_eq!(severity, Severity::Critical);
        assert_eq!(category, "conflict");
    }

    #[test]
    fn classification_is_case_insensitive() {
        assert_eq!(classify("INVASION imminent, officials warn").0, Severity::Critical);
    }

    #[test]
    fn cyberattack_resolves_to_high_via_attack_substring() {
        // "cyberattack" contains "attack"; the high/security tier scans
        // before medium/cyber, so first-match-wins resolves high.
        let (severity, category) = classify("Major cyberattack disrupts grid");
        assert_eq!(severity, Severity::High);
        assert_eq!(category, "security");
    }

    #[test]
    fn unmatched_title_falls_through_to_info() {
        assert_eq!(classify(""), (Severity::Info, "general"));
        assert_eq!(classify("Quiet day everywhere"), (Severity::Info, "general"));
    }

    #[test]
    fn sort_orders_severity_then_recency() {
        let mut items = vec![
            item("Ministers sign landmark trade deal", 5),
            item("Missile strike reported near border", 60),
            item("Explosion rocks downtown district", 10),
            item("Nuclear talks stall as tensions rise", 120),
        ];
        let sorted = sort_and_dedup(&mut items);
        assert_eq!(sorted[0].severity, Severity::Critical);
        assert_eq!(sorted[1].severity, Severity::Critical);
        // Within the critical tier, newer first.
        assert!(sorted[0].published > sorted[1].published);
        assert_eq!(sorted[2].severity, Severity::High);
        assert_eq!(sorted[3].severity, Severity::Low);
    }

    #[test]
    fn dedup_collapses_shared_40_char_prefix() {
        let long = "A very long headline that keeps going well past forty characters easily";
        let mut items = vec![item(long, 5), item(&long.to_uppercase(), 50)];
        let deduped = sort_and_dedup(&mut items);
        assert_eq!(deduped.len(), 1);
        // First-seen survivor is the post-sort first (newer) instance.
        assert_eq!(deduped[0].title, long);
    }

    #[test]
    fn short_titles_dedup_on_full_title() {
        let mut items = vec![item("Short one", 5), item("Short two", 5)];
        assert_eq!(sort_and_dedup(&mut items).len(), 2);
    }

    #[test]
    fn twelve_items_with_two_duplicate_pairs_yield_ten() {
        let titles = [
            "Nuclear talks stall as tensions rise in the region tonight",
            "Missile strike reported near border town amid escalation",
            "Explosion rocks downtown district, casualties feared",
            "Earthquake of magnitude 7.1 hits coast, tsunami watch",
            "Election results contested in runoff, recount ordered",
            "Inflation hits a three-decade high, markets slump",
            "Ransomware gang hits hospital network across three states",
            "Ministers sign landmark trade deal after marathon talks",
            "Quiet diplomatic reshuffle passes without much notice",
            "Local orchestra announces surprise open-air season",
        ];
        let mut items = Vec::new();
        for (i, title) in titles.iter().enumerate() {
            items.push(item(title, i as i64));
        }
        // Two duplicate-prefix pairs (case differs, prefix shared).
        items.push(item(&titles[0].to_uppercase(), 500));
        items.push(item(&titles[7].to_uppercase(), 500));
        assert_eq!(items.len(), 12);

        let deduped = sort_and_dedup(&mut items);
        assert_eq!(deduped.len(), 10);
        // Survivors keep severity-then-recency order.
        for pair in deduped.windows(2) {
            assert!(
                pair[0].severity > pair[1].severity
                    || (pair[0].severity == pair[1].severity
                        && pair[0].published >= pair[1].published)
            );
        }
        // The first-seen (newer, original-case) instances survived.
        assert!(deduped.iter().any(|i| i.title == titles[0]));
        assert!(deduped.iter().any(|i| i.title == titles[7]));
    }

    #[test]
    fn local_feed_urls_encode_city_and_country() {
        let feeds = local_feed_urls("Rio de Janeiro", "BR");
        assert_eq!(feeds.len(), 2);
        assert!(feeds[0].url.contains("Rio+de+Janeiro+news"));
        assert!(feeds[0].url.contains("gl=BR"));
        assert!(feeds[1].url.contains("Rio%20de%20Janeiro"));
    }
}
