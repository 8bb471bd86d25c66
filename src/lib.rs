// SPDX-FileCopyrightText: 2026 Watchtower contributors
// SPDX-License-Identifier: MIT

//! Watchtower — terminal intelligence dashboard.
//!
//! Aggregates world news feeds, geo-targeted local news, crypto/stock/commodity
//! prices, prediction markets, weather, and an LLM-generated intel brief into
//! one always-current TUI view.

pub mod config;
pub mod feeds;
pub mod fetch;
pub mod intel;
pub mod markets;
pub mod tui;
pub mod weather;

#[cfg(test)]
mod tests {
    #[test]
    fn sanity() {
        assert_eq!(2 + 2, 4);
    }
}
