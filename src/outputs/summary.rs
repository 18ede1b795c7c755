//! Plain-text ranking of a run's entities.

use crate::models::RunReport;
use crate::utils::upcase;
use std::fmt::Write;

// Writing into a String cannot fail, so `writeln!` results are discarded.

/// Render the headline count, a few sample headlines, and the top `top_n`
/// entries of each bucket.
///
/// Empty buckets are reported as "No data found for ..." rather than omitted.
pub fn render_summary(report: &RunReport, top_n: usize) -> String {
    let mut out = String::new();

    let _ = writeln!(
        out,
        "Scraped {} headlines from {} ({} strategy)",
        report.headlines.len(),
        report.target_url,
        report.strategy
    );
    for headline in report.headlines.iter().take(5) {
        let _ = writeln!(out, "  - {} <{}>", headline.title, headline.url);
    }

    for (label, table) in report.entities.labeled() {
        let _ = writeln!(out);
        let ranked = table.most_common(top_n);
        if ranked.is_empty() {
            let _ = writeln!(out, "No data found for {}", upcase(label));
            continue;
        }

        let _ = writeln!(
            out,
            "Top {} {} ({} distinct, {} mentions)",
            top_n,
            upcase(label),
            table.len(),
            table.total()
        );
        let width = ranked.iter().map(|(text, _)| text.chars().count()).max().unwrap_or(0);
        for (rank, (text, count)) in ranked.iter().enumerate() {
            let _ = writeln!(out, "{:>3}. {:<width$}  {}", rank + 1, text, count);
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EntityBuckets, HeadlineRecord};

    fn report() -> RunReport {
        let mut entities = EntityBuckets::default();
        entities.names.record("Imran Khan");
        entities.names.record("Imran Khan");
        entities.names.record("Bilawal");
        entities.things.record("IMF");
        RunReport {
            target_url: "https://www.geo.tv/latest-news".to_string(),
            strategy: "static".to_string(),
            acquired_at: "2025-05-06T17:30:42Z".to_string(),
            headlines: vec![HeadlineRecord {
                title: "Imran Khan, Bilawal trade barbs".to_string(),
                url: "https://www.geo.tv/latest/7".to_string(),
            }],
            entities,
        }
    }

    #[test]
    fn test_summary_ranks_entities() {
        let text = render_summary(&report(), 10);

        assert!(text.starts_with("Scraped 1 headlines from https://www.geo.tv/latest-news"));
        assert!(text.contains(
            "Top 10 Names (2 distinct, 3 mentions)\n  1. Imran Khan  2\n  2. Bilawal     1\n"
        ));
        assert!(text.contains("Top 10 Things (1 distinct, 1 mentions)\n  1. IMF  1\n"));
    }

    #[test]
    fn test_summary_reports_empty_buckets() {
        let text = render_summary(&report(), 10);
        assert!(text.contains("No data found for Places"));
        assert!(!text.contains("No data found for Names"));
    }

    #[test]
    fn test_summary_respects_top_n() {
        let text = render_summary(&report(), 1);
        assert!(text.contains("Top 1 Names (2 distinct, 3 mentions)\n  1. Imran Khan  2\n"));
        assert!(!text.contains("Bilawal     1"));
    }
}
