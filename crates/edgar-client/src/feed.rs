//! Discovery of filing candidates from the EDGAR "current filings" Atom feed.

use chrono::{DateTime, Utc};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use radar_core::FilingCandidate;

/// Parse an Atom feed body into candidates, most recent first, truncated to
/// `limit`. Entries missing both an accession number and a resolvable filing
/// folder are skipped; duplicate accessions keep their first-seen position.
pub fn discover(feed_body: &str, limit: usize) -> Vec<FilingCandidate> {
    let mut reader = Reader::from_str(feed_body);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    let mut candidates: Vec<FilingCandidate> = Vec::new();
    let mut seen_ids: std::collections::HashSet<String> = std::collections::HashSet::new();

    let mut in_entry = false;
    let mut current_tag = String::new();
    let mut entry_id = String::new();
    let mut entry_updated = String::new();
    let mut entry_href = String::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                if name == "entry" {
                    in_entry = true;
                    entry_id.clear();
                    entry_updated.clear();
                    entry_href.clear();
                } else if in_entry && name == "link" {
                    capture_href(&e, &mut entry_href);
                } else {
                    current_tag = name;
                }
            }
            Ok(Event::Empty(e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                if in_entry && name == "link" {
                    capture_href(&e, &mut entry_href);
                }
            }
            Ok(Event::Text(e)) => {
                if !in_entry {
                    continue;
                }
                let text = e.unescape().unwrap_or_default().trim().to_string();
                match current_tag.as_str() {
                    "id" => entry_id = text,
                    "updated" => entry_updated = text,
                    _ => {}
                }
            }
            Ok(Event::End(e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                if name == "entry" && in_entry {
                    in_entry = false;
                    if let Some(candidate) =
                        finish_entry(&entry_id, &entry_href, &entry_updated)
                    {
                        if seen_ids.insert(candidate.accession.clone()) {
                            candidates.push(candidate);
                        }
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                tracing::warn!("Atom feed parse stopped early: {}", e);
                break;
            }
            _ => {}
        }
        buf.clear();
    }

    candidates.truncate(limit);
    candidates
}

fn capture_href(e: &BytesStart<'_>, out: &mut String) {
    // Keep the first link that points into the filing archive.
    if !out.is_empty() {
        return;
    }
    for attr in e.attributes().flatten() {
        if attr.key.local_name().as_ref() == b"href" {
            let href = String::from_utf8_lossy(&attr.value).to_string();
            if href.contains("Archives/edgar/data") {
                *out = href;
            }
        }
    }
}

fn finish_entry(id: &str, href: &str, updated: &str) -> Option<FilingCandidate> {
    let accession = accession_from_id(id).or_else(|| accession_from_href(href))?;
    let base_url = folder_from_href(href)?;
    let discovered_at = DateTime::parse_from_rfc3339(updated)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now());

    Some(FilingCandidate {
        accession,
        base_url,
        discovered_at,
    })
}

/// Atom entry ids look like
/// `urn:tag:sec.gov,2008:accession-number=0001234567-25-000123`.
fn accession_from_id(id: &str) -> Option<String> {
    let accession = id.split("accession-number=").nth(1)?.trim();
    if is_accession(accession) {
        Some(accession.to_string())
    } else {
        None
    }
}

/// Fallback: the index link ends in `<accession>-index.htm`.
fn accession_from_href(href: &str) -> Option<String> {
    let file = href.rsplit('/').next()?;
    let stem = file
        .strip_suffix("-index.htm")
        .or_else(|| file.strip_suffix("-index.html"))?;
    if is_accession(stem) {
        Some(stem.to_string())
    } else {
        None
    }
}

/// Accession numbers are `##########-##-######`.
fn is_accession(s: &str) -> bool {
    let parts: Vec<&str> = s.split('-').collect();
    parts.len() == 3
        && parts[0].len() == 10
        && parts[1].len() == 2
        && parts[2].len() == 6
        && parts.iter().all(|p| p.bytes().all(|b| b.is_ascii_digit()))
}

/// The filing folder is the index page's containing directory.
fn folder_from_href(href: &str) -> Option<String> {
    if !href.contains("Archives/edgar/data") {
        return None;
    }
    let (folder, _) = href.rsplit_once('/')?;
    Some(format!("{}/", folder))
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"<?xml version="1.0" encoding="ISO-8859-1"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Latest Filings</title>
  <entry>
    <title>4 - ACME CORP (0000123456) (Issuer)</title>
    <link rel="alternate" type="text/html"
          href="https://www.sec.gov/Archives/edgar/data/123456/000012345625000010/0001234567-25-000010-index.htm"/>
    <id>urn:tag:sec.gov,2008:accession-number=0001234567-25-000010</id>
    <updated>2025-03-01T16:05:00-05:00</updated>
  </entry>
  <entry>
    <title>4 - ACME CORP (0000123456) (Reporting)</title>
    <link rel="alternate" type="text/html"
          href="https://www.sec.gov/Archives/edgar/data/123456/000012345625000010/0001234567-25-000010-index.htm"/>
    <id>urn:tag:sec.gov,2008:accession-number=0001234567-25-000010</id>
    <updated>2025-03-01T16:05:00-05:00</updated>
  </entry>
  <entry>
    <title>4 - WIDGETS INC (0000654321) (Issuer)</title>
    <link rel="alternate" type="text/html"
          href="https://www.sec.gov/Archives/edgar/data/654321/000065432125000099/0006543210-25-000099-index.htm"/>
    <id>urn:tag:sec.gov,2008:accession-number=0006543210-25-000099</id>
    <updated>2025-03-01T16:01:00-05:00</updated>
  </entry>
  <entry>
    <title>4 - BROKEN ENTRY</title>
    <id>urn:tag:sec.gov,2008:malformed</id>
    <updated>2025-03-01T15:59:00-05:00</updated>
  </entry>
</feed>"#;

    #[test]
    fn test_discover_collapses_duplicates_preserving_order() {
        let candidates = discover(FEED, 100);
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].accession, "0001234567-25-000010");
        assert_eq!(candidates[1].accession, "0006543210-25-000099");
        assert_eq!(
            candidates[0].base_url,
            "https://www.sec.gov/Archives/edgar/data/123456/000012345625000010/"
        );
    }

    #[test]
    fn test_discover_respects_limit() {
        let candidates = discover(FEED, 1);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].accession, "0001234567-25-000010");
    }

    #[test]
    fn test_entry_without_link_or_accession_is_skipped() {
        let candidates = discover(FEED, 100);
        assert!(candidates.iter().all(|c| !c.base_url.is_empty()));
    }

    #[test]
    fn test_namespace_prefixed_feed() {
        let feed = FEED.replace("<entry>", "<atom:entry>").replace(
            "</entry>",
            "</atom:entry>",
        );
        let candidates = discover(&feed, 100);
        assert_eq!(candidates.len(), 2);
    }

    #[test]
    fn test_accession_from_href_fallback() {
        assert_eq!(
            accession_from_href(
                "https://www.sec.gov/Archives/edgar/data/1/2/0001234567-25-000010-index.htm"
            )
            .as_deref(),
            Some("0001234567-25-000010")
        );
        assert_eq!(accession_from_href("https://example.com/file.htm"), None);
    }

    #[test]
    fn test_discover_never_panics_on_garbage() {
        for input in ["", "not xml", "<entry>", "<feed><entry></entry></feed>", "<<<>"] {
            let _ = discover(input, 10);
        }
    }
}
