//! Form 4 (ownership document) extraction.
//!
//! Filers' tooling emits these documents with and without namespace prefixes
//! and with leaf values either as direct text or wrapped in a `<value>`
//! element, so matching is by local tag name against the element stack, never
//! by literal substring or full qualified name.

use quick_xml::events::Event;
use quick_xml::Reader;

use radar_core::{InsiderRole, RadarError, TransactionRecord};

/// Everything extracted from one Form 4 document. `ticker` is `None` when
/// the issuer block carries no trading symbol; no records are produced then.
#[derive(Debug, Default)]
pub struct Form4Document {
    pub ticker: Option<String>,
    pub owner: Option<String>,
    pub role: InsiderRole,
    pub transactions: Vec<TransactionRecord>,
}

/// Raw leaf values of one non-derivative transaction block, before the
/// positive-number checks decide whether a record materializes.
#[derive(Debug, Default)]
struct TxnFields {
    code: Option<String>,
    shares: Option<String>,
    price: Option<String>,
    date: Option<String>,
}

/// Parse a Form 4 body. Malformed XML is a parse error; a well-formed
/// document with zero qualifying transaction blocks is an empty result.
pub fn extract(document: &str, accession: &str) -> Result<Form4Document, RadarError> {
    let mut reader = Reader::from_str(document);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    let mut out = Form4Document::default();
    let mut stack: Vec<String> = Vec::new();
    let mut current_txn: Option<TxnFields> = None;
    let mut raw_txns: Vec<TxnFields> = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                if name == "nonDerivativeTransaction" {
                    current_txn = Some(TxnFields::default());
                }
                stack.push(name);
            }
            Ok(Event::End(_)) => {
                if stack.pop().as_deref() == Some("nonDerivativeTransaction") {
                    if let Some(txn) = current_txn.take() {
                        raw_txns.push(txn);
                    }
                }
            }
            Ok(Event::Text(e)) => {
                let text = e.unescape().unwrap_or_default().trim().to_string();
                if text.is_empty() {
                    continue;
                }
                route_text(&stack, &text, &mut out, &mut current_txn);
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(RadarError::Parse(format!("form 4 {}: {}", accession, e)));
            }
            _ => {}
        }
        buf.clear();
    }

    let Some(ticker) = out.ticker.clone() else {
        return Ok(out);
    };

    for txn in raw_txns {
        match materialize(&txn, &ticker, &out, accession) {
            Some(record) => out.transactions.push(record),
            None => tracing::debug!(
                "Dropping transaction in {} with missing or non-positive fields",
                accession
            ),
        }
    }

    Ok(out)
}

/// Assign a text node based on the element stack. The effective element is
/// the leaf, or the leaf's parent when the leaf is a `<value>` wrapper.
fn route_text(
    stack: &[String],
    text: &str,
    out: &mut Form4Document,
    current_txn: &mut Option<TxnFields>,
) {
    let mut leaf = stack.len();
    if stack.last().map(String::as_str) == Some("value") {
        leaf -= 1;
    }
    let Some(effective) = leaf.checked_sub(1).and_then(|i| stack.get(i)) else {
        return;
    };

    // Derivative transactions are out of scope; their blocks reuse the same
    // leaf names, so they must be excluded by ancestry.
    if stack.iter().any(|n| n == "derivativeTransaction") {
        return;
    }

    if stack.iter().any(|n| n == "nonDerivativeTransaction") {
        if let Some(txn) = current_txn {
            let slot = match effective.as_str() {
                "transactionCode" => &mut txn.code,
                "transactionShares" => &mut txn.shares,
                "transactionPricePerShare" => &mut txn.price,
                "transactionDate" => &mut txn.date,
                _ => return,
            };
            if slot.is_none() {
                *slot = Some(text.to_string());
            }
        }
        return;
    }

    // Document-level fields; first occurrence wins so a second reporting
    // owner cannot overwrite the primary one.
    match effective.as_str() {
        "issuerTradingSymbol" => {
            if out.ticker.is_none() {
                let ticker = text.to_uppercase();
                if !ticker.is_empty() {
                    out.ticker = Some(ticker);
                }
            }
        }
        "rptOwnerName" => {
            if out.owner.is_none() {
                out.owner = Some(text.to_string());
            }
        }
        "isOfficer" => out.role.is_officer |= parse_flag(text),
        "isDirector" => out.role.is_director |= parse_flag(text),
        "isTenPercentOwner" => out.role.is_ten_percent_owner |= parse_flag(text),
        "officerTitle" => {
            if out.role.officer_title.is_none() {
                out.role.officer_title = Some(text.to_string());
            }
        }
        _ => {}
    }
}

fn parse_flag(text: &str) -> bool {
    matches!(text.trim(), "1" | "true" | "TRUE" | "True")
}

/// A record only exists when code, shares and price are present and the
/// numbers are positive; nothing is defaulted to zero.
fn materialize(
    txn: &TxnFields,
    ticker: &str,
    doc: &Form4Document,
    accession: &str,
) -> Option<TransactionRecord> {
    let code = txn.code.as_deref()?.trim().to_string();
    let shares = parse_positive(txn.shares.as_deref()?)?;
    let price = parse_positive(txn.price.as_deref()?)?;

    Some(TransactionRecord {
        ticker: ticker.to_string(),
        owner: doc.owner.clone().unwrap_or_default(),
        role: doc.role.clone(),
        code,
        shares,
        price,
        date: txn.date.clone().unwrap_or_default(),
        accession: accession.to_string(),
    })
}

fn parse_positive(raw: &str) -> Option<f64> {
    let value: f64 = raw.replace(',', "").trim().parse().ok()?;
    (value.is_finite() && value > 0.0).then_some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"<?xml version="1.0"?>
<ownershipDocument>
  <issuer>
    <issuerCik>0000123456</issuerCik>
    <issuerName>Acme Corp</issuerName>
    <issuerTradingSymbol>ACME</issuerTradingSymbol>
  </issuer>
  <reportingOwner>
    <reportingOwnerId>
      <rptOwnerName>Doe Jane</rptOwnerName>
    </reportingOwnerId>
    <reportingOwnerRelationship>
      <isDirector>0</isDirector>
      <isOfficer>1</isOfficer>
      <isTenPercentOwner>0</isTenPercentOwner>
      <officerTitle>Chief Executive Officer</officerTitle>
    </reportingOwnerRelationship>
  </reportingOwner>
  <nonDerivativeTable>
    <nonDerivativeTransaction>
      <transactionDate><value>2025-03-01</value></transactionDate>
      <transactionCoding>
        <transactionCode>P</transactionCode>
      </transactionCoding>
      <transactionAmounts>
        <transactionShares><value>1,000</value></transactionShares>
        <transactionPricePerShare><value>200.00</value></transactionPricePerShare>
      </transactionAmounts>
    </nonDerivativeTransaction>
    <nonDerivativeTransaction>
      <transactionDate><value>2025-03-01</value></transactionDate>
      <transactionCoding>
        <transactionCode>S</transactionCode>
      </transactionCoding>
      <transactionAmounts>
        <transactionShares><value>500</value></transactionShares>
        <transactionPricePerShare><value>199.50</value></transactionPricePerShare>
      </transactionAmounts>
    </nonDerivativeTransaction>
  </nonDerivativeTable>
</ownershipDocument>"#;

    #[test]
    fn test_extracts_transactions_with_value_wrappers() {
        let doc = extract(DOC, "0001234567-25-000010").unwrap();
        assert_eq!(doc.ticker.as_deref(), Some("ACME"));
        assert_eq!(doc.owner.as_deref(), Some("Doe Jane"));
        assert!(doc.role.is_officer);
        assert!(!doc.role.is_director);
        assert_eq!(
            doc.role.officer_title.as_deref(),
            Some("Chief Executive Officer")
        );

        assert_eq!(doc.transactions.len(), 2);
        let purchase = &doc.transactions[0];
        assert_eq!(purchase.code, "P");
        assert_eq!(purchase.shares, 1_000.0);
        assert_eq!(purchase.price, 200.0);
        assert_eq!(purchase.value(), 200_000.0);
        assert_eq!(purchase.date, "2025-03-01");
        assert_eq!(purchase.accession, "0001234567-25-000010");

        // Sales are materialized too; classification is the filter's job.
        assert_eq!(doc.transactions[1].code, "S");
    }

    #[test]
    fn test_namespace_prefixes_are_ignored() {
        let prefixed = DOC
            .replace("<ownershipDocument>", "<ns1:ownershipDocument xmlns:ns1=\"urn:x\">")
            .replace("</ownershipDocument>", "</ns1:ownershipDocument>")
            .replace("<issuerTradingSymbol>", "<ns1:issuerTradingSymbol>")
            .replace("</issuerTradingSymbol>", "</ns1:issuerTradingSymbol>");
        let doc = extract(&prefixed, "a").unwrap();
        assert_eq!(doc.ticker.as_deref(), Some("ACME"));
        assert_eq!(doc.transactions.len(), 2);
    }

    #[test]
    fn test_direct_text_without_value_wrapper() {
        let flat = r#"<ownershipDocument>
  <issuer><issuerTradingSymbol>wdgt</issuerTradingSymbol></issuer>
  <nonDerivativeTable>
    <nonDerivativeTransaction>
      <transactionDate>2025-02-10</transactionDate>
      <transactionCoding><transactionCode>P</transactionCode></transactionCoding>
      <transactionAmounts>
        <transactionShares>250</transactionShares>
        <transactionPricePerShare>40.5</transactionPricePerShare>
      </transactionAmounts>
    </nonDerivativeTransaction>
  </nonDerivativeTable>
</ownershipDocument>"#;
        let doc = extract(flat, "a").unwrap();
        assert_eq!(doc.ticker.as_deref(), Some("WDGT"));
        assert_eq!(doc.transactions.len(), 1);
        assert_eq!(doc.transactions[0].shares, 250.0);
        assert_eq!(doc.transactions[0].date, "2025-02-10");
    }

    #[test]
    fn test_missing_price_drops_record() {
        let missing = r#"<ownershipDocument>
  <issuer><issuerTradingSymbol>ACME</issuerTradingSymbol></issuer>
  <nonDerivativeTransaction>
    <transactionCoding><transactionCode>P</transactionCode></transactionCoding>
    <transactionAmounts>
      <transactionShares><value>1000</value></transactionShares>
    </transactionAmounts>
  </nonDerivativeTransaction>
</ownershipDocument>"#;
        let doc = extract(missing, "a").unwrap();
        assert!(doc.transactions.is_empty());
    }

    #[test]
    fn test_zero_or_negative_numbers_drop_record() {
        let zero = r#"<ownershipDocument>
  <issuer><issuerTradingSymbol>ACME</issuerTradingSymbol></issuer>
  <nonDerivativeTransaction>
    <transactionCoding><transactionCode>P</transactionCode></transactionCoding>
    <transactionAmounts>
      <transactionShares><value>0</value></transactionShares>
      <transactionPricePerShare><value>10</value></transactionPricePerShare>
    </transactionAmounts>
  </nonDerivativeTransaction>
</ownershipDocument>"#;
        let doc = extract(zero, "a").unwrap();
        assert!(doc.transactions.is_empty());
    }

    #[test]
    fn test_derivative_transactions_are_ignored() {
        let derivative = r#"<ownershipDocument>
  <issuer><issuerTradingSymbol>ACME</issuerTradingSymbol></issuer>
  <derivativeTable>
    <derivativeTransaction>
      <transactionCoding><transactionCode>P</transactionCode></transactionCoding>
      <transactionAmounts>
        <transactionShares><value>9999</value></transactionShares>
        <transactionPricePerShare><value>1.00</value></transactionPricePerShare>
      </transactionAmounts>
    </derivativeTransaction>
  </derivativeTable>
</ownershipDocument>"#;
        let doc = extract(derivative, "a").unwrap();
        assert!(doc.transactions.is_empty());
    }

    #[test]
    fn test_no_ticker_yields_no_records() {
        let no_ticker = r#"<ownershipDocument>
  <nonDerivativeTransaction>
    <transactionCoding><transactionCode>P</transactionCode></transactionCoding>
    <transactionAmounts>
      <transactionShares><value>100</value></transactionShares>
      <transactionPricePerShare><value>5</value></transactionPricePerShare>
    </transactionAmounts>
  </nonDerivativeTransaction>
</ownershipDocument>"#;
        let doc = extract(no_ticker, "a").unwrap();
        assert!(doc.ticker.is_none());
        assert!(doc.transactions.is_empty());
    }

    #[test]
    fn test_second_reporting_owner_does_not_overwrite_first() {
        let two_owners = r#"<ownershipDocument>
  <issuer><issuerTradingSymbol>ACME</issuerTradingSymbol></issuer>
  <reportingOwner>
    <reportingOwnerId><rptOwnerName>First Owner</rptOwnerName></reportingOwnerId>
  </reportingOwner>
  <reportingOwner>
    <reportingOwnerId><rptOwnerName>Second Owner</rptOwnerName></reportingOwnerId>
  </reportingOwner>
</ownershipDocument>"#;
        let doc = extract(two_owners, "a").unwrap();
        assert_eq!(doc.owner.as_deref(), Some("First Owner"));
    }

    /// Arbitrary input must never panic; Err or an empty document is fine.
    #[test]
    fn test_fuzz_inputs() {
        for input in [
            "",
            "plain text",
            "<",
            "<ownershipDocument>",
            "<nonDerivativeTransaction></nonDerivativeTransaction>",
            "<value>5</value>",
            "\x00\x01\x02",
            &"<nonDerivativeTransaction>".repeat(5000),
        ] {
            let _ = extract(input, "fuzz");
        }
    }
}
