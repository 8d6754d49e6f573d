// src/process/merge.rs

use chrono::NaiveDateTime;

use crate::error::ParseFailure;
use crate::process::date_parser::parse_auction_date;
use crate::process::record::{AuctionDocument, Record};

pub const AUCTION_DATE: &str = "AuctionDate";
pub const TERM_WEEK_YEAR: &str = "SecurityTermWeekYear";
pub const TERM_DAY_MONTH: &str = "SecurityTermDayMonth";

/// Fields taken from the announcement, in pinned column order.
pub const ANNOUNCEMENT_FIELDS: [&str; 3] = [AUCTION_DATE, TERM_WEEK_YEAR, TERM_DAY_MONTH];

/// The result record with the announcement's date and terms laid over it.
#[derive(Debug, Clone)]
pub struct MergedRow {
    pub source: String,
    pub fields: Record,
    pub auction_date: NaiveDateTime,
}

/// Build a document's row: copy the result record, then overwrite the
/// announcement fields with the announcement's values (null included).
pub fn merge_document(doc: &AuctionDocument) -> Result<MergedRow, ParseFailure> {
    let announcement = doc.announcement();
    let mut fields = doc.result().clone();
    for name in ANNOUNCEMENT_FIELDS {
        fields.insert(name, announcement.get(name).map(str::to_string));
    }

    let raw = fields
        .get(AUCTION_DATE)
        .ok_or(ParseFailure::MissingAuctionDate)?;
    let auction_date =
        parse_auction_date(raw).ok_or_else(|| ParseFailure::InvalidAuctionDate(raw.to_string()))?;

    Ok(MergedRow {
        source: doc.name.clone(),
        fields,
        auction_date,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(pairs: &[(&str, &str)]) -> Record {
        pairs
            .iter()
            .map(|(k, v)| (*k, Some(v.to_string())))
            .collect()
    }

    #[test]
    fn announcement_fields_win_over_result() {
        let doc = AuctionDocument::new(
            "Note_R_20230301_1.xml",
            vec![
                rec(&[
                    ("AuctionDate", "2023-03-01"),
                    ("SecurityTermWeekYear", "2-YEAR"),
                    ("SecurityTermDayMonth", "0-MONTH"),
                ]),
                rec(&[
                    ("AuctionDate", "2023-03-02"),
                    ("SecurityTermWeekYear", "WRONG"),
                    ("HighYield", "4.1"),
                ]),
            ],
        )
        .unwrap();

        let row = merge_document(&doc).unwrap();
        assert_eq!(row.fields.get(AUCTION_DATE), Some("2023-03-01"));
        assert_eq!(row.fields.get(TERM_WEEK_YEAR), Some("2-YEAR"));
        assert_eq!(row.fields.get(TERM_DAY_MONTH), Some("0-MONTH"));
        assert_eq!(row.fields.get("HighYield"), Some("4.1"));
        assert_eq!(row.source, "Note_R_20230301_1.xml");
        assert_eq!(
            row.auction_date,
            parse_auction_date("2023-03-01").unwrap()
        );
    }

    #[test]
    fn missing_announcement_term_becomes_null() {
        let doc = AuctionDocument::new(
            "a.xml",
            vec![
                rec(&[("AuctionDate", "2023-03-01")]),
                rec(&[("AuctionDate", "2023-03-01"), ("SecurityTermDayMonth", "9-MONTH")]),
            ],
        )
        .unwrap();
        let row = merge_document(&doc).unwrap();
        assert!(row.fields.contains(TERM_DAY_MONTH));
        assert_eq!(row.fields.get(TERM_DAY_MONTH), None);
    }

    #[test]
    fn single_record_merges_with_itself() {
        let only = rec(&[
            ("AuctionDate", "2023-01-05"),
            ("SecurityTermWeekYear", "4-WEEK"),
            ("SecurityTermDayMonth", "28-DAY"),
            ("HighRate", "5.0"),
        ]);
        let doc = AuctionDocument::new("a.xml", vec![only.clone()]).unwrap();
        let row = merge_document(&doc).unwrap();
        assert_eq!(row.fields, only);
    }

    #[test]
    fn auction_date_is_required_and_validated() {
        let doc = AuctionDocument::new(
            "a.xml",
            vec![rec(&[("SecurityTermWeekYear", "4-WEEK")]), rec(&[("AuctionDate", "2023-01-05")])],
        )
        .unwrap();
        assert!(matches!(
            merge_document(&doc),
            Err(ParseFailure::MissingAuctionDate)
        ));

        let doc = AuctionDocument::new("b.xml", vec![rec(&[("AuctionDate", "soon")])]).unwrap();
        assert!(matches!(
            merge_document(&doc),
            Err(ParseFailure::InvalidAuctionDate(ref s)) if s == "soon"
        ));
    }
}
