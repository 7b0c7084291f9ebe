use std::io::BufRead;

use super::{MAX_LABEL, Record};
use crate::{
    RankErr, Result,
    error::{ParseErr, ParseReason},
};

const QID_PREFIX: &str = "qid:";

/// Parses one line of the `<label> qid:<id> <idx>:<value> ... [# comment]` format.
///
/// # Arguments
/// * `line` - The raw line, without its trailing newline.
/// * `line_no` - The 1-based line number, used for error reporting.
///
/// # Returns
/// The parsed record, `None` if the line is blank or only holds a comment, or a `ParseErr`
/// identifying the line.
pub fn parse_line(line: &str, line_no: usize) -> std::result::Result<Option<Record>, ParseErr> {
    let err = |reason| ParseErr {
        line: line_no,
        reason,
    };

    let content = match line.find('#') {
        Some(pos) => &line[..pos],
        None => line,
    };

    let mut tokens = content.split_whitespace();

    let Some(label_tok) = tokens.next() else {
        return Ok(None);
    };

    let label: f32 = label_tok
        .parse()
        .map_err(|_| err(ParseReason::InvalidLabel(label_tok.to_string())))?;

    if !label.is_finite() || label > MAX_LABEL {
        return Err(err(ParseReason::InvalidLabel(label_tok.to_string())));
    }

    let qid_tok = tokens.next().ok_or_else(|| err(ParseReason::MissingQid))?;
    let qid = qid_tok
        .strip_prefix(QID_PREFIX)
        .ok_or_else(|| err(ParseReason::MissingQid))?
        .parse::<u64>()
        .map_err(|_| err(ParseReason::InvalidQid(qid_tok.to_string())))?;

    let features = tokens
        .map(|tok| parse_feature(tok).ok_or_else(|| err(ParseReason::InvalidFeature(tok.into()))))
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(Some(Record::new(qid, label, features)))
}

fn parse_feature(tok: &str) -> Option<(usize, f32)> {
    let (idx, value) = tok.split_once(':')?;
    let value: f32 = value.parse().ok()?;
    value.is_finite().then_some((idx.parse().ok()?, value))
}

/// An iterator over the records of a reader, one per non-blank line.
pub struct Records<B: BufRead> {
    reader: B,
    buf: Vec<u8>,
    line_no: usize,
}

impl<B: BufRead> Records<B> {
    /// Creates a new `Records` iterator.
    ///
    /// # Arguments
    /// * `reader` - The source of lines.
    ///
    /// # Returns
    /// A new `Records` instance.
    pub fn new(reader: B) -> Self {
        Self {
            reader,
            buf: Vec::new(),
            line_no: 0,
        }
    }
}

impl<B: BufRead> Iterator for Records<B> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.buf.clear();

            match self.reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => return None,
                Ok(_) => self.line_no += 1,
                Err(e) => return Some(Err(RankErr::Io(e))),
            }

            let Ok(line) = std::str::from_utf8(&self.buf) else {
                let err = ParseErr {
                    line: self.line_no,
                    reason: ParseReason::InvalidUtf8,
                };
                return Some(Err(err.into()));
            };

            let line = line.trim_end_matches(['\n', '\r']);
            match parse_line(line, self.line_no) {
                Ok(Some(record)) => return Some(Ok(record)),
                Ok(None) => continue,
                Err(e) => return Some(Err(e.into())),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_line() {
        let record = parse_line("2 qid:10 1:0.5 3:-1.25 # docid = GX000", 1)
            .unwrap()
            .unwrap();

        assert_eq!(record.qid(), 10);
        assert_eq!(record.label(), 2.0);
        assert_eq!(record.features(), &[(1, 0.5), (3, -1.25)]);
    }

    #[test]
    fn blank_and_comment_lines_are_skipped() {
        assert!(parse_line("", 1).unwrap().is_none());
        assert!(parse_line("   ", 2).unwrap().is_none());
        assert!(parse_line("# header", 3).unwrap().is_none());
    }

    #[test]
    fn rejects_bad_label() {
        let err = parse_line("high qid:1 1:0.1", 7).unwrap_err();
        assert_eq!(err.line, 7);
        assert_eq!(err.reason, ParseReason::InvalidLabel("high".into()));
    }

    #[test]
    fn rejects_missing_qid() {
        let err = parse_line("1 1:0.1 2:0.3", 4).unwrap_err();
        assert_eq!(err.reason, ParseReason::MissingQid);

        let err = parse_line("1", 5).unwrap_err();
        assert_eq!(err.reason, ParseReason::MissingQid);
    }

    #[test]
    fn rejects_bad_qid_and_feature() {
        let err = parse_line("1 qid:abc 1:0.1", 1).unwrap_err();
        assert_eq!(err.reason, ParseReason::InvalidQid("qid:abc".into()));

        let err = parse_line("1 qid:3 1:0.1 2=0.3", 1).unwrap_err();
        assert_eq!(err.reason, ParseReason::InvalidFeature("2=0.3".into()));

        let err = parse_line("1 qid:3 x:0.1", 1).unwrap_err();
        assert_eq!(err.reason, ParseReason::InvalidFeature("x:0.1".into()));
    }

    #[test]
    fn rejects_out_of_range_values() {
        let err = parse_line("200 qid:1 1:0.1", 2).unwrap_err();
        assert_eq!(err.reason, ParseReason::InvalidLabel("200".into()));
        assert!(parse_line("31 qid:1 1:0.1", 2).unwrap().is_some());

        for tok in ["1:inf", "1:NaN", "2:-inf"] {
            let err = parse_line(&format!("1 qid:1 {tok}"), 3).unwrap_err();
            assert_eq!(err.reason, ParseReason::InvalidFeature(tok.into()));
        }
    }

    #[test]
    fn invalid_utf8_names_its_line_and_keeps_counting() {
        let input: &[u8] = b"1 qid:1 1:1\n\xff\xfe bad\n1 1:1\n0 qid:1 1:2\n";
        let mut records = Records::new(input);

        assert_eq!(records.next().unwrap().unwrap().label(), 1.0);

        match records.next() {
            Some(Err(RankErr::Parse(e))) => {
                assert_eq!((e.line, e.reason), (2, ParseReason::InvalidUtf8))
            }
            other => panic!("expected utf-8 error, got {other:?}"),
        }

        match records.next() {
            Some(Err(RankErr::Parse(e))) => assert_eq!(e.line, 3),
            other => panic!("expected parse error, got {other:?}"),
        }

        assert_eq!(records.next().unwrap().unwrap().label(), 0.0);
        assert!(records.next().is_none());
    }

    #[test]
    fn reader_tracks_line_numbers() {
        let input = "1 qid:1 1:1\n\n0 qid:1 1:2\r\n2 qid:oops 1:3\n";
        let mut records = Records::new(input.as_bytes());

        assert_eq!(records.next().unwrap().unwrap().label(), 1.0);
        assert_eq!(records.next().unwrap().unwrap().label(), 0.0);

        match records.next() {
            Some(Err(RankErr::Parse(e))) => assert_eq!(e.line, 4),
            other => panic!("expected parse error, got {other:?}"),
        }

        assert!(records.next().is_none());
    }
}
