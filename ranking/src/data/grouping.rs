use std::{collections::HashSet, mem};

use log::warn;

use super::{Query, Record};
use crate::{RankErr, Result};

/// What to do when a query id shows up again after a different query has started.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OrderPolicy {
    /// Emit the later records as a new query with the same id.
    #[default]
    Fragment,
    /// Fail with `RankErr::UnsortedInput`.
    Reject,
}

enum State {
    AwaitingFirstRecord,
    Accumulating { qid: u64, records: Vec<Record> },
    Done,
}

/// Groups a stream of records, sorted by query id, into queries.
///
/// A query is emitted as soon as a record with a different id arrives or the stream ends.
/// Errors coming from the underlying stream are passed through without resetting the query
/// being accumulated, so the caller may choose to skip them.
pub struct QueryGrouper<I> {
    records: I,
    state: State,
    policy: OrderPolicy,
    finished: HashSet<u64>,
}

impl<I> QueryGrouper<I>
where
    I: Iterator<Item = Result<Record>>,
{
    /// Creates a new `QueryGrouper`.
    ///
    /// # Arguments
    /// * `records` - The record stream.
    /// * `policy` - How to handle a query id reappearing out of order.
    ///
    /// # Returns
    /// A new `QueryGrouper` instance.
    pub fn new(records: I, policy: OrderPolicy) -> Self {
        Self {
            records,
            state: State::AwaitingFirstRecord,
            policy,
            finished: HashSet::new(),
        }
    }

    /// Starts accumulating a new query with `record`, returning the previous one if any.
    fn begin(&mut self, record: Record) -> Result<Option<Query>> {
        let qid = record.qid();

        if self.finished.contains(&qid) {
            match self.policy {
                OrderPolicy::Reject => return Err(RankErr::UnsortedInput { qid }),
                OrderPolicy::Fragment => {
                    warn!("query {qid} reappeared out of order, emitting it as a separate list")
                }
            }
        }

        let state = State::Accumulating {
            qid,
            records: vec![record],
        };

        let previous = mem::replace(&mut self.state, state);
        Ok(self.emit(previous))
    }

    fn emit(&mut self, state: State) -> Option<Query> {
        match state {
            State::Accumulating { qid, records } => {
                self.finished.insert(qid);
                Some(Query::new(qid, records))
            }
            _ => None,
        }
    }
}

impl<I> Iterator for QueryGrouper<I>
where
    I: Iterator<Item = Result<Record>>,
{
    type Item = Result<Query>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let record = match self.records.next() {
                Some(Ok(record)) => record,
                Some(Err(e)) => return Some(Err(e)),
                None => {
                    let state = mem::replace(&mut self.state, State::Done);
                    return self.emit(state).map(Ok);
                }
            };

            let same_query = matches!(
                &self.state,
                State::Accumulating { qid, .. } if *qid == record.qid()
            );

            if same_query {
                if let State::Accumulating { records, .. } = &mut self.state {
                    records.push(record);
                }
                continue;
            }

            match self.begin(record) {
                Ok(Some(query)) => return Some(Ok(query)),
                Ok(None) => {}
                Err(e) => return Some(Err(e)),
            }
        }
    }
}
