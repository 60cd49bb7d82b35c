use std::collections::BTreeMap;

use ledger_api::Record;
use rust_decimal::Decimal;

/// Count and exact decimal total of a set of records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub count: usize,
    pub total: Decimal,
}

impl Summary {
    fn add(&mut self, record: &Record) {
        self.count += 1;
        self.total += record.amount;
    }
}

pub fn aggregate(records: &[Record]) -> Summary {
    records.iter().fold(Summary::default(), |mut acc, r| {
        acc.add(r);
        acc
    })
}

/// Per-asset summaries, keyed and ordered by asset id.
pub fn aggregate_by_asset(records: &[Record]) -> BTreeMap<String, Summary> {
    let mut groups: BTreeMap<String, Summary> = BTreeMap::new();
    for r in records {
        groups.entry(r.asset_id.clone()).or_default().add(r);
    }
    groups
}
