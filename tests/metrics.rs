use std::sync::{Arc, Mutex};
use std::time::Duration;

use akin::{set_akin_metrics, Akin, AkinMetrics, HashTemplate, Row};

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<String>>,
}

impl Recorder {
    fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.events.lock().unwrap())
    }
}

impl AkinMetrics for Recorder {
    fn record_signatures(&self, _latency: Duration, rows: usize, unindexable: usize) {
        self.events
            .lock()
            .unwrap()
            .push(format!("signatures rows={rows} unindexable={unindexable}"));
    }

    fn record_grouping(&self, _latency: Duration, clusters: usize) {
        self.events
            .lock()
            .unwrap()
            .push(format!("grouping clusters={clusters}"));
    }

    fn record_query(&self, _latency: Duration, hits: usize) {
        self.events.lock().unwrap().push(format!("query hits={hits}"));
    }
}

// One test per file: the recorder is process-wide.
#[test]
fn repeated_requests_reuse_cached_work() {
    let recorder = Arc::new(Recorder::default());
    set_akin_metrics(Some(recorder.clone() as Arc<dyn AkinMetrics>));

    let mut akin = Akin::in_memory().unwrap();
    let rows = ["Acme Corp", "ACME CORP", "", "Acme Corporation", "Gamma Inc"]
        .iter()
        .map(|n| Row::new().with("name", *n))
        .collect();
    akin.add_datasource("companies", rows).unwrap();
    akin.add_template(HashTemplate::new("Loose", 0.5)).unwrap();

    akin.create_group("companies", "name", "Loose", true).unwrap();
    assert_eq!(
        recorder.take(),
        ["signatures rows=5 unindexable=1", "grouping clusters=1"]
    );

    // Cached group: nothing is recomputed.
    akin.create_group("companies", "name", "Loose", true).unwrap();
    assert!(recorder.take().is_empty());

    // Different threshold, same tokenization: signatures come from the cache.
    akin.add_template(HashTemplate::new("Strict", 0.99)).unwrap();
    akin.create_group("companies", "name", "Strict", true).unwrap();
    assert_eq!(recorder.take(), ["grouping clusters=0"]);

    let key = akin.list_groups("companies").unwrap()[0].key().to_string();
    akin.query_groups("companies", [key], "gamma inc", "levenshtein")
        .unwrap();
    assert_eq!(recorder.take(), ["query hits=1"]);

    set_akin_metrics(None);
}
