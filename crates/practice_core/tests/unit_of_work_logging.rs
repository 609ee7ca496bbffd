use log::{Level, LevelFilter, Log, Metadata, Record};
use practice_core::{run_persistence_unit, PersistenceDescriptor, SqliteEntityManager};
use std::sync::{Mutex, Once};

struct RecordingLogger {
    records: Mutex<Vec<(Level, String)>>,
}

impl Log for RecordingLogger {
    fn enabled(&self, _metadata: &Metadata<'_>) -> bool {
        true
    }

    fn log(&self, record: &Record<'_>) {
        self.records
            .lock()
            .unwrap()
            .push((record.level(), record.args().to_string()));
    }

    fn flush(&self) {}
}

static LOGGER: RecordingLogger = RecordingLogger {
    records: Mutex::new(Vec::new()),
};
static INSTALL: Once = Once::new();

fn recorded() -> Vec<(Level, String)> {
    INSTALL.call_once(|| {
        log::set_logger(&LOGGER).unwrap();
        log::set_max_level(LevelFilter::Trace);
    });
    LOGGER.records.lock().unwrap().clone()
}

#[test]
fn failing_hook_is_logged_at_error_level_with_its_message() {
    recorded();
    let descriptor = PersistenceDescriptor::builtin();

    let outcome = run_persistence_unit(&descriptor, "practice", |_em: &SqliteEntityManager| {
        Err("ledger entry rejected".into())
    })
    .unwrap();

    assert!(!outcome.is_committed());
    let records = recorded();
    let failure = records
        .iter()
        .find(|(_, message)| {
            message.starts_with("event=unit_of_work ") && message.contains("status=error")
        })
        .expect("unit of work failure should be logged");
    assert_eq!(failure.0, Level::Error);
    assert!(failure.1.contains("ledger entry rejected"));
    assert!(records
        .iter()
        .any(|(_, message)| message.contains("status=rolled_back")));
}
