use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;
use tracing::{debug, instrument, warn};

use crate::document::{DocumentHandle, Rectangle};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchDirection {
    #[default]
    Forward,
    Backward,
}

impl SearchDirection {
    pub fn reversed(self) -> Self {
        match self {
            SearchDirection::Forward => SearchDirection::Backward,
            SearchDirection::Backward => SearchDirection::Forward,
        }
    }
}

/// Terminal outcome of one search task. Every task emits exactly one.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchEvent {
    Found { page: usize, regions: Vec<Rectangle> },
    NotFound,
    Cancelled,
}

pub type SearchTicket = u64;

struct SearchTask {
    ticket: SearchTicket,
    running: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl SearchTask {
    /// Clears the running flag and blocks until the thread has exited.
    fn stop(self) {
        self.running.store(false, Ordering::Release);
        if self.handle.join().is_err() {
            warn!(ticket = self.ticket, "search thread panicked");
        }
    }
}

/// Runs at most one background search at a time. Results are delivered on a
/// channel that the UI thread drains with [`SearchWorker::try_recv`].
pub struct SearchWorker {
    current: Mutex<Option<SearchTask>>,
    sender: Sender<(SearchTicket, SearchEvent)>,
    receiver: Mutex<Receiver<(SearchTicket, SearchEvent)>>,
    next_ticket: AtomicU64,
}

impl SearchWorker {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            current: Mutex::new(None),
            sender,
            receiver: Mutex::new(receiver),
            next_ticket: AtomicU64::new(1),
        }
    }

    /// Starts scanning from `start_page`. A running search is cancelled and
    /// joined first, so its terminal event is queued before the new task
    /// looks at any page.
    #[instrument(skip(self, document))]
    pub fn start(
        &self,
        document: Option<Arc<DocumentHandle>>,
        query: &str,
        direction: SearchDirection,
        start_page: usize,
    ) -> SearchTicket {
        let mut current = self.current.lock();
        if let Some(task) = current.take() {
            debug!(ticket = task.ticket, "cancelling superseded search");
            task.stop();
        }

        let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);
        let document = match document {
            Some(document) if !query.is_empty() && document.page_count() > 0 => document,
            _ => {
                let _ = self.sender.send((ticket, SearchEvent::Cancelled));
                return ticket;
            }
        };

        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);
        let sender = self.sender.clone();
        let query = query.to_string();
        let handle = thread::spawn(move || {
            let event = scan(&document, &query, direction, start_page, &flag);
            flag.store(false, Ordering::Release);
            let _ = sender.send((ticket, event));
        });
        *current = Some(SearchTask {
            ticket,
            running,
            handle,
        });
        ticket
    }

    /// Cancels the running search, if any, and waits for it to stop.
    pub fn cancel(&self) {
        if let Some(task) = self.current.lock().take() {
            debug!(ticket = task.ticket, "cancelling search");
            task.stop();
        }
    }

    pub fn is_running(&self) -> bool {
        self.current
            .lock()
            .as_ref()
            .map(|task| task.running.load(Ordering::Acquire))
            .unwrap_or(false)
    }

    pub fn try_recv(&self) -> Option<(SearchTicket, SearchEvent)> {
        self.receiver.lock().try_recv().ok()
    }
}

impl Default for SearchWorker {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for SearchWorker {
    fn drop(&mut self) {
        if let Some(task) = self.current.get_mut().take() {
            task.stop();
        }
    }
}

/// Page visited at step `counter` (1-based) of a scan. The start page itself
/// comes last.
pub fn scan_page(start: usize, counter: usize, page_count: usize, direction: SearchDirection) -> usize {
    match direction {
        SearchDirection::Forward => (start + counter) % page_count,
        SearchDirection::Backward => (page_count + start - counter % page_count) % page_count,
    }
}

fn scan(
    document: &DocumentHandle,
    query: &str,
    direction: SearchDirection,
    start_page: usize,
    running: &AtomicBool,
) -> SearchEvent {
    let page_count = document.page_count();
    let start = start_page.min(page_count - 1);
    for counter in 1..=page_count {
        if !running.load(Ordering::Acquire) {
            return SearchEvent::Cancelled;
        }
        let page = scan_page(start, counter, page_count, direction);
        match document.find_text(page, query) {
            Ok(regions) if !regions.is_empty() => return SearchEvent::Found { page, regions },
            Ok(_) => {}
            Err(err) => warn!(page, "text search failed: {err:#}"),
        }
    }
    SearchEvent::NotFound
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeBackend;
    use std::time::{Duration, Instant};

    fn wait_for(worker: &SearchWorker) -> (SearchTicket, SearchEvent) {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            if let Some(event) = worker.try_recv() {
                return event;
            }
            assert!(Instant::now() < deadline, "search did not finish");
            thread::sleep(Duration::from_millis(2));
        }
    }

    fn document(backend: FakeBackend) -> Arc<DocumentHandle> {
        Arc::new(DocumentHandle::new(Arc::new(backend), None))
    }

    #[test]
    fn scan_order_checks_the_start_page_last() {
        let forward: Vec<_> = (1..=4)
            .map(|c| scan_page(1, c, 4, SearchDirection::Forward))
            .collect();
        assert_eq!(forward, vec![2, 3, 0, 1]);
        let backward: Vec<_> = (1..=4)
            .map(|c| scan_page(1, c, 4, SearchDirection::Backward))
            .collect();
        assert_eq!(backward, vec![0, 3, 2, 1]);
    }

    #[test]
    fn finds_the_next_page_with_a_match() {
        let rect = Rectangle::new(1.0, 2.0, 3.0, 4.0);
        let doc = document(FakeBackend::new("/tmp/a.pdf", 10).with_match(7, rect));
        let worker = SearchWorker::new();
        let ticket = worker.start(Some(doc), "needle", SearchDirection::Forward, 2);
        assert_eq!(
            wait_for(&worker),
            (
                ticket,
                SearchEvent::Found {
                    page: 7,
                    regions: vec![rect]
                }
            )
        );
        assert!(!worker.is_running());
    }

    #[test]
    fn reports_not_found_after_a_full_cycle() {
        let backend = FakeBackend::new("/tmp/a.pdf", 3);
        let scanned = Arc::clone(&backend.scanned);
        let worker = SearchWorker::new();
        let ticket = worker.start(Some(document(backend)), "x", SearchDirection::Backward, 0);
        assert_eq!(wait_for(&worker), (ticket, SearchEvent::NotFound));
        let pages: Vec<_> = scanned.lock().iter().map(|(_, p)| *p).collect();
        assert_eq!(pages, vec![2, 1, 0]);
    }

    #[test]
    fn empty_query_or_missing_document_never_scans() {
        let backend = FakeBackend::new("/tmp/a.pdf", 3);
        let scanned = Arc::clone(&backend.scanned);
        let worker = SearchWorker::new();
        let first = worker.start(Some(document(backend)), "", SearchDirection::Forward, 0);
        assert_eq!(wait_for(&worker), (first, SearchEvent::Cancelled));
        let second = worker.start(None, "x", SearchDirection::Forward, 0);
        assert_eq!(wait_for(&worker), (second, SearchEvent::Cancelled));
        assert!(scanned.lock().is_empty());
    }

    #[test]
    fn new_search_waits_for_the_superseded_one() {
        let backend = FakeBackend::new("/tmp/a.pdf", 200).with_delay(Duration::from_millis(5));
        let scanned = Arc::clone(&backend.scanned);
        let doc = document(backend);
        let worker = SearchWorker::new();

        let a = worker.start(Some(Arc::clone(&doc)), "alpha", SearchDirection::Forward, 0);
        thread::sleep(Duration::from_millis(20));
        let b = worker.start(Some(doc), "beta", SearchDirection::Forward, 0);

        assert_eq!(wait_for(&worker), (a, SearchEvent::Cancelled));
        assert_eq!(wait_for(&worker), (b, SearchEvent::NotFound));

        let log = scanned.lock();
        let first_beta = log.iter().position(|(q, _)| q == "beta").unwrap();
        assert!(first_beta > 0);
        assert!(log[..first_beta].iter().all(|(q, _)| q == "alpha"));
        assert!(log[first_beta..].iter().all(|(q, _)| q == "beta"));
    }

    #[test]
    fn cancel_stops_a_running_scan() {
        let doc = document(FakeBackend::new("/tmp/a.pdf", 500).with_delay(Duration::from_millis(5)));
        let worker = SearchWorker::new();
        let ticket = worker.start(Some(doc), "x", SearchDirection::Forward, 0);
        thread::sleep(Duration::from_millis(10));
        worker.cancel();
        assert_eq!(wait_for(&worker), (ticket, SearchEvent::Cancelled));
        assert!(!worker.is_running());
    }
}
