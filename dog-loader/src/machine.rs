use std::sync::Arc;

use bytes::Bytes;
use tracing::debug;

use crate::handles::{HandleStore, LocalHandle};
use crate::rewrite::SourceRewrite;
use crate::{LoadError, LoadResult, LoadSnapshot, LoadStatus, RequestId, SourceRef};

/// Work order for one load, issued by [`LoadMachine::request`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTicket {
    pub request: RequestId,
    pub source: SourceRef,
    /// Source after rewriting; this is what gets fetched
    pub fetch_url: String,
}

enum State {
    Absent,
    Pending(RequestId),
    Ready(LocalHandle),
    Failed(Arc<LoadError>),
}

/// Load lifecycle for a single consumer.
///
/// Every new source bumps the current [`RequestId`]; only a completion
/// carrying the current id is applied. Replacing the state drops any
/// [`LocalHandle`] it held, which releases it.
pub struct LoadMachine {
    handles: Arc<dyn HandleStore>,
    rewrite: Arc<dyn SourceRewrite>,
    content_type: String,
    source: Option<SourceRef>,
    current: RequestId,
    state: State,
}

impl LoadMachine {
    pub fn new(
        handles: Arc<dyn HandleStore>,
        rewrite: Arc<dyn SourceRewrite>,
        content_type: impl Into<String>,
    ) -> Self {
        Self {
            handles,
            rewrite,
            content_type: content_type.into(),
            source: None,
            current: RequestId::default(),
            state: State::Absent,
        }
    }

    /// Replace the rewrite strategy used for subsequent requests
    pub fn set_rewrite(&mut self, rewrite: Arc<dyn SourceRewrite>) {
        self.rewrite = rewrite;
    }

    /// Point the machine at `source`.
    ///
    /// Returns a ticket when a fetch must start. Repeating the current source
    /// is a no-op whatever state its load is in.
    pub fn request(&mut self, source: Option<&str>) -> Option<LoadTicket> {
        let next = SourceRef::parse(source);
        if next == self.source {
            return None;
        }

        self.supersede();
        self.source = next.clone();

        let source = next?;
        let ticket = LoadTicket {
            request: self.current,
            fetch_url: self.rewrite.rewrite(source.as_str()),
            source,
        };
        debug!(
            "Issued {} for {} (fetching {})",
            ticket.request, ticket.source, ticket.fetch_url
        );
        self.state = State::Pending(ticket.request);
        Some(ticket)
    }

    /// Apply the outcome of a load. Returns `false` when `request` has been
    /// superseded; the outcome is then dropped without allocating anything.
    pub fn complete(&mut self, request: RequestId, outcome: LoadResult<Bytes>) -> bool {
        if !self.is_current(request) {
            debug!("Discarded stale completion of {}", request);
            return false;
        }

        self.state = match outcome {
            Ok(bytes) => State::Ready(LocalHandle::allocate(
                self.handles.clone(),
                bytes,
                &self.content_type,
            )),
            Err(error) => State::Failed(Arc::new(error)),
        };
        true
    }

    /// Whether `request` is the load still awaiting completion
    pub fn is_current(&self, request: RequestId) -> bool {
        matches!(self.state, State::Pending(pending) if pending == request)
    }

    /// Consumer is going away: release everything, orphan in-flight work
    pub fn detach(&mut self) {
        self.supersede();
        self.source = None;
    }

    pub fn source(&self) -> Option<&SourceRef> {
        self.source.as_ref()
    }

    pub fn current_request(&self) -> RequestId {
        self.current
    }

    pub fn status(&self) -> LoadStatus {
        match &self.state {
            State::Absent => LoadStatus::Absent,
            State::Pending(request) => LoadStatus::Pending { request: *request },
            State::Ready(handle) => LoadStatus::Ready {
                handle: handle.url().clone(),
            },
            State::Failed(error) => LoadStatus::Failed {
                error: error.clone(),
            },
        }
    }

    pub fn snapshot(&self) -> LoadSnapshot {
        LoadSnapshot::from(&self.status())
    }

    fn supersede(&mut self) {
        self.current = self.current.next();
        match std::mem::replace(&mut self.state, State::Absent) {
            State::Pending(request) => debug!("Superseded in-flight {}", request),
            State::Ready(handle) => handle.release(),
            State::Absent | State::Failed(_) => {}
        }
    }
}
