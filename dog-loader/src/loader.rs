use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::{debug, instrument, warn, Instrument};

use crate::fetch::{Fetcher, HttpFetcher};
use crate::handles::{HandleStore, MemoryHandleStore};
use crate::inflate::gunzip;
use crate::machine::{LoadMachine, LoadTicket};
use crate::rewrite::SourceRewrite;
use crate::{LoadError, LoadResult, LoadSnapshot, LoadStatus, LoaderConfig};

/// Fetches, inflates and publishes one source at a time for one consumer.
///
/// Loads run as tasks on the ambient tokio runtime. Dropping the loader (or
/// calling [`DecompressingLoader::detach`]) releases the current handle and
/// turns any in-flight load into a no-op.
pub struct DecompressingLoader {
    shared: Arc<Shared>,
}

struct Shared {
    machine: Mutex<LoadMachine>,
    fetcher: Arc<dyn Fetcher>,
    handles: Arc<dyn HandleStore>,
    updates: watch::Sender<LoadSnapshot>,
    max_decompressed_bytes: u64,
}

impl DecompressingLoader {
    /// Create a loader over the given fetcher and handle store
    pub fn new<F, H>(fetcher: F, handles: H, config: LoaderConfig) -> Self
    where
        F: Fetcher + 'static,
        H: HandleStore + 'static,
    {
        Self::from_parts(Arc::new(fetcher), Arc::new(handles), config)
    }

    /// Create a loader over shared backends
    pub fn from_parts(
        fetcher: Arc<dyn Fetcher>,
        handles: Arc<dyn HandleStore>,
        config: LoaderConfig,
    ) -> Self {
        let machine = LoadMachine::new(handles.clone(), config.mode.rewrite(), config.content_type);
        let (updates, _) = watch::channel(LoadSnapshot::default());

        Self {
            shared: Arc::new(Shared {
                machine: Mutex::new(machine),
                fetcher,
                handles,
                updates,
                max_decompressed_bytes: config.max_decompressed_bytes,
            }),
        }
    }

    /// HTTP fetcher plus in-memory handle store.
    ///
    /// Development mode needs an absolute proxy origin here, since HTTP
    /// cannot fetch a relative `/dev-proxy/...` path.
    pub fn http(config: LoaderConfig) -> LoadResult<Self> {
        config.mode.require_origin()?;
        let fetcher = HttpFetcher::from_config(&config)?;
        Ok(Self::new(fetcher, MemoryHandleStore::new(), config))
    }

    /// Override the rewrite strategy implied by the config's mode
    pub fn with_rewrite<R: SourceRewrite + 'static>(self, rewrite: R) -> Self {
        self.shared.machine.lock().set_rewrite(Arc::new(rewrite));
        self
    }

    /// Point the loader at a new source (or at nothing).
    ///
    /// The same source as last time is a no-op. Anything else releases the
    /// previous handle immediately and, for a present source, starts a load.
    /// Must be called from within a tokio runtime.
    #[instrument(skip(self))]
    pub fn set_source(&self, source: Option<&str>) -> LoadResult<()> {
        let runtime = Handle::try_current()
            .map_err(|_| LoadError::invalid("set_source must run inside a tokio runtime"))?;

        let ticket = {
            let mut machine = self.shared.machine.lock();
            let before = machine.current_request();
            let ticket = machine.request(source);
            // Unchanged source: nothing to tell subscribers
            if machine.current_request() != before {
                self.shared.publish(&machine);
            }
            ticket
        };

        if let Some(ticket) = ticket {
            let shared = self.shared.clone();
            runtime.spawn(shared.run(ticket).in_current_span());
        }
        Ok(())
    }

    pub fn snapshot(&self) -> LoadSnapshot {
        self.shared.updates.borrow().clone()
    }

    pub fn status(&self) -> LoadStatus {
        self.shared.machine.lock().status()
    }

    /// Receive every published snapshot
    pub fn subscribe(&self) -> watch::Receiver<LoadSnapshot> {
        self.shared.updates.subscribe()
    }

    /// Wait until no load is in flight and return the resulting snapshot
    pub async fn settled(&self) -> LoadSnapshot {
        let mut updates = self.subscribe();
        let settled = updates.wait_for(|snapshot| !snapshot.loading).await;
        match settled {
            Ok(snapshot) => snapshot.clone(),
            Err(_) => self.snapshot(),
        }
    }

    /// The store handles are allocated in
    pub fn handles(&self) -> Arc<dyn HandleStore> {
        self.shared.handles.clone()
    }

    /// Release everything and stop observing in-flight work
    pub fn detach(self) {
        drop(self);
    }
}

impl Drop for DecompressingLoader {
    fn drop(&mut self) {
        let mut machine = self.shared.machine.lock();
        machine.detach();
        self.shared.publish(&machine);
        debug!("Loader detached");
    }
}

impl Shared {
    fn publish(&self, machine: &LoadMachine) {
        self.updates.send_replace(machine.snapshot());
    }

    async fn run(self: Arc<Self>, ticket: LoadTicket) {
        let outcome = match self.fetcher.fetch(&ticket.fetch_url).await {
            Ok(body) => {
                // Skip the inflate when nobody will see the result
                if !self.machine.lock().is_current(ticket.request) {
                    debug!("Dropped body of superseded {}", ticket.request);
                    return;
                }
                gunzip(&body, self.max_decompressed_bytes).map(Bytes::from)
            }
            Err(error) => Err(error),
        };

        let failure = outcome.as_ref().err().map(ToString::to_string);

        let mut machine = self.machine.lock();
        if machine.complete(ticket.request, outcome) {
            match failure {
                Some(reason) => warn!("Load of {} failed: {}", ticket.source.file_name(), reason),
                None => debug!("Loaded {} as {}", ticket.source.file_name(), ticket.request),
            }
            self.publish(&machine);
        }
    }
}
