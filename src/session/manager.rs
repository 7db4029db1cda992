//! Sticky session management
//!
//! A session binds one proxy egress identity to one cookie store. Requests
//! issued through the same session therefore appear to come from the same
//! visitor. The manager hands out the current session until it has served
//! its page quota or a caller asks for a fresh identity.

use crate::crawler::build_session_client;
use crate::session::proxy::{ProxyProvider, ProxyRoute};
use crate::session::SessionError;
use reqwest::cookie::Jar;
use reqwest::Client;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

/// Default number of pages served by one session before rotation
pub const DEFAULT_SESSION_PAGE_LIMIT: u32 = 10;

/// One egress identity with its cookie continuity
///
/// The cookie store is shared with the HTTP client built for this session,
/// so cookies set by a response are sent on every later request of the
/// session. `Jar` synchronizes internally; concurrent workers may use the
/// same session at once.
#[derive(Debug)]
pub struct Session {
    id: u64,
    name: String,
    proxy_route: ProxyRoute,
    cookie_store: Arc<Jar>,
    client: Client,
    pages_served: AtomicU32,
}

impl Session {
    fn open(id: u64, provider: &dyn ProxyProvider) -> Result<Self, SessionError> {
        let name = format!("session_{}", id);
        let proxy_route = provider.route(&name)?;
        let cookie_store = Arc::new(Jar::default());
        let client = build_session_client(&proxy_route, Arc::clone(&cookie_store))?;

        Ok(Self {
            id,
            name,
            proxy_route,
            cookie_store,
            client,
            pages_served: AtomicU32::new(0),
        })
    }

    /// Numeric session id, strictly increasing in creation order
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Identifier passed to the proxy provider
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn proxy_route(&self) -> &ProxyRoute {
        &self.proxy_route
    }

    pub fn cookie_store(&self) -> &Arc<Jar> {
        &self.cookie_store
    }

    /// HTTP client bound to this session's route and cookie store
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Number of acquisitions that returned this session
    pub fn pages_served(&self) -> u32 {
        self.pages_served.load(Ordering::SeqCst)
    }

    fn record_page(&self) -> u32 {
        self.pages_served.fetch_add(1, Ordering::SeqCst) + 1
    }
}

#[derive(Default)]
struct SessionTable {
    last_id: u64,
    current: Option<Arc<Session>>,
    sessions: HashMap<u64, Arc<Session>>,
}

/// Issues and rotates sessions
///
/// All bookkeeping lives in one mutex-guarded table. The lock is never held
/// across an `.await`; acquisition itself is synchronous.
pub struct SessionManager {
    provider: Arc<dyn ProxyProvider>,
    page_limit: u32,
    table: Mutex<SessionTable>,
}

impl SessionManager {
    /// Creates a manager
    ///
    /// # Arguments
    ///
    /// * `provider` - Issues the proxy route for each new session
    /// * `page_limit` - Pages a session serves before rotation (minimum 1)
    pub fn new(provider: Arc<dyn ProxyProvider>, page_limit: u32) -> Self {
        Self {
            provider,
            page_limit: page_limit.max(1),
            table: Mutex::new(SessionTable::default()),
        }
    }

    /// Returns a session for the next page
    ///
    /// A new session is opened when `force_new` is set, when no session
    /// exists yet, or when the current session has served `page_limit`
    /// pages. Otherwise the current session is returned and its page counter
    /// incremented. A newly opened session counts this acquisition as its
    /// first page.
    ///
    /// # Returns
    ///
    /// * `Ok(Arc<Session>)` - The session to use
    /// * `Err(SessionError)` - The provider or client builder refused
    pub fn acquire(&self, force_new: bool) -> Result<Arc<Session>, SessionError> {
        let mut table = self.table.lock().map_err(|_| SessionError::Poisoned)?;

        if !force_new {
            if let Some(current) = &table.current {
                if current.pages_served() < self.page_limit {
                    current.record_page();
                    return Ok(Arc::clone(current));
                }
            }
        }

        // Ids are consumed even if opening fails, so they stay monotonic
        table.last_id += 1;
        let id = table.last_id;
        let session = Arc::new(Session::open(id, self.provider.as_ref())?);
        session.record_page();

        tracing::debug!(
            "Opened session {} via {} (forced: {})",
            id,
            session.proxy_route(),
            force_new
        );

        table.sessions.insert(id, Arc::clone(&session));
        table.current = Some(Arc::clone(&session));

        Ok(session)
    }

    /// Looks up a previously opened session
    pub fn session(&self, id: u64) -> Option<Arc<Session>> {
        self.table.lock().ok()?.sessions.get(&id).cloned()
    }

    /// Number of sessions opened so far
    pub fn session_count(&self) -> usize {
        self.table.lock().map(|t| t.sessions.len()).unwrap_or(0)
    }

    /// Id of the session currently handed out, if any
    pub fn current_id(&self) -> Option<u64> {
        self.table
            .lock()
            .ok()
            .and_then(|t| t.current.as_ref().map(|s| s.id()))
    }

    pub fn page_limit(&self) -> u32 {
        self.page_limit
    }
}
