//! Client-side state layer for fitplan.
//!
//! Three pieces sit on top of any [`fitplan_core::Backend`]:
//!
//! - [`Gateway`]: async CRUD operations, one backend round trip (or a short
//!   fixed sequence) each, scoped to the signed-in identity.
//! - [`CollectionStore`]: the own / saved / public plan lists, refreshed
//!   through the gateway and published on `watch` channels.
//! - [`SessionProvider`]: the signed-in identity, kept in step with the
//!   backend's session-change stream.
//!
//! [`Client::start`] wires them together.

use std::sync::Arc;

use fitplan_core::Backend;
use tokio::sync::watch;

pub mod collections;
pub mod config;
pub mod gateway;
pub mod session;

pub use collections::{
  Collection, CollectionKind, CollectionStore, FetchErrorPolicy, LoadState, StoreOptions,
};
pub use config::ClientConfig;
pub use gateway::{Gateway, GatewayError};
pub use session::{AuthFailure, ProfileUpdate, Registration, SessionProvider, SessionState};

/// The session provider, gateway and collection store over one backend.
///
/// Dropping the client stops the session listener.
pub struct Client<B> {
  pub session: SessionProvider<B>,
  pub gateway: Gateway<B>,
  pub store:   CollectionStore<B>,
}

impl<B: Backend + 'static> Client<B> {
  /// Build the client and wait for the initial session to be read. Must be
  /// called inside a tokio runtime.
  pub async fn start(backend: B, options: StoreOptions) -> Self {
    let backend = Arc::new(backend);
    let state = Arc::new(watch::channel(SessionState::default()).0);

    let gateway = Gateway::new(Arc::clone(&backend), state.subscribe());
    let session = SessionProvider::start(backend, gateway.clone(), state);
    let store = CollectionStore::new(gateway.clone(), options);
    session.ready().await;

    Self { session, gateway, store }
  }

  /// Sign out and drop every cached collection.
  pub async fn logout(&self) {
    self.session.logout().await;
    self.store.reset();
  }
}
