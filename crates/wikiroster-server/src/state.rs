use wikiroster_store::JsonRecordStore;

/// Shared application state, available to all route handlers via `State<Arc<AppState>>`.
pub struct AppState {
    pub store: JsonRecordStore,
}
