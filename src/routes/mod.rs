/// Router Module Index
///
/// `api` holds every JSON endpoint under `/api/`. Those paths are never gated by the
/// route guard; everything else is a page served from the static bundle and is.

/// JSON API: health and the generic resource routers.
pub mod api;
