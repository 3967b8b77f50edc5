// ============================================================
// Layer 6 - Infrastructure Layer
// ============================================================
// Everything that touches the outside world:
//
//   store.rs        - SQLite reading store (WAL, indexed)
//   aqicn_client.rs - live readings over HTTP
//   fetchers.rs     - recorded and synthetic readings
//   clock.rs        - system and fixed clocks
//   settings.rs     - .env / environment configuration
//   artifacts.rs    - model cards next to the ONNX files
//   metrics.rs      - per-run evaluation CSV
//
// The domain traits (ReadingFetcher, Clock) are implemented
// here; the data and ml layers never name these types.

/// SQLite-backed reading store
pub mod store;

/// aqicn.org feed client
pub mod aqicn_client;

/// Offline fetchers
pub mod fetchers;

pub mod clock;

/// Environment settings
pub mod settings;

/// Model card persistence
pub mod artifacts;

/// Training run metrics CSV
pub mod metrics;
