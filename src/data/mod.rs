// ============================================================
// Layer 4 - Data Pipeline
// ============================================================
// Everything between a source and the trainer or the store.
//
//   UCI CSV file                      live / recorded fetcher
//       │                                     │
//       ▼                                     ▼
//   CsvLoader      → RawTable         collect_readings → Vec<Reading>
//       │                                     │
//       ▼                                     ▼
//   Preprocessor   → AirQualityDataset   ReadingStore (infra)
//       │                                     │
//       └──────────────┬──────────────────────┘
//                      ▼
//             FeatureTable → split_train_test → trainer (ml)

/// Reads the semicolon-delimited UCI file
pub mod loader;

/// Timestamp parsing, numeric coercion, filtering and sorting
pub mod preprocessor;

/// The cleaned dataset and the FeatureTable implementations
pub mod dataset;

/// Seeded train/test split
pub mod splitter;

/// Per-city snapshot collection with error aggregation
pub mod collector;
