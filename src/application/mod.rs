// ============================================================
// Layer 2 - Application / Use Cases
// ============================================================
// Each use case wires the lower layers together for one goal.
// No SQL, HTTP, numeric code or printing here; only the order
// in which things happen and the context attached to errors.
//
// Every use case takes a serde-friendly config plus the
// environment Settings and exposes `execute()`.

// Fetch, store and chart the latest readings
pub mod collect_use_case;

// Create the database, inspect its contents
pub mod store_use_case;

// Fit, export, verify and document a model
pub mod train_use_case;

// Run a trained model on new feature rows
pub mod predict_use_case;
