// ============================================================
// Layer 7 - Reporting
// ============================================================
// Turns stored readings and evaluation results into charts.
// Nothing here feeds back into the pipeline.
//
//   plots.rs - SVG charts through plotters

/// Bar, scatter and histogram charts
pub mod plots;
