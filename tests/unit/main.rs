// Unit tests for overlay geometry and event markers
//
// Organized by component:
// - geometry: wire-format overlays mapped through a viewport and painted
// - markers: feed envelopes classified into a time-ordered marker list

mod geometry_tests;
mod marker_tests;
