mod common;
mod features;
mod heuristic;
