// Atoms, bonds, attractors and the molecular graph
pub mod molecule;

// Assembly graph of building blocks, and the rings closed on it
pub mod graph;
pub mod ring;

// Chain identity and the path between two ring-closing vertices
pub mod chain;
pub mod path;

// Collaborators: path models and constitutional pattern matching
pub mod builder;
pub mod pattern;

// Ring-closure geometry and the torsional search
pub mod geometry;
pub mod torsion;

// Ring-size bias and pair compatibility
pub mod compat;
pub mod size;

// The hard bit: closability, combinations of chords, interdependent chains
pub mod closability;
pub mod enumerate;
pub mod interdependent;
pub mod state;

// Persistent memory of evaluated chains
pub mod archive;

// Post-hoc chelate rules
pub mod chelate;

// Parameters, shared context, errors
pub mod config;
pub mod context;
pub mod error;

// Data IO
pub mod loader;

// Utility functions
mod utils;

pub use error::{Error, Result};
