pub mod visualisations;
