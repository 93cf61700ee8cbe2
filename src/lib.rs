pub mod config;
pub mod demand;
pub mod error;
pub mod evolutionary;
pub mod initial_routeset;
pub mod model;
pub mod road_graph;
pub mod routeset_graph;
