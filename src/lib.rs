pub mod basis;
pub mod coherency;
pub mod complex;
pub mod config;
pub mod facade;
pub mod fresnel;
pub mod jones;
pub mod legacy;
pub mod material;
pub mod mueller;
pub mod output;
pub mod powers;
pub mod ray;
pub mod result;
pub mod scene;
pub mod settings;
pub mod snell;
pub mod state;
pub mod stokes;
pub mod surface;
pub mod tracer;
pub mod vector;
